//! Progress display for the command-line front-end

use std::io::{self, Write};

/// Display transfer progress, as a bar when the total is known and as a
/// running byte count otherwise
pub fn display_progress(name: &str, bytes_so_far: i64, total_bytes: i64, speed_bps: f64) {
    if total_bytes > 0 {
        let percentage =
            ((bytes_so_far as f64 / total_bytes as f64) * 100.0).clamp(0.0, 100.0);
        // 50 characters = 100%
        let filled = (percentage / 2.0) as usize;
        let bar = "#".repeat(filled) + &" ".repeat(50 - filled);

        print!(
            "\r{}: [{}] {:.1}% ({}) {}",
            name,
            bar,
            percentage,
            format_bytes(bytes_so_far),
            format_speed(speed_bps)
        );
    } else {
        print!(
            "\r{}: {} {}",
            name,
            format_bytes(bytes_so_far),
            format_speed(speed_bps)
        );
    }

    if let Err(e) = io::stdout().flush() {
        eprintln!("\nError flushing stdout: {}", e);
    }
}

/// Clear the progress line and move to next line
pub fn finish_progress() {
    println!();
}

/// Format bytes as human readable string
pub fn format_bytes(bytes: i64) -> String {
    if bytes < 0 {
        return "? B".to_string();
    }

    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

/// Format speed as human readable string
pub fn format_speed(bps: f64) -> String {
    format!("{}/s", format_bytes(bps as i64))
}
