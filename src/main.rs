use std::env;
use std::process;

use tunesync::{CatalogRepository, ClientConfig, FtpTransferClient, TransferProgress, terminal};

fn main() {
    // Initialize logging
    env_logger::init();

    let config_path =
        env::var("TUNESYNC_CONFIG").unwrap_or_else(|_| "tunesync.toml".to_string());
    let config = match ClientConfig::from_config_file(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            print_usage();
            process::exit(1);
        }
    };

    let repository = CatalogRepository::new(
        FtpTransferClient::new(config.server.clone()),
        config.storage.app_data_dir.clone(),
        config.storage.catalog_file.clone(),
        config.server.summary(),
    );

    let args: Vec<String> = env::args().skip(1).collect();
    let outcome = match args.first().map(String::as_str) {
        Some("refresh") => run_refresh(&repository),
        Some("download") => match args.get(1) {
            Some(path) => run_download(&repository, path),
            None => {
                eprintln!("download requires a song path");
                print_usage();
                process::exit(2);
            }
        },
        _ => {
            print_usage();
            process::exit(2);
        }
    };

    if let Err(e) = outcome {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run_refresh(repository: &CatalogRepository<FtpTransferClient>) -> tunesync::Result<()> {
    let catalog = repository.refresh_catalog()?;
    println!(
        "Catalog refreshed at {} ({} albums, {} songs)",
        catalog.refreshed_at.format("%Y-%m-%d %H:%M:%S UTC"),
        catalog.albums.len(),
        catalog.song_count()
    );
    for album in &catalog.albums {
        println!("{}", album.name);
        for song in &album.songs {
            let marker = if song.downloaded { "x" } else { " " };
            println!("  [{}] {} ({})", marker, song.name, song.path);
        }
    }
    Ok(())
}

fn run_download(
    repository: &CatalogRepository<FtpTransferClient>,
    path: &str,
) -> tunesync::Result<()> {
    let catalog = repository.refresh_catalog()?;
    let Some(song) = catalog.find_song(path) else {
        eprintln!("Song '{}' not found in catalog", path);
        process::exit(1)
    };
    if song.downloaded {
        println!("'{}' is already downloaded", song.name);
        return Ok(());
    }

    let mut tracker: Option<TransferProgress> = None;
    repository.download_song(song, |bytes_so_far, total_bytes| {
        let tracker = tracker.get_or_insert_with(|| TransferProgress::new(total_bytes));
        tracker.update(bytes_so_far);
        terminal::display_progress(&song.name, bytes_so_far, total_bytes, tracker.speed_bps());
    })?;
    terminal::finish_progress();
    println!("Download completed: {}", song.name);
    Ok(())
}

fn print_usage() {
    println!("tunesync - FTP music catalog sync");
    println!();
    println!("Usage:");
    println!("  tunesync refresh                 Refresh and list the catalog");
    println!("  tunesync download <song-path>    Download one song by its catalog path");
    println!();
    println!("Configuration: ./tunesync.toml or TUNESYNC_CONFIG=<path>");
    println!("Environment Variables:");
    println!("  TUNESYNC_HOST=127.0.0.1");
    println!("  TUNESYNC_PORT=2121");
    println!("  TUNESYNC_USERNAME=username");
    println!("  TUNESYNC_PASSWORD=password");
    println!("  TUNESYNC_DATA_DIR=\"./tunesync_data\"");
    println!("  RUST_LOG=info");
}
