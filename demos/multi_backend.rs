//! Storing, locating, copying and deleting a file across local, remote and
//! backup storage, with in-memory buckets standing in for S3.
//!
//! Run with:
//! ```sh
//! cargo run --example multi_backend --features="memory"
//! ```

use depot::{BackendType, MemoryConnector, ServerConfig, StorageConfig, StorageOrchestrator};
use tempfile::TempDir;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let dir = TempDir::new()?;
    let config = StorageConfig::new(BackendType::Local)
        .with_server(
            "local",
            ServerConfig::local(dir.path().join("public")).with_base_url("https://app.example.com"),
        )
        .with_server("remote", ServerConfig::remote("images", "uploads"))
        .with_server("backup", ServerConfig::remote("archive", "cold"));
    let storage = StorageOrchestrator::new(config, MemoryConnector::new());

    let source = dir.path().join("avatar.png");
    std::fs::write(&source, b"not really a png")?;

    // Store to the default backend, then to remote and backup.
    storage.store_file(&source, "avatars/1.png", &[]).await?;
    storage
        .store_file(
            &source,
            "avatars/1.png",
            &[BackendType::Remote, BackendType::Backup],
        )
        .await?;

    println!(
        "local first:  {}",
        storage.resolve_file_url("avatars/1.png", None, true).await
    );
    println!(
        "remote first: {}",
        storage
            .resolve_file_url("avatars/1.png", Some(&BackendType::Remote), true)
            .await
    );

    storage
        .copy_file(&BackendType::Remote, "avatars/1.png", "avatars/1-thumb.png")
        .await?;
    println!(
        "thumb:        {}",
        storage
            .resolve_file_url("avatars/1-thumb.png", None, true)
            .await
    );

    // Delete everywhere; nothing is left to find.
    storage.delete_file("avatars/1.png", &[]).await;
    println!(
        "exists after delete: {}",
        storage.file_exists("avatars/1.png", None).await
    );

    Ok(())
}
