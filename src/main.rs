#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = examino_sessions::run().await {
        eprintln!("examino-sessions fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
