use gantry::cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Optional .env; a missing file is fine
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Error loading .env file: {}", e);
        }
    }

    cli::run_cli().await
}
