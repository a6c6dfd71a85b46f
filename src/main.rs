use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    webstress_cli::cli::run().await
}
