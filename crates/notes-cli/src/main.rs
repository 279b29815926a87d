#[tokio::main]
async fn main() -> anyhow::Result<()> {
    notes_cli::run().await
}
