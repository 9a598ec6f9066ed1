use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    cocher::tui::run().await
}
