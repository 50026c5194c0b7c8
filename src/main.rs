//! iv-spread - Implied-volatility spread engine

use anyhow::Result;

use iv_spread::adapters::cli;

fn main() -> Result<()> {
    // Load .env file if it exists (RUST_LOG and friends)
    dotenvy::dotenv().ok();

    let app = cli::init();
    cli::execute(app)
}
