//! Nodemeter CLI entry point.

use nodemeter_lib::cli::{self, Cli};
use nodemeter_lib::core::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();
    cli::execute(cli).await
}
