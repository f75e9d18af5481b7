use anyhow::Result;
use shipsmind::cli::{self, telemetry};

// Main function
#[tokio::main]
async fn main() -> Result<()> {
    let action = cli::start()?;

    let result = action.execute().await;

    telemetry::shutdown_tracer();

    result
}
