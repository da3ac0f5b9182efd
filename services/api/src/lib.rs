mod cli;
mod demo;
mod infra;
mod report;
mod routes;
mod server;

use applyflow::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
