mod cli;
mod demo;
mod infra;
mod routes;
mod server;
mod take;

use recruitment::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
