mod cli;
mod client;
mod infra;
mod routes;
mod server;

use agazh::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
