mod cli;
mod infra;
mod routes;
mod server;
mod triage;

use schoolpay_verify::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
