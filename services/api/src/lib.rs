mod cli;
mod infra;
mod routes;
mod server;
mod walkthrough;

use screening_wizard::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
