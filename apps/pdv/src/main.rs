//! Balcão PDV entry point.

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    pdv::run().await
}
