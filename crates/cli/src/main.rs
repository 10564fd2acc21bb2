use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    leadly_cli::run().await
}
