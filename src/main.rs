use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    medibill_relay::init_tracing();

    match medibill_relay::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
