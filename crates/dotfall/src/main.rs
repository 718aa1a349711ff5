//! Just `main()`. Keep as small as possible.

use color_eyre::eyre::Result;

#[expect(
    clippy::print_stderr,
    reason = "It's our central place for communicating with the user on CLI"
)]
#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let result = dotfall::run::run().await;
    tracing::debug!("dotfall is exiting");

    // STDOUT may belong to a headless host, so the user only ever hears from us on STDERR.
    match result {
        Ok(outcome) => {
            if let Some(log_path) = outcome.log_path {
                eprintln!("Logs saved to {}", log_path.display());
            }
            Ok(())
        }
        Err(error) => {
            tracing::error!("{error:?}");
            Err(error)
        }
    }
}
