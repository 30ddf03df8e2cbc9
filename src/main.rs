#[tokio::main]
async fn main() {
    // Nothing can be logged without a subscriber.
    if let Err(e) = docworker::init_tracing() {
        eprintln!("Failed to initialize logging: {e:?}");
        std::process::exit(1);
    }

    if let Err(e) = docworker::run().await {
        tracing::error!(error = ?e, "Document worker exited with error");
        std::process::exit(1);
    }
}
