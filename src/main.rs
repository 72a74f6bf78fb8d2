use tracing::error;

#[tokio::main]
async fn main() {
    if let Err(e) = tutoring_backend::run().await {
        error!("Scheduler exited with error: {}", e);
        std::process::exit(1);
    }
}
