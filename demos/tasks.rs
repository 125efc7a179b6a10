use tokio::time::{sleep, Duration};
use tracing::{error, info};

use tracing_extras_fmt::init::init;

#[tracing::instrument]
async fn worker(id: u32) {
    info!(step = "start", "worker running");
    sleep(Duration::from_millis(10 * id as u64)).await;
    if id % 3 == 0 {
        error!(step = "finish", "worker gave up");
    } else {
        info!(step = "finish", "worker done");
    }
}

#[tokio::main]
async fn main() {
    init();

    let handles: Vec<_> = (0..6).map(|id| tokio::spawn(worker(id))).collect();
    for handle in handles {
        if let Err(e) = handle.await {
            error!(error = %e, "worker task panicked");
        }
    }
}
