// src/core/supervisor.rs
use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tracing::instrument::WithSubscriber;
use tracing::{error, info, warn, Dispatch};

/// Keeps one loop alive for the life of the process. `factory` builds a fresh loop
/// future for every (re)start. However it ends (error, clean return or panic), the
/// exit is logged and the next attempt waits `restart_delay`.
pub async fn supervise<F, Fut>(
    name: String,
    restart_delay: Duration,
    sink: Option<Dispatch>,
    mut factory: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let mut attempt: u64 = 0;
    loop {
        attempt += 1;
        info!("start run {} (attempt {})", name, attempt);

        let task = match &sink {
            Some(dispatch) => tokio::spawn(factory().with_subscriber(dispatch.clone())),
            None => tokio::spawn(factory()),
        };

        match task.await {
            Ok(Ok(())) => warn!("{} loop returned, restarting", name),
            Ok(Err(e)) => error!("{} loop failed: {:#}", name, e),
            Err(e) if e.is_panic() => error!("{} loop panicked: {}", name, e),
            Err(e) => error!("{} loop was cancelled: {}", name, e),
        }

        tokio::time::sleep(restart_delay).await;
    }
}
