use log::{debug, warn};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};

use crate::protocol::Publish;
use crate::transport::gateway::GatewayHandle;

/// Periodically publish a liveness message.
///
/// After a successful publish the next one follows `interval` later; after a
/// failure the task waits `retry` instead. It never stops on its own.
pub fn spawn_liveness(
    gateway: GatewayHandle,
    msg: Publish,
    interval: Duration,
    retry: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match gateway.publish(msg.clone()).await {
                Ok(()) => {
                    debug!("liveness sent on {}", msg.topic);
                    sleep(interval).await;
                }
                Err(e) => {
                    warn!("liveness publish failed, retrying in {:?}: {e}", retry);
                    sleep(retry).await;
                }
            }
        }
    })
}
