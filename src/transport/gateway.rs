//! Task that owns the transport and multiplexes publishers onto it.
//!
//! Any number of [`GatewayHandle`]s can publish concurrently. Publishes are
//! written in the order they were queued. [`GatewayHandle::publish`] waits for
//! the transport's result, [`GatewayHandle::send`] only queues. Inbound
//! messages flow out on a single channel in arrival order.

use anyhow::anyhow;
use log::{debug, error, info};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::protocol::Publish;
use crate::transport::{Inbound, Transport};

enum Request {
    Publish {
        msg: Publish,
        ack: Option<oneshot::Sender<anyhow::Result<()>>>,
    },
}

/// Cloneable publishing side of the gateway.
#[derive(Clone)]
pub struct GatewayHandle {
    tx: mpsc::UnboundedSender<Request>,
}

impl GatewayHandle {
    /// Publish and wait for the transport's result.
    pub async fn publish(&self, msg: Publish) -> anyhow::Result<()> {
        let (ack, done) = oneshot::channel();
        self.tx
            .send(Request::Publish {
                msg,
                ack: Some(ack),
            })
            .map_err(|_| anyhow!("Gateway closed"))?;
        done.await.map_err(|_| anyhow!("Gateway closed"))?
    }

    /// Queue a publish without waiting. Write failures are logged by the
    /// gateway task; the only error here is a closed gateway.
    pub fn send(&self, msg: Publish) -> anyhow::Result<()> {
        self.tx
            .send(Request::Publish { msg, ack: None })
            .map_err(|_| anyhow!("Gateway closed"))
    }
}

pub struct Gateway {
    pub handle: GatewayHandle,
    pub inbound: mpsc::UnboundedReceiver<Inbound>,
    pub task: JoinHandle<anyhow::Result<()>>,
}

/// Subscribe `transport` to `topics`, then start the gateway task.
///
/// The task ends with `Ok` once every handle is dropped or the inbound
/// receiver is gone, and with the transport's error if the connection fails.
pub async fn spawn_gateway(
    mut transport: Box<dyn Transport>,
    topics: &[String],
) -> anyhow::Result<Gateway> {
    for topic in topics {
        transport.subscribe(topic).await?;
        info!("subscribed to {topic}");
    }

    let (tx, requests) = mpsc::unbounded_channel();
    let (inbound_tx, inbound) = mpsc::unbounded_channel();

    let task = tokio::spawn(pump(transport, requests, inbound_tx));

    Ok(Gateway {
        handle: GatewayHandle { tx },
        inbound,
        task,
    })
}

async fn pump(
    mut transport: Box<dyn Transport>,
    mut requests: mpsc::UnboundedReceiver<Request>,
    inbound: mpsc::UnboundedSender<Inbound>,
) -> anyhow::Result<()> {
    loop {
        tokio::select! {
            req = requests.recv() => match req {
                Some(Request::Publish { msg, ack }) => {
                    let result = transport.publish(&msg.topic, &msg.payload).await;
                    match &result {
                        Ok(()) => debug!("-> {} {}", msg.topic, msg.payload),
                        Err(e) => error!("publish to {} failed: {e}", msg.topic),
                    }
                    if let Some(ack) = ack {
                        let _ = ack.send(result);
                    }
                }
                None => return Ok(()),
            },
            msg = transport.recv() => {
                let msg = msg?;
                debug!("<- {} {}", msg.topic, msg.payload);
                if inbound.send(msg).is_err() {
                    return Ok(());
                }
            }
        }
    }
}
