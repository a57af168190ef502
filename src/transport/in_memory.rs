//! In-process bus with broker semantics, for tests and the simulator.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use tokio::sync::mpsc;

use crate::transport::{Inbound, Transport};

type Subscribers = HashMap<String, Vec<(usize, mpsc::UnboundedSender<Inbound>)>>;

#[derive(Default)]
struct BusState {
    next_id: usize,
    subscribers: Subscribers,
}

/// Shared topic table. Every published message reaches every subscriber of
/// its topic, the publisher included.
#[derive(Clone, Default)]
pub struct InMemoryBus {
    state: Arc<Mutex<BusState>>,
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a new client to the bus.
    pub fn connect(&self) -> InMemoryTransport {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.next_id += 1;
            state.next_id
        };
        InMemoryTransport {
            id,
            bus: self.clone(),
            tx,
            rx,
        }
    }

    /// Deliver `payload` to every live subscriber of `topic`. Returns how many
    /// subscribers received it.
    pub fn publish(&self, topic: &str, payload: &str) -> usize {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let Some(subs) = state.subscribers.get_mut(topic) else {
            return 0;
        };
        subs.retain(|(_, tx)| {
            tx.send(Inbound {
                topic: topic.to_string(),
                payload: payload.to_string(),
            })
            .is_ok()
        });
        subs.len()
    }

    fn subscribe(&self, id: usize, topic: &str, tx: &mpsc::UnboundedSender<Inbound>) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let subs = state.subscribers.entry(topic.to_string()).or_default();
        if !subs.iter().any(|(sub, _)| *sub == id) {
            subs.push((id, tx.clone()));
        }
    }
}

pub struct InMemoryTransport {
    id: usize,
    bus: InMemoryBus,
    tx: mpsc::UnboundedSender<Inbound>,
    rx: mpsc::UnboundedReceiver<Inbound>,
}

impl InMemoryTransport {
    /// The bus this client is attached to.
    pub fn bus(&self) -> &InMemoryBus {
        &self.bus
    }
}

#[async_trait::async_trait]
impl Transport for InMemoryTransport {
    async fn subscribe(&mut self, topic: &str) -> anyhow::Result<()> {
        self.bus.subscribe(self.id, topic, &self.tx);
        Ok(())
    }

    async fn publish(&mut self, topic: &str, payload: &str) -> anyhow::Result<()> {
        self.bus.publish(topic, payload);
        Ok(())
    }

    async fn recv(&mut self) -> anyhow::Result<Inbound> {
        self.rx.recv().await.ok_or_else(|| anyhow!("Channel closed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_to_all_subscribers_including_publisher() {
        let bus = InMemoryBus::new();
        let mut a = bus.connect();
        let mut b = bus.connect();
        a.subscribe("t").await.unwrap();
        b.subscribe("t").await.unwrap();
        b.subscribe("t").await.unwrap();

        a.publish("t", "hello").await.unwrap();
        assert_eq!(a.recv().await.unwrap().payload, "hello");
        assert_eq!(b.recv().await.unwrap().payload, "hello");
        assert_eq!(bus.publish("other", "x"), 0);
    }

    #[tokio::test]
    async fn dropped_clients_are_pruned() {
        let bus = InMemoryBus::new();
        let mut a = bus.connect();
        a.subscribe("t").await.unwrap();
        drop(a);
        assert_eq!(bus.publish("t", "x"), 0);
    }
}
