//! Minimal topic broker for [`TcpTransport`](crate::transport::tcp::TcpTransport)
//! clients. Routing is delegated to an [`InMemoryBus`]; each connection is a
//! bus client bridged onto its socket.

use anyhow::anyhow;
use log::{debug, info, warn};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};

use crate::transport::in_memory::InMemoryBus;
use crate::transport::tcp::{fill, write_frame, Frame, FrameBuffer, DEFAULT_TIMEOUT, MAX_FRAME_SIZE};
use crate::transport::Transport;

pub struct Broker {
    listener: TcpListener,
    bus: InMemoryBus,
}

impl Broker {
    pub async fn bind<A: ToSocketAddrs>(addr: A) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self::from_listener(listener))
    }

    pub fn from_listener(listener: TcpListener) -> Self {
        Self {
            listener,
            bus: InMemoryBus::new(),
        }
    }

    pub fn local_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until the listener fails.
    pub async fn serve(self) -> anyhow::Result<()> {
        info!("broker listening on {}", self.local_addr()?);
        loop {
            let (stream, peer) = self.listener.accept().await?;
            stream.set_nodelay(true)?;
            info!("client connected from {peer}");
            let bus = self.bus.clone();
            tokio::spawn(async move {
                match bridge(stream, bus).await {
                    Ok(()) => info!("client {peer} disconnected"),
                    Err(e) => warn!("client {peer} dropped: {e}"),
                }
            });
        }
    }
}

async fn bridge(mut stream: TcpStream, bus: InMemoryBus) -> anyhow::Result<()> {
    let mut client = bus.connect();
    let mut frames = FrameBuffer::new(MAX_FRAME_SIZE);
    loop {
        while let Some(frame) = frames.next_frame()? {
            match frame {
                Frame::Subscribe { topic } => {
                    debug!("subscribe {topic}");
                    client.subscribe(&topic).await?;
                }
                Frame::Publish { topic, payload } => {
                    debug!("publish {topic}: {payload}");
                    client.publish(&topic, &payload).await?;
                }
                Frame::Deliver(_) => return Err(anyhow!("client sent a deliver frame")),
            }
        }
        tokio::select! {
            open = fill(&mut stream, &mut frames) => {
                if !open? {
                    if frames.pending() > 0 {
                        return Err(anyhow!("connection closed mid-frame"));
                    }
                    return Ok(());
                }
            }
            msg = client.recv() => {
                let msg = msg?;
                write_frame(&mut stream, &Frame::Deliver(msg), MAX_FRAME_SIZE, DEFAULT_TIMEOUT).await?;
            }
        }
    }
}
