mod attack;
mod board;
mod common;
mod config;
pub mod console;
mod game;
mod logging;
pub mod node;
mod placement;
pub mod protocol;
mod score;
mod ship;
pub mod transport;

pub use attack::*;
pub use board::*;
pub use common::*;
pub use config::*;
pub use game::*;
pub use logging::{init_logging, LOG_ENV};
pub use node::{Exit, TeamNode};
pub use placement::*;
pub use protocol::*;
pub use score::*;
pub use ship::*;
pub use transport::broker::Broker;
pub use transport::gateway::{spawn_gateway, Gateway, GatewayHandle};
pub use transport::in_memory::{InMemoryBus, InMemoryTransport};
pub use transport::liveness::spawn_liveness;
pub use transport::tcp::TcpTransport;
pub use transport::{Inbound, Transport};
