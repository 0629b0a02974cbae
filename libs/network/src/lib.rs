//! # Orbitlink Network
//!
//! Moves encoded Orbitlink messages between peers and into the subsystems
//! that consume them.
//!
//! ## Components
//!
//! - [`transports`]: the [`Transport`] contract, an in-process pair and UDP
//! - [`queue`]: [`MessageSink`] and the crossbeam-backed [`InboundQueue`]
//! - [`routing`]: `(MessageType, SubType)` to sink, plus the standard
//!   per-subsystem queue sets
//! - [`dispatcher`]: the receive loop
//! - [`sender`]: caller-side serialization and the background send task
//! - [`session`]: both loops around one transport
//!
//! ## Data Flow
//!
//! ```text
//! Transport ──try_receive──▶ Dispatcher ──decode──▶ RoutingTable ──▶ InboundQueue ──▶ subsystem
//! subsystem ──Envelope──▶ OutboundSender ──serialize──▶ channel ──▶ send task ──▶ Transport
//! ```

pub mod dispatcher;
pub mod error;
pub mod queue;
pub mod routing;
pub mod sender;
pub mod session;
pub mod shutdown;
pub mod transports;

pub use dispatcher::{ControlEvent, Dispatcher, ReceiveStats, ReceiveStatsSnapshot};
pub use error::{NetworkError, Result};
pub use queue::{InboundQueue, MessageSink};
pub use routing::{RoutingTable, RoutingTableBuilder, Subsystem, SubsystemQueues};
pub use sender::{OutboundSender, SendStats};
pub use session::{build_pipeline, PeerSession};
pub use shutdown::RunFlag;
pub use transports::{
    ConnectionStatus, MemoryTransport, Transport, TransportEvent, TransportInfo, TransportType,
    UdpConfig, UdpTransport,
};
