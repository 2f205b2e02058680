//! Движок сигналинга для видеозвонка двух участников поверх общего
//! pub/sub-канала: обнаружение через периодический broadcast, обмен
//! SDP offer/answer, Trickle-ICE с буферизацией ранних кандидатов и
//! восстановление после обрыва соединения.
//!
//! Сам канал доставки крейт не реализует — приложение подключает любой
//! relay через [`RelayTransport`]. Соединениями занимается
//! [`peer::RtcConnector`] (настоящий WebRTC) или мок из [`mock`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use sscall::{RtcConnector, Signaler, SignalerConfig, SignalerEvents};
//! use sscall::mock::MemoryBus;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let bus = MemoryBus::new();
//! let connector = RtcConnector::new(vec![])?;
//! let events = SignalerEvents::new()
//!     .on_user_found(|id| println!("user found: {id}"))
//!     .on_stream_added(|track| println!("stream: {}", track.track_id));
//!
//! let signaler = Signaler::start(
//!     bus.endpoint(),
//!     connector,
//!     SignalerConfig::default(),
//!     events,
//! );
//! signaler.send_participation_request("remote-user").await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod events;
mod logger;
pub mod message;
pub mod mock;
pub mod peer;
pub mod signaling;
pub mod transport;
mod utils;

pub use config::{IceServerConfig, SignalerConfig};
pub use error::{CallError, CallResult, ConfigError, NegotiationError, TransportError};
pub use events::SignalerEvents;
pub use message::{IceCandidateInfo, SdpKind, SessionDescription, SignalMessage};
pub use peer::{
    LinkHooks, LinkState, LocalTrack, NegotiationRole, NegotiationState, PeerConnector,
    PeerLink, RemoteTrack, RtcConnector,
};
pub use signaling::Signaler;
pub use transport::RelayTransport;
pub use utils::random_id;
