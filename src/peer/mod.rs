pub mod connection;
pub mod ice;
pub mod link;
pub mod registry;
pub mod session;
pub mod types;

pub use connection::RtcConnector;
pub use ice::CandidateBuffer;
pub use link::{
    CandidateSink, LinkHooks, LinkState, LinkStateSink, LocalTrack, PeerConnector, PeerLink,
    TrackSink,
};
pub use registry::PeerRegistry;
pub use session::PeerSession;
pub use types::{NegotiationRole, NegotiationState, RemoteTrack};
