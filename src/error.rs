use thiserror::Error;

use crate::peer::types::NegotiationState;

/// Ошибки конфигурации: неправильное использование API, видимое программисту.
/// Возвращаются синхронно и не повторяются автоматически.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no local media track attached, call add_track() before start_broadcasting()")]
    NoLocalMedia,
    #[error("ICE server url cannot be empty")]
    EmptyIceUrl,
    #[error("TURN server '{0}' requires username and credential")]
    TurnWithoutCredentials(String),
}

/// Ошибки транспортного уровня (pub/sub relay).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("send failed: {0}")]
    SendFailed(String),
    #[error("relay channel closed")]
    Closed,
    #[error("message encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Ошибки переговоров SDP/ICE. Не фатальны для экземпляра:
/// докладываются приложению через обработчик ошибок, сессия остаётся
/// в прежнем состоянии.
#[derive(Debug, Error, Clone)]
pub enum NegotiationError {
    #[error("peer link setup failed: {0}")]
    LinkSetup(String),
    #[error("offer creation failed: {0}")]
    OfferFailed(String),
    #[error("answer creation failed: {0}")]
    AnswerFailed(String),
    #[error("remote description rejected: {0}")]
    RemoteDescription(String),
    #[error("ICE candidate rejected: {0}")]
    Candidate(String),
    #[error("no active session for peer '{0}'")]
    UnknownPeer(String),
    #[error("session for '{peer}' cannot {action} in state {state:?}")]
    InvalidState {
        peer: String,
        state: NegotiationState,
        action: &'static str,
    },
}

/// Общий тип ошибок библиотеки.
#[derive(Debug, Error)]
pub enum CallError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Negotiation(#[from] NegotiationError),
}

pub type CallResult<T> = Result<T, CallError>;
