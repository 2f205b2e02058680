use async_trait::async_trait;
use std::sync::Arc;
use webrtc::track::track_local::TrackLocal;

use crate::error::NegotiationError;
use crate::message::{IceCandidateInfo, SessionDescription};
use crate::peer::types::RemoteTrack;

/// Локальный медиатрек. Владеет им приложение; один и тот же Arc
/// раздаётся каждому создаваемому соединению.
pub type LocalTrack = Arc<dyn TrackLocal + Send + Sync>;

/// Состояние связности нижележащего соединения.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// Обработчики событий соединения. Синхронные: асинхронное продолжение
/// запускается внутри через tokio::spawn.
pub type CandidateSink = Box<dyn Fn(IceCandidateInfo) + Send + Sync>;
pub type TrackSink = Box<dyn Fn(RemoteTrack) + Send + Sync>;
pub type LinkStateSink = Box<dyn Fn(LinkState) + Send + Sync>;

/// Набор обработчиков, передаваемый фабрике при создании соединения.
pub struct LinkHooks {
    pub on_candidate: CandidateSink,
    pub on_track: TrackSink,
    pub on_state: LinkStateSink,
}

/// Одно соединение с удалённым участником; сессия владеет им монопольно.
///
/// Реализация — настоящий WebRTC ([`crate::peer::connection::RtcConnector`])
/// или мок для тестов.
#[async_trait]
pub trait PeerLink: Send + Sync {
    /// Сгенерировать offer и установить его локальным описанием.
    async fn create_offer(&self) -> Result<SessionDescription, NegotiationError>;

    /// Установить удалённый offer; вызывается до генерации answer.
    async fn apply_remote_offer(&self, offer: SessionDescription)
        -> Result<(), NegotiationError>;

    /// Сгенерировать answer и установить его локальным описанием.
    async fn create_answer(&self) -> Result<SessionDescription, NegotiationError>;

    /// Применить удалённый answer.
    async fn apply_remote_answer(
        &self,
        answer: SessionDescription,
    ) -> Result<(), NegotiationError>;

    /// Применить ICE-кандидат удалённой стороны.
    async fn add_remote_candidate(
        &self,
        candidate: IceCandidateInfo,
    ) -> Result<(), NegotiationError>;

    /// Установлено ли удалённое описание. До этого момента кандидаты
    /// соединению передавать нельзя — их буферизует вызывающая сторона.
    async fn has_remote_description(&self) -> bool;

    /// Закрыть соединение.
    async fn close(&self);
}

/// Фабрика соединений.
#[async_trait]
pub trait PeerConnector: Send + Sync {
    /// Создать соединение для участника. `local_track`, если передан,
    /// подключается к соединению сразу.
    async fn connect(
        &self,
        participant_id: &str,
        local_track: Option<LocalTrack>,
        hooks: LinkHooks,
    ) -> Result<Arc<dyn PeerLink>, NegotiationError>;
}
