//! Моки для тестов и симуляции: транспорт на каналах в памяти вместо
//! настоящего relay и соединения без WebRTC-стека.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

use crate::error::{NegotiationError, TransportError};
use crate::message::{IceCandidateInfo, SessionDescription, SignalMessage};
use crate::peer::link::{LinkHooks, LinkState, LocalTrack, PeerConnector, PeerLink};
use crate::peer::types::RemoteTrack;
use crate::transport::RelayTransport;

// ========== ТРАНСПОРТ В ПАМЯТИ ==========

/// Общая шина сигналинга: каждое сообщение доставляется всем подключённым
/// сторонам, включая отправителя — как в pub/sub-канале настоящего relay.
pub struct MemoryBus {
    tx: broadcast::Sender<SignalMessage>,
}

impl MemoryBus {
    pub fn new() -> Arc<Self> {
        let (tx, _) = broadcast::channel(256);
        Arc::new(Self { tx })
    }

    /// Подключает к шине новую сторону.
    pub fn endpoint(&self) -> Arc<MemoryRelay> {
        Arc::new(MemoryRelay {
            tx: self.tx.clone(),
            rx: tokio::sync::Mutex::new(self.tx.subscribe()),
        })
    }

    /// Вбрасывает сообщение в шину от имени внешней стороны.
    pub fn inject(&self, msg: SignalMessage) {
        let _ = self.tx.send(msg);
    }
}

/// Одна сторона шины.
pub struct MemoryRelay {
    tx: broadcast::Sender<SignalMessage>,
    rx: tokio::sync::Mutex<broadcast::Receiver<SignalMessage>>,
}

#[async_trait]
impl RelayTransport for MemoryRelay {
    async fn send(&self, msg: &SignalMessage) -> Result<(), TransportError> {
        self.tx
            .send(msg.clone())
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;
        Ok(())
    }

    async fn recv(&self) -> Option<SignalMessage> {
        let mut rx = self.rx.lock().await;
        loop {
            match rx.recv().await {
                Ok(msg) => return Some(msg),
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
            }
        }
    }
}

// ========== МОК-СОЕДИНЕНИЯ ==========

/// Фабрика мок-соединений. Запоминает каждое созданное соединение,
/// чтобы тест мог досмотреть его состояние и дёргать события.
#[derive(Default)]
pub struct MockConnector {
    links: Mutex<Vec<Arc<MockLink>>>,
    fail_next_connect: AtomicBool,
    fail_next_offer: AtomicBool,
}

impl MockConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Следующий connect() завершится ошибкой установки соединения.
    pub fn fail_next_connect(&self) {
        self.fail_next_connect.store(true, Ordering::SeqCst);
    }

    /// У следующего созданного соединения откажет create_offer().
    pub fn fail_next_offer(&self) {
        self.fail_next_offer.store(true, Ordering::SeqCst);
    }

    /// Последнее соединение, созданное для участника.
    pub fn link(&self, peer_id: &str) -> Option<Arc<MockLink>> {
        self.links
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|l| l.peer_id == peer_id)
            .cloned()
    }

    /// Все соединения участника в порядке создания.
    pub fn links_for(&self, peer_id: &str) -> Vec<Arc<MockLink>> {
        self.links
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.peer_id == peer_id)
            .cloned()
            .collect()
    }

    pub fn link_count(&self) -> usize {
        self.links.lock().unwrap().len()
    }
}

#[async_trait]
impl PeerConnector for MockConnector {
    async fn connect(
        &self,
        participant_id: &str,
        local_track: Option<LocalTrack>,
        hooks: LinkHooks,
    ) -> Result<Arc<dyn PeerLink>, NegotiationError> {
        if self.fail_next_connect.swap(false, Ordering::SeqCst) {
            return Err(NegotiationError::LinkSetup("injected failure".into()));
        }
        let link = Arc::new(MockLink {
            peer_id: participant_id.to_string(),
            local_track_attached: local_track.is_some(),
            hooks,
            fail_offer: AtomicBool::new(self.fail_next_offer.swap(false, Ordering::SeqCst)),
            inner: Mutex::new(MockLinkInner::default()),
        });
        self.links.lock().unwrap().push(link.clone());
        Ok(link)
    }
}

#[derive(Default)]
struct MockLinkInner {
    local_description: Option<SessionDescription>,
    remote_description: Option<SessionDescription>,
    applied_candidates: Vec<IceCandidateInfo>,
    closed: bool,
}

/// Мок-соединение: хранит установленные описания и кандидаты, SDP не
/// разбирает. События соединения тест поднимает вручную через fire_*.
pub struct MockLink {
    peer_id: String,
    local_track_attached: bool,
    hooks: LinkHooks,
    fail_offer: AtomicBool,
    inner: Mutex<MockLinkInner>,
}

impl MockLink {
    pub fn peer_id(&self) -> &str {
        &self.peer_id
    }

    pub fn local_track_attached(&self) -> bool {
        self.local_track_attached
    }

    pub fn local_description(&self) -> Option<SessionDescription> {
        self.inner.lock().unwrap().local_description.clone()
    }

    pub fn remote_description(&self) -> Option<SessionDescription> {
        self.inner.lock().unwrap().remote_description.clone()
    }

    pub fn applied_candidates(&self) -> Vec<IceCandidateInfo> {
        self.inner.lock().unwrap().applied_candidates.clone()
    }

    pub fn candidate_count(&self) -> usize {
        self.inner.lock().unwrap().applied_candidates.len()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().unwrap().closed
    }

    /// Поднимает событие локального кандидата, будто его нашёл ICE-агент.
    pub fn fire_candidate(&self, candidate: IceCandidateInfo) {
        (self.hooks.on_candidate)(candidate);
    }

    /// Поднимает событие входящего медиатрека.
    pub fn fire_track(&self, track: RemoteTrack) {
        (self.hooks.on_track)(track);
    }

    /// Поднимает смену состояния связности.
    pub fn fire_state(&self, state: LinkState) {
        (self.hooks.on_state)(state);
    }
}

#[async_trait]
impl PeerLink for MockLink {
    async fn create_offer(&self) -> Result<SessionDescription, NegotiationError> {
        if self.fail_offer.swap(false, Ordering::SeqCst) {
            return Err(NegotiationError::OfferFailed("injected failure".into()));
        }
        let offer = SessionDescription::offer(format!("v=0 mock-offer-for-{}", self.peer_id));
        self.inner.lock().unwrap().local_description = Some(offer.clone());
        Ok(offer)
    }

    async fn apply_remote_offer(
        &self,
        offer: SessionDescription,
    ) -> Result<(), NegotiationError> {
        self.inner.lock().unwrap().remote_description = Some(offer);
        Ok(())
    }

    async fn create_answer(&self) -> Result<SessionDescription, NegotiationError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.remote_description.is_none() {
            return Err(NegotiationError::AnswerFailed(
                "no remote offer set".into(),
            ));
        }
        let answer = SessionDescription::answer(format!("v=0 mock-answer-for-{}", self.peer_id));
        inner.local_description = Some(answer.clone());
        Ok(answer)
    }

    async fn apply_remote_answer(
        &self,
        answer: SessionDescription,
    ) -> Result<(), NegotiationError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.remote_description.is_some() {
            // настоящий стек отверг бы повторное удалённое описание
            return Err(NegotiationError::RemoteDescription(
                "remote description already set".into(),
            ));
        }
        inner.remote_description = Some(answer);
        Ok(())
    }

    async fn add_remote_candidate(
        &self,
        candidate: IceCandidateInfo,
    ) -> Result<(), NegotiationError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.remote_description.is_none() {
            return Err(NegotiationError::Candidate(
                "no remote description".into(),
            ));
        }
        inner.applied_candidates.push(candidate);
        Ok(())
    }

    async fn has_remote_description(&self) -> bool {
        self.inner.lock().unwrap().remote_description.is_some()
    }

    async fn close(&self) {
        self.inner.lock().unwrap().closed = true;
    }
}

// ========== ОЖИДАНИЕ В ТЕСТАХ ==========

/// Опрашивает условие, пока оно не выполнится или не истекут две секунды.
pub async fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}
