use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, Weak};

use crate::config::SignalerConfig;
use crate::error::{CallResult, ConfigError, NegotiationError};
use crate::events::SignalerEvents;
use crate::logger::{dump_candidate, log};
use crate::message::{IceCandidateInfo, SdpKind, SessionDescription, SignalMessage};
use crate::peer::link::{
    CandidateSink, LinkHooks, LinkState, LinkStateSink, LocalTrack, PeerConnector, TrackSink,
};
use crate::peer::registry::PeerRegistry;
use crate::peer::session::PeerSession;
use crate::peer::types::{NegotiationRole, NegotiationState};
use crate::transport::RelayTransport;
use crate::utils::random_id;

/// Маршрутизатор сигналинга: единственный потребитель и отправитель
/// сообщений транспорта, владелец реестра peer-сессий и цикла broadcast.
///
/// Жизненный цикл сессии: она создаётся либо при входящем offer,
/// адресованном нам (роль Answerer), либо при явном принятии запроса на
/// участие (роль Offerer); уничтожается по userLeft, по close() или при
/// обрыве соединения перед повторными переговорами.
pub struct Signaler {
    local_id: String,
    config: SignalerConfig,
    transport: Arc<dyn RelayTransport>,
    connector: Arc<dyn PeerConnector>,
    registry: Mutex<PeerRegistry>,
    local_track: Mutex<Option<LocalTrack>>,
    events: SignalerEvents,
    participant_found: AtomicBool,
    broadcasting: AtomicBool,
    // для замыканий и фоновых циклов: они не должны держать экземпляр живым
    weak_self: Weak<Self>,
}

impl Signaler {
    /// Создаёт экземпляр и запускает цикл диспетчеризации входящих
    /// сообщений. Обработчики событий регистрируются заранее и после
    /// старта не меняются.
    pub fn start(
        transport: Arc<dyn RelayTransport>,
        connector: Arc<dyn PeerConnector>,
        config: SignalerConfig,
        events: SignalerEvents,
    ) -> Arc<Self> {
        let local_id = config.local_id.clone().unwrap_or_else(random_id);
        log(&format!("Signaler starting with id '{}'", local_id));

        let signaler = Arc::new_cyclic(|weak| Self {
            local_id,
            config,
            transport: transport.clone(),
            connector,
            registry: Mutex::new(PeerRegistry::new()),
            local_track: Mutex::new(None),
            events,
            participant_found: AtomicBool::new(false),
            broadcasting: AtomicBool::new(false),
            weak_self: weak.clone(),
        });

        // Единственный потребитель транспорта. Слабая ссылка: цикл не
        // держит экземпляр живым, когда приложение его отпустило.
        let weak = Arc::downgrade(&signaler);
        tokio::spawn(async move {
            while let Some(msg) = transport.recv().await {
                let Some(signaler) = weak.upgrade() else { break };
                signaler.dispatch(msg).await;
            }
            log("Dispatch loop stopped");
        });

        signaler
    }

    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    pub fn participant_found(&self) -> bool {
        self.participant_found.load(Ordering::SeqCst)
    }

    pub fn is_broadcasting(&self) -> bool {
        self.broadcasting.load(Ordering::SeqCst)
    }

    pub fn session_count(&self) -> usize {
        self.registry.lock().unwrap().len()
    }

    pub fn session_role(&self, peer_id: &str) -> Option<NegotiationRole> {
        self.registry.lock().unwrap().get(peer_id).map(|s| s.role)
    }

    pub fn session_state(&self, peer_id: &str) -> Option<NegotiationState> {
        self.registry
            .lock()
            .unwrap()
            .get(peer_id)
            .map(|s| s.state())
    }

    /// Текущий адресат исходящих сообщений — последний увиденный удалённый id.
    pub fn current_target(&self) -> Option<String> {
        self.registry.lock().unwrap().target()
    }

    /// Количество отложенных кандидатов участника.
    pub fn pending_candidates(&self, peer_id: &str) -> usize {
        self.registry.lock().unwrap().buffers.len(peer_id)
    }

    // ========== ПУБЛИЧНЫЕ ОПЕРАЦИИ ==========

    /// Подключает локальный медиатрек; он будет раздаваться каждому
    /// создаваемому после этого соединению.
    pub fn add_track(&self, track: LocalTrack) {
        *self.local_track.lock().unwrap() = Some(track);
    }

    /// Запускает периодическое самообъявление: broadcast каждые
    /// `broadcast_interval`, пока не найден собеседник или вещание не
    /// остановлено. Флаги проверяются на границе такта — уже ушедший
    /// broadcast не отменяется.
    pub fn start_broadcasting(&self) -> CallResult<()> {
        if self.local_track.lock().unwrap().is_none() {
            return Err(ConfigError::NoLocalMedia.into());
        }
        if self.broadcasting.swap(true, Ordering::SeqCst) {
            // уже вещаем
            return Ok(());
        }

        let weak = self.weak_self.clone();
        let interval = self.config.broadcast_interval;
        tokio::spawn(async move {
            loop {
                let Some(signaler) = weak.upgrade() else { break };
                signaler
                    .send_best_effort(SignalMessage::broadcast(&signaler.local_id))
                    .await;
                let stop = signaler.participant_found.load(Ordering::SeqCst)
                    || !signaler.broadcasting.load(Ordering::SeqCst);
                if stop {
                    signaler.broadcasting.store(false, Ordering::SeqCst);
                    log("Broadcasting stopped");
                    break;
                }
                drop(signaler);
                tokio::time::sleep(interval).await;
            }
        });
        Ok(())
    }

    /// Останавливает самообъявление; цикл увидит флаг на следующем такте.
    pub fn stop_broadcasting(&self) {
        self.broadcasting.store(false, Ordering::SeqCst);
    }

    /// Просит вещающего участника принять нас в сеанс.
    pub async fn send_participation_request(&self, peer_id: &str) -> CallResult<()> {
        self.transport
            .send(&SignalMessage::participation_request(&self.local_id, peer_id))
            .await?;
        Ok(())
    }

    /// Принимает запрос на участие: создаёт Offerer-сессию для участника
    /// и отправляет ему offer. Ошибки переговоров докладываются через
    /// обработчик ошибок, сессия остаётся в прежнем состоянии.
    pub async fn accept_request(&self, peer_id: &str) {
        log(&format!("Accepting participation request from '{}'", peer_id));
        let track = { self.local_track.lock().unwrap().clone() };
        let session = match self
            .create_session(peer_id, NegotiationRole::Offerer, track)
            .await
        {
            Ok(session) => session,
            Err(e) => {
                self.report_negotiation_error(peer_id, e);
                return;
            }
        };

        let replaced = { self.registry.lock().unwrap().insert(session.clone()) };
        if let Some(old) = replaced {
            self.retire_session(&old).await;
        }

        match session.start_offer().await {
            Ok(offer) => {
                self.send_best_effort(SignalMessage::sdp(&self.local_id, peer_id, offer))
                    .await;
            }
            Err(e) => self.report_negotiation_error(peer_id, e),
        }
    }

    /// Завершает сеанс: уведомляет текущего адресата, закрывает все сессии,
    /// очищает реестр и отпускает локальный медиатрек. Идемпотентна.
    pub async fn close(&self) {
        self.broadcasting.store(false, Ordering::SeqCst);

        let (target, sessions) = {
            let mut registry = self.registry.lock().unwrap();
            let target = registry.target();
            registry.clear_target();
            (target, registry.take_all())
        };

        if let Some(target) = target {
            self.send_best_effort(SignalMessage::user_left(&self.local_id, &target))
                .await;
        }

        for session in sessions {
            self.retire_session(&session).await;
        }

        // локальным треком владеет приложение, мы лишь отпускаем ссылку
        *self.local_track.lock().unwrap() = None;
    }

    // ========== МАРШРУТИЗАЦИЯ ==========

    /// Разбирает входящее сообщение. Ветви независимы: сообщение
    /// проверяется на каждое применимое поле, а не по принципу else-if.
    async fn dispatch(&self, msg: SignalMessage) {
        // собственное эхо pub/sub-канала
        if msg.userid == self.local_id {
            return;
        }

        // последний увиденный удалённый id — адресат исходящих по умолчанию
        self.registry.lock().unwrap().set_target(&msg.userid);

        let to_self = msg.is_addressed_to(&self.local_id);

        if let Some(sdp) = msg.sdp.clone() {
            if to_self {
                match sdp.kind {
                    SdpKind::Offer => self.handle_offer(&msg.userid, sdp).await,
                    SdpKind::Answer => self.handle_answer(&msg.userid, sdp).await,
                }
            }
        }

        if let Some(candidate) = msg.candidate.clone() {
            if to_self {
                self.handle_candidate(&msg.userid, candidate).await;
            }
        }

        if msg.is_participation_request() && to_self {
            self.handle_participation_request(&msg.userid).await;
        }

        // broadcast адресата не несёт
        if msg.is_broadcast() {
            self.events.user_found(&msg.userid);
        }

        if msg.is_user_left() && to_self {
            self.handle_user_left(&msg.userid).await;
        }
    }

    /// Входящий offer: новая Answerer-сессия. Существующая сессия с этим
    /// участником заменяется — повторный offer означает новую попытку
    /// переговоров; исключение — скрещенные offer с обеих сторон, где
    /// уступает сторона с меньшим id.
    async fn handle_offer(&self, peer_id: &str, sdp: SessionDescription) {
        let existing = { self.registry.lock().unwrap().get(peer_id) };
        if let Some(existing) = &existing {
            if existing.role == NegotiationRole::Offerer {
                if self.local_id.as_str() > peer_id {
                    log(&format!(
                        "Offer collision with '{}': keeping own offer",
                        peer_id
                    ));
                    return;
                }
                log(&format!(
                    "Offer collision with '{}': yielding to remote offer",
                    peer_id
                ));
            }
        }

        let track = { self.local_track.lock().unwrap().clone() };
        let session = match self
            .create_session(peer_id, NegotiationRole::Answerer, track)
            .await
        {
            Ok(session) => session,
            Err(e) => {
                self.report_negotiation_error(peer_id, e);
                return;
            }
        };

        let replaced = { self.registry.lock().unwrap().insert(session.clone()) };
        if let Some(old) = replaced {
            self.retire_session(&old).await;
        }

        match session.start_answer(sdp).await {
            Ok(answer) => {
                // удалённое описание установлено — отложенные кандидаты применимы
                self.flush_candidates(peer_id).await;
                self.send_best_effort(SignalMessage::sdp(&self.local_id, peer_id, answer))
                    .await;
            }
            Err(e) => self.report_negotiation_error(peer_id, e),
        }
    }

    /// Входящий answer: применяется к существующей Offerer-сессии.
    /// Без неё — ошибка маршрутизации: логируется и отбрасывается.
    async fn handle_answer(&self, peer_id: &str, sdp: SessionDescription) {
        let session = { self.registry.lock().unwrap().get(peer_id) };
        let Some(session) = session else {
            log(&format!(
                "Answer from '{}' without a matching offer, dropping",
                peer_id
            ));
            return;
        };
        match session.accept_answer(sdp).await {
            Ok(()) => self.flush_candidates(peer_id).await,
            Err(NegotiationError::InvalidState { state, .. }) => {
                // повторный или несвоевременный answer — не ошибка переговоров
                log(&format!(
                    "Ignoring answer from '{}' in state {:?}",
                    peer_id, state
                ));
            }
            Err(e) => self.report_negotiation_error(peer_id, e),
        }
    }

    /// Входящий кандидат: применяется, когда соединение готово, иначе
    /// буферизуется. Кандидат неизвестного участника не теряется — буфер
    /// под него создаётся лениво.
    async fn handle_candidate(&self, peer_id: &str, candidate: IceCandidateInfo) {
        dump_candidate("REMOTE", &candidate);

        let session = { self.registry.lock().unwrap().get(peer_id) };
        if let Some(session) = session {
            if session.ready_for_candidates().await {
                // сначала отложенные, затем текущий — порядок поступления
                self.flush_candidates(peer_id).await;
                if let Err(e) = session.apply_candidate(candidate).await {
                    self.report_negotiation_error(peer_id, e);
                }
                return;
            }
        }

        let mut registry = self.registry.lock().unwrap();
        registry.buffers.enqueue(peer_id, candidate);
        log(&format!(
            "Candidate for '{}' queued, total {}",
            peer_id,
            registry.buffers.len(peer_id)
        ));
    }

    async fn handle_participation_request(&self, peer_id: &str) {
        log(&format!("Participation request from '{}'", peer_id));
        self.participant_found.store(true, Ordering::SeqCst);

        if self.events.has_participation_request_hook() {
            // приём (и его момент) — решение приложения
            self.events.participation_request(peer_id);
        } else if self.config.auto_accept {
            self.accept_request(peer_id).await;
        }
    }

    async fn handle_user_left(&self, peer_id: &str) {
        let (session, was_last) = {
            let mut registry = self.registry.lock().unwrap();
            let session = registry.remove(peer_id);
            (session, registry.is_empty())
        };
        let Some(session) = session else { return };

        log(&format!("User '{}' left, closing session", peer_id));
        self.retire_session(&session).await;

        if was_last {
            // последний собеседник вышел — отпускаем локальный медиатрек
            *self.local_track.lock().unwrap() = None;
        }
    }

    /// Реакция на смену связности конкретного соединения. Обрыв запускает
    /// восстановление: сессия сносится, приложению доставляется сигнал, и
    /// участнику уходит ровно один повторный запрос на участие — дальше
    /// переговоры начинаются заново обычным путём.
    async fn handle_link_state(&self, peer_id: &str, session: Arc<PeerSession>, state: LinkState) {
        match state {
            LinkState::Connected => session.mark_connected(),
            LinkState::Disconnected | LinkState::Failed => {
                if session.state() == NegotiationState::Closed {
                    return;
                }
                session.mark_disconnected();
                if !session.arm_recovery() {
                    return;
                }
                log(&format!(
                    "Connection with '{}' is {:?}, starting recovery",
                    peer_id, state
                ));

                // сносим только свою сессию: реестр мог уже отдать место новой
                let removed = {
                    let mut registry = self.registry.lock().unwrap();
                    match registry.get(peer_id) {
                        Some(current) if Arc::ptr_eq(&current, &session) => {
                            registry.remove(peer_id)
                        }
                        _ => None,
                    }
                };
                if let Some(removed) = removed {
                    self.retire_session(&removed).await;
                }

                self.events.disconnection(peer_id);
                self.send_best_effort(SignalMessage::participation_request(
                    &self.local_id,
                    peer_id,
                ))
                .await;
            }
            LinkState::Closed => {
                // закрытие инициируем мы сами при teardown
            }
            _ => {}
        }
    }

    // ========== ВНУТРЕННЕЕ ==========

    /// Создаёт соединение и сессию вокруг него. События соединения
    /// замыкаются на этот экземпляр через слабые ссылки: кандидаты уходят
    /// участнику сессии, треки и связность — обработчикам приложения.
    async fn create_session(
        &self,
        peer_id: &str,
        role: NegotiationRole,
        local_track: Option<LocalTrack>,
    ) -> Result<Arc<PeerSession>, NegotiationError> {
        // сессия появляется позже соединения, поэтому события состояния
        // добираются до неё через заполняемый после создания слот
        let session_slot: Arc<OnceLock<Weak<PeerSession>>> = Arc::new(OnceLock::new());

        let weak = self.weak_self.clone();
        let candidate_peer = peer_id.to_string();
        let on_candidate: CandidateSink = Box::new(move |candidate| {
            let Some(signaler) = weak.upgrade() else { return };
            let peer = candidate_peer.clone();
            tokio::spawn(async move {
                dump_candidate("LOCAL", &candidate);
                signaler
                    .send_best_effort(SignalMessage::candidate(
                        &signaler.local_id,
                        &peer,
                        candidate,
                    ))
                    .await;
            });
        });

        let weak = self.weak_self.clone();
        let track_slot = session_slot.clone();
        let on_track: TrackSink = Box::new(move |remote| {
            let Some(signaler) = weak.upgrade() else { return };
            if let Some(session) = track_slot.get().and_then(|s| s.upgrade()) {
                session.note_remote_track(remote.clone());
            }
            signaler.events.stream_added(remote);
        });

        let weak = self.weak_self.clone();
        let state_slot = session_slot.clone();
        let state_peer = peer_id.to_string();
        let on_state: LinkStateSink = Box::new(move |state| {
            let Some(signaler) = weak.upgrade() else { return };
            let Some(session) = state_slot.get().and_then(|s| s.upgrade()) else {
                return;
            };
            let peer = state_peer.clone();
            tokio::spawn(async move {
                signaler.handle_link_state(&peer, session, state).await;
            });
        });

        let link = self
            .connector
            .connect(
                peer_id,
                local_track,
                LinkHooks {
                    on_candidate,
                    on_track,
                    on_state,
                },
            )
            .await?;

        let session = PeerSession::new(peer_id.to_string(), role, link);
        let _ = session_slot.set(Arc::downgrade(&session));
        Ok(session)
    }

    /// Применяет отложенные кандидаты сессии; каждый — ровно один раз.
    async fn flush_candidates(&self, peer_id: &str) {
        let session = { self.registry.lock().unwrap().get(peer_id) };
        let Some(session) = session else { return };
        if !session.ready_for_candidates().await {
            return;
        }

        let pending = { self.registry.lock().unwrap().buffers.drain(peer_id) };
        if pending.is_empty() {
            return;
        }
        log(&format!(
            "Applying {} pending candidate(s) for '{}'",
            pending.len(),
            peer_id
        ));
        for candidate in pending {
            // неудачный кандидат не прерывает остальные
            if let Err(e) = session.apply_candidate(candidate).await {
                log(&format!(
                    "Failed to apply pending candidate for '{}': {}",
                    peer_id, e
                ));
            }
        }
    }

    /// Закрывает сессию и отдаёт приложению stream_ended по её трекам.
    async fn retire_session(&self, session: &Arc<PeerSession>) {
        for track in session.take_remote_tracks() {
            self.events.stream_ended(track);
        }
        session.shutdown().await;
    }

    fn report_negotiation_error(&self, peer_id: &str, error: NegotiationError) {
        log(&format!("Negotiation with '{}' failed: {}", peer_id, error));
        self.events.negotiation_error(peer_id, error);
    }

    async fn send_best_effort(&self, msg: SignalMessage) {
        if let Err(e) = self.transport.send(&msg).await {
            log(&format!("Relay send failed: {}", e));
        }
    }
}
