use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::NegotiationError;
use crate::logger::log;
use crate::message::{IceCandidateInfo, SessionDescription};
use crate::peer::link::PeerLink;
use crate::peer::types::{NegotiationRole, NegotiationState, RemoteTrack};

/// Одна peer-сессия: роль, соединение и состояние переговоров.
///
/// Соединением сессия владеет монопольно; локальный медиатрек ей не
/// принадлежит (он приложения и раздаётся всем сессиям по Arc).
pub struct PeerSession {
    pub participant_id: String,
    pub role: NegotiationRole,
    link: Arc<dyn PeerLink>,
    state: Mutex<NegotiationState>,
    recovery_fired: AtomicBool,
    remote_tracks: Mutex<Vec<RemoteTrack>>,
}

impl PeerSession {
    pub fn new(
        participant_id: String,
        role: NegotiationRole,
        link: Arc<dyn PeerLink>,
    ) -> Arc<Self> {
        Arc::new(Self {
            participant_id,
            role,
            link,
            state: Mutex::new(NegotiationState::Created),
            recovery_fired: AtomicBool::new(false),
            remote_tracks: Mutex::new(Vec::new()),
        })
    }

    pub fn state(&self) -> NegotiationState {
        *self.state.lock().unwrap()
    }

    fn set_state(&self, next: NegotiationState) {
        let mut guard = self.state.lock().unwrap();
        if guard.is_terminal() {
            return;
        }
        log(&format!(
            "Session '{}': {:?} -> {:?}",
            self.participant_id, *guard, next
        ));
        *guard = next;
    }

    /// Offerer: генерирует offer. Created → LocalDescriptionSet.
    pub async fn start_offer(&self) -> Result<SessionDescription, NegotiationError> {
        let offer = self.link.create_offer().await?;
        self.set_state(NegotiationState::LocalDescriptionSet);
        Ok(offer)
    }

    /// Answerer: принимает offer и генерирует answer.
    /// Created → RemoteDescriptionSet → LocalDescriptionSet.
    pub async fn start_answer(
        &self,
        offer: SessionDescription,
    ) -> Result<SessionDescription, NegotiationError> {
        self.link.apply_remote_offer(offer).await?;
        self.set_state(NegotiationState::RemoteDescriptionSet);
        let answer = self.link.create_answer().await?;
        self.set_state(NegotiationState::LocalDescriptionSet);
        Ok(answer)
    }

    /// Offerer: применяет answer удалённой стороны.
    /// Допустим ровно один раз, из LocalDescriptionSet; повторный answer
    /// отклоняется без изменения состояния.
    pub async fn accept_answer(
        &self,
        answer: SessionDescription,
    ) -> Result<(), NegotiationError> {
        let state = self.state();
        if self.role != NegotiationRole::Offerer || !state.can_apply_answer() {
            return Err(NegotiationError::InvalidState {
                peer: self.participant_id.clone(),
                state,
                action: "apply answer",
            });
        }
        self.link.apply_remote_answer(answer).await?;
        self.set_state(NegotiationState::RemoteDescriptionSet);
        Ok(())
    }

    /// Готово ли соединение принимать кандидатов.
    pub async fn ready_for_candidates(&self) -> bool {
        self.link.has_remote_description().await
    }

    pub async fn apply_candidate(
        &self,
        candidate: IceCandidateInfo,
    ) -> Result<(), NegotiationError> {
        self.link.add_remote_candidate(candidate).await
    }

    pub fn mark_connected(&self) {
        self.set_state(NegotiationState::Connected);
    }

    pub fn mark_disconnected(&self) {
        self.set_state(NegotiationState::Disconnected);
    }

    /// true только при первом вызове: восстановление после обрыва
    /// запускается не больше одного раза на сессию.
    pub fn arm_recovery(&self) -> bool {
        !self.recovery_fired.swap(true, Ordering::SeqCst)
    }

    /// Запомнить удалённый трек, чтобы отдать stream_ended при закрытии сессии.
    pub fn note_remote_track(&self, track: RemoteTrack) {
        self.remote_tracks.lock().unwrap().push(track);
    }

    pub fn take_remote_tracks(&self) -> Vec<RemoteTrack> {
        std::mem::take(&mut *self.remote_tracks.lock().unwrap())
    }

    /// Закрывает соединение; состояние становится терминальным.
    pub async fn shutdown(&self) {
        {
            let mut guard = self.state.lock().unwrap();
            *guard = NegotiationState::Closed;
        }
        self.link.close().await;
    }
}
