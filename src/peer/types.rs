use serde::{Deserialize, Serialize};

/// Роль стороны в обмене SDP.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationRole {
    Offerer,
    Answerer,
}

/// Состояние переговоров одной peer-сессии.
///
/// Offerer проходит Created → LocalDescriptionSet → RemoteDescriptionSet,
/// Answerer — Created → RemoteDescriptionSet → LocalDescriptionSet
/// (удалённое описание известно у него с самого начала).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    Created,
    LocalDescriptionSet,
    RemoteDescriptionSet,
    Connected,
    Disconnected,
    Closed,
}

impl NegotiationState {
    /// Answer применим ровно один раз: только из LocalDescriptionSet.
    pub fn can_apply_answer(self) -> bool {
        matches!(self, NegotiationState::LocalDescriptionSet)
    }

    /// Closed — терминальное состояние, из него нет переходов.
    pub fn is_terminal(self) -> bool {
        matches!(self, NegotiationState::Closed)
    }
}

/// Дескриптор удалённого медиатрека, передаваемый приложению.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTrack {
    pub participant_id: String,
    pub track_id: String,
    pub stream_id: String,
    /// "audio" или "video".
    pub kind: String,
}
