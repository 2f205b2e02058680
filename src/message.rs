use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// Тип SDP-описания.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    Offer,
    Answer,
}

/// SDP-полезная нагрузка сообщения сигналинга.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpKind,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Answer,
            sdp: sdp.into(),
        }
    }
}

/// ICE-кандидат в проводном формате.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IceCandidateInfo {
    pub candidate: String,
    #[serde(rename = "sdpMid", skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(rename = "sdpMLineIndex", skip_serializing_if = "Option::is_none")]
    pub sdp_mline_index: Option<u16>,
}

/// Сообщение сигналинга. Вид сообщения определяется присутствием полей,
/// отдельного тега типа нет: broadcast несёт `broadcasting`, запрос на
/// участие — `participationRequest`, и так далее. Отсутствующие поля
/// не сериализуются.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct SignalMessage {
    pub userid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broadcasting: Option<bool>,
    #[serde(
        rename = "participationRequest",
        skip_serializing_if = "Option::is_none"
    )]
    pub participation_request: Option<bool>,
    #[serde(rename = "userLeft", skip_serializing_if = "Option::is_none")]
    pub user_left: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sdp: Option<SessionDescription>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate: Option<IceCandidateInfo>,
}

impl SignalMessage {
    /// Периодическое самообъявление; единственное сообщение без адресата.
    pub fn broadcast(from: &str) -> Self {
        Self {
            userid: from.to_string(),
            broadcasting: Some(true),
            ..Default::default()
        }
    }

    /// Запрос на участие в сеансе вещающего участника.
    pub fn participation_request(from: &str, to: &str) -> Self {
        Self {
            userid: from.to_string(),
            to: Some(to.to_string()),
            participation_request: Some(true),
            ..Default::default()
        }
    }

    /// SDP offer или answer для адресата.
    pub fn sdp(from: &str, to: &str, desc: SessionDescription) -> Self {
        Self {
            userid: from.to_string(),
            to: Some(to.to_string()),
            sdp: Some(desc),
            ..Default::default()
        }
    }

    /// ICE-кандидат для адресата (Trickle-ICE).
    pub fn candidate(from: &str, to: &str, candidate: IceCandidateInfo) -> Self {
        Self {
            userid: from.to_string(),
            to: Some(to.to_string()),
            candidate: Some(candidate),
            ..Default::default()
        }
    }

    /// Уведомление о выходе из сеанса.
    pub fn user_left(from: &str, to: &str) -> Self {
        Self {
            userid: from.to_string(),
            to: Some(to.to_string()),
            user_left: Some(true),
            ..Default::default()
        }
    }

    pub fn is_addressed_to(&self, id: &str) -> bool {
        self.to.as_deref() == Some(id)
    }

    pub fn is_broadcast(&self) -> bool {
        self.broadcasting.unwrap_or(false)
    }

    pub fn is_participation_request(&self) -> bool {
        self.participation_request.unwrap_or(false)
    }

    pub fn is_user_left(&self) -> bool {
        self.user_left.unwrap_or(false)
    }

    /// Сериализация в проводной JSON.
    pub fn to_json(&self) -> Result<String, TransportError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Разбор входящего JSON.
    pub fn from_json(raw: &str) -> Result<Self, TransportError> {
        Ok(serde_json::from_str(raw)?)
    }
}
