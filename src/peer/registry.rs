use std::collections::HashMap;
use std::sync::Arc;

use crate::peer::ice::CandidateBuffer;
use crate::peer::session::PeerSession;

/// Владелец активных peer-сессий и их буферов кандидатов.
///
/// Структурно допускает несколько сессий, но активный адресат исходящих
/// сообщений один — `current_target`, последний увиденный удалённый id.
/// Одна активная сессия на экземпляр — осознанное ограничение дизайна,
/// карта остаётся точкой расширения для multi-peer.
#[derive(Default)]
pub struct PeerRegistry {
    sessions: HashMap<String, Arc<PeerSession>>,
    pub buffers: CandidateBuffer,
    current_target: Option<String>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Регистрирует сессию; существующая под тем же id возвращается
    /// вызывающему (буфер кандидатов при замене сохраняется — он относится
    /// к участнику, а не к конкретной попытке переговоров).
    pub fn insert(&mut self, session: Arc<PeerSession>) -> Option<Arc<PeerSession>> {
        self.sessions
            .insert(session.participant_id.clone(), session)
    }

    pub fn get(&self, id: &str) -> Option<Arc<PeerSession>> {
        self.sessions.get(id).cloned()
    }

    /// Удаляет сессию вместе с её отложенными кандидатами.
    pub fn remove(&mut self, id: &str) -> Option<Arc<PeerSession>> {
        self.buffers.clear(id);
        self.sessions.remove(id)
    }

    /// Забирает все сессии, очищая реестр и буферы.
    pub fn take_all(&mut self) -> Vec<Arc<PeerSession>> {
        self.buffers.clear_all();
        self.sessions.drain().map(|(_, s)| s).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn set_target(&mut self, id: &str) {
        self.current_target = Some(id.to_string());
    }

    pub fn target(&self) -> Option<String> {
        self.current_target.clone()
    }

    pub fn clear_target(&mut self) {
        self.current_target = None;
    }
}
