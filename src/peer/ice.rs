use std::collections::HashMap;

use crate::message::IceCandidateInfo;

/// Пер-peer FIFO буфер ICE-кандидатов, пришедших раньше, чем соединение
/// готово их принять (до установки удалённого описания).
///
/// Кандидат для неизвестного участника не теряется: буфер под его id
/// создаётся лениво. `drain` отдаёт кандидатов в порядке поступления и
/// очищает буфер — каждый кандидат применяется ровно один раз.
#[derive(Default)]
pub struct CandidateBuffer {
    pending: HashMap<String, Vec<IceCandidateInfo>>,
}

impl CandidateBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Отложить кандидат для участника.
    pub fn enqueue(&mut self, peer_id: &str, candidate: IceCandidateInfo) {
        self.pending
            .entry(peer_id.to_string())
            .or_default()
            .push(candidate);
    }

    /// Забрать все отложенные кандидаты участника в порядке поступления.
    /// Повторный вызов возвращает пустой список.
    pub fn drain(&mut self, peer_id: &str) -> Vec<IceCandidateInfo> {
        self.pending.remove(peer_id).unwrap_or_default()
    }

    pub fn clear(&mut self, peer_id: &str) {
        self.pending.remove(peer_id);
    }

    pub fn clear_all(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self, peer_id: &str) -> usize {
        self.pending.get(peer_id).map_or(0, |v| v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
