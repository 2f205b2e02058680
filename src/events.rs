use crate::error::NegotiationError;
use crate::peer::types::RemoteTrack;

type UserHook = Box<dyn Fn(&str) + Send + Sync>;
type TrackHook = Box<dyn Fn(RemoteTrack) + Send + Sync>;
type ErrorHook = Box<dyn Fn(&str, NegotiationError) + Send + Sync>;

/// Колбэки приложения. Все необязательные; вызываются синхронно из цикла
/// диспетчеризации, тяжёлую работу обработчик запускает сам через spawn.
#[derive(Default)]
pub struct SignalerEvents {
    on_user_found: Option<UserHook>,
    on_participation_request: Option<UserHook>,
    on_stream_added: Option<TrackHook>,
    on_stream_ended: Option<TrackHook>,
    on_disconnection: Option<UserHook>,
    on_negotiation_error: Option<ErrorHook>,
}

impl SignalerEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Замечен вещающий участник. Сам по себе переговоров не начинает —
    /// решение (послать запрос на участие) за приложением.
    pub fn on_user_found(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_user_found = Some(Box::new(hook));
        self
    }

    /// Пришёл запрос на участие. Зарегистрированный обработчик отменяет
    /// автоприём: принимать ли и когда — решает он сам через accept_request.
    pub fn on_participation_request(
        mut self,
        hook: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        self.on_participation_request = Some(Box::new(hook));
        self
    }

    /// Появился удалённый медиатрек.
    pub fn on_stream_added(
        mut self,
        hook: impl Fn(RemoteTrack) + Send + Sync + 'static,
    ) -> Self {
        self.on_stream_added = Some(Box::new(hook));
        self
    }

    /// Удалённый медиатрек пропал (сессия с его участником закрыта).
    pub fn on_stream_ended(
        mut self,
        hook: impl Fn(RemoteTrack) + Send + Sync + 'static,
    ) -> Self {
        self.on_stream_ended = Some(Box::new(hook));
        self
    }

    /// Соединение с участником оборвалось. Повторный запрос на участие
    /// движок отправляет сам (ровно один на сессию); обработчик — только
    /// уведомление, слать запрос из него не нужно.
    pub fn on_disconnection(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_disconnection = Some(Box::new(hook));
        self
    }

    /// Ошибка переговоров: offer/answer/кандидат не создались или не применились.
    pub fn on_negotiation_error(
        mut self,
        hook: impl Fn(&str, NegotiationError) + Send + Sync + 'static,
    ) -> Self {
        self.on_negotiation_error = Some(Box::new(hook));
        self
    }

    pub(crate) fn user_found(&self, id: &str) {
        if let Some(hook) = &self.on_user_found {
            hook(id);
        }
    }

    pub(crate) fn has_participation_request_hook(&self) -> bool {
        self.on_participation_request.is_some()
    }

    pub(crate) fn participation_request(&self, id: &str) {
        if let Some(hook) = &self.on_participation_request {
            hook(id);
        }
    }

    pub(crate) fn stream_added(&self, track: RemoteTrack) {
        if let Some(hook) = &self.on_stream_added {
            hook(track);
        }
    }

    pub(crate) fn stream_ended(&self, track: RemoteTrack) {
        if let Some(hook) = &self.on_stream_ended {
            hook(track);
        }
    }

    pub(crate) fn disconnection(&self, id: &str) {
        if let Some(hook) = &self.on_disconnection {
            hook(id);
        }
    }

    pub(crate) fn negotiation_error(&self, id: &str, error: NegotiationError) {
        if let Some(hook) = &self.on_negotiation_error {
            hook(id, error);
        }
    }
}
