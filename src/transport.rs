use async_trait::async_trait;

use crate::error::TransportError;
use crate::message::SignalMessage;

/// Pub/sub канал сигналинга, уже подключённый к моменту передачи сюда.
///
/// `send` — публикация fire-and-forget: доставка предполагается, порядок
/// между сообщениями разных видов не гарантируется. Входящий поток читает
/// ровно один потребитель — цикл диспетчеризации Signaler; канал обязан
/// доставлять отправителю и его собственные сообщения, если так устроен
/// нижележащий pub/sub (самоэхо отбрасывает уже диспетчер).
#[async_trait]
pub trait RelayTransport: Send + Sync {
    /// Опубликовать сообщение в канал.
    async fn send(&self, msg: &SignalMessage) -> Result<(), TransportError>;

    /// Получить следующее входящее сообщение; `None` — канал закрыт.
    async fn recv(&self) -> Option<SignalMessage>;
}
