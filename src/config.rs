// Конфигурация библиотеки
// Логирование можно отключить только в режиме разработки

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigError;

#[cfg(debug_assertions)]
pub const LOGGING_ENABLED: bool = true; // В режиме отладки логирование включено

#[cfg(not(debug_assertions))]
pub const LOGGING_ENABLED: bool = false; // В продакшене логирование отключено

// Дополнительные настройки для режима разработки
#[cfg(debug_assertions)]
pub mod dev {
    // Для полного отключения логирования в режиме разработки
    // измените эту константу на false
    // ВАЖНО: Эта настройка работает только в debug режиме!
    pub const ENABLE_LOGGING: bool = true;
}

#[cfg(not(debug_assertions))]
pub mod dev {
    // В продакшене все дополнительные настройки отключены
    pub const ENABLE_LOGGING: bool = false;
}

/// Интервал повторной рассылки broadcast при поиске собеседника.
pub const BROADCAST_INTERVAL: Duration = Duration::from_millis(3000);

/// Конфигурация ICE сервера
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct IceServerConfig {
    pub r#type: String, // 'stun' or 'turn'
    pub url: String,
    pub username: Option<String>,
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(url: &str) -> Self {
        Self {
            r#type: "stun".into(),
            url: url.into(),
            username: None,
            credential: None,
        }
    }

    pub fn turn(url: &str, username: &str, credential: &str) -> Self {
        Self {
            r#type: "turn".into(),
            url: url.into(),
            username: Some(username.into()),
            credential: Some(credential.into()),
        }
    }
}

/// Валидация конфигурации ICE сервера перед использованием
pub fn validate_ice_server(server: &IceServerConfig) -> Result<(), ConfigError> {
    if server.url.is_empty() {
        return Err(ConfigError::EmptyIceUrl);
    }
    if server.r#type == "turn" && (server.username.is_none() || server.credential.is_none()) {
        return Err(ConfigError::TurnWithoutCredentials(server.url.clone()));
    }
    Ok(())
}

/// Настройки одного экземпляра Signaler.
#[derive(Debug, Clone)]
pub struct SignalerConfig {
    /// Идентификатор локального участника; если не задан — генерируется случайный.
    pub local_id: Option<String>,
    /// ICE серверы; пустой список означает дефолтные STUN.
    pub ice_servers: Vec<IceServerConfig>,
    /// Интервал повторного broadcast.
    pub broadcast_interval: Duration,
    /// Принимать ли запрос на участие автоматически, когда обработчик
    /// не зарегистрирован.
    pub auto_accept: bool,
}

impl Default for SignalerConfig {
    fn default() -> Self {
        Self {
            local_id: None,
            ice_servers: Vec::new(),
            broadcast_interval: BROADCAST_INTERVAL,
            auto_accept: true,
        }
    }
}
