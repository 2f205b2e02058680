use crate::message::IceCandidateInfo;

/// Логирование с временными метками
pub fn log(msg: &str) {
    // Проверяем конфигурацию логирования
    if crate::config::LOGGING_ENABLED {
        #[cfg(debug_assertions)]
        {
            // В режиме разработки дополнительно проверяем dev::ENABLE_LOGGING
            if !crate::config::dev::ENABLE_LOGGING {
                return;
            }
        }

        let now = chrono::Local::now();
        println!("SSCALL: [{}] {}", now.format("%Y-%m-%d %H:%M:%S%.3f"), msg);
    }
}

/// Печать ICE-кандидата при появлении (Trickle-ICE)
pub fn dump_candidate(label: &str, cand: &IceCandidateInfo) {
    log(&format!(
        "Trickle {label}: candidate={} sdp_mid={:?} sdp_mline_index={:?}",
        cand.candidate, cand.sdp_mid, cand.sdp_mline_index
    ));
}
