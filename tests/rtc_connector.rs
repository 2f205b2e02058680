//! Переговоры через настоящий WebRTC-стек поверх шины в памяти.
//! Устойчивость связности здесь не проверяется — только то, что SDP и
//! кандидаты доходят и применяются без участия моков.

use std::sync::Arc;

use webrtc::api::media_engine::MIME_TYPE_VP8;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

use sscall::mock::{wait_until, MemoryBus};
use sscall::{
    ConfigError, IceServerConfig, LocalTrack, NegotiationRole, NegotiationState, RtcConnector,
    Signaler, SignalerConfig, SignalerEvents,
};

fn test_track() -> LocalTrack {
    Arc::new(TrackLocalStaticSample::new(
        RTCRtpCodecCapability {
            mime_type: MIME_TYPE_VP8.to_owned(),
            ..Default::default()
        },
        "video".to_owned(),
        "call-stream".to_owned(),
    ))
}

fn config(id: &str) -> SignalerConfig {
    SignalerConfig {
        local_id: Some(id.into()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_real_stack_offer_answer_over_bus() {
    let bus = MemoryBus::new();

    let a = Signaler::start(
        bus.endpoint(),
        RtcConnector::new(vec![]).unwrap(),
        config("aaa"),
        SignalerEvents::new(),
    );
    a.add_track(test_track());

    let b = Signaler::start(
        bus.endpoint(),
        RtcConnector::new(vec![]).unwrap(),
        config("bbb"),
        SignalerEvents::new(),
    );
    b.add_track(test_track());

    b.send_participation_request("aaa").await.unwrap();

    // локальный ICE может успеть соединиться, поэтому Connected тоже допустим
    assert!(
        wait_until(|| {
            matches!(
                a.session_state("bbb"),
                Some(NegotiationState::RemoteDescriptionSet | NegotiationState::Connected)
            )
        })
        .await,
        "offerer never applied the remote answer"
    );
    assert!(
        wait_until(|| {
            matches!(
                b.session_state("aaa"),
                Some(NegotiationState::LocalDescriptionSet | NegotiationState::Connected)
            )
        })
        .await,
        "answerer never produced a local answer"
    );
    assert_eq!(a.session_role("bbb"), Some(NegotiationRole::Offerer));
    assert_eq!(b.session_role("aaa"), Some(NegotiationRole::Answerer));
    assert_eq!(a.session_count(), 1);
    assert_eq!(b.session_count(), 1);

    a.close().await;
    assert!(wait_until(|| b.session_count() == 0).await);
}

#[test]
fn test_connector_rejects_invalid_ice_config() {
    let turn_without_creds = IceServerConfig {
        r#type: "turn".into(),
        url: "turn.example.com:3478".into(),
        username: None,
        credential: None,
    };
    assert!(matches!(
        RtcConnector::new(vec![turn_without_creds]),
        Err(ConfigError::TurnWithoutCredentials(_))
    ));
    assert!(matches!(
        RtcConnector::new(vec![IceServerConfig::stun("")]),
        Err(ConfigError::EmptyIceUrl)
    ));
    assert!(RtcConnector::new(vec![
        IceServerConfig::stun("stun.example.com:3478"),
        IceServerConfig::turn("turn.example.com:3478", "user", "pass"),
    ])
    .is_ok());
}
