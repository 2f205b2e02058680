use async_trait::async_trait;
use std::sync::Arc;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::APIBuilder;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::policy::bundle_policy::RTCBundlePolicy;
use webrtc::peer_connection::policy::rtcp_mux_policy::RTCRtcpMuxPolicy;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::track::track_remote::TrackRemote;

use crate::config::{validate_ice_server, IceServerConfig};
use crate::error::{ConfigError, NegotiationError};
use crate::logger::log;
use crate::message::{IceCandidateInfo, SdpKind, SessionDescription};
use crate::peer::link::{LinkHooks, LinkState, LocalTrack, PeerConnector, PeerLink};
use crate::peer::types::RemoteTrack;
use crate::utils::add_ice_url_scheme;

/// Фабрика настоящих WebRTC-соединений поверх крейта webrtc.
pub struct RtcConnector {
    ice_servers: Vec<IceServerConfig>,
}

impl RtcConnector {
    /// Проверяет конфигурацию серверов; пустой список означает дефолтные STUN.
    pub fn new(ice_servers: Vec<IceServerConfig>) -> Result<Arc<Self>, ConfigError> {
        for server in &ice_servers {
            validate_ice_server(server)?;
        }
        Ok(Arc::new(Self { ice_servers }))
    }

    /// Создает конфигурацию для peer connection
    fn rtc_config(&self) -> RTCConfiguration {
        let ice_servers = if self.ice_servers.is_empty() {
            // Дефолтные серверы
            vec![RTCIceServer {
                urls: vec![
                    "stun:stun.l.google.com:19302".into(),
                    "stun:stun1.l.google.com:19302".into(),
                ],
                ..Default::default()
            }]
        } else {
            self.ice_servers
                .iter()
                .map(|config| RTCIceServer {
                    urls: vec![add_ice_url_scheme(config)],
                    username: config.username.clone().unwrap_or_default(),
                    credential: config.credential.clone().unwrap_or_default(),
                })
                .collect()
        };

        RTCConfiguration {
            ice_servers,
            // Более агрессивные настройки ICE
            ice_candidate_pool_size: 10,
            bundle_policy: RTCBundlePolicy::MaxBundle,
            rtcp_mux_policy: RTCRtcpMuxPolicy::Require,
            ..Default::default()
        }
    }
}

#[async_trait]
impl PeerConnector for RtcConnector {
    async fn connect(
        &self,
        participant_id: &str,
        local_track: Option<LocalTrack>,
        hooks: LinkHooks,
    ) -> Result<Arc<dyn PeerLink>, NegotiationError> {
        let mut media = MediaEngine::default();
        media
            .register_default_codecs()
            .map_err(|e| NegotiationError::LinkSetup(e.to_string()))?;
        let mut registry = Registry::new();
        registry = register_default_interceptors(registry, &mut media)
            .map_err(|e| NegotiationError::LinkSetup(e.to_string()))?;
        let api = APIBuilder::new()
            .with_media_engine(media)
            .with_interceptor_registry(registry)
            .build();

        let pc = Arc::new(
            api.new_peer_connection(self.rtc_config())
                .await
                .map_err(|e| NegotiationError::LinkSetup(e.to_string()))?,
        );

        // Локальный медиатрек (если есть) раздаётся соединению сразу
        if let Some(track) = local_track {
            pc.add_track(track)
                .await
                .map_err(|e| NegotiationError::LinkSetup(e.to_string()))?;
        }

        // Обработчик локальных кандидатов (Trickle-ICE)
        let on_candidate = hooks.on_candidate;
        pc.on_ice_candidate(Box::new(move |cand: Option<RTCIceCandidate>| {
            if let Some(c) = cand {
                match c.to_json() {
                    Ok(init) => on_candidate(IceCandidateInfo {
                        candidate: init.candidate,
                        sdp_mid: init.sdp_mid,
                        sdp_mline_index: init.sdp_mline_index,
                    }),
                    Err(e) => log(&format!("Candidate to_json failed: {e:?}")),
                }
            } else {
                // cand == None означает конец сбора
                log("ICE candidate gathering completed (null candidate received)");
            }
            Box::pin(async {})
        }));

        // Обработчик удалённых треков
        let on_track = hooks.on_track;
        let track_peer = participant_id.to_string();
        pc.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                log(&format!(
                    "Remote track: kind={} id={}",
                    track.kind(),
                    track.id()
                ));
                on_track(RemoteTrack {
                    participant_id: track_peer.clone(),
                    track_id: track.id(),
                    stream_id: track.stream_id(),
                    kind: track.kind().to_string(),
                });
                Box::pin(async {})
            },
        ));

        // Наблюдение за связностью: обрыв и восстановление видит владелец сессии
        let on_state = hooks.on_state;
        pc.on_peer_connection_state_change(Box::new(move |st: RTCPeerConnectionState| {
            log(&format!("Peer connection state changed to: {:?}", st));
            match st {
                RTCPeerConnectionState::Connecting => on_state(LinkState::Connecting),
                RTCPeerConnectionState::Connected => on_state(LinkState::Connected),
                RTCPeerConnectionState::Disconnected => on_state(LinkState::Disconnected),
                RTCPeerConnectionState::Failed => on_state(LinkState::Failed),
                RTCPeerConnectionState::Closed => on_state(LinkState::Closed),
                _ => {}
            }
            Box::pin(async {})
        }));

        Ok(Arc::new(RtcLink { pc }))
    }
}

/// Соединение поверх RTCPeerConnection.
pub struct RtcLink {
    pc: Arc<RTCPeerConnection>,
}

#[async_trait]
impl PeerLink for RtcLink {
    async fn create_offer(&self) -> Result<SessionDescription, NegotiationError> {
        let offer = self
            .pc
            .create_offer(None)
            .await
            .map_err(|e| NegotiationError::OfferFailed(e.to_string()))?;
        self.pc
            .set_local_description(offer)
            .await
            .map_err(|e| NegotiationError::OfferFailed(e.to_string()))?;
        // отдаём именно то описание, что легло локальным
        let local = self.pc.local_description().await.ok_or_else(|| {
            NegotiationError::OfferFailed("local description missing after set".into())
        })?;
        Ok(SessionDescription {
            kind: SdpKind::Offer,
            sdp: local.sdp,
        })
    }

    async fn apply_remote_offer(
        &self,
        offer: SessionDescription,
    ) -> Result<(), NegotiationError> {
        let desc = RTCSessionDescription::offer(offer.sdp)
            .map_err(|e| NegotiationError::RemoteDescription(e.to_string()))?;
        self.pc
            .set_remote_description(desc)
            .await
            .map_err(|e| NegotiationError::RemoteDescription(e.to_string()))
    }

    async fn create_answer(&self) -> Result<SessionDescription, NegotiationError> {
        let answer = self
            .pc
            .create_answer(None)
            .await
            .map_err(|e| NegotiationError::AnswerFailed(e.to_string()))?;
        self.pc
            .set_local_description(answer)
            .await
            .map_err(|e| NegotiationError::AnswerFailed(e.to_string()))?;
        let local = self.pc.local_description().await.ok_or_else(|| {
            NegotiationError::AnswerFailed("local description missing after set".into())
        })?;
        Ok(SessionDescription {
            kind: SdpKind::Answer,
            sdp: local.sdp,
        })
    }

    async fn apply_remote_answer(
        &self,
        answer: SessionDescription,
    ) -> Result<(), NegotiationError> {
        let desc = RTCSessionDescription::answer(answer.sdp)
            .map_err(|e| NegotiationError::RemoteDescription(e.to_string()))?;
        self.pc
            .set_remote_description(desc)
            .await
            .map_err(|e| NegotiationError::RemoteDescription(e.to_string()))
    }

    async fn add_remote_candidate(
        &self,
        candidate: IceCandidateInfo,
    ) -> Result<(), NegotiationError> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_mline_index,
            username_fragment: None,
        };
        self.pc
            .add_ice_candidate(init)
            .await
            .map_err(|e| NegotiationError::Candidate(e.to_string()))
    }

    async fn has_remote_description(&self) -> bool {
        self.pc.remote_description().await.is_some()
    }

    async fn close(&self) {
        if let Err(e) = self.pc.close().await {
            log(&format!("Peer connection close failed: {e:?}"));
        }
    }
}
