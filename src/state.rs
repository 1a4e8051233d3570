//! Shared application state
//!
//! One `AppState` is created at startup and shared by every request. It
//! holds the validated configuration, the provider collaborators used by
//! every session and the WebSocket connection counters.

use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use tracing::{debug, info};

use crate::config::ServerConfig;
use crate::core::conversation::{Collaborators, SessionSettings};
use crate::core::llm::{LLMError, create_llm_provider};
use crate::core::stt::{STTError, create_stt_provider};
use crate::core::tts::{TTSError, create_tts_provider};

/// Reason a WebSocket connection was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionLimitError {
    GlobalLimitReached,
    PerIpLimitReached,
}

/// Provider construction failures at startup
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("STT provider: {0}")]
    Stt(#[from] STTError),
    #[error("LLM provider: {0}")]
    Llm(#[from] LLMError),
    #[error("TTS provider: {0}")]
    Tts(#[from] TTSError),
}

pub struct AppState {
    pub config: ServerConfig,
    pub collaborators: Collaborators,
    pub session_settings: Arc<SessionSettings>,

    ws_connections: AtomicUsize,
    connections_per_ip: DashMap<IpAddr, u32>,
}

impl AppState {
    /// Build the providers named in `config` and wrap everything for sharing.
    pub fn new(config: ServerConfig) -> Result<Arc<Self>, StartupError> {
        let stt = create_stt_provider(&config.stt_provider, config.stt_config())?;
        let llm = create_llm_provider(&config.llm_provider, config.llm_config())?;
        let tts = create_tts_provider(&config.tts_provider, config.tts_config())?;

        info!(
            stt = stt.provider_name(),
            llm = llm.provider_name(),
            tts = tts.provider_name(),
            "Providers initialized"
        );

        let collaborators = Collaborators {
            stt: Arc::from(stt),
            llm: Arc::from(llm),
            tts: Arc::from(tts),
        };
        Ok(Self::with_collaborators(config, collaborators))
    }

    /// Use already constructed collaborators instead of the configured providers.
    pub fn with_collaborators(config: ServerConfig, collaborators: Collaborators) -> Arc<Self> {
        let session_settings = Arc::new(config.session_settings());
        Arc::new(Self {
            config,
            collaborators,
            session_settings,
            ws_connections: AtomicUsize::new(0),
            connections_per_ip: DashMap::new(),
        })
    }

    /// Reserve a WebSocket slot for `ip`, enforcing the global and per-IP limits.
    pub fn try_acquire_connection(&self, ip: IpAddr) -> Result<(), ConnectionLimitError> {
        // The per-IP entry lock serializes acquisitions from the same address.
        let mut per_ip = self.connections_per_ip.entry(ip).or_insert(0);
        let rejection = if *per_ip >= self.config.max_connections_per_ip {
            Some(ConnectionLimitError::PerIpLimitReached)
        } else if !self.reserve_global_slot() {
            Some(ConnectionLimitError::GlobalLimitReached)
        } else {
            None
        };

        if let Some(rejection) = rejection {
            drop(per_ip);
            self.connections_per_ip.remove_if(&ip, |_, count| *count == 0);
            return Err(rejection);
        }

        *per_ip += 1;
        debug!(ip = %ip, per_ip = *per_ip, "Connection slot acquired");
        Ok(())
    }

    fn reserve_global_slot(&self) -> bool {
        match self.config.max_websocket_connections {
            Some(max) => self
                .ws_connections
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                    (current < max).then_some(current + 1)
                })
                .is_ok(),
            None => {
                self.ws_connections.fetch_add(1, Ordering::AcqRel);
                true
            }
        }
    }

    /// Release a slot taken by [`try_acquire_connection`](Self::try_acquire_connection).
    pub fn release_connection(&self, ip: IpAddr) {
        let _ = self
            .ws_connections
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                current.checked_sub(1)
            });
        self.connections_per_ip
            .remove_if_mut(&ip, |_, count| {
                *count = count.saturating_sub(1);
                *count == 0
            });
    }

    pub fn ws_connection_count(&self) -> usize {
        self.ws_connections.load(Ordering::Acquire)
    }

    pub fn connections_from(&self, ip: IpAddr) -> u32 {
        self.connections_per_ip.get(&ip).map(|c| *c).unwrap_or(0)
    }
}
