//! Centralized configuration management

use crate::types::{DeviceAddress, DEFAULT_MANUFACTURER_ID, DEFAULT_TARGET_ADDRESS};
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, mutex::Mutex};
use embassy_time::Duration;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    pub target_address: DeviceAddress,
    pub manufacturer_id: u16,
    /// Upper bound on scan + connect. The held-open phase is never bounded.
    pub attempt_timeout_ms: Option<u64>,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            target_address: DEFAULT_TARGET_ADDRESS,
            manufacturer_id: DEFAULT_MANUFACTURER_ID,
            attempt_timeout_ms: None,
        }
    }
}

impl AcquisitionConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn attempt_timeout(&self) -> Option<Duration> {
        self.attempt_timeout_ms.map(Duration::from_millis)
    }
}

/// Shared handle; each attempt takes a snapshot when it starts.
#[derive(Clone)]
pub struct ConfigManager {
    config: Arc<Mutex<CriticalSectionRawMutex, AcquisitionConfig>>,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new(AcquisitionConfig::default())
    }
}

impl ConfigManager {
    pub fn new(config: AcquisitionConfig) -> Self {
        Self {
            config: Arc::new(Mutex::new(config)),
        }
    }

    pub async fn get_config(&self) -> AcquisitionConfig {
        self.config.lock().await.clone()
    }

    pub async fn update_config<F>(&self, update_fn: F)
    where
        F: FnOnce(&mut AcquisitionConfig),
    {
        let mut config = self.config.lock().await;
        update_fn(&mut config);
    }
}
