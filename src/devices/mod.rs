// devices/mod.rs

//! In-memory device registry: the single authoritative copy of fleet state.
//!
//! All mutation flows through [`DeviceRegistry::flip`] and
//! [`DeviceRegistry::set_states`]; both run their read-modify-write under one
//! write lock, so concurrent readers see either the state before a mutation
//! or after it, never a half-applied batch.

use tokio::sync::RwLock;
use tracing::debug;

use crate::error::AppError;
use crate::models::{Device, DeviceType};

#[derive(Debug)]
pub struct DeviceRegistry {
    devices: RwLock<Vec<Device>>,
}

impl DeviceRegistry {
    pub fn new(seed: Vec<Device>) -> Self {
        Self {
            devices: RwLock::new(seed),
        }
    }

    /// Two lightbulbs and two air conditioners, everything off.
    pub fn with_default_fleet() -> Self {
        Self::new(vec![
            Device {
                id: 1,
                name: "Light1".to_string(),
                is_on: false,
                device_type: DeviceType::Lightbulb,
            },
            Device {
                id: 2,
                name: "Light2".to_string(),
                is_on: false,
                device_type: DeviceType::Lightbulb,
            },
            Device {
                id: 3,
                name: "AirCon1".to_string(),
                is_on: false,
                device_type: DeviceType::AirConditioner,
            },
            Device {
                id: 4,
                name: "AirCon2".to_string(),
                is_on: false,
                device_type: DeviceType::AirConditioner,
            },
        ])
    }

    /// Snapshot of the whole fleet in insertion order.
    pub async fn list_all(&self) -> Vec<Device> {
        self.devices.read().await.clone()
    }

    /// Devices of one category, insertion order preserved. An empty result is
    /// a normal outcome, not an error.
    pub async fn list_by_type(&self, device_type: DeviceType) -> Vec<Device> {
        self.devices
            .read()
            .await
            .iter()
            .filter(|d| d.device_type == device_type)
            .cloned()
            .collect()
    }

    pub async fn get(&self, id: u32) -> Option<Device> {
        self.devices.read().await.iter().find(|d| d.id == id).cloned()
    }

    /// Flips `is_on` for the device with `id` and returns the post-mutation
    /// record, or `None` for an unknown id. The read of the current value and
    /// the write of its negation share one critical section.
    pub async fn flip(&self, id: u32) -> Option<Device> {
        let mut devices = self.devices.write().await;
        let device = devices.iter_mut().find(|d| d.id == id)?;
        device.is_on = !device.is_on;
        debug!(id, is_on = device.is_on, "device state flipped");
        Some(device.clone())
    }

    /// Sets `is_on` for every listed id inside a single write section. Results
    /// are per-id so one failed id cannot abort the rest of the batch.
    pub async fn set_states(&self, ids: &[u32], is_on: bool) -> Vec<Result<Device, AppError>> {
        let mut devices = self.devices.write().await;
        ids.iter()
            .map(|&id| match devices.iter_mut().find(|d| d.id == id) {
                Some(device) => {
                    device.is_on = is_on;
                    Ok(device.clone())
                }
                None => Err(AppError::DeviceNotFound(id)),
            })
            .collect()
    }
}
