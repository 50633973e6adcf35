use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::devices::DeviceRegistry;
use crate::error::AppError;
use crate::events::EventBroadcaster;

/// Device category. Serialized as its integer discriminant (`0` = Lightbulb,
/// `1` = AirConditioner), matching what the frontend sends in query strings
/// and batch requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DeviceType {
    Lightbulb = 0,
    AirConditioner = 1,
}

impl From<DeviceType> for u8 {
    fn from(value: DeviceType) -> Self {
        value as u8
    }
}

impl TryFrom<u8> for DeviceType {
    type Error = AppError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(DeviceType::Lightbulb),
            1 => Ok(DeviceType::AirConditioner),
            other => Err(AppError::UnknownDeviceType(other)),
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceType::Lightbulb => write!(f, "Lightbulb"),
            DeviceType::AirConditioner => write!(f, "AirConditioner"),
        }
    }
}

/// One controllable unit. `is_on` is the only mutable field; everything else
/// is fixed at registry initialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: u32,
    pub name: String,
    pub is_on: bool,
    #[schema(value_type = u8)]
    pub device_type: DeviceType,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListDevicesQuery {
    /// Optional category filter (0 = Lightbulb, 1 = AirConditioner).
    #[serde(rename = "type")]
    #[param(rename = "type", value_type = Option<u8>)]
    pub device_type: Option<DeviceType>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchToggleRequest {
    #[schema(value_type = u8)]
    pub device_type: DeviceType,
    pub state: bool,
}

/// Accounting for one batch mutation. Never an error shape: an empty
/// candidate set or per-device failures are reported here, not as HTTP
/// failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchToggleResult {
    pub success: bool,
    pub devices_affected: usize,
    pub total_devices: usize,
    pub message: String,
    pub errors: Vec<String>,
}

/// Events pushed to subscribed viewers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// One device changed state; carries the full post-mutation record.
    DeviceStateChanged {
        device: Device,
        timestamp: DateTime<Utc>,
    },
    /// Full fleet snapshot, sent once when a viewer connects.
    DeviceList {
        devices: Vec<Device>,
        timestamp: DateTime<Utc>,
    },
}

impl ServerEvent {
    pub fn state_changed(device: Device) -> Self {
        Self::DeviceStateChanged {
            device,
            timestamp: Utc::now(),
        }
    }

    pub fn device_list(devices: Vec<Device>) -> Self {
        Self::DeviceList {
            devices,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ViewerSession {
    pub connected_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct AppState {
    pub registry: DeviceRegistry,
    pub broadcaster: EventBroadcaster,
    pub viewers: DashMap<Uuid, ViewerSession>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            registry: DeviceRegistry::with_default_fleet(),
            broadcaster: EventBroadcaster::new(),
            viewers: DashMap::new(),
        }
    }
}
