// commands/mod.rs

//! Mutation engine: single-device toggle and batch state application.
//!
//! Neither operation notifies viewers; announcing confirmed changes is the
//! caller's job (see `events::announce`).

use tracing::debug;

use crate::devices::DeviceRegistry;
use crate::models::{BatchToggleResult, Device, DeviceType};

/// Outcome of a batch mutation: the wire-facing accounting plus the
/// post-mutation records of every device that was actually updated, in
/// registry order.
#[derive(Debug)]
pub struct BatchApplied {
    pub outcome: BatchToggleResult,
    pub changed: Vec<Device>,
}

/// Flips the device with `id`. Returns the post-mutation record, or `None`
/// when the id is unknown (a normal negative result, not a fault).
pub async fn toggle_device(registry: &DeviceRegistry, id: u32) -> Option<Device> {
    registry.flip(id).await
}

/// Sets `is_on = state` on every device of `device_type`.
///
/// Candidates are snapshotted once at call start; each is then updated
/// independently, and a per-device failure is recorded without aborting the
/// rest. Writing a state a device already holds still counts as a success:
/// batches have set semantics, not toggle semantics. Zero candidates is a
/// structured failure result, not an error.
pub async fn batch_set(
    registry: &DeviceRegistry,
    device_type: DeviceType,
    state: bool,
) -> BatchApplied {
    let candidates = registry.list_by_type(device_type).await;
    let total_devices = candidates.len();

    let ids: Vec<u32> = candidates.iter().map(|d| d.id).collect();
    let results = registry.set_states(&ids, state).await;

    let mut changed = Vec::new();
    let mut errors = Vec::new();
    for (candidate, result) in candidates.iter().zip(results) {
        match result {
            Ok(device) => changed.push(device),
            Err(err) => errors.push(format!(
                "Failed to toggle device {}: {}",
                candidate.name, err
            )),
        }
    }

    let success = !changed.is_empty();
    let message = if success {
        format!(
            "Successfully toggled {} of {} {} devices",
            changed.len(),
            total_devices,
            device_type
        )
    } else {
        "Failed to toggle any devices".to_string()
    };

    debug!(
        %device_type,
        state,
        affected = changed.len(),
        total = total_devices,
        "batch mutation applied"
    );

    BatchApplied {
        outcome: BatchToggleResult {
            success,
            devices_affected: changed.len(),
            total_devices,
            message,
            errors,
        },
        changed,
    }
}
