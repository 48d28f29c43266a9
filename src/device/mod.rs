pub mod entity;
pub mod registry;

pub use entity::{DestinationEndpoint, IoHandler, Port, SourceEndpoint, UmpWords};
pub use registry::EntityRegistry;

use std::sync::{Arc, Mutex};
use tracing::{debug, error};

use crate::config::DriverConfig;
use crate::driver::WorkQueue;
use crate::error::{DriverError, DriverResult};
use crate::hal::{DeviceProperty, HostDeviceServices};
use crate::keys::{ADD_PORT_CHANGE_ACTION, REMOVE_PORT_CHANGE_ACTION};

/// A virtual loopback MIDI device: an ordered set of ports whose
/// destinations forward straight to their paired sources.
///
/// The registry and the offline property are mutated only from the
/// driver's work queue or from a host-delivered configuration callback.
pub struct Device {
    host: Arc<dyn HostDeviceServices>,
    work_queue: Arc<WorkQueue>,
    name: String,
    model_uid: String,
    manufacturer: String,
    entities: Mutex<EntityRegistry>,
}

impl Device {
    /// Builds the device with its initial ports wired for loopback and
    /// publishes it as offline until I/O starts.
    pub fn new(
        host: Arc<dyn HostDeviceServices>,
        work_queue: Arc<WorkQueue>,
        config: &DriverConfig,
    ) -> DriverResult<Arc<Self>> {
        if config.initial_ports == 0 {
            return Err(DriverError::BadArgument);
        }

        let device = Arc::new(Self {
            host,
            work_queue,
            name: config.device_name.clone(),
            model_uid: config.model_uid.clone(),
            manufacturer: config.manufacturer.clone(),
            entities: Mutex::new(EntityRegistry::new()),
        });

        {
            let mut entities = device.entities.lock().unwrap();
            for _ in 0..config.initial_ports {
                entities.add_port();
            }
            entities.rewire_all();
        }

        device.host.set_property(DeviceProperty::Offline, 1)?;

        Ok(device)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model_uid(&self) -> &str {
        &self.model_uid
    }

    pub fn manufacturer(&self) -> &str {
        &self.manufacturer
    }

    /// Starts I/O through the base machinery on the work queue. A failed
    /// base start is answered with an immediate stop so the host side is
    /// left consistent, and the original failure is reported; the offline
    /// flag is cleared only on success.
    pub async fn start_io(&self) -> DriverResult {
        debug!(device = %self.name, "starting I/O");

        let host = Arc::clone(&self.host);
        let result = self
            .work_queue
            .dispatch_sync(move || {
                host.base_start_io().map_err(|err| {
                    error!(?err, "failed to start I/O");
                    let _ = host.base_stop_io();
                    err
                })
            })
            .await;

        if result.is_ok() {
            self.host.set_property(DeviceProperty::Offline, 0)?;
        }

        result
    }

    /// Stops I/O on the work queue. Failures are surfaced, never retried.
    pub async fn stop_io(&self) -> DriverResult {
        debug!(device = %self.name, "stopping I/O");

        let host = Arc::clone(&self.host);
        let result = self
            .work_queue
            .dispatch_sync(move || host.base_stop_io())
            .await;

        if let Err(err) = result {
            error!(?err, "failed to stop I/O");
            return Err(err);
        }
        Ok(())
    }

    /// Applies a configuration change on the caller's thread. Callers are
    /// responsible for serialization; the driver's `handle_*` path and
    /// the host's configuration callback both are.
    pub fn perform_configuration_change(&self, action: u64, info: Option<&str>) -> DriverResult {
        debug!(action, ?info, "performing configuration change");

        match action {
            ADD_PORT_CHANGE_ACTION => {
                let mut entities = self.entities.lock().unwrap();
                let index = entities.add_port();
                entities.rewire_all();
                debug!(index, "added port");
                Ok(())
            }
            REMOVE_PORT_CHANGE_ACTION => {
                let mut entities = self.entities.lock().unwrap();
                if entities.len() <= 1 {
                    // A device always retains at least one port.
                    return Err(DriverError::InvalidState);
                }
                let removed = entities.remove_highest();
                debug!(index = removed.map(|p| p.index()), "removed port");
                Ok(())
            }
            _ => self.host.base_perform_configuration_change(action, info),
        }
    }

    /// Forwarded unchanged to the host default handler. Add/remove carry
    /// no compensating undo; if the host aborts a change that was already
    /// performed, the registry keeps the mutation.
    pub fn abort_configuration_change(&self, action: u64, info: Option<&str>) -> DriverResult {
        debug!(action, ?info, "aborting configuration change");
        self.host.base_abort_configuration_change(action, info)
    }

    /// Adds a port. While I/O runs the change goes through the host
    /// broker so it lands between render cycles; on a stopped device it
    /// applies immediately.
    pub fn add_port(&self) -> DriverResult {
        if self.host.device_is_running() {
            self.host
                .request_configuration_change(ADD_PORT_CHANGE_ACTION, Some("Add Port"))
        } else {
            self.perform_configuration_change(ADD_PORT_CHANGE_ACTION, Some("Add Port"))
        }
    }

    /// Removes the highest-indexed port, same dual path as `add_port`.
    pub fn remove_port(&self) -> DriverResult {
        if self.host.device_is_running() {
            self.host
                .request_configuration_change(REMOVE_PORT_CHANGE_ACTION, Some("Remove Port"))
        } else {
            self.perform_configuration_change(REMOVE_PORT_CHANGE_ACTION, Some("Remove Port"))
        }
    }

    /// Flips the offline property between 0 and 1. A failed or empty
    /// property read propagates and leaves the flag unchanged.
    pub fn toggle_offline(&self) -> DriverResult {
        let current = self.host.copy_property(DeviceProperty::Offline)?;
        let next = if current != 0 { 0 } else { 1 };
        self.host.set_property(DeviceProperty::Offline, next)
    }

    pub fn port_count(&self) -> usize {
        self.entities.lock().unwrap().len()
    }

    pub fn port_indices(&self) -> Vec<u32> {
        self.entities.lock().unwrap().indices()
    }

    /// Runs `f` against the entity registry; this is how the host side
    /// reaches endpoints for delivery and drain.
    pub fn with_registry<R>(&self, f: impl FnOnce(&EntityRegistry) -> R) -> R {
        f(&self.entities.lock().unwrap())
    }
}
