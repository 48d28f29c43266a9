pub mod work_queue;

pub use work_queue::WorkQueue;

use std::sync::{Arc, Mutex};
use tracing::{debug, error};

use crate::client::UserClient;
use crate::config::DriverConfig;
use crate::device::Device;
use crate::error::{DriverError, DriverResult};
use crate::hal::{HostClient, HostServices};
use crate::keys;

/// A user client created for an external connection. The two shapes are
/// an explicit branch rather than a runtime type test: the host builds
/// its own client for the built-in type, this driver builds everything
/// else.
pub enum ClientConnection {
    /// The host's built-in MIDI client.
    Host(HostClient),
    /// This driver's own user client, bound on `UserClient::start`.
    Driver(UserClient),
}

struct DriverState {
    work_queue: Option<Arc<WorkQueue>>,
    device: Option<Arc<Device>>,
}

/// Owns exactly one loopback device and the serialized work queue every
/// configuration operation funnels through.
pub struct Driver {
    hosts: HostServices,
    config: DriverConfig,
    state: Mutex<DriverState>,
}

impl Driver {
    pub fn new(hosts: HostServices, config: DriverConfig) -> Arc<Self> {
        Arc::new(Self {
            hosts,
            config,
            state: Mutex::new(DriverState {
                work_queue: None,
                device: None,
            }),
        })
    }

    /// Brings the service up: base start, work-queue acquisition, lazy
    /// device construction, child-object registration, service
    /// registration. The first failing step aborts the sequence and the
    /// partially constructed device is released.
    pub async fn start(&self) -> DriverResult {
        debug!(class = keys::DRIVER_CLASS_NAME, "starting driver");

        self.hosts.driver.base_start().await?;

        let work_queue = match self.hosts.driver.work_queue() {
            Some(queue) => queue,
            None => {
                error!("failed to get default work queue");
                return Err(DriverError::InvalidState);
            }
        };

        let device = match Device::new(
            Arc::clone(&self.hosts.device),
            Arc::clone(&work_queue),
            &self.config,
        ) {
            Ok(device) => device,
            Err(err) => {
                error!(?err, "failed to construct device");
                return Err(DriverError::NoMemory);
            }
        };

        if let Err(err) = self.hosts.driver.add_object(Arc::clone(&device)) {
            error!(?err, "failed to add device object");
            return Err(err);
        }

        if let Err(err) = self.hosts.driver.register_service().await {
            error!(?err, "failed to register service");
            return Err(err);
        }

        let mut state = self.state.lock().unwrap();
        state.work_queue = Some(work_queue);
        state.device = Some(device);
        Ok(())
    }

    /// Tears the service down; queue and device references are dropped
    /// regardless of what base stop reported.
    pub async fn stop(&self) -> DriverResult {
        debug!("stopping driver");
        let ret = self.hosts.driver.base_stop().await;

        let mut state = self.state.lock().unwrap();
        state.work_queue = None;
        state.device = None;
        ret
    }

    /// Creates a user client for an external connection of `client_type`.
    pub async fn new_user_client(&self, client_type: u32) -> DriverResult<ClientConnection> {
        debug!(client_type, "creating user client");

        if client_type == keys::BUILTIN_USER_CLIENT_TYPE {
            match self.hosts.driver.base_new_user_client(client_type).await? {
                Some(client) => Ok(ClientConnection::Host(client)),
                None => {
                    error!("host produced no user client");
                    Err(DriverError::NoMemory)
                }
            }
        } else {
            Ok(ClientConnection::Driver(UserClient::new(Arc::clone(
                &self.hosts.client,
            ))))
        }
    }

    /// Starts I/O: base first, and only if the host accepts the device
    /// list is the owned device started.
    pub async fn start_io(&self, device_list: &[String]) -> DriverResult {
        self.hosts.driver.base_start_io(device_list).await?;

        let device = self.device().ok_or(DriverError::InvalidState)?;
        device.start_io().await
    }

    /// Stops I/O: the device is only stopped if one exists, base stop
    /// always follows. A device-stop failure is surfaced after base stop
    /// has run.
    pub async fn stop_io(&self) -> DriverResult {
        let device_result = match self.device() {
            Some(device) => device.stop_io().await,
            None => Ok(()),
        };
        let base_result = self.hosts.driver.base_stop_io().await;
        device_result.and(base_result)
    }

    /// Adds a port, serialized on the work queue.
    pub async fn handle_add_port(&self) -> DriverResult {
        let (queue, device) = self.queue_and_device()?;
        queue.dispatch_sync(move || device.add_port()).await
    }

    /// Removes the highest-indexed port, serialized on the work queue.
    pub async fn handle_remove_port(&self) -> DriverResult {
        let (queue, device) = self.queue_and_device()?;
        queue.dispatch_sync(move || device.remove_port()).await
    }

    /// Flips the offline property, serialized on the work queue.
    pub async fn handle_toggle_offline(&self) -> DriverResult {
        let (queue, device) = self.queue_and_device()?;
        queue.dispatch_sync(move || device.toggle_offline()).await
    }

    /// The owned device, if `start` has completed.
    pub fn device(&self) -> Option<Arc<Device>> {
        self.state.lock().unwrap().device.clone()
    }

    fn queue_and_device(&self) -> DriverResult<(Arc<WorkQueue>, Arc<Device>)> {
        let state = self.state.lock().unwrap();
        match (&state.work_queue, &state.device) {
            (Some(queue), Some(device)) => Ok((Arc::clone(queue), Arc::clone(device))),
            _ => Err(DriverError::InvalidState),
        }
    }
}
