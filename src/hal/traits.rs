use async_trait::async_trait;
use std::sync::Arc;

use crate::device::Device;
use crate::driver::WorkQueue;
use crate::error::DriverResult;

/// Host-visible device properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceProperty {
    /// 0 = online, non-zero = offline.
    Offline,
}

/// Opaque handle to a user client the host created itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostClient {
    id: u64,
}

impl HostClient {
    pub fn new(id: u64) -> Self {
        Self { id }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Opaque argument buffer delivered with an external-method call.
#[derive(Debug, Clone, Default)]
pub struct MethodArguments {
    pub scalars: Vec<u64>,
    pub data: Vec<u8>,
}

/// Base device behavior owned by the host MIDI subsystem.
///
/// The device composes this capability instead of inheriting from a host
/// base class; everything here runs on the thread of the caller.
pub trait HostDeviceServices: Send + Sync {
    /// Starts the host-side I/O machinery for the device.
    fn base_start_io(&self) -> DriverResult;

    /// Stops the host-side I/O machinery.
    fn base_stop_io(&self) -> DriverResult;

    /// Whether the host currently runs I/O for the device.
    fn device_is_running(&self) -> bool;

    /// Reads a device property from the host's store.
    fn copy_property(&self, property: DeviceProperty) -> DriverResult<u32>;

    /// Publishes a device property to the host's store.
    fn set_property(&self, property: DeviceProperty, value: u32) -> DriverResult;

    /// Hands a topology change to the host broker. Returns once the host
    /// accepts the request; the host performs it later on a thread of its
    /// choosing.
    fn request_configuration_change(&self, action: u64, info: Option<&str>) -> DriverResult;

    /// Default handler for configuration-change actions the device does
    /// not recognize.
    fn base_perform_configuration_change(&self, action: u64, info: Option<&str>) -> DriverResult;

    /// Default handler for aborted configuration changes.
    fn base_abort_configuration_change(&self, action: u64, info: Option<&str>) -> DriverResult;
}

/// Base driver behavior owned by the host service manager.
#[async_trait]
pub trait HostDriverServices: Send + Sync {
    async fn base_start(&self) -> DriverResult;

    async fn base_stop(&self) -> DriverResult;

    /// Base I/O start; the host validates the device list here.
    async fn base_start_io(&self, device_list: &[String]) -> DriverResult;

    async fn base_stop_io(&self) -> DriverResult;

    /// The service's default serialized dispatch queue.
    fn work_queue(&self) -> Option<Arc<WorkQueue>>;

    /// Registers the device as a child object of the service.
    fn add_object(&self, device: Arc<Device>) -> DriverResult;

    /// Publishes the service for host matching.
    async fn register_service(&self) -> DriverResult;

    /// Creates the host's built-in user client for `client_type`. `None`
    /// means the host produced no client.
    async fn base_new_user_client(&self, client_type: u32) -> DriverResult<Option<HostClient>>;
}

/// Base user-client behavior owned by the host IPC transport.
#[async_trait]
pub trait HostClientServices: Send + Sync {
    async fn base_start(&self) -> DriverResult;

    async fn base_stop(&self) -> DriverResult;

    /// Fallback for selectors the client does not recognize.
    fn base_external_method(&self, selector: u64, arguments: &MethodArguments) -> DriverResult;
}

/// The full set of host capabilities a driver instance is wired to.
#[derive(Clone)]
pub struct HostServices {
    pub driver: Arc<dyn HostDriverServices>,
    pub device: Arc<dyn HostDeviceServices>,
    pub client: Arc<dyn HostClientServices>,
}
