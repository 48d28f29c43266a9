use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::device::Device;
use crate::driver::WorkQueue;
use crate::error::{DriverError, DriverResult};
use crate::hal::traits::{
    DeviceProperty, HostClient, HostClientServices, HostDeviceServices, HostDriverServices,
    HostServices, MethodArguments,
};

/// In-memory stand-in for the host MIDI subsystem, service manager, and
/// IPC transport. Failure injection and call counters drive the tests;
/// the pending-change queue models the host's asynchronous
/// configuration-change broker.
pub struct SimulatedHost {
    // Failure injection
    fail_base_start: AtomicBool,
    fail_client_base_start: AtomicBool,
    fail_device_start_io: AtomicBool,
    fail_device_stop_io: AtomicBool,
    fail_register_service: AtomicBool,
    fail_property_read: AtomicBool,
    reject_device_list: AtomicBool,
    builtin_client_missing: AtomicBool,

    // Host-side state
    work_queue: Mutex<Option<Arc<WorkQueue>>>,
    properties: Mutex<HashMap<DeviceProperty, u32>>,
    running: AtomicBool,
    service_registered: AtomicBool,
    objects: Mutex<Vec<Arc<Device>>>,
    pending_changes: Mutex<Vec<(u64, Option<String>)>>,
    last_device_list: Mutex<Vec<String>>,
    next_client_id: AtomicU64,

    // Call recording
    device_stop_io_calls: AtomicUsize,
    driver_stop_io_calls: AtomicUsize,
    forwarded_actions: Mutex<Vec<u64>>,
    aborted_actions: Mutex<Vec<u64>>,
    base_external_selectors: Mutex<Vec<u64>>,
}

impl SimulatedHost {
    /// Must run on a tokio runtime; the work queue spawns its worker
    /// task immediately.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            fail_base_start: AtomicBool::new(false),
            fail_client_base_start: AtomicBool::new(false),
            fail_device_start_io: AtomicBool::new(false),
            fail_device_stop_io: AtomicBool::new(false),
            fail_register_service: AtomicBool::new(false),
            fail_property_read: AtomicBool::new(false),
            reject_device_list: AtomicBool::new(false),
            builtin_client_missing: AtomicBool::new(false),
            work_queue: Mutex::new(Some(WorkQueue::new())),
            properties: Mutex::new(HashMap::new()),
            running: AtomicBool::new(false),
            service_registered: AtomicBool::new(false),
            objects: Mutex::new(Vec::new()),
            pending_changes: Mutex::new(Vec::new()),
            last_device_list: Mutex::new(Vec::new()),
            next_client_id: AtomicU64::new(1),
            device_stop_io_calls: AtomicUsize::new(0),
            driver_stop_io_calls: AtomicUsize::new(0),
            forwarded_actions: Mutex::new(Vec::new()),
            aborted_actions: Mutex::new(Vec::new()),
            base_external_selectors: Mutex::new(Vec::new()),
        })
    }

    /// Bundles this host as all three capability surfaces.
    pub fn services(self: &Arc<Self>) -> HostServices {
        HostServices {
            driver: Arc::clone(self) as Arc<dyn HostDriverServices>,
            device: Arc::clone(self) as Arc<dyn HostDeviceServices>,
            client: Arc::clone(self) as Arc<dyn HostClientServices>,
        }
    }

    // --- failure injection ---

    pub fn set_fail_base_start(&self, fail: bool) {
        self.fail_base_start.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_client_base_start(&self, fail: bool) {
        self.fail_client_base_start.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_device_start_io(&self, fail: bool) {
        self.fail_device_start_io.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_device_stop_io(&self, fail: bool) {
        self.fail_device_stop_io.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_register_service(&self, fail: bool) {
        self.fail_register_service.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_property_read(&self, fail: bool) {
        self.fail_property_read.store(fail, Ordering::SeqCst);
    }

    pub fn set_reject_device_list(&self, reject: bool) {
        self.reject_device_list.store(reject, Ordering::SeqCst);
    }

    pub fn set_builtin_client_missing(&self, missing: bool) {
        self.builtin_client_missing.store(missing, Ordering::SeqCst);
    }

    /// Simulates a host that never handed out a dispatch queue.
    pub fn clear_work_queue(&self) {
        *self.work_queue.lock().unwrap() = None;
    }

    /// Drops a property so the next read reports it missing.
    pub fn clear_property(&self, property: DeviceProperty) {
        self.properties.lock().unwrap().remove(&property);
    }

    // --- inspection ---

    pub fn offline(&self) -> Option<u32> {
        self.properties
            .lock()
            .unwrap()
            .get(&DeviceProperty::Offline)
            .copied()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn is_service_registered(&self) -> bool {
        self.service_registered.load(Ordering::SeqCst)
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn device_stop_io_calls(&self) -> usize {
        self.device_stop_io_calls.load(Ordering::SeqCst)
    }

    pub fn driver_stop_io_calls(&self) -> usize {
        self.driver_stop_io_calls.load(Ordering::SeqCst)
    }

    pub fn forwarded_actions(&self) -> Vec<u64> {
        self.forwarded_actions.lock().unwrap().clone()
    }

    pub fn aborted_actions(&self) -> Vec<u64> {
        self.aborted_actions.lock().unwrap().clone()
    }

    pub fn base_external_selectors(&self) -> Vec<u64> {
        self.base_external_selectors.lock().unwrap().clone()
    }

    pub fn last_device_list(&self) -> Vec<String> {
        self.last_device_list.lock().unwrap().clone()
    }

    pub fn pending_change_count(&self) -> usize {
        self.pending_changes.lock().unwrap().len()
    }

    /// Plays the broker: delivers every accepted configuration request
    /// to the device, in acceptance order, the way the real host would
    /// between render cycles. Returns the first failure.
    pub fn deliver_pending_changes(&self, device: &Device) -> DriverResult {
        let pending: Vec<_> = self.pending_changes.lock().unwrap().drain(..).collect();
        for (action, info) in pending {
            device.perform_configuration_change(action, info.as_deref())?;
        }
        Ok(())
    }
}

impl HostDeviceServices for SimulatedHost {
    fn base_start_io(&self) -> DriverResult {
        if self.fail_device_start_io.load(Ordering::SeqCst) {
            return Err(DriverError::Failed);
        }
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn base_stop_io(&self) -> DriverResult {
        self.device_stop_io_calls.fetch_add(1, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
        if self.fail_device_stop_io.load(Ordering::SeqCst) {
            return Err(DriverError::Failed);
        }
        Ok(())
    }

    fn device_is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn copy_property(&self, property: DeviceProperty) -> DriverResult<u32> {
        if self.fail_property_read.load(Ordering::SeqCst) {
            return Err(DriverError::Failed);
        }
        self.properties
            .lock()
            .unwrap()
            .get(&property)
            .copied()
            .ok_or(DriverError::InvalidState)
    }

    fn set_property(&self, property: DeviceProperty, value: u32) -> DriverResult {
        self.properties.lock().unwrap().insert(property, value);
        Ok(())
    }

    fn request_configuration_change(&self, action: u64, info: Option<&str>) -> DriverResult {
        self.pending_changes
            .lock()
            .unwrap()
            .push((action, info.map(str::to_string)));
        Ok(())
    }

    fn base_perform_configuration_change(&self, action: u64, _info: Option<&str>) -> DriverResult {
        self.forwarded_actions.lock().unwrap().push(action);
        Ok(())
    }

    fn base_abort_configuration_change(&self, action: u64, _info: Option<&str>) -> DriverResult {
        self.aborted_actions.lock().unwrap().push(action);
        Ok(())
    }
}

#[async_trait]
impl HostDriverServices for SimulatedHost {
    async fn base_start(&self) -> DriverResult {
        if self.fail_base_start.load(Ordering::SeqCst) {
            return Err(DriverError::Failed);
        }
        Ok(())
    }

    async fn base_stop(&self) -> DriverResult {
        Ok(())
    }

    async fn base_start_io(&self, device_list: &[String]) -> DriverResult {
        *self.last_device_list.lock().unwrap() = device_list.to_vec();
        if self.reject_device_list.load(Ordering::SeqCst) {
            return Err(DriverError::BadArgument);
        }
        Ok(())
    }

    async fn base_stop_io(&self) -> DriverResult {
        self.driver_stop_io_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn work_queue(&self) -> Option<Arc<WorkQueue>> {
        self.work_queue.lock().unwrap().clone()
    }

    fn add_object(&self, device: Arc<Device>) -> DriverResult {
        self.objects.lock().unwrap().push(device);
        Ok(())
    }

    async fn register_service(&self) -> DriverResult {
        if self.fail_register_service.load(Ordering::SeqCst) {
            return Err(DriverError::Failed);
        }
        self.service_registered.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn base_new_user_client(&self, _client_type: u32) -> DriverResult<Option<HostClient>> {
        if self.builtin_client_missing.load(Ordering::SeqCst) {
            return Ok(None);
        }
        let id = self.next_client_id.fetch_add(1, Ordering::SeqCst);
        Ok(Some(HostClient::new(id)))
    }
}

#[async_trait]
impl HostClientServices for SimulatedHost {
    async fn base_start(&self) -> DriverResult {
        if self.fail_client_base_start.load(Ordering::SeqCst) {
            return Err(DriverError::Failed);
        }
        Ok(())
    }

    async fn base_stop(&self) -> DriverResult {
        Ok(())
    }

    fn base_external_method(&self, selector: u64, _arguments: &MethodArguments) -> DriverResult {
        self.base_external_selectors.lock().unwrap().push(selector);
        Ok(())
    }
}
