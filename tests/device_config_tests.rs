use std::sync::Arc;

use midibus::config::DriverConfig;
use midibus::device::Device;
use midibus::error::DriverError;
use midibus::hal::{DeviceProperty, HostDriverServices, SimulatedHost};
use midibus::keys::{ADD_PORT_CHANGE_ACTION, REMOVE_PORT_CHANGE_ACTION};

fn build_device(host: &Arc<SimulatedHost>) -> Arc<Device> {
    let queue = host.work_queue().expect("simulated host has a work queue");
    Device::new(host.services().device, queue, &DriverConfig::default()).unwrap()
}

#[tokio::test]
async fn test_adding_ports_yields_sequential_indices() {
    let host = SimulatedHost::new();
    let device = build_device(&host);

    for _ in 0..4 {
        device.add_port().unwrap();
    }

    assert_eq!(device.port_count(), 5);
    assert_eq!(device.port_indices(), vec![1, 2, 3, 4, 5]);
    device.with_registry(|registry| {
        assert_eq!(registry.port(5).unwrap().name(), "Virtual Bus 5");
    });
}

#[tokio::test]
async fn test_remove_takes_highest_index() {
    let host = SimulatedHost::new();
    let device = build_device(&host);

    device.add_port().unwrap();
    device.add_port().unwrap();
    device.remove_port().unwrap();

    assert_eq!(device.port_indices(), vec![1, 2]);
}

#[tokio::test]
async fn test_removing_last_port_is_invalid_state() {
    let host = SimulatedHost::new();
    let device = build_device(&host);

    assert_eq!(device.remove_port(), Err(DriverError::InvalidState));
    assert_eq!(device.port_indices(), vec![1]);
}

#[tokio::test]
async fn test_add_remove_scenario() {
    let host = SimulatedHost::new();
    let device = build_device(&host);

    device.add_port().unwrap();
    device.add_port().unwrap();
    assert_eq!(device.port_indices(), vec![1, 2, 3]);

    device.remove_port().unwrap();
    assert_eq!(device.port_indices(), vec![1, 2]);

    device.remove_port().unwrap();
    assert_eq!(device.port_indices(), vec![1]);

    assert_eq!(device.remove_port(), Err(DriverError::InvalidState));
    assert_eq!(device.port_indices(), vec![1]);
}

#[tokio::test]
async fn test_new_ports_are_wired_for_loopback() {
    let host = SimulatedHost::new();
    let device = build_device(&host);

    device.add_port().unwrap();

    device.with_registry(|registry| {
        for port in registry.ports() {
            let drain = port.outbound();
            port.destination().receive(&[0x2090_4000]).unwrap();
            assert_eq!(drain.try_recv().unwrap(), vec![0x2090_4000]);
        }
    });
}

#[tokio::test]
async fn test_toggle_offline_is_an_involution() {
    let host = SimulatedHost::new();
    let device = build_device(&host);

    let original = host.offline();
    assert_eq!(original, Some(1));

    device.toggle_offline().unwrap();
    assert_eq!(host.offline(), Some(0));

    device.toggle_offline().unwrap();
    assert_eq!(host.offline(), original);
}

#[tokio::test]
async fn test_toggle_offline_read_failure_leaves_flag_unchanged() {
    let host = SimulatedHost::new();
    let device = build_device(&host);

    host.set_fail_property_read(true);
    assert_eq!(device.toggle_offline(), Err(DriverError::Failed));
    assert_eq!(host.offline(), Some(1));
}

#[tokio::test]
async fn test_toggle_offline_missing_property_propagates() {
    let host = SimulatedHost::new();
    let device = build_device(&host);

    host.clear_property(DeviceProperty::Offline);
    assert_eq!(device.toggle_offline(), Err(DriverError::InvalidState));
    assert_eq!(host.offline(), None);
}

#[tokio::test]
async fn test_running_device_routes_changes_through_host_broker() {
    let host = SimulatedHost::new();
    let device = build_device(&host);

    device.start_io().await.unwrap();

    device.add_port().unwrap();
    // Accepted by the host, not yet applied.
    assert_eq!(device.port_indices(), vec![1]);
    assert_eq!(host.pending_change_count(), 1);

    host.deliver_pending_changes(&device).unwrap();
    assert_eq!(device.port_indices(), vec![1, 2]);
    assert_eq!(host.pending_change_count(), 0);
}

#[tokio::test]
async fn test_stopped_device_applies_changes_immediately() {
    let host = SimulatedHost::new();
    let device = build_device(&host);

    device.add_port().unwrap();
    assert_eq!(device.port_indices(), vec![1, 2]);
    assert_eq!(host.pending_change_count(), 0);
}

#[tokio::test]
async fn test_unknown_action_falls_through_to_base_handler() {
    let host = SimulatedHost::new();
    let device = build_device(&host);

    device.perform_configuration_change(99, Some("mystery")).unwrap();
    assert_eq!(host.forwarded_actions(), vec![99]);
    assert_eq!(device.port_indices(), vec![1]);
}

#[tokio::test]
async fn test_abort_forwards_unchanged() {
    let host = SimulatedHost::new();
    let device = build_device(&host);

    device
        .abort_configuration_change(ADD_PORT_CHANGE_ACTION, None)
        .unwrap();
    device
        .abort_configuration_change(REMOVE_PORT_CHANGE_ACTION, None)
        .unwrap();
    assert_eq!(
        host.aborted_actions(),
        vec![ADD_PORT_CHANGE_ACTION, REMOVE_PORT_CHANGE_ACTION]
    );
}

#[tokio::test]
async fn test_zero_initial_ports_is_rejected() {
    let host = SimulatedHost::new();
    let queue = host.work_queue().unwrap();
    let config = DriverConfig {
        initial_ports: 0,
        ..DriverConfig::default()
    };

    let result = Device::new(host.services().device, queue, &config);
    assert!(matches!(result, Err(DriverError::BadArgument)));
}
