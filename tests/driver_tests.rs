use std::sync::Arc;

use midibus::config::DriverConfig;
use midibus::driver::{ClientConnection, Driver};
use midibus::error::DriverError;
use midibus::hal::SimulatedHost;
use midibus::keys;

fn build_driver(host: &Arc<SimulatedHost>) -> Arc<Driver> {
    Driver::new(host.services(), DriverConfig::default())
}

#[tokio::test]
async fn test_start_builds_and_registers_device() {
    let host = SimulatedHost::new();
    let driver = build_driver(&host);

    driver.start().await.unwrap();

    let device = driver.device().expect("device exists after start");
    assert_eq!(device.port_indices(), vec![1]);
    assert_eq!(device.name(), "MidibusDevice");
    assert_eq!(host.object_count(), 1);
    assert!(host.is_service_registered());
    assert_eq!(host.offline(), Some(1));
}

#[tokio::test]
async fn test_base_start_failure_aborts_sequence() {
    let host = SimulatedHost::new();
    let driver = build_driver(&host);

    host.set_fail_base_start(true);
    assert_eq!(driver.start().await, Err(DriverError::Failed));

    assert!(driver.device().is_none());
    assert_eq!(host.object_count(), 0);
    assert!(!host.is_service_registered());
}

#[tokio::test]
async fn test_missing_work_queue_is_invalid_state() {
    let host = SimulatedHost::new();
    let driver = build_driver(&host);

    host.clear_work_queue();
    assert_eq!(driver.start().await, Err(DriverError::InvalidState));
    assert!(driver.device().is_none());
}

#[tokio::test]
async fn test_registration_failure_releases_device() {
    let host = SimulatedHost::new();
    let driver = build_driver(&host);

    host.set_fail_register_service(true);
    assert_eq!(driver.start().await, Err(DriverError::Failed));

    assert!(driver.device().is_none());
    assert!(!host.is_service_registered());
}

#[tokio::test]
async fn test_stop_releases_device() {
    let host = SimulatedHost::new();
    let driver = build_driver(&host);

    driver.start().await.unwrap();
    driver.stop().await.unwrap();

    assert!(driver.device().is_none());
    assert_eq!(
        driver.handle_add_port().await,
        Err(DriverError::InvalidState)
    );
}

#[tokio::test]
async fn test_rejected_device_list_never_starts_device() {
    let host = SimulatedHost::new();
    let driver = build_driver(&host);
    driver.start().await.unwrap();

    host.set_reject_device_list(true);
    let result = driver.start_io(&[keys::DEVICE_UID.to_string()]).await;

    assert_eq!(result, Err(DriverError::BadArgument));
    assert!(!host.is_running());
    assert_eq!(host.offline(), Some(1));
    assert_eq!(host.last_device_list(), vec![keys::DEVICE_UID.to_string()]);
}

#[tokio::test]
async fn test_start_io_starts_device_after_base_accepts() {
    let host = SimulatedHost::new();
    let driver = build_driver(&host);
    driver.start().await.unwrap();

    driver
        .start_io(&[keys::DEVICE_UID.to_string()])
        .await
        .unwrap();

    assert!(host.is_running());
    assert_eq!(host.offline(), Some(0));
}

#[tokio::test]
async fn test_stop_io_without_device_still_stops_base() {
    let host = SimulatedHost::new();
    let driver = build_driver(&host);

    driver.stop_io().await.unwrap();
    assert_eq!(host.driver_stop_io_calls(), 1);
    assert_eq!(host.device_stop_io_calls(), 0);
}

#[tokio::test]
async fn test_handle_operations_reach_device() {
    let host = SimulatedHost::new();
    let driver = build_driver(&host);
    driver.start().await.unwrap();
    let device = driver.device().unwrap();

    driver.handle_add_port().await.unwrap();
    assert_eq!(device.port_indices(), vec![1, 2]);

    driver.handle_remove_port().await.unwrap();
    assert_eq!(device.port_indices(), vec![1]);

    driver.handle_toggle_offline().await.unwrap();
    assert_eq!(host.offline(), Some(0));
}

#[tokio::test]
async fn test_new_user_client_builtin_type_uses_host() {
    let host = SimulatedHost::new();
    let driver = build_driver(&host);

    let connection = driver
        .new_user_client(keys::BUILTIN_USER_CLIENT_TYPE)
        .await
        .unwrap();
    assert!(matches!(connection, ClientConnection::Host(_)));
}

#[tokio::test]
async fn test_new_user_client_null_builtin_is_no_memory() {
    let host = SimulatedHost::new();
    let driver = build_driver(&host);

    host.set_builtin_client_missing(true);
    let result = driver.new_user_client(keys::BUILTIN_USER_CLIENT_TYPE).await;
    assert!(matches!(result, Err(DriverError::NoMemory)));
}

#[tokio::test]
async fn test_new_user_client_custom_type_builds_driver_client() {
    let host = SimulatedHost::new();
    let driver = build_driver(&host);

    let connection = driver
        .new_user_client(keys::DRIVER_USER_CLIENT_TYPE)
        .await
        .unwrap();
    let ClientConnection::Driver(client) = connection else {
        panic!("expected the driver's own client");
    };
    assert!(!client.is_attached());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_configuration_changes_are_totally_ordered() {
    let host = SimulatedHost::new();
    let driver = build_driver(&host);
    driver.start().await.unwrap();
    let device = driver.device().unwrap();

    fn assert_contiguous(indices: &[u32]) {
        for (position, index) in indices.iter().enumerate() {
            assert_eq!(*index, position as u32 + 1, "registry has a gap or duplicate");
        }
    }

    let adder = {
        let driver = Arc::clone(&driver);
        tokio::spawn(async move {
            for _ in 0..64 {
                driver.handle_add_port().await.unwrap();
            }
        })
    };

    let remover = {
        let driver = Arc::clone(&driver);
        tokio::spawn(async move {
            for _ in 0..64 {
                // InvalidState is fine when only one port remains.
                let _ = driver.handle_remove_port().await;
            }
        })
    };

    let sampler = {
        let device = Arc::clone(&device);
        tokio::spawn(async move {
            for _ in 0..256 {
                assert_contiguous(&device.port_indices());
                tokio::task::yield_now().await;
            }
        })
    };

    adder.await.unwrap();
    remover.await.unwrap();
    sampler.await.unwrap();

    let indices = device.port_indices();
    assert_contiguous(&indices);
    assert!(!indices.is_empty());
}
