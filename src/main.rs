use std::sync::Arc;

use midibus::config::DriverConfig;
use midibus::driver::{ClientConnection, Driver};
use midibus::error::status_code;
use midibus::hal::{MethodArguments, SimulatedHost};
use midibus::keys::{self, ExternalMethod};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    println!("Midibus - Virtual MIDI Loopback Driver Demo");
    println!("===========================================\n");

    let config: DriverConfig = serde_json::from_value(serde_json::json!({
        "device_name": "MidibusDevice",
        "initial_ports": 1
    }))?;

    let host = SimulatedHost::new();
    let driver = Driver::new(host.services(), config);

    println!("Starting driver...");
    driver.start().await.map_err(|e| anyhow::anyhow!("driver start failed: {e}"))?;
    let device = driver
        .device()
        .ok_or_else(|| anyhow::anyhow!("driver has no device"))?;
    println!(
        "Driver started: device '{}', ports {:?}, offline = {:?}\n",
        device.name(),
        device.port_indices(),
        host.offline()
    );

    println!("Opening a user-client connection...");
    let connection = driver
        .new_user_client(keys::DRIVER_USER_CLIENT_TYPE)
        .await
        .map_err(|e| anyhow::anyhow!("user client creation failed: {e}"))?;
    let ClientConnection::Driver(client) = connection else {
        anyhow::bail!("expected the driver's own user client");
    };
    client
        .start(Some(Arc::clone(&driver)))
        .await
        .map_err(|e| anyhow::anyhow!("client start failed: {e}"))?;

    let args = MethodArguments::default();
    let open = client
        .external_method(ExternalMethod::Open.selector(), &args)
        .await;
    println!("Open -> status {}\n", status_code(&open));

    println!("Adding two ports over IPC...");
    for _ in 0..2 {
        let result = client
            .external_method(ExternalMethod::AddPort.selector(), &args)
            .await;
        println!(
            "AddPort -> status {}, ports {:?}",
            status_code(&result),
            device.port_indices()
        );
    }

    println!("\nStarting I/O...");
    let io = driver.start_io(&[keys::DEVICE_UID.to_string()]).await;
    println!(
        "StartIO -> status {}, offline = {:?}",
        status_code(&io),
        host.offline()
    );

    println!("\nSending a UMP packet through Virtual Bus 1...");
    let echoed = device.with_registry(|registry| {
        let port = registry.port(1).expect("port 1 exists");
        let drain = port.outbound();
        port.destination().receive(&[0x4090_3C00, 0x7FFF_0000])?;
        Ok::<_, midibus::error::DriverError>(drain.try_recv().ok())
    });
    match echoed {
        Ok(Some(words)) => println!("Loopback delivered {words:08X?}"),
        Ok(None) => println!("Loopback delivered nothing"),
        Err(e) => println!("Loopback failed: {e}"),
    }

    println!("\nRemoving a port while I/O runs (goes through the host broker)...");
    let result = client
        .external_method(ExternalMethod::RemovePort.selector(), &args)
        .await;
    println!(
        "RemovePort -> status {}, pending host changes: {}",
        status_code(&result),
        host.pending_change_count()
    );
    host.deliver_pending_changes(&device)
        .map_err(|e| anyhow::anyhow!("host delivery failed: {e}"))?;
    println!("Host delivered the change, ports {:?}", device.port_indices());

    println!("\nToggling offline twice...");
    for _ in 0..2 {
        let result = client
            .external_method(ExternalMethod::ToggleOffline.selector(), &args)
            .await;
        println!(
            "ToggleOffline -> status {}, offline = {:?}",
            status_code(&result),
            host.offline()
        );
    }

    println!("\nStopping I/O and removing down to the last port...");
    driver.stop_io().await.ok();
    loop {
        let result = client
            .external_method(ExternalMethod::RemovePort.selector(), &args)
            .await;
        println!(
            "RemovePort -> status {}, ports {:?}",
            status_code(&result),
            device.port_indices()
        );
        if result.is_err() {
            break;
        }
    }

    let close = client
        .external_method(ExternalMethod::Close.selector(), &args)
        .await;
    println!("\nClose -> status {}", status_code(&close));

    client.stop().await.ok();
    driver.stop().await.ok();
    println!("Driver stopped.");

    Ok(())
}
