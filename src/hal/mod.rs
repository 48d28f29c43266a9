pub mod mock;
pub mod traits;

pub use mock::SimulatedHost;
pub use traits::{
    DeviceProperty, HostClient, HostClientServices, HostDeviceServices, HostDriverServices,
    HostServices, MethodArguments,
};
