pub mod host;

pub use host::SimulatedHost;
