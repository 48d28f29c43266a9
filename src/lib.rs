pub mod client;
pub mod config;
pub mod device;
pub mod driver;
pub mod error;
pub mod hal;
pub mod keys;
