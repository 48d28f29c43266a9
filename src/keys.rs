//! Constants and identifiers shared between the driver and its clients.

/// Class name the host uses for service matching.
pub const DRIVER_CLASS_NAME: &str = "MidibusDriver";

/// Unique identifier for the published device.
pub const DEVICE_UID: &str = "MidibusDevice-UID";

/// Serial-number property key and value, opaque to the driver.
pub const SERIAL_NUMBER_KEY: &str = "SerialNumber";
pub const SERIAL_NUMBER: &str = "123456789";

/// User-client type code reserved for the host's built-in MIDI client.
pub const BUILTIN_USER_CLIENT_TYPE: u32 = 0;

/// Type code the companion app passes to reach this driver's own client.
pub const DRIVER_USER_CLIENT_TYPE: u32 = 1;

/// Configuration-change action codes, negotiated with the host broker.
pub const ADD_PORT_CHANGE_ACTION: u64 = 1;
pub const REMOVE_PORT_CHANGE_ACTION: u64 = 2;

/// External-method selectors, stable integers across the IPC boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u64)]
pub enum ExternalMethod {
    Open = 0,
    Close = 1,
    AddPort = 2,
    RemovePort = 3,
    ToggleOffline = 4,
}

impl ExternalMethod {
    /// Decodes a wire selector; unknown values fall through to the host's
    /// base external-method handling.
    pub fn from_selector(selector: u64) -> Option<Self> {
        match selector {
            0 => Some(ExternalMethod::Open),
            1 => Some(ExternalMethod::Close),
            2 => Some(ExternalMethod::AddPort),
            3 => Some(ExternalMethod::RemovePort),
            4 => Some(ExternalMethod::ToggleOffline),
            _ => None,
        }
    }

    pub fn selector(self) -> u64 {
        self as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_roundtrip() {
        for method in [
            ExternalMethod::Open,
            ExternalMethod::Close,
            ExternalMethod::AddPort,
            ExternalMethod::RemovePort,
            ExternalMethod::ToggleOffline,
        ] {
            assert_eq!(ExternalMethod::from_selector(method.selector()), Some(method));
        }
    }

    #[test]
    fn test_unknown_selector_is_rejected() {
        assert_eq!(ExternalMethod::from_selector(5), None);
        assert_eq!(ExternalMethod::from_selector(u64::MAX), None);
    }
}
