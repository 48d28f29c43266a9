use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::{Arc, Mutex};

use crate::error::{DriverError, DriverResult};

/// One Universal MIDI Packet, up to four 32-bit words.
pub type UmpWords = Vec<u32>;

/// Handler a destination invokes synchronously when inbound data arrives.
/// Set when the port is wired; invoked on the delivering thread.
pub type IoHandler = Arc<dyn Fn(&[u32]) -> DriverResult + Send + Sync>;

/// Outbound connection point. Words sent here travel toward host-side
/// subscribers of the port.
pub struct SourceEndpoint {
    outbound: Sender<UmpWords>,
}

impl SourceEndpoint {
    pub fn send(&self, words: &[u32]) -> DriverResult {
        self.outbound
            .send(words.to_vec())
            .map_err(|_| DriverError::NotAttached)
    }
}

/// Inbound connection point. Traffic is forwarded through the installed
/// handler with no buffering and no reordering.
pub struct DestinationEndpoint {
    handler: Mutex<Option<IoHandler>>,
}

impl DestinationEndpoint {
    pub fn set_io_handler(&self, handler: IoHandler) {
        *self.handler.lock().unwrap() = Some(handler);
    }

    /// Delivers inbound words to the paired source.
    pub fn receive(&self, words: &[u32]) -> DriverResult {
        let handler = self.handler.lock().unwrap().clone();
        match handler {
            Some(forward) => forward(words),
            None => Err(DriverError::NotAttached),
        }
    }

    pub fn is_wired(&self) -> bool {
        self.handler.lock().unwrap().is_some()
    }
}

/// A logical MIDI connection point: one source and one destination
/// endpoint, identified by a sequential 1-based index.
pub struct Port {
    index: u32,
    name: String,
    source: Arc<SourceEndpoint>,
    destination: Arc<DestinationEndpoint>,
    outbound_rx: Receiver<UmpWords>,
}

impl Port {
    pub fn new(index: u32) -> Self {
        let (outbound_tx, outbound_rx) = unbounded();
        Self {
            index,
            name: entity_name(index),
            source: Arc::new(SourceEndpoint {
                outbound: outbound_tx,
            }),
            destination: Arc::new(DestinationEndpoint {
                handler: Mutex::new(None),
            }),
            outbound_rx,
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &Arc<SourceEndpoint> {
        &self.source
    }

    pub fn destination(&self) -> &Arc<DestinationEndpoint> {
        &self.destination
    }

    /// Host-side drain of the source's outbound traffic.
    pub fn outbound(&self) -> Receiver<UmpWords> {
        self.outbound_rx.clone()
    }
}

pub fn entity_name(index: u32) -> String {
    format!("Virtual Bus {index}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_name_format() {
        assert_eq!(entity_name(1), "Virtual Bus 1");
        assert_eq!(entity_name(12), "Virtual Bus 12");
    }

    #[test]
    fn test_unwired_destination_rejects_traffic() {
        let port = Port::new(1);
        assert!(!port.destination().is_wired());
        assert_eq!(
            port.destination().receive(&[0x4090_3C00]),
            Err(DriverError::NotAttached)
        );
    }

    #[test]
    fn test_source_send_reaches_drain() {
        let port = Port::new(1);
        let drain = port.outbound();
        port.source().send(&[0x4090_3C00, 0x7FFF_0000]).unwrap();
        assert_eq!(drain.try_recv().unwrap(), vec![0x4090_3C00, 0x7FFF_0000]);
    }
}
