use std::sync::Arc;

use super::entity::Port;

/// Ordered collection of ports. Insertion order is index order; removal
/// always takes the highest index.
#[derive(Default)]
pub struct EntityRegistry {
    ports: Vec<Port>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self { ports: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    /// Looks up a port by its 1-based index.
    pub fn port(&self, index: u32) -> Option<&Port> {
        self.ports.get(index.checked_sub(1)? as usize)
    }

    /// Appends the next port; its index is the new length.
    pub fn add_port(&mut self) -> u32 {
        let index = self.ports.len() as u32 + 1;
        self.ports.push(Port::new(index));
        index
    }

    /// Removes the highest-indexed port, LIFO.
    pub fn remove_highest(&mut self) -> Option<Port> {
        self.ports.pop()
    }

    /// Rebinds every destination to its paired source. Rewiring all ports
    /// rather than just the newest one covers any port whose wiring was
    /// never established; installing a handler twice is harmless.
    pub fn rewire_all(&self) {
        for port in &self.ports {
            let source = Arc::clone(port.source());
            port.destination()
                .set_io_handler(Arc::new(move |words| source.send(words)));
        }
    }

    pub fn indices(&self) -> Vec<u32> {
        self.ports.iter().map(Port::index).collect()
    }
}
