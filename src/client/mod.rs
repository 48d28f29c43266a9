use std::sync::{Arc, Mutex};
use tracing::{debug, error};

use crate::driver::Driver;
use crate::error::{DriverError, DriverResult};
use crate::hal::{HostClientServices, MethodArguments};
use crate::keys::ExternalMethod;

/// Client-private state, allocated at construction and bound to a
/// provider when the connection starts.
struct ClientState {
    provider: Option<Arc<Driver>>,
}

/// Per-connection IPC endpoint. Decodes external-method selectors into
/// driver operations and answers with a status code; no operation is
/// dispatched before a provider is bound.
pub struct UserClient {
    host: Arc<dyn HostClientServices>,
    state: Option<Mutex<ClientState>>,
}

impl UserClient {
    pub fn new(host: Arc<dyn HostClientServices>) -> Self {
        Self {
            host,
            state: Some(Mutex::new(ClientState { provider: None })),
        }
    }

    /// A client whose private state failed to allocate; every external
    /// method reports `NoResources`.
    pub fn unallocated(host: Arc<dyn HostClientServices>) -> Self {
        Self { host, state: None }
    }

    /// Binds the connection to its provider. Any failure clears the
    /// binding and reports the first error encountered.
    pub async fn start(&self, provider: Option<Arc<Driver>>) -> DriverResult {
        let Some(provider) = provider else {
            error!("provider is missing");
            return Err(DriverError::BadArgument);
        };

        let Some(state) = &self.state else {
            return Err(DriverError::NoResources);
        };

        if let Err(err) = self.host.base_start().await {
            error!(?err, "failed to start client");
            state.lock().unwrap().provider = None;
            return Err(err);
        }

        state.lock().unwrap().provider = Some(provider);
        Ok(())
    }

    /// Forwards to base stop; the binding itself is released when the
    /// client is dropped.
    pub async fn stop(&self) -> DriverResult {
        self.host.base_stop().await
    }

    /// Entry point for remote calls. Guards run before any dispatch:
    /// missing client state is `NoResources`, an unbound provider is
    /// `NotAttached`.
    pub async fn external_method(&self, selector: u64, arguments: &MethodArguments) -> DriverResult {
        let Some(state) = &self.state else {
            return Err(DriverError::NoResources);
        };
        let Some(provider) = state.lock().unwrap().provider.clone() else {
            return Err(DriverError::NotAttached);
        };

        debug!(selector, "external method");

        match ExternalMethod::from_selector(selector) {
            // Connection bookkeeping only.
            Some(ExternalMethod::Open) | Some(ExternalMethod::Close) => Ok(()),
            Some(ExternalMethod::AddPort) => provider.handle_add_port().await,
            Some(ExternalMethod::RemovePort) => provider.handle_remove_port().await,
            Some(ExternalMethod::ToggleOffline) => provider.handle_toggle_offline().await,
            None => self.host.base_external_method(selector, arguments),
        }
    }

    /// Whether a provider is currently bound.
    pub fn is_attached(&self) -> bool {
        self.state
            .as_ref()
            .map(|state| state.lock().unwrap().provider.is_some())
            .unwrap_or(false)
    }
}
