//! Shared application state injected into all Axum handlers.

use std::fmt;
use std::sync::Arc;

use crate::auth::AuthResolver;
use crate::hub::Hub;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// The messaging hub.
    pub hub: Arc<Hub>,
    /// Resolves handshake credentials to identities.
    pub auth: Arc<dyn AuthResolver>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("hub", &self.hub)
            .finish_non_exhaustive()
    }
}
