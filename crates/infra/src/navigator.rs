//! Host navigation for desktop and CLI hosts
//!
//! A native host has no address bar. Redirects open the system browser and
//! location rewrites are only recorded, so the host can show where it is.

use mentorhub_common::auth::{AuthError, Navigator};
use parking_lot::Mutex;
use tracing::{debug, info};
use url::Url;

/// Navigator that opens redirects in the default browser
///
/// Relative locations (such as the sign-in path) are resolved against the
/// application's base URL.
#[derive(Debug)]
pub struct SystemBrowser {
    base: Url,
    current: Mutex<Option<String>>,
}

impl SystemBrowser {
    #[must_use]
    pub fn new(base: Url) -> Self {
        Self { base, current: Mutex::new(None) }
    }

    /// Resolve `location` against the base URL
    ///
    /// # Errors
    /// Returns `AuthError::Navigation` if the location cannot form a URL
    pub fn resolve(&self, location: &str) -> Result<Url, AuthError> {
        Url::parse(location)
            .or_else(|_| self.base.join(location))
            .map_err(|e| AuthError::Navigation(format!("invalid location {location}: {e}")))
    }

    /// Last location set by `replace_location`
    #[must_use]
    pub fn current_location(&self) -> Option<String> {
        self.current.lock().clone()
    }
}

impl Navigator for SystemBrowser {
    fn redirect(&self, location: &str) -> Result<(), AuthError> {
        let url = self.resolve(location)?;
        info!(host = url.host_str().unwrap_or_default(), "Opening browser");
        webbrowser::open(url.as_str())
            .map_err(|e| AuthError::Navigation(format!("failed to open browser: {e}")))
    }

    fn replace_location(&self, location: &str) {
        debug!(location, "Location replaced");
        *self.current.lock() = Some(location.to_string());
    }
}
