//! Transport factory
//!
//! Creates the transport described by configuration.

use crate::config::Config;
use crate::error::Result;
use crate::transport::{HttpTransport, Transport};
use std::sync::Arc;
use std::time::Duration;

/// Create a transport from configuration
///
/// Fails if no server URL is configured.
pub fn create_transport(config: &Config) -> Result<Arc<dyn Transport>> {
    let base_url = config.require_server_url()?;
    Ok(Arc::new(HttpTransport::new(
        base_url.as_str(),
        config.token.clone(),
        Duration::from_secs(config.request_timeout_secs),
    )))
}
