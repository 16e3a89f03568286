//! One-call setup: default client manager, scan and container installation.

use std::sync::Arc;

use crate::container::{Container, DefinitionRegistry};
use crate::error::ConfigurationError;
use crate::marker::Catalog;
use crate::policy::{ClientManager, DEFAULT_MANAGER_DEF};
use crate::scanner::{ScanReport, ScanSettings, Scanner};

/// Register a [`ClientManager`] under [`DEFAULT_MANAGER_DEF`] unless one exists
/// or auto-configuration is disabled. Returns whether a manager was registered.
pub fn install_default_manager(container: &Container, settings: &ScanSettings) -> bool {
    if !settings.enabled {
        tracing::debug!("api client auto-configuration disabled");
        return false;
    }
    if container.has_definition(DEFAULT_MANAGER_DEF) {
        return false;
    }
    container.register_definition(DEFAULT_MANAGER_DEF, Arc::new(ClientManager::new()));
    tracing::debug!(definition = DEFAULT_MANAGER_DEF, "default api client manager registered");
    true
}

/// Auto-configure, scan `catalog` and bind every discovered client in `container`.
pub fn enable_api_clients(
    container: &Container,
    catalog: Catalog,
    settings: &ScanSettings,
) -> Result<ScanReport, ConfigurationError> {
    install_default_manager(container, settings);

    let report = Scanner::new(catalog, settings.clone()).scan(container)?;
    let bound = container.install(report.registrations.iter().cloned());
    tracing::info!(
        discovered = report.registrations.len(),
        bound,
        rejected = report.rejected.len(),
        skipped = report.skipped,
        "api clients enabled"
    );
    Ok(report)
}
