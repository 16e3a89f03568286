//! Discovery of declared API clients.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::container::DefinitionRegistry;
use crate::descriptor::ClientDescriptor;
use crate::error::{ConfigurationError, ValidationError};
use crate::factory::{DefaultFactory, FactoryStrategy};
use crate::marker::{ApiDeclaration, ApiInterface, Catalog, DeclarationKind};
use crate::parser::parse_marker;
use crate::policy::DEFAULT_MANAGER_DEF;
use crate::transport::LoggerKind;

/// The `api_clients` configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// Register a default `ClientManager` when none exists.
    pub enabled: bool,
    /// Module-path roots to scan, e.g. `my_app::clients`.
    #[serde(alias = "value")]
    pub base_packages: Vec<String>,
    /// Definition name of the shared `ClientManager`.
    pub manager_def: String,
    pub logger_type: LoggerKind,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            base_packages: Vec::new(),
            manager_def: DEFAULT_MANAGER_DEF.to_owned(),
            logger_type: LoggerKind::default(),
        }
    }
}

impl ScanSettings {
    pub fn for_packages<I, S>(packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            base_packages: packages.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

/// Everything needed to bind a client factory for one interface.
#[derive(Clone)]
pub struct RegistrationRecord {
    pub interface: ApiInterface,
    pub descriptor: Arc<ClientDescriptor>,
    pub logger: LoggerKind,
    pub strategy: Arc<dyn FactoryStrategy>,
    pub manager_ref: String,
    /// `module::path::Name` of the declaration.
    pub qualified_name: String,
}

impl fmt::Debug for RegistrationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationRecord")
            .field("qualified_name", &self.qualified_name)
            .field("descriptor", &self.descriptor)
            .field("logger", &self.logger)
            .field("strategy", &self.strategy.name())
            .field("manager_ref", &self.manager_ref)
            .finish()
    }
}

/// A declaration whose marker failed validation.
#[derive(Debug, Clone)]
pub struct RejectedDeclaration {
    pub name: String,
    pub error: ValidationError,
}

#[derive(Debug, Default)]
pub struct ScanReport {
    pub registrations: Vec<RegistrationRecord>,
    pub rejected: Vec<RejectedDeclaration>,
    /// True when the scan did not run because the client manager is missing.
    pub skipped: bool,
}

/// Walks a [`Catalog`] and turns eligible declarations into registration records.
pub struct Scanner {
    catalog: Catalog,
    settings: ScanSettings,
    strategy: Arc<dyn FactoryStrategy>,
}

impl Scanner {
    pub fn new(catalog: Catalog, settings: ScanSettings) -> Self {
        Self {
            catalog,
            settings,
            strategy: Arc::new(DefaultFactory),
        }
    }

    pub fn with_strategy(mut self, strategy: Arc<dyn FactoryStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn scan<R>(&self, definitions: &R) -> Result<ScanReport, ConfigurationError>
    where
        R: DefinitionRegistry + ?Sized,
    {
        let roots: Vec<&str> = self
            .settings
            .base_packages
            .iter()
            .map(|root| root.trim())
            .filter(|root| !root.is_empty())
            .collect();
        if roots.is_empty() {
            return Err(ConfigurationError::EmptyBasePackages);
        }

        let manager_def = self.settings.manager_def.trim();
        if manager_def.is_empty() {
            return Err(ConfigurationError::MissingField("manager_def"));
        }
        if !definitions.has_definition(manager_def) {
            tracing::error!(
                manager_def,
                "api client manager definition not found, skipping api client scan"
            );
            return Ok(ScanReport {
                skipped: true,
                ..ScanReport::default()
            });
        }

        let mut report = ScanReport::default();
        for root in &roots {
            let candidates: Vec<&'static ApiDeclaration> = self
                .catalog
                .iter()
                .filter(|decl| decl.is_under(root) && is_candidate(decl))
                .collect();

            if candidates.is_empty() {
                tracing::warn!(root = %root, "no api client declarations found under scan root");
                continue;
            }

            for decl in candidates {
                let qualified_name = format!("{}::{}", decl.module_path, decl.name);
                if report.registrations.iter().any(|r| r.qualified_name == qualified_name)
                    || report.rejected.iter().any(|r| r.name == qualified_name)
                {
                    // overlapping roots
                    continue;
                }
                let Some(marker) = decl.marker else {
                    continue;
                };
                match parse_marker(decl.name, marker) {
                    Ok(descriptor) => {
                        tracing::debug!(
                            api = %qualified_name,
                            url = %descriptor.url,
                            "api client declaration found"
                        );
                        report.registrations.push(RegistrationRecord {
                            interface: decl.interface,
                            descriptor: Arc::new(descriptor),
                            logger: self.settings.logger_type,
                            strategy: self.strategy.clone(),
                            manager_ref: manager_def.to_owned(),
                            qualified_name,
                        });
                    }
                    Err(error) => {
                        tracing::error!(
                            api = %qualified_name,
                            %error,
                            "invalid api client declaration, skipping"
                        );
                        report.rejected.push(RejectedDeclaration {
                            name: qualified_name,
                            error,
                        });
                    }
                }
            }
        }

        Ok(report)
    }
}

fn is_candidate(decl: &ApiDeclaration) -> bool {
    decl.marker.is_some() && decl.kind == DeclarationKind::Interface && decl.independent
}
