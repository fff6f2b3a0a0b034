//! The API registry: one config and one parsed spec per API name.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use wayfinder_resolver::{fetch_spec, resolve_spec, Endpoint, ParsedSpec};

use crate::config::{load_config, ApiConfig, AuthType, ConfigError};

/// Listing entry for one registered API.
#[derive(Debug, Clone, Serialize)]
pub struct ApiSummary {
    pub name: String,
    pub base_url: String,
    pub description: Option<String>,
    pub auth_type: AuthType,
    pub endpoint_count: usize,
}

/// Registry of API configurations and their parsed specs.
///
/// A spec that fails to fetch or parse still registers: the API is
/// listed with zero endpoints and the failure text in its description,
/// so one bad registration never hides the others.
#[derive(Debug, Default)]
pub struct ApiRegistry {
    apis: BTreeMap<String, ApiConfig>,
    specs: BTreeMap<String, ParsedSpec>,
}

impl ApiRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a config file and register every API in it.
    pub async fn load_config(&mut self, path: &Path) -> Result<(), ConfigError> {
        let config = load_config(path)?;
        for api in config.apis {
            self.register_api(api).await;
        }
        Ok(())
    }

    /// Register one API: fetch its spec, resolve it, and store the
    /// result. Failures degrade to a placeholder spec.
    pub async fn register_api(&mut self, config: ApiConfig) {
        let name = config.name.clone();
        let spec_url = config.spec_url.clone();
        self.apis.insert(name.clone(), config);

        let resolved = match fetch_spec(&spec_url, wayfinder_resolver::fetch::DEFAULT_FETCH_TIMEOUT)
            .await
        {
            Ok(raw) => resolve_spec(&raw).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        let spec = match resolved {
            Ok(spec) => {
                tracing::info!(
                    api = %name,
                    endpoints = spec.endpoints.len(),
                    "registered API"
                );
                spec
            }
            Err(reason) => {
                tracing::error!(api = %name, error = %reason, "failed to load spec");
                ParsedSpec::placeholder(&name, &reason)
            }
        };

        // Re-registration replaces the spec wholesale.
        self.specs.insert(name, spec);
    }

    /// Every registered API with its headline metadata.
    pub fn list_apis(&self) -> Vec<ApiSummary> {
        self.apis
            .iter()
            .map(|(name, config)| {
                let spec = self.specs.get(name);
                ApiSummary {
                    name: name.clone(),
                    base_url: config.base_url.clone(),
                    description: spec.and_then(|s| s.description.clone()),
                    auth_type: config.auth.auth_type,
                    endpoint_count: spec.map(|s| s.endpoints.len()).unwrap_or(0),
                }
            })
            .collect()
    }

    pub fn get_api(&self, name: &str) -> Option<&ApiConfig> {
        self.apis.get(name)
    }

    pub fn get_spec(&self, name: &str) -> Option<&ParsedSpec> {
        self.specs.get(name)
    }

    /// All endpoints of one API; empty when unknown or failed to load.
    pub fn get_endpoints(&self, name: &str) -> &[Endpoint] {
        self.specs
            .get(name)
            .map(|spec| spec.endpoints.as_slice())
            .unwrap_or(&[])
    }

    pub fn api_names(&self) -> Vec<&str> {
        self.apis.keys().map(String::as_str).collect()
    }
}
