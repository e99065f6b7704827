use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::config::EndpointConfig;

/// Shared, read-mostly map from endpoint name to its connection settings.
///
/// Cloning the registry hands out another handle to the same map.
#[derive(Debug, Clone, Default)]
pub struct EndpointRegistry {
    endpoints: Arc<RwLock<HashMap<String, EndpointConfig>>>,
}

impl EndpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry that already holds `config`.
    pub fn with_endpoint(config: EndpointConfig) -> Self {
        let mut endpoints = HashMap::new();
        endpoints.insert(config.name.clone(), config);
        Self {
            endpoints: Arc::new(RwLock::new(endpoints)),
        }
    }

    /// Registers `config` under its name, replacing any previous entry.
    ///
    /// Returns the replaced configuration, if there was one.
    pub async fn register(&self, config: EndpointConfig) -> Option<EndpointConfig> {
        let name = config.name.clone();
        let previous = self.endpoints.write().await.insert(name.clone(), config);
        if previous.is_some() {
            tracing::info!("Replaced endpoint configuration '{}'", name);
        } else {
            tracing::info!("Registered endpoint configuration '{}'", name);
        }
        previous
    }

    pub async fn get(&self, name: &str) -> Option<EndpointConfig> {
        self.endpoints.read().await.get(name).cloned()
    }

    pub async fn remove(&self, name: &str) -> Option<EndpointConfig> {
        self.endpoints.write().await.remove(name)
    }

    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.endpoints.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Removes and returns every entry, leaving the registry empty.
    pub async fn drain(&self) -> Vec<EndpointConfig> {
        self.endpoints.write().await.drain().map(|(_, config)| config).collect()
    }
}
