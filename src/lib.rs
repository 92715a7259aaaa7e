pub mod api;
pub mod config;
pub mod copyleaks;
pub mod error;
pub mod http;
pub mod llm;
pub mod prompts;
pub mod store;

use std::sync::Arc;

use config::Config;
use copyleaks::{CopyleaksClient, ScanProvider};
use error::{AppError, Result};
use llm::ProviderSelector;
use store::CorrelationStore;

/// Application state that will be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub providers: Arc<ProviderSelector>,
    /// `None` when Copyleaks credentials are absent.
    pub scanner: Option<Arc<dyn ScanProvider>>,
    pub store: Arc<CorrelationStore>,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        let scanner = config
            .copyleaks
            .clone()
            .map(|copyleaks| Arc::new(CopyleaksClient::new(copyleaks)) as Arc<dyn ScanProvider>);
        let store = match config.correlation_ttl {
            Some(ttl) => CorrelationStore::with_ttl(ttl),
            None => CorrelationStore::new(),
        };

        AppState {
            providers: Arc::new(ProviderSelector::from_config(config)),
            scanner,
            store: Arc::new(store),
        }
    }

    pub fn scanner(&self) -> Result<&dyn ScanProvider> {
        self.scanner
            .as_deref()
            .ok_or(AppError::ProviderNotConfigured("Copyleaks"))
    }
}
