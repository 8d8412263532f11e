use std::sync::Arc;

use frontdesk_agent::llm::create_client;
use frontdesk_agent::runtime::ExecutorSettings;
use frontdesk_agent::session::{SessionLimits, SessionRegistry};
use frontdesk_agent::tools::support::support_registry;
use frontdesk_agent::tools::RegistryError;
use frontdesk_core::config::{AppConfig, ConfigError};
use frontdesk_core::SupportCatalog;
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub sessions: Arc<SessionRegistry>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("http client construction failed: {0}")]
    HttpClient(#[source] reqwest::Error),
    #[error("tool registration failed: {0}")]
    Tools(#[from] RegistryError),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        llm_provider = config.llm.provider.as_str(),
        llm_model = %config.llm.model,
        "starting application bootstrap"
    );

    let http = reqwest::Client::builder().build().map_err(BootstrapError::HttpClient)?;
    let tools =
        support_registry(Arc::new(SupportCatalog::demo()), &config.tools, http.clone())?;
    info!(
        event_name = "system.bootstrap.tools_registered",
        correlation_id = "bootstrap",
        tool_count = tools.len(),
        "support tools registered"
    );

    let sessions = SessionRegistry::new(
        create_client(&config.llm, http),
        Arc::new(tools),
        ExecutorSettings::from_config(&config),
        SessionLimits::from_config(&config.server),
    );

    Ok(Application { config, sessions: Arc::new(sessions) })
}
