//! Server command

use crate::config::Config;
use crate::conversation::Orchestrator;
use crate::error::Result;
use crate::providers::create_provider;
use crate::server::{self, AppState};
use crate::speech::create_synthesizer;
use std::sync::Arc;

/// Build the provider, synthesizer and orchestrator, then serve HTTP
///
/// Runs until the process receives Ctrl-C.
///
/// # Errors
///
/// Returns error if the provider cannot be created (e.g. missing API key)
/// or the listen address cannot be bound
pub async fn run_server(config: Config) -> Result<()> {
    let provider = create_provider(&config.provider)?;
    let synthesizer = if config.speech.enabled {
        create_synthesizer(&config.speech)?
    } else {
        tracing::info!("Speech output disabled by configuration");
        None
    };

    let orchestrator = Arc::new(Orchestrator::new(&config, provider, synthesizer));
    let state = AppState::new(orchestrator, &config.server);

    if config.server.is_production() {
        tracing::info!("Running in production mode; error details are hidden");
    }

    server::run(state, &config.server).await
}
