//! WebDriver HTTP front end.
//!
//! Exposes the negotiation layer over HTTP:
//! - `GET /status` — readiness and build/platform metadata
//! - `POST /session` — capability parsing + the session factory pipeline
//! - `DELETE /session/:id` — explicit teardown
//! - everything under `/session/:id/` — forwarded through the session's
//!   protocol converter
//!
//! # Example
//!
//! ```rust,ignore
//! use wdbridge::config::Config;
//! use wdbridge::server::Server;
//!
//! let server = Server::from_config(Config::default());
//! server.run().await?;
//! ```

mod handlers;
mod state;

pub use handlers::create_router;
pub use state::{AppState, SessionRegistry};

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::capabilities::Capabilities;
use crate::config::Config;
use crate::error::{BridgeError, Result};
use crate::pipeline::{NewSessionPipeline, UpstreamBackend};

/// The bridge server: configuration, pipeline, registry, and the axum
/// router glued together.
pub struct Server {
    state: Arc<AppState>,
    listen_addr: String,
}

impl Server {
    /// Build a server whose pipeline holds one upstream backend taken from
    /// the configuration.
    pub fn from_config(config: Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.upstream.request_timeout_secs))
            .build()
            .map_err(|e| BridgeError::Network(format!("Failed to create HTTP client: {e}")))?;

        // An empty declared set scores neutral against every candidate, so
        // the sole configured endpoint is always attempted.
        let upstream = UpstreamBackend::new("upstream", &config.upstream.url, client)
            .with_provided(Capabilities::empty());
        let pipeline = NewSessionPipeline::new().with_backend(Arc::new(upstream));
        Ok(Self::new(config, pipeline))
    }

    /// Build a server around an explicit pipeline.
    pub fn new(config: Config, pipeline: NewSessionPipeline) -> Self {
        let listen_addr = config.server.listen_addr();
        let state = Arc::new(AppState::new(config, pipeline));
        Self { state, listen_addr }
    }

    pub fn state(&self) -> Arc<AppState> {
        self.state.clone()
    }

    /// Serve until the listener fails. Spawns the idle-eviction sweeper
    /// alongside the accept loop.
    pub async fn run(self) -> Result<()> {
        let state = self.state.clone();
        let sweep_interval = state.config.server.idle_timeout().min(Duration::from_secs(30));
        let sweeper_state = state.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                sweeper_state.sessions.sweep().await;
            }
        });

        let app = create_router(state);
        info!("Starting wdbridge server on {}", self.listen_addr);

        let listener = tokio::net::TcpListener::bind(&self.listen_addr).await?;
        axum::serve(listener, app)
            .await
            .map_err(|e| BridgeError::Network(format!("server error: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::NewSessionPayload;
    use serde_json::json;

    #[tokio::test]
    async fn test_from_config_upstream_is_attempted() {
        // Nothing listens on port 1; the attempt must still reach the
        // network layer and be reported under the backend's name.
        let mut config = Config::default();
        config.upstream.url = "http://127.0.0.1:1".to_string();
        let server = Server::from_config(config).unwrap();

        let payload = NewSessionPayload::parse(&json!({
            "capabilities": {"alwaysMatch": {"browserName": "chrome"}}
        }))
        .unwrap();

        let error = match server.state().pipeline.create_session(&payload).await {
            Err(error) => error,
            Ok(_) => panic!("no driver is listening; session creation must fail"),
        };
        let message = error.to_string();
        assert!(
            message.contains("upstream:"),
            "configured upstream was never attempted: {message}"
        );
        assert!(
            !message.contains("no backend matched"),
            "configured upstream did not match the candidate: {message}"
        );
    }
}
