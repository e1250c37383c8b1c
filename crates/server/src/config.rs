//! Configuration loading for the server binary.
//!
//! [`ServerConfig`] wraps the service document ([`ServiceConfig`]) and is
//! assembled at startup from an optional `simdex` config file in the
//! working directory with `SIMDEX`-prefixed environment variables layered
//! on top, e.g. `SIMDEX_INGEST__INPUT=/data/signatures.txt` or
//! `SIMDEX_STORE__SIZE=3`.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};
use simdex::config::ServiceConfig;

/// Server configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ServerConfig {
    /// The full service document; listener settings live in
    /// `service.server`.
    pub service: ServiceConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables and config files
    pub fn load() -> anyhow::Result<Self> {
        let config: ServerConfig = config::Config::builder()
            // Load from file if exists
            .add_source(config::File::with_name("simdex").required(false))
            // Override with environment variables
            .add_source(config::Environment::with_prefix("SIMDEX").separator("__"))
            .build()?
            .try_deserialize()?;

        config.service.validate()?;
        Ok(config)
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr_str = format!(
            "{}:{}",
            self.service.server.bind_addr, self.service.server.port
        );
        Ok(addr_str.parse()?)
    }

    /// Log filter directive for subscriber initialization.
    pub fn log_level(&self) -> &str {
        &self.service.server.log_level
    }
}
