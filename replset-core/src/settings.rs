//! Process configuration.
//!
//! Layered with the `config` crate: the embedded reference defaults first, then an optional
//! file, then the environment. Later sources win.

use std::path::Path;
use std::time::Duration;

use config::builder::DefaultState;
use config::{Environment, File, FileFormat, Source};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::error::SettingsError;
use crate::retry::RetryPolicy;
use crate::REFERENCE;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
pub struct Settings {
    #[builder(setter(into))]
    pub overlay_network_name: String,
    #[builder(setter(into))]
    pub mongo_service_name: String,
    #[builder(setter(into))]
    pub replicaset_name: String,
    pub mongo_port: u16,
    #[builder(default = 10)]
    pub poll_interval_secs: u64,
    #[builder(default = 3)]
    pub election_attempts: usize,
    #[builder(default = 10)]
    pub election_delay_secs: u64,
    #[builder(default = 10)]
    pub startup_attempts: usize,
    #[builder(default = 5)]
    pub startup_delay_secs: u64,
    #[builder(default = 5)]
    pub connect_timeout_secs: u64,
    #[builder(default = "unix:///var/run/docker.sock".to_string(), setter(into))]
    pub docker_host: String,
}

impl Settings {
    /// Reference defaults, then `file` if given, then the process environment.
    pub fn load(file: Option<&Path>) -> Result<Self, SettingsError> {
        let mut loader = SettingsLoader::default();
        if let Some(file) = file {
            loader = loader.add_source(File::from(file).format(FileFormat::Toml));
        }
        loader
            .add_source(Environment::default().try_parsing(true))
            .load()
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        for (name, value) in [
            ("OVERLAY_NETWORK_NAME", &self.overlay_network_name),
            ("MONGO_SERVICE_NAME", &self.mongo_service_name),
            ("REPLICASET_NAME", &self.replicaset_name),
        ] {
            if value.trim().is_empty() {
                return Err(SettingsError::Empty(name));
            }
        }
        if self.mongo_port == 0 {
            return Err(SettingsError::Invalid { name: "MONGO_PORT", reason: "port must be > 0".to_string() });
        }
        if self.poll_interval_secs == 0 {
            return Err(SettingsError::Invalid { name: "POLL_INTERVAL_SECS", reason: "interval must be > 0".to_string() });
        }
        if !["unix://", "tcp://", "http://", "https://"].iter().any(|scheme| self.docker_host.starts_with(scheme)) {
            return Err(SettingsError::Invalid {
                name: "DOCKER_HOST",
                reason: format!("{} is not a unix, tcp or http(s) endpoint", self.docker_host),
            });
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn election_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.election_attempts, Duration::from_secs(self.election_delay_secs))
    }

    pub fn startup_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.startup_attempts, Duration::from_secs(self.startup_delay_secs))
    }
}

pub struct SettingsLoader {
    builder: config::ConfigBuilder<DefaultState>,
}

impl Default for SettingsLoader {
    fn default() -> Self {
        let builder = config::Config::builder().add_source(File::from_str(REFERENCE, FileFormat::Toml));
        Self { builder }
    }
}

impl SettingsLoader {
    pub fn add_source<T>(self, source: T) -> Self where T: Source + Send + Sync + 'static {
        Self { builder: self.builder.add_source(source) }
    }

    pub fn load(self) -> Result<Settings, SettingsError> {
        let settings = self.builder.build()?.try_deserialize::<Settings>()?;
        settings.validate()?;
        Ok(settings)
    }
}
