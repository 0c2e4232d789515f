use std::fmt::{Debug, Formatter};
use std::time::Duration;

use async_trait::async_trait;
use mongodb::bson::{doc, Bson, Document};
use mongodb::error::{Error, ErrorKind};
use mongodb::options::{ClientOptions, ServerAddress};
use mongodb::Client;
use tracing::{debug, warn};

use replset_core::error::AdminError;
use replset_core::{Address, ConfigResult, PrimaryResult, ReplicaAdmin, ReplicaConfig};

use crate::document::{config_to_document, document_to_config, merge_into_document};

pub const NOT_YET_INITIALIZED: i32 = 94;
pub const ALREADY_INITIALIZED: i32 = 23;
pub const INVALID_REPLICA_SET_CONFIG: i32 = 93;

/// Administrative commands against single nodes. Every call opens its own direct connection
/// to the addressed node.
pub struct MongoAdmin {
    port: u16,
    timeout: Duration,
}

impl MongoAdmin {
    pub fn new(port: u16, timeout: Duration) -> Self {
        Self { port, timeout }
    }

    fn client(&self, node: &Address) -> Result<Client, Error> {
        let options = ClientOptions::builder()
            .hosts(vec![ServerAddress::Tcp { host: node.host().to_string(), port: Some(node.port()) }])
            .direct_connection(true)
            .connect_timeout(self.timeout)
            .server_selection_timeout(self.timeout)
            .app_name("replset-ctrl".to_string())
            .build();
        Client::with_options(options)
    }

    /// The configuration document exactly as `node` holds it.
    async fn server_document(&self, node: &Address) -> Option<Document> {
        let reply = self.run_command(node, doc! { "replSetGetConfig": 1 }).await.ok()?;
        reply.get_document("config").ok().cloned()
    }

    async fn run_command(&self, node: &Address, command: Document) -> Result<Document, Error> {
        let client = self.client(node)?;
        client.database("admin").run_command(command, None).await
    }
}

#[async_trait]
impl ReplicaAdmin for MongoAdmin {
    async fn get_config(&self, node: &Address) -> ConfigResult {
        let reply = match self.run_command(node, doc! { "replSetGetConfig": 1 }).await {
            Ok(reply) => reply,
            Err(error) => {
                return match command_code(&error) {
                    Some(NOT_YET_INITIALIZED) | Some(INVALID_REPLICA_SET_CONFIG) => {
                        debug!("{} has no replica set configuration: {}", node, error);
                        ConfigResult::NotConfigured
                    }
                    Some(code) => {
                        debug!("{} refused replSetGetConfig with code {}: {}", node, code, error);
                        ConfigResult::NotConfigured
                    }
                    None => ConfigResult::Unreachable(error.to_string()),
                };
            }
        };
        let Ok(document) = reply.get_document("config") else {
            warn!("{} answered replSetGetConfig without a config document", node);
            return ConfigResult::NotConfigured;
        };
        let config = match document_to_config(document, self.port) {
            Ok(config) => config,
            Err(error) => {
                warn!("{} returned an unreadable configuration: {}", node, error);
                return ConfigResult::NotConfigured;
            }
        };
        match config.validate() {
            Ok(()) => ConfigResult::Found(config),
            Err(error) => {
                warn!("{} returned an invalid configuration {}: {}", node, config, error);
                ConfigResult::NotConfigured
            }
        }
    }

    async fn is_primary(&self, node: &Address) -> PrimaryResult {
        match self.run_command(node, doc! { "isMaster": 1 }).await {
            Ok(reply) => match reply.get("ismaster") {
                Some(Bson::Boolean(true)) => PrimaryResult::IsPrimary,
                _ => PrimaryResult::IsNotPrimary,
            },
            Err(error) => PrimaryResult::Unreachable(error.to_string()),
        }
    }

    async fn initiate(&self, node: &Address, config: &ReplicaConfig) -> Result<(), AdminError> {
        let command = doc! { "replSetInitiate": config_to_document(config) };
        self.run_command(node, command).await.map_err(admin_error)?;
        Ok(())
    }

    async fn reconfigure(&self, node: &Address, config: &ReplicaConfig, force: bool) -> Result<(), AdminError> {
        let document = match self.server_document(node).await {
            Some(base) if base.get_str("_id").ok() == Some(config.name.as_str()) => {
                merge_into_document(&base, config, self.port)
            }
            _ => {
                debug!("no configuration document on {} to merge into, sending a fresh one", node);
                config_to_document(config)
            }
        };
        let command = doc! { "replSetReconfig": document, "force": force };
        self.run_command(node, command).await.map_err(admin_error)?;
        Ok(())
    }
}

impl Debug for MongoAdmin {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoAdmin")
            .field("port", &self.port)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn command_code(error: &Error) -> Option<i32> {
    match error.kind.as_ref() {
        ErrorKind::Command(command) => Some(command.code),
        _ => None,
    }
}

fn admin_error(error: Error) -> AdminError {
    match error.kind.as_ref() {
        ErrorKind::Command(command) if command.code == ALREADY_INITIALIZED => {
            AdminError::AlreadyInitialized(command.message.clone())
        }
        ErrorKind::Command(command) => AdminError::Rejected { code: command.code, message: command.message.clone() },
        ErrorKind::ServerSelection { message, .. } => AdminError::Unreachable(message.clone()),
        ErrorKind::Io(io) => AdminError::Unreachable(io.to_string()),
        ErrorKind::InvalidResponse { message, .. } => AdminError::Malformed(message.clone()),
        _ => AdminError::Driver(error.to_string()),
    }
}
