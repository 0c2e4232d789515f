//! Minimal Docker Engine API client, over the local unix socket or TCP.

use std::fmt::{Debug, Formatter};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use hyperlocal::{UnixClientExt, UnixConnector};
use serde::de::DeserializeOwned;
use url::form_urlencoded;

pub const LOCAL_SOCKET: &str = "/var/run/docker.sock";

/// Where the Docker daemon listens, in `DOCKER_HOST` syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DockerEndpoint {
    Unix(PathBuf),
    Http(String),
}

impl Default for DockerEndpoint {
    fn default() -> Self {
        DockerEndpoint::Unix(PathBuf::from(LOCAL_SOCKET))
    }
}

impl FromStr for DockerEndpoint {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(path) = s.strip_prefix("unix://") {
            if path.is_empty() {
                bail!("docker host {} has no socket path", s);
            }
            return Ok(DockerEndpoint::Unix(PathBuf::from(path)));
        }
        let endpoint = match s.strip_prefix("tcp://") {
            Some(rest) => format!("http://{}", rest),
            None if s.starts_with("http://") || s.starts_with("https://") => s.to_string(),
            None => bail!("unsupported docker host {}", s),
        };
        Ok(DockerEndpoint::Http(endpoint.trim_end_matches('/').to_string()))
    }
}

pub enum DockerClient {
    Unix {
        client: hyper::Client<UnixConnector>,
        socket: PathBuf,
        timeout: Duration,
    },
    Http {
        client: reqwest::Client,
        endpoint: String,
    },
}

impl DockerClient {
    pub fn new(endpoint: DockerEndpoint, timeout: Duration) -> anyhow::Result<Self> {
        let client = match endpoint {
            DockerEndpoint::Unix(socket) => DockerClient::Unix { client: hyper::Client::unix(), socket, timeout },
            DockerEndpoint::Http(endpoint) => {
                let client = reqwest::Client::builder()
                    .timeout(timeout)
                    .build()
                    .context("cannot build docker api client")?;
                DockerClient::Http { client, endpoint }
            }
        };
        Ok(client)
    }

    /// `GET path?filters=...` decoded from JSON.
    pub async fn get<T>(&self, path: &str, filters: &serde_json::Value) -> anyhow::Result<T> where T: DeserializeOwned {
        let path_and_query = path_and_query(path, filters);
        match self {
            DockerClient::Unix { client, socket, timeout } => {
                let uri: hyper::Uri = hyperlocal::Uri::new(socket, &path_and_query).into();
                let response = tokio::time::timeout(*timeout, client.get(uri))
                    .await
                    .with_context(|| format!("docker api timed out on {}", path))??;
                let status = response.status();
                let body = tokio::time::timeout(*timeout, hyper::body::to_bytes(response.into_body()))
                    .await
                    .with_context(|| format!("docker api timed out on {}", path))??;
                if !status.is_success() {
                    return Err(anyhow!("docker api answered {} on {}: {}", status, path, String::from_utf8_lossy(&body)));
                }
                Ok(serde_json::from_slice(&body)?)
            }
            DockerClient::Http { client, endpoint } => {
                let value = client
                    .get(format!("{}{}", endpoint, path_and_query))
                    .send()
                    .await?
                    .error_for_status()?
                    .json()
                    .await?;
                Ok(value)
            }
        }
    }
}

impl Debug for DockerClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DockerClient::Unix { socket, timeout, .. } => f
                .debug_struct("Unix")
                .field("socket", socket)
                .field("timeout", timeout)
                .finish_non_exhaustive(),
            DockerClient::Http { endpoint, .. } => f
                .debug_struct("Http")
                .field("endpoint", endpoint)
                .finish_non_exhaustive(),
        }
    }
}

fn path_and_query(path: &str, filters: &serde_json::Value) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("filters", &filters.to_string())
        .finish();
    format!("{}?{}", path, query)
}
