use std::fmt::{Debug, Formatter};
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, warn};

use replset_core::{Address, LiveSet, MembershipSource};

use crate::client::{DockerClient, DockerEndpoint};
use crate::model::{Service, Task};

/// Running tasks of one swarm service, read through the Docker Engine API.
pub struct SwarmMembership {
    client: DockerClient,
    service_name: String,
    network_name: String,
    port: u16,
}

impl SwarmMembership {
    pub fn new(
        docker_host: &str,
        service_name: impl Into<String>,
        network_name: impl Into<String>,
        port: u16,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let endpoint: DockerEndpoint = docker_host.parse()?;
        debug!("docker api at {:?}", endpoint);
        Ok(Self {
            client: DockerClient::new(endpoint, timeout)?,
            service_name: service_name.into(),
            network_name: network_name.into(),
            port,
        })
    }

    async fn service(&self) -> anyhow::Result<Option<Service>> {
        let filters = json!({ "name": [self.service_name] });
        let services: Vec<Service> = self.client.get("/services", &filters).await?;
        find_service(services, &self.service_name)
    }

    async fn running_tasks(&self, service: &Service) -> anyhow::Result<Vec<Task>> {
        let filters = json!({ "service": [service.id], "desired-state": ["running"] });
        let tasks: Vec<Task> = self.client.get("/tasks", &filters).await?;
        Ok(tasks.into_iter().filter(Task::is_running).collect())
    }
}

#[async_trait]
impl MembershipSource for SwarmMembership {
    async fn live_addresses(&self) -> anyhow::Result<LiveSet> {
        let service = self
            .service()
            .await?
            .ok_or_else(|| anyhow!("service {} not found", self.service_name))?;
        let tasks = self.running_tasks(&service).await?;
        let live = task_addresses(&tasks, &self.network_name, self.port);
        if live.len() < tasks.len() {
            warn!(
                "{} running tasks of {} but only {} attached to {}",
                tasks.len(),
                self.service_name,
                live.len(),
                self.network_name
            );
        }
        debug!("live tasks: {}", live.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "));
        Ok(live)
    }

    async fn is_available(&self) -> anyhow::Result<bool> {
        match self.service().await? {
            Some(service) => Ok(!self.running_tasks(&service).await?.is_empty()),
            None => {
                debug!("service {} is not deployed yet", self.service_name);
                Ok(false)
            }
        }
    }
}

impl Debug for SwarmMembership {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwarmMembership")
            .field("client", &self.client)
            .field("service_name", &self.service_name)
            .field("network_name", &self.network_name)
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}

/// The name filter of the API matches prefixes, only an exact name counts.
pub fn find_service(services: Vec<Service>, name: &str) -> anyhow::Result<Option<Service>> {
    let mut matching: Vec<Service> = services.into_iter().filter(|s| s.spec.name == name).collect();
    match matching.len() {
        0 | 1 => Ok(matching.pop()),
        n => Err(anyhow!("{} services share the name {}", n, name)),
    }
}

/// Addresses of `tasks` on `network`, CIDR suffix removed.
pub fn task_addresses(tasks: &[Task], network: &str, port: u16) -> LiveSet {
    tasks
        .iter()
        .filter(|task| task.is_running())
        .filter_map(|task| task.attachment(network))
        .filter_map(|attachment| attachment.addresses.first())
        .map(|cidr| {
            let ip = cidr.split_once('/').map_or(cidr.as_str(), |(ip, _)| ip);
            Address::new(ip, port)
        })
        .collect()
}
