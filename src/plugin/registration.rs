//! Registration with the plugin host.
//!
//! # Responsibilities
//! - Announce name, address and methods to the host (`POST`)
//! - Retry announcement while the host is starting
//! - Withdraw the announcement on shutdown (`DELETE`)
//!
//! # Design Decisions
//! - Fixed delay with jitter; the host is local, so no exponential growth
//! - Non-2xx replies count as failed attempts
//! - Withdrawal is attempted once

use std::time::Duration;

use rand::Rng;
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::metrics;
use crate::plugin::protocol::HEADER_THING;

/// Errors that can occur while talking to the host.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("plugin host request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("plugin host rejected {method} with status {status}")]
    Rejected { method: Method, status: u16 },

    #[error("plugin registration failed after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<RegistrationError>,
    },
}

/// Body sent to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Registration {
    pub name: String,
    /// Address the host dials to reach this plugin.
    pub address: String,
    pub methods: Vec<String>,
}

impl Registration {
    /// Registration for the `HeaderThing` method.
    pub fn header_thing(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            methods: vec![HEADER_THING.to_string()],
        }
    }
}

/// Retry schedule for announcements.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    /// Delay before the next attempt, with up to 10% jitter.
    pub fn delay_with_jitter(&self) -> Duration {
        let base = self.delay.as_millis() as u64;
        let jitter_range = base / 10;
        let jitter = if jitter_range > 0 {
            rand::thread_rng().gen_range(0..jitter_range)
        } else {
            0
        };
        Duration::from_millis(base + jitter)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            delay: Duration::from_millis(500),
        }
    }
}

/// Client for the host's plugin endpoint.
pub struct Registrar {
    client: Client,
    endpoint: String,
    registration: Registration,
    policy: RetryPolicy,
}

impl Registrar {
    pub fn new(endpoint: impl Into<String>, registration: Registration) -> Result<Self, RegistrationError> {
        let client = Client::builder().timeout(Duration::from_secs(1)).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            registration,
            policy: RetryPolicy::default(),
        })
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn registration(&self) -> &Registration {
        &self.registration
    }

    /// Announce the plugin, retrying per the policy.
    pub async fn register(&self) -> Result<(), RegistrationError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.send(Method::POST).await {
                Ok(()) => {
                    tracing::info!(
                        endpoint = %self.endpoint,
                        name = %self.registration.name,
                        address = %self.registration.address,
                        attempt,
                        "Plugin registered"
                    );
                    metrics::record_registration("registered");
                    return Ok(());
                }
                Err(e) if attempt < self.policy.max_attempts => {
                    let delay = self.policy.delay_with_jitter();
                    tracing::debug!(attempt, delay = ?delay, error = %e, "Registration attempt failed, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    metrics::record_registration("failed");
                    return Err(RegistrationError::Exhausted {
                        attempts: attempt,
                        last: Box::new(e),
                    });
                }
            }
        }
    }

    /// Withdraw the announcement.
    pub async fn unregister(&self) -> Result<(), RegistrationError> {
        self.send(Method::DELETE).await?;
        metrics::record_registration("unregistered");
        tracing::info!(endpoint = %self.endpoint, name = %self.registration.name, "Plugin unregistered");
        Ok(())
    }

    async fn send(&self, method: Method) -> Result<(), RegistrationError> {
        let response = self
            .client
            .request(method.clone(), &self.endpoint)
            .json(&self.registration)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RegistrationError::Rejected {
                method,
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}
