//! # gd-ip-lookup
//!
//! `IpResolver` backed by a public IP-echo service answering
//! `{ "ip": "<address>" }` (ipify by default).
//!
//! The answer is unauthenticated and trivially spoofable; it is only good
//! enough to tag submissions for review.

use std::time::Duration;

use anyhow::{ensure, Context};
use async_trait::async_trait;
use gd_core::traits::IpResolver;
use serde::Deserialize;
use tracing::debug;

pub const DEFAULT_ENDPOINT: &str = "https://api.ipify.org?format=json";

#[derive(Debug, Deserialize)]
struct IpEcho {
    ip: String,
}

pub struct HttpIpResolver {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpIpResolver {
    /// `timeout` bounds the whole request, connect included.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("building HTTP client for IP lookup")?;
        Ok(Self { client, endpoint: endpoint.into() })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn parse_echo(body: &str) -> anyhow::Result<String> {
    let echo: IpEcho = serde_json::from_str(body).context("unexpected IP echo response")?;
    let ip = echo.ip.trim().to_string();
    ensure!(!ip.is_empty(), "IP echo response carried an empty address");
    Ok(ip)
}

#[async_trait]
impl IpResolver for HttpIpResolver {
    async fn resolve(&self) -> anyhow::Result<String> {
        let body = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .with_context(|| format!("requesting {}", self.endpoint))?
            .error_for_status()?
            .text()
            .await?;
        let ip = parse_echo(&body)?;
        debug!(%ip, "client ip resolved");
        Ok(ip)
    }
}
