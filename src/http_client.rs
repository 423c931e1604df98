use anyhow::{Context, Result};
use reqwest::blocking::Client;

use crate::config::HttpConfig;

/// Blocking client with its own cookie jar. One per [`crate::session::Session`];
/// the jar is what carries the login between requests.
pub fn build_http_client(cfg: &HttpConfig) -> Result<Client> {
    Client::builder()
        .timeout(cfg.timeout)
        .user_agent(cfg.user_agent.as_str())
        .cookie_store(true)
        .build()
        .context("failed to build http client")
}
