//! src/http.rs

use anyhow::Result;
use reqwest::Client;
use std::env;

const USER_AGENT: &str = concat!("standupmate/", env!("CARGO_PKG_VERSION"));

/// Builds the single HTTP client shared by tracker and LLM calls.
/// Picks up `ALL_PROXY` / `HTTPS_PROXY` from the environment.
pub fn build_client() -> Result<Client> {
    let proxy_url = env::var("ALL_PROXY")
        .or_else(|_| env::var("HTTPS_PROXY"))
        .ok()
        .filter(|url| !url.trim().is_empty());
    let client = match proxy_url {
        Some(url) => {
            log::debug!("using proxy {url}");
            let proxy = reqwest::Proxy::all(&url)?;
            Client::builder().proxy(proxy).user_agent(USER_AGENT).build()?
        }
        None => Client::builder().user_agent(USER_AGENT).build()?,
    };
    Ok(client)
}
