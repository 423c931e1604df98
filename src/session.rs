use std::cell::Cell;
use std::fmt;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use reqwest::blocking::Client;

use crate::config::HttpConfig;
use crate::http_client::build_http_client;

const LOGIN_PATH: &str = "/inc/login.php";

/// Source of raw pages, addressed by site-relative path.
pub trait Fetch {
    fn fetch(&self, path: &str) -> Result<String>;
}

impl<T: Fetch + ?Sized> Fetch for &T {
    fn fetch(&self, path: &str) -> Result<String> {
        (**self).fetch(path)
    }
}

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Cookie-carrying connection to the results site. Opened once per run and
/// passed by reference to every stage; there is no renewal.
pub struct Session {
    client: Client,
    base_url: String,
    request_delay: Duration,
    last_request: Cell<Option<Instant>>,
    authenticated: bool,
}

impl Session {
    pub fn open(cfg: &HttpConfig) -> Result<Self> {
        Ok(Self {
            client: build_http_client(cfg)?,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            request_delay: cfg.request_delay,
            last_request: Cell::new(None),
            authenticated: false,
        })
    }

    /// Log in and keep the returned cookies. The site takes the form fields
    /// on a GET.
    pub fn login(&mut self, credentials: &Credentials) -> Result<()> {
        let url = self.url(LOGIN_PATH);
        self.pace();
        let resp = self
            .client
            .get(&url)
            .form(&[
                ("username", credentials.username.as_str()),
                ("password", credentials.password.as_str()),
            ])
            .send()
            .context("login request failed")?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("login rejected: http {status}"));
        }
        self.authenticated = true;
        tracing::info!(user = %credentials.username, "logged in");
        Ok(())
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn pace(&self) {
        if let Some(last) = self.last_request.get() {
            let elapsed = last.elapsed();
            if elapsed < self.request_delay {
                std::thread::sleep(self.request_delay - elapsed);
            }
        }
        self.last_request.set(Some(Instant::now()));
    }
}

impl Fetch for Session {
    fn fetch(&self, path: &str) -> Result<String> {
        let url = self.url(path);
        self.pace();
        tracing::info!(%url, "fetch");
        let resp = self
            .client
            .get(&url)
            .send()
            .with_context(|| format!("request failed: {url}"))?;
        let status = resp.status();
        let body = resp.text().context("failed reading body")?;
        if !status.is_success() {
            return Err(anyhow!("http {status} for {url}"));
        }
        Ok(body)
    }
}
