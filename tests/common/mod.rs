//! Common test utilities - AuthdTest harness for end-to-end testing

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use authd::{Config, Server};
use reqwest::Client;
use tokio::task::JoinHandle;

/// Test harness that runs a real authd server on a random port
pub struct AuthdTest {
    pub addr: SocketAddr,
    pub client: Client,
    server: Arc<Server>,
    _handle: JoinHandle<()>,
}

impl AuthdTest {
    /// Start a new test server instance
    pub async fn start() -> Result<Self> {
        // Find a random available port
        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        drop(listener);

        let config = Config {
            bind_addr: addr,
            db_path: None, // In-memory for tests
            ..Config::default()
        };

        let server = Arc::new(Server::new(config).await?);
        let server_clone = server.clone();

        // Run the server in a background task
        let handle = tokio::spawn(async move {
            if let Err(e) = server_clone.run().await {
                eprintln!("test server error: {e}");
            }
        });

        let client = Client::builder().timeout(Duration::from_secs(5)).build()?;

        // Poll until the server answers
        let mut ready = false;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(50)).await;
            if client
                .get(format!("http://{addr}/health"))
                .send()
                .await
                .is_ok()
            {
                ready = true;
                break;
            }
        }
        anyhow::ensure!(ready, "server failed to start within 2.5 seconds");

        Ok(Self {
            addr,
            client,
            server,
            _handle: handle,
        })
    }

    /// Get the base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .get(format!("{}{}", self.base_url(), path))
            .send()
            .await?)
    }

    /// POST a form-encoded body
    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(format!("{}{}", self.base_url(), path))
            .form(form)
            .send()
            .await?)
    }

    /// POST a form-encoded body with the session cookie and, optionally, the
    /// CSRF header attached
    pub async fn post_form_auth(
        &self,
        path: &str,
        form: &[(&str, &str)],
        session_token: &str,
        csrf_token: Option<&str>,
    ) -> Result<reqwest::Response> {
        let mut req = self
            .client
            .post(format!("{}{}", self.base_url(), path))
            .header("Cookie", format!("session_token={session_token}"))
            .form(form);
        if let Some(csrf) = csrf_token {
            req = req.header("X-CSRF-Token", csrf);
        }
        Ok(req.send().await?)
    }

    /// Signal the server to shutdown
    pub fn shutdown(&self) {
        self.server.shutdown();
    }
}

/// Collect the raw Set-Cookie values from a response
pub fn set_cookies(resp: &reqwest::Response) -> Vec<String> {
    resp.headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok().map(str::to_string))
        .collect()
}

/// Find a named cookie in collected Set-Cookie values and return its value
pub fn cookie_value<'a>(cookies: &'a [String], name: &str) -> Option<&'a str> {
    cookies.iter().find_map(|cookie| {
        let pair = cookie.split(';').next()?;
        let (key, value) = pair.split_once('=')?;
        (key.trim() == name).then_some(value.trim())
    })
}

/// Find the full cookie line (value plus attributes) for a named cookie
pub fn cookie_line<'a>(cookies: &'a [String], name: &str) -> Option<&'a str> {
    cookies.iter().map(String::as_str).find(|cookie| {
        cookie
            .split(';')
            .next()
            .and_then(|pair| pair.split_once('='))
            .is_some_and(|(key, _)| key.trim() == name)
    })
}
