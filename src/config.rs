//! Server configuration
//!
//! Layered: built-in defaults, then an optional TOML file, then `AUTHD_*`
//! environment variables. CLI flags are applied on top by the binary.

use std::net::SocketAddr;
use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Address the HTTP listener binds to
    pub bind_addr: SocketAddr,
    /// SQLite database path; None = in-memory
    pub db_path: Option<String>,
    /// Absolute session lifetime, carried as cookie Max-Age
    pub session_ttl_secs: u64,
    /// Minimum length for both usernames and passwords
    pub min_credential_len: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".parse().unwrap(),
            db_path: None, // None = in-memory
            session_ttl_secs: 24 * 60 * 60,
            min_credential_len: 8,
        }
    }
}

impl Config {
    /// Load configuration from defaults, a TOML file, and the environment.
    ///
    /// With an explicit `file` the file must exist; otherwise `authd.toml`
    /// is read if present.
    pub fn load(file: Option<&Path>) -> Result<Self, figment::Error> {
        let figment = Figment::from(Serialized::defaults(Config::default()));
        let figment = match file {
            Some(path) => figment.merge(Toml::file_exact(path)),
            None => figment.merge(Toml::file("authd.toml")),
        };
        figment.merge(Env::prefixed("AUTHD_")).extract()
    }
}
