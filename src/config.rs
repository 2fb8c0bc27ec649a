use std::{net::SocketAddr, path::{Path, PathBuf}, time::Duration};

use anyhow::Context;
use serde::Deserialize;

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub content: ContentConfig,
    pub database: DatabaseConfig,
    pub development: bool,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ContentConfig {
    pub dir: PathBuf,
    /// Seconds before generated pages are rebuilt from the content directory.
    pub revalidate_secs: u64,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    /// MongoDB connection string; messages stay in memory when unset.
    pub uri: Option<String>,
    /// Used when the URI names no default database.
    pub name: String,
    pub collection: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("content"),
            revalidate_secs: 1800,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            uri: None,
            name: "blog".to_string(),
            collection: "messages".to_string(),
        }
    }
}

impl Config {
    /// Reads `path` when it exists, then applies environment overrides.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            Self::from_toml(&raw).with_context(|| format!("parsing {}", path.display()))?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        if let Some(port) = var("PORT") {
            self.server.port = port.parse().with_context(|| format!("invalid PORT {port:?}"))?;
        }
        if let Some(host) = var("HOST") {
            self.server.host = host;
        }
        if let Some(dir) = var("CONTENT_DIR") {
            self.content.dir = PathBuf::from(dir);
        }
        if let Some(uri) = var("MONGO_URI").filter(|u| !u.is_empty()) {
            self.database.uri = Some(uri);
        }
        if let Some(env) = var("RUST_ENV") {
            self.development = env == "development";
        }
        Ok(())
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse().with_context(|| format!("invalid listen address {addr}"))
    }

    pub fn revalidate(&self) -> Duration {
        Duration::from_secs(self.content.revalidate_secs)
    }

    /// Where the contact form posts when run from the command line.
    pub fn contact_endpoint(&self) -> String {
        let host = match self.server.host.as_str() {
            "0.0.0.0" => "127.0.0.1",
            other => other,
        };
        format!("http://{}:{}/api/contact", host, self.server.port)
    }
}
