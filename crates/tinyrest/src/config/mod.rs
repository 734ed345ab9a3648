//! Configuration file loading.
//!
//! The configuration is a YAML document with server settings at the top
//! level and one section per virtual endpoint:
//!
//! ```yaml
//! host: localhost
//! port: 8001
//! data: data.json
//! endpoints:
//!   - name: books
//!     paths: [books, libros]
//!     methods: [GET, POST, PUT, PATCH, DELETE, HEAD]
//!     safe_mode: false
//!     field_aliases: ["title,name"]
//! ```

mod endpoint;

pub use endpoint::{parse_alias, EndpointConfig};

use crate::router::Server;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{error, info};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 8001;
pub const DEFAULT_DATA_FILE: &str = "data.json";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    /// Kept signed so out-of-range values reach `validate` instead of failing the parse
    #[serde(default = "default_port")]
    pub port: i64,
    /// Seed file shared by endpoints without their own `data`
    #[serde(default = "default_data")]
    pub data: PathBuf,
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,
    /// Directory relative seed paths are resolved against
    #[serde(skip)]
    pub base_dir: PathBuf,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> i64 {
    DEFAULT_PORT as i64
}

fn default_data() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_FILE)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data: default_data(),
            endpoints: Vec::new(),
            base_dir: PathBuf::new(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("unable to read {}: {e}", path.display()))?;
        let mut config = Self::from_yaml(&contents)?;
        config.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(config)
    }

    /// Parse a config document. Settings are not validated here so that
    /// command-line overrides can still replace them; call [`Config::validate`]
    /// once they are applied.
    pub fn from_yaml(contents: &str) -> Result<Self, anyhow::Error> {
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Validate server-level settings. Endpoint problems are not fatal and
    /// are reported while building the server instead.
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.listen_port()?;
        if self.host.trim().is_empty() {
            anyhow::bail!("listening host must not be empty");
        }
        Ok(())
    }

    pub fn listen_port(&self) -> Result<u16, anyhow::Error> {
        match u16::try_from(self.port) {
            Ok(port) if port > 0 => Ok(port),
            _ => anyhow::bail!("invalid listening port: {}", self.port),
        }
    }

    pub fn listen_addr(&self) -> Result<String, anyhow::Error> {
        Ok(format!("{}:{}", self.host, self.listen_port()?))
    }

    /// Seed file for a section, resolved against the configuration directory.
    pub fn data_path(&self, section: &EndpointConfig) -> PathBuf {
        let data = section.data.as_deref().unwrap_or(&self.data);
        if data.is_absolute() {
            data.to_path_buf()
        } else {
            self.base_dir.join(data)
        }
    }

    /// Build the dispatcher from every section, in order.
    ///
    /// Sections that fail to build or whose paths collide with an earlier
    /// section are logged and skipped.
    pub fn build_server(&self) -> Server {
        let mut server = Server::new();

        for section in &self.endpoints {
            let endpoint = match section.build(&self.data_path(section)) {
                Ok(endpoint) => endpoint,
                Err(e) => {
                    error!("[{}] {:#}; endpoint skipped", section.name, e);
                    continue;
                }
            };

            if let Err(e) = server.register_endpoint(endpoint) {
                error!("[{}] {}; endpoint skipped", section.name, e);
                continue;
            }
            info!("[{}] endpoint registered", section.name);
        }

        server
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::Method;

    #[test]
    fn test_defaults() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.listen_port().unwrap(), 8001);
        assert_eq!(config.data, PathBuf::from("data.json"));
        assert!(config.endpoints.is_empty());
        assert_eq!(config.listen_addr().unwrap(), "localhost:8001");
    }

    #[test]
    fn test_invalid_port_is_fatal() {
        let validate = |yaml: &str| Config::from_yaml(yaml).unwrap().validate();
        assert!(validate("port: 0").is_err());
        assert!(validate("port: 70000").is_err());
        assert!(validate("port: -1").is_err());
        assert!(validate("host: ' '").is_err());
        assert!(validate("port: 65535").is_ok());
    }

    #[test]
    fn test_port_override_replaces_invalid_port() {
        let mut config = Config::from_yaml("port: 0").unwrap();
        assert!(config.validate().is_err());

        config.port = 8080;
        assert!(config.validate().is_ok());
        assert_eq!(config.listen_port().unwrap(), 8080);
    }

    #[test]
    fn test_from_file_builds_server() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("data.json"),
            r#"[{"id":1,"name":"Ann"},{"id":2,"name":"Bo"}]"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("books.json"), r#"[{"id":1,"name":"Dune"}]"#).unwrap();
        std::fs::write(
            dir.path().join("config.yaml"),
            r#"
port: 9100
endpoints:
  - name: people
    paths: [people, gente]
    methods: [GET, POST]
  - name: books
    paths: [books]
    methods: [GET]
    safe_mode: true
    data: books.json
  - name: broken
    paths: [broken]
    methods: [GET]
    data: missing.json
  - name: clash
    paths: [people]
    methods: [GET]
"#,
        )
        .unwrap();

        let config = Config::from_file(dir.path().join("config.yaml")).unwrap();
        assert_eq!(config.listen_port().unwrap(), 9100);

        let server = config.build_server();
        let names: Vec<_> = server.endpoints().iter().map(|e| e.name()).collect();
        assert_eq!(names, ["people", "books"]);

        assert!(server.dispatch(&Method::GET, "/gente/2", b"").is_ok());
        let books = server.dispatch(&Method::GET, "/books", b"").unwrap();
        assert_eq!(books.body.unwrap().as_array().unwrap().len(), 1);
        assert!(server.dispatch(&Method::GET, "/broken", b"").is_err());
    }

    #[test]
    fn test_data_path_resolution() {
        let config = Config {
            base_dir: PathBuf::from("/etc/tinyrest"),
            ..Default::default()
        };
        let mut section = EndpointConfig::default();
        assert_eq!(
            config.data_path(&section),
            PathBuf::from("/etc/tinyrest/data.json")
        );

        section.data = Some(PathBuf::from("/srv/seed.json"));
        assert_eq!(config.data_path(&section), PathBuf::from("/srv/seed.json"));
    }
}
