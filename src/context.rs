use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::backend::{Backend, LocalBackend};
use crate::uri::LOCAL_SCHEME;
use crate::{RemoteUri, Result, StreamError, DEFAULT_BUFFER_SIZE};

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

fn default_scheme() -> String {
    LOCAL_SCHEME.to_owned()
}

/// Settings shared by every stream opened through a [`Context`].
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct Config {
    /// Buffer size used when the caller does not pick one.
    #[serde(default = "default_buffer_size")]
    pub default_buffer_size: usize,
    /// Scheme given to paths written without one.
    #[serde(default = "default_scheme")]
    pub default_scheme: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_buffer_size: default_buffer_size(),
            default_scheme: default_scheme(),
        }
    }
}

impl Config {
    /// Read a JSON configuration file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let config: Config = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        log::debug!(
            "config: loaded {} (buffer size {}, default scheme {})",
            path.as_ref().display(),
            config.default_buffer_size,
            config.default_scheme
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_buffer_size == 0 {
            return Err(StreamError::InvalidBufferSize(0));
        }
        if self.default_scheme.is_empty() {
            return Err(StreamError::Config(
                "default scheme must not be empty".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Explicit replacement for an ambient runtime context: it carries the
/// configuration and the backend serving each URI scheme, and is passed
/// to every open and copy call.
#[derive(Clone)]
pub struct Context {
    config: Config,
    backends: HashMap<String, Arc<dyn Backend>>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Context {
    /// Create a context with the local filesystem serving `file://`.
    pub fn new(config: Config) -> Self {
        let mut ctx = Self {
            config,
            backends: HashMap::new(),
        };
        ctx.register(LOCAL_SCHEME, Arc::new(LocalBackend::new()));
        ctx
    }

    /// Serve `scheme` with `backend`, returning the backend it replaces.
    pub fn register(
        &mut self,
        scheme: &str,
        backend: Arc<dyn Backend>,
    ) -> Option<Arc<dyn Backend>> {
        log::debug!(
            "context: scheme {} served by {} backend",
            scheme,
            backend.name()
        );
        self.backends.insert(scheme.to_ascii_lowercase(), backend)
    }

    pub fn with_backend(
        mut self,
        scheme: &str,
        backend: impl Backend + 'static,
    ) -> Self {
        self.register(scheme, Arc::new(backend));
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Default buffer size for streams opened through this context.
    pub fn buffer_size(&self) -> usize {
        self.config.default_buffer_size
    }

    pub fn schemes(&self) -> impl Iterator<Item = &str> {
        self.backends.keys().map(String::as_str)
    }

    pub fn parse_uri(&self, path: &str) -> Result<RemoteUri> {
        RemoteUri::parse_with_default(path, &self.config.default_scheme)
    }

    /// Backend serving the scheme of `uri`.
    pub fn backend(&self, uri: &RemoteUri) -> Result<Arc<dyn Backend>> {
        self.backends.get(uri.scheme()).cloned().ok_or_else(|| {
            StreamError::UnsupportedScheme(uri.scheme().to_owned())
        })
    }

    /// Parse `path` and find the backend serving it.
    pub fn resolve(&self, path: &str) -> Result<(RemoteUri, Arc<dyn Backend>)> {
        let uri = self.parse_uri(path)?;
        let backend = self.backend(&uri)?;
        Ok((uri, backend))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use std::io::Write;
    use tempdir::TempDir;

    #[test]
    fn local_scheme_is_registered_by_default() {
        let ctx = Context::default();
        let (uri, backend) = ctx.resolve("/tmp/data.txt").unwrap();
        assert_eq!(uri.scheme(), "file");
        assert_eq!(backend.name(), "local");
        assert_eq!(ctx.buffer_size(), DEFAULT_BUFFER_SIZE);
    }

    #[test]
    fn unknown_scheme_is_unsupported() {
        let ctx = Context::default();
        match ctx.resolve("gs://bucket/key") {
            Err(StreamError::UnsupportedScheme(scheme)) => {
                assert_eq!(scheme, "gs")
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("gs:// resolved without a backend"),
        }
    }

    #[test]
    fn registered_backend_serves_scheme() {
        let mut ctx = Context::default();
        let previous = ctx.register("gs", Arc::new(MemoryBackend::new()));
        assert!(previous.is_none());

        let (_, backend) = ctx.resolve("gs://bucket/key").unwrap();
        assert_eq!(backend.name(), "memory");
        assert!(ctx.schemes().any(|scheme| scheme == "gs"));
    }

    #[test]
    fn default_scheme_applies_to_bare_paths() {
        let config = Config {
            default_scheme: "mem".to_owned(),
            ..Config::default()
        };
        let ctx =
            Context::new(config).with_backend("mem", MemoryBackend::new());

        let (uri, backend) = ctx.resolve("bucket/key").unwrap();
        assert_eq!(uri.as_str(), "mem://bucket/key");
        assert_eq!(backend.name(), "memory");
    }

    #[test]
    fn load_config_with_defaults() {
        let temp_dir = TempDir::new("config").unwrap();
        let path = temp_dir.path().join("config.json");
        let mut file = File::create(&path).unwrap();
        file.write_all(br#"{"default_buffer_size": 1024}"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.default_buffer_size, 1024);
        assert_eq!(config.default_scheme, "file");
    }

    #[test]
    fn printed_config_loads_back() {
        let temp_dir = TempDir::new("config").unwrap();
        let path = temp_dir.path().join("config.json");
        let config = Config {
            default_buffer_size: 64,
            default_scheme: "gs".to_owned(),
        };
        let printed = serde_json::to_string_pretty(&config).unwrap();
        std::fs::write(&path, printed).unwrap();

        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn load_config_rejects_zero_buffer() {
        let temp_dir = TempDir::new("config").unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(&path, r#"{"default_buffer_size": 0}"#).unwrap();

        assert!(matches!(
            Config::load(&path),
            Err(StreamError::InvalidBufferSize(0))
        ));
    }

    #[test]
    fn load_config_reports_parse_errors() {
        let temp_dir = TempDir::new("config").unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(Config::load(&path), Err(StreamError::Config(_))));
    }
}
