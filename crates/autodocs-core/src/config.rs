//! Configuration for the auto-docs daemon.

use crate::vcs::{Credentials, RemoteDescriptor};
use crate::CoreError;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name looked up in the home directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = ".ad.yaml";

/// Daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service name reported in logs
    #[serde(default = "default_name")]
    pub name: String,

    /// HTTP listen address
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Tracked documentation repository
    #[serde(default)]
    pub git: GitConfig,
}

/// Repository settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitConfig {
    /// Remote URL
    #[serde(default)]
    pub uri: String,

    /// Branch to mirror
    #[serde(default = "default_branch")]
    pub branch: String,

    /// Where the working copy lives
    #[serde(default = "default_local_path")]
    pub local_path: PathBuf,

    /// Private key used for SSH remotes
    #[serde(default = "default_ssh_key")]
    pub ssh_key: PathBuf,

    /// User for SSH or HTTP authentication
    #[serde(default = "default_username")]
    pub username: String,

    /// HTTP password, or SSH key passphrase
    #[serde(default)]
    pub password: String,

    /// Fetch timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Poll period in seconds
    #[serde(default = "default_period")]
    pub period: u64,
}

fn default_name() -> String {
    "auto-docs".to_string()
}

fn default_listen() -> String {
    "0.0.0.0:9003".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_branch() -> String {
    "master".to_string()
}

fn default_local_path() -> PathBuf {
    PathBuf::from("/tmp/auto-docs")
}

fn default_ssh_key() -> PathBuf {
    PathBuf::from("/var/auto-docs/keys/id_rsa")
}

fn default_username() -> String {
    "git".to_string()
}

fn default_timeout() -> u64 {
    1500
}

fn default_period() -> u64 {
    300
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: default_name(),
            listen: default_listen(),
            log_level: default_log_level(),
            git: GitConfig::default(),
        }
    }
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            uri: String::new(),
            branch: default_branch(),
            local_path: default_local_path(),
            ssh_key: default_ssh_key(),
            username: default_username(),
            password: String::new(),
            timeout: default_timeout(),
            period: default_period(),
        }
    }
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit path must exist and parse. Without one, `~/.ad.yaml` is
    /// used when present and defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, CoreError> {
        if let Some(path) = path {
            return Self::load_from(path);
        }

        match dirs::home_dir() {
            Some(home) => Self::load_or_default(&home.join(DEFAULT_CONFIG_FILE)),
            None => Ok(Self::default()),
        }
    }

    /// Load `path` if it exists, defaults otherwise.
    ///
    /// A file that exists but cannot be read or parsed is an error naming
    /// the file.
    pub fn load_or_default(path: &Path) -> Result<Self, CoreError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(path)
            .map_err(|e| CoreError::InvalidConfig(format!("{}: {}", path.display(), e)))
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(|e| CoreError::Serialization(e.to_string()))
    }

    /// Check the settings needed to run the server.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.git.uri.trim().is_empty() {
            return Err(CoreError::InvalidConfig("git.uri must be set".into()));
        }
        if self.git.branch.trim().is_empty() {
            return Err(CoreError::InvalidConfig("git.branch must be set".into()));
        }
        if self.git.period == 0 {
            return Err(CoreError::InvalidConfig("git.period must be non-zero".into()));
        }
        if self.git.timeout == 0 {
            return Err(CoreError::InvalidConfig("git.timeout must be non-zero".into()));
        }
        self.listen_addr()?;
        Ok(())
    }

    /// Parsed listen address. A bare `:port` binds every interface.
    pub fn listen_addr(&self) -> Result<SocketAddr, CoreError> {
        let listen = if self.listen.starts_with(':') {
            format!("0.0.0.0{}", self.listen)
        } else {
            self.listen.clone()
        };

        listen
            .parse()
            .map_err(|e| CoreError::InvalidConfig(format!("listen {:?}: {}", self.listen, e)))
    }

    /// Poll period
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.git.period)
    }

    /// Remote to mirror, with credentials chosen from the URI scheme.
    pub fn remote(&self) -> RemoteDescriptor {
        let git = &self.git;
        RemoteDescriptor {
            uri: git.uri.clone(),
            branch: git.branch.clone(),
            local_path: git.local_path.clone(),
            credentials: git.credentials(),
            timeout: Duration::from_secs(git.timeout),
        }
    }
}

impl GitConfig {
    fn credentials(&self) -> Credentials {
        let uri = self.uri.as_str();

        if uri.starts_with("http://") || uri.starts_with("https://") {
            if self.password.is_empty() {
                return Credentials::None;
            }
            return Credentials::UserPass {
                username: self.username.clone(),
                password: self.password.clone(),
            };
        }

        if uri.starts_with("file://") || Path::new(uri).is_absolute() {
            return Credentials::None;
        }

        Credentials::SshKey {
            username: self.username.clone(),
            private_key: self.ssh_key.clone(),
            passphrase: (!self.password.is_empty()).then(|| self.password.clone()),
        }
    }
}
