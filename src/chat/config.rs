//! Configuration types for the chat application.
//!
//! Values are layered: built-in defaults, then the YAML file named by
//! `--config`, then the `LUNA_*` environment variables, then the command line.

use std::path::{Path, PathBuf};
use std::time::Duration;

use arrrg_derive::CommandLine;
use serde::{Deserialize, Serialize};

use crate::client::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use crate::error::{Error, Result};

/// Environment variable overriding the backend URL.
pub const BASE_URL_ENV: &str = "LUNA_BASE_URL";
/// Environment variable supplying the identity provider API key.
pub const FIREBASE_API_KEY_ENV: &str = "LUNA_FIREBASE_API_KEY";

/// Default file holding the active conversation id.
const DEFAULT_STATE_FILE: &str = ".luna-state.json";

/// Command-line arguments for the luna-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    #[arrrg(optional, "Backend URL (default: http://127.0.0.1:5000/)", "URL")]
    pub base_url: Option<String>,

    #[arrrg(optional, "File remembering the active chat (default: .luna-state.json)", "PATH")]
    pub state_file: Option<String>,

    #[arrrg(optional, "Identity provider API key for /login and /signup", "KEY")]
    pub firebase_api_key: Option<String>,

    #[arrrg(optional, "Request timeout in seconds (default: 60)", "SECONDS")]
    pub timeout: Option<u64>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,

    #[arrrg(optional, "YAML configuration file", "PATH")]
    pub config: Option<String>,
}

/// The YAML configuration file.  Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub base_url: Option<String>,
    pub state_file: Option<PathBuf>,
    pub firebase_api_key: Option<String>,
    pub timeout_secs: Option<u64>,
    pub color: Option<bool>,
}

impl ConfigFile {
    /// Parse a configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|err| Error::io(format!("cannot read {}", path.display()), err))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }
}

/// Resolved configuration for a chat session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LunaConfig {
    pub base_url: String,
    pub state_file: PathBuf,
    pub firebase_api_key: Option<String>,
    pub timeout: Duration,
    pub use_color: bool,
}

impl LunaConfig {
    /// Creates a new LunaConfig with default values.
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
            firebase_api_key: None,
            timeout: DEFAULT_TIMEOUT,
            use_color: true,
        }
    }

    /// Resolve the configuration from arguments, the config file they name,
    /// and the process environment.
    pub fn resolve(args: ChatArgs) -> Result<Self> {
        let file = match &args.config {
            Some(path) => Some(ConfigFile::from_file(path)?),
            None => None,
        };
        Ok(Self::layered(args, file, |name| std::env::var(name).ok()))
    }

    /// Layer `file`, then `env`, then `args` over the defaults.
    pub fn layered(
        args: ChatArgs,
        file: Option<ConfigFile>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let mut config = Self::new();
        if let Some(file) = file {
            config = config.with_file(file);
        }
        if let Some(base_url) = env(BASE_URL_ENV).filter(|s| !s.is_empty()) {
            config.base_url = base_url;
        }
        if let Some(key) = env(FIREBASE_API_KEY_ENV).filter(|s| !s.is_empty()) {
            config.firebase_api_key = Some(key);
        }
        config.with_args(args)
    }

    fn with_file(mut self, file: ConfigFile) -> Self {
        if let Some(base_url) = file.base_url {
            self.base_url = base_url;
        }
        if let Some(state_file) = file.state_file {
            self.state_file = state_file;
        }
        if file.firebase_api_key.is_some() {
            self.firebase_api_key = file.firebase_api_key;
        }
        if let Some(secs) = file.timeout_secs {
            self.timeout = Duration::from_secs(secs);
        }
        if let Some(color) = file.color {
            self.use_color = color;
        }
        self
    }

    fn with_args(mut self, args: ChatArgs) -> Self {
        if let Some(base_url) = args.base_url {
            self.base_url = base_url;
        }
        if let Some(state_file) = args.state_file {
            self.state_file = PathBuf::from(state_file);
        }
        if args.firebase_api_key.is_some() {
            self.firebase_api_key = args.firebase_api_key;
        }
        if let Some(secs) = args.timeout {
            self.timeout = Duration::from_secs(secs);
        }
        if args.no_color {
            self.use_color = false;
        }
        self
    }
}

impl Default for LunaConfig {
    fn default() -> Self {
        Self::new()
    }
}
