use anyhow::{Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use schemasync::client::Credentials;
use schemasync::store::{DEFAULT_DIR, SnapshotStore};

/// Optional config file, looked up in the working directory
pub const CONFIG_FILE: &str = "schemasync.toml";

/// Older deployments exported the API location under these names
const FALLBACK_URL_VARS: &[&str] = &["SERVER_MIGRATION_URL", "NEXT_PUBLIC_API_URL"];

/// Connection flags shared by the commands that talk to the CMS
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Base URL of the Directus instance
    #[arg(long, env = "DIRECTUS_URL")]
    pub url: Option<String>,

    /// Admin email for password login
    #[arg(long, env = "ADMIN_EMAIL")]
    pub email: Option<String>,

    /// Admin password for password login
    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Static access token, used instead of email and password
    #[arg(long, env = "DIRECTUS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

/// Configuration stored in schemasync.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub snapshots: SnapshotSettings,
    #[serde(default)]
    pub api: ApiSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotSettings {
    #[serde(default = "default_snapshot_dir")]
    pub dir: String,
}

impl Default for SnapshotSettings {
    fn default() -> Self {
        Self {
            dir: default_snapshot_dir(),
        }
    }
}

fn default_snapshot_dir() -> String {
    DEFAULT_DIR.to_string()
}

/// API settings; every value may reference the environment as `${VAR}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiSettings {
    pub url: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub token: Option<String>,
}

/// Resolved settings for one invocation
pub struct SyncContext {
    /// Path the config file was (or would have been) read from
    pub config_path: PathBuf,
    /// Loaded configuration
    pub config: Option<SyncConfig>,
    /// Directory holding the snapshot files
    pub snapshot_dir: PathBuf,
}

impl SyncContext {
    /// Load context from the current directory
    pub fn load(dir_override: Option<PathBuf>) -> Result<Self> {
        let root = std::env::current_dir().context("Failed to get current directory")?;
        Self::from_root(&root, dir_override)
    }

    /// Load context rooted at `root`; `dir_override` wins over the config file
    pub fn from_root(root: &Path, dir_override: Option<PathBuf>) -> Result<Self> {
        let config_path = root.join(CONFIG_FILE);

        let config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read {}", config_path.display()))?;
            let config: SyncConfig = toml::from_str(&content)
                .with_context(|| format!("Failed to parse {}", config_path.display()))?;
            Some(config)
        } else {
            None
        };

        let snapshot_dir = match dir_override {
            Some(dir) => dir,
            None => {
                let configured = config
                    .as_ref()
                    .map(|c| c.snapshots.dir.as_str())
                    .unwrap_or(DEFAULT_DIR);
                root.join(expand_env(configured)?)
            }
        };

        Ok(Self {
            config_path,
            config,
            snapshot_dir,
        })
    }

    pub fn store(&self) -> SnapshotStore {
        SnapshotStore::new(&self.snapshot_dir)
    }

    fn api_settings(&self) -> ApiSettings {
        self.config
            .as_ref()
            .map(|c| c.api.clone())
            .unwrap_or_default()
    }

    /// Base URL of the CMS: flag or `DIRECTUS_URL`, the legacy variables,
    /// then the config file
    pub fn api_url(&self, args: &ConnectionArgs) -> Result<String> {
        resolve_url(args, &self.api_settings(), |name| std::env::var(name).ok())
    }

    /// Credentials for the CMS; a token wins over email and password
    pub fn credentials(&self, args: &ConnectionArgs) -> Result<Credentials> {
        resolve_credentials(args, &self.api_settings())
    }
}

fn resolve_url(
    args: &ConnectionArgs,
    settings: &ApiSettings,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String> {
    if let Some(url) = non_empty(args.url.clone()) {
        return Ok(url);
    }
    if let Some(url) = FALLBACK_URL_VARS
        .iter()
        .find_map(|name| non_empty(lookup(name)))
    {
        return Ok(url);
    }
    if let Some(url) = settings.url.as_deref() {
        return expand_env(url);
    }
    anyhow::bail!(
        "DIRECTUS_URL is not set. Pass --url, export DIRECTUS_URL or add [api] url to {CONFIG_FILE}"
    )
}

fn resolve_credentials(args: &ConnectionArgs, settings: &ApiSettings) -> Result<Credentials> {
    let from_config = |value: &Option<String>| -> Result<Option<String>> {
        match value.as_deref() {
            Some(raw) => Ok(non_empty(Some(expand_env(raw)?))),
            None => Ok(None),
        }
    };

    let token = match non_empty(args.token.clone()) {
        Some(token) => Some(token),
        None => from_config(&settings.token)?,
    };
    if let Some(token) = token {
        return Ok(Credentials::Token(token));
    }

    let email = match non_empty(args.email.clone()) {
        Some(email) => Some(email),
        None => from_config(&settings.email)?,
    };
    let password = match non_empty(args.password.clone()) {
        Some(password) => Some(password),
        None => from_config(&settings.password)?,
    };

    match (email, password) {
        (Some(email), Some(password)) => Ok(Credentials::Password { email, password }),
        (Some(_), None) => anyhow::bail!("ADMIN_PASSWORD is not set"),
        (None, Some(_)) => anyhow::bail!("ADMIN_EMAIL is not set"),
        (None, None) => anyhow::bail!(
            "No credentials configured. Set DIRECTUS_TOKEN, or ADMIN_EMAIL and ADMIN_PASSWORD"
        ),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Replace every `${VAR}` in `value` with the variable's value
pub fn expand_env(value: &str) -> Result<String> {
    let mut expanded = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start + 2..].find('}') else {
            break;
        };
        let var_name = &rest[start + 2..start + 2 + len];
        let var_value = std::env::var(var_name)
            .with_context(|| format!("Environment variable {var_name} not set"))?;
        expanded.push_str(&rest[..start]);
        expanded.push_str(&var_value);
        rest = &rest[start + 3 + len..];
    }

    expanded.push_str(rest);
    Ok(expanded)
}
