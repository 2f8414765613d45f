use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};

use crate::cli::Args;
use crate::preview::DecoderChoice;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const ENV_DIR: &str = "SERVGALLERY_DIR";
pub const ENV_PORT: &str = "SERVGALLERY_PORT";

/// Server configuration, fixed for the lifetime of the process
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Canonical gallery root
    pub root: PathBuf,
    pub bind: String,
    pub port: u16,
    pub workers: usize,
    pub decoder: DecoderChoice,
}

impl ServerConfig {
    /// Create ServerConfig from CLI arguments and environment variables
    ///
    /// Priority: CLI args → ENV var (SERVGALLERY_DIR / SERVGALLERY_PORT) → defaults
    pub fn from_env_and_cli(args: &Args) -> Result<Self> {
        Self::from_sources(args, |key| std::env::var(key).ok())
    }

    /// Same as `from_env_and_cli` with an injectable environment lookup
    pub fn from_sources(args: &Args, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let dir = match args.directory.clone().or_else(|| env(ENV_DIR).map(PathBuf::from)) {
            Some(dir) => expand_home(&dir),
            None => std::env::current_dir().context("Failed to read current directory")?,
        };
        let root = std::fs::canonicalize(&dir)
            .with_context(|| format!("Gallery directory not found: {}", dir.display()))?;
        if !root.is_dir() {
            bail!("Gallery root is not a directory: {}", root.display());
        }

        let port = match args.port {
            Some(port) => port,
            None => match env(ENV_PORT) {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .with_context(|| format!("Invalid {}: {:?}", ENV_PORT, raw))?,
                None => DEFAULT_PORT,
            },
        };

        let workers = args.workers.unwrap_or_else(|| num_cpus::get() * 4).max(1);

        Ok(Self {
            root,
            bind: args.bind.clone().unwrap_or_else(|| DEFAULT_BIND.to_string()),
            port,
            workers,
            decoder: DecoderChoice::detect(args.no_preview),
        })
    }

    /// Socket address to listen on
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    /// URL to print for the local user
    pub fn local_url(&self) -> String {
        format!("http://127.0.0.1:{}/", self.port)
    }
}

/// Replace a leading `~` with the home directory
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs_next::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

/// Get path to a data file (logs)
///
/// Platform paths:
/// - Linux: ~/.local/share/servgallery/{name}
/// - macOS: ~/Library/Application Support/servgallery/{name}
/// - Windows: %APPDATA%\servgallery\{name}
pub fn data_file(name: &str) -> PathBuf {
    match dirs_next::data_dir() {
        Some(dir) => dir.join("servgallery").join(name),
        // Fallback: "." if everything else fails
        None => PathBuf::from(".").join(name),
    }
}

/// Create the parent directory of `path` if it's missing
pub fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }
    Ok(())
}
