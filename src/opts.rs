//! Benchmark and backend options.

use std::path::PathBuf;
use std::str::FromStr;

use url::Url;

use crate::error::Error;

/// Environment variable overriding the embedded engine's scratch directory.
pub const SCRATCH_DIR_ENV: &str = "BENCH_SCRATCH_DIR";

/// Environment variables consulted, in order, for the server URL.
pub const DATABASE_URL_ENVS: [&str; 2] = ["BENCH_DATABASE_URL", "DATABASE_URL"];

/// What to do with work left over when N is not a multiple of the batch size
/// or commit interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TailPolicy {
    /// Flush the partial final batch and commit rows pending under manual commit.
    #[default]
    Flush,
    /// Leave the partial batch unsent and pending rows uncommitted.
    Leave,
}

impl FromStr for TailPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s.to_ascii_lowercase().as_str() {
            "flush" => Ok(Self::Flush),
            "leave" => Ok(Self::Leave),
            other => Err(Error::InvalidUsage(format!(
                "Unknown tail policy '{}', expected 'flush' or 'leave'",
                other
            ))),
        }
    }
}

/// Connection options for the server backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerOpts {
    /// Hostname or IP address.
    ///
    /// Default: `"localhost"`
    pub host: String,

    /// Port number of the server.
    ///
    /// Default: `5432`
    pub port: u16,

    /// Username for authentication.
    ///
    /// Default: `"postgres"`
    pub user: String,

    /// Password for authentication. `None` means an empty password.
    ///
    /// Default: `None`
    pub password: Option<String>,

    /// Database name.
    ///
    /// Default: `"postgres"`
    pub database: String,
}

impl Default for ServerOpts {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 5432,
            user: "postgres".into(),
            password: None,
            database: "postgres".into(),
        }
    }
}

impl ServerOpts {
    /// Read the server URL from the environment.
    ///
    /// Returns `Ok(None)` when none of [`DATABASE_URL_ENVS`] is set.
    pub fn from_env() -> Result<Option<Self>, Error> {
        for key in DATABASE_URL_ENVS {
            if let Ok(url) = std::env::var(key) {
                return Self::try_from(url.as_str()).map(Some);
            }
        }
        Ok(None)
    }

    /// Human-readable identity used in logs and connection errors.
    pub fn describe(&self) -> String {
        format!(
            "server {}@{}:{}/{}",
            self.user, self.host, self.port, self.database
        )
    }
}

impl TryFrom<&Url> for ServerOpts {
    type Error = Error;

    /// Parse a server URL.
    ///
    /// Format: `postgres://[user[:password]@]host[:port][/database]`
    fn try_from(url: &Url) -> Result<Self, Self::Error> {
        if !["postgres", "postgresql", "pg"].contains(&url.scheme()) {
            return Err(Error::InvalidUsage(format!(
                "Invalid scheme: expected 'postgres://' or 'pg://', got '{}://'",
                url.scheme()
            )));
        }

        let defaults = ServerOpts::default();
        Ok(ServerOpts {
            host: url.host_str().unwrap_or(&defaults.host).to_string(),
            port: url.port().unwrap_or(defaults.port),
            user: if url.username().is_empty() {
                defaults.user
            } else {
                url.username().to_string()
            },
            password: url.password().map(|s| s.to_string()),
            database: match url.path().strip_prefix('/') {
                Some(db) if !db.is_empty() => db.to_string(),
                _ => defaults.database,
            },
        })
    }
}

impl TryFrom<&str> for ServerOpts {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        let url = Url::parse(s).map_err(|e| Error::InvalidUsage(format!("Invalid URL: {}", e)))?;
        Self::try_from(&url)
    }
}

/// Options shared by every scenario of a suite.
#[derive(Debug, Clone)]
pub struct Opts {
    /// Directory holding the file-backed embedded databases. Wiped at suite start.
    ///
    /// Default: `$BENCH_SCRATCH_DIR` or `<tmp>/employee-bench`
    pub scratch_dir: PathBuf,

    /// Server backend options. `None` disables server scenarios.
    ///
    /// Default: `None`
    pub server: Option<ServerOpts>,

    /// Rows per batch flush for the batched strategy.
    ///
    /// Default: `50`
    pub batch_size: u32,

    /// Executions between explicit commits under manual commit.
    ///
    /// Default: `50`
    pub commit_interval: u32,

    /// Handling of the final partial batch / uncommitted rows.
    ///
    /// Default: `TailPolicy::Flush`
    pub tail: TailPolicy,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            scratch_dir: default_scratch_dir(),
            server: None,
            batch_size: 50,
            commit_interval: 50,
            tail: TailPolicy::Flush,
        }
    }
}

impl Opts {
    /// Default options with the scratch directory and server URL taken from the environment.
    pub fn from_env() -> Result<Self, Error> {
        Ok(Self {
            server: ServerOpts::from_env()?,
            ..Self::default()
        })
    }

    /// Check option values that would make a run meaningless.
    pub fn validate(&self) -> Result<(), Error> {
        if self.batch_size == 0 {
            return Err(Error::InvalidUsage("batch_size must be at least 1".into()));
        }
        if self.commit_interval == 0 {
            return Err(Error::InvalidUsage(
                "commit_interval must be at least 1".into(),
            ));
        }
        if self.scratch_dir.as_os_str().is_empty() {
            return Err(Error::InvalidUsage("scratch_dir is empty".into()));
        }
        Ok(())
    }
}

fn default_scratch_dir() -> PathBuf {
    match std::env::var_os(SCRATCH_DIR_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => std::env::temp_dir().join("employee-bench"),
    }
}
