//! Database sessions and the factory that opens them.
//!
//! Every backend exposes the same capability set through [`Session`]:
//! DDL / literal execution, prepare, execute, batch execute, fetch, commit
//! and close. The embedded engine serves both the file-backed and the
//! in-memory mode; the server engine is reached over TCP.

mod embedded;
#[cfg(feature = "server")]
mod server;

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::str::FromStr;

use uuid::Uuid;

use crate::error::{DriverResult, Error, Result};
use crate::handler::RowHandler;
use crate::opts::Opts;
use crate::statement::StatementId;

pub use embedded::EmbeddedSession;
#[cfg(feature = "server")]
pub use server::ServerSession;

/// The three backend modes a scenario can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    EmbeddedFile,
    EmbeddedMemory,
    Server,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BackendKind::EmbeddedFile => "embedded-file",
            BackendKind::EmbeddedMemory => "embedded-memory",
            BackendKind::Server => "server",
        })
    }
}

/// Selects a backend and, for the file mode, the database name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendSpec {
    /// File-backed embedded database under the scratch directory.
    /// `None` picks a fresh random name on every open.
    EmbeddedFile { name: Option<String> },
    /// Non-persistent embedded database with a fresh unique name.
    EmbeddedMemory,
    /// Pre-provisioned server reached over TCP.
    Server,
}

impl BackendSpec {
    /// File-backed database with a fixed name, reused across opens.
    pub fn file(name: impl Into<String>) -> Self {
        BackendSpec::EmbeddedFile {
            name: Some(name.into()),
        }
    }

    /// File-backed database with a fresh random name.
    pub fn fresh_file() -> Self {
        BackendSpec::EmbeddedFile { name: None }
    }
}

impl fmt::Display for BackendSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendSpec::EmbeddedFile { name: Some(name) } => write!(f, "file:{}", name),
            BackendSpec::EmbeddedFile { name: None } => f.write_str("file"),
            BackendSpec::EmbeddedMemory => f.write_str("memory"),
            BackendSpec::Server => f.write_str("server"),
        }
    }
}

impl FromStr for BackendSpec {
    type Err = Error;

    /// Accepts `file`, `file:<name>`, `memory` and `server`.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "file" => Ok(BackendSpec::fresh_file()),
            "memory" | "mem" => Ok(BackendSpec::EmbeddedMemory),
            "server" => Ok(BackendSpec::Server),
            _ => match s.strip_prefix("file:") {
                Some(name) if !name.is_empty() => Ok(BackendSpec::file(name)),
                _ => Err(Error::InvalidUsage(format!(
                    "Invalid backend: expected one of ['file', 'file:<name>', 'memory', 'server'], got {}",
                    s
                ))),
            },
        }
    }
}

/// A live connection to one backend.
///
/// Sessions start in auto-commit mode. With auto-commit off, the first write
/// after a commit opens a transaction that stays open until [`commit`](Self::commit).
/// Dropping a session releases the engine connection; an open transaction is
/// left to the engine's abort rules.
pub trait Session {
    /// Which backend this session talks to.
    fn kind(&self) -> BackendKind;

    /// Identity used in logs and errors (path, memory name or server address).
    fn describe(&self) -> &str;

    /// Positional parameter marker for the 1-based `index`.
    fn placeholder(&self, index: usize) -> String {
        format!("?{}", index)
    }

    fn auto_commit(&self) -> bool;

    /// Switch auto-commit. Enabling it commits any open transaction.
    fn set_auto_commit(&mut self, enabled: bool) -> DriverResult<()>;

    /// True while a manual-commit transaction has uncommitted work.
    fn in_transaction(&self) -> bool;

    /// Execute a statement with no parameters, returning rows affected.
    fn execute(&mut self, sql: &str) -> DriverResult<u64>;

    /// Prepare a statement for repeated execution.
    fn prepare(&mut self, sql: &str) -> DriverResult<StatementId>;

    /// Bind `params` positionally and execute a prepared statement.
    fn execute_prepared(&mut self, stmt: StatementId, params: &[i32]) -> DriverResult<u64>;

    /// Execute a prepared statement once per parameter set.
    ///
    /// Under auto-commit the whole batch is committed as one unit.
    fn execute_batch(&mut self, stmt: StatementId, batch: &[Vec<i32>]) -> DriverResult<u64>;

    /// Release a prepared statement.
    fn close_statement(&mut self, stmt: StatementId) -> DriverResult<()>;

    /// Run a query and feed every row to `handler`. The cursor is released
    /// before this returns.
    fn query(&mut self, sql: &str, handler: &mut dyn RowHandler) -> DriverResult<()>;

    /// Commit the open transaction. No-op when nothing is pending.
    fn commit(&mut self) -> DriverResult<()>;

    /// Close the connection, surfacing any error the engine reports.
    fn close(self: Box<Self>) -> DriverResult<()>;
}

/// Transaction bookkeeping shared by the session implementations.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TxnState {
    pub(crate) auto_commit: bool,
    pub(crate) open: bool,
}

impl TxnState {
    pub(crate) fn new() -> Self {
        Self {
            auto_commit: true,
            open: false,
        }
    }

    /// Whether a BEGIN must be issued before the next write.
    pub(crate) fn needs_begin(&self) -> bool {
        !self.auto_commit && !self.open
    }
}

/// Opens sessions. Sole owner of backend configuration.
#[derive(Debug, Clone)]
pub struct BackendFactory {
    opts: Opts,
}

impl BackendFactory {
    pub fn new(opts: Opts) -> Self {
        Self { opts }
    }

    /// Path of the file-backed database called `name`.
    pub fn file_path(&self, name: &str) -> PathBuf {
        self.opts.scratch_dir.join(format!("db-{}.sqlite", name))
    }

    /// Remove the scratch directory and everything in it, then recreate it empty.
    pub fn clear_scratch_dir(&self) -> Result<()> {
        let dir = &self.opts.scratch_dir;
        match fs::remove_dir_all(dir) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        fs::create_dir_all(dir)?;
        tracing::debug!(dir = %dir.display(), "cleared scratch directory");
        Ok(())
    }

    /// Open a fresh session on the backend selected by `spec`.
    pub fn open(&self, spec: &BackendSpec) -> Result<Box<dyn Session>> {
        match spec {
            BackendSpec::EmbeddedFile { name } => {
                let name = match name {
                    Some(name) => name.clone(),
                    None => Uuid::new_v4().to_string(),
                };
                fs::create_dir_all(&self.opts.scratch_dir)?;
                let path = self.file_path(&name);
                let session = EmbeddedSession::open_file(&path).map_err(|source| {
                    Error::Connection {
                        backend: format!("{} {}", BackendKind::EmbeddedFile, path.display()),
                        source,
                    }
                })?;
                tracing::debug!(backend = %session.describe(), "opened session");
                Ok(Box::new(session))
            }
            BackendSpec::EmbeddedMemory => {
                let name = format!("test{}", Uuid::new_v4().simple());
                let session =
                    EmbeddedSession::open_memory(&name).map_err(|source| Error::Connection {
                        backend: format!("{} {}", BackendKind::EmbeddedMemory, name),
                        source,
                    })?;
                tracing::debug!(backend = %session.describe(), "opened session");
                Ok(Box::new(session))
            }
            BackendSpec::Server => self.open_server(),
        }
    }

    #[cfg(feature = "server")]
    fn open_server(&self) -> Result<Box<dyn Session>> {
        let server = self
            .opts
            .server
            .as_ref()
            .ok_or_else(|| Error::InvalidUsage("no server backend configured".into()))?;
        let session = ServerSession::open(server).map_err(|source| Error::Connection {
            backend: server.describe(),
            source,
        })?;
        tracing::debug!(backend = %session.describe(), "opened session");
        Ok(Box::new(session))
    }

    #[cfg(not(feature = "server"))]
    fn open_server(&self) -> Result<Box<dyn Session>> {
        Err(Error::InvalidUsage(
            "server backend requested but the server feature is not enabled".into(),
        ))
    }
}
