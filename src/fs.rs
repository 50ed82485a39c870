//! Filesystem helpers shared by every branch of the build: the race-tolerant
//! [`ensure_created`] directory materializer and the [`write`] /
//! [`write_many`] output primitives. All of them are asynchronous and report
//! failures with the offending path attached.

use std::fmt;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use tokio::task::JoinSet;
use tracing::debug;

/// Ensures that `path` and all of its ancestors exist as directories.
///
/// The ancestor chain is walked upward until an existing directory is found,
/// then every missing segment is created from the root toward `path`. Any
/// stat failure other than "not found" aborts before anything is created.
///
/// Several branches of a build call this concurrently on paths that share
/// ancestors, so a segment that appears between our existence check and our
/// `create_dir` is treated as created. The operation is idempotent: calling it
/// on an existing directory is a no-op, and a partially created chain is
/// completed by the next call.
pub async fn ensure_created(path: &Path) -> Result<()> {
    let mut missing: Vec<&Path> = Vec::new();
    let mut current = Some(path);
    while let Some(dir) = current {
        // `Path::new("posts").parent()` is the empty path, i.e. the working
        // directory, which always exists.
        if dir.as_os_str().is_empty() {
            break;
        }
        match tokio::fs::metadata(dir).await {
            Ok(meta) if meta.is_dir() => break,
            Ok(_) => return Err(Error::NotADirectory(dir.to_owned())),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                missing.push(dir);
                current = dir.parent();
            }
            Err(err) => {
                return Err(Error::Stat {
                    path: dir.to_owned(),
                    err,
                })
            }
        }
    }

    for dir in missing.into_iter().rev() {
        create_segment(dir).await?;
    }
    Ok(())
}

// Creates a single directory whose parent is known to exist. Losing a creation
// race to another caller counts as success as long as the winner left a
// directory behind.
async fn create_segment(dir: &Path) -> Result<()> {
    match tokio::fs::create_dir(dir).await {
        Ok(()) => {
            debug!(path = %dir.display(), "created directory");
            Ok(())
        }
        Err(err) if err.kind() == ErrorKind::AlreadyExists => {
            match tokio::fs::metadata(dir).await {
                Ok(meta) if meta.is_dir() => Ok(()),
                Ok(_) => Err(Error::NotADirectory(dir.to_owned())),
                Err(err) => Err(Error::Stat {
                    path: dir.to_owned(),
                    err,
                }),
            }
        }
        Err(err) => Err(Error::CreateDir {
            path: dir.to_owned(),
            err,
        }),
    }
}

/// Writes `contents` to `dir/file_name`, replacing any existing file.
pub async fn write(dir: &Path, file_name: &str, contents: String) -> Result<PathBuf> {
    let path = dir.join(file_name);
    match tokio::fs::write(&path, contents).await {
        Ok(()) => {
            debug!(path = %path.display(), "wrote file");
            Ok(path)
        }
        Err(err) => Err(Error::Write { path, err }),
    }
}

/// Writes every `(file_name, contents)` pair into `dir` concurrently. The first
/// failed write aborts the writes still in flight and is returned; on success
/// the written paths are returned in completion order.
pub async fn write_many<I>(dir: &Path, files: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut writes = JoinSet::new();
    for (file_name, contents) in files {
        let dir = dir.to_owned();
        writes.spawn(async move { write(&dir, &file_name, contents).await });
    }

    let mut written = Vec::with_capacity(writes.len());
    while let Some(joined) = writes.join_next().await {
        match joined? {
            Ok(path) => written.push(path),
            Err(err) => {
                writes.abort_all();
                return Err(err);
            }
        }
    }
    Ok(written)
}

/// The result of a fallible filesystem operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failed filesystem operation. Every variant except
/// [`Error::Task`] names the path that was being operated on.
#[derive(Debug)]
pub enum Error {
    /// Returned when checking whether a path exists fails for a reason other
    /// than the path not existing (e.g., permission denied).
    Stat { path: PathBuf, err: io::Error },

    /// Returned when a path that must be a directory exists as something else.
    NotADirectory(PathBuf),

    /// Returned when creating a directory fails for a reason other than it
    /// already existing.
    CreateDir { path: PathBuf, err: io::Error },

    /// Returned when listing a directory's entries fails.
    ReadDir { path: PathBuf, err: io::Error },

    /// Returned when reading a file fails, including when it isn't UTF-8.
    Read { path: PathBuf, err: io::Error },

    /// Returned when writing an output file fails.
    Write { path: PathBuf, err: io::Error },

    /// Returned when a spawned I/O task panics or is cancelled.
    Task(tokio::task::JoinError),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Stat { path, err } => {
                write!(f, "Checking '{}': {}", path.display(), err)
            }
            Error::NotADirectory(path) => {
                write!(f, "'{}' exists but is not a directory", path.display())
            }
            Error::CreateDir { path, err } => {
                write!(f, "Creating directory '{}': {}", path.display(), err)
            }
            Error::ReadDir { path, err } => {
                write!(f, "Listing directory '{}': {}", path.display(), err)
            }
            Error::Read { path, err } => {
                write!(f, "Reading '{}': {}", path.display(), err)
            }
            Error::Write { path, err } => {
                write!(f, "Writing '{}': {}", path.display(), err)
            }
            Error::Task(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Stat { err, .. }
            | Error::CreateDir { err, .. }
            | Error::ReadDir { err, .. }
            | Error::Read { err, .. }
            | Error::Write { err, .. } => Some(err),
            Error::NotADirectory(_) => None,
            Error::Task(err) => Some(err),
        }
    }
}

impl From<tokio::task::JoinError> for Error {
    /// Converts a [`tokio::task::JoinError`] into an [`Error`]. This allows us
    /// to use the `?` operator when joining spawned I/O tasks.
    fn from(err: tokio::task::JoinError) -> Error {
        Error::Task(err)
    }
}
