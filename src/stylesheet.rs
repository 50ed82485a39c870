//! Compiles the site's SCSS stylesheet into CSS with [`grass`].

use crate::config::Options;
use crate::fs;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::task::JoinError;
use tracing::debug;

/// The output file name of the compiled stylesheet.
pub const OUTPUT_FILE: &str = "main.css";

/// The output directory for the stylesheet, relative to the output root.
pub const CSS_DIRECTORY: &str = "css";

/// Reads the stylesheet at `source_path` and compiles it to CSS. `@use` and
/// `@import` rules resolve relative to the stylesheet's directory. The output
/// is compressed when `options.minify` is set and expanded otherwise.
///
/// The source is read asynchronously; compilation itself is CPU-bound and runs
/// on the blocking thread pool.
pub async fn compile(source_path: &Path, options: &Options) -> Result<String> {
    let source = tokio::fs::read_to_string(source_path)
        .await
        .map_err(|err| {
            Error::Read(fs::Error::Read {
                path: source_path.to_owned(),
                err,
            })
        })?;

    let path = source_path.to_owned();
    let load_path = source_path
        .parent()
        .map(Path::to_owned)
        .unwrap_or_default();
    let style = if options.minify {
        grass::OutputStyle::Compressed
    } else {
        grass::OutputStyle::Expanded
    };
    let css = tokio::task::spawn_blocking(move || {
        let options = grass::Options::default().style(style).load_path(&load_path);
        grass::from_string(source, &options).map_err(|err| Error::Compile {
            path,
            err: err.to_string(),
        })
    })
    .await
    .map_err(Error::Task)??;

    debug!(path = %source_path.display(), bytes = css.len(), "compiled stylesheet");
    Ok(css)
}

/// The result of a stylesheet operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error compiling the stylesheet.
#[derive(Debug)]
pub enum Error {
    /// Returned when the stylesheet source can't be read.
    Read(fs::Error),

    /// Returned when the preprocessor rejects the stylesheet.
    Compile { path: PathBuf, err: String },

    /// Returned when the compilation task panics or is cancelled.
    Task(JoinError),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Read(err) => err.fmt(f),
            Error::Compile { path, err } => {
                write!(f, "Compiling stylesheet '{}': {}", path.display(), err)
            }
            Error::Task(err) => write!(f, "Compiling stylesheet: {}", err),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Read(err) => Some(err),
            Error::Compile { .. } => None,
            Error::Task(err) => Some(err),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn write_sources(dir: &Path) -> PathBuf {
        std::fs::write(dir.join("_colors.scss"), "$accent: #ff0000;\n").unwrap();
        let main = dir.join("main.scss");
        std::fs::write(
            &main,
            "@import 'colors';\n\nbody {\n  a {\n    color: $accent;\n  }\n}\n",
        )
        .unwrap();
        main
    }

    #[tokio::test]
    async fn test_compile_resolves_imports() -> Result<()> {
        let tmp = tempfile::tempdir().unwrap();
        let main = write_sources(tmp.path());

        let options = Options {
            minify: false,
            ..Options::default()
        };
        let css = compile(&main, &options).await?;
        assert!(css.contains("body a {"), "{}", css);
        assert!(css.contains("color: #ff0000;"), "{}", css);
        Ok(())
    }

    #[tokio::test]
    async fn test_compile_minified() -> Result<()> {
        let tmp = tempfile::tempdir().unwrap();
        let main = write_sources(tmp.path());

        let css = compile(&main, &Options::default()).await?;
        assert!(css.contains("body a{color:"), "{}", css);
        Ok(())
    }

    #[tokio::test]
    async fn test_compile_missing_source() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("main.scss");
        match compile(&missing, &Options::default()).await {
            Err(Error::Read(fs::Error::Read { path, .. })) => assert_eq!(missing, path),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_compile_malformed() {
        let tmp = tempfile::tempdir().unwrap();
        let main = tmp.path().join("main.scss");
        std::fs::write(&main, "body { color: $undefined; }").unwrap();
        match compile(&main, &Options::default()).await {
            Err(Error::Compile { path, .. }) => assert_eq!(main, path),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_task_failure_is_not_a_read_error() {
        let join_err = tokio::task::spawn_blocking(|| panic!("compiler crashed"))
            .await
            .unwrap_err();
        let err = Error::Task(join_err);
        assert!(
            err.to_string().starts_with("Compiling stylesheet: "),
            "{}",
            err
        );
        assert!(std::error::Error::source(&err).is_some());
    }
}
