//! Loads the build [`Config`] from a project's `site.yaml`. A project is laid
//! out like this:
//!
//! ```text
//! site.yaml        site metadata, see `Project`
//! posts/           markdown posts named `YYYY-MM-DD_Title.md`
//! templates/       page templates; `post` and `universal` are required
//! css/main.scss    the stylesheet (overridable in site.yaml)
//! ```

use serde::Deserialize;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use url::Url;

/// The name of the project file.
pub const PROJECT_FILE: &str = "site.yaml";

/// The output directory used in test mode, relative to the project root.
pub const TEST_OUTPUT_DIRECTORY: &str = "test";

fn default_output_directory() -> PathBuf {
    PathBuf::from("public")
}

fn default_stylesheet() -> PathBuf {
    PathBuf::from("css/main.scss")
}

/// A link in the site navigation.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct NavEntry {
    pub url: String,
    pub text: String,
}

/// Site metadata made available to every template as `site`.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct SiteConfig {
    pub title: String,

    #[serde(default)]
    pub description: String,

    /// The URL the output directory will be served from. Always ends in a
    /// trailing slash once loaded, so that post paths join beneath it.
    pub base_url: Url,

    #[serde(default)]
    pub nav: Vec<NavEntry>,
}

// The contents of `site.yaml`.
#[derive(Deserialize)]
struct Project {
    #[serde(flatten)]
    site: SiteConfig,

    #[serde(default = "default_output_directory")]
    output_directory: PathBuf,

    #[serde(default = "default_stylesheet")]
    stylesheet: PathBuf,
}

/// Rendering switches made available to every template as `options`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Options {
    /// Whether output should be human-readable.
    pub pretty: bool,

    /// Whether the stylesheet is minified.
    pub minify: bool,

    /// Whether this is a test build (isolated output, `file://` base URL).
    pub test: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            pretty: true,
            minify: true,
            test: false,
        }
    }
}

/// Everything [`crate::build::publish`] needs. Constructed once and only read
/// afterwards.
#[derive(Clone, Debug)]
pub struct Config {
    pub site: SiteConfig,
    pub posts_directory: PathBuf,
    pub templates_directory: PathBuf,
    pub stylesheet: PathBuf,
    pub output_directory: PathBuf,
    pub options: Options,
}

impl Config {
    /// Finds `site.yaml` in `dir` or the nearest parent directory that has one
    /// and loads the project from there. A relative `dir` (including `.`) is
    /// resolved against the working directory first, so the search can climb
    /// past it.
    pub fn from_directory(dir: &Path, test: bool) -> Result<Config> {
        let dir = std::fs::canonicalize(dir).map_err(|err| Error::Resolve {
            path: dir.to_owned(),
            err,
        })?;
        Config::search(&dir, test)
    }

    fn search(dir: &Path, test: bool) -> Result<Config> {
        let path = dir.join(PROJECT_FILE);
        if path.exists() {
            Config::from_project_file(&path, test)
        } else {
            match dir.parent() {
                Some(parent) => Config::search(parent, test),
                None => Err(Error::ProjectNotFound),
            }
        }
    }

    /// Loads the project whose `site.yaml` is at `path`. Source directories
    /// are resolved relative to the file's directory.
    ///
    /// In test mode the output goes to `{project}/test`, the base URL becomes
    /// that directory's `file://` URL so the site can be browsed without a
    /// server, and the stylesheet isn't minified.
    pub fn from_project_file(path: &Path, test: bool) -> Result<Config> {
        let contents = std::fs::read_to_string(path).map_err(|err| Error::Open {
            path: path.to_owned(),
            err,
        })?;
        let project: Project =
            serde_yaml::from_str(&contents).map_err(|err| Error::Deserialize {
                path: path.to_owned(),
                err,
            })?;
        let root = path.parent().unwrap_or_else(|| Path::new("."));
        Config::from_project(project, root, test)
    }

    fn from_project(project: Project, root: &Path, test: bool) -> Result<Config> {
        let mut site = project.site;
        let mut options = Options::default();
        let output_directory = if test {
            let output = absolute(&root.join(TEST_OUTPUT_DIRECTORY))?;
            site.base_url = Url::from_directory_path(&output)
                .map_err(|()| Error::TestBaseUrl(output.clone()))?;
            options.minify = false;
            options.test = true;
            output
        } else {
            root.join(project.output_directory)
        };

        if !site.base_url.path().ends_with('/') {
            let with_slash = format!("{}/", site.base_url.path());
            site.base_url.set_path(&with_slash);
        }

        Ok(Config {
            site,
            posts_directory: root.join("posts"),
            templates_directory: root.join("templates"),
            stylesheet: root.join(project.stylesheet),
            output_directory,
            options,
        })
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_owned());
    }
    match std::env::current_dir() {
        Ok(cwd) => Ok(cwd.join(path)),
        Err(err) => Err(Error::Open {
            path: path.to_owned(),
            err,
        }),
    }
}

/// The result of loading a [`Config`].
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error loading a [`Config`].
#[derive(Debug)]
pub enum Error {
    /// Returned when the directory to start searching from can't be resolved
    /// (e.g., it doesn't exist).
    Resolve { path: PathBuf, err: io::Error },

    /// Returned when no `site.yaml` exists in the directory or any parent.
    ProjectNotFound,

    /// Returned when the project file can't be read.
    Open { path: PathBuf, err: io::Error },

    /// Returned when the project file isn't valid.
    Deserialize {
        path: PathBuf,
        err: serde_yaml::Error,
    },

    /// Returned when the test output directory can't be expressed as a
    /// `file://` URL.
    TestBaseUrl(PathBuf),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Resolve { path, err } => {
                write!(f, "Resolving project directory '{}': {}", path.display(), err)
            }
            Error::ProjectNotFound => write!(
                f,
                "Could not find `{}` in any parent directory",
                PROJECT_FILE
            ),
            Error::Open { path, err } => {
                write!(f, "Opening project file '{}': {}", path.display(), err)
            }
            Error::Deserialize { path, err } => {
                write!(f, "Loading project file '{}': {}", path.display(), err)
            }
            Error::TestBaseUrl(path) => {
                write!(f, "'{}' can't be used as a base URL", path.display())
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Resolve { err, .. } => Some(err),
            Error::ProjectNotFound => None,
            Error::Open { err, .. } => Some(err),
            Error::Deserialize { err, .. } => Some(err),
            Error::TestBaseUrl(_) => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const SITE_YAML: &str = "
title: t3hmun
description: t3hmun's web log
base_url: http://t3hmun.github.io
nav:
  - url: index.html
    text: Home
  - url: info.html
    text: Info
output_directory: t3hmun.github.io
";

    // canonical, so paths compare equal to what `from_directory` resolves
    fn project_dir() -> (tempfile::TempDir, PathBuf) {
        let tmp = tempfile::tempdir().unwrap();
        let root = std::fs::canonicalize(tmp.path()).unwrap();
        std::fs::write(root.join(PROJECT_FILE), SITE_YAML).unwrap();
        (tmp, root)
    }

    #[test]
    fn test_from_directory_searches_parents() -> Result<()> {
        let (_tmp, root) = project_dir();
        let nested = root.join("posts");
        std::fs::create_dir(&nested).unwrap();

        let config = Config::from_directory(&nested, false)?;
        assert_eq!("t3hmun", config.site.title);
        assert_eq!("http://t3hmun.github.io/", config.site.base_url.as_str());
        assert_eq!(
            vec![
                NavEntry {
                    url: "index.html".to_owned(),
                    text: "Home".to_owned()
                },
                NavEntry {
                    url: "info.html".to_owned(),
                    text: "Info".to_owned()
                },
            ],
            config.site.nav
        );
        assert_eq!(root.join("posts"), config.posts_directory);
        assert_eq!(root.join("templates"), config.templates_directory);
        assert_eq!(root.join("css/main.scss"), config.stylesheet);
        assert_eq!(root.join("t3hmun.github.io"), config.output_directory);
        assert_eq!(Options::default(), config.options);
        Ok(())
    }

    #[test]
    fn test_from_relative_directory_searches_parents() -> Result<()> {
        let (_tmp, root) = project_dir();
        let nested = root.join("posts").join("drafts");
        std::fs::create_dir_all(&nested).unwrap();

        // the only test that touches the working directory
        let cwd = std::env::current_dir().unwrap();
        std::env::set_current_dir(&nested).unwrap();
        let result = Config::from_directory(Path::new("."), false);
        std::env::set_current_dir(cwd).unwrap();

        let config = result?;
        assert_eq!(root.join("posts"), config.posts_directory);
        assert_eq!(root.join("t3hmun.github.io"), config.output_directory);
        Ok(())
    }

    #[test]
    fn test_from_missing_directory() {
        let (_tmp, root) = project_dir();
        let missing = root.join("nope");
        match Config::from_directory(&missing, false) {
            Err(Error::Resolve { path, .. }) => assert_eq!(missing, path),
            other => panic!("unexpected result: {:?}", other.map(|c| c.site)),
        }
    }

    #[test]
    fn test_test_mode() -> Result<()> {
        let (_tmp, root) = project_dir();

        let config = Config::from_directory(&root, true)?;
        let output = root.join(TEST_OUTPUT_DIRECTORY);
        assert_eq!(output, config.output_directory);
        assert_eq!(
            Url::from_directory_path(&output).unwrap(),
            config.site.base_url
        );
        assert!(!config.options.minify);
        assert!(config.options.test);
        Ok(())
    }

    #[test]
    fn test_invalid_project_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(PROJECT_FILE);
        std::fs::write(&path, "description: no title or base url\n").unwrap();

        match Config::from_project_file(&path, false) {
            Err(Error::Deserialize { path: got, .. }) => assert_eq!(path, got),
            other => panic!("unexpected result: {:?}", other.map(|c| c.site)),
        }
    }
}
