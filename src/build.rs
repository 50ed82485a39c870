//! Exports the [`publish`] function which stitches together the high-level
//! steps of building the output site. The build is two independent branches
//! that run concurrently:
//!
//! 1. Posts: load posts ([`crate::post`]) and templates ([`crate::template`])
//!    side by side, apply the templates, then write one page per post into
//!    `{output}/posts`.
//! 2. Stylesheet: compile the stylesheet ([`crate::stylesheet`]) and write it
//!    to `{output}/css/main.css`.
//!
//! Each branch materializes its output directory ([`crate::fs::ensure_created`])
//! while its inputs are still being prepared, and writes only once both are
//! done. A failure stops the rest of its own branch but never the other
//! branch; [`publish`] reports every branch that failed.

use crate::config::Config;
use crate::fs;
use crate::load::{self, SourceFile};
use crate::post::{self, Post, POSTS_DIRECTORY};
use crate::stylesheet::{self, CSS_DIRECTORY, OUTPUT_FILE};
use crate::template::{self, Templates};
use std::fmt;
use std::path::PathBuf;
use tracing::info;

/// What a successful [`publish`] wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    /// The post pages, in no particular order.
    pub posts: Vec<PathBuf>,

    /// The compiled stylesheet.
    pub stylesheet: PathBuf,
}

/// Builds the site described by `config`. Succeeds only if both branches
/// succeed; otherwise the [`Failure`] holds one entry per failed branch, and
/// whatever the other branch wrote stays on disk. Failures are left to the
/// caller to report.
pub async fn publish(config: &Config) -> std::result::Result<Published, Failure> {
    let (posts, stylesheet) = tokio::join!(publish_posts(config), publish_stylesheet(config));

    let mut failures = Vec::new();
    let posts = match posts {
        Ok(posts) => Some(posts),
        Err(error) => {
            failures.push(BranchFailure {
                branch: Branch::Posts,
                error,
            });
            None
        }
    };
    let stylesheet = match stylesheet {
        Ok(stylesheet) => Some(stylesheet),
        Err(error) => {
            failures.push(BranchFailure {
                branch: Branch::Stylesheet,
                error,
            });
            None
        }
    };

    match (posts, stylesheet) {
        (Some(posts), Some(stylesheet)) => Ok(Published { posts, stylesheet }),
        _ => Err(Failure(failures)),
    }
}

async fn publish_posts(config: &Config) -> Result<Vec<PathBuf>> {
    let output_directory = config.output_directory.join(POSTS_DIRECTORY);
    let (posts, ()) = tokio::try_join!(render_posts(config), async {
        fs::ensure_created(&output_directory)
            .await
            .map_err(Error::from)
    })?;

    let written = fs::write_many(
        &output_directory,
        posts
            .into_iter()
            .map(|post| (post.url_name, post.final_output)),
    )
    .await?;
    info!(count = written.len(), dir = %output_directory.display(), "posts done");
    Ok(written)
}

async fn render_posts(config: &Config) -> Result<Vec<Post>> {
    let (posts, templates) = tokio::try_join!(load_posts(config), load_templates(config))?;
    Ok(template::apply(
        posts,
        &templates,
        &config.site,
        &config.options,
    )?)
}

async fn load_posts(config: &Config) -> Result<Vec<Post>> {
    info!(dir = %config.posts_directory.display(), "loading posts");
    let files: Vec<SourceFile> = load::load(&config.posts_directory, post::is_post_file).await?;
    let posts = post::build_posts(files, &config.site.base_url)?;
    info!(count = posts.len(), "loaded posts");
    Ok(posts)
}

async fn load_templates(config: &Config) -> Result<Templates> {
    info!(dir = %config.templates_directory.display(), "loading templates");
    let files = load::load(&config.templates_directory, template::is_template_file).await?;
    let templates = template::compile(files)?;
    info!(count = templates.len(), "loaded templates");
    Ok(templates)
}

async fn publish_stylesheet(config: &Config) -> Result<PathBuf> {
    let output_directory = config.output_directory.join(CSS_DIRECTORY);
    let (css, ()) = tokio::try_join!(
        async {
            stylesheet::compile(&config.stylesheet, &config.options)
                .await
                .map_err(Error::from)
        },
        async {
            fs::ensure_created(&output_directory)
                .await
                .map_err(Error::from)
        },
    )?;

    let path = fs::write(&output_directory, OUTPUT_FILE, css).await?;
    info!(path = %path.display(), "css done");
    Ok(path)
}

/// One of the independent halves of a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    Posts,
    Stylesheet,
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Branch::Posts => write!(f, "posts"),
            Branch::Stylesheet => write!(f, "stylesheet"),
        }
    }
}

/// A branch that failed, and why.
#[derive(Debug)]
pub struct BranchFailure {
    pub branch: Branch,
    pub error: Error,
}

/// Returned by [`publish`] when at least one branch failed.
#[derive(Debug)]
pub struct Failure(pub Vec<BranchFailure>);

impl Failure {
    /// Whether `branch` is among the failed branches.
    pub fn failed(&self, branch: Branch) -> bool {
        self.0.iter().any(|failure| failure.branch == branch)
    }
}

impl fmt::Display for Failure {
    /// Lists each failed branch with its error.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Publishing failed")?;
        for failure in &self.0 {
            write!(f, "\n  {}: {}", failure.branch, failure.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for Failure {
    /// The first failed branch's error.
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0
            .first()
            .map(|failure| &failure.error as &(dyn std::error::Error + 'static))
    }
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for one branch of a build: loading, parsing, templating,
/// compiling the stylesheet, or writing output.
#[derive(Debug)]
pub enum Error {
    /// Returned for filesystem errors while loading sources, creating output
    /// directories, or writing output files.
    Fs(fs::Error),

    /// Returned for malformed or conflicting posts.
    Post(post::Error),

    /// Returned for template errors, including missing required templates.
    Template(template::Error),

    /// Returned for stylesheet errors.
    Stylesheet(stylesheet::Error),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Fs(err) => err.fmt(f),
            Error::Post(err) => err.fmt(f),
            Error::Template(err) => err.fmt(f),
            Error::Stylesheet(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Fs(err) => Some(err),
            Error::Post(err) => Some(err),
            Error::Template(err) => Some(err),
            Error::Stylesheet(err) => Some(err),
        }
    }
}

impl From<fs::Error> for Error {
    /// Converts [`fs::Error`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: fs::Error) -> Error {
        Error::Fs(err)
    }
}

impl From<post::Error> for Error {
    /// Converts [`post::Error`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: post::Error) -> Error {
        Error::Post(err)
    }
}

impl From<template::Error> for Error {
    /// Converts [`template::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: template::Error) -> Error {
        Error::Template(err)
    }
}

impl From<stylesheet::Error> for Error {
    /// Converts [`stylesheet::Error`]s into [`Error`]. This allows us to use
    /// the `?` operator.
    fn from(err: stylesheet::Error) -> Error {
        Error::Stylesheet(err)
    }
}
