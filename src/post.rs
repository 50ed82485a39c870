//! Defines the [`Post`] type and [`build_posts`], which derives posts from
//! loaded source files. A post's metadata comes entirely from its file name,
//! which must look like `{date}_{title}.md`, e.g.
//! `2016-01-05_My First Post.md`.

use crate::load::SourceFile;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use url::Url;

/// The extension of post source files.
pub const MARKDOWN_EXTENSION: &str = ".md";

/// The output directory for posts, relative to the output root. Also the URL
/// prefix for posts relative to the site's base URL.
pub const POSTS_DIRECTORY: &str = "posts";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Selects post source files for [`crate::load::load`].
pub fn is_post_file(name: &str) -> bool {
    name.ends_with(MARKDOWN_EXTENSION)
}

/// A blog post. Built by [`build_posts`], then filled in by
/// [`crate::template::apply`] with `rendered_html` and `final_output`.
#[derive(Clone, Debug, PartialEq)]
pub struct Post {
    /// The path of the post's source file.
    pub source_path: PathBuf,

    /// The source file's name, e.g. `2016-01-05_My First Post.md`.
    pub file_name: String,

    /// The date parsed from the part of the file name before the first `_`.
    pub date: NaiveDate,

    /// The rest of the file name stem, e.g. `My First Post`.
    pub title: String,

    /// The output file name: the stem with whitespace replaced by `-`, plus
    /// `.html`.
    pub url_name: String,

    /// The output path relative to the output root (`posts/{url_name}`).
    pub path: String,

    /// The absolute URL of the post (the site's base URL joined with `path`).
    pub url: Url,

    /// The raw markdown.
    pub body: String,

    /// The markdown converted to HTML. Empty until templates are applied.
    pub rendered_html: String,

    /// The complete page. Empty until templates are applied.
    pub final_output: String,
}

/// Converts a post file name stem into the name of its output file.
pub fn url_name(stem: &str) -> String {
    let mut name: String = stem
        .chars()
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .collect();
    name.push_str(".html");
    name
}

impl Post {
    /// Builds a post from a source file. Fails if the file name has no `_`
    /// separator, if the part before it isn't a `YYYY-MM-DD` date, or if the
    /// part after it is empty.
    pub fn from_source(file: SourceFile, base_url: &Url) -> Result<Post> {
        let stem = file
            .name
            .strip_suffix(MARKDOWN_EXTENSION)
            .unwrap_or_else(|| file.stem())
            .to_owned();

        let (date, title) = match stem.find('_') {
            Some(i) => (&stem[..i], &stem[i + 1..]),
            None => return Err(Error::MissingSeparator(file.path)),
        };
        let date = NaiveDate::parse_from_str(date, DATE_FORMAT).map_err(|err| {
            Error::InvalidDate {
                path: file.path.clone(),
                date: date.to_owned(),
                err,
            }
        })?;
        if title.trim().is_empty() {
            return Err(Error::EmptyTitle(file.path));
        }

        let url_name = url_name(&stem);
        let path = format!("{}/{}", POSTS_DIRECTORY, url_name);
        Ok(Post {
            url: base_url.join(&path)?,
            title: title.to_owned(),
            source_path: file.path,
            file_name: file.name,
            date,
            url_name,
            path,
            body: file.content,
            rendered_html: String::new(),
            final_output: String::new(),
        })
    }
}

/// Builds a [`Post`] from each source file, sorted newest first (ties are
/// ordered by output name). Fails on the first malformed file name, or if two
/// posts would be written to the same output file.
///
/// `base_url` should end in a trailing slash; see [`crate::config::SiteConfig`].
pub fn build_posts(files: Vec<SourceFile>, base_url: &Url) -> Result<Vec<Post>> {
    let mut posts = files
        .into_iter()
        .map(|file| Post::from_source(file, base_url))
        .collect::<Result<Vec<Post>>>()?;

    let mut seen: HashMap<&str, &PathBuf> = HashMap::with_capacity(posts.len());
    for post in &posts {
        if let Some(first) = seen.insert(&post.url_name, &post.source_path) {
            return Err(Error::DuplicateUrl {
                url_name: post.url_name.clone(),
                first: first.clone(),
                second: post.source_path.clone(),
            });
        }
    }

    posts.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.url_name.cmp(&b.url_name)));
    Ok(posts)
}

/// Represents the result of a [`Post`]-building operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error building a [`Post`]. Every variant names the source
/// file(s) involved.
#[derive(Debug)]
pub enum Error {
    /// Returned when a post file name has no `_` between date and title.
    MissingSeparator(PathBuf),

    /// Returned when the part of the file name before the first `_` isn't a
    /// `YYYY-MM-DD` date.
    InvalidDate {
        path: PathBuf,
        date: String,
        err: chrono::ParseError,
    },

    /// Returned when nothing follows the `_` in a post file name.
    EmptyTitle(PathBuf),

    /// Returned when two post files map onto the same output file.
    DuplicateUrl {
        url_name: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// Returned when the post URL can't be joined onto the base URL.
    UrlParse(url::ParseError),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MissingSeparator(path) => write!(
                f,
                "Post file name '{}' must look like `YYYY-MM-DD_Title.md`",
                path.display()
            ),
            Error::InvalidDate { path, date, err } => write!(
                f,
                "Post '{}' has invalid date `{}`: {}",
                path.display(),
                date,
                err
            ),
            Error::EmptyTitle(path) => {
                write!(f, "Post '{}' has an empty title", path.display())
            }
            Error::DuplicateUrl {
                url_name,
                first,
                second,
            } => write!(
                f,
                "Posts '{}' and '{}' would both be written to `{}`",
                first.display(),
                second.display(),
                url_name
            ),
            Error::UrlParse(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InvalidDate { err, .. } => Some(err),
            Error::UrlParse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<url::ParseError> for Error {
    /// Converts a [`url::ParseError`] into an [`Error`]. It allows us to use
    /// the `?` operator for URL joining.
    fn from(err: url::ParseError) -> Error {
        Error::UrlParse(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::path::Path;

    fn source(name: &str, content: &str) -> SourceFile {
        SourceFile {
            name: name.to_owned(),
            path: Path::new("posts").join(name),
            dir: PathBuf::from("posts"),
            content: content.to_owned(),
        }
    }

    fn base_url() -> Url {
        Url::parse("https://example.org/blog/").unwrap()
    }

    #[test]
    fn test_from_source() -> Result<()> {
        let post = Post::from_source(
            source("2016-01-05_My First Post.md", "# Hello"),
            &base_url(),
        )?;
        assert_eq!(NaiveDate::from_ymd_opt(2016, 1, 5).unwrap(), post.date);
        assert_eq!("My First Post", post.title);
        assert_eq!("2016-01-05_My-First-Post.html", post.url_name);
        assert_eq!("posts/2016-01-05_My-First-Post.html", post.path);
        assert_eq!(
            "https://example.org/blog/posts/2016-01-05_My-First-Post.html",
            post.url.as_str()
        );
        assert_eq!("# Hello", post.body);
        assert!(post.rendered_html.is_empty());
        Ok(())
    }

    #[test]
    fn test_title_keeps_later_underscores() -> Result<()> {
        let post = Post::from_source(source("2020-02-29_snake_case\tnotes.md", ""), &base_url())?;
        assert_eq!("snake_case\tnotes", post.title);
        assert_eq!("2020-02-29_snake_case-notes.html", post.url_name);
        Ok(())
    }

    #[test]
    fn test_missing_separator() {
        match Post::from_source(source("2016-01-05.md", ""), &base_url()) {
            Err(Error::MissingSeparator(path)) => {
                assert_eq!(Path::new("posts/2016-01-05.md"), path)
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_date() {
        match Post::from_source(source("yesterday_Title.md", ""), &base_url()) {
            Err(Error::InvalidDate { date, .. }) => assert_eq!("yesterday", date),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_empty_title() {
        assert!(matches!(
            Post::from_source(source("2016-01-05_.md", ""), &base_url()),
            Err(Error::EmptyTitle(_))
        ));
    }

    #[test]
    fn test_build_posts_sorted_newest_first() -> Result<()> {
        let posts = build_posts(
            vec![
                source("2015-06-01_Old.md", ""),
                source("2017-01-01_New.md", ""),
                source("2016-01-01_B.md", ""),
                source("2016-01-01_A.md", ""),
            ],
            &base_url(),
        )?;
        let titles: Vec<&str> = posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(vec!["New", "A", "B", "Old"], titles);
        Ok(())
    }

    #[test]
    fn test_build_posts_duplicate_url() {
        let result = build_posts(
            vec![
                source("2016-01-05_My Post.md", ""),
                source("2016-01-05_My-Post.md", ""),
            ],
            &base_url(),
        );
        match result {
            Err(Error::DuplicateUrl { url_name, .. }) => {
                assert_eq!("2016-01-05_My-Post.html", url_name)
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
