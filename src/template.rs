//! Compiles page templates ([`compile`]) and applies them to posts
//! ([`apply`]). Templates use Go's `text/template` syntax via [`gtmpl`] and are
//! executed against an object with these fields:
//!
//! * `site`: the [`SiteConfig`] (`title`, `description`, `base_url`, `nav`)
//! * `page`: the post being rendered (`title`, `date`, `url`, `path`,
//!   `url_name`, `file_name`)
//! * `content`: the HTML being wrapped
//! * `options`: the build [`Options`] (`pretty`, `minify`, `test`)
//!
//! Every post goes through two templates. `post` turns the post's HTML into an
//! article fragment, then `universal` wraps that fragment in the site layout.

use crate::config::{Options, SiteConfig};
use crate::load::SourceFile;
use crate::markdown;
use crate::post::Post;
use crate::value;
use gtmpl::{Context, Value};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use tracing::debug;

/// The template that renders a single post's content.
pub const POST_TEMPLATE: &str = "post";

/// The template that wraps page content in the site layout.
pub const UNIVERSAL_TEMPLATE: &str = "universal";

/// Selects template source files for [`crate::load::load`]: everything except
/// hidden files (e.g. editor swap files).
pub fn is_template_file(name: &str) -> bool {
    !name.starts_with('.')
}

/// A compiled template, named after its source file's stem.
pub struct Template {
    pub name: String,
    pub source_path: PathBuf,
    program: gtmpl::Template,
}

impl Template {
    /// Compiles a template from a loaded source file.
    pub fn compile(file: &SourceFile) -> Result<Template> {
        let mut program = gtmpl::Template::default();
        program
            .parse(&file.content)
            .map_err(|err| Error::Parse {
                path: file.path.clone(),
                err: err.to_string(),
            })?;
        Ok(Template {
            name: file.stem().to_owned(),
            source_path: file.path.clone(),
            program,
        })
    }

    /// Executes the template against `data`.
    pub fn render(&self, data: Value) -> std::result::Result<String, String> {
        let context = Context::from(data).map_err(|err| err.to_string())?;
        let mut out: Vec<u8> = Vec::new();
        self.program
            .execute(&mut out, &context)
            .map_err(|err| err.to_string())?;
        String::from_utf8(out).map_err(|err| err.to_string())
    }
}

/// A set of compiled templates, looked up by name.
pub struct Templates(HashMap<String, Template>);

impl Templates {
    /// Looks up a template by exact name.
    pub fn get(&self, name: &str) -> Result<&Template> {
        self.0
            .get(name)
            .ok_or_else(|| Error::Missing(name.to_owned()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Compiles one template per source file. The first malformed template aborts
/// the whole set, as does a second file with an already-seen stem (e.g.
/// `post.html` and `post.tmpl`).
pub fn compile(files: Vec<SourceFile>) -> Result<Templates> {
    let mut templates: HashMap<String, Template> = HashMap::with_capacity(files.len());
    for file in &files {
        let template = Template::compile(file)?;
        if let Some(first) = templates.get(&template.name) {
            return Err(Error::Duplicate {
                name: template.name,
                first: first.source_path.clone(),
                second: template.source_path,
            });
        }
        debug!(name = %template.name, path = %template.source_path.display(), "compiled template");
        templates.insert(template.name.clone(), template);
    }
    Ok(Templates(templates))
}

/// Renders each post's markdown and runs the result through the `post` and
/// `universal` templates, filling in `rendered_html` and `final_output`.
///
/// Both templates are looked up before any post is touched, so a missing one
/// fails the whole step. A template that fails on any single post also fails
/// the whole step; there is no partial result.
pub fn apply(
    mut posts: Vec<Post>,
    templates: &Templates,
    site: &SiteConfig,
    options: &Options,
) -> Result<Vec<Post>> {
    let post_template = templates.get(POST_TEMPLATE)?;
    let universal_template = templates.get(UNIVERSAL_TEMPLATE)?;

    let site = Value::from(site);
    let options = Value::from(options);
    let highlighter = markdown::Highlighter::default();
    for post in posts.iter_mut() {
        post.rendered_html = markdown::to_html(&post.body, &highlighter);
        post.final_output = render_page(post, post_template, universal_template, &site, &options)?;
        debug!(post = %post.url_name, "applied templates");
    }
    Ok(posts)
}

/// Renders a complete page from a post's `rendered_html`: `post_template` turns
/// it into an article fragment, which `universal_template` then wraps.
pub fn render_page(
    post: &Post,
    post_template: &Template,
    universal_template: &Template,
    site: &Value,
    options: &Value,
) -> Result<String> {
    let page = Value::from(post);
    let render = |template: &Template, content: &str| {
        template
            .render(value::context(site, &page, content, options))
            .map_err(|err| Error::Render {
                template: template.name.clone(),
                post: post.source_path.clone(),
                err,
            })
    };
    let article = render(post_template, &post.rendered_html)?;
    render(universal_template, &article)
}

/// The result of a fallible template operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error compiling or applying templates.
#[derive(Debug)]
pub enum Error {
    /// Returned when a template source fails to parse.
    Parse { path: PathBuf, err: String },

    /// Returned when two template files have the same name once their
    /// extensions are stripped.
    Duplicate {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// Returned when a required template doesn't exist.
    Missing(String),

    /// Returned when executing a template against a post fails.
    Render {
        template: String,
        post: PathBuf,
        err: String,
    },
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Parse { path, err } => {
                write!(f, "Parsing template '{}': {}", path.display(), err)
            }
            Error::Duplicate {
                name,
                first,
                second,
            } => write!(
                f,
                "Templates '{}' and '{}' are both named `{}`",
                first.display(),
                second.display(),
                name
            ),
            Error::Missing(name) => write!(f, "Missing required template `{}`", name),
            Error::Render {
                template,
                post,
                err,
            } => write!(
                f,
                "Rendering template `{}` for post '{}': {}",
                template,
                post.display(),
                err
            ),
        }
    }
}

impl std::error::Error for Error {}
