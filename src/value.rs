//! Conversions from the site's types into template [`Value`]s.

use crate::config::{NavEntry, Options, SiteConfig};
use crate::post::Post;
use gtmpl_value::Value;
use std::collections::HashMap;

fn string(s: &str) -> Value {
    Value::String(s.to_owned())
}

impl From<&NavEntry> for Value {
    fn from(entry: &NavEntry) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("url".to_owned(), string(&entry.url));
        m.insert("text".to_owned(), string(&entry.text));
        Value::Object(m)
    }
}

impl From<&SiteConfig> for Value {
    fn from(site: &SiteConfig) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("title".to_owned(), string(&site.title));
        m.insert("description".to_owned(), string(&site.description));
        m.insert("base_url".to_owned(), string(site.base_url.as_str()));
        m.insert(
            "nav".to_owned(),
            Value::Array(site.nav.iter().map(Value::from).collect()),
        );
        Value::Object(m)
    }
}

impl From<&Options> for Value {
    fn from(options: &Options) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("pretty".to_owned(), Value::Bool(options.pretty));
        m.insert("minify".to_owned(), Value::Bool(options.minify));
        m.insert("test".to_owned(), Value::Bool(options.test));
        Value::Object(m)
    }
}

impl From<&Post> for Value {
    /// Converts a [`Post`] into the `page` object. The markdown and rendered
    /// output are left out; templates get the rendered content as `content`.
    fn from(post: &Post) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("title".to_owned(), string(&post.title));
        m.insert(
            "date".to_owned(),
            Value::String(post.date.format("%Y-%m-%d").to_string()),
        );
        m.insert("url".to_owned(), string(post.url.as_str()));
        m.insert("path".to_owned(), string(&post.path));
        m.insert("url_name".to_owned(), string(&post.url_name));
        m.insert("file_name".to_owned(), string(&post.file_name));
        Value::Object(m)
    }
}

/// Builds the object a template is executed against:
/// `{site, page, content, options}`.
pub fn context(site: &Value, page: &Value, content: &str, options: &Value) -> Value {
    let mut m: HashMap<String, Value> = HashMap::with_capacity(4);
    m.insert("site".to_owned(), site.clone());
    m.insert("page".to_owned(), page.clone());
    m.insert("content".to_owned(), string(content));
    m.insert("options".to_owned(), options.clone());
    Value::Object(m)
}
