//! Converts post markdown into HTML.

use crate::post::{url_name, MARKDOWN_EXTENSION};
use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, LinkType, Options, Parser, Tag};
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::{SyntaxReference, SyntaxSet};

/// The theme fenced code blocks are highlighted with.
pub const THEME: &str = "InspiredGitHub";

/// Highlights fenced code blocks. Loading the syntax definitions is slow, so
/// build one per site build and share it across posts.
pub struct Highlighter {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
}

impl Default for Highlighter {
    fn default() -> Self {
        Highlighter {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
        }
    }
}

impl Highlighter {
    // The first word of a fence's info string names the language.
    fn syntax(&self, info: &str) -> Option<&SyntaxReference> {
        let lang = info.split_whitespace().next()?;
        self.syntax_set.find_syntax_by_token(lang)
    }

    fn highlight(&self, code: &str, syntax: &SyntaxReference) -> String {
        let highlighted = self
            .theme_set
            .themes
            .get(THEME)
            .and_then(|theme| highlighted_html_for_string(code, &self.syntax_set, syntax, theme).ok());
        match highlighted {
            Some(html) => html,
            None => format!("<pre><code>{}</code></pre>\n", escape(code)),
        }
    }
}

/// Converts markdown to HTML. This never fails; malformed markdown renders as
/// best it can.
///
/// Relative links to other post sources (e.g.
/// `[see also](<2016-01-05_My First Post.md>)`) are rewritten to point at the
/// generated page (`2016-01-05_My-First-Post.html`), since posts are written
/// side by side in the output.
///
/// Fenced code blocks whose language `highlighter` knows are syntax
/// highlighted. Any other code block is left as an escaped
/// `<pre><code>` block.
pub fn to_html(markdown: &str, highlighter: &Highlighter) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    // the code block being highlighted, if any
    let mut block: Option<(&SyntaxReference, String)> = None;
    let events = Parser::new_ext(markdown, options).filter_map(|ev| match ev {
        Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) => {
            match highlighter.syntax(&info) {
                Some(syntax) => {
                    block = Some((syntax, String::new()));
                    None
                }
                None => Some(Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info)))),
            }
        }
        Event::Text(text) if block.is_some() => {
            if let Some((_, code)) = block.as_mut() {
                code.push_str(&text);
            }
            None
        }
        Event::End(Tag::CodeBlock(_)) if block.is_some() => block
            .take()
            .map(|(syntax, code)| Event::Html(highlighter.highlight(&code, syntax).into())),
        ev => Some(convert_event(ev)),
    });

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, events);
    out
}

fn escape(code: &str) -> String {
    code.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn convert_event(ev: Event) -> Event {
    match ev {
        Event::Start(Tag::Link(
            link @ (LinkType::Inline | LinkType::Reference | LinkType::Collapsed | LinkType::Shortcut),
            dest,
            title,
        )) => {
            let dest = match convert_link(&dest) {
                Some(converted) => CowStr::Boxed(converted.into_boxed_str()),
                None => dest,
            };
            Event::Start(Tag::Link(link, dest, title))
        }
        _ => ev,
    }
}

// Returns the rewritten destination for links to post sources, or `None` if
// the link should be left alone.
fn convert_link(dest: &str) -> Option<String> {
    if dest.contains("://") || dest.starts_with('/') || dest.starts_with("mailto:") {
        return None;
    }
    let (path, fragment) = match dest.find('#') {
        Some(i) => dest.split_at(i),
        None => (dest, ""),
    };
    let stem_start = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    let stem = path[stem_start..].strip_suffix(MARKDOWN_EXTENSION)?;
    if stem.is_empty() {
        return None;
    }
    Some(format!("{}{}{}", &path[..stem_start], url_name(stem), fragment))
}
