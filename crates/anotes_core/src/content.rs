use std::sync::OnceLock;

use anyhow::{Context, Result};
use htmd::HtmlToMarkdown;
use htmd::options::{BulletListMarker, CodeBlockStyle, HeadingStyle, Options};
use pulldown_cmark::{Options as MarkdownOptions, Parser, html};
use regex::{Captures, Regex};

pub const BODY_OPEN: &str = "<body>";
pub const BODY_CLOSE: &str = "</body>";

/// Convert a stored note body to Markdown (ATX headings, `-` bullets, fenced code).
pub fn html_to_markdown(html: &str) -> Result<String> {
    let converter = HtmlToMarkdown::builder()
        .options(Options {
            heading_style: HeadingStyle::Atx,
            bullet_list_marker: BulletListMarker::Dash,
            code_block_style: CodeBlockStyle::Fenced,
            ..Default::default()
        })
        .build();
    let markdown = converter
        .convert(html)
        .context("failed to convert note body to markdown")?;
    Ok(markdown.trim().to_string())
}

/// Render Markdown to HTML for the notes app.
///
/// The app ignores CSS margins, so a `<br>` is placed between adjacent blocks. A block
/// followed by a list (or list item) gets none: lists already render with spacing.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = MarkdownOptions::empty();
    options.insert(MarkdownOptions::ENABLE_TABLES);
    options.insert(MarkdownOptions::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(markdown, options);
    let mut rendered = String::new();
    html::push_html(&mut rendered, parser);
    space_blocks(&rendered)
}

fn block_boundary() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)(</(?:h[1-6]|p|ul|ol|blockquote|pre|hr|table)>)\s*<([a-z]{0,2})")
            .expect("block boundary pattern is valid")
    })
}

fn space_blocks(html: &str) -> String {
    block_boundary()
        .replace_all(html, |caps: &Captures| {
            let closing = &caps[1];
            let next = &caps[2];
            if starts_list(next) {
                caps[0].to_string()
            } else {
                format!("{closing}<br><{next}")
            }
        })
        .into_owned()
}

fn starts_list(tag_prefix: &str) -> bool {
    ["ul", "ol", "li"]
        .iter()
        .any(|list| tag_prefix.eq_ignore_ascii_case(list))
}

/// Insert `content` just before the last `</body>`, or at the end when there is none.
///
/// Reference semantics for the append splice that
/// [`crate::notes::update_body_script`] performs inside the host, where the stored
/// body lives. Both use [`BODY_CLOSE`].
pub fn append_html(existing: &str, content: &str) -> String {
    match existing.rfind(BODY_CLOSE) {
        Some(index) => {
            let (head, tail) = existing.split_at(index);
            format!("{head}{content}{tail}")
        }
        None => format!("{existing}{content}"),
    }
}

/// Insert `content` just after the first `<body>`, or at the start when there is none.
///
/// Reference semantics for the host-side prepend splice; see [`append_html`].
pub fn prepend_html(existing: &str, content: &str) -> String {
    match existing.find(BODY_OPEN) {
        Some(index) => {
            let (head, tail) = existing.split_at(index + BODY_OPEN.len());
            format!("{head}{content}{tail}")
        }
        None => format!("{content}{existing}"),
    }
}
