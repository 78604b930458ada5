//! Directory listing
//!
//! Renders a basic HTML index of a directory. Only reached when listings are
//! enabled and the directory has no `index.html`.

use std::path::Path;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::error::{Result, StationError};

// Everything outside RFC 3986 unreserved characters that could break an href.
const HREF_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'\'')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'#')
    .add(b'?')
    .add(b'%')
    .add(b'/')
    .add(b'\\');

/// A single row of the listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Reads `dir` and returns its entries, directories first, then by name.
pub async fn read_entries(dir: &Path) -> Result<Vec<ListingEntry>> {
    let mut read_dir = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| StationError::from_io(dir, e))?;

    let mut entries = Vec::new();
    while let Some(entry) = read_dir
        .next_entry()
        .await
        .map_err(|e| StationError::from_io(dir, e))?
    {
        let is_dir = entry
            .file_type()
            .await
            .map(|t| t.is_dir())
            .unwrap_or(false);
        entries.push(ListingEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            is_dir,
        });
    }

    entries.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));
    Ok(entries)
}

/// Renders the HTML page for `entries` as seen at `request_path`.
///
/// Links are absolute so they resolve whether or not the request path ends
/// with a slash.
pub fn render_listing(request_path: &str, entries: &[ListingEntry]) -> String {
    let base = if request_path.ends_with('/') {
        request_path.to_string()
    } else {
        format!("{request_path}/")
    };

    let mut html = String::with_capacity(512 + entries.len() * 64);
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>Index of ");
    html.push_str(&escape_html(request_path));
    html.push_str("</title>\n</head>\n<body>\n<h1>Index of ");
    html.push_str(&escape_html(request_path));
    html.push_str("</h1>\n<ul>\n");

    if base != "/" {
        html.push_str("<li><a href=\"");
        html.push_str(&escape_html(&parent_of(&base)));
        html.push_str("\">../</a></li>\n");
    }

    for entry in entries {
        let suffix = if entry.is_dir { "/" } else { "" };
        html.push_str("<li><a href=\"");
        html.push_str(&escape_html(&base));
        html.push_str(&escape_html(
            &utf8_percent_encode(&entry.name, HREF_ENCODE_SET).to_string(),
        ));
        html.push_str(suffix);
        html.push_str("\">");
        html.push_str(&escape_html(&entry.name));
        html.push_str(suffix);
        html.push_str("</a></li>\n");
    }

    html.push_str("</ul>\n</body>\n</html>\n");
    html
}

/// `/a/b/` -> `/a/`
fn parent_of(base: &str) -> String {
    let trimmed = base.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => trimmed[..=idx].to_string(),
        None => "/".to_string(),
    }
}

/// Minimal HTML escaping, enough for file names and paths.
fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
