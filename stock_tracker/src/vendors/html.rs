//! Low-level HTML slicing helpers.
//!
//! Deliberately naive: enough structure awareness to pull text out of the
//! vendor pages we track (class/id lookup, balanced closing tags of the same
//! name), without a DOM. Tag and attribute names match case-insensitively.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref OPEN_TAG: Regex =
        Regex::new(r#"(?is)<([a-z][a-z0-9]*)\b((?:[^>"']|"[^"]*"|'[^']*')*)>"#).unwrap();
    static ref CLASS_ATTR: Regex =
        Regex::new(r#"(?is)\bclass\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap();
    static ref ID_ATTR: Regex = Regex::new(r#"(?is)\bid\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap();
    static ref TYPE_ATTR: Regex =
        Regex::new(r#"(?is)\btype\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap();
}

/// An element located in a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Element<'a> {
    /// From `<tag` through the matching `</tag>`
    pub outer: &'a str,
    /// Between the opening and closing tags
    pub inner: &'a str,
}

impl<'a> Element<'a> {
    /// Visible text with tags removed and whitespace collapsed
    pub fn text(&self) -> String {
        strip_tags(self.inner)
    }
}

fn attr_value<'h>(re: &Regex, attrs: &'h str) -> Option<&'h str> {
    let caps = re.captures(attrs)?;
    caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str())
}

fn has_class(attrs: &str, class: &str) -> bool {
    attr_value(&CLASS_ATTR, attrs)
        .map(|value| value.split_whitespace().any(|c| c == class))
        .unwrap_or(false)
}

/// A tag name match must be followed by whitespace, `>` or `/`
fn at_tag_boundary(lc: &str, pos: usize) -> bool {
    matches!(
        lc.as_bytes().get(pos),
        Some(b' ' | b'\t' | b'\n' | b'\r' | b'>' | b'/')
    )
}

/// Find the `</tag>` balancing an element whose content starts at `from`.
///
/// Returns (start of the closing tag, index just past it).
fn find_close(lc: &str, tag: &str, from: usize) -> Option<(usize, usize)> {
    let open = format!("<{tag}");
    let close = format!("</{tag}");
    let mut depth = 1usize;
    let mut pos = from;

    loop {
        let next_close = lc[pos..].find(&close)? + pos;
        let next_open = lc[pos..].find(&open).map(|i| i + pos);

        match next_open {
            Some(o) if o < next_close => {
                if at_tag_boundary(lc, o + open.len()) {
                    depth += 1;
                }
                pos = o + open.len();
            }
            _ => {
                if !at_tag_boundary(lc, next_close + close.len()) {
                    pos = next_close + close.len();
                    continue;
                }
                let end = lc[next_close..].find('>')? + next_close + 1;
                depth -= 1;
                if depth == 0 {
                    return Some((next_close, end));
                }
                pos = end;
            }
        }
    }
}

/// All outermost elements whose opening tag satisfies `matches(tag, attrs)`
fn find_elements<'a, F>(html: &'a str, matches: F) -> Vec<Element<'a>>
where
    F: Fn(&str, &str) -> bool,
{
    let lc = html.to_ascii_lowercase();
    let mut found = Vec::new();
    let mut resume_at = 0usize;

    for caps in OPEN_TAG.captures_iter(html) {
        let (Some(whole), Some(tag), Some(attrs)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        if whole.start() < resume_at {
            continue;
        }
        let tag = tag.as_str().to_ascii_lowercase();
        if !matches(&tag, attrs.as_str()) {
            continue;
        }

        let inner_start = whole.end();
        if attrs.as_str().trim_end().ends_with('/') {
            found.push(Element {
                outer: whole.as_str(),
                inner: "",
            });
            resume_at = inner_start;
            continue;
        }
        if let Some((close_start, end)) = find_close(&lc, &tag, inner_start) {
            found.push(Element {
                outer: &html[whole.start()..end],
                inner: &html[inner_start..close_start],
            });
            resume_at = end;
        }
    }

    found
}

/// Elements carrying `class` as one of their class tokens
pub fn elements_with_class<'a>(html: &'a str, class: &str) -> Vec<Element<'a>> {
    find_elements(html, |_, attrs| has_class(attrs, class))
}

pub fn first_with_id<'a>(html: &'a str, id: &str) -> Option<Element<'a>> {
    find_elements(html, |_, attrs| attr_value(&ID_ATTR, attrs) == Some(id))
        .into_iter()
        .next()
}

/// Elements with the given tag name
pub fn elements_by_tag<'a>(html: &'a str, tag: &str) -> Vec<Element<'a>> {
    let tag = tag.to_ascii_lowercase();
    find_elements(html, |t, _| t == tag)
}

/// Bodies of `<script type="...">` elements with the given type
pub fn script_bodies<'a>(html: &'a str, script_type: &str) -> Vec<&'a str> {
    find_elements(html, |tag, attrs| {
        tag == "script" && attr_value(&TYPE_ATTR, attrs) == Some(script_type)
    })
    .into_iter()
    .map(|el| el.inner)
    .collect()
}

/// Text of all `elements` run together, then whitespace collapsed
pub fn joined_text<'a, I>(elements: I) -> String
where
    I: IntoIterator<Item = Element<'a>>,
{
    let raw: String = elements.into_iter().map(|el| raw_text(el.inner)).collect();
    normalize_ws(&normalize_entities(&raw))
}

/// Joined text of every element with `class`, or an empty string
pub fn class_text(html: &str, class: &str) -> String {
    joined_text(elements_with_class(html, class))
}

/// Joined text of every `tag` element inside any element with `class`
pub fn text_within(html: &str, class: &str, tag: &str) -> String {
    joined_text(
        elements_with_class(html, class)
            .into_iter()
            .flat_map(|el| elements_by_tag(el.inner, tag)),
    )
}

/// Text nodes only; quoted attribute values may contain `>`
fn raw_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    let mut quote: Option<char> = None;
    for ch in s.chars() {
        match (in_tag, quote, ch) {
            (true, Some(q), c) if c == q => quote = None,
            (true, Some(_), _) => {}
            (true, None, '"' | '\'') => quote = Some(ch),
            (true, None, '>') => in_tag = false,
            (true, None, _) => {}
            (false, _, '<') => in_tag = true,
            (false, _, c) => out.push(c),
        }
    }
    out
}

/// Remove all tags, decode the common entities and collapse whitespace
pub fn strip_tags(s: &str) -> String {
    normalize_ws(&normalize_entities(&raw_text(s)))
}

/// Minimal entity decoding
pub fn normalize_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&#36;", "$")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Collapse whitespace runs into one space and trim
pub fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
