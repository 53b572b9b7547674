//! Link rewriting for pages moved one directory deeper.
//!
//! `posts/hello.md` renders to `posts/hello/index.html`, so every relative
//! link written next to the source file now resolves one level too deep.
//! [`adjust_page`] streams each normal section through an HTML-tolerant
//! `quick-xml` reader and:
//!
//! - prefixes relative `img@src` and `a@href` values with `../`,
//! - drops `target="_blank"` from anchors,
//! - replaces the contents of `<pre><code>` blocks with highlighted markup.
//!
//! A bare `&` that does not open a character or entity reference is written
//! back as `&amp;`. Other markup that is not touched is written back byte for
//! byte.

use crate::highlight::{HighlightError, Highlighter};
use crate::paths;
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde::Serialize;
use std::borrow::Cow;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RewriteError {
    #[error("markup error at byte {position}: {source}")]
    Xml {
        position: u64,
        source: quick_xml::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("highlight error: {0}")]
    Highlight(#[from] HighlightError),
    #[error("rewritten markup is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Normal,
    Exercise,
    Quiz,
}

/// One block of rendered page markup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub kind: SectionKind,
    pub content: String,
}

impl Section {
    pub fn normal(content: impl Into<String>) -> Self {
        Self {
            kind: SectionKind::Normal,
            content: content.into(),
        }
    }
}

/// Rewrite the normal sections of a page rendered from `source_path` to
/// `dest_path`.
///
/// Does nothing when both paths share a directory. Returns whether the
/// sections were rewritten.
pub fn adjust_page(
    sections: &mut [Section],
    source_path: &str,
    dest_path: &str,
    highlighter: &(impl Highlighter + ?Sized),
) -> Result<bool, RewriteError> {
    if paths::dirname(source_path) == paths::dirname(dest_path) {
        return Ok(false);
    }
    for section in sections
        .iter_mut()
        .filter(|s| s.kind == SectionKind::Normal)
    {
        section.content = adjust_section(&section.content, highlighter)?;
    }
    Ok(true)
}

/// Concatenate section contents in order, one line break apart.
pub fn combine_content(sections: &[Section]) -> String {
    sections
        .iter()
        .map(|s| s.content.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Whether a link target is relative to the current document.
///
/// Links with a scheme (`https:`, `mailto:`) are not. A bare `?query` or
/// `#fragment` has no path and is not either.
///
/// Unlike a plain "no scheme and a non-empty path" test, root-absolute
/// (`/about`) and protocol-relative (`//cdn.example.com/x.js`) links are also
/// not relative: they resolve the same from any directory, and prefixing them
/// with `../` would break them.
pub fn is_relative(link: &str) -> bool {
    let link = link.trim();
    if has_scheme(link) || link.starts_with('/') {
        return false;
    }
    let path_end = link.find(['?', '#']).unwrap_or(link.len());
    !link[..path_end].is_empty()
}

fn has_scheme(link: &str) -> bool {
    link.find(':').is_some_and(|pos| {
        let scheme = &link[..pos];
        scheme.starts_with(|c: char| c.is_ascii_alphabetic())
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    })
}

/// Escape every `&` that does not open a character or entity reference.
///
/// The reader rejects bare ampersands, which HTML allows in text.
fn escape_bare_ampersands(markup: &str) -> Cow<'_, str> {
    if !markup.contains('&') {
        return Cow::Borrowed(markup);
    }
    let mut escaped = String::with_capacity(markup.len() + 16);
    let mut rest = markup;
    while let Some(pos) = rest.find('&') {
        escaped.push_str(&rest[..pos]);
        rest = &rest[pos + 1..];
        if opens_reference(rest) {
            escaped.push('&');
        } else {
            escaped.push_str("&amp;");
        }
    }
    escaped.push_str(rest);
    Cow::Owned(escaped)
}

/// Whether the text after an `&` is `name;`, `#123;` or `#x1F;`.
fn opens_reference(after: &str) -> bool {
    let end = after
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '#'))
        .unwrap_or(after.len());
    if !after[end..].starts_with(';') {
        return false;
    }
    let name = &after[..end];
    match name.strip_prefix('#') {
        Some(number) => match number.strip_prefix(['x', 'X']) {
            Some(hex) => !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit()),
            None => !number.is_empty() && number.chars().all(|c| c.is_ascii_digit()),
        },
        None => {
            name.starts_with(|c: char| c.is_ascii_alphabetic())
                && name.chars().all(|c| c.is_ascii_alphanumeric())
        }
    }
}

fn html_reader(markup: &str) -> Reader<&[u8]> {
    let mut reader = Reader::from_str(markup);
    let config = reader.config_mut();
    config.trim_text(false);
    config.enable_all_checks(false);
    config.allow_unmatched_ends = true;
    reader
}

fn read<'a>(reader: &mut Reader<&'a [u8]>) -> Result<Event<'a>, RewriteError> {
    reader.read_event().map_err(|source| RewriteError::Xml {
        position: reader.error_position(),
        source,
    })
}

fn is_tag(elem: &BytesStart<'_>, tag: &[u8]) -> bool {
    elem.name().as_ref().eq_ignore_ascii_case(tag)
}

/// Rewrite one section's markup.
pub fn adjust_section(
    markup: &str,
    highlighter: &(impl Highlighter + ?Sized),
) -> Result<String, RewriteError> {
    let markup = escape_bare_ampersands(markup);
    let mut reader = html_reader(&markup);
    let mut writer = Writer::new(Vec::with_capacity(markup.len() + 64));
    let mut pre_depth = 0usize;

    loop {
        match read(&mut reader)? {
            Event::Start(elem) if is_tag(&elem, b"pre") => {
                pre_depth += 1;
                writer.write_event(Event::Start(elem))?;
            }
            Event::End(elem) if elem.name().as_ref().eq_ignore_ascii_case(b"pre") => {
                pre_depth = pre_depth.saturating_sub(1);
                writer.write_event(Event::End(elem))?;
            }
            Event::Start(elem) if pre_depth > 0 && is_tag(&elem, b"code") => {
                let language = code_language(&elem);
                writer.write_event(Event::Start(elem))?;
                let (code, end) = collect_code(&mut reader)?;
                let highlighted = highlighter.highlight(&code, language.as_deref())?;
                writer.write_event(Event::Text(BytesText::from_escaped(highlighted)))?;
                match end {
                    Some(end) => writer.write_event(end)?,
                    None => break,
                }
            }
            Event::Start(elem) if is_link_element(&elem) => {
                writer.write_event(Event::Start(rewrite_links(&elem)))?;
            }
            Event::Empty(elem) if is_link_element(&elem) => {
                writer.write_event(Event::Empty(rewrite_links(&elem)))?;
            }
            Event::Eof => break,
            event => writer.write_event(event)?,
        }
    }

    Ok(String::from_utf8(writer.into_inner())?)
}

fn is_link_element(elem: &BytesStart<'_>) -> bool {
    is_tag(elem, b"a") || is_tag(elem, b"img")
}

/// Rebuild an `<a>` or `<img>` with its link attribute adjusted.
fn rewrite_links(elem: &BytesStart<'_>) -> BytesStart<'static> {
    let anchor = is_tag(elem, b"a");
    let link_attr: &[u8] = if anchor { b"href" } else { b"src" };
    let name = String::from_utf8_lossy(elem.name().as_ref()).into_owned();

    let mut rebuilt = BytesStart::new(name);
    for attr in elem.html_attributes().flatten() {
        let key = attr.key.as_ref();
        let value: Cow<'_, [u8]> = attr.value;
        if anchor && key.eq_ignore_ascii_case(b"target") && value.as_ref() == b"_blank" {
            continue;
        }
        let value = double_quoted(&value);
        if key.eq_ignore_ascii_case(link_attr) && is_relative(&String::from_utf8_lossy(&value)) {
            let mut prefixed = b"../".to_vec();
            prefixed.extend_from_slice(&value);
            rebuilt.push_attribute((key, prefixed.as_slice()));
        } else {
            rebuilt.push_attribute((key, value.as_ref()));
        }
    }
    rebuilt
}

/// A raw attribute value made safe to write between double quotes.
///
/// Values read from single-quoted attributes may hold a literal `"`.
fn double_quoted(value: &[u8]) -> Cow<'_, [u8]> {
    if !value.contains(&b'"') {
        return Cow::Borrowed(value);
    }
    let mut quoted = Vec::with_capacity(value.len() + 8);
    for &byte in value {
        if byte == b'"' {
            quoted.extend_from_slice(b"&quot;");
        } else {
            quoted.push(byte);
        }
    }
    Cow::Owned(quoted)
}

/// First `lang-` or `language-` class token of a code element.
fn code_language(elem: &BytesStart<'_>) -> Option<String> {
    let class = elem
        .html_attributes()
        .flatten()
        .find(|attr| attr.key.as_ref().eq_ignore_ascii_case(b"class"))?;
    let class = String::from_utf8_lossy(&class.value).into_owned();
    class.split_whitespace().find_map(|token| {
        token
            .strip_prefix("lang-")
            .or_else(|| token.strip_prefix("language-"))
            .filter(|lang| !lang.is_empty())
            .map(String::from)
    })
}

/// Read the text of a code element up to its closing tag.
///
/// Nested markup is dropped, only text survives. Returns the unescaped text
/// and the closing event (`None` at end of input).
fn collect_code<'a>(
    reader: &mut Reader<&'a [u8]>,
) -> Result<(String, Option<Event<'a>>), RewriteError> {
    let mut escaped = String::new();
    let mut depth = 0usize;
    loop {
        match read(reader)? {
            Event::Text(text) => escaped.push_str(&String::from_utf8_lossy(&text)),
            Event::GeneralRef(entity) => {
                escaped.push('&');
                escaped.push_str(&String::from_utf8_lossy(&entity));
                escaped.push(';');
            }
            Event::CData(data) => {
                escaped.push_str(&html_escape::encode_text(&String::from_utf8_lossy(&data)));
            }
            Event::Start(elem) if is_tag(&elem, b"code") => depth += 1,
            Event::End(elem) if elem.name().as_ref().eq_ignore_ascii_case(b"code") => {
                if depth == 0 {
                    let code = html_escape::decode_html_entities(&escaped).into_owned();
                    return Ok((code, Some(Event::End(elem))));
                }
                depth -= 1;
            }
            Event::Eof => {
                let code = html_escape::decode_html_entities(&escaped).into_owned();
                return Ok((code, None));
            }
            _ => {}
        }
    }
}
