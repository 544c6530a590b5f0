//! Tolerant markup tokenizer for mixed CFML/HTML text.
//!
//! Only start tags and end tags become tokens; text, comments, declarations
//! and processing instructions are skipped. Tag and attribute names are ASCII.
//! Slices are only cut at ASCII structural bytes, so every offset stays on a
//! UTF-8 boundary.

use cf_core::{ByteRange, CaseMap, LineIndex};

use crate::diagnostics::Diagnostics;
use crate::prefs::ParserPreferences;

const CFML_COMMENT_START: &str = "<!---";
const CFML_COMMENT_END: &str = "--->";
const HTML_COMMENT_START: &str = "<!--";
const HTML_COMMENT_END: &str = "-->";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum MarkupToken {
    StartTag(StartTagToken),
    /// A zero-length range marks an end tag synthesized at end of input.
    EndTag { name: String, range: ByteRange },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StartTagToken {
    pub(crate) name: String,
    pub(crate) range: ByteRange,
    pub(crate) attributes: CaseMap<String>,
    pub(crate) raw_attributes: String,
    pub(crate) self_closing: bool,
}

pub(crate) fn tokenize(
    input: &str,
    prefs: &ParserPreferences,
    lines: &LineIndex,
    diagnostics: &mut Diagnostics,
) -> Vec<MarkupToken> {
    let bytes = input.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;

    while let Some(rel) = input[i..].find('<') {
        i += rel;
        let rest = &input[i..];

        if rest.starts_with(CFML_COMMENT_START) {
            i = skip_cfml_comment(input, i, lines, diagnostics);
            continue;
        }
        if rest.starts_with(HTML_COMMENT_START) {
            let body_start = HTML_COMMENT_START.len();
            match rest[body_start..].find(HTML_COMMENT_END) {
                Some(end) => i += body_start + end + HTML_COMMENT_END.len(),
                None => {
                    diagnostics.warn(format!(
                        "Unterminated comment at {}",
                        describe(lines, i)
                    ));
                    break;
                }
            }
            continue;
        }
        if rest.starts_with("<!") || rest.starts_with("<?") {
            let (terminator, kind) = if rest.starts_with("<?") {
                ("?>", "processing instruction")
            } else {
                (">", "declaration")
            };
            match rest[2..].find(terminator) {
                Some(end) => i += 2 + end + terminator.len(),
                None => {
                    diagnostics.warn(format!(
                        "Unterminated {} at {}",
                        kind,
                        describe(lines, i)
                    ));
                    break;
                }
            }
            continue;
        }

        if rest.starts_with("</") {
            let name_end = scan_name(bytes, i + 2);
            if name_end == i + 2 {
                i += 2;
                continue;
            }
            let name = prefs.normalize_name(&input[i + 2..name_end]);
            let close = match input[name_end..].find('>') {
                Some(rel) => name_end + rel + 1,
                None => {
                    diagnostics.error(format!(
                        "Unterminated end tag </{}> at {}",
                        name,
                        describe(lines, i)
                    ));
                    input.len()
                }
            };
            log::trace!(target: "cfml.tags", "end tag </{}> at {}", name, i);
            out.push(MarkupToken::EndTag {
                name,
                range: ByteRange::new(i, close),
            });
            i = close;
            continue;
        }

        let name_end = scan_name(bytes, i + 1);
        if name_end == i + 1 {
            i += 1;
            continue;
        }
        let name = prefs.normalize_name(&input[i + 1..name_end]);
        let Some(close) = find_tag_close(bytes, name_end) else {
            diagnostics.error(format!(
                "Unterminated start tag <{}> at {}",
                name,
                describe(lines, i)
            ));
            i = name_end;
            continue;
        };

        let inner = &input[name_end..close];
        let (raw_attributes, self_closing) = match inner.trim_end().strip_suffix('/') {
            Some(stripped) => (stripped.trim(), true),
            None => (inner.trim(), false),
        };
        let attributes = if prefs.is_expression_tag(&name) {
            CaseMap::case_insensitive()
        } else {
            parse_attributes(raw_attributes)
        };
        let raw_body = !self_closing && prefs.is_raw_body(&name);
        log::trace!(target: "cfml.tags", "start tag <{}> at {}", name, i);
        out.push(MarkupToken::StartTag(StartTagToken {
            name: name.clone(),
            range: ByteRange::new(i, close + 1),
            attributes,
            raw_attributes: raw_attributes.to_string(),
            self_closing,
        }));
        i = close + 1;

        if raw_body {
            match find_raw_close_tag(input, i, &name) {
                Some(range) => {
                    out.push(MarkupToken::EndTag { name, range });
                    i = range.end;
                }
                None => {
                    diagnostics.warn(format!(
                        "Missing </{}> for <{}> at {}; body runs to end of input",
                        name,
                        name,
                        describe(lines, i)
                    ));
                    out.push(MarkupToken::EndTag {
                        name,
                        range: ByteRange::new(input.len(), input.len()),
                    });
                    break;
                }
            }
        }
    }

    out
}

pub(crate) fn describe(lines: &LineIndex, offset: usize) -> String {
    let location = lines.location(offset);
    format!("line {}, column {}", location.line, location.column)
}

fn is_name_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b':' | b'_' | b'.' | b'-')
}

/// Returns the end of a tag name starting at `start`, or `start` when none begins there.
fn scan_name(bytes: &[u8], start: usize) -> usize {
    if start >= bytes.len() || !bytes[start].is_ascii_alphabetic() {
        return start;
    }
    let mut end = start + 1;
    while end < bytes.len() && is_name_byte(bytes[end]) {
        end += 1;
    }
    end
}

/// Index of the `>` closing a start tag; quoted `>` does not count.
fn find_tag_close(bytes: &[u8], from: usize) -> Option<usize> {
    let mut quote: Option<u8> = None;
    for (index, &byte) in bytes.iter().enumerate().skip(from) {
        match quote {
            Some(open) if byte == open => quote = None,
            Some(_) => {}
            None if byte == b'"' || byte == b'\'' => quote = Some(byte),
            None if byte == b'>' => return Some(index),
            None => {}
        }
    }
    None
}

fn find_raw_close_tag(input: &str, from: usize, name: &str) -> Option<ByteRange> {
    let bytes = input.as_bytes();
    let mut pos = from;
    while let Some(rel) = input[pos..].find("</") {
        let start = pos + rel;
        let name_start = start + 2;
        let name_end = name_start + name.len();
        if name_end <= bytes.len() && bytes[name_start..name_end].eq_ignore_ascii_case(name.as_bytes())
        {
            let mut k = name_end;
            while k < bytes.len() && bytes[k].is_ascii_whitespace() {
                k += 1;
            }
            if k < bytes.len() && bytes[k] == b'>' {
                return Some(ByteRange::new(start, k + 1));
            }
        }
        pos = name_start;
    }
    None
}

fn skip_cfml_comment(
    input: &str,
    start: usize,
    lines: &LineIndex,
    diagnostics: &mut Diagnostics,
) -> usize {
    let mut depth = 0usize;
    let mut pos = start;
    loop {
        let open = input[pos..].find(CFML_COMMENT_START);
        let close = input[pos..].find(CFML_COMMENT_END);
        match (open, close) {
            (Some(open), Some(close)) if open < close => {
                depth += 1;
                pos += open + CFML_COMMENT_START.len();
            }
            (Some(open), None) => {
                depth += 1;
                pos += open + CFML_COMMENT_START.len();
            }
            (_, Some(close)) => {
                depth -= 1;
                pos += close + CFML_COMMENT_END.len();
                if depth == 0 {
                    return pos;
                }
            }
            (None, None) => {
                diagnostics.warn(format!(
                    "Unterminated CFML comment at {}",
                    describe(lines, start)
                ));
                return input.len();
            }
        }
    }
}

fn parse_attributes(raw: &str) -> CaseMap<String> {
    let bytes = raw.as_bytes();
    let len = bytes.len();
    let mut attributes = CaseMap::case_insensitive();
    let mut k = 0;

    let skip_whitespace = |k: &mut usize| {
        while *k < len && bytes[*k].is_ascii_whitespace() {
            *k += 1;
        }
    };
    let is_attribute_name_byte = |byte: u8| {
        !byte.is_ascii_whitespace() && !matches!(byte, b'=' | b'"' | b'\'' | b'>' | b'/')
    };

    loop {
        skip_whitespace(&mut k);
        if k >= len {
            break;
        }
        let name_start = k;
        while k < len && is_attribute_name_byte(bytes[k]) {
            k += 1;
        }
        if name_start == k {
            k += 1;
            continue;
        }
        let name = &raw[name_start..k];

        skip_whitespace(&mut k);
        let value = if k < len && bytes[k] == b'=' {
            k += 1;
            skip_whitespace(&mut k);
            if k < len && (bytes[k] == b'"' || bytes[k] == b'\'') {
                let quote = bytes[k];
                k += 1;
                let value_start = k;
                while k < len && bytes[k] != quote {
                    k += 1;
                }
                let value = &raw[value_start..k];
                if k < len {
                    k += 1;
                }
                value
            } else {
                let value_start = k;
                while k < len && !bytes[k].is_ascii_whitespace() {
                    k += 1;
                }
                &raw[value_start..k]
            }
        } else {
            ""
        };
        attributes.put(name, value.to_string());
    }

    attributes
}
