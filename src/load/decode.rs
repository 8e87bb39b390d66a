// src/load/decode.rs

use anyhow::{anyhow, bail, Result};
use encoding_rs::Encoding;
use std::borrow::Cow;

/// Resolve a WHATWG encoding label (`utf-8`, `iso-8859-1`, `latin1`, ...).
///
/// `iso-8859-1` resolves to windows-1252, a superset for printable text.
pub fn lookup(label: &str) -> Result<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| anyhow!("unknown text encoding `{}`", label))
}

/// Decode `bytes` strictly; a leading BOM overrides `encoding` and is removed.
pub fn decode<'a>(bytes: &'a [u8], encoding: &'static Encoding) -> Result<Cow<'a, str>> {
    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        bail!("input is not valid {}", used.name());
    }
    Ok(text)
}

/// Drop `head` leading and `tail` trailing physical lines.
pub fn trim_lines(text: &str, head: usize, tail: usize) -> &str {
    if head == 0 && tail == 0 {
        return text;
    }
    let bounds: Vec<usize> = text
        .split_inclusive('\n')
        .scan(0usize, |pos, line| {
            *pos += line.len();
            Some(*pos)
        })
        .collect();
    let lines = bounds.len();
    if head + tail >= lines {
        return "";
    }
    let start = if head == 0 { 0 } else { bounds[head - 1] };
    let end = bounds[lines - tail - 1];
    &text[start..end]
}
