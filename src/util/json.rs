use std::io;

use serde::Serialize;
use serde_json::ser::{CharEscape, CompactFormatter, Formatter};

/// Compact JSON formatter escaping strings the way Docker's registry tooling does.
///
/// Legacy manifests embed JSON documents as strings and compare them byte for
/// byte, so `<`, `>`, `&`, U+2028 and U+2029 must be written as `\u` escapes and
/// backspace / form feed must use their `\u00XX` form instead of `\b` / `\f`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DockerJsonFormatter;

impl Formatter for DockerJsonFormatter {
    fn write_string_fragment<W: ?Sized + io::Write>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()> {
        let mut start = 0;
        for (index, ch) in fragment.char_indices() {
            let escaped: &[u8] = match ch {
                '<' => b"\\u003c",
                '>' => b"\\u003e",
                '&' => b"\\u0026",
                '\u{2028}' => b"\\u2028",
                '\u{2029}' => b"\\u2029",
                _ => continue,
            };
            writer.write_all(fragment[start..index].as_bytes())?;
            writer.write_all(escaped)?;
            start = index + ch.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }

    fn write_char_escape<W: ?Sized + io::Write>(&mut self, writer: &mut W, char_escape: CharEscape) -> io::Result<()> {
        match char_escape {
            CharEscape::Backspace => writer.write_all(b"\\u0008"),
            CharEscape::FormFeed => writer.write_all(b"\\u000c"),
            other => CompactFormatter.write_char_escape(writer, other),
        }
    }
}

pub fn to_docker_json_vec<T: ?Sized + Serialize>(value: &T) -> serde_json::Result<Vec<u8>> {
    let mut buffer = Vec::with_capacity(256);
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, DockerJsonFormatter);
    value.serialize(&mut serializer)?;
    Ok(buffer)
}

pub fn to_docker_json_string<T: ?Sized + Serialize>(value: &T) -> serde_json::Result<String> {
    let buffer = to_docker_json_vec(value)?;
    // the formatter only ever writes valid UTF-8
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Copies already encoded JSON text, dropping insignificant whitespace and applying the
/// same HTML-safe escapes as [`DockerJsonFormatter`] inside strings. Number spellings and
/// existing escape sequences are kept as written.
pub fn compact_docker_json(raw: &str) -> String {
    let mut compacted = String::with_capacity(raw.len());
    let mut in_string = false;
    let mut escaped = false;
    for ch in raw.chars() {
        if !in_string {
            match ch {
                ' ' | '\t' | '\n' | '\r' => {}
                '"' => {
                    in_string = true;
                    compacted.push(ch);
                }
                _ => compacted.push(ch),
            }
            continue;
        }
        if escaped {
            escaped = false;
            compacted.push(ch);
            continue;
        }
        match ch {
            '\\' => {
                escaped = true;
                compacted.push(ch);
            }
            '"' => {
                in_string = false;
                compacted.push(ch);
            }
            '<' => compacted.push_str("\\u003c"),
            '>' => compacted.push_str("\\u003e"),
            '&' => compacted.push_str("\\u0026"),
            '\u{2028}' => compacted.push_str("\\u2028"),
            '\u{2029}' => compacted.push_str("\\u2029"),
            _ => compacted.push(ch),
        }
    }
    compacted
}
