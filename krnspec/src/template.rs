//! Named-placeholder text templates.
//!
//! `$name` and `${name}` are replaced from a mapping, `$$` yields a literal
//! `$`. Any other `$` is copied through.
use std::collections::BTreeMap;

use crate::error::{GenError, GenResult};

pub type Mapping = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    name: String,
    source: String,
}

enum Piece<'s> {
    Text(&'s str),
    Placeholder { key: &'s str, raw: &'s str },
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn ident_len(s: &str) -> usize {
    let mut chars = s.char_indices();
    match chars.next() {
        Some((_, c)) if is_ident_start(c) => {}
        _ => return 0,
    }
    chars
        .find(|(_, c)| !is_ident_char(*c))
        .map(|(idx, _)| idx)
        .unwrap_or(s.len())
}

fn pieces(source: &str) -> Vec<Piece<'_>> {
    let mut out = Vec::new();
    let mut rest = source;
    while let Some(pos) = rest.find('$') {
        if pos > 0 {
            out.push(Piece::Text(&rest[..pos]));
        }
        let after = &rest[pos + 1..];
        if after.starts_with('$') {
            out.push(Piece::Text("$"));
            rest = &after[1..];
            continue;
        }
        if let Some(braced) = after.strip_prefix('{') {
            let len = ident_len(braced);
            if len > 0 && braced[len..].starts_with('}') {
                out.push(Piece::Placeholder {
                    key: &braced[..len],
                    raw: &rest[pos..pos + len + 3],
                });
                rest = &braced[len + 1..];
                continue;
            }
        }
        let len = ident_len(after);
        if len > 0 {
            out.push(Piece::Placeholder {
                key: &after[..len],
                raw: &rest[pos..pos + len + 1],
            });
            rest = &after[len..];
            continue;
        }
        out.push(Piece::Text("$"));
        rest = after;
    }
    if !rest.is_empty() {
        out.push(Piece::Text(rest));
    }
    out
}

impl Template {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Distinct placeholder names in order of first use.
    pub fn placeholders(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for piece in pieces(&self.source) {
            if let Piece::Placeholder { key, .. } = piece {
                if !out.iter().any(|existing| existing == key) {
                    out.push(key.to_string());
                }
            }
        }
        out
    }

    /// Replace every placeholder; an unbound one is an error.
    pub fn substitute(&self, values: &Mapping) -> GenResult<String> {
        let mut out = String::with_capacity(self.source.len());
        for piece in pieces(&self.source) {
            match piece {
                Piece::Text(text) => out.push_str(text),
                Piece::Placeholder { key, .. } => {
                    let value = values.get(key).ok_or_else(|| GenError::Template {
                        template: self.name.clone(),
                        key: key.to_string(),
                    })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }

    /// Replace bound placeholders and keep unbound ones verbatim.
    pub fn safe_substitute(&self, values: &Mapping) -> String {
        let mut out = String::with_capacity(self.source.len());
        for piece in pieces(&self.source) {
            match piece {
                Piece::Text(text) => out.push_str(text),
                Piece::Placeholder { key, raw } => match values.get(key) {
                    Some(value) => out.push_str(value),
                    None => out.push_str(raw),
                },
            }
        }
        out
    }
}
