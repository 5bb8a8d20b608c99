//! Identifier checks for table names, column keys and ORDER BY terms.
//!
//! Column keys arrive as free strings in a [`ValueMap`](crate::ValueMap), so every
//! name is parsed here before it is spliced into statement text. A name is one
//! or more dot-separated segments; a bare segment matches
//! `[A-Za-z_][A-Za-z0-9_$]*`, a `"quoted"` one may hold anything but NUL and
//! doubles its quotes.

use std::iter::Peekable;
use std::str::Chars;

use crate::error::{StoreError, StoreResult};

/// Validate a table name, optionally schema-qualified, and render it.
pub fn table(name: &str) -> StoreResult<String> {
    Ok(render(&segments(name)?))
}

/// Validate a single column key and render it.
pub fn column(name: &str) -> StoreResult<String> {
    let parts = segments(name)?;
    if parts.len() != 1 {
        return Err(StoreError::validation(format!(
            "column key must not be qualified: {name}"
        )));
    }
    Ok(render(&parts))
}

/// Validate an ORDER BY expression: `ident [ASC|DESC] (, ident [ASC|DESC])*`.
///
/// Returns the normalized expression (single spaces, upper-case direction).
pub fn order_by(expr: &str) -> StoreResult<String> {
    let mut terms = Vec::new();
    for raw in expr.split(',') {
        let mut words = raw.split_whitespace();
        let Some(name) = words.next() else {
            return Err(StoreError::validation(format!(
                "empty term in order expression: {expr:?}"
            )));
        };
        let mut term = render(&segments(name)?);
        match words.next() {
            None => {}
            Some(dir) if dir.eq_ignore_ascii_case("asc") => term.push_str(" ASC"),
            Some(dir) if dir.eq_ignore_ascii_case("desc") => term.push_str(" DESC"),
            Some(other) => {
                return Err(StoreError::validation(format!(
                    "invalid sort direction '{other}' in order expression"
                )));
            }
        }
        if let Some(extra) = words.next() {
            return Err(StoreError::validation(format!(
                "unexpected '{extra}' in order expression"
            )));
        }
        terms.push(term);
    }
    Ok(terms.join(", "))
}

enum Segment {
    Bare(String),
    Quoted(String),
}

fn segments(name: &str) -> StoreResult<Vec<Segment>> {
    if name.contains('\0') {
        return Err(StoreError::validation(format!("NUL in identifier {name:?}")));
    }
    let mut chars = name.chars().peekable();
    let mut parts = vec![segment(&mut chars, name)?];
    while let Some(c) = chars.next() {
        if c != '.' {
            return Err(StoreError::validation(format!(
                "unexpected '{c}' in identifier {name:?}"
            )));
        }
        parts.push(segment(&mut chars, name)?);
    }
    Ok(parts)
}

fn segment(chars: &mut Peekable<Chars<'_>>, name: &str) -> StoreResult<Segment> {
    let invalid = |why: &str| StoreError::validation(format!("{why} in identifier {name:?}"));

    if chars.next_if_eq(&'"').is_some() {
        let mut text = String::new();
        loop {
            match chars.next() {
                Some('"') if chars.next_if_eq(&'"').is_some() => text.push('"'),
                Some('"') => break,
                Some(c) => text.push(c),
                None => return Err(invalid("unclosed quote")),
            }
        }
        if text.is_empty() {
            return Err(invalid("empty quoted segment"));
        }
        return Ok(Segment::Quoted(text));
    }

    let text: String = match chars.next_if(|c| *c == '_' || c.is_ascii_alphabetic()) {
        Some(first) => std::iter::once(first)
            .chain(std::iter::from_fn(|| {
                chars.next_if(|c| *c == '_' || *c == '$' || c.is_ascii_alphanumeric())
            }))
            .collect(),
        None => return Err(invalid("empty or malformed segment")),
    };
    Ok(Segment::Bare(text))
}

fn render(parts: &[Segment]) -> String {
    parts
        .iter()
        .map(|part| match part {
            Segment::Bare(s) => s.clone(),
            Segment::Quoted(s) => format!("\"{}\"", s.replace('"', "\"\"")),
        })
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_dotted_and_quoted_tables() {
        for name in ["pets", "public.pets", r#"public."Pets""#, r#""has""quote""#, "col$1"] {
            assert_eq!(table(name).unwrap(), name);
        }
    }

    #[test]
    fn rejects_malformed_names() {
        for name in ["", "1pets", "shop name", "public..pets", "public.", r#""open"#, r#""""#] {
            assert!(table(name).is_err(), "{name:?} should be rejected");
        }
    }

    #[test]
    fn column_rejects_qualified_names() {
        assert_eq!(column("likes").unwrap(), "likes");
        assert!(column("pets.likes").is_err());
        assert!(column("likes; DROP TABLE pets").is_err());
    }

    #[test]
    fn order_by_normalizes_direction() {
        assert_eq!(order_by("id desc").unwrap(), "id DESC");
        assert_eq!(
            order_by("created_at DESC,  name").unwrap(),
            "created_at DESC, name"
        );
    }

    #[test]
    fn order_by_rejects_expressions() {
        assert!(order_by("").is_err());
        assert!(order_by("id desc nulls").is_err());
        assert!(order_by("random()").is_err());
        assert!(order_by("id; DELETE FROM pets").is_err());
        assert!(order_by("id sideways").is_err());
    }
}
