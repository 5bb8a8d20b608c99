//! Named-parameter binding.
//!
//! Statements are assembled with `:name` placeholders and a [`ValueMap`];
//! tokio-postgres binds positionally, so [`bind`] rewrites each distinct name to
//! `$k` and lines the values up in the same order.
//!
//! The scanner leaves `::type` casts, quoted identifiers and comments
//! untouched, along with string literals in all three forms: `'...'`,
//! `E'...'` with backslash escapes, and `$tag$...$tag$`.

use crate::error::{StoreError, StoreResult};
use crate::value::{Value, ValueMap};

/// Walk `sql`, replacing every `:name` placeholder with the text `f` returns.
fn rewrite(sql: &str, mut f: impl FnMut(&str) -> StoreResult<String>) -> StoreResult<String> {
    let chars: Vec<char> = sql.chars().collect();
    let mut out = String::with_capacity(sql.len() + 8);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\'' | '"' => {
                let quote = c;
                let backslash_escapes = quote == '\'' && is_escape_prefix(&chars, i);
                out.push(c);
                i += 1;
                while i < chars.len() {
                    out.push(chars[i]);
                    if backslash_escapes && chars[i] == '\\' {
                        if let Some(&next) = chars.get(i + 1) {
                            out.push(next);
                        }
                        i += 2;
                        continue;
                    }
                    if chars[i] == quote {
                        // doubled quote is an escape, keep scanning
                        if chars.get(i + 1) == Some(&quote) {
                            out.push(quote);
                            i += 2;
                            continue;
                        }
                        i += 1;
                        break;
                    }
                    i += 1;
                }
            }
            '$' => match dollar_tag(&chars, i) {
                Some(tag_len) => {
                    let tag = &chars[i..i + tag_len];
                    let end = (i + tag_len..=chars.len().saturating_sub(tag_len))
                        .find(|&j| chars[j..j + tag_len] == *tag)
                        .map_or(chars.len(), |j| j + tag_len);
                    out.extend(&chars[i..end]);
                    i = end;
                }
                None => {
                    out.push(c);
                    i += 1;
                }
            },
            '-' if chars.get(i + 1) == Some(&'-') => {
                while i < chars.len() && chars[i] != '\n' {
                    out.push(chars[i]);
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                out.push_str("/*");
                i += 2;
                while i < chars.len() {
                    if chars[i] == '*' && chars.get(i + 1) == Some(&'/') {
                        out.push_str("*/");
                        i += 2;
                        break;
                    }
                    out.push(chars[i]);
                    i += 1;
                }
            }
            ':' if chars.get(i + 1) == Some(&':') => {
                out.push_str("::");
                i += 2;
            }
            ':' if chars
                .get(i + 1)
                .is_some_and(|n| *n == '_' || n.is_ascii_alphabetic()) =>
            {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && (chars[end] == '_' || chars[end].is_ascii_alphanumeric())
                {
                    end += 1;
                }
                let name: String = chars[start..end].iter().collect();
                out.push_str(&f(&name)?);
                i = end;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    Ok(out)
}

/// `'` at `quote` opens an `E'...'` literal.
fn is_escape_prefix(chars: &[char], quote: usize) -> bool {
    let is_word = |c: &char| *c == '_' || c.is_ascii_alphanumeric();
    quote >= 1
        && matches!(chars[quote - 1], 'E' | 'e')
        && !(quote >= 2 && is_word(&chars[quote - 2]))
}

/// Length of the `$tag$` opening a dollar-quoted literal at `start`.
/// `$1` style positional parameters are not tags.
fn dollar_tag(chars: &[char], start: usize) -> Option<usize> {
    if start >= 1 && (chars[start - 1] == '_' || chars[start - 1].is_ascii_alphanumeric()) {
        return None;
    }
    let mut j = start + 1;
    if chars.get(j).is_some_and(|c| *c == '_' || c.is_ascii_alphabetic()) {
        while chars.get(j).is_some_and(|c| *c == '_' || c.is_ascii_alphanumeric()) {
            j += 1;
        }
    }
    (chars.get(j) == Some(&'$')).then_some(j + 1 - start)
}

/// Names of all placeholders in `sql`, in first-appearance order, deduplicated.
pub fn placeholder_names(sql: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    // the closure never fails
    let _ = rewrite(sql, |name| {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
        Ok(String::new())
    });
    names
}

/// Replace the placeholder `:from` with `:to`, leaving longer names that merely
/// start with `from` alone.
pub fn rename_placeholder(sql: &str, from: &str, to: &str) -> String {
    rewrite(sql, |name| {
        Ok(if name == from {
            format!(":{to}")
        } else {
            format!(":{name}")
        })
    })
    .unwrap_or_else(|_| sql.to_string())
}

/// Rewrite `:name` placeholders to `$k` and collect values positionally.
///
/// Fails with [`StoreError::MissingParam`] when a placeholder has no bound value.
/// Entries of `bound` that the statement never references are ignored.
pub fn bind(sql: &str, bound: &ValueMap) -> StoreResult<(String, Vec<Value>)> {
    let mut order: Vec<String> = Vec::new();
    let mut params: Vec<Value> = Vec::new();

    let exec_sql = rewrite(sql, |name| {
        if let Some(pos) = order.iter().position(|n| n == name) {
            return Ok(format!("${}", pos + 1));
        }
        let value = bound
            .get(name)
            .ok_or_else(|| StoreError::MissingParam(name.to_string()))?;
        order.push(name.to_string());
        params.push(value.clone());
        Ok(format!("${}", params.len()))
    })?;

    Ok((exec_sql, params))
}
