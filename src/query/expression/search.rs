// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Search fragments (`&search=...`, full lucene syntax)

use crate::value::FieldValue;

/// Search fragment builder.
pub struct Search;

impl Search {
    /// Marker term that no document contains. Any expression carrying it is
    /// answered with an empty result without calling the service.
    pub const SEARCH_FOR_NOTHING: &'static str = "This_Is_Equal_ConstNode_Return_Nothing";

    /// Match-everything expression.
    pub const SEARCH_FOR_EVERYTHING: &'static str = "&search=*";

    /// Fragment that matches no document.
    pub fn nothing() -> String {
        Self::equal(None, &FieldValue::from(Self::SEARCH_FOR_NOTHING), 1.0)
    }

    /// Term query, optionally fielded and boosted: `&search=title:(home)^2`.
    pub fn equal(field: Option<&str>, value: &FieldValue, boost: f32) -> String {
        let term = escape_lucene(&value.to_string());
        let boost = if boost != 1.0 { format!("^{}", boost) } else { String::new() };
        match field {
            Some(field) => format!("&search={}:({}){}", field, term, boost),
            None => format!("&search={}{}", term, boost),
        }
    }
}

/// Escape lucene special characters.
fn escape_lucene(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '+' | '-' | '&' | '|' | '!' | '(' | ')' | '{' | '}' | '[' | ']' | '^' | '"' | '~' | '*' | '?'
            | ':' | '\\' | '/' => {
                escaped.push('\\');
                escaped.push(c);
            }
            _ => escaped.push(c),
        }
    }
    escaped
}
