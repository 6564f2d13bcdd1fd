// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Remote expression fragments and their composition.
//!
//! An expression is a query-string fragment with up to two predicate parts:
//!
//! ```text
//! &search=<lucene query>&$filter=<odata filter>
//! ```
//!
//! The service intersects both parts. Composition rules:
//!
//! ```text
//! nothing AND x     → nothing        everything AND x → x
//! nothing OR x      → x              everything OR x  → everything
//! NOT nothing       → everything     NOT everything   → nothing
//! ```
//!
//! A search part that has to take part in OR / NOT is folded into the filter
//! as `search.ismatch(...)`, since the two parameters can only be ANDed.

mod filter;
mod search;

pub use filter::{Filter, Inclusion};
pub use search::Search;

use filter::escape_literal;
use std::fmt;

const SEARCH_PARAM: &str = "&search=";
const FILTER_PARAM: &str = "&$filter=";

/// Logical operator used when merging two fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
}

impl LogicalOperator {
    fn filter_keyword(&self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
        }
    }

    fn search_keyword(&self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

fn leading_marker(rest: &str) -> Option<(bool, &'static str)> {
    if rest.starts_with(SEARCH_PARAM) {
        Some((false, SEARCH_PARAM))
    } else if rest.starts_with(FILTER_PARAM) {
        Some((true, FILTER_PARAM))
    } else {
        None
    }
}

/// Offset of the next parameter marker in `body`. Filter bodies skip
/// `'...'` literals (a doubled quote stays inside), search bodies skip
/// backslash-escaped characters.
fn next_marker(body: &str, is_filter: bool) -> Option<usize> {
    let bytes = body.as_bytes();
    let mut in_literal = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' if is_filter => in_literal = !in_literal,
            b'\\' if !is_filter => i += 1,
            b'&' if !in_literal && leading_marker(&body[i..]).is_some() => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}

/// Parsed predicate expression.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Expression {
    search: Option<String>,
    filter: Option<String>,
}

impl Expression {
    /// Expression with no predicate at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Match-everything marker (`&search=*`).
    pub fn everything() -> Self {
        Self { search: Some("*".to_string()), filter: None }
    }

    /// Match-nothing sentinel.
    pub fn nothing() -> Self {
        Self::parse(&Search::nothing())
    }

    /// Split a fragment into its search and filter parts.
    ///
    /// Markers inside a quoted filter literal or behind a lucene escape are
    /// part of the value. Unknown parameters are dropped; fragments produced
    /// by [`Filter`] and [`Search`] only ever carry these two.
    pub fn parse(fragment: &str) -> Self {
        let mut expression = Self::default();
        let mut rest = fragment.trim_start();

        while !rest.is_empty() {
            let Some((is_filter, marker)) = leading_marker(rest) else {
                let step = rest.chars().next().map_or(1, char::len_utf8);
                rest = rest[step..].find('&').map_or("", |at| &rest[step + at..]);
                continue;
            };
            let body = &rest[marker.len()..];
            let end = next_marker(body, is_filter).unwrap_or(body.len());
            let part = body[..end].trim();
            if !part.is_empty() {
                let slot = if is_filter { &mut expression.filter } else { &mut expression.search };
                *slot = Some(part.to_string());
            }
            rest = &body[end..];
        }

        expression
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.search.is_none() && self.filter.is_none()
    }

    #[must_use]
    pub fn is_nothing(&self) -> bool {
        self.search
            .as_deref()
            .is_some_and(|s| s.contains(Search::SEARCH_FOR_NOTHING))
    }

    #[must_use]
    pub fn is_everything(&self) -> bool {
        self.search.as_deref() == Some("*") && self.filter.is_none()
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    /// Merge with another expression. `wrap` parenthesizes both operands.
    pub fn merge(self, other: Expression, op: LogicalOperator, wrap: bool) -> Expression {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self;
        }

        match op {
            LogicalOperator::And => {
                if self.is_nothing() || other.is_nothing() {
                    return Self::nothing();
                }
                if self.is_everything() {
                    return other;
                }
                if other.is_everything() {
                    return self;
                }
                Expression {
                    search: join(self.search, other.search, op.search_keyword(), true),
                    filter: join(self.filter, other.filter, op.filter_keyword(), wrap),
                }
            }
            LogicalOperator::Or => {
                if self.is_nothing() {
                    return other;
                }
                if other.is_nothing() {
                    return self;
                }
                if self.is_everything() || other.is_everything() {
                    return Self::everything();
                }
                if self.filter.is_none() && other.filter.is_none() {
                    return Expression {
                        search: join(self.search, other.search, op.search_keyword(), true),
                        filter: None,
                    };
                }
                let left = self.into_filter_form();
                let right = other.into_filter_form();
                Expression {
                    search: None,
                    filter: join(left.filter, right.filter, op.filter_keyword(), wrap),
                }
            }
        }
    }

    /// Logical negation.
    pub fn negate(self) -> Expression {
        if self.is_empty() || self.is_everything() {
            return Self::nothing();
        }
        if self.is_nothing() {
            return Self::everything();
        }
        let folded = self.into_filter_form();
        Expression {
            search: None,
            filter: folded.filter.map(|f| format!("not ({})", f)),
        }
    }

    /// Move a lucene search part into the filter as `search.ismatch(...)`.
    fn into_filter_form(self) -> Expression {
        match self.search {
            Some(search) if search != "*" => {
                let ismatch = format!("search.ismatch('{}', null, 'full', 'all')", escape_literal(&search));
                Expression {
                    search: None,
                    filter: join(Some(ismatch), self.filter, "and", true),
                }
            }
            _ => Expression { search: None, filter: self.filter },
        }
    }
}

fn join(left: Option<String>, right: Option<String>, keyword: &str, wrap: bool) -> Option<String> {
    match (left, right) {
        (Some(l), Some(r)) if wrap => Some(format!("({}) {} ({})", l, keyword, r)),
        (Some(l), Some(r)) => Some(format!("{} {} {}", l, keyword, r)),
        (Some(l), None) => Some(l),
        (None, r) => r,
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref search) = self.search {
            write!(f, "{}{}", SEARCH_PARAM, search)?;
        }
        if let Some(ref filter) = self.filter {
            write!(f, "{}{}", FILTER_PARAM, filter)?;
        }
        Ok(())
    }
}

/// Merge two fragments, string in, string out.
pub fn merge(left: &str, right: &str, op: LogicalOperator, wrap: bool) -> String {
    Expression::parse(left)
        .merge(Expression::parse(right), op, wrap)
        .to_string()
}
