//! Sort statement parsing.
//!
//! A sort statement is a comma separated list of `field [ASC|DESC]` terms.
//! Field names may be double-quoted, in which case commas and direction
//! keywords inside the quotes belong to the name.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorKind, Result};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }

    fn from_keyword(word: &str) -> Option<Self> {
        if word.eq_ignore_ascii_case("asc") {
            Some(SortDirection::Asc)
        } else if word.eq_ignore_ascii_case("desc") {
            Some(SortDirection::Desc)
        } else {
            None
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `(field, direction)` pair of a sort statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortTerm {
    pub field: String,
    pub direction: SortDirection,
}

impl SortTerm {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Asc)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Desc)
    }
}

/// Parse a sort statement into its terms.
///
/// ```rust
/// use datasolr_query::{parse_sort, SortTerm};
///
/// assert_eq!(
///     parse_sort("field1, field2 desc").unwrap(),
///     vec![SortTerm::asc("field1"), SortTerm::desc("field2")]
/// );
/// assert_eq!(
///     parse_sort("\"field1 DESC\"").unwrap(),
///     vec![SortTerm::asc("field1 DESC")]
/// );
/// ```
pub fn parse_sort(statement: &str) -> Result<Vec<SortTerm>> {
    split_outside_quotes(statement, ',')?
        .into_iter()
        .map(|term| parse_term(term.trim()))
        .collect()
}

fn parse_term(term: &str) -> Result<SortTerm> {
    if term.is_empty() {
        return Err(parse_error("empty sort term"));
    }

    // The direction keyword is the last whitespace separated word, and only
    // counts when it sits outside any quoted section.
    let (field_part, direction) = match term.rfind(char::is_whitespace) {
        Some(pos) if term[..pos].matches('"').count() % 2 == 0 => {
            let keyword = term[pos..].trim_start();
            match SortDirection::from_keyword(keyword) {
                Some(direction) => (term[..pos].trim_end(), direction),
                None => (term, SortDirection::Asc),
            }
        }
        _ => (term, SortDirection::Asc),
    };

    let field = if field_part.starts_with('"') {
        unquote(field_part)?
    } else if field_part.contains('"') {
        return Err(parse_error(&format!("unexpected quote in sort term: {}", term)));
    } else {
        field_part.to_string()
    };

    if field.is_empty() {
        return Err(parse_error(&format!("missing field name in sort term: {}", term)));
    }

    Ok(SortTerm::new(field, direction))
}

/// Remove the surrounding quotes of `"..."` and collapse doubled quotes.
fn unquote(quoted: &str) -> Result<String> {
    let inner = quoted
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .filter(|_| quoted.len() >= 2)
        .ok_or_else(|| parse_error(&format!("unterminated quoted field: {}", quoted)))?;

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '"' {
            if chars.peek() == Some(&'"') {
                chars.next();
                out.push('"');
            } else {
                return Err(parse_error(&format!("unexpected quote in sort term: {}", quoted)));
            }
        } else {
            out.push(c);
        }
    }
    Ok(out)
}

/// Split on `sep` wherever it is not inside double quotes.
fn split_outside_quotes(input: &str, sep: char) -> Result<Vec<&str>> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in input.char_indices() {
        if c == '"' {
            in_quotes = !in_quotes;
        } else if c == sep && !in_quotes {
            parts.push(&input[start..i]);
            start = i + c.len_utf8();
        }
    }
    if in_quotes {
        return Err(parse_error(&format!("unbalanced quotes in sort statement: {}", input)));
    }
    parts.push(&input[start..]);
    Ok(parts)
}

fn parse_error(message: &str) -> Error {
    Error::new(ErrorKind::Parse(message.to_string()))
}
