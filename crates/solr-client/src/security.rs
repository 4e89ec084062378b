//! Security utilities for the search and fetch phases.
//!
//! Two query languages are involved in every request: values go into a
//! Solr query string, and the matching identifiers come back into an SQL
//! statement. Both directions MUST go through the helpers in this module.
//!
//! ## Solr term escaping
//!
//! ```rust
//! use datasolr_client::security::solr;
//!
//! // CORRECT - escape every user supplied term
//! let term = solr::escape_term("little brown");
//! let q = format!("_fulltext:{}", term);
//! assert_eq!(q, "_fulltext:little\\ brown");
//! ```
//!
//! ## SQL identifiers
//!
//! The resource identifier is interpolated as a table name and cannot be
//! bound as a parameter, so it is reduced to a hexadecimal/UUID alphabet:
//!
//! ```rust
//! use datasolr_client::security::sql;
//!
//! assert_eq!(sql::sanitize_resource_id("\"; DROP TABLE x --"), "DABE--");
//! ```

/// Solr query syntax escaping.
pub mod solr {
    /// Escape a literal term for inclusion in a Solr query clause.
    ///
    /// Backslashes are escaped first so that the escapes added for the
    /// reserved characters are never escaped twice. The reserved characters
    /// are `+ - & | ! ( ) { } [ ] ^ ~ * ? : " ; / ` and the space.
    ///
    /// # Example
    ///
    /// ```rust
    /// use datasolr_client::security::solr;
    ///
    /// assert_eq!(solr::escape_term("a+b"), "a\\+b");
    /// assert_eq!(solr::escape_term("C:\\dir"), "C\\:\\\\dir");
    /// assert_eq!(solr::escape_term("plain42"), "plain42");
    /// ```
    #[must_use]
    pub fn escape_term(value: &str) -> String {
        let mut escaped = String::with_capacity(value.len() + 8);
        for ch in value.chars() {
            if ch == '\\' {
                escaped.push_str("\\\\");
            } else if is_reserved(ch) {
                escaped.push('\\');
                escaped.push(ch);
            } else {
                escaped.push(ch);
            }
        }
        escaped
    }

    /// Returns true if `ch` has a meaning in Solr query syntax.
    #[must_use]
    pub fn is_reserved(ch: char) -> bool {
        matches!(
            ch,
            '+' | '-'
                | '&'
                | '|'
                | '!'
                | '('
                | ')'
                | '{'
                | '}'
                | '['
                | ']'
                | '^'
                | '~'
                | '*'
                | '?'
                | ':'
                | '"'
                | ';'
                | ' '
                | '/'
        )
    }
}

/// SQL safety helpers for the relational fetch statement.
pub mod sql {
    /// Reduce a resource identifier to the characters `[-a-fA-F0-9]`.
    ///
    /// This is the only thing standing between the resource identifier and
    /// the table reference of the fetch statement; it must be applied
    /// before every interpolation.
    #[must_use]
    pub fn sanitize_resource_id(resource_id: &str) -> String {
        resource_id
            .chars()
            .filter(|c| c.is_ascii_hexdigit() || *c == '-')
            .collect()
    }

    /// Remove every double quote from a column name.
    #[must_use]
    pub fn strip_double_quotes(name: &str) -> String {
        name.chars().filter(|c| *c != '"').collect()
    }

    /// Double-quote a column name after removing any embedded quotes.
    ///
    /// # Example
    ///
    /// ```rust
    /// use datasolr_client::security::sql;
    ///
    /// assert_eq!(sql::quote_identifier("some_\"field"), "\"some_field\"");
    /// ```
    #[must_use]
    pub fn quote_identifier(name: &str) -> String {
        format!("\"{}\"", strip_double_quotes(name))
    }

    /// Returns true if `statement` contains exactly one SQL statement.
    ///
    /// Semicolons inside string literals, quoted identifiers and comments do
    /// not separate statements, and a trailing separator followed only by
    /// whitespace or comments does not start a second one.
    #[must_use]
    pub fn is_single_statement(statement: &str) -> bool {
        count_statements(statement) == 1
    }

    /// Count the non-empty statements in `input`.
    pub fn count_statements(input: &str) -> usize {
        let chars: Vec<char> = input.chars().collect();
        let mut count = 0;
        let mut has_content = false;
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            match c {
                '\'' | '"' => {
                    has_content = true;
                    i = skip_quoted(&chars, i, c);
                }
                '-' if chars.get(i + 1) == Some(&'-') => {
                    while i < chars.len() && chars[i] != '\n' {
                        i += 1;
                    }
                }
                '/' if chars.get(i + 1) == Some(&'*') => {
                    i += 2;
                    while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                        i += 1;
                    }
                    i += 2;
                }
                ';' => {
                    if has_content {
                        count += 1;
                    }
                    has_content = false;
                    i += 1;
                }
                c if c.is_whitespace() => i += 1,
                _ => {
                    has_content = true;
                    i += 1;
                }
            }
        }

        if has_content {
            count += 1;
        }
        count
    }

    /// Skip a quoted section starting at `start`, honouring doubled quotes.
    /// Returns the index just past the closing quote (or the input length
    /// for an unterminated section).
    fn skip_quoted(chars: &[char], start: usize, quote: char) -> usize {
        let mut i = start + 1;
        while i < chars.len() {
            if chars[i] == quote {
                if chars.get(i + 1) == Some(&quote) {
                    i += 2;
                    continue;
                }
                return i + 1;
            }
            i += 1;
        }
        chars.len()
    }
}

/// URL helpers for the search endpoint.
pub mod url {
    use crate::error::Result;

    /// Normalise a search handler URL by dropping its query string and
    /// fragment, e.g. `http://host/solr/core/select?q=x#top` becomes
    /// `http://host/solr/core/select`.
    pub fn search_endpoint(raw: &str) -> Result<::url::Url> {
        let mut parsed = ::url::Url::parse(raw)?;
        parsed.set_query(None);
        parsed.set_fragment(None);
        Ok(parsed)
    }
}
