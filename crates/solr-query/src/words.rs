//! Free-text tokenizer.

/// Split a phrase into words on spaces.
///
/// With `quotes` set, text between double quotes stays a single word and
/// loses its surrounding quotes. A doubled quote (`""`) becomes one literal
/// quote, and a word made only of a doubled quote is dropped. An odd number
/// of quotes is closed by an implicit quote at the end of the phrase, so
/// this never fails.
///
/// Without `quotes`, the phrase is split on every space.
///
/// ```rust
/// use datasolr_query::split_words;
///
/// assert_eq!(
///     split_words("the \"little brown\" fox", true),
///     vec!["the", "little brown", "fox"]
/// );
/// assert_eq!(
///     split_words("the \"little brown\" fox", false),
///     vec!["the", "\"little", "brown\"", "fox"]
/// );
/// ```
pub fn split_words(phrase: &str, quotes: bool) -> Vec<String> {
    if !quotes {
        return phrase
            .split(' ')
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect();
    }

    let mut phrase = phrase.to_string();
    if phrase.matches('"').count() % 2 == 1 {
        phrase.push('"');
    }

    // A space separates words only when an even number of quotes precedes it.
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quotes_seen = 0usize;
    for c in phrase.chars() {
        match c {
            ' ' if quotes_seen % 2 == 0 => parts.push(std::mem::take(&mut current)),
            '"' => {
                quotes_seen += 1;
                current.push(c);
            }
            _ => current.push(c),
        }
    }
    parts.push(current);

    parts
        .into_iter()
        .filter_map(|part| {
            let part = part.strip_suffix('"').unwrap_or(&part);
            let part = part.strip_prefix('"').unwrap_or(part);
            let word = part.replace("\"\"", "\"");
            (!word.is_empty()).then_some(word)
        })
        .collect()
}
