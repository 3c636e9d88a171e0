//! Formulas linking the generated documents together.
//!
//! Document links in the matches sheet are written as
//!
//! ```text
//! =HYPERLINK("https://docs.google.com/spreadsheets/d/<id>","<label>")
//! ```
//!
//! and that is the only shape [`parse_hyperlink_id`] accepts. An optional
//! path or fragment after the id (`/edit#gid=0`) is tolerated. Anything else
//! is treated as malformed upstream data and yields `None`.

use once_cell::sync::Lazy;
use regex::Regex;

const SPREADSHEET_URL_PREFIX: &str = "https://docs.google.com/spreadsheets/d/";

/// Escapes a string literal for a formula: quotes are doubled.
pub fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

pub fn spreadsheet_url(doc_id: &str) -> String {
    format!("{}{}", SPREADSHEET_URL_PREFIX, doc_id)
}

pub fn hyperlink(doc_id: &str, label: &str) -> String {
    format!(
        "=HYPERLINK({},{})",
        quote(&spreadsheet_url(doc_id)),
        quote(label)
    )
}

/// Recovers the document id of a link cell written by [`hyperlink`].
pub fn parse_hyperlink_id(formula: &str) -> Option<String> {
    static RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r#"^=(?i:HYPERLINK)\(\s*"https://docs\.google\.com/spreadsheets/d/([A-Za-z0-9_-]+)(?:[/?#][^"]*)?"\s*,\s*"(?:[^"]|"")*"\s*\)$"#,
        )
        .unwrap()
    });
    RE.captures(formula.trim())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// `IMPORTRANGE("<id>","<range>")`, without the leading `=`.
pub fn import_range(doc_id: &str, range: &str) -> String {
    format!("IMPORTRANGE({},{})", quote(doc_id), quote(range))
}

/// The document id of the first `IMPORTRANGE` in a formula.
pub fn parse_import_id(formula: &str) -> Option<String> {
    static RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r#"(?i:IMPORTRANGE)\(\s*"([A-Za-z0-9_-]+)"\s*,"#).unwrap());
    RE.captures(formula)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Joins terms into one formula: `=t0+t1+...`. Empty when there are no terms.
fn sum_terms(terms: impl Iterator<Item = String>) -> String {
    terms
        .enumerate()
        .map(|(idx, t)| if idx == 0 { format!("={}", t) } else { format!("+{}", t) })
        .collect()
}

/// The sum of one cell over several documents.
pub fn sum_of_imports(doc_ids: &[String], range: &str) -> String {
    sum_terms(doc_ids.iter().map(|id| import_range(id, range)))
}

/// How many documents hold exactly `name` in one cell.
pub fn tally_of_imports(doc_ids: &[String], range: &str, name: &str) -> String {
    sum_terms(doc_ids.iter().map(|id| equals_one(&import_range(id, range), name)))
}

/// `IF(<expr>="<name>",1,0)`
pub fn equals_one(expr: &str, name: &str) -> String {
    format!("IF({}={},1,0)", expr, quote(name))
}
