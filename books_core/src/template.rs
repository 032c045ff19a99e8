//! Pluralization markers in table entry text
//!
//! Entry details are written once with markers and resolved against a
//! rolled count:
//! - `#a` and `#`: the count (or the singular word when the count is one)
//! - `$`: plural `s`, with `$(es)` and `a$(-es)` for `es` plurals

/// Resolve the markers in `details` for `count`
///
/// Counts of zero or below leave no numeral behind: every marker is stripped.
pub fn resolve_details(details: &str, count: i64, singular: &str) -> String {
    let mut text = details.to_string();

    if count == 1 {
        text = text.replace('#', singular);
    } else if count > 1 {
        let n = count.to_string();
        text = text
            .replace("#a", &n)
            .replace('#', &n)
            // irregular plurals go before the plain `$`
            .replace("a$(-es)", "es")
            .replace("$(es)", "es")
            .replace('$', "s");
    }

    text.replace("#a", "")
        .replace('#', "")
        .replace('$', "")
        .replace("  ", " ")
}
