const INVISIBLE: [char; 3] = ['\u{feff}', '\u{200b}', '\u{00a0}'];

/// Cleans a cell for display: invisible characters removed, whitespace runs
/// collapsed to one space.
pub(crate) fn clean_cell(value: &str) -> String {
    let cleaned = value.replace(INVISIBLE, " ");
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Header key used for column lookup. Case, subscript digits and the space
/// before a unit in parentheses are all ignored.
pub(crate) fn normalize_header(value: &str) -> String {
    clean_cell(value)
        .replace('\u{2082}', "2")
        .replace(" (", "(")
        .to_lowercase()
}

#[cfg(test)]
pub(crate) fn normalize_for_tests(value: &str) -> String {
    normalize_header(value)
}
