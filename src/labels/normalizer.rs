/// Caller-side cleanup applied before labels reach the canonicalizer.
///
/// Strips byte-order marks and zero-width spaces, trims, and collapses runs
/// of whitespace to a single space. Case is preserved so canonical labels
/// read the way operators typed them.
pub fn normalize_label(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}'], "");
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Header lookups ignore case and stray whitespace.
pub(crate) fn normalize_header(value: &str) -> String {
    normalize_label(value).to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_label_collapses_whitespace_and_keeps_case() {
        let source = "\u{feff}  Paint   Scratch \u{200b}";
        assert_eq!(normalize_label(source), "Paint Scratch");
    }

    #[test]
    fn normalize_header_is_case_insensitive() {
        assert_eq!(normalize_header(" Inspection  DATE"), "inspection date");
    }
}
