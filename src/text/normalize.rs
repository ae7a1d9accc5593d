use unicode_normalization::UnicodeNormalization;

/// Normalizes a block of scraped text
///
/// # Normalization Steps
///
/// 1. Unicode compatibility decomposition (NFKD)
/// 2. Drop lines that are empty or whitespace only
/// 3. Collapse runs of spaces into a single space, which also strips
///    leading and trailing spaces from the text as a whole
///
/// Applying `normalize` twice gives the same result as applying it once.
///
/// # Examples
///
/// ```
/// use auction_scraper::text::normalize;
///
/// assert_eq!(normalize("  Fine   silver\n \n ring "), "Fine silver\n ring");
/// ```
pub fn normalize(text: &str) -> String {
    let decomposed: String = text.nfkd().collect();

    let lines: Vec<&str> = decomposed
        .split('\n')
        .filter(|line| !line.trim().is_empty())
        .collect();
    let joined = lines.join("\n");

    joined
        .split(' ')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
