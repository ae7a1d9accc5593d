//! Small helpers for reading values off parsed pages

use scraper::{ElementRef, Html, Selector};

/// Trimmed text of the first element matching `selector`
pub fn first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document.select(&selector).next().map(element_text)
}

/// Value of `attr` on the first matching element that has it
pub fn first_attr(document: &Html, selector: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .find_map(|element| element.value().attr(attr))
        .map(|value| value.trim().to_string())
}

pub fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// The number formed by every ASCII digit in `s`, e.g. `1,204` -> 1204
pub fn digits(s: &str) -> Option<i64> {
    s.chars()
        .filter(char::is_ascii_digit)
        .collect::<String>()
        .parse()
        .ok()
}
