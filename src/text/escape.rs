/// Joins items with `delim`, escaping `\` and `delim` inside items with a backslash
///
/// # Examples
///
/// ```
/// use auction_scraper::text::escape_join;
///
/// assert_eq!(escape_join(["a:b", "c"], ':'), "a\\:b:c");
/// ```
pub fn escape_join<'a, I>(items: I, delim: char) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out = String::new();
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            out.push(delim);
        }
        for c in item.chars() {
            if c == '\\' || c == delim {
                out.push('\\');
            }
            out.push(c);
        }
    }
    out
}

/// Splits a string produced by [`escape_join`] back into its items
///
/// A backslash makes the following character literal. A trailing lone
/// backslash is kept as-is. The empty string yields one empty item.
pub fn escape_split(s: &str, delim: char) -> Vec<String> {
    let mut items = Vec::new();
    let mut buf = String::new();
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(escaped) => buf.push(escaped),
                None => buf.push('\\'),
            }
        } else if c == delim {
            items.push(std::mem::take(&mut buf));
        } else {
            buf.push(c);
        }
    }
    items.push(buf);
    items
}
