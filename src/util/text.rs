use std::borrow::Cow;

/// Ellipsis string used for truncation
const ELLIPSIS: &str = "...";
/// Length of the ellipsis in characters
const ELLIPSIS_LEN: usize = 3;

/// Maximum length of an article summary as produced by the fetcher.
pub const SUMMARY_MAX_CHARS: usize = 200;

/// Truncates a string to at most `max_chars` characters.
///
/// Lengths are counted in Unicode scalar values, so multi-byte text is never
/// cut mid-codepoint. When truncation is needed the result is exactly
/// `max_chars` long: the first `max_chars - 3` characters followed by `...`.
///
/// Returns `Cow::Borrowed` when the input already fits.
///
/// # Examples
///
/// ```
/// use hn_digest::util::truncate_chars;
///
/// assert_eq!(truncate_chars("Short", 10), "Short");
/// assert_eq!(truncate_chars("Hello World", 8), "Hello...");
/// ```
pub fn truncate_chars(s: &str, max_chars: usize) -> Cow<'_, str> {
    // Find the byte index of the (max_chars + 1)th char; if there is none the
    // string fits and no counting of the remainder is needed.
    if s.char_indices().nth(max_chars).is_none() {
        return Cow::Borrowed(s);
    }

    let keep = max_chars.saturating_sub(ELLIPSIS_LEN);
    let cut = s.char_indices().nth(keep).map(|(idx, _)| idx).unwrap_or(s.len());
    Cow::Owned(format!("{}{}", &s[..cut], ELLIPSIS))
}

/// Removes anything that looks like a markup tag.
///
/// A tag is `<` followed by at least one character other than `>` and closed
/// by `>`. A lone `<` with no closing `>` (or an empty `<>`) is kept verbatim,
/// so plain-text comparisons like `a < b` survive.
pub fn strip_tags(s: &str) -> Cow<'_, str> {
    if !s.contains('<') {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('>') {
            Some(close) if close > 0 => {
                rest = &after[close + 1..];
            }
            _ => {
                out.push('<');
                rest = after;
            }
        }
    }
    out.push_str(rest);

    Cow::Owned(out)
}

/// Decodes the handful of HTML entities that commonly survive in feed
/// summaries after XML unescaping (`&amp;`, `&lt;`, `&nbsp;`, numeric forms).
///
/// Unknown entities are left as-is.
pub fn decode_entities(s: &str) -> Cow<'_, str> {
    if !s.contains('&') {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let candidate = &rest[amp..];
        match candidate.find(';').filter(|&end| end <= 10) {
            Some(end) => match decode_entity(&candidate[1..end]) {
                Some(c) => {
                    out.push(c);
                    rest = &candidate[end + 1..];
                }
                None => {
                    out.push('&');
                    rest = &candidate[1..];
                }
            },
            None => {
                out.push('&');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);

    Cow::Owned(out)
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                name.strip_prefix('#')?.parse::<u32>().ok()?
            };
            char::from_u32(code)
        }
    }
}

/// Turns a raw feed summary (usually an HTML fragment) into a single line of
/// plain text no longer than [`SUMMARY_MAX_CHARS`].
///
/// Entities are decoded before tags are stripped, so escaped markup such as
/// `&lt;p&gt;` is removed too and no tag survives in the result.
pub fn clean_summary(raw: &str) -> String {
    let decoded = decode_entities(raw);
    let stripped = strip_tags(&decoded);
    let single_line = stripped.replace("\r\n", " ").replace(['\n', '\r'], " ");
    truncate_chars(single_line.trim(), SUMMARY_MAX_CHARS).into_owned()
}
