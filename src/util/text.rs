use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;
use unicode_width::UnicodeWidthChar;

/// Marker appended to descriptions that were cut short.
pub const TRUNCATION_MARKER: &str = "...";

fn tag_regex() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"))
}

/// Removes markup tags from feed text and returns clean single-line text.
///
/// HTML entities are decoded before tags are removed, so markup that a feed
/// escaped twice is stripped rather than surfaced as literal tags. Each tag
/// becomes a space, terminal control sequences are removed, and runs of
/// whitespace collapse to one space.
///
/// # Examples
///
/// ```
/// use glean::util::strip_markup;
///
/// assert_eq!(strip_markup("<p>Rates <b>held</b> &amp; steady</p>"), "Rates held & steady");
/// ```
pub fn strip_markup(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s);
    let without_tags = tag_regex().replace_all(&decoded, " ");
    let clean = strip_control_chars(&without_tags);
    clean.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cuts `s` to at most `max_width` terminal columns and appends
/// [`TRUNCATION_MARKER`] when anything was removed.
///
/// The marker is added after the limit, so a truncated result is
/// `max_width + 3` columns wide. Text that already fits is returned
/// borrowed and without a marker.
///
/// # Examples
///
/// ```
/// use glean::util::truncate_with_marker;
///
/// assert_eq!(truncate_with_marker("Hello World", 5), "Hello...");
/// assert_eq!(truncate_with_marker("Short", 10), "Short");
/// ```
pub fn truncate_with_marker(s: &str, max_width: usize) -> Cow<'_, str> {
    let mut width = 0;
    for (idx, c) in s.char_indices() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if width + w > max_width {
            let kept = s[..idx].trim_end();
            return Cow::Owned(format!("{}{}", kept, TRUNCATION_MARKER));
        }
        width += w;
    }
    Cow::Borrowed(s)
}

/// Removes ASCII control characters and ANSI escape sequences.
///
/// Feed text ends up printed to a terminal, so escape sequences embedded in
/// titles must not reach it. Tab, newline and carriage return are kept.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    let is_unsafe = |c: char| c.is_ascii_control() && !matches!(c, '\t' | '\n' | '\r');
    if !s.chars().any(is_unsafe) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\x1b' {
            match chars.peek() {
                // CSI: ESC [ params... final byte in 0x40..=0x7E
                Some('[') => {
                    chars.next();
                    for n in chars.by_ref() {
                        if ('\x40'..='\x7e').contains(&n) {
                            break;
                        }
                    }
                }
                // OSC: ESC ] ... terminated by BEL or ESC \
                Some(']') => {
                    chars.next();
                    while let Some(n) = chars.next() {
                        if n == '\x07' {
                            break;
                        }
                        if n == '\x1b' && chars.peek() == Some(&'\\') {
                            chars.next();
                            break;
                        }
                    }
                }
                _ => {}
            }
        } else if !is_unsafe(c) {
            out.push(c);
        }
    }

    Cow::Owned(out)
}
