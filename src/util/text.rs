use std::borrow::Cow;

use unicode_width::UnicodeWidthChar;

const ESC: char = '\u{1b}';
const BEL: char = '\u{7}';

fn is_stripped_control(c: char) -> bool {
    (c.is_control() && !matches!(c, '\t' | '\n' | '\r')) || c == '\u{7f}'
}

/// Remove terminal control characters and escape sequences from feed text.
///
/// Titles and descriptions come from arbitrary servers and are printed
/// straight to the terminal, so CSI (`ESC [ ... final`) and OSC
/// (`ESC ] ... BEL` or `ESC ] ... ESC \`) sequences are dropped whole and
/// every other control character except tab, newline and carriage return is
/// dropped on its own. Clean input is returned borrowed.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    if !s.chars().any(is_stripped_control) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != ESC {
            if !is_stripped_control(c) {
                out.push(c);
            }
            continue;
        }

        match chars.peek() {
            Some('[') => {
                chars.next();
                // Parameter and intermediate bytes up to the final byte
                for c in chars.by_ref() {
                    if ('\u{40}'..='\u{7e}').contains(&c) {
                        break;
                    }
                }
            }
            Some(']') => {
                chars.next();
                while let Some(c) = chars.next() {
                    if c == BEL {
                        break;
                    }
                    if c == ESC && chars.peek() == Some(&'\\') {
                        chars.next();
                        break;
                    }
                }
            }
            _ => {}
        }
    }

    Cow::Owned(out)
}

/// Squash a multi-line description into one line of at most `max_width`
/// terminal columns, ending in `…` when something was cut.
///
/// Runs of whitespace (including newlines) become a single space.
pub fn one_line_preview(s: &str, max_width: usize) -> String {
    let flat = s.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate_to_width(&flat, max_width).into_owned()
}

/// Cut `s` to fit in `max_width` terminal columns, appending `…` (one
/// column) when anything was removed. Wide characters are never split.
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    let mut width = 0;
    // Byte offset where the text must stop to leave room for the ellipsis
    let mut keep = None;

    for (idx, c) in s.char_indices() {
        let w = c.width().unwrap_or(0);
        if keep.is_none() && width + w + 1 > max_width {
            keep = Some(idx);
        }
        width += w;
        if width > max_width {
            return match (keep, max_width) {
                (_, 0) => Cow::Borrowed(""),
                (Some(end), _) => Cow::Owned(format!("{}…", &s[..end])),
                (None, _) => Cow::Owned("…".to_string()),
            };
        }
    }

    Cow::Borrowed(s)
}
