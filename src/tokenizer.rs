//! Splits raw kickstart text into logical lines.
//!
//! A logical line carries the 1-based number of its first physical
//! line.  Backslash-continued lines are joined, and `#` comments
//! outside quoted strings are stripped before anything else looks at
//! the text.  Leading whitespace is preserved since section bodies may
//! care about it.
// SPDX-License-Identifier: Apache-2.0 OR MIT

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalLine {
    pub number: usize,
    pub text: String,
}

/// Remove an unquoted `#` comment.  Quote state only tracks `'` and
/// `"`; kickstart has no escaped quotes inside words.
fn strip_comment(line: &str) -> &str {
    let mut single = false;
    let mut double = false;
    for (idx, c) in line.char_indices() {
        match c {
            '\'' if !double => single = !single,
            '"' if !single => double = !double,
            '#' if !single && !double => return &line[..idx],
            _ => {}
        }
    }
    line
}

pub fn logical_lines(input: &str) -> Vec<LogicalLine> {
    let mut out = Vec::new();
    let mut pending: Option<LogicalLine> = None;
    for (idx, raw) in input.lines().enumerate() {
        let stripped = strip_comment(raw).trim_end();
        let (text, continued) = match stripped.strip_suffix('\\') {
            Some(head) => (head, true),
            None => (stripped, false),
        };
        let line = match pending.take() {
            Some(mut prev) => {
                prev.text.push_str(text);
                prev
            }
            None => LogicalLine {
                number: idx + 1,
                text: text.to_string(),
            },
        };
        if continued {
            pending = Some(line);
        } else {
            out.push(line);
        }
    }
    // A continuation on the final physical line still yields a line.
    if let Some(line) = pending {
        out.push(line);
    }
    out
}
