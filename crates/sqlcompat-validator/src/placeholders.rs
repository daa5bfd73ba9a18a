//! Bind marker rewriting
//!
//! Resolved mapper SQL uses `?` (and occasionally a leftover `#{...}`) for
//! bind parameters. Drivers with numbered markers need `$1..$n` instead.
//! Markers inside string literals, quoted identifiers, dollar-quoted bodies
//! and comments are left alone.

use sqlcompat_core::PlaceholderStyle;

/// SQL with its markers renumbered for a dialect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenSql {
    pub sql: String,
    /// Number of bind markers written
    pub markers: usize,
}

/// Replace every bind marker in `sql` with the dialect's marker, left to right.
///
/// A doubled `??` is an escaped literal `?`: it becomes a single `?` for
/// numbered dialects and is kept as is otherwise.
pub fn rewrite_placeholders(sql: &str, style: PlaceholderStyle) -> RewrittenSql {
    let chars: Vec<char> = sql.chars().collect();
    let mut out = String::with_capacity(sql.len() + 8);
    let mut markers = 0;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match c {
            '\'' => i = copy_quoted(&chars, i, backslash_escapes(&chars, i), &mut out),
            '"' => i = copy_quoted(&chars, i, false, &mut out),
            '-' if next == Some('-') => i = copy_line_comment(&chars, i, &mut out),
            '/' if next == Some('*') => i = copy_block_comment(&chars, i, &mut out),
            '$' => match dollar_delimiter_len(&chars, i) {
                Some(len) => i = copy_dollar_quoted(&chars, i, len, &mut out),
                None => {
                    out.push(c);
                    i += 1;
                }
            },
            '#' if next == Some('{') => match position_of(&chars, i + 2, '}') {
                Some(close) => {
                    markers += 1;
                    out.push_str(&style.marker(markers));
                    i = close + 1;
                }
                None => {
                    out.push(c);
                    i += 1;
                }
            },
            '?' if next == Some('?') => {
                out.push_str(match style {
                    PlaceholderStyle::Numbered => "?",
                    PlaceholderStyle::QuestionMark => "??",
                });
                i += 2;
            }
            '?' => {
                markers += 1;
                out.push_str(&style.marker(markers));
                i += 1;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    RewrittenSql { sql: out, markers }
}

/// Number of bind markers in `sql`
pub fn count_placeholders(sql: &str) -> usize {
    rewrite_placeholders(sql, PlaceholderStyle::QuestionMark).markers
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// `E'...'` strings treat backslash as an escape
fn backslash_escapes(chars: &[char], quote: usize) -> bool {
    quote > 0
        && matches!(chars[quote - 1], 'e' | 'E')
        && (quote < 2 || !is_ident_char(chars[quote - 2]))
}

fn position_of(chars: &[char], from: usize, needle: char) -> Option<usize> {
    chars
        .get(from..)?
        .iter()
        .position(|c| *c == needle)
        .map(|offset| from + offset)
}

fn copy_quoted(chars: &[char], start: usize, escapes: bool, out: &mut String) -> usize {
    let quote = chars[start];
    out.push(quote);
    let mut j = start + 1;
    while j < chars.len() {
        let ch = chars[j];
        out.push(ch);
        if escapes && ch == '\\' {
            if let Some(escaped) = chars.get(j + 1) {
                out.push(*escaped);
            }
            j += 2;
            continue;
        }
        j += 1;
        if ch == quote {
            return j;
        }
    }
    chars.len()
}

fn copy_line_comment(chars: &[char], start: usize, out: &mut String) -> usize {
    let end = position_of(chars, start, '\n').map_or(chars.len(), |nl| nl + 1);
    out.extend(&chars[start..end]);
    end
}

fn copy_block_comment(chars: &[char], start: usize, out: &mut String) -> usize {
    let mut depth = 0usize;
    let mut j = start;
    while j < chars.len() {
        let pair = (chars[j], chars.get(j + 1).copied());
        match pair {
            ('/', Some('*')) => {
                depth += 1;
                out.push_str("/*");
                j += 2;
            }
            ('*', Some('/')) => {
                out.push_str("*/");
                j += 2;
                depth -= 1;
                if depth == 0 {
                    return j;
                }
            }
            (c, _) => {
                out.push(c);
                j += 1;
            }
        }
    }
    chars.len()
}

/// Length of a `$$` or `$tag$` delimiter starting at `start`
fn dollar_delimiter_len(chars: &[char], start: usize) -> Option<usize> {
    if start > 0 && is_ident_char(chars[start - 1]) {
        return None;
    }
    let mut j = start + 1;
    match chars.get(j) {
        Some('$') => return Some(2),
        Some(c) if c.is_alphabetic() || *c == '_' => {}
        _ => return None,
    }
    while chars.get(j).is_some_and(|c| is_ident_char(*c)) {
        j += 1;
    }
    (chars.get(j) == Some(&'$')).then_some(j - start + 1)
}

fn copy_dollar_quoted(chars: &[char], start: usize, len: usize, out: &mut String) -> usize {
    let delimiter = &chars[start..start + len];
    let body_start = start + len;
    let end = (body_start..chars.len())
        .find(|&k| chars[k..].starts_with(delimiter))
        .map_or(chars.len(), |k| k + len);
    out.extend(&chars[start..end]);
    end
}
