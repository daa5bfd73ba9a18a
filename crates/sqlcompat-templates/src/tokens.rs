//! Delimited token replacement for `#{...}` and `${...}`

pub(crate) const PLACEHOLDER_OPEN: &str = "#{";
pub(crate) const SUBSTITUTION_OPEN: &str = "${";
const CLOSE: &str = "}";

/// Replace every `open ... }` token in `text` with the handler's output.
///
/// A backslash directly before the opening delimiter escapes it; the
/// backslash is dropped and the token is copied through. An opening
/// delimiter without a matching close is copied through verbatim.
pub(crate) fn replace_tokens<F>(text: &str, open: &str, mut handler: F) -> String
where
    F: FnMut(&str) -> String,
{
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find(open) {
        if start > 0 && rest.as_bytes()[start - 1] == b'\\' {
            out.push_str(&rest[..start - 1]);
            out.push_str(open);
            rest = &rest[start + open.len()..];
            continue;
        }

        let body_start = start + open.len();
        let Some(body_len) = rest[body_start..].find(CLOSE) else {
            break;
        };

        out.push_str(&rest[..start]);
        out.push_str(&handler(&rest[body_start..body_start + body_len]));
        rest = &rest[body_start + body_len + CLOSE.len()..];
    }

    out.push_str(rest);
    out
}
