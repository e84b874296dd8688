//! Markup removal for assembled replies.

/// Remove every `<...>` span from `text`.
///
/// A span starts at `<` and ends at the nearest following `>` on the same
/// line.  A `<` with no closing `>` before the end of its line is kept, as is
/// a lone `>`.  Only the tags are removed, not the text between an opening and
/// a closing tag.
pub fn strip_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        let after = &rest[open..];
        let line_end = after.find('\n').unwrap_or(after.len());
        match after[..line_end].find('>') {
            Some(close) => rest = &after[close + 1..],
            None => {
                out.push('<');
                rest = &after[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_tags() {
        assert_eq!(strip_markup("Hello, world<tag>!"), "Hello, world!");
        assert_eq!(strip_markup("<b>bold</b> move"), "bold move");
        assert_eq!(strip_markup("<think>plan</think>answer"), "plananswer");
    }

    #[test]
    fn plain_text_is_untouched() {
        assert_eq!(strip_markup("no tags here"), "no tags here");
        assert_eq!(strip_markup(""), "");
        assert_eq!(strip_markup("2 > 1"), "2 > 1");
    }

    #[test]
    fn unclosed_angle_bracket_is_kept() {
        assert_eq!(strip_markup("1 < 2 and 3 < 4"), "1 < 2 and 3 < 4");
        assert_eq!(strip_markup("a <b"), "a <b");
    }

    #[test]
    fn spans_do_not_cross_lines() {
        assert_eq!(strip_markup("a < b\nc > d"), "a < b\nc > d");
        assert_eq!(strip_markup("x <\n<y> z"), "x <\n z");
    }

    #[test]
    fn shortest_span_wins() {
        assert_eq!(strip_markup("<a>text<b>"), "text");
        assert_eq!(strip_markup("<<a>>"), ">");
    }

    #[test]
    fn multibyte_text() {
        assert_eq!(strip_markup("café <em>crème</em> brûlée"), "café crème brûlée");
    }
}
