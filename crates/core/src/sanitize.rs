//! Free-text sanitization.
//!
//! Removes markup and script vectors from user input before it is stored or
//! interpolated into an email. Output is always a fixed point: sanitizing an
//! already-sanitized string returns it unchanged.

use std::sync::LazyLock;

use regex::Regex;

use crate::schema::{Field, FieldKind};

static SCRIPT_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<\s*(script|style)\b[^>]*>.*?<\s*/\s*(script|style)\s*>").expect("Invalid regex")
});

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^<>]*>").expect("Invalid regex"));

static SCHEME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:(?:java|vb)\s*script|\bdata)\s*:").expect("Invalid regex"));

static HANDLER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bon[a-z]+\s*=").expect("Invalid regex"));

static BLANK_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("Invalid regex"));

/// Clean a raw value according to its field's kind and length limit.
///
/// Secrets are only trimmed and capped; everything else goes through the
/// markup filter.
#[must_use]
pub fn sanitize_field(field: Field, raw: &str) -> String {
    match field.kind() {
        FieldKind::Secret => sanitize_secret(raw, field.max_len()),
        FieldKind::LongText => sanitize_multiline(raw, field.max_len()),
        FieldKind::Text
        | FieldKind::Url
        | FieldKind::Email
        | FieldKind::Choice
        | FieldKind::Bool
        | FieldKind::Timestamp => sanitize_text(raw, field.max_len()),
    }
}

/// Sanitize single-line text: all whitespace runs become one space.
#[must_use]
pub fn sanitize_text(raw: &str, max_chars: usize) -> String {
    settle(raw, |s| {
        let stripped = strip_markup(s);
        let collapsed = collapse_line(&stripped);
        truncate(&collapsed, max_chars)
    })
}

/// Sanitize multi-line text: lines are collapsed individually and at most
/// one blank line is kept between paragraphs.
#[must_use]
pub fn sanitize_multiline(raw: &str, max_chars: usize) -> String {
    settle(raw, |s| {
        let stripped = strip_markup(s);
        let lines: Vec<String> = stripped.lines().map(collapse_line).collect();
        let joined = lines.join("\n");
        let joined = BLANK_RUN_RE.replace_all(joined.trim(), "\n\n");
        truncate(&joined, max_chars)
    })
}

/// Trim a secret and cap its length without altering its characters.
#[must_use]
pub fn sanitize_secret(raw: &str, max_chars: usize) -> String {
    let cleaned: String = raw.trim().chars().filter(|c| !c.is_control()).collect();
    truncate(&cleaned, max_chars)
}

/// Apply `pass` until the output stops changing.
///
/// Terminates because a pass never adds characters, and after the first
/// pass every change removes at least one.
fn settle(raw: &str, pass: impl Fn(&str) -> String) -> String {
    let mut current = pass(raw);
    loop {
        let next = pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn strip_markup(s: &str) -> String {
    let s = SCRIPT_BLOCK_RE.replace_all(s, "");
    let s = TAG_RE.replace_all(&s, "");
    let s: String = s.chars().filter(|c| !matches!(c, '<' | '>')).collect();
    let s = SCHEME_RE.replace_all(&s, "");
    HANDLER_RE.replace_all(&s, "").into_owned()
}

fn collapse_line(line: &str) -> String {
    line.split_whitespace()
        .map(|word| word.chars().filter(|c| !c.is_control()).collect::<String>())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    s.chars().take(max_chars).collect::<String>().trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_block_is_removed() {
        let cleaned = sanitize_text("<script>alert(1)</script>", 200);
        assert!(!cleaned.contains('<'));
        assert!(!cleaned.to_lowercase().contains("script"));
        assert_eq!(cleaned, "");
    }

    #[test]
    fn test_tags_are_stripped_but_text_kept() {
        assert_eq!(
            sanitize_text("Best <b>coffee</b> in <i>town</i>", 200),
            "Best coffee in town"
        );
    }

    #[test]
    fn test_event_handlers_and_schemes_are_neutralized() {
        let cleaned = sanitize_text("click javascript:alert(1) onclick=steal()", 200);
        assert!(!cleaned.to_lowercase().contains("javascript:"));
        assert!(!cleaned.to_lowercase().contains("onclick="));

        let cleaned = sanitize_text("see data:text/html,hi", 200);
        assert!(!cleaned.to_lowercase().contains("data:"));

        let cleaned = sanitize_text("VBScript:run OnMouseOver = x", 200);
        assert!(!cleaned.to_lowercase().contains("vbscript:"));
        assert!(!cleaned.to_lowercase().contains("onmouseover"));
    }

    #[test]
    fn test_nested_patterns_do_not_survive() {
        let cleaned = sanitize_text("javajavascript:script:alert(1)", 200);
        assert!(!cleaned.to_lowercase().contains("javascript:"));

        let cleaned = sanitize_text("<scr<script>ipt>alert(1)</script>", 200);
        assert!(!cleaned.contains('<'));
        assert!(!cleaned.contains('>'));
    }

    #[test]
    fn test_deeply_nested_schemes_settle_in_one_call() {
        let input = format!("{}{}alert(1)", "java".repeat(25), "script:".repeat(25));
        let once = sanitize_text(&input, 500);
        assert!(!once.to_lowercase().contains("javascript:"));
        assert_eq!(once, "alert(1)");
        assert_eq!(sanitize_text(&once, 500), once);

        let input = format!("{}x{}", "<".repeat(40), ">".repeat(40));
        let once = sanitize_multiline(&input, 500);
        assert_eq!(sanitize_multiline(&once, 500), once);
    }

    #[test]
    fn test_whitespace_is_collapsed() {
        assert_eq!(sanitize_text("  Joe's \t Coffee \n Shop ", 200), "Joe's Coffee Shop");
    }

    #[test]
    fn test_multiline_keeps_paragraphs() {
        let cleaned = sanitize_multiline("Latte   $4\r\nMocha $5\n\n\n\nTea  $3  ", 200);
        assert_eq!(cleaned, "Latte $4\nMocha $5\n\nTea $3");
    }

    #[test]
    fn test_truncates_to_max_chars() {
        let cleaned = sanitize_text("abcdefghij", 4);
        assert_eq!(cleaned, "abcd");

        let cleaned = sanitize_text("ééééé", 3);
        assert_eq!(cleaned.chars().count(), 3);
    }

    #[test]
    fn test_truncation_does_not_leave_trailing_space() {
        assert_eq!(sanitize_text("abc def", 4), "abc");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let inputs = [
            "<script>alert(1)</script>",
            "Hello <b>world</b>  onload=x javascript:y",
            "javajavascript:script:",
            "  lots   of\t\tspace  ",
            "<<>>a<b>c",
            "plain text stays",
            "on on= onx=1 one = two",
        ];
        for input in inputs {
            let once = sanitize_text(input, 12);
            assert_eq!(sanitize_text(&once, 12), once, "single-line: {input:?}");

            let once = sanitize_multiline(input, 12);
            assert_eq!(sanitize_multiline(&once, 12), once, "multi-line: {input:?}");
        }
    }

    #[test]
    fn test_secrets_are_not_rewritten() {
        assert_eq!(sanitize_secret("  p<a>ss onx=1  ", 256), "p<a>ss onx=1");
        assert_eq!(sanitize_secret("abcdef", 3), "abc");
    }

    #[test]
    fn test_sanitize_field_dispatches_on_kind() {
        assert_eq!(
            sanitize_field(Field::InstagramPassword, " <secret> "),
            "<secret>"
        );
        assert_eq!(sanitize_field(Field::BusinessName, " <b>Cafe</b> "), "Cafe");
        assert_eq!(
            sanitize_field(Field::MenuText, "Line 1\n\n\n\nLine 2"),
            "Line 1\n\nLine 2"
        );
    }
}
