//! Content sanitization for free-text article fields.
//!
//! Sanitization is a presentation concern only: it makes text safe to
//! re-render as HTML. It is not a defense for the storage layer, which must
//! use parameterized statements on its own.
//!
//! The transform is idempotent: `sanitize(sanitize(x)) == sanitize(x)`.

use std::sync::OnceLock;

use regex::Regex;

use crate::domain::ArticleFields;

/// How much markup a field may keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanitizeMode {
    /// Strip every tag (titles, tags).
    PlainText,
    /// Keep a fixed allow-list of formatting elements (content, summary).
    RichText,
}

/// Elements removed together with everything between their tags.
const DANGEROUS_ELEMENTS: [&str; 4] = ["script", "iframe", "object", "embed"];

const ALLOWED_TAGS: &[&str] = &[
    "p",
    "br",
    "strong",
    "em",
    "u",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "ul",
    "ol",
    "li",
    "blockquote",
    "code",
    "pre",
];

/// Elements allowed to carry a `class` attribute.
const CLASS_TAGS: &[&str] = &["code", "pre"];

const MAX_RICH_PASSES: usize = 8;
const MAX_PLAIN_PASSES: usize = 64;

fn dangerous_element_regexes() -> &'static [Regex] {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        DANGEROUS_ELEMENTS
            .iter()
            .map(|name| {
                Regex::new(&format!(r"(?is)<{name}\b[^>]*>.*?</{name}\s*>"))
                    .expect("static dangerous-element pattern")
            })
            .collect()
    })
}

fn event_handler_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)on\w+\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]*)"#)
            .expect("static event-handler pattern")
    })
}

fn script_scheme_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(?:java|vb)script\s*:").expect("static scheme pattern"))
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"<(/?)([a-zA-Z][a-zA-Z0-9]*)([^<>]*)>").expect("static tag pattern")
    })
}

fn class_attr_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)\bclass\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
            .expect("static class pattern")
    })
}

fn entity_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^&(?:#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z][a-zA-Z0-9]{1,31});")
            .expect("static entity pattern")
    })
}

/// Sanitize an optional field; `None` passes through unchanged.
pub fn sanitize_opt(text: Option<&str>, mode: SanitizeMode) -> Option<String> {
    text.map(|t| sanitize(t, mode))
}

/// Sanitize every article field with the mode it is rendered in.
pub fn sanitize_fields(fields: &ArticleFields) -> ArticleFields {
    ArticleFields {
        title: sanitize(&fields.title, SanitizeMode::PlainText),
        content: sanitize(&fields.content, SanitizeMode::RichText),
        summary: sanitize_opt(fields.summary.as_deref(), SanitizeMode::RichText),
        tags: sanitize_opt(fields.tags.as_deref(), SanitizeMode::PlainText),
    }
}

/// Sanitize untrusted text. Never fails; input that does not settle in rich
/// mode degrades to plain text.
pub fn sanitize(text: &str, mode: SanitizeMode) -> String {
    let max_passes = match mode {
        SanitizeMode::PlainText => MAX_PLAIN_PASSES,
        SanitizeMode::RichText => MAX_RICH_PASSES,
    };

    let mut current = single_pass(text, mode);
    for _ in 0..max_passes {
        let next = single_pass(&current, mode);
        if next == current {
            return current;
        }
        current = next;
    }

    match mode {
        SanitizeMode::RichText => {
            tracing::debug!("Rich text did not settle, degrading to plain text");
            sanitize(text, SanitizeMode::PlainText)
        }
        SanitizeMode::PlainText => current,
    }
}

fn single_pass(input: &str, mode: SanitizeMode) -> String {
    let inert = strip_active_content(input);
    match mode {
        SanitizeMode::PlainText => encode_text(&tag_regex().replace_all(&inert, "")),
        SanitizeMode::RichText => rebuild_rich(&inert),
    }
}

/// Remove dangerous elements, event handlers and script URL schemes until
/// none are left. Every removal shrinks the string, so this terminates.
fn strip_active_content(input: &str) -> String {
    let mut current = input.to_string();
    loop {
        let mut next = current.clone();
        for re in dangerous_element_regexes() {
            next = re.replace_all(&next, "").into_owned();
        }
        next = event_handler_regex().replace_all(&next, "").into_owned();
        next = script_scheme_regex().replace_all(&next, "").into_owned();

        if next == current {
            return current;
        }
        current = next;
    }
}

/// Re-emit allowed tags in canonical form, drop every other tag and encode
/// the text in between.
fn rebuild_rich(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last = 0;

    for caps in tag_regex().captures_iter(input) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&encode_text(&input[last..whole.start()]));
        last = whole.end();

        let closing = !caps[1].is_empty();
        let name = caps[2].to_ascii_lowercase();
        if !ALLOWED_TAGS.contains(&name.as_str()) {
            continue;
        }

        if closing {
            if name != "br" {
                out.push_str("</");
                out.push_str(&name);
                out.push('>');
            }
            continue;
        }

        out.push('<');
        out.push_str(&name);
        if CLASS_TAGS.contains(&name.as_str()) {
            if let Some(class) = clean_class(&caps[3]) {
                out.push_str(" class=\"");
                out.push_str(&class);
                out.push('"');
            }
        }
        out.push('>');
    }

    out.push_str(&encode_text(&input[last..]));
    out
}

fn clean_class(attrs: &str) -> Option<String> {
    let caps = class_attr_regex().captures(attrs)?;
    let raw = caps
        .get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))?
        .as_str();

    let filtered: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ' '))
        .collect();
    let normalized = filtered.split_whitespace().collect::<Vec<_>>().join(" ");

    (!normalized.is_empty()).then_some(normalized)
}

/// HTML-encode special characters. An `&` that already starts a character
/// reference is left alone so encoding is stable.
fn encode_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, ch) in text.char_indices() {
        match ch {
            '&' if entity_regex().is_match(&text[i..]) => out.push('&'),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOSTILE: &[&str] = &[
        "<script>alert(1)</script>Hi",
        "<SCRIPT type=\"text/javascript\">steal()</SCRIPT>after",
        "<scr<script></script>ipt>alert(1)</script>",
        "Hello <iframe src='http://malicious.com'></iframe>World",
        "<object data=x>payload</object><embed src=y>",
        "<p onclick=\"alert('x')\">Hello</p> World",
        "<img src=x onerror=alert(1)>",
        "<a href=\"javascript:alert(1)\">click</a>",
        "o<b>n</b>click=alert(1)",
        "oonclick=nclick=\"x\"",
        "Tom & Jerry <3 \"quotes\" 'single'",
        "&lt;script&gt;already encoded&lt;/script&gt;",
        "&amp &amp; &#x3C; &#60; &bogus",
        "<code class=\"rust\" data-x=\"1\">fn main() {}</code>",
        "<pre class='a\" onmouseover=\"x'>code</pre>",
        "<h1>Title</h1><ul><li>one</li><li>two</li></ul>",
        "plain text, nothing to do",
        "<<script>script>alert(1)<</script>/script>",
        "",
    ];

    fn has_event_handler(s: &str) -> bool {
        Regex::new(r"(?i)on\w+=").unwrap().is_match(s)
    }

    #[test]
    fn test_none_passes_through() {
        assert_eq!(sanitize_opt(None, SanitizeMode::PlainText), None);
        assert_eq!(sanitize_opt(None, SanitizeMode::RichText), None);
    }

    #[test]
    fn test_sanitize_fields_uses_mode_per_field() {
        let fields = ArticleFields::new("<em>Title</em>", "<em>Body</em>")
            .with_summary("<strong>Sum</strong>")
            .with_tags("<b>rust</b>, web");

        let clean = sanitize_fields(&fields);

        assert_eq!(clean.title, "Title");
        assert_eq!(clean.content, "<em>Body</em>");
        assert_eq!(clean.summary.as_deref(), Some("<strong>Sum</strong>"));
        assert_eq!(clean.tags.as_deref(), Some("rust, web"));
    }

    #[test]
    fn test_title_script_is_removed_and_text_kept() {
        let out = sanitize("<script>alert(1)</script>Hi", SanitizeMode::PlainText);
        assert_eq!(out, "Hi");
    }

    #[test]
    fn test_iframe_removed_with_contents() {
        let out = sanitize(
            "Hello <iframe src='http://malicious.com'>inner</iframe>World",
            SanitizeMode::RichText,
        );
        assert_eq!(out, "Hello World");
    }

    #[test]
    fn test_event_handler_removed_from_allowed_tag() {
        let out = sanitize(
            "<p onclick=\"alert('x')\">Hello</p> World",
            SanitizeMode::RichText,
        );
        assert_eq!(out, "<p>Hello</p> World");
    }

    #[test]
    fn test_plain_text_strips_all_tags() {
        let out = sanitize("<strong>Bold</strong> and <em>it</em>", SanitizeMode::PlainText);
        assert_eq!(out, "Bold and it");
    }

    #[test]
    fn test_rich_text_keeps_allow_list_in_canonical_form() {
        let out = sanitize(
            "<H1>Head</H1><P>para<BR/>line</P><div>dropped</div>",
            SanitizeMode::RichText,
        );
        assert_eq!(out, "<h1>Head</h1><p>para<br>line</p>dropped");
    }

    #[test]
    fn test_class_only_kept_on_code_blocks() {
        let out = sanitize(
            "<code class=\"lang-rust\" data-x=\"1\">x</code><p class=\"big\">y</p>",
            SanitizeMode::RichText,
        );
        assert_eq!(out, "<code class=\"lang-rust\">x</code><p>y</p>");
    }

    #[test]
    fn test_special_characters_are_encoded() {
        let out = sanitize("Tom & Jerry <3 \"hi\" 'yo'", SanitizeMode::PlainText);
        assert_eq!(out, "Tom &amp; Jerry &lt;3 &quot;hi&quot; &#39;yo&#39;");
    }

    #[test]
    fn test_existing_entities_are_not_double_encoded() {
        let input = "&lt;b&gt; &amp; &#60; &#x3C;";
        assert_eq!(sanitize(input, SanitizeMode::PlainText), input);
    }

    #[test]
    fn test_script_scheme_removed() {
        let out = sanitize("javascript:alert(1)", SanitizeMode::PlainText);
        assert_eq!(out, "alert(1)");
    }

    #[test]
    fn test_spliced_payload_is_caught() {
        let out = sanitize(
            "<scr<script></script>ipt>alert(1)</script>",
            SanitizeMode::PlainText,
        );
        assert!(!out.to_lowercase().contains("<script"));
        assert!(!out.contains("alert"));
    }

    #[test]
    fn test_clean_text_is_unchanged() {
        let input = "Rust 2024 edition notes — ownership, borrowing";
        assert_eq!(sanitize(input, SanitizeMode::PlainText), input);
        assert_eq!(sanitize(input, SanitizeMode::RichText), input);
    }

    #[test]
    fn test_hostile_inputs_are_neutralized_and_idempotent() {
        for mode in [SanitizeMode::PlainText, SanitizeMode::RichText] {
            for input in HOSTILE {
                let once = sanitize(input, mode);
                let twice = sanitize(&once, mode);

                assert_eq!(once, twice, "not idempotent for {input:?} in {mode:?}");
                assert!(
                    !once.to_lowercase().contains("<script"),
                    "script survived for {input:?} in {mode:?}: {once}"
                );
                assert!(
                    !has_event_handler(&once),
                    "event handler survived for {input:?} in {mode:?}: {once}"
                );
            }
        }
    }
}
