//! Escaped HTML fragments
//!
//! Every piece of record text passes through [`escape_html`] before it is
//! placed in markup. Highlighting runs on the escaped text, so it can only
//! ever add the `<span>` markup it owns.

use once_cell::sync::Lazy;
use quire_common::Poem;
use regex::Regex;
use std::fmt::Write;

use crate::view::{PageView, TagSummary};

/// Number of content lines shown on a card
pub const SNIPPET_LINES: usize = 3;

/// Words that get the highlight treatment, matched whole-word in any case
pub const POETIC_WORDS: &[&str] = &["दिल", "इश्क़", "प्रेम", "love", "heart", "soul"];

static POETIC_WORD_RE: Lazy<Regex> = Lazy::new(|| {
    let alternatives: Vec<String> = POETIC_WORDS.iter().map(|w| regex::escape(w)).collect();
    Regex::new(&format!(r"(?i)\b(?:{})\b", alternatives.join("|")))
        .expect("valid poetic word regex")
});

/// Escape the five characters that matter in text and attribute context
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// First [`SNIPPET_LINES`] lines of `content`, and whether more follow
pub fn snippet(content: &str) -> (String, bool) {
    let lines: Vec<&str> = content.lines().collect();
    let truncated = lines.len() > SNIPPET_LINES;
    let shown = lines.into_iter().take(SNIPPET_LINES).collect::<Vec<_>>().join("\n");
    (shown, truncated)
}

/// Wrap poetic words of already-escaped text in highlight spans
pub fn highlight_poetic_words(escaped: &str) -> String {
    POETIC_WORD_RE
        .replace_all(escaped, r#"<span class="highlight">$0</span>"#)
        .into_owned()
}

fn with_line_breaks(escaped: &str) -> String {
    escaped.replace("\r\n", "\n").replace('\n', "<br>")
}

/// Full poem body: escaped, highlighted, newlines as `<br>`
pub fn render_body(content: &str) -> String {
    with_line_breaks(&highlight_poetic_words(&escape_html(content)))
}

/// One card of the listing
pub fn render_card(poem: &Poem, favorite: bool) -> String {
    let (lines, truncated) = snippet(&poem.content);
    let mut body = with_line_breaks(&highlight_poetic_words(&escape_html(&lines)));
    if truncated {
        body.push_str("<br>…");
    }

    let mut html = String::new();
    let _ = write!(
        html,
        r#"<article class="poem-card" data-id="{id}"><h3 class="poem-title">{title}</h3><div class="poem-snippet">{body}</div>"#,
        id = escape_html(&poem.id),
        title = escape_html(&poem.title),
        body = body,
    );

    if !poem.tags.is_empty() {
        html.push_str(r#"<ul class="poem-tags">"#);
        for tag in &poem.tags {
            let _ = write!(html, r#"<li class="tag">{}</li>"#, escape_html(tag));
        }
        html.push_str("</ul>");
    }

    let _ = write!(
        html,
        r#"<button class="favorite-btn{active}" data-id="{id}">{mark}</button></article>"#,
        active = if favorite { " active" } else { "" },
        id = escape_html(&poem.id),
        mark = if favorite { "♥" } else { "♡" },
    );
    html
}

/// Card grid for a page, plus the "load more" control when more remain
pub fn render_page(page: &PageView<'_>, is_favorite: impl Fn(&str) -> bool) -> String {
    if page.poems.is_empty() {
        return r#"<p class="empty">No poems found.</p>"#.to_string();
    }

    let mut html = String::from(r#"<section class="poem-grid">"#);
    for poem in &page.poems {
        html.push_str(&render_card(poem, is_favorite(poem.id.as_str())));
    }
    html.push_str("</section>");

    if page.has_more {
        let _ = write!(
            html,
            r#"<button class="load-more" data-remaining="{}">Load more</button>"#,
            page.total - page.poems.len()
        );
    }
    html
}

/// Tag filter buttons: "All (n)" followed by each tag with its count
///
/// `active` names the selected tag, `None` meaning "All".
pub fn render_tag_filters(summary: &TagSummary, active: Option<&str>) -> String {
    let mut html = String::from(r#"<nav class="tag-filters">"#);
    let _ = write!(
        html,
        r#"<button class="tag-filter{}" data-tag="">All ({})</button>"#,
        if active.is_none() { " active" } else { "" },
        summary.total
    );
    for (tag, count) in &summary.counts {
        let escaped = escape_html(tag);
        let _ = write!(
            html,
            r#"<button class="tag-filter{active}" data-tag="{tag}">{tag} ({count})</button>"#,
            active = if active == Some(tag.as_str()) { " active" } else { "" },
            tag = escaped,
            count = count,
        );
    }
    html.push_str("</nav>");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{project, tag_summary, Filter};

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<script>alert("x" & 'y')</script>"#),
            "&lt;script&gt;alert(&quot;x&quot; &amp; &#39;y&#39;)&lt;/script&gt;"
        );
        assert_eq!(escape_html("plain दिल"), "plain दिल");
    }

    #[test]
    fn test_snippet_three_lines() {
        assert_eq!(snippet("a\nb\nc"), ("a\nb\nc".to_string(), false));
        assert_eq!(snippet("a\nb\nc\nd"), ("a\nb\nc".to_string(), true));
        assert_eq!(snippet(""), (String::new(), false));
    }

    #[test]
    fn test_highlight_whole_words_any_case() {
        assert_eq!(
            highlight_poetic_words("Love and loveless"),
            r#"<span class="highlight">Love</span> and loveless"#
        );
        assert_eq!(
            highlight_poetic_words("my HEART"),
            r#"my <span class="highlight">HEART</span>"#
        );
    }

    #[test]
    fn test_highlight_devanagari() {
        assert_eq!(
            highlight_poetic_words("मेरा दिल"),
            r#"मेरा <span class="highlight">दिल</span>"#
        );
    }

    #[test]
    fn test_render_body_escapes_before_markup() {
        let body = render_body("<b>soul</b>\nline two");
        assert_eq!(
            body,
            r#"&lt;b&gt;<span class="highlight">soul</span>&lt;/b&gt;<br>line two"#
        );
    }

    #[test]
    fn test_card_escapes_title_and_tags() {
        let poem = Poem::new("7", "<img src=x onerror=alert(1)>", "one\ntwo\nthree\nfour", vec!["a\"b".to_string()]);
        let card = render_card(&poem, true);

        assert!(!card.contains("<img"));
        assert!(card.contains("&lt;img src=x onerror=alert(1)&gt;"));
        assert!(card.contains("a&quot;b"));
        assert!(card.contains("one<br>two<br>three<br>…"));
        assert!(!card.contains("four"));
        assert!(card.contains("favorite-btn active"));
    }

    #[test]
    fn test_page_with_load_more() {
        let all: Vec<Poem> = (0..3)
            .map(|i| Poem::new(i.to_string(), format!("T{i}"), "c", vec![]))
            .collect();
        let view = project(&all, &Filter::All, 1, 2);
        let html = render_page(&view, |_| false);
        assert_eq!(html.matches("poem-card").count(), 2);
        assert!(html.contains(r#"data-remaining="1""#));

        let empty = project(&all, &Filter::Tag("none".to_string()), 1, 2);
        assert!(render_page(&empty, |_| false).contains("No poems found."));
    }

    #[test]
    fn test_tag_filters_include_all_entry() {
        let all = vec![
            Poem::new("1", "A", "c", vec!["love".to_string()]),
            Poem::new("2", "B", "c", vec!["<x>".to_string()]),
        ];
        let html = render_tag_filters(&tag_summary(&all), Some("love"));
        assert!(html.contains("All (2)"));
        assert!(html.contains(r#"tag-filter active" data-tag="love">love (1)"#));
        assert!(html.contains("&lt;x&gt; (1)"));
    }
}
