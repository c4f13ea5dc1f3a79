//! Plain terminal output

use chrono::{DateTime, Utc};
use quire_common::model::join_tags;
use quire_common::Poem;
use std::fmt::Write;

use super::html::snippet;
use crate::view::{PageView, TagSummary};

fn date_label(poem: &Poem) -> String {
    poem.updated_at()
        .map(|at| at.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "undated".to_string())
}

/// One listing entry: header line plus indented snippet
pub fn render_entry(poem: &Poem, favorite: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} [{}] {}  ({})",
        if favorite { "♥" } else { " " },
        poem.id,
        poem.title,
        date_label(poem)
    );
    let (lines, truncated) = snippet(&poem.content);
    for line in lines.lines() {
        let _ = writeln!(out, "    {}", line);
    }
    if truncated {
        out.push_str("    …\n");
    }
    if !poem.tags.is_empty() {
        let _ = writeln!(out, "    tags: {}", join_tags(&poem.tags));
    }
    out
}

/// A whole page with a footer counting what is left
pub fn render_page(page: &PageView<'_>, is_favorite: impl Fn(&str) -> bool) -> String {
    if page.poems.is_empty() {
        return "No poems found.\n".to_string();
    }

    let mut out = String::new();
    for poem in &page.poems {
        out.push_str(&render_entry(poem, is_favorite(poem.id.as_str())));
        out.push('\n');
    }
    let _ = write!(out, "Showing {} of {}", page.poems.len(), page.total);
    if page.has_more {
        out.push_str(" (use --page to see more)");
    }
    out.push('\n');
    out
}

/// Full poem
pub fn render_poem(poem: &Poem, favorite: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}{}", poem.title, if favorite { "  ♥" } else { "" });
    let _ = writeln!(out, "{}", "=".repeat(poem.title.chars().count().max(1)));
    let _ = writeln!(out, "{}", poem.content);
    let _ = writeln!(out);
    if !poem.tags.is_empty() {
        let _ = writeln!(out, "tags: {}", join_tags(&poem.tags));
    }
    let _ = writeln!(out, "id: {}  updated: {}", poem.id, date_label(poem));
    out
}

/// "All (n)" then each tag with its count, plus the last-updated line
pub fn render_tags(summary: &TagSummary, latest: Option<DateTime<Utc>>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "All ({})", summary.total);
    for (tag, count) in &summary.counts {
        let _ = writeln!(out, "{} ({})", tag, count);
    }
    if let Some(at) = latest {
        let _ = writeln!(out, "\nLast updated: {}", at.format("%Y-%m-%d %H:%M UTC"));
    }
    out
}
