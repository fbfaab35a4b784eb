use colored::Colorize;
use serde::{Deserialize, Serialize};
use similar::{ChangeTag, TextDiff};
use typed_builder::TypedBuilder;

use super::Ast;
use crate::config::RatingConfig;

/// How changed lines are marked in rendered diffs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorStyle {
    /// `+`/`-` prefixes only.
    #[default]
    Plain,
    /// ANSI terminal colors.
    Ansi,
    /// `<span>` markup, for reports opened in a browser or spreadsheet.
    Html,
}

/// Options for any call that renders diagnostic text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, TypedBuilder)]
#[builder(field_defaults(default))]
pub struct RenderOptions {
    /// How to mark changed lines.
    pub style:   ColorStyle,
    /// Unchanged lines to keep around each change; `None` keeps everything.
    #[builder(setter(strip_option))]
    pub context: Option<usize>,
}

impl RenderOptions {
    /// Plain text, full context.
    pub fn plain() -> Self {
        Self::default()
    }

    /// Same options with a different style.
    pub fn with_style(self, style: ColorStyle) -> Self {
        Self { style, ..self }
    }

    /// Same options limited to `context` lines around each change.
    pub fn with_context(self, context: usize) -> Self {
        Self {
            context: Some(context),
            ..self
        }
    }
}

/// Renders the line diff between the pretty prints of two trees, values
/// shown and body types taken from `config`.
pub fn diff(from: &Ast, to: &Ast, config: &dyn RatingConfig, options: RenderOptions) -> String {
    let is_body_type = |t: &str| config.is_body_type(t);
    diff_text(
        &from.pretty_print(true, &is_body_type),
        &to.pretty_print(true, &is_body_type),
        options,
    )
}

/// Renders a line diff between two texts.
pub fn diff_text(old: &str, new: &str, options: RenderOptions) -> String {
    let text_diff = TextDiff::from_lines(old, new);
    let mut out = String::new();

    match options.context {
        Some(radius) => {
            for (i, group) in text_diff.grouped_ops(radius).iter().enumerate() {
                if i > 0 {
                    out.push_str("...\n");
                }
                for op in group {
                    for change in text_diff.iter_changes(op) {
                        push_line(&mut out, change.tag(), change.value(), options.style);
                    }
                }
            }
        }
        None => {
            for change in text_diff.iter_all_changes() {
                push_line(&mut out, change.tag(), change.value(), options.style);
            }
        }
    }

    out
}

/// Appends one rendered diff line.
fn push_line(out: &mut String, tag: ChangeTag, line: &str, style: ColorStyle) {
    let line = line.trim_end_matches('\n');
    let line = match style {
        ColorStyle::Html => escape_html(line),
        ColorStyle::Plain | ColorStyle::Ansi => line.to_string(),
    };
    let marked = match tag {
        ChangeTag::Equal => format!("  {line}"),
        ChangeTag::Delete => mark(&format!("- {line}"), "red", style),
        ChangeTag::Insert => mark(&format!("+ {line}"), "green", style),
    };
    out.push_str(&marked);
    out.push('\n');
}

/// Colors `text` according to `style`. Html text must already be escaped.
fn mark(text: &str, color: &str, style: ColorStyle) -> String {
    match style {
        ColorStyle::Plain => text.to_string(),
        ColorStyle::Ansi => format!("{}", text.color(color)),
        ColorStyle::Html => format!("<span style=\"color: {color}\">{text}</span>"),
    }
}

/// Escapes the characters HTML gives meaning to.
fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_diff_marks_changed_lines() {
        let rendered = diff_text("a\nb\nc", "a\nx\nc", RenderOptions::plain());
        assert_eq!(rendered, "  a\n- b\n+ x\n  c\n");
    }

    #[test]
    fn context_limits_unchanged_lines() {
        let old = "1\n2\n3\n4\n5\n6\n7\n8\n";
        let new = "1\n2\n3\n4\n5\n6\n7\nX\n";
        let rendered = diff_text(old, new, RenderOptions::plain().with_context(1));
        assert_eq!(rendered, "  7\n- 8\n+ X\n");
    }

    #[test]
    fn html_style_escapes_and_wraps() {
        let rendered = diff_text("<a>", "<b>", RenderOptions::plain().with_style(ColorStyle::Html));
        assert!(rendered.contains("<span style=\"color: red\">- &lt;a&gt;</span>"));
        assert!(rendered.contains("<span style=\"color: green\">+ &lt;b&gt;</span>"));
    }

    #[test]
    fn html_style_escapes_unchanged_lines() {
        let rendered = diff_text(
            "a<b & \"c\"\nx",
            "a<b & \"c\"\ny",
            RenderOptions::plain().with_style(ColorStyle::Html),
        );
        assert!(rendered.starts_with("  a&lt;b &amp; &quot;c&quot;\n"));
        assert!(!rendered.contains("a<b"));
    }
}
