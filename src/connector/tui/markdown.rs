//! Lightweight markdown styling for chat transcripts.
//!
//! Handles the subset models actually emit: headings, bullet lists, fenced
//! code blocks (highlighted with syntect), `inline code` and **bold** spans.
//! Everything else is passed through as plain text.

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::parsing::{SyntaxReference, SyntaxSet};

const THEME_NAME: &str = "base16-ocean.dark";
const FENCE: &str = "```";

pub struct Highlighter {
    syntaxes: SyntaxSet,
    theme: Theme,
}

impl Highlighter {
    pub fn new() -> Self {
        let themes = ThemeSet::load_defaults();
        Self {
            syntaxes: SyntaxSet::load_defaults_nonewlines(),
            theme: themes.themes.get(THEME_NAME).cloned().unwrap_or_default(),
        }
    }

    fn syntax_for(&self, lang: &str) -> &SyntaxReference {
        self.syntaxes
            .find_syntax_by_token(lang)
            .unwrap_or_else(|| self.syntaxes.find_syntax_plain_text())
    }

    fn highlight_block(&self, lang: &str, code: &[&str]) -> Vec<Line<'static>> {
        let mut highlighter = HighlightLines::new(self.syntax_for(lang), &self.theme);
        code.iter()
            .map(|line| match highlighter.highlight_line(line, &self.syntaxes) {
                Ok(regions) => Line::from(
                    regions
                        .into_iter()
                        .map(|(style, text)| {
                            let fg = style.foreground;
                            Span::styled(text.to_string(), Style::default().fg(Color::Rgb(fg.r, fg.g, fg.b)))
                        })
                        .collect::<Vec<_>>(),
                ),
                Err(_) => Line::styled(line.to_string(), code_style()),
            })
            .collect()
    }
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new()
    }
}

fn code_style() -> Style {
    Style::default().fg(Color::Yellow)
}

/// Renders markdown text into styled lines. An unterminated fence (common
/// while a reply is still streaming) is treated as running to the end.
pub fn render(text: &str, highlighter: &Highlighter) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let mut code_lang: Option<String> = None;
    let mut code: Vec<&str> = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim_start();
        if let Some(info) = trimmed.strip_prefix(FENCE) {
            match code_lang.take() {
                Some(lang) => {
                    lines.extend(highlighter.highlight_block(&lang, &code));
                    code.clear();
                }
                None => code_lang = Some(info.trim().to_string()),
            }
            continue;
        }
        if code_lang.is_some() {
            code.push(line);
        } else {
            lines.push(render_prose_line(line));
        }
    }
    if let Some(lang) = code_lang {
        lines.extend(highlighter.highlight_block(&lang, &code));
    }
    lines
}

fn render_prose_line(line: &str) -> Line<'static> {
    let trimmed = line.trim_start();
    let heading_level = trimmed.chars().take_while(|&c| c == '#').count();
    if (1..=6).contains(&heading_level) && trimmed[heading_level..].starts_with(' ') {
        return Line::styled(
            trimmed[heading_level + 1..].to_string(),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );
    }

    let indent = &line[..line.len() - trimmed.len()];
    if let Some(item) = trimmed
        .strip_prefix("- ")
        .or_else(|| trimmed.strip_prefix("* "))
    {
        let mut spans = vec![Span::raw(format!("{indent}• "))];
        spans.extend(inline_spans(item));
        return Line::from(spans);
    }

    Line::from(inline_spans(line))
}

/// Splits a line on `inline code` and **bold** markers.
fn inline_spans(text: &str) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let tick = rest.find('`');
        let bold = rest.find("**");
        let (start, marker, style) = match (tick, bold) {
            (Some(t), Some(b)) if b < t => (b, "**", Style::default().add_modifier(Modifier::BOLD)),
            (Some(t), _) => (t, "`", code_style()),
            (None, Some(b)) => (b, "**", Style::default().add_modifier(Modifier::BOLD)),
            (None, None) => break,
        };

        let after = &rest[start + marker.len()..];
        let Some(end) = after.find(marker) else {
            break;
        };
        if start > 0 {
            spans.push(Span::raw(rest[..start].to_string()));
        }
        spans.push(Span::styled(after[..end].to_string(), style));
        rest = &after[end + marker.len()..];
    }

    if !rest.is_empty() {
        spans.push(Span::raw(rest.to_string()));
    }
    spans
}
