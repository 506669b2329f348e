//! Tokenizing syntax highlighter for code blocks

use lazy_static::lazy_static;
use syntect::easy::HighlightLines;
use syntect::highlighting::{Color, FontStyle, Style, Theme, ThemeSet};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

use super::markdown::{Component, Node, TreeRenderer};
use crate::config::HighlightConfig;
use crate::error::RenderError;
use crate::helpers::html_escape;

lazy_static! {
    static ref SYNTAX_SET: SyntaxSet = SyntaxSet::load_defaults_newlines();
    static ref THEME_SET: ThemeSet = ThemeSet::load_defaults();
}

const DEFAULT_THEME: &str = "base16-ocean.dark";

/// A run of code text sharing one style
#[derive(Debug, Clone, PartialEq)]
pub struct StyledToken {
    pub text: String,
    pub style: Style,
}

impl StyledToken {
    /// Inline CSS for this token
    pub fn css(&self) -> String {
        let mut css = format!("color:{};", hex(self.style.foreground));
        let font = self.style.font_style;
        if font.contains(FontStyle::BOLD) {
            css.push_str("font-weight:bold;");
        }
        if font.contains(FontStyle::ITALIC) {
            css.push_str("font-style:italic;");
        }
        if font.contains(FontStyle::UNDERLINE) {
            css.push_str("text-decoration:underline;");
        }
        css
    }
}

/// A highlighted code block: one token list per source line
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightedCode {
    pub language: String,
    pub background: Option<Color>,
    pub lines: Vec<Vec<StyledToken>>,
}

impl HighlightedCode {
    /// The code covered by the tokens, lines joined by `\n`
    pub fn plain_text(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.iter().map(|t| t.text.as_str()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn to_html(&self, line_numbers: bool) -> String {
        let mut html = format!(
            r#"<pre class="highlight language-{}""#,
            html_escape(&self.language)
        );
        if let Some(background) = self.background {
            html.push_str(&format!(r#" style="background-color:{};""#, hex(background)));
        }
        html.push('>');

        for (i, line) in self.lines.iter().enumerate() {
            html.push_str(r#"<div class="token-line">"#);
            if line_numbers {
                html.push_str(&format!(r#"<span class="line-number">{}</span>"#, i + 1));
            }
            for token in line {
                html.push_str(&format!(
                    r#"<span style="{}">{}</span>"#,
                    token.css(),
                    html_escape(&token.text)
                ));
            }
            html.push_str("</div>");
        }

        html.push_str("</pre>\n");
        html
    }
}

/// Syntax highlighter with a fixed theme
#[derive(Debug, Clone)]
pub struct Highlighter {
    theme: Theme,
}

impl Highlighter {
    /// Create a highlighter for a syntect default theme
    pub fn new(theme_name: &str) -> Self {
        let theme = THEME_SET
            .themes
            .get(theme_name)
            .or_else(|| {
                tracing::warn!(
                    "Unknown highlight theme {:?}, using {}",
                    theme_name,
                    DEFAULT_THEME
                );
                THEME_SET.themes.get(DEFAULT_THEME)
            })
            .cloned()
            .unwrap_or_default();
        Self { theme }
    }

    /// Split `code` into styled tokens, inferring the syntax from `lang`.
    ///
    /// Unknown or missing languages are tokenized as plain text.
    pub fn highlight(
        &self,
        code: &str,
        lang: Option<&str>,
    ) -> Result<HighlightedCode, syntect::Error> {
        let syntax = lang
            .and_then(|lang| {
                SYNTAX_SET
                    .find_syntax_by_token(lang)
                    .or_else(|| SYNTAX_SET.find_syntax_by_extension(lang))
            })
            .unwrap_or_else(|| SYNTAX_SET.find_syntax_plain_text());

        let mut highlighter = HighlightLines::new(syntax, &self.theme);
        let mut lines = Vec::new();

        for line in LinesWithEndings::from(code) {
            let ranges = highlighter.highlight_line(line, &SYNTAX_SET)?;
            let tokens = ranges
                .into_iter()
                .filter_map(|(style, text)| {
                    let text = text.strip_suffix('\n').unwrap_or(text);
                    (!text.is_empty()).then(|| StyledToken {
                        text: text.to_string(),
                        style,
                    })
                })
                .collect();
            lines.push(tokens);
        }

        Ok(HighlightedCode {
            language: lang.unwrap_or("text").to_string(),
            background: self.theme.settings.background,
            lines,
        })
    }
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new(DEFAULT_THEME)
    }
}

/// Renders code blocks through the highlighter instead of a plain `<pre>`
#[derive(Debug, Clone)]
pub struct CodeBlockComponent {
    highlighter: Highlighter,
    line_numbers: bool,
}

impl CodeBlockComponent {
    pub fn new(config: &HighlightConfig) -> Self {
        Self {
            highlighter: Highlighter::new(&config.theme),
            line_numbers: config.line_numbers,
        }
    }
}

impl Component for CodeBlockComponent {
    fn render(
        &self,
        node: &Node,
        renderer: &TreeRenderer,
        out: &mut String,
    ) -> Result<(), RenderError> {
        match node {
            Node::CodeBlock { lang, code } => {
                let highlighted = self.highlighter.highlight(code, lang.as_deref())?;
                out.push_str(&highlighted.to_html(self.line_numbers));
                Ok(())
            }
            other => renderer.render_default(other, out),
        }
    }
}

fn hex(color: Color) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r, color.g, color.b)
}
