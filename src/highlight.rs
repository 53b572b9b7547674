//! Syntax highlighting for code blocks.
//!
//! Highlighting is class based: the output carries `hl-` prefixed span
//! classes and no inline colors, so a theme is just a stylesheet
//! ([`SyntectHighlighter::theme_css`]).

use syntect::highlighting::ThemeSet;
use syntect::html::{ClassStyle, ClassedHTMLGenerator, css_for_theme_with_class_style};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;
use thiserror::Error;

const CLASS_STYLE: ClassStyle = ClassStyle::SpacedPrefixed { prefix: "hl-" };

#[derive(Error, Debug)]
pub enum HighlightError {
    #[error("syntect error: {0}")]
    Syntect(#[from] syntect::Error),
    #[error("unknown theme: {0}")]
    UnknownTheme(String),
}

/// Turns source text into highlighted, escaped HTML.
pub trait Highlighter: Sync {
    /// Highlight `code`. `language` is a token such as `rust` or `py`;
    /// `None` or an unknown token means auto-detect.
    fn highlight(&self, code: &str, language: Option<&str>) -> Result<String, HighlightError>;
}

pub struct SyntectHighlighter {
    syntaxes: SyntaxSet,
}

impl Default for SyntectHighlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntectHighlighter {
    pub fn new() -> Self {
        Self {
            syntaxes: SyntaxSet::load_defaults_newlines(),
        }
    }

    fn detect(&self, code: &str, language: Option<&str>) -> &SyntaxReference {
        language
            .and_then(|token| self.syntaxes.find_syntax_by_token(token))
            .or_else(|| {
                code.lines()
                    .next()
                    .and_then(|line| self.syntaxes.find_syntax_by_first_line(line))
            })
            .unwrap_or_else(|| self.syntaxes.find_syntax_plain_text())
    }

    /// Stylesheet for one of syntect's bundled themes, matching the classes
    /// [`Highlighter::highlight`] emits.
    pub fn theme_css(theme: &str) -> Result<String, HighlightError> {
        let themes = ThemeSet::load_defaults();
        let theme = themes
            .themes
            .get(theme)
            .ok_or_else(|| HighlightError::UnknownTheme(theme.to_string()))?;
        Ok(css_for_theme_with_class_style(theme, CLASS_STYLE)?)
    }
}

impl Highlighter for SyntectHighlighter {
    fn highlight(&self, code: &str, language: Option<&str>) -> Result<String, HighlightError> {
        let syntax = self.detect(code, language);
        let mut generator =
            ClassedHTMLGenerator::new_with_class_style(syntax, &self.syntaxes, CLASS_STYLE);
        for line in LinesWithEndings::from(code) {
            generator.parse_html_for_line_which_includes_newline(line)?;
        }
        Ok(generator.finalize())
    }
}
