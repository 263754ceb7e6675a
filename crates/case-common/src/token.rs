use serde::Serialize;

use crate::span::Span;

/// A token produced by the CASE lexer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    /// Owned text payload. For `Str` tokens this is the unescaped content
    /// without the surrounding quotes.
    pub text: String,
    pub span: Span,
    /// 1-based source line the token starts on.
    pub line: u32,
}

impl Token {
    /// Create a new token.
    pub fn new(kind: TokenKind, text: impl Into<String>, span: Span, line: u32) -> Self {
        Self {
            kind,
            text: text.into(),
            span,
            line,
        }
    }

    /// Whether this token is the given keyword.
    pub fn is_keyword(&self, kw: &str) -> bool {
        self.kind == TokenKind::Keyword && self.text == kw
    }

    /// Whether this token is the given symbol.
    pub fn is_symbol(&self, sym: &str) -> bool {
        self.kind == TokenKind::Symbol && self.text == sym
    }
}

/// The six token kinds of the CASE language.
///
/// The vocabulary is deliberately small: keywords and symbols carry their
/// concrete spelling in the token text rather than as separate variants, so
/// the parser dispatches on text the same way the language's grammar reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TokenKind {
    /// Identifier, e.g. `foo`, `my_var`.
    Ident,
    /// String literal; the token text holds the unescaped content.
    Str,
    /// Number literal; the token text preserves the written form.
    Number,
    /// A word from the closed keyword set.
    Keyword,
    /// Operator or punctuation, maximal-munch up to two characters.
    Symbol,
    /// End of input. Always the final token.
    End,
}

/// The closed keyword set of the CASE language.
pub const KEYWORDS: &[&str] = &[
    "Print",
    "ret",
    "return",
    "loop",
    "if",
    "else",
    "Fn",
    "routine",
    "call",
    "let",
    "while",
    "break",
    "continue",
    "switch",
    "case",
    "default",
    "match",
    "try",
    "catch",
    "throw",
    "overlay",
    "open",
    "write",
    "writeln",
    "read",
    "close",
    "mutate",
    "scale",
    "bounds",
    "checkpoint",
    "vbreak",
    "channel",
    "send",
    "recv",
    "sync",
    "schedule",
    "input",
    "true",
    "false",
    "class",
    "extends",
    "public",
    "private",
    "protected",
    "struct",
    "splice",
    "duration",
    "derivative",
];

/// Whether a word is a CASE keyword. Keywords are case-sensitive.
pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

/// Parse a CASE number literal into its numeric value.
///
/// Handles decimal with optional fraction and signed exponent, `0x` hex,
/// `0b` binary, and `_` digit separators. Returns `None` for text that is
/// not a valid literal; the lexer only produces valid forms, so callers on
/// lexer output may treat `None` as unreachable-but-harmless.
pub fn parse_number(text: &str) -> Option<f64> {
    let cleaned: String = text.chars().filter(|&c| c != '_').collect();
    if let Some(hex) = cleaned.strip_prefix("0x").or_else(|| cleaned.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).ok().map(|v| v as f64);
    }
    if let Some(bin) = cleaned.strip_prefix("0b").or_else(|| cleaned.strip_prefix("0B")) {
        return u64::from_str_radix(bin, 2).ok().map(|v| v as f64);
    }
    cleaned.parse::<f64>().ok()
}
