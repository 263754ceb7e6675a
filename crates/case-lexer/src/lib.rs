// CASE lexer -- tokenizer for the CASE language.
//
// The lexer scans the source directly: a byte position into the original
// text, a 1-based line counter advanced as newlines are consumed, and
// lookahead helpers sized for what the CASE grammar needs (two-character
// symbols, fractional digits, signed exponents).

use case_common::error::{LexError, LexErrorKind};
use case_common::span::Span;
use case_common::token::{is_keyword, Token, TokenKind};

/// Two-character symbols, matched maximal-munch before single characters.
const TWO_CHAR_SYMBOLS: &[&str] = &[
    "<=", ">=", "==", "!=", "&&", "||", "+=", "-=", "*=", "/=", "%=", "++", "--", "->", "::",
    "<<", ">>",
];

/// Single-character symbols recognized after the two-character scan.
const ONE_CHAR_SYMBOLS: &[char] = &[
    '+', '-', '*', '/', '%', '<', '>', '=', '!', '&', '|', '(', ')', '{', '}', '[', ']', ';',
    ',', '.', ':', '?',
];

/// The CASE lexer. Converts source text into a vector of tokens terminated
/// by an [`TokenKind::End`] token, or fails at the first lexical error.
pub struct Lexer<'src> {
    source: &'src str,
    /// Byte offset of the next unconsumed character.
    pos: usize,
    /// 1-based line of the next unconsumed character. [`Lexer::bump`] keeps
    /// this current, so every scanning path counts newlines for free.
    line: u32,
}

impl<'src> Lexer<'src> {
    /// Create a new lexer for the given source text.
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            pos: 0,
            line: 1,
        }
    }

    /// Tokenize the entire source. The returned vector ends with `End`.
    pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let tok = lexer.next_token()?;
            let done = tok.kind == TokenKind::End;
            tokens.push(tok);
            if done {
                return Ok(tokens);
            }
        }
    }

    // ── Scanning primitives ────────────────────────────────────────────

    /// The unconsumed tail of the source.
    fn rest(&self) -> &'src str {
        &self.source[self.pos..]
    }

    /// Look at the next character without consuming it.
    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Look one character past [`Lexer::peek`].
    fn peek2(&self) -> Option<char> {
        let mut chars = self.rest().chars();
        chars.next();
        chars.next()
    }

    /// Consume one character, advancing the byte position and, on a
    /// newline, the line counter.
    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    /// Consume characters while the predicate holds.
    fn eat_while(&mut self, predicate: impl Fn(char) -> bool) {
        while self.peek().is_some_and(&predicate) {
            self.bump();
        }
    }

    /// The text consumed since `start`.
    fn lexeme(&self, start: usize) -> &'src str {
        &self.source[start..self.pos]
    }

    /// The byte span from `start` to the current position.
    fn span_from(&self, start: usize) -> Span {
        Span::new(start as u32, self.pos as u32)
    }

    // ── Token scanning ─────────────────────────────────────────────────

    fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_trivia();

        let start = self.pos;
        let line = self.line;

        let Some(c) = self.peek() else {
            return Ok(Token::new(TokenKind::End, "", self.span_from(start), line));
        };

        if c == '"' {
            return self.lex_string(start, line);
        }
        if c.is_ascii_digit() {
            return Ok(self.lex_number(start, line));
        }
        if is_ident_start(c) {
            return Ok(self.lex_word(start, line));
        }
        self.lex_symbol(c, start, line)
    }

    /// Skip whitespace and line comments (`//…` and `#…`). Newlines advance
    /// the line counter inside [`Lexer::bump`].
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') if self.peek2() == Some('/') => {
                    self.eat_while(|c| c != '\n');
                }
                Some('#') => {
                    self.eat_while(|c| c != '\n');
                }
                _ => break,
            }
        }
    }

    /// Identifier or keyword.
    fn lex_word(&mut self, start: usize, line: u32) -> Token {
        self.eat_while(is_ident_char);
        let text = self.lexeme(start);
        let kind = if is_keyword(text) {
            TokenKind::Keyword
        } else {
            TokenKind::Ident
        };
        Token::new(kind, text, self.span_from(start), line)
    }

    /// Number literal: decimal with optional fraction and signed exponent,
    /// `0x…` hex, `0b…` binary; `_` separators allowed throughout.
    fn lex_number(&mut self, start: usize, line: u32) -> Token {
        let radix_prefixed =
            self.peek() == Some('0') && matches!(self.peek2(), Some('x' | 'X' | 'b' | 'B'));

        if radix_prefixed {
            self.bump(); // 0
            self.bump(); // x or b
            self.eat_while(|c| c.is_ascii_alphanumeric() || c == '_');
        } else {
            self.eat_while(|c| c.is_ascii_digit() || c == '_');

            // Fractional part, only when a digit follows the dot.
            if self.peek() == Some('.') && self.peek2().is_some_and(|c| c.is_ascii_digit()) {
                self.bump(); // .
                self.eat_while(|c| c.is_ascii_digit() || c == '_');
            }

            // Signed exponent: `e`/`E`, an optional sign, then digits.
            if matches!(self.peek(), Some('e' | 'E')) {
                let mut tail = self.rest().chars();
                tail.next(); // e
                let exp_ok = match tail.next() {
                    Some('+') | Some('-') => tail.next().is_some_and(|c| c.is_ascii_digit()),
                    Some(c) => c.is_ascii_digit(),
                    None => false,
                };
                if exp_ok {
                    self.bump(); // e
                    if matches!(self.peek(), Some('+' | '-')) {
                        self.bump();
                    }
                    self.eat_while(|c| c.is_ascii_digit() || c == '_');
                }
            }
        }

        Token::new(TokenKind::Number, self.lexeme(start), self.span_from(start), line)
    }

    /// Double-quoted string with the `\n \t \r \\ \"` escape set. Unknown
    /// escapes keep the escaped character. Unterminated strings fail at the
    /// opening line.
    fn lex_string(&mut self, start: usize, line: u32) -> Result<Token, LexError> {
        self.bump(); // opening quote
        let mut content = String::new();
        loop {
            match self.bump() {
                None => {
                    return Err(LexError::new(
                        LexErrorKind::UnterminatedString,
                        self.span_from(start),
                        line,
                    ));
                }
                Some('"') => break,
                Some('\\') => match self.bump() {
                    Some('n') => content.push('\n'),
                    Some('t') => content.push('\t'),
                    Some('r') => content.push('\r'),
                    Some('\\') => content.push('\\'),
                    Some('"') => content.push('"'),
                    Some(other) => content.push(other),
                    None => {
                        return Err(LexError::new(
                            LexErrorKind::UnterminatedString,
                            self.span_from(start),
                            line,
                        ));
                    }
                },
                Some(c) => content.push(c),
            }
        }
        Ok(Token::new(TokenKind::Str, content, self.span_from(start), line))
    }

    /// Maximal-munch symbol scan: two-character forms first, then single
    /// characters. Anything else is an `UnexpectedCharacter` error.
    fn lex_symbol(&mut self, c: char, start: usize, line: u32) -> Result<Token, LexError> {
        if let Some(next) = self.peek2() {
            let mut pair = String::with_capacity(2);
            pair.push(c);
            pair.push(next);
            if TWO_CHAR_SYMBOLS.contains(&pair.as_str()) {
                self.bump();
                self.bump();
                return Ok(Token::new(TokenKind::Symbol, pair, self.span_from(start), line));
            }
        }
        if ONE_CHAR_SYMBOLS.contains(&c) {
            self.bump();
            return Ok(Token::new(
                TokenKind::Symbol,
                c.to_string(),
                self.span_from(start),
                line,
            ));
        }

        self.bump();
        Err(LexError::new(
            LexErrorKind::UnexpectedCharacter(c),
            self.span_from(start),
            line,
        ))
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds_and_texts(source: &str) -> Vec<(TokenKind, String)> {
        Lexer::tokenize(source)
            .expect("lexing should succeed")
            .into_iter()
            .map(|t| (t.kind, t.text))
            .collect()
    }

    #[test]
    fn empty_source_yields_end() {
        let toks = Lexer::tokenize("").unwrap();
        assert_eq!(toks.len(), 1);
        assert_eq!(toks[0].kind, TokenKind::End);
        assert_eq!(toks[0].span, Span::new(0, 0));
    }

    #[test]
    fn keywords_vs_identifiers() {
        let toks = kinds_and_texts("let foo Print bar Fn");
        assert_eq!(
            toks,
            vec![
                (TokenKind::Keyword, "let".into()),
                (TokenKind::Ident, "foo".into()),
                (TokenKind::Keyword, "Print".into()),
                (TokenKind::Ident, "bar".into()),
                (TokenKind::Keyword, "Fn".into()),
                (TokenKind::End, "".into()),
            ]
        );
    }

    #[test]
    fn spans_are_byte_offsets() {
        let toks = Lexer::tokenize("let x = 42").unwrap();
        assert_eq!(toks[0].span, Span::new(0, 3)); // let
        assert_eq!(toks[1].span, Span::new(4, 5)); // x
        assert_eq!(toks[2].span, Span::new(6, 7)); // =
        assert_eq!(toks[3].span, Span::new(8, 10)); // 42
    }

    #[test]
    fn multibyte_string_content_keeps_spans_aligned() {
        // The accented character is two bytes; the identifier after the
        // string must still get a correct byte span.
        let src = "Print \"caf\u{00E9}\" x";
        let toks = Lexer::tokenize(src).unwrap();
        assert_eq!(toks[1].kind, TokenKind::Str);
        assert_eq!(toks[1].text, "caf\u{00E9}");
        assert_eq!(toks[2].text, "x");
        assert_eq!(
            &src[toks[2].span.start as usize..toks[2].span.end as usize],
            "x"
        );
    }

    #[test]
    fn numbers_all_forms() {
        let toks = kinds_and_texts("42 3.25 1e3 2.5e-2 0xFF 0b1010 1_000");
        let texts: Vec<&str> = toks
            .iter()
            .filter(|(k, _)| *k == TokenKind::Number)
            .map(|(_, t)| t.as_str())
            .collect();
        assert_eq!(texts, vec!["42", "3.25", "1e3", "2.5e-2", "0xFF", "0b1010", "1_000"]);
    }

    #[test]
    fn dot_without_digit_is_member_access() {
        let toks = kinds_and_texts("1.x");
        assert_eq!(
            toks,
            vec![
                (TokenKind::Number, "1".into()),
                (TokenKind::Symbol, ".".into()),
                (TokenKind::Ident, "x".into()),
                (TokenKind::End, "".into()),
            ]
        );
    }

    #[test]
    fn exponent_without_digits_is_an_identifier_suffix() {
        // `1e` and `1e+` have no exponent digits, so `e` stays a word.
        let toks = kinds_and_texts("1e x");
        assert_eq!(toks[0], (TokenKind::Number, "1".into()));
        assert_eq!(toks[1], (TokenKind::Ident, "e".into()));
    }

    #[test]
    fn string_escapes_are_decoded() {
        let toks = kinds_and_texts(r#""a\n\t\"b\\""#);
        assert_eq!(toks[0], (TokenKind::Str, "a\n\t\"b\\".into()));
    }

    #[test]
    fn raw_newline_inside_string_advances_line() {
        let toks = Lexer::tokenize("\"two\nlines\" x").unwrap();
        assert_eq!(toks[0].line, 1);
        assert_eq!(toks[1].line, 2);
    }

    #[test]
    fn unterminated_string_fails_at_opening_line() {
        let err = Lexer::tokenize("let x = 1\n\"never ends").unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnterminatedString);
        assert_eq!(err.line, 2);
    }

    #[test]
    fn unexpected_character_fails() {
        let err = Lexer::tokenize("let x = @").unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnexpectedCharacter('@'));
        assert_eq!(err.line, 1);
    }

    #[test]
    fn two_char_symbols_are_maximal_munch() {
        let toks = kinds_and_texts("<= >= == != && || += -= *= /= %= ++ -- -> :: << >>");
        let syms: Vec<&str> = toks
            .iter()
            .filter(|(k, _)| *k == TokenKind::Symbol)
            .map(|(_, t)| t.as_str())
            .collect();
        assert_eq!(
            syms,
            vec![
                "<=", ">=", "==", "!=", "&&", "||", "+=", "-=", "*=", "/=", "%=", "++", "--",
                "->", "::", "<<", ">>"
            ]
        );
    }

    #[test]
    fn single_char_symbol_fallback() {
        let toks = kinds_and_texts("a < b ? c : d");
        let syms: Vec<&str> = toks
            .iter()
            .filter(|(k, _)| *k == TokenKind::Symbol)
            .map(|(_, t)| t.as_str())
            .collect();
        assert_eq!(syms, vec!["<", "?", ":"]);
    }

    #[test]
    fn comments_are_skipped_and_lines_counted() {
        let toks = Lexer::tokenize("// header\nlet x = 1\n# trailer\nlet y = 2").unwrap();
        let lets: Vec<u32> = toks
            .iter()
            .filter(|t| t.is_keyword("let"))
            .map(|t| t.line)
            .collect();
        assert_eq!(lets, vec![2, 4]);
    }

    #[test]
    fn lines_are_one_based() {
        let toks = Lexer::tokenize("a\nb\n\nc").unwrap();
        let lines: Vec<u32> = toks
            .iter()
            .filter(|t| t.kind == TokenKind::Ident)
            .map(|t| t.line)
            .collect();
        assert_eq!(lines, vec![1, 2, 4]);
    }
}
