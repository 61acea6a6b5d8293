//! Lexer: source text → bounded token stream.
//!
//! All security screening of raw text happens here, before a single token
//! is produced:
//!
//! 1. length cap (default 10 000 characters)
//! 2. forbidden control / line-separator characters
//! 3. dangerous substrings (scripting URIs, reflection, global access)
//! 4. per-identifier denylist checks while scanning
//! 5. token count cap (default 1 000)
//!
//! Token patterns are tried in a fixed priority order at each position:
//! number, string, boolean, null, identifier, operator (longest first),
//! dot, parens, brackets, colon.

use aho_corasick::{AhoCorasick, AhoCorasickBuilder};
use once_cell::sync::Lazy;
use regex::RegexSet;

use super::context::is_safe_key;
use crate::error::ExprError;

pub const DEFAULT_MAX_LENGTH: usize = 10_000;
pub const DEFAULT_MAX_TOKENS: usize = 1_000;

/// Characters of context shown on each side of a diagnostic caret.
const EXCERPT_RADIUS: usize = 20;

const COMPOUND_OPERATORS: [&str; 8] = ["===", "!==", "==", "!=", "<=", ">=", "&&", "||"];
const SIMPLE_OPERATORS: [char; 9] = ['+', '-', '*', '/', '%', '<', '>', '!', '?'];

// ── Dangerous patterns ────────────────────────────────────────────────────────

const DANGEROUS_LITERALS: [&str; 7] = [
    "javascript:",
    "vbscript:",
    "data:text/html",
    "__proto__",
    "constructor",
    "prototype",
    "globalthis",
];

static DANGEROUS_LITERAL_MATCHER: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasickBuilder::new()
        .ascii_case_insensitive(true)
        .build(DANGEROUS_LITERALS)
});

const DANGEROUS_CALLS: [&str; 9] = [
    r"(?i)\beval\s*\(",
    r"(?i)\bfunction\s*\(",
    r"(?i)\bimport\s*\(",
    r"(?i)\brequire\s*\(",
    r"(?i)\bsettimeout\s*\(",
    r"(?i)\bsetinterval\s*\(",
    r"(?i)\bwindow\s*[.\[]",
    r"(?i)\bdocument\s*[.\[]",
    r"=>",
];

static DANGEROUS_CALL_MATCHER: Lazy<RegexSet> =
    Lazy::new(|| RegexSet::new(DANGEROUS_CALLS).expect("dangerous call patterns are valid"));

fn is_forbidden_char(c: char) -> bool {
    matches!(c, '\u{0}'..='\u{8}' | '\u{b}' | '\u{c}' | '\u{e}'..='\u{1f}' | '\u{7f}' | '\u{2028}' | '\u{2029}')
}

fn screen_source(src: &str) -> Result<(), ExprError> {
    if let Some(m) = DANGEROUS_LITERAL_MATCHER.find(src) {
        return Err(ExprError::Security(format!(
            "forbidden pattern `{}`",
            DANGEROUS_LITERALS[m.pattern()]
        )));
    }
    if let Some(idx) = DANGEROUS_CALL_MATCHER.matches(src).into_iter().next() {
        return Err(ExprError::Security(format!(
            "forbidden pattern `{}`",
            DANGEROUS_CALLS[idx].trim_start_matches("(?i)")
        )));
    }
    Ok(())
}

// ── Token ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Number,
    String,
    Boolean,
    Null,
    Operator,
    Dot,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Colon,
    EndOfInput,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Source text, or the unescaped contents for [`TokenKind::String`].
    pub text: String,
    /// 0-based character offset of the token's first character.
    pub position: usize,
}

impl Token {
    fn new(kind: TokenKind, text: impl Into<String>, position: usize) -> Self {
        Token { kind, text: text.into(), position }
    }

    pub fn is_operator(&self, op: &str) -> bool {
        self.kind == TokenKind::Operator && self.text == op
    }
}

// ── Lexer ─────────────────────────────────────────────────────────────────────

pub struct Lexer<'a> {
    src: &'a str,
    chars: Vec<char>,
    pos: usize,
    max_length: usize,
    max_tokens: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Lexer {
            src,
            chars: src.chars().collect(),
            pos: 0,
            max_length: DEFAULT_MAX_LENGTH,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn max_length(mut self, n: usize) -> Self {
        self.max_length = n;
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.max_tokens = n;
        self
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn starts_with(&self, s: &str) -> bool {
        s.chars().enumerate().all(|(i, c)| self.peek_at(i) == Some(c))
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn read_number(&mut self, start: usize) -> Token {
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.peek() == Some('.') && matches!(self.peek_at(1), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let digits_at = if matches!(self.peek_at(1), Some('+' | '-')) { 2 } else { 1 };
            if matches!(self.peek_at(digits_at), Some(c) if c.is_ascii_digit()) {
                self.pos += digits_at;
                while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                    self.pos += 1;
                }
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        Token::new(TokenKind::Number, text, start)
    }

    fn read_string(&mut self, quote: char, start: usize) -> Result<Token, ExprError> {
        let mut s = String::new();
        loop {
            match self.advance() {
                None => return Err(ExprError::lex("unterminated string literal", start)),
                Some('\\') => match self.advance() {
                    Some('n') => s.push('\n'),
                    Some('t') => s.push('\t'),
                    Some('r') => s.push('\r'),
                    Some(c) => s.push(c),
                    None => return Err(ExprError::lex("unterminated string literal", start)),
                },
                Some(c) if c == quote => break,
                Some(c) => s.push(c),
            }
        }
        Ok(Token::new(TokenKind::String, s, start))
    }

    fn read_word(&mut self, start: usize) -> Result<Token, ExprError> {
        while matches!(self.peek(), Some(c) if is_ident_continue(c)) {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        match word.as_str() {
            "true" | "false" => return Ok(Token::new(TokenKind::Boolean, word, start)),
            "null" => return Ok(Token::new(TokenKind::Null, word, start)),
            _ => {}
        }
        if !is_safe_key(&word) || word.to_ascii_lowercase().contains("script") {
            return Err(ExprError::Security(format!("identifier `{word}` is not allowed")));
        }
        Ok(Token::new(TokenKind::Identifier, word, start))
    }

    fn next_token(&mut self) -> Result<Token, ExprError> {
        let start = self.pos;
        let ch = match self.peek() {
            Some(c) => c,
            None => return Ok(Token::new(TokenKind::EndOfInput, "", start)),
        };

        if ch.is_ascii_digit() {
            return Ok(self.read_number(start));
        }
        if ch == '"' || ch == '\'' {
            self.pos += 1;
            return self.read_string(ch, start);
        }
        if is_ident_start(ch) {
            return self.read_word(start);
        }
        if let Some(op) = COMPOUND_OPERATORS.iter().find(|op| self.starts_with(op)) {
            self.pos += op.chars().count();
            return Ok(Token::new(TokenKind::Operator, *op, start));
        }
        if SIMPLE_OPERATORS.contains(&ch) {
            self.pos += 1;
            return Ok(Token::new(TokenKind::Operator, ch.to_string(), start));
        }

        let kind = match ch {
            '.' => TokenKind::Dot,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ':' => TokenKind::Colon,
            c => {
                return Err(ExprError::lex(
                    format!("unexpected character '{c}'\n{}", excerpt(&self.chars, start)),
                    start,
                ))
            }
        };
        self.pos += 1;
        Ok(Token::new(kind, ch.to_string(), start))
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, ExprError> {
        if self.chars.len() > self.max_length {
            return Err(ExprError::lex(
                format!("expression exceeds maximum length of {} characters", self.max_length),
                self.max_length,
            ));
        }
        if let Some(pos) = self.chars.iter().position(|&c| is_forbidden_char(c)) {
            return Err(ExprError::lex(
                format!("forbidden character U+{:04X}", self.chars[pos] as u32),
                pos,
            ));
        }
        screen_source(self.src)?;

        let mut tokens = Vec::new();
        loop {
            self.skip_ws();
            if self.peek().is_none() {
                break;
            }
            if tokens.len() >= self.max_tokens {
                return Err(ExprError::lex(
                    format!("too many tokens (maximum {})", self.max_tokens),
                    self.pos,
                ));
            }
            tokens.push(self.next_token()?);
        }
        tokens.push(Token::new(TokenKind::EndOfInput, "", self.chars.len()));
        Ok(tokens)
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// One line of source around `pos` with a caret under it.
fn excerpt(chars: &[char], pos: usize) -> String {
    let start = pos.saturating_sub(EXCERPT_RADIUS);
    let end = (pos + EXCERPT_RADIUS + 1).min(chars.len());
    let line: String = chars[start..end]
        .iter()
        .map(|&c| if c.is_whitespace() { ' ' } else { c })
        .collect();
    format!("  {line}\n  {}^", " ".repeat(pos - start))
}

/// Tokenize `src` with the default length and token limits.
pub fn tokenize(src: &str) -> Result<Vec<Token>, ExprError> {
    Lexer::new(src).tokenize()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
