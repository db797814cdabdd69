//! Token definitions
//!
//! [`OPERATORS`] and [`KEYWORDS`] are the only places operator and keyword
//! spellings are written down. The lexer matches against them and
//! [`operator_pattern`] is generated from them.

use crate::ast::Span;
use logos::{FilterResult, Lexer, Logos};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Operator tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Op {
    StrictEq,
    StrictNe,
    Ne,
    Not,
    Pow,
    Mul,
    Div,
    Add,
    Sub,
    Mod,
    And,
    Or,
    Xor,
    Assign,
    Question,
    Colon,
    Le,
    Lt,
    Ge,
    Gt,
    EqEq,
    Eq,
}

/// Operator spellings, longest first. A shorter operator never precedes a
/// longer one it is a prefix of.
pub const OPERATORS: &[(&str, Op)] = &[
    ("===", Op::StrictEq),
    ("!==", Op::StrictNe),
    ("!=", Op::Ne),
    ("**", Op::Pow),
    (":=", Op::Assign),
    ("<=", Op::Le),
    (">=", Op::Ge),
    ("==", Op::EqEq),
    ("!", Op::Not),
    ("*", Op::Mul),
    ("/", Op::Div),
    ("+", Op::Add),
    ("-", Op::Sub),
    ("%", Op::Mod),
    ("&", Op::And),
    ("|", Op::Or),
    ("^", Op::Xor),
    ("?", Op::Question),
    (":", Op::Colon),
    ("<", Op::Lt),
    (">", Op::Gt),
    ("=", Op::Eq),
];

impl Op {
    pub fn as_str(self) -> &'static str {
        OPERATORS
            .iter()
            .find(|(_, op)| *op == self)
            .map_or("?", |(text, _)| text)
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Regex alternation matching exactly the operator set, longest first
pub fn operator_pattern() -> String {
    OPERATORS
        .iter()
        .map(|(text, _)| regex::escape(text))
        .collect::<Vec<_>>()
        .join("|")
}

/// Reserved words. Matched case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Keyword {
    In,
    Like,
    Matches,
    Contains,
    Rlike,
    Irlike,
    Regex,
    If,
    Then,
    Else,
    End,
    True,
    False,
    Null,
}

pub const KEYWORDS: &[(&str, Keyword)] = &[
    ("in", Keyword::In),
    ("like", Keyword::Like),
    ("matches", Keyword::Matches),
    ("contains", Keyword::Contains),
    ("rlike", Keyword::Rlike),
    ("irlike", Keyword::Irlike),
    ("regex", Keyword::Regex),
    ("if", Keyword::If),
    ("then", Keyword::Then),
    ("else", Keyword::Else),
    ("end", Keyword::End),
    ("true", Keyword::True),
    ("false", Keyword::False),
    ("null", Keyword::Null),
];

impl Keyword {
    pub fn lookup(word: &str) -> Option<Keyword> {
        let lower = word.to_ascii_lowercase();
        KEYWORDS
            .iter()
            .find(|(text, _)| *text == lower)
            .map(|(_, kw)| *kw)
    }

    pub fn as_str(self) -> &'static str {
        KEYWORDS
            .iter()
            .find(|(_, kw)| *kw == self)
            .map_or("?", |(text, _)| text)
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of a token handed to the parser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TokenKind {
    Id(String),
    Keyword(Keyword),
    Op(Op),
    Comma,
    Semicolon,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Str(String),
    Float(f64),
    Int(i64),
    /// End of input; always the last token
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Id(name) => write!(f, "{name}"),
            TokenKind::Keyword(kw) => write!(f, "{kw}"),
            TokenKind::Op(op) => write!(f, "{op}"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Semicolon => write!(f, ";"),
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::LBracket => write!(f, "["),
            TokenKind::RBracket => write!(f, "]"),
            TokenKind::Str(s) => write!(f, "\"{s}\""),
            TokenKind::Float(n) => write!(f, "{n}"),
            TokenKind::Int(n) => write!(f, "{n}"),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}

/// A token with its position in the source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    /// Character offsets
    pub span: Span,
    /// 1-based line number
    pub line: usize,
}

impl Token {
    pub fn position(&self) -> usize {
        self.span.start
    }
}

/// Lexer failure categories; positions are attached by `tokenize`
#[derive(Debug, Clone, Default, PartialEq)]
pub enum LexError {
    #[default]
    UnrecognisedToken,
    UnclosedComment,
    UnclosedString,
}

/// Raw lexemes recognised by logos, before keyword resolution
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(error = LexError)]
#[logos(skip r"[ \t\n\r\f]+")]
pub(crate) enum Lexeme {
    #[token("/*", block_comment)]
    Comment,

    #[token("\"", |lex| string_literal(lex, '"'))]
    #[token("'", |lex| string_literal(lex, '\''))]
    Str(String),

    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?|\.[0-9]+([eE][+-]?[0-9]+)?|[0-9]+[eE][+-]?[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),

    #[regex(r"0[xX][0-9a-fA-F]+", |lex| int_literal(&lex.slice()[2..], 16))]
    #[regex(r"0[oO][0-7]+", |lex| int_literal(&lex.slice()[2..], 8))]
    #[regex(r"0[bB][01]+", |lex| int_literal(&lex.slice()[2..], 2))]
    #[regex(r"[0-9]+", |lex| int_literal(lex.slice(), 10))]
    Int(IntLiteral),

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Word(String),

    #[regex(r"[!*/+\-%&|^?:<>=]", operator)]
    Op(Op),

    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
}

/// Integer literal as written; values outside `i64` become floats
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum IntLiteral {
    Exact(i64),
    Overflowed(f64),
}

fn int_literal(digits: &str, radix: u32) -> IntLiteral {
    if let Ok(n) = i64::from_str_radix(digits, radix) {
        return IntLiteral::Exact(n);
    }
    if radix == 10 {
        if let Ok(f) = digits.parse::<f64>() {
            return IntLiteral::Overflowed(f);
        }
    }
    let value = digits.chars().fold(0.0, |acc, c| {
        acc * f64::from(radix) + f64::from(c.to_digit(radix).unwrap_or(0))
    });
    IntLiteral::Overflowed(value)
}

/// Longest-match operator lookup starting at the single character logos
/// matched; consumes the rest of the operator from the remainder.
fn operator(lex: &mut Lexer<Lexeme>) -> Option<Op> {
    let first = lex.slice();
    let rest = lex.remainder();
    for (text, op) in OPERATORS {
        if let Some(tail) = text.strip_prefix(first) {
            if rest.starts_with(tail) {
                lex.bump(tail.len());
                return Some(*op);
            }
        }
    }
    None
}

fn block_comment(lex: &mut Lexer<Lexeme>) -> FilterResult<(), LexError> {
    match lex.remainder().find("*/") {
        Some(end) => {
            lex.bump(end + 2);
            FilterResult::Skip
        }
        None => FilterResult::Error(LexError::UnclosedComment),
    }
}

fn string_literal(lex: &mut Lexer<Lexeme>, quote: char) -> Result<String, LexError> {
    let rest = lex.remainder();
    let mut value = String::new();
    let mut chars = rest.char_indices();

    while let Some((i, c)) = chars.next() {
        if c == quote {
            lex.bump(i + c.len_utf8());
            return Ok(value);
        }
        if c != '\\' {
            value.push(c);
            continue;
        }
        let Some((_, escaped)) = chars.next() else {
            break;
        };
        match escaped {
            'n' => value.push('\n'),
            'r' => value.push('\r'),
            't' => value.push('\t'),
            '\\' | '"' | '\'' => value.push(escaped),
            'x' => push_code_point(&mut value, &mut chars, 2, escaped),
            'u' => push_code_point(&mut value, &mut chars, 4, escaped),
            other => {
                value.push('\\');
                value.push(other);
            }
        }
    }

    Err(LexError::UnclosedString)
}

/// `\xHH` / `\uHHHH`. Malformed sequences are kept literally.
fn push_code_point(
    value: &mut String,
    chars: &mut std::str::CharIndices<'_>,
    digits: usize,
    marker: char,
) {
    let lookahead = chars.clone();
    let hex: String = lookahead.map(|(_, c)| c).take(digits).collect();
    let decoded = (hex.len() == digits && hex.chars().all(|c| c.is_ascii_hexdigit()))
        .then(|| u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32))
        .flatten();
    match decoded {
        Some(c) => {
            value.push(c);
            for _ in 0..digits {
                chars.next();
            }
        }
        None => {
            value.push('\\');
            value.push(marker);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operators_longest_first() {
        for (i, (text, _)) in OPERATORS.iter().enumerate() {
            for (later, _) in &OPERATORS[i + 1..] {
                assert!(
                    !later.starts_with(text) || later == text,
                    "`{later}` is shadowed by earlier `{text}`"
                );
            }
        }
    }

    #[test]
    fn test_operator_spellings_unique() {
        for (i, (a, op_a)) in OPERATORS.iter().enumerate() {
            for (b, op_b) in &OPERATORS[i + 1..] {
                assert_ne!(a, b);
                assert_ne!(op_a, op_b);
            }
        }
    }

    #[test]
    fn test_operator_pattern_matches_every_operator_whole() {
        let re = regex::Regex::new(&format!("^(?:{})", operator_pattern())).unwrap();
        for (text, _) in OPERATORS {
            let found = re.find(text).map(|m| m.as_str());
            assert_eq!(found, Some(*text));
        }
    }

    #[test]
    fn test_op_display_uses_table() {
        assert_eq!(Op::StrictEq.to_string(), "===");
        assert_eq!(Op::Assign.to_string(), ":=");
        assert_eq!(Op::Eq.to_string(), "=");
    }

    #[test]
    fn test_keyword_lookup_is_case_insensitive() {
        assert_eq!(Keyword::lookup("THEN"), Some(Keyword::Then));
        assert_eq!(Keyword::lookup("Irlike"), Some(Keyword::Irlike));
        assert_eq!(Keyword::lookup("lcase"), None);
    }

    #[test]
    fn test_token_kind_display() {
        assert_eq!(TokenKind::Keyword(Keyword::End).to_string(), "end");
        assert_eq!(TokenKind::Str("a".into()).to_string(), "\"a\"");
        assert_eq!(TokenKind::Eof.to_string(), "end of input");
    }
}
