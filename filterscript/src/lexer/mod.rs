//! Lexer implementation using logos

mod cache;
mod token;

pub use cache::{cache_key, MemoryTokenCache, TokenCache};
pub use token::{operator_pattern, Keyword, Op, Token, TokenKind, KEYWORDS, OPERATORS};

use crate::ast::Span;
use crate::error::{ExceptionId, Result, UserVisibleException};
use logos::Logos;
use token::{IntLiteral, LexError, Lexeme};

/// Tokenize rule source. The returned list always ends with an `Eof` token.
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut lexer = Lexeme::lexer(source);
    let mut cursor = Cursor::new(source);

    while let Some(result) = lexer.next() {
        let range = lexer.span();
        let (start, line) = cursor.advance_to(range.start);
        let (end, _) = cursor.advance_to(range.end);

        let kind = match result {
            Ok(lexeme) => resolve(lexeme),
            Err(err) => {
                let (id, params) = match err {
                    LexError::UnrecognisedToken => {
                        (ExceptionId::UnrecognisedToken, vec![lexer.slice().to_string()])
                    }
                    LexError::UnclosedComment => (ExceptionId::UnclosedComment, Vec::new()),
                    LexError::UnclosedString => (ExceptionId::UnclosedString, Vec::new()),
                };
                return Err(UserVisibleException::new(id, start, params));
            }
        };

        tokens.push(Token {
            kind,
            span: Span::new(start, end),
            line,
        });
    }

    let (end, line) = cursor.advance_to(source.len());
    tokens.push(Token {
        kind: TokenKind::Eof,
        span: Span::point(end),
        line,
    });

    Ok(tokens)
}

/// Tokenize through an optional cache. The flag is true when the tokens
/// came from the cache.
pub fn tokenize_cached(source: &str, cache: Option<&dyn TokenCache>) -> Result<(Vec<Token>, bool)> {
    let Some(cache) = cache else {
        return tokenize(source).map(|tokens| (tokens, false));
    };

    let key = cache_key(source);
    if let Some(tokens) = cache.get(&key) {
        tracing::trace!(%key, "token cache hit");
        return Ok((tokens, true));
    }

    tracing::trace!(%key, "token cache miss");
    let tokens = tokenize(source)?;
    cache.set(&key, tokens.clone());
    Ok((tokens, false))
}

fn resolve(lexeme: Lexeme) -> TokenKind {
    match lexeme {
        Lexeme::Word(word) => match Keyword::lookup(&word) {
            Some(kw) => TokenKind::Keyword(kw),
            None => TokenKind::Id(word),
        },
        Lexeme::Str(s) => TokenKind::Str(s),
        Lexeme::Float(n) => TokenKind::Float(n),
        Lexeme::Int(IntLiteral::Exact(n)) => TokenKind::Int(n),
        Lexeme::Int(IntLiteral::Overflowed(n)) => TokenKind::Float(n),
        Lexeme::Op(op) => TokenKind::Op(op),
        Lexeme::Comma => TokenKind::Comma,
        Lexeme::Semicolon => TokenKind::Semicolon,
        Lexeme::LParen => TokenKind::LParen,
        Lexeme::RParen => TokenKind::RParen,
        Lexeme::LBracket => TokenKind::LBracket,
        Lexeme::RBracket => TokenKind::RBracket,
        // Comments are always skipped by their callback
        Lexeme::Comment => TokenKind::Eof,
    }
}

/// Converts monotonically increasing byte offsets into character offsets
/// and line numbers.
struct Cursor<'a> {
    source: &'a str,
    byte: usize,
    chars: usize,
    line: usize,
}

impl<'a> Cursor<'a> {
    fn new(source: &'a str) -> Self {
        Cursor {
            source,
            byte: 0,
            chars: 0,
            line: 1,
        }
    }

    fn advance_to(&mut self, byte: usize) -> (usize, usize) {
        if byte > self.byte {
            let skipped = &self.source[self.byte..byte];
            self.chars += skipped.chars().count();
            self.line += skipped.matches('\n').count();
            self.byte = byte;
        }
        (self.chars, self.line)
    }
}
