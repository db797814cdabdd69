//! Recursive-descent parser
//!
//! One method per precedence level, loosest first: `;` sequences,
//! assignment, `?:`, `|` and `^`, `&`, comparisons, keyword operators,
//! `+ -`, `* / %`, `**`, unary `! - +`, postfix indexing, atoms.
//! Binary levels are left-associative; `**`, `:=` and `?:` associate to
//! the right.

#[cfg(test)]
mod tests;

use crate::ast::{BinOp, CompareFamily, Expr, Literal, Rule, Span, Spanned, UnOp};
use crate::builtins;
use crate::error::{ExceptionId, Result, UserVisibleException};
use crate::keywords;
use crate::lexer::{Keyword, Op, Token, TokenKind};

/// Stack growth parameters for deeply nested rules
const STACK_RED_ZONE: usize = 64 * 1024;
const STACK_GROW_SIZE: usize = 1024 * 1024;

/// Parse a token list into a rule
pub fn parse(tokens: &[Token]) -> Result<Rule> {
    let Some(last) = tokens.last() else {
        return Ok(Rule::empty());
    };
    let mut parser = Parser {
        tokens,
        pos: 0,
        eof: Token {
            kind: TokenKind::Eof,
            span: Span::point(last.span.end),
            line: last.line,
        },
        primed: None,
    };
    parser.rule()
}

type ParseResult = Result<Spanned<Expr>>;

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    /// Returned when peeking past the end
    eof: Token,
    /// An already parsed `name[index]` operand with its start, consumed by
    /// the next `postfix` call in place of an atom
    primed: Option<(Spanned<Expr>, usize)>,
}

impl Parser<'_> {
    // ------------------------------------------------------------------
    // Token access
    // ------------------------------------------------------------------

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        self.tokens.get(self.pos + offset).unwrap_or(&self.eof)
    }

    fn at(&self, kind: &TokenKind) -> bool {
        self.peek().kind == *kind
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        let found = self.at(kind);
        if found {
            self.advance();
        }
        found
    }

    fn expect(&mut self, kind: TokenKind) -> Result<()> {
        if self.eat(&kind) {
            return Ok(());
        }
        let found = self.peek();
        Err(UserVisibleException::new(
            ExceptionId::ExpectedNotFound,
            found.position(),
            vec![kind.to_string(), found.kind.to_string()],
        ))
    }

    fn unexpected(&self) -> UserVisibleException {
        let token = self.peek();
        UserVisibleException::new(
            ExceptionId::UnexpectedToken,
            token.position(),
            vec![token.kind.to_string()],
        )
    }

    /// Start of the expression about to be parsed
    fn expr_start(&self) -> usize {
        match &self.primed {
            Some((_, start)) => *start,
            None => self.peek().position(),
        }
    }

    fn prev_end(&self) -> usize {
        self.tokens[..self.pos].last().map_or(0, |t| t.span.end)
    }

    fn node(&self, expr: Expr, start: usize) -> Spanned<Expr> {
        Spanned::new(expr, Span::new(start, self.prev_end().max(start)))
    }

    // ------------------------------------------------------------------
    // Grammar
    // ------------------------------------------------------------------

    fn rule(&mut self) -> Result<Rule> {
        let body = self.sequence()?;
        let token = self.peek();
        if token.kind != TokenKind::Eof {
            return Err(UserVisibleException::new(
                ExceptionId::UnexpectedAtEnd,
                token.position(),
                vec![token.kind.to_string()],
            ));
        }
        Ok(Rule { body })
    }

    /// Semicolon-separated statements; empty statements are allowed
    fn sequence(&mut self) -> Result<Option<Spanned<Expr>>> {
        let mut stmts = Vec::new();
        loop {
            match self.peek().kind {
                TokenKind::Semicolon => self.advance(),
                TokenKind::Eof
                | TokenKind::RParen
                | TokenKind::Keyword(Keyword::Then | Keyword::Else | Keyword::End) => break,
                _ => {
                    stmts.push(self.assignment()?);
                    if !self.eat(&TokenKind::Semicolon) {
                        break;
                    }
                }
            }
        }

        Ok(match stmts.len() {
            0 => None,
            1 => stmts.pop(),
            _ => {
                let span = stmts[0].span.merge(stmts[stmts.len() - 1].span);
                Some(Spanned::new(Expr::Block(stmts), span))
            }
        })
    }

    fn assignment(&mut self) -> ParseResult {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.assignment_inner())
    }

    fn assignment_inner(&mut self) -> ParseResult {
        let start = self.peek().position();
        let assigns_next = self.peek_at(1).kind == TokenKind::Op(Op::Assign);

        match &self.peek().kind {
            TokenKind::Id(name) => {
                let name = name.to_lowercase();
                if assigns_next {
                    self.check_assignable(&name, start)?;
                    self.advance();
                    self.advance();
                    let value = self.assignment()?;
                    return Ok(self.node(
                        Expr::Assign {
                            name,
                            value: Box::new(value),
                        },
                        start,
                    ));
                }
                if self.peek_at(1).kind == TokenKind::LBracket {
                    return self.array_assignment(name, start);
                }
            }
            TokenKind::Keyword(kw) if assigns_next => {
                return Err(UserVisibleException::new(
                    ExceptionId::OverrideBuiltin,
                    start,
                    vec![kw.to_string()],
                ));
            }
            _ => {}
        }

        self.ternary()
    }

    /// `name[] := v`, `name[i] := v`, or an expression starting with the
    /// index read `name[i]`. The index is parsed once either way.
    fn array_assignment(&mut self, name: String, start: usize) -> ParseResult {
        let name_span = self.peek().span;
        self.advance();
        self.advance();

        if self.at(&TokenKind::RBracket) && self.peek_at(1).kind == TokenKind::Op(Op::Assign) {
            self.check_assignable(&name, start)?;
            self.advance();
            self.advance();
            let value = self.assignment()?;
            return Ok(self.node(
                Expr::Append {
                    name,
                    value: Box::new(value),
                },
                start,
            ));
        }

        let index = self
            .assignment()
            .and_then(|index| self.expect(TokenKind::RBracket).map(|()| index));
        let index = match index {
            Ok(index) => index,
            Err(_) if builtins::is_function(&name) => return Err(use_builtin(name, start)),
            Err(err) => return Err(err),
        };

        if self.eat(&TokenKind::Op(Op::Assign)) {
            self.check_assignable(&name, start)?;
            let value = self.assignment()?;
            return Ok(self.node(
                Expr::IndexAssign {
                    name,
                    index: Box::new(index),
                    value: Box::new(value),
                },
                start,
            ));
        }

        if builtins::is_function(&name) {
            return Err(use_builtin(name, start));
        }
        let base = Spanned::new(Expr::Var(name), name_span);
        let read = self.node(
            Expr::Index {
                base: Box::new(base),
                index: Box::new(index),
            },
            start,
        );
        self.primed = Some((read, start));
        self.ternary()
    }

    fn check_assignable(&self, name: &str, pos: usize) -> Result<()> {
        if builtins::is_function(name) || keywords::is_builtin_var(name) {
            return Err(UserVisibleException::new(
                ExceptionId::OverrideBuiltin,
                pos,
                vec![name.to_string()],
            ));
        }
        Ok(())
    }

    fn ternary(&mut self) -> ParseResult {
        let start = self.expr_start();
        let cond = self.or_level()?;
        if !self.eat(&TokenKind::Op(Op::Question)) {
            return Ok(cond);
        }
        let then_branch = self.assignment()?;
        self.expect(TokenKind::Op(Op::Colon))?;
        let else_branch = self.assignment()?;
        Ok(self.node(
            Expr::If {
                cond: Box::new(cond),
                then_branch: Box::new(then_branch),
                else_branch: Some(Box::new(else_branch)),
            },
            start,
        ))
    }

    /// Left-associative loop over one precedence level
    fn binary_level(
        &mut self,
        operator: fn(&TokenKind) -> Option<BinOp>,
        next: fn(&mut Self) -> ParseResult,
    ) -> ParseResult {
        let start = self.expr_start();
        let mut left = next(self)?;
        while let Some(op) = operator(&self.peek().kind) {
            self.advance();
            let right = next(self)?;
            left = self.node(
                Expr::Binary {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                start,
            );
        }
        Ok(left)
    }

    fn or_level(&mut self) -> ParseResult {
        self.binary_level(
            |kind| match kind {
                TokenKind::Op(Op::Or) => Some(BinOp::Or),
                TokenKind::Op(Op::Xor) => Some(BinOp::Xor),
                _ => None,
            },
            Self::and_level,
        )
    }

    fn and_level(&mut self) -> ParseResult {
        self.binary_level(
            |kind| match kind {
                TokenKind::Op(Op::And) => Some(BinOp::And),
                _ => None,
            },
            Self::comparison,
        )
    }

    /// A chain may hold at most one equality and one ordering operator
    fn comparison(&mut self) -> ParseResult {
        let start = self.expr_start();
        let mut left = self.keyword_level()?;
        let mut seen: Vec<CompareFamily> = Vec::new();

        while let Some(op) = comparison_op(&self.peek().kind) {
            let Some(family) = op.compare_family() else {
                break;
            };
            if seen.contains(&family) {
                return Err(self.unexpected());
            }
            seen.push(family);
            self.advance();
            let right = self.keyword_level()?;
            left = self.node(
                Expr::Binary {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                start,
            );
        }
        Ok(left)
    }

    fn keyword_level(&mut self) -> ParseResult {
        self.binary_level(
            |kind| match kind {
                TokenKind::Keyword(Keyword::In) => Some(BinOp::In),
                TokenKind::Keyword(Keyword::Contains) => Some(BinOp::Contains),
                TokenKind::Keyword(Keyword::Like | Keyword::Matches) => Some(BinOp::Like),
                TokenKind::Keyword(Keyword::Rlike | Keyword::Regex) => Some(BinOp::Rlike),
                TokenKind::Keyword(Keyword::Irlike) => Some(BinOp::Irlike),
                _ => None,
            },
            Self::additive,
        )
    }

    fn additive(&mut self) -> ParseResult {
        self.binary_level(
            |kind| match kind {
                TokenKind::Op(Op::Add) => Some(BinOp::Add),
                TokenKind::Op(Op::Sub) => Some(BinOp::Sub),
                _ => None,
            },
            Self::multiplicative,
        )
    }

    fn multiplicative(&mut self) -> ParseResult {
        self.binary_level(
            |kind| match kind {
                TokenKind::Op(Op::Mul) => Some(BinOp::Mul),
                TokenKind::Op(Op::Div) => Some(BinOp::Div),
                TokenKind::Op(Op::Mod) => Some(BinOp::Mod),
                _ => None,
            },
            Self::power,
        )
    }

    fn power(&mut self) -> ParseResult {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || {
            let start = self.expr_start();
            let base = self.unary()?;
            if !self.eat(&TokenKind::Op(Op::Pow)) {
                return Ok(base);
            }
            let exponent = self.power()?;
            Ok(self.node(
                Expr::Binary {
                    left: Box::new(base),
                    op: BinOp::Pow,
                    right: Box::new(exponent),
                },
                start,
            ))
        })
    }

    fn unary(&mut self) -> ParseResult {
        if self.primed.is_some() {
            return self.postfix();
        }
        let op = match self.peek().kind {
            TokenKind::Op(Op::Not) => UnOp::Not,
            TokenKind::Op(Op::Sub) => UnOp::Neg,
            TokenKind::Op(Op::Add) => UnOp::Plus,
            _ => return self.postfix(),
        };
        let start = self.peek().position();
        self.advance();
        let operand = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.unary())?;
        Ok(self.node(
            Expr::Unary {
                op,
                expr: Box::new(operand),
            },
            start,
        ))
    }

    fn postfix(&mut self) -> ParseResult {
        let (mut expr, start) = match self.primed.take() {
            Some(primed) => primed,
            None => {
                let start = self.peek().position();
                (self.atom()?, start)
            }
        };
        while self.eat(&TokenKind::LBracket) {
            let index = self.assignment()?;
            self.expect(TokenKind::RBracket)?;
            expr = self.node(
                Expr::Index {
                    base: Box::new(expr),
                    index: Box::new(index),
                },
                start,
            );
        }
        Ok(expr)
    }

    fn atom(&mut self) -> ParseResult {
        let token = self.peek().clone();
        let start = token.position();
        let literal = match token.kind {
            TokenKind::Int(n) => Literal::Int(n),
            TokenKind::Float(f) => Literal::Float(f),
            TokenKind::Str(s) => Literal::Str(s),
            TokenKind::Keyword(Keyword::True) => Literal::Bool(true),
            TokenKind::Keyword(Keyword::False) => Literal::Bool(false),
            TokenKind::Keyword(Keyword::Null) => Literal::Null,
            TokenKind::Keyword(Keyword::If) => return self.if_expr(start),
            TokenKind::Keyword(kw) => {
                return Err(UserVisibleException::new(
                    ExceptionId::UnrecognisedKeyword,
                    start,
                    vec![kw.to_string()],
                ));
            }
            TokenKind::Id(name) => {
                self.advance();
                return self.identifier(name.to_lowercase(), start);
            }
            TokenKind::LParen => return self.group(start),
            TokenKind::LBracket => return self.array_literal(start),
            _ => return Err(self.unexpected()),
        };
        self.advance();
        Ok(self.node(Expr::Literal(literal), start))
    }

    fn identifier(&mut self, name: String, start: usize) -> ParseResult {
        if self.at(&TokenKind::LParen) {
            return self.call(name, start);
        }
        if builtins::is_function(&name) {
            return Err(use_builtin(name, start));
        }
        Ok(self.node(Expr::Var(name), start))
    }

    fn group(&mut self, start: usize) -> ParseResult {
        self.advance();
        let Some(inner) = self.sequence()? else {
            return Err(self.unexpected());
        };
        self.expect(TokenKind::RParen)?;
        Ok(self.node(Expr::Group(Box::new(inner)), start))
    }

    /// `[a, b, c]`, trailing comma allowed
    fn array_literal(&mut self, start: usize) -> ParseResult {
        self.advance();
        let mut items = Vec::new();
        while !self.eat(&TokenKind::RBracket) {
            items.push(self.assignment()?);
            if !self.eat(&TokenKind::Comma) {
                self.expect(TokenKind::RBracket)?;
                break;
            }
        }
        Ok(self.node(Expr::Array(items), start))
    }

    /// Arguments of a call whose name has been consumed. A trailing comma
    /// is only accepted by variadic functions.
    fn call(&mut self, name: String, start: usize) -> ParseResult {
        let function = builtins::lookup(&name).ok_or_else(|| {
            UserVisibleException::new(ExceptionId::UnknownFunction, start, vec![name.clone()])
        })?;
        self.advance();

        let mut args = Vec::new();
        if !self.eat(&TokenKind::RParen) {
            loop {
                args.push(self.assignment()?);
                if !self.eat(&TokenKind::Comma) {
                    self.expect(TokenKind::RParen)?;
                    break;
                }
                if self.at(&TokenKind::RParen) {
                    if !function.is_variadic() {
                        return Err(self.unexpected());
                    }
                    self.advance();
                    break;
                }
            }
        }

        function.check_arity(args.len(), start)?;
        if builtins::SETTERS.contains(&function.name) {
            return self.setter(args, start);
        }
        Ok(self.node(Expr::Call { func: name, args }, start))
    }

    /// `set("name", value)` becomes `name := value`
    fn setter(&self, args: Vec<Spanned<Expr>>, start: usize) -> ParseResult {
        let [target, value]: [Spanned<Expr>; 2] = args
            .try_into()
            .map_err(|_| UserVisibleException::at(ExceptionId::NotEnoughArgs, start))?;
        let Expr::Literal(Literal::Str(name)) = target.node else {
            return Err(UserVisibleException::at(
                ExceptionId::VariableVariable,
                target.span.start,
            ));
        };
        let name = name.to_lowercase();
        self.check_assignable(&name, target.span.start)?;
        Ok(self.node(
            Expr::Assign {
                name,
                value: Box::new(value),
            },
            start,
        ))
    }

    fn if_expr(&mut self, start: usize) -> ParseResult {
        self.advance();
        let cond = self.assignment()?;
        self.expect(TokenKind::Keyword(Keyword::Then))?;
        let then_branch = self.branch()?;
        let else_branch = if self.eat(&TokenKind::Keyword(Keyword::Else)) {
            Some(Box::new(self.branch()?))
        } else {
            None
        };
        self.expect(TokenKind::Keyword(Keyword::End))?;
        Ok(self.node(
            Expr::If {
                cond: Box::new(cond),
                then_branch: Box::new(then_branch),
                else_branch,
            },
            start,
        ))
    }

    fn branch(&mut self) -> ParseResult {
        match self.sequence()? {
            Some(body) => Ok(body),
            None => Err(self.unexpected()),
        }
    }
}

fn comparison_op(kind: &TokenKind) -> Option<BinOp> {
    let TokenKind::Op(op) = kind else {
        return None;
    };
    Some(match op {
        Op::Eq | Op::EqEq => BinOp::Eq,
        Op::StrictEq => BinOp::StrictEq,
        Op::Ne => BinOp::Ne,
        Op::StrictNe => BinOp::StrictNe,
        Op::Lt => BinOp::Lt,
        Op::Gt => BinOp::Gt,
        Op::Le => BinOp::Le,
        Op::Ge => BinOp::Ge,
        _ => return None,
    })
}

fn use_builtin(name: String, pos: usize) -> UserVisibleException {
    UserVisibleException::new(ExceptionId::UseBuiltin, pos, vec![name])
}
