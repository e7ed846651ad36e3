//! Expression grammar.
//!
//! Precedence climbing over [`BinaryOp::precedence`], with ranges slotted in
//! between comparison and additive operators:
//!
//! ```text
//! ||  <  &&  <  == !=  <  < <= > >= gt gte lt lte  <  .. ..<  <  + -  <  * / %
//! ```
//!
//! Unary `! - +` bind tighter than every binary operator; postfix forms
//! (`.name`, `[key]`, `(args)`, `?builtin`, `??`, `!default`) bind tightest.

use std::sync::Arc;

use quill_ir::{BinaryOp, Expr, ExprKind, Name, Span, StringInterner, UnaryOp};
use quill_stack::ensure_sufficient_stack;

use crate::error::{self, ParseResult};
use crate::lexer::{cook_string, raw_string, Lexed, Token, TokenCursor};

const RANGE_PRECEDENCE: u8 = 5;

/// How a directive or call tag was closed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum TagEnd {
    /// `]`: a body follows.
    Open,
    /// `/]`: no body.
    SelfClosed,
}

/// Parses the inside of one tag (`${...}`, `[#...]`, `[@...]`).
pub(crate) struct TagParser<'a, 'src> {
    pub(crate) cursor: TokenCursor<'src>,
    interner: &'a StringInterner,
}

impl<'a, 'src> TagParser<'a, 'src> {
    pub(crate) fn new(source: &'src str, offset: usize, interner: &'a StringInterner) -> Self {
        TagParser {
            cursor: TokenCursor::new(source, offset),
            interner,
        }
    }

    pub(crate) fn intern(&self, text: &str) -> Name {
        self.interner.intern(text)
    }

    pub(crate) fn expect(&mut self, token: Token, what: &str) -> ParseResult<Lexed> {
        let next = self.cursor.peek();
        if next.token == token {
            Ok(self.cursor.next())
        } else {
            Err(error::unexpected(next, what))
        }
    }

    pub(crate) fn ident(&mut self, what: &str) -> ParseResult<(Name, Span)> {
        let lexed = self.expect(Token::Ident, what)?;
        let name = self.intern(self.cursor.slice(lexed.span));
        Ok((name, lexed.span))
    }

    /// True if the next token is the identifier `keyword`.
    pub(crate) fn at_keyword(&mut self, keyword: &str) -> bool {
        let next = self.cursor.peek();
        next.token == Token::Ident && self.cursor.slice(next.span) == keyword
    }

    pub(crate) fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.at_keyword(keyword) {
            self.cursor.next();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect_keyword(&mut self, keyword: &str) -> ParseResult<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            let next = self.cursor.peek();
            Err(error::unexpected(next, &format!("`{keyword}`")))
        }
    }

    pub(crate) fn at_tag_end(&mut self) -> bool {
        matches!(
            self.cursor.peek().token,
            Token::RBracket | Token::SelfClose
        )
    }

    /// Consume `]` or `/]`.
    pub(crate) fn close_tag(&mut self) -> ParseResult<TagEnd> {
        let next = self.cursor.peek();
        match next.token {
            Token::RBracket => {
                self.cursor.next();
                Ok(TagEnd::Open)
            }
            Token::SelfClose => {
                self.cursor.next();
                Ok(TagEnd::SelfClosed)
            }
            _ => Err(error::unexpected(next, "`]` or `/]`")),
        }
    }

    /// Expressions separated by optional commas, up to the tag end or `stop`.
    pub(crate) fn expr_list_until(&mut self, stop: Option<Token>) -> ParseResult<Vec<Expr>> {
        let mut items = Vec::new();
        loop {
            let next = self.cursor.peek().token;
            if self.at_tag_end() || Some(next) == stop {
                return Ok(items);
            }
            items.push(self.expr()?);
            self.cursor.eat(Token::Comma);
        }
    }

    pub(crate) fn expr(&mut self) -> ParseResult<Expr> {
        ensure_sufficient_stack(|| self.binary(0))
    }

    fn binary_op(&mut self, lexed: Lexed) -> Option<BinaryOp> {
        Some(match lexed.token {
            Token::OrOr => BinaryOp::Or,
            Token::AndAnd => BinaryOp::And,
            Token::EqEq => BinaryOp::Eq,
            Token::NotEq => BinaryOp::NotEq,
            Token::Lt => BinaryOp::Lt,
            Token::LtEq => BinaryOp::LtEq,
            Token::Gt => BinaryOp::Gt,
            Token::GtEq => BinaryOp::GtEq,
            Token::Plus => BinaryOp::Add,
            Token::Minus => BinaryOp::Sub,
            Token::Star => BinaryOp::Mul,
            Token::Slash => BinaryOp::Div,
            Token::Percent => BinaryOp::Mod,
            Token::Ident => match self.cursor.slice(lexed.span) {
                "gt" => BinaryOp::Gt,
                "gte" => BinaryOp::GtEq,
                "lt" => BinaryOp::Lt,
                "lte" => BinaryOp::LtEq,
                _ => return None,
            },
            _ => return None,
        })
    }

    fn binary(&mut self, min_precedence: u8) -> ParseResult<Expr> {
        let mut left = self.unary()?;
        loop {
            let next = self.cursor.peek();
            if matches!(next.token, Token::DotDot | Token::DotDotLt) {
                if RANGE_PRECEDENCE < min_precedence {
                    break;
                }
                self.cursor.next();
                let inclusive = next.token == Token::DotDot;
                let upcoming = self.cursor.peek().token;
                let end = if upcoming.starts_operand() || upcoming == Token::Minus {
                    Some(Box::new(self.binary(RANGE_PRECEDENCE + 1)?))
                } else {
                    None
                };
                let span = left.span.merge(end.as_ref().map_or(next.span, |e| e.span));
                left = Expr::new(
                    ExprKind::Range {
                        start: Box::new(left),
                        end,
                        inclusive,
                    },
                    span,
                );
                continue;
            }
            let Some(op) = self.binary_op(next) else {
                break;
            };
            let precedence = op.precedence();
            if precedence < min_precedence {
                break;
            }
            self.cursor.next();
            let right = self.binary(precedence + 1)?;
            let span = left.span.merge(right.span);
            left = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }
        Ok(left)
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        let next = self.cursor.peek();
        let op = match next.token {
            Token::Bang => UnaryOp::Not,
            Token::Minus => UnaryOp::Neg,
            Token::Plus => UnaryOp::Plus,
            _ => return self.postfix(),
        };
        self.cursor.next();
        let operand = ensure_sufficient_stack(|| self.unary())?;
        let span = next.span.merge(operand.span);
        Ok(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    fn postfix(&mut self) -> ParseResult<Expr> {
        let mut expr = self.primary()?;
        loop {
            let next = self.cursor.peek();
            expr = match next.token {
                Token::Dot => {
                    self.cursor.next();
                    let (name, name_span) = self.member_name()?;
                    let span = expr.span.merge(name_span);
                    Expr::new(
                        ExprKind::Member {
                            target: Box::new(expr),
                            name,
                        },
                        span,
                    )
                }
                Token::LBracket => {
                    self.cursor.next();
                    let key = self.expr()?;
                    let close = self.expect(Token::RBracket, "`]`")?;
                    let span = expr.span.merge(close.span);
                    Expr::new(
                        ExprKind::Index {
                            target: Box::new(expr),
                            key: Box::new(key),
                        },
                        span,
                    )
                }
                Token::LParen => {
                    self.cursor.next();
                    let (args, close) = self.call_args()?;
                    let span = expr.span.merge(close);
                    Expr::new(
                        ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                        span,
                    )
                }
                Token::Question => {
                    self.cursor.next();
                    let (name, mut span) = self.ident("a builtin name")?;
                    let args = if self.cursor.eat(Token::LParen).is_some() {
                        let (args, close) = self.call_args()?;
                        span = span.merge(close);
                        Some(args)
                    } else {
                        None
                    };
                    let span = expr.span.merge(span);
                    Expr::new(
                        ExprKind::Builtin {
                            target: Box::new(expr),
                            name,
                            builtin: None,
                            args,
                        },
                        span,
                    )
                }
                Token::DoubleQuestion => {
                    self.cursor.next();
                    let span = expr.span.merge(next.span);
                    Expr::new(ExprKind::Exists(Box::new(expr)), span)
                }
                Token::Bang => {
                    self.cursor.next();
                    let fallback = if self.cursor.peek().token.starts_operand() {
                        Some(Box::new(ensure_sufficient_stack(|| self.postfix())?))
                    } else {
                        None
                    };
                    let span = expr
                        .span
                        .merge(fallback.as_ref().map_or(next.span, |f| f.span));
                    Expr::new(
                        ExprKind::Default {
                            value: Box::new(expr),
                            fallback,
                        },
                        span,
                    )
                }
                _ => return Ok(expr),
            };
        }
    }

    /// Member names may be keywords (`x.true` is unusual but legal).
    fn member_name(&mut self) -> ParseResult<(Name, Span)> {
        let next = self.cursor.peek();
        match next.token {
            Token::Ident | Token::True | Token::False => {
                self.cursor.next();
                Ok((self.intern(self.cursor.slice(next.span)), next.span))
            }
            _ => Err(error::unexpected(next, "a member name")),
        }
    }

    /// Arguments after `(`, through the closing `)`.
    fn call_args(&mut self) -> ParseResult<(Vec<Expr>, Span)> {
        let mut args = Vec::new();
        loop {
            if let Some(close) = self.cursor.eat(Token::RParen) {
                return Ok((args, close.span));
            }
            args.push(self.expr()?);
            if self.cursor.eat(Token::Comma).is_none() {
                let close = self.expect(Token::RParen, "`,` or `)`")?;
                return Ok((args, close.span));
            }
        }
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        let next = self.cursor.next();
        let span = next.span;
        let kind = match next.token {
            Token::Str => {
                let literal = self.cursor.slice(span);
                let cooked = cook_string(literal).map_err(|offset| {
                    let at = span.start + u32::try_from(offset).unwrap_or(0);
                    error::invalid_escape(Span::new(at, at.saturating_add(2).min(span.end)))
                })?;
                ExprKind::Str(Arc::from(cooked))
            }
            Token::RawStr => ExprKind::Str(Arc::from(raw_string(self.cursor.slice(span)))),
            Token::Int => {
                let value = self
                    .cursor
                    .slice(span)
                    .parse::<i64>()
                    .map_err(|_| error::invalid_number(span))?;
                ExprKind::Int(value)
            }
            Token::Float => {
                let value = self
                    .cursor
                    .slice(span)
                    .parse::<f64>()
                    .map_err(|_| error::invalid_number(span))?;
                ExprKind::Float(value)
            }
            Token::True => ExprKind::Bool(true),
            Token::False => ExprKind::Bool(false),
            Token::Ident => ExprKind::Ident(self.intern(self.cursor.slice(span))),
            Token::Dot => {
                let (name, name_span) = self.ident("a special variable name")?;
                return Ok(Expr::new(ExprKind::Special(name), span.merge(name_span)));
            }
            Token::LParen => {
                let inner = self.expr()?;
                let close = self.expect(Token::RParen, "`)`")?;
                return Ok(Expr::new(inner.kind, span.merge(close.span)));
            }
            Token::LBracket => {
                let mut items = Vec::new();
                let close = loop {
                    if let Some(close) = self.cursor.eat(Token::RBracket) {
                        break close;
                    }
                    items.push(self.expr()?);
                    if self.cursor.eat(Token::Comma).is_none() {
                        break self.expect(Token::RBracket, "`,` or `]`")?;
                    }
                };
                return Ok(Expr::new(ExprKind::Sequence(items), span.merge(close.span)));
            }
            Token::LBrace => {
                let mut entries = Vec::new();
                let close = loop {
                    if let Some(close) = self.cursor.eat(Token::RBrace) {
                        break close;
                    }
                    let key = self.expr()?;
                    self.expect(Token::Colon, "`:`")?;
                    let value = self.expr()?;
                    entries.push((key, value));
                    if self.cursor.eat(Token::Comma).is_none() {
                        break self.expect(Token::RBrace, "`,` or `}`")?;
                    }
                };
                return Ok(Expr::new(ExprKind::Hash(entries), span.merge(close.span)));
            }
            Token::Invalid if self.cursor.slice(span).starts_with(['"', '\'']) => {
                return Err(error::unterminated_string(span));
            }
            _ => return Err(error::expected_expression(next)),
        };
        Ok(Expr::new(kind, span))
    }
}

/// Parse a standalone expression (the whole input must be one expression).
pub fn parse_expression(source: &str, interner: &StringInterner) -> ParseResult<Expr> {
    let mut parser = TagParser::new(source, 0, interner);
    let expr = parser.expr()?;
    let next = parser.cursor.peek();
    if next.token != Token::Eof {
        return Err(error::unexpected(next, "end of expression"));
    }
    Ok(expr)
}
