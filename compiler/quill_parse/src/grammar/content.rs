//! Template content: text, interpolations, comments, directives and calls.
//!
//! Text is scanned by hand up to the next `${`, `[#`, `[/#`, `[@` or `[/@`.
//! Each tag is handed to a [`TagParser`]; after the tag closes, scanning
//! resumes at the cursor's position. Nested content is parsed recursively
//! until a clause (`[#else]`, `[#case]`, ...) or an end tag stops it, and the
//! directive that opened the content decides whether that stop is legal.

use std::sync::Arc;

use quill_ir::{
    AssignScope, Assignment, Block, CallArgs, CallBody, CallNode, Expr, ExprKind, IfBranch,
    ListNode, MacroDef, MacroKind, Name, NamedArg, Node, NodeKind, Param, Span, StringInterner,
    SwitchCase,
};
use quill_diagnostic::Diagnostic;
use quill_stack::ensure_sufficient_stack;

use super::expr::{TagEnd, TagParser};
use crate::error::{self, ParseResult};
use crate::lexer::{Lexed, Token};

/// Tags that end a run of content without being content themselves.
#[derive(Debug)]
enum Stop {
    Eof,
    /// `[/#name]`
    End { name: String, span: Span },
    /// `[/@name]` or `[/@]`
    EndCall { name: String, span: Span },
    Clause { clause: Clause, span: Span },
}

#[derive(Debug)]
enum Clause {
    ElseIf(Expr),
    Else,
    Case(Vec<Expr>),
    Default,
    Recover,
}

impl Clause {
    fn name(&self) -> &'static str {
        match self {
            Clause::ElseIf(_) => "#elseif",
            Clause::Else => "#else",
            Clause::Case(_) => "#case",
            Clause::Default => "#default",
            Clause::Recover => "#recover",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Markup {
    Interpolation,
    Comment,
    Directive,
    EndDirective,
    Call,
    EndCall,
}

pub(crate) struct ContentParser<'a> {
    source: &'a str,
    interner: &'a StringInterner,
    pos: usize,
    /// Directive bodies currently open; zero at the top level.
    depth: usize,
    /// Macros defined at the top level, hoisted into the template.
    pub(crate) macros: Vec<Arc<MacroDef>>,
}

impl<'a> ContentParser<'a> {
    pub(crate) fn new(source: &'a str, interner: &'a StringInterner) -> Self {
        ContentParser {
            source,
            interner,
            pos: 0,
            depth: 0,
            macros: Vec::new(),
        }
    }

    /// Parse the whole template body.
    pub(crate) fn parse_root(&mut self) -> ParseResult<Vec<Node>> {
        let (nodes, stop) = self.content()?;
        match stop {
            Stop::Eof => Ok(nodes),
            Stop::End { name, span } => Err(error::misplaced(
                &format!("[/#{name}]"),
                "after a matching opening directive",
                span,
            )),
            Stop::EndCall { span, .. } => Err(error::misplaced(
                "[/@]",
                "after a matching opening call",
                span,
            )),
            Stop::Clause { clause, span } => Err(clause_misplaced(&clause, span)),
        }
    }

    fn tag(&self, offset: usize) -> TagParser<'a, 'a> {
        TagParser::new(self.source, offset, self.interner)
    }

    fn span(start: usize, end: usize) -> Span {
        Span::from_range(start..end)
    }

    fn next_markup(&self) -> Option<(usize, Markup)> {
        let rest = &self.source[self.pos..];
        for (i, ch) in rest.match_indices(['$', '[']) {
            let after = &rest[i + 1..];
            let markup = match ch {
                "$" if after.starts_with('{') => Markup::Interpolation,
                "[" if after.starts_with("#--") => Markup::Comment,
                "[" if after.starts_with('#') => Markup::Directive,
                "[" if after.starts_with("/#") => Markup::EndDirective,
                "[" if after.starts_with('@') => Markup::Call,
                "[" if after.starts_with("/@") => Markup::EndCall,
                _ => continue,
            };
            return Some((self.pos + i, markup));
        }
        None
    }

    fn push_text(&self, nodes: &mut Vec<Node>, start: usize, end: usize) {
        if end > start {
            nodes.push(Node::new(
                NodeKind::Text(Arc::from(&self.source[start..end])),
                Self::span(start, end),
            ));
        }
    }

    /// Content up to the next stop tag.
    fn content(&mut self) -> ParseResult<(Vec<Node>, Stop)> {
        let mut nodes = Vec::new();
        loop {
            let Some((at, markup)) = self.next_markup() else {
                self.push_text(&mut nodes, self.pos, self.source.len());
                self.pos = self.source.len();
                return Ok((nodes, Stop::Eof));
            };
            self.push_text(&mut nodes, self.pos, at);
            self.pos = at;
            match markup {
                Markup::Interpolation => nodes.push(self.interpolation(at)?),
                Markup::Comment => self.comment(at)?,
                Markup::EndDirective => {
                    let (name, span) = self.end_tag(at, 3)?;
                    return Ok((nodes, Stop::End { name, span }));
                }
                Markup::EndCall => {
                    let (name, span) = self.end_tag(at, 3)?;
                    return Ok((nodes, Stop::EndCall { name, span }));
                }
                Markup::Call => nodes.push(self.call(at)?),
                Markup::Directive => {
                    let source = self.source;
                    let name_start = at + 2;
                    let name_len = source[name_start..]
                        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                        .unwrap_or(source.len() - name_start);
                    let name = &source[name_start..name_start + name_len];
                    let name_span = Self::span(at, name_start + name_len);
                    if let Some(clause) = self.clause(name, name_start + name_len)? {
                        return Ok((
                            nodes,
                            Stop::Clause {
                                clause,
                                span: Self::span(at, self.pos),
                            },
                        ));
                    }
                    if let Some(node) = self.directive(name, at, name_start + name_len, name_span)? {
                        nodes.push(node);
                    }
                }
            }
        }
    }

    fn interpolation(&mut self, at: usize) -> ParseResult<Node> {
        let mut tag = self.tag(at + 2);
        let expr = tag.expr()?;
        tag.expect(Token::RBrace, "`}`")?;
        self.pos = tag.cursor.position();
        Ok(Node::new(
            NodeKind::Interpolation(expr),
            Self::span(at, self.pos),
        ))
    }

    fn comment(&mut self, at: usize) -> ParseResult<()> {
        let body = at + 4;
        match self.source[body..].find("--]") {
            Some(end) => {
                self.pos = body + end + 3;
                Ok(())
            }
            None => Err(error::unterminated_comment(Self::span(at, body))),
        }
    }

    /// `[/#name]` or `[/@name]`; `prefix` is the length of `[/#`.
    fn end_tag(&mut self, at: usize, prefix: usize) -> ParseResult<(String, Span)> {
        let start = at + prefix;
        match self.source[start..].find(']') {
            Some(close) => {
                self.pos = start + close + 1;
                let name = self.source[start..start + close].trim().to_owned();
                Ok((name, Self::span(at, self.pos)))
            }
            None => Err(error::unexpected(
                Lexed {
                    token: Token::Eof,
                    span: Self::span(self.source.len(), self.source.len()),
                },
                "`]`",
            )),
        }
    }

    /// Nested content of a block directive, which must end with `[/#name]`.
    fn body(&mut self, name: &str, open: Span) -> ParseResult<Vec<Node>> {
        let (nodes, stop) = self.nested_content()?;
        self.expect_end(name, open, stop)?;
        Ok(nodes)
    }

    fn nested_content(&mut self) -> ParseResult<(Vec<Node>, Stop)> {
        self.depth += 1;
        let result = ensure_sufficient_stack(|| self.content());
        self.depth -= 1;
        result
    }

    fn expect_end(&self, name: &str, open: Span, stop: Stop) -> ParseResult<()> {
        match stop {
            Stop::End { name: found, .. } if found == name => Ok(()),
            Stop::End { name: found, span } => {
                Err(error::mismatched_end(&format!("#{name}"), &format!("[/#{found}]"), span))
            }
            Stop::EndCall { span, .. } => {
                Err(error::mismatched_end(&format!("#{name}"), "[/@]", span))
            }
            Stop::Clause { clause, span } => Err(clause_misplaced(&clause, span)),
            Stop::Eof => Err(error::unclosed_directive(&format!("#{name}"), open)),
        }
    }

    /// Parse a clause tag if `name` is one.
    fn clause(&mut self, name: &str, params: usize) -> ParseResult<Option<Clause>> {
        let mut tag = self.tag(params);
        let clause = match name {
            "elseif" => Clause::ElseIf(tag.expr()?),
            "else" => Clause::Else,
            "case" => {
                let values = tag.expr_list_until(None)?;
                if values.is_empty() {
                    let next = tag.cursor.peek();
                    return Err(error::expected_expression(next));
                }
                Clause::Case(values)
            }
            "default" => Clause::Default,
            "recover" => Clause::Recover,
            _ => return Ok(None),
        };
        tag.close_tag()?;
        self.pos = tag.cursor.position();
        Ok(Some(clause))
    }

    fn directive(
        &mut self,
        name: &str,
        at: usize,
        params: usize,
        name_span: Span,
    ) -> ParseResult<Option<Node>> {
        let mut tag = self.tag(params);
        let kind = match name {
            "if" => {
                let condition = tag.expr()?;
                tag.expect(Token::RBracket, "`]`")?;
                self.pos = tag.cursor.position();
                self.if_chain(condition, name_span)?
            }
            "switch" => {
                let value = tag.expr()?;
                tag.expect(Token::RBracket, "`]`")?;
                self.pos = tag.cursor.position();
                self.switch(value, name_span)?
            }
            "list" => {
                let sequence = tag.expr()?;
                tag.expect_keyword("as")?;
                let (var, _) = tag.ident("a loop variable name")?;
                tag.expect(Token::RBracket, "`]`")?;
                self.pos = tag.cursor.position();
                self.list(sequence, var, name_span)?
            }
            "attempt" => {
                tag.expect(Token::RBracket, "`]`")?;
                self.pos = tag.cursor.position();
                self.attempt(name_span)?
            }
            "macro" | "function" => {
                let kind = if name == "macro" {
                    MacroKind::Macro
                } else {
                    MacroKind::Function
                };
                let def = self.macro_def(&mut tag, kind, at, name_span)?;
                if self.depth == 0 {
                    self.macros.push(def);
                    return Ok(None);
                }
                NodeKind::Macro(def)
            }
            "escape" => {
                let (placeholder, _) = tag.ident("an escape placeholder name")?;
                tag.expect_keyword("as")?;
                let transform = tag.expr()?;
                let end = tag.close_tag()?;
                self.pos = tag.cursor.position();
                let body = self.block_body(end, "escape", name_span)?;
                NodeKind::Escape {
                    placeholder,
                    transform,
                    body,
                }
            }
            "noescape" | "compress" => {
                let end = tag.close_tag()?;
                self.pos = tag.cursor.position();
                let body = self.block_body(end, name, name_span)?;
                if name == "noescape" {
                    NodeKind::NoEscape(body)
                } else {
                    NodeKind::Compress(body)
                }
            }
            "assign" | "global" | "local" => {
                let scope = match name {
                    "assign" => AssignScope::Plain,
                    "global" => AssignScope::Global,
                    _ => AssignScope::Local,
                };
                let assignments = assignments(&mut tag, name)?;
                tag.close_tag()?;
                NodeKind::Assign { scope, assignments }
            }
            "break" | "fallback" => {
                tag.close_tag()?;
                if name == "break" {
                    NodeKind::Break
                } else {
                    NodeKind::Fallback
                }
            }
            "return" | "stop" => {
                let value = if tag.at_tag_end() {
                    None
                } else {
                    Some(tag.expr()?)
                };
                tag.close_tag()?;
                if name == "return" {
                    NodeKind::Return(value)
                } else {
                    NodeKind::Stop(value)
                }
            }
            "nested" => {
                let args = tag.expr_list_until(None)?;
                tag.close_tag()?;
                NodeKind::Nested(args)
            }
            "include" => {
                let template = tag.expr()?;
                tag.close_tag()?;
                NodeKind::Include { template }
            }
            "import" => {
                let template = tag.expr()?;
                tag.expect_keyword("as")?;
                let (alias, _) = tag.ident("a namespace name")?;
                tag.close_tag()?;
                NodeKind::Import { template, alias }
            }
            "visit" | "recurse" => {
                let node = if tag.at_tag_end() || tag.at_keyword("using") {
                    None
                } else {
                    Some(tag.expr()?)
                };
                let using = if tag.eat_keyword("using") {
                    tag.expr_list_until(None)?
                } else {
                    Vec::new()
                };
                tag.close_tag()?;
                if name == "visit" {
                    let Some(node) = node else {
                        return Err(error::malformed("#visit", "missing node expression", name_span));
                    };
                    NodeKind::Visit { node, using }
                } else {
                    NodeKind::Recurse { node, using }
                }
            }
            "setting" => {
                let (setting, _) = tag.ident("a setting name")?;
                tag.expect(Token::Eq, "`=`")?;
                let value = tag.expr()?;
                tag.close_tag()?;
                NodeKind::Setting {
                    name: setting,
                    value,
                }
            }
            _ => return Err(error::unknown_directive(name, name_span)),
        };
        // Block directives already advanced `pos` past their end tag.
        if self.pos <= at {
            self.pos = tag.cursor.position();
        }
        Ok(Some(Node::new(kind, Self::span(at, self.pos))))
    }

    fn block_body(&mut self, end: TagEnd, name: &str, open: Span) -> ParseResult<Vec<Node>> {
        match end {
            TagEnd::SelfClosed => Ok(Vec::new()),
            TagEnd::Open => self.body(name, open),
        }
    }

    fn if_chain(&mut self, first: Expr, open: Span) -> ParseResult<NodeKind> {
        let mut branches = Vec::new();
        let mut condition = Some((first, open));
        loop {
            let (nodes, stop) = self.nested_content()?;
            let Some((current, branch_span)) = condition.take() else {
                // Collecting `[#else]` content; only the end tag may follow.
                self.expect_end("if", open, stop)?;
                return Ok(NodeKind::If {
                    branches,
                    otherwise: Some(nodes),
                });
            };
            branches.push(IfBranch {
                condition: current,
                body: nodes,
                span: branch_span,
            });
            match stop {
                Stop::Clause {
                    clause: Clause::ElseIf(next),
                    span,
                } => condition = Some((next, span)),
                Stop::Clause {
                    clause: Clause::Else,
                    ..
                } => {}
                other => {
                    self.expect_end("if", open, other)?;
                    return Ok(NodeKind::If {
                        branches,
                        otherwise: None,
                    });
                }
            }
        }
    }

    fn switch(&mut self, value: Expr, open: Span) -> ParseResult<NodeKind> {
        let (leading, mut stop) = self.nested_content()?;
        if let Some(node) = leading.iter().find(|n| !is_blank_text(n)) {
            return Err(error::misplaced(
                node.describe(),
                "inside a `#case` or `#default` of a switch",
                node.span,
            ));
        }
        let mut cases = Vec::new();
        loop {
            let (values, span) = match stop {
                Stop::Clause {
                    clause: Clause::Case(values),
                    span,
                } => (Some(values), span),
                Stop::Clause {
                    clause: Clause::Default,
                    span,
                } => (None, span),
                other => {
                    self.expect_end("switch", open, other)?;
                    return Ok(NodeKind::Switch { value, cases });
                }
            };
            let (body, next) = self.nested_content()?;
            cases.push(SwitchCase { values, body, span });
            stop = next;
        }
    }

    fn list(&mut self, sequence: Expr, var: Name, open: Span) -> ParseResult<NodeKind> {
        let (body, stop) = self.nested_content()?;
        let otherwise = match stop {
            Stop::Clause {
                clause: Clause::Else,
                ..
            } => Some(self.body("list", open)?),
            other => {
                self.expect_end("list", open, other)?;
                None
            }
        };
        Ok(NodeKind::List(Box::new(ListNode {
            sequence,
            var,
            body: Block::new(body),
            otherwise,
        })))
    }

    fn attempt(&mut self, open: Span) -> ParseResult<NodeKind> {
        let (body, stop) = self.nested_content()?;
        let recover = match stop {
            Stop::Clause {
                clause: Clause::Recover,
                ..
            } => self.body("attempt", open)?,
            other => {
                self.expect_end("attempt", open, other)?;
                Vec::new()
            }
        };
        Ok(NodeKind::Attempt { body, recover })
    }

    fn macro_def(
        &mut self,
        tag: &mut TagParser<'a, 'a>,
        kind: MacroKind,
        at: usize,
        open: Span,
    ) -> ParseResult<Arc<MacroDef>> {
        let directive = kind.directive();
        let (name, _) = tag.ident("a macro name")?;
        let parenthesized = tag.cursor.eat(Token::LParen).is_some();
        let mut params = Vec::new();
        let mut catch_all = None;
        loop {
            if parenthesized {
                if tag.cursor.eat(Token::RParen).is_some() {
                    break;
                }
            } else if tag.at_tag_end() {
                break;
            }
            let (param, span) = tag.ident("a parameter name")?;
            if let Some(ellipsis) = tag.cursor.eat(Token::Ellipsis) {
                if catch_all.is_some() {
                    return Err(error::malformed(directive, "more than one catch-all parameter", ellipsis.span));
                }
                catch_all = Some(param);
            } else {
                if catch_all.is_some() {
                    return Err(error::malformed(
                        directive,
                        "the catch-all parameter must be last",
                        span,
                    ));
                }
                let default = if tag.cursor.eat(Token::Eq).is_some() {
                    Some(tag.expr()?)
                } else {
                    None
                };
                params.push(Param {
                    name: param,
                    default,
                    span,
                });
            }
            tag.cursor.eat(Token::Comma);
        }
        let end = tag.close_tag()?;
        self.pos = tag.cursor.position();
        let body = self.block_body(end, &directive[1..], open)?;
        Ok(Arc::new(MacroDef {
            name,
            kind,
            params,
            catch_all,
            body: Block::new(body),
            span: Self::span(at, self.pos),
        }))
    }

    fn call(&mut self, at: usize) -> ParseResult<Node> {
        let mut tag = self.tag(at + 2);
        let callee_start = tag.cursor.peek().span.start as usize;
        let callee = callee(&mut tag)?;
        let callee_text = self.source[callee_start..callee.span.end as usize].to_owned();

        let args = if tag.at_tag_end() || tag.cursor.peek().token == Token::Semicolon {
            CallArgs::Positional(Vec::new())
        } else if is_named_arg(&mut tag) {
            let mut named = Vec::new();
            while is_named_arg(&mut tag) {
                let (name, span) = tag.ident("an argument name")?;
                tag.expect(Token::Eq, "`=`")?;
                let value = tag.expr()?;
                named.push(NamedArg { name, value, span });
                tag.cursor.eat(Token::Comma);
            }
            if !tag.at_tag_end() && tag.cursor.peek().token != Token::Semicolon {
                return Err(error::mixed_arguments(tag.cursor.peek().span));
            }
            CallArgs::Named(named)
        } else {
            let mut positional = Vec::new();
            loop {
                if tag.at_tag_end() || tag.cursor.peek().token == Token::Semicolon {
                    break;
                }
                if is_named_arg(&mut tag) {
                    return Err(error::mixed_arguments(tag.cursor.peek().span));
                }
                positional.push(tag.expr()?);
                tag.cursor.eat(Token::Comma);
            }
            CallArgs::Positional(positional)
        };

        let mut body_params = Vec::new();
        if tag.cursor.eat(Token::Semicolon).is_some() {
            while !tag.at_tag_end() {
                let (param, _) = tag.ident("a body parameter name")?;
                body_params.push(param);
                tag.cursor.eat(Token::Comma);
            }
        }

        let end = tag.close_tag()?;
        self.pos = tag.cursor.position();
        let open = Self::span(at, self.pos);
        let body = match end {
            TagEnd::SelfClosed => None,
            TagEnd::Open => {
                let (nodes, stop) = self.nested_content()?;
                match stop {
                    Stop::EndCall { name, span } => {
                        if !name.is_empty() && name != callee_text {
                            return Err(error::mismatched_end(
                                &format!("@{callee_text}"),
                                &format!("[/@{name}]"),
                                span,
                            ));
                        }
                    }
                    Stop::End { name, span } => {
                        return Err(error::mismatched_end(
                            &format!("@{callee_text}"),
                            &format!("[/#{name}]"),
                            span,
                        ));
                    }
                    Stop::Clause { clause, span } => return Err(clause_misplaced(&clause, span)),
                    Stop::Eof => {
                        return Err(error::unclosed_directive(&format!("@{callee_text}"), open));
                    }
                }
                Some(Arc::new(CallBody {
                    params: body_params,
                    block: Block::new(nodes),
                }))
            }
        };
        Ok(Node::new(
            NodeKind::Call(Box::new(CallNode { callee, args, body })),
            Self::span(at, self.pos),
        ))
    }
}

/// `ident` or `ident.member.member`.
fn callee(tag: &mut TagParser<'_, '_>) -> ParseResult<Expr> {
    let (name, span) = tag.ident("a macro name")?;
    let mut expr = Expr::new(ExprKind::Ident(name), span);
    while tag.cursor.eat(Token::Dot).is_some() {
        let (member, member_span) = tag.ident("a member name")?;
        let span = expr.span.merge(member_span);
        expr = Expr::new(
            ExprKind::Member {
                target: Box::new(expr),
                name: member,
            },
            span,
        );
    }
    Ok(expr)
}

fn is_named_arg(tag: &mut TagParser<'_, '_>) -> bool {
    tag.cursor.peek().token == Token::Ident && tag.cursor.peek_nth(1).token == Token::Eq
}

/// `name = expr` pairs, optionally comma separated.
fn assignments(tag: &mut TagParser<'_, '_>, directive: &str) -> ParseResult<Vec<Assignment>> {
    let mut assignments = Vec::new();
    while !tag.at_tag_end() {
        let (name, span) = tag.ident("a variable name")?;
        tag.expect(Token::Eq, "`=`")?;
        let value = tag.expr()?;
        assignments.push(Assignment { name, value, span });
        tag.cursor.eat(Token::Comma);
    }
    if assignments.is_empty() {
        let span = tag.cursor.peek().span;
        return Err(error::malformed(
            &format!("#{directive}"),
            "expected at least one `name = value`",
            span,
        ));
    }
    Ok(assignments)
}

fn is_blank_text(node: &Node) -> bool {
    matches!(&node.kind, NodeKind::Text(text) if text.trim().is_empty())
}

fn clause_misplaced(clause: &Clause, span: Span) -> Diagnostic {
    let context = match clause {
        Clause::ElseIf(_) => "inside `#if`",
        Clause::Else => "inside `#if` or `#list`",
        Clause::Case(_) | Clause::Default => "inside `#switch`",
        Clause::Recover => "inside `#attempt`",
    };
    error::misplaced(clause.name(), context, span)
}
