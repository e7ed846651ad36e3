//! Expression lexer.
//!
//! Template text is scanned by hand (see `grammar::content`); only the inside
//! of `${...}`, directive tags and call tags is tokenized. A [`TokenCursor`]
//! lexes lazily from an absolute offset, so the content scanner can resume
//! plain-text scanning right after the token that closed a tag.

use std::collections::VecDeque;

use logos::Logos;
use quill_ir::Span;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n]+")]
pub(crate) enum Token {
    #[regex(r#""([^"\\]|\\.)*""#)]
    #[regex(r"'([^'\\]|\\.)*'")]
    Str,
    #[regex(r#"r"[^"]*""#)]
    #[regex(r"r'[^']*'")]
    RawStr,
    #[regex(r"[0-9]+")]
    Int,
    #[regex(r"[0-9]+\.[0-9]+")]
    Float,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[regex(r"[A-Za-z_@][A-Za-z0-9_]*")]
    Ident,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("/]")]
    SelfClose,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(";")]
    Semicolon,
    #[token("...")]
    Ellipsis,
    #[token("..<")]
    DotDotLt,
    #[token("..")]
    DotDot,
    #[token(".")]
    Dot,
    #[token("??")]
    DoubleQuestion,
    #[token("?")]
    Question,
    #[token("!=")]
    NotEq,
    #[token("!")]
    Bang,
    #[token("==")]
    EqEq,
    #[token("=")]
    Eq,
    #[token("<=")]
    LtEq,
    #[token("<")]
    Lt,
    #[token(">=")]
    GtEq,
    #[token(">")]
    Gt,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,

    /// Character sequence no rule matches.
    Invalid,
    /// End of the template source.
    Eof,
}

impl Token {
    /// Human-readable token name for "expected X, found Y" messages.
    pub(crate) fn describe(self) -> &'static str {
        match self {
            Token::Str | Token::RawStr => "string literal",
            Token::Int | Token::Float => "number literal",
            Token::True | Token::False => "boolean literal",
            Token::Ident => "identifier",
            Token::LParen => "`(`",
            Token::RParen => "`)`",
            Token::LBracket => "`[`",
            Token::RBracket => "`]`",
            Token::SelfClose => "`/]`",
            Token::LBrace => "`{`",
            Token::RBrace => "`}`",
            Token::Comma => "`,`",
            Token::Colon => "`:`",
            Token::Semicolon => "`;`",
            Token::Ellipsis => "`...`",
            Token::DotDotLt => "`..<`",
            Token::DotDot => "`..`",
            Token::Dot => "`.`",
            Token::DoubleQuestion => "`??`",
            Token::Question => "`?`",
            Token::NotEq => "`!=`",
            Token::Bang => "`!`",
            Token::EqEq => "`==`",
            Token::Eq => "`=`",
            Token::LtEq => "`<=`",
            Token::Lt => "`<`",
            Token::GtEq => "`>=`",
            Token::Gt => "`>`",
            Token::AndAnd => "`&&`",
            Token::OrOr => "`||`",
            Token::Plus => "`+`",
            Token::Minus => "`-`",
            Token::Star => "`*`",
            Token::Slash => "`/`",
            Token::Percent => "`%`",
            Token::Invalid => "invalid character",
            Token::Eof => "end of template",
        }
    }

    /// Tokens that can begin an operand. Decides whether `x!` has a fallback
    /// and whether `a..` is open-ended.
    pub(crate) fn starts_operand(self) -> bool {
        matches!(
            self,
            Token::Str
                | Token::RawStr
                | Token::Int
                | Token::Float
                | Token::True
                | Token::False
                | Token::Ident
                | Token::LParen
                | Token::LBracket
                | Token::LBrace
        )
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Lexed {
    pub token: Token,
    pub span: Span,
}

/// Lazy token stream over `source[base..]` reporting absolute spans.
pub(crate) struct TokenCursor<'src> {
    source: &'src str,
    lexer: logos::Lexer<'src, Token>,
    base: usize,
    buffer: VecDeque<Lexed>,
    /// End offset of the last consumed token.
    last_end: usize,
}

impl<'src> TokenCursor<'src> {
    pub(crate) fn new(source: &'src str, base: usize) -> Self {
        let base = base.min(source.len());
        TokenCursor {
            source,
            lexer: Token::lexer(&source[base..]),
            base,
            buffer: VecDeque::new(),
            last_end: base,
        }
    }

    fn lex_one(&mut self) -> Lexed {
        match self.lexer.next() {
            Some(result) => {
                let range = self.lexer.span();
                let span = Span::from_range(self.base + range.start..self.base + range.end);
                Lexed {
                    token: result.unwrap_or(Token::Invalid),
                    span,
                }
            }
            None => Lexed {
                token: Token::Eof,
                span: Span::from_range(self.source.len()..self.source.len()),
            },
        }
    }

    /// Look `n` tokens ahead without consuming (0 is the next token).
    pub(crate) fn peek_nth(&mut self, n: usize) -> Lexed {
        while self.buffer.len() <= n {
            let lexed = self.lex_one();
            self.buffer.push_back(lexed);
        }
        self.buffer[n]
    }

    pub(crate) fn peek(&mut self) -> Lexed {
        self.peek_nth(0)
    }

    pub(crate) fn next(&mut self) -> Lexed {
        let lexed = self.buffer.pop_front().unwrap_or_else(|| self.lex_one());
        if lexed.token != Token::Eof {
            self.last_end = lexed.span.end as usize;
        }
        lexed
    }

    /// Consume the next token if it is `token`.
    pub(crate) fn eat(&mut self, token: Token) -> Option<Lexed> {
        if self.peek().token == token {
            Some(self.next())
        } else {
            None
        }
    }

    pub(crate) fn slice(&self, span: Span) -> &'src str {
        self.source.get(span.to_range()).unwrap_or("")
    }

    /// Absolute offset just past the last consumed token.
    pub(crate) fn position(&self) -> usize {
        self.last_end
    }
}

/// Decode a quoted string literal's escapes.
///
/// Returns the byte offset (relative to the literal) of the first invalid
/// escape on failure.
pub(crate) fn cook_string(literal: &str) -> Result<String, usize> {
    let inner = &literal[1..literal.len().saturating_sub(1).max(1)];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.char_indices();
    while let Some((at, c)) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some((_, escaped)) = chars.next() else {
            return Err(at + 1);
        };
        match escaped {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '\\' => out.push('\\'),
            '"' => out.push('"'),
            '\'' => out.push('\''),
            '$' => out.push('$'),
            '{' => out.push('{'),
            '}' => out.push('}'),
            'u' => {
                let hex: String = chars.by_ref().take(4).map(|(_, c)| c).collect();
                let decoded = u32::from_str_radix(&hex, 16)
                    .ok()
                    .filter(|_| hex.len() == 4)
                    .and_then(char::from_u32);
                match decoded {
                    Some(ch) => out.push(ch),
                    None => return Err(at + 1),
                }
            }
            _ => return Err(at + 1),
        }
    }
    Ok(out)
}

/// Content of a raw string literal `r"..."`.
pub(crate) fn raw_string(literal: &str) -> &str {
    literal
        .get(2..literal.len().saturating_sub(1))
        .unwrap_or("")
}
