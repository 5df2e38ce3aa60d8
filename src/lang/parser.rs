use std::fmt;
use std::rc::Rc;

use super::ast::*;
use super::lexer::Token;
use super::span::Span;


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    location: Span,
    info: ParseErrorInfo,
}

impl ParseError {
    pub fn new(location: Span, info: ParseErrorInfo) -> Self {
        Self { location, info }
    }

    pub fn location(&self) -> Span {
        self.location
    }

    pub fn info(&self) -> &ParseErrorInfo {
        &self.info
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorInfo {
    Unexpected {
        /// A description of what the parser was looking for.
        expected: &'static str,
        /// But this was the actual next token.
        actual: Token,
    },
    /// The end of the input was reached, but the parser was expecting more.
    EOF,
    /// A parameter list with more than one variadic parameter.
    MultipleVariadics,
    /// An extended call whose last operand is not a parameter-less block.
    BlockExpected,
}

impl fmt::Display for ParseErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseErrorInfo::Unexpected { expected, actual } => {
                write!(f, "expected {}, but got {:?}", expected, actual)
            }
            ParseErrorInfo::EOF => write!(f, "end of file reached"),
            ParseErrorInfo::MultipleVariadics => {
                write!(f, "a block can have at most one variadic parameter")
            }
            ParseErrorInfo::BlockExpected => write!(
                f,
                "an extended call must end in a block without parameters"
            ),
        }
    }
}

type ParseResult<T> = Result<T, ParseError>;

/// Infix operators from loosest to tightest binding; every operation
/// desugars to a call of the operator name.
const LEVELS: [&[&str]; 5] = [
    &["<-"],
    &["=", "!=", "<", "<=", ">", ">="],
    &["+", "-"],
    &["*", "/"],
    &["**"],
];

pub struct Parser<'a> {
    tokens: &'a [(Span, Token)],
    source: &'a str,
    current_token: usize,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str, tokens: &'a [(Span, Token)]) -> Self {
        Self {
            tokens,
            source,
            current_token: 0,
        }
    }

    /// Parse a file: statements separated by `;`, with the final
    /// separator optional.
    pub fn parse_module(&mut self) -> ParseResult<Module> {
        let mut statements = Vec::new();
        while self.peek_token().is_some() {
            statements.push(self.parse_statement()?);
            if !self.eat(Token::Semi) {
                break;
            }
        }
        if let Some((span, token)) = self.peek_token() {
            return Err(ParseError::new(
                span,
                ParseErrorInfo::Unexpected {
                    expected: "`;` between statements",
                    actual: token,
                },
            ));
        }
        Ok(Module { statements })
    }

    /// A statement is an assignment or an expression; assignments are
    /// only recognized in statement position.
    pub fn parse_statement(&mut self) -> ParseResult<Expr> {
        if let (Some((span, Token::Ident)), Some((_, Token::Define))) =
            (self.peek_token(), self.peek_token_at(1))
        {
            self.pop_token();
            self.pop_token();
            let name = self.get_span(span).to_owned();
            let value = self.parse_expr()?;
            return Ok(Expr::Assign {
                name,
                value: Box::new(value),
            });
        }
        self.parse_expr()
    }

    // Parsers for expressions

    /// Call level: juxtaposed operands form a call, a single operand is
    /// itself. An inline `|params|` group turns the call into an
    /// extended call whose trailing block receives the parameters.
    pub fn parse_expr(&mut self) -> ParseResult<Expr> {
        let first = self.parse_operand()?;
        let mut args = Vec::new();
        let mut extension: Option<(usize, Vec<String>, Option<(usize, String)>)> = None;

        loop {
            match self.peek_token() {
                Some((_, Token::Pipe)) if extension.is_none() => {
                    let (params, variadic) = self.parse_param_group()?;
                    extension = Some((args.len(), params, variadic));
                }
                Some((_, token)) if self.starts_operand(token) => {
                    args.push(self.parse_operand()?);
                }
                _ => break,
            }
        }

        if let Some((position, params, variadic)) = extension {
            let block = self.into_extension_block(args.pop(), params, variadic)?;
            args.insert(position, block);
        }

        if args.is_empty() {
            Ok(first)
        } else {
            Ok(Expr::call(first, args))
        }
    }

    /// Attach the parameter group of an extended call to its trailing
    /// block.
    fn into_extension_block(
        &self,
        last: Option<Expr>,
        params: Vec<String>,
        variadic: Option<(usize, String)>,
    ) -> ParseResult<Expr> {
        if let Some(Expr::Block(block)) = last {
            if block.params.is_empty() && block.variadic.is_none() {
                let mut block = (*block).clone();
                block.params = params;
                block.variadic = variadic;
                return Ok(Expr::Block(Rc::new(block)));
            }
        }
        Err(ParseError::new(
            self.previous_span(),
            ParseErrorInfo::BlockExpected,
        ))
    }

    fn parse_operand(&mut self) -> ParseResult<Expr> {
        self.parse_infix(0)
    }

    fn parse_infix(&mut self, level: usize) -> ParseResult<Expr> {
        if level == LEVELS.len() {
            return self.parse_prefix();
        }
        let mut lhs = self.parse_infix(level + 1)?;
        while let Some((span, Token::Op)) = self.peek_token() {
            let op = self.get_span(span);
            if !LEVELS[level].contains(&op) {
                break;
            }
            self.pop_token();
            let rhs = self.parse_infix(level + 1)?;
            lhs = Expr::call(Expr::name(op), vec![lhs, rhs]);
        }
        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> ParseResult<Expr> {
        match self.peek_token() {
            Some((span, Token::Op)) if self.get_span(span) == "!" => {
                self.pop_token();
                let inner = self.parse_prefix()?;
                Ok(Expr::call(Expr::name("!"), vec![inner]))
            }
            Some((span, Token::DotsIdent)) => {
                self.pop_token();
                let name = &self.get_span(span)[3..];
                Ok(Expr::Variadic(Box::new(Expr::name(name))))
            }
            Some((_, Token::Dots)) => {
                self.pop_token();
                match self.peek_token() {
                    Some((_, token)) if self.starts_operand(token) => {
                        let inner = self.parse_prefix()?;
                        Ok(Expr::Variadic(Box::new(inner)))
                    }
                    _ => Ok(Expr::name("...")),
                }
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let (span, token) = self.parse_token()?;
        match token {
            Token::Number => Ok(Expr::Number(self.get_span(span).to_owned())),
            Token::Str => Ok(Expr::Str(decode_string(self.get_span(span)))),
            Token::Ident => Ok(Expr::Name(self.get_span(span).to_owned())),
            Token::ParenOpen => self.parse_group(),
            Token::BraceOpen => self.parse_list(),
            Token::BracketOpen => self.parse_block(),
            _ => Err(ParseError::new(
                span,
                ParseErrorInfo::Unexpected {
                    expected: "an expression",
                    actual: token,
                },
            )),
        }
    }

    /// `( a )` groups, `( a; b; c )` sequences through the `;` builtin.
    fn parse_group(&mut self) -> ParseResult<Expr> {
        let mut exprs = vec![self.parse_expr()?];
        while self.eat(Token::Semi) {
            exprs.push(self.parse_expr()?);
        }
        self.expect_token(Token::ParenClose)?;
        if exprs.len() == 1 {
            Ok(exprs.pop().unwrap())
        } else {
            Ok(Expr::call(Expr::name(";"), exprs))
        }
    }

    fn parse_list(&mut self) -> ParseResult<Expr> {
        let mut items = Vec::new();
        if !self.next_is(Token::BraceClose) {
            items.push(self.parse_expr()?);
            while self.eat(Token::Comma) {
                items.push(self.parse_expr()?);
            }
        }
        self.expect_token(Token::BraceClose)?;
        Ok(Expr::List(items))
    }

    fn parse_block(&mut self) -> ParseResult<Expr> {
        let (params, variadic) = if self.next_is(Token::Pipe) {
            self.parse_param_group()?
        } else {
            (Vec::new(), None)
        };

        let mut statements = Vec::new();
        if !self.next_is(Token::BracketClose) {
            loop {
                statements.push(self.parse_statement()?);
                if !self.eat(Token::Semi) || self.next_is(Token::BracketClose) {
                    break;
                }
            }
        }
        self.expect_token(Token::BracketClose)?;

        let ret = statements.pop().map(Box::new);
        Ok(Expr::Block(Rc::new(Block {
            params,
            variadic,
            statements,
            ret,
        })))
    }

    /// `|a ...rest b|`: fixed names with at most one variadic; a bare
    /// `...` names the rest-list `...`.
    fn parse_param_group(&mut self) -> ParseResult<(Vec<String>, Option<(usize, String)>)> {
        self.expect_token(Token::Pipe)?;
        let mut params = Vec::new();
        let mut variadic = None;
        loop {
            let (span, token) = self.parse_token()?;
            match token {
                Token::Pipe => break,
                Token::Ident => params.push(self.get_span(span).to_owned()),
                Token::Dots | Token::DotsIdent => {
                    if variadic.is_some() {
                        return Err(ParseError::new(span, ParseErrorInfo::MultipleVariadics));
                    }
                    let name = match token {
                        Token::DotsIdent => self.get_span(span)[3..].to_owned(),
                        _ => "...".to_owned(),
                    };
                    variadic = Some((params.len(), name));
                }
                _ => {
                    return Err(ParseError::new(
                        span,
                        ParseErrorInfo::Unexpected {
                            expected: "a parameter name or `|`",
                            actual: token,
                        },
                    ))
                }
            }
        }
        Ok((params, variadic))
    }

    /// Whether a token may begin a call operand.
    fn starts_operand(&self, token: Token) -> bool {
        match token {
            Token::Number
            | Token::Str
            | Token::Ident
            | Token::Dots
            | Token::DotsIdent
            | Token::ParenOpen
            | Token::BracketOpen
            | Token::BraceOpen => true,
            Token::Op => {
                // only the prefix operator can start an operand
                if let Some((span, _)) = self.peek_token() {
                    self.get_span(span) == "!"
                } else {
                    false
                }
            }
            _ => false,
        }
    }

    // Manipulating/Inspecting the token stream

    fn pop_token(&mut self) -> Option<(Span, Token)> {
        if self.current_token < self.tokens.len() {
            let tok = self.tokens[self.current_token];
            self.current_token += 1;
            Some(tok)
        } else {
            None
        }
    }

    fn peek_token(&self) -> Option<(Span, Token)> {
        self.peek_token_at(0)
    }

    fn peek_token_at(&self, ahead: usize) -> Option<(Span, Token)> {
        self.tokens.get(self.current_token + ahead).copied()
    }

    fn next_is(&self, expected: Token) -> bool {
        matches!(self.peek_token(), Some((_, token)) if token == expected)
    }

    fn eat(&mut self, expected: Token) -> bool {
        if self.next_is(expected) {
            self.pop_token();
            true
        } else {
            false
        }
    }

    fn get_span(&self, span: Span) -> &'a str {
        span.slice(self.source)
    }

    fn previous_span(&self) -> Span {
        if self.current_token > 0 {
            self.tokens[self.current_token - 1].0
        } else {
            Span { begin: 0, end: 0 }
        }
    }

    fn parse_token(&mut self) -> ParseResult<(Span, Token)> {
        self.pop_token().ok_or_else(|| self.eof_error())
    }

    fn expect_token(&mut self, expected: Token) -> ParseResult<Span> {
        if let Some((span, token)) = self.pop_token() {
            if token == expected {
                Ok(span)
            } else {
                Err(ParseError::new(
                    span,
                    ParseErrorInfo::Unexpected {
                        expected: "a closing delimiter",
                        actual: token,
                    },
                ))
            }
        } else {
            Err(self.eof_error())
        }
    }

    fn eof_error(&self) -> ParseError {
        ParseError::new(
            Span {
                begin: self.source.len(),
                end: self.source.len(),
            },
            ParseErrorInfo::EOF,
        )
    }
}

/// Resolve the escape sequences of a string literal (quotes included).
fn decode_string(raw: &str) -> String {
    let inner = &raw[1..raw.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('a') => out.push('\x07'),
            Some('b') => out.push('\x08'),
            Some('f') => out.push('\x0c'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('v') => out.push('\x0b'),
            // an escaped line break joins the lines
            Some('\n') => {}
            // `\\`, `\'`, `\"` and any unknown escape collapse to the
            // escaped character itself
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}
