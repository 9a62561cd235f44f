//! Tokenizer for series programs.

use std::fmt;

use serfun_core::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Semi,
    Dot,
    /// `<-`
    Arrow,
    Ident(String),
    Int(i64),
    Decimal(f64),
    Str(String),
    StreamRef { authority: String, path: String },
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::LParen => f.write_str("'('"),
            Token::RParen => f.write_str("')'"),
            Token::LBracket => f.write_str("'['"),
            Token::RBracket => f.write_str("']'"),
            Token::Comma => f.write_str("','"),
            Token::Semi => f.write_str("';'"),
            Token::Dot => f.write_str("'.'"),
            Token::Arrow => f.write_str("'<-'"),
            Token::Ident(s) => write!(f, "identifier '{s}'"),
            Token::Int(n) => write!(f, "integer {n}"),
            Token::Decimal(d) => write!(f, "decimal {d}"),
            Token::Str(s) => write!(f, "string {s:?}"),
            Token::StreamRef { authority, path } => write!(f, "stream @{authority}:{path}"),
            Token::Eof => f.write_str("end of input"),
        }
    }
}

/// A token and the 1-based line/column where it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub line: usize,
    pub col: usize,
}

pub fn tokenize(source: &str) -> Result<Vec<Spanned>> {
    Lexer::new(source).run()
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    col: usize,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
            line: 1,
            col: 1,
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn error(&self, line: usize, col: usize, msg: impl fmt::Display) -> Error {
        Error::Compile(format!("{line}:{col}: {msg}"))
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn run(mut self) -> Result<Vec<Spanned>> {
        let mut out = Vec::new();
        loop {
            let (line, col) = (self.line, self.col);
            let Some(c) = self.peek() else {
                out.push(Spanned { token: Token::Eof, line, col });
                return Ok(out);
            };
            let token = match c {
                c if c.is_whitespace() => {
                    self.bump();
                    continue;
                }
                '#' => {
                    self.skip_line();
                    continue;
                }
                '/' => {
                    self.bump();
                    if self.peek() != Some('/') {
                        return Err(self.error(line, col, "unexpected '/'"));
                    }
                    self.skip_line();
                    continue;
                }
                '(' | ')' | '[' | ']' | ',' | ';' | '.' => {
                    self.bump();
                    match c {
                        '(' => Token::LParen,
                        ')' => Token::RParen,
                        '[' => Token::LBracket,
                        ']' => Token::RBracket,
                        ',' => Token::Comma,
                        ';' => Token::Semi,
                        _ => Token::Dot,
                    }
                }
                '<' => {
                    self.bump();
                    if self.bump() != Some('-') {
                        return Err(self.error(line, col, "expected '<-'"));
                    }
                    Token::Arrow
                }
                '\'' | '"' => self.string(c, line, col)?,
                '@' => self.stream_ref(line, col)?,
                c if c.is_ascii_digit() || c == '-' => self.number(line, col)?,
                c if c.is_alphabetic() || c == '_' => {
                    Token::Ident(self.take_while(|c| c.is_alphanumeric() || c == '_'))
                }
                other => return Err(self.error(line, col, format!("unexpected character {other:?}"))),
            };
            out.push(Spanned { token, line, col });
        }
    }

    fn take_while(&mut self, keep: impl Fn(char) -> bool) -> String {
        let mut s = String::new();
        while let Some(c) = self.peek() {
            if !keep(c) {
                break;
            }
            s.push(c);
            self.bump();
        }
        s
    }

    fn string(&mut self, quote: char, line: usize, col: usize) -> Result<Token> {
        self.bump();
        let mut s = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => return Err(self.error(line, col, "unterminated string")),
                Some(c) if c == quote => return Ok(Token::Str(s)),
                Some('\\') => {
                    let escaped = match self.bump() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some(c @ ('\\' | '\'' | '"')) => c,
                        Some(other) => {
                            return Err(self.error(line, col, format!("unknown escape '\\{other}'")))
                        }
                        None => return Err(self.error(line, col, "unterminated string")),
                    };
                    s.push(escaped);
                }
                Some(c) => s.push(c),
            }
        }
    }

    fn stream_ref(&mut self, line: usize, col: usize) -> Result<Token> {
        self.bump();
        let authority = self.take_while(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if authority.is_empty() || self.bump() != Some(':') {
            return Err(self.error(line, col, "stream reference must look like @authority:path"));
        }
        let path = self.take_while(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '/'));
        if path.is_empty() {
            return Err(self.error(line, col, "stream reference has an empty path"));
        }
        Ok(Token::StreamRef { authority, path })
    }

    fn number(&mut self, line: usize, col: usize) -> Result<Token> {
        let mut text = String::new();
        if self.peek() == Some('-') {
            text.push('-');
            self.bump();
        }
        text.push_str(&self.take_while(|c| c.is_ascii_digit()));
        let mut decimal = false;
        if self.peek() == Some('.') {
            decimal = true;
            text.push('.');
            self.bump();
            text.push_str(&self.take_while(|c| c.is_ascii_digit()));
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            decimal = true;
            text.push('e');
            self.bump();
            if let Some(sign @ ('+' | '-')) = self.peek() {
                text.push(sign);
                self.bump();
            }
            text.push_str(&self.take_while(|c| c.is_ascii_digit()));
        }
        let parsed = if decimal {
            text.parse::<f64>().ok().map(Token::Decimal)
        } else {
            text.parse::<i64>().ok().map(Token::Int)
        };
        parsed.ok_or_else(|| self.error(line, col, format!("malformed number '{text}'")))
    }
}
