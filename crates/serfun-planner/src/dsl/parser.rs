//! Recursive-descent parser producing a [`Script`].
//!
//! ```text
//! script    := header statement*
//! header    := '(' params ')' '<-' IDENT '(' params ')'
//! params    := ( param ( ',' param )* )?
//! param     := TYPE? IDENT
//! statement := IDENT '<-' expr ( ';' | <end of input> )
//! expr      := primary selector?
//! primary   := IDENT '(' ( expr ( ',' expr )* )? ')' | IDENT
//!            | INT | DECIMAL | STRING | '@' authority ':' path
//! selector  := '[' ( INT | STRING ) ']' | '.' IDENT
//! ```

use serfun_core::error::{Error, Result};
use serfun_operators::Selector;

use super::ast::{Expr, Header, Param, ParamType, Script, Statement};
use super::lexer::{tokenize, Spanned, Token};

pub fn parse(source: &str) -> Result<Script> {
    let tokens = tokenize(source)?;
    let mut parser = Parser { tokens, pos: 0 };
    let header = parser.header()?;
    let mut statements = Vec::new();
    while parser.peek() != &Token::Eof {
        statements.push(parser.statement()?);
    }
    Ok(Script { header, statements })
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    fn current(&self) -> &Spanned {
        // The token stream always ends with `Eof`; reads past the end keep seeing it.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &Token {
        &self.current().token
    }

    fn advance(&mut self) -> Token {
        let token = self.current().token.clone();
        self.pos += 1;
        token
    }

    fn unexpected(&self, wanted: &str) -> Error {
        let here = self.current();
        Error::Compile(format!(
            "{}:{}: expected {wanted}, found {}",
            here.line, here.col, here.token
        ))
    }

    fn expect(&mut self, token: Token) -> Result<()> {
        if *self.peek() == token {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&token.to_string()))
        }
    }

    fn ident(&mut self, wanted: &str) -> Result<String> {
        if !matches!(self.peek(), Token::Ident(_)) {
            return Err(self.unexpected(wanted));
        }
        match self.advance() {
            Token::Ident(name) => Ok(name),
            _ => Err(self.unexpected(wanted)),
        }
    }

    fn header(&mut self) -> Result<Header> {
        let outputs = self.params()?;
        self.expect(Token::Arrow)?;
        let name = self.ident("program name")?;
        let inputs = self.params()?;
        Ok(Header { name, outputs, inputs })
    }

    fn params(&mut self) -> Result<Vec<Param>> {
        self.expect(Token::LParen)?;
        let mut params = Vec::new();
        if *self.peek() == Token::RParen {
            self.advance();
            return Ok(params);
        }
        loop {
            params.push(self.param()?);
            match self.advance() {
                Token::Comma => continue,
                Token::RParen => return Ok(params),
                _ => {
                    self.pos -= 1;
                    return Err(self.unexpected("',' or ')'"));
                }
            }
        }
    }

    fn param(&mut self) -> Result<Param> {
        let first = self.ident("parameter")?;
        if matches!(self.peek(), Token::Ident(_)) {
            let ty = ParamType::from_keyword(&first).ok_or_else(|| {
                Error::Compile(format!(
                    "unknown parameter type '{first}' (expected stream, long, decimal, string or boolean)"
                ))
            })?;
            let name = self.ident("parameter name")?;
            return Ok(Param { ty, name });
        }
        Ok(Param {
            ty: ParamType::Stream,
            name: first,
        })
    }

    fn statement(&mut self) -> Result<Statement> {
        let line = self.current().line;
        let target = self.ident("variable name")?;
        self.expect(Token::Arrow)?;
        let expr = self.expr()?;
        match self.peek().clone() {
            Token::Semi => {
                self.advance();
            }
            Token::Eof => {}
            _ => return Err(self.unexpected("';'")),
        }
        Ok(Statement { target, expr, line })
    }

    fn expr(&mut self) -> Result<Expr> {
        let base = self.primary()?;
        let selector = match self.peek().clone() {
            Token::LBracket => {
                self.advance();
                let sel = match self.advance() {
                    Token::Int(i) if i >= 0 => Selector::Index(i as usize),
                    Token::Str(key) => Selector::Key(key),
                    _ => {
                        self.pos -= 1;
                        return Err(self.unexpected("output index or key"));
                    }
                };
                self.expect(Token::RBracket)?;
                sel
            }
            Token::Dot => {
                self.advance();
                Selector::Key(self.ident("output key")?)
            }
            _ => return Ok(base),
        };
        Ok(Expr::Select {
            base: Box::new(base),
            selector,
        })
    }

    fn primary(&mut self) -> Result<Expr> {
        match self.advance() {
            Token::Int(n) => Ok(Expr::Long(n)),
            Token::Decimal(d) => Ok(Expr::Decimal(d)),
            Token::Str(s) => Ok(Expr::Str(s)),
            Token::StreamRef { authority, path } => Ok(Expr::StreamRef { authority, path }),
            Token::Ident(name) => {
                if *self.peek() != Token::LParen {
                    return Ok(Expr::Var(name));
                }
                self.advance();
                let mut args = Vec::new();
                if *self.peek() == Token::RParen {
                    self.advance();
                    return Ok(Expr::Call { name, args });
                }
                loop {
                    args.push(self.expr()?);
                    match self.advance() {
                        Token::Comma => continue,
                        Token::RParen => return Ok(Expr::Call { name, args }),
                        _ => {
                            self.pos -= 1;
                            return Err(self.unexpected("',' or ')'"));
                        }
                    }
                }
            }
            _ => {
                self.pos -= 1;
                Err(self.unexpected("expression"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_with_typed_and_untyped_params() {
        let script = parse("(out, decimal level) <- smooth(stream px, long n)").unwrap();
        let h = script.header;
        assert_eq!(h.name, "smooth");
        assert_eq!(
            h.outputs,
            vec![
                Param { ty: ParamType::Stream, name: "out".into() },
                Param { ty: ParamType::Decimal, name: "level".into() },
            ]
        );
        assert_eq!(h.inputs[1], Param { ty: ParamType::Long, name: "n".into() });
        assert!(script.statements.is_empty());
    }

    #[test]
    fn statements_and_selectors() {
        let src = "(a, b) <- p(x)\n\
                   s <- split(x, 2);\n\
                   a <- mavg(s[0], 3);\n\
                   b <- s.out1";
        let script = parse(src).unwrap();
        assert_eq!(script.statements.len(), 3);
        assert_eq!(script.statements[1].line, 3);
        assert_eq!(
            script.statements[2].expr,
            Expr::Select {
                base: Box::new(Expr::Var("s".into())),
                selector: Selector::Key("out1".into()),
            }
        );
        assert_eq!(script.statements[1].to_string(), "a <- mavg(s[0], 3);");
    }

    #[test]
    fn stream_refs_and_literals() {
        let script = parse("(o) <- p()\no <- series2csv('A', @acme:a, \"B\", load('acme/b'));").unwrap();
        let Expr::Call { name, args } = &script.statements[0].expr else {
            panic!("expected a call");
        };
        assert_eq!(name, "series2csv");
        assert_eq!(
            args[1],
            Expr::StreamRef { authority: "acme".into(), path: "a".into() }
        );
    }

    #[test]
    fn malformed_text_is_a_compile_error() {
        for src in [
            "(o) <- p(",
            "(o) p()",
            "(o) <- p() o <- ",
            "(o) <- p() o <- f(1 2)",
            "(o) <- p() o <- x[1.5]",
            "(o) <- p() o <- a b <- c",
            "(o) <- p(widget x)",
        ] {
            let err = parse(src).unwrap_err();
            assert!(matches!(err, Error::Compile(_)), "{src}: {err}");
        }
    }
}
