//! Recursive-descent parser for equation text.
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := ('+' | '-') unary | primary
//! primary := number | 'V' '(' integer ')' | identifier | '(' expr ')'
//! ```

use num_complex::Complex64;

use super::lexer::{Lexer, Token, TokenKind};
use super::{Expr, Symbol};
use crate::circuit::NodeId;
use crate::error::{NodalError, Result};

/// Parser over a token stream.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    /// Tokenize `input` and prepare to parse it.
    pub fn new(input: &str) -> Result<Self> {
        Ok(Self {
            tokens: Lexer::new(input).tokenize()?,
            pos: 0,
        })
    }

    /// Parse a complete expression.
    pub fn parse(&mut self) -> Result<Expr> {
        let expr = self.parse_expr()?;
        if self.current().kind != TokenKind::Eof {
            return Err(self.error(format!("unexpected '{}'", self.current().text)));
        }
        Ok(expr)
    }

    fn current(&self) -> &Token {
        // The token stream always ends with Eof.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        if self.current().kind == kind {
            Ok(self.advance())
        } else {
            Err(self.error(format!("expected {:?}, got {:?}", kind, self.current().kind)))
        }
    }

    fn error(&self, message: impl Into<String>) -> NodalError {
        NodalError::ExpressionError {
            column: self.current().column,
            message: message.into(),
        }
    }

    fn parse_expr(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_term()?;
        loop {
            match self.current().kind {
                TokenKind::Plus => {
                    self.advance();
                    lhs = Expr::Add(Box::new(lhs), Box::new(self.parse_term()?));
                }
                TokenKind::Minus => {
                    self.advance();
                    lhs = Expr::Sub(Box::new(lhs), Box::new(self.parse_term()?));
                }
                _ => return Ok(lhs),
            }
        }
    }

    fn parse_term(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            match self.current().kind {
                TokenKind::Star => {
                    self.advance();
                    lhs = Expr::Mul(Box::new(lhs), Box::new(self.parse_unary()?));
                }
                TokenKind::Slash => {
                    self.advance();
                    lhs = Expr::Div(Box::new(lhs), Box::new(self.parse_unary()?));
                }
                _ => return Ok(lhs),
            }
        }
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        match self.current().kind {
            TokenKind::Minus => {
                self.advance();
                Ok(match self.parse_unary()? {
                    Expr::Number(v) => Expr::Number(-v),
                    other => Expr::Neg(Box::new(other)),
                })
            }
            TokenKind::Plus => {
                self.advance();
                self.parse_unary()
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        match self.current().kind {
            TokenKind::Number => {
                let token = self.advance();
                parse_number(&token.text)
                    .map(Expr::Number)
                    .ok_or_else(|| NodalError::ExpressionError {
                        column: token.column,
                        message: format!("malformed number '{}'", token.text),
                    })
            }
            TokenKind::Identifier => {
                let token = self.advance();
                if token.text == "V" && self.current().kind == TokenKind::OpenParen {
                    self.advance();
                    let index = self.expect(TokenKind::Number)?;
                    let node = index.text.parse::<usize>().map_err(|_| NodalError::ExpressionError {
                        column: index.column,
                        message: format!("node index '{}' is not an integer", index.text),
                    })?;
                    self.expect(TokenKind::CloseParen)?;
                    Ok(Expr::Symbol(Symbol::NodeVoltage(NodeId(node))))
                } else {
                    Ok(Expr::Symbol(Symbol::Component(token.text)))
                }
            }
            TokenKind::OpenParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(TokenKind::CloseParen)?;
                Ok(inner)
            }
            _ => Err(self.error(format!("expected a value, got '{}'", self.current().text))),
        }
    }
}

fn parse_number(text: &str) -> Option<Complex64> {
    match text.strip_suffix('j') {
        Some(im) => im.parse::<f64>().ok().map(|v| Complex64::new(0.0, v)),
        None => text.parse::<f64>().ok().map(|v| Complex64::new(v, 0.0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence() {
        let expr = Parser::new("1+2*3").unwrap().parse().unwrap();
        assert!(matches!(expr, Expr::Add(_, ref rhs) if matches!(**rhs, Expr::Mul(_, _))));
    }

    #[test]
    fn test_node_voltage_and_refdes() {
        let expr = Parser::new("V(12)-V1").unwrap().parse().unwrap();
        match expr {
            Expr::Sub(lhs, rhs) => {
                assert_eq!(*lhs, Expr::Symbol(Symbol::NodeVoltage(NodeId(12))));
                assert_eq!(*rhs, Expr::Symbol(Symbol::Component("V1".to_string())));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_errors_carry_columns() {
        assert!(matches!(
            Parser::new("(V(1)+2").unwrap().parse(),
            Err(NodalError::ExpressionError { column: 8, .. })
        ));
        assert!(matches!(
            Parser::new("V(x)").unwrap().parse(),
            Err(NodalError::ExpressionError { .. })
        ));
        assert!(matches!(
            Parser::new("1 2").unwrap().parse(),
            Err(NodalError::ExpressionError { column: 3, .. })
        ));
    }
}
