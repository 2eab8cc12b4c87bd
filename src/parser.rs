//! Recursive-descent parser for the expression language.
//!
//! Precedence, lowest to highest:
//!
//! ```text
//! expr       := ternary ('||' ternary)*
//! ternary    := and_expr ('?' and_expr ':' and_expr)?
//! and_expr   := comparison ('&&' comparison)*
//! comparison := primary (('=='|'!='|'>'|'<'|'>='|'<=') primary)*
//! primary    := '!' primary | Ident | Int | Float | Str | Dollar
//!             | '(' expr ')' | Ident '(' expr* ')'
//! ```
//!
//! There is no arithmetic; the grammar targets boolean test attributes and
//! the ternary idiom inside placeholders. Call arguments are bare
//! expressions up to the closing parenthesis, because the lexer drops
//! commas. Tokens left over after a complete expression are ignored.

use crate::ast::{BinOp, Expr, UnaryOp};
use crate::error::{Error, Result};
use crate::lexer::{tokenize, Op, Token};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

/// Tokenize and parse an expression string.
pub fn parse(input: &str) -> Result<Expr> {
    Parser::new(tokenize(input)).expr()
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Parser {
        Parser { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn consume(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat_op(&mut self, op: Op) -> bool {
        if self.peek() == Some(&Token::Op(op)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub fn expr(&mut self) -> Result<Expr> {
        let mut node = self.ternary()?;
        while self.eat_op(Op::OrOr) {
            let right = self.ternary()?;
            node = Expr::Binary {
                op: BinOp::Or,
                left: Box::new(node),
                right: Box::new(right),
            };
        }
        Ok(node)
    }

    fn ternary(&mut self) -> Result<Expr> {
        let cond = self.and_expr()?;
        if self.peek() != Some(&Token::Question) {
            return Ok(cond);
        }
        self.consume();
        let then = self.and_expr()?;
        if self.peek() != Some(&Token::Colon) {
            return Err(Error::Parse(
                "ternary `?` without matching `:`".to_string(),
            ));
        }
        self.consume();
        let otherwise = self.and_expr()?;
        Ok(Expr::Ternary {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    fn and_expr(&mut self) -> Result<Expr> {
        let mut node = self.comparison()?;
        while self.eat_op(Op::AndAnd) {
            let right = self.comparison()?;
            node = Expr::Binary {
                op: BinOp::And,
                left: Box::new(node),
                right: Box::new(right),
            };
        }
        Ok(node)
    }

    fn comparison(&mut self) -> Result<Expr> {
        let mut node = self.primary()?;
        while let Some(&Token::Op(op)) = self.peek() {
            let bin = match op {
                Op::Eq => BinOp::Eq,
                Op::Ne => BinOp::Ne,
                Op::Gt => BinOp::Gt,
                Op::Lt => BinOp::Lt,
                Op::Ge => BinOp::Ge,
                Op::Le => BinOp::Le,
                _ => break,
            };
            self.consume();
            let right = self.primary()?;
            node = Expr::Binary {
                op: bin,
                left: Box::new(node),
                right: Box::new(right),
            };
        }
        Ok(node)
    }

    fn primary(&mut self) -> Result<Expr> {
        match self.consume() {
            Some(Token::Op(Op::Not)) => {
                let operand = self.primary()?;
                Ok(Expr::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                })
            }
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    self.consume();
                    self.call(name)
                } else {
                    Ok(Expr::Ident(name))
                }
            }
            Some(Token::Int(n)) => Ok(Expr::Int(n)),
            Some(Token::Float(f)) => Ok(Expr::Float(f)),
            Some(Token::Str(s)) => Ok(Expr::Str(s)),
            Some(Token::Dollar(name)) => Ok(Expr::Dollar(name)),
            Some(Token::LParen) => {
                let node = self.expr()?;
                if self.consume() != Some(Token::RParen) {
                    return Err(Error::Parse(
                        "missing closing parenthesis".to_string(),
                    ));
                }
                Ok(node)
            }
            Some(token) => Err(Error::Parse(format!(
                "unexpected token {:?}",
                token
            ))),
            None => Err(Error::Parse("unexpected end of expression".to_string())),
        }
    }

    fn call(&mut self, name: String) -> Result<Expr> {
        let mut args = Vec::new();
        loop {
            match self.peek() {
                Some(Token::RParen) => {
                    self.consume();
                    return Ok(Expr::Call { name, args });
                }
                Some(_) => args.push(self.expr()?),
                None => {
                    return Err(Error::Parse(format!(
                        "unterminated argument list for `{}`",
                        name
                    )))
                }
            }
        }
    }
}
