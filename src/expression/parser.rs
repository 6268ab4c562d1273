//! Recursive-descent parser producing a typed expression tree
//!
//! Grammar (lowest to highest precedence):
//!
//! ```text
//! or         := and ( "or" and )*
//! and        := not ( "and" not )*
//! not        := "not" not | comparison
//! comparison := additive ( cmp additive )*
//! additive   := term ( ("+" | "-") term )*
//! term       := unary ( ("*" | "/") unary )*
//! unary      := ("-" | "+") unary | primary
//! primary    := NUMBER | IDENT | IDENT "(" args ")" | "(" or ")"
//! ```
//!
//! Comparisons chain: `a < b <= c` means `a < b and b <= c`.

use super::lexer::{Token, TokenKind};
use super::{ExpressionError, Function, Scope, ValueKind, Variable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl CmpOp {
    pub fn apply(self, lhs: f64, rhs: f64) -> bool {
        match self {
            CmpOp::Lt => lhs < rhs,
            CmpOp::Le => lhs <= rhs,
            CmpOp::Gt => lhs > rhs,
            CmpOp::Ge => lhs >= rhs,
            CmpOp::Eq => lhs == rhs,
            CmpOp::Ne => lhs != rhs,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
}

/// Expression tree. Only numeric literals, allow-listed variables and
/// functions can appear; there is no way to name anything else.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Var(Variable),
    Neg(Box<Expr>),
    Arith {
        op: ArithOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Compare {
        first: Box<Expr>,
        rest: Vec<(CmpOp, Expr)>,
    },
    Logic {
        op: LogicOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Not(Box<Expr>),
    Call {
        function: Function,
        args: Vec<Expr>,
    },
}

impl Expr {
    /// Static result kind; operand kinds were checked while parsing
    pub fn kind(&self) -> ValueKind {
        match self {
            Expr::Number(_)
            | Expr::Var(_)
            | Expr::Neg(_)
            | Expr::Arith { .. }
            | Expr::Call { .. } => ValueKind::Number,
            Expr::Compare { .. } | Expr::Logic { .. } | Expr::Not(_) => ValueKind::Boolean,
        }
    }
}

/// Parse a token stream into an expression tree valid in `scope`
pub fn parse(tokens: &[Token], scope: Scope, source_len: usize) -> Result<Expr, ExpressionError> {
    if tokens.is_empty() {
        return Err(ExpressionError::Empty);
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        scope,
        source_len,
    };
    let expr = parser.parse_or()?;
    if let Some(token) = parser.peek() {
        return Err(ExpressionError::UnexpectedToken {
            found: token.kind.describe(),
            offset: token.offset,
        });
    }
    Ok(expr)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    scope: Scope,
    source_len: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn offset(&self) -> usize {
        self.peek().map(|t| t.offset).unwrap_or(self.source_len)
    }

    fn expect(&mut self, expected: TokenKind) -> Result<(), ExpressionError> {
        match self.advance() {
            Some(token) if token.kind == expected => Ok(()),
            Some(token) => Err(ExpressionError::UnexpectedToken {
                found: token.kind.describe(),
                offset: token.offset,
            }),
            None => Err(ExpressionError::UnexpectedEnd {
                expected: expected.describe(),
            }),
        }
    }

    fn require(expr: &Expr, expected: ValueKind, offset: usize) -> Result<(), ExpressionError> {
        if expr.kind() == expected {
            Ok(())
        } else {
            Err(ExpressionError::TypeMismatch {
                expected,
                found: expr.kind(),
                offset,
            })
        }
    }

    fn parse_or(&mut self) -> Result<Expr, ExpressionError> {
        let offset = self.offset();
        let mut lhs = self.parse_and()?;
        while matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Or)) {
            self.advance();
            let rhs_offset = self.offset();
            let rhs = self.parse_and()?;
            Self::require(&lhs, ValueKind::Boolean, offset)?;
            Self::require(&rhs, ValueKind::Boolean, rhs_offset)?;
            lhs = Expr::Logic {
                op: LogicOp::Or,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, ExpressionError> {
        let offset = self.offset();
        let mut lhs = self.parse_not()?;
        while matches!(self.peek().map(|t| &t.kind), Some(TokenKind::And)) {
            self.advance();
            let rhs_offset = self.offset();
            let rhs = self.parse_not()?;
            Self::require(&lhs, ValueKind::Boolean, offset)?;
            Self::require(&rhs, ValueKind::Boolean, rhs_offset)?;
            lhs = Expr::Logic {
                op: LogicOp::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expr, ExpressionError> {
        if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Not)) {
            self.advance();
            let offset = self.offset();
            let inner = self.parse_not()?;
            Self::require(&inner, ValueKind::Boolean, offset)?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ExpressionError> {
        let offset = self.offset();
        let first = self.parse_additive()?;
        let mut rest = Vec::new();

        loop {
            let op = match self.peek().map(|t| &t.kind) {
                Some(TokenKind::Lt) => CmpOp::Lt,
                Some(TokenKind::Le) => CmpOp::Le,
                Some(TokenKind::Gt) => CmpOp::Gt,
                Some(TokenKind::Ge) => CmpOp::Ge,
                Some(TokenKind::EqEq) => CmpOp::Eq,
                Some(TokenKind::NotEq) => CmpOp::Ne,
                _ => break,
            };
            self.advance();
            let rhs_offset = self.offset();
            let rhs = self.parse_additive()?;
            Self::require(&rhs, ValueKind::Number, rhs_offset)?;
            rest.push((op, rhs));
        }

        if rest.is_empty() {
            return Ok(first);
        }
        Self::require(&first, ValueKind::Number, offset)?;
        Ok(Expr::Compare {
            first: Box::new(first),
            rest,
        })
    }

    fn parse_additive(&mut self) -> Result<Expr, ExpressionError> {
        let offset = self.offset();
        let mut lhs = self.parse_term()?;
        loop {
            let op = match self.peek().map(|t| &t.kind) {
                Some(TokenKind::Plus) => ArithOp::Add,
                Some(TokenKind::Minus) => ArithOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs_offset = self.offset();
            let rhs = self.parse_term()?;
            Self::require(&lhs, ValueKind::Number, offset)?;
            Self::require(&rhs, ValueKind::Number, rhs_offset)?;
            lhs = Expr::Arith {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_term(&mut self) -> Result<Expr, ExpressionError> {
        let offset = self.offset();
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek().map(|t| &t.kind) {
                Some(TokenKind::Star) => ArithOp::Mul,
                Some(TokenKind::Slash) => ArithOp::Div,
                _ => break,
            };
            self.advance();
            let rhs_offset = self.offset();
            let rhs = self.parse_unary()?;
            Self::require(&lhs, ValueKind::Number, offset)?;
            Self::require(&rhs, ValueKind::Number, rhs_offset)?;
            lhs = Expr::Arith {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ExpressionError> {
        match self.peek().map(|t| &t.kind) {
            Some(TokenKind::Minus) => {
                self.advance();
                let offset = self.offset();
                let inner = self.parse_unary()?;
                Self::require(&inner, ValueKind::Number, offset)?;
                Ok(Expr::Neg(Box::new(inner)))
            }
            Some(TokenKind::Plus) => {
                self.advance();
                let offset = self.offset();
                let inner = self.parse_unary()?;
                Self::require(&inner, ValueKind::Number, offset)?;
                Ok(inner)
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ExpressionError> {
        let token = self.advance().ok_or_else(|| ExpressionError::UnexpectedEnd {
            expected: "a number, variable or '('".into(),
        })?;

        match &token.kind {
            TokenKind::Number(value) => Ok(Expr::Number(*value)),
            TokenKind::LParen => {
                let inner = self.parse_or()?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::Ident(name) => {
                if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::LParen)) {
                    self.advance();
                    self.parse_call(name, token.offset)
                } else {
                    let variable = Variable::from_name(name)
                        .filter(|v| self.scope.allows(*v))
                        .ok_or_else(|| ExpressionError::UnknownIdentifier {
                            name: name.clone(),
                            offset: token.offset,
                            scope: self.scope,
                        })?;
                    Ok(Expr::Var(variable))
                }
            }
            other => Err(ExpressionError::UnexpectedToken {
                found: other.describe(),
                offset: token.offset,
            }),
        }
    }

    fn parse_call(&mut self, name: &str, offset: usize) -> Result<Expr, ExpressionError> {
        let function = Function::from_name(name).ok_or_else(|| ExpressionError::UnknownFunction {
            name: name.to_string(),
            offset,
        })?;

        let mut args = Vec::new();
        if !matches!(self.peek().map(|t| &t.kind), Some(TokenKind::RParen)) {
            loop {
                let arg_offset = self.offset();
                let arg = self.parse_or()?;
                Self::require(&arg, ValueKind::Number, arg_offset)?;
                args.push(arg);
                if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Comma)) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;

        if args.len() != function.arity() {
            return Err(ExpressionError::Arity {
                function: function.name(),
                expected: function.arity(),
                found: args.len(),
            });
        }
        Ok(Expr::Call { function, args })
    }
}
