//! Small math-expression evaluator for prescribed boundary values.
//!
//! Grammar (lowest to highest precedence):
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := unary (('*' | '/') unary)*
//! unary  := '-' unary | power
//! power  := atom ('^' unary)?
//! atom   := number | ident | ident '(' expr ')' | '(' expr ')'
//! ```
//!
//! Identifiers are variables set with [`ExpressionEvaluator::set_key`], the
//! constant `pi`, or one of the functions `sin cos tan exp log sqrt abs`.

use std::collections::HashMap;

use crate::error::{Error, Result};

/// Evaluates a math expression over named variables
pub trait ExpressionEvaluator {
    fn set_key(&mut self, name: &str, value: f64);

    /// Parse `expression`; variables are resolved at evaluation time
    fn set_expression(&mut self, expression: &str) -> Result<()>;

    fn eval(&self) -> Result<f64>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Func {
    Sin,
    Cos,
    Tan,
    Exp,
    Log,
    Sqrt,
    Abs,
}

impl Func {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "sin" => Func::Sin,
            "cos" => Func::Cos,
            "tan" => Func::Tan,
            "exp" => Func::Exp,
            "log" => Func::Log,
            "sqrt" => Func::Sqrt,
            "abs" => Func::Abs,
            _ => return None,
        })
    }

    fn apply(self, x: f64) -> f64 {
        match self {
            Func::Sin => x.sin(),
            Func::Cos => x.cos(),
            Func::Tan => x.tan(),
            Func::Exp => x.exp(),
            Func::Log => x.ln(),
            Func::Sqrt => x.sqrt(),
            Func::Abs => x.abs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Number(f64),
    Var(String),
    Neg(Box<Expr>),
    Binary(char, Box<Expr>, Box<Expr>),
    Call(Func, Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Op(char),
    LParen,
    RParen,
}

fn tokenize(src: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' => i += 1,
            '+' | '-' | '*' | '/' | '^' => {
                tokens.push(Token::Op(c));
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            _ if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                // exponent, e.g. 1.5e-3
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        i = j;
                        while i < chars.len() && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
                let text: String = chars[start..i].iter().collect();
                let value = text
                    .parse::<f64>()
                    .map_err(|_| Error::Expression(format!("invalid number '{}'", text)))?;
                tokens.push(Token::Number(value));
            }
            _ if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            _ => return Err(Error::Expression(format!("unexpected character '{}'", c))),
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn expr(&mut self) -> Result<Expr> {
        let mut lhs = self.term()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek().cloned() {
            self.pos += 1;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(self.term()?));
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr> {
        let mut lhs = self.unary()?;
        while let Some(Token::Op(op @ ('*' | '/'))) = self.peek().cloned() {
            self.pos += 1;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(self.unary()?));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr> {
        match self.peek() {
            Some(Token::Op('-')) => {
                self.pos += 1;
                Ok(Expr::Neg(Box::new(self.unary()?)))
            }
            Some(Token::Op('+')) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<Expr> {
        let base = self.atom()?;
        if let Some(Token::Op('^')) = self.peek() {
            self.pos += 1;
            // right associative: 2^3^2 = 2^9
            return Ok(Expr::Binary('^', Box::new(base), Box::new(self.unary()?)));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Expr> {
        match self.next() {
            Some(Token::Number(v)) => Ok(Expr::Number(v)),
            Some(Token::Ident(name)) => {
                if let Some(Token::LParen) = self.peek() {
                    let func = Func::from_name(&name)
                        .ok_or_else(|| Error::Expression(format!("unknown function '{}'", name)))?;
                    self.pos += 1;
                    let arg = self.expr()?;
                    self.expect_rparen()?;
                    Ok(Expr::Call(func, Box::new(arg)))
                } else {
                    Ok(Expr::Var(name))
                }
            }
            Some(Token::LParen) => {
                let inner = self.expr()?;
                self.expect_rparen()?;
                Ok(inner)
            }
            Some(tok) => Err(Error::Expression(format!("unexpected token {:?}", tok))),
            None => Err(Error::Expression("unexpected end of expression".into())),
        }
    }

    fn expect_rparen(&mut self) -> Result<()> {
        match self.next() {
            Some(Token::RParen) => Ok(()),
            _ => Err(Error::Expression("missing ')'".into())),
        }
    }
}

fn parse(src: &str) -> Result<Expr> {
    let mut parser = Parser { tokens: tokenize(src)?, pos: 0 };
    let expr = parser.expr()?;
    if let Some(tok) = parser.peek() {
        return Err(Error::Expression(format!("trailing token {:?}", tok)));
    }
    Ok(expr)
}

/// Recursive-descent [`ExpressionEvaluator`]
#[derive(Debug, Clone, Default)]
pub struct MathExpression {
    keys: HashMap<String, f64>,
    ast: Option<Expr>,
}

impl MathExpression {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `expression` right away
    pub fn parse(expression: &str) -> Result<Self> {
        let mut expr = Self::new();
        expr.set_expression(expression)?;
        Ok(expr)
    }

    fn eval_node(&self, node: &Expr) -> Result<f64> {
        Ok(match node {
            Expr::Number(v) => *v,
            Expr::Var(name) => match self.keys.get(name) {
                Some(&v) => v,
                None if name == "pi" => std::f64::consts::PI,
                None => return Err(Error::Expression(format!("undefined variable '{}'", name))),
            },
            Expr::Neg(inner) => -self.eval_node(inner)?,
            Expr::Call(func, arg) => func.apply(self.eval_node(arg)?),
            Expr::Binary(op, lhs, rhs) => {
                let (a, b) = (self.eval_node(lhs)?, self.eval_node(rhs)?);
                match op {
                    '+' => a + b,
                    '-' => a - b,
                    '*' => a * b,
                    '/' => a / b,
                    _ => a.powf(b),
                }
            }
        })
    }
}

impl ExpressionEvaluator for MathExpression {
    fn set_key(&mut self, name: &str, value: f64) {
        self.keys.insert(name.to_string(), value);
    }

    fn set_expression(&mut self, expression: &str) -> Result<()> {
        self.ast = Some(parse(expression)?);
        Ok(())
    }

    fn eval(&self) -> Result<f64> {
        let ast = self
            .ast
            .as_ref()
            .ok_or_else(|| Error::Expression("no expression set".into()))?;
        self.eval_node(ast)
    }
}
