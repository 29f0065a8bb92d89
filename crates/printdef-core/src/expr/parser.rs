//! Precedence-climbing parser over the token stream produced by
//! [`super::lexer`].
//!
//! The reference implementation drives a single shared shunting-yard stack
//! for every precedence level, including the comma that joins a function
//! call's arguments. We split the comma-joined argument list out into its
//! own production (`parse_args`) instead of threading it through the
//! binary-operator climb — same grammar, fewer moving parts.

use crate::error::CoreError;
use crate::value::Value;

use super::catalogue::{self, Category};
use super::lexer::Token;
use super::Deps;

/// Which scope(s) a plain variable reference's dependency gets recorded
/// under, per §4.4's macro-scoped dependency rules.
#[derive(Debug, Clone)]
pub enum DepMode {
    /// Every known extruder scope (the default, and also what
    /// `extruderValue`/`extruderValues` use for their reparsed argument).
    AllExtruders,
    /// Exactly the scope owning the setting under parse — what
    /// `resolveOrValue` narrows its reparsed argument to.
    Single(String),
}

pub struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    owning_scope: &'a str,
    extruder_scopes: &'a [String],
    dep_mode: DepMode,
    deps: Deps,
}

fn parse_err(message: impl Into<String>) -> CoreError {
    CoreError::ExprParse { message: message.into() }
}

impl<'a> Parser<'a> {
    pub fn new(tokens: Vec<Token>, owning_scope: &'a str, extruder_scopes: &'a [String], dep_mode: DepMode) -> Self {
        Self { tokens, pos: 0, owning_scope, extruder_scopes, dep_mode, deps: Deps::new() }
    }

    pub fn into_deps(self) -> Deps {
        self.deps
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, expected: &Token) -> Result<(), CoreError> {
        match self.advance() {
            Some(ref tok) if tok == expected => Ok(()),
            Some(other) => Err(parse_err(format!("expected {expected:?}, found {other:?}"))),
            None => Err(parse_err(format!("expected {expected:?}, found end of expression"))),
        }
    }

    fn record_dep(&mut self, name: &str) {
        match &self.dep_mode {
            DepMode::AllExtruders => {
                for scope in self.extruder_scopes {
                    self.deps.entry(scope.clone()).or_default().insert(name.to_owned());
                }
            }
            DepMode::Single(scope) => {
                self.deps.entry(scope.clone()).or_default().insert(name.to_owned());
            }
        }
    }

    /// Parses the whole token stream as one expression; errors if tokens
    /// remain afterward.
    pub fn parse_program(&mut self) -> Result<Value, CoreError> {
        let expr = self.parse_ternary()?;
        if let Some(tok) = self.peek() {
            return Err(parse_err(format!("unexpected trailing token {tok:?}")));
        }
        Ok(expr)
    }

    // IFE: `then if cond else other` -> if(then, cond, other), right-assoc.
    fn parse_ternary(&mut self) -> Result<Value, CoreError> {
        let then_branch = self.parse_logical()?;
        if matches!(self.peek(), Some(Token::If)) {
            self.advance();
            let cond = self.parse_logical()?;
            self.expect(&Token::Else)?;
            let else_branch = self.parse_ternary()?;
            return Ok(Value::call("if", vec![then_branch, cond, else_branch]));
        }
        Ok(then_branch)
    }

    // LOG: or, and — left-assoc.
    fn parse_logical(&mut self) -> Result<Value, CoreError> {
        let mut left = self.parse_not()?;
        loop {
            let op = match self.peek() {
                Some(Token::Or) => "or",
                Some(Token::And) => "and",
                _ => break,
            };
            self.advance();
            let right = self.parse_not()?;
            left = Value::call(op, vec![left, right]);
        }
        Ok(left)
    }

    // ULG: unary `not`.
    fn parse_not(&mut self) -> Result<Value, CoreError> {
        if matches!(self.peek(), Some(Token::Not)) {
            self.advance();
            let operand = self.parse_not()?;
            return Ok(Value::call("not", vec![operand]));
        }
        self.parse_comparison()
    }

    // CMP: < > <= >= == != — left-assoc.
    fn parse_comparison(&mut self) -> Result<Value, CoreError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => "<",
                Some(Token::Gt) => ">",
                Some(Token::Le) => "<=",
                Some(Token::Ge) => ">=",
                Some(Token::EqEq) => "==",
                Some(Token::NotEq) => "!=",
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = Value::call(op, vec![left, right]);
        }
        Ok(left)
    }

    // ADD: binary + - — left-assoc.
    fn parse_additive(&mut self) -> Result<Value, CoreError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => "+",
                Some(Token::Minus) => "-",
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Value::call(op, vec![left, right]);
        }
        Ok(left)
    }

    // MUL: * / — left-assoc.
    fn parse_multiplicative(&mut self) -> Result<Value, CoreError> {
        let mut left = self.parse_exponent()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => "*",
                Some(Token::Slash) => "/",
                _ => break,
            };
            self.advance();
            let right = self.parse_exponent()?;
            left = Value::call(op, vec![left, right]);
        }
        Ok(left)
    }

    // EXP: ** — right-assoc, binds tighter than unary sign per the table.
    fn parse_exponent(&mut self) -> Result<Value, CoreError> {
        let left = self.parse_unary()?;
        if matches!(self.peek(), Some(Token::StarStar)) {
            self.advance();
            let right = self.parse_exponent()?;
            return Ok(Value::call("**", vec![left, right]));
        }
        Ok(left)
    }

    // UNA: unary + - , tightest binding, only at an operand position.
    fn parse_unary(&mut self) -> Result<Value, CoreError> {
        let op = match self.peek() {
            Some(Token::Plus) => Some("+"),
            Some(Token::Minus) => Some("-"),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Value::call(op, vec![operand]));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Value, CoreError> {
        match self.advance() {
            Some(Token::Integer(i)) => Ok(Value::Integer(i)),
            Some(Token::Float(f)) => Ok(Value::Float(f)),
            Some(Token::Str(s)) => Ok(Value::String(s)),
            Some(Token::Null) => Ok(Value::Null),
            Some(Token::True) => Ok(Value::Boolean(true)),
            Some(Token::False) => Ok(Value::Boolean(false)),
            Some(Token::LParen) => {
                let inner = self.parse_ternary()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => {
                if matches!(self.peek(), Some(Token::LParen)) {
                    self.advance();
                    let args = self.parse_args()?;
                    self.finish_call(name, args)
                } else {
                    self.record_dep(&name);
                    Ok(Value::variable(name))
                }
            }
            Some(tok) => Err(parse_err(format!("unexpected token {tok:?}"))),
            None => Err(parse_err("unexpected end of expression")),
        }
    }

    fn parse_args(&mut self) -> Result<Vec<Value>, CoreError> {
        let mut args = Vec::new();
        if matches!(self.peek(), Some(Token::RParen)) {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.parse_ternary()?);
            match self.peek() {
                Some(Token::Comma) => {
                    self.advance();
                }
                Some(Token::RParen) => {
                    self.advance();
                    break;
                }
                Some(tok) => return Err(parse_err(format!("expected ',' or ')', found {tok:?}"))),
                None => return Err(parse_err("unterminated argument list")),
            }
        }
        Ok(args)
    }

    /// Validates arity against the catalogue and, for the three
    /// scope-changing macros, re-parses the last argument (when it is a
    /// string literal) under that macro's dependency scope.
    fn finish_call(&mut self, name: String, mut args: Vec<Value>) -> Result<Value, CoreError> {
        catalogue::check_arity(&name, args.len())?;

        if matches!(catalogue::category(&name), Some(Category::Macro)) {
            if let Some(last) = args.pop() {
                let reparsed = self.reparse_macro_argument(&name, last)?;
                args.push(reparsed);
            }
        }

        Ok(Value::call(name, args))
    }

    /// `if` is a macro in the catalogue (it can also appear as a literal
    /// `if(then, cond, else)` call, not only via the ternary surface
    /// syntax) but has no reparsed-string argument; only the extruder/
    /// resolve macros do.
    fn reparse_macro_argument(&mut self, name: &str, arg: Value) -> Result<Value, CoreError> {
        let mode = match name {
            "extruderValue" | "extruderValues" => DepMode::AllExtruders,
            "resolveOrValue" => DepMode::Single(self.owning_scope.to_owned()),
            _ => return Ok(arg),
        };

        let text = match &arg {
            Value::String(s) => s.clone(),
            _ => return Ok(arg),
        };

        let tokens = super::lexer::lex(&text)?;
        let mut nested = Parser::new(tokens, self.owning_scope, self.extruder_scopes, mode);
        let parsed = nested.parse_program()?;
        for (scope, names) in nested.into_deps() {
            self.deps.entry(scope).or_default().extend(names);
        }
        Ok(parsed)
    }
}
