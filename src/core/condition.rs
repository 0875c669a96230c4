//! Step condition expressions (`if:`)
//!
//! A small expression language evaluated against the run's variables:
//!
//! ```text
//! startsWith(github.ref, 'refs/tags/') && ref_name != 'nightly'
//! ```

use std::collections::HashMap;
use thiserror::Error;

/// Error raised while parsing a condition
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConditionError {
    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("unterminated string literal starting at position {0}")]
    UnterminatedString(usize),

    #[error("unexpected token {found} (expected {expected})")]
    UnexpectedToken { found: String, expected: String },

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("function '{name}' takes {expected} arguments, got {found}")]
    Arity {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("empty condition")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Str(String),
    True,
    False,
    Eq,
    Ne,
    Not,
    And,
    Or,
    LParen,
    RParen,
    Comma,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("identifier '{}'", name),
            Token::Str(s) => format!("string '{}'", s),
            Token::True => "'true'".to_string(),
            Token::False => "'false'".to_string(),
            Token::Eq => "'=='".to_string(),
            Token::Ne => "'!='".to_string(),
            Token::Not => "'!'".to_string(),
            Token::And => "'&&'".to_string(),
            Token::Or => "'||'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::Comma => "','".to_string(),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, ConditionError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '=' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Eq);
                i += 2;
            }
            '!' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Ne);
                i += 2;
            }
            '!' => {
                tokens.push(Token::Not);
                i += 1;
            }
            '&' if chars.get(i + 1) == Some(&'&') => {
                tokens.push(Token::And);
                i += 2;
            }
            '|' if chars.get(i + 1) == Some(&'|') => {
                tokens.push(Token::Or);
                i += 2;
            }
            '\'' | '"' => {
                let quote = c;
                let start = i;
                let mut value = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err(ConditionError::UnterminatedString(start)),
                        // '' inside a single-quoted literal is an escaped quote
                        Some(&ch) if ch == quote && chars.get(i + 1) == Some(&quote) => {
                            value.push(quote);
                            i += 2;
                        }
                        Some(&ch) if ch == quote => {
                            i += 1;
                            break;
                        }
                        Some(&ch) => {
                            value.push(ch);
                            i += 1;
                        }
                    }
                }
                tokens.push(Token::Str(value));
            }
            c if c.is_alphanumeric() || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || matches!(chars[i], '_' | '.' | '-'))
                {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                tokens.push(match word.as_str() {
                    "true" => Token::True,
                    "false" => Token::False,
                    _ => Token::Ident(word),
                });
            }
            other => return Err(ConditionError::UnexpectedChar { ch: other, pos: i }),
        }
    }

    Ok(tokens)
}

/// Built-in string predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    StartsWith,
    EndsWith,
    Contains,
}

impl Function {
    fn lookup(name: &str) -> Option<Self> {
        match name {
            "startsWith" => Some(Function::StartsWith),
            "endsWith" => Some(Function::EndsWith),
            "contains" => Some(Function::Contains),
            _ => None,
        }
    }

    fn apply(&self, haystack: &str, needle: &str) -> bool {
        match self {
            Function::StartsWith => haystack.starts_with(needle),
            Function::EndsWith => haystack.ends_with(needle),
            Function::Contains => haystack.contains(needle),
        }
    }
}

/// Parsed condition expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Literal(String),
    Bool(bool),
    Var(String),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Eq(Box<Expr>, Box<Expr>),
    Ne(Box<Expr>, Box<Expr>),
    Call(Function, Box<Expr>, Box<Expr>),
}

/// Evaluated value
#[derive(Debug, Clone, PartialEq, Eq)]
enum Value {
    Str(String),
    Bool(bool),
}

impl Value {
    fn truthy(&self) -> bool {
        match self {
            Value::Str(s) => !s.is_empty(),
            Value::Bool(b) => *b,
        }
    }

    fn into_string(self) -> String {
        match self {
            Value::Str(s) => s,
            Value::Bool(b) => b.to_string(),
        }
    }
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
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), ConditionError> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(ConditionError::UnexpectedToken {
                found: token.describe(),
                expected: expected.describe(),
            }),
            None => Err(ConditionError::UnexpectedEnd),
        }
    }

    fn parse_or(&mut self) -> Result<Expr, ConditionError> {
        let mut lhs = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, ConditionError> {
        let mut lhs = self.parse_comparison()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let rhs = self.parse_comparison()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ConditionError> {
        let lhs = self.parse_unary()?;
        match self.peek() {
            Some(Token::Eq) => {
                self.pos += 1;
                let rhs = self.parse_unary()?;
                Ok(Expr::Eq(Box::new(lhs), Box::new(rhs)))
            }
            Some(Token::Ne) => {
                self.pos += 1;
                let rhs = self.parse_unary()?;
                Ok(Expr::Ne(Box::new(lhs), Box::new(rhs)))
            }
            _ => Ok(lhs),
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, ConditionError> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            let inner = self.parse_unary()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ConditionError> {
        match self.next() {
            Some(Token::Str(s)) => Ok(Expr::Literal(s)),
            Some(Token::True) => Ok(Expr::Bool(true)),
            Some(Token::False) => Ok(Expr::Bool(false)),
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    self.pos += 1;
                    self.parse_call(name)
                } else {
                    Ok(Expr::Var(name))
                }
            }
            Some(token) => Err(ConditionError::UnexpectedToken {
                found: token.describe(),
                expected: "a value".to_string(),
            }),
            None => Err(ConditionError::UnexpectedEnd),
        }
    }

    fn parse_call(&mut self, name: String) -> Result<Expr, ConditionError> {
        let function =
            Function::lookup(&name).ok_or_else(|| ConditionError::UnknownFunction(name.clone()))?;

        let mut args = Vec::new();
        if self.peek() != Some(&Token::RParen) {
            loop {
                args.push(self.parse_or()?);
                if self.peek() == Some(&Token::Comma) {
                    self.pos += 1;
                } else {
                    break;
                }
            }
        }
        self.expect(Token::RParen)?;

        if args.len() != 2 {
            return Err(ConditionError::Arity {
                name,
                expected: 2,
                found: args.len(),
            });
        }
        let needle = args.pop().ok_or(ConditionError::UnexpectedEnd)?;
        let haystack = args.pop().ok_or(ConditionError::UnexpectedEnd)?;
        Ok(Expr::Call(function, Box::new(haystack), Box::new(needle)))
    }
}

/// A parsed `if:` condition together with its source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    source: String,
    expr: Expr,
}

impl Condition {
    /// Parse a condition; a surrounding `${{ ... }}` is accepted
    pub fn parse(source: &str) -> Result<Self, ConditionError> {
        let trimmed = source.trim();
        let inner = trimmed
            .strip_prefix("${{")
            .and_then(|s| s.strip_suffix("}}"))
            .unwrap_or(trimmed)
            .trim();

        let tokens = tokenize(inner)?;
        if tokens.is_empty() {
            return Err(ConditionError::Empty);
        }

        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.parse_or()?;
        if let Some(token) = parser.next() {
            return Err(ConditionError::UnexpectedToken {
                found: token.describe(),
                expected: "end of expression".to_string(),
            });
        }

        Ok(Self {
            source: inner.to_string(),
            expr,
        })
    }

    /// The condition text (without a `${{ }}` wrapper)
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate against the run's variables. Unknown identifiers are empty strings.
    pub fn evaluate(&self, vars: &HashMap<String, String>) -> bool {
        eval(&self.expr, vars).truthy()
    }
}

fn lookup_var(name: &str, vars: &HashMap<String, String>) -> String {
    let key = name.strip_prefix("github.").unwrap_or(name);
    vars.get(key).cloned().unwrap_or_default()
}

fn eval(expr: &Expr, vars: &HashMap<String, String>) -> Value {
    match expr {
        Expr::Literal(s) => Value::Str(s.clone()),
        Expr::Bool(b) => Value::Bool(*b),
        Expr::Var(name) => Value::Str(lookup_var(name, vars)),
        Expr::Not(inner) => Value::Bool(!eval(inner, vars).truthy()),
        Expr::And(lhs, rhs) => Value::Bool(eval(lhs, vars).truthy() && eval(rhs, vars).truthy()),
        Expr::Or(lhs, rhs) => Value::Bool(eval(lhs, vars).truthy() || eval(rhs, vars).truthy()),
        Expr::Eq(lhs, rhs) => Value::Bool(
            eval(lhs, vars).into_string() == eval(rhs, vars).into_string(),
        ),
        Expr::Ne(lhs, rhs) => Value::Bool(
            eval(lhs, vars).into_string() != eval(rhs, vars).into_string(),
        ),
        Expr::Call(function, haystack, needle) => {
            let haystack = eval(haystack, vars).into_string();
            let needle = eval(needle, vars).into_string();
            Value::Bool(function.apply(&haystack, &needle))
        }
    }
}
