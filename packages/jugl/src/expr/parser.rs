//! Recursive descent parser for template expressions
//!
//! Precedence, lowest first: conditional (`?:`), `||`, `&&`, equality, relational, additive,
//! multiplicative, prefix, then member access and calls.

use super::ast::{BinaryOp, Expr, LogicalOp, UnaryOp};
use super::lexer::{Token, TokenType, tokenize};
use crate::error::{EvalError, EvalResult};
use crate::value::Value;

/// How deeply sub-expressions may nest before parsing gives up.
const MAX_DEPTH: usize = 128;

pub fn parse_expression(input: &str) -> EvalResult<Expr> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens,
        index: 0,
        input_len: input.len(),
        depth: 0,
    };
    if parser.tokens.is_empty() {
        return Err(EvalError::syntax("empty expression", 0));
    }
    let expr = parser.parse_conditional()?;
    if let Some(token) = parser.current() {
        return Err(EvalError::syntax(
            format!("unexpected token '{}'", token.str_value),
            token.index,
        ));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    index: usize,
    input_len: usize,
    /// Nesting of the node being built, bounding the recursion of the parser and of everything
    /// walking the resulting tree
    depth: usize,
}

impl Parser {
    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.index)
    }

    fn advance(&mut self) {
        self.index += 1;
    }

    fn input_index(&self) -> usize {
        self.current()
            .map(|token| token.index)
            .unwrap_or(self.input_len)
    }

    fn consume_optional_character(&mut self, code: char) -> bool {
        if self.current().is_some_and(|token| token.is_character(code)) {
            self.advance();
            return true;
        }
        false
    }

    fn expect_character(&mut self, code: char) -> EvalResult<()> {
        if self.consume_optional_character(code) {
            Ok(())
        } else {
            Err(EvalError::syntax(
                format!("expected '{code}'"),
                self.input_index(),
            ))
        }
    }

    fn descend(&mut self) -> EvalResult<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(EvalError::syntax(
                format!("expression nested more than {MAX_DEPTH} levels deep"),
                self.input_index(),
            ));
        }
        Ok(())
    }

    /// The current token, if it is one of `ops`.
    fn peek_operator(&self, ops: &[&str]) -> Option<String> {
        self.current()
            .filter(|token| token.token_type == TokenType::Operator)
            .filter(|token| ops.contains(&token.str_value.as_str()))
            .map(|token| token.str_value.clone())
    }

    fn parse_conditional(&mut self) -> EvalResult<Expr> {
        let depth = self.depth;
        self.descend()?;
        let test = self.parse_logical_or()?;
        let result = if self.consume_optional_character('?') {
            let consequent = self.parse_conditional()?;
            self.expect_character(':')?;
            let alternate = self.parse_conditional()?;
            Expr::Conditional {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            }
        } else {
            test
        };
        self.depth = depth;
        Ok(result)
    }

    fn parse_logical_or(&mut self) -> EvalResult<Expr> {
        let depth = self.depth;
        let mut result = self.parse_logical_and()?;
        while self.peek_operator(&["||"]).is_some() {
            self.advance();
            self.descend()?;
            let right = self.parse_logical_and()?;
            result = Expr::Logical {
                op: LogicalOp::Or,
                left: Box::new(result),
                right: Box::new(right),
            };
        }
        self.depth = depth;
        Ok(result)
    }

    fn parse_logical_and(&mut self) -> EvalResult<Expr> {
        let depth = self.depth;
        let mut result = self.parse_equality()?;
        while self.peek_operator(&["&&"]).is_some() {
            self.advance();
            self.descend()?;
            let right = self.parse_equality()?;
            result = Expr::Logical {
                op: LogicalOp::And,
                left: Box::new(result),
                right: Box::new(right),
            };
        }
        self.depth = depth;
        Ok(result)
    }

    /// Left-associative binary level: `next (op next)*`
    fn parse_binary_level(
        &mut self,
        ops: &[&str],
        next: fn(&mut Self) -> EvalResult<Expr>,
    ) -> EvalResult<Expr> {
        let depth = self.depth;
        let mut result = next(self)?;
        while let Some(operator) = self.peek_operator(ops) {
            self.advance();
            self.descend()?;
            let right = next(self)?;
            // `ops` only ever holds binary operators
            let Some(op) = BinaryOp::from_operator(&operator) else {
                break;
            };
            result = Expr::Binary {
                op,
                left: Box::new(result),
                right: Box::new(right),
            };
        }
        self.depth = depth;
        Ok(result)
    }

    fn parse_equality(&mut self) -> EvalResult<Expr> {
        self.parse_binary_level(&["==", "!=", "===", "!=="], Self::parse_relational)
    }

    fn parse_relational(&mut self) -> EvalResult<Expr> {
        self.parse_binary_level(&["<", ">", "<=", ">="], Self::parse_additive)
    }

    fn parse_additive(&mut self) -> EvalResult<Expr> {
        self.parse_binary_level(&["+", "-"], Self::parse_multiplicative)
    }

    fn parse_multiplicative(&mut self) -> EvalResult<Expr> {
        self.parse_binary_level(&["*", "/", "%"], Self::parse_prefix)
    }

    fn parse_prefix(&mut self) -> EvalResult<Expr> {
        let op = match self.peek_operator(&["!", "-", "+"]).as_deref() {
            Some("!") => UnaryOp::Not,
            Some("-") => UnaryOp::Minus,
            Some("+") => UnaryOp::Plus,
            _ => return self.parse_call_chain(),
        };
        self.advance();
        let depth = self.depth;
        self.descend()?;
        let operand = self.parse_prefix()?;
        self.depth = depth;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_call_chain(&mut self) -> EvalResult<Expr> {
        let depth = self.depth;
        let mut result = self.parse_primary()?;
        loop {
            if self
                .current()
                .is_some_and(|token| ['.', '[', '('].into_iter().any(|c| token.is_character(c)))
            {
                self.descend()?;
            }
            if self.consume_optional_character('.') {
                let property = match self.current() {
                    Some(token)
                        if matches!(
                            token.token_type,
                            TokenType::Identifier | TokenType::Keyword
                        ) =>
                    {
                        token.str_value.clone()
                    }
                    _ => {
                        return Err(EvalError::syntax(
                            "expected property name after '.'",
                            self.input_index(),
                        ));
                    }
                };
                self.advance();
                result = Expr::Member {
                    object: Box::new(result),
                    property,
                };
            } else if self.consume_optional_character('[') {
                let index = self.parse_conditional()?;
                self.expect_character(']')?;
                result = Expr::Index {
                    object: Box::new(result),
                    index: Box::new(index),
                };
            } else if self.consume_optional_character('(') {
                let args = self.parse_call_arguments()?;
                result = Expr::Call {
                    callee: Box::new(result),
                    args,
                };
            } else {
                self.depth = depth;
                return Ok(result);
            }
        }
    }

    fn parse_call_arguments(&mut self) -> EvalResult<Vec<Expr>> {
        let mut args = Vec::new();
        if self.consume_optional_character(')') {
            return Ok(args);
        }
        loop {
            args.push(self.parse_conditional()?);
            if self.consume_optional_character(')') {
                return Ok(args);
            }
            self.expect_character(',')?;
        }
    }

    fn parse_primary(&mut self) -> EvalResult<Expr> {
        let start = self.input_index();
        let Some(token) = self.current().cloned() else {
            return Err(EvalError::syntax("unexpected end of expression", start));
        };

        match token.token_type {
            TokenType::Number => {
                self.advance();
                Ok(Expr::Literal(Value::Number(token.num_value)))
            }
            TokenType::String => {
                self.advance();
                Ok(Expr::Literal(Value::string(&token.str_value)))
            }
            TokenType::Keyword => {
                self.advance();
                Ok(Expr::Literal(match token.str_value.as_str() {
                    "true" => Value::Bool(true),
                    "false" => Value::Bool(false),
                    "null" => Value::Null,
                    _ => Value::Undefined,
                }))
            }
            TokenType::Identifier => {
                self.advance();
                Ok(Expr::Identifier(token.str_value))
            }
            TokenType::Character if token.is_character('(') => {
                self.advance();
                let expr = self.parse_conditional()?;
                self.expect_character(')')?;
                Ok(expr)
            }
            TokenType::Character if token.is_character('[') => {
                self.advance();
                self.parse_literal_array()
            }
            TokenType::Character if token.is_character('{') => {
                self.advance();
                self.parse_literal_map()
            }
            _ => Err(EvalError::syntax(
                format!("unexpected token '{}'", token.str_value),
                start,
            )),
        }
    }

    fn parse_literal_array(&mut self) -> EvalResult<Expr> {
        let mut items = Vec::new();
        if self.consume_optional_character(']') {
            return Ok(Expr::Array(items));
        }
        loop {
            items.push(self.parse_conditional()?);
            if self.consume_optional_character(']') {
                return Ok(Expr::Array(items));
            }
            self.expect_character(',')?;
            // trailing comma
            if self.consume_optional_character(']') {
                return Ok(Expr::Array(items));
            }
        }
    }

    fn parse_literal_map(&mut self) -> EvalResult<Expr> {
        let mut entries = Vec::new();
        if self.consume_optional_character('}') {
            return Ok(Expr::Object(entries));
        }
        loop {
            let key = match self.current() {
                Some(token)
                    if matches!(
                        token.token_type,
                        TokenType::Identifier | TokenType::Keyword | TokenType::String
                    ) =>
                {
                    token.str_value.clone()
                }
                Some(token) if token.token_type == TokenType::Number => {
                    Value::Number(token.num_value).to_string()
                }
                _ => {
                    return Err(EvalError::syntax("expected object key", self.input_index()));
                }
            };
            self.advance();
            self.expect_character(':')?;
            entries.push((key, self.parse_conditional()?));
            if self.consume_optional_character('}') {
                return Ok(Expr::Object(entries));
            }
            self.expect_character(',')?;
            if self.consume_optional_character('}') {
                return Ok(Expr::Object(entries));
            }
        }
    }
}
