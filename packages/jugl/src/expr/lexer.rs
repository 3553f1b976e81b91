//! Tokenizer for template expressions

use crate::error::{EvalError, EvalResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    Character,
    Identifier,
    Keyword,
    String,
    Operator,
    Number,
}

const KEYWORDS: &[&str] = &["true", "false", "null", "undefined"];

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Byte offset of the token in the source expression
    pub index: usize,
    pub token_type: TokenType,
    pub num_value: f64,
    pub str_value: String,
}

impl Token {
    fn new(index: usize, token_type: TokenType, str_value: impl Into<String>) -> Self {
        Token {
            index,
            token_type,
            num_value: 0.0,
            str_value: str_value.into(),
        }
    }

    pub fn is_character(&self, code: char) -> bool {
        self.token_type == TokenType::Character && self.str_value.starts_with(code)
    }

    pub fn is_operator(&self, operator: &str) -> bool {
        self.token_type == TokenType::Operator && self.str_value == operator
    }

    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.token_type == TokenType::Keyword && self.str_value == keyword
    }
}

pub fn tokenize(input: &str) -> EvalResult<Vec<Token>> {
    Scanner::new(input).scan()
}

struct Scanner<'a> {
    input: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        Scanner {
            input,
            chars: input.char_indices().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|(_, c)| *c)
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).map(|(_, c)| *c)
    }

    fn offset(&self) -> usize {
        self.chars
            .get(self.pos)
            .map(|(idx, _)| *idx)
            .unwrap_or(self.input.len())
    }

    fn scan(mut self) -> EvalResult<Vec<Token>> {
        let mut tokens = Vec::new();
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.pos += 1;
                continue;
            }
            tokens.push(self.scan_token(ch)?);
        }
        Ok(tokens)
    }

    fn scan_token(&mut self, ch: char) -> EvalResult<Token> {
        let start = self.offset();
        if is_identifier_start(ch) {
            return Ok(self.scan_identifier(start));
        }
        if ch.is_ascii_digit() || (ch == '.' && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()))
        {
            return self.scan_number(start);
        }

        match ch {
            '(' | ')' | '[' | ']' | '{' | '}' | ',' | ':' | '.' | '?' => {
                self.pos += 1;
                Ok(Token::new(start, TokenType::Character, ch))
            }
            '\'' | '"' => self.scan_string(start, ch),
            '+' | '-' | '*' | '/' | '%' => {
                self.pos += 1;
                Ok(Token::new(start, TokenType::Operator, ch))
            }
            '<' | '>' => Ok(self.scan_complex_operator(start, ch, '=', None)),
            '!' | '=' => Ok(self.scan_complex_operator(start, ch, '=', Some('='))),
            '&' | '|' => {
                if self.peek_at(1) == Some(ch) {
                    self.pos += 2;
                    Ok(Token::new(start, TokenType::Operator, format!("{ch}{ch}")))
                } else {
                    Err(EvalError::syntax(format!("unexpected character '{ch}'"), start))
                }
            }
            _ => Err(EvalError::syntax(format!("unexpected character '{ch}'"), start)),
        }
    }

    /// Scan `one`, `one two` or `one two three` (e.g. `!`, `!=`, `!==`), longest match first.
    fn scan_complex_operator(
        &mut self,
        start: usize,
        one: char,
        two: char,
        three: Option<char>,
    ) -> Token {
        let mut op = String::from(one);
        self.pos += 1;
        if self.peek() == Some(two) {
            op.push(two);
            self.pos += 1;
            if let Some(three) = three {
                if self.peek() == Some(three) {
                    op.push(three);
                    self.pos += 1;
                }
            }
        }
        Token::new(start, TokenType::Operator, op)
    }

    fn scan_identifier(&mut self, start: usize) -> Token {
        while self.peek().is_some_and(is_identifier_part) {
            self.pos += 1;
        }
        let text = &self.input[start..self.offset()];
        let token_type = if KEYWORDS.contains(&text) {
            TokenType::Keyword
        } else {
            TokenType::Identifier
        };
        Token::new(start, token_type, text)
    }

    fn scan_number(&mut self, start: usize) -> EvalResult<Token> {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() || ch == '.' {
                self.pos += 1;
            } else if ch == 'e' || ch == 'E' {
                self.pos += 1;
                if matches!(self.peek(), Some('+' | '-')) {
                    self.pos += 1;
                }
                if !self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    return Err(EvalError::syntax("invalid exponent", self.offset()));
                }
            } else {
                break;
            }
        }
        let text = &self.input[start..self.offset()];
        let num_value = text
            .parse::<f64>()
            .map_err(|_| EvalError::syntax(format!("invalid number '{text}'"), start))?;
        let mut token = Token::new(start, TokenType::Number, text);
        token.num_value = num_value;
        Ok(token)
    }

    fn scan_string(&mut self, start: usize, quote: char) -> EvalResult<Token> {
        self.pos += 1;
        let mut value = String::new();
        loop {
            let Some(ch) = self.peek() else {
                return Err(EvalError::syntax("unterminated string", start));
            };
            self.pos += 1;
            if ch == quote {
                return Ok(Token::new(start, TokenType::String, value));
            }
            if ch != '\\' {
                value.push(ch);
                continue;
            }
            let Some(escaped) = self.peek() else {
                return Err(EvalError::syntax("unterminated string", start));
            };
            self.pos += 1;
            match escaped {
                'n' => value.push('\n'),
                't' => value.push('\t'),
                'r' => value.push('\r'),
                '0' => value.push('\0'),
                'u' => value.push(self.scan_unicode_escape()?),
                other => value.push(other),
            }
        }
    }

    fn scan_unicode_escape(&mut self) -> EvalResult<char> {
        let start = self.offset();
        let hex: String = (0..4).filter_map(|i| self.peek_at(i)).collect();
        let code = (hex.len() == 4)
            .then(|| u32::from_str_radix(&hex, 16).ok())
            .flatten()
            .and_then(char::from_u32)
            .ok_or_else(|| EvalError::syntax(format!("invalid unicode escape '\\u{hex}'"), start))?;
        self.pos += 4;
        Ok(code)
    }
}

fn is_identifier_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_' || ch == '$'
}

fn is_identifier_part(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<(TokenType, String)> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|t| (t.token_type, t.str_value))
            .collect()
    }

    #[test]
    fn test_tokenize_simple_expression() {
        assert_eq!(
            kinds("a.b + 1"),
            vec![
                (TokenType::Identifier, "a".into()),
                (TokenType::Character, ".".into()),
                (TokenType::Identifier, "b".into()),
                (TokenType::Operator, "+".into()),
                (TokenType::Number, "1".into()),
            ]
        );
    }

    #[test]
    fn test_tokenize_operators() {
        let ops: Vec<_> = kinds("a !== b != c === d <= e && !f")
            .into_iter()
            .filter(|(t, _)| *t == TokenType::Operator)
            .map(|(_, s)| s)
            .collect();
        assert_eq!(ops, ["!==", "!=", "===", "<=", "&&", "!"]);
    }

    #[test]
    fn test_tokenize_strings_and_numbers() {
        let tokens = tokenize(r#"'it\'s' "A" 1.5e3 .5"#).unwrap();
        assert_eq!(tokens[0].str_value, "it's");
        assert_eq!(tokens[1].str_value, "A");
        assert_eq!(tokens[2].num_value, 1500.0);
        assert_eq!(tokens[3].num_value, 0.5);
    }

    #[test]
    fn test_tokenize_keywords() {
        let tokens = tokenize("true nullable null").unwrap();
        assert!(tokens[0].is_keyword("true"));
        assert_eq!(tokens[1].token_type, TokenType::Identifier);
        assert!(tokens[2].is_keyword("null"));
    }

    #[test]
    fn test_tokenize_errors() {
        assert!(matches!(
            tokenize("'open"),
            Err(EvalError::Syntax { offset: 0, .. })
        ));
        assert!(matches!(
            tokenize("a # b"),
            Err(EvalError::Syntax { offset: 2, .. })
        ));
        assert!(tokenize("a & b").is_err());
    }
}
