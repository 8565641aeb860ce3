// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Query Parser
//!
//! Hand-rolled lexer and recursive-descent parser for the query language.
//!
//! ## Grammar
//!
//! ```text
//! expression  := conjunction (('or' | 'except') conjunction)*
//! conjunction := unit ('and' unit)*
//! unit        := '(' expression ')'
//!              | 'has' path
//!              | path operator literal
//! operator    := '=' | '!=' | '<' | '<=' | '>' | '>=' | 'matches' | 'contains'
//! literal     := string | number | 'true' | 'false' | 'null'
//! ```
//!
//! `and` binds tighter than `or` and `except`, which share a precedence
//! level and associate left.  Keywords are case-insensitive.  String
//! literals use double quotes with backslash escapes.

use std::iter::Peekable;
use std::str::Chars;

use crate::error::TagstoreError;
use crate::query::ast::{Comparison, Expression, Literal};
use crate::value_objects::is_valid_path;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Path(String),
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Null,
    And,
    Or,
    Except,
    Has,
    Matches,
    Contains,
    Equal,
    NotEqual,
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
    LeftParen,
    RightParen,
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    position: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            position: 0,
        }
    }

    fn tokenize(mut self) -> Result<Vec<Token>, TagstoreError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn bump(&mut self) -> Option<char> {
        self.position += 1;
        self.chars.next()
    }

    fn error(&self, message: impl Into<String>) -> TagstoreError {
        TagstoreError::parse(format!(
            "{} at position {}",
            message.into(),
            self.position
        ))
    }

    fn next_token(&mut self) -> Result<Option<Token>, TagstoreError> {
        while matches!(self.chars.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
        let Some(&c) = self.chars.peek() else {
            return Ok(None);
        };

        let token = match c {
            '(' => {
                self.bump();
                Token::LeftParen
            }
            ')' => {
                self.bump();
                Token::RightParen
            }
            '=' => {
                self.bump();
                Token::Equal
            }
            '!' => {
                self.bump();
                match self.bump() {
                    Some('=') => Token::NotEqual,
                    _ => return Err(self.error("expected '=' after '!'")),
                }
            }
            '<' => {
                self.bump();
                if self.chars.peek() == Some(&'=') {
                    self.bump();
                    Token::LessOrEqual
                } else {
                    Token::LessThan
                }
            }
            '>' => {
                self.bump();
                if self.chars.peek() == Some(&'=') {
                    self.bump();
                    Token::GreaterOrEqual
                } else {
                    Token::GreaterThan
                }
            }
            '"' => self.string_literal()?,
            c if c.is_ascii_digit() || c == '-' || c == '+' => self.number()?,
            c if is_word_char(c) => self.word(),
            other => return Err(self.error(format!("unexpected character '{}'", other))),
        };
        Ok(Some(token))
    }

    fn string_literal(&mut self) -> Result<Token, TagstoreError> {
        self.bump(); // opening quote
        let mut value = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(Token::Text(value)),
                Some('\\') => match self.bump() {
                    Some(escaped @ ('"' | '\\')) => value.push(escaped),
                    Some(other) => {
                        value.push('\\');
                        value.push(other);
                    }
                    None => return Err(self.error("unterminated string literal")),
                },
                Some(other) => value.push(other),
                None => return Err(self.error("unterminated string literal")),
            }
        }
    }

    fn number(&mut self) -> Result<Token, TagstoreError> {
        let mut text = String::new();
        if let Some(&sign @ ('-' | '+')) = self.chars.peek() {
            text.push(sign);
            self.bump();
        }
        let mut is_float = false;
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.bump();
            } else if c == '.' && !is_float {
                is_float = true;
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        if is_float {
            text.parse::<f64>()
                .map(Token::Float)
                .map_err(|_| self.error(format!("invalid number '{}'", text)))
        } else {
            text.parse::<i64>()
                .map(Token::Integer)
                .map_err(|_| self.error(format!("invalid number '{}'", text)))
        }
    }

    fn word(&mut self) -> Token {
        let mut text = String::new();
        while let Some(&c) = self.chars.peek() {
            if is_word_char(c) {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        match text.to_ascii_lowercase().as_str() {
            "and" => Token::And,
            "or" => Token::Or,
            "except" => Token::Except,
            "has" => Token::Has,
            "matches" => Token::Matches,
            "contains" => Token::Contains,
            "true" => Token::Boolean(true),
            "false" => Token::Boolean(false),
            "null" => Token::Null,
            _ => Token::Path(text),
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '-' | '/')
}

/// Recursive-descent parser over the token stream.
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    /// Lexes `input`, ready for a single `parse` call.
    pub fn new(input: &str) -> Result<Self, TagstoreError> {
        let tokens = Lexer::new(input).tokenize()?;
        Ok(Self {
            tokens,
            position: 0,
        })
    }

    /// Parses the token stream into an expression tree.
    pub fn parse(mut self) -> Result<Expression, TagstoreError> {
        if self.tokens.is_empty() {
            return Err(TagstoreError::parse("empty query"));
        }
        let expression = self.expression()?;
        if self.position != self.tokens.len() {
            return Err(TagstoreError::parse(format!(
                "unexpected trailing input after token {}",
                self.position
            )));
        }
        Ok(expression)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn expression(&mut self) -> Result<Expression, TagstoreError> {
        let mut left = self.conjunction()?;
        loop {
            match self.peek() {
                Some(Token::Or) => {
                    self.advance();
                    let right = self.conjunction()?;
                    left = Expression::Or(Box::new(left), Box::new(right));
                }
                Some(Token::Except) => {
                    self.advance();
                    let right = self.conjunction()?;
                    left = Expression::Except(Box::new(left), Box::new(right));
                }
                _ => return Ok(left),
            }
        }
    }

    fn conjunction(&mut self) -> Result<Expression, TagstoreError> {
        let mut left = self.unit()?;
        while matches!(self.peek(), Some(Token::And)) {
            self.advance();
            let right = self.unit()?;
            left = Expression::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unit(&mut self) -> Result<Expression, TagstoreError> {
        match self.advance() {
            Some(Token::LeftParen) => {
                let expression = self.expression()?;
                match self.advance() {
                    Some(Token::RightParen) => Ok(expression),
                    _ => Err(TagstoreError::parse("expected ')'")),
                }
            }
            Some(Token::Has) => {
                let path = self.path()?;
                Ok(Expression::Has { path })
            }
            Some(Token::Path(path)) => {
                self.validate_path(&path)?;
                let operator = self.operator()?;
                let value = self.literal()?;
                Ok(Expression::Compare {
                    path,
                    operator,
                    value,
                })
            }
            Some(other) => Err(TagstoreError::parse(format!(
                "expected a predicate, got {:?}",
                other
            ))),
            None => Err(TagstoreError::parse("unexpected end of query")),
        }
    }

    fn path(&mut self) -> Result<String, TagstoreError> {
        match self.advance() {
            Some(Token::Path(path)) => {
                self.validate_path(&path)?;
                Ok(path)
            }
            other => Err(TagstoreError::parse(format!(
                "expected a path, got {:?}",
                other
            ))),
        }
    }

    fn validate_path(&self, path: &str) -> Result<(), TagstoreError> {
        if is_valid_path(path) {
            Ok(())
        } else {
            Err(TagstoreError::parse(format!("'{}' is not a valid path", path)))
        }
    }

    fn operator(&mut self) -> Result<Comparison, TagstoreError> {
        match self.advance() {
            Some(Token::Equal) => Ok(Comparison::Equal),
            Some(Token::NotEqual) => Ok(Comparison::NotEqual),
            Some(Token::LessThan) => Ok(Comparison::LessThan),
            Some(Token::LessOrEqual) => Ok(Comparison::LessOrEqual),
            Some(Token::GreaterThan) => Ok(Comparison::GreaterThan),
            Some(Token::GreaterOrEqual) => Ok(Comparison::GreaterOrEqual),
            Some(Token::Matches) => Ok(Comparison::Matches),
            Some(Token::Contains) => Ok(Comparison::Contains),
            other => Err(TagstoreError::parse(format!(
                "expected a comparison operator, got {:?}",
                other
            ))),
        }
    }

    fn literal(&mut self) -> Result<Literal, TagstoreError> {
        match self.advance() {
            Some(Token::Text(value)) => Ok(Literal::Text(value)),
            Some(Token::Integer(value)) => Ok(Literal::Integer(value)),
            Some(Token::Float(value)) => Ok(Literal::Float(value)),
            Some(Token::Boolean(value)) => Ok(Literal::Boolean(value)),
            Some(Token::Null) => Ok(Literal::Null),
            other => Err(TagstoreError::parse(format!(
                "expected a literal, got {:?}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ast::Query;

    #[test]
    fn parses_has_queries() {
        let query = Query::parse("has alice/books/rating").unwrap();
        assert_eq!(query.has_path(), Some("alice/books/rating"));
    }

    #[test]
    fn parses_all_comparison_operators() {
        let cases = [
            ("a/b = 5", Comparison::Equal),
            ("a/b != 5", Comparison::NotEqual),
            ("a/b < 5", Comparison::LessThan),
            ("a/b <= 5", Comparison::LessOrEqual),
            ("a/b > 5", Comparison::GreaterThan),
            ("a/b >= 5", Comparison::GreaterOrEqual),
            (r#"a/b matches "word""#, Comparison::Matches),
            (r#"a/b contains "word""#, Comparison::Contains),
        ];
        for (text, expected) in cases {
            let query = Query::parse(text).unwrap();
            match query.root() {
                Expression::Compare { operator, .. } => assert_eq!(*operator, expected, "{}", text),
                other => panic!("unexpected tree for {}: {:?}", text, other),
            }
        }
    }

    #[test]
    fn parses_literals() {
        for (text, expected) in [
            (r#"a/b = "hello""#, Literal::Text("hello".to_string())),
            ("a/b = 5", Literal::Integer(5)),
            ("a/b = -5", Literal::Integer(-5)),
            ("a/b = 2.5", Literal::Float(2.5)),
            ("a/b = true", Literal::Boolean(true)),
            ("a/b = false", Literal::Boolean(false)),
            ("a/b = null", Literal::Null),
        ] {
            let query = Query::parse(text).unwrap();
            match query.root() {
                Expression::Compare { value, .. } => assert_eq!(*value, expected, "{}", text),
                other => panic!("unexpected tree for {}: {:?}", text, other),
            }
        }
    }

    #[test]
    fn string_escapes() {
        let query = Query::parse(r#"a/b = "say \"hi\" \\ there""#).unwrap();
        match query.root() {
            Expression::Compare { value, .. } => {
                assert_eq!(*value, Literal::Text(r#"say "hi" \ there"#.to_string()));
            }
            other => panic!("unexpected tree: {:?}", other),
        }
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let query = Query::parse("has a/b or has c/d and has e/f").unwrap();
        match query.root() {
            Expression::Or(left, right) => {
                assert!(matches!(**left, Expression::Has { .. }));
                assert!(matches!(**right, Expression::And(_, _)));
            }
            other => panic!("unexpected tree: {:?}", other),
        }
    }

    #[test]
    fn except_is_left_associative() {
        let query = Query::parse("has a/b except has c/d except has e/f").unwrap();
        match query.root() {
            Expression::Except(left, _) => {
                assert!(matches!(**left, Expression::Except(_, _)));
            }
            other => panic!("unexpected tree: {:?}", other),
        }
    }

    #[test]
    fn parentheses_override_precedence() {
        let query = Query::parse("(has a/b or has c/d) and has e/f").unwrap();
        match query.root() {
            Expression::And(left, _) => {
                assert!(matches!(**left, Expression::Or(_, _)));
            }
            other => panic!("unexpected tree: {:?}", other),
        }
    }

    #[test]
    fn keywords_are_case_insensitive() {
        assert!(Query::parse("HAS a/b AND a/c = 5").is_ok());
    }

    #[test]
    fn rejects_malformed_queries() {
        for text in [
            "",
            "has",
            "a/b =",
            "a/b 5",
            "(has a/b",
            "has a/b extra",
            "a/b = 'single'",
            "has Upper/case",
            "a/b == 5",
        ] {
            let result = Query::parse(text);
            assert!(
                matches!(result, Err(TagstoreError::ParseError(_))),
                "{:?} should be a parse error, got {:?}",
                text,
                result
            );
        }
    }

    #[test]
    fn unterminated_string_is_a_parse_error() {
        assert!(matches!(
            Query::parse(r#"a/b = "oops"#),
            Err(TagstoreError::ParseError(_))
        ));
    }
}
