use log::{debug, warn};
use thiserror::Error;

use super::ast::*;
use super::lexer::{tokenize, LexError, Token, TokenKind};
use crate::storage::table::{Constraint, DataType};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token: expected {expected}, found {found} at position {position}")]
    UnexpectedToken {
        expected: String,
        found: TokenKind,
        position: usize,
    },
    #[error("GROUP BY column '{0}' does not appear in the select list")]
    GroupByColumnNotProjected(String),
    #[error("Invalid numeric literal '{literal}' at position {position}")]
    InvalidNumber { literal: String, position: usize },
    #[error("Lexer error: {0}")]
    Lex(#[from] LexError),
}

/// Recursive-descent parser with one token of lookahead.
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map_or(true, |t| !t.is_eof()) {
            let end = tokens.last().map_or(0, |t| t.position + t.literal.len());
            tokens.push(Token::new(TokenKind::Eof, "", end));
        }
        Self {
            tokens,
            position: 0,
        }
    }

    pub fn from_sql(input: &str) -> Self {
        Self::new(tokenize(input))
    }

    /// Parses every statement, isolating failures: after an error the parser
    /// skips past the next `;` and carries on.
    pub fn parse_all(&mut self) -> Vec<Result<Statement, ParseError>> {
        let mut results = Vec::new();

        while let Some(result) = self.parse_next() {
            if result.is_err() {
                self.synchronize();
            }
            results.push(result);
        }

        results
    }

    /// Parses the next statement, skipping stray tokens in front of it.
    /// Returns `None` once the input is exhausted.
    pub fn parse_next(&mut self) -> Option<Result<Statement, ParseError>> {
        loop {
            match self.peek().kind {
                TokenKind::Eof => return None,
                TokenKind::Create => return Some(self.parse_create().map(Statement::Create)),
                TokenKind::Insert => return Some(self.parse_insert().map(Statement::Insert)),
                TokenKind::Select => return Some(self.parse_select().map(Statement::Select)),
                _ => {
                    let token = self.advance();
                    warn!(
                        "skipping token {:?} at position {}",
                        token.literal, token.position
                    );
                }
            }
        }
    }

    fn synchronize(&mut self) {
        while !self.check(&TokenKind::Eof) {
            let kind = self.advance().kind.clone();
            if kind == TokenKind::Semicolon {
                break;
            }
        }
    }

    fn parse_create(&mut self) -> Result<CreateStatement, ParseError> {
        self.expect(TokenKind::Create)?;
        self.expect(TokenKind::Table)?;

        let if_not_exists = if self.check(&TokenKind::If) {
            self.advance();
            self.expect(TokenKind::Not)?;
            self.expect(TokenKind::Exists)?;
            true
        } else {
            false
        };

        let table_name = self.parse_identifier()?;
        let mut columns = Vec::new();

        if self.check(&TokenKind::LParen) {
            self.advance();
            loop {
                columns.push(self.parse_column_def()?);
                if self.check(&TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
            self.expect(TokenKind::RParen)?;
        }

        self.expect_terminator()?;
        debug!("parsed CREATE TABLE {} ({} columns)", table_name, columns.len());

        Ok(CreateStatement {
            table_name,
            if_not_exists,
            columns,
        })
    }

    fn parse_column_def(&mut self) -> Result<ColumnDef, ParseError> {
        let name = self.parse_identifier()?;
        let data_type = self.parse_data_type()?;
        let mut column = ColumnDef::new(name, data_type);

        while !self.check(&TokenKind::Comma) && !self.check(&TokenKind::RParen) {
            let constraint = match self.peek().kind {
                TokenKind::Primary => {
                    self.advance();
                    self.expect(TokenKind::Key)?;
                    Constraint::PrimaryKey
                }
                TokenKind::Not => {
                    self.advance();
                    self.expect(TokenKind::Null)?;
                    Constraint::NotNull
                }
                TokenKind::Unique => {
                    self.advance();
                    Constraint::Unique
                }
                TokenKind::Default => {
                    self.advance();
                    Constraint::Default(self.parse_literal_text()?)
                }
                TokenKind::Eof | TokenKind::Semicolon | TokenKind::Illegal(_) => {
                    return Err(self.unexpected_token("',' or ')'"));
                }
                _ => Constraint::Other(self.advance().literal.clone()),
            };
            column.constraints.push(constraint);
        }

        Ok(column)
    }

    fn parse_data_type(&mut self) -> Result<DataType, ParseError> {
        match self.peek().kind {
            TokenKind::Varchar => {
                self.advance();
                self.expect(TokenKind::LParen)?;
                let token = self.expect(TokenKind::Number)?.clone();
                let max = token
                    .literal
                    .parse::<usize>()
                    .map_err(|_| ParseError::InvalidNumber {
                        literal: token.literal.clone(),
                        position: token.position,
                    })?;
                self.expect(TokenKind::RParen)?;
                Ok(DataType::Varchar(max))
            }
            TokenKind::Int => {
                self.advance();
                Ok(DataType::Int)
            }
            TokenKind::Float => {
                self.advance();
                Ok(DataType::Float)
            }
            TokenKind::Identifier => Ok(DataType::Other(self.advance().literal.clone())),
            _ => Err(self.unexpected_token("data type")),
        }
    }

    fn parse_insert(&mut self) -> Result<InsertStatement, ParseError> {
        self.expect(TokenKind::Insert)?;
        self.expect(TokenKind::Into)?;
        let table_name = self.parse_identifier()?;

        let column_names = if self.check(&TokenKind::LParen) {
            self.advance();
            let mut names = vec![self.parse_identifier()?];
            while self.check(&TokenKind::Comma) {
                self.advance();
                names.push(self.parse_identifier()?);
            }
            self.expect(TokenKind::RParen)?;
            Some(names)
        } else {
            None
        };

        self.expect(TokenKind::Values)?;
        self.expect(TokenKind::LParen)?;

        let mut values = vec![self.parse_insert_value()?];
        while self.check(&TokenKind::Comma) {
            self.advance();
            values.push(self.parse_insert_value()?);
        }
        self.expect(TokenKind::RParen)?;
        self.expect_terminator()?;
        debug!("parsed INSERT INTO {} ({} values)", table_name, values.len());

        Ok(InsertStatement {
            table_name,
            column_names,
            values,
        })
    }

    /// A value slot may be left empty (`VALUES (1, , 2)`).
    fn parse_insert_value(&mut self) -> Result<String, ParseError> {
        if self.check(&TokenKind::Comma) || self.check(&TokenKind::RParen) {
            return Ok(String::new());
        }
        self.parse_literal_text()
    }

    /// Reads one literal-ish token as raw text: quoted text loses its quotes,
    /// `NULL` becomes empty and a leading `-` is folded into a number.
    fn parse_literal_text(&mut self) -> Result<String, ParseError> {
        match self.peek().kind {
            TokenKind::Null => {
                self.advance();
                Ok(String::new())
            }
            TokenKind::Minus => {
                self.advance();
                let number = self.expect(TokenKind::Number)?;
                Ok(format!("-{}", number.literal))
            }
            TokenKind::Eof
            | TokenKind::Semicolon
            | TokenKind::LParen
            | TokenKind::RParen
            | TokenKind::Comma
            | TokenKind::Illegal(_) => Err(self.unexpected_token("literal value")),
            _ => Ok(self.advance().literal.clone()),
        }
    }

    fn parse_select(&mut self) -> Result<SelectStatement, ParseError> {
        self.expect(TokenKind::Select)?;

        let mut items = vec![self.parse_select_item()?];
        while self.check(&TokenKind::Comma) {
            self.advance();
            items.push(self.parse_select_item()?);
        }

        self.expect(TokenKind::From)?;
        let mut stmt = SelectStatement::new(self.parse_identifier()?);
        stmt.items = items;

        if self.check(&TokenKind::Where) {
            self.advance();
            stmt.where_clause = Some(self.parse_expr()?);
        }

        if self.check(&TokenKind::Group) {
            self.advance();
            self.expect(TokenKind::By)?;
            loop {
                let column = self.parse_identifier()?;
                mark_group_key(&mut stmt.items, &column)?;
                stmt.group_by.push(column);
                if self.check(&TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }

        self.expect_terminator()?;
        debug!(
            "parsed SELECT from {} ({} items, {} group keys)",
            stmt.table_name,
            stmt.items.len(),
            stmt.group_by.len()
        );

        Ok(stmt)
    }

    fn parse_select_item(&mut self) -> Result<SelectItem, ParseError> {
        if self.check(&TokenKind::Star) {
            self.advance();
            return Ok(SelectItem::new(WILDCARD, SelectItemKind::Normal));
        }

        let item = if self.peek().kind.is_aggregate() {
            let kind = match self.advance().kind {
                TokenKind::Count => SelectItemKind::Count,
                TokenKind::Sum => SelectItemKind::Sum,
                TokenKind::Avg => SelectItemKind::Avg,
                TokenKind::Min => SelectItemKind::Min,
                _ => SelectItemKind::Max,
            };
            self.expect(TokenKind::LParen)?;
            let argument = if kind == SelectItemKind::Count && self.check(&TokenKind::Star) {
                self.advance();
                WILDCARD.to_string()
            } else {
                self.parse_identifier()?
            };
            self.expect(TokenKind::RParen)?;
            SelectItem::new(argument, kind)
        } else {
            SelectItem::new(self.parse_identifier()?, SelectItemKind::Normal)
        };

        if self.check(&TokenKind::As) {
            self.advance();
            Ok(item.with_alias(self.parse_identifier()?))
        } else {
            Ok(item)
        }
    }

    pub fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_or_expr()
    }

    fn parse_or_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and_expr()?;

        while self.check(&TokenKind::Or) {
            self.advance();
            let right = self.parse_and_expr()?;
            left = Expr::binary(left, BinaryOperator::Or, right);
        }

        Ok(left)
    }

    fn parse_and_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_not_expr()?;

        while self.check(&TokenKind::And) {
            self.advance();
            let right = self.parse_not_expr()?;
            left = Expr::binary(left, BinaryOperator::And, right);
        }

        Ok(left)
    }

    fn parse_not_expr(&mut self) -> Result<Expr, ParseError> {
        if self.check(&TokenKind::Not) {
            self.advance();
            let expr = self.parse_not_expr()?;
            Ok(Expr::Not(Box::new(expr)))
        } else {
            self.parse_comparison_expr()
        }
    }

    fn parse_comparison_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_additive_expr()?;

        loop {
            let op = match self.peek().kind {
                TokenKind::Eq => BinaryOperator::Eq,
                TokenKind::NotEq => BinaryOperator::NotEq,
                TokenKind::Lt => BinaryOperator::Lt,
                TokenKind::LtEq => BinaryOperator::LtEq,
                TokenKind::Gt => BinaryOperator::Gt,
                TokenKind::GtEq => BinaryOperator::GtEq,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive_expr()?;
            left = Expr::binary(left, op, right);
        }

        Ok(left)
    }

    fn parse_additive_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative_expr()?;

        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOperator::Add,
                TokenKind::Minus => BinaryOperator::Subtract,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative_expr()?;
            left = Expr::binary(left, op, right);
        }

        Ok(left)
    }

    fn parse_multiplicative_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary_expr()?;

        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOperator::Multiply,
                TokenKind::Slash => BinaryOperator::Divide,
                TokenKind::Percent => BinaryOperator::Modulo,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary_expr()?;
            left = Expr::binary(left, op, right);
        }

        Ok(left)
    }

    fn parse_unary_expr(&mut self) -> Result<Expr, ParseError> {
        if !self.check(&TokenKind::Minus) {
            return self.parse_primary_expr();
        }
        self.advance();
        match self.parse_unary_expr()? {
            Expr::Integer(n) => Ok(Expr::Integer(-n)),
            Expr::Float(f) => Ok(Expr::Float(-f)),
            expr => Ok(Expr::binary(Expr::Integer(0), BinaryOperator::Subtract, expr)),
        }
    }

    fn parse_primary_expr(&mut self) -> Result<Expr, ParseError> {
        match self.peek().kind {
            TokenKind::Number => {
                let token = self.advance().clone();
                parse_number(&token)
            }
            TokenKind::String => Ok(Expr::String(self.advance().literal.clone())),
            TokenKind::True => {
                self.advance();
                Ok(Expr::Boolean(true))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Boolean(false))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expr::Null)
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::Identifier => Ok(Expr::Column(self.advance().literal.clone())),
            _ => Err(self.unexpected_token("expression")),
        }
    }

    fn parse_identifier(&mut self) -> Result<String, ParseError> {
        Ok(self.expect(TokenKind::Identifier)?.literal.clone())
    }

    /// Statements end with `;`; the final one may run into end of input.
    fn expect_terminator(&mut self) -> Result<(), ParseError> {
        match self.peek().kind {
            TokenKind::Semicolon => {
                self.advance();
                Ok(())
            }
            TokenKind::Eof => Ok(()),
            _ => Err(self.unexpected_token("';'")),
        }
    }

    fn peek(&self) -> &Token {
        // `new` guarantees a trailing Eof and `advance` never moves past it.
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn advance(&mut self) -> &Token {
        let idx = self.position.min(self.tokens.len() - 1);
        if !self.tokens[idx].is_eof() {
            self.position += 1;
        }
        &self.tokens[idx]
    }

    fn expect(&mut self, expected: TokenKind) -> Result<&Token, ParseError> {
        if self.check(&expected) {
            Ok(self.advance())
        } else {
            Err(self.unexpected_token(&format!("{:?}", expected)))
        }
    }

    fn unexpected_token(&self, expected: &str) -> ParseError {
        let token = self.peek();
        match &token.kind {
            TokenKind::Illegal(err) => ParseError::Lex(err.clone()),
            kind => ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: kind.clone(),
                position: token.position,
            },
        }
    }
}

/// Retags projected plain columns matching `column` (by name or alias) as group keys.
fn mark_group_key(items: &mut [SelectItem], column: &str) -> Result<(), ParseError> {
    let mut found = false;
    for item in items.iter_mut() {
        let plain = matches!(item.kind, SelectItemKind::Normal | SelectItemKind::GroupKey);
        if plain && !item.is_wildcard() && (item.source_column == column || item.alias == column) {
            item.kind = SelectItemKind::GroupKey;
            found = true;
        }
    }
    if found {
        Ok(())
    } else {
        Err(ParseError::GroupByColumnNotProjected(column.to_string()))
    }
}

fn parse_number(token: &Token) -> Result<Expr, ParseError> {
    if let Ok(n) = token.literal.parse::<i64>() {
        return Ok(Expr::Integer(n));
    }
    token
        .literal
        .parse::<f64>()
        .map(Expr::Float)
        .map_err(|_| ParseError::InvalidNumber {
            literal: token.literal.clone(),
            position: token.position,
        })
}

/// Parses every statement in `tokens`, failing on the first malformed one.
pub fn parse(tokens: Vec<Token>) -> Result<Vec<Statement>, ParseError> {
    Parser::new(tokens).parse_all().into_iter().collect()
}

/// Parses every statement in `tokens`, keeping one result per statement.
pub fn parse_batch(tokens: Vec<Token>) -> Vec<Result<Statement, ParseError>> {
    Parser::new(tokens).parse_all()
}
