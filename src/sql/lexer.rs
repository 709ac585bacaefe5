use std::fmt;
use std::iter::Peekable;
use std::str::Chars;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LexError {
    #[error("Unterminated string literal starting at position {position}")]
    UnterminatedString { position: usize },
    #[error("Illegal character '{ch}' at position {position}")]
    IllegalCharacter { ch: char, position: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Keywords
    Create,
    Table,
    Insert,
    Into,
    Values,
    Select,
    From,
    Where,
    Group,
    By,
    As,
    Primary,
    Key,
    Not,
    Null,
    Unique,
    Default,
    If,
    Exists,
    And,
    Or,
    True,
    False,

    // Type names
    Int,
    Float,
    Varchar,

    // Aggregate functions
    Count,
    Sum,
    Avg,
    Min,
    Max,

    // Literals. The lexeme lives in `Token::literal`; a number may be
    // integral or fractional and is only interpreted by its consumer.
    Number,
    String,
    Identifier,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,

    // Punctuation
    Comma,
    Semicolon,
    LParen,
    RParen,

    // Special
    Illegal(LexError),
    Eof,
}

impl TokenKind {
    /// Exact-case keyword lookup; anything else lexes as an identifier.
    pub fn keyword(lexeme: &str) -> Option<TokenKind> {
        let kind = match lexeme {
            "CREATE" => TokenKind::Create,
            "TABLE" => TokenKind::Table,
            "INSERT" => TokenKind::Insert,
            "INTO" => TokenKind::Into,
            "VALUES" => TokenKind::Values,
            "SELECT" => TokenKind::Select,
            "FROM" => TokenKind::From,
            "WHERE" => TokenKind::Where,
            "GROUP" => TokenKind::Group,
            "BY" => TokenKind::By,
            "AS" => TokenKind::As,
            "PRIMARY" => TokenKind::Primary,
            "KEY" => TokenKind::Key,
            "NOT" => TokenKind::Not,
            "NULL" => TokenKind::Null,
            "UNIQUE" => TokenKind::Unique,
            "DEFAULT" => TokenKind::Default,
            "IF" => TokenKind::If,
            "EXISTS" => TokenKind::Exists,
            "AND" => TokenKind::And,
            "OR" => TokenKind::Or,
            "TRUE" => TokenKind::True,
            "FALSE" => TokenKind::False,
            "INT" => TokenKind::Int,
            "FLOAT" => TokenKind::Float,
            "VARCHAR" => TokenKind::Varchar,
            "COUNT" => TokenKind::Count,
            "SUM" => TokenKind::Sum,
            "AVG" => TokenKind::Avg,
            "MIN" => TokenKind::Min,
            "MAX" => TokenKind::Max,
            _ => return None,
        };
        Some(kind)
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(
            self,
            TokenKind::Count | TokenKind::Sum | TokenKind::Avg | TokenKind::Min | TokenKind::Max
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Illegal(err) => write!(f, "Illegal({})", err),
            other => write!(f, "{:?}", other),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub literal: String,
    pub position: usize,
}

impl Token {
    pub fn new(kind: TokenKind, literal: impl Into<String>, position: usize) -> Self {
        Self {
            kind,
            literal: literal.into(),
            position,
        }
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }
}

/// Single-pass scanner over SQL text. Positions are byte offsets into the input.
pub struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<Chars<'a>>,
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.chars().peekable(),
            position: 0,
        }
    }

    /// Consumes the lexer and returns every token, always ending with `Eof`.
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token();
            let is_eof = token.is_eof();
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        tokens
    }

    fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let position = self.position;

        let c = match self.peek() {
            None => return Token::new(TokenKind::Eof, "", position),
            Some(c) => c,
        };

        match c {
            ',' => self.single(TokenKind::Comma, position),
            ';' => self.single(TokenKind::Semicolon, position),
            '(' => self.single(TokenKind::LParen, position),
            ')' => self.single(TokenKind::RParen, position),
            '+' => self.single(TokenKind::Plus, position),
            '-' => self.single(TokenKind::Minus, position),
            '*' => self.single(TokenKind::Star, position),
            '/' => self.single(TokenKind::Slash, position),
            '%' => self.single(TokenKind::Percent, position),
            '=' => self.single(TokenKind::Eq, position),
            '<' => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    Token::new(TokenKind::LtEq, "<=", position)
                } else if self.peek() == Some('>') {
                    self.advance();
                    Token::new(TokenKind::NotEq, "<>", position)
                } else {
                    Token::new(TokenKind::Lt, "<", position)
                }
            }
            '>' => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    Token::new(TokenKind::GtEq, ">=", position)
                } else {
                    Token::new(TokenKind::Gt, ">", position)
                }
            }
            '\'' => self.read_string(),
            c if c.is_ascii_digit() => self.read_number(),
            c if c.is_ascii_alphabetic() || c == '_' => self.read_identifier_or_keyword(),
            c => {
                self.advance();
                let err = LexError::IllegalCharacter { ch: c, position };
                Token::new(TokenKind::Illegal(err), c.to_string(), position)
            }
        }
    }

    fn single(&mut self, kind: TokenKind, position: usize) -> Token {
        let start = self.position;
        self.advance();
        Token::new(kind, &self.input[start..self.position], position)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next();
        if let Some(c) = c {
            self.position += c.len_utf8();
        }
        c
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if matches!(c, ' ' | '\t' | '\r' | '\n') {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_string(&mut self) -> Token {
        let position = self.position;
        self.advance(); // opening quote
        let start = self.position;

        loop {
            match self.peek() {
                None => {
                    let err = LexError::UnterminatedString { position };
                    let message = err.to_string();
                    return Token::new(TokenKind::Illegal(err), message, position);
                }
                Some('\'') => {
                    let value = &self.input[start..self.position];
                    self.advance(); // closing quote
                    return Token::new(TokenKind::String, value, position);
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
    }

    /// A maximal run of digits and dots; `1.2.3` is a single token.
    fn read_number(&mut self) -> Token {
        let position = self.position;

        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == '.' {
                self.advance();
            } else {
                break;
            }
        }

        Token::new(TokenKind::Number, &self.input[position..self.position], position)
    }

    fn read_identifier_or_keyword(&mut self) -> Token {
        let position = self.position;

        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }

        let value = &self.input[position..self.position];
        let kind = TokenKind::keyword(value).unwrap_or(TokenKind::Identifier);
        Token::new(kind, value, position)
    }
}

/// Tokenizes `text` in one pass.
pub fn tokenize(text: &str) -> Vec<Token> {
    Lexer::new(text).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_create_statement() {
        let tokens = tokenize("CREATE TABLE users (id INT, name VARCHAR(50));");

        assert_eq!(tokens[0].kind, TokenKind::Create);
        assert_eq!(tokens[1].kind, TokenKind::Table);
        assert_eq!(tokens[2].kind, TokenKind::Identifier);
        assert_eq!(tokens[2].literal, "users");
        assert_eq!(tokens[3].kind, TokenKind::LParen);
        assert_eq!(tokens[5].kind, TokenKind::Int);
        assert_eq!(tokens[8].kind, TokenKind::Varchar);
        assert_eq!(tokens[10].kind, TokenKind::Number);
        assert_eq!(tokens[10].literal, "50");
        assert_eq!(tokens.last().map(|t| &t.kind), Some(&TokenKind::Eof));
    }

    #[test]
    fn test_keywords_are_case_sensitive() {
        let tokens = tokenize("select SELECT");

        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].literal, "select");
        assert_eq!(tokens[1].kind, TokenKind::Select);
    }

    #[test]
    fn test_string_literal() {
        let tokens = tokenize("'hello world'");

        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].literal, "hello world");
        assert_eq!(tokens[1].kind, TokenKind::Eof);
    }

    #[test]
    fn test_unterminated_string() {
        let tokens = tokenize("VALUES ('abc");

        assert!(matches!(
            tokens[2].kind,
            TokenKind::Illegal(LexError::UnterminatedString { position: 8 })
        ));
        assert!(tokens[2].literal.contains("Unterminated"));
        assert_eq!(tokens[3].kind, TokenKind::Eof);
    }

    #[test]
    fn test_numbers_are_not_split() {
        let tokens = tokenize("42 3.14 1.2.3");

        assert_eq!(tokens[0].literal, "42");
        assert_eq!(tokens[1].literal, "3.14");
        assert_eq!(tokens[2].kind, TokenKind::Number);
        assert_eq!(tokens[2].literal, "1.2.3");
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("= <> < > <= >= + - * / %"),
            vec![
                TokenKind::Eq,
                TokenKind::NotEq,
                TokenKind::Lt,
                TokenKind::Gt,
                TokenKind::LtEq,
                TokenKind::GtEq,
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Star,
                TokenKind::Slash,
                TokenKind::Percent,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_illegal_character() {
        let tokens = tokenize("a @ b");

        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert!(matches!(
            tokens[1].kind,
            TokenKind::Illegal(LexError::IllegalCharacter { ch: '@', position: 2 })
        ));
        assert_eq!(tokens[2].literal, "b");
    }

    #[test]
    fn test_non_ascii_letters_are_illegal() {
        let tokens = tokenize("naïve");

        assert_eq!(tokens[0].literal, "na");
        assert!(matches!(
            tokens[1].kind,
            TokenKind::Illegal(LexError::IllegalCharacter { ch: 'ï', position: 2 })
        ));
        assert_eq!(tokens[2].kind, TokenKind::Identifier);
        assert_eq!(tokens[2].literal, "ve");
        assert_eq!(tokens[2].position, 4);
    }

    #[test]
    fn test_identifier_with_underscore_and_digits() {
        let tokens = tokenize("_col1 product_id2");

        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].literal, "_col1");
        assert_eq!(tokens[1].literal, "product_id2");
    }

    #[test]
    fn test_positions_are_byte_offsets() {
        let tokens = tokenize("SELECT  x\n\tFROM t;");

        assert_eq!(tokens[0].position, 0);
        assert_eq!(tokens[1].position, 8);
        assert_eq!(tokens[2].position, 11);
        assert_eq!(tokens[4].kind, TokenKind::Semicolon);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(kinds("  \n "), vec![TokenKind::Eof]);
    }
}
