pub mod lexer;
pub mod ast;
pub mod parser;
pub mod eval;
pub mod executor;

pub use lexer::{Lexer, Token, TokenKind};
pub use ast::*;
pub use parser::{Parser, ParseError};
pub use executor::{Executor, ExecutionError, StatementOutcome, execute_script};
