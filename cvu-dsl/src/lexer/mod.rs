//! Lexer module for CVU source

pub mod scanner;
pub mod token;

pub use scanner::*;
pub use token::*;
