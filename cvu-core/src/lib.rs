//! CVU Core - Shared Types
//!
//! Closed enumerations (domains, UI element kinds, action kinds) and the
//! error taxonomy shared by the lexer, parser, expression engine, serializer
//! and cascading resolver. This crate contains no parsing or merging logic.

pub mod enums;
pub mod error;

pub use enums::*;
pub use error::*;
