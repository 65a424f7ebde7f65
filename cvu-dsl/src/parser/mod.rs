//! Parser module for CVU view definitions

pub mod ast;
pub mod dict;
pub mod parser;

pub use ast::*;
pub use dict::{
    fold_compound_properties, unfold_compound_properties, CHILDREN_KEY, CORNER_BORDER_KEYS,
    FRAME_KEYS, RENDER_DEFINITIONS_KEY, SESSION_DEFINITIONS_KEY,
};
pub use parser::*;
