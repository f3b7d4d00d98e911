//! Front end for forge script: lexical analysis and syntactic analysis.
//!
//! ```ignore
//! use typeforge_engine::parser::Parser;
//!
//! let (unit, errors) = Parser::new("namespace Demo { public class A { } }").parse();
//! assert!(errors.is_empty());
//! assert_eq!(unit.namespaces[0].classes[0].name, "A");
//! ```

pub mod ast;
pub mod lexer;
#[allow(clippy::module_inception)]
pub mod parser;
pub mod token;

pub use lexer::{LexError, Lexer, LineIndex};
pub use parser::{ParseError, Parser};
pub use token::{is_identifier, is_qualified_identifier, Span, Token};
