//! Line-oriented board description.
//!
//! A board lists elements and the grid slots their terminals occupy. It is a
//! stand-in for the placement layer: the CLI, the WASM binding and the tests
//! build networks from it.
//!
//! # Grammar Overview
//!
//! ```text
//! board      = { line }
//! line       = comment | directive | element | empty
//! comment    = ('#' | ';') { any_char }
//! directive  = ".pos" slot number number number
//!            | ".probe" name { name }
//! element    = name terminal terminal [ "AC" | "DC" ] [value] { key '=' value }
//! terminal   = digit+ | "NC"
//! value      = number [unit_suffix]
//! unit_suffix = 'p' | 'n' | 'u' | 'm' | 'k' | 'M' | 'G'
//! ```
//!
//! # Element Types
//!
//! | Prefix | Element | Syntax |
//! |--------|---------|--------|
//! | W | Wire | `W<name> <l> <r>` |
//! | R | Resistor | `R<name> <l> <r> <ohms>` |
//! | C | Capacitor | `C<name> <l> <r> <farads> [q=<coulombs>]` or `edge= spacing= [k=]` |
//! | L | Inductor | `L<name> <l> <r> <henries> [i=<amps>]` or `turns= radius= length= [k=]` |
//! | V | DC source | `V<name> <l> <r> <volts>` |
//! | V | AC source | `V<name> <l> <r> AC <amplitude> w=<rad/s>` or `f=<Hz>` |
//!
//! # Example
//!
//! ```text
//! # RC low-pass driven at 50 Hz
//! VIN 0 1 AC 1.0 f=50
//! R1  1 2 1k
//! C1  2 0 1u
//! ```

mod ast;
mod lexer;
mod parser;

pub use ast::*;
pub use lexer::{parse_value, Lexer, Token, TokenKind};
pub use parser::Parser;

use crate::error::Result;

/// Parse a board description string into an AST.
pub fn parse(input: &str) -> Result<BoardAst> {
    let lexer = Lexer::new(input);
    let mut parser = Parser::new(lexer)?;
    parser.parse()
}

/// Parse a board description file.
#[cfg(feature = "cli")]
pub fn parse_file(path: &std::path::Path) -> Result<BoardAst> {
    let content = std::fs::read_to_string(path).map_err(|e| crate::error::CirsimError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse(&content)
}
