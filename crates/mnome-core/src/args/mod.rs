//! Command argument handling: token cursor, parser registry, typed adapters.

mod cursor;
pub mod parser;
mod typed;

pub use cursor::Arguments;
pub use parser::{parse, ParserResult, Shape, Value};
pub use typed::{Arg, Args};
