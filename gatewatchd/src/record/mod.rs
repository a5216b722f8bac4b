pub mod keys;
pub mod parser;

pub use parser::parse;
