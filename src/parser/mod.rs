// Parser module: response validation and response-key grammar.

pub mod key_grammar;
pub mod response_parser;

pub use response_parser::ResponseParser;
