/// The lexer takes the source input, mapping it into a sequence of tokens.
pub mod lexer;

/// The parser takes a sequence of tokens, mapping it into an AST forest
/// with per-scope symbol tables and an export list.
pub mod parser;

/// Code generation for the textual LLVM IR backend.
pub mod codegen;

/// The compile driver: lex, parse, resolve exports, generate.
pub mod compile;

pub mod ast;
pub mod symbols;
pub mod token;
pub mod types;

pub mod util {
    pub mod fmt;
    pub mod intern;
    #[cfg(test)]
    pub(crate) mod test_utils;
}
