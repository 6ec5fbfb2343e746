use std::io;

use crate::{
    ast::Ast,
    types,
    util::intern::{Interned, Interner},
};

pub mod llvm;
pub mod llvm_env;

/// Generates textual LLVM IR for every exported definition of `ast`, plus
/// the definitions they transitively reference.
pub fn generate<W>(writer: W, idents: &Interner<str>, ast: &Ast) -> Result<(), Error>
where
    W: io::Write,
{
    type GenericGenerator<'a, W> = llvm::Generator<'a, W, llvm_env::Generic>;

    GenericGenerator::new(writer, idents, ast).generate()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// An exported name is not bound in the root scope.
    UndefinedExport { name: Interned<str> },
    /// The environment rejected an exported name.
    UnexportableName { name: Interned<str> },
    /// The construct is intentionally not generatable.
    Unsupported { construct: &'static str },
    /// The construct is parseable but has no backend support yet.
    NotYetImplemented { construct: &'static str },
    Type(types::Error),
}

impl From<types::Error> for Error {
    fn from(error: types::Error) -> Error {
        Error::Type(error)
    }
}
