use crate::{
    codegen, compile, lexer, parser,
    token::Spanned,
    types,
    util::fmt::Show,
};

impl Show for Spanned<lexer::Error> {
    fn show(&self, f: &mut std::fmt::Formatter<'_>, _: &super::Context<'_>) -> std::fmt::Result {
        let Spanned { span, inner: error } = self;

        if f.alternate() {
            write!(f, "{span}: ")?;
        }

        match error {
            lexer::Error::UnexpectedChar => write!(f, "unexpected character"),
        }
    }
}

impl Show for Spanned<parser::Error> {
    fn show(&self, f: &mut std::fmt::Formatter<'_>, ctx: &super::Context<'_>) -> std::fmt::Result {
        let i = ctx.idents;
        let Spanned { span, inner: error } = self;

        if f.alternate() {
            write!(f, "{span}: ")?;
        }

        use parser::Error::*;
        match error {
            Unexpected { actual, expected } => {
                write!(f, "expected token {expected:?}, but got {actual:?}")
            }
            UnexpectedAny { actual, expected } => {
                write!(f, "expected one of {expected:?}, but got {actual:?}")
            }
            UnexpectedEof { operation } => {
                write!(f, "unexpected end of file while parsing {operation}")
            }
            UndefinedFunction { name } => {
                let name = i.get(name);
                write!(f, "call to undefined function {name}")
            }
            Redefinition { name } => {
                let name = i.get(name);
                write!(f, "redefinition of {name}")
            }
            UnsupportedDefinition => write!(f, "unsupported definition"),
        }
    }
}

impl Show for codegen::Error {
    fn show(&self, f: &mut std::fmt::Formatter<'_>, ctx: &super::Context<'_>) -> std::fmt::Result {
        let i = ctx.idents;

        use codegen::Error::*;
        match self {
            UndefinedExport { name } => {
                let name = i.get(name);
                write!(f, "cannot find symbol {name} for export")
            }
            UnexportableName { name } => {
                let name = i.get(name);
                write!(f, "name {name} is not exportable on this target")
            }
            Unsupported { construct } => write!(f, "unsupported feature: {construct}"),
            NotYetImplemented { construct } => {
                write!(f, "{construct} generation is not yet implemented")
            }
            Type(types::Error::DeducedMismatch {
                specified,
                inferred,
            }) => {
                write!(
                    f,
                    "specified type {} does not match inferred type {}",
                    specified.ir_name(),
                    inferred.ir_name()
                )
            }
        }
    }
}

impl Show for compile::Error {
    fn show(&self, f: &mut std::fmt::Formatter<'_>, ctx: &super::Context<'_>) -> std::fmt::Result {
        match self {
            compile::Error::Lex(e) => e.show(f, ctx),
            compile::Error::Parse(e) => e.show(f, ctx),
            compile::Error::Codegen(e) => e.show(f, ctx),
            compile::Error::Io(e) => write!(f, "failed to write output: {e}"),
        }
    }
}
