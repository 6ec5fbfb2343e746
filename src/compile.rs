use std::io;

use crate::{
    codegen, lexer, parser,
    token::{Span, Spanned},
    util::{
        fmt::{Context, Show},
        intern::Interner,
    },
};

/// A failure from any phase of the pipeline. The first failure terminates
/// the whole compilation; there is no multi-error accumulation.
#[derive(Debug)]
pub enum Error {
    Lex(Spanned<lexer::Error>),
    Parse(Spanned<parser::Error>),
    Codegen(codegen::Error),
    Io(io::Error),
}

impl Error {
    /// The source position to point at, if the failure has one.
    pub fn span(&self) -> Option<Span> {
        match self {
            Error::Lex(e) => Some(e.span),
            Error::Parse(e) => Some(e.span),
            Error::Codegen(_) | Error::Io(_) => None,
        }
    }
}

impl From<Spanned<lexer::Error>> for Error {
    fn from(error: Spanned<lexer::Error>) -> Error {
        Error::Lex(error)
    }
}

impl From<Spanned<parser::Error>> for Error {
    fn from(error: Spanned<parser::Error>) -> Error {
        Error::Parse(error)
    }
}

impl From<codegen::Error> for Error {
    fn from(error: codegen::Error) -> Error {
        Error::Codegen(error)
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Error {
        Error::Io(error)
    }
}

/// Runs the whole pipeline over `src`, writing the generated code to `sink`.
///
/// Output is all-or-nothing: generation goes to an intermediate buffer, and
/// nothing reaches the sink unless every phase succeeded.
pub fn compile(
    src: &str,
    idents: &mut Interner<str>,
    sink: &mut impl io::Write,
) -> Result<(), Error> {
    let mut tokens = Vec::with_capacity(lexer::SUGGESTED_TOKENS_CAPACITY);
    lexer::lex(src, &mut tokens)?;
    let ast = parser::parse(src, &tokens, idents)?;

    let mut buf = Vec::with_capacity(1024);
    codegen::generate(&mut buf, idents, &ast)?;
    log::debug!("generated {} bytes", buf.len());
    sink.write_all(&buf)?;
    Ok(())
}

/// Renders `error` for human consumption.
///
/// Failures carrying a source position are shown by splicing a ` <-- ...`
/// marker into the source right after the offending characters; positionless
/// failures render as a bare message.
pub fn render_error(src: &str, idents: &Interner<str>, error: &Error) -> String {
    let ctx = Context { idents };
    let message = error.display(&ctx);
    match error.span() {
        Some(span) => {
            let at = (span.lo + span.len as usize).min(src.len());
            format!("{} <-- {message}{}", &src[..at], &src[at..])
        }
        None => message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::util::test_utils::{emit_err, emit_ok};

    #[test]
    fn test_export_then_definition_compiles() {
        assert_eq!(
            emit_ok("export(foo)\nfoo = @() -> {5}"),
            indoc! {"
                define i32 @foo() {
                ret i32 5
                }
            "}
        );
    }

    #[test]
    fn test_exporting_twice_is_idempotent() {
        assert_eq!(
            emit_ok("foo = @() -> {5} export(foo, foo) export(foo)"),
            emit_ok("foo = @() -> {5} export(foo)")
        );
    }

    #[test]
    fn test_no_output_on_late_failure() {
        // `foo` would emit fine on its own; the later failure in `bar` must
        // still suppress it.
        let src = "foo = @() -> {5} bar = @() -> {foo() + 5} export(foo, bar)";
        let mut idents = Interner::with_capacity(32);
        let mut sink = Vec::new();
        let error = compile(src, &mut idents, &mut sink).unwrap_err();
        assert!(matches!(
            error,
            Error::Codegen(codegen::Error::NotYetImplemented { .. })
        ));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_render_lexical_failure_points_at_character() {
        assert_eq!(
            emit_err("foo = @() ? {5}"),
            "foo = @() ? <-- unexpected character {5}"
        );
    }

    #[test]
    fn test_render_eof_failure_appends_to_source() {
        assert_eq!(
            emit_err("foo = @() -> {"),
            "foo = @() -> { <-- unexpected end of file while parsing expression"
        );
    }

    #[test]
    fn test_render_undefined_export_is_positionless() {
        assert_eq!(emit_err("export(foo)"), "cannot find symbol foo for export");
    }

    #[test]
    fn test_render_undefined_function() {
        assert_eq!(
            emit_err("bar = @() -> { foo() }"),
            "bar = @() -> { foo <-- call to undefined function foo() }"
        );
    }

    #[test]
    fn test_render_unsupported_definition() {
        assert_eq!(
            emit_err("foo = 5"),
            "foo = 5 <-- unsupported definition"
        );
    }
}
