use crate::{
    ast::Ast,
    compile, lexer, parser,
    util::fmt::{tree, Context, Show},
    util::intern::Interner,
};

pub(crate) fn parse_ok(src: &str) -> (Interner<str>, Ast) {
    let tokens = lexer::lex_in_new(src).expect("failed to lex");
    let mut idents = Interner::with_capacity(32);
    let ast = parser::parse(src, &tokens, &mut idents).expect("failed to parse");
    (idents, ast)
}

pub(crate) fn tree_of(src: &str) -> String {
    let (idents, ast) = parse_ok(src);
    tree::print_ast_string(&idents, &ast)
}

pub(crate) fn parse_err(src: &str) -> String {
    let tokens = lexer::lex_in_new(src).expect("failed to lex");
    let mut idents = Interner::with_capacity(32);
    let error = parser::parse(src, &tokens, &mut idents).expect_err("parse must fail");
    let ctx = Context { idents: &idents };
    format!("{:#}", error.display(&ctx))
}

pub(crate) fn emit_ok(src: &str) -> String {
    let mut idents = Interner::with_capacity(32);
    let mut out = Vec::with_capacity(256);
    compile::compile(src, &mut idents, &mut out).expect("failed to compile");
    String::from_utf8(out).unwrap()
}

pub(crate) fn emit_err(src: &str) -> String {
    let mut idents = Interner::with_capacity(32);
    let mut out = Vec::with_capacity(256);
    let error = compile::compile(src, &mut idents, &mut out).expect_err("compile must fail");
    assert!(out.is_empty(), "no output may be emitted on failure");
    compile::render_error(src, &idents, &error)
}
