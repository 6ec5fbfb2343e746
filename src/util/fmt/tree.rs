//! Plain-text AST printer, mostly useful for tests and the `parse` command.

use std::io::Write;

use crate::{
    ast::{Ast, DefnId, DefnKind, Expr, ExprKind, ScopeId},
    token::Span,
    util::intern::Interner,
};

const INDENT_WIDTH: usize = 2;

pub fn print_ast_string(idents: &Interner<str>, ast: &Ast) -> String {
    let mut buf = Vec::with_capacity(1024);
    print_scope(&mut buf, idents, ast, ast.root, 0).unwrap();
    String::from_utf8(buf).unwrap()
}

fn print_scope(
    w: &mut impl Write,
    idents: &Interner<str>,
    ast: &Ast,
    scope: ScopeId,
    i: usize,
) -> std::io::Result<()> {
    let scope = ast.scope(scope);
    for stmt in &scope.stmts {
        print_expr(w, idents, ast, i, stmt)?;
    }
    if !scope.exports.is_empty() {
        sp(w, i)?;
        write!(w, "exports:")?;
        for (idx, name) in scope.exports.iter().enumerate() {
            let sep = if idx > 0 { "," } else { "" };
            write!(w, "{sep} {}", idents.get(name))?;
        }
        writeln!(w)?;
    }
    Ok(())
}

fn print_expr(
    w: &mut impl Write,
    idents: &Interner<str>,
    ast: &Ast,
    i: usize,
    expr: &Expr,
) -> std::io::Result<()> {
    sp(w, i)?;
    let span = expr.span;
    match &expr.kind {
        ExprKind::Defn(id) => print_defn(w, idents, ast, i, *id, span)?,
        ExprKind::Int(val) => writeln!(w, "int {val} ({span})")?,
        ExprKind::Id(name) => writeln!(w, "ident {} ({span})", idents.get(name))?,
        ExprKind::Return(child) => {
            writeln!(w, "return ({span})")?;
            print_expr(w, idents, ast, i + 1, child)?;
        }
        ExprKind::Binary { op, lhs, rhs } => {
            writeln!(w, "binary {op:?} ({span})")?;
            print_expr(w, idents, ast, i + 1, lhs)?;
            print_expr(w, idents, ast, i + 1, rhs)?;
        }
        ExprKind::Call { callee, args, .. } => {
            writeln!(w, "call {} ({span})", idents.get(callee))?;
            for arg in args {
                print_expr(w, idents, ast, i + 1, arg)?;
            }
        }
    }
    Ok(())
}

// The printed span is the whole statement's, name included, rather than the
// definition node's own.
fn print_defn(
    w: &mut impl Write,
    idents: &Interner<str>,
    ast: &Ast,
    i: usize,
    id: DefnId,
    span: Span,
) -> std::io::Result<()> {
    let defn = ast.defn(id);
    match &defn.kind {
        DefnKind::Function(func) => {
            writeln!(w, "function {} ({span})", idents.get(defn.name))?;
            for arg in &func.args {
                sp(w, i + 1)?;
                write!(w, "arg {}", idents.get(arg.name))?;
                if let Some(ty) = &arg.ty {
                    write!(w, ": {}", idents.get(ty))?;
                }
                writeln!(w)?;
            }
            print_scope(w, idents, ast, func.body, i + 1)?;
        }
        DefnKind::Data(value) => {
            writeln!(w, "data {} ({span})", idents.get(defn.name))?;
            print_expr(w, idents, ast, i + 1, value)?;
        }
    }
    Ok(())
}

fn sp(w: &mut impl Write, i: usize) -> std::io::Result<()> {
    write!(w, "{:width$}", "", width = i * INDENT_WIDTH)
}
