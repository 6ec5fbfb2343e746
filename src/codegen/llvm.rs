use std::{format_args as f, io, marker::PhantomData};

use crate::{
    ast::{Ast, BinaryOperator, DefnId, DefnKind, Expr, ExprKind},
    codegen::{llvm_env, Error},
    types::Type,
    util::intern::Interner,
};

type Result<T> = std::result::Result<T, Error>;

pub struct Generator<'a, W, E> {
    writer: W,
    idents: &'a Interner<str>,
    ast: &'a Ast,
    /// Zero while no function is open; otherwise the next register number.
    temp_no: u32,
    _env: PhantomData<E>,
}

impl<'a, W, E> Generator<'a, W, E>
where
    W: io::Write,
    E: llvm_env::Env,
{
    pub fn new(writer: W, idents: &'a Interner<str>, ast: &'a Ast) -> Generator<'a, W, E> {
        Generator {
            writer,
            idents,
            ast,
            temp_no: 0,
            _env: PhantomData,
        }
    }

    pub fn generate(mut self) -> Result<()> {
        for (defn, linkage) in self.plan()? {
            self.g_defn(defn, linkage)?;
        }
        Ok(())
    }

    /// Resolves the root scope's export list into the ordered emission plan:
    /// exported definitions first, in declaration order, followed by the
    /// definitions they transitively call, each exactly once and with
    /// internal linkage.
    fn plan(&self) -> Result<Vec<(DefnId, Linkage)>> {
        let ast = self.ast;
        let root = ast.scope(ast.root);

        let mut plan = Vec::with_capacity(root.exports.len());
        for &name in &root.exports {
            let Some(defn) = ast.lookup(ast.root, name) else {
                return Err(Error::UndefinedExport { name });
            };
            if !E::is_exportable_name(self.idents.get(name)) {
                return Err(Error::UnexportableName { name });
            }
            plan.push((defn, Linkage::External));
        }

        let mut cursor = 0;
        while cursor < plan.len() {
            let (defn, _) = plan[cursor];
            cursor += 1;
            let mut targets = Vec::new();
            if let DefnKind::Function(func) = &ast.defn(defn).kind {
                for stmt in &ast.scope(func.body).stmts {
                    collect_call_targets(stmt, &mut targets);
                }
            }
            for target in targets {
                if !plan.iter().any(|&(planned, _)| planned == target) {
                    plan.push((target, Linkage::Internal));
                }
            }
        }
        Ok(plan)
    }

    fn g_defn(&mut self, id: DefnId, linkage: Linkage) -> Result<()> {
        let ast = self.ast;
        let defn = ast.defn(id);
        let name = self.idents.get(defn.name);
        match &defn.kind {
            DefnKind::Function(func) => {
                let ty = ast.defn_resolved_type(id)?.unwrap_or(Type::INT32);
                self.out(f!("define {linkage}{} @{name}() {{", ty.ir_name()));
                self.begin_function();
                for stmt in &ast.scope(func.body).stmts {
                    self.g_stmt(stmt)?;
                }
                self.end_function();
                self.out("}");
            }
            DefnKind::Data(value) => {
                let ty = ast.resolved_type(value)?.unwrap_or(Type::INT32);
                let ExprKind::Int(val) = &value.kind else {
                    return Err(Error::Unsupported {
                        construct: "non-literal data definition",
                    });
                };
                self.out(f!(
                    "@{name} = {linkage}global {} {val}, align {}",
                    ty.ir_name(),
                    ty.alignment()
                ));
            }
        }
        Ok(())
    }

    fn g_stmt(&mut self, stmt: &'a Expr) -> Result<()> {
        match &stmt.kind {
            ExprKind::Return(child) => self.g_return(child),
            ExprKind::Call { .. } => Err(Error::NotYetImplemented {
                construct: "function call",
            }),
            // A local definition emits nothing by itself; it is only emitted
            // (at the top level, with internal linkage) if something
            // reachable from an export calls it.
            ExprKind::Defn(_) => Ok(()),
            ExprKind::Int(_) | ExprKind::Id(_) | ExprKind::Binary { .. } => {
                Err(Error::Unsupported {
                    construct: "expression statement",
                })
            }
        }
    }

    fn g_return(&mut self, child: &'a Expr) -> Result<()> {
        assert!(
            self.is_inside_function(),
            "return emitted outside a function body"
        );
        let ty = self.ast.resolved_type(child)?.unwrap_or(Type::INT32);
        let value = self.g_expr(child)?;
        self.out(f!("ret {} {value}", ty.ir_name()));
        Ok(())
    }

    /// Emits the instructions computing `expr`, yielding the operand (a
    /// literal or a register reference) carrying its value.
    fn g_expr(&mut self, expr: &'a Expr) -> Result<Value<'a>> {
        match &expr.kind {
            ExprKind::Int(val) => Ok(Value::Literal(val.as_ref())),
            ExprKind::Binary { op, lhs, rhs } => {
                let BinaryOperator::Add = op else {
                    return Err(Error::Unsupported {
                        construct: "binary operator",
                    });
                };
                // The instruction is typed after its left operand.
                let ty = self.ast.resolved_type(lhs)?.unwrap_or(Type::INT32);
                let lhs = self.g_expr(lhs)?;
                let rhs = self.g_expr(rhs)?;
                let reg = self.next_temp();
                self.out(f!("%{reg} = add nsw {} {lhs}, {rhs}", ty.ir_name()));
                Ok(Value::Register(reg))
            }
            ExprKind::Call { .. } => Err(Error::NotYetImplemented {
                construct: "function call",
            }),
            ExprKind::Id(_) => Err(Error::Unsupported {
                construct: "identifier reference",
            }),
            ExprKind::Return(_) | ExprKind::Defn(_) => {
                unreachable!("statement node in expression position")
            }
        }
    }
}

/// Register counter state machine.
impl<W, E> Generator<'_, W, E>
where
    W: io::Write,
    E: llvm_env::Env,
{
    fn begin_function(&mut self) {
        assert_eq!(self.temp_no, 0, "function emission must begin while idle");
        self.temp_no = 1;
    }

    fn end_function(&mut self) {
        assert!(self.is_inside_function(), "no function is open");
        self.temp_no = 0;
    }

    fn is_inside_function(&self) -> bool {
        self.temp_no >= 1
    }

    fn next_temp(&mut self) -> u32 {
        assert!(
            self.is_inside_function(),
            "register allocated outside a function body"
        );
        let reg = self.temp_no;
        self.temp_no += 1;
        reg
    }

    /// Prints a line.
    fn out(&mut self, f: impl std::fmt::Display) {
        writeln!(self.writer, "{f}").expect("Failed to write to sink");
    }
}

fn collect_call_targets(expr: &Expr, out: &mut Vec<DefnId>) {
    match &expr.kind {
        ExprKind::Call { target, args, .. } => {
            out.push(*target);
            for arg in args {
                collect_call_targets(arg, out);
            }
        }
        ExprKind::Return(child) => collect_call_targets(child, out),
        ExprKind::Binary { lhs, rhs, .. } => {
            collect_call_targets(lhs, out);
            collect_call_targets(rhs, out);
        }
        ExprKind::Int(_) | ExprKind::Id(_) | ExprKind::Defn(_) => {}
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Linkage {
    External,
    Internal,
}

impl std::fmt::Display for Linkage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Linkage::External => Ok(()),
            Linkage::Internal => f.write_str("internal "),
        }
    }
}

#[derive(Copy, Clone)]
enum Value<'a> {
    Literal(&'a str),
    Register(u32),
}

impl std::fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Literal(val) => f.write_str(val),
            Value::Register(reg) => write!(f, "%{reg}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use indoc::indoc;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        ast::Defn,
        codegen::llvm_env::Generic,
        token::Span,
        util::test_utils::parse_ok,
    };

    fn generate_str(src: &str) -> String {
        let (idents, ast) = parse_ok(src);
        let mut buf = Vec::with_capacity(512);
        Generator::<_, Generic>::new(&mut buf, &idents, &ast)
            .generate()
            .expect("failed to generate");
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_single_function() {
        assert_eq!(
            generate_str("foo = @() -> {5} export(foo)"),
            indoc! {"
                define i32 @foo() {
                ret i32 5
                }
            "}
        );
    }

    #[test]
    fn test_registers_increase_within_one_function() {
        assert_eq!(
            generate_str("foo = @() -> {5} bar = @() -> {5 + 6 + 4} export(bar)"),
            indoc! {"
                define i32 @bar() {
                %1 = add nsw i32 5, 6
                %2 = add nsw i32 %1, 4
                ret i32 %2
                }
            "}
        );
    }

    #[test]
    fn test_registers_reset_per_function() {
        assert_eq!(
            generate_str("a = @() -> {1 + 2} b = @() -> {3 + 4} export(a, b)"),
            indoc! {"
                define i32 @a() {
                %1 = add nsw i32 1, 2
                ret i32 %1
                }
                define i32 @b() {
                %1 = add nsw i32 3, 4
                ret i32 %1
                }
            "}
        );
    }

    #[test]
    fn test_unexported_and_unreferenced_is_not_emitted() {
        let out = generate_str("foo = @() -> {5} bar = @() -> {6} export(bar)");
        assert!(!out.contains("@foo"));
    }

    #[test]
    fn test_plan_pulls_in_call_targets_once() {
        let (mut idents, ast) = parse_ok(
            "foo = @() -> {5} \
             foo3 = @() -> {foo() + foo()} \
             export(foo3)",
        );
        let generator = Generator::<_, Generic>::new(io::sink(), &idents, &ast);
        let plan = generator.plan().expect("failed to plan");

        let foo = idents.intern("foo");
        let foo3 = idents.intern("foo3");
        let named: Vec<_> = plan
            .iter()
            .map(|&(defn, linkage)| (ast.defn(defn).name, linkage))
            .collect();
        assert_eq!(named, [(foo3, Linkage::External), (foo, Linkage::Internal)]);
    }

    #[test]
    fn test_internal_function_linkage() {
        let (mut idents, ast) = parse_ok("foo = @() -> {5}");
        let foo = idents.intern("foo");
        let defn = ast.lookup(ast.root, foo).unwrap();

        let mut buf = Vec::new();
        let mut generator = Generator::<_, Generic>::new(&mut buf, &idents, &ast);
        generator.g_defn(defn, Linkage::Internal).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            indoc! {"
                define internal i32 @foo() {
                ret i32 5
                }
            "}
        );
    }

    #[test]
    fn test_undefined_export() {
        let (mut idents, ast) = parse_ok("export(foo)");
        let foo = idents.intern("foo");
        let err = Generator::<_, Generic>::new(io::sink(), &idents, &ast)
            .generate()
            .unwrap_err();
        assert_eq!(err, Error::UndefinedExport { name: foo });
    }

    #[test]
    fn test_env_may_reject_export_names() {
        struct NoPriv;
        impl llvm_env::Env for NoPriv {
            fn is_exportable_name(name: &str) -> bool {
                !name.starts_with("priv")
            }
        }

        let (mut idents, ast) = parse_ok("privFoo = @() -> {5} export(privFoo)");
        let name = idents.intern("privFoo");
        let err = Generator::<_, NoPriv>::new(io::sink(), &idents, &ast)
            .generate()
            .unwrap_err();
        assert_eq!(err, Error::UnexportableName { name });
    }

    #[test]
    fn test_call_is_not_yet_implemented() {
        let (idents, ast) = parse_ok("foo = @() -> {5} bar = @() -> {foo() + 5} export(bar)");
        let err = Generator::<_, Generic>::new(io::sink(), &idents, &ast)
            .generate()
            .unwrap_err();
        assert_eq!(
            err,
            Error::NotYetImplemented {
                construct: "function call"
            }
        );
    }

    #[test]
    fn test_data_definition_emits_a_global() {
        let mut ast = crate::ast::Ast::new();
        let root = ast.alloc_scope(None);
        ast.root = root;

        let mut idents = Interner::with_capacity(4);
        let x = idents.intern("x");
        let span = Span::new_of_length(0, 0);
        let defn = ast.alloc_defn(Defn {
            name: x,
            span,
            kind: DefnKind::Data(Expr::new(ExprKind::Int("5".into()), span)),
        });

        let mut buf = Vec::new();
        let mut generator = Generator::<_, Generic>::new(&mut buf, &idents, &ast);
        generator.g_defn(defn, Linkage::External).unwrap();
        generator.g_defn(defn, Linkage::Internal).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            indoc! {"
                @x = global i32 5, align 4
                @x = internal global i32 5, align 4
            "}
        );
    }

    #[test]
    fn test_non_add_operator_is_unsupported() {
        use crate::ast::{Ast, BinaryOperator, FunctionDefn};

        let mut ast = Ast::new();
        let root = ast.alloc_scope(None);
        ast.root = root;
        let body = ast.alloc_scope(Some(root));

        let span = Span::new_of_length(0, 0);
        let sub = Expr::new(
            ExprKind::Binary {
                op: BinaryOperator::Sub,
                lhs: Box::new(Expr::new(ExprKind::Int("1".into()), span)),
                rhs: Box::new(Expr::new(ExprKind::Int("2".into()), span)),
            },
            span,
        );
        ast.scope_mut(body)
            .stmts
            .push(Expr::new(ExprKind::Return(Box::new(sub)), span));

        let mut idents = Interner::with_capacity(4);
        let foo = idents.intern("foo");
        let defn = ast.alloc_defn(Defn {
            name: foo,
            span,
            kind: DefnKind::Function(FunctionDefn {
                args: Vec::new(),
                body,
                returns: vec![0],
            }),
        });

        let mut generator = Generator::<_, Generic>::new(io::sink(), &idents, &ast);
        let err = generator.g_defn(defn, Linkage::External).unwrap_err();
        assert_eq!(
            err,
            Error::Unsupported {
                construct: "binary operator"
            }
        );
    }
}
