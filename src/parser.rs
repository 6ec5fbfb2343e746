use crate::{
    ast::{
        ArgDecl, Ast, BinaryOperator, Defn, DefnId, DefnKind, Expr, ExprKind, FunctionDefn,
        ScopeId,
    },
    token::{Span, Spanned, Token, TokenKind},
    util::intern::{Interned, Interner},
};

type Result<T> = std::result::Result<T, Spanned<Error>>;

/// Parses a whole program out of a pre-lexed token stream.
///
/// Parsing stops at the first error. Name resolution is eager: a call must
/// refer to a definition that has already been fully parsed, so neither
/// forward references nor recursion can be expressed.
pub fn parse(src: &str, tokens: &[Token], idents: &mut Interner<str>) -> Result<Ast> {
    Parser::new(src, tokens, idents).parse_program()
}

struct Parser<'src, 'tok, 'ident> {
    src: &'src str,
    tokens: &'tok [Token],
    idents: &'ident mut Interner<str>,
    cursor: usize,
    ast: Ast,
    scope_stack: Vec<ScopeId>,
}

impl Parser<'_, '_, '_> {
    fn parse_program(mut self) -> Result<Ast> {
        let root = self.ast.alloc_scope(None);
        self.ast.root = root;
        self.scope_stack.push(root);

        while !self.is(TokenKind::Eof) {
            if let Some(stmt) = self.parse_statement()? {
                self.ast.scope_mut(root).stmts.push(stmt);
            }
        }
        self.ast.scope_mut(root).span = Span::new_of_bounds(0..self.src.len());
        Ok(self.ast)
    }

    /// Parses a single statement. Export statements are recorded on the
    /// current scope and produce no node, hence the `Option`.
    fn parse_statement(&mut self) -> Result<Option<Expr>> {
        if self.is(TokenKind::Export) {
            self.parse_exports()?;
            return Ok(None);
        }

        let name_token = self.consume(TokenKind::Identifier, "statement")?;
        let name = self.intern_token(name_token);

        match self.peek().kind {
            TokenKind::Eq => {
                self.advance();
                let defn = self.parse_definition(name, name_token.span())?;
                let span = name_token.span().to(self.ast.defn(defn).span);
                Ok(Some(Expr::new(ExprKind::Defn(defn), span)))
            }
            TokenKind::LParen => Ok(Some(self.parse_call(name, name_token.span())?)),
            TokenKind::Eof => Err(self.peek().span().wrap(Error::UnexpectedEof {
                operation: "statement",
            })),
            _ => {
                let c = self.peek();
                Err(c.span().wrap(Error::UnexpectedAny {
                    actual: c.kind,
                    expected: Box::from([TokenKind::Eq, TokenKind::LParen]),
                }))
            }
        }
    }

    /// definition ::= '@' ['(' decls ')'] ['->'] '{' ... '}'
    ///
    /// With `->` the braces hold a single expression which is implicitly
    /// returned. Without it they hold a nested scope of statements.
    fn parse_definition(&mut self, name: Interned<str>, name_span: Span) -> Result<DefnId> {
        if self.ast.scope(self.scope()).symbols.get(name).is_some() {
            return Err(name_span.wrap(Error::Redefinition { name }));
        }

        let c = self.peek();
        if c.kind != TokenKind::At {
            // Only function definitions may follow `=`.
            return Err(c.span().wrap(Error::UnsupportedDefinition));
        }
        let at = self.advance();

        let args = if self.take(TokenKind::LParen) {
            self.parse_arg_decls()?
        } else {
            Vec::new()
        };

        let implicit_return = self.take(TokenKind::Arrow);
        let open = self.consume(TokenKind::LBrace, "function definition")?;

        let body = self.ast.alloc_scope(Some(self.scope()));
        self.scope_stack.push(body);
        let mut returns = Vec::new();
        if implicit_return {
            let expr = self.parse_body_expr()?;
            let span = expr.span;
            let ret = Expr::new(ExprKind::Return(Box::new(expr)), span);
            returns.push(self.ast.scope(body).stmts.len());
            self.ast.scope_mut(body).stmts.push(ret);
        } else {
            while !self.is(TokenKind::RBrace) {
                if self.is(TokenKind::Eof) {
                    return Err(self.peek().span().wrap(Error::UnexpectedEof {
                        operation: "function body",
                    }));
                }
                if let Some(stmt) = self.parse_statement()? {
                    self.ast.scope_mut(body).stmts.push(stmt);
                }
            }
        }
        self.scope_stack.pop();

        let close = self.consume(TokenKind::RBrace, "function body")?;
        self.ast.scope_mut(body).span = open.span().to(close.span());

        let defn = self.ast.alloc_defn(Defn {
            name,
            span: at.span().to(close.span()),
            kind: DefnKind::Function(FunctionDefn {
                args,
                body,
                returns,
            }),
        });
        // The name only becomes visible after its definition has been fully
        // parsed, which is what rules out recursion.
        let enclosing = self.scope();
        self.ast.scope_mut(enclosing).symbols.bind(name, defn);
        Ok(defn)
    }

    fn parse_arg_decls(&mut self) -> Result<Vec<ArgDecl>> {
        let mut decls = Vec::new();
        while !self.is(TokenKind::RParen) {
            let name_token = self.consume(TokenKind::Identifier, "argument list")?;
            let name = self.intern_token(name_token);
            let mut span = name_token.span();
            let ty = if self.take(TokenKind::Colon) {
                let ty_token = self.consume(TokenKind::Identifier, "argument list")?;
                span = span.to(ty_token.span());
                Some(self.intern_token(ty_token))
            } else {
                None
            };
            decls.push(ArgDecl { name, ty, span });
            if !self.take(TokenKind::Comma) {
                break;
            }
        }
        self.consume(TokenKind::RParen, "argument list")?;
        Ok(decls)
    }

    /// expr ::= term ('+' term)*, left-associative.
    ///
    /// `+` is the only operator accepted at this layer.
    fn parse_body_expr(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_term()?;
        while self.take(TokenKind::Plus) {
            let op = BinaryOperator::Add;
            let rhs = self.parse_term()?;
            let span = lhs.span.to(rhs.span);
            lhs = Expr::new(
                ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span,
            );
        }
        Ok(lhs)
    }

    /// term ::= NUMBER | ID '(' args ')'
    fn parse_term(&mut self) -> Result<Expr> {
        let c = self.peek();
        match c.kind {
            TokenKind::Number => {
                self.advance();
                let text = c.span().substr(self.src);
                Ok(Expr::new(ExprKind::Int(text.into()), c.span()))
            }
            TokenKind::Identifier => {
                self.advance();
                let name = self.intern_token(c);
                self.parse_call(name, c.span())
            }
            TokenKind::Eof => Err(c.span().wrap(Error::UnexpectedEof {
                operation: "expression",
            })),
            actual => Err(c.span().wrap(Error::UnexpectedAny {
                actual,
                expected: Box::from([TokenKind::Number, TokenKind::Identifier]),
            })),
        }
    }

    /// Parses a call whose name token has already been consumed. The callee
    /// is resolved right here, at the call site.
    fn parse_call(&mut self, name: Interned<str>, name_span: Span) -> Result<Expr> {
        self.consume(TokenKind::LParen, "function call")?;
        let Some(target) = self.ast.lookup(self.scope(), name) else {
            return Err(name_span.wrap(Error::UndefinedFunction { name }));
        };

        let mut args = Vec::new();
        while !self.is(TokenKind::RParen) {
            args.push(self.parse_call_arg()?);
            if !self.take(TokenKind::Comma) {
                break;
            }
        }
        let close = self.consume(TokenKind::RParen, "function call")?;

        Ok(Expr::new(
            ExprKind::Call {
                callee: name,
                target,
                args,
            },
            name_span.to(close.span()),
        ))
    }

    /// arg ::= NUMBER | ID
    ///
    /// Identifier arguments stay plain reference nodes; they are not
    /// resolved against the symbol table.
    fn parse_call_arg(&mut self) -> Result<Expr> {
        let c = self.peek();
        match c.kind {
            TokenKind::Number => {
                self.advance();
                let text = c.span().substr(self.src);
                Ok(Expr::new(ExprKind::Int(text.into()), c.span()))
            }
            TokenKind::Identifier => {
                self.advance();
                let name = self.intern_token(c);
                Ok(Expr::new(ExprKind::Id(name), c.span()))
            }
            TokenKind::Eof => Err(c.span().wrap(Error::UnexpectedEof {
                operation: "function call",
            })),
            actual => Err(c.span().wrap(Error::UnexpectedAny {
                actual,
                expected: Box::from([TokenKind::Number, TokenKind::Identifier]),
            })),
        }
    }

    /// export ::= 'export' '(' ID (',' ID)* ')'
    ///
    /// Repeated names, in one list or across lists, are recorded once.
    fn parse_exports(&mut self) -> Result<()> {
        self.consume(TokenKind::Export, "export list")?;
        self.consume(TokenKind::LParen, "export list")?;
        loop {
            let name_token = self.consume(TokenKind::Identifier, "export list")?;
            let name = self.intern_token(name_token);
            let scope = self.scope();
            let exports = &mut self.ast.scope_mut(scope).exports;
            if !exports.contains(&name) {
                exports.push(name);
            }
            if !self.take(TokenKind::Comma) {
                break;
            }
        }
        self.consume(TokenKind::RParen, "export list")?;
        Ok(())
    }
}

impl Parser<'_, '_, '_> {
    fn new<'src, 'tok, 'ident>(
        src: &'src str,
        tokens: &'tok [Token],
        idents: &'ident mut Interner<str>,
    ) -> Parser<'src, 'tok, 'ident> {
        Parser {
            src,
            tokens,
            idents,
            cursor: 0,
            ast: Ast::new(),
            scope_stack: Vec::with_capacity(4),
        }
    }

    fn scope(&self) -> ScopeId {
        *self.scope_stack.last().expect("scope stack is never empty")
    }

    fn intern_token(&mut self, token: Token) -> Interned<str> {
        self.idents.intern(token.span().substr(self.src))
    }

    /// Returns the current token.
    fn peek(&self) -> Token {
        match self.tokens.get(self.cursor) {
            Some(token) => *token,
            None => Token::eof_for(self.src),
        }
    }

    /// Returns the current token and advances.
    fn advance(&mut self) -> Token {
        let c = self.peek();
        self.cursor += 1;
        c
    }

    /// Checks whether the current token matches the given one.
    fn is(&self, expect: TokenKind) -> bool {
        self.peek().kind == expect
    }

    /// Advances if the current token matches the provided one, returning
    /// true. If not, returns false and doesn't advance.
    fn take(&mut self, expect: TokenKind) -> bool {
        if self.is(expect) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Advances if the current token matches the provided one. If not,
    /// fails. An exhausted stream always fails as an end-of-file error
    /// naming the surrounding `operation`, never as an unexpected token.
    fn consume(&mut self, expected: TokenKind, operation: &'static str) -> Result<Token> {
        let c = self.peek();
        if self.is(expected) {
            self.advance();
            Ok(c)
        } else if c.is_eof() {
            Err(c.span().wrap(Error::UnexpectedEof { operation }))
        } else {
            Err(c.span().wrap(Error::Unexpected {
                actual: c.kind,
                expected,
            }))
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    Unexpected {
        actual: TokenKind,
        expected: TokenKind,
    },
    UnexpectedAny {
        actual: TokenKind,
        expected: Box<[TokenKind]>,
    },
    UnexpectedEof {
        operation: &'static str,
    },
    UndefinedFunction {
        name: Interned<str>,
    },
    Redefinition {
        name: Interned<str>,
    },
    /// The right-hand side of `=` was not a function definition.
    UnsupportedDefinition,
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    use crate::util::test_utils::{parse_err, parse_ok, tree_of};

    #[test]
    fn test_simple_function() {
        assert_eq!(
            tree_of("foo = @() -> { 5 }"),
            indoc! {"
                function foo (0..18)
                  return (15..16)
                    int 5 (15..16)
            "}
        );
    }

    #[test]
    fn test_sum_chain_is_left_associative() {
        assert_eq!(
            tree_of("a = @() -> { 1 + 2 + 3 }"),
            indoc! {"
                function a (0..24)
                  return (13..22)
                    binary Add (13..22)
                      binary Add (13..18)
                        int 1 (13..14)
                        int 2 (17..18)
                      int 3 (21..22)
            "}
        );
    }

    #[test]
    fn test_call_resolves_to_earlier_definition() {
        assert_eq!(
            tree_of("foo = @() -> { 5 } bar = @() -> { foo() + 5 }"),
            indoc! {"
                function foo (0..18)
                  return (15..16)
                    int 5 (15..16)
                function bar (19..45)
                  return (34..43)
                    binary Add (34..43)
                      call foo (34..39)
                      int 5 (42..43)
            "}
        );
    }

    #[test]
    fn test_block_body_holds_statements() {
        assert_eq!(
            tree_of("foo = @() -> {5} bar = @() { foo() }"),
            indoc! {"
                function foo (0..16)
                  return (14..15)
                    int 5 (14..15)
                function bar (17..36)
                  call foo (29..34)
            "}
        );
    }

    #[test]
    fn test_arg_decls_are_placeholders() {
        assert_eq!(
            tree_of("id = @(a: int, b) -> { 5 }"),
            indoc! {"
                function id (0..26)
                  arg a: int
                  arg b
                  return (23..24)
                    int 5 (23..24)
            "}
        );
    }

    #[test]
    fn test_export_before_definition() {
        assert_eq!(
            tree_of("export(foo) foo = @() -> { 5 }"),
            indoc! {"
                function foo (12..30)
                  return (27..28)
                    int 5 (27..28)
                exports: foo
            "}
        );
    }

    #[test]
    fn test_exports_are_deduplicated() {
        let (_, ast) = parse_ok("a = @() -> {1} b = @() -> {2} export(b, a, b) export(a)");
        assert_eq!(ast.scope(ast.root).exports.len(), 2);
        assert!(tree_of("a = @() -> {1} b = @() -> {2} export(b, a, b) export(a)")
            .ends_with("exports: b, a\n"));
    }

    #[test]
    fn test_exported_function_resolves_in_root_scope() {
        let (mut idents, ast) = parse_ok("export(foo)\nfoo = @() -> {5}");
        let foo = idents.intern("foo");
        assert_eq!(ast.scope(ast.root).exports, [foo]);

        let defn = ast.lookup(ast.root, foo).expect("foo must be bound");
        assert_eq!(
            ast.defn_resolved_type(defn),
            Ok(Some(crate::types::Type::INT32))
        );
    }

    #[test]
    fn test_demo_program_parses() {
        let (_, ast) = parse_ok(include_str!("../demos/nested.ty"));
        assert_eq!(ast.scope(ast.root).stmts.len(), 5);
        assert_eq!(ast.scope(ast.root).exports.len(), 1);
    }

    #[test]
    fn test_call_arguments() {
        assert_eq!(
            tree_of("f = @() -> {1} g = @() -> { f(1, x) }"),
            indoc! {"
                function f (0..14)
                  return (12..13)
                    int 1 (12..13)
                function g (15..37)
                  return (28..35)
                    call f (28..35)
                      int 1 (30..31)
                      ident x (33..34)
            "}
        );
    }

    #[test]
    fn test_error_call_argument_cannot_be_a_call() {
        assert_eq!(
            parse_err("f = @() -> {1} g = @() -> { f(f()) }"),
            "31..32: expected token RParen, but got LParen"
        );
    }

    #[test]
    fn test_error_call_to_undefined_function() {
        assert_eq!(
            parse_err("bar = @() -> { foo() }"),
            "15..18: call to undefined function foo"
        );
    }

    #[test]
    fn test_error_recursion_is_undefined() {
        // The name only binds after the definition has been parsed.
        assert_eq!(
            parse_err("foo = @() -> { foo() }"),
            "15..18: call to undefined function foo"
        );
    }

    #[test]
    fn test_error_lone_identifier_statement() {
        assert_eq!(
            parse_err("foo"),
            "3..3: unexpected end of file while parsing statement"
        );
    }

    #[test]
    fn test_error_eof_in_export_list() {
        assert_eq!(
            parse_err("export("),
            "7..7: unexpected end of file while parsing export list"
        );
    }

    #[test]
    fn test_error_eof_in_call_arguments() {
        assert_eq!(
            parse_err("f = @() -> {1} g = @() { f("),
            "27..27: unexpected end of file while parsing function call"
        );
    }

    #[test]
    fn test_error_eof_in_arg_decls() {
        assert_eq!(
            parse_err("foo = @(a,"),
            "10..10: unexpected end of file while parsing argument list"
        );
    }

    #[test]
    fn test_error_non_function_definition() {
        assert_eq!(parse_err("foo = 5"), "6..7: unsupported definition");
    }

    #[test]
    fn test_error_redefinition() {
        assert_eq!(
            parse_err("foo = @() -> {5} foo = @() -> {6}"),
            "17..20: redefinition of foo"
        );
    }

    #[test]
    fn test_error_eof_in_expression() {
        assert_eq!(
            parse_err("foo = @() -> {"),
            "14..14: unexpected end of file while parsing expression"
        );
    }

    #[test]
    fn test_error_eof_in_function_body() {
        assert_eq!(
            parse_err("foo = @() {"),
            "11..11: unexpected end of file while parsing function body"
        );
    }

    #[test]
    fn test_error_missing_rparen() {
        assert_eq!(
            parse_err("foo = @( -> {5}"),
            "9..11: expected token Identifier, but got Arrow"
        );
    }
}
