// statement ::= ID '=' definition
//             | ID '(' [arg (',' arg)*] ')'
//             | 'export' '(' ID (',' ID)* ')'
// definition ::= '@' ['(' [decl (',' decl)*] ')'] ['->'] '{' body '}'
// decl ::= ID [':' ID]
// body ::= expr                     (after '->', an implicit return)
//        | statement*               (otherwise, a nested scope)
// expr ::= term ('+' term)*        (left-associative)
// term ::= NUMBER | ID '(' [arg (',' arg)*] ')'
// arg ::= NUMBER | ID

use crate::{
    symbols::SymbolTable,
    token::Span,
    types::{self, Type},
    util::intern::Interned,
};

/// Handle to a [`Scope`] in the AST's scope arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ScopeId(u32);

/// Handle to a [`Defn`] in the AST's definition arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct DefnId(u32);

impl DefnId {
    #[cfg(test)]
    pub(crate) fn new(raw: u32) -> DefnId {
        DefnId(raw)
    }
}

/// The result of a parse: a forest of scopes and definitions.
///
/// Scopes and definitions live in arenas; symbol tables and call sites hold
/// [`DefnId`] handles rather than owning pointers, so every back-reference
/// is trivially valid for the lifetime of the `Ast`.
#[derive(Debug)]
pub struct Ast {
    scopes: Vec<Scope>,
    defs: Vec<Defn>,
    pub root: ScopeId,
}

impl Ast {
    pub fn new() -> Ast {
        Ast {
            scopes: Vec::with_capacity(4),
            defs: Vec::with_capacity(8),
            root: ScopeId(0),
        }
    }

    pub fn alloc_scope(&mut self, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(u32::try_from(self.scopes.len()).expect("scope arena out of capacity"));
        self.scopes.push(Scope {
            parent,
            stmts: Vec::new(),
            symbols: SymbolTable::new(),
            exports: Vec::new(),
            span: Span::new_of_length(0, 0),
        });
        id
    }

    pub fn alloc_defn(&mut self, defn: Defn) -> DefnId {
        let id = DefnId(u32::try_from(self.defs.len()).expect("defn arena out of capacity"));
        self.defs.push(defn);
        id
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    pub fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.0 as usize]
    }

    pub fn defn(&self, id: DefnId) -> &Defn {
        &self.defs[id.0 as usize]
    }

    /// Resolves `name` starting at `scope`, walking the parent chain.
    pub fn lookup(&self, scope: ScopeId, name: Interned<str>) -> Option<DefnId> {
        let s = self.scope(scope);
        s.symbols
            .get(name)
            .or_else(|| s.parent.and_then(|p| self.lookup(p, name)))
    }
}

/// Type resolution.
///
/// Inference is bottom-up and on demand; an absent type is not an error by
/// itself. It only becomes one when a consumer requires resolution and the
/// specified and inferred types disagree.
impl Ast {
    pub fn inferred_type(&self, expr: &Expr) -> Option<Type> {
        match &expr.kind {
            ExprKind::Int(_) => Some(Type::INT32),
            ExprKind::Id(_) => None,
            ExprKind::Return(child) => self.inferred_type(child),
            ExprKind::Binary { lhs, rhs, .. } => {
                let l = self.inferred_type(lhs)?;
                (self.inferred_type(rhs)? == l).then_some(l)
            }
            // Will become the callee's return type once calls have backend
            // support; left unknown until then.
            ExprKind::Call { .. } => None,
            ExprKind::Defn(id) => self.defn_resolved_type(*id).ok().flatten(),
        }
    }

    /// The specified type if present, else the inferred one. Fails if both
    /// are present and structurally unequal.
    pub fn resolved_type(&self, expr: &Expr) -> Result<Option<Type>, types::Error> {
        let inferred = self.inferred_type(expr);
        match (expr.specified, inferred) {
            (Some(specified), Some(inferred)) if specified != inferred => {
                Err(types::Error::DeducedMismatch {
                    specified,
                    inferred,
                })
            }
            (Some(specified), _) => Ok(Some(specified)),
            (None, inferred) => Ok(inferred),
        }
    }

    /// The resolved type of a definition.
    ///
    /// A function's type is its first return statement's inferred type;
    /// every further return must agree with it.
    pub fn defn_resolved_type(&self, id: DefnId) -> Result<Option<Type>, types::Error> {
        match &self.defn(id).kind {
            DefnKind::Data(expr) => self.resolved_type(expr),
            DefnKind::Function(f) => {
                let body = self.scope(f.body);
                let mut ty = None;
                for &i in &f.returns {
                    let ret = self.resolved_type(&body.stmts[i])?;
                    match (ty, ret) {
                        (None, ret) => ty = ret,
                        (Some(first), Some(ret)) if first != ret => {
                            return Err(types::Error::DeducedMismatch {
                                specified: first,
                                inferred: ret,
                            });
                        }
                        _ => {}
                    }
                }
                Ok(ty)
            }
        }
    }
}

/// A lexical region: its statements (owned), its symbol table, the names it
/// exports, and the token range it spans.
#[derive(Debug)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    pub stmts: Vec<Expr>,
    pub symbols: SymbolTable,
    /// Distinct names requested for export, in first-declaration order.
    pub exports: Vec<Interned<str>>,
    pub span: Span,
}

#[derive(Debug)]
pub struct Defn {
    pub name: Interned<str>,
    pub span: Span,
    pub kind: DefnKind,
}

#[derive(Debug)]
pub enum DefnKind {
    Function(FunctionDefn),
    /// A top-level data definition. Not yet producible by the parser, but
    /// the generator emits it as a global data declaration.
    Data(Expr),
}

#[derive(Debug)]
pub struct FunctionDefn {
    pub args: Vec<ArgDecl>,
    pub body: ScopeId,
    /// Indices into the body scope's statements that are returns.
    pub returns: Vec<usize>,
}

/// An argument declaration. Parsed as a placeholder; the optional type
/// annotation is recorded but has no behavior yet.
#[derive(Debug, PartialEq, Eq)]
pub struct ArgDecl {
    pub name: Interned<str>,
    pub ty: Option<Interned<str>>,
    pub span: Span,
}

#[derive(Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
    /// From an explicit annotation. Reserved for future syntax; the parser
    /// never sets it today.
    pub specified: Option<Type>,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Expr {
        Expr {
            kind,
            span,
            specified: None,
        }
    }
}

#[derive(Debug)]
pub enum ExprKind {
    /// An integer literal; the source text is preserved verbatim.
    Int(Box<str>),
    Id(Interned<str>),
    Return(Box<Expr>),
    Binary {
        op: BinaryOperator,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        callee: Interned<str>,
        /// The definition the callee resolved to at the point of the call.
        target: DefnId,
        args: Vec<Expr>,
    },
    /// A definition statement; the definition itself lives in the arena.
    Defn(DefnId),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
}
