//! Typed AST nodes.
//!
//! Every [`Expr`] carries its type; statements and declarations are
//! untyped containers. The tree owns its children directly (`Box` for
//! single children, `Vec` for sequences); there is no arena or id
//! indirection at this level.

use veles_types::Idx;

use crate::{IdentId, StringId};

/// A parsed translation unit: the ordered list of top-level declarations.
#[derive(Clone, Debug, PartialEq)]
pub struct TranslationUnit {
    pub decls: Vec<Decl>,
}

/// Top-level or block-scope declaration.
#[derive(Clone, Debug, PartialEq)]
pub enum Decl {
    /// A variable declaration with an optional initialiser.
    ///
    /// The declared type is recorded in the identifier table, not here.
    Var {
        ident: IdentId,
        init: Option<Expr>,
    },
    /// A function definition. Parameter identifiers are listed in
    /// declaration order; their types come from the function type
    /// registered for `ident`.
    Func {
        ident: IdentId,
        params: Vec<IdentId>,
        body: Stmt,
    },
    /// A type declaration. Nothing to lower.
    Type { ident: IdentId },
}

/// Statement node.
#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    /// One or more declarators introduced by a single declaration.
    Declaration(Vec<Decl>),
    /// A braced statement sequence.
    Compound(Vec<Stmt>),
    /// An expression evaluated for its effect.
    Expr(Expr),
    /// The empty statement `;`.
    Null,
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    /// The body is guaranteed by the parser to be a `Compound` whose
    /// direct children include the `Case`/`Default` arms.
    Switch { cond: Expr, body: Box<Stmt> },
    While { cond: Expr, body: Box<Stmt> },
    Do { body: Box<Stmt>, cond: Expr },
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        step: Option<Box<Stmt>>,
        body: Box<Stmt>,
    },
    Case { expr: Expr, body: Box<Stmt> },
    Default { body: Box<Stmt> },
    Continue,
    Break,
    Return(Option<Expr>),
}

/// A typed expression.
#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    /// The expression's type, assigned by the type checker.
    pub ty: Idx,
    pub kind: ExprKind,
}

impl Expr {
    /// Whether this node denotes an addressable location.
    ///
    /// Mirrors the value-category judgement of the type checker:
    /// identifiers, subscripts, member accesses and pointer
    /// indirections are lvalues; everything else is an rvalue.
    pub fn is_lvalue(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Identifier(_)
                | ExprKind::Subscript { .. }
                | ExprKind::Member { .. }
                | ExprKind::Unary {
                    op: UnaryOp::Indirection,
                    ..
                }
        )
    }
}

/// Expression node payload.
#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    Identifier(IdentId),
    Subscript {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    /// Member access; `member` is the member's declaration index within
    /// the structure type of the (pointed-to) base.
    Member {
        base: Box<Expr>,
        member: u32,
        arrow: bool,
    },
    /// A cast to this node's type.
    Cast(Box<Expr>),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Ternary {
        cond: Box<Expr>,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Simple or compound assignment; `op` is `Assign` or one of the
    /// `*Assign` operators.
    Assignment {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    /// Brace-enclosed initialiser list.
    Initializer(Vec<Expr>),
}

/// Literal payload.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Bool(bool),
    Char(char),
    Int(i64),
    Float(f64),
    String(StringId),
}

/// Unary operator.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    PostInc,
    PostDec,
    PreInc,
    PreDec,
    /// Arithmetic negation `-`.
    Minus,
    /// Bitwise complement `~`.
    BitNot,
    /// Logical negation `!`.
    LogNot,
    /// Address-of `&`.
    Address,
    /// Pointer indirection `*`.
    Indirection,
    /// The built-in absolute-value operator.
    Abs,
    /// The built-in upper-bound operator on arrays.
    Upb,
}

/// Binary (and assignment) operator.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    BitAnd,
    BitXor,
    BitOr,
    LogAnd,
    LogOr,
    Comma,
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    RemAssign,
    ShlAssign,
    ShrAssign,
    AndAssign,
    XorAssign,
    OrAssign,
}

impl BinaryOp {
    /// The non-assignment operator a compound assignment applies, or
    /// `None` for anything that is not a compound assignment.
    pub fn compound_base(self) -> Option<BinaryOp> {
        match self {
            BinaryOp::AddAssign => Some(BinaryOp::Add),
            BinaryOp::SubAssign => Some(BinaryOp::Sub),
            BinaryOp::MulAssign => Some(BinaryOp::Mul),
            BinaryOp::DivAssign => Some(BinaryOp::Div),
            BinaryOp::RemAssign => Some(BinaryOp::Rem),
            BinaryOp::ShlAssign => Some(BinaryOp::Shl),
            BinaryOp::ShrAssign => Some(BinaryOp::Shr),
            BinaryOp::AndAssign => Some(BinaryOp::BitAnd),
            BinaryOp::XorAssign => Some(BinaryOp::BitXor),
            BinaryOp::OrAssign => Some(BinaryOp::BitOr),
            _ => None,
        }
    }
}
