use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::hash::Hash;

use crate::intern::InternedStr;

pub mod error;
pub mod lex;
pub mod types;

pub mod prelude {
    pub use super::error::{CompileError, Error, ErrorHandler, SemanticError, SyntaxError};
    pub use super::lex::{Literal, Locatable, Location, Token};
    pub use super::types::{BinaryOp, Type, UnaryOp};
    pub use super::{
        ArrayDecl, DataType, Expr, ExprType, Fixity, FuncDecl, FuncParameter, LocationExpr,
        Program, Stmt, StmtType, VarDecl,
    };
}

pub use self::lex::{AssignmentToken, Keyword, Literal, Locatable, Location, Token};
pub use self::types::{BinaryOp, Type, UnaryOp};

/// The root of a parse: the top-level declarations in source order.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Program {
    pub decls: Vec<Stmt>,
}

pub type Stmt = Locatable<StmtType>;

#[derive(Clone, Debug, PartialEq)]
#[allow(clippy::large_enum_variant)]
pub enum StmtType {
    Null,
    Expr(Expr),
    If(Expr, Box<Stmt>, Option<Box<Stmt>>),
    While(Expr, Box<Stmt>),
    // for(i = 0; i < n; i += 1) body; all three headers are expressions,
    // MiniC has no declarations in the for header
    For(Expr, Expr, Expr, Box<Stmt>),
    Return(Option<Expr>),
    Break,
    // local declarations are hoisted ahead of the statements
    Compound(Vec<Stmt>, Vec<Stmt>),
    FuncDecl(FuncDecl),
    StaticVarDecl(VarDecl),
    StaticArrayDecl(ArrayDecl),
    LocalVarDecl(VarDecl),
    LocalArrayDecl(ArrayDecl),
    // alternate lvalue form; no grammar production builds this
    Write(LocationExpr, Expr),
}

#[derive(Clone, Debug, PartialEq)]
pub struct FuncDecl {
    pub datatype: DataType,
    pub name: InternedStr,
    pub params: Vec<FuncParameter>,
    pub body: Box<Stmt>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VarDecl {
    pub datatype: DataType,
    pub name: InternedStr,
    pub value: Option<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ArrayDecl {
    pub datatype: DataType,
    pub name: InternedStr,
    pub size: Expr,
}

/// A type written in the source. `ctype` is filled in by the checker once
/// the name has been resolved against the primitive types.
#[derive(Clone, Debug, PartialEq)]
pub struct DataType {
    pub name: InternedStr,
    pub ctype: Option<Type>,
    pub location: Location,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FuncParameter {
    pub datatype: DataType,
    pub name: InternedStr,
    pub location: Location,
}

/// Holds the metadata for an expression.
///
/// `ctype` starts out as None and is attached by the checker; a None after
/// checking means this expression failed to type and downstream passes
/// should not diagnose it again.
#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub expr: ExprType,
    pub ctype: Option<Type>,
    pub location: Location,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprType {
    Literal(Literal),
    Var(InternedStr),
    ArrayLookup(InternedStr, Box<Expr>),
    FuncCall(InternedStr, Vec<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    // ++x / x++; always a plain variable, the grammar allows nothing else
    IncDec(UnaryOp, Fixity, InternedStr),
    VarAssign(AssignmentToken, InternedStr, Box<Expr>),
    // name[index] op= value
    ArrayAssign(AssignmentToken, InternedStr, Box<Expr>, Box<Expr>),
    // name.size
    ArraySize(InternedStr),
    // new type[size]
    NewArray(DataType, Box<Expr>),
    // alternate lvalue form; no grammar production builds this
    Read(LocationExpr),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Fixity {
    Prefix,
    Postfix,
}

/// The alternate representation of a storage location, kept distinct from
/// `Var`/`VarAssign` for callers that build ASTs directly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LocationExpr {
    Simple(InternedStr),
}

impl Expr {
    pub fn new(expr: ExprType, location: Location) -> Expr {
        Expr {
            expr,
            ctype: None,
            location,
        }
    }
}

impl LocationExpr {
    pub fn name(&self) -> InternedStr {
        match self {
            LocationExpr::Simple(name) => *name,
        }
    }
}

#[derive(Debug)]
pub struct Scope<K: Hash + Eq, V>(Vec<HashMap<K, V>>);

impl<K: Hash + Eq, V> Scope<K, V> {
    #[inline]
    pub fn new() -> Self {
        Self(vec![HashMap::new()])
    }
    #[inline]
    pub fn enter_scope(&mut self) {
        self.0.push(HashMap::<K, V>::new())
    }
    #[inline]
    pub fn leave_scope(&mut self) {
        debug_assert!(self.0.len() > 1, "cannot leave the global scope");
        self.0.pop();
    }
    pub fn get(&self, name: &K) -> Option<&V> {
        debug_assert!(!self.0.is_empty());
        for map in self.0.iter().rev() {
            let current = map.get(name);
            if current.is_some() {
                return current;
            }
        }
        None
    }
    #[inline]
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        debug_assert!(!self.0.is_empty());
        self.0.last_mut().unwrap().insert(key, value)
    }
    pub fn is_global(&self) -> bool {
        debug_assert!(!self.0.is_empty());
        self.0.len() == 1
    }
}

impl<K: Eq + Hash, V> Default for Scope<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/* node labels, used by the AST dump */

impl Display for StmtType {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        use StmtType::*;
        match self {
            Null => write!(f, "NullStmt()"),
            Expr(_) => write!(f, "ExprStmt()"),
            If(..) => write!(f, "IfStmt()"),
            While(..) => write!(f, "WhileStmt()"),
            For(..) => write!(f, "ForStmt()"),
            Return(None) => write!(f, "ReturnStmt()"),
            Return(Some(_)) => write!(f, "ReturnStmt(value)"),
            Break => write!(f, "BreakStmt()"),
            Compound(..) => write!(f, "CompoundStmt()"),
            FuncDecl(decl) => write!(f, "FuncDeclStmt(name='{}')", decl.name),
            StaticVarDecl(decl) => write!(f, "StaticVarDeclStmt(name='{}')", decl.name),
            StaticArrayDecl(decl) => write!(f, "StaticArrayDeclStmt(name='{}')", decl.name),
            LocalVarDecl(decl) => write!(f, "LocalVarDeclStmt(name='{}')", decl.name),
            LocalArrayDecl(decl) => write!(f, "LocalArrayDeclStmt(name='{}')", decl.name),
            Write(loc, _) => write!(f, "WriteLocation(name='{}')", loc.name()),
        }
    }
}

impl Display for ExprType {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        use ExprType::*;
        match self {
            Literal(lit) => match lit {
                self::Literal::Int(i) => write!(f, "IntegerLiteral(value={})", i),
                self::Literal::Float(v) => write!(f, "FloatLiteral(value={})", v),
                self::Literal::Char(c) => {
                    write!(f, "CharLiteral(value='{}')", char::from(*c).escape_default())
                }
                self::Literal::Str(s) => write!(f, "StringLiteral(value=\"{}\")", s),
                self::Literal::Bool(b) => write!(f, "BoolLiteral(value={})", b),
            },
            Var(name) => write!(f, "VarExpr(name='{}')", name),
            ArrayLookup(name, _) => write!(f, "ArrayLookupExpr(name='{}')", name),
            FuncCall(name, _) => write!(f, "FuncCallExpr(name='{}')", name),
            Unary(op, _) => write!(f, "UnaryOpExpr(op='{}')", op),
            Binary(op, ..) => write!(f, "BinaryOpExpr(op='{}')", op),
            IncDec(op, fixity, name) => {
                write!(f, "IncDecExpr(op='{}', fixity={:?}, name='{}')", op, fixity, name)
            }
            VarAssign(op, name, _) => {
                write!(f, "VarAssignmentExpr(op='{}', name='{}')", op, name)
            }
            ArrayAssign(op, name, ..) => {
                write!(f, "ArrayAssignmentExpr(op='{}', name='{}')", op, name)
            }
            ArraySize(name) => write!(f, "ArraySizeExpr(name='{}')", name),
            NewArray(datatype, _) => write!(f, "NewArrayExpr(type='{}')", datatype.name),
            Read(loc) => write!(f, "ReadLocation(name='{}')", loc.name()),
        }
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "SimpleType(name='{}')", self.name)
    }
}

impl Display for FuncParameter {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "FuncParameter(name='{}', type='{}')", self.name, self.datatype.name)
    }
}
