use std::fmt::Display;

use int_literal::IntLiteral;

pub mod int_literal;

pub type SourcePos = core::ops::Range<usize>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Int,
    Boolean,
    IntArray,
    BoolArray,
    Class(String),
}

impl Type {
    pub fn is_array(&self) -> bool {
        matches!(self, Self::IntArray | Self::BoolArray)
    }

    /// Element type of an array type.
    pub fn element(&self) -> Option<Type> {
        match self {
            Self::IntArray => Some(Self::Int),
            Self::BoolArray => Some(Self::Boolean),
            _ => None,
        }
    }

    /// Bytes a field of this type occupies in its class layout.
    pub fn field_size(&self) -> usize {
        match self {
            Self::Int => 4,
            Self::Boolean => 1,
            Self::IntArray | Self::BoolArray | Self::Class(_) => 8,
        }
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int => write!(f, "int"),
            Self::Boolean => write!(f, "boolean"),
            Self::IntArray => write!(f, "int[]"),
            Self::BoolArray => write!(f, "boolean[]"),
            Self::Class(name) => write!(f, "{name}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Program {
    pub main: MainClass,
    pub classes: Vec<ClassDecl>,
}

#[derive(Debug, Clone)]
pub struct MainClass {
    pub name: String,
    pub args_name: String,
    pub locals: Vec<VarDecl>,
    pub body: Vec<Stmt>,
    pub span: SourcePos,
}

#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub name: String,
    pub parent: Option<String>,
    pub fields: Vec<VarDecl>,
    pub methods: Vec<MethodDecl>,
    pub span: SourcePos,
}

#[derive(Debug, Clone)]
pub struct VarDecl {
    pub ty: Type,
    pub name: String,
    pub span: SourcePos,
}

#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub ty: Type,
    pub name: String,
    pub params: Vec<VarDecl>,
    pub locals: Vec<VarDecl>,
    pub body: Vec<Stmt>,
    pub ret: Expr,
    pub span: SourcePos,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Block(Vec<Stmt>),
    Assign(String, Expr, SourcePos),
    ArrayAssign(String, Expr, Expr, SourcePos),
    If(Expr, Box<Stmt>, Box<Stmt>),
    While(Expr, Box<Stmt>),
    Print(Expr, SourcePos),
}

impl Stmt {
    pub fn boxed(self) -> Box<Self> {
        Box::new(self)
    }

    pub fn contains_call(&self) -> bool {
        match self {
            Self::Block(stmts) => stmts.iter().any(Stmt::contains_call),
            Self::Assign(_, value, _) | Self::Print(value, _) => value.contains_call(),
            Self::ArrayAssign(_, index, value, _) => index.contains_call() || value.contains_call(),
            Self::If(cond, then, otherwise) => {
                cond.contains_call() || then.contains_call() || otherwise.contains_call()
            }
            Self::While(cond, body) => cond.contains_call() || body.contains_call(),
        }
    }

    /// Every `name = value` assignment nested anywhere in this statement.
    pub fn assignments<'a>(&'a self, out: &mut Vec<(&'a str, &'a Expr)>) {
        match self {
            Self::Block(stmts) => stmts.iter().for_each(|stmt| stmt.assignments(out)),
            Self::Assign(name, value, _) => out.push((name.as_str(), value)),
            Self::If(_, then, otherwise) => {
                then.assignments(out);
                otherwise.assignments(out);
            }
            Self::While(_, body) => body.assignments(out),
            Self::ArrayAssign(..) | Self::Print(..) => {}
        }
    }
}

#[derive(Debug, Clone)]
pub enum Expr {
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    ArrayLookup(Box<Expr>, Box<Expr>),
    ArrayLength(Box<Expr>, SourcePos),
    MethodCall(Box<Expr>, String, Vec<Expr>, SourcePos),
    Int(IntLiteral, SourcePos),
    True(SourcePos),
    False(SourcePos),
    Ident(String, SourcePos),
    This(SourcePos),
    NewObject(String, SourcePos),
    NewIntArray(Box<Expr>, SourcePos),
    NewBoolArray(Box<Expr>, SourcePos),
    Not(Box<Expr>, SourcePos),
    Paren(Box<Expr>, SourcePos),
}

impl Expr {
    pub fn boxed(self) -> Box<Self> {
        Box::new(self)
    }

    pub fn span(&self) -> SourcePos {
        match self {
            Self::ArrayLength(_, span)
            | Self::MethodCall(_, _, _, span)
            | Self::Int(_, span)
            | Self::True(span)
            | Self::False(span)
            | Self::Ident(_, span)
            | Self::This(span)
            | Self::NewObject(_, span)
            | Self::NewIntArray(_, span)
            | Self::NewBoolArray(_, span)
            | Self::Not(_, span)
            | Self::Paren(_, span) => span.clone(),
            Self::Binary(_, lhs, rhs) | Self::ArrayLookup(lhs, rhs) => {
                let SourcePos { start, .. } = lhs.span();
                let SourcePos { end, .. } = rhs.span();

                start..end
            }
        }
    }

    /// The boolean literal this expression denotes, looking through parentheses.
    pub fn bool_literal(&self) -> Option<bool> {
        match self {
            Self::True(_) => Some(true),
            Self::False(_) => Some(false),
            Self::Paren(inner, _) => inner.bool_literal(),
            _ => None,
        }
    }

    pub fn is_array_allocation(&self) -> bool {
        match self {
            Self::NewIntArray(_, _) | Self::NewBoolArray(_, _) => true,
            Self::Paren(inner, _) => inner.is_array_allocation(),
            _ => false,
        }
    }

    /// Name of the variable this expression merely reads, parentheses aside.
    pub fn copied_variable(&self) -> Option<&str> {
        match self {
            Self::Ident(name, _) => Some(name.as_str()),
            Self::Paren(inner, _) => inner.copied_variable(),
            _ => None,
        }
    }

    pub fn contains_call(&self) -> bool {
        match self {
            Self::MethodCall(_, _, _, _) => true,
            Self::Binary(_, lhs, rhs) | Self::ArrayLookup(lhs, rhs) => {
                lhs.contains_call() || rhs.contains_call()
            }
            Self::ArrayLength(inner, _)
            | Self::NewIntArray(inner, _)
            | Self::NewBoolArray(inner, _)
            | Self::Not(inner, _)
            | Self::Paren(inner, _) => inner.contains_call(),
            Self::Int(_, _)
            | Self::True(_)
            | Self::False(_)
            | Self::Ident(_, _)
            | Self::This(_)
            | Self::NewObject(_, _) => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    And,
    Less,
    Plus,
    Minus,
    Times,
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::And => write!(f, "&&"),
            Self::Less => write!(f, "<"),
            Self::Plus => write!(f, "+"),
            Self::Minus => write!(f, "-"),
            Self::Times => write!(f, "*"),
        }
    }
}

///
/// Traversal shared by the passes that walk a whole program.
/// Implementors only decide what happens at the entry point and at each method.
///
pub trait ProgramPass {
    type Error;

    fn main_class(&mut self, main: &MainClass) -> Result<(), Self::Error>;

    fn enter_class(&mut self, _class: &ClassDecl) -> Result<(), Self::Error> {
        Ok(())
    }

    fn method(&mut self, class: &ClassDecl, method: &MethodDecl) -> Result<(), Self::Error>;

    fn run(&mut self, program: &Program) -> Result<(), Self::Error> {
        self.main_class(&program.main)?;

        for class in program.classes.iter() {
            self.enter_class(class)?;

            for method in class.methods.iter() {
                self.method(class, method)?;
            }
        }

        Ok(())
    }
}
