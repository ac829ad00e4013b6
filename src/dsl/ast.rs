//! Syntax tree for motif programs.
//!
//! Every expression carries the type inferred for it at parse time.

use super::note::{Pitch, Rhythm, ScaleDegree};
use super::operators::BinaryOp;
use super::token::Token;
use super::types::Type;

/// An ordered sequence of statements: a program or a function body.
pub type Steps = Vec<Step>;

/// One statement-level unit.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Expression(Expression),
    FunctionDeclaration(FunctionDeclaration),
    VariableDeclaration(VariableDeclaration),
    Reassignment(Reassignment),
    PropertyAssignment(PropertyAssignment),
    Return(Return),
    For(ForLoop),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: Token,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDeclaration {
    pub name: Token,
    pub parameters: Vec<Parameter>,
    pub body: Steps,
    pub return_type: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclaration {
    pub name: Token,
    pub body: Expression,
    pub ty: Type,
}

/// `name[i]... = body;`
#[derive(Debug, Clone, PartialEq)]
pub struct Reassignment {
    pub name: Token,
    pub indexes: Vec<Expression>,
    pub body: Expression,
}

/// `name[i]....property = value;`
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyAssignment {
    pub name: Token,
    pub indexes: Vec<Expression>,
    pub property: Token,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Return {
    pub token: Token,
    pub expression: Expression,
}

/// `for variable in iterable { body }`
#[derive(Debug, Clone, PartialEq)]
pub struct ForLoop {
    pub token: Token,
    pub variable: Token,
    pub iterable: Expression,
    pub body: Steps,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(LiteralExp),
    Var(VarExp),
    Op(OpExp),
    FuncApp(FuncAppExp),
    If(IfExp),
}

impl Expression {
    pub fn return_type(&self) -> &Type {
        match self {
            Expression::Literal(e) => &e.ty,
            Expression::Var(e) => &e.ty,
            Expression::Op(e) => &e.ty,
            Expression::FuncApp(e) => &e.ty,
            Expression::If(e) => &e.ty,
        }
    }

    /// The token used to position diagnostics about this expression.
    pub fn token(&self) -> &Token {
        match self {
            Expression::Literal(e) => &e.token,
            Expression::Var(e) => &e.name,
            Expression::Op(e) => &e.operator,
            Expression::FuncApp(e) => &e.name,
            Expression::If(e) => &e.token,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiteralExp {
    pub value: Literal,
    pub token: Token,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(i64),
    ScaleDegree(ScaleDegree),
    ScaleDegreeRhythm(ScaleDegree, Rhythm),
    Rhythm(Rhythm),
    Pitch(Pitch),
    PitchRhythm(Pitch, Rhythm),
    Boolean(bool),
    List(Vec<Expression>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarExp {
    pub name: Token,
    pub indexes: Vec<Expression>,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpExp {
    pub left: Box<Expression>,
    pub operator: Token,
    pub op: BinaryOp,
    pub right: Box<Expression>,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncAppExp {
    pub name: Token,
    pub arguments: Vec<Expression>,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfExp {
    pub token: Token,
    pub condition: Box<Expression>,
    pub then_branch: Box<Expression>,
    /// Absent when the source has no `else`.
    pub else_branch: Option<Box<Expression>>,
    pub ty: Type,
}
