//! Concrete syntax tree. Mirrors the grammar one node kind per rule, keeping
//! positions and empty statements; it carries no meaning of its own.

use crate::{tokenizer::Token, types::Position};

#[derive(Debug, Clone, PartialEq)]
pub struct Cst {
    pub rpcs: Vec<RpcNode>,
    /// Stray `;` making up a document without any rpc.
    pub empty: Option<EmptyNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RpcNode {
    pub keyword: Position,
    pub name:    Token,
    pub body:    Vec<BodyNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BodyNode {
    Args(ArgsNode),
    Return(ReturnNode),
    Empty(EmptyNode),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArgsNode {
    pub keyword: Position,
    pub items:   Vec<ItemNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnNode {
    pub keyword: Position,
    pub item:    ItemNode,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemNode {
    Arg(ArgNode),
    Empty(EmptyNode),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArgNode {
    pub type_: Token,
    pub name:  Token,
}

/// A run of zero or more `;`.
#[derive(Debug, Clone, PartialEq)]
pub struct EmptyNode {
    pub position:   Position,
    pub semicolons: usize,
}
