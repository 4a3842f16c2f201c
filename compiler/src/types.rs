use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Position {
    pub line:   usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Position { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// The closed set of argument types. There are no user-defined types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Type {
    Double,
    Float,
    Int32,
    Uint32,
    String,
    /// A caller-managed memory region, passed by reference.
    ExposedBuffer,
}

impl Type {
    pub const ALL: [Type; 6] = [
        Type::Double,
        Type::Float,
        Type::Int32,
        Type::Uint32,
        Type::String,
        Type::ExposedBuffer,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            Type::Double        => "double",
            Type::Float         => "float",
            Type::Int32         => "int32",
            Type::Uint32        => "uint32",
            Type::String        => "string",
            Type::ExposedBuffer => "exposed_buffer",
        }
    }

    pub fn from_keyword(text: &str) -> Option<Type> {
        Type::ALL.iter().copied().find(|ty| ty.keyword() == text)
    }

    pub fn is_keyword(text: &str) -> bool {
        Type::from_keyword(text).is_some()
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Argument {
    pub name:   String,
    pub line:   usize,
    pub column: usize,
    #[serde(rename = "type")]
    pub type_:  Type,
}

impl Argument {
    pub fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RpcDeclaration {
    pub name:   String,
    pub line:   usize,
    pub column: usize,
    /// Positional call signature, in source order.
    pub args:   Vec<Argument>,
    pub ret:    Option<Argument>,
}

impl RpcDeclaration {
    pub fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    pub fn requires_response(&self) -> bool {
        self.ret.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Arguments,
    Returns,
}

impl BlockKind {
    pub fn keyword(self) -> &'static str {
        match self {
            BlockKind::Arguments => "arguments",
            BlockKind::Returns   => "returns",
        }
    }
}

/// A second `arguments` or `returns` block inside one rpc. Its contents are
/// not merged into the declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedundantBlock {
    pub rpc:       String,
    pub kind:      BlockKind,
    pub first:     Position,
    pub duplicate: Position,
}

/// Output of the AST builder. Not yet checked for name clashes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Ast {
    pub declarations:     Vec<RpcDeclaration>,
    pub redundant_blocks: Vec<RedundantBlock>,
}

/// A validated set of rpc declarations, in declaration order.
///
/// Only the verifier constructs one, so every `Document` satisfies:
/// rpc names are unique, and within each rpc the argument names (including
/// the return argument) are unique and none is empty or a type keyword.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Document {
    rpcs: Vec<RpcDeclaration>,
}

impl Document {
    pub(crate) fn new(rpcs: Vec<RpcDeclaration>) -> Self {
        Document { rpcs }
    }

    pub fn rpcs(&self) -> &[RpcDeclaration] {
        &self.rpcs
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RpcDeclaration> {
        self.rpcs.iter()
    }

    pub fn get(&self, name: &str) -> Option<&RpcDeclaration> {
        self.rpcs.iter().find(|rpc| rpc.name == name)
    }

    pub fn len(&self) -> usize {
        self.rpcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rpcs.is_empty()
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item     = &'a RpcDeclaration;
    type IntoIter = std::slice::Iter<'a, RpcDeclaration>;

    fn into_iter(self) -> Self::IntoIter {
        self.rpcs.iter()
    }
}
