use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::types::Position;

#[derive(Debug, Error)]
pub enum HgcError {
    #[error("Failed to read {}: {source}", path.display())]
    SourceRead {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode {}: source is not valid UTF-8", path.display())]
    SourceDecode { path: PathBuf },

    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error("{}", summarize(.0))]
    Semantic(Vec<SemanticError>),

    #[error("Unknown emission target \"{0}\"")]
    UnknownTarget(String),

    #[error("Failed to read emitter options {}: {source}", path.display())]
    OptionsRead {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid emitter options: {0}")]
    Options(#[source] serde_json::Error),

    #[error("Emit error: {0}")]
    EmitError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn summarize(errors: &[SemanticError]) -> String {
    match errors.first() {
        Some(first) if errors.len() == 1 => format!("Semantic error: {}", first),
        Some(first) => format!("{} semantic errors, first: {}", errors.len(), first),
        None        => "Semantic error".to_string(),
    }
}

impl HgcError {
    /// Flattens a compile failure into the diagnostics it carries, in report
    /// order. Errors that are not about the source text yield nothing.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            HgcError::Syntax(err)    => vec![Diagnostic::Syntax(err.clone())],
            HgcError::Semantic(errs) => errs.iter().cloned().map(Diagnostic::Semantic).collect(),
            _                        => Vec::new(),
        }
    }
}

/// The grammar could not build a tree. Fatal for the whole document.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("Syntax error at line {line}, column {column}: expected {expected} but found {found}")]
pub struct SyntaxError {
    pub line:     usize,
    pub column:   usize,
    pub expected: String,
    pub found:    String,
}

impl SyntaxError {
    pub fn new(expected: impl Into<String>, found: impl Into<String>, position: Position) -> Self {
        SyntaxError {
            line:     position.line,
            column:   position.column,
            expected: expected.into(),
            found:    found.into(),
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }
}

/// A well-formed document that breaks a naming or typing rule.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum SemanticError {
    #[error("rpc \"{name}\" is already declared at {first}")]
    DuplicateRpcName {
        name:      String,
        first:     Position,
        duplicate: Position,
    },

    #[error("argument \"{name}\" of rpc \"{rpc}\" is already declared at {first}")]
    DuplicateArgName {
        rpc:       String,
        name:      String,
        first:     Position,
        duplicate: Position,
    },

    #[error("rpc \"{rpc}\" already has a \"{block}\" block at {first}")]
    DuplicateBlock {
        rpc:       String,
        block:     String,
        first:     Position,
        duplicate: Position,
    },

    #[error("argument \"{name}\" has illegal type \"{type_name}\"")]
    IllegalType {
        name:      String,
        type_name: String,
        position:  Position,
    },

    #[error("name must not be empty")]
    EmptyName { position: Position },

    #[error("\"{name}\" is a reserved type keyword and cannot be used as a name")]
    ReservedName { name: String, position: Position },
}

impl SemanticError {
    /// Where the offending declaration starts.
    pub fn position(&self) -> Position {
        match self {
            SemanticError::DuplicateRpcName { duplicate, .. }
            | SemanticError::DuplicateArgName { duplicate, .. }
            | SemanticError::DuplicateBlock { duplicate, .. } => *duplicate,
            SemanticError::IllegalType { position, .. }
            | SemanticError::EmptyName { position }
            | SemanticError::ReservedName { position, .. } => *position,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Diagnostic {
    Syntax(SyntaxError),
    Semantic(SemanticError),
}

impl Diagnostic {
    pub fn position(&self) -> Position {
        match self {
            Diagnostic::Syntax(err)   => err.position(),
            Diagnostic::Semantic(err) => err.position(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Syntax(err) => write!(
                f,
                "{}: syntax error: expected {} but found {}",
                err.position(),
                err.expected,
                err.found
            ),
            Diagnostic::Semantic(err) => write!(f, "{}: {}", err.position(), err),
        }
    }
}
