//! hermes-idl-compiler
//!
//! This crate implements:
//!  1) A tokenizer + parser for Hermes `rpc` interface definitions,
//!  2) An AST builder that flattens the syntax tree into rpc declarations,
//!  3) A verifier (duplicate rpc/argument names, repeated blocks, reserved names),
//!  4) Emitters for the validated `Document` (`cpp-stub`, `json`),
//!  5) Error and diagnostic types (`HgcError`, `SyntaxError`, `SemanticError`).
//!
//! ```
//! let document = hermes_idl_compiler::compile(
//!     "rpc send_message { arguments { string message; }; returns { int32 retval; }; };",
//! ).unwrap();
//! assert_eq!(document.rpcs()[0].args[0].name, "message");
//! ```

pub mod error;
pub mod types;
pub mod utils;
pub mod tokenizer;
pub mod cst;
pub mod parser;
pub mod builder;
pub mod verifier;
pub mod compiler;
pub mod emit;
pub mod gen_cpp;

pub use compiler::{compile, compile_file};
pub use emit::{emit, EmitOptions, Target};
pub use error::{Diagnostic, HgcError, SemanticError, SyntaxError};
pub use types::{Argument, Document, RpcDeclaration, Type};
