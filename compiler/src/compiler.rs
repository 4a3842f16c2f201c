use std::fs;
use std::path::Path;

use crate::{
    builder::build_ast,
    error::HgcError,
    parser::parse_document,
    tokenizer::tokenize,
    types::Document,
    verifier::verify_ast,
};

/// Compile IDL source text into a validated `Document`.
/// Returns `Err(HgcError::Syntax)` for the first grammar violation, or
/// `Err(HgcError::Semantic)` carrying every naming problem found.
#[tracing::instrument(skip_all, fields(source_len = text.len()))]
pub fn compile(text: &str) -> Result<Document, HgcError> {
    let tokens   = tokenize(text)?;
    let cst      = parse_document(&tokens)?;
    let ast      = build_ast(&cst)?;
    let document = verify_ast(&ast).map_err(HgcError::Semantic)?;
    tracing::debug!(rpc_count = document.len(), "compiled document");
    Ok(document)
}

/// Read a whole IDL file, then compile it. Read and decode failures are
/// reported before any parsing starts.
pub fn compile_file(path: impl AsRef<Path>) -> Result<Document, HgcError> {
    let path  = path.as_ref();
    let bytes = fs::read(path).map_err(|source| HgcError::SourceRead {
        path: path.to_path_buf(),
        source,
    })?;
    let text = String::from_utf8(bytes).map_err(|_| HgcError::SourceDecode {
        path: path.to_path_buf(),
    })?;
    tracing::debug!(path = %path.display(), "read source");
    compile(&text)
}
