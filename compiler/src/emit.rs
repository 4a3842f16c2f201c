use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    error::HgcError,
    gen_cpp::{compile_document_to_cpp, is_cpp_keyword},
    types::Document,
};

lazy_static! {
    static ref CPP_NAMESPACE: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(::[A-Za-z_][A-Za-z0-9_]*)*$").unwrap();
    static ref CPP_MACRO:     Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

/// Emission backends, keyed by their command line id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    CppStub,
    Json,
}

impl Target {
    pub const ALL: [Target; 2] = [Target::CppStub, Target::Json];

    pub fn id(self) -> &'static str {
        match self {
            Target::CppStub => "cpp-stub",
            Target::Json    => "json",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Target::CppStub => "C++ header with Hermes/Mercury rpc descriptors",
            Target::Json    => "the validated document as pretty-printed JSON",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Target {
    type Err = HgcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Target::ALL
            .iter()
            .copied()
            .find(|target| target.id() == s)
            .ok_or_else(|| HgcError::UnknownTarget(s.to_string()))
    }
}

/// Knobs for the `cpp-stub` target. Every field may be left out of an
/// options file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmitOptions {
    /// C++ namespace for the descriptor structs, `a::b` allowed.
    pub namespace:       String,
    /// `public_id` of the first rpc; later rpcs count up from here.
    pub first_public_id: u16,
    /// Defaults to the namespace in upper case plus `_HPP`.
    pub include_guard:   Option<String>,
}

impl Default for EmitOptions {
    fn default() -> Self {
        EmitOptions {
            namespace:       "hermes_rpcs".to_string(),
            first_public_id: 42,
            include_guard:   None,
        }
    }
}

impl EmitOptions {
    pub fn from_json(text: &str) -> Result<Self, HgcError> {
        serde_json::from_str(text).map_err(HgcError::Options)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, HgcError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| HgcError::OptionsRead {
            path: path.to_path_buf(),
            source,
        })?;
        EmitOptions::from_json(&text)
    }

    pub fn include_guard(&self) -> String {
        match &self.include_guard {
            Some(guard) => guard.clone(),
            None        => format!("{}_HPP", self.namespace.replace("::", "_").to_uppercase()),
        }
    }

    pub fn validate(&self) -> Result<(), HgcError> {
        if !CPP_NAMESPACE.is_match(&self.namespace) {
            return Err(HgcError::EmitError(format!(
                "Invalid C++ namespace \"{}\"",
                self.namespace
            )));
        }
        if let Some(part) = self.namespace.split("::").find(|part| is_cpp_keyword(part)) {
            return Err(HgcError::EmitError(format!(
                "Invalid C++ namespace \"{}\": \"{}\" is a C++ keyword",
                self.namespace, part
            )));
        }
        if let Some(guard) = &self.include_guard {
            if !CPP_MACRO.is_match(guard) {
                return Err(HgcError::EmitError(format!("Invalid include guard \"{}\"", guard)));
            }
        }
        Ok(())
    }
}

/// Hands a validated document to the backend registered for `target`.
#[tracing::instrument(skip_all, fields(emit_target = %target, rpc_count = document.len()))]
pub fn emit(document: &Document, target: Target, options: &EmitOptions) -> Result<String, HgcError> {
    let output = match target {
        Target::CppStub => compile_document_to_cpp(document, options)?,
        Target::Json    => serde_json::to_string_pretty(document)
            .map_err(|e| HgcError::EmitError(e.to_string()))?,
    };
    tracing::debug!(bytes = output.len(), "emitted");
    Ok(output)
}
