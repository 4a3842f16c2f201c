use std::collections::HashMap;

use crate::{
    error::SemanticError,
    types::{Argument, Ast, Document, Position, RpcDeclaration, Type},
};

/// Checks the whole AST and returns every problem found, sorted by source
/// position. On success the declarations become a `Document`.
#[tracing::instrument(skip_all, fields(rpc_count = ast.declarations.len()))]
pub fn verify_ast(ast: &Ast) -> Result<Document, Vec<SemanticError>> {
    let mut errors = Vec::new();

    check_rpc_names(&ast.declarations, &mut errors);

    for block in &ast.redundant_blocks {
        errors.push(SemanticError::DuplicateBlock {
            rpc:       block.rpc.clone(),
            block:     block.kind.keyword().to_string(),
            first:     block.first,
            duplicate: block.duplicate,
        });
    }

    for rpc in &ast.declarations {
        check_arg_names(rpc, &mut errors);
        for arg in rpc.args.iter().chain(rpc.ret.iter()) {
            check_type(arg, &mut errors);
            check_name(&arg.name, arg.position(), &mut errors);
        }
    }

    // Stable, so problems reported at the same spot keep their check order.
    errors.sort_by_key(SemanticError::position);

    if errors.is_empty() {
        tracing::debug!("verification passed");
        Ok(Document::new(ast.declarations.clone()))
    } else {
        tracing::debug!(error_count = errors.len(), "verification failed");
        Err(errors)
    }
}

/// The first declaration of a name is the canonical one; every later one
/// is reported against it.
fn check_rpc_names(rpcs: &[RpcDeclaration], errors: &mut Vec<SemanticError>) {
    let mut seen: HashMap<&str, Position> = HashMap::new();
    for rpc in rpcs {
        check_name(&rpc.name, rpc.position(), errors);
        match seen.get(rpc.name.as_str()) {
            Some(&first) => errors.push(SemanticError::DuplicateRpcName {
                name:      rpc.name.clone(),
                first,
                duplicate: rpc.position(),
            }),
            None => {
                seen.insert(&rpc.name, rpc.position());
            }
        }
    }
}

/// Arguments and the return value share one namespace.
fn check_arg_names(rpc: &RpcDeclaration, errors: &mut Vec<SemanticError>) {
    let mut seen: HashMap<&str, Position> = HashMap::new();
    for arg in rpc.args.iter().chain(rpc.ret.iter()) {
        match seen.get(arg.name.as_str()) {
            Some(&first) => errors.push(SemanticError::DuplicateArgName {
                rpc:       rpc.name.clone(),
                name:      arg.name.clone(),
                first,
                duplicate: arg.position(),
            }),
            None => {
                seen.insert(&arg.name, arg.position());
            }
        }
    }
}

// Holds as long as the grammar only produces keyword types; a new `Type`
// variant missing from the keyword table would be caught here.
fn check_type(arg: &Argument, errors: &mut Vec<SemanticError>) {
    if Type::from_keyword(arg.type_.keyword()) != Some(arg.type_) {
        errors.push(SemanticError::IllegalType {
            name:      arg.name.clone(),
            type_name: arg.type_.keyword().to_string(),
            position:  arg.position(),
        });
    }
}

fn check_name(name: &str, position: Position, errors: &mut Vec<SemanticError>) {
    if name.is_empty() {
        errors.push(SemanticError::EmptyName { position });
    } else if Type::is_keyword(name) {
        errors.push(SemanticError::ReservedName {
            name: name.to_string(),
            position,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{builder::build_ast, parser::parse_document, tokenizer::tokenize};

    fn verify(text: &str) -> Result<Document, Vec<SemanticError>> {
        let ast = build_ast(&parse_document(&tokenize(text).unwrap()).unwrap()).unwrap();
        verify_ast(&ast)
    }

    fn arg(name: &str, line: usize, column: usize, type_: Type) -> Argument {
        Argument { name: name.into(), line, column, type_ }
    }

    #[test]
    fn test_verify_accepts_valid_document() {
        let doc = verify(
            "rpc send_message { arguments { string message; }; returns { int32 retval; }; };\n\
             rpc send_file { arguments { string pathname; exposed_buffer buffers; }; returns { int32 retval; }; };",
        )
        .unwrap();
        assert_eq!(doc.len(), 2);
        assert_eq!(doc.rpcs()[1].name, "send_file");
        assert!(doc.get("send_message").is_some());
    }

    #[test]
    fn test_verify_duplicate_rpc_name() {
        let errors = verify("rpc A{arguments{};}; rpc A{arguments{};};").unwrap_err();
        assert_eq!(
            errors,
            vec![SemanticError::DuplicateRpcName {
                name:      "A".into(),
                first:     Position::new(1, 5),
                duplicate: Position::new(1, 26),
            }]
        );
    }

    #[test]
    fn test_verify_reports_every_duplicate_after_the_first() {
        let errors = verify("rpc A{}; rpc B{}; rpc A{}; rpc A{};").unwrap_err();
        assert_eq!(errors.len(), 2);
        for err in &errors {
            assert!(matches!(err, SemanticError::DuplicateRpcName { name, first, .. }
                if name == "A" && *first == Position::new(1, 5)));
        }
    }

    #[test]
    fn test_verify_duplicate_arg_name() {
        let errors = verify("rpc A{arguments{int32 x; float x;};};").unwrap_err();
        assert_eq!(
            errors,
            vec![SemanticError::DuplicateArgName {
                rpc:       "A".into(),
                name:      "x".into(),
                first:     Position::new(1, 23),
                duplicate: Position::new(1, 32),
            }]
        );
    }

    #[test]
    fn test_verify_return_shares_argument_namespace() {
        let errors = verify("rpc A { arguments { int32 x; }; returns { double x; }; };").unwrap_err();
        assert!(matches!(&errors[..], [SemanticError::DuplicateArgName { name, .. }] if name == "x"));
    }

    #[test]
    fn test_verify_same_arg_name_in_different_rpcs() {
        assert!(verify("rpc A { arguments { int32 x; }; }; rpc B { arguments { int32 x; }; };").is_ok());
    }

    #[test]
    fn test_verify_reserved_names() {
        let errors = verify("rpc string { arguments { int32 float; }; returns { uint32 exposed_buffer; }; };").unwrap_err();
        let names: Vec<_> = errors
            .iter()
            .map(|e| match e {
                SemanticError::ReservedName { name, .. } => name.as_str(),
                other => panic!("unexpected error {:?}", other),
            })
            .collect();
        assert_eq!(names, vec!["string", "float", "exposed_buffer"]);
    }

    #[test]
    fn test_verify_duplicate_blocks() {
        let errors = verify("rpc A { returns { int32 r; }; returns { }; };").unwrap_err();
        assert_eq!(
            errors,
            vec![SemanticError::DuplicateBlock {
                rpc:       "A".into(),
                block:     "returns".into(),
                first:     Position::new(1, 9),
                duplicate: Position::new(1, 31),
            }]
        );
    }

    #[test]
    fn test_verify_accumulates_all_errors() {
        let errors = verify(
            "rpc A { arguments { int32 x; int32 x; }; };\n\
             rpc A { arguments { int32 int32; }; };",
        )
        .unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(matches!(errors[0], SemanticError::DuplicateArgName { .. }));
        assert!(matches!(errors[1], SemanticError::DuplicateRpcName { .. }));
        assert!(matches!(errors[2], SemanticError::ReservedName { .. }));
        let positions: Vec<_> = errors.iter().map(SemanticError::position).collect();
        assert_eq!(positions, vec![Position::new(1, 36), Position::new(2, 5), Position::new(2, 27)]);
    }

    #[test]
    fn test_verify_hand_built_empty_names() {
        let ast = Ast {
            declarations: vec![RpcDeclaration {
                name:   String::new(),
                line:   1,
                column: 5,
                args:   vec![arg("", 1, 20, Type::Float)],
                ret:    None,
            }],
            redundant_blocks: Vec::new(),
        };
        let errors = verify_ast(&ast).unwrap_err();
        assert_eq!(
            errors,
            vec![
                SemanticError::EmptyName { position: Position::new(1, 5) },
                SemanticError::EmptyName { position: Position::new(1, 20) },
            ]
        );
    }

    #[test]
    fn test_verify_does_not_touch_input() {
        let ast = Ast {
            declarations: vec![RpcDeclaration {
                name:   "A".into(),
                line:   1,
                column: 5,
                args:   vec![arg("x", 1, 10, Type::Int32), arg("x", 1, 20, Type::Uint32)],
                ret:    Some(arg("r", 1, 30, Type::Double)),
            }],
            redundant_blocks: Vec::new(),
        };
        let before = ast.clone();
        assert!(verify_ast(&ast).is_err());
        assert_eq!(ast, before);
    }

    #[test]
    fn test_verify_empty_document() {
        let doc = verify("").unwrap();
        assert!(doc.is_empty());
    }
}
