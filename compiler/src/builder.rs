use crate::{
    cst::{ArgNode, BodyNode, Cst, ItemNode, RpcNode},
    error::SyntaxError,
    utils::quote,
    types::{Argument, Ast, BlockKind, Position, RedundantBlock, RpcDeclaration, Type},
};

/// Flattens the syntax tree into declarations. Empty statements vanish and
/// block framing is reduced to plain `args`/`ret` fields. Names are not
/// checked here; repeated blocks are only recorded for the verifier.
///
/// Fails only on a hand-built tree whose argument type is not a type keyword.
#[tracing::instrument(skip_all, fields(rpc_count = cst.rpcs.len()))]
pub fn build_ast(cst: &Cst) -> Result<Ast, SyntaxError> {
    let mut ast = Ast::default();
    for rpc in &cst.rpcs {
        let declaration = build_rpc(rpc, &mut ast.redundant_blocks)?;
        ast.declarations.push(declaration);
    }
    tracing::debug!(redundant_blocks = ast.redundant_blocks.len(), "built ast");
    Ok(ast)
}

fn build_rpc(rpc: &RpcNode, redundant: &mut Vec<RedundantBlock>) -> Result<RpcDeclaration, SyntaxError> {
    let mut args = Vec::new();
    let mut ret  = None;
    let mut arguments_at: Option<Position> = None;
    let mut returns_at:   Option<Position> = None;

    let mut note = |kind: BlockKind, seen: &mut Option<Position>, at: Position| -> bool {
        match *seen {
            Some(first) => {
                redundant.push(RedundantBlock {
                    rpc: rpc.name.text.clone(),
                    kind,
                    first,
                    duplicate: at,
                });
                false
            }
            None => {
                *seen = Some(at);
                true
            }
        }
    };

    for node in &rpc.body {
        match node {
            BodyNode::Args(block) => {
                if note(BlockKind::Arguments, &mut arguments_at, block.keyword) {
                    for item in &block.items {
                        match item {
                            ItemNode::Arg(arg) => args.push(build_arg(arg)?),
                            ItemNode::Empty(_) => {}
                        }
                    }
                }
            }
            BodyNode::Return(block) => {
                if note(BlockKind::Returns, &mut returns_at, block.keyword) {
                    ret = match &block.item {
                        ItemNode::Arg(arg) => Some(build_arg(arg)?),
                        ItemNode::Empty(_) => None,
                    };
                }
            }
            BodyNode::Empty(_) => {}
        }
    }

    Ok(RpcDeclaration {
        name:   rpc.name.text.clone(),
        line:   rpc.name.line,
        column: rpc.name.column,
        args,
        ret,
    })
}

fn build_arg(arg: &ArgNode) -> Result<Argument, SyntaxError> {
    let type_ = Type::from_keyword(&arg.type_.text).ok_or_else(|| {
        SyntaxError::new("a type keyword", quote(&arg.type_.text), arg.type_.position())
    })?;
    Ok(Argument {
        name:   arg.name.text.clone(),
        line:   arg.name.line,
        column: arg.name.column,
        type_,
    })
}
