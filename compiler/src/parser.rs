use lazy_static::lazy_static;
use regex::Regex;

use crate::{
    cst::{ArgNode, ArgsNode, BodyNode, Cst, EmptyNode, ItemNode, ReturnNode, RpcNode},
    error::SyntaxError,
    tokenizer::Token,
    utils::quote,
};

lazy_static! {
    static ref IDENTIFIER:        Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
    static ref SEMICOLON:         Regex = Regex::new(r"^;$").unwrap();
    static ref LEFT_BRACE:        Regex = Regex::new(r"^\{$").unwrap();
    static ref RIGHT_BRACE:       Regex = Regex::new(r"^\}$").unwrap();
    static ref RPC_KEYWORD:       Regex = Regex::new(r"^rpc$").unwrap();
    static ref ARGUMENTS_KEYWORD: Regex = Regex::new(r"^arguments$").unwrap();
    static ref RETURNS_KEYWORD:   Regex = Regex::new(r"^returns$").unwrap();
    static ref TYPE_KEYWORD:      Regex = Regex::new(r"^(double|float|int32|uint32|string|exposed_buffer)$").unwrap();
    static ref EOF:               Regex = Regex::new(r"^$").unwrap();
}

const ITEM_EXPECTED: &str = "a type keyword, \";\" or \"}\"";

struct Parser<'a> {
    tokens: &'a [Token],
    index:  usize,
    eof:    Token,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        let (line, column) = tokens.last().map_or((1, 1), |t| (t.line, t.column));
        Parser {
            tokens,
            index: 0,
            eof: Token { text: String::new(), line, column },
        }
    }

    fn current(&self) -> &Token {
        self.tokens.get(self.index).unwrap_or(&self.eof)
    }

    fn at(&self, test: &Regex) -> bool {
        test.is_match(&self.current().text)
    }

    fn eat(&mut self, test: &Regex) -> bool {
        if !self.at(test) {
            return false;
        }
        // Never step past the end; the synthetic end-of-input token stays put.
        if self.index < self.tokens.len() {
            self.index += 1;
        }
        true
    }

    fn expect(&mut self, test: &Regex, expected: &str) -> Result<Token, SyntaxError> {
        let tok = self.current().clone();
        if !self.eat(test) {
            return Err(self.unexpected(expected));
        }
        Ok(tok)
    }

    fn unexpected(&self, expected: &str) -> SyntaxError {
        let tok   = self.current();
        let found = if tok.is_eof() { "end of input".to_string() } else { quote(&tok.text) };
        SyntaxError::new(expected, found, tok.position())
    }

    fn rpc(&mut self) -> Result<RpcNode, SyntaxError> {
        let keyword = self.expect(&RPC_KEYWORD, "\"rpc\"")?.position();
        let name    = self.expect(&IDENTIFIER, "identifier")?;
        self.expect(&LEFT_BRACE, "\"{\"")?;

        let mut body = Vec::new();
        while !self.eat(&RIGHT_BRACE) {
            let node = if self.at(&ARGUMENTS_KEYWORD) {
                BodyNode::Args(self.args_block()?)
            } else if self.at(&RETURNS_KEYWORD) {
                BodyNode::Return(self.return_block()?)
            } else if self.at(&SEMICOLON) {
                BodyNode::Empty(self.empty_statement())
            } else {
                return Err(self.unexpected("\"arguments\", \"returns\", \";\" or \"}\""));
            };
            body.push(node);
        }
        self.expect(&SEMICOLON, "\";\"")?;

        Ok(RpcNode { keyword, name, body })
    }

    fn args_block(&mut self) -> Result<ArgsNode, SyntaxError> {
        let keyword = self.expect(&ARGUMENTS_KEYWORD, "\"arguments\"")?.position();
        self.expect(&LEFT_BRACE, "\"{\"")?;

        let mut items = Vec::new();
        while !self.eat(&RIGHT_BRACE) {
            let item = if self.at(&TYPE_KEYWORD) {
                ItemNode::Arg(self.arg()?)
            } else if self.at(&SEMICOLON) {
                ItemNode::Empty(self.empty_statement())
            } else {
                return Err(self.unexpected(ITEM_EXPECTED));
            };
            items.push(item);
        }
        self.expect(&SEMICOLON, "\";\"")?;

        Ok(ArgsNode { keyword, items })
    }

    /// Holds exactly one argument or a (possibly empty) run of `;`.
    fn return_block(&mut self) -> Result<ReturnNode, SyntaxError> {
        let keyword = self.expect(&RETURNS_KEYWORD, "\"returns\"")?.position();
        self.expect(&LEFT_BRACE, "\"{\"")?;

        let item = if self.at(&TYPE_KEYWORD) {
            ItemNode::Arg(self.arg()?)
        } else if self.at(&SEMICOLON) || self.at(&RIGHT_BRACE) {
            ItemNode::Empty(self.empty_statement())
        } else {
            return Err(self.unexpected(ITEM_EXPECTED));
        };
        self.expect(&RIGHT_BRACE, "\"}\"")?;
        self.expect(&SEMICOLON, "\";\"")?;

        Ok(ReturnNode { keyword, item })
    }

    fn arg(&mut self) -> Result<ArgNode, SyntaxError> {
        let type_ = self.expect(&TYPE_KEYWORD, "a type keyword")?;
        let name  = self.expect(&IDENTIFIER, "identifier")?;
        self.expect(&SEMICOLON, "\";\"")?;
        Ok(ArgNode { type_, name })
    }

    fn empty_statement(&mut self) -> EmptyNode {
        let position       = self.current().position();
        let mut semicolons = 0;
        while self.eat(&SEMICOLON) {
            semicolons += 1;
        }
        EmptyNode { position, semicolons }
    }
}

/// Builds the concrete syntax tree. Stops at the first token that does not
/// fit the grammar.
#[tracing::instrument(skip_all, fields(token_count = tokens.len()))]
pub fn parse_document(tokens: &[Token]) -> Result<Cst, SyntaxError> {
    let mut parser = Parser::new(tokens);

    // A document is either one or more rpcs, or nothing but stray `;`.
    if parser.at(&SEMICOLON) || parser.at(&EOF) {
        let empty = parser.empty_statement();
        parser.expect(&EOF, "end of input")?;
        return Ok(Cst { rpcs: Vec::new(), empty: Some(empty) });
    }

    let mut rpcs = Vec::new();
    while !parser.at(&EOF) {
        rpcs.push(parser.rpc()?);
    }
    tracing::debug!(rpc_count = rpcs.len(), "parsed document");

    Ok(Cst { rpcs, empty: None })
}
