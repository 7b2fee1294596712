use bitflags::bitflags;

use crate::ast::AstBuilder;
use crate::error::{Error, ErrorKind};
use crate::grammar::Grammar;
use crate::kind::TokenKind;
use crate::lexer::Lexer;
use crate::parser::Exploration;

bitflags! {
    /// Stage dumps routed to the `log` sinks.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DebugFlags: u8 {
        const SHOW_DATA = 1;
        const SHOW_LEX = 2;
        const SHOW_TREE = 4;
        const SHOW_AST = 8;
    }
}

/// Chains lexer, driver and builder: bytes in, one typed AST root out.
///
/// The exploration is consumed until the first accepting walker; with no
/// accepting walker the last failure is the one reported, as it made the
/// deepest progress.
pub struct Pipeline<'a, K: TokenKind, N> {
    lexer: &'a Lexer<K>,
    grammar: &'a Grammar<K>,
    builder: &'a AstBuilder<K, N>,
    flags: DebugFlags,
}

impl<'a, K: TokenKind, N> Pipeline<'a, K, N> {
    pub fn new(
        lexer: &'a Lexer<K>,
        grammar: &'a Grammar<K>,
        builder: &'a AstBuilder<K, N>,
    ) -> Self {
        Self {
            lexer,
            grammar,
            builder,
            flags: DebugFlags::empty(),
        }
    }

    pub fn with_flags(mut self, flags: DebugFlags) -> Self {
        self.flags = flags;
        self
    }
}

impl<K: TokenKind, N: std::fmt::Debug> Pipeline<'_, K, N> {
    pub fn parse(&self, input: &[u8]) -> Result<N, Error> {
        if self.flags.contains(DebugFlags::SHOW_DATA) {
            log::debug!(target: "backlr::data", "{}", String::from_utf8_lossy(input));
        }

        let tokens = self.lexer.lex(input).map_err(|failure| failure.error)?;

        if self.flags.contains(DebugFlags::SHOW_LEX) {
            for id in tokens.iter() {
                let token = tokens.token(id);
                log::debug!(
                    target: "backlr::lex",
                    "{} {:?} @ {:?}",
                    token.kind.name(),
                    token.text,
                    token.pos
                );
            }
        }

        let mut last_failure: Option<Error> = None;

        for walker in Exploration::new(self.grammar, tokens) {
            if !walker.is_accepted() {
                if let Some(err) = walker.error() {
                    last_failure = Some(err.clone());
                }
                continue;
            }

            let Some(tree) = walker.into_tree() else {
                continue;
            };
            let tree = tree.unwrap_start();

            if self.flags.contains(DebugFlags::SHOW_TREE) {
                log::debug!(target: "backlr::tree", "\n{}", tree.render());
            }

            let ast = self.builder.build(&tree, tree.root)?;

            if self.flags.contains(DebugFlags::SHOW_AST) {
                log::debug!(target: "backlr::ast", "{ast:#?}");
            }

            return Ok(ast);
        }

        Err(last_failure.unwrap_or_else(|| ErrorKind::NotAValidParse.into()))
    }
}
