//! Generic lexing and backtracking LR parsing over user token kinds.
//!
//! The engine knows no source language: users bring a [`TokenKind`]
//! enumeration, lexer rules, grammar rules and per-kind build functions,
//! and get a typed AST back. Conflicts the grammar analyser cannot
//! resolve with lookbehind windows and lookahead sets are handled at
//! parse time by depth-first backtracking over the alternatives.

pub mod ast;
pub mod error;
pub mod grammar;
pub mod kind;
pub mod lexer;
pub mod parser;
pub mod pipeline;
pub mod token;

pub use ast::{AstBuilder, AstNode, BuildFn};
pub use error::{Error, ErrorKind, ExpectedSet};
pub use grammar::{Grammar, Rule};
pub use kind::TokenKind;
pub use lexer::{LexFailure, Lexed, Lexer, LexerBuilder, Scanner};
pub use parser::{ActiveParser, Exploration, History, RefusableStack};
pub use pipeline::{DebugFlags, Pipeline};
pub use token::{ParseTree, Span, Token, TokenArena, TokenBuf, TokenId};

pub type BacklrResult<T> = Result<T, Error>;

#[cfg(test)]
pub mod fixtures {
    use crate::grammar::{Grammar, Rule};
    use crate::kind::TokenKind;
    use crate::lexer::{Lexer, LexerBuilder};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub enum ExprSym {
        Eof = 0,
        Digit,
        Plus,
        S,
        E,
        N,
    }

    impl TokenKind for ExprSym {
        fn id(&self) -> u16 {
            *self as u16
        }

        fn name(&self) -> &'static str {
            match self {
                ExprSym::Eof => "<eof>",
                ExprSym::Digit => "digit",
                ExprSym::Plus => "'+'",
                ExprSym::S => "S",
                ExprSym::E => "E",
                ExprSym::N => "N",
            }
        }

        fn is_terminal(&self) -> bool {
            matches!(self, ExprSym::Eof | ExprSym::Digit | ExprSym::Plus)
        }

        fn eof() -> Self {
            ExprSym::Eof
        }
    }

    /// The raw rule set behind [`expr_grammar`], for tests that poke at
    /// the analysis directly.
    pub fn expr_rules() -> Vec<Rule<ExprSym>> {
        vec![
            Rule::new(0, ExprSym::Eof, vec![ExprSym::S, ExprSym::Eof]),
            Rule::new(1, ExprSym::S, vec![ExprSym::E]),
            Rule::new(2, ExprSym::E, vec![ExprSym::E, ExprSym::Plus, ExprSym::N]),
            Rule::new(3, ExprSym::E, vec![ExprSym::N]),
            Rule::new(4, ExprSym::N, vec![ExprSym::Digit]),
        ]
    }

    /// Left-recursive sums:
    ///
    /// ```grammar
    /// <start> := S <eof>
    /// S := E
    /// E := E + N
    /// E := N
    /// N := digit
    /// ```
    pub fn expr_grammar() -> Grammar<ExprSym> {
        let mut grammar = Grammar::default();
        grammar
            .add_rule(ExprSym::Eof, [ExprSym::S, ExprSym::Eof])
            .and_then(|g| g.add_rule(ExprSym::S, [ExprSym::E]))
            .and_then(|g| g.add_rule(ExprSym::E, [ExprSym::E, ExprSym::Plus, ExprSym::N]))
            .and_then(|g| g.add_rule(ExprSym::E, [ExprSym::N]))
            .and_then(|g| g.add_rule(ExprSym::N, [ExprSym::Digit]))
            .expect("fixture grammar is well-formed");
        grammar
    }

    pub fn expr_lexer() -> Lexer<ExprSym> {
        let mut builder = LexerBuilder::new();
        for digit in '0'..='9' {
            builder.register_literal(ExprSym::Digit, &digit.to_string());
        }
        builder.register_literal(ExprSym::Plus, "+");
        builder.register_skip(" ");
        builder.register_skip("\t");
        builder.build()
    }
}
