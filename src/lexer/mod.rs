use std::collections::HashMap;

use crate::error::{Error, ErrorKind};
use crate::kind::TokenKind;
use crate::token::{Span, Token, TokenArena, TokenBuf};

mod matcher;
mod scanner;
mod suggest;

pub use scanner::Scanner;

use matcher::{MatchStep, Matcher};
use suggest::WordTable;

/// What a user lex function produced.
#[derive(Debug, PartialEq, Eq)]
pub enum Lexed<K> {
    Token { kind: K, text: String },
    Skip,
}

/// A computed lexeme for a registered first rune. The scanner sits before
/// the rune; the function consumes it and everything belonging to the
/// lexeme, returning the covered text.
pub type RuneFn = fn(&mut Scanner<'_>) -> Result<String, Error>;

/// The fallback lex function, invoked when no rule starts at the current
/// rune.
pub type DefaultFn<K> = fn(&mut Scanner<'_>) -> Result<Lexed<K>, Error>;

/// Builder for the rule-directed lexer.
#[derive(Debug, Default, Clone)]
pub struct LexerBuilder<K: TokenKind> {
    matcher: Matcher<K>,
    rune_fns: HashMap<char, (K, RuneFn)>,
    default: Option<DefaultFn<K>>,
}

impl<K: TokenKind> LexerBuilder<K> {
    pub fn new() -> Self {
        Self {
            matcher: Matcher::default(),
            rune_fns: HashMap::default(),
            default: None,
        }
    }

    /// Dispatch `first_rune` to `lex_fn`; the returned text is emitted
    /// with `kind`. Literal rules starting with the same rune win.
    pub fn register(&mut self, first_rune: char, kind: K, lex_fn: RuneFn) -> &mut Self {
        self.rune_fns.insert(first_rune, (kind, lex_fn));
        self
    }

    /// Match `literal` exactly and emit it with `kind`. Re-registering a
    /// literal replaces the previous rule.
    pub fn register_literal(&mut self, kind: K, literal: &str) -> &mut Self {
        self.matcher.insert(literal.chars().collect(), Some(kind));
        self
    }

    /// Match `literal` exactly and emit nothing.
    pub fn register_skip(&mut self, literal: &str) -> &mut Self {
        self.matcher.insert(literal.chars().collect(), None);
        self
    }

    /// Fallback when no literal rule and no first-rune entry matches.
    pub fn register_default(&mut self, lex_fn: DefaultFn<K>) -> &mut Self {
        self.default = Some(lex_fn);
        self
    }

    /// Freeze the rule table and the suggestion word table.
    pub fn build(self) -> Lexer<K> {
        let mut words = WordTable::default();
        for word in self.matcher.iter_words() {
            words.insert(&word);
        }

        Lexer {
            matcher: self.matcher,
            rune_fns: self.rune_fns,
            default: self.default,
            words,
        }
    }
}

/// A lex run that stopped on an error. The tokens scanned before the
/// failure are kept for inspection.
#[derive(Debug, Clone, PartialEq)]
pub struct LexFailure<K: TokenKind> {
    pub error: Error,
    pub partial: Vec<Token<K>>,
}

/// The rule-directed lexer. Immutable once built; one `lex` call per
/// input, producing the scan-order token stream.
#[derive(Debug, Clone)]
pub struct Lexer<K: TokenKind> {
    matcher: Matcher<K>,
    rune_fns: HashMap<char, (K, RuneFn)>,
    default: Option<DefaultFn<K>>,
    words: WordTable,
}

impl<K: TokenKind> Lexer<K> {
    pub fn builder() -> LexerBuilder<K> {
        LexerBuilder::new()
    }

    /// Turn `input` into the token stream, EOF-terminated and
    /// lookahead-chained. The first error aborts the run.
    pub fn lex(&self, input: &[u8]) -> Result<TokenBuf<K>, LexFailure<K>> {
        let mut scanner = Scanner::new(input);
        let mut arena = TokenArena::new();
        let mut order = vec![];

        loop {
            match self.step(&mut scanner) {
                Ok(None) => break,
                Ok(Some((Lexed::Skip, _))) => {}
                Ok(Some((Lexed::Token { kind, text }, pos))) => {
                    order.push(arena.insert(Token::terminal(kind, text, pos)));
                }
                Err(error) => {
                    return Err(LexFailure {
                        error,
                        partial: order.iter().map(|&id| arena.get(id).clone()).collect(),
                    })
                }
            }
        }

        Ok(TokenBuf::seal(arena, order))
    }

    /// One dispatch: literal rules, then the first-rune table, then the
    /// default handler. `None` at end of stream. Emitted lexemes come
    /// back with the byte offset they started at.
    fn step(&self, scanner: &mut Scanner<'_>) -> Result<Option<(Lexed<K>, usize)>, Error> {
        let got = match self.matcher.dispatch(scanner, &self.words)? {
            MatchStep::Eof => return Ok(None),
            MatchStep::Skipped => return Ok(Some((Lexed::Skip, scanner.pos()))),
            MatchStep::Token { kind, text, pos } => {
                return Ok(Some((Lexed::Token { kind, text }, pos)))
            }
            MatchStep::NoRuleStarts { got } => got,
        };

        let start = scanner.pos();

        if let Some(&(kind, lex_fn)) = self.rune_fns.get(&got) {
            let text = lex_fn(scanner).map_err(|err| self.locate(err, start, scanner))?;
            return Ok(Some((Lexed::Token { kind, text }, start)));
        }

        if let Some(default) = self.default {
            let lexed = default(scanner).map_err(|err| self.locate(err, start, scanner))?;
            if scanner.pos() == start {
                return Err(Error::new(
                    ErrorKind::InvalidAction {
                        action: "default handler consumed nothing",
                    },
                    Some(Span::new(start, 0)),
                ));
            }
            return Ok(Some((lexed, start)));
        }

        let expected: Vec<char> = self
            .matcher
            .iter_first_runes()
            .chain(self.rune_fns.keys().copied())
            .collect();

        Err(Error::new(
            ErrorKind::UnexpectedRune {
                prev: None,
                got: Some(got),
                expected: expected.into_iter().collect(),
            },
            Some(Span::new(start, got.len_utf8())),
        )
        .with_suggestion(self.words.closest(&got.to_string())))
    }

    /// Pin a user-function error to the lexeme it was scanning.
    fn locate(&self, err: Error, start: usize, scanner: &Scanner<'_>) -> Error {
        if err.span().is_some() {
            return err;
        }
        let delta = scanner.pos().saturating_sub(start).max(1);
        let suggestion = err.suggestion().map(str::to_string);
        Error::new(err.kind().clone(), Some(Span::new(start, delta))).with_suggestion(suggestion)
    }
}
