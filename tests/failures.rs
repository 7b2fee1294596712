//! Failure reporting: suggestions from the word table and errors that
//! point at the right byte.

use backlr::{ErrorKind, Exploration, Grammar, Lexer, LexerBuilder, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Sym {
    Eof = 0,
    Return,
    Digit,
    A,
    B,
    S,
}

impl TokenKind for Sym {
    fn id(&self) -> u16 {
        *self as u16
    }

    fn name(&self) -> &'static str {
        match self {
            Sym::Eof => "<eof>",
            Sym::Return => "return",
            Sym::Digit => "digit",
            Sym::A => "a",
            Sym::B => "b",
            Sym::S => "S",
        }
    }

    fn is_terminal(&self) -> bool {
        !matches!(self, Sym::S)
    }

    fn eof() -> Self {
        Sym::Eof
    }
}

#[test]
fn test_misspelled_keyword_gets_a_suggestion() {
    let mut builder = LexerBuilder::new();
    builder
        .register_literal(Sym::Return, "return")
        .register_literal(Sym::Digit, "1")
        .register_skip(" ");
    let lexer = builder.build();

    let failure = lexer.lex(b"retrun 1").unwrap_err();

    assert!(matches!(
        failure.error.kind(),
        ErrorKind::UnexpectedRune { .. }
    ));
    assert_eq!(failure.error.span().unwrap().start, 0);
    assert_eq!(failure.error.suggestion(), Some("return"));
    assert!(failure.partial.is_empty());
}

#[test]
fn test_no_suggestion_beyond_the_distance_limit() {
    let mut builder = LexerBuilder::new();
    builder.register_literal(Sym::Return, "return");
    let lexer = builder.build();

    // Four edits away from "return": nothing to suggest.
    let failure = lexer.lex(b"rxyzw").unwrap_err();

    assert!(matches!(
        failure.error.kind(),
        ErrorKind::UnexpectedRune { .. }
    ));
    assert_eq!(failure.error.suggestion(), None);
}

fn ab_lexer() -> Lexer<Sym> {
    let mut builder = LexerBuilder::new();
    builder
        .register_literal(Sym::A, "a")
        .register_literal(Sym::B, "b");
    builder.build()
}

/// S := 'a' 'b'
fn ab_grammar() -> Grammar<Sym> {
    let mut grammar = Grammar::default();
    grammar
        .add_rule(Sym::Eof, [Sym::S, Sym::Eof])
        .and_then(|g| g.add_rule(Sym::S, [Sym::A, Sym::B]))
        .expect("grammar is well-formed");
    grammar.solve_conflicts();
    grammar
}

#[test]
fn test_eof_in_the_middle_of_a_rule() {
    let lexer = ab_lexer();
    let grammar = ab_grammar();

    let tokens = lexer.lex(b"a").expect("input lexes");
    let walkers: Vec<_> = Exploration::new(&grammar, tokens).collect();

    assert!(walkers.iter().all(|walker| !walker.is_accepted()));

    let error = walkers
        .last()
        .and_then(|walker| walker.error())
        .expect("the last walker reports its failure");

    match error.kind() {
        ErrorKind::UnexpectedToken { prev, got, expected } => {
            assert_eq!(prev.as_deref(), Some("a"));
            assert_eq!(*got, None);
            assert!(expected.contains("b"));
        }
        kind => panic!("unexpected error kind: {kind:?}"),
    }

    // The failure points just past the consumed 'a'.
    assert_eq!(error.span().unwrap().start, 1);
}

#[test]
fn test_successful_ab_parse_for_contrast() {
    let lexer = ab_lexer();
    let grammar = ab_grammar();

    let tokens = lexer.lex(b"ab").expect("input lexes");
    let accepted = Exploration::new(&grammar, tokens).find(|walker| walker.is_accepted());

    assert!(accepted.is_some());
}
