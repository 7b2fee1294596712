//! End-to-end sums: left recursion, whitespace skipping, and the shape
//! of the parse tree.

use pretty_assertions::assert_eq;

use backlr::{
    AstBuilder, DebugFlags, Error, Exploration, Grammar, Lexer, LexerBuilder, ParseTree, Pipeline,
    TokenId, TokenKind,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Sym {
    Eof = 0,
    Digit,
    Plus,
    S,
    E,
    N,
}

impl TokenKind for Sym {
    fn id(&self) -> u16 {
        *self as u16
    }

    fn name(&self) -> &'static str {
        match self {
            Sym::Eof => "<eof>",
            Sym::Digit => "digit",
            Sym::Plus => "+",
            Sym::S => "S",
            Sym::E => "E",
            Sym::N => "N",
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, Sym::Eof | Sym::Digit | Sym::Plus)
    }

    fn eof() -> Self {
        Sym::Eof
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Expr {
    Num(u32),
    Add(Box<Expr>, Box<Expr>),
}

fn lexer() -> Lexer<Sym> {
    let mut builder = LexerBuilder::new();
    for digit in '0'..='9' {
        builder.register_literal(Sym::Digit, &digit.to_string());
    }
    builder.register_literal(Sym::Plus, "+");
    builder.register_skip(" ");
    builder.register_skip("\t");
    builder.build()
}

fn grammar() -> Grammar<Sym> {
    let mut grammar = Grammar::default();
    grammar
        .add_rule(Sym::Eof, [Sym::S, Sym::Eof])
        .and_then(|g| g.add_rule(Sym::S, [Sym::E]))
        .and_then(|g| g.add_rule(Sym::E, [Sym::E, Sym::Plus, Sym::N]))
        .and_then(|g| g.add_rule(Sym::E, [Sym::N]))
        .and_then(|g| g.add_rule(Sym::N, [Sym::Digit]))
        .expect("grammar is well-formed");
    grammar.solve_conflicts();
    grammar
}

fn build_s(
    builder: &AstBuilder<Sym, Expr>,
    tree: &ParseTree<Sym>,
    token: TokenId,
) -> Result<Expr, Error> {
    let children = builder.children_of(tree, token)?;
    builder.build(tree, children[0])
}

fn build_e(
    builder: &AstBuilder<Sym, Expr>,
    tree: &ParseTree<Sym>,
    token: TokenId,
) -> Result<Expr, Error> {
    let children = builder.children_of(tree, token)?;
    match children.len() {
        1 => builder.build(tree, children[0]),
        _ => Ok(Expr::Add(
            Box::new(builder.build(tree, children[0])?),
            Box::new(builder.build(tree, children[2])?),
        )),
    }
}

fn build_n(
    builder: &AstBuilder<Sym, Expr>,
    tree: &ParseTree<Sym>,
    token: TokenId,
) -> Result<Expr, Error> {
    let children = builder.children_of(tree, token)?;
    let digit = tree.arena.get(children[0]);
    Ok(Expr::Num(digit.text.parse().unwrap_or_default()))
}

fn builder() -> AstBuilder<Sym, Expr> {
    let mut builder = AstBuilder::new();
    builder
        .register(Sym::S, build_s)
        .register(Sym::E, build_e)
        .register(Sym::N, build_n);
    builder
}

#[test]
fn test_left_recursive_sum_builds_left_leaning_ast() {
    let lexer = lexer();
    let grammar = grammar();
    let builder = builder();
    let pipeline = Pipeline::new(&lexer, &grammar, &builder);

    let ast = pipeline.parse(b"1+2+3").expect("input parses");

    assert_eq!(
        ast,
        Expr::Add(
            Box::new(Expr::Add(
                Box::new(Expr::Num(1)),
                Box::new(Expr::Num(2))
            )),
            Box::new(Expr::Num(3))
        )
    );
}

#[test]
fn test_whitespace_is_invisible_to_the_parser() {
    let lexer = lexer();
    let grammar = grammar();
    let builder = builder();
    let pipeline = Pipeline::new(&lexer, &grammar, &builder);

    let spaced = pipeline.parse(b"  1 + 2 ").expect("spaced input parses");
    let dense = pipeline.parse(b"1+2").expect("dense input parses");

    assert_eq!(spaced, dense);
    assert_eq!(
        spaced,
        Expr::Add(Box::new(Expr::Num(1)), Box::new(Expr::Num(2)))
    );
}

#[test]
fn test_debug_flags_do_not_change_the_result() {
    let lexer = lexer();
    let grammar = grammar();
    let builder = builder();

    let quiet = Pipeline::new(&lexer, &grammar, &builder);
    let loud = Pipeline::new(&lexer, &grammar, &builder).with_flags(DebugFlags::all());

    assert_eq!(
        quiet.parse(b"1+2").expect("input parses"),
        loud.parse(b"1+2").expect("input parses")
    );
}

#[test]
fn test_parse_tree_covers_every_terminal_once() {
    let lexer = lexer();
    let grammar = grammar();

    let tokens = lexer.lex(b"1+2+3").expect("input lexes");
    let stream: Vec<(Sym, Option<usize>)> = tokens
        .iter()
        .map(|id| (tokens.token(id).kind, tokens.token(id).pos))
        .collect();

    let accepted = Exploration::new(&grammar, tokens)
        .find(|walker| walker.is_accepted())
        .expect("an accepting walker");
    let tree = accepted.into_tree().expect("accepted walkers carry a tree");

    // Every terminal of the stream, EOF included, shows up as exactly
    // one leaf, in scan order.
    let leaves: Vec<(Sym, Option<usize>)> = tree
        .arena
        .leaves(tree.root)
        .into_iter()
        .map(|id| (tree.arena.get(id).kind, tree.arena.get(id).pos))
        .collect();

    assert_eq!(leaves, stream);
}

#[test]
fn test_accepting_root_is_the_start_symbol() {
    let lexer = lexer();
    let grammar = grammar();

    let tokens = lexer.lex(b"1").expect("input lexes");
    let accepted = Exploration::new(&grammar, tokens)
        .find(|walker| walker.is_accepted())
        .expect("an accepting walker");

    let tree = accepted.into_tree().expect("accepted walkers carry a tree");
    assert!(tree.root_token().kind.is_eof());

    let unwrapped = tree.unwrap_start();
    assert_eq!(unwrapped.root_token().kind, Sym::S);
}
