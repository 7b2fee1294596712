//! State-based grammar compilation.
//!
//! An alternative to the bucket decision map: canonical closure/goto
//! states with a dense action/goto table. Grammars inside SLR(1) compile
//! here without any runtime backtracking; anything ambiguous is rejected
//! at build time.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use prettytable::Table as PtTable;

use crate::error::{Error, ErrorKind};
use crate::kind::TokenKind;

use super::rule::{Rule, RuleId};
use super::Grammar;

pub type StateId = usize;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Action {
    Shift(StateId),
    Reduce(RuleId),
    Accept,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Shift(to) => write!(f, "s{}", to),
            Action::Reduce(rule) => write!(f, "r{}", rule),
            Action::Accept => write!(f, "acc"),
        }
    }
}

/// An LR position: `dot` rhs symbols behind, `rhs[dot]` ahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct LrItem {
    rule: RuleId,
    dot: usize,
}

impl LrItem {
    fn expected<'r, K: TokenKind>(&self, rule: &'r Rule<K>) -> Option<&'r K> {
        rule.rhs.get(self.dot)
    }

    fn advanced(&self) -> Self {
        Self {
            rule: self.rule,
            dot: self.dot + 1,
        }
    }

    fn is_exhausted<K: TokenKind>(&self, rule: &Rule<K>) -> bool {
        self.dot >= rule.len()
    }

    fn render<K: TokenKind>(&self, rule: &Rule<K>) -> String {
        let mut rhs = rule
            .rhs
            .iter()
            .map(|sym| sym.name().to_string())
            .collect::<Vec<_>>();
        if self.dot < rhs.len() {
            rhs[self.dot].insert_str(0, "• ");
        } else {
            rhs.push("•".to_string());
        }
        format!("{} -> {}", rule.lhs.name(), rhs.join(" "))
    }
}

/// A state: the seed it was reached with, closed over the rules.
/// States compare by seed.
#[derive(Debug)]
struct State {
    id: StateId,
    seed: BTreeSet<LrItem>,
    items: Vec<LrItem>,
}

impl State {
    fn close<K: TokenKind>(id: StateId, seed: BTreeSet<LrItem>, rules: &[Rule<K>]) -> Self {
        let mut items: Vec<LrItem> = seed.iter().copied().collect();
        let mut stack = items.clone();

        while let Some(item) = stack.pop() {
            let Some(&sym) = item.expected(&rules[item.rule]) else {
                continue;
            };
            if sym.is_terminal() {
                continue;
            }

            for rule in rules.iter().filter(|rule| rule.lhs == sym) {
                let seeded = LrItem {
                    rule: rule.id,
                    dot: 0,
                };
                if !items.contains(&seeded) {
                    items.push(seeded);
                    stack.push(seeded);
                }
            }
        }

        Self { id, seed, items }
    }

    /// Seeds of the states one symbol ahead, except over the end of the
    /// stream.
    fn reachable<K: TokenKind>(&self, rules: &[Rule<K>]) -> Vec<(K, BTreeSet<LrItem>)> {
        let mut out: Vec<(K, BTreeSet<LrItem>)> = vec![];

        for item in &self.items {
            let Some(&sym) = item.expected(&rules[item.rule]) else {
                continue;
            };
            if sym.is_eof() {
                continue;
            }

            match out.iter().position(|(s, _)| *s == sym) {
                Some(at) => {
                    out[at].1.insert(item.advanced());
                }
                None => out.push((sym, BTreeSet::from_iter([item.advanced()]))),
            }
        }

        out
    }
}

#[derive(Debug, PartialEq)]
struct TableRow<K: TokenKind> {
    actions: BTreeMap<K, Action>,
    goto: BTreeMap<K, StateId>,
}

/// The dense `action`/`goto` table of the state-based mode.
#[derive(Debug, PartialEq)]
pub struct LrTable<K: TokenKind> {
    terminals: Vec<K>,
    non_terminals: Vec<K>,
    rows: Vec<TableRow<K>>,
}

impl<K: TokenKind> LrTable<K> {
    /// Build the state graph and its table from a grammar.
    pub fn build(grammar: &Grammar<K>) -> Result<Self, Error> {
        let rules = grammar.rules();
        let start = grammar
            .start_rule()
            .ok_or(ErrorKind::InvalidAction {
                action: "build a table without a start rule",
            })?
            .id;

        let mut states = vec![State::close(
            0,
            BTreeSet::from_iter([LrItem {
                rule: start,
                dot: 0,
            }]),
            rules,
        )];
        let mut edges: Vec<(StateId, K, StateId)> = vec![];
        let mut queue = VecDeque::from_iter([0]);

        while let Some(from) = queue.pop_front() {
            for (sym, seed) in states[from].reachable(rules) {
                let existing = states
                    .iter()
                    .find(|state| state.seed == seed)
                    .map(|state| state.id);
                let to = match existing {
                    Some(id) => id,
                    None => {
                        let id = states.len();
                        states.push(State::close(id, seed, rules));
                        queue.push_back(id);
                        id
                    }
                };

                if edges
                    .iter()
                    .any(|&(f, s, t)| f == from && s == sym && t != to)
                {
                    return Err(ambiguity(&states[from], rules, sym));
                }
                edges.push((from, sym, to));
            }
        }

        let rows = states
            .iter()
            .map(|state| Self::row(grammar, state, &edges))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            terminals: grammar.iter_terminal_symbols().collect(),
            non_terminals: grammar.iter_non_terminal_symbols().collect(),
            rows,
        })
    }

    fn row(
        grammar: &Grammar<K>,
        state: &State,
        edges: &[(StateId, K, StateId)],
    ) -> Result<TableRow<K>, Error> {
        let rules = grammar.rules();
        let mut actions: BTreeMap<K, Action> = BTreeMap::new();
        let mut goto: BTreeMap<K, StateId> = BTreeMap::new();

        for &(_, sym, to) in edges.iter().filter(|&&(from, ..)| from == state.id) {
            if sym.is_terminal() {
                actions.insert(sym, Action::Shift(to));
            } else {
                goto.insert(sym, to);
            }
        }

        if state
            .items
            .iter()
            .any(|item| item.expected(&rules[item.rule]).map(K::is_eof) == Some(true))
        {
            actions.insert(K::eof(), Action::Accept);
        }

        for item in state
            .items
            .iter()
            .filter(|item| item.is_exhausted(&rules[item.rule]))
        {
            let rule = &rules[item.rule];
            if rule.is_start_rule() {
                continue;
            }

            for sym in grammar.follow(rule.lhs) {
                match actions.get(&sym).copied() {
                    None => {
                        actions.insert(sym, Action::Reduce(item.rule));
                    }
                    Some(Action::Reduce(other)) if other == item.rule => {}
                    Some(_) => return Err(ambiguity(state, rules, sym)),
                }
            }
        }

        Ok(TableRow { actions, goto })
    }

    pub fn action(&self, state: StateId, sym: &K) -> Option<&Action> {
        self.rows.get(state).and_then(|row| row.actions.get(sym))
    }

    pub fn goto(&self, state: StateId, sym: &K) -> Option<StateId> {
        self.rows.get(state).and_then(|row| row.goto.get(sym)).copied()
    }

    /// The number of rows in the table.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn ambiguity<K: TokenKind>(state: &State, rules: &[Rule<K>], sym: K) -> Error {
    ErrorKind::AmbiguousGrammar {
        symbol: sym.name().to_string(),
        items: state
            .items
            .iter()
            .map(|item| item.render(&rules[item.rule]))
            .collect(),
    }
    .into()
}

impl<K: TokenKind> std::fmt::Display for LrTable<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut table = PtTable::new();

        table.add_row(
            ["#"]
                .into_iter()
                .chain(
                    self.terminals
                        .iter()
                        .chain(self.non_terminals.iter())
                        .map(|sym| sym.name()),
                )
                .collect(),
        );

        for (id, row) in self.rows.iter().enumerate() {
            table.add_row(
                [id.to_string()]
                    .into_iter()
                    .chain(self.terminals.iter().map(|sym| {
                        row.actions
                            .get(sym)
                            .map(ToString::to_string)
                            .unwrap_or_default()
                    }))
                    .chain(self.non_terminals.iter().map(|sym| {
                        row.goto
                            .get(sym)
                            .map(|to| to.to_string())
                            .unwrap_or_default()
                    }))
                    .collect(),
            );
        }

        write!(f, "{}", table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{expr_grammar, ExprSym};

    #[test]
    fn test_expr_grammar_table_building() {
        let grammar = expr_grammar();
        let table = LrTable::build(&grammar).expect("cannot build table");

        // State 0 shifts digits and knows where E and N lead.
        assert!(matches!(
            table.action(0, &ExprSym::Digit),
            Some(Action::Shift(_))
        ));
        assert!(table.goto(0, &ExprSym::E).is_some());
        assert!(table.goto(0, &ExprSym::N).is_some());

        let rendered = table.to_string();
        assert!(rendered.contains("acc"));
    }

    #[test]
    fn test_accept_sits_on_eof() {
        let grammar = expr_grammar();
        let table = LrTable::build(&grammar).expect("cannot build table");

        let accepting = (0..table.len())
            .filter(|&state| table.action(state, &ExprSym::Eof) == Some(&Action::Accept))
            .count();
        assert_eq!(accepting, 1);
    }

    #[test]
    fn test_ambiguous_grammar_is_rejected() {
        let mut grammar = Grammar::default();
        grammar
            .add_rule(ExprSym::Eof, [ExprSym::S, ExprSym::Eof])
            .and_then(|g| g.add_rule(ExprSym::S, [ExprSym::E]))
            .and_then(|g| g.add_rule(ExprSym::S, [ExprSym::N]))
            .and_then(|g| g.add_rule(ExprSym::E, [ExprSym::Digit]))
            .and_then(|g| g.add_rule(ExprSym::N, [ExprSym::Digit]))
            .expect("rules are well-formed");

        let err = LrTable::build(&grammar).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::AmbiguousGrammar { .. }));
    }
}
