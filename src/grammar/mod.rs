use std::collections::BTreeSet;

use itertools::Itertools;
use prettytable::Table as PtTable;

use crate::error::{Error, ErrorKind};
use crate::kind::TokenKind;

mod item;
mod rule;
pub mod table;

pub use item::{Item, ItemAction, ItemId};
pub use rule::{Rule, RuleId};

use item::ItemTable;

/// A grammar over a user kind enumeration.
///
/// A grammar needs a start rule: one whose lhs is the reserved kind 0
/// and whose rhs is closed by kind 0 on a terminal position.
///
/// # Example
///
/// For the following grammar:
///
/// ```grammar
/// 1. <start> := E <eof>
/// 2. E := E + N
/// 3. E := N
/// 4. N := digit
/// ```
///
/// add the rules in order with [`Grammar::add_rule`], then run
/// [`Grammar::determine_items`] and [`Grammar::solve_conflicts`].
#[derive(Debug)]
pub struct Grammar<K: TokenKind> {
    rules: Vec<Rule<K>>,
    analysis: Option<ItemTable<K>>,
}

impl<K: TokenKind> Default for Grammar<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: TokenKind> Grammar<K> {
    pub fn new() -> Self {
        Self {
            rules: vec![],
            analysis: None,
        }
    }

    /// Append a rule. The rhs must not be empty; an already-defined rule
    /// is rejected.
    pub fn add_rule<I>(&mut self, lhs: K, rhs: I) -> Result<&mut Self, Error>
    where
        I: IntoIterator<Item = K>,
    {
        let rule = Rule::new(self.rules.len(), lhs, rhs.into_iter().collect());

        if rule.is_empty() {
            return Err(ErrorKind::EmptyRule {
                lhs: lhs.name().to_string(),
            }
            .into());
        }

        if self.rules.iter().any(|other| other.same_def(&rule)) {
            return Err(ErrorKind::DuplicateRule {
                rule: rule.to_string(),
            }
            .into());
        }

        self.analysis = None;
        self.rules.push(rule);
        Ok(self)
    }

    pub fn rules(&self) -> &[Rule<K>] {
        &self.rules
    }

    pub fn rule(&self, id: RuleId) -> &Rule<K> {
        &self.rules[id]
    }

    /// Union of every lhs and rhs symbol.
    pub fn iter_symbols(&self) -> impl Iterator<Item = K> + '_ {
        self.rules
            .iter()
            .flat_map(|rule| std::iter::once(rule.lhs).chain(rule.rhs.iter().copied()))
            .unique()
    }

    pub fn iter_terminal_symbols(&self) -> impl Iterator<Item = K> + '_ {
        self.iter_symbols().filter(K::is_terminal)
    }

    pub fn iter_non_terminal_symbols(&self) -> impl Iterator<Item = K> + '_ {
        self.iter_symbols().filter(|sym| !sym.is_terminal())
    }

    /// The rule deriving the augmented start symbol.
    pub fn start_rule(&self) -> Option<&Rule<K>> {
        self.rules.iter().find(|rule| rule.is_start_rule())
    }

    /// Enumerate the items and group the decision candidates.
    pub fn determine_items(&mut self) -> &mut Self {
        self.analysis = Some(ItemTable::enumerate(&self.rules));
        self
    }

    /// Resolve bucket conflicts with lookbehind windows and lookahead
    /// sets. Returns `true` iff nothing stays ambiguous; leftovers are
    /// logged and kept for [`Grammar::residual_conflicts`], and parsing
    /// falls back on runtime backtracking for them.
    pub fn solve_conflicts(&mut self) -> bool {
        let mut table = match self.analysis.take() {
            Some(table) => table,
            None => ItemTable::enumerate(&self.rules),
        };

        let solved = table.solve(&self.rules);

        if !solved {
            for (sym, ids) in &table.residual {
                log::warn!(
                    target: "backlr::grammar",
                    "ambiguous on {}: {}; relying on backtracking",
                    sym.name(),
                    ids.iter()
                        .map(|&id| table.items[id].render(&self.rules[table.items[id].rule]))
                        .join(" ; ")
                );
            }
        }

        self.analysis = Some(table);
        solved
    }

    /// The buckets that stayed ambiguous after solving, rendered.
    pub fn residual_conflicts(&self) -> Vec<(K, Vec<String>)> {
        self.analysis
            .as_ref()
            .map(|table| {
                table
                    .residual
                    .iter()
                    .map(|(&sym, ids)| {
                        (
                            sym,
                            ids.iter()
                                .map(|&id| {
                                    table.items[id].render(&self.rules[table.items[id].rule])
                                })
                                .collect(),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Terminals a derivation of `sym` can start with.
    pub fn first(&self, sym: K) -> BTreeSet<K> {
        item::first(&self.rules, sym)
    }

    /// Terminals that may follow `sym`.
    pub fn follow(&self, sym: K) -> BTreeSet<K> {
        item::follow(&self.rules, sym)
    }

    /// The decision candidates whose consumed symbol is `sym`.
    pub(crate) fn bucket(&self, sym: K) -> Result<Vec<&Item<K>>, Error> {
        let table = self.analysis()?;
        Ok(table
            .bucket(sym)
            .iter()
            .map(|&id| &table.items[id])
            .collect())
    }

    pub(crate) fn item(&self, id: ItemId) -> Result<&Item<K>, Error> {
        Ok(&self.analysis()?.items[id])
    }

    pub(crate) fn analysis(&self) -> Result<&ItemTable<K>, Error> {
        self.analysis.as_ref().ok_or_else(|| {
            ErrorKind::InvalidAction {
                action: "parse before determine_items",
            }
            .into()
        })
    }
}

/// The decision table: one row per bucket, with the items that answer
/// for the symbol and whether the bucket stayed ambiguous.
impl<K: TokenKind> std::fmt::Display for Grammar<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Some(table) = self.analysis.as_ref() else {
            return writeln!(f, "<items not determined>");
        };

        let mut pt = PtTable::new();
        pt.add_row(["symbol", "items", ""].into_iter().collect());

        for (&sym, ids) in &table.buckets {
            pt.add_row(
                [
                    sym.name().to_string(),
                    ids.iter()
                        .map(|&id| table.items[id].render(&self.rules[table.items[id].rule]))
                        .join("\n"),
                    if table.residual.contains_key(&sym) {
                        "!".to_string()
                    } else {
                        String::default()
                    },
                ]
                .into_iter()
                .collect(),
            );
        }

        write!(f, "{pt}")
    }
}
