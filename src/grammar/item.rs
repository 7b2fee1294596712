use std::collections::{BTreeMap, BTreeSet};

use itertools::Itertools;

use crate::kind::TokenKind;

use super::rule::{Rule, RuleId};

pub type ItemId = usize;

/// What committing to an item makes the driver do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemAction {
    Shift,
    Reduce,
    Accept,
}

/// A rule position, with the disambiguation context the analyser
/// attached to it.
///
/// `pos` counts consumed rhs symbols: the symbol at `rhs[pos-1]` is the
/// one sitting on top of the stack when the item is a decision
/// candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item<K: TokenKind> {
    pub id: ItemId,
    pub rule: RuleId,
    pub pos: usize,
    /// Symbols remembered left of the consumed one; entry `n` is
    /// `rhs[pos-2-n]`.
    pub lookbehinds: Vec<K>,
    /// One terminal set per lookahead depth past the consumed symbol.
    pub lookaheads: Vec<BTreeSet<K>>,
}

impl<K: TokenKind> Item<K> {
    fn new(id: ItemId, rule: RuleId, pos: usize) -> Self {
        Self {
            id,
            rule,
            pos,
            lookbehinds: vec![],
            lookaheads: vec![],
        }
    }

    pub fn action(&self, rule: &Rule<K>) -> ItemAction {
        if self.pos < rule.len() {
            ItemAction::Shift
        } else if rule.rhs.last().map(K::is_eof).unwrap_or(false) {
            ItemAction::Accept
        } else {
            ItemAction::Reduce
        }
    }

    /// The symbol this item has on top of the stack.
    pub fn consumed<'r>(&self, rule: &'r Rule<K>) -> Option<&'r K> {
        self.pos.checked_sub(1).and_then(|i| rule.rhs.get(i))
    }

    /// The symbol a shift item expects next.
    pub fn expected<'r>(&self, rule: &'r Rule<K>) -> Option<&'r K> {
        rule.rhs.get(self.pos)
    }

    /// The rhs symbol at `offset` positions below the stack top.
    pub fn behind<'r>(&self, rule: &'r Rule<K>, offset: usize) -> Option<&'r K> {
        self.pos
            .checked_sub(1 + offset)
            .and_then(|i| rule.rhs.get(i))
    }

    /// Same descriptors means the analyser cannot tell the items apart.
    fn same_descriptors(&self, other: &Self) -> bool {
        self.lookbehinds == other.lookbehinds && self.lookaheads == other.lookaheads
    }

    pub fn render(&self, rule: &Rule<K>) -> String {
        let mut rhs = rule
            .rhs
            .iter()
            .map(|sym| sym.name().to_string())
            .collect::<Vec<_>>();
        if self.pos < rhs.len() {
            rhs[self.pos].insert_str(0, "• ");
        } else {
            rhs.push("•".to_string());
        }

        let mut out = format!("[({}) {} -> {}", rule.id, rule.lhs.name(), rhs.join(" "));
        if !self.lookaheads.is_empty() {
            let sets = self
                .lookaheads
                .iter()
                .map(|set| format!("{{{}}}", set.iter().map(|sym| sym.name()).join(" ")))
                .join(", ");
            out.push_str(&format!(", {sets}"));
        }
        out.push(']');
        out
    }
}

/// Terminals a derivation of `sym` can start with.
///
/// A terminal is its own first set. Non-terminals close over the first
/// symbol of each of their rules.
pub(crate) fn first<K: TokenKind>(rules: &[Rule<K>], sym: K) -> BTreeSet<K> {
    let mut set = BTreeSet::new();
    let mut visited = BTreeSet::new();
    let mut stack = vec![sym];

    while let Some(sym) = stack.pop() {
        if !visited.insert(sym) {
            continue;
        }

        if sym.is_terminal() {
            set.insert(sym);
            continue;
        }

        for rule in rules.iter().filter(|rule| rule.lhs == sym) {
            if let Some(&head) = rule.rhs.first() {
                stack.push(head);
            }
        }
    }

    set
}

/// Terminals that may legitimately follow `sym`.
pub(crate) fn follow<K: TokenKind>(rules: &[Rule<K>], sym: K) -> BTreeSet<K> {
    let mut set = BTreeSet::new();
    let mut visited = BTreeSet::new();
    let mut stack = vec![sym];

    while let Some(sym) = stack.pop() {
        if !visited.insert(sym) {
            continue;
        }

        // The augmented start symbol is only ever followed by the end of
        // the stream.
        if sym.is_eof() {
            set.insert(K::eof());
            continue;
        }

        for rule in rules.iter().filter(|rule| rule.contains(&sym)) {
            for (at, _) in rule.rhs.iter().enumerate().filter(|(_, &s)| s == sym) {
                match rule.rhs.get(at + 1) {
                    Some(&next) => set.extend(first(rules, next)),
                    None => stack.push(rule.lhs),
                }
            }
        }
    }

    set
}

/// The closed item set with its decision buckets.
#[derive(Debug, Default)]
pub(crate) struct ItemTable<K: TokenKind> {
    pub items: Vec<Item<K>>,
    /// Decision candidates keyed by their consumed symbol.
    pub buckets: BTreeMap<K, Vec<ItemId>>,
    /// Buckets still holding indistinguishable items after solving.
    pub residual: BTreeMap<K, Vec<ItemId>>,
}

impl<K: TokenKind> ItemTable<K> {
    /// Enumerate items at every position of every rule and group the
    /// decision candidates.
    pub fn enumerate(rules: &[Rule<K>]) -> Self {
        let mut items = vec![];
        let mut buckets: BTreeMap<K, Vec<ItemId>> = BTreeMap::new();

        for rule in rules {
            for pos in 0..=rule.len() {
                let id = items.len();
                let item = Item::new(id, rule.id, pos);
                if let Some(&key) = item.consumed(rule) {
                    buckets.entry(key).or_default().push(id);
                }
                items.push(item);
            }
        }

        Self {
            items,
            buckets,
            residual: BTreeMap::new(),
        }
    }

    /// Items of the bucket keyed by `sym`.
    pub fn bucket(&self, sym: K) -> &[ItemId] {
        self.buckets.get(&sym).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Buckets in which some items are still indistinguishable.
    ///
    /// Two items conflict while they are not both shifts and their
    /// lookbehind and lookahead descriptors are identical.
    fn conflicts(&self, rules: &[Rule<K>]) -> BTreeMap<K, Vec<ItemId>> {
        let mut map = BTreeMap::new();

        for (&key, ids) in &self.buckets {
            let conflicting: Vec<ItemId> = ids
                .iter()
                .copied()
                .filter(|&id| {
                    let item = &self.items[id];
                    ids.iter().any(|&other_id| {
                        if other_id == id {
                            return false;
                        }
                        let other = &self.items[other_id];
                        let both_shift = item.action(&rules[item.rule]) == ItemAction::Shift
                            && other.action(&rules[other.rule]) == ItemAction::Shift;
                        !both_shift && item.same_descriptors(other)
                    })
                })
                .collect();

            if !conflicting.is_empty() {
                map.insert(key, conflicting);
            }
        }

        map
    }

    /// Grow lookbehind windows, then lookahead sets, until every bucket
    /// is distinguishable or nothing can grow. Returns `true` when no
    /// conflict remains; leftovers land in `residual`.
    pub fn solve(&mut self, rules: &[Rule<K>]) -> bool {
        self.expand_lookbehinds(rules);
        self.expand_lookaheads(rules);

        self.residual = self.conflicts(rules);
        self.residual.is_empty()
    }

    fn expand_lookbehinds(&mut self, rules: &[Rule<K>]) {
        loop {
            let conflicts = self.conflicts(rules);
            if conflicts.is_empty() {
                return;
            }

            let mut progress = false;
            for id in conflicts.values().flatten().copied() {
                let item = &self.items[id];
                let window = item.lookbehinds.len();
                let grow = item.behind(&rules[item.rule], window + 1).copied();
                if let Some(sym) = grow {
                    self.items[id].lookbehinds.push(sym);
                    progress = true;
                }
            }

            if !progress {
                return;
            }
        }
    }

    fn expand_lookaheads(&mut self, rules: &[Rule<K>]) {
        let mut offset = 1;
        loop {
            let conflicts = self.conflicts(rules);
            if conflicts.is_empty() {
                return;
            }

            let mut progress = false;
            for id in conflicts.values().flatten().copied() {
                let item = &self.items[id];
                if item.lookaheads.len() >= offset {
                    continue;
                }
                if let Some(set) = lookahead_set(rules, item, offset) {
                    self.items[id].lookaheads.push(set);
                    progress = true;
                }
            }

            if !progress {
                return;
            }
            offset += 1;
        }
    }
}

/// The terminal set `depth` tokens past an item's consumed symbol.
///
/// Inside the rule this is the FIRST closure of the rhs symbol there;
/// exactly one position past the rule end it falls back to the context
/// (FOLLOW of the lhs); further out nothing more can be said.
fn lookahead_set<K: TokenKind>(
    rules: &[Rule<K>],
    item: &Item<K>,
    depth: usize,
) -> Option<BTreeSet<K>> {
    let rule = &rules[item.rule];
    let target = item.pos - 1 + depth;

    match target.cmp(&rule.len()) {
        std::cmp::Ordering::Less => Some(first(rules, rule.rhs[target])),
        std::cmp::Ordering::Equal => Some(follow(rules, rule.lhs)),
        std::cmp::Ordering::Greater => None,
    }
}
