use std::collections::BTreeSet;

use crate::error::{Error, ErrorKind};
use crate::grammar::{Grammar, Item, ItemAction, ItemId, RuleId};
use crate::kind::TokenKind;
use crate::token::{ParseTree, Span, TokenBuf, TokenId};

use super::history::History;
use super::stack::RefusableStack;

/// A decision-layer survivor, ready to be committed or forked on.
#[derive(Debug, Clone)]
pub(crate) struct Candidate<K: TokenKind> {
    pub item: ItemId,
    /// Terminals a shift committed through this candidate may bring in.
    /// Empty means unchecked.
    pub shift_expected: BTreeSet<K>,
    /// How deep the stack confirmed the item's lookbehind window.
    pub behind_depth: usize,
}

/// Outcome of one decision cycle.
#[derive(Debug)]
pub(crate) enum Tick<K: TokenKind> {
    Progress,
    Accepted,
    Failed,
    Fork(Vec<Candidate<K>>),
}

/// One concrete exploration of the decision space: its own reader
/// cursor, refusable stack, history and error slot over the shared
/// grammar tables.
#[derive(Debug, Clone)]
pub struct ActiveParser<'g, K: TokenKind> {
    grammar: &'g Grammar<K>,
    tokens: TokenBuf<K>,
    cursor: usize,
    stack: RefusableStack<TokenId>,
    history: History,
    error: Option<Error>,
    accepted: Option<TokenId>,
}

impl<'g, K: TokenKind> ActiveParser<'g, K> {
    /// Start a walker over `tokens`. The first token is shifted right
    /// away; every later move is decision-driven.
    pub(crate) fn new(grammar: &'g Grammar<K>, tokens: TokenBuf<K>) -> Self {
        let mut parser = Self {
            grammar,
            tokens,
            cursor: 0,
            stack: RefusableStack::new(),
            history: History::new(),
            error: None,
            accepted: None,
        };

        if let Err(err) = parser.shift(&BTreeSet::new()) {
            parser.error = Some(err);
        }
        parser
    }

    pub fn is_accepted(&self) -> bool {
        self.accepted.is_some()
    }

    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Consume the walker into the parse tree it accepted, if any.
    pub fn into_tree(self) -> Option<ParseTree<K>> {
        let root = self.accepted?;
        Some(ParseTree {
            arena: self.tokens.arena,
            root,
        })
    }

    fn name_of(&self, id: TokenId) -> Option<String> {
        let kind = self.tokens.token(id).kind;
        (!kind.is_eof()).then(|| kind.name().to_string())
    }

    /// End of the previous consumed byte region, for errors that point
    /// past the last token.
    fn edge_span(&self) -> Option<Span> {
        self.stack
            .top()
            .and_then(|id| self.tokens.token(id).span())
            .map(|span| Span::new(span.end(), 0))
    }

    /// Read one token onto the stack.
    ///
    /// A non-empty `expected` set verifies the incoming terminal; the
    /// set is the union of FIRST over what the committed shift items
    /// await next.
    fn shift(&mut self, expected: &BTreeSet<K>) -> Result<(), Error> {
        let Some(id) = self.tokens.get(self.cursor) else {
            return Err(Error::new(ErrorKind::ExpectedTokenButEof, self.edge_span()));
        };

        let kind = self.tokens.token(id).kind;
        if !expected.is_empty() && !expected.contains(&kind) {
            let span = self
                .tokens
                .token(id)
                .span()
                .or_else(|| self.edge_span());
            return Err(Error::new(
                ErrorKind::UnexpectedToken {
                    prev: self.stack.top().and_then(|top| self.name_of(top)),
                    got: self.name_of(id),
                    expected: expected.iter().map(|sym| sym.name()).collect(),
                },
                span,
            ));
        }

        self.stack.push(id);
        self.cursor += 1;
        Ok(())
    }

    /// Pop the rule's rhs off the stack, right to left, verifying each
    /// kind; on success the popped tokens become the children of a new
    /// lhs node. On mismatch the stack is refused and left untouched.
    fn reduce(&mut self, rule_id: RuleId) -> Result<(), Error> {
        let rule = self.grammar.rule(rule_id);
        let mut popped = Vec::with_capacity(rule.len());

        for (i, expected) in rule.rhs.iter().enumerate().rev() {
            let Some(id) = self.stack.pop() else {
                self.stack.refuse();
                return Err(Error::new(
                    ErrorKind::unexpected_token(
                        popped.first().and_then(|&p| self.name_of(p)),
                        None,
                        [expected.name().to_string()],
                    ),
                    self.edge_span(),
                ));
            };

            let token = self.tokens.token(id);
            if token.kind != *expected {
                let err = Error::new(
                    ErrorKind::UnexpectedToken {
                        prev: rule.rhs.get(i + 1).map(|sym| sym.name().to_string()),
                        got: self.name_of(id),
                        expected: [expected.name()].into_iter().collect(),
                    },
                    token.span(),
                );
                self.stack.refuse();
                return Err(err);
            }

            popped.push(id);
        }

        self.stack.accept();

        popped.reverse();
        let node = self.tokens.arena.synthesize(rule.lhs, popped);
        self.stack.push(node);
        Ok(())
    }

    /// Reduce the start rule; the stack must then hold exactly the root.
    fn accept(&mut self, rule_id: RuleId) -> Result<(), Error> {
        self.reduce(rule_id)?;

        if self.stack.len() != 1 {
            return Err(Error::new(ErrorKind::NotAValidParse, self.edge_span()));
        }

        self.accepted = self.stack.top();
        Ok(())
    }

    /// Resolve the bucket for the stack top down to an ordered candidate
    /// list. A single entry is a commitment; several are fork points.
    fn decide(&self) -> Result<Vec<Candidate<K>>, Error> {
        let top_id = self
            .stack
            .top()
            .ok_or(ErrorKind::InvalidAction { action: "decide on empty stack" })?;
        let top = self.tokens.token(top_id);
        let bucket = self.grammar.bucket(top.kind)?;

        if bucket.is_empty() {
            return Err(Error::new(
                ErrorKind::unexpected_token(
                    self.stack.nth_below(1).and_then(|id| self.name_of(id)),
                    self.name_of(top_id),
                    Vec::<String>::new(),
                ),
                top.span(),
            ));
        }

        if bucket.len() == 1 {
            return Ok(vec![self.candidate(bucket[0], 0)]);
        }

        // Every item shifts: one token of lookahead cannot tell them
        // apart, commit to the first and verify against their union.
        if bucket
            .iter()
            .all(|item| item.action(self.grammar.rule(item.rule)) == ItemAction::Shift)
        {
            let expected = bucket
                .iter()
                .filter_map(|item| item.expected(self.grammar.rule(item.rule)))
                .flat_map(|&sym| self.grammar.first(sym))
                .collect();
            return Ok(vec![Candidate {
                item: bucket[0].id,
                shift_expected: expected,
                behind_depth: 0,
            }]);
        }

        let survivors = self.filter_lookbehinds(&bucket, top_id)?;
        if survivors.len() == 1 {
            let (item, depth) = survivors[0];
            return Ok(vec![self.candidate(item, depth)]);
        }

        self.filter_lookaheads(survivors, top_id)
    }

    /// Match the items' remembered windows against the tokens below the
    /// stack top. Items whose window runs out stay in, awaiting the
    /// lookahead layer; items contradicting the stack are discarded.
    fn filter_lookbehinds<'i>(
        &self,
        bucket: &[&'i Item<K>],
        top_id: TokenId,
    ) -> Result<Vec<(&'i Item<K>, usize)>, Error> {
        let mut survivors: Vec<(&Item<K>, usize)> =
            bucket.iter().map(|&item| (item, 0)).collect();

        for offset in 1.. {
            let testable = survivors
                .iter()
                .any(|(item, _)| item.behind(self.grammar.rule(item.rule), offset).is_some());
            if survivors.len() <= 1 || !testable {
                break;
            }

            let below = self
                .stack
                .nth_below(offset)
                .map(|id| self.tokens.token(id).kind);

            survivors.retain_mut(|(item, depth)| {
                match item.behind(self.grammar.rule(item.rule), offset) {
                    None => true,
                    Some(&sym) => match below {
                        Some(kind) if kind == sym => {
                            *depth = offset;
                            true
                        }
                        _ => false,
                    },
                }
            });

            if survivors.is_empty() {
                let expected: Vec<&str> = bucket
                    .iter()
                    .filter_map(|item| item.behind(self.grammar.rule(item.rule), offset))
                    .map(|sym| sym.name())
                    .collect();
                return Err(Error::new(
                    ErrorKind::UnexpectedToken {
                        prev: self.name_of(top_id),
                        got: None,
                        expected: expected.into_iter().collect(),
                    },
                    self.tokens.token(top_id).span(),
                ));
            }
        }

        Ok(survivors)
    }

    /// Walk the lookahead chain from the stack top, keeping items whose
    /// set at each depth holds the next terminal. Items whose sequence
    /// runs out become solutions; deepest confirmed lookbehind first.
    fn filter_lookaheads(
        &self,
        survivors: Vec<(&Item<K>, usize)>,
        top_id: TokenId,
    ) -> Result<Vec<Candidate<K>>, Error> {
        let mut actives = survivors;
        let mut solutions: Vec<(&Item<K>, usize)> = vec![];
        let mut chain = self.tokens.token(top_id).lookahead;

        for depth in 1.. {
            let (still, done): (Vec<_>, Vec<_>) = actives
                .into_iter()
                .partition(|(item, _)| item.lookaheads.len() >= depth);
            solutions.extend(done);
            actives = still;

            if actives.is_empty() {
                break;
            }

            let Some(next_id) = chain else {
                solutions.append(&mut actives);
                break;
            };
            let next_kind = self.tokens.token(next_id).kind;

            let before: Vec<_> = actives.iter().map(|(item, _)| item.id).collect();
            actives.retain(|(item, _)| item.lookaheads[depth - 1].contains(&next_kind));

            if actives.is_empty() && solutions.is_empty() {
                let expected: Vec<String> = before
                    .iter()
                    .flat_map(|&id| {
                        self.grammar
                            .item(id)
                            .map(|item| {
                                item.lookaheads[depth - 1]
                                    .iter()
                                    .map(|sym| sym.name().to_string())
                                    .collect::<Vec<_>>()
                            })
                            .unwrap_or_default()
                    })
                    .collect();
                return Err(Error::new(
                    ErrorKind::UnexpectedToken {
                        prev: self.name_of(top_id),
                        got: self.name_of(next_id),
                        expected: expected.into_iter().collect(),
                    },
                    self.tokens.token(next_id).span(),
                ));
            }

            if actives.len() <= 1 {
                break;
            }

            chain = self.tokens.token(next_id).lookahead;
        }

        solutions.sort_by(|a, b| b.1.cmp(&a.1));

        let ordered: Vec<Candidate<K>> = actives
            .into_iter()
            .chain(solutions)
            .map(|(item, depth)| self.candidate(item, depth))
            .collect();

        if ordered.is_empty() {
            return Err(Error::new(
                ErrorKind::unexpected_token(self.name_of(top_id), None, Vec::<String>::new()),
                self.tokens.token(top_id).span(),
            ));
        }

        Ok(ordered)
    }

    fn candidate(&self, item: &Item<K>, behind_depth: usize) -> Candidate<K> {
        let rule = self.grammar.rule(item.rule);
        let shift_expected = match item.action(rule) {
            ItemAction::Shift => item
                .expected(rule)
                .map(|&sym| self.grammar.first(sym))
                .unwrap_or_default(),
            _ => BTreeSet::new(),
        };

        Candidate {
            item: item.id,
            shift_expected,
            behind_depth,
        }
    }

    /// Commit to one candidate: run its action and record it.
    fn apply(&mut self, candidate: &Candidate<K>) -> Result<bool, Error> {
        let item = self.grammar.item(candidate.item)?;
        let rule_id = item.rule;
        let action = item.action(self.grammar.rule(rule_id));

        match action {
            ItemAction::Shift => self.shift(&candidate.shift_expected)?,
            ItemAction::Reduce => self.reduce(rule_id)?,
            ItemAction::Accept => self.accept(rule_id)?,
        }

        self.history.record(candidate.item);
        Ok(action == ItemAction::Accept)
    }

    /// One decision cycle. Forks are surfaced, not taken.
    pub(crate) fn tick(&mut self) -> Tick<K> {
        if self.error.is_some() {
            return Tick::Failed;
        }
        if self.accepted.is_some() {
            return Tick::Accepted;
        }

        let candidates = match self.decide() {
            Ok(candidates) => candidates,
            Err(err) => {
                self.error = Some(err);
                return Tick::Failed;
            }
        };

        if candidates.len() > 1 {
            return Tick::Fork(candidates);
        }

        self.commit(&candidates[0])
    }

    /// Apply `candidate` and fold the outcome into the walker state.
    pub(crate) fn commit(&mut self, candidate: &Candidate<K>) -> Tick<K> {
        match self.apply(candidate) {
            Ok(true) => Tick::Accepted,
            Ok(false) => Tick::Progress,
            Err(err) => {
                self.error = Some(err);
                Tick::Failed
            }
        }
    }

    /// Re-run a recorded decision on a rehydrated walker. The item must
    /// be among the candidates the decision yields again.
    pub(crate) fn force(&mut self, item: ItemId) -> Tick<K> {
        if self.error.is_some() {
            return Tick::Failed;
        }

        let candidates = match self.decide() {
            Ok(candidates) => candidates,
            Err(err) => {
                self.error = Some(err);
                return Tick::Failed;
            }
        };

        match candidates.into_iter().find(|c| c.item == item) {
            Some(candidate) => self.commit(&candidate),
            None => {
                self.error = Some(
                    ErrorKind::InvalidAction {
                        action: "replayed history diverged",
                    }
                    .into(),
                );
                Tick::Failed
            }
        }
    }
}
