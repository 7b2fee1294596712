use crate::grammar::{Grammar, ItemId};
use crate::kind::TokenKind;
use crate::token::TokenBuf;

use super::active::{ActiveParser, Tick};
use super::history::History;

/// A forked-off alternative: the committed record up to the fork, plus
/// the branch to take there.
#[derive(Debug, Clone)]
struct PendingPath {
    prefix: Vec<ItemId>,
    choice: ItemId,
}

/// Depth-first exploration of the decision space.
///
/// A pull-based sequence of finished walkers, successful or not. At a
/// fork the first alternative continues in place and the others are
/// stacked; each stacked path later replays its history on a fresh
/// walker and runs on from the fork. Nothing is explored unless the
/// consumer keeps asking.
pub struct Exploration<'g, K: TokenKind> {
    grammar: &'g Grammar<K>,
    tokens: TokenBuf<K>,
    current: Option<ActiveParser<'g, K>>,
    pending: Vec<PendingPath>,
}

impl<'g, K: TokenKind> Exploration<'g, K> {
    pub fn new(grammar: &'g Grammar<K>, tokens: TokenBuf<K>) -> Self {
        let current = ActiveParser::new(grammar, tokens.clone());
        Self {
            grammar,
            tokens,
            current: Some(current),
            pending: vec![],
        }
    }

    /// Fresh walker, fast-forwarded along a recorded history.
    fn rehydrate(&self, path: PendingPath) -> ActiveParser<'g, K> {
        let mut walker = ActiveParser::new(self.grammar, self.tokens.clone());
        let mut history: History = path
            .prefix
            .iter()
            .copied()
            .chain([path.choice])
            .collect();

        let mut alive = true;
        while alive && history.walk(|item| alive = !matches!(walker.force(item), Tick::Failed)) {}

        walker
    }

    /// Run one walker to its end, stacking the alternatives of every
    /// fork met on the way.
    fn drive(&mut self, mut walker: ActiveParser<'g, K>) -> ActiveParser<'g, K> {
        loop {
            match walker.tick() {
                Tick::Progress => {}
                Tick::Accepted | Tick::Failed => return walker,
                Tick::Fork(candidates) => {
                    let prefix = walker.history().entries().to_vec();
                    for candidate in candidates[1..].iter().rev() {
                        self.pending.push(PendingPath {
                            prefix: prefix.clone(),
                            choice: candidate.item,
                        });
                    }

                    if matches!(
                        walker.commit(&candidates[0]),
                        Tick::Accepted | Tick::Failed
                    ) {
                        return walker;
                    }
                }
            }
        }
    }
}

impl<'g, K: TokenKind> Iterator for Exploration<'g, K> {
    type Item = ActiveParser<'g, K>;

    fn next(&mut self) -> Option<Self::Item> {
        let walker = match self.current.take() {
            Some(walker) => walker,
            None => {
                let path = self.pending.pop()?;
                self.rehydrate(path)
            }
        };

        Some(self.drive(walker))
    }
}
