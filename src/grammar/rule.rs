use itertools::Itertools;

use crate::kind::TokenKind;

/// The rule's identifier in the grammar.
pub type RuleId = usize;

/// A production rule.
///
/// # Example
/// E => E '+' N
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule<K: TokenKind> {
    pub id: RuleId,
    pub lhs: K,
    pub rhs: Vec<K>,
}

impl<K: TokenKind> std::fmt::Display for Rule<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}) {} => {}",
            self.id,
            self.lhs.name(),
            self.rhs.iter().map(|sym| sym.name()).join(" ")
        )
    }
}

impl<K: TokenKind> Rule<K> {
    pub fn new(id: RuleId, lhs: K, rhs: Vec<K>) -> Self {
        Self { id, lhs, rhs }
    }

    pub fn len(&self) -> usize {
        self.rhs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rhs.is_empty()
    }

    /// Rules are duplicates when lhs and rhs match pointwise, whatever
    /// their ids.
    pub fn same_def(&self, other: &Self) -> bool {
        self.lhs == other.lhs && self.rhs == other.rhs
    }

    #[inline(always)]
    pub fn contains(&self, sym: &K) -> bool {
        self.rhs.contains(sym)
    }

    /// True when the rule derives the augmented start symbol and its rhs
    /// is closed by the end-of-stream kind.
    pub fn is_start_rule(&self) -> bool {
        self.lhs.is_eof() && self.rhs.last().map(K::is_eof).unwrap_or(false)
    }
}
