use std::collections::BTreeMap;

use crate::error::{Error, ErrorKind};
use crate::kind::TokenKind;
use crate::token::{ParseTree, TokenId};

/// The trait for a built AST node.
pub trait AstNode: Sized {
    fn children(&self) -> &[Self];
}

/// A per-kind construction step. Build functions may recurse through the
/// builder and inspect token text for leaves.
pub type BuildFn<K, N> = fn(&AstBuilder<K, N>, &ParseTree<K>, TokenId) -> Result<N, Error>;

/// Folds a parse tree into a typed AST by case analysis on token kinds.
pub struct AstBuilder<K: TokenKind, N> {
    table: BTreeMap<K, BuildFn<K, N>>,
}

impl<K: TokenKind, N> Default for AstBuilder<K, N> {
    fn default() -> Self {
        Self {
            table: BTreeMap::new(),
        }
    }
}

impl<K: TokenKind, N> AstBuilder<K, N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the construction step for `kind`. Re-registering a kind
    /// replaces the previous step.
    pub fn register(&mut self, kind: K, build: BuildFn<K, N>) -> &mut Self {
        self.table.insert(kind, build);
        self
    }

    /// Build the node for `token`, dispatching on its kind.
    ///
    /// Errors coming out of the step are wrapped with the token's kind,
    /// chaining into `in X: in Y: …` as they propagate up.
    pub fn build(&self, tree: &ParseTree<K>, token: TokenId) -> Result<N, Error> {
        let kind = tree.arena.get(token).kind;

        let build = self.table.get(&kind).ok_or_else(|| {
            Error::new(
                ErrorKind::UnregisteredKind {
                    kind: kind.name().to_string(),
                },
                tree.arena.get(token).span(),
            )
        })?;

        build(self, tree, token).map_err(|err| err.in_kind(kind.name()))
    }

    /// The children of `token`; leaves have none to give.
    pub fn children_of<'t>(
        &self,
        tree: &'t ParseTree<K>,
        token: TokenId,
    ) -> Result<&'t [TokenId], Error> {
        let node = tree.arena.get(token);
        if node.is_leaf() {
            return Err(Error::new(
                ErrorKind::InvalidAction {
                    action: "extract children of a leaf token",
                },
                node.span(),
            ));
        }
        Ok(&node.children)
    }

    /// Assert the token's kind.
    pub fn expect_kind(
        &self,
        tree: &ParseTree<K>,
        token: TokenId,
        kind: K,
    ) -> Result<(), Error> {
        let node = tree.arena.get(token);
        if node.kind != kind {
            return Err(Error::new(
                ErrorKind::unexpected_token(
                    None,
                    Some(node.kind.name().to_string()),
                    [kind.name().to_string()],
                ),
                node.span(),
            ));
        }
        Ok(())
    }

    /// Flatten a right-recursive spine `LHS -> RHS LHS?`.
    ///
    /// Walks the chain of `lhs` nodes, handing each node's children
    /// (without the trailing spine link) to `f` and splicing the results
    /// into one list.
    pub fn fold_spine<F>(
        &self,
        tree: &ParseTree<K>,
        root: TokenId,
        lhs: K,
        mut f: F,
    ) -> Result<Vec<N>, Error>
    where
        F: FnMut(&Self, &ParseTree<K>, &[TokenId]) -> Result<Vec<N>, Error>,
    {
        let mut out = vec![];
        let mut cursor = Some(root);

        while let Some(id) = cursor {
            self.expect_kind(tree, id, lhs)?;
            let children = self.children_of(tree, id)?;

            let (head, tail) = match children.split_last() {
                Some((&last, head)) if tree.arena.get(last).kind == lhs => (head, Some(last)),
                _ => (&children[..], None),
            };

            out.extend(f(self, tree, head)?);
            cursor = tail;
        }

        Ok(out)
    }
}
