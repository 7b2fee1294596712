use crate::kind::TokenKind;

/// A located region of the input byte stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub len: usize,
}

impl Span {
    pub fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

/// Index of a token inside its arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenId(u32);

impl TokenId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for TokenId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// A node of the token tree.
///
/// Terminals come out of the lexer with their covered text and byte
/// offset. Non-terminals are synthesised on reduce: empty text, children
/// in scan order, and the lookahead of their last descendant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<K: TokenKind> {
    pub kind: K,
    pub text: String,
    /// Byte offset of the first covered byte. `None` for the synthetic
    /// end-of-stream token.
    pub pos: Option<usize>,
    pub children: Vec<TokenId>,
    pub parent: Option<TokenId>,
    /// Next terminal in scan order.
    pub lookahead: Option<TokenId>,
}

impl<K: TokenKind> Token<K> {
    pub fn terminal<S: ToString>(kind: K, text: S, pos: usize) -> Self {
        Self {
            kind,
            text: text.to_string(),
            pos: Some(pos),
            children: vec![],
            parent: None,
            lookahead: None,
        }
    }

    pub fn eof() -> Self {
        Self {
            kind: K::eof(),
            text: String::default(),
            pos: None,
            children: vec![],
            parent: None,
            lookahead: None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// The byte region the token covers. `None` for the EOF token.
    pub fn span(&self) -> Option<Span> {
        self.pos.map(|start| Span::new(start, self.text.len()))
    }
}

/// Owner of every token created for one parse.
///
/// Parent, child and lookahead links are arena indices, which keeps the
/// otherwise cyclic tree trivially owned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenArena<K: TokenKind> {
    nodes: Vec<Token<K>>,
}

impl<K: TokenKind> Default for TokenArena<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: TokenKind> TokenArena<K> {
    pub fn new() -> Self {
        Self { nodes: vec![] }
    }

    pub fn insert(&mut self, token: Token<K>) -> TokenId {
        let id = TokenId(self.nodes.len() as u32);
        self.nodes.push(token);
        id
    }

    pub fn get(&self, id: TokenId) -> &Token<K> {
        &self.nodes[id.index()]
    }

    pub fn get_mut(&mut self, id: TokenId) -> &mut Token<K> {
        &mut self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Build a non-terminal node over `children` (scan order).
    ///
    /// The new node takes its position from its first child and its
    /// lookahead from its last, and becomes the parent of every child.
    pub fn synthesize(&mut self, kind: K, children: Vec<TokenId>) -> TokenId {
        let pos = children
            .first()
            .and_then(|&child| self.get(child).pos);
        let lookahead = children
            .last()
            .and_then(|&child| self.get(child).lookahead);

        let id = self.insert(Token {
            kind,
            text: String::default(),
            pos,
            children: children.clone(),
            parent: None,
            lookahead,
        });

        for child in children {
            self.get_mut(child).parent = Some(id);
        }

        id
    }

    /// Iterate the terminal leaves below `root`, leftmost first.
    pub fn leaves(&self, root: TokenId) -> Vec<TokenId> {
        let mut out = vec![];
        let mut stack = vec![root];

        while let Some(id) = stack.pop() {
            let token = self.get(id);
            if token.is_leaf() {
                out.push(id);
            } else {
                stack.extend(token.children.iter().rev().copied());
            }
        }

        out
    }

    /// Render the subtree under `root`, one node per line, indented.
    pub fn render(&self, root: TokenId) -> String {
        let mut out = String::new();
        self.render_into(root, 0, &mut out);
        out
    }

    fn render_into(&self, id: TokenId, depth: usize, out: &mut String) {
        let token = self.get(id);
        out.push_str(&"  ".repeat(depth));
        out.push_str(token.kind.name());
        if !token.text.is_empty() {
            out.push_str(&format!(" {:?}", token.text));
        }
        out.push('\n');
        for &child in &token.children {
            self.render_into(child, depth + 1, out);
        }
    }
}

/// The product of an accepting parse: the arena and the root it built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTree<K: TokenKind> {
    pub arena: TokenArena<K>,
    pub root: TokenId,
}

impl<K: TokenKind> ParseTree<K> {
    pub fn root_token(&self) -> &Token<K> {
        self.arena.get(self.root)
    }

    /// Step to the tree rooted at the only child worth looking at: the
    /// accepted kind-0 node wraps the user's start symbol.
    pub fn unwrap_start(mut self) -> Self {
        if self.root_token().kind.is_eof() {
            let first = self.root_token().children.first().copied();
            if let Some(first) = first {
                self.root = first;
            }
        }
        self
    }

    pub fn render(&self) -> String {
        self.arena.render(self.root)
    }
}

/// The lexer's output: the arena plus the scan-order terminal sequence,
/// terminated by the EOF token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBuf<K: TokenKind> {
    pub arena: TokenArena<K>,
    order: Vec<TokenId>,
}

impl<K: TokenKind> TokenBuf<K> {
    /// Wire the lookahead chain and append the EOF token.
    pub fn seal(mut arena: TokenArena<K>, mut order: Vec<TokenId>) -> Self {
        let eof = arena.insert(Token::eof());
        order.push(eof);

        for window in order.windows(2) {
            arena.get_mut(window[0]).lookahead = Some(window[1]);
        }

        Self { arena, order }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<TokenId> {
        self.order.get(index).copied()
    }

    pub fn token(&self, id: TokenId) -> &Token<K> {
        self.arena.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = TokenId> + '_ {
        self.order.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::fixtures::ExprSym;

    fn sample() -> (TokenArena<ExprSym>, Vec<TokenId>) {
        let mut arena = TokenArena::new();
        let order = vec![
            arena.insert(Token::terminal(ExprSym::Digit, "1", 0)),
            arena.insert(Token::terminal(ExprSym::Plus, "+", 1)),
            arena.insert(Token::terminal(ExprSym::Digit, "2", 2)),
        ];
        (arena, order)
    }

    #[test]
    fn test_seal_appends_eof_and_chains_lookaheads() {
        let (arena, order) = sample();
        let buf = TokenBuf::seal(arena, order);

        assert_eq!(buf.len(), 4);

        let last = buf.token(buf.get(3).unwrap());
        assert!(last.kind.is_eof());
        assert_eq!(last.pos, None);

        for i in 0..buf.len() - 1 {
            let token = buf.token(buf.get(i).unwrap());
            assert_eq!(token.lookahead, buf.get(i + 1));
        }
        assert_eq!(buf.token(buf.get(3).unwrap()).lookahead, None);
    }

    #[test]
    fn test_synthesize_adopts_children() {
        let (mut arena, order) = sample();
        let node = arena.synthesize(ExprSym::E, order.clone());

        let token = arena.get(node);
        assert_eq!(token.children, order);
        assert_eq!(token.pos, Some(0));
        assert!(token.text.is_empty());

        for &child in &order {
            assert_eq!(arena.get(child).parent, Some(node));
        }
    }

    #[test]
    fn test_leaves_are_scan_ordered() {
        let (mut arena, order) = sample();
        let inner = arena.synthesize(ExprSym::E, vec![order[0]]);
        let root = arena.synthesize(ExprSym::E, vec![inner, order[1], order[2]]);

        assert_eq!(arena.leaves(root), order);
    }
}
