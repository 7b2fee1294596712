use crate::error::{Error, ErrorKind};
use crate::kind::TokenKind;
use crate::token::Span;

use super::scanner::Scanner;
use super::suggest::WordTable;

/// A literal match rule: a fixed character sequence, either emitted with
/// a kind or skipped.
#[derive(Debug, Clone)]
pub(crate) struct LiteralRule<K> {
    pub chars: Vec<char>,
    pub kind: Option<K>,
}

impl<K> LiteralRule<K> {
    fn word(&self) -> String {
        self.chars.iter().collect()
    }
}

/// One step of literal dispatch.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum MatchStep<K> {
    /// The stream is exhausted.
    Eof,
    /// No rule starts with the current rune; the rune was unread.
    NoRuleStarts { got: char },
    /// A rule matched and emits a token.
    Token { kind: K, text: String, pos: usize },
    /// A skip rule matched; the scanner advanced, nothing is emitted.
    Skipped,
}

/// Longest-prefix matcher over the literal rule table.
#[derive(Debug, Clone)]
pub(crate) struct Matcher<K> {
    rules: Vec<LiteralRule<K>>,
}

impl<K> Default for Matcher<K> {
    fn default() -> Self {
        Self { rules: vec![] }
    }
}

impl<K: TokenKind> Matcher<K> {
    /// Insert a rule. A rule with the same character sequence replaces
    /// the previous one.
    pub fn insert(&mut self, chars: Vec<char>, kind: Option<K>) {
        match self.rules.iter().position(|rule| rule.chars == chars) {
            Some(at) => self.rules[at].kind = kind,
            None => self.rules.push(LiteralRule { chars, kind }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// First runes of every rule, for expectation sets.
    pub fn iter_first_runes(&self) -> impl Iterator<Item = char> + '_ {
        self.rules.iter().filter_map(|rule| rule.chars.first().copied())
    }

    /// Words of every emitting rule, for the suggestion table.
    pub fn iter_words(&self) -> impl Iterator<Item = String> + '_ {
        self.rules
            .iter()
            .filter(|rule| rule.kind.is_some())
            .map(LiteralRule::word)
    }

    /// Run one dispatch from the scanner's current position.
    pub fn dispatch(
        &self,
        scanner: &mut Scanner<'_>,
        words: &WordTable,
    ) -> Result<MatchStep<K>, Error> {
        let start = scanner.pos();

        let first = match scanner.read()? {
            None => return Ok(MatchStep::Eof),
            Some((ch, _)) => ch,
        };

        let mut live: Vec<usize> = (0..self.rules.len())
            .filter(|&i| self.rules[i].chars.first() == Some(&first))
            .collect();

        if live.is_empty() {
            scanner.unread();
            return Ok(MatchStep::NoRuleStarts { got: first });
        }

        let mut consumed = vec![first];

        loop {
            let depth = consumed.len();

            let next = match scanner.read()? {
                None => return self.complete(scanner, &live, &consumed, start, words, None),
                Some((ch, _)) => ch,
            };

            let survivors: Vec<usize> = live
                .iter()
                .copied()
                .filter(|&i| self.rules[i].chars.get(depth) == Some(&next))
                .collect();

            if survivors.is_empty() {
                scanner.unread();
                return self.complete(scanner, &live, &consumed, start, words, Some(next));
            }

            consumed.push(next);
            live = survivors;
        }
    }

    /// The filter emptied (or the stream ended): accept the rules whose
    /// length equals the consumed depth, or fail.
    fn complete(
        &self,
        scanner: &Scanner<'_>,
        live: &[usize],
        consumed: &[char],
        start: usize,
        words: &WordTable,
        got: Option<char>,
    ) -> Result<MatchStep<K>, Error> {
        let depth = consumed.len();

        let full: Vec<usize> = live
            .iter()
            .copied()
            .filter(|&i| self.rules[i].chars.len() == depth)
            .collect();

        match full.len() {
            1 => {
                let rule = &self.rules[full[0]];
                Ok(match rule.kind {
                    Some(kind) => MatchStep::Token {
                        kind,
                        text: consumed.iter().collect(),
                        pos: start,
                    },
                    None => MatchStep::Skipped,
                })
            }
            0 => {
                let expected: Vec<char> = live
                    .iter()
                    .filter_map(|&i| self.rules[i].chars.get(depth).copied())
                    .collect();

                // The failing rune takes part in the suggestion lookup
                // even though it was returned to the stream.
                let mut lexeme: String = consumed.iter().collect();
                if let Some(ch) = got {
                    lexeme.push(ch);
                }

                let span_len = lexeme.len().max(scanner.pos() - start);

                Err(Error::new(
                    ErrorKind::UnexpectedRune {
                        prev: consumed.last().copied(),
                        got,
                        expected: expected.into_iter().collect(),
                    },
                    Some(Span::new(start, span_len)),
                )
                .with_suggestion(words.closest(&lexeme)))
            }
            _ => Err(Error::new(
                ErrorKind::AmbiguousLexMatch {
                    words: full.iter().map(|&i| self.rules[i].word()).collect(),
                },
                Some(Span::new(start, depth)),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::fixtures::ExprSym;

    fn matcher() -> (Matcher<ExprSym>, WordTable) {
        let mut matcher = Matcher::default();
        matcher.insert(vec!['+'], Some(ExprSym::Plus));
        matcher.insert(vec!['r', 'e', 't', 'u', 'r', 'n'], Some(ExprSym::Digit));
        matcher.insert(vec![' '], None);

        let mut words = WordTable::default();
        for word in matcher.iter_words() {
            words.insert(&word);
        }
        (matcher, words)
    }

    #[test]
    fn test_unique_full_match() {
        let (matcher, words) = matcher();
        let mut scanner = Scanner::new(b"+1");

        let step = matcher.dispatch(&mut scanner, &words).unwrap();
        assert_eq!(
            step,
            MatchStep::Token {
                kind: ExprSym::Plus,
                text: "+".to_string(),
                pos: 0
            }
        );
        assert_eq!(scanner.pos(), 1);
    }

    #[test]
    fn test_skip_rule_advances_silently() {
        let (matcher, words) = matcher();
        let mut scanner = Scanner::new(b" +");

        assert_eq!(
            matcher.dispatch(&mut scanner, &words).unwrap(),
            MatchStep::Skipped
        );
        assert_eq!(scanner.pos(), 1);
    }

    #[test]
    fn test_no_rule_starts_unreads() {
        let (matcher, words) = matcher();
        let mut scanner = Scanner::new(b"x");

        assert_eq!(
            matcher.dispatch(&mut scanner, &words).unwrap(),
            MatchStep::NoRuleStarts { got: 'x' }
        );
        assert_eq!(scanner.pos(), 0);
    }

    #[test]
    fn test_prefix_failure_suggests_closest_word() {
        let (matcher, words) = matcher();
        let mut scanner = Scanner::new(b"retrun 1");

        let err = matcher.dispatch(&mut scanner, &words).unwrap_err();

        match err.kind() {
            ErrorKind::UnexpectedRune { prev, got, expected } => {
                assert_eq!(*prev, Some('t'));
                assert_eq!(*got, Some('r'));
                assert!(expected.contains("u"));
            }
            kind => panic!("unexpected error kind: {kind:?}"),
        }
        assert_eq!(err.span().unwrap().start, 0);
        assert_eq!(err.suggestion(), Some("return"));
    }

    #[test]
    fn test_last_writer_wins_on_duplicate_insert() {
        let mut matcher = Matcher::<ExprSym>::default();
        matcher.insert(vec!['+'], Some(ExprSym::Plus));
        matcher.insert(vec!['+'], Some(ExprSym::Digit));

        let words = WordTable::default();
        let mut scanner = Scanner::new(b"+");

        match matcher.dispatch(&mut scanner, &words).unwrap() {
            MatchStep::Token { kind, .. } => assert_eq!(kind, ExprSym::Digit),
            step => panic!("unexpected step: {step:?}"),
        }
    }
}
