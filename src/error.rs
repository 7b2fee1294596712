use itertools::Itertools as _;
use thiserror::Error;

use crate::token::Span;

/// The set of symbol names an operation would have accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedSet(Vec<String>);

impl ExpectedSet {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|s| s == name)
    }
}

impl std::fmt::Display for ExpectedSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.iter().join(", "))
    }
}

impl<S: ToString> FromIterator<S> for ExpectedSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self(iter.into_iter().map(|s| s.to_string()).dedup().collect())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ErrorKind {
    #[error("invalid utf-8 sequence")]
    InvalidUtf8,

    #[error("unexpected character {}, expecting {expected}", fmt_opt_char(.got))]
    UnexpectedRune {
        prev: Option<char>,
        got: Option<char>,
        expected: ExpectedSet,
    },

    #[error("ambiguous match, words: {}", .words.iter().join(", "))]
    AmbiguousLexMatch { words: Vec<String> },

    #[error("unexpected {}, expecting {expected}", fmt_opt_name(.got))]
    UnexpectedToken {
        prev: Option<String>,
        got: Option<String>,
        expected: ExpectedSet,
    },

    #[error("expected a token, got end of stream")]
    ExpectedTokenButEof,

    #[error("a rule with the same definition already exists: {rule}")]
    DuplicateRule { rule: String },

    #[error("rule for {lhs} has an empty right-hand side")]
    EmptyRule { lhs: String },

    #[error("the grammar is ambiguous on {symbol}: {}", .items.iter().join(" ; "))]
    AmbiguousGrammar { symbol: String, items: Vec<String> },

    #[error("invalid action {action}")]
    InvalidAction { action: &'static str },

    #[error("no build function registered for {kind}")]
    UnregisteredKind { kind: String },

    #[error("in {kind}: {cause}")]
    Build { kind: String, cause: Box<Error> },

    #[error("not a valid parse")]
    NotAValidParse,
}

fn fmt_opt_char(got: &Option<char>) -> String {
    match got {
        Some(ch) => format!("'{ch}'"),
        None => "end of stream".to_string(),
    }
}

fn fmt_opt_name(got: &Option<String>) -> String {
    match got {
        Some(name) => name.clone(),
        None => "end of stream".to_string(),
    }
}

impl ErrorKind {
    pub fn unexpected_token<I, S>(prev: Option<S>, got: Option<S>, expected: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        Self::UnexpectedToken {
            prev: prev.map(|s| s.to_string()),
            got: got.map(|s| s.to_string()),
            expected: expected.into_iter().collect(),
        }
    }
}

/// An engine error, located in the byte stream when the origin allows it.
#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    kind: ErrorKind,
    span: Option<Span>,
    suggestion: Option<String>,
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ErrorKind::Build { cause, .. } => Some(cause.as_ref()),
            _ => None,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)?;
        // A build wrapper shares its span with its cause, which already
        // prints it.
        if !matches!(self.kind, ErrorKind::Build { .. }) {
            if let Some(span) = &self.span {
                write!(f, " at byte {}..{}", span.start, span.end())?;
            }
        }
        if let Some(word) = &self.suggestion {
            write!(f, " (did you mean '{word}'?)")?;
        }
        Ok(())
    }
}

impl Error {
    pub fn new(kind: impl Into<ErrorKind>, span: Option<Span>) -> Self {
        Self {
            kind: kind.into(),
            span,
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: Option<String>) -> Self {
        self.suggestion = suggestion;
        self
    }

    /// Wrap the error with the kind of the enclosing build step.
    pub fn in_kind(self, kind: &str) -> Self {
        let span = self.span.clone();
        Self {
            kind: ErrorKind::Build {
                kind: kind.to_string(),
                cause: Box::new(self),
            },
            span,
            suggestion: None,
        }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn span(&self) -> Option<Span> {
        self.span.clone()
    }

    pub fn suggestion(&self) -> Option<&str> {
        self.suggestion.as_deref()
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self {
            kind,
            span: None,
            suggestion: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_error_chain() {
        let inner = Error::new(
            ErrorKind::UnregisteredKind {
                kind: "number".to_string(),
            },
            None,
        );
        let wrapped = inner.in_kind("term").in_kind("expr");

        assert_eq!(
            wrapped.to_string(),
            "in expr: in term: no build function registered for number"
        );
    }

    #[test]
    fn test_suggestion_display() {
        let err = Error::new(
            ErrorKind::UnexpectedRune {
                prev: None,
                got: Some('u'),
                expected: ["return"].into_iter().collect(),
            },
            Some(Span::new(0, 4)),
        )
        .with_suggestion(Some("return".to_string()));

        assert_eq!(
            err.to_string(),
            "unexpected character 'u', expecting return at byte 0..4 (did you mean 'return'?)"
        );
    }
}
