use crate::error::{Error, ErrorKind};
use crate::token::Span;

/// A rune reader over a byte stream.
///
/// Reads one UTF-8 scalar at a time and supports returning the most
/// recently read rune to the stream, one deep.
pub struct Scanner<'a> {
    input: &'a [u8],
    pos: usize,
    last: Option<(char, usize)>,
}

impl<'a> Scanner<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            pos: 0,
            last: None,
        }
    }

    /// Byte offset of the next read.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Read the next rune and its byte width. `None` at end of stream.
    pub fn read(&mut self) -> Result<Option<(char, usize)>, Error> {
        if self.pos >= self.input.len() {
            self.last = None;
            return Ok(None);
        }

        match decode_rune(&self.input[self.pos..]) {
            Some((ch, width)) => {
                self.last = Some((ch, width));
                self.pos += width;
                Ok(Some((ch, width)))
            }
            None => Err(Error::new(
                ErrorKind::InvalidUtf8,
                Some(Span::new(self.pos, 1)),
            )),
        }
    }

    /// Return the most recently read rune to the stream.
    pub fn unread(&mut self) {
        if let Some((_, width)) = self.last.take() {
            self.pos -= width;
        }
    }
}

/// Decode the leading UTF-8 scalar of `bytes`, if valid.
fn decode_rune(bytes: &[u8]) -> Option<(char, usize)> {
    let width = match bytes[0] {
        b if b < 0x80 => 1,
        b if (0xC0..0xE0).contains(&b) => 2,
        b if (0xE0..0xF0).contains(&b) => 3,
        b if (0xF0..0xF8).contains(&b) => 4,
        _ => return None,
    };

    let slice = bytes.get(..width)?;
    let ch = std::str::from_utf8(slice).ok()?.chars().next()?;
    Some((ch, width))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_advances_byte_positions() {
        let mut scanner = Scanner::new("a¢c".as_bytes());

        assert_eq!(scanner.read().unwrap(), Some(('a', 1)));
        assert_eq!(scanner.pos(), 1);
        assert_eq!(scanner.read().unwrap(), Some(('¢', 2)));
        assert_eq!(scanner.pos(), 3);
        assert_eq!(scanner.read().unwrap(), Some(('c', 1)));
        assert_eq!(scanner.read().unwrap(), None);
    }

    #[test]
    fn test_unread_is_one_deep() {
        let mut scanner = Scanner::new(b"ab");

        scanner.read().unwrap();
        scanner.unread();
        assert_eq!(scanner.pos(), 0);
        assert_eq!(scanner.read().unwrap(), Some(('a', 1)));

        // A second unread without a read in between has nothing to return.
        scanner.unread();
        scanner.unread();
        assert_eq!(scanner.read().unwrap(), Some(('a', 1)));
    }

    #[test]
    fn test_invalid_utf8_reports_offset() {
        let mut scanner = Scanner::new(&[b'a', 0xFF, b'b']);

        scanner.read().unwrap();
        let err = scanner.read().unwrap_err();

        assert_eq!(*err.kind(), ErrorKind::InvalidUtf8);
        assert_eq!(err.span().unwrap().start, 1);
    }

    #[test]
    fn test_truncated_sequence_is_invalid() {
        // 0xC3 opens a two-byte sequence that never completes.
        let mut scanner = Scanner::new(&[0xC3]);
        let err = scanner.read().unwrap_err();
        assert_eq!(*err.kind(), ErrorKind::InvalidUtf8);
    }
}
