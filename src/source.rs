//! The byte cursor over an input stream.
//!
//! This is a private module. Its public items are re-exported by the crate
//! root.
//!
//! [`Source`] wraps an [`io::Read`] and provides the buffered, lookahead
//! style access both codecs need: peeking without consuming, consuming one
//! byte at a time, skipping runs, and pushing a single byte back for the
//! two-way lexical decisions of the text reader. It also maintains the
//! position counters that end up in error messages: a byte offset always,
//! and a line counter when created for text input.

use std::io;
use crate::error::{Error, Pos};

/// How many bytes to request from the reader in one go.
const CHUNK: usize = 4096;


//------------ Source --------------------------------------------------------

/// A buffered cursor over a byte stream.
pub struct Source<R> {
    /// The underlying reader.
    reader: R,

    /// Buffered bytes that have not been consumed yet.
    ///
    /// The unconsumed portion starts at `start`.
    buf: Vec<u8>,

    /// The index of the first unconsumed byte in `buf`.
    start: usize,

    /// Whether the reader has returned its end.
    eof: bool,

    /// The number of bytes consumed so far.
    pos: u64,

    /// The current one-based line number if lines are tracked.
    line: Option<usize>,
}

impl<R> Source<R> {
    /// Creates a new source for binary input.
    ///
    /// Positions reported by the source are byte offsets.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            start: 0,
            eof: false,
            pos: 0,
            line: None,
        }
    }

    /// Creates a new source for text input.
    ///
    /// Positions reported by the source are line numbers. The counter is
    /// advanced whenever a line feed is consumed.
    pub fn new_text(reader: R) -> Self {
        Self { line: Some(1), ..Self::new(reader) }
    }

    /// Returns the position for error reporting.
    pub fn pos(&self) -> Pos {
        match self.line {
            Some(line) => Pos::Line(line),
            None => Pos::Byte(self.pos),
        }
    }

    /// Returns the number of bytes consumed so far.
    pub fn byte_pos(&self) -> u64 {
        self.pos
    }

    /// Produces an end-of-data error at the current position.
    pub fn err_end(&self) -> Error {
        Error::end_of_data(self.pos())
    }
}

impl<R: io::Read> Source<R> {
    /// Makes sure at least `len` unconsumed bytes are buffered if possible.
    ///
    /// Returns the number of bytes actually available which may be less
    /// than `len` if the reader has ended.
    fn fill(&mut self, len: usize) -> Result<usize, Error> {
        while self.buf.len() - self.start < len && !self.eof {
            // Drop the consumed prefix before growing the buffer.
            if self.start > 0 && self.start == self.buf.len() {
                self.buf.clear();
                self.start = 0;
            }
            else if self.start > CHUNK {
                self.buf.drain(..self.start);
                self.start = 0;
            }
            let old_len = self.buf.len();
            self.buf.resize(old_len + CHUNK, 0);
            match self.reader.read(&mut self.buf[old_len..]) {
                Ok(0) => {
                    self.buf.truncate(old_len);
                    self.eof = true;
                }
                Ok(n) => {
                    self.buf.truncate(old_len + n);
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {
                    self.buf.truncate(old_len);
                }
                Err(err) => {
                    self.buf.truncate(old_len);
                    return Err(Error::from_io(err, self.pos()))
                }
            }
        }
        Ok(self.buf.len() - self.start)
    }

    /// Returns the byte `at` positions ahead without consuming anything.
    pub fn peek_opt(&mut self, at: usize) -> Result<Option<u8>, Error> {
        let have = self.fill(at + 1)?;
        if have > at {
            Ok(Some(self.buf[self.start + at]))
        }
        else {
            Ok(None)
        }
    }

    /// Returns the byte `at` positions ahead.
    ///
    /// Returns an end-of-data error if the source ends before that byte.
    pub fn peek(&mut self, at: usize) -> Result<u8, Error> {
        self.peek_opt(at)?.ok_or_else(|| self.err_end())
    }

    /// Consumes and returns the next byte if there is one.
    pub fn take_opt(&mut self) -> Result<Option<u8>, Error> {
        match self.peek_opt(0)? {
            Some(byte) => {
                self.advance(byte);
                Ok(Some(byte))
            }
            None => Ok(None)
        }
    }

    /// Consumes and returns the next byte.
    pub fn take(&mut self) -> Result<u8, Error> {
        self.take_opt()?.ok_or_else(|| self.err_end())
    }

    /// Skips over the next `len` bytes.
    ///
    /// Returns an end-of-data error if the source ends early.
    pub fn skip(&mut self, len: usize) -> Result<(), Error> {
        let mut remaining = len;
        while remaining > 0 {
            let have = self.fill(remaining)?;
            if have == 0 {
                return Err(self.err_end())
            }
            let step = have.min(remaining);
            if self.line.is_some() {
                for i in 0..step {
                    let byte = self.buf[self.start + i];
                    self.count_line(byte);
                }
            }
            self.start += step;
            self.pos += step as u64;
            remaining -= step;
        }
        Ok(())
    }

    /// Fills the given buffer completely from the source.
    pub fn read_exact(&mut self, target: &mut [u8]) -> Result<(), Error> {
        let have = self.fill(target.len())?;
        if have < target.len() {
            return Err(self.err_end())
        }
        target.copy_from_slice(
            &self.buf[self.start..self.start + target.len()]
        );
        if self.line.is_some() {
            for i in 0..target.len() {
                let byte = self.buf[self.start + i];
                self.count_line(byte);
            }
        }
        self.start += target.len();
        self.pos += target.len() as u64;
        Ok(())
    }

    /// Pushes a single byte back onto the source.
    ///
    /// The byte will be the next one returned by `peek` or `take`. The
    /// position counters are rewound accordingly.
    pub fn unget(&mut self, byte: u8) {
        if self.start > 0 {
            self.start -= 1;
            self.buf[self.start] = byte;
        }
        else {
            self.buf.insert(0, byte);
        }
        self.pos = self.pos.saturating_sub(1);
        if byte == b'\n' {
            if let Some(line) = self.line.as_mut() {
                *line = line.saturating_sub(1);
            }
        }
    }

    /// Records one consumed byte in the position counters.
    fn advance(&mut self, byte: u8) {
        self.start += 1;
        self.pos += 1;
        self.count_line(byte);
    }

    /// Advances the line counter if the byte is a line feed.
    fn count_line(&mut self, byte: u8) {
        if byte == b'\n' {
            if let Some(line) = self.line.as_mut() {
                *line += 1;
            }
        }
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use crate::error::ErrorKind;
    use super::*;

    #[test]
    fn peek_and_take() {
        let mut source = Source::new(b"abc".as_ref());
        assert_eq!(source.peek(0).unwrap(), b'a');
        assert_eq!(source.peek(2).unwrap(), b'c');
        assert_eq!(source.peek_opt(3).unwrap(), None);
        assert_eq!(source.take().unwrap(), b'a');
        assert_eq!(source.byte_pos(), 1);
        assert_eq!(source.take().unwrap(), b'b');
        assert_eq!(source.take().unwrap(), b'c');
        assert_eq!(source.take_opt().unwrap(), None);
        assert_eq!(source.take().unwrap_err().kind(), ErrorKind::EndOfData);
    }

    #[test]
    fn skip_and_read_exact() {
        let mut source = Source::new(b"hello world".as_ref());
        source.skip(6).unwrap();
        let mut buf = [0; 5];
        source.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"world");
        assert_eq!(
            source.skip(1).unwrap_err().kind(), ErrorKind::EndOfData
        );
    }

    #[test]
    fn unget() {
        let mut source = Source::new(b"xy".as_ref());
        assert_eq!(source.take().unwrap(), b'x');
        source.unget(b'x');
        assert_eq!(source.byte_pos(), 0);
        assert_eq!(source.take().unwrap(), b'x');
        assert_eq!(source.take().unwrap(), b'y');
    }

    #[test]
    fn lines() {
        let mut source = Source::new_text(b"a\nb\nc".as_ref());
        assert_eq!(source.pos(), Pos::Line(1));
        source.skip(2).unwrap();
        assert_eq!(source.pos(), Pos::Line(2));
        assert_eq!(source.take().unwrap(), b'b');
        source.skip(1).unwrap();
        assert_eq!(source.pos(), Pos::Line(3));
    }

    #[test]
    fn large_input() {
        let data = vec![0x5a; 3 * super::CHUNK + 17];
        let mut source = Source::new(data.as_slice());
        source.skip(super::CHUNK + 1).unwrap();
        assert_eq!(source.peek(0).unwrap(), 0x5a);
        source.skip(2 * super::CHUNK + 16).unwrap();
        assert_eq!(source.peek_opt(0).unwrap(), None);
    }
}
