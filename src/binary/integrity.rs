//! Checking the shape of the octet stream.
//!
//! [`Integrity`] is a small state machine tracking that identifier,
//! length, and content octets pass through the binary codecs in exactly
//! the TLV order, with constructed values properly nested. A violation is
//! a bug in the codec itself, not in the data, so it panics.
//!
//! The checks only exist with the `check-integrity` feature enabled.
//! Without it the type is empty and all methods compile to nothing, so
//! the codecs call them unconditionally.

/// Tracks the octet-level shape of a binary stream.
#[derive(Debug, Default)]
pub struct Integrity {
    /// What the stream must produce or consume next.
    #[cfg(feature = "check-integrity")]
    state: State,

    /// The number of open constructed values.
    #[cfg(feature = "check-integrity")]
    depth: usize,
}

/// The per-value progress of the stream.
#[cfg(feature = "check-integrity")]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
enum State {
    /// Identifier octets come next.
    #[default]
    Tag,

    /// Length octets come next.
    Length,

    /// Content octets come next.
    Content,
}

impl Integrity {
    /// Creates a fresh tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the identifier octets of a value.
    pub fn tag(&mut self) {
        #[cfg(feature = "check-integrity")]
        {
            assert_eq!(
                self.state, State::Tag,
                "integrity: identifier octets out of order"
            );
            self.state = State::Length;
        }
    }

    /// Records the length octets of a value.
    pub fn length(&mut self) {
        #[cfg(feature = "check-integrity")]
        {
            assert_eq!(
                self.state, State::Length,
                "integrity: length octets out of order"
            );
            self.state = State::Content;
        }
    }

    /// Records the content octets of a primitive value.
    pub fn content(&mut self) {
        #[cfg(feature = "check-integrity")]
        {
            assert_eq!(
                self.state, State::Content,
                "integrity: content octets out of order"
            );
            self.state = State::Tag;
        }
    }

    /// Records the start of a constructed value's content.
    pub fn open(&mut self) {
        #[cfg(feature = "check-integrity")]
        {
            assert_eq!(
                self.state, State::Content,
                "integrity: constructed content out of order"
            );
            self.state = State::Tag;
            self.depth += 1;
        }
    }

    /// Records the end of a constructed value's content.
    pub fn close(&mut self) {
        #[cfg(feature = "check-integrity")]
        {
            assert_eq!(
                self.state, State::Tag,
                "integrity: constructed value closed mid-value"
            );
            assert!(
                self.depth > 0,
                "integrity: closing with no open constructed value"
            );
            self.depth -= 1;
        }
    }

    /// Records the end of the whole stream.
    pub fn finish(&self) {
        #[cfg(feature = "check-integrity")]
        {
            assert_eq!(
                self.state, State::Tag,
                "integrity: stream finished mid-value"
            );
            assert_eq!(
                self.depth, 0,
                "integrity: stream finished with open constructed value"
            );
        }
    }
}


//============ Tests =========================================================

#[cfg(all(test, feature = "check-integrity"))]
mod test {
    use super::*;

    #[test]
    fn primitive_sequence() {
        let mut check = Integrity::new();
        check.tag();
        check.length();
        check.content();
        check.tag();
        check.length();
        check.content();
        check.finish();
    }

    #[test]
    fn nested() {
        let mut check = Integrity::new();
        check.tag();
        check.length();
        check.open();
        check.tag();
        check.length();
        check.content();
        check.close();
        check.finish();
    }

    #[test]
    #[should_panic(expected = "out of order")]
    fn length_before_tag() {
        Integrity::new().length();
    }

    #[test]
    #[should_panic(expected = "no open constructed value")]
    fn close_without_open() {
        let mut check = Integrity::new();
        check.close();
    }
}
