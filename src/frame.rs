//! The frame stack.
//!
//! This is a private module. Its public items are re-exported by the crate
//! root.
//!
//! A frame is one level of nesting in an encode or decode traversal: a
//! class, one of its members, a container, one of its elements, a choice
//! variant. Frames are strictly LIFO: every begin call pushes one, the
//! matching end call pops it. A mismatched end call is a bug in the caller
//! and reported as an illegal call, never as a data error.

use smallvec::SmallVec;
use crate::error::{Error, Pos};


//------------ FrameKind -----------------------------------------------------

/// The structural kind of a frame.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FrameKind {
    Class,
    Member,
    Container,
    Element,
    Variant,
}

impl FrameKind {
    /// The name used in error messages.
    fn name(self) -> &'static str {
        match self {
            FrameKind::Class => "class",
            FrameKind::Member => "member",
            FrameKind::Container => "container",
            FrameKind::Element => "element",
            FrameKind::Variant => "variant",
        }
    }
}


//------------ Frame ---------------------------------------------------------

/// One open level of nesting.
#[derive(Clone, Copy, Debug)]
pub struct Frame {
    /// The structural kind begun.
    pub kind: FrameKind,

    /// The byte position just past the frame's content.
    ///
    /// Only set for definite length binary frames. The cursor must never
    /// move past this; reaching it exactly ends the frame.
    pub limit: Option<u64>,

    /// Whether the frame must be closed by an end-of-contents marker.
    pub indefinite: bool,

    /// Whether no element or member has been processed in this frame yet.
    ///
    /// Used by the text codec for comma placement and by block iteration.
    pub first: bool,
}

impl Frame {
    /// Creates a frame with no binary framing attached.
    pub fn plain(kind: FrameKind) -> Self {
        Self { kind, limit: None, indefinite: false, first: true }
    }

    /// Creates a definite length frame ending at the given position.
    pub fn definite(kind: FrameKind, limit: u64) -> Self {
        Self { kind, limit: Some(limit), indefinite: false, first: true }
    }

    /// Creates an indefinite length frame.
    pub fn indefinite(kind: FrameKind) -> Self {
        Self { kind, limit: None, indefinite: true, first: true }
    }
}


//------------ FrameStack ----------------------------------------------------

/// The stack of currently open frames.
#[derive(Debug, Default)]
pub struct FrameStack {
    frames: SmallVec<[Frame; 8]>,
}

impl FrameStack {
    /// Creates a new, empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current nesting depth.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Returns whether no frames are open.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Returns the innermost open frame.
    pub fn top(&self) -> Option<&Frame> {
        self.frames.last()
    }

    /// Returns the innermost open frame for updating.
    pub fn top_mut(&mut self) -> Option<&mut Frame> {
        self.frames.last_mut()
    }

    /// Opens a new frame.
    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    /// Closes the innermost frame which must be of the given kind.
    pub fn pop(&mut self, kind: FrameKind, pos: Pos) -> Result<Frame, Error> {
        match self.frames.pop() {
            Some(frame) if frame.kind == kind => Ok(frame),
            Some(frame) => {
                self.frames.push(frame);
                Err(Error::illegal(
                    format!(
                        "ending {} while {} is open",
                        kind.name(), frame.kind.name()
                    ),
                    pos
                ))
            }
            None => {
                Err(Error::illegal(
                    format!("ending {} with no open frame", kind.name()),
                    pos
                ))
            }
        }
    }

    /// Returns the tightest definite limit of all open frames.
    pub fn limit(&self) -> Option<u64> {
        self.frames.iter().filter_map(|frame| frame.limit).min()
    }

    /// Checks that all frames have been closed.
    pub fn check_closed(&self, pos: Pos) -> Result<(), Error> {
        if let Some(frame) = self.top() {
            Err(Error::illegal(
                format!("stream finished with open {}", frame.kind.name()),
                pos
            ))
        }
        else {
            Ok(())
        }
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use crate::error::ErrorKind;
    use super::*;

    #[test]
    fn matched_nesting() {
        let mut stack = FrameStack::new();
        stack.push(Frame::plain(FrameKind::Class));
        stack.push(Frame::plain(FrameKind::Member));
        assert_eq!(stack.depth(), 2);
        stack.pop(FrameKind::Member, Pos::None).unwrap();
        stack.pop(FrameKind::Class, Pos::None).unwrap();
        stack.check_closed(Pos::None).unwrap();
    }

    #[test]
    fn mismatched_end() {
        let mut stack = FrameStack::new();
        stack.push(Frame::plain(FrameKind::Container));
        let err = stack.pop(FrameKind::Class, Pos::None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IllegalCall);
        // The stack is unchanged after the failed pop.
        assert_eq!(stack.depth(), 1);
        stack.pop(FrameKind::Container, Pos::None).unwrap();
    }

    #[test]
    fn underflow() {
        let mut stack = FrameStack::new();
        let err = stack.pop(FrameKind::Element, Pos::None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IllegalCall);
    }

    #[test]
    fn unclosed() {
        let mut stack = FrameStack::new();
        stack.push(Frame::indefinite(FrameKind::Class));
        assert_eq!(
            stack.check_closed(Pos::None).unwrap_err().kind(),
            ErrorKind::IllegalCall
        );
    }

    #[test]
    fn limits() {
        let mut stack = FrameStack::new();
        assert_eq!(stack.limit(), None);
        stack.push(Frame::definite(FrameKind::Class, 100));
        stack.push(Frame::definite(FrameKind::Member, 40));
        assert_eq!(stack.limit(), Some(40));
    }
}
