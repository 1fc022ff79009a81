//! The length octets.
//!
//! This is a private module. Its public items are re-exported by the crate
//! root.

use std::io;
use std::mem::size_of;
use crate::error::Error;
use crate::source::Source;


//------------ Length --------------------------------------------------------

/// The length octets of an encoded value.
///
/// A length is either definite, giving the actual number of content octets,
/// or indefinite, in which case the content is delimited by an explicit
/// end-of-contents marker.
///
/// # Encoding
///
/// Which of the two basic encodings is used is determined by the most
/// significant bit of the first octet. If it is clear, the remaining bits
/// are the definite length already. If it is set, the remaining bits give
/// the number of octets that follow with the big-endian encoding of the
/// definite length. Zero following octets, i.e., a first octet of 0x80,
/// mark an indefinite length. The value 0xFF is reserved and illegal.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Length {
    /// The actual number of content octets.
    Definite(usize),

    /// The content is terminated by an end-of-contents marker.
    Indefinite,
}

impl Length {
    /// The number of octets in a `usize`.
    const USIZE_LEN: usize = size_of::<usize>();

    /// Returns the length if it is definite.
    pub fn definite(self) -> Option<usize> {
        match self {
            Length::Definite(len) => Some(len),
            Length::Indefinite => None,
        }
    }

    /// Returns whether the length is indefinite.
    pub fn is_indefinite(self) -> bool {
        matches!(self, Length::Indefinite)
    }

    /// Returns the length of the encoded representation.
    pub fn encoded_len(self) -> usize {
        match self {
            Length::Definite(len) if len <= 0x7F => 1,
            Length::Definite(len) => {
                1 + Self::USIZE_LEN - (len.leading_zeros() as usize) / 8
            }
            Length::Indefinite => 1,
        }
    }

    /// Writes the encoded length octets.
    pub fn write<W: io::Write>(self, target: &mut W) -> Result<(), io::Error> {
        match self {
            Length::Definite(len) if len <= 0x7F => {
                target.write_all(&[len as u8])
            }
            Length::Definite(len) => {
                let bytes = len.to_be_bytes();
                let start = (len.leading_zeros() / 8) as usize;
                target.write_all(&[
                    0x80 | (Self::USIZE_LEN - start) as u8
                ])?;
                target.write_all(&bytes[start..])
            }
            Length::Indefinite => target.write_all(&[0x80]),
        }
    }

    /// Reads the length octets from a source.
    pub fn read<R: io::Read>(source: &mut Source<R>) -> Result<Self, Error> {
        let pos = source.pos();
        let first = source.take()?;
        let count = match first {
            0x00..=0x7F => return Ok(Length::Definite(first as usize)),
            0x80 => return Ok(Length::Indefinite),
            0xFF => {
                return Err(Error::format("illegal length octets", pos))
            }
            _ => (first & 0x7F) as usize,
        };
        let mut res: usize = 0;
        for _ in 0..count {
            let octet = source.take()?;
            res = res.checked_mul(256).and_then(|r| {
                r.checked_add(octet as usize)
            }).ok_or_else(|| Error::overflow("excessive length", pos))?;
        }
        Ok(Length::Definite(res))
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;

    fn parse(data: &[u8]) -> Result<Length, Error> {
        let mut source = Source::new(data);
        let res = Length::read(&mut source)?;
        assert_eq!(source.take_opt().unwrap(), None);
        Ok(res)
    }

    #[test]
    fn read() {
        assert_eq!(parse(b"\x00").unwrap(), Length::Definite(0));
        assert_eq!(parse(b"\x12").unwrap(), Length::Definite(0x12));
        assert_eq!(parse(b"\x7f").unwrap(), Length::Definite(0x7f));
        assert_eq!(parse(b"\x80").unwrap(), Length::Indefinite);
        assert_eq!(parse(b"\x81\x00").unwrap(), Length::Definite(0));
        assert_eq!(parse(b"\x81\xf0").unwrap(), Length::Definite(0xf0));
        assert_eq!(parse(b"\x82\xf0\x0e").unwrap(), Length::Definite(0xf00e));
        assert_eq!(parse(b"\x82\x00\x0e").unwrap(), Length::Definite(0x0e));
        assert!(parse(b"\xff").is_err());
        assert!(parse(b"\x82\x01").is_err());
    }

    #[test]
    fn write() {
        fn step(length: Length, expected: &[u8]) {
            let mut buf = Vec::new();
            length.write(&mut buf).unwrap();
            assert_eq!(buf, expected, "write failed for {:?}", length);
            assert_eq!(buf.len(), length.encoded_len());
        }

        step(Length::Indefinite, b"\x80");
        step(Length::Definite(0), b"\x00");
        step(Length::Definite(0x12), b"\x12");
        step(Length::Definite(0x7f), b"\x7f");
        step(Length::Definite(0x80), b"\x81\x80");
        step(Length::Definite(0xff), b"\x81\xff");
        step(Length::Definite(0xdead), b"\x82\xde\xad");
        step(Length::Definite(0x10000), b"\x83\x01\x00\x00");
    }

    #[test]
    fn round_trip() {
        for len in [
            0, 1, 127, 128, 255, 256, 65535, 65536, 0xff_ffff, usize::MAX
        ] {
            let mut buf = Vec::new();
            Length::Definite(len).write(&mut buf).unwrap();
            assert_eq!(parse(&buf).unwrap(), Length::Definite(len));
        }
    }
}
