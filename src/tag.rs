//! The identifier octets of a binary encoded value.
//!
//! This is a private module. Its public items are re-exported by the crate
//! root.

use std::{fmt, io};
use crate::error::Error;
use crate::source::Source;


//------------ Class ---------------------------------------------------------

/// The class of a tag.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Class {
    Universal,
    Application,
    Context,
    Private,
}

impl Class {
    /// Returns the class encoded in the top two bits of a first octet.
    const fn from_u8(octet: u8) -> Self {
        match octet >> 6 {
            0 => Self::Universal,
            1 => Self::Application,
            2 => Self::Context,
            _ => Self::Private,
        }
    }

    /// Returns the class as the top two bits of a first octet.
    const fn into_u8(self) -> u8 {
        match self {
            Self::Universal => 0x00,
            Self::Application => 0x40,
            Self::Context => 0x80,
            Self::Private => 0xC0,
        }
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            Self::Universal => "UNIVERSAL",
            Self::Application => "APPLICATION",
            Self::Context => "CONTEXT",
            Self::Private => "PRIVATE",
        })
    }
}


//------------ Tag -----------------------------------------------------------

/// The tag of an encoded value.
///
/// A tag consists of a [`Class`], the flag stating whether the value uses
/// constructed encoding, and a number within the class. In the binary
/// encoding the three together form the identifier octets: tag numbers up
/// to 30 fit into the five low bits of a single octet; for larger numbers
/// those five bits are all set and the number follows in base 128, most
/// significant digit first, with the top bit of every octet except the last
/// one set.
///
/// # Limitations
///
/// Only tag numbers that fit into a `u32` are supported. This should be
/// more than enough in practice.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Tag {
    /// The class of the tag.
    pub class: Class,

    /// Whether the value uses constructed encoding.
    pub constructed: bool,

    /// The number of the tag.
    pub number: u32,
}

/// # Constants for well-known tags.
///
/// See clause 8.4 of ITU Recommendation X.690 for the universal class.
/// The application class tags are the extensions of the NCBI dialect.
impl Tag {
    /// The tag marking the end-of-contents of an indefinite length value.
    pub const END_OF_CONTENTS: Self = Self::primitive(Class::Universal, 0);

    /// The tag for the BOOLEAN type, UNIVERSAL 1.
    pub const BOOLEAN: Self = Self::primitive(Class::Universal, 1);

    /// The tag for the INTEGER type, UNIVERSAL 2.
    pub const INTEGER: Self = Self::primitive(Class::Universal, 2);

    /// The tag for the BIT STRING type, UNIVERSAL 3.
    pub const BIT_STRING: Self = Self::primitive(Class::Universal, 3);

    /// The tag for the OCTET STRING type, UNIVERSAL 4.
    pub const OCTET_STRING: Self = Self::primitive(Class::Universal, 4);

    /// The tag for the NULL type, UNIVERSAL 5.
    pub const NULL: Self = Self::primitive(Class::Universal, 5);

    /// The tag for the REAL type, UNIVERSAL 9.
    pub const REAL: Self = Self::primitive(Class::Universal, 9);

    /// The tag for the ENUMERATED type, UNIVERSAL 10.
    pub const ENUMERATED: Self = Self::primitive(Class::Universal, 10);

    /// The tag for the UTF8String type, UNIVERSAL 12.
    pub const UTF8_STRING: Self = Self::primitive(Class::Universal, 12);

    /// The tag for the SEQUENCE and SEQUENCE OF types, UNIVERSAL 16.
    pub const SEQUENCE: Self = Self::constructed(Class::Universal, 16);

    /// The tag for the SET and SET OF types, UNIVERSAL 17.
    pub const SET: Self = Self::constructed(Class::Universal, 17);

    /// The tag for the VisibleString type, UNIVERSAL 26.
    pub const VISIBLE_STRING: Self = Self::primitive(Class::Universal, 26);

    /// The tag for the GeneralString type, UNIVERSAL 27.
    pub const GENERAL_STRING: Self = Self::primitive(Class::Universal, 27);

    /// The tag for the StringStore type, APPLICATION 1.
    ///
    /// StringStore is the NCBI dialect's interned visible string. Its
    /// content octets are those of a VisibleString.
    pub const STRING_STORE: Self = Self::primitive(Class::Application, 1);

    /// The tag for the fixed-width 8-byte integer, APPLICATION 2.
    ///
    /// Another extension of the dialect: an INTEGER always encoded in
    /// exactly eight content octets for interop with C code that reads the
    /// value as a raw big-endian machine word.
    pub const LONG_INTEGER: Self = Self::primitive(Class::Application, 2);
}

impl Tag {
    /// The largest tag number fitting into a single identifier octet.
    const MAX_SHORT_FORM: u32 = 0x1E;

    /// Creates a new tag from all three components.
    pub const fn new(class: Class, constructed: bool, number: u32) -> Self {
        Self { class, constructed, number }
    }

    /// Creates a new primitive tag.
    pub const fn primitive(class: Class, number: u32) -> Self {
        Self::new(class, false, number)
    }

    /// Creates a new constructed tag.
    pub const fn constructed(class: Class, number: u32) -> Self {
        Self::new(class, true, number)
    }

    /// Creates a primitive tag in the context class.
    pub const fn ctx(number: u32) -> Self {
        Self::primitive(Class::Context, number)
    }

    /// Creates a constructed tag in the context class.
    pub const fn ctx_constructed(number: u32) -> Self {
        Self::constructed(Class::Context, number)
    }

    /// Returns this tag with the constructed flag set as given.
    pub const fn to_constructed(self, constructed: bool) -> Self {
        Self { constructed, ..self }
    }

    /// Returns whether this is the end-of-contents marker tag.
    pub const fn is_end_of_contents(self) -> bool {
        matches!(self.class, Class::Universal)
            && !self.constructed && self.number == 0
    }

    /// Returns the first identifier octet without any number bits.
    const fn leading(self) -> u8 {
        if self.constructed {
            self.class.into_u8() | 0x20
        }
        else {
            self.class.into_u8()
        }
    }

    /// Returns the number of octets of the encoded form of the tag.
    pub fn encoded_len(self) -> usize {
        if self.number <= Self::MAX_SHORT_FORM {
            1
        }
        else {
            // One lead octet plus one octet per started 7 bits.
            let bits = 32 - self.number.leading_zeros() as usize;
            1 + bits.div_ceil(7)
        }
    }

    /// Writes the identifier octets of the tag.
    pub fn write<W: io::Write>(self, target: &mut W) -> Result<(), io::Error> {
        let mut buf = [0u8; 6];
        let len = self.encode(&mut buf);
        target.write_all(&buf[..len])
    }

    /// Encodes the identifier octets into `buf`, returning their number.
    pub(crate) fn encode(self, buf: &mut [u8; 6]) -> usize {
        if self.number <= Self::MAX_SHORT_FORM {
            buf[0] = self.leading() | self.number as u8;
            return 1
        }
        buf[0] = self.leading() | 0x1F;
        let len = self.encoded_len();
        let mut number = self.number;
        for i in (1..len).rev() {
            buf[i] = (number & 0x7F) as u8 | 0x80;
            number >>= 7;
        }
        // The continuation bit is clear on the very last octet only.
        buf[len - 1] &= 0x7F;
        len
    }

    /// Reads a tag from the beginning of a source.
    ///
    /// Returns `Ok(None)` if the source is cleanly at its end, i.e., not
    /// even the first identifier octet is available.
    pub fn read_opt<R: io::Read>(
        source: &mut Source<R>
    ) -> Result<Option<Self>, Error> {
        let first = match source.take_opt()? {
            Some(byte) => byte,
            None => return Ok(None),
        };
        Ok(Some(Self::read_tail(source, first)?))
    }

    /// Reads a tag from the beginning of a source.
    pub fn read<R: io::Read>(source: &mut Source<R>) -> Result<Self, Error> {
        let first = source.take()?;
        Self::read_tail(source, first)
    }

    /// Reads the rest of a tag whose first octet has been consumed.
    fn read_tail<R: io::Read>(
        source: &mut Source<R>, first: u8
    ) -> Result<Self, Error> {
        let class = Class::from_u8(first);
        let constructed = first & 0x20 != 0;
        if first & 0x1F != 0x1F {
            return Ok(Self::new(class, constructed, (first & 0x1F) as u32))
        }
        let mut number: u32 = 0;
        loop {
            let octet = source.take()?;
            number = number.checked_mul(128).and_then(|n| {
                n.checked_add((octet & 0x7F) as u32)
            }).ok_or_else(|| {
                Error::overflow("tag number too large", source.pos())
            })?;
            if octet & 0x80 == 0 {
                return Ok(Self::new(class, constructed, number))
            }
        }
    }

    /// Peeks at the tag at the beginning of a source.
    ///
    /// Returns the tag and the number of octets it occupies without
    /// consuming anything.
    pub fn peek<R: io::Read>(
        source: &mut Source<R>
    ) -> Result<(Self, usize), Error> {
        let first = source.peek(0)?;
        let class = Class::from_u8(first);
        let constructed = first & 0x20 != 0;
        if first & 0x1F != 0x1F {
            return Ok((
                Self::new(class, constructed, (first & 0x1F) as u32), 1
            ))
        }
        let mut number: u32 = 0;
        let mut at = 1;
        loop {
            let octet = source.peek(at)?;
            at += 1;
            number = number.checked_mul(128).and_then(|n| {
                n.checked_add((octet & 0x7F) as u32)
            }).ok_or_else(|| {
                Error::overflow("tag number too large", source.pos())
            })?;
            if octet & 0x80 == 0 {
                return Ok((Self::new(class, constructed, number), at))
            }
        }
    }
}

/// # Named tags
///
/// The NCBI dialect can tag a value with the name of its type rather than
/// a number: an application class tag in long form whose continuation
/// octets carry the ASCII bytes of the name, one character per octet, with
/// the continuation bit set on all but the last octet. This is used when
/// writing values of externally defined ("other") types. A named tag is
/// indistinguishable from a numeric long form tag on the wire, so it can
/// only be read where one is expected.
impl Tag {
    /// Returns the identifier octets of a named tag.
    ///
    /// Returns `None` if the name is empty or contains bytes that do not
    /// fit seven bits.
    pub fn named_octets(name: &str, constructed: bool) -> Option<Vec<u8>> {
        if name.is_empty() || !name.bytes().all(|ch| ch.is_ascii_graphic()) {
            return None
        }
        let mut res = Vec::with_capacity(name.len() + 1);
        res.push(
            Self::new(Class::Application, constructed, 0).leading() | 0x1F
        );
        for ch in name.bytes() {
            res.push(ch | 0x80);
        }
        if let Some(last) = res.last_mut() {
            *last &= 0x7F;
        }
        Some(res)
    }

    /// Reads a named tag from the beginning of a source.
    ///
    /// Returns the name and whether the value is constructed.
    pub fn read_named<R: io::Read>(
        source: &mut Source<R>
    ) -> Result<(String, bool), Error> {
        let pos = source.pos();
        let first = source.take()?;
        if !matches!(Class::from_u8(first), Class::Application)
            || first & 0x1F != 0x1F
        {
            return Err(Error::format("expected named type tag", pos))
        }
        let constructed = first & 0x20 != 0;
        let mut name = String::new();
        loop {
            let octet = source.take()?;
            let ch = octet & 0x7F;
            if !ch.is_ascii_graphic() {
                return Err(Error::format(
                    "bad character in type name tag", pos
                ))
            }
            name.push(ch as char);
            if octet & 0x80 == 0 {
                return Ok((name, constructed))
            }
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.to_constructed(false) {
            Tag::END_OF_CONTENTS => write!(f, "END-OF-CONTENTS"),
            Tag::BOOLEAN => write!(f, "BOOLEAN"),
            Tag::INTEGER => write!(f, "INTEGER"),
            Tag::BIT_STRING => write!(f, "BIT STRING"),
            Tag::OCTET_STRING => write!(f, "OCTET STRING"),
            Tag::NULL => write!(f, "NULL"),
            Tag::REAL => write!(f, "REAL"),
            Tag::ENUMERATED => write!(f, "ENUMERATED"),
            Tag::UTF8_STRING => write!(f, "UTF8String"),
            Tag::VISIBLE_STRING => write!(f, "VisibleString"),
            Tag::GENERAL_STRING => write!(f, "GeneralString"),
            Tag::STRING_STORE => write!(f, "StringStore"),
            Tag::LONG_INTEGER => write!(f, "LongInteger"),
            tag if tag == Tag::SEQUENCE.to_constructed(false) => {
                write!(f, "SEQUENCE")
            }
            tag if tag == Tag::SET.to_constructed(false) => {
                write!(f, "SET")
            }
            tag => {
                match tag.class {
                    Class::Context => write!(f, "[{}]", tag.number),
                    class => write!(f, "[{} {}]", class, tag.number),
                }
            }
        }
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;

    fn round_trip(tag: Tag) {
        let mut buf = Vec::new();
        tag.write(&mut buf).unwrap();
        assert_eq!(buf.len(), tag.encoded_len());
        let mut source = Source::new(buf.as_slice());
        assert_eq!(Tag::read(&mut source).unwrap(), tag);
        assert_eq!(source.take_opt().unwrap(), None);
        let mut source = Source::new(buf.as_slice());
        assert_eq!(Tag::peek(&mut source).unwrap(), (tag, buf.len()));
    }

    #[test]
    fn number_boundaries() {
        for number in [0, 1, 30, 31, 32, 127, 128, 16383, 16384, 1 << 20] {
            for class in [
                Class::Universal, Class::Application, Class::Context,
                Class::Private,
            ] {
                round_trip(Tag::primitive(class, number));
                round_trip(Tag::constructed(class, number));
            }
        }
        round_trip(Tag::primitive(Class::Context, u32::MAX));
    }

    #[test]
    fn short_and_long_form() {
        let mut buf = Vec::new();
        Tag::primitive(Class::Universal, 30).write(&mut buf).unwrap();
        assert_eq!(buf, b"\x1e");
        buf.clear();
        Tag::primitive(Class::Universal, 31).write(&mut buf).unwrap();
        assert_eq!(buf, b"\x1f\x1f");
        buf.clear();
        Tag::constructed(Class::Context, 128).write(&mut buf).unwrap();
        assert_eq!(buf, b"\xbf\x81\x00");
    }

    #[test]
    fn overlong_number() {
        let data = b"\x1f\x90\x80\x80\x80\x80\x00";
        let mut source = Source::new(data.as_slice());
        assert!(Tag::read(&mut source).is_err());
    }

    #[test]
    fn truncated() {
        let mut source = Source::new(b"\x1f\x81".as_ref());
        assert!(Tag::read(&mut source).is_err());
        let mut source = Source::new(b"".as_ref());
        assert_eq!(Tag::read_opt(&mut source).unwrap(), None);
    }

    #[test]
    fn named() {
        let octets = Tag::named_octets("Date-std", false).unwrap();
        assert_eq!(octets[0], 0x5F);
        let mut source = Source::new(octets.as_slice());
        let (name, constructed) = Tag::read_named(&mut source).unwrap();
        assert_eq!(name, "Date-std");
        assert!(!constructed);
        assert_eq!(source.take_opt().unwrap(), None);

        assert!(Tag::named_octets("", false).is_none());
        assert!(Tag::named_octets("naïve", false).is_none());
    }

    #[test]
    fn display() {
        assert_eq!(Tag::INTEGER.to_string(), "INTEGER");
        assert_eq!(Tag::SEQUENCE.to_string(), "SEQUENCE");
        assert_eq!(Tag::ctx(4).to_string(), "[4]");
        assert_eq!(
            Tag::primitive(Class::Private, 99).to_string(), "[PRIVATE 99]"
        );
    }
}
