//! Decoded values.
//!
//! This is a private module. Its public items are re-exported by the crate
//! root.
//!
//! [`Value`] is the dynamic representation of anything the codecs can read
//! or write: a tree of primitives, class member lists, chosen variants,
//! and container elements. Values carry no type information of their own;
//! they are always interpreted against a [`TypeDescr`].
//!
//! [`TypeDescr`]: crate::descr::TypeDescr

use bytes::Bytes;


//------------ BitString -----------------------------------------------------

/// A string of bits.
///
/// The bits are packed into bytes most significant bit first. The final
/// byte may be partially used; `bit_len` gives the exact number of bits.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BitString {
    /// The packed bits.
    data: Bytes,

    /// The number of meaningful bits in `data`.
    bit_len: usize,
}

impl BitString {
    /// Creates a bit string from packed bytes and a bit count.
    ///
    /// # Panics
    ///
    /// Panics if `data` is not exactly the number of bytes needed to hold
    /// `bit_len` bits.
    pub fn new(data: Bytes, bit_len: usize) -> Self {
        assert_eq!(data.len(), bit_len.div_ceil(8));
        Self { data, bit_len }
    }

    /// Creates an empty bit string.
    pub fn empty() -> Self {
        Self { data: Bytes::new(), bit_len: 0 }
    }

    /// Creates a bit string from individual bits.
    pub fn from_bits(bits: impl IntoIterator<Item = bool>) -> Self {
        let mut data = Vec::new();
        let mut bit_len = 0;
        for bit in bits {
            if bit_len % 8 == 0 {
                data.push(0);
            }
            if bit {
                let idx = data.len() - 1;
                data[idx] |= 0x80 >> (bit_len % 8);
            }
            bit_len += 1;
        }
        Self { data: data.into(), bit_len }
    }

    /// Returns the number of bits.
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Returns whether the string contains no bits.
    pub fn is_empty(&self) -> bool {
        self.bit_len == 0
    }

    /// Returns the packed bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns the number of unused bits in the final byte.
    pub fn unused_bits(&self) -> u8 {
        ((8 - self.bit_len % 8) % 8) as u8
    }

    /// Returns the bit at the given position.
    ///
    /// # Panics
    ///
    /// Panics if `at` is not less than the bit length.
    pub fn bit(&self, at: usize) -> bool {
        assert!(at < self.bit_len);
        self.data[at / 8] & (0x80 >> (at % 8)) != 0
    }

    /// Returns an iterator over the individual bits.
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.bit_len).map(move |at| self.bit(at))
    }
}


//------------ Value ---------------------------------------------------------

/// A decoded value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// The NULL value.
    Null,

    /// A boolean.
    Bool(bool),

    /// A signed integer.
    Integer(i64),

    /// An unsigned integer.
    Unsigned(u64),

    /// A floating point number.
    Real(f64),

    /// A visible string.
    Visible(String),

    /// A UTF8 string.
    Utf8(String),

    /// An octet string.
    Octets(Bytes),

    /// A bit string.
    Bits(BitString),

    /// An enumerated value.
    Enum(i64),

    /// A class value: pairs of member index and member value.
    ///
    /// The indexes refer to the members of the class descriptor the value
    /// was read or will be written with. They appear in ascending order;
    /// optional members that are absent simply don't appear.
    Class(Vec<(usize, Value)>),

    /// A choice value: the index of the variant and its value.
    Choice(usize, Box<Value>),

    /// A container value: the elements in order.
    Container(Vec<Value>),
}

impl Value {
    /// Creates a class value from index-value pairs.
    pub fn class(members: impl Into<Vec<(usize, Value)>>) -> Self {
        Value::Class(members.into())
    }

    /// Creates a choice value.
    pub fn choice(index: usize, value: Value) -> Self {
        Value::Choice(index, Box::new(value))
    }

    /// Creates a container value.
    pub fn container(elements: impl Into<Vec<Value>>) -> Self {
        Value::Container(elements.into())
    }

    /// Creates an octet string value from anything byte-like.
    pub fn octets(data: impl Into<Bytes>) -> Self {
        Value::Octets(data.into())
    }

    /// Returns the member value for a member index of a class value.
    pub fn member(&self, index: usize) -> Option<&Value> {
        match self {
            Value::Class(members) => {
                members.iter().find_map(|(idx, value)| {
                    (*idx == index).then_some(value)
                })
            }
            _ => None
        }
    }
}

impl From<bool> for Value {
    fn from(src: bool) -> Self {
        Value::Bool(src)
    }
}

impl From<i64> for Value {
    fn from(src: i64) -> Self {
        Value::Integer(src)
    }
}

impl From<u64> for Value {
    fn from(src: u64) -> Self {
        Value::Unsigned(src)
    }
}

impl From<f64> for Value {
    fn from(src: f64) -> Self {
        Value::Real(src)
    }
}

impl From<&str> for Value {
    fn from(src: &str) -> Self {
        Value::Visible(src.into())
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bit_string_basics() {
        let bits = BitString::from_bits(
            [true, false, true, true, false, false, false, true, true]
        );
        assert_eq!(bits.bit_len(), 9);
        assert_eq!(bits.data(), &[0b1011_0001, 0b1000_0000]);
        assert_eq!(bits.unused_bits(), 7);
        assert!(bits.bit(0));
        assert!(!bits.bit(1));
        assert!(bits.bit(8));
        assert_eq!(
            bits.iter().collect::<Vec<_>>(),
            [true, false, true, true, false, false, false, true, true]
        );
    }

    #[test]
    fn bit_string_whole_bytes() {
        let bits = BitString::new(Bytes::from_static(b"\xff\x00"), 16);
        assert_eq!(bits.unused_bits(), 0);
        assert!(bits.bit(7));
        assert!(!bits.bit(8));
        assert!(BitString::empty().is_empty());
    }

    #[test]
    fn class_member_lookup() {
        let value = Value::class([
            (0, Value::Integer(1)), (2, Value::from("x"))
        ]);
        assert_eq!(value.member(0), Some(&Value::Integer(1)));
        assert_eq!(value.member(1), None);
        assert_eq!(value.member(2), Some(&Value::Visible("x".into())));
    }
}
