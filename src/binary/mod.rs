//! The binary format.
//!
//! This is a private module. Its public items are re-exported by the crate
//! root.
//!
//! The format is a TLV encoding in the BER family: identifier octets,
//! length octets, content octets. The writer always uses indefinite
//! lengths for constructed values and delimits them with end-of-contents
//! markers; the reader accepts both definite and indefinite lengths.

pub mod reader;
pub mod writer;

mod integrity;

use crate::descr::{ClassDescr, Tagging};
use crate::error::{Error, Pos};
use crate::value::BitString;

pub use self::reader::BinaryReader;
pub use self::writer::BinaryWriter;


//------------ Tagging verification ------------------------------------------

/// Checks a class descriptor for a broken tagging mix.
///
/// A member of a class with automatic tagging must not override its
/// tagging to explicit: the reader could no longer tell the wrapper from
/// an implicitly tagged constructed value.
pub(crate) fn verify_class_tagging(
    class: &ClassDescr, pos: Pos
) -> Result<(), Error> {
    if class.class_tagging() != Tagging::Automatic {
        return Ok(())
    }
    for member in class.members() {
        if member.tagging == Some(Tagging::Explicit) {
            return Err(Error::illegal(
                format!(
                    "member \"{}\" of {} overrides automatic tagging \
                     with explicit tagging",
                    member.name, class.name()
                ),
                pos
            ))
        }
    }
    Ok(())
}


//------------ Compressed bit strings ----------------------------------------
//
// Large, sparse bit strings can be carried in a run length encoding: the
// content octets hold the total number of bits followed by the lengths of
// alternating runs, the first run being one of clear bits. All numbers use
// base 128 with the continuation bit set on every octet but the last. A
// compressed bit string is written under the OCTET STRING tag so a reader
// can tell it from the padded form.

/// Appends a number in base 128 continuation octets.
fn push_base128(target: &mut Vec<u8>, value: u64) {
    let bits = (64 - value.leading_zeros() as usize).max(1);
    let mut shift = ((bits - 1) / 7) * 7;
    loop {
        let digit = ((value >> shift) & 0x7F) as u8;
        if shift == 0 {
            target.push(digit);
            return
        }
        target.push(digit | 0x80);
        shift -= 7;
    }
}

/// Takes a base 128 number from a content slice.
fn take_base128(
    content: &[u8], at: &mut usize, pos: Pos
) -> Result<u64, Error> {
    let mut res: u64 = 0;
    loop {
        let octet = match content.get(*at) {
            Some(octet) => *octet,
            None => return Err(Error::end_of_data(pos)),
        };
        *at += 1;
        res = res.checked_mul(128).and_then(|res| {
            res.checked_add(u64::from(octet & 0x7F))
        }).ok_or_else(|| {
            Error::overflow("excessive number in compressed bit string", pos)
        })?;
        if octet & 0x80 == 0 {
            return Ok(res)
        }
    }
}

/// Returns the compressed content octets of a bit string.
pub(crate) fn compress_bits(bits: &BitString) -> Vec<u8> {
    let mut res = Vec::new();
    push_base128(&mut res, bits.bit_len() as u64);
    let mut current = false;
    let mut run: u64 = 0;
    for bit in bits.iter() {
        if bit == current {
            run += 1;
        }
        else {
            push_base128(&mut res, run);
            current = bit;
            run = 1;
        }
    }
    if !bits.is_empty() {
        push_base128(&mut res, run);
    }
    res
}

/// Rebuilds a bit string from compressed content octets.
pub(crate) fn decompress_bits(
    content: &[u8], pos: Pos
) -> Result<BitString, Error> {
    let mut at = 0;
    let bit_len = usize::try_from(
        take_base128(content, &mut at, pos)?
    ).map_err(|_| {
        Error::overflow("excessive bit string length", pos)
    })?;
    let mut data = vec![0u8; bit_len.div_ceil(8)];
    let mut produced = 0;
    let mut bit = false;
    while produced < bit_len {
        let run = usize::try_from(
            take_base128(content, &mut at, pos)?
        ).map_err(|_| {
            Error::overflow("excessive run length", pos)
        })?;
        if run > bit_len - produced {
            return Err(Error::format(
                "bit string runs exceed the bit count", pos
            ))
        }
        if bit {
            for i in produced..produced + run {
                data[i / 8] |= 0x80 >> (i % 8);
            }
        }
        produced += run;
        bit = !bit;
    }
    if at != content.len() {
        return Err(Error::format(
            "trailing octets in compressed bit string", pos
        ))
    }
    Ok(BitString::new(data.into(), bit_len))
}


//============ Tests =========================================================
