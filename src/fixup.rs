//! The fixup policy for visible strings.
//!
//! This is a private module. Its public items are re-exported by the crate
//! root.

use crate::error::{Error, Pos};


//------------ StringFixup ---------------------------------------------------

/// What to do with a non-printable byte in a visible string.
///
/// Visible strings are limited to the printable ASCII range. The policy
/// chosen here is applied byte by byte whenever such a string is read or
/// written in either format. UTF8 strings are never subject to it.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum StringFixup {
    /// Pass the byte through unchanged.
    Allow,

    /// Substitute the replacement character.
    Replace,

    /// Substitute the replacement character and count a warning.
    #[default]
    ReplaceAndWarn,

    /// Fail with an invalid data error.
    Reject,
}

impl StringFixup {
    /// The character substituted for a non-printable byte.
    pub const REPLACEMENT: u8 = b'#';

    /// Returns whether a byte may appear in a visible string as is.
    pub fn is_printable(byte: u8) -> bool {
        (0x20..=0x7E).contains(&byte)
    }

    /// Applies the policy to a single byte.
    ///
    /// Printable bytes pass through unchanged. For others the returned
    /// byte depends on the policy; `warnings` is incremented for
    /// `ReplaceAndWarn`.
    pub fn fix(
        self, byte: u8, warnings: &mut usize, pos: Pos
    ) -> Result<u8, Error> {
        if Self::is_printable(byte) {
            return Ok(byte)
        }
        match self {
            StringFixup::Allow => Ok(byte),
            StringFixup::Replace => Ok(Self::REPLACEMENT),
            StringFixup::ReplaceAndWarn => {
                *warnings += 1;
                Ok(Self::REPLACEMENT)
            }
            StringFixup::Reject => {
                Err(Error::invalid(
                    format!(
                        "non-printable character 0x{:02x} in visible string",
                        byte
                    ),
                    pos
                ))
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
    fn policies() {
        let mut warnings = 0;
        assert_eq!(
            StringFixup::Reject.fix(b'a', &mut warnings, Pos::None).unwrap(),
            b'a'
        );
        assert_eq!(
            StringFixup::Allow.fix(0x07, &mut warnings, Pos::None).unwrap(),
            0x07
        );
        assert_eq!(
            StringFixup::Replace.fix(0x07, &mut warnings, Pos::None).unwrap(),
            StringFixup::REPLACEMENT
        );
        assert_eq!(warnings, 0);
        assert_eq!(
            StringFixup::ReplaceAndWarn.fix(
                0x07, &mut warnings, Pos::None
            ).unwrap(),
            StringFixup::REPLACEMENT
        );
        assert_eq!(warnings, 1);
        assert_eq!(
            StringFixup::Reject.fix(
                0x07, &mut warnings, Pos::None
            ).unwrap_err().kind(),
            ErrorKind::InvalidData
        );
    }
}
