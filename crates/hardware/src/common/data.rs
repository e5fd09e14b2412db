//! Memory Access Sizes.
//!
//! Every memory-mapped access carries its width. Register models use it to decide
//! how much of a register is read or written; the catch-all handler logs it.

use std::fmt;

/// Width of a memory-mapped access.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AccessSize {
    /// 8-bit access.
    Byte,
    /// 16-bit access.
    Half,
    /// 32-bit access.
    Word,
    /// 64-bit access.
    Double,
}

impl AccessSize {
    /// Returns the access width in bytes.
    #[inline]
    pub const fn bytes(self) -> u64 {
        match self {
            Self::Byte => 1,
            Self::Half => 2,
            Self::Word => 4,
            Self::Double => 8,
        }
    }

    /// Returns the mask covering the low `bytes()` bytes of a value.
    #[inline]
    pub const fn mask(self) -> u64 {
        match self {
            Self::Byte => 0xFF,
            Self::Half => 0xFFFF,
            Self::Word => 0xFFFF_FFFF,
            Self::Double => u64::MAX,
        }
    }

    /// Places a write within its aligned 32-bit register.
    ///
    /// # Returns
    ///
    /// `(bits, lane)`: the written bits shifted into position and the mask of the
    /// register bytes the access covers. Bits outside `lane` must keep their value.
    #[inline]
    pub const fn word_lane(self, offset: u64, value: u64) -> (u32, u32) {
        let shift = (offset & 3) * 8;
        let lane = (self.mask() << shift) as u32;
        ((value << shift) as u32 & lane, lane)
    }
}

impl fmt::Display for AccessSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bytes())
    }
}
