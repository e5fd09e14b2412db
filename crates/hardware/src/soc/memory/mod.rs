//! On-chip static RAM.
//!
//! This module implements the SRAM backing region. It provides:
//! 1. **Storage:** A zero-filled byte buffer sized at construction, reserved fallibly.
//! 2. **Access:** Little-endian reads and writes of every access width; accesses that
//!    run past the end read as zero and are otherwise dropped.
//! 3. **Loading:** `load` for seeding contents before the machine starts.

use std::any::Any;
use std::collections::TryReserveError;

use crate::common::AccessSize;
use crate::soc::traits::{Component, RegisterWindow};

/// SRAM device structure.
#[derive(Debug)]
pub struct Sram {
    bytes: Vec<u8>,
}

impl Sram {
    /// Creates a zero-filled RAM of `size` bytes.
    ///
    /// # Arguments
    ///
    /// * `size` - Capacity in bytes.
    ///
    /// # Errors
    ///
    /// Returns the allocator's `TryReserveError` if the buffer cannot be reserved.
    pub fn try_new(size: usize) -> Result<Self, TryReserveError> {
        let mut bytes = Vec::new();
        bytes.try_reserve_exact(size)?;
        bytes.resize(size, 0);
        Ok(Self { bytes })
    }

    /// Returns the capacity in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns whether the RAM has zero capacity.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Copies `data` into RAM at `offset`.
    ///
    /// # Returns
    ///
    /// `false` (and no change) if the data does not fit.
    pub fn load(&mut self, data: &[u8], offset: usize) -> bool {
        let Some(dst) = offset
            .checked_add(data.len())
            .and_then(|end| self.bytes.get_mut(offset..end))
        else {
            return false;
        };
        dst.copy_from_slice(data);
        true
    }

    /// Returns the bytes an access covers, if it is fully in range.
    fn span(&self, offset: u64, size: AccessSize) -> Option<std::ops::Range<usize>> {
        let start = usize::try_from(offset).ok()?;
        let end = start.checked_add(usize::try_from(size.bytes()).ok()?)?;
        (end <= self.bytes.len()).then_some(start..end)
    }
}

impl Component for Sram {
    fn kind(&self) -> &'static str {
        "sram"
    }

    fn register_windows(&self) -> Vec<RegisterWindow> {
        vec![RegisterWindow::new(self.bytes.len() as u64)]
    }

    fn read(&mut self, offset: u64, size: AccessSize) -> u64 {
        let Some(span) = self.span(offset, size) else {
            return 0;
        };
        let mut buf = [0u8; 8];
        buf[..span.len()].copy_from_slice(&self.bytes[span]);
        u64::from_le_bytes(buf)
    }

    fn write(&mut self, offset: u64, value: u64, size: AccessSize) {
        let Some(span) = self.span(offset, size) else {
            return;
        };
        let n = span.len();
        self.bytes[span].copy_from_slice(&value.to_le_bytes()[..n]);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
