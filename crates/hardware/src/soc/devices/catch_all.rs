//! Unimplemented-device placeholder.
//!
//! Backs an I/O region so that accesses to peripherals the machine does not model are
//! logged instead of faulting. Reads return zero and writes are dropped.

use std::any::Any;

use tracing::warn;

use crate::common::AccessSize;
use crate::soc::traits::Component;

/// Catch-all device structure.
#[derive(Debug)]
pub struct CatchAll {
    name: String,
    accesses: u64,
}

impl CatchAll {
    /// Creates a placeholder reported under `name` in the logs.
    pub fn new(name: &str) -> Self {
        Self { name: name.to_owned(), accesses: 0 }
    }

    /// Returns how many accesses have landed here.
    pub const fn accesses(&self) -> u64 {
        self.accesses
    }
}

impl Component for CatchAll {
    fn kind(&self) -> &'static str {
        "unimplemented"
    }

    fn read(&mut self, offset: u64, size: AccessSize) -> u64 {
        self.accesses += 1;
        warn!(target: "unimp", "{}: unimplemented read at {:#x} (size {})", self.name, offset, size);
        0
    }

    fn write(&mut self, offset: u64, value: u64, size: AccessSize) {
        self.accesses += 1;
        warn!(
            target: "unimp",
            "{}: unimplemented write at {:#x} (size {}, value {:#x})", self.name, offset, size, value
        );
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
