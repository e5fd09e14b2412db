//! Interrupt fabric.
//!
//! This module routes interrupt outputs of source components to the input lines of
//! controller components. It provides:
//! 1. **Input banks:** A fixed-size vector of input lines per controller, holding the
//!    current level and latched edges in atomics.
//! 2. **Lines:** `IrqLine` handles given to sources; driving one stores the level in the
//!    controller's bank synchronously, with no queueing.
//! 3. **Wiring:** `InterruptFabric::connect` with the one-source-per-input and
//!    one-input-per-output rules.
//!
//! The fabric never interprets levels. Masking, priority and edge/level sensitivity are
//! the controller's business; it reads its bank when it evaluates its outputs.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::common::{IrqError, LineSide};
use crate::soc::registry::ComponentId;

/// Fixed-size interrupt input vector of one controller.
#[derive(Debug)]
pub struct IrqInputBank {
    lines: usize,
    level: Vec<AtomicU64>,
    rising: Vec<AtomicU64>,
    falling: Vec<AtomicU64>,
}

impl IrqInputBank {
    /// Creates a bank with `lines` inputs, all deasserted.
    pub fn new(lines: usize) -> Self {
        let words = lines.div_ceil(64);
        let zeros = || (0..words).map(|_| AtomicU64::new(0)).collect::<Vec<_>>();
        Self { lines, level: zeros(), rising: zeros(), falling: zeros() }
    }

    /// Returns the number of input lines.
    #[inline]
    pub const fn lines(&self) -> usize {
        self.lines
    }

    /// Drives one input line to the given level and latches the edge, if any.
    ///
    /// Out-of-range lines are ignored; `connect` never hands them out.
    pub fn set_level(&self, line: usize, asserted: bool) {
        if line >= self.lines {
            return;
        }
        let (word, bit) = (line / 64, 1u64 << (line % 64));
        let prev = if asserted {
            self.level[word].fetch_or(bit, Ordering::AcqRel)
        } else {
            self.level[word].fetch_and(!bit, Ordering::AcqRel)
        };
        let was = prev & bit != 0;
        if asserted && !was {
            let _ = self.rising[word].fetch_or(bit, Ordering::AcqRel);
        } else if !asserted && was {
            let _ = self.falling[word].fetch_or(bit, Ordering::AcqRel);
        }
    }

    /// Returns the current level of one input line.
    pub fn level(&self, line: usize) -> bool {
        line < self.lines && self.level[line / 64].load(Ordering::Acquire) & (1 << (line % 64)) != 0
    }

    /// Returns the levels of inputs `64 * word .. 64 * word + 63` as a bitmap.
    pub fn levels(&self, word: usize) -> u64 {
        self.level.get(word).map_or(0, |w| w.load(Ordering::Acquire))
    }

    /// Returns and clears the latched rising edges of one 64-line word.
    pub fn take_rising(&self, word: usize) -> u64 {
        self.rising.get(word).map_or(0, |w| w.swap(0, Ordering::AcqRel))
    }

    /// Returns and clears the latched falling edges of one 64-line word.
    pub fn take_falling(&self, word: usize) -> u64 {
        self.falling.get(word).map_or(0, |w| w.swap(0, Ordering::AcqRel))
    }
}

/// Handle to one controller input, held by the component driving it.
#[derive(Clone, Debug)]
pub struct IrqLine {
    bank: Arc<IrqInputBank>,
    line: usize,
}

impl IrqLine {
    /// Returns the controller input index this handle drives.
    pub const fn input(&self) -> usize {
        self.line
    }

    /// Drives the line to the given level.
    #[inline]
    pub fn set_level(&self, asserted: bool) {
        self.bank.set_level(self.line, asserted);
    }

    /// Asserts the line.
    pub fn raise(&self) {
        self.set_level(true);
    }

    /// Deasserts the line.
    pub fn lower(&self) {
        self.set_level(false);
    }

    /// Asserts then deasserts the line, leaving both edges latched.
    pub fn pulse(&self) {
        self.raise();
        self.lower();
    }

    /// Returns the level currently seen by the controller.
    pub fn is_asserted(&self) -> bool {
        self.bank.level(self.line)
    }
}

/// One wire from a source output to a controller input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Connection {
    /// Driving component.
    pub source: ComponentId,
    /// Output index on the source.
    pub output: usize,
    /// Receiving controller.
    pub controller: ComponentId,
    /// Input index on the controller.
    pub input: usize,
}

/// Interrupt routing table for the whole machine.
#[derive(Debug, Default)]
pub struct InterruptFabric {
    banks: HashMap<ComponentId, Arc<IrqInputBank>>,
    by_input: HashMap<(ComponentId, usize), usize>,
    by_output: HashMap<(ComponentId, usize), usize>,
    connections: Vec<Connection>,
}

impl InterruptFabric {
    /// Creates an empty fabric.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the input vector of a controller.
    ///
    /// Registering the same controller again returns the existing bank.
    pub fn add_controller(&mut self, controller: ComponentId, lines: usize) -> Arc<IrqInputBank> {
        Arc::clone(
            self.banks
                .entry(controller)
                .or_insert_with(|| Arc::new(IrqInputBank::new(lines))),
        )
    }

    /// Returns the input bank of a controller.
    pub fn bank(&self, controller: ComponentId) -> Option<&Arc<IrqInputBank>> {
        self.banks.get(&controller)
    }

    /// Connects a source output to a controller input.
    ///
    /// On failure the fabric is unchanged and any existing binding is preserved.
    ///
    /// # Errors
    ///
    /// * `IrqError::NotAController` if `controller` has no input bank.
    /// * `IrqError::LineOutOfRange` if `input` is outside the bank.
    /// * `IrqError::LineAlreadyBound` if the input already has a source, or the source
    ///   output already drives a line.
    pub fn connect(
        &mut self,
        source: ComponentId,
        output: usize,
        controller: ComponentId,
        input: usize,
    ) -> Result<IrqLine, IrqError> {
        let bank = self
            .banks
            .get(&controller)
            .ok_or(IrqError::NotAController(controller))?;
        if input >= bank.lines() {
            return Err(IrqError::LineOutOfRange { controller, line: input, lines: bank.lines() });
        }
        if self.by_input.contains_key(&(controller, input)) {
            return Err(IrqError::LineAlreadyBound { component: controller, line: input, side: LineSide::Input });
        }
        if self.by_output.contains_key(&(source, output)) {
            return Err(IrqError::LineAlreadyBound { component: source, line: output, side: LineSide::Output });
        }

        let line = IrqLine { bank: Arc::clone(bank), line: input };
        let idx = self.connections.len();
        self.connections.push(Connection { source, output, controller, input });
        let _ = self.by_input.insert((controller, input), idx);
        let _ = self.by_output.insert((source, output), idx);
        debug!(%source, output, %controller, input, "irq connected");
        Ok(line)
    }

    /// Returns every connection in wiring order.
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Returns the connection feeding a controller input.
    pub fn source_of(&self, controller: ComponentId, input: usize) -> Option<&Connection> {
        self.by_input
            .get(&(controller, input))
            .map(|&i| &self.connections[i])
    }

    /// Returns a handle to the line driven by a source output.
    pub fn line_for(&self, source: ComponentId, output: usize) -> Option<IrqLine> {
        let conn = self.connections[*self.by_output.get(&(source, output))?];
        let bank = self.banks.get(&conn.controller)?;
        Some(IrqLine { bank: Arc::clone(bank), line: conn.input })
    }

    /// Returns the level of a controller input, or `false` for unknown controllers.
    pub fn input_level(&self, controller: ComponentId, input: usize) -> bool {
        self.banks.get(&controller).is_some_and(|b| b.level(input))
    }
}
