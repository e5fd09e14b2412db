//! Host-side backends.
//!
//! Backends connect guest peripherals to the host. The assembler receives them bundled in
//! `HostBackends`; a missing backend omits or defaults the matching peripheral.

use std::collections::VecDeque;
use std::fmt;
use std::io::{self, Read, Write};
use std::sync::mpsc::{Receiver, channel};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

/// Byte-stream backend for a serial port.
pub trait CharBackend: Send {
    /// Sends bytes from the guest to the host.
    fn write_bytes(&mut self, bytes: &[u8]);

    /// Returns the next byte from the host, if one is waiting.
    fn read_byte(&mut self) -> Option<u8>;
}

#[derive(Debug, Default)]
struct Buffers {
    output: Vec<u8>,
    input: VecDeque<u8>,
}

/// In-memory serial backend.
///
/// Clones share the same buffers, so a test can keep one handle while the machine owns
/// the other.
#[derive(Clone, Debug, Default)]
pub struct BufferBackend {
    inner: Arc<Mutex<Buffers>>,
}

impl BufferBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues bytes for the guest to receive.
    pub fn push_input(&self, bytes: &[u8]) {
        self.buffers().input.extend(bytes);
    }

    /// Returns everything the guest has transmitted so far.
    pub fn output(&self) -> Vec<u8> {
        self.buffers().output.clone()
    }

    /// Returns the transmitted bytes as lossy UTF-8.
    pub fn output_string(&self) -> String {
        String::from_utf8_lossy(&self.buffers().output).into_owned()
    }

    fn buffers(&self) -> std::sync::MutexGuard<'_, Buffers> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CharBackend for BufferBackend {
    fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffers().output.extend_from_slice(bytes);
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.buffers().input.pop_front()
    }
}

/// Serial backend on the process's stdin and stdout.
///
/// Stdin is read on a background thread and handed over through a channel.
pub struct StdioBackend {
    rx: Receiver<u8>,
}

impl fmt::Debug for StdioBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StdioBackend")
    }
}

impl StdioBackend {
    /// Creates the backend and spawns the stdin reader thread.
    pub fn new() -> Self {
        let (tx, rx) = channel();
        let _ = thread::spawn(move || {
            let mut buffer = [0u8; 1];
            let mut handle = io::stdin().lock();
            while handle.read_exact(&mut buffer).is_ok() {
                if tx.send(buffer[0]).is_err() {
                    break;
                }
            }
        });
        Self { rx }
    }
}

impl Default for StdioBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CharBackend for StdioBackend {
    fn write_bytes(&mut self, bytes: &[u8]) {
        let mut out = io::stdout().lock();
        let _ = out.write_all(bytes);
        let _ = out.flush();
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.rx.try_recv().ok()
    }
}

/// Host network attachment for the Ethernet controller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NicBackend {
    /// Requested NIC model; the AST2400 only takes `cadence_gem`.
    pub model: String,
    /// Station MAC address.
    pub mac: [u8; 6],
}

/// Backends handed to the assembler.
#[derive(Default)]
pub struct HostBackends {
    /// Serial backend for UART5; without one the port is not instantiated.
    pub serial: Option<Box<dyn CharBackend>>,
    /// Network attachment for the GEM.
    pub nic: Option<NicBackend>,
}

impl fmt::Debug for HostBackends {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostBackends")
            .field("serial", &self.serial.is_some())
            .field("nic", &self.nic)
            .finish()
    }
}

impl HostBackends {
    /// Creates an empty set: no serial port, default network settings.
    pub fn none() -> Self {
        Self::default()
    }

    /// Adds a serial backend.
    #[must_use]
    pub fn with_serial(mut self, backend: impl CharBackend + 'static) -> Self {
        self.serial = Some(Box::new(backend));
        self
    }

    /// Adds a network attachment.
    #[must_use]
    pub fn with_nic(mut self, nic: NicBackend) -> Self {
        self.nic = Some(nic);
        self
    }
}
