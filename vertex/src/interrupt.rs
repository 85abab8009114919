//! The interrupt controller.
//!
//! `InterruptRegion` is the stable shared-memory ABI a peripheral process
//! writes into: a fixed 12-byte layout with one explicit padding byte, so
//! the field offsets never depend on compiler-chosen alignment. The CPU's
//! own `raisedPeripheral` latch is *not* part of this region — it exists
//! only inside the machine, never visible to peripherals.

use std::path::Path;

use memmap2::MmapMut;

use crate::error::MapError;

/// Number of peripheral raise lines.
pub const RAISE_LINES: usize = 8;

/// The shared-memory layout peripherals write into.
///
/// Field offsets (all explicit, never left to `repr(Rust)`):
/// `enabled: u8` @ 0, one padding byte @ 1, `handler_address: u16`
/// little-endian @ 2..4, `raises: [u8; 8]` @ 4..12.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct InterruptRegion {
    pub enabled: u8,
    _pad: u8,
    pub handler_address: u16,
    pub raises: [u8; RAISE_LINES],
}

const REGION_BYTES: usize = std::mem::size_of::<InterruptRegion>();

/// Backing storage for the interrupt controller: either an owned region or
/// one mapped into a file shared with peripheral processes.
pub trait InterruptBacking {
    fn enabled(&self) -> bool;
    fn set_enabled(&mut self, value: bool);
    fn handler_address(&self) -> u16;
    fn raise(&self, slot: usize) -> bool;
    fn clear_raise(&mut self, slot: usize);
}

/// Process-local interrupt state, for single-process runs and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalInterrupt(InterruptRegion);

impl LocalInterrupt {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a peripheral raising an interrupt, for tests.
    pub fn raise_from_peripheral(&mut self, slot: usize, handler_address: u16) {
        self.0.raises[slot] = 1;
        self.0.handler_address = handler_address;
    }
}

impl InterruptBacking for LocalInterrupt {
    fn enabled(&self) -> bool {
        self.0.enabled != 0
    }

    fn set_enabled(&mut self, value: bool) {
        self.0.enabled = u8::from(value);
    }

    fn handler_address(&self) -> u16 {
        self.0.handler_address
    }

    fn raise(&self, slot: usize) -> bool {
        self.0.raises[slot] != 0
    }

    fn clear_raise(&mut self, slot: usize) {
        self.0.raises[slot] = 0;
    }
}

/// Interrupt state mapped from a file shared with peripheral processes.
///
/// Every read goes through [`std::ptr::read_volatile`]: the compiler must
/// not cache or reorder these accesses, since a sibling process can mutate
/// the mapping between any two instructions.
pub struct SharedInterrupt {
    map: MmapMut,
}

impl SharedInterrupt {
    pub fn open(path: &Path) -> Result<Self, MapError> {
        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|source| MapError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        file.set_len(REGION_BYTES as u64)
            .map_err(|source| MapError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        // SAFETY: sized exactly REGION_BYTES above; every access below is
        // bounds-checked against that fixed, documented layout.
        let map = unsafe { MmapMut::map_mut(&file) }.map_err(|source| MapError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self { map })
    }

    fn byte(&self, offset: usize) -> u8 {
        // SAFETY: offset < REGION_BYTES for every call site below.
        unsafe { std::ptr::read_volatile(self.map.as_ptr().add(offset)) }
    }

    fn write_byte(&mut self, offset: usize, value: u8) {
        // SAFETY: see `byte`.
        unsafe { std::ptr::write_volatile(self.map.as_mut_ptr().add(offset), value) }
    }
}

impl InterruptBacking for SharedInterrupt {
    fn enabled(&self) -> bool {
        self.byte(0) != 0
    }

    fn set_enabled(&mut self, value: bool) {
        self.write_byte(0, u8::from(value));
    }

    fn handler_address(&self) -> u16 {
        u16::from_le_bytes([self.byte(2), self.byte(3)])
    }

    fn raise(&self, slot: usize) -> bool {
        self.byte(4 + slot) != 0
    }

    fn clear_raise(&mut self, slot: usize) {
        self.write_byte(4 + slot, 0);
    }
}
