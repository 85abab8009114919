//! RAM backends.
//!
//! The microsequencer only ever talks to RAM through [`emu_core::Bus`], so
//! it never needs to know whether bytes live in a process-local buffer or
//! in a memory-mapped region shared with sibling peripheral processes.

use std::fs::OpenOptions;
use std::path::Path;

use emu_core::Bus;
use memmap2::MmapMut;

use crate::error::MapError;

/// 64 KiB of address space, flat.
pub const RAM_SIZE: usize = 0x1_0000;

/// Process-local RAM, the default backend.
#[derive(Clone)]
pub struct Ram(Box<[u8; RAM_SIZE]>);

impl Default for Ram {
    fn default() -> Self {
        Self::new()
    }
}

impl Ram {
    #[must_use]
    pub fn new() -> Self {
        Self(Box::new([0; RAM_SIZE]))
    }

    /// A snapshot of the full address space, for debugging and tests.
    #[must_use]
    pub fn dump(&self) -> &[u8; RAM_SIZE] {
        &self.0
    }
}

impl Bus for Ram {
    fn read(&mut self, address: u16) -> u8 {
        self.0[usize::from(address)]
    }

    fn write(&mut self, address: u16, value: u8) {
        self.0[usize::from(address)] = value;
    }
}

/// RAM backed by a memory-mapped file, so peripheral processes sharing the
/// mapping observe writes immediately.
pub struct SharedRam {
    map: MmapMut,
}

impl SharedRam {
    /// Open (creating and zero-extending if necessary) `path` as a
    /// [`RAM_SIZE`]-byte shared mapping.
    pub fn open(path: &Path) -> Result<Self, MapError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|source| MapError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        file.set_len(RAM_SIZE as u64)
            .map_err(|source| MapError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        // SAFETY: the file is sized exactly RAM_SIZE bytes above, and the
        // mapping is only ever accessed through `Bus::{read,write}`, which
        // bounds-check every offset against a u16 address.
        let map = unsafe { MmapMut::map_mut(&file) }.map_err(|source| MapError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self { map })
    }
}

impl Bus for SharedRam {
    fn read(&mut self, address: u16) -> u8 {
        // SAFETY: `address` is a u16, always within the RAM_SIZE mapping.
        unsafe { std::ptr::read_volatile(self.map.as_ptr().add(usize::from(address))) }
    }

    fn write(&mut self, address: u16, value: u8) {
        // SAFETY: see `read`.
        unsafe {
            std::ptr::write_volatile(self.map.as_mut_ptr().add(usize::from(address)), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ram_round_trips() {
        let mut ram = Ram::new();
        ram.write(0x1234, 0x56);
        assert_eq!(ram.read(0x1234), 0x56);
        assert_eq!(ram.dump()[0x1234], 0x56);
    }

    #[test]
    fn shared_ram_round_trips_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ram.bin");
        let mut ram = SharedRam::open(&path).unwrap();
        ram.write(0xFFFF, 0x42);
        assert_eq!(ram.read(0xFFFF), 0x42);
        assert_eq!(ram.read(0x0000), 0);
    }
}
