use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::{Error, Result};

/// The shared tape arena: `tape_length` cells for each of `programs` programs,
/// laid out contiguously by program index.
///
/// Every cell is a naturally aligned 32-bit slot holding a byte value.
/// Workers share the store by `&` reference. All accesses are relaxed
/// whole-slot loads and stores: a program racing a neighbour's copy
/// instruction on the same cell observes one of the written values, never a
/// torn one, and no ordering between them is imposed.
pub struct TapeStore {
    cells: Box<[AtomicU32]>,
    tape_length: usize,
    programs: usize,
}

impl TapeStore {
    /// Allocate a zeroed store.
    pub fn new(tape_length: usize, programs: usize) -> Result<Self> {
        if tape_length == 0 || programs == 0 {
            return Err(Error::Config(format!(
                "tape store needs positive dimensions, got tape_length={tape_length} programs={programs}"
            )));
        }
        let total = tape_length.checked_mul(programs).ok_or_else(|| {
            Error::Config(format!(
                "tape store of {programs} x {tape_length} cells overflows"
            ))
        })?;
        let cells = (0..total).map(|_| AtomicU32::new(0)).collect();
        Ok(Self {
            cells,
            tape_length,
            programs,
        })
    }

    /// Build a store from a flat host buffer, truncating each value to a byte.
    pub fn from_cells(tape_length: usize, cells: &[u32]) -> Result<Self> {
        if tape_length == 0 || cells.len() % tape_length != 0 {
            return Err(Error::Config(format!(
                "buffer of {} cells is not a whole number of {tape_length}-cell tapes",
                cells.len()
            )));
        }
        let store = Self::new(tape_length, cells.len() / tape_length)?;
        store.write_cells(cells)?;
        Ok(store)
    }

    pub fn tape_length(&self) -> usize {
        self.tape_length
    }

    pub fn programs(&self) -> usize {
        self.programs
    }

    /// Total number of cells across all tapes.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Absolute slot of `offset` within `program`'s tape.
    #[inline]
    pub fn cell_index(&self, program: usize, offset: usize) -> usize {
        debug_assert!(program < self.programs && offset < self.tape_length);
        program * self.tape_length + offset
    }

    #[inline]
    pub fn load(&self, program: usize, offset: usize) -> u8 {
        self.cells[self.cell_index(program, offset)].load(Ordering::Relaxed) as u8
    }

    #[inline]
    pub fn store(&self, program: usize, offset: usize, value: u8) {
        self.cells[self.cell_index(program, offset)].store(value as u32, Ordering::Relaxed);
    }

    /// Overwrite the whole store from a host buffer of matching length.
    ///
    /// Only call between ticks.
    pub fn write_cells(&self, cells: &[u32]) -> Result<()> {
        if cells.len() != self.cells.len() {
            return Err(Error::Config(format!(
                "expected {} cells, got {}",
                self.cells.len(),
                cells.len()
            )));
        }
        for (slot, &value) in self.cells.iter().zip(cells) {
            slot.store(value & 0xFF, Ordering::Relaxed);
        }
        Ok(())
    }

    /// Copy the store out as the flat `u32` buffer layout.
    pub fn snapshot(&self) -> Vec<u32> {
        self.cells.iter().map(|c| c.load(Ordering::Relaxed)).collect()
    }

    /// One program's tape as bytes.
    pub fn program_bytes(&self, program: usize) -> Vec<u8> {
        (0..self.tape_length)
            .map(|offset| self.load(program, offset))
            .collect()
    }

    /// Fill `buf` with every tape as one flat byte slice.
    pub fn population_bytes_into(&self, buf: &mut Vec<u8>) {
        buf.clear();
        buf.reserve(self.cells.len());
        buf.extend(self.cells.iter().map(|c| c.load(Ordering::Relaxed) as u8));
    }

    /// Get every tape as one flat byte slice (convenience wrapper).
    pub fn population_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.population_bytes_into(&mut buf);
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addressing_is_program_major() {
        let store = TapeStore::new(4, 3).unwrap();
        assert_eq!(store.cell_index(0, 0), 0);
        assert_eq!(store.cell_index(1, 0), 4);
        assert_eq!(store.cell_index(2, 3), 11);
        store.store(1, 2, 9);
        assert_eq!(store.snapshot()[6], 9);
    }

    #[test]
    fn test_from_cells_truncates_to_bytes() {
        let store = TapeStore::from_cells(2, &[0x1FF, 3, 256, 7]).unwrap();
        assert_eq!(store.programs(), 2);
        assert_eq!(store.snapshot(), vec![0xFF, 3, 0, 7]);
    }

    #[test]
    fn test_from_cells_rejects_ragged_buffer() {
        assert!(TapeStore::from_cells(4, &[0; 6]).is_err());
        assert!(TapeStore::from_cells(0, &[]).is_err());
    }

    #[test]
    fn test_write_cells_length_checked() {
        let store = TapeStore::new(4, 2).unwrap();
        assert!(store.write_cells(&[0; 7]).is_err());
        assert!(store.write_cells(&[1; 8]).is_ok());
        assert_eq!(store.program_bytes(1), vec![1, 1, 1, 1]);
    }

    #[test]
    fn test_zero_sizes_rejected() {
        assert!(TapeStore::new(0, 4).is_err());
        assert!(TapeStore::new(4, 0).is_err());
    }

    #[test]
    fn test_population_bytes_length() {
        let store = TapeStore::new(16, 9).unwrap();
        assert_eq!(store.population_bytes().len(), 16 * 9);
        assert_eq!(store.len(), 144);
    }
}
