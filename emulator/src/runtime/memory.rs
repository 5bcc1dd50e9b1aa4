use thiserror::Error;

use crate::constants::{Address, Word, DATA_SIZE};

/// Represents errors related to memory manipulations
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    /// The given address was outside of the data memory
    #[error("invalid address {0}")]
    InvalidAddress(Address),
}

/// Holds the data cells of the machine.
///
/// It has [`DATA_SIZE`] cells, all set to zero on startup. The index of the
/// last cell written is tracked so that a front-end can highlight it.
#[derive(Clone)]
pub struct Memory {
    inner: Box<[Word; DATA_SIZE]>,
    changed: Option<usize>,
}

impl Default for Memory {
    fn default() -> Self {
        Self {
            inner: Box::new([0; DATA_SIZE]),
            changed: None,
        }
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Memory {{ changed: {:?}, cells: [...] }}", self.changed)
    }
}

impl Memory {
    fn index(address: Address) -> Result<usize, MemoryError> {
        usize::try_from(address)
            .ok()
            .filter(|&index| index < DATA_SIZE)
            .ok_or(MemoryError::InvalidAddress(address))
    }

    /// Get the value of a cell
    ///
    /// # Errors
    ///
    /// It fails if the address is negative or out of bounds.
    pub fn get(&self, address: Address) -> Result<Word, MemoryError> {
        let index = Self::index(address)?;
        Ok(self.inner[index])
    }

    /// Set the value of a cell and mark it as the last changed one
    ///
    /// # Errors
    ///
    /// It fails if the address is negative or out of bounds.
    pub fn set(&mut self, address: Address, value: Word) -> Result<(), MemoryError> {
        let index = Self::index(address)?;
        self.inner[index] = value;
        self.changed = Some(index);
        Ok(())
    }

    /// Index of the last cell written, if any since the last clear
    #[must_use]
    pub fn changed_index(&self) -> Option<usize> {
        self.changed
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Word] {
        self.inner.as_slice()
    }

    /// Reset every cell to zero
    pub fn clear(&mut self) {
        self.inner.fill(0);
        self.changed = None;
    }
}
