/// A machine word: data cells, instruction arguments and the accumulator
pub type Word = i32;

/// Addresses as they appear in instruction arguments, before validation
pub type Address = i32;

/// Number of cells in data memory
pub const DATA_SIZE: usize = 512;

/// Maximum number of instructions held by the code store
pub const CODE_MAX: usize = 256;

/// Line separating the code section from the data section in executables
pub const EXECUTABLE_SENTINEL: Word = -1;

/// Marker line closing the code section of a source program
pub const END_OF_CODE: &str = "ENDCODE";
