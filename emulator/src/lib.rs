//! Simulator for the Pippin teaching machine
//!
//! Programs are written in Pippin assembly, turned into executables by the
//! [`assembler`], put into a [`Machine`] by the [`loader`] and executed one
//! instruction at a time.

pub mod assembler;
pub mod constants;
pub mod literal;
pub mod loader;
pub mod runtime;

pub use self::{
    assembler::assemble,
    loader::load,
    runtime::{Machine, Status},
};

