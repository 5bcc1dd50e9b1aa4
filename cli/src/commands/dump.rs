use std::fmt::Write;

use camino::Utf8PathBuf;
use clap::{Parser, ValueHint};
use pippin_emulator::literal::Hex;
use pippin_emulator::Machine;

use super::Program;

#[derive(Parser, Debug)]
pub struct DumpOpt {
    /// Source program or executable
    #[clap(value_parser, value_hint = ValueHint::FilePath)]
    input: Utf8PathBuf,
}

/// Code listing followed by the non-zero data cells
fn listing(machine: &Machine) -> Result<String, std::fmt::Error> {
    let mut out = String::new();
    let code = machine.code();

    writeln!(out, "code ({} instructions):", code.len())?;
    for index in 0..code.len() {
        writeln!(out, "{index:>4}  {}", code.text(index))?;
    }

    writeln!(out, "data:")?;
    for (address, &value) in machine.memory().as_slice().iter().enumerate() {
        if value != 0 {
            writeln!(out, "{address:>4x}  {}", Hex(value))?;
        }
    }

    Ok(out)
}

impl DumpOpt {
    pub fn exec(self) -> anyhow::Result<()> {
        let program = Program::read(&self.input)?;
        let machine = program.load()?;
        print!("{}", listing(&machine)?);
        Ok(())
    }
}
