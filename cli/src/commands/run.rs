use anyhow::Context;
use camino::Utf8PathBuf;
use clap::{ArgAction, Parser, ValueHint};
use pippin_emulator::literal::Hex;
use pippin_emulator::{Machine, Status};
use tracing::{info, warn};

use super::Program;
use crate::interactive::run_interactive;

#[derive(Parser, Debug)]
pub struct RunOpt {
    /// Source program (`.pasm`) or executable
    #[clap(value_parser, value_hint = ValueHint::FilePath)]
    input: Utf8PathBuf,

    /// Run the program in interactive mode
    #[clap(short, long, action = ArgAction::SetTrue)]
    interactive: bool,

    /// Stop after this number of instructions
    #[clap(short, long, value_parser)]
    max_steps: Option<usize>,
}

/// Log the state of a machine at the end of a run
fn log_final_state(machine: &Machine) {
    info!(registers = %machine.registers(), "End of program");
    if let Some(index) = machine.changed_index() {
        let value = machine.memory().as_slice().get(index).copied().unwrap_or_default();
        info!(address = %format!("{index:x}"), value = %Hex(value), "Last memory write");
    }
}

impl RunOpt {
    pub fn exec(self) -> anyhow::Result<()> {
        let program = Program::read(&self.input)?;
        let mut machine = program.load()?;

        if self.interactive {
            run_interactive(&mut machine, &program)?;
            return Ok(());
        }

        info!("Running program");
        if let Some(max_steps) = self.max_steps {
            let status = machine
                .run_for(max_steps)
                .with_context(|| format!("program stopped at pc = {}", machine.program_counter()))?;
            if status == Status::Running {
                warn!(max_steps, "Program did not halt in time");
            }
        } else {
            let steps = machine
                .run()
                .with_context(|| format!("program stopped at pc = {}", machine.program_counter()))?;
            info!(steps, "Program halted");
        }

        log_final_state(&machine);
        Ok(())
    }
}
