//! This module implements the TTY interactive interface.
//!
//! It is mainly based on two crates:
//!   - rustyline, to handle the line-editting logic
//!   - clap, to handle the parsing of those interactive commands
//!
//! Using Parser to do this is a bit of a hack, and requires some weird options
//! to have it working but works nonetheless.

use std::collections::HashSet;

use clap::Parser;
use pippin_emulator::constants::Address;
use pippin_emulator::literal::Hex;
use pippin_emulator::{Machine, Status};
use rustyline::history::DefaultHistory;
use rustyline::{Behavior, CompletionType, Config, EditMode, Editor};
use tracing::{debug, info, warn};

use crate::commands::Program;

mod helper;
mod parse;
use self::helper::RunHelper;
use self::parse::HexWord;

static HELP: &str = r#"
Run "help [command]" for command-specific help.
An empty line re-runs the last valid command.
Memory addresses and values are hexadecimal, instruction indexes are decimal."#;

#[derive(Parser, Clone, Debug)]
#[clap(
    help_template = "{about}\n\nCOMMANDS:\n{subcommands}\n{after-help}",
    after_help = HELP,
    disable_version_flag = true,
    infer_subcommands = true,
    no_binary_name = true,
    allow_negative_numbers = true,
)]
/// Interactive mode commands
enum Command {
    /// Execute the next instructions
    #[command(alias = "s")]
    Step {
        /// Number of steps to execute
        #[clap(value_parser, default_value = "1")]
        number: u64,
    },

    /// Run the program until it halts or reaches a breakpoint
    Continue,

    /// Show the state of registers
    Registers,

    /// Show the content of a block in memory
    Memory {
        /// The first address to show
        #[clap(value_parser)]
        address: HexWord,

        /// Number of memory cells to show
        #[clap(value_parser, default_value = "1")]
        number: Address,
    },

    /// Set a value in memory
    Set {
        /// The address to set
        #[clap(value_parser)]
        address: HexWord,

        /// The value to set
        #[clap(value_parser)]
        value: HexWord,
    },

    /// Show the next few instructions
    List {
        /// Number of instructions to show
        #[clap(value_parser, default_value = "10")]
        number: Address,
    },

    /// Set a breakpoint
    Break {
        /// The instruction index where to set the breakpoint
        #[clap(value_parser)]
        address: Address,
    },

    /// Remove a breakpoint
    Unbreak {
        /// The instruction index of the breakpoint to remove
        #[clap(value_parser)]
        address: Address,
    },

    /// Show informations about the current debugging session
    Info {
        #[clap(subcommand)]
        sub: Option<InfoCommand>,
    },

    /// Clear the machine and load the program again
    Reload,

    /// Clear the machine, removing the program
    Clear,

    /// Exit the emulator
    Exit,
}

#[derive(Parser, Clone, Debug)]
enum InfoCommand {
    /// List active breakpoints
    Breakpoints,
}

/// Holds informations about a interactive session
#[derive(Debug, Default)]
struct Session {
    /// List of active breakpoints
    breakpoints: HashSet<Address>,

    /// Current address for the `list` command
    list_address: Option<Address>,
}

impl Session {
    /// Add a breakpoint
    fn add_breakpoint(&mut self, address: Address) {
        if self.breakpoints.insert(address) {
            info!(address, "Setting a breakpoint");
        } else {
            warn!(address, "A breakpoint was already set");
        }
    }

    /// Remove a breakpoint
    fn remove_breakpoint(&mut self, address: Address) {
        if self.breakpoints.remove(&address) {
            info!(address, "Removing breakpoint");
        } else {
            warn!(address, "No breakpoint was set here");
        }
    }

    /// Checks if the given address has a breakpoint
    fn has_breakpoint(&self, address: Address) -> bool {
        self.breakpoints.contains(&address)
    }

    /// Reset the `list` command (after running an instruction)
    fn reset_list(&mut self) {
        self.list_address = None;
    }

    /// Offset the `list` command, returns the address to show
    fn offset_list(&mut self, machine: &Machine, offset: Address) -> Address {
        let addr = self.list_address.unwrap_or(machine.program_counter());
        self.list_address = Some(addr.saturating_add(offset));
        addr
    }

    /// Display the list of breakpoints
    fn display_breakpoints(&self, machine: &Machine) {
        match self.breakpoints.len() {
            0 => info!("No breakpoints"),
            1 => info!("1 breakpoint:"),
            x => info!("{} breakpoints:", x),
        }

        let mut bp: Vec<_> = self.breakpoints.iter().copied().collect();
        bp.sort_unstable();
        for addr in bp {
            self.display_instruction(machine, addr);
        }
    }

    /// Display an instruction at specified address
    fn display_instruction(&self, machine: &Machine, address: Address) {
        let is_current_line = machine.program_counter() == address;
        let has_breakpoint = self.has_breakpoint(address);

        let gutter = match (has_breakpoint, is_current_line) {
            (true, true) => "B>",
            (true, false) => "B ",
            (false, true) => " >",
            (false, false) => "  ",
        };

        // Empty past the end of the program
        let text = usize::try_from(address)
            .map(|index| machine.code().text(index))
            .unwrap_or_default();

        if text.is_empty() {
            info!("{:<2} {:>5}    –", gutter, address);
        } else {
            info!("{:<2} {:>5}    {}", gutter, address, text);
        }
    }
}

/// Log the outcome of a step, returns false if the machine stopped
fn report_step(result: Result<Status, pippin_emulator::runtime::ProcessorError>) -> bool {
    match result {
        Ok(Status::Running) => true,
        Ok(Status::Halted) => {
            info!("Program halted");
            false
        }
        Err(e) => {
            warn!(error = &e as &dyn std::error::Error, "Halted");
            false
        }
    }
}

#[allow(clippy::too_many_lines)]
pub(crate) fn run_interactive(machine: &mut Machine, program: &Program) -> anyhow::Result<()> {
    info!(path = %program.path(), "Running in interactive mode. Type \"help\" to list available commands.");
    let config = Config::builder()
        .history_ignore_space(true)
        .completion_type(CompletionType::List)
        .edit_mode(EditMode::Emacs)
        .behavior(Behavior::PreferTerm)
        .auto_add_history(true)
        .build();

    let mut session = Session::default();

    let h: RunHelper<Command> = RunHelper::new();
    let mut rl: Editor<RunHelper<Command>, DefaultHistory> = Editor::with_config(config)?;
    rl.set_helper(Some(h));

    let mut last_command: Option<Command> = None;

    'read: loop {
        // A macro to unwrap an error, log it and continue the loop
        macro_rules! warn_and_continue {
            ($e:expr) => {
                match $e {
                    Ok(o) => o,
                    Err(e) => {
                        tracing::warn!(error = %e);
                        continue 'read;
                    }
                }
            };
        }

        let Ok(readline) = rl.readline(">> ") else {
            info!("EOF, exitting");
            return Ok(());
        };

        let command = if readline.trim().is_empty() {
            if let Some(command) = &last_command {
                command.clone()
            } else {
                info!("Type \"help\" to get the list of available commands");
                continue 'read;
            }
        } else {
            let Ok(words) = shell_words::split(readline.as_str()) else {
                warn!("Invalid input");
                continue 'read;
            };

            let command = warn_and_continue!(Command::try_parse_from(words));
            last_command = Some(command.clone());
            command
        };

        debug!("Executing command: {:?}", command);

        match (command, machine.is_halted()) {
            (Command::Exit, _) => break,
            (Command::Step { number }, false) => {
                session.reset_list();

                for _ in 0..number {
                    if !report_step(machine.step()) {
                        continue 'read;
                    }
                }

                session.display_instruction(machine, machine.program_counter());
            }

            (Command::Continue, false) => {
                session.reset_list();

                loop {
                    if !report_step(machine.step()) {
                        continue 'read;
                    }

                    if session.has_breakpoint(machine.program_counter()) {
                        info!(
                            address = machine.program_counter(),
                            "Stopped at a breakpoint"
                        );
                        break;
                    }
                }

                session.display_instruction(machine, machine.program_counter());
            }

            (Command::Registers, _) => {
                info!("Registers: {}", machine.registers());
            }

            (Command::Memory { address, number }, _) => {
                let HexWord(address) = address;
                for offset in 0..number {
                    let address = address.saturating_add(offset);
                    let value = warn_and_continue!(machine.data(address));
                    let changed = usize::try_from(address).ok() == machine.changed_index();
                    info!(
                        address = %Hex(address),
                        value = %Hex(value),
                        changed
                    );
                }
            }

            (
                Command::Set {
                    address: HexWord(address),
                    value: HexWord(value),
                },
                _,
            ) => {
                info!(
                    "Setting memory at address {} to {}",
                    Hex(address),
                    Hex(value)
                );
                warn_and_continue!(machine.set_data(address, value));
            }

            (Command::List { number }, _) => {
                let addr = session.offset_list(machine, number);
                for i in 0..number {
                    session.display_instruction(machine, addr.saturating_add(i));
                }
            }

            (Command::Break { address }, _) => {
                session.add_breakpoint(address);
            }

            (Command::Unbreak { address }, _) => {
                session.remove_breakpoint(address);
            }

            (Command::Info { sub }, _) => match sub {
                Some(InfoCommand::Breakpoints) => {
                    session.display_breakpoints(machine);
                }
                None => {
                    session.display_breakpoints(machine);
                    info!("–");
                    info!(
                        instructions = machine.code().len(),
                        halted = machine.is_halted(),
                        "Registers: {}",
                        machine.registers()
                    );
                }
            },

            (Command::Reload, _) => {
                session.reset_list();
                if program.reload(machine).is_ok() {
                    info!("Program reloaded");
                }
            }

            (Command::Clear, _) => {
                session.reset_list();
                machine.clear();
                info!("Machine cleared");
            }

            (_, true) => {
                // Machine is halted but the user asked to run it, we just warn
                warn!("Machine is halted. Use \"reload\" to start again, or \"exit\" to quit");
            }
        }
    }

    Ok(())
}
