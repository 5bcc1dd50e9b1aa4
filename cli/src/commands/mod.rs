use std::ops::Range;

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use miette::{Diagnostic, LabeledSpan, MietteDiagnostic, NamedSource};
use pippin_emulator::loader::LoadError;
use pippin_emulator::{assemble, load, Machine};
use tracing::{debug, info};

mod assemble;
mod completion;
mod dump;
mod run;

#[derive(Parser, Debug)]
pub enum Subcommand {
    /// Assemble a source program into an executable
    Assemble(self::assemble::AssembleOpt),

    /// Load and run a program
    Run(self::run::RunOpt),

    /// Show the code and data of a program once loaded
    Dump(self::dump::DumpOpt),

    /// Generate shell completions
    Completion(self::completion::CompletionOpt),
}

impl Subcommand {
    /// Run a subcommand
    pub fn exec(self) -> anyhow::Result<()> {
        match self {
            Self::Assemble(opt) => opt.exec(),
            Self::Run(opt) => opt.exec(),
            Self::Dump(opt) => opt.exec(),
            Self::Completion(opt) => opt.exec(),
        }
    }
}

/// Byte range of a 1-based line, without its line ending
fn line_span(source: &str, line: usize) -> Option<Range<usize>> {
    let mut offset = 0;
    for (index, text) in source.split_inclusive('\n').enumerate() {
        if index + 1 == line {
            let length = text.trim_end_matches(['\n', '\r']).len();
            return Some(offset..offset + length);
        }
        offset += text.len();
    }

    None
}

/// Print a diagnostic pointing at a line of a file
fn report<D>(title: &str, path: &Utf8Path, source: String, line: usize, error: &D)
where
    D: Diagnostic + ?Sized,
{
    let mut diagnostic = MietteDiagnostic::new(title);
    if let Some(code) = error.code() {
        diagnostic = diagnostic.with_code(code.to_string());
    }
    if let Some(help) = error.help() {
        diagnostic = diagnostic.with_help(help.to_string());
    }
    if let Some(span) = line_span(&source, line) {
        diagnostic = diagnostic.with_label(LabeledSpan::at(span, error.to_string()));
    }

    let report = miette::Report::new(diagnostic).with_source_code(NamedSource::new(path, source));
    eprintln!("{report:?}");
}

/// Read a source file and assemble it
pub(crate) fn assemble_file(path: &Utf8Path) -> anyhow::Result<String> {
    info!(%path, "Reading source program");
    let source =
        std::fs::read_to_string(path).with_context(|| format!("could not read {path}"))?;

    debug!("Assembling program");
    match assemble(&source) {
        Ok(executable) => Ok(executable),
        Err(e) => {
            let line = e.line;
            report("Failed to assemble program", path, source, line, &e);
            Err(anyhow::Error::new(e).context(format!("could not assemble {path}")))
        }
    }
}

/// An executable ready to be loaded, either read from disk or assembled from a
/// source file
#[derive(Debug, Clone)]
pub(crate) struct Program {
    path: Utf8PathBuf,
    executable: String,
}

impl Program {
    /// Read a program. Files with the `pasm` extension are assembled first.
    pub fn read(path: &Utf8Path) -> anyhow::Result<Self> {
        let executable = if path.extension() == Some("pasm") {
            assemble_file(path)?
        } else {
            info!(%path, "Reading executable");
            std::fs::read_to_string(path).with_context(|| format!("could not read {path}"))?
        };

        Ok(Self {
            path: path.to_owned(),
            executable,
        })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Load the program in an empty machine
    pub fn load(&self) -> anyhow::Result<Machine> {
        let mut machine = Machine::new();
        self.reload(&mut machine)
            .with_context(|| format!("could not load {}", self.path))?;
        Ok(machine)
    }

    /// Clear a machine and load the program in it again
    pub fn reload(&self, machine: &mut Machine) -> Result<(), LoadError> {
        machine.clear();
        load(machine, &self.executable).inspect_err(|e| {
            report(
                "Failed to load program",
                &self.path,
                self.executable.clone(),
                e.line,
                e,
            );
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_span_test() {
        let source = "LODI 5\r\nSTO 0\nHALT";
        assert_eq!(line_span(source, 1), Some(0..6));
        assert_eq!(line_span(source, 2), Some(8..13));
        assert_eq!(line_span(source, 3), Some(14..18));
        assert_eq!(line_span(source, 4), None);
        assert_eq!(line_span(source, 0), None);
    }
}
