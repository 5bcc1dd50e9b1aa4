use anyhow::Context;
use camino::Utf8PathBuf;
use clap::{Parser, ValueHint};
use tracing::info;

use super::assemble_file;

#[derive(Parser, Debug)]
pub struct AssembleOpt {
    /// Source program
    #[clap(value_parser, value_hint = ValueHint::FilePath)]
    input: Utf8PathBuf,

    /// Where to write the executable. Defaults to the input file with a
    /// `pexe` extension
    #[clap(short, long, value_parser, value_hint = ValueHint::FilePath)]
    output: Option<Utf8PathBuf>,
}

impl AssembleOpt {
    pub fn exec(self) -> anyhow::Result<()> {
        let executable = assemble_file(&self.input)?;

        let output = self
            .output
            .unwrap_or_else(|| self.input.with_extension("pexe"));
        std::fs::write(&output, executable).with_context(|| format!("could not write {output}"))?;
        info!(path = %output, "Executable written");

        Ok(())
    }
}
