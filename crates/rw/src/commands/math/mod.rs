//! `rw math` subcommand group.

mod render;

use clap::Subcommand;

use render::RenderArgs;

use crate::error::CliError;

/// Math commands.
#[derive(Subcommand)]
pub(crate) enum MathCommand {
    /// Replace math placeholders in HTML files with rendered markup.
    Render(RenderArgs),
}

impl MathCommand {
    /// Execute the math subcommand.
    pub(crate) fn execute(self, version: &str) -> Result<(), CliError> {
        match self {
            Self::Render(args) => args.execute(version),
        }
    }

    /// Whether verbose logging was requested.
    pub(crate) fn verbose(&self) -> bool {
        match self {
            Self::Render(args) => args.verbose,
        }
    }
}
