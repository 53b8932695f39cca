mod cli;
mod run;

use anyhow::Result;
use cli::Command;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Command::Still(args) => run::run_still(args),
        Command::Export(args) => run::run_export(args),
        Command::Preview(args) => run::run_preview(args),
        Command::Params(args) => run::run_params(args),
    }
}
