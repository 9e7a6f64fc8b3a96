use clap::CommandFactory;
use clap_complete::{Shell, generate};

use crate::Cli;

/// Write completions for `shell` to stdout.
pub fn completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut std::io::stdout());
}
