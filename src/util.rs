use color_eyre::eyre::{eyre, Result, WrapErr};
use log::debug;
use std::process::Command;

/// Start a calendar client without waiting for it
///
/// The command line is split on whitespace, the first word is the program.
pub fn open_client(cmd: &str) -> Result<()> {
    let mut words = cmd.split_whitespace();
    let program = words.next().ok_or(eyre!("client command is empty"))?;

    let child = Command::new(program)
        .args(words)
        .spawn()
        .wrap_err_with(|| format!("failed to start client: {:?}", cmd))?;
    debug!("client {:?} started with pid {}", program, child.id());
    Ok(())
}
