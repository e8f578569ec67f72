//! Binary entry point: resolve configuration, start logging, open the
//! key-value store, then either run a passcode command or the TUI.
use std::rc::Rc;

use anyhow::{bail, Context};
use bookshelf::auth::MIN_PASSCODE_LEN;
use bookshelf::config::{AppConfig, Cli, Command, PasscodeCommand};
use bookshelf::logging::init_logging;
use bookshelf::ui::read_secret;
use bookshelf::{ensure_schema, run_app, App, PasscodeVault, SharedStore};
use clap::Parser;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::from_cli(&cli)?;
    init_logging(&config.log_level, &config.log_dir).map_err(anyhow::Error::msg)?;

    let store: SharedStore = Rc::new(ensure_schema(&config.data_dir)?);

    match cli.command {
        Some(Command::Passcode(command)) => run_passcode(command, &PasscodeVault::new(store)),
        None => {
            let vault = PasscodeVault::new(Rc::clone(&store));
            let mut app = App::new(store);
            run_app(&mut app, &vault)
        }
    }
}

fn run_passcode(command: PasscodeCommand, vault: &PasscodeVault) -> anyhow::Result<()> {
    match command {
        PasscodeCommand::Status => {
            if vault.is_enrolled()? {
                println!("A passcode is enrolled.");
            } else {
                println!("No passcode enrolled. Run `bookshelf passcode set`.");
            }
        }
        PasscodeCommand::Set => {
            let first = read_secret(&format!("New passcode (min {MIN_PASSCODE_LEN} chars)"))?;
            let second = read_secret("Repeat passcode")?;
            if first != second {
                bail!("passcodes do not match");
            }
            vault.enroll(&first).context("failed to enroll passcode")?;
            println!("Passcode enrolled.");
        }
        PasscodeCommand::Clear => {
            vault.clear().context("failed to clear passcode")?;
            println!("Passcode removed.");
        }
    }
    Ok(())
}
