use std::io::{self, Stdout, Write};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use log::info;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use crate::auth::PasscodeVault;

use super::app::App;
use super::challenge::TerminalAuthenticator;

/// Spin up the terminal backend, enter the draw loop, and keep processing input
/// until the user quits.
pub fn run_app(app: &mut App, vault: &PasscodeVault) -> Result<()> {
    let mut stdout = io::stdout();
    enable_raw_mode().context("failed to enable raw mode")?;
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;

    let result = event_loop(&mut terminal, app, vault);

    cleanup_terminal(&mut terminal)?;
    info!("event=app_exit module=ui status={}", if result.is_ok() { "ok" } else { "error" });
    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    vault: &PasscodeVault,
) -> Result<()> {
    loop {
        terminal
            .draw(|frame| app.draw(frame))
            .context("failed to draw frame")?;

        if app.needs_authentication() {
            let mut authenticator = TerminalAuthenticator::new(terminal, vault);
            app.run_authentication(&mut authenticator);
            continue;
        }

        if !event::poll(Duration::from_millis(250)).context("event polling failed")? {
            continue;
        }
        if let Event::Key(key_event) = event::read().context("failed to read event")? {
            if key_event.kind != KeyEventKind::Press {
                continue;
            }
            if key_event.modifiers.contains(KeyModifiers::CONTROL)
                && key_event.code == KeyCode::Char('c')
            {
                return Ok(());
            }
            if app.handle_key(key_event.code)? {
                return Ok(());
            }
        }
    }
}

fn cleanup_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal
        .show_cursor()
        .context("failed to restore cursor visibility")
}

/// Read a line without echoing it, printing `*` per character. Used by the
/// passcode commands outside the TUI.
pub fn read_secret(label: &str) -> Result<String> {
    let mut stdout = io::stdout();
    write!(stdout, "{label}: ").context("failed to write prompt")?;
    stdout.flush().context("failed to flush prompt")?;

    enable_raw_mode().context("failed to enable raw mode")?;
    let secret = read_masked(&mut stdout);
    disable_raw_mode().context("failed to disable raw mode")?;
    writeln!(stdout).context("failed to finish prompt")?;

    secret
}

fn read_masked(stdout: &mut Stdout) -> Result<String> {
    let mut secret = String::new();
    loop {
        let Event::Key(key) = event::read().context("failed to read key")? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match key.code {
            KeyCode::Enter => return Ok(secret),
            KeyCode::Esc => bail!("passcode entry cancelled"),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                bail!("passcode entry cancelled")
            }
            KeyCode::Backspace => {
                if secret.pop().is_some() {
                    write!(stdout, "\u{8} \u{8}")?;
                }
            }
            KeyCode::Char(ch) if !ch.is_control() => {
                secret.push(ch);
                write!(stdout, "*")?;
            }
            _ => {}
        }
        stdout.flush()?;
    }
}
