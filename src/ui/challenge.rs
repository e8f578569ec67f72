use std::io;

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::tty::IsTty;
use ratatui::backend::Backend;
use ratatui::layout::Alignment;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::{Frame, Terminal};

use crate::auth::{AuthError, ChallengeOptions, ChallengeResult, LocalAuthenticator, PasscodeVault};

use super::helpers::{centered_rect, surface_error};

/// Passcode challenge drawn straight onto the running terminal. The call to
/// [`LocalAuthenticator::authenticate`] owns the screen and the input until
/// the user submits or cancels.
pub struct TerminalAuthenticator<'a, B: Backend> {
    terminal: &'a mut Terminal<B>,
    vault: &'a PasscodeVault,
}

impl<'a, B: Backend> TerminalAuthenticator<'a, B> {
    pub fn new(terminal: &'a mut Terminal<B>, vault: &'a PasscodeVault) -> Self {
        Self { terminal, vault }
    }

    fn read_entry(&mut self, options: &ChallengeOptions) -> io::Result<Option<String>> {
        let mut entry = String::new();
        loop {
            let masked = entry.chars().count();
            self.terminal
                .draw(|frame| draw_challenge(frame, options, masked))?;

            let Event::Key(key) = event::read()? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Enter => return Ok(Some(entry)),
                KeyCode::Esc => return Ok(None),
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    return Ok(None)
                }
                KeyCode::Backspace => {
                    entry.pop();
                }
                KeyCode::Char(ch) if !ch.is_control() => entry.push(ch),
                _ => {}
            }
        }
    }
}

impl<B: Backend> LocalAuthenticator for TerminalAuthenticator<'_, B> {
    /// A passcode can only be typed on an interactive terminal.
    fn has_hardware(&mut self) -> Result<bool, AuthError> {
        Ok(io::stdin().is_tty())
    }

    fn is_enrolled(&mut self) -> Result<bool, AuthError> {
        self.vault
            .is_enrolled()
            .map_err(|err| AuthError(surface_error(&err)))
    }

    fn authenticate(&mut self, options: &ChallengeOptions) -> Result<ChallengeResult, AuthError> {
        let entry = self
            .read_entry(options)
            .map_err(|err| AuthError(err.to_string()))?;
        let Some(entry) = entry else {
            return Ok(ChallengeResult::failed("user_cancel"));
        };

        let matches = self
            .vault
            .verify(&entry)
            .map_err(|err| AuthError(surface_error(&err)))?;
        if matches {
            Ok(ChallengeResult::succeeded())
        } else {
            Ok(ChallengeResult::failed("mismatch"))
        }
    }
}

fn draw_challenge(frame: &mut Frame, options: &ChallengeOptions, masked: usize) {
    let area = frame.area();
    frame.render_widget(Clear, area);

    let popup_area = centered_rect(60, 40, area);
    let block = Block::default()
        .title("Unlock")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    frame.render_widget(block.clone(), popup_area);
    let inner = block.inner(popup_area);

    let key_style = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    let lines = vec![
        Line::from(Span::styled(
            options.prompt_message.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(format!("Passcode: {}", "•".repeat(masked))),
        Line::from(""),
        Line::from(vec![
            Span::styled("[Enter]", key_style),
            Span::raw(format!(" {}   ", options.fallback_label)),
            Span::styled("[Esc]", key_style),
            Span::raw(" Cancel"),
        ]),
    ];

    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, inner);
}
