use std::mem;

use anyhow::Result;
use crossterm::event::KeyCode;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

use crate::auth::{AuthGate, AuthStatus, LocalAuthenticator, Notice, Session, Unavailable};
use crate::books::{BookError, BookStore};
use crate::db::SharedStore;
use crate::models::Book;
use crate::state::Subscription;

use super::forms::{BookField, BookForm, ConfirmBookDelete};
use super::helpers::{centered_rect, visible_window};

/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;
/// Header bar above the book list.
const HEADER_HEIGHT: u16 = 3;
/// Height allocation per book card.
const BOOK_CARD_HEIGHT: u16 = 4;

/// High-level navigation states. The book screen only exists once the
/// session is authenticated.
enum Screen {
    Auth,
    Books,
}

/// Fine-grained modes scoped to the book screen.
enum Mode {
    Normal,
    AddingBook(BookForm),
    EditingBook { id: String, form: BookForm },
    ConfirmBookDelete(ConfirmBookDelete),
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

/// Severity levels shown in the footer.
enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Top-level application controller. Owns the session value, the gate in
/// front of the book list, and the book manager behind it.
pub struct App {
    session: Session,
    gate: AuthGate,
    books: BookStore,
    /// Keeps the selection cursor inside the list whenever the collection
    /// changes, whichever handler changed it.
    book_changes: Subscription<Vec<Book>>,
    selected: usize,
    screen: Screen,
    mode: Mode,
    status: Option<StatusMessage>,
}

impl App {
    pub fn new(store: SharedStore) -> Self {
        let books = BookStore::new(store);
        let book_changes = books.subscribe();
        Self {
            session: Session::new(),
            gate: AuthGate::new(),
            books,
            book_changes,
            selected: 0,
            screen: Screen::Auth,
            mode: Mode::Normal,
            status: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// True when the gate has an attempt queued (first mount or retry).
    pub fn needs_authentication(&self) -> bool {
        matches!(self.screen, Screen::Auth) && self.gate.is_pending()
    }

    /// Run the queued gate attempt and mount the book list on success.
    pub fn run_authentication<A>(&mut self, authenticator: &mut A)
    where
        A: LocalAuthenticator + ?Sized,
    {
        let session = &mut self.session;
        self.gate.authenticate(authenticator, || session.grant());

        if self.session.is_authenticated() && matches!(self.screen, Screen::Auth) {
            self.mount_books();
        }
    }

    fn mount_books(&mut self) {
        self.books.load_books();
        self.screen = Screen::Books;
        self.selected = 0;
        self.sync_selection();
    }

    /// Top-level key dispatcher. The boolean result tells the outer loop
    /// whether the user requested an exit.
    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        let mut exit = false;
        match self.screen {
            Screen::Auth => self.handle_auth_key(code, &mut exit),
            Screen::Books => {
                let mode = mem::replace(&mut self.mode, Mode::Normal);
                self.mode = match mode {
                    Mode::Normal => self.handle_normal_key(code, &mut exit),
                    Mode::AddingBook(form) => self.handle_book_form(code, None, form),
                    Mode::EditingBook { id, form } => self.handle_book_form(code, Some(id), form),
                    Mode::ConfirmBookDelete(confirm) => {
                        self.handle_confirm_book_delete(code, confirm)
                    }
                };
            }
        }
        self.sync_selection();
        Ok(exit)
    }

    fn handle_auth_key(&mut self, code: KeyCode, exit: &mut bool) {
        if self.gate.notice().is_some() {
            match code {
                KeyCode::Enter | KeyCode::Esc => self.gate.dismiss_notice(),
                KeyCode::Char('r') | KeyCode::Char('R') => self.gate.retry(),
                KeyCode::Char('q') | KeyCode::Char('Q') => *exit = true,
                _ => {}
            }
            return;
        }

        match code {
            KeyCode::Char('r') | KeyCode::Char('R') | KeyCode::Enter => self.gate.retry(),
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => *exit = true,
            _ => {}
        }
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Mode {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => {
                *exit = true;
                Mode::Normal
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
                Mode::Normal
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < self.books.len() {
                    self.selected += 1;
                }
                Mode::Normal
            }
            KeyCode::Char('+') | KeyCode::Char('a') | KeyCode::Char('A') => {
                self.clear_status();
                Mode::AddingBook(BookForm::default())
            }
            KeyCode::Char('e') | KeyCode::Char('E') | KeyCode::Enter => {
                match self.books.get(self.selected) {
                    Some(book) => {
                        self.clear_status();
                        Mode::EditingBook {
                            form: BookForm::from_book(&book),
                            id: book.id,
                        }
                    }
                    None => {
                        self.set_status("No book selected.", StatusKind::Error);
                        Mode::Normal
                    }
                }
            }
            KeyCode::Char('d') | KeyCode::Char('D') | KeyCode::Delete => {
                match self.books.get(self.selected) {
                    Some(book) => Mode::ConfirmBookDelete(ConfirmBookDelete::from(&book)),
                    None => {
                        self.set_status("No book selected.", StatusKind::Error);
                        Mode::Normal
                    }
                }
            }
            _ => Mode::Normal,
        }
    }

    /// Shared handler for the create (`id == None`) and edit forms.
    fn handle_book_form(&mut self, code: KeyCode, id: Option<String>, mut form: BookForm) -> Mode {
        let mut keep_open = true;
        match code {
            KeyCode::Esc => {
                let text = if id.is_some() {
                    "Edit cancelled."
                } else {
                    "Creation cancelled."
                };
                self.set_status(text, StatusKind::Info);
                keep_open = false;
            }
            KeyCode::Tab | KeyCode::Down => form.next_field(),
            KeyCode::BackTab | KeyCode::Up => form.previous_field(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => {
                let draft = form.to_draft();
                let result = match &id {
                    Some(id) => self.books.update(id, &draft),
                    None => self.books.create(&draft),
                };
                match result {
                    Ok(book) => {
                        if id.is_some() {
                            self.set_status(format!("Saved \"{}\".", book.title), StatusKind::Info);
                        } else {
                            self.selected = 0;
                            self.set_status(
                                format!("Created \"{}\".", book.title),
                                StatusKind::Info,
                            );
                        }
                        keep_open = false;
                    }
                    Err(BookError::Validation(message)) => {
                        self.set_status(format!("Validation: {message}"), StatusKind::Error);
                        form.error = Some(message);
                    }
                    Err(err @ BookError::NotFound(_)) => {
                        self.set_status(err.to_string(), StatusKind::Error);
                        keep_open = false;
                    }
                }
            }
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }

        match (keep_open, id) {
            (false, _) => Mode::Normal,
            (true, Some(id)) => Mode::EditingBook { id, form },
            (true, None) => Mode::AddingBook(form),
        }
    }

    fn handle_confirm_book_delete(&mut self, code: KeyCode, confirm: ConfirmBookDelete) -> Mode {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Deletion cancelled.", StatusKind::Info);
                Mode::Normal
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                match self.books.delete(&confirm.id) {
                    Ok(book) => {
                        self.set_status(format!("Deleted \"{}\".", book.title), StatusKind::Info)
                    }
                    Err(err) => self.set_status(err.to_string(), StatusKind::Error),
                }
                Mode::Normal
            }
            _ => Mode::ConfirmBookDelete(confirm),
        }
    }

    fn sync_selection(&mut self) {
        if let Some(len) = self.book_changes.poll_with(Vec::len) {
            self.selected = self.selected.min(len.saturating_sub(1));
        }
    }

    fn set_status<S: Into<String>>(&mut self, text: S, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let footer_height = FOOTER_HEIGHT.min(area.height);

        let (content_area, footer_area) = if area.height > footer_height {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(footer_height)])
                .split(area);
            (chunks[0], chunks[1])
        } else {
            (area, area)
        };

        match self.screen {
            Screen::Auth => self.draw_auth(frame, content_area),
            Screen::Books => self.draw_books(frame, content_area),
        }

        if area.height >= footer_height {
            self.draw_footer(frame, footer_area);
        }

        match &self.mode {
            Mode::AddingBook(form) => self.draw_book_form(frame, area, "New Book", form),
            Mode::EditingBook { form, .. } => self.draw_book_form(frame, area, "Edit Book", form),
            Mode::ConfirmBookDelete(confirm) => self.draw_confirm_delete(frame, area, confirm),
            Mode::Normal => {}
        }

        if let (Screen::Auth, Some(notice)) = (&self.screen, self.gate.notice()) {
            self.draw_notice(frame, area, notice);
        }
    }

    fn draw_auth(&self, frame: &mut Frame, area: Rect) {
        let mut lines = Vec::new();
        if self.gate.status() == AuthStatus::Checking {
            lines.push(Line::from(Span::styled(
                "Checking…",
                Style::default().fg(Color::Gray),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Please authenticate to continue",
                Style::default().add_modifier(Modifier::BOLD),
            )));
            if self.gate.status() == AuthStatus::Unavailable(Unavailable::NotEnrolled) {
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    "Run `bookshelf passcode set` to enroll a passcode.",
                    Style::default().fg(Color::Gray),
                )));
            }
        }

        let block = Block::default().title("Bookshelf").borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let text_height = (lines.len() as u16).min(inner.height);
        let top = inner.y + inner.height.saturating_sub(text_height) / 2;
        let text_area = Rect::new(inner.x, top, inner.width, text_height);
        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, text_area);
    }

    fn draw_books(&self, frame: &mut Frame, area: Rect) {
        let header_height = HEADER_HEIGHT.min(area.height);
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(header_height), Constraint::Min(0)])
            .split(area);

        let header = Paragraph::new(Line::from(vec![
            Span::styled("Book CRUD", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(format!("   {} book(s)   ", self.books.len())),
            Span::styled("[+] Add", Style::default().fg(Color::Blue)),
        ]))
        .block(Block::default().borders(Borders::ALL));
        frame.render_widget(header, chunks[0]);

        let list_area = chunks[1];
        if list_area.height == 0 {
            return;
        }

        if self.books.is_empty() {
            let message = Paragraph::new("No books yet — press + to create one.")
                .alignment(Alignment::Center)
                .style(Style::default().fg(Color::Gray))
                .block(Block::default().borders(Borders::ALL));
            frame.render_widget(message, list_area);
            return;
        }

        self.render_book_cards(frame, list_area);
    }

    fn render_book_cards(&self, frame: &mut Frame, area: Rect) {
        let capacity = (area.height / BOOK_CARD_HEIGHT).max(1) as usize;
        let (start, end) = visible_window(self.selected, self.books.len(), capacity);
        if end <= start {
            return;
        }

        let constraints: Vec<Constraint> = (start..end)
            .map(|_| Constraint::Length(BOOK_CARD_HEIGHT))
            .collect();
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        for (chunk, index) in rows.iter().zip(start..end) {
            if chunk.height == 0 {
                continue;
            }
            let Some(book) = self.books.get(index) else {
                break;
            };

            let mut block = Block::default().borders(Borders::ALL);
            let title = if index == self.selected {
                block = block.border_style(Style::default().fg(Color::Yellow));
                format!("▶ {}", book.title)
            } else {
                book.title.clone()
            };

            let lines = vec![
                Line::from(Span::styled(
                    title,
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(
                    book.meta_line(),
                    Style::default().fg(Color::Gray),
                )),
            ];

            let paragraph = Paragraph::new(lines)
                .block(block)
                .wrap(Wrap { trim: true })
                .alignment(Alignment::Left);
            frame.render_widget(paragraph, *chunk);
        }
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let paragraph = Paragraph::new(vec![status_line, self.footer_instructions()])
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn footer_instructions(&self) -> Line<'static> {
        let key_style = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        let hints: &[(&str, &str)] = match (&self.screen, &self.mode) {
            (Screen::Auth, _) if self.gate.notice().is_some() => {
                &[("[Enter]", " Dismiss   "), ("[r]", " Try Again   "), ("[q]", " Quit")]
            }
            (Screen::Auth, _) => &[("[r]", " Try Again   "), ("[q]", " Quit")],
            (Screen::Books, Mode::Normal) => &[
                ("[↑↓]", " Navigate   "),
                ("[+]", " Add   "),
                ("[e]", " Edit   "),
                ("[d]", " Delete   "),
                ("[q]", " Quit"),
            ],
            (Screen::Books, Mode::AddingBook(_)) => &[
                ("[Tab]", " Next Field   "),
                ("[Enter]", " Create   "),
                ("[Esc]", " Cancel"),
            ],
            (Screen::Books, Mode::EditingBook { .. }) => &[
                ("[Tab]", " Next Field   "),
                ("[Enter]", " Save   "),
                ("[Esc]", " Cancel"),
            ],
            (Screen::Books, Mode::ConfirmBookDelete(_)) => {
                &[("[y]", " Delete   "), ("[n]", " Cancel")]
            }
        };

        let spans: Vec<Span<'static>> = hints
            .iter()
            .flat_map(|(key, label)| {
                [
                    Span::styled(key.to_string(), key_style),
                    Span::raw(label.to_string()),
                ]
            })
            .collect();
        Line::from(spans)
    }

    fn draw_book_form(&self, frame: &mut Frame, area: Rect, title: &str, form: &BookForm) {
        let popup_area = centered_rect(70, 50, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title(title).borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines = vec![
            form.build_line(BookField::Title),
            form.build_line(BookField::Author),
            form.build_line(BookField::Year),
            Line::from(""),
        ];

        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            let confirm = if title == "Edit Book" { "Save" } else { "Create" };
            lines.push(Line::from(Span::styled(
                format!("Enter to {} • Tab to switch • Esc to cancel", confirm.to_lowercase()),
                Style::default().fg(Color::Gray),
            )));
        }

        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);

        frame.set_cursor_position((
            inner.x + form.cursor_offset(),
            inner.y + form.active.row(),
        ));
    }

    fn draw_confirm_delete(&self, frame: &mut Frame, area: Rect, confirm: &ConfirmBookDelete) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title("Delete").borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let lines = vec![
            Line::from(format!("Delete \"{}\"?", confirm.title)),
            Line::from(""),
            Line::from(vec![
                Span::styled(
                    "Y",
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                ),
                Span::raw(" Delete   "),
                Span::styled("N / Esc", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" Cancel"),
            ]),
        ];

        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn draw_notice(&self, frame: &mut Frame, area: Rect, notice: &Notice) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title(notice.title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red));
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let lines = vec![
            Line::from(notice.message),
            Line::from(""),
            Line::from(Span::styled(
                "Enter to dismiss • R to try again",
                Style::default().fg(Color::Gray),
            )),
        ];
        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }
}
