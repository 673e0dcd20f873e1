//! Full-screen fuzzy picker for interactive terminals.
//!
//! Typing narrows the list, the arrow keys move the highlight, Enter picks
//! and Esc cancels. Scripted input goes through [`crate::prompt::select`]
//! instead.

use crate::prompt::fuzzy_filter;
use crate::{Result, SshyError};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use ratatui::backend::CrosstermBackend;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use std::io::{self, Stdout};

const TERMINAL: &str = "<terminal>";
const HELP_TEXT: &str = "(type) filter | (Up/Down) move | (Enter) select | (Esc) cancel";
const QUERY_PREFIX: &str = "> ";

/// What a key press did to the picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Picked(usize),
    Cancelled,
}

/// Query, filtered rows and highlight of an open picker.
#[derive(Debug)]
pub struct PickerState<'a> {
    items: &'a [String],
    query: String,
    visible: Vec<usize>,
    cursor: usize,
}

impl<'a> PickerState<'a> {
    pub fn new(items: &'a [String]) -> Self {
        Self { items, query: String::new(), visible: fuzzy_filter(items, ""), cursor: 0 }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Indices into the items, in display order.
    pub fn visible(&self) -> &[usize] {
        &self.visible
    }

    /// Index of the highlighted item, if anything matches.
    pub fn selected(&self) -> Option<usize> {
        self.visible.get(self.cursor).copied()
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Step {
        if key.kind != KeyEventKind::Press {
            return Step::Continue;
        }

        match key.code {
            KeyCode::Esc => return Step::Cancelled,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Step::Cancelled;
            },
            KeyCode::Enter => return self.selected().map_or(Step::Continue, Step::Picked),
            KeyCode::Up => self.up(),
            KeyCode::Down => self.down(),
            KeyCode::Backspace => {
                if self.query.pop().is_some() {
                    self.refilter();
                }
            },
            KeyCode::Char(c) => {
                self.query.push(c);
                self.refilter();
            },
            _ => {},
        }
        Step::Continue
    }

    fn refilter(&mut self) {
        self.visible = fuzzy_filter(self.items, &self.query);
        self.cursor = 0;
    }

    fn up(&mut self) {
        if self.visible.is_empty() {
            return;
        }
        self.cursor = self.cursor.checked_sub(1).unwrap_or(self.visible.len() - 1);
    }

    fn down(&mut self) {
        if self.visible.is_empty() {
            return;
        }
        self.cursor = (self.cursor + 1) % self.visible.len();
    }
}

/// Split `text` into spans, styling the characters the query matched.
pub fn highlight_spans(matcher: &SkimMatcherV2, text: &str, query: &str) -> Vec<Span<'static>> {
    let Some((_, indices)) = matcher.fuzzy_indices(text, query).filter(|_| !query.is_empty())
    else {
        return vec![Span::raw(text.to_string())];
    };

    let style = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
    let mut spans = Vec::new();
    let mut plain = String::new();
    for (i, c) in text.chars().enumerate() {
        if indices.contains(&i) {
            if !plain.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut plain)));
            }
            spans.push(Span::styled(c.to_string(), style));
        } else {
            plain.push(c);
        }
    }
    if !plain.is_empty() {
        spans.push(Span::raw(plain));
    }
    spans
}

fn draw(frame: &mut Frame, label: &str, state: &PickerState<'_>) {
    let areas = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(3),
        Constraint::Min(1),
        Constraint::Length(1),
    ])
    .split(frame.size());

    frame.render_widget(
        Paragraph::new(label.to_string()).style(Style::default().add_modifier(Modifier::BOLD)),
        areas[0],
    );
    frame.render_widget(
        Paragraph::new(format!("{QUERY_PREFIX}{}", state.query()))
            .block(Block::default().borders(Borders::ALL)),
        areas[1],
    );

    let matcher = SkimMatcherV2::default();
    let rows: Vec<ListItem> = state
        .visible()
        .iter()
        .map(|&idx| {
            ListItem::new(Line::from(highlight_spans(&matcher, &state.items[idx], state.query())))
        })
        .collect();
    let mut list_state = ListState::default();
    list_state.select(state.selected().map(|_| state.cursor));
    frame.render_stateful_widget(
        List::new(rows)
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol(QUERY_PREFIX),
        areas[2],
        &mut list_state,
    );
    frame.render_widget(Paragraph::new(HELP_TEXT).centered(), areas[3]);

    let typed =
        u16::try_from(QUERY_PREFIX.len() + state.query().chars().count()).unwrap_or(u16::MAX);
    frame.set_cursor(areas[1].x.saturating_add(1).saturating_add(typed), areas[1].y + 1);
}

/// Raw mode on the alternate screen, restored on drop.
struct Screen {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl Screen {
    fn open() -> io::Result<Self> {
        enable_raw_mode()?;
        let setup = || {
            let mut stdout = io::stdout();
            execute!(stdout, EnterAlternateScreen)?;
            Terminal::new(CrosstermBackend::new(stdout))
        };
        match setup() {
            Ok(terminal) => Ok(Self { terminal }),
            Err(e) => {
                restore_terminal();
                Err(e)
            },
        }
    }
}

impl Drop for Screen {
    fn drop(&mut self) {
        let _ = self.terminal.show_cursor();
        restore_terminal();
    }
}

fn restore_terminal() {
    let _ = execute!(io::stdout(), LeaveAlternateScreen);
    let _ = disable_raw_mode();
}

fn terminal_error(e: io::Error) -> SshyError {
    SshyError::io(TERMINAL, e)
}

/// Let the user pick one of `items` on the full screen.
///
/// # Errors
///
/// Returns an error if the terminal cannot be switched to raw mode, drawn
/// on, or read from.
pub fn pick(label: &str, items: &[String]) -> Result<Option<usize>> {
    if items.is_empty() {
        return Ok(None);
    }

    let mut screen = Screen::open().map_err(terminal_error)?;
    let mut state = PickerState::new(items);
    loop {
        screen.terminal.draw(|frame| draw(frame, label, &state)).map_err(terminal_error)?;
        if let Event::Key(key) = event::read().map_err(terminal_error)? {
            match state.handle_key(key) {
                Step::Continue => {},
                Step::Picked(idx) => return Ok(Some(idx)),
                Step::Cancelled => return Ok(None),
            }
        }
    }
}
