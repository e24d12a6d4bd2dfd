//! Full-screen terminal renderer.
//!
//! Shows the current lyric line highlighted in place, with a few context
//! lines dimmed above and below, vertically centered in the terminal.

use std::io::{self, Stdout};

use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use futures::StreamExt;
use lyricline_core::Update;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Run the full-screen renderer until quit or cancelled.
///
/// Takes over the terminal with an alternate screen and raw mode, and
/// restores both before returning.
///
/// # Errors
///
/// Returns an error when the terminal cannot be set up, drawn to, or
/// restored.
pub async fn run(
    updates: watch::Receiver<Update>,
    context_lines: usize,
    cancel_token: CancellationToken,
) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, updates, context_lines, cancel_token).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    mut updates: watch::Receiver<Update>,
    context_lines: usize,
    cancel_token: CancellationToken,
) -> io::Result<()> {
    let mut events = EventStream::new();
    let mut current = updates.borrow().clone();
    let mut alignment = Alignment::Center;

    loop {
        terminal.draw(|frame| draw(frame, &current, context_lines, alignment))?;

        tokio::select! {
            () = cancel_token.cancelled() => return Ok(()),
            changed = updates.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                current = updates.borrow_and_update().clone();
            }
            event = events.next() => {
                match event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        if should_quit(key) {
                            return Ok(());
                        }
                        match key.code {
                            KeyCode::Left => alignment = shift_left(alignment),
                            KeyCode::Right => alignment = shift_right(alignment),
                            _ => {}
                        }
                    }
                    // Resize and other events just trigger a redraw.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e),
                    None => return Ok(()),
                }
            }
        }
    }
}

fn should_quit(key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

fn shift_left(alignment: Alignment) -> Alignment {
    match alignment {
        Alignment::Right => Alignment::Center,
        Alignment::Left | Alignment::Center => Alignment::Left,
    }
}

fn shift_right(alignment: Alignment) -> Alignment {
    match alignment {
        Alignment::Left => Alignment::Center,
        Alignment::Center | Alignment::Right => Alignment::Right,
    }
}

fn draw(frame: &mut Frame, update: &Update, context_lines: usize, alignment: Alignment) {
    let area = frame.area();
    if area.width == 0 || area.height == 0 {
        return;
    }

    if update.lines.is_empty() {
        let (notice, style) = match &update.err {
            Some(err) => (
                err.as_str(),
                Style::default().fg(Color::Red).add_modifier(Modifier::DIM),
            ),
            None => (
                "No synced lyrics",
                Style::default().add_modifier(Modifier::DIM),
            ),
        };
        let paragraph = Paragraph::new(notice)
            .style(style)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, centered_rect(1, area));
        return;
    }

    let index = update.index.min(update.lines.len() - 1);
    let (start, end) = window_bounds(update.lines.len(), index, context_lines);

    let text: Vec<Line> = update.lines[start..end]
        .iter()
        .enumerate()
        .map(|(offset, line)| {
            let style = if start + offset == index {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default().add_modifier(Modifier::DIM | Modifier::ITALIC)
            };
            Line::styled(line.text.clone(), style)
        })
        .collect();

    let height = u16::try_from(text.len()).unwrap_or(u16::MAX);
    let paragraph = Paragraph::new(text).alignment(alignment);
    frame.render_widget(paragraph, centered_rect(height, area));
}

/// The half-open range of line indices shown around the current one.
fn window_bounds(len: usize, index: usize, context_lines: usize) -> (usize, usize) {
    let start = index.saturating_sub(context_lines);
    let end = len.min(index.saturating_add(context_lines).saturating_add(1));
    (start, end)
}

/// Compute a full-width, vertically centered rectangle within `r`.
fn centered_rect(height: u16, r: Rect) -> Rect {
    let height = height.min(r.height);
    let y = r.y + (r.height.saturating_sub(height) / 2);
    Rect {
        x: r.x,
        y,
        width: r.width,
        height,
    }
}
