use {
    crate::{
        channel::EventChannel,
        store::SharedStore,
        ui::layout::{render_layout, StatusLine},
    },
    crossterm::event::{Event, KeyCode},
    ratatui::{backend::CrosstermBackend, Terminal},
    std::{num::NonZeroUsize, sync::Arc, time::Duration},
    tokio::sync::watch,
};

/// Longest gap between redraws when nothing changes
const IDLE_REFRESH: Duration = Duration::from_secs(1);

/// Keyboard poll granularity
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Run the dashboard event loop
///
/// Redraws when the store revision moves (bursts coalesce into one frame per
/// poll) and at least once per second. `q`/`Esc` quit, `r` resets the session.
pub async fn run_ui(
    store: SharedStore,
    channel: Arc<EventChannel>,
    top_n: NonZeroUsize,
    source: &'static str,
    stream_ended: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error>> {
    let stdout = std::io::stdout();
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    crossterm::terminal::enable_raw_mode()?;

    // Alternate screen keeps stderr logs off the dashboard buffer
    crossterm::execute!(
        std::io::stdout(),
        crossterm::terminal::EnterAlternateScreen,
        crossterm::cursor::Hide
    )?;

    terminal.clear()?;

    let result = draw_loop(&mut terminal, &store, &channel, top_n, source, &stream_ended).await;

    crossterm::execute!(
        std::io::stdout(),
        crossterm::terminal::LeaveAlternateScreen,
        crossterm::cursor::Show
    )?;
    crossterm::terminal::disable_raw_mode()?;
    result
}

async fn draw_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    store: &SharedStore,
    channel: &EventChannel,
    top_n: NonZeroUsize,
    source: &'static str,
    stream_ended: &watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut drawn_revision = None;
    let mut last_draw = tokio::time::Instant::now();

    loop {
        if crossterm::event::poll(Duration::ZERO)? {
            match crossterm::event::read()? {
                Event::Key(key) => match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => break,
                    KeyCode::Char('r') => {
                        store.reset();
                        drawn_revision = None;
                    }
                    _ => {}
                },
                Event::Resize(_, _) => drawn_revision = None,
                _ => {}
            }
        }

        let revision = store.revision();
        if drawn_revision != Some(revision) || last_draw.elapsed() >= IDLE_REFRESH {
            let snapshot = store.snapshot(top_n);
            let status = StatusLine {
                stats: channel.stats(),
                source,
                stream_ended: *stream_ended.borrow(),
            };
            let area = terminal.size()?;
            terminal.draw(|f| render_layout(f, area, &snapshot, status))?;

            drawn_revision = Some(snapshot.revision);
            last_draw = tokio::time::Instant::now();
        }

        // Yield to the runtime between polls so the pump keeps ingesting
        tokio::time::sleep(POLL_INTERVAL).await;
    }

    Ok(())
}
