use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use tracing::debug;

use crate::{
    chart::{self, ChartKind, Plot, RenderError},
    metrics::AggregatedSeries,
};

/// Draws one series as the requested kind of chart.
pub trait Renderer {
    fn render(&mut self, kind: ChartKind, series: &AggregatedSeries) -> Result<(), RenderError>;
}

impl<R: Renderer + ?Sized> Renderer for &mut R {
    fn render(&mut self, kind: ChartKind, series: &AggregatedSeries) -> Result<(), RenderError> {
        (**self).render(kind, series)
    }
}

/// Shows charts full-screen in the current terminal until a key is pressed.
#[derive(Debug, Default)]
pub struct TerminalRenderer;

impl Renderer for TerminalRenderer {
    fn render(&mut self, kind: ChartKind, series: &AggregatedSeries) -> Result<(), RenderError> {
        let plot = Plot::new(kind, series)?;

        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if let Err(err) = execute!(stdout, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(err.into());
        }

        let shown = show(&plot);

        // The terminal has to be handed back even when drawing failed.
        let restored = execute!(io::stdout(), LeaveAlternateScreen).and(disable_raw_mode());
        shown?;
        restored?;

        Ok(())
    }
}

fn show(plot: &Plot) -> Result<(), RenderError> {
    let mut terminal: Terminal<CrosstermBackend<Stdout>> =
        Terminal::new(CrosstermBackend::new(io::stdout()))?;
    terminal.clear()?;

    debug!(kind = %plot.kind, title = %plot.title, "showing chart");

    loop {
        terminal.draw(|frame| {
            let area = frame.size();
            chart::draw(frame, area, plot);
        })?;

        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => break,
            _ => {}
        }
    }

    Ok(())
}
