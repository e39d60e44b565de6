use std::io::{self, BufRead, Write};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    chart::{ChartKind, RenderError},
    metrics::{select_by_name, DerivedRecord, MetricsError, SelectError},
    renderer::Renderer,
};

pub const DEFAULT_FILE_PATH: &str = "ecommerce_data.csv";

const FILE_PROMPT: &str =
    "Enter the path to the ecommerce data CSV file (or press Enter for default): ";
const CHART_PROMPT: &str = "\nEnter the type of chart you want to view (bar/pie/line/hist): ";
const METRIC_PROMPT: &str =
    "\nEnter the type of data you want to view (profit/revenue/loss/sales): ";
const CONTINUE_PROMPT: &str = "\nDo you want to change the chart? (yes/no): ";

/// Why a single chart attempt was abandoned.
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error(transparent)]
    Select(#[from] SelectError),

    #[error("Error plotting data: {0}")]
    Data(#[from] MetricsError),

    #[error("Error during plotting: {0}")]
    Render(#[from] RenderError),
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum State {
    AwaitingChartType,
    AwaitingMetricType(ChartKind),
    Rendered,
    AwaitingContinue,
    Terminated,
}

/// The prompt loop: pick a chart, pick a metric, draw, ask to go again.
pub struct Session<'a, R: Renderer> {
    derived: Result<&'a [DerivedRecord], &'a MetricsError>,
    renderer: R,
    state: State,
}

impl<'a, R: Renderer> Session<'a, R> {
    pub fn new(derived: Result<&'a [DerivedRecord], &'a MetricsError>, renderer: R) -> Self {
        Session {
            derived,
            renderer,
            state: State::AwaitingChartType,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> State {
        self.state
    }

    /// Drives the loop until the user declines to continue or input runs out.
    pub fn run<I: BufRead, O: Write>(&mut self, input: &mut I, output: &mut O) -> io::Result<()> {
        while self.state != State::Terminated {
            self.state = self.step(input, output)?;
        }

        Ok(())
    }

    fn step<I: BufRead, O: Write>(&mut self, input: &mut I, output: &mut O) -> io::Result<State> {
        let next = match self.state {
            State::AwaitingChartType => match prompt(input, output, CHART_PROMPT)? {
                None => State::Terminated,
                Some(answer) => match answer.parse::<ChartKind>() {
                    Ok(kind) => State::AwaitingMetricType(kind),
                    Err(err) => {
                        writeln!(output, "{err}")?;
                        State::AwaitingChartType
                    }
                },
            },
            State::AwaitingMetricType(kind) => match prompt(input, output, METRIC_PROMPT)? {
                None => State::Terminated,
                Some(answer) => match self.attempt(kind, &answer) {
                    Ok(()) => State::Rendered,
                    Err(err) => {
                        warn!(%kind, error = %err, "chart attempt abandoned");
                        writeln!(output, "{err}")?;
                        State::AwaitingChartType
                    }
                },
            },
            State::Rendered => State::AwaitingContinue,
            State::AwaitingContinue => match prompt(input, output, CONTINUE_PROMPT)? {
                Some(answer) if answer.trim().eq_ignore_ascii_case("yes") => {
                    State::AwaitingChartType
                }
                _ => State::Terminated,
            },
            State::Terminated => State::Terminated,
        };

        Ok(next)
    }

    fn attempt(&mut self, kind: ChartKind, metric: &str) -> Result<(), AttemptError> {
        let derived = self.derived.map_err(Clone::clone)?;
        let series = select_by_name(derived, metric)?;
        self.renderer.render(kind, &series)?;

        info!(%kind, metric = %series.metric, points = series.len(), "rendered chart");

        Ok(())
    }
}

/// Asks for the input file, falling back to [`DEFAULT_FILE_PATH`] on a blank answer.
pub fn read_file_path<I: BufRead, O: Write>(input: &mut I, output: &mut O) -> io::Result<String> {
    let answer = prompt(input, output, FILE_PROMPT)?.unwrap_or_default();
    let trimmed = answer.trim();
    if trimmed.is_empty() {
        Ok(DEFAULT_FILE_PATH.to_owned())
    } else {
        Ok(trimmed.to_owned())
    }
}

// `None` once input is exhausted.
fn prompt<I: BufRead, O: Write>(
    input: &mut I,
    output: &mut O,
    question: &str,
) -> io::Result<Option<String>> {
    write!(output, "{question}")?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }

    Ok(Some(line))
}
