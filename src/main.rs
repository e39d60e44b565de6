use std::{error::Error, io};

mod chart;
mod metrics;
mod records;
mod renderer;
mod session;
mod summary;

use metrics::derive;
use records::{load_records, CsvSource};
use renderer::TerminalRenderer;
use session::{read_file_path, Session};
use summary::{describe, write_preview, write_summary, PREVIEW_ROWS};

fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();

    println!("E-commerce Data Analysis and Visualization");

    let mut input = io::stdin().lock();
    let mut output = io::stdout();

    let file_path = read_file_path(&mut input, &mut output)?;
    let records = match load_records(&CsvSource::new(&file_path)) {
        Ok(records) => records,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    let derived = derive(&records);
    match &derived {
        Ok(derived) => {
            println!("First few rows of the dataset:");
            write_preview(derived, PREVIEW_ROWS, io::stdout())?;

            println!("\nSummary of the dataset:");
            write_summary(&describe(derived), io::stdout())?;
        }
        Err(err) => println!("Error plotting data: {err}"),
    }

    Session::new(derived.as_deref(), TerminalRenderer).run(&mut input, &mut output)?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();
}
