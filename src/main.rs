use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};

use dispatch_view::controller::Controller;
use dispatch_view::domain::{DVConfig, DVError};
use dispatch_view::loader::{expand_path, load_data_file};
use dispatch_view::logging::init_tracing;
use dispatch_view::mock;
use dispatch_view::model::{Model, Status};
use dispatch_view::ui::TableUI;

/// Browse incident tables, csv, parquet or arrow files in the terminal.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Data file to show, the built-in incident list if omitted
    path: Option<String>,

    /// Show a built-in data set instead of a file
    #[arg(long, conflicts_with = "path", value_parser = mock::BUILTIN_NAMES)]
    builtin: Option<String>,

    /// Rows per page, 0 fits the page to the screen
    #[arg(short, long, default_value_t = 0)]
    page_size: usize,

    #[arg(long, default_value_t = 40)]
    max_column_width: usize,

    /// Milliseconds to wait for terminal events
    #[arg(long, default_value_t = 100)]
    poll_ms: u64,

    /// Write traces to this file
    #[arg(long)]
    log_file: Option<String>,

    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Err(e) => {
            ratatui::restore();
            error!("Exiting with error: {e:?}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => {
            ratatui::restore();
            ExitCode::SUCCESS
        }
    }
}

fn run(args: Args) -> Result<(), DVError> {
    let log_file = args.log_file.as_deref().map(expand_path).transpose()?;
    init_tracing(log_file.as_deref(), &args.log_level)?;

    let cfg = DVConfig::default()
        .page_size(args.page_size)
        .max_column_width(args.max_column_width)
        .event_poll_time(args.poll_ms);

    let (data, reference_time) = match &args.path {
        Some(path) => (load_data_file(expand_path(path)?)?, None),
        None => {
            let name = args.builtin.as_deref().unwrap_or("incidents");
            let unknown = DVError::InvalidArgument(format!("Unknown data set {name}"));
            (mock::builtin(name).ok_or(unknown)?, mock::reference_time())
        }
    };
    info!("Showing {} with {} records", data.name, data.records.len());

    let mut terminal = ratatui::init();
    let area = terminal.size()?;
    let mut model = Model::init(&cfg, data, area.width as usize, area.height as usize)?;
    if let Some(time) = reference_time {
        model = model.with_reference_time(time);
    }
    let ui = TableUI::new(&cfg);
    let controller = Controller::new(&cfg);

    while model.status != Status::QUITTING {
        terminal.draw(|f| ui.draw(&model, f))?;
        let message = controller.handle_event(&model)?;
        model.update(message)?;
    }
    info!("Bye");
    Ok(())
}
