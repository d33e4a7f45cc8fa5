use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;
use std::fmt;
use std::io::Error;

pub const HELP_TEXT: &str = "\
Navigation
  ↑ ↓ ← → / hjkl   Move selection
  PgUp / PgDn      Previous / next page
  g / G            First / last page
  Enter            Show record
  m                Map of the filtered records
  Esc              Back

Table
  s                Sort by current column (again to reverse)
  S                Clear sorting
  /                Search all columns
  f                Filter current column
  c                Clear search and filters
  y / Y            Copy cell / row

Commands (:)
  page N           Jump to page N
  size N           Rows per page, 0 fits the screen
  sort COLUMN      Sort by column
  filter COL TERM  Filter a column, empty TERM clears it
  clear            Clear search and filters
  data NAME        Show incidents, personnel or equipment

  ?                This help
  q                Quit";

#[derive(Debug)]
pub enum DVError {
    IoError(Error),
    PolarsError(PolarsError),
    LoadingFailed(String),
    FileNotFound,
    PermissionDenied,
    UnknownFileType,
    InvalidArgument(String),
}

impl fmt::Display for DVError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DVError::IoError(e) => write!(f, "I/O error: {}", e),
            DVError::PolarsError(e) => write!(f, "Could not read data: {}", e),
            DVError::LoadingFailed(msg) => write!(f, "Loading failed: {}", msg),
            DVError::FileNotFound => write!(f, "File not found"),
            DVError::PermissionDenied => write!(f, "Permission denied"),
            DVError::UnknownFileType => {
                write!(f, "Unknown file type, expected csv, parquet or arrow")
            }
            DVError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
        }
    }
}

impl std::error::Error for DVError {}

impl From<Error> for DVError {
    fn from(err: Error) -> Self {
        DVError::IoError(err)
    }
}

impl From<PolarsError> for DVError {
    fn from(err: PolarsError) -> Self {
        DVError::PolarsError(err)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    PreviousPage,
    NextPage,
    FirstPage,
    LastPage,
    ToggleSort,
    ClearSort,
    Search,
    Filter,
    ClearFilters,
    EnterCommand,
    Enter,
    Exit,
    Map,
    Help,
    CopyCell,
    CopyRow,
    Resize(usize, usize),
    RawKey(KeyEvent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CMDMode {
    Search,
    FilterColumn,
    Raw,
}

impl CMDMode {
    pub fn prompt(&self) -> &'static str {
        match self {
            CMDMode::Search => "/",
            CMDMode::FilterColumn => "filter: ",
            CMDMode::Raw => ":",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Setters)]
pub struct DVConfig {
    /// Milliseconds to wait for a terminal event before redrawing
    pub event_poll_time: u64,
    /// Rows per page, 0 fits the page to the screen
    pub page_size: usize,
    pub max_column_width: usize,
    /// How long a status message stays visible, in seconds
    pub status_message_timeout: u64,
}

impl Default for DVConfig {
    fn default() -> Self {
        Self {
            event_poll_time: 100,
            page_size: 0,
            max_column_width: 40,
            status_message_timeout: 5,
        }
    }
}
