//! Generic table engine: sort, filter and paginate in-memory records.
//!
//! The engine is generic over the record type. Columns describe how to pull a
//! [`Value`] out of a record, every other step works on those values.

mod column;
mod engine;
mod state;
mod value;

pub use self::column::{Accessor, ColumnSpec, Record, Renderer};
pub use self::engine::{
    TableQuery, TableView, compute_view, filter_rows, filtered_rows, sort_rows,
};
pub use self::state::{FilterState, PageState, SortDirection, SortState};
pub use self::value::Value;
