//! Paginated, sortable and filterable record tables with geo helpers for
//! dispatch style data, plus the terminal viewer built on top of them.

pub mod controller;
pub mod domain;
pub mod format;
pub mod geo;
pub mod inputter;
pub mod loader;
pub mod logging;
pub mod mock;
pub mod model;
pub mod table;
pub mod ui;
