use arboard::Clipboard;
use chrono::{Local, NaiveDateTime};
use ratatui::style::Color;
use std::time::Instant;
use tracing::{debug, info, trace};

use crate::domain::{CMDMode, DVConfig, DVError, HELP_TEXT, Message};
use crate::format::{format_file_size, format_severity, format_status, format_time_ago};
use crate::geo::{
    Bounds, Coordinates, Pixel, calculate_bounds, calculate_center, calculate_distance,
    calculate_zoom_level, compass_point, coordinate_to_pixel, format_coordinates, get_bearing,
    pixel_to_coordinate, preset_for,
};
use crate::inputter::{InputResult, Inputter};
use crate::loader::Dataset;
use crate::mock;
use crate::table::{SortDirection, TableQuery, Value, filtered_rows};
use crate::ui::{
    CMDLINE_HEIGH, COLUMN_WIDTH_MARGIN, MAP_INFO_WIDTH, SCROLLBAR_WIDTH, STATUSLINE_HEIGHT,
    TABLE_HEADER_HEIGHT,
};

/// Approximate size of a terminal cell in screen pixels, for zoom levels
const CELL_WIDTH_PX: f64 = 8.0;
const CELL_HEIGHT_PX: f64 = 16.0;

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    TABLE,
    RECORD,
    MAP,
    POPUP,
    CMDINPUT,
}

/// Which screen the UI draws below popups and the command line.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum View {
    #[default]
    Table,
    Record,
    Map,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderView {
    pub label: String,
    pub width: usize,
    pub sort: Option<SortDirection>,
    pub filtered: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CellView {
    pub text: String,
    pub color: Option<Color>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerView {
    pub x: u16,
    pub y: u16,
    pub color: Color,
    pub selected: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MapData {
    pub markers: Vec<MarkerView>,
    pub info: Vec<String>,
}

#[derive(Default, Clone, Debug)]
pub struct UILayout {
    pub width: usize,
    pub height: usize,
    pub table_width: usize,
    pub table_height: usize,
    pub map_width: usize,
    pub map_height: usize,
    pub statusline_width: usize,
}

impl UILayout {
    pub fn from_values(ui_width: usize, ui_height: usize) -> Self {
        let bars = STATUSLINE_HEIGHT + CMDLINE_HEIGH;
        let layout = UILayout {
            width: ui_width,
            height: ui_height,
            table_width: ui_width.saturating_sub(SCROLLBAR_WIDTH),
            table_height: ui_height.saturating_sub(bars + TABLE_HEADER_HEIGHT),
            // Map and info panel are bordered
            map_width: ui_width.saturating_sub(MAP_INFO_WIDTH + 2),
            map_height: ui_height.saturating_sub(bars + 2),
            statusline_width: ui_width,
        };
        trace!("Build UILayout: {:?}", layout);
        layout
    }
}

pub struct UIData {
    pub name: String,
    pub view: View,
    pub header: Vec<HeaderView>,
    pub rows: Vec<Vec<CellView>>,
    pub selected_row: usize,
    pub selected_column: usize,
    /// Position of the scrollbar: selected row and row count of the page
    pub scroll: (usize, usize),
    pub summary: String,
    pub record: Vec<(String, String)>,
    pub map: MapData,
    pub show_popup: bool,
    pub popup_message: String,
    pub layout: UILayout,
    pub last_update: Instant,
    pub active_cmdinput: bool,
    pub status_message: String,
    pub last_status_message_update: Instant,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            name: String::new(),
            view: View::Table,
            header: Vec::new(),
            rows: Vec::new(),
            selected_row: 0,
            selected_column: 0,
            scroll: (0, 0),
            summary: String::new(),
            record: Vec::new(),
            map: MapData::default(),
            show_popup: false,
            popup_message: String::new(),
            layout: UILayout::default(),
            last_update: Instant::now(),
            active_cmdinput: false,
            status_message: String::new(),
            last_status_message_update: Instant::now(),
        }
    }
}

/// One page of the table as computed by the engine.
#[derive(Default)]
struct PageView {
    rows: Vec<usize>, // Record indices on the current page
    total_filtered: usize,
    total_pages: usize,
    range: Option<(usize, usize, usize)>,
}

struct RecordView {
    rows: Vec<usize>, // Filtered record indices at the time the view was opened
    position: usize,  // Index into rows
    curser_row: usize,
    curser_offset: usize,
}

struct MapView {
    rows: Vec<usize>, // Filtered records that have coordinates
    coords: Vec<Coordinates>,
    bounds: Bounds,
    center: Coordinates,
    selected: usize,
}

pub struct Model {
    config: DVConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    data: Dataset,
    query: TableQuery,
    page: PageView,
    curser_row: usize,    // Row on the current page
    offset_row: usize,    // First page row on screen
    curser_column: usize, // Absolute column index
    offset_column: usize,
    visible_columns: Vec<(usize, usize)>, // (column idx, render width)
    center: Option<Coordinates>,
    reference_time: NaiveDateTime,
    record_view: Option<RecordView>,
    map_view: Option<MapView>,
    uilayout: UILayout,
    uidata: UIData,
    clipboard: Option<Clipboard>,
    input: Inputter,
    cmd_mode: Option<CMDMode>,
    last_input: InputResult,
    active_cmdinput: bool,
    status_message: String,
    last_status_message_update: Instant,
}

impl Model {
    pub fn init(
        config: &DVConfig,
        data: Dataset,
        ui_width: usize,
        ui_height: usize,
    ) -> Result<Self, DVError> {
        if data.columns.is_empty() {
            return Err(DVError::LoadingFailed(format!("{} has no columns", data.name)));
        }
        let clipboard = match Clipboard::new() {
            Ok(c) => Some(c),
            Err(e) => {
                debug!("No clipboard available: {e:?}");
                None
            }
        };

        let center = Self::data_center(&data);
        let greeting = match data.file_size {
            Some(size) => format!(
                "Loaded {} records ({}) ...",
                data.records.len(),
                format_file_size(size)
            ),
            None => format!("Loaded {} records ...", data.records.len()),
        };

        let mut input = Inputter::default();
        input.set_width(ui_width);

        let mut model = Self {
            config: config.clone(),
            status: Status::READY,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            data,
            query: TableQuery::default(),
            page: PageView::default(),
            curser_row: 0,
            offset_row: 0,
            curser_column: 0,
            offset_column: 0,
            visible_columns: Vec::new(),
            center,
            reference_time: Local::now().naive_local(),
            record_view: None,
            map_view: None,
            uilayout: UILayout::from_values(ui_width, ui_height),
            uidata: UIData::empty(),
            clipboard,
            input,
            cmd_mode: None,
            last_input: InputResult::default(),
            active_cmdinput: false,
            status_message: String::new(),
            last_status_message_update: Instant::now(),
        };
        model.recompute();
        model.set_status_message(greeting);
        Ok(model)
    }

    // Mean position of the records that have one
    fn data_center(data: &Dataset) -> Option<Coordinates> {
        let coords: Vec<Coordinates> = (0..data.records.len())
            .filter_map(|idx| data.coordinates(idx))
            .collect();
        (!coords.is_empty()).then(|| calculate_center(&coords))
    }

    /// Show another data set. Search, filters, sorting and open views are
    /// reset, the page size and reference time are kept.
    pub fn replace_data(&mut self, data: Dataset) -> Result<(), DVError> {
        if data.columns.is_empty() {
            return Err(DVError::LoadingFailed(format!("{} has no columns", data.name)));
        }
        let count = data.records.len();
        info!("Switching to {} with {count} records", data.name);
        self.center = Self::data_center(&data);
        self.data = data;
        self.query = TableQuery::default();
        self.record_view = None;
        self.map_view = None;
        self.modus = Modus::TABLE;
        self.previous_modus = Modus::TABLE;
        self.curser_row = 0;
        self.offset_row = 0;
        self.curser_column = 0;
        self.offset_column = 0;
        self.visible_columns = self.layout_columns(0);
        self.recompute();
        let message = format!("Showing {}", self.data.name);
        self.set_status_message(message);
        Ok(())
    }

    /// Time relative ages are measured against, defaults to now.
    pub fn with_reference_time(mut self, time: NaiveDateTime) -> Self {
        self.reference_time = time;
        self.update_view();
        self
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    /// Prompt, visible input and cursor offset of an active command line.
    pub fn cmdline(&self) -> Option<(&'static str, String, usize)> {
        let mode = self.cmd_mode.filter(|_| self.active_cmdinput)?;
        let prompt = mode.prompt();
        let (text, cursor) = self.input.visible(prompt.chars().count());
        Some((prompt, text, cursor))
    }

    pub fn raw_keyevents(&self) -> bool {
        self.active_cmdinput
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    fn page_size(&self) -> usize {
        match self.config.page_size {
            0 => self.uilayout.table_height.max(1),
            n => n,
        }
    }

    // Run the table engine for the current query. Only called when sort,
    // filter, search, page or page size changed.
    fn recompute(&mut self) {
        self.query.page.page_size = self.page_size();
        let mut view = self.query.compute(&self.data.records, &self.data.columns);
        if view.total_pages > 0 && view.rows.is_empty() {
            // Out of range after the data shrank or the page size grew
            self.query.page.clamp_to(view.total_pages);
            view = self.query.compute(&self.data.records, &self.data.columns);
        }
        self.page = PageView {
            range: view.range_label(),
            rows: view.rows,
            total_filtered: view.total_filtered_count,
            total_pages: view.total_pages,
        };
        self.curser_row = std::cmp::min(self.curser_row, self.page.rows.len().saturating_sub(1));
        self.update_table_data();
    }

    fn update_view(&mut self) {
        let view = match self.modus {
            Modus::POPUP | Modus::CMDINPUT => self.previous_modus,
            modus => modus,
        };
        match view {
            Modus::RECORD => self.update_record_data(),
            Modus::MAP => self.update_map_data(),
            _ => self.update_table_data(),
        }
    }

    // -------------------- Table ---------------------- //

    fn column_width(&self, idx: usize) -> usize {
        let column = &self.data.columns[idx];
        let label = column.label.chars().count() + 2; // Room for the sort arrow
        let width = column.width.unwrap_or(label).max(label);
        std::cmp::min(width, self.config.max_column_width.max(3))
    }

    // Columns starting at offset_column that fit into the table width, the last
    // one may be cut
    fn layout_columns(&self, offset: usize) -> Vec<(usize, usize)> {
        let table_width = self.uilayout.table_width;
        let mut visible = Vec::new();
        let mut used = 0;
        for idx in offset..self.data.columns.len() {
            let width = self.column_width(idx);
            if used + width + COLUMN_WIDTH_MARGIN <= table_width {
                visible.push((idx, width));
                used += width + COLUMN_WIDTH_MARGIN;
            } else {
                if used < table_width {
                    visible.push((idx, table_width - used));
                }
                break;
            }
        }
        visible
    }

    fn is_fully_visible(&self, column: usize) -> bool {
        self.visible_columns
            .iter()
            .any(|&(idx, width)| idx == column && width == self.column_width(idx))
    }

    fn update_table_data(&mut self) {
        self.visible_columns = self.layout_columns(self.offset_column);

        // Keep the cursor row on screen
        let height = self.uilayout.table_height.max(1);
        if self.curser_row < self.offset_row {
            self.offset_row = self.curser_row;
        } else if self.curser_row >= self.offset_row + height {
            self.offset_row = self.curser_row + 1 - height;
        }
        let rbegin = std::cmp::min(self.offset_row, self.page.rows.len());
        let rend = std::cmp::min(rbegin + height, self.page.rows.len());

        trace!(
            "Table: Cr {}, Cc {}, Or {}, Oc {}, Rb {}, Re {}, page {}/{}",
            self.curser_row,
            self.curser_column,
            self.offset_row,
            self.offset_column,
            rbegin,
            rend,
            self.query.page.current_page,
            self.page.total_pages,
        );

        let header = self
            .visible_columns
            .iter()
            .map(|&(idx, width)| {
                let column = &self.data.columns[idx];
                HeaderView {
                    label: column.label.clone(),
                    width,
                    sort: self
                        .query
                        .sort
                        .is_sorted_by(&column.key)
                        .then_some(self.query.sort.direction),
                    filtered: self.query.filters.get(&column.key).is_some(),
                }
            })
            .collect();

        let rows = self.page.rows[rbegin..rend]
            .iter()
            .map(|&ridx| {
                let record = &self.data.records[ridx];
                self.visible_columns
                    .iter()
                    .map(|&(idx, _)| {
                        let column = &self.data.columns[idx];
                        let text = column.render(record);
                        let color = match column.key.to_lowercase().as_str() {
                            "severity" => Some(format_severity(&text).color),
                            "status" => Some(format_status(&text).color),
                            _ => None,
                        };
                        CellView { text, color }
                    })
                    .collect()
            })
            .collect();

        let selected_column = self
            .visible_columns
            .iter()
            .position(|&(idx, _)| idx == self.curser_column)
            .unwrap_or(0);

        self.uidata.name = self.data.name.clone();
        self.uidata.view = View::Table;
        self.uidata.header = header;
        self.uidata.rows = rows;
        self.uidata.selected_row = self.curser_row - rbegin.min(self.curser_row);
        self.uidata.selected_column = selected_column;
        self.uidata.scroll = (self.curser_row, self.page.rows.len());
        self.uidata.summary = self.table_summary();
        self.refresh_uidata();
    }

    /// One line description of the current page, search, sort and filters.
    pub fn table_summary(&self) -> String {
        let current = match self.page.total_pages {
            0 => 0,
            _ => self.query.page.current_page,
        };
        let mut parts = vec![format!("Page {current}/{}", self.page.total_pages)];
        parts.push(match self.page.range {
            Some((first, last, total)) => format!("{first}-{last} of {total}"),
            None => "no matches".to_string(),
        });
        if self.page.total_filtered != self.data.records.len() {
            parts.push(format!("{} total", self.data.records.len()));
        }
        if let Some(key) = &self.query.sort.key {
            parts.push(format!("sort: {} {}", key, self.query.sort.direction.arrow()));
        }
        if !self.query.search.is_empty() {
            parts.push(format!("search: \"{}\"", self.query.search));
        }
        if !self.query.filters.is_empty() {
            parts.push(format!("filter: {}", self.query.filters));
        }
        parts.join(" │ ")
    }

    fn refresh_uidata(&mut self) {
        self.uidata.layout = self.uilayout.clone();
        self.uidata.active_cmdinput = self.active_cmdinput;
        self.uidata.status_message = self.status_message.clone();
        self.uidata.last_status_message_update = self.last_status_message_update;
        self.uidata.last_update = Instant::now();
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.last_status_message_update = Instant::now();
        self.refresh_uidata();
    }

    fn selected_record(&self) -> Option<usize> {
        self.page.rows.get(self.curser_row).copied()
    }

    fn move_table_selection_up(&mut self) {
        if self.curser_row > 0 {
            self.curser_row -= 1;
            self.update_table_data();
        } else if self.query.page.current_page > 1 {
            self.query.page.prev();
            self.curser_row = usize::MAX;
            self.recompute();
        }
    }

    fn move_table_selection_down(&mut self) {
        if self.curser_row + 1 < self.page.rows.len() {
            self.curser_row += 1;
            self.update_table_data();
        } else if self.query.page.current_page < self.page.total_pages {
            self.query.page.next(self.page.total_pages);
            self.curser_row = 0;
            self.offset_row = 0;
            self.recompute();
        }
    }

    fn move_table_selection_left(&mut self) {
        if self.curser_column > 0 {
            self.curser_column -= 1;
            if self.curser_column < self.offset_column {
                self.offset_column = self.curser_column;
            }
            self.update_table_data();
        }
    }

    fn move_table_selection_right(&mut self) {
        if self.curser_column + 1 < self.data.columns.len() {
            self.curser_column += 1;
            // Scroll until the selected column is completely on screen
            while !self.is_fully_visible(self.curser_column)
                && self.offset_column < self.curser_column
            {
                self.offset_column += 1;
                self.visible_columns = self.layout_columns(self.offset_column);
            }
            self.update_table_data();
        }
    }

    fn goto_page(&mut self, page: usize) {
        self.query.page.current_page = page;
        self.query.page.clamp_to(self.page.total_pages);
        self.curser_row = 0;
        self.offset_row = 0;
        self.recompute();
    }

    fn next_page(&mut self) {
        self.goto_page(self.query.page.current_page + 1);
    }

    fn previous_page(&mut self) {
        self.goto_page(self.query.page.current_page.saturating_sub(1));
    }

    fn toggle_sort(&mut self) {
        let column = &self.data.columns[self.curser_column];
        if !column.sortable {
            let message = format!("{} is not sortable", column.label);
            self.set_status_message(message);
            return;
        }
        let key = column.key.clone();
        self.query.sort.toggle(&key);
        info!("Sorting by {} {:?}", key, self.query.sort.direction);
        self.recompute();
    }

    fn clear_sort(&mut self) {
        self.query.sort.clear();
        self.recompute();
    }

    // Filtering always starts over at the first page
    fn reset_to_first_page(&mut self) {
        self.query.page.first();
        self.curser_row = 0;
        self.offset_row = 0;
        self.recompute();
        let message = match self.page.total_filtered {
            0 => "Found no matches!".to_string(),
            n => format!("Found {n} results"),
        };
        self.set_status_message(message);
    }

    fn search(&mut self, term: &str) {
        trace!("Starting search for {} ...", term);
        if self.query.search != term {
            self.query.search = term.to_string();
            self.reset_to_first_page();
        }
    }

    fn filter(&mut self, key: &str, term: &str) -> Result<(), DVError> {
        let idx = self
            .data
            .column_index(key)
            .ok_or_else(|| DVError::InvalidArgument(format!("Unknown column {key}")))?;
        let column = &self.data.columns[idx];
        if !column.filterable {
            return Err(DVError::InvalidArgument(format!(
                "{} is not filterable",
                column.label
            )));
        }
        let key = column.key.clone();
        trace!("Filter {} by \"{}\" ...", key, term);
        if self.query.filters.set(key, term) {
            self.reset_to_first_page();
        }
        Ok(())
    }

    fn clear_filters(&mut self) {
        self.query.search.clear();
        self.query.filters.clear();
        self.reset_to_first_page();
    }

    fn copy_table_cell(&mut self) {
        let Some(ridx) = self.selected_record() else {
            return;
        };
        let cell = self.data.columns[self.curser_column].render(&self.data.records[ridx]);
        self.copy_to_clipboard(cell);
    }

    fn wrap_cell_content(c: &str) -> String {
        let needs_escaping = c.contains('"');
        let needs_wrapping = c.chars().any(|c| c == ' ' || c == '\t' || c == ',');
        let mut out = c.to_string();

        if needs_escaping {
            out = out.replace('"', "\"\"");
        }
        if needs_wrapping || needs_escaping {
            out = format!("\"{out}\"");
        }
        out
    }

    fn copy_table_row(&mut self) {
        let Some(ridx) = self.selected_record() else {
            return;
        };
        let record = &self.data.records[ridx];
        let content = self
            .data
            .columns
            .iter()
            .map(|c| Model::wrap_cell_content(&c.value(record).to_display_string()))
            .collect::<Vec<String>>();
        self.copy_to_clipboard(content.join(","));
    }

    fn copy_to_clipboard(&mut self, content: String) {
        trace!("Copy: {}", content);
        let result = match self.clipboard.as_mut() {
            Some(clipboard) => clipboard.set_text(content).map_err(|e| format!("{e:?}")),
            None => Err("no clipboard".to_string()),
        };
        match result {
            Ok(_) => self.set_status_message("Copied to clipboard."),
            Err(e) => {
                debug!("Error copying to clipboard: {e}");
                self.set_status_message("Copy failed, no clipboard available.");
            }
        }
    }

    // -------------------- Record ---------------------- //

    fn build_record_view(&mut self) {
        let Some(ridx) = self.selected_record() else {
            return;
        };
        let rows = filtered_rows(
            &self.data.records,
            &self.data.columns,
            &self.query.sort,
            &self.query.filters,
            &self.query.search,
        );
        let position = rows.iter().position(|&r| r == ridx).unwrap_or(0);
        trace!("Building record view for record {ridx} ...");
        self.open_record_view(rows, position);
    }

    fn open_record_view(&mut self, rows: Vec<usize>, position: usize) {
        self.record_view = Some(RecordView {
            rows,
            position,
            curser_row: 0,
            curser_offset: 0,
        });
        self.previous_modus = self.modus;
        self.modus = Modus::RECORD;
        self.update_record_data();
    }

    /// Field/value pairs of a record, with position details when it has
    /// coordinates.
    fn record_fields(&self, ridx: usize) -> Vec<(String, String)> {
        let record = &self.data.records[ridx];
        let mut fields: Vec<(String, String)> = self
            .data
            .columns
            .iter()
            .map(|c| {
                let mut text = c.render(record);
                if let Value::Date(d) = c.value(record) {
                    text = format!("{} ({})", text, format_time_ago(&d, &self.reference_time));
                }
                (c.label.clone(), text)
            })
            .collect();

        if let Some(position) = self.data.coordinates(ridx) {
            fields.push(("Position".to_string(), format_coordinates(&position, 4)));
            if let Some(center) = self.center {
                let bearing = get_bearing(&center, &position);
                fields.push((
                    "From center".to_string(),
                    format!(
                        "{:.2} km, {:.0}° {}",
                        calculate_distance(&center, &position),
                        bearing,
                        compass_point(bearing)
                    ),
                ));
            }
            if let Some(preset) = preset_for(&position) {
                fields.push(("Area".to_string(), preset.name.to_string()));
            }
        }
        fields
    }

    fn update_record_data(&mut self) {
        let Some(record) = &self.record_view else {
            return;
        };
        let Some(&ridx) = record.rows.get(record.position) else {
            return;
        };
        let fields = self.record_fields(ridx);
        let height = self.uilayout.table_height.max(1);
        let rbegin = std::cmp::min(record.curser_offset, fields.len());
        let rend = std::cmp::min(rbegin + height, fields.len());
        trace!(
            "Record: pos {}/{}, rb {}, re {}",
            record.position + 1,
            record.rows.len(),
            rbegin,
            rend
        );

        self.uidata.name = format!(
            "R[{}] {}/{}",
            self.data.name,
            record.position + 1,
            record.rows.len()
        );
        self.uidata.view = View::Record;
        self.uidata.selected_row = record.curser_row;
        self.uidata.scroll = (record.curser_offset + record.curser_row, fields.len());
        self.uidata.record = fields[rbegin..rend].to_vec();
        self.refresh_uidata();
    }

    fn move_record_selection(&mut self, up: bool) {
        let height = self.uilayout.table_height.max(1);
        let nfields = self
            .record_view
            .as_ref()
            .and_then(|r| r.rows.get(r.position))
            .map(|&ridx| self.record_fields(ridx).len());
        let (Some(record), Some(nfields)) = (self.record_view.as_mut(), nfields) else {
            return;
        };
        let absolute = record.curser_offset + record.curser_row;
        let target = if up {
            absolute.saturating_sub(1)
        } else {
            std::cmp::min(absolute + 1, nfields.saturating_sub(1))
        };
        if target < record.curser_offset {
            record.curser_offset = target;
        } else if target >= record.curser_offset + height {
            record.curser_offset = target + 1 - height;
        }
        record.curser_row = target - record.curser_offset;
        self.update_record_data();
    }

    fn step_record(&mut self, forward: bool) {
        if let Some(record) = self.record_view.as_mut() {
            if forward && record.position + 1 < record.rows.len() {
                record.position += 1;
            } else if !forward && record.position > 0 {
                record.position -= 1;
            }
        }
        self.update_record_data();
    }

    // -------------------- Map ---------------------- //

    fn build_map_view(&mut self) {
        let filtered = filtered_rows(
            &self.data.records,
            &self.data.columns,
            &self.query.sort,
            &self.query.filters,
            &self.query.search,
        );
        let (rows, coords): (Vec<usize>, Vec<Coordinates>) = filtered
            .into_iter()
            .filter_map(|ridx| self.data.coordinates(ridx).map(|c| (ridx, c)))
            .unzip();
        if rows.is_empty() {
            self.set_status_message("No records with coordinates to show.");
            return;
        }

        let selected = self
            .selected_record()
            .and_then(|ridx| rows.iter().position(|&r| r == ridx))
            .unwrap_or(0);
        let bounds = calculate_bounds(&coords).padded(0.05, 0.002);
        let center = calculate_center(&coords);
        info!("Map of {} records, bounds {:?}", rows.len(), bounds);

        self.map_view = Some(MapView {
            rows,
            coords,
            bounds,
            center,
            selected,
        });
        self.previous_modus = self.modus;
        self.modus = Modus::MAP;
        self.update_map_data();
    }

    fn update_map_data(&mut self) {
        let Some(map) = &self.map_view else {
            return;
        };
        let width = self.uilayout.map_width.max(1) as f64;
        let height = self.uilayout.map_height.max(1) as f64;

        let to_cell = |pixel: &Pixel| {
            (
                (pixel.x.floor().max(0.0) as u16).min(width as u16 - 1),
                (pixel.y.floor().max(0.0) as u16).min(height as u16 - 1),
            )
        };

        let markers: Vec<MarkerView> = map
            .rows
            .iter()
            .zip(map.coords.iter())
            .enumerate()
            .map(|(i, (&ridx, coord))| {
                let (x, y) = to_cell(&coordinate_to_pixel(coord, &map.bounds, width, height));
                let color = self
                    .data
                    .records[ridx]
                    .get("severity")
                    .map(|v| format_severity(&v.to_display_string()).color)
                    .unwrap_or(Color::Cyan);
                MarkerView {
                    x,
                    y,
                    color,
                    selected: i == map.selected,
                }
            })
            .collect();

        let zoom = calculate_zoom_level(
            &map.bounds,
            width * CELL_WIDTH_PX,
            height * CELL_HEIGHT_PX,
        );
        let ridx = map.rows[map.selected];
        let position = map.coords[map.selected];
        let (cx, cy) = to_cell(&coordinate_to_pixel(&position, &map.bounds, width, height));
        let cell_center = pixel_to_coordinate(
            &Pixel::new(cx as f64 + 0.5, cy as f64 + 0.5),
            &map.bounds,
            width,
            height,
        );
        let bearing = get_bearing(&map.center, &position);
        let label = self
            .data
            .columns
            .iter()
            .take(2)
            .map(|c| c.render(&self.data.records[ridx]))
            .collect::<Vec<_>>()
            .join(" ");

        let info = vec![
            format!("{} of {} records", map.rows.len(), self.data.records.len()),
            format!("Center {}", format_coordinates(&map.center, 4)),
            format!("Zoom {}", zoom),
            format!("N {:.4} S {:.4}", map.bounds.north, map.bounds.south),
            format!("W {:.4} E {:.4}", map.bounds.west, map.bounds.east),
            String::new(),
            format!("[{}/{}] {}", map.selected + 1, map.rows.len(), label),
            format!("At   {}", format_coordinates(&position, 4)),
            format!("Cell {}", format_coordinates(&cell_center, 4)),
            format!(
                "{:.2} km {} of center",
                calculate_distance(&map.center, &position),
                compass_point(bearing)
            ),
        ];

        self.uidata.name = format!("M[{}]", self.data.name);
        self.uidata.view = View::Map;
        self.uidata.map = MapData { markers, info };
        self.refresh_uidata();
    }

    fn step_map_selection(&mut self, forward: bool) {
        if let Some(map) = self.map_view.as_mut() {
            let n = map.rows.len();
            map.selected = if forward {
                (map.selected + 1) % n
            } else {
                (map.selected + n - 1) % n
            };
        }
        self.update_map_data();
    }

    fn open_map_record(&mut self) {
        let Some(map) = &self.map_view else {
            return;
        };
        let (rows, position) = (map.rows.clone(), map.selected);
        self.open_record_view(rows, position);
    }

    // -------------------- Control handling functions ---------------------- //

    fn enter(&mut self) {
        match self.modus {
            Modus::TABLE => self.build_record_view(),
            Modus::MAP => self.open_map_record(),
            Modus::RECORD | Modus::POPUP | Modus::CMDINPUT => {}
        }
    }

    fn exit(&mut self) {
        match self.modus {
            Modus::TABLE => {}
            Modus::RECORD => {
                self.record_view = None;
                // Records opened from the map go back to it
                self.modus = if self.map_view.is_some() {
                    Modus::MAP
                } else {
                    Modus::TABLE
                };
                self.previous_modus = Modus::RECORD;
                self.update_view();
            }
            Modus::MAP => {
                self.map_view = None;
                self.previous_modus = Modus::MAP;
                self.modus = Modus::TABLE;
                self.update_table_data();
            }
            Modus::POPUP => {
                trace!("Close popup ...");
                self.modus = self.previous_modus;
                self.previous_modus = Modus::POPUP;
                self.uidata.show_popup = false;
                self.uidata.last_update = Instant::now();
            }
            Modus::CMDINPUT => {}
        }
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
        self.uidata.popup_message = HELP_TEXT.to_string();
        self.uidata.show_popup = true;
        self.uidata.last_update = Instant::now();
    }

    fn raw_input(&mut self, key: ratatui::crossterm::event::KeyEvent) {
        if self.active_cmdinput {
            self.last_input = self.input.read(key);
            if self.last_input.finished {
                self.handle_cmd_input();
            }
            self.refresh_uidata();
        }
    }

    fn enter_cmd_mode(&mut self, mode: CMDMode) {
        trace!("Entering command mode {:?} ...", mode);
        self.previous_modus = self.modus;
        self.modus = Modus::CMDINPUT;
        self.cmd_mode = Some(mode);

        self.active_cmdinput = true;
        self.input.clear();
        match mode {
            CMDMode::Search => self.input.set(&self.query.search),
            CMDMode::FilterColumn => {
                let key = &self.data.columns[self.curser_column].key;
                if let Some(term) = self.query.filters.get(key) {
                    self.input.set(term);
                }
            }
            CMDMode::Raw => {}
        }
        self.last_input = self.input.get();
        self.refresh_uidata();
    }

    fn handle_cmd_input(&mut self) {
        trace!("Handle cmd input {}", self.last_input.input);

        self.active_cmdinput = false;
        self.modus = self.previous_modus;
        self.previous_modus = Modus::CMDINPUT;

        let mode = self.cmd_mode.take();
        if self.last_input.canceled {
            self.update_view();
            return;
        }
        let cmd_input = self.last_input.input.clone();
        let result = match mode {
            Some(CMDMode::Search) => {
                self.search(&cmd_input);
                Ok(())
            }
            Some(CMDMode::FilterColumn) => {
                let key = self.data.columns[self.curser_column].key.clone();
                self.filter(&key, &cmd_input)
            }
            Some(CMDMode::Raw) => self.run_command(&cmd_input),
            None => {
                info!("Cmd mode is none!");
                Ok(())
            }
        };
        if let Err(e) = result {
            info!("Command \"{cmd_input}\" failed: {e}");
            self.set_status_message(e.to_string());
        }
        self.update_view();
    }

    fn parse_number(arg: Option<&str>, what: &str) -> Result<usize, DVError> {
        arg.ok_or_else(|| DVError::InvalidArgument(format!("{what} needs a number")))?
            .parse::<usize>()
            .map_err(|_| DVError::InvalidArgument(format!("{what} needs a number")))
    }

    fn run_command(&mut self, cmd: &str) -> Result<(), DVError> {
        let mut parts = cmd.split_whitespace();
        match parts.next() {
            Some("page") => {
                let page = Self::parse_number(parts.next(), "page")?;
                self.goto_page(page);
            }
            Some("size") => {
                self.config.page_size = Self::parse_number(parts.next(), "size")?;
                self.reset_to_first_page();
            }
            Some("sort") => {
                let key = parts
                    .next()
                    .ok_or_else(|| DVError::InvalidArgument("sort needs a column".into()))?;
                self.curser_column = self
                    .data
                    .column_index(key)
                    .ok_or_else(|| DVError::InvalidArgument(format!("Unknown column {key}")))?;
                self.visible_columns = self.layout_columns(self.offset_column);
                if !self.is_fully_visible(self.curser_column) {
                    self.offset_column = self.curser_column;
                }
                self.toggle_sort();
            }
            Some("filter") => {
                let key = parts
                    .next()
                    .ok_or_else(|| DVError::InvalidArgument("filter needs a column".into()))?;
                let term = parts.collect::<Vec<_>>().join(" ");
                self.filter(key, &term)?;
            }
            Some("clear") => self.clear_filters(),
            Some("data") => {
                let name = parts.next().unwrap_or_default();
                let Some(data) = mock::builtin(name) else {
                    let names = mock::BUILTIN_NAMES.join(", ");
                    return Err(DVError::InvalidArgument(format!("data needs one of {names}")));
                };
                self.replace_data(data)?;
            }
            Some("q") | Some("quit") => self.quit(),
            Some(other) => {
                return Err(DVError::InvalidArgument(format!("Unknown command {other}")));
            }
            None => {}
        }
        Ok(())
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.uilayout.width, width, self.uilayout.height, height
        );
        self.uilayout = UILayout::from_values(width, height);
        self.input.set_width(self.uilayout.statusline_width);
        self.recompute();
        self.update_view();
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), DVError> {
        let Some(msg) = message else {
            return Ok(());
        };
        if let Message::Resize(width, height) = msg {
            self.ui_resize(width, height);
            return Ok(());
        }

        match self.modus {
            Modus::TABLE => match msg {
                Message::Quit => self.quit(),
                Message::MoveUp => self.move_table_selection_up(),
                Message::MoveDown => self.move_table_selection_down(),
                Message::MoveLeft => self.move_table_selection_left(),
                Message::MoveRight => self.move_table_selection_right(),
                Message::PreviousPage => self.previous_page(),
                Message::NextPage => self.next_page(),
                Message::FirstPage => self.goto_page(1),
                Message::LastPage => self.goto_page(self.page.total_pages),
                Message::ToggleSort => self.toggle_sort(),
                Message::ClearSort => self.clear_sort(),
                Message::Search => self.enter_cmd_mode(CMDMode::Search),
                Message::Filter => self.enter_cmd_mode(CMDMode::FilterColumn),
                Message::ClearFilters => self.clear_filters(),
                Message::EnterCommand => self.enter_cmd_mode(CMDMode::Raw),
                Message::Enter => self.enter(),
                Message::Exit => self.exit(),
                Message::Map => self.build_map_view(),
                Message::Help => self.show_help(),
                Message::CopyCell => self.copy_table_cell(),
                Message::CopyRow => self.copy_table_row(),
                _ => (),
            },
            Modus::RECORD => match msg {
                Message::Quit => self.quit(),
                Message::MoveUp => self.move_record_selection(true),
                Message::MoveDown => self.move_record_selection(false),
                Message::MoveLeft => self.step_record(false),
                Message::MoveRight => self.step_record(true),
                Message::Help => self.show_help(),
                Message::Exit => self.exit(),
                _ => (),
            },
            Modus::MAP => match msg {
                Message::Quit => self.quit(),
                Message::MoveUp | Message::MoveLeft => self.step_map_selection(false),
                Message::MoveDown | Message::MoveRight => self.step_map_selection(true),
                Message::Enter => self.enter(),
                Message::Help => self.show_help(),
                Message::Exit | Message::Map => self.exit(),
                _ => (),
            },
            Modus::POPUP => match msg {
                Message::Quit => self.quit(),
                Message::Exit | Message::Help => self.exit(),
                _ => (),
            },
            Modus::CMDINPUT => {
                if let Message::RawKey(key) = msg {
                    self.raw_input(key)
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    fn model(page_size: usize) -> Model {
        let config = DVConfig::default().page_size(page_size);
        Model::init(&config, mock::incidents(), 200, 30).unwrap()
    }

    fn send(model: &mut Model, messages: &[Message]) {
        for m in messages {
            model.update(Some(m.clone())).unwrap();
        }
    }

    fn key(code: KeyCode) -> Message {
        Message::RawKey(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_line(model: &mut Model, text: &str) {
        for c in text.chars() {
            send(model, &[key(KeyCode::Char(c))]);
        }
        send(model, &[key(KeyCode::Enter)]);
    }

    fn first_ids(model: &Model) -> Vec<String> {
        let rows = &model.uidata.rows;
        rows.iter().map(|r| r[0].text.clone()).collect()
    }

    #[test]
    fn pages_through_incidents() {
        let mut m = model(3);
        assert_eq!(m.page.total_pages, 3);
        assert_eq!(first_ids(&m), vec!["INC-001", "INC-002", "INC-003"]);
        for _ in 0..3 {
            send(&mut m, &[Message::NextPage]);
        }
        assert_eq!(m.query.page.current_page, 3);
        assert_eq!(first_ids(&m), vec!["INC-007", "INC-008"]);
        assert_eq!(m.table_summary(), "Page 3/3 │ 7-8 of 8");
        send(&mut m, &[Message::FirstPage]);
        assert_eq!(m.query.page.current_page, 1);
    }

    #[test]
    fn moving_past_the_page_end_turns_the_page() {
        let mut m = model(3);
        for _ in 0..3 {
            send(&mut m, &[Message::MoveDown]);
        }
        assert_eq!(m.query.page.current_page, 2);
        assert_eq!(m.selected_record(), Some(3));
        send(&mut m, &[Message::MoveUp]);
        assert_eq!(m.query.page.current_page, 1);
        assert_eq!(m.selected_record(), Some(2));
    }

    #[test]
    fn search_resets_to_first_page() {
        let mut m = model(2);
        send(&mut m, &[Message::LastPage, Message::Search]);
        assert!(m.raw_keyevents());
        type_line(&mut m, "medical");
        assert!(!m.raw_keyevents());
        assert_eq!(m.query.page.current_page, 1);
        assert_eq!(m.page.total_filtered, 2);
        assert_eq!(first_ids(&m), vec!["INC-002", "INC-007"]);
    }

    #[test]
    fn column_filter_and_clear() {
        let mut m = model(0);
        send(&mut m, &[Message::EnterCommand]);
        type_line(&mut m, "filter severity high");
        assert_eq!(m.page.total_filtered, 3);
        assert!(m.uidata.header[3].filtered);
        send(&mut m, &[Message::ClearFilters]);
        assert_eq!(m.page.total_filtered, 8);
    }

    #[test]
    fn unknown_command_sets_status() {
        let mut m = model(0);
        send(&mut m, &[Message::EnterCommand]);
        type_line(&mut m, "frobnicate");
        assert_eq!(
            m.status_message,
            "Invalid argument: Unknown command frobnicate"
        );
    }

    #[test]
    fn sort_toggles_direction() {
        let mut m = model(0);
        send(&mut m, &[Message::ToggleSort]);
        assert_eq!(first_ids(&m)[0], "INC-001");
        send(&mut m, &[Message::ToggleSort]);
        assert_eq!(first_ids(&m)[0], "INC-008");
        assert_eq!(m.uidata.header[0].sort, Some(SortDirection::Descending));
        send(&mut m, &[Message::ClearSort]);
        assert_eq!(m.uidata.header[0].sort, None);
    }

    #[test]
    fn responders_sort_numerically() {
        let mut m = model(0);
        send(&mut m, &[Message::EnterCommand]);
        type_line(&mut m, "sort responders");
        send(&mut m, &[Message::ToggleSort]);
        // 12 before 8, a text sort would put 8 first
        assert_eq!(first_ids(&m)[0], "INC-004");
    }

    #[test]
    fn record_view_shows_position() {
        let mut m = model(0).with_reference_time(mock::reference_time().unwrap());
        send(&mut m, &[Message::Enter]);
        assert_eq!(m.uidata.view, View::Record);
        let record = &m.uidata.record;
        let fields: Vec<&str> = record.iter().map(|(k, _)| k.as_str()).collect();
        assert!(fields.contains(&"Position"));
        assert!(fields.contains(&"From center"));
        let reported = record.iter().find(|(k, _)| k == "Reported").unwrap();
        assert_eq!(reported.1, "2024-01-15 14:30 (2m ago)");
        send(&mut m, &[Message::MoveRight]);
        assert!(m.uidata.name.ends_with("2/8"));
        send(&mut m, &[Message::Exit]);
        assert_eq!(m.uidata.view, View::Table);
    }

    #[test]
    fn map_view_places_every_filtered_record() {
        let mut m = model(0);
        send(&mut m, &[Message::EnterCommand]);
        type_line(&mut m, "filter status active");
        send(&mut m, &[Message::Map]);
        assert_eq!(m.uidata.view, View::Map);
        assert_eq!(m.uidata.map.markers.len(), 3);
        let markers = &m.uidata.map.markers;
        assert_eq!(markers.iter().filter(|mk| mk.selected).count(), 1);
        let layout = &m.uilayout;
        assert!(markers.iter().all(|mk| {
            (mk.x as usize) < layout.map_width && (mk.y as usize) < layout.map_height
        }));
        send(&mut m, &[Message::Enter]);
        assert_eq!(m.uidata.view, View::Record);
        send(&mut m, &[Message::Exit]);
        assert_eq!(m.uidata.view, View::Map);
    }

    #[test]
    fn data_command_switches_sets() {
        let mut m = model(0);
        send(&mut m, &[Message::ToggleSort, Message::MoveDown]);
        send(&mut m, &[Message::EnterCommand]);
        type_line(&mut m, "data equipment");
        assert_eq!(m.uidata.view, View::Table);
        assert_eq!(m.uidata.name, "equipment");
        assert_eq!(m.selected_record(), Some(0));
        assert_eq!(m.query.sort.key, None);
        assert_eq!(m.page.total_filtered, 3);
        assert_eq!(m.status_message, "Showing equipment");

        send(&mut m, &[Message::EnterCommand]);
        type_line(&mut m, "filter status available");
        assert_eq!(first_ids(&m), vec!["1", "3"]);
        let status_column = m.data.column_index("status").unwrap();
        assert_eq!(m.uidata.rows[0][status_column].color, Some(Color::Green));

        // Nothing in the resource sets has a position
        send(&mut m, &[Message::Map]);
        assert_eq!(m.uidata.view, View::Table);
    }

    #[test]
    fn data_command_rejects_unknown_sets() {
        let mut m = model(0);
        send(&mut m, &[Message::EnterCommand]);
        type_line(&mut m, "data stations");
        assert_eq!(m.data.name, "incidents");
        assert_eq!(
            m.status_message,
            "Invalid argument: data needs one of incidents, personnel, equipment"
        );
    }

    #[test]
    fn csv_escaping_of_copied_rows() {
        assert_eq!(Model::wrap_cell_content("plain"), "plain");
        assert_eq!(Model::wrap_cell_content("a, b"), "\"a, b\"");
        assert_eq!(Model::wrap_cell_content("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
