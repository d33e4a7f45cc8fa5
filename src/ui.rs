use std::time::Duration;

use ratatui::{
    Frame,
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols::border,
    text::{Line, Span},
    widgets::{
        Block, Cell, Clear, Paragraph, Row, Scrollbar, ScrollbarOrientation, ScrollbarState,
        StatefulWidget, Table, Widget, Wrap,
    },
};

use crate::domain::DVConfig;
use crate::model::{Model, UIData, View};

pub const CMDLINE_HEIGH: usize = 1;
pub const STATUSLINE_HEIGHT: usize = 1;
pub const TABLE_HEADER_HEIGHT: usize = 1;
pub const COLUMN_WIDTH_MARGIN: usize = 1;
pub const SCROLLBAR_WIDTH: usize = 1;
pub const MAP_INFO_WIDTH: usize = 36;

const SELECTED_ROW: Color = Color::Rgb(40, 44, 52);

pub struct TableUI {
    status_message_timeout: Duration,
}

struct ModelView<'a> {
    ui: &'a TableUI,
    data: &'a UIData,
    cmdline: Option<(&'static str, String, usize)>,
}

impl TableUI {
    pub fn new(cfg: &DVConfig) -> Self {
        Self {
            status_message_timeout: Duration::from_secs(cfg.status_message_timeout),
        }
    }

    pub fn draw(&self, model: &Model, frame: &mut Frame) {
        let area = frame.area();
        let cmdline = model.cmdline();
        if let Some((prompt, _, cursor)) = &cmdline {
            let x = area.x + (prompt.chars().count() + cursor) as u16;
            let y = area.bottom().saturating_sub(1);
            frame.set_cursor_position((x.min(area.right().saturating_sub(1)), y));
        }
        frame.render_widget(
            ModelView {
                ui: self,
                data: model.get_uidata(),
                cmdline,
            },
            area,
        );
    }
}

impl Widget for ModelView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let [main, statusline, cmdline] = Layout::vertical([
            Constraint::Min(1),
            Constraint::Length(STATUSLINE_HEIGHT as u16),
            Constraint::Length(CMDLINE_HEIGH as u16),
        ])
        .areas(area);

        match self.data.view {
            View::Table => self.render_table(main, buf),
            View::Record => self.render_record(main, buf),
            View::Map => self.render_map(main, buf),
        }
        self.render_statusline(statusline, buf);
        self.render_cmdline(cmdline, buf);
        if self.data.show_popup {
            self.render_popup(main, buf);
        }
    }
}

impl ModelView<'_> {
    fn render_table(&self, area: Rect, buf: &mut Buffer) {
        let [table_area, scroll_area] = Layout::horizontal([
            Constraint::Min(1),
            Constraint::Length(SCROLLBAR_WIDTH as u16),
        ])
        .areas(area);

        let header = Row::new(self.data.header.iter().map(|h| {
            let mut label = h.label.clone();
            if let Some(direction) = h.sort {
                label = format!("{} {}", label, direction.arrow());
            }
            if h.filtered {
                label.push('*');
            }
            Cell::from(label)
        }))
        .style(Style::new().bold().underlined());

        let rows = self.data.rows.iter().enumerate().map(|(ridx, row)| {
            let selected_row = ridx == self.data.selected_row;
            let cells = row.iter().enumerate().map(|(cidx, cell)| {
                let mut style = Style::new();
                if let Some(color) = cell.color {
                    style = style.fg(color);
                }
                if selected_row && cidx == self.data.selected_column {
                    style = style.add_modifier(Modifier::REVERSED);
                }
                Cell::from(cell.text.as_str()).style(style)
            });
            let row = Row::new(cells);
            if selected_row {
                row.style(Style::new().bg(SELECTED_ROW))
            } else {
                row
            }
        });

        let widths = self
            .data
            .header
            .iter()
            .map(|h| Constraint::Length(h.width as u16));

        let table = Table::new(rows, widths)
            .header(header)
            .column_spacing(COLUMN_WIDTH_MARGIN as u16);
        Widget::render(table, table_area, buf);

        if self.data.rows.is_empty() {
            let [_, message] = Layout::vertical([
                Constraint::Length(TABLE_HEADER_HEIGHT as u16),
                Constraint::Min(1),
            ])
            .areas(table_area);
            Paragraph::new("No matching records".dark_gray().italic())
                .centered()
                .render(message, buf);
        }

        self.render_scrollbar(scroll_area, buf);
    }

    fn render_scrollbar(&self, area: Rect, buf: &mut Buffer) {
        let (position, len) = self.data.scroll;
        if len <= 1 {
            return;
        }
        let mut state = ScrollbarState::new(len).position(position);
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(None)
            .end_symbol(None);
        StatefulWidget::render(scrollbar, area, buf, &mut state);
    }

    fn render_record(&self, area: Rect, buf: &mut Buffer) {
        let [record_area, scroll_area] = Layout::horizontal([
            Constraint::Min(1),
            Constraint::Length(SCROLLBAR_WIDTH as u16),
        ])
        .areas(area);

        let label_width = self
            .data
            .record
            .iter()
            .map(|(label, _)| label.chars().count())
            .max()
            .unwrap_or(0) as u16;

        let rows = self.data.record.iter().enumerate().map(|(idx, (label, value))| {
            let row = Row::new(vec![
                Cell::from(label.as_str()).bold().cyan(),
                Cell::from(value.as_str()),
            ]);
            if idx == self.data.selected_row {
                row.style(Style::new().bg(SELECTED_ROW))
            } else {
                row
            }
        });

        let table = Table::new(rows, [Constraint::Length(label_width), Constraint::Min(1)])
            .column_spacing(2)
            .block(Block::new().title(Line::from(self.data.name.as_str()).bold()));
        Widget::render(table, record_area, buf);

        self.render_scrollbar(scroll_area, buf);
    }

    fn render_map(&self, area: Rect, buf: &mut Buffer) {
        let [map_area, info_area] = Layout::horizontal([
            Constraint::Min(3),
            Constraint::Length(MAP_INFO_WIDTH as u16),
        ])
        .areas(area);

        let title = format!(" {} ", self.data.name);
        let block = Block::bordered()
            .title(Line::from(title).bold().centered())
            .border_set(border::ROUNDED);
        let inner = block.inner(map_area);
        block.render(map_area, buf);

        // Selected marker last so it stays on top
        let markers = self
            .data
            .map
            .markers
            .iter()
            .filter(|m| !m.selected)
            .chain(self.data.map.markers.iter().filter(|m| m.selected));
        for marker in markers {
            let x = inner.x + marker.x;
            let y = inner.y + marker.y;
            if x >= inner.right() || y >= inner.bottom() {
                continue;
            }
            if let Some(cell) = buf.cell_mut((x, y)) {
                if marker.selected {
                    cell.set_symbol("◉")
                        .set_style(Style::new().fg(marker.color).add_modifier(Modifier::BOLD));
                } else {
                    cell.set_symbol("●").set_fg(marker.color);
                }
            }
        }

        let lines: Vec<Line> = self
            .data
            .map
            .info
            .iter()
            .map(|l| Line::from(l.as_str()))
            .collect();
        let info_block = Block::bordered()
            .title(" Info ")
            .border_set(border::ROUNDED);
        Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .block(info_block)
            .render(info_area, buf);
    }

    fn render_statusline(&self, area: Rect, buf: &mut Buffer) {
        let name = format!(" {} ", self.data.name);
        let mut spans = vec![Span::from(name).black().on_cyan(), Span::from(" ")];
        if self.data.view == View::Table {
            spans.push(Span::from(self.data.summary.as_str()));
        }
        Line::from(spans).render(area, buf);
    }

    fn render_cmdline(&self, area: Rect, buf: &mut Buffer) {
        if let Some((prompt, text, _)) = &self.cmdline {
            Line::from(vec![Span::from(*prompt).bold(), Span::from(text.as_str())])
                .render(area, buf);
            return;
        }
        let fresh = self.data.last_status_message_update.elapsed() < self.ui.status_message_timeout;
        if fresh && !self.data.status_message.is_empty() {
            Line::from(self.data.status_message.as_str().yellow()).render(area, buf);
        } else {
            Line::from(" ? help  : command  q quit".dark_gray()).render(area, buf);
        }
    }

    fn render_popup(&self, area: Rect, buf: &mut Buffer) {
        let lines = self.data.popup_message.lines().count() as u16 + 2;
        let width = self
            .data
            .popup_message
            .lines()
            .map(|l| l.chars().count())
            .max()
            .unwrap_or(0) as u16
            + 4;
        let popup = Rect {
            x: area.x + area.width.saturating_sub(width) / 2,
            y: area.y + area.height.saturating_sub(lines) / 2,
            width: width.min(area.width),
            height: lines.min(area.height),
        };
        Clear.render(popup, buf);
        Paragraph::new(self.data.popup_message.as_str())
            .block(
                Block::bordered()
                    .title(Line::from(" Help ").bold().centered())
                    .title_bottom(Line::from(" Esc to close ").centered())
                    .border_set(border::THICK),
            )
            .render(popup, buf);
    }
}
