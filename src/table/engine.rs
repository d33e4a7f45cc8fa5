use rayon::prelude::*;
use std::time::Instant;
use tracing::trace;

use super::column::ColumnSpec;
use super::state::{FilterState, PageState, SortDirection, SortState};
use super::value::Value;

/// One computed page of a table.
#[derive(Debug)]
pub struct TableView<'a, R> {
    /// Indices into the input records, in display order.
    pub rows: Vec<usize>,
    pub visible_rows: Vec<&'a R>,
    pub total_filtered_count: usize,
    pub total_pages: usize,
    pub page: PageState,
}

impl<R> TableView<'_, R> {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 1 based `(first, last, total)` of the rows on this page, for footers
    /// like "Showing 11 to 20 of 42 results".
    pub fn range_label(&self) -> Option<(usize, usize, usize)> {
        if self.rows.is_empty() {
            return None;
        }
        let first = match self.page.page_size {
            0 => 1,
            size => (self.page.current_page - 1) * size + 1,
        };
        Some((
            first,
            first + self.rows.len() - 1,
            self.total_filtered_count,
        ))
    }
}

/// Everything the caller owns about a table besides its data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableQuery {
    pub sort: SortState,
    pub filters: FilterState,
    pub search: String,
    pub page: PageState,
}

impl TableQuery {
    pub fn compute<'a, R: Sync>(
        &self,
        records: &'a [R],
        columns: &[ColumnSpec<R>],
    ) -> TableView<'a, R> {
        compute_view(
            records,
            columns,
            &self.sort,
            &self.filters,
            &self.search,
            &self.page,
        )
    }
}

/// Sort, filter and paginate `records`.
///
/// Pure: identical arguments always give identical output. Pages outside
/// `1..=total_pages` yield an empty page, a page size of 0 puts every
/// filtered row on page 1.
pub fn compute_view<'a, R: Sync>(
    records: &'a [R],
    columns: &[ColumnSpec<R>],
    sort: &SortState,
    filters: &FilterState,
    search_term: &str,
    page: &PageState,
) -> TableView<'a, R> {
    let start_time = Instant::now();
    let filtered = filtered_rows(records, columns, sort, filters, search_term);
    let total_filtered_count = filtered.len();
    let (range, total_pages) = page_range(total_filtered_count, page);
    let rows = filtered[range].to_vec();
    let visible_rows = rows.iter().map(|&idx| &records[idx]).collect();

    trace!(
        "Computed view: {} of {} records match, page {}/{} ({} rows) in {}ms",
        total_filtered_count,
        records.len(),
        page.current_page,
        total_pages,
        rows.len(),
        start_time.elapsed().as_millis()
    );

    TableView {
        rows,
        visible_rows,
        total_filtered_count,
        total_pages,
        page: *page,
    }
}

/// Sorted and filtered record indices, before pagination.
pub fn filtered_rows<R: Sync>(
    records: &[R],
    columns: &[ColumnSpec<R>],
    sort: &SortState,
    filters: &FilterState,
    search_term: &str,
) -> Vec<usize> {
    let sorted = sort_rows(records, columns, sort);
    filter_rows(records, columns, sorted, filters, search_term)
}

/// Stable sort of all record indices by the sort column.
pub fn sort_rows<R: Sync>(
    records: &[R],
    columns: &[ColumnSpec<R>],
    sort: &SortState,
) -> Vec<usize> {
    let mut rows: Vec<usize> = (0..records.len()).collect();
    let Some(key) = sort.key.as_deref() else {
        return rows;
    };
    let Some(column) = columns.iter().find(|c| c.key == key) else {
        trace!("Sort key {key} names no column, keeping input order");
        return rows;
    };

    // Pull every sort value once instead of calling the accessor per comparison
    let keys: Vec<Value> = records.par_iter().map(|r| column.value(r)).collect();
    match sort.direction {
        SortDirection::Ascending => rows.sort_by(|&a, &b| keys[a].compare(&keys[b])),
        SortDirection::Descending => rows.sort_by(|&a, &b| keys[b].compare(&keys[a])),
    }
    rows
}

/// Keep the rows matching the global search (any column) and every column
/// filter. Order of `rows` is preserved.
pub fn filter_rows<R: Sync>(
    records: &[R],
    columns: &[ColumnSpec<R>],
    rows: Vec<usize>,
    filters: &FilterState,
    search_term: &str,
) -> Vec<usize> {
    let needle = search_term.to_lowercase();

    let mut column_filters: Vec<(&ColumnSpec<R>, String)> = Vec::with_capacity(filters.len());
    for (key, term) in filters.iter() {
        match columns.iter().find(|c| c.key == key) {
            Some(column) => column_filters.push((column, term.to_lowercase())),
            None => {
                // A field the records do not have reads as null and can never match
                trace!("Filter on unknown column {key} matches nothing");
                return Vec::new();
            }
        }
    }

    if needle.is_empty() && column_filters.is_empty() {
        return rows;
    }

    rows.into_par_iter()
        .filter(|&idx| {
            let record = &records[idx];
            let search_hit = needle.is_empty()
                || columns.iter().any(|c| c.value(record).matches(&needle));
            search_hit
                && column_filters
                    .iter()
                    .all(|(c, term)| c.value(record).matches(term))
        })
        .collect()
}

/// Slice bounds of the requested page and the total page count.
fn page_range(count: usize, page: &PageState) -> (std::ops::Range<usize>, usize) {
    if page.page_size == 0 {
        let total_pages = usize::from(count > 0);
        return match page.current_page {
            1 => (0..count, total_pages),
            _ => (0..0, total_pages),
        };
    }

    let total_pages = count.div_ceil(page.page_size);
    if page.current_page == 0 || page.current_page > total_pages {
        return (0..0, total_pages);
    }
    let start = (page.current_page - 1) * page.page_size;
    let end = std::cmp::min(start + page.page_size, count);
    (start..end, total_pages)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Person {
        name: &'static str,
        age: f64,
    }

    fn person(name: &'static str, age: f64) -> Person {
        Person { name, age }
    }

    fn people() -> Vec<Person> {
        vec![person("B", 30.0), person("A", 30.0), person("C", 20.0)]
    }

    fn columns() -> Vec<ColumnSpec<Person>> {
        vec![
            ColumnSpec::new("name", "Name", |p: &Person| Value::from(p.name)),
            ColumnSpec::new("age", "Age", |p: &Person| Value::from(p.age)),
        ]
    }

    fn names(view: &TableView<'_, Person>) -> Vec<&'static str> {
        view.visible_rows.iter().map(|p| p.name).collect()
    }

    #[test]
    fn stable_sort_keeps_ties_in_input_order() {
        let data = people();
        let sort = SortState::by("age", SortDirection::Ascending);
        let view = compute_view(
            &data,
            &columns(),
            &sort,
            &FilterState::new(),
            "",
            &PageState::new(1, 10),
        );
        assert_eq!(names(&view), vec!["C", "B", "A"]);
        assert_eq!(view.rows, vec![2, 0, 1]);
    }

    #[test]
    fn descending_keeps_ties_in_input_order() {
        let data = people();
        let sort = SortState::by("age", SortDirection::Descending);
        let view = compute_view(
            &data,
            &columns(),
            &sort,
            &FilterState::new(),
            "",
            &PageState::new(1, 10),
        );
        assert_eq!(names(&view), vec!["B", "A", "C"]);
    }

    #[test]
    fn page_size_zero_is_unpaginated() {
        let data = people();
        let query = TableQuery {
            page: PageState::new(1, 0),
            ..Default::default()
        };
        let view = query.compute(&data, &columns());
        assert_eq!(view.total_pages, 1);
        assert_eq!(view.visible_rows.len(), 3);

        let query = TableQuery {
            page: PageState::new(2, 0),
            ..Default::default()
        };
        assert!(query.compute(&data, &columns()).is_empty());
    }

    #[test]
    fn page_zero_and_past_end_are_empty() {
        let data = people();
        for current_page in [0, 3] {
            let query = TableQuery {
                page: PageState::new(current_page, 2),
                ..Default::default()
            };
            let view = query.compute(&data, &columns());
            assert!(view.is_empty());
            assert_eq!(view.total_pages, 2);
            assert_eq!(view.total_filtered_count, 3);
        }
    }

    #[test]
    fn unknown_sort_key_keeps_input_order() {
        let data = people();
        let query = TableQuery {
            sort: SortState::by("height", SortDirection::Descending),
            ..Default::default()
        };
        let view = query.compute(&data, &columns());
        assert_eq!(names(&view), vec!["B", "A", "C"]);
    }

    #[test]
    fn unknown_filter_column_matches_nothing() {
        let data = people();
        let query = TableQuery {
            filters: FilterState::new().with("height", "1"),
            ..Default::default()
        };
        let view = query.compute(&data, &columns());
        assert_eq!(view.total_filtered_count, 0);
        assert_eq!(view.total_pages, 0);
    }

    #[test]
    fn range_label_for_last_page() {
        let data = people();
        let query = TableQuery {
            page: PageState::new(2, 2),
            ..Default::default()
        };
        let view = query.compute(&data, &columns());
        assert_eq!(view.range_label(), Some((3, 3, 3)));
    }
}
