use std::io::Write;

use dispatch_view::domain::DVError;
use dispatch_view::loader::load_data_file;
use dispatch_view::table::{PageState, SortDirection, SortState, TableQuery, Value};

const CSV: &str = "\
id,kind,reported,units,active,lat,lng
A-1,Fire,2024-03-01 08:15:00,4,true,41.8800,-87.6300
A-2,Medical,2024-03-01 09:40:00,1,false,41.8900,-87.6200
A-3,Flood,2024-03-02 11:05:00,12,true,41.8700,-87.6400
";

fn write_csv(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".csv")
        .tempfile()
        .unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn csv_columns_get_typed_values() {
    let file = write_csv(CSV);
    let data = load_data_file(file.path().to_path_buf()).unwrap();

    assert_eq!(data.records.len(), 3);
    let keys: Vec<&str> = data.columns.iter().map(|c| c.key.as_str()).collect();
    assert_eq!(
        keys,
        vec!["id", "kind", "reported", "units", "active", "lat", "lng"]
    );
    assert_eq!(data.file_size, Some(CSV.len() as u64));

    let first = &data.records[0];
    assert_eq!(first["id"], Value::from("A-1"));
    assert_eq!(first["units"], Value::Number(4.0));
    assert_eq!(first["active"], Value::Bool(true));
    assert!(matches!(first["reported"], Value::Date(_)));
    assert_eq!(data.columns[4].render(first), "Yes");

    let position = data.coordinates(2).unwrap();
    assert_eq!((position.lat, position.lng), (41.87, -87.64));
}

#[test]
fn loaded_data_sorts_numerically() {
    let file = write_csv(CSV);
    let data = load_data_file(file.path().to_path_buf()).unwrap();
    let query = TableQuery {
        sort: SortState::by("units", SortDirection::Descending),
        page: PageState::new(1, 2),
        ..Default::default()
    };
    let view = query.compute(&data.records, &data.columns);
    assert_eq!(view.rows, vec![2, 0]);
    assert_eq!(view.total_pages, 2);
}

#[test]
fn unknown_extension_is_rejected() {
    let mut file = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
    file.write_all(b"not a table").unwrap();
    assert!(matches!(
        load_data_file(file.path().to_path_buf()),
        Err(DVError::UnknownFileType)
    ));
}
