use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use rayon::prelude::*;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, trace};

use crate::domain::DVError;
use crate::geo::Coordinates;
use crate::table::{ColumnSpec, Record, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    CSV,
    PARQUET,
    ARROW,
}

#[derive(Debug)]
pub struct FileInfo {
    pub path: PathBuf,
    pub file_size: u64,
    pub file_type: FileType,
}

/// Records plus the columns to show them with.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub name: String,
    pub records: Vec<Record>,
    pub columns: Vec<ColumnSpec<Record>>,
    pub file_size: Option<u64>,
}

const LAT_NAMES: [&str; 2] = ["lat", "latitude"];
const LNG_NAMES: [&str; 4] = ["lng", "lon", "long", "longitude"];

impl Dataset {
    pub fn new(
        name: impl Into<String>,
        records: Vec<Record>,
        columns: Vec<ColumnSpec<Record>>,
    ) -> Self {
        Dataset {
            name: name.into(),
            records,
            columns,
            file_size: None,
        }
    }

    /// Column by key or label, ignoring case.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.key.eq_ignore_ascii_case(name))
            .or_else(|| {
                self.columns
                    .iter()
                    .position(|c| c.label.eq_ignore_ascii_case(name))
            })
    }

    /// Keys of the latitude and longitude columns, if the data has both.
    pub fn coordinate_columns(&self) -> Option<(String, String)> {
        let find = |names: &[&str]| {
            self.columns
                .iter()
                .find(|c| names.iter().any(|n| c.key.eq_ignore_ascii_case(n)))
                .map(|c| c.key.clone())
        };
        Some((find(&LAT_NAMES)?, find(&LNG_NAMES)?))
    }

    /// Position of a record, if it has numeric coordinates.
    pub fn coordinates(&self, record_idx: usize) -> Option<Coordinates> {
        let (lat_key, lng_key) = self.coordinate_columns()?;
        let record = self.records.get(record_idx)?;
        let lat = record.get(&lat_key)?.as_f64()?;
        let lng = record.get(&lng_key)?.as_f64()?;
        Some(Coordinates::new(lat, lng))
    }
}

/// Expand `~` and environment variables in a user supplied path.
pub fn expand_path(path: &str) -> Result<PathBuf, DVError> {
    shellexpand::full(path)
        .map(|p| PathBuf::from(p.as_ref()))
        .map_err(|e| DVError::InvalidArgument(format!("{path}: {e}")))
}

pub fn load_data_file(path: PathBuf) -> Result<Dataset, DVError> {
    let file_info = get_file_info(path)?;
    debug!("Loading {:?}", file_info);
    let frame = match file_info.file_type {
        FileType::CSV => load_csv(&file_info.path)?,
        FileType::PARQUET => load_parquet(&file_info.path)?,
        FileType::ARROW => load_arrow(&file_info.path)?,
    };

    // Every column is converted in its own rayon task
    let start_time = Instant::now();
    let df = Arc::new(frame.collect()?);
    let c_: Result<Vec<LoadedColumn>, _> = df
        .get_column_names()
        .par_iter()
        .map(|name| load_column(&df, name))
        .collect();
    let loaded = c_?;

    let nrows = df.height();
    let mut records: Vec<Record> = (0..nrows)
        .map(|_| Record::with_capacity(loaded.len()))
        .collect();
    let mut columns = Vec::with_capacity(loaded.len());
    for column in loaded {
        debug!(
            "Column \"{}\", {:?}, width_max: {}, # rows {}",
            column.name,
            column.dtype,
            column.max_width,
            column.values.len()
        );
        let spec = ColumnSpec::field(column.name.clone(), column.name.clone());
        columns.push(spec.width(column.max_width));
        for (record, value) in records.iter_mut().zip(column.values) {
            record.insert(column.name.clone(), value);
        }
    }

    info!(
        "Loading {} rows x {} columns took {}ms ...",
        nrows,
        columns.len(),
        start_time.elapsed().as_millis()
    );

    let name = file_info
        .path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("???")
        .to_string();
    let mut dataset = Dataset::new(name, records, columns);
    dataset.file_size = Some(file_info.file_size);
    Ok(dataset)
}

pub fn get_file_info(path: PathBuf) -> Result<FileInfo, DVError> {
    let metadata = fs::metadata(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => DVError::FileNotFound,
        ErrorKind::PermissionDenied => DVError::PermissionDenied,
        _ => DVError::IoError(e),
    })?;
    if !metadata.is_file() {
        return Err(DVError::LoadingFailed("Not a file!".into()));
    }

    let file_size = metadata.len();
    let file_type = detect_file_type(&path)?;

    Ok(FileInfo {
        path,
        file_size,
        file_type,
    })
}

pub fn detect_file_type(path: &Path) -> Result<FileType, DVError> {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_uppercase())
        .as_deref()
    {
        Some("CSV") => Ok(FileType::CSV),
        Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
        Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
        _ => Err(DVError::UnknownFileType),
    }
}

fn load_csv(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyCsvReader::new(PlPath::Local(path.into()))
        .with_has_header(true)
        .finish()
}

fn load_parquet(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())
}

fn load_arrow(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_ipc(
        PlPath::Local(path.into()),
        polars::io::ipc::IpcScanOptions,
        UnifiedScanArgs::default(),
    )
}

struct LoadedColumn {
    name: String,
    dtype: DataType,
    values: Vec<Value>,
    max_width: usize,
}

fn load_column(df: &DataFrame, col_name: &str) -> Result<LoadedColumn, PolarsError> {
    let dtype = df.column(col_name)?.dtype().clone();

    let col = df.column(col_name)?.cast(&DataType::String)?;
    let series = col.str()?;

    let mut values: Vec<Value> = series
        .into_iter()
        .map(|cell| match cell {
            Some(s) => convert_cell(s, &dtype),
            None => Value::Null,
        })
        .collect();

    if dtype == DataType::String && looks_like_dates(&values) {
        trace!("Column {col_name} holds date strings");
        values = values
            .into_iter()
            .map(|v| match v {
                Value::Text(s) => parse_datetime(&s).map_or(Value::Text(s), Value::Date),
                other => other,
            })
            .collect();
    }

    let max_width = values
        .iter()
        .map(|v| v.to_display_string().chars().count())
        .max()
        .unwrap_or(0)
        .max(col_name.chars().count());

    Ok(LoadedColumn {
        name: col_name.to_string(),
        dtype,
        values,
        max_width,
    })
}

fn convert_cell(cell: &str, dtype: &DataType) -> Value {
    let cell = cell.replace("\r\n", " ↵ ").replace('\n', " ↵ ");
    if is_numeric_type(dtype) {
        return cell
            .parse::<f64>()
            .map(Value::Number)
            .unwrap_or(Value::Text(cell));
    }
    match dtype {
        DataType::Boolean => match cell.as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::Text(cell),
        },
        DataType::Date | DataType::Datetime(_, _) => parse_datetime(&cell)
            .map(Value::Date)
            .unwrap_or(Value::Text(cell)),
        _ => Value::Text(cell),
    }
}

fn looks_like_dates(values: &[Value]) -> bool {
    let mut texts = values.iter().filter_map(Value::as_str).peekable();
    texts.peek().is_some() && texts.all(|s| parse_datetime(s).is_some())
}

/// Parse the date and date-time layouts polars and the dashboards write.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    const DATETIME_FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    let s = s.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(chrono::NaiveTime::MIN))
        })
}

fn is_numeric_type(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_types_from_extension() {
        assert_eq!(
            detect_file_type(Path::new("a.CSV")).ok(),
            Some(FileType::CSV)
        );
        assert_eq!(
            detect_file_type(Path::new("a.pq")).ok(),
            Some(FileType::PARQUET)
        );
        assert_eq!(
            detect_file_type(Path::new("a.feather")).ok(),
            Some(FileType::ARROW)
        );
        assert!(matches!(
            detect_file_type(Path::new("a.xlsx")),
            Err(DVError::UnknownFileType)
        ));
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            get_file_info(PathBuf::from("/does/not/exist.csv")),
            Err(DVError::FileNotFound)
        ));
    }

    #[test]
    fn datetime_layouts() {
        assert!(parse_datetime("2024-01-15 14:30").is_some());
        assert!(parse_datetime("2024-01-15 14:30:00.000000").is_some());
        assert!(parse_datetime("2024-01-15T14:30:00").is_some());
        assert!(parse_datetime("2024-01-15").is_some());
        assert!(parse_datetime("yesterday").is_none());
    }

    #[test]
    fn cells_follow_dtype() {
        assert_eq!(convert_cell("3.5", &DataType::Float64), Value::Number(3.5));
        assert_eq!(convert_cell("true", &DataType::Boolean), Value::Bool(true));
        assert_eq!(convert_cell("12", &DataType::String), Value::from("12"));
        let multiline = convert_cell("a\nb", &DataType::String);
        assert_eq!(multiline, Value::from("a ↵ b"));
    }
}
