use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::value::Value;

pub type Accessor<R> = Arc<dyn Fn(&R) -> Value + Send + Sync>;
pub type Renderer<R> = Arc<dyn Fn(&Value, &R) -> String + Send + Sync>;

/// A dynamic record, used for data that is loaded at runtime.
pub type Record = HashMap<String, Value>;

/// Describes one displayed field of a record type `R`.
///
/// Field access always goes through the accessor; the engine never inspects
/// `R` itself.
pub struct ColumnSpec<R> {
    pub key: String,
    pub label: String,
    pub sortable: bool,
    pub filterable: bool,
    pub width: Option<usize>,
    accessor: Accessor<R>,
    renderer: Option<Renderer<R>>,
}

impl<R> ColumnSpec<R> {
    pub fn new<F>(key: impl Into<String>, label: impl Into<String>, accessor: F) -> Self
    where
        F: Fn(&R) -> Value + Send + Sync + 'static,
    {
        Self {
            key: key.into(),
            label: label.into(),
            sortable: true,
            filterable: true,
            width: None,
            accessor: Arc::new(accessor),
            renderer: None,
        }
    }

    pub fn sortable(mut self, sortable: bool) -> Self {
        self.sortable = sortable;
        self
    }

    pub fn filterable(mut self, filterable: bool) -> Self {
        self.filterable = filterable;
        self
    }

    pub fn width(mut self, width: usize) -> Self {
        self.width = Some(width);
        self
    }

    pub fn render_with<F>(mut self, renderer: F) -> Self
    where
        F: Fn(&Value, &R) -> String + Send + Sync + 'static,
    {
        self.renderer = Some(Arc::new(renderer));
        self
    }

    pub fn value(&self, record: &R) -> Value {
        (self.accessor)(record)
    }

    /// Cell text for display. Uses the custom renderer when one is set,
    /// otherwise the same coercion the engine matches against.
    pub fn render(&self, record: &R) -> String {
        let value = self.value(record);
        match &self.renderer {
            Some(renderer) => renderer(&value, record),
            None => value.to_display_string(),
        }
    }
}

impl ColumnSpec<Record> {
    /// Column reading `key` out of a dynamic [`Record`].
    pub fn field(key: impl Into<String>, label: impl Into<String>) -> Self {
        let key = key.into();
        let lookup = key.clone();
        Self::new(key, label, move |record: &Record| {
            record.get(&lookup).cloned().unwrap_or(Value::Null)
        })
    }
}

impl<R> Clone for ColumnSpec<R> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            label: self.label.clone(),
            sortable: self.sortable,
            filterable: self.filterable,
            width: self.width,
            accessor: Arc::clone(&self.accessor),
            renderer: self.renderer.clone(),
        }
    }
}

impl<R> fmt::Debug for ColumnSpec<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnSpec")
            .field("key", &self.key)
            .field("label", &self.label)
            .field("sortable", &self.sortable)
            .field("filterable", &self.filterable)
            .field("width", &self.width)
            .field("renderer", &self.renderer.is_some())
            .finish()
    }
}
