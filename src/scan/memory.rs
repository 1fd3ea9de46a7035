//! An in-memory result set.

use std::collections::VecDeque;

use super::{Destination, RowScanner, ScanError};
use crate::value::Value;

/// A [`RowScanner`] over rows held in memory.
///
/// Useful as a test double and for decoding data that did not come from a
/// database at all. Failures can be scripted: [`fail_after`](Self::fail_after)
/// stops iteration with an error once the queued rows run out, and
/// [`fail_columns`](Self::fail_columns) makes [`columns`](RowScanner::columns)
/// fail.
///
/// # Examples
///
/// ```
/// use rowmap::scan::{MemoryRows, RowScanner};
/// use rowmap::value::Value;
///
/// let mut rows = MemoryRows::new(["id"]).row([Value::Int(1)]).row([Value::Int(2)]);
/// assert_eq!(rows.columns().unwrap(), vec!["id".to_string()]);
/// assert!(rows.advance());
/// assert_eq!(rows.remaining(), 1);
/// ```
#[derive(Debug)]
pub struct MemoryRows {
    columns: Vec<String>,
    pending: VecDeque<Vec<Value>>,
    current: Option<Vec<Value>>,
    failure: Option<ScanError>,
    columns_failure: Option<String>,
    err: Option<ScanError>,
}

impl MemoryRows {
    /// Creates an empty result set with the given column names.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            pending: VecDeque::new(),
            current: None,
            failure: None,
            columns_failure: None,
            err: None,
        }
    }

    /// Builds a result set from a JSON array of row arrays, e.g.
    /// `[[1, "Ann"], [2, "Bob"]]`.
    pub fn from_json<I, S>(columns: I, json: &str) -> Result<Self, serde_json::Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rows: Vec<Vec<serde_json::Value>> = serde_json::from_str(json)?;
        Ok(rows.into_iter().fold(Self::new(columns), |set, row| {
            set.row(row.into_iter().map(Value::from))
        }))
    }

    /// Queues one row of values.
    pub fn row<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.pending.push_back(values.into_iter().map(Into::into).collect());
        self
    }

    /// Stops iteration with `err` after the queued rows have been read.
    pub fn fail_after(mut self, err: ScanError) -> Self {
        self.failure = Some(err);
        self
    }

    /// Makes every call to [`columns`](RowScanner::columns) fail with `message`.
    pub fn fail_columns(mut self, message: impl Into<String>) -> Self {
        self.columns_failure = Some(message.into());
        self
    }

    /// Number of rows not yet advanced to.
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl RowScanner for MemoryRows {
    fn columns(&self) -> Result<Vec<String>, ScanError> {
        match &self.columns_failure {
            Some(message) => Err(ScanError::driver(message.clone())),
            None => Ok(self.columns.clone()),
        }
    }

    fn advance(&mut self) -> bool {
        self.current = self.pending.pop_front();
        if self.current.is_none() {
            if let Some(err) = self.failure.take() {
                self.err = Some(err);
            }
        }
        self.current.is_some()
    }

    fn take_err(&mut self) -> Option<ScanError> {
        self.err.take()
    }

    fn bind(&mut self, destinations: &mut [&mut dyn Destination]) -> Result<(), ScanError> {
        let row = self.current.as_ref().ok_or(ScanError::NoCurrentRow)?;

        if destinations.len() != self.columns.len() {
            return Err(ScanError::ColumnCount {
                columns: self.columns.len(),
                destinations: destinations.len(),
            });
        }
        if row.len() != self.columns.len() {
            return Err(ScanError::driver(format!(
                "row holds {} values for {} columns",
                row.len(),
                self.columns.len()
            )));
        }

        for ((destination, value), column) in destinations.iter_mut().zip(row).zip(&self.columns) {
            destination
                .assign(value)
                .map_err(|source| ScanError::Convert {
                    column: column.clone(),
                    source,
                })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::Discard;
    use crate::value::ConvertError;

    #[test]
    fn empty_set_has_no_rows() {
        let mut rows = MemoryRows::new(["a"]);
        assert!(!rows.advance());
        assert!(rows.take_err().is_none());
    }

    #[test]
    fn bind_fills_destinations_in_column_order() {
        let mut rows = MemoryRows::new(["id", "name"]).row([Value::Int(1), Value::from("Ann")]);
        assert!(rows.advance());

        let mut id = 0i64;
        let mut name = String::new();
        rows.bind(&mut [&mut id, &mut name]).unwrap();

        assert_eq!(id, 1);
        assert_eq!(name, "Ann");
    }

    #[test]
    fn current_row_can_be_bound_twice() {
        let mut rows = MemoryRows::new(["n"]).row([Value::Int(5)]);
        assert!(rows.advance());

        let mut first = 0u32;
        let mut second = String::new();
        rows.bind(&mut [&mut first]).unwrap();
        rows.bind(&mut [&mut second]).unwrap();

        assert_eq!(first, 5);
        assert_eq!(second, "5");
    }

    #[test]
    fn bind_before_advance_fails() {
        let mut rows = MemoryRows::new(["n"]).row([Value::Int(5)]);
        let mut n = 0i32;
        assert!(matches!(rows.bind(&mut [&mut n]), Err(ScanError::NoCurrentRow)));
    }

    #[test]
    fn bind_checks_destination_count() {
        let mut rows = MemoryRows::new(["a", "b"]).row([Value::Int(1), Value::Int(2)]);
        assert!(rows.advance());

        let mut a = 0i64;
        let err = rows.bind(&mut [&mut a]).unwrap_err();
        assert!(matches!(
            err,
            ScanError::ColumnCount {
                columns: 2,
                destinations: 1
            }
        ));
    }

    #[test]
    fn bind_reports_failing_column() {
        let mut rows = MemoryRows::new(["ok", "bad"]).row([Value::Int(1), Value::Null]);
        assert!(rows.advance());

        let mut ok = 0i64;
        let mut bad = 0i64;
        let err = rows.bind(&mut [&mut ok, &mut bad]).unwrap_err();
        match err {
            ScanError::Convert { column, source } => {
                assert_eq!(column, "bad");
                assert_eq!(source, ConvertError::Null { target: "i64" });
            }
            other => panic!("expected Convert, got {other:?}"),
        }
    }

    #[test]
    fn failure_surfaces_after_queued_rows() {
        let mut rows = MemoryRows::new(["a"])
            .row([Value::Int(1)])
            .fail_after(ScanError::driver("connection reset"));

        assert!(rows.advance());
        assert!(rows.take_err().is_none());
        assert!(!rows.advance());
        assert!(matches!(rows.take_err(), Some(ScanError::Driver(_))));
        assert!(rows.take_err().is_none());
    }

    #[test]
    fn columns_failure() {
        let rows = MemoryRows::new(["a"]).fail_columns("gone");
        assert!(matches!(rows.columns(), Err(ScanError::Driver(_))));
    }

    #[test]
    fn from_json_rows() {
        let mut rows = MemoryRows::from_json(["id", "name"], r#"[[1, "Ann"], [2, null]]"#).unwrap();
        assert_eq!(rows.remaining(), 2);
        assert!(rows.advance());

        let mut id = 0u64;
        let mut name = String::new();
        rows.bind(&mut [&mut id, &mut name]).unwrap();
        assert_eq!((id, name.as_str()), (1, "Ann"));

        assert!(rows.advance());
        let mut skip = Discard;
        let mut missing = String::new();
        assert!(rows.bind(&mut [&mut skip, &mut missing]).is_err());
    }
}
