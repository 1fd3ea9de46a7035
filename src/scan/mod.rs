//! The row scanner capability consumed by the decoder.
//!
//! A [`RowScanner`] is a forward-only cursor over one result set. The decoder
//! never owns or closes it; it only asks for the column names, advances row by
//! row, and hands the scanner one [`Destination`] per column to fill.

use thiserror::Error;

use crate::value::{ConvertError, FromValue, Value};

pub mod memory;

pub use memory::MemoryRows;

/// A settable location that receives one column value of the current row.
///
/// Every scalar type the crate knows about is a destination; so is
/// [`Discard`], which swallows columns nobody asked for.
pub trait Destination {
    /// Stores `value` in this destination.
    fn assign(&mut self, value: &Value) -> Result<(), ConvertError>;

    /// Name of the Rust type behind this destination.
    fn type_name(&self) -> &'static str;
}

macro_rules! scalar_destination {
    ($($t:ty),* $(,)?) => {$(
        impl Destination for $t {
            fn assign(&mut self, value: &Value) -> Result<(), ConvertError> {
                *self = <$t as FromValue>::from_value(value)?;
                Ok(())
            }

            fn type_name(&self) -> &'static str {
                std::any::type_name::<$t>()
            }
        }
    )*};
}

for_each_scalar!(scalar_destination);

/// A destination that accepts any value and keeps none of it.
///
/// Columns that have no matching field are read into a `Discard` so the row
/// can still be bound in one call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Discard;

impl Destination for Discard {
    fn assign(&mut self, _value: &Value) -> Result<(), ConvertError> {
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        "Discard"
    }
}

/// Errors reported by a row scanner.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("row has {columns} columns but {destinations} destinations were supplied")]
    ColumnCount { columns: usize, destinations: usize },

    #[error("column `{column}`: {source}")]
    Convert {
        column: String,
        #[source]
        source: ConvertError,
    },

    #[error("no current row — advance the scanner before binding")]
    NoCurrentRow,

    #[error("driver error: {0}")]
    Driver(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ScanError {
    /// Wraps an error raised by the underlying database client.
    pub fn driver(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Driver(err.into())
    }
}

/// Forward-only cursor over a tabular result set.
///
/// # Contract
///
/// - [`columns`](Self::columns) is fixed for the lifetime of the result set.
/// - [`advance`](Self::advance) returns `false` at the end of data *or* on
///   failure; [`take_err`](Self::take_err) tells the two apart.
/// - [`bind`](Self::bind) fills exactly one row and fails with
///   [`ScanError::ColumnCount`] when the number of destinations differs from
///   the number of columns.
pub trait RowScanner {
    /// Column names of the result set, in order.
    fn columns(&self) -> Result<Vec<String>, ScanError>;

    /// Moves to the next row. Returns `true` when a row is available.
    fn advance(&mut self) -> bool;

    /// Takes the error that stopped iteration, if any.
    fn take_err(&mut self) -> Option<ScanError>;

    /// Binds the current row's values into `destinations`, index-aligned with
    /// [`columns`](Self::columns).
    fn bind(&mut self, destinations: &mut [&mut dyn Destination]) -> Result<(), ScanError>;
}

impl<S: RowScanner + ?Sized> RowScanner for &mut S {
    fn columns(&self) -> Result<Vec<String>, ScanError> {
        (**self).columns()
    }

    fn advance(&mut self) -> bool {
        (**self).advance()
    }

    fn take_err(&mut self) -> Option<ScanError> {
        (**self).take_err()
    }

    fn bind(&mut self, destinations: &mut [&mut dyn Destination]) -> Result<(), ScanError> {
        (**self).bind(destinations)
    }
}

impl<S: RowScanner + ?Sized> RowScanner for Box<S> {
    fn columns(&self) -> Result<Vec<String>, ScanError> {
        (**self).columns()
    }

    fn advance(&mut self) -> bool {
        (**self).advance()
    }

    fn take_err(&mut self) -> Option<ScanError> {
        (**self).take_err()
    }

    fn bind(&mut self, destinations: &mut [&mut dyn Destination]) -> Result<(), ScanError> {
        (**self).bind(destinations)
    }
}
