//! Decoding rows into caller-supplied destinations.
//!
//! Two entry points drive a [`RowScanner`]:
//!
//! - [`decode_one`] fills a scalar or a record from the first row.
//! - [`decode_many`] appends one element per row to a `Vec` of scalars or
//!   records, optionally wrapped in `Option` or `Box`.
//!
//! The destination's [`Shape`] is resolved once on entry; per-row work is
//! limited to building destinations and binding them.

use std::any;

use thiserror::Error;
use tracing::{debug, trace};

use crate::record::{Record, RecordError, Sealed, bind_columns};
use crate::scan::{Destination, RowScanner, ScanError};

/// Errors returned by [`decode_one`] and [`decode_many`].
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid destination: {0}")]
    InvalidDestination(String),

    /// The query succeeded but produced no rows.
    #[error("no rows in result set")]
    NoRows,

    #[error("failed to bind row: {0}")]
    Bind(#[source] ScanError),

    #[error("row iteration failed: {0}")]
    Scan(#[from] ScanError),

    #[error("unsupported destination type `{type_name}`")]
    UnsupportedType { type_name: &'static str },

    #[error(transparent)]
    Record(#[from] RecordError),
}

impl DecodeError {
    /// Returns `true` for [`DecodeError::NoRows`].
    pub fn is_no_rows(&self) -> bool {
        matches!(self, Self::NoRows)
    }
}

/// Broad category of a destination type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Scalar,
    Record,
    Sequence,
    Unsupported,
}

/// A destination viewed through its shape.
pub enum Slot<'a> {
    Scalar(&'a mut dyn Destination),
    Record(&'a mut dyn Record),
    Sequence(&'a mut dyn Sequence),
    Unsupported,
}

impl Slot<'_> {
    pub fn shape(&self) -> Shape {
        match self {
            Slot::Scalar(_) => Shape::Scalar,
            Slot::Record(_) => Shape::Record,
            Slot::Sequence(_) => Shape::Sequence,
            Slot::Unsupported => Shape::Unsupported,
        }
    }
}

/// A type rows can be decoded into.
///
/// Implemented for every scalar, for records declared with
/// [`record!`](crate::record!), and for `Vec`s of decodable elements.
pub trait Decode {
    fn slot(&mut self) -> Slot<'_>;
}

/// An element type of a decodable `Vec`.
///
/// `Base` is the type a row is decoded into; `wrap` turns the decoded base
/// into the stored element. Scalars and records are their own base; `Option`
/// and `Box` strip one level of indirection.
pub trait Element: Sized {
    type Base: Decode;

    fn wrap(base: Self::Base) -> Self;
}

impl<T: Decode> Element for Option<T> {
    type Base = T;

    fn wrap(base: T) -> Self {
        Some(base)
    }
}

impl<T: Decode> Element for Box<T> {
    type Base = T;

    fn wrap(base: T) -> Self {
        Box::new(base)
    }
}

/// A growable sequence that decodes one element per row.
pub trait Sequence {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Name of the element type.
    fn element_name(&self) -> &'static str;

    /// Shape of the element's base type.
    fn element_shape(&self) -> Shape;

    /// Creates a fresh base value, lets `fill` decode into it, and appends it
    /// on success. Nothing is appended when `fill` fails.
    fn push_with(
        &mut self,
        fill: &mut dyn FnMut(Slot<'_>) -> Result<(), DecodeError>,
    ) -> Result<(), DecodeError>;
}

impl<E> Sequence for Vec<E>
where
    E: Element,
    E::Base: Default,
{
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn element_name(&self) -> &'static str {
        any::type_name::<E>()
    }

    fn element_shape(&self) -> Shape {
        let mut probe = E::Base::default();
        probe.slot().shape()
    }

    fn push_with(
        &mut self,
        fill: &mut dyn FnMut(Slot<'_>) -> Result<(), DecodeError>,
    ) -> Result<(), DecodeError> {
        let mut base = E::Base::default();
        fill(base.slot())?;
        self.push(E::wrap(base));
        Ok(())
    }
}

impl<E> Decode for Vec<E>
where
    E: Element,
    E::Base: Default,
{
    fn slot(&mut self) -> Slot<'_> {
        Slot::Sequence(self)
    }
}

impl<E> Element for Vec<E>
where
    E: Element,
    E::Base: Default,
{
    type Base = Self;

    fn wrap(base: Self) -> Self {
        base
    }
}

impl<T> Decode for Sealed<T> {
    fn slot(&mut self) -> Slot<'_> {
        Slot::Unsupported
    }
}

impl<T> Element for Sealed<T> {
    type Base = Self;

    fn wrap(base: Self) -> Self {
        base
    }
}

macro_rules! scalar_decode {
    ($($t:ty),* $(,)?) => {$(
        impl Decode for $t {
            fn slot(&mut self) -> Slot<'_> {
                Slot::Scalar(self)
            }
        }

        impl Element for $t {
            type Base = Self;
        
            fn wrap(base: Self) -> Self {
                base
            }
        }
    )*};
}

for_each_scalar!(scalar_decode);

/// The destination handed to [`decode_one`] or [`decode_many`].
///
/// Built from `&mut T` (valid) or `Option<&mut T>` (`None` is a null
/// destination). A destination passed by value can be wrapped with
/// [`Target::owned`]; decoding into it would be lost on return, so it is
/// rejected like a null one.
pub enum Target<'a, T> {
    Ref(&'a mut T),
    Null,
    Owned(T),
}

impl<'a, T> Target<'a, T> {
    pub fn owned(value: T) -> Self {
        Self::Owned(value)
    }

    pub(crate) fn resolve(self) -> Result<&'a mut T, DecodeError> {
        match self {
            Self::Ref(destination) => Ok(destination),
            Self::Null => Err(DecodeError::InvalidDestination(format!(
                "null reference to `{}`",
                any::type_name::<T>()
            ))),
            Self::Owned(_) => Err(DecodeError::InvalidDestination(format!(
                "`{}` passed by value, expected a mutable reference",
                any::type_name::<T>()
            ))),
        }
    }
}

impl<'a, T> From<&'a mut T> for Target<'a, T> {
    fn from(destination: &'a mut T) -> Self {
        Self::Ref(destination)
    }
}

impl<'a, T> From<Option<&'a mut T>> for Target<'a, T> {
    fn from(destination: Option<&'a mut T>) -> Self {
        destination.map_or(Self::Null, Self::Ref)
    }
}

/// Decodes the first row of `rows` into `target`.
///
/// Exactly one row is consumed; any further rows are left for the caller to
/// drain or close.
///
/// # Errors
///
/// - [`DecodeError::InvalidDestination`] — `target` is null or by value. The
///   scanner is not touched.
/// - [`DecodeError::Scan`] — iteration failed before the first row.
/// - [`DecodeError::NoRows`] — the result set is empty.
/// - [`DecodeError::UnsupportedType`] — `T` is neither a scalar nor a record.
/// - [`DecodeError::Record`] — the record cannot be aligned with the columns.
/// - [`DecodeError::Bind`] — the scanner failed to bind the row.
///
/// # Examples
///
/// ```
/// use rowmap::decode::decode_one;
/// use rowmap::scan::MemoryRows;
/// use rowmap::value::Value;
///
/// let mut rows = MemoryRows::new(["count"]).row([Value::Int(42)]);
/// let mut count = 0i64;
/// decode_one(&mut count, &mut rows).unwrap();
/// assert_eq!(count, 42);
/// ```
pub fn decode_one<'a, T, S>(target: impl Into<Target<'a, T>>, rows: &mut S) -> Result<(), DecodeError>
where
    T: Decode + 'a,
    S: RowScanner + ?Sized,
{
    let destination = target.into().resolve()?;
    let type_name = any::type_name::<T>();

    if !rows.advance() {
        return Err(match rows.take_err() {
            Some(err) => DecodeError::Scan(err),
            None => DecodeError::NoRows,
        });
    }

    match destination.slot() {
        Slot::Scalar(scalar) => rows.bind(&mut [scalar]).map_err(DecodeError::Bind)?,
        Slot::Record(record) => {
            let columns = rows.columns()?;
            let mut bindings = bind_columns(record, &columns)?;
            rows.bind(&mut bindings.destinations())
                .map_err(DecodeError::Bind)?;
        }
        Slot::Sequence(_) | Slot::Unsupported => {
            return Err(DecodeError::UnsupportedType { type_name });
        }
    }

    trace!(destination = type_name, "decoded one row");
    Ok(())
}

/// Appends one element per remaining row of `rows` to the `Vec` behind
/// `target` and returns the number of appended elements.
///
/// An empty result set is not an error: the `Vec` is left unchanged.
/// Existing elements are kept, and on a mid-stream failure the elements
/// appended so far stay in place.
///
/// # Errors
///
/// - [`DecodeError::InvalidDestination`] — `target` is null or by value.
/// - [`DecodeError::UnsupportedType`] — `T` is not a `Vec`, or its element is
///   neither a scalar nor a record (after stripping `Option`/`Box`).
/// - [`DecodeError::Scan`] — reading columns or iterating failed.
/// - [`DecodeError::Record`] / [`DecodeError::Bind`] — a row could not be
///   bound.
///
/// # Examples
///
/// ```
/// use rowmap::decode::decode_many;
/// use rowmap::scan::MemoryRows;
/// use rowmap::value::Value;
///
/// let mut rows = MemoryRows::new(["n"])
///     .row([Value::Int(1)])
///     .row([Value::Int(2)])
///     .row([Value::Int(3)]);
/// let mut numbers: Vec<i32> = Vec::new();
/// assert_eq!(decode_many(&mut numbers, &mut rows).unwrap(), 3);
/// assert_eq!(numbers, [1, 2, 3]);
/// ```
pub fn decode_many<'a, T, S>(
    target: impl Into<Target<'a, T>>,
    rows: &mut S,
) -> Result<usize, DecodeError>
where
    T: Decode + 'a,
    S: RowScanner + ?Sized,
{
    let destination = target.into().resolve()?;
    let type_name = any::type_name::<T>();

    let Slot::Sequence(sequence) = destination.slot() else {
        return Err(DecodeError::UnsupportedType { type_name });
    };

    let appended = match sequence.element_shape() {
        Shape::Scalar => append_scalars(sequence, rows)?,
        Shape::Record => {
            let columns = rows.columns()?;
            append_records(sequence, rows, &columns)?
        }
        Shape::Sequence | Shape::Unsupported => {
            return Err(DecodeError::UnsupportedType {
                type_name: sequence.element_name(),
            });
        }
    };

    if let Some(err) = rows.take_err() {
        return Err(DecodeError::Scan(err));
    }

    debug!(destination = type_name, rows = appended, "decoded rows");
    Ok(appended)
}

fn append_scalars<S>(sequence: &mut dyn Sequence, rows: &mut S) -> Result<usize, DecodeError>
where
    S: RowScanner + ?Sized,
{
    let element = sequence.element_name();
    let mut appended = 0;

    while rows.advance() {
        sequence.push_with(&mut |slot: Slot<'_>| match slot {
            Slot::Scalar(scalar) => rows.bind(&mut [scalar]).map_err(DecodeError::Bind),
            _ => Err(DecodeError::UnsupportedType { type_name: element }),
        })?;
        appended += 1;
    }

    Ok(appended)
}

fn append_records<S>(
    sequence: &mut dyn Sequence,
    rows: &mut S,
    columns: &[String],
) -> Result<usize, DecodeError>
where
    S: RowScanner + ?Sized,
{
    let element = sequence.element_name();
    let mut appended = 0;

    while rows.advance() {
        sequence.push_with(&mut |slot: Slot<'_>| match slot {
            Slot::Record(record) => {
                let mut bindings = bind_columns(record, columns)?;
                rows.bind(&mut bindings.destinations())
                    .map_err(DecodeError::Bind)?;
                Ok(())
            }
            _ => Err(DecodeError::UnsupportedType { type_name: element }),
        })?;
        appended += 1;
    }

    Ok(appended)
}
