//! Aligning record fields with the columns of a row.

use super::{Field, FieldMapping, FieldPlan, Record, RecordError, build_field_map};
use crate::scan::{Destination, Discard};

/// One column's destination.
pub enum ColumnSlot<'a> {
    /// A record field.
    Field(&'a mut dyn Destination),
    /// A column with no matching field; its value is read and dropped.
    Discard(Discard),
}

impl ColumnSlot<'_> {
    fn destination(&mut self) -> &mut dyn Destination {
        match self {
            ColumnSlot::Field(destination) => &mut **destination,
            ColumnSlot::Discard(discard) => discard,
        }
    }
}

/// Destinations for one row, index-aligned with the column list.
pub struct ColumnBindings<'a> {
    slots: Vec<ColumnSlot<'a>>,
}

impl ColumnBindings<'_> {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns `true` when column `index` is read into a [`Discard`].
    pub fn is_discarded(&self, index: usize) -> bool {
        matches!(self.slots.get(index), Some(ColumnSlot::Discard(_)))
    }

    /// Destinations in column order, ready for
    /// [`RowScanner::bind`](crate::scan::RowScanner::bind).
    pub fn destinations(&mut self) -> Vec<&mut dyn Destination> {
        self.slots.iter_mut().map(ColumnSlot::destination).collect()
    }
}

/// Builds one destination per column for `record`.
///
/// In tag mode each column binds to the field tagged with its name; columns
/// nobody claims are discarded without error. When a column name repeats, the
/// last occurrence receives the field, matching what sequential assignment
/// of every occurrence would leave behind.
///
/// In positional mode column `i` binds to field `i`.
///
/// # Errors
///
/// - [`RecordError::TooManyColumns`] — positional mode with more columns than
///   fields.
/// - [`RecordError::NotReadable`] — a field that must be bound is sealed.
pub fn bind_columns<'a>(
    record: &'a mut dyn Record,
    columns: &[String],
) -> Result<ColumnBindings<'a>, RecordError> {
    let plan = record.plan();

    let slots = match build_field_map(plan, record.fields_mut())? {
        FieldMapping::Tagged(mut map) => {
            let mut slots: Vec<_> = columns
                .iter()
                .rev()
                .map(|column| match map.remove(column.as_str()) {
                    Some(destination) => ColumnSlot::Field(destination),
                    None => ColumnSlot::Discard(Discard),
                })
                .collect();
            slots.reverse();
            slots
        }
        FieldMapping::Positional(fields) => positional(plan, fields, columns.len())?,
    };

    Ok(ColumnBindings { slots })
}

fn positional<'a>(
    plan: &FieldPlan,
    fields: Vec<Field<'a>>,
    columns: usize,
) -> Result<Vec<ColumnSlot<'a>>, RecordError> {
    if columns > fields.len() {
        return Err(RecordError::TooManyColumns {
            record: plan.record(),
            fields: fields.len(),
            columns,
        });
    }

    fields
        .into_iter()
        .zip(plan.fields())
        .take(columns)
        .map(|(field, descriptor)| {
            field
                .into_destination(plan.record(), descriptor.name())
                .map(ColumnSlot::Field)
        })
        .collect()
}
