//! Tag-keyed field maps and the per-type binding plan.

use std::collections::HashMap;

use tracing::debug;

use super::{Field, FieldDescriptor, RecordError};
use crate::scan::Destination;

/// Destinations of a record's fields keyed by column tag.
pub type FieldMap<'a> = HashMap<&'static str, &'a mut dyn Destination>;

/// Binding plan of a record type.
///
/// Whether a record binds by tag or by position depends only on its type, so
/// the decision is made once here: the plan is tagged when every field
/// declares a column name, and positional otherwise (including records with
/// no fields at all). Partial tagging is never honored field by field.
#[derive(Debug)]
pub struct FieldPlan {
    record: &'static str,
    fields: Vec<FieldDescriptor>,
    tags: Option<Vec<&'static str>>,
}

impl FieldPlan {
    pub fn new(record: &'static str, fields: &[FieldDescriptor]) -> Self {
        let tags: Option<Vec<_>> = if fields.is_empty() {
            None
        } else {
            fields.iter().map(FieldDescriptor::column).collect()
        };

        if tags.is_none() {
            debug!(
                record,
                fields = fields.len(),
                "record is not fully tagged; columns bind by position"
            );
        }

        Self {
            record,
            fields: fields.to_vec(),
            tags,
        }
    }

    pub fn record(&self) -> &'static str {
        self.record
    }

    /// Field descriptors in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Column name of each field, or `None` for a positional plan.
    pub fn tags(&self) -> Option<&[&'static str]> {
        self.tags.as_deref()
    }

    pub fn is_positional(&self) -> bool {
        self.tags.is_none()
    }
}

/// Outcome of [`build_field_map`].
pub enum FieldMapping<'a> {
    /// Every field is tagged: destinations keyed by column name.
    Tagged(FieldMap<'a>),
    /// The record binds by position; the fields are handed back untouched.
    Positional(Vec<Field<'a>>),
}

/// Builds the tag → destination map for one record instance.
///
/// `fields` must come from the record whose plan is `plan`. Unset optional
/// fields are materialized. When two fields declare the same tag the later
/// one wins.
///
/// # Errors
///
/// [`RecordError::NotReadable`] if a tagged field cannot be bound.
pub fn build_field_map<'a>(
    plan: &FieldPlan,
    fields: Vec<Field<'a>>,
) -> Result<FieldMapping<'a>, RecordError> {
    let Some(tags) = plan.tags() else {
        return Ok(FieldMapping::Positional(fields));
    };

    let mut map = FieldMap::with_capacity(fields.len());
    for ((field, tag), descriptor) in fields.into_iter().zip(tags).zip(plan.fields()) {
        let destination = field.into_destination(plan.record(), descriptor.name())?;
        map.insert(*tag, destination);
    }

    Ok(FieldMapping::Tagged(map))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Record, Sealed};
    use crate::value::Value;

    crate::record! {
        #[derive(Debug, Default)]
        struct Tagged {
            name: String => "name",
            age: Option<u32> => "age,omitempty",
        }
    }

    crate::record! {
        #[derive(Debug, Default)]
        struct Mixed {
            name: String => "name",
            age: u32,
        }
    }

    crate::record! {
        #[derive(Debug, Default)]
        struct Untagged {
            a: i64,
            b: i64,
        }
    }

    crate::record! {
        #[derive(Debug, Default)]
        struct Empty {}
    }

    crate::record! {
        #[derive(Debug, Default)]
        struct Duplicate {
            first: i64 => "id",
            second: i64 => "id",
        }
    }

    crate::record! {
        #[derive(Debug, Default)]
        struct Locked {
            id: i64 => "id",
            secret: Sealed<String> => "secret",
        }
    }

    fn tagged_map(record: &mut dyn Record) -> FieldMap<'_> {
        let plan = record.plan();
        match build_field_map(plan, record.fields_mut()).unwrap() {
            FieldMapping::Tagged(map) => map,
            FieldMapping::Positional(_) => panic!("expected a tagged mapping"),
        }
    }

    #[test]
    fn fully_tagged_plan() {
        let plan = Tagged::default().plan();
        assert_eq!(plan.tags(), Some(&["name", "age"][..]));
        assert!(!plan.is_positional());
    }

    #[test]
    fn partial_tagging_is_positional() {
        assert!(Mixed::default().plan().is_positional());
        assert!(Untagged::default().plan().is_positional());
    }

    #[test]
    fn empty_record_is_positional() {
        assert!(Empty::default().plan().is_positional());
    }

    #[test]
    fn map_keys_are_column_names() {
        let mut record = Tagged::default();
        let mut map = tagged_map(&mut record);
        let mut keys: Vec<_> = map.keys().copied().collect();
        keys.sort_unstable();
        assert_eq!(keys, ["age", "name"]);

        map.get_mut("name").unwrap().assign(&Value::from("Ann")).unwrap();
        drop(map);
        assert_eq!(record.name, "Ann");
    }

    #[test]
    fn optional_fields_are_materialized() {
        let mut record = Tagged::default();
        assert!(record.age.is_none());
        let map = tagged_map(&mut record);
        drop(map);
        assert_eq!(record.age, Some(0));
    }

    #[test]
    fn positional_mapping_returns_fields() {
        let mut record = Mixed::default();
        let plan = record.plan();
        match build_field_map(plan, record.fields_mut()).unwrap() {
            FieldMapping::Positional(fields) => assert_eq!(fields.len(), 2),
            FieldMapping::Tagged(_) => panic!("expected positional"),
        }
    }

    #[test]
    fn later_duplicate_tag_wins() {
        let mut record = Duplicate::default();
        let mut map = tagged_map(&mut record);
        assert_eq!(map.len(), 1);
        map.get_mut("id").unwrap().assign(&Value::Int(5)).unwrap();
        drop(map);
        assert_eq!((record.first, record.second), (0, 5));
    }

    #[test]
    fn sealed_tagged_field_is_not_readable() {
        let mut record = Locked::default();
        let plan = record.plan();
        let err = build_field_map(plan, record.fields_mut()).err();
        assert_eq!(
            err,
            Some(RecordError::NotReadable {
                record: "Locked",
                field: "secret"
            })
        );
    }
}
