//! Records — structs whose fields can be bound to result-set columns.
//!
//! A [`Record`] lists its fields once, in declaration order, together with an
//! optional column tag per field. The decoder uses that description to build
//! one destination per column, either by tag name or, when the record is not
//! fully tagged, by position.
//!
//! Records are normally declared with the [`record!`](crate::record!) macro:
//!
//! ```
//! use rowmap::record;
//!
//! record! {
//!     #[derive(Debug, Default, PartialEq)]
//!     pub struct User {
//!         pub id: i64 => "id",
//!         pub name: String => "name",
//!         pub email: Option<String> => "email,omitempty",
//!     }
//! }
//!
//! let mut user = User::default();
//! assert_eq!(rowmap::record::Record::fields_mut(&mut user).len(), 3);
//! ```

use std::ops::{Deref, DerefMut};

use thiserror::Error;

use crate::scan::Destination;

pub mod columns;
pub mod field_map;
pub mod tag;

pub use columns::{ColumnBindings, bind_columns};
pub use field_map::{FieldMap, FieldMapping, FieldPlan, build_field_map};

/// Errors raised while turning a record into column destinations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("field `{field}` of `{record}` is not readable")]
    NotReadable {
        record: &'static str,
        field: &'static str,
    },

    #[error("`{record}` has {fields} fields but the row has {columns} columns")]
    TooManyColumns {
        record: &'static str,
        fields: usize,
        columns: usize,
    },
}

/// How a field takes part in binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// A plain scalar bound in place.
    Value,
    /// An `Option` that is filled with a default value before binding.
    Optional,
    /// A field that can never be bound.
    Sealed,
}

/// Static description of one record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    name: &'static str,
    tag: &'static str,
    kind: FieldKind,
}

impl FieldDescriptor {
    pub const fn new(name: &'static str, tag: &'static str, kind: FieldKind) -> Self {
        Self { name, tag, kind }
    }

    /// The Rust field name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The raw tag string, empty when the field is untagged.
    pub fn tag(&self) -> &'static str {
        self.tag
    }

    /// The column this field binds to in tag mode.
    pub fn column(&self) -> Option<&'static str> {
        tag::column_name(self.tag)
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }
}

/// A mutable view of one record field, ready to become a destination.
pub enum Field<'a> {
    Value(&'a mut dyn Destination),
    Optional(&'a mut dyn Optional),
    Sealed,
}

impl<'a> Field<'a> {
    /// Resolves the field to the destination a scanner writes into.
    ///
    /// Unset optional fields are materialized first, so the returned
    /// destination always exists.
    ///
    /// # Errors
    ///
    /// [`RecordError::NotReadable`] for sealed fields.
    pub fn into_destination(
        self,
        record: &'static str,
        field: &'static str,
    ) -> Result<&'a mut dyn Destination, RecordError> {
        match self {
            Field::Value(destination) => Ok(destination),
            Field::Optional(optional) => Ok(optional.materialize()),
            Field::Sealed => Err(RecordError::NotReadable { record, field }),
        }
    }
}

/// A field that may be unset and is materialized on first bind.
pub trait Optional {
    /// Fills the field with its default value if it is unset and returns the
    /// inner destination.
    fn materialize(&mut self) -> &mut dyn Destination;
}

/// Conversion of a field into its [`Field`] view.
pub trait IntoField {
    const KIND: FieldKind;

    fn as_field(&mut self) -> Field<'_>;
}

macro_rules! scalar_field {
    ($($t:ty),* $(,)?) => {$(
        impl IntoField for $t {
            const KIND: FieldKind = FieldKind::Value;

            fn as_field(&mut self) -> Field<'_> {
                Field::Value(self)
            }
        }

        impl Optional for Option<$t> {
            fn materialize(&mut self) -> &mut dyn Destination {
                self.get_or_insert_with(<$t>::default)
            }
        }

        impl IntoField for Option<$t> {
            const KIND: FieldKind = FieldKind::Optional;

            fn as_field(&mut self) -> Field<'_> {
                Field::Optional(self)
            }
        }
    )*};
}

for_each_scalar!(scalar_field);

/// A record field that is never bound from a row.
///
/// Use it for state a record carries alongside its columns. Any attempt to
/// bind a column into it fails with [`RecordError::NotReadable`].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Sealed<T>(pub T);

impl<T> Deref for Sealed<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for Sealed<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<T> IntoField for Sealed<T> {
    const KIND: FieldKind = FieldKind::Sealed;

    fn as_field(&mut self) -> Field<'_> {
        Field::Sealed
    }
}

/// A struct whose fields can be bound to result-set columns.
///
/// Implemented by [`record!`](crate::record!); hand-written implementations
/// must return fields from [`fields_mut`](Self::fields_mut) in the same order
/// as the descriptors in [`plan`](Self::plan).
pub trait Record {
    /// Name of the record type, used in errors and logs.
    fn record_name(&self) -> &'static str;

    /// Binding plan of the record type, computed once per type.
    fn plan(&self) -> &'static FieldPlan;

    /// Mutable views of every field, in declaration order.
    fn fields_mut(&mut self) -> Vec<Field<'_>>;
}

#[doc(hidden)]
#[macro_export]
macro_rules! __record_tag {
    () => {
        ""
    };
    ($tag:literal) => {
        $tag
    };
}

/// Declares a struct and makes it decodable from rows.
///
/// Each field may carry a column tag after `=>`. The first comma-separated
/// token of the tag is the column name. A record binds by tag only when
/// *every* field is tagged; otherwise columns bind to fields by position.
///
/// Field types must be scalars, `Option` of a scalar, or [`Sealed`]. The
/// struct must implement `Default` to be decoded as an element of a `Vec`.
///
/// ```
/// use rowmap::record;
///
/// record! {
///     /// Positional: columns map to `x`, `y` in that order.
///     #[derive(Debug, Default)]
///     pub struct Point {
///         pub x: f64,
///         pub y: f64,
///     }
/// }
/// ```
#[macro_export]
macro_rules! record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$fmeta:meta])*
                $fvis:vis $field:ident : $ty:ty $(=> $tag:literal)?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$fmeta])*
                $fvis $field: $ty,
            )*
        }

        impl $crate::record::Record for $name {
            fn record_name(&self) -> &'static str {
                ::core::stringify!($name)
            }

            fn plan(&self) -> &'static $crate::record::FieldPlan {
                static PLAN: ::std::sync::OnceLock<$crate::record::FieldPlan> =
                    ::std::sync::OnceLock::new();
                PLAN.get_or_init(|| {
                    $crate::record::FieldPlan::new(
                        ::core::stringify!($name),
                        &[$(
                            $crate::record::FieldDescriptor::new(
                                ::core::stringify!($field),
                                $crate::__record_tag!($($tag)?),
                                <$ty as $crate::record::IntoField>::KIND,
                            ),
                        )*],
                    )
                })
            }

            fn fields_mut(&mut self) -> ::std::vec::Vec<$crate::record::Field<'_>> {
                ::std::vec![$(
                    $crate::record::IntoField::as_field(&mut self.$field),
                )*]
            }
        }

        impl $crate::decode::Decode for $name {
            fn slot(&mut self) -> $crate::decode::Slot<'_> {
                $crate::decode::Slot::Record(self)
            }
        }

        impl $crate::decode::Element for $name {
            type Base = Self;

            fn wrap(base: Self) -> Self {
                base
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    crate::record! {
        #[derive(Debug, Default, PartialEq)]
        struct Account {
            id: i64 => "id",
            owner: Option<String> => "owner,omitempty",
            cache: Sealed<Vec<u8>> => "cache",
        }
    }

    crate::record! {
        #[derive(Debug, Default)]
        struct Pair {
            left: i32,
            right: i32 => "right",
        }
    }

    #[test]
    fn descriptors_follow_declaration_order() {
        let account = Account::default();
        let names: Vec<_> = account.plan().fields().iter().map(|f| f.name()).collect();
        assert_eq!(names, ["id", "owner", "cache"]);
        assert_eq!(account.record_name(), "Account");
    }

    #[test]
    fn descriptor_kinds_and_columns() {
        let account = Account::default();
        let fields = account.plan().fields();
        assert_eq!(fields[0].kind(), FieldKind::Value);
        assert_eq!(fields[1].kind(), FieldKind::Optional);
        assert_eq!(fields[1].tag(), "owner,omitempty");
        assert_eq!(fields[1].column(), Some("owner"));
        assert_eq!(fields[2].kind(), FieldKind::Sealed);
    }

    #[test]
    fn untagged_field_has_empty_tag() {
        let pair = Pair::default();
        let fields = pair.plan().fields();
        assert_eq!(fields[0].tag(), "");
        assert_eq!(fields[0].column(), None);
    }

    #[test]
    fn plan_is_shared_per_type() {
        let a = Account::default();
        let b = Account::default();
        assert!(std::ptr::eq(a.plan(), b.plan()));
    }

    #[test]
    fn optional_field_materializes() {
        let mut owner: Option<String> = None;
        owner.materialize().assign(&Value::from("Ann")).unwrap();
        assert_eq!(owner.as_deref(), Some("Ann"));
    }

    #[test]
    fn materialize_keeps_existing_value() {
        let mut n = Some(9i64);
        let destination = n.materialize();
        assert_eq!(destination.type_name(), "i64");
        assert_eq!(n, Some(9));
    }

    #[test]
    fn sealed_field_is_not_readable() {
        let mut account = Account::default();
        let mut fields = account.fields_mut();
        let cache = fields.pop().unwrap();
        assert_eq!(
            cache.into_destination("Account", "cache").err(),
            Some(RecordError::NotReadable {
                record: "Account",
                field: "cache"
            })
        );
    }

    #[test]
    fn sealed_derefs_to_inner() {
        let mut sealed = Sealed(vec![1u8]);
        sealed.push(2);
        assert_eq!(sealed.len(), 2);
    }
}
