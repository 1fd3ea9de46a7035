//! # rowmap
//!
//! Maps SQL result rows into scalars, structs, and vectors of either.
//!
//! The engine consumes any [`RowScanner`](scan::RowScanner) (column names,
//! row advancement, per-row binding) and fills a caller-supplied destination:
//!
//! - [`decode_one`] — a scalar or a [`record!`] struct from the first row;
//!   an empty result is [`DecodeError::NoRows`].
//! - [`decode_many`] — a `Vec` of scalars or records (optionally wrapped in
//!   `Option` or `Box`), one element per row; an empty result is not an error.
//!
//! Struct fields bind to columns by tag when every field is tagged, and by
//! position otherwise.
//!
//! ## Quick Start
//!
//! ```rust
//! use rowmap::{decode_many, record};
//! use rowmap::scan::MemoryRows;
//!
//! record! {
//!     #[derive(Debug, Default)]
//!     pub struct User {
//!         pub id: i64 => "id",
//!         pub name: String => "name",
//!     }
//! }
//!
//! let mut rows = MemoryRows::from_json(["id", "name", "created_at"], r#"[[1, "Ann", "2024-01-01"]]"#)?;
//! let mut users: Vec<User> = Vec::new();
//! decode_many(&mut users, &mut rows)?;
//! assert_eq!(users[0].name, "Ann");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Every scalar type that can be a destination, a record field, or a `Vec`
// element. Modules expand their per-type impls through this list.
macro_rules! for_each_scalar {
    ($mac:ident) => {
        $mac!(
            bool,
            i8,
            i16,
            i32,
            i64,
            isize,
            u8,
            u16,
            u32,
            u64,
            usize,
            f32,
            f64,
            String,
            bytes::Bytes,
        );
    };
}

// ── Mapping engine ────────────────────────────────────────────────────────────
pub mod decode;
pub mod record;
pub mod scan;
pub mod value;

// ── Database glue ─────────────────────────────────────────────────────────────
pub mod database;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use database::{Connection, Database, QueryError};
pub use decode::{Decode, DecodeError, Target, decode_many, decode_one};
pub use record::Record;
pub use scan::{Destination, MemoryRows, RowScanner, ScanError};
pub use value::Value;
