//! Database glue — running a query and decoding its rows.
//!
//! The crate does not talk to a database itself. A client library implements
//! [`Connection`], and [`Database`] wraps it with the two calls applications
//! actually use: [`query_row`](Database::query_row) and
//! [`query_rows`](Database::query_rows). Connection pooling, SQL construction,
//! and transactions stay with the client.
//!
//! Open databases are kept by name in a [`Registry`].

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::decode::{Decode, DecodeError, Target, decode_many, decode_one};
use crate::scan::RowScanner;
use crate::value::Value;

pub mod config;
pub mod registry;

pub use config::{ConfigError, DataSource, RegistryConfig};
pub use registry::{Connector, Registry, RegistryError};

/// Error type used by client libraries.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors produced by [`Database`] queries.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("query on `{alias}` failed: {source}")]
    Driver {
        alias: String,
        #[source]
        source: BoxError,
    },

    #[error("query on `{alias}` timed out after {after:?}")]
    Timeout { alias: String, after: Duration },

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl QueryError {
    /// Returns `true` when the query ran but returned no rows.
    pub fn is_no_rows(&self) -> bool {
        matches!(self, Self::Decode(err) if err.is_no_rows())
    }
}

/// A database client connection (or pool) able to run queries.
///
/// The returned rows are dropped as soon as decoding finishes; implementations
/// should release the underlying cursor in `Drop`.
pub trait Connection: Send + Sync + 'static {
    type Rows: RowScanner + Send;

    /// Runs `sql` with positional `args` and returns a cursor over the result.
    fn query(
        &self,
        sql: &str,
        args: &[Value],
    ) -> impl Future<Output = Result<Self::Rows, BoxError>> + Send;
}

/// A named connection with row decoding on top.
///
/// # Examples
///
/// ```rust,no_run
/// use rowmap::{Connection, Database, Value};
///
/// # async fn example<C: Connection>(conn: C) -> Result<(), rowmap::QueryError> {
/// let db = Database::new("main", conn);
///
/// let mut count = 0i64;
/// db.query_row(&mut count, "SELECT COUNT(*) FROM users", &[]).await?;
///
/// let mut names: Vec<String> = Vec::new();
/// db.query_rows(&mut names, "SELECT name FROM users WHERE age > ?", &[Value::Int(30)])
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Database<C> {
    alias: String,
    conn: C,
    query_timeout: Option<Duration>,
}

impl<C: Connection> Database<C> {
    pub fn new(alias: impl Into<String>, conn: C) -> Self {
        Self {
            alias: alias.into(),
            conn,
            query_timeout: None,
        }
    }

    /// Bounds how long the client may take to produce the result set.
    ///
    /// Decoding the rows is not covered by the deadline.
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn connection(&self) -> &C {
        &self.conn
    }

    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout
    }

    /// Runs `sql` and returns the raw row cursor.
    ///
    /// # Errors
    ///
    /// - [`QueryError::Driver`] — the client rejected or failed the query.
    /// - [`QueryError::Timeout`] — the configured query timeout elapsed.
    pub async fn query(&self, sql: &str, args: &[Value]) -> Result<C::Rows, QueryError> {
        debug!(alias = %self.alias, sql, args = args.len(), "executing query");

        let pending = self.conn.query(sql, args);
        let result = match self.query_timeout {
            Some(after) => tokio::time::timeout(after, pending)
                .await
                .map_err(|_| QueryError::Timeout {
                    alias: self.alias.clone(),
                    after,
                })?,
            None => pending.await,
        };

        result.map_err(|source| QueryError::Driver {
            alias: self.alias.clone(),
            source,
        })
    }

    /// Runs `sql` and decodes the first row into `target`.
    ///
    /// An invalid target is rejected before the query is sent. A query that
    /// returns nothing fails with a no-rows error; check it with
    /// [`QueryError::is_no_rows`].
    pub async fn query_row<'a, T>(
        &self,
        target: impl Into<Target<'a, T>>,
        sql: &str,
        args: &[Value],
    ) -> Result<(), QueryError>
    where
        T: Decode + 'a,
    {
        let destination = target.into().resolve()?;
        let mut rows = self.query(sql, args).await?;
        decode_one(destination, &mut rows)?;
        Ok(())
    }

    /// Runs `sql` and appends every row to the `Vec` behind `target`.
    ///
    /// Returns the number of appended rows; an empty result is not an error.
    pub async fn query_rows<'a, T>(
        &self,
        target: impl Into<Target<'a, T>>,
        sql: &str,
        args: &[Value],
    ) -> Result<usize, QueryError>
    where
        T: Decode + 'a,
    {
        let destination = target.into().resolve()?;
        let mut rows = self.query(sql, args).await?;
        Ok(decode_many(destination, &mut rows)?)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::scan::MemoryRows;

    crate::record! {
        #[derive(Debug, Default, Clone, PartialEq)]
        struct User {
            id: i64 => "id",
            name: String => "name",
        }
    }

    /// Serves canned result sets keyed by SQL text.
    #[derive(Debug, Default)]
    pub(crate) struct FakeConnection {
        pub(crate) dsn: String,
        fixtures: HashMap<String, (Vec<String>, String)>,
        delay: Option<Duration>,
    }

    impl FakeConnection {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn fixture(mut self, sql: &str, columns: &[&str], json: &str) -> Self {
            let columns = columns.iter().map(|c| c.to_string()).collect();
            self.fixtures.insert(sql.to_owned(), (columns, json.to_owned()));
            self
        }

        fn delayed(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }
    }

    impl Connection for FakeConnection {
        type Rows = MemoryRows;

        async fn query(&self, sql: &str, _args: &[Value]) -> Result<MemoryRows, BoxError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let (columns, json) = self
                .fixtures
                .get(sql)
                .ok_or_else(|| format!("unknown statement: {sql}"))?;
            Ok(MemoryRows::from_json(columns.clone(), json)?)
        }
    }

    fn users_db() -> Database<FakeConnection> {
        let conn = FakeConnection::new()
            .fixture(
                "SELECT id, name FROM users",
                &["id", "name"],
                r#"[[1, "Ann"], [2, "Bob"]]"#,
            )
            .fixture("SELECT id, name FROM users WHERE 0", &["id", "name"], "[]")
            .fixture("SELECT COUNT(*) FROM users", &["count"], "[[2]]");
        Database::new("main", conn)
    }

    #[tokio::test]
    async fn query_row_scalar() {
        let db = users_db();
        let mut count = 0u32;
        db.query_row(&mut count, "SELECT COUNT(*) FROM users", &[])
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn query_row_record_takes_first_row() {
        let db = users_db();
        let mut user = User::default();
        db.query_row(&mut user, "SELECT id, name FROM users", &[])
            .await
            .unwrap();
        assert_eq!(
            user,
            User {
                id: 1,
                name: "Ann".into()
            }
        );
    }

    #[tokio::test]
    async fn query_row_no_rows() {
        let db = users_db();
        let mut user = User::default();
        let err = db
            .query_row(&mut user, "SELECT id, name FROM users WHERE 0", &[])
            .await
            .unwrap_err();
        assert!(err.is_no_rows());
    }

    #[tokio::test]
    async fn query_row_rejects_null_target_before_querying() {
        let db = users_db();
        let err = db
            .query_row(None::<&mut User>, "no such statement", &[])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            QueryError::Decode(DecodeError::InvalidDestination(_))
        ));
    }

    #[tokio::test]
    async fn query_rows_records() {
        let db = users_db();
        let mut users: Vec<User> = Vec::new();
        let n = db
            .query_rows(&mut users, "SELECT id, name FROM users", &[])
            .await
            .unwrap();
        assert_eq!(n, 2);
        assert_eq!(users[1].name, "Bob");
    }

    #[tokio::test]
    async fn query_rows_empty_is_ok() {
        let db = users_db();
        let mut users: Vec<User> = Vec::new();
        let n = db
            .query_rows(&mut users, "SELECT id, name FROM users WHERE 0", &[])
            .await
            .unwrap();
        assert_eq!(n, 0);
        assert!(users.is_empty());
    }

    crate::record! {
        #[derive(Debug, Default)]
        struct Contact {
            id: i64 => "id",
            email: Option<String> => "email,omitempty",
        }
    }

    #[tokio::test]
    async fn query_rows_optional_columns() {
        let conn = FakeConnection::new()
            .fixture(
                "SELECT id, email, created_at FROM users",
                &["id", "email", "created_at"],
                r#"[[1, "ann@example.com", "2024-01-01"], [2, "bob@example.com", "2024-02-11"]]"#,
            )
            .fixture(
                "SELECT id, email FROM users WHERE email IS NULL",
                &["id", "email"],
                r#"[[3, null]]"#,
            );
        let db = Database::new("main", conn);

        let mut contacts: Vec<Contact> = Vec::new();
        db.query_rows(&mut contacts, "SELECT id, email, created_at FROM users", &[])
            .await
            .unwrap();
        assert_eq!(contacts[1].email.as_deref(), Some("bob@example.com"));

        // A NULL column cannot be stored in a materialized optional field.
        let mut missing: Vec<Contact> = Vec::new();
        let err = db
            .query_rows(&mut missing, "SELECT id, email FROM users WHERE email IS NULL", &[])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            QueryError::Decode(DecodeError::Bind(crate::scan::ScanError::Convert { .. }))
        ));
        assert!(missing.is_empty());
    }

    #[tokio::test]
    async fn driver_error_carries_alias() {
        let db = users_db();
        let mut n = 0i64;
        let err = db.query_row(&mut n, "DROP TABLE users", &[]).await.unwrap_err();
        match err {
            QueryError::Driver { alias, source } => {
                assert_eq!(alias, "main");
                assert!(source.to_string().contains("unknown statement"));
            }
            other => panic!("expected Driver, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn query_timeout_elapses() {
        let conn = FakeConnection::new()
            .fixture("SELECT 1", &["one"], "[[1]]")
            .delayed(Duration::from_secs(5));
        let db = Database::new("slow", conn).with_query_timeout(Duration::from_millis(20));

        let mut one = 0i64;
        let err = db.query_row(&mut one, "SELECT 1", &[]).await.unwrap_err();
        assert!(matches!(err, QueryError::Timeout { ref alias, .. } if alias == "slow"));
    }

    #[tokio::test]
    async fn query_within_timeout() {
        let conn = FakeConnection::new()
            .fixture("SELECT 1", &["one"], "[[1]]")
            .delayed(Duration::from_millis(1));
        let db = Database::new("quick", conn).with_query_timeout(Duration::from_secs(5));

        let mut one = 0i64;
        db.query_row(&mut one, "SELECT 1", &[]).await.unwrap();
        assert_eq!(one, 1);
    }

    #[tokio::test]
    async fn raw_query_returns_cursor() {
        let db = users_db();
        let mut rows = db.query("SELECT id, name FROM users", &[]).await.unwrap();
        assert_eq!(rows.columns().unwrap(), ["id", "name"]);
        assert!(rows.advance());
        assert_eq!(rows.remaining(), 1);
    }
}
