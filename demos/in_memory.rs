//! Decoding rows from an in-memory "database".
//!
//! Run with:
//!   cargo run --example in_memory
//!
//! Set `RUST_LOG=rowmap=debug` to see registration and query logs.

use std::collections::HashMap;

use rowmap::database::{BoxError, Connector, DataSource, Registry, RegistryConfig};
use rowmap::{Connection, MemoryRows, Value, decode_one, record};
use tracing_subscriber::EnvFilter;

record! {
    #[derive(Debug, Default)]
    pub struct User {
        pub id: i64 => "id",
        pub name: String => "name",
        pub email: Option<String> => "email,omitempty",
    }
}

record! {
    /// Untagged: columns bind in declaration order.
    #[derive(Debug, Default)]
    pub struct Total {
        pub label: String,
        pub amount: f64,
    }
}

/// Canned result sets keyed by SQL text.
struct Tables {
    results: HashMap<&'static str, (&'static [&'static str], &'static str)>,
}

impl Connection for Tables {
    type Rows = MemoryRows;

    async fn query(&self, sql: &str, _args: &[Value]) -> Result<MemoryRows, BoxError> {
        let (columns, json) = self
            .results
            .get(sql)
            .ok_or_else(|| format!("no such table for `{sql}`"))?;
        Ok(MemoryRows::from_json(columns.iter().copied(), json)?)
    }
}

struct TablesConnector;

impl Connector for TablesConnector {
    type Connection = Tables;

    fn open(&self, _source: &DataSource) -> Result<Tables, BoxError> {
        let mut results = HashMap::new();
        results.insert(
            "SELECT id, name, email, created_at FROM users",
            (
                &["id", "name", "email", "created_at"][..],
                r#"[[1, "Ann", "ann@example.com", "2024-01-01"],
                    [2, "Bob", "bob@example.com", "2024-02-11"]]"#,
            ),
        );
        results.insert(
            "SELECT name FROM users",
            (&["name"][..], r#"[["Ann"], ["Bob"]]"#),
        );
        results.insert(
            "SELECT 'total', SUM(amount) FROM orders",
            (&["?column?", "sum"][..], r#"[["total", 129.5]]"#),
        );
        Ok(Tables { results })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = RegistryConfig::from_json_str(
        r#"{"databases": [{"alias": "default", "dsn": "mem://demo", "query_timeout_ms": 1000}]}"#,
    )?;
    let registry = Registry::from_config(&TablesConnector, &config)?;
    let db = registry.get("default")?;

    let mut users: Vec<User> = Vec::new();
    let n = db
        .query_rows(&mut users, "SELECT id, name, email, created_at FROM users", &[])
        .await?;
    println!("{n} users:");
    for user in &users {
        println!("  {user:?}");
    }

    let mut names: Vec<Option<String>> = Vec::new();
    db.query_rows(&mut names, "SELECT name FROM users", &[]).await?;
    println!("names: {names:?}");

    let mut total = Total::default();
    db.query_row(&mut total, "SELECT 'total', SUM(amount) FROM orders", &[])
        .await?;
    println!("{}: {:.2}", total.label, total.amount);

    // The engine works on any row source, not just registered databases.
    let mut rows = MemoryRows::new(["answer"]).row([42i64]);
    let mut answer = 0u8;
    decode_one(&mut answer, &mut rows)?;
    println!("answer: {answer}");

    Ok(())
}
