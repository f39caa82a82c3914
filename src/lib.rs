//! Disposable Postgres schemas for tests.
//!
//! Every test gets its own schema with a random name inside the database described by
//! `DATABASE_URL` or the `PG*` variables. The schema is dropped when the test is done.
//!
//! ```ignore
//! #[pg_test_schema::test]
//! async fn inserts_rows(pool: sqlx::PgPool) {
//!     sqlx::query("CREATE TABLE t (id int)").execute(&pool).await.unwrap();
//! }
//! ```
//!
//! Set `PGTESTDISABLE` to skip such tests, or `PGTESTKEEPDB` to keep their schemas around.
//!
//! Every schema is commented with the path of the test that created it. To find schemas left
//! behind by failed teardowns, you can use the following SQL:
//!
//! ```sql
//! SELECT
//!     n.nspname AS schema_name,
//!     d.description AS comment
//! FROM
//!     pg_namespace n
//! JOIN
//!     pg_description d ON d.objoid = n.oid AND d.classoid = 'pg_namespace'::regclass
//! WHERE
//!     n.nspname LIKE 'rust\_test\_%';
//! ```
pub use macros::test;

pub use run_test::{
    bounded::{run_bounded, BoundedError},
    name::{random_schema_name, SCHEMA_PREFIX},
    retention_notice, schema_exists, Config, Error, TestSchema, DATABASE_URL_ENV,
    DEFAULT_MAX_CONNECTIONS, DEFAULT_TIMEOUT, DISABLE_ENV, KEEP_ENV,
};

#[doc(hidden)]
pub use run_test::TestArgs;

#[doc(hidden)]
pub use run_test::run_test;
