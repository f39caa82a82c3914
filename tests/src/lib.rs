//! Those tests ensure that macro compiles and that schemas behave against a live server.
//!
//! They need a running Postgres reachable through `DATABASE_URL` or the `PG*` variables, so they
//! are ignored by default. Run them with `cargo test -p tests -- --ignored`.

#[cfg(test)]
mod macro_test {
    use sqlx::PgPool;

    #[pg_test_schema::test]
    #[ignore = "requires a running Postgres server"]
    async fn test_macro_default(_pool: PgPool) {}

    #[pg_test_schema::test(max_connections = 5)]
    #[ignore = "requires a running Postgres server"]
    async fn test_macro_custom_mc(_pool: PgPool) {}

    #[pg_test_schema::test(max_connections = 2, timeout = 10)]
    #[ignore = "requires a running Postgres server"]
    async fn test_macro_uses_own_schema(pool: PgPool) {
        let schema: String = sqlx::query_scalar("SELECT current_schema()")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert!(schema.starts_with(pg_test_schema::SCHEMA_PREFIX));
    }
}

#[cfg(test)]
mod lifecycle {
    use std::time::{Duration, Instant};

    use pg_test_schema::{schema_exists, BoundedError, Config, Error, TestSchema};
    use sqlx::{Connection as _, PgConnection};

    fn config() -> Config {
        Config::from_env()
            .unwrap()
            .disabled(false)
            .retain(false)
    }

    #[tokio::test]
    #[ignore = "requires a running Postgres server"]
    async fn round_trip() {
        let config = config();
        let mut schema = TestSchema::create(&config).await.unwrap();
        let pool = schema.pool().unwrap().clone();

        sqlx::query("CREATE TABLE x (id text, val text)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO x (id, val) VALUES ('a', 'b')")
            .execute(&pool)
            .await
            .unwrap();
        let val: String = sqlx::query_scalar("SELECT val FROM x WHERE id = 'a'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(val, "b");

        drop(pool);
        schema.teardown(&config).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires a running Postgres server"]
    async fn teardown_removes_schema() {
        let config = config();
        let mut schema = TestSchema::create(&config).await.unwrap();
        let name = schema.name().to_string();
        assert!(schema_exists(&config, &name).await.unwrap());

        schema.teardown(&config).await.unwrap();

        assert!(!schema.is_live());
        assert!(!schema_exists(&config, &name).await.unwrap());
    }

    #[tokio::test]
    #[ignore = "requires a running Postgres server"]
    async fn teardown_twice_succeeds() {
        let config = config();
        let mut schema = TestSchema::create(&config).await.unwrap();

        schema.teardown(&config).await.unwrap();
        schema.teardown(&config).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires a running Postgres server"]
    async fn created_schemas_are_distinct() {
        let config = config();
        let mut first = TestSchema::create(&config).await.unwrap();
        let mut second = TestSchema::create(&config).await.unwrap();

        assert_ne!(first.name(), second.name());

        first.teardown(&config).await.unwrap();
        second.teardown(&config).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires a running Postgres server"]
    async fn locked_table_makes_drop_time_out() {
        let config = config().with_timeout(Duration::from_secs(1));
        let mut schema = TestSchema::create(&config).await.unwrap();
        let name = schema.name().to_string();
        sqlx::query("CREATE TABLE held (id int)")
            .execute(schema.pool().unwrap())
            .await
            .unwrap();

        let mut locker = PgConnection::connect_with(&config.connect_options)
            .await
            .unwrap();
        let mut tx = locker.begin().await.unwrap();
        sqlx::query(&format!(
            "LOCK TABLE \"{name}\".held IN ACCESS EXCLUSIVE MODE"
        ))
        .execute(&mut *tx)
        .await
        .unwrap();

        let started = Instant::now();
        let err = schema.teardown(&config).await.unwrap_err();
        let elapsed = started.elapsed();

        assert!(matches!(err, Error::Teardown(BoundedError::TimedOut { .. })), "{err}");
        assert!(elapsed >= config.timeout);
        assert!(elapsed < config.timeout * 4);
        assert!(schema.is_live());

        // Releasing the lock lets the detached drop finish on its own.
        tx.rollback().await.unwrap();
        let deadline = Instant::now() + Duration::from_secs(10);
        while schema_exists(&config, &name).await.unwrap() {
            assert!(Instant::now() < deadline, "schema {name} was never dropped");
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    #[tokio::test]
    #[ignore = "requires a running Postgres server"]
    async fn retained_schema_survives_teardown() {
        let config = config();
        let mut schema = TestSchema::create(&config).await.unwrap();
        let name = schema.name().to_string();
        sqlx::query("CREATE TABLE kept (id int)")
            .execute(schema.pool().unwrap())
            .await
            .unwrap();

        schema.teardown(&config.clone().retain(true)).await.unwrap();

        assert!(schema.is_live());
        let options = config
            .connect_options
            .clone()
            .options([("search_path", name.as_str())]);
        let mut conn = PgConnection::connect_with(&options).await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT count(*) FROM kept")
            .fetch_one(&mut conn)
            .await
            .unwrap();
        assert_eq!(count, 0);
        conn.close().await.unwrap();

        schema.teardown(&config).await.unwrap();
        assert!(!schema_exists(&config, &name).await.unwrap());
    }

    #[tokio::test]
    async fn disabled_config_skips_server() {
        let err = TestSchema::create(&config().disabled(true))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Disabled));
    }
}
