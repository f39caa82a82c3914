use std::{convert::Infallible, time::Duration};

use sqlx::{
    postgres::{PgPool, PgPoolOptions},
    Connection as _, PgConnection,
};
use tracing::{debug, info, instrument, warn};

use crate::{
    bounded::{run_bounded, BoundedError},
    name::{quote_ident, quote_literal, random_schema_name},
    Config, Error,
};

/// A freshly created schema and a connection pool whose `search_path` points at it.
///
/// The schema is dropped, with everything in it, by [`TestSchema::teardown`]. Dropping a
/// `TestSchema` without tearing it down leaves the schema on the server.
#[derive(Debug)]
pub struct TestSchema {
    name: String,

    /// `None` once the schema has been dropped and the pool closed.
    pool: Option<PgPool>,
}

impl TestSchema {
    /// Creates a schema with a random name and connects to it.
    ///
    /// Returns [`Error::Disabled`] without contacting the server when `config.disabled` is set.
    /// If the schema cannot be created, the pool is closed before the error is returned.
    #[instrument(skip_all, err)]
    pub async fn create(config: &Config) -> Result<Self, Error> {
        if config.disabled {
            return Err(Error::Disabled);
        }

        let name = random_schema_name();
        let pool = connect(config, &name).await?;

        let created = run_bounded(
            execute(pool.clone(), format!("CREATE SCHEMA {}", quote_ident(&name))),
            config.timeout,
            format!("create test schema {name:?}"),
        )
        .await;

        if let Err(source) = created {
            let cleanup = close(pool, config.timeout).await.err();
            return Err(Error::Creation {
                name,
                source,
                cleanup,
            });
        }

        info!(schema = %name, "created test schema");
        Ok(Self {
            name,
            pool: Some(pool),
        })
    }

    /// Drops the schema and closes the pool.
    ///
    /// Returns `Ok` without doing anything if the schema was already torn down. With
    /// `config.retain` set, the schema and the pool are left alone and instructions for removing
    /// the schema by hand are written to stderr. A failed drop leaves the pool open.
    #[instrument(skip_all, fields(schema = %self.name), err)]
    pub async fn teardown(&mut self, config: &Config) -> Result<(), Error> {
        let Some(pool) = &self.pool else {
            debug!("test schema already torn down");
            return Ok(());
        };

        if config.retain {
            warn!("retaining test schema");
            eprintln!("{}", retention_notice(&self.name));
            return Ok(());
        }

        run_bounded(
            execute(
                pool.clone(),
                format!("DROP SCHEMA {} CASCADE", quote_ident(&self.name)),
            ),
            config.timeout,
            format!("drop test schema {:?}", self.name),
        )
        .await
        .map_err(Error::Teardown)?;

        close(pool.clone(), config.timeout)
            .await
            .map_err(Error::Teardown)?;

        self.pool = None;
        info!("dropped test schema");
        Ok(())
    }

    /// Attaches `text` to the schema as a comment, so a schema left behind can be traced back to
    /// whoever created it.
    #[instrument(skip_all, fields(schema = %self.name), err)]
    pub async fn comment(&self, text: &str, config: &Config) -> Result<(), Error> {
        let Some(pool) = &self.pool else {
            return Ok(());
        };

        run_bounded(
            execute(
                pool.clone(),
                format!(
                    "COMMENT ON SCHEMA {} IS {}",
                    quote_ident(&self.name),
                    quote_literal(text)
                ),
            ),
            config.timeout,
            format!("comment on test schema {:?}", self.name),
        )
        .await
        .map_err(Error::Statement)
    }

    /// Schema name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Pool scoped to the schema, or `None` after teardown.
    pub fn pool(&self) -> Option<&PgPool> {
        self.pool.as_ref()
    }

    /// Returns `true` until teardown has dropped the schema and closed the pool.
    pub fn is_live(&self) -> bool {
        self.pool.is_some()
    }
}

/// Checks the server catalog for a schema named `name`, over a new connection.
pub async fn schema_exists(config: &Config, name: &str) -> Result<bool, Error> {
    let mut conn = PgConnection::connect_with(&config.connect_options)
        .await
        .map_err(Error::Connection)?;

    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM pg_namespace WHERE nspname = $1)")
            .bind(name)
            .fetch_one(&mut conn)
            .await
            .map_err(Error::Catalog)?;

    conn.close().await.map_err(Error::Connection)?;
    Ok(exists)
}

/// Lines printed when a schema is retained: its name, then SQL that can be pasted as is to switch
/// to the schema and remove it.
pub fn retention_notice(name: &str) -> String {
    let ident = quote_ident(name);
    format!(
        "test schema retained: {name}\n\
         SET search_path TO {ident}; DROP SCHEMA {ident} CASCADE;"
    )
}

async fn connect(config: &Config, name: &str) -> Result<PgPool, Error> {
    let connect_options = config
        .connect_options
        .clone()
        .options([("search_path", name)]);

    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.timeout)
        .idle_timeout(Some(Duration::from_secs(1)))
        .connect_with(connect_options)
        .await
        .map_err(Error::Connection)
}

async fn execute(pool: PgPool, sql: String) -> Result<(), sqlx::Error> {
    sqlx::query(&sql).execute(&pool).await?;
    Ok(())
}

/// Closes the pool. Waits for connections that are still checked out.
async fn close(pool: PgPool, timeout: Duration) -> Result<(), BoundedError> {
    run_bounded(
        async move {
            pool.close().await;
            Ok::<_, Infallible>(())
        },
        timeout,
        "close test db",
    )
    .await
}
