use std::{future::Future, panic::AssertUnwindSafe, time::Duration};

use futures::FutureExt as _;
use sqlx::PgPool;
use tracing::warn;

pub mod bounded;
mod config;
mod error;
pub mod name;
mod schema;

pub use self::{
    config::{
        Config, DATABASE_URL_ENV, DEFAULT_MAX_CONNECTIONS, DEFAULT_TIMEOUT, DISABLE_ENV, KEEP_ENV,
    },
    error::Error,
    schema::{retention_notice, schema_exists, TestSchema},
};

/// Individual test arguments
pub struct TestArgs {
    /// Max connections for this pool (1 by default)
    pub max_connections: Option<u32>,

    /// Deadline for schema statements (5 seconds by default)
    pub timeout: Option<Duration>,

    /// Test module path, stored as the schema comment
    pub module_path: String,
}

impl TestArgs {
    fn apply(&self, mut config: Config) -> Config {
        if let Some(max_connections) = self.max_connections {
            config = config.with_max_connections(max_connections);
        }
        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }
        config
    }
}

/// Runs an individual test
///
/// The schema is torn down even if the test panics; the panic is resumed afterwards.
pub async fn wrap_run_test<F, Fut>(f: F, args: TestArgs) -> Result<(), Error>
where
    F: Fn(PgPool) -> Fut,
    Fut: Future<Output = ()>,
{
    let config = args.apply(Config::from_env()?);
    let mut schema = TestSchema::create(&config).await?;

    if let Err(err) = schema.comment(&args.module_path, &config).await {
        // The keep flag reflects the environment at teardown time.
        let config = config.refresh_retain();
        return error::first_failure(Err(err), schema.teardown(&config).await);
    }

    let outcome = match schema.pool() {
        Some(pool) => AssertUnwindSafe(f(pool.clone())).catch_unwind().await,
        None => Ok(()),
    };

    let config = config.refresh_retain();
    let torn_down = schema.teardown(&config).await;

    if let Err(panic) = outcome {
        if let Err(err) = torn_down {
            warn!(error = %err, "cannot tear down test schema after test panicked");
        }
        std::panic::resume_unwind(panic);
    }

    torn_down
}

/// Runs an individual test
pub fn run_test<F, Fut>(f: F, args: TestArgs)
where
    F: Fn(PgPool) -> Fut,
    Fut: Future<Output = ()>,
{
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => panic!("test failed: cannot start runtime: {e}"),
    };

    runtime.block_on(async move {
        match wrap_run_test(f, args).await {
            Err(Error::Disabled) => {
                eprintln!("skipping test: {}", Error::Disabled);
            }
            Err(e) => panic!("test failed: {e}"),
            Ok(v) => v,
        }
    })
}
