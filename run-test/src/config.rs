use std::{str::FromStr, time::Duration};

use sqlx::postgres::PgConnectOptions;

use crate::Error;

/// If non-empty, [`crate::TestSchema::create`] fails with [`Error::Disabled`].
pub const DISABLE_ENV: &str = "PGTESTDISABLE";

/// If non-empty, [`crate::TestSchema::teardown`] keeps the schema and prints how to remove it.
pub const KEEP_ENV: &str = "PGTESTKEEPDB";

/// Connection string. When absent, the `PG*` variables understood by sqlx apply.
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Deadline for each statement that touches shared server state.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Pool size of a test schema.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 1;

/// Settings for creating and tearing down a test schema.
#[derive(Debug, Clone)]
pub struct Config {
    pub disabled: bool,
    pub retain: bool,
    pub timeout: Duration,
    pub max_connections: u32,
    pub connect_options: PgConnectOptions,
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from `lookup`, which resolves variable names to values.
    ///
    /// Without `DATABASE_URL` the connect options are taken from the `PG*` variables of the
    /// process environment regardless of `lookup`. `DATABASE_URL` is not parsed at all when
    /// testing is disabled, so a disabled run never fails on connection settings.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let disabled = is_set(&lookup, DISABLE_ENV);

        let connect_options = match lookup(DATABASE_URL_ENV).filter(|url| !url.is_empty()) {
            Some(url) if !disabled => {
                PgConnectOptions::from_str(&url).map_err(Error::InvalidDatabaseUrl)?
            }
            _ => PgConnectOptions::new(),
        };

        Ok(Self {
            disabled,
            retain: is_set(&lookup, KEEP_ENV),
            timeout: DEFAULT_TIMEOUT,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            connect_options,
        })
    }

    /// Re-reads the keep flag from the process environment, leaving everything else as is.
    pub fn refresh_retain(self) -> Self {
        self.refresh_retain_from(|key| std::env::var(key).ok())
    }

    /// Re-reads the keep flag through `lookup`.
    pub fn refresh_retain_from(self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let retain = is_set(&lookup, KEEP_ENV);
        self.retain(retain)
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn retain(mut self, retain: bool) -> Self {
        self.retain = retain;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections.max(1);
        self
    }

    pub fn with_connect_options(mut self, connect_options: PgConnectOptions) -> Self {
        self.connect_options = connect_options;
        self
    }
}

impl From<PgConnectOptions> for Config {
    fn from(connect_options: PgConnectOptions) -> Self {
        Self {
            disabled: false,
            retain: false,
            timeout: DEFAULT_TIMEOUT,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            connect_options,
        }
    }
}

fn is_set(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> bool {
    lookup(key).is_some_and(|v| !v.is_empty())
}
