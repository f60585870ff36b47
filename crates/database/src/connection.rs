use crate::error::DbError;
use crate::session::{MySqlSession, Session};
use crate::statement::quote_identifier;
use async_trait::async_trait;
use configuration::settings::DbSection;
use configuration::{load_db_config, DbCredentials};
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Opens database sessions.
///
/// Loaders depend on this trait rather than on MySQL directly, so a fake
/// implementation can stand in for the server in tests.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn Session>, DbError>;
}

/// Where and as whom to connect.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    /// The schema to scope the session to. `None` connects server-wide.
    pub database: Option<String>,
}

impl ConnectionTarget {
    pub fn new(credentials: &DbCredentials, database: Option<&str>) -> Self {
        Self {
            host: credentials.host.clone(),
            port: credentials.port_or_default(),
            user: credentials.user.clone(),
            password: credentials.password.clone(),
            database: database.map(str::to_string),
        }
    }

    pub fn connect_options(&self) -> MySqlConnectOptions {
        let options = MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password);
        match &self.database {
            Some(database) => options.database(database),
            None => options,
        }
    }

    /// Opens a pool holding a single connection.
    pub async fn open_pool(&self) -> Result<MySqlPool, DbError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(self.connect_options())
            .await?;
        Ok(pool)
    }

    /// Like `open_pool`, retrying immediately up to `attempts` times in total.
    pub async fn open_pool_with_attempts(&self, attempts: u32) -> Result<MySqlPool, DbError> {
        let attempts = attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.open_pool().await {
                Ok(pool) => return Ok(pool),
                Err(e) if attempt < attempts => {
                    tracing::warn!(attempt, attempts, error = %e, "Connection attempt failed.");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

// Keep the password out of logs.
impl fmt::Debug for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionTarget")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"********")
            .field("database", &self.database)
            .finish()
    }
}

/// The connection factory for MySQL.
#[derive(Debug, Clone)]
pub struct MySqlConnector {
    target: ConnectionTarget,
}

impl MySqlConnector {
    pub fn new(credentials: &DbCredentials, database: Option<&str>) -> Self {
        Self {
            target: ConnectionTarget::new(credentials, database),
        }
    }

    pub fn from_section(section: &DbSection, database: Option<&str>) -> Result<Self, DbError> {
        Ok(Self::new(&section.credentials()?, database))
    }

    /// Reads `dir/file_name`, takes the credentials from `section`, and
    /// prepares a connector scoped to `database` when one is given.
    pub fn from_config_file(
        dir: impl AsRef<Path>,
        file_name: &str,
        section: &str,
        database: Option<&str>,
    ) -> Result<Self, DbError> {
        let section = load_db_config(dir, file_name, section)?;
        Self::from_section(&section, database)
    }

    pub fn target(&self) -> &ConnectionTarget {
        &self.target
    }

    /// The same server and credentials, without a schema.
    pub fn server_wide(&self) -> Self {
        let mut target = self.target.clone();
        target.database = None;
        Self { target }
    }

    pub async fn connect_mysql(&self) -> Result<MySqlSession, DbError> {
        let pool = self.target.open_pool().await?;
        tracing::debug!(
            host = %self.target.host,
            database = self.target.database.as_deref().unwrap_or("<server>"),
            "Connected to the database."
        );
        Ok(MySqlSession::new(self.target.clone(), pool))
    }
}

#[async_trait]
impl Connector for MySqlConnector {
    async fn connect(&self) -> Result<Box<dyn Session>, DbError> {
        Ok(Box::new(self.connect_mysql().await?))
    }
}

/// Opens a session, retrying immediately up to `attempts` times in total.
pub async fn connect_with_attempts(
    connector: &dyn Connector,
    attempts: u32,
) -> Result<Box<dyn Session>, DbError> {
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match connector.connect().await {
            Ok(session) => return Ok(session),
            Err(e) if attempt < attempts => {
                tracing::warn!(attempt, attempts, error = %e, "Connection attempt failed.");
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Creates `name` on the server if it does not exist yet.
pub async fn create_database(connector: &MySqlConnector, name: &str) -> Result<(), DbError> {
    let mut session = connector.server_wide().connect_mysql().await?;
    let sql = format!("CREATE DATABASE IF NOT EXISTS {}", quote_identifier(name)?);
    session.execute(&sql).await?;
    session.close().await?;
    tracing::info!(database = name, "Database is present.");
    Ok(())
}

/// A utility function to run database migrations automatically.
///
/// Creates the `data_vendor`, `exchange`, `symbol` and `daily_price` tables
/// in the connector's schema when they are missing.
pub async fn run_migrations(connector: &MySqlConnector) -> Result<(), DbError> {
    let pool = connector.target().open_pool().await?;
    // Use a relative path from the crate root
    sqlx::migrate!("./migrations").run(&pool).await?;
    pool.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{QueryResult, Row};
    use crate::statement::InsertStatement;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct NullSession;

    #[async_trait]
    impl Session for NullSession {
        async fn query(&mut self, _: &str, _: Option<usize>) -> Result<QueryResult, DbError> {
            Ok(QueryResult::default())
        }
        async fn execute(&mut self, _: &str) -> Result<u64, DbError> {
            Ok(0)
        }
        async fn insert_batch(&mut self, _: &InsertStatement, rows: &[Row]) -> Result<u64, DbError> {
            Ok(rows.len() as u64)
        }
        async fn commit(&mut self) -> Result<(), DbError> {
            Ok(())
        }
        async fn reconnect(&mut self, _: u32) -> Result<(), DbError> {
            Ok(())
        }
        async fn close(&mut self) -> Result<(), DbError> {
            Ok(())
        }
    }

    /// Fails the first `failures` connects, then succeeds.
    struct FlakyConnector {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl Connector for FlakyConnector {
        async fn connect(&self) -> Result<Box<dyn Session>, DbError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(DbError::ConnectionError(sqlx::Error::PoolTimedOut))
            } else {
                Ok(Box::new(NullSession))
            }
        }
    }

    fn credentials() -> DbCredentials {
        DbCredentials {
            host: "localhost".into(),
            user: "root".into(),
            password: "pw".into(),
            port: None,
        }
    }

    #[tokio::test]
    async fn connect_retries_up_to_the_attempt_limit() {
        let connector = FlakyConnector { failures: 2, calls: AtomicU32::new(0) };
        assert!(connect_with_attempts(&connector, 3).await.is_ok());
        assert_eq!(connector.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn connect_gives_up_after_the_last_attempt() {
        let connector = FlakyConnector { failures: 5, calls: AtomicU32::new(0) };
        assert!(connect_with_attempts(&connector, 3).await.is_err());
        assert_eq!(connector.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn zero_attempts_still_tries_once() {
        let connector = FlakyConnector { failures: 0, calls: AtomicU32::new(0) };
        assert!(connect_with_attempts(&connector, 0).await.is_ok());
        assert_eq!(connector.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn target_is_scoped_only_when_a_database_is_named() {
        let scoped = MySqlConnector::new(&credentials(), Some("markets"));
        assert_eq!(scoped.target().database.as_deref(), Some("markets"));
        assert_eq!(scoped.target().port, 3306);

        let server = scoped.server_wide();
        assert_eq!(server.target().database, None);
        assert_eq!(server.target().host, "localhost");
    }

    #[test]
    fn connector_from_config_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.ini"),
            "[mysql]\nhost=db.internal\nuser=loader\npassword=pw\nport=3307\n",
        )
        .unwrap();

        let connector =
            MySqlConnector::from_config_file(dir.path(), "config.ini", "mysql", Some("markets"))
                .unwrap();

        assert_eq!(connector.target().host, "db.internal");
        assert_eq!(connector.target().port, 3307);
        assert_eq!(connector.target().database.as_deref(), Some("markets"));
        assert!(!format!("{connector:?}").contains("pw\""));
    }

    /// Needs a reachable server and a `config.ini` in `SECMASTER_CONFIG_DIR`.
    #[tokio::test]
    #[ignore]
    async fn live_session_reports_the_selected_database() {
        let dir = std::env::var("SECMASTER_CONFIG_DIR").unwrap_or_else(|_| ".".into());
        let connector =
            MySqlConnector::from_config_file(dir, "config.ini", "mysql", Some("markets")).unwrap();
        create_database(&connector, "markets").await.unwrap();

        let mut session = connect_with_attempts(&connector, 3).await.unwrap();
        let details = crate::query::connection_details(session.as_mut()).await.unwrap();
        assert_eq!(details.database.as_deref(), Some("markets"));

        let databases = crate::query::show_databases(session.as_mut()).await;
        assert!(databases.iter().any(|d| d == "markets"));
        session.close().await.unwrap();
    }

    const CLEANUP: [&str; 4] = [
        "DELETE FROM daily_price WHERE ticker_ex = 'ZZTEST ZZ'",
        "DELETE FROM symbol WHERE ticker_ex = 'ZZTEST ZZ'",
        "DELETE FROM exchange WHERE exchange_id = 'ZZ'",
        "DELETE FROM data_vendor WHERE data_vendor_id = 9001",
    ];

    const FIXTURES: [&str; 3] = [
        "INSERT INTO data_vendor (data_vendor_id, name, created_date, last_updated_date) \
         VALUES (9001, 'Test Vendor', '2019-02-14', '2019-02-14')",
        "INSERT INTO exchange (exchange_id, abbrev, name, created_date, last_updated_date) \
         VALUES ('ZZ', 'ZZX', 'Test Exchange', '2019-02-14', '2019-02-14')",
        "INSERT INTO symbol (ticker_ex, ticker, exchange_id, created_date, last_updated_date) \
         VALUES ('ZZTEST ZZ', 'ZZTEST', 'ZZ', '2019-02-14', '2019-02-14')",
    ];

    /// Needs a reachable server and a `config.ini` in `SECMASTER_CONFIG_DIR`.
    #[tokio::test]
    #[ignore]
    async fn live_price_batch_round_trips_across_chunks() {
        use crate::statement::describe_table;
        use core_types::{Record, SqlValue};
        use rust_decimal::Decimal;

        let dir = std::env::var("SECMASTER_CONFIG_DIR").unwrap_or_else(|_| ".".into());
        let connector =
            MySqlConnector::from_config_file(dir, "config.ini", "mysql", Some("markets")).unwrap();
        create_database(&connector, "markets").await.unwrap();
        run_migrations(&connector).await.unwrap();

        let mut session = connect_with_attempts(&connector, 3).await.unwrap();
        for sql in CLEANUP.iter().chain(&FIXTURES) {
            session.execute(sql).await.unwrap();
        }
        session.commit().await.unwrap();

        let columns = describe_table(session.as_mut(), "daily_price").await.unwrap();
        let statement = InsertStatement::from_columns("daily_price", &columns, true).unwrap();
        assert!(!statement.columns().iter().any(|c| c == "id"));

        // More rows than fit in one statement, so the batch is split.
        let count = statement.rows_per_statement() + 43;
        let first = chrono::NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        let records: Vec<Record> = (0..count)
            .map(|i| {
                let date = first + chrono::Days::new(i as u64);
                Record::new()
                    .with("data_vendor_id", 9001i32)
                    .with("ticker_ex", "ZZTEST ZZ")
                    .with("price_date", date.format("%Y-%m-%d 00:00:00").to_string())
                    .with("created_date", first)
                    .with("last_updated_date", first)
                    .with("open_price", 101.25f64)
                    .with("high_price", 102.0f32)
                    .with("low_price", Some(100.5f64))
                    .with("close_price", 101.5f64)
                    .with("adj_close_price", None::<f64>)
                    .with("volume", 1_000u64 + i as u64)
            })
            .collect();
        let rows = statement.rows_from(&records).unwrap();

        let inserted = session.insert_batch(&statement, &rows).await.unwrap();
        assert_eq!(inserted, count as u64);
        session.commit().await.unwrap();
        session.close().await.unwrap();

        let mut session = connector.connect().await.unwrap();
        let result = session
            .query(
                "SELECT COUNT(*), MIN(close_price), MAX(volume), COUNT(adj_close_price) \
                 FROM daily_price WHERE ticker_ex = 'ZZTEST ZZ'",
                None,
            )
            .await
            .unwrap();
        let row = &result.rows[0];
        assert_eq!(row[0].as_text(), Some(count.to_string()));
        assert!(matches!(row[1], SqlValue::Decimal(d) if d == Decimal::new(1015, 1)));
        assert_eq!(row[2].as_text(), Some((1_000 + count - 1).to_string()));
        assert_eq!(row[3].as_text(), Some("0".to_string()));

        for sql in CLEANUP {
            session.execute(sql).await.unwrap();
        }
        session.commit().await.unwrap();
        session.close().await.unwrap();
    }
}
