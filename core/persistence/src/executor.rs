use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool, PooledConnection};
use diesel::{Connection, QueryResult, RunQueryDsl, SqliteConnection};
use diesel_migrations::RunMigrationsError;
use dotenv::dotenv;
use std::env;
use std::io::Write;
use std::path::Path;
use std::time::Instant;

pub type InnerConnType = SqliteConnection;
pub type ConnType = PooledConnection<ConnectionManager<InnerConnType>>;
pub type PoolType = Pool<ConnectionManager<InnerConnType>>;

const CONNECTION_INIT: &str = "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 15000;";

no_arg_sql_function!(last_insert_rowid, diesel::sql_types::Integer);

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("db connection error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("db query error: {0}")]
    Diesel(#[from] diesel::result::Error),
    #[error("task: {0}")]
    RuntimeError(#[from] tokio::task::JoinError),
}

/// Applied to every connection handed out by the pool. SQLite keeps
/// `foreign_keys` per connection, so it can't be set once for the database.
#[derive(Debug)]
struct ConnectionInit;

impl CustomizeConnection<InnerConnType, diesel::r2d2::Error> for ConnectionInit {
    fn on_acquire(&self, conn: &mut InnerConnType) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute(CONNECTION_INIT)
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

pub trait AsDao<'a> {
    fn as_dao(pool: &'a PoolType) -> Self;
}

#[derive(Clone)]
pub struct DbExecutor {
    pub pool: PoolType,
}

impl DbExecutor {
    pub fn new<S: Into<String>>(database_url: S) -> Result<Self, Error> {
        let database_url = database_url.into();
        log::debug!("Opening database [{}].", database_url);

        let manager = ConnectionManager::new(database_url);
        let pool = Pool::builder()
            .connection_customizer(Box::new(ConnectionInit))
            .build(manager)?;
        Ok(DbExecutor { pool })
    }

    pub fn from_data_dir(data_dir: &Path, name: &str) -> Result<Self, Error> {
        let db_path = data_dir.join(name).with_extension("db");
        let db = Self::new(db_path.to_string_lossy())?;
        db.conn()?.batch_execute("PRAGMA journal_mode = WAL;")?;
        Ok(db)
    }

    /// Shared-cache memory database. It lives as long as the pool keeps at
    /// least one connection open.
    pub fn in_memory(name: &str) -> Result<Self, Error> {
        Self::new(format!("file:{}?mode=memory&cache=shared", name))
    }

    pub fn from_env() -> Result<Self, Error> {
        dotenv().ok();

        let database_url = env::var_os("DATABASE_URL").unwrap_or_else(|| ":memory:".into());
        Self::new(database_url.to_string_lossy())
    }

    pub fn conn(&self) -> Result<ConnType, Error> {
        Ok(self.pool.get()?)
    }

    pub fn as_dao<'a, T: AsDao<'a>>(&'a self) -> T {
        AsDao::as_dao(&self.pool)
    }

    pub fn apply_migration<F>(&self, migration: F) -> anyhow::Result<()>
    where
        F: FnOnce(&InnerConnType, &mut dyn Write) -> Result<(), RunMigrationsError>,
    {
        let conn = self.conn()?;
        let mut output = Vec::new();
        migration(&conn, &mut output)?;

        let output = String::from_utf8_lossy(&output);
        for line in output.lines().filter(|line| !line.trim().is_empty()) {
            log::debug!("{}", line);
        }
        Ok(())
    }
}

/// Id assigned by SQLite to the row inserted last on this connection.
pub fn last_insert_id(conn: &ConnType) -> QueryResult<i32> {
    diesel::select(last_insert_rowid).first(conn)
}

/// Runs `f` inside an immediate (write-locking) transaction on the blocking
/// thread pool. Any error returned by `f` rolls the whole transaction back.
pub async fn do_with_transaction<R, Error, F>(
    pool: &PoolType,
    label: &'static str,
    f: F,
) -> Result<R, Error>
where
    F: FnOnce(&ConnType) -> Result<R, Error> + Send + 'static,
    R: Send + 'static,
    Error: Send
        + 'static
        + From<tokio::task::JoinError>
        + From<r2d2::Error>
        + From<diesel::result::Error>,
{
    let pool = pool.clone();
    let started = Instant::now();

    let result = tokio::task::spawn_blocking(move || {
        let conn = pool.get()?;
        conn.immediate_transaction(|| f(&conn))
    })
    .await?;

    log::trace!("Transaction [{}] finished in {:?}.", label, started.elapsed());
    result
}

pub async fn readonly_transaction<R, Error, F>(
    pool: &PoolType,
    label: &'static str,
    f: F,
) -> Result<R, Error>
where
    F: FnOnce(&ConnType) -> Result<R, Error> + Send + 'static,
    R: Send + 'static,
    Error: Send
        + 'static
        + From<tokio::task::JoinError>
        + From<r2d2::Error>
        + From<diesel::result::Error>,
{
    let pool = pool.clone();
    let started = Instant::now();

    let result = tokio::task::spawn_blocking(move || {
        let conn = pool.get()?;
        conn.transaction(|| f(&conn))
    })
    .await?;

    log::trace!(
        "Readonly transaction [{}] finished in {:?}.",
        label,
        started.elapsed()
    );
    result
}
