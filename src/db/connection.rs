use std::fs;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::config::DatabaseConfig;
use crate::error::{Result, SchoolError, StorageContext};

/// Lifecycle of the single storage handle. Only `Open` serves queries.
enum ConnectionState {
    Unopened(Connection),
    Open(Connection),
    Closed,
}

/// Persistence gateway over one SQLite connection.
///
/// Every operation holds the internal mutex for its full duration, so a
/// `SchoolDb` shared between threads serializes its callers on the single
/// handle.
pub struct SchoolDb {
    state: Mutex<ConnectionState>,
}

impl SchoolDb {
    /// Wrap an already opened connection. The gateway refuses queries until
    /// [`SchoolDb::bootstrap_schema`] succeeds.
    pub fn new(conn: Connection) -> Self {
        Self {
            state: Mutex::new(ConnectionState::Unopened(conn)),
        }
    }

    /// Open the database file named by `config`, creating its directory.
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|err| SchoolError::storage("failed to create data directory", err))?;
        }

        let conn = Connection::open(&config.path).storage("failed to open SQLite database")?;
        conn.busy_timeout(config.busy_timeout)
            .storage("failed to set busy timeout")?;
        debug!(path = %config.path.display(), "opened database file");
        Ok(Self::new(conn))
    }

    /// Open a private in-memory database; mostly useful for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().storage("failed to open in-memory database")?;
        Ok(Self::new(conn))
    }

    /// Open the configured file and bootstrap the schema in one step.
    pub fn connect(config: &DatabaseConfig) -> Result<Self> {
        let db = Self::open(config)?;
        db.bootstrap_schema()?;
        Ok(db)
    }

    /// Create the four relations if they are missing and move the gateway to
    /// the open state. Running it again on an open gateway leaves existing
    /// rows untouched.
    pub fn bootstrap_schema(&self) -> Result<()> {
        let mut state = self.lock();
        let conn = match &*state {
            ConnectionState::Unopened(conn) | ConnectionState::Open(conn) => conn,
            ConnectionState::Closed => return Err(SchoolError::NotConnected),
        };
        create_tables(conn)?;

        *state = match std::mem::replace(&mut *state, ConnectionState::Closed) {
            ConnectionState::Unopened(conn) | ConnectionState::Open(conn) => {
                ConnectionState::Open(conn)
            }
            ConnectionState::Closed => ConnectionState::Closed,
        };
        info!("school database schema ready");
        Ok(())
    }

    /// Whether the gateway currently accepts queries.
    pub fn is_connected(&self) -> bool {
        matches!(*self.lock(), ConnectionState::Open(_))
    }

    /// Release the storage handle. Safe to call repeatedly; failures are
    /// logged, never returned.
    pub fn close_connection(&self) {
        let mut state = self.lock();
        match std::mem::replace(&mut *state, ConnectionState::Closed) {
            ConnectionState::Unopened(conn) | ConnectionState::Open(conn) => {
                if let Err((_conn, err)) = conn.close() {
                    warn!(error = %err, "error closing database connection");
                } else {
                    info!("database connection closed");
                }
            }
            ConnectionState::Closed => debug!("database connection already closed"),
        }
    }

    /// Run `f` against the open connection while holding the lock.
    pub(crate) fn with_conn<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> Result<T>,
    ) -> Result<T> {
        let mut state = self.lock();
        match &mut *state {
            ConnectionState::Open(conn) => f(conn),
            ConnectionState::Unopened(_) | ConnectionState::Closed => {
                Err(SchoolError::NotConnected)
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, ConnectionState> {
        // A panic inside a query closure cannot leave the handle half-written,
        // so a poisoned lock is still usable.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Run the idempotent DDL. Foreign-key enforcement is switched off so deleting
/// a teacher leaves an orphaned `courses.teacher_id` instead of failing; the
/// gateway checks references itself before writing relationships.
fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute("PRAGMA foreign_keys = OFF", [])
        .storage("failed to configure foreign keys")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            age INTEGER NOT NULL,
            grade_level INTEGER NOT NULL
        )",
        [],
    )
    .storage("failed to create students table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS teachers (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            age INTEGER NOT NULL,
            subject TEXT NOT NULL
        )",
        [],
    )
    .storage("failed to create teachers table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS courses (
            course_id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            teacher_id INTEGER,
            max_capacity INTEGER NOT NULL,
            FOREIGN KEY (teacher_id) REFERENCES teachers (id)
        )",
        [],
    )
    .storage("failed to create courses table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS enrollments (
            student_id INTEGER NOT NULL,
            course_id INTEGER NOT NULL,
            PRIMARY KEY (student_id, course_id),
            FOREIGN KEY (student_id) REFERENCES students (id),
            FOREIGN KEY (course_id) REFERENCES courses (course_id)
        )",
        [],
    )
    .storage("failed to create enrollments table")?;

    Ok(())
}
