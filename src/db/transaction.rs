//! RAII transaction guard.

use rusqlite::{Connection, Params};

/// A transaction that rolls back when dropped unless `commit()` is called.
pub struct Transaction<'a> {
    conn: &'a Connection,
    finished: bool,
}

impl<'a> Transaction<'a> {
    /// Starts an immediate transaction so concurrent writers queue up front.
    pub(crate) fn begin(conn: &'a Connection) -> rusqlite::Result<Self> {
        conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(Self {
            conn,
            finished: false,
        })
    }

    pub(crate) fn conn(&self) -> &Connection {
        self.conn
    }

    pub fn execute(&self, sql: &str, params: impl Params) -> rusqlite::Result<usize> {
        self.conn.execute(sql, params)
    }

    pub fn commit(mut self) -> rusqlite::Result<()> {
        self.conn.execute_batch("COMMIT")?;
        self.finished = true;
        Ok(())
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            // Errors are ignored since we're in drop
            let _ = self.conn.execute_batch("ROLLBACK");
        }
    }
}
