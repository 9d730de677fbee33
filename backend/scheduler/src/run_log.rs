/// Durable run log for scheduled cycles.
///
/// Every table processed by a cycle gets one row with its outcome.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunLogEntry {
    pub id: String,
    pub cycle_id: String,
    pub table_id: String,
    pub sheet_name: String,
    pub started_at: i64,
    pub status: String, // "ok" | "error" | "skipped"
    pub candidates: i64,
    pub written: i64,
    pub failed: i64,
    pub error: Option<String>,
}

pub struct RunLog {
    conn: rusqlite::Connection,
}

impl RunLog {
    /// Open (or create) the log. `":memory:"` gives a throwaway database.
    pub fn open(db_path: &str) -> Result<Self> {
        let conn = rusqlite::Connection::open(db_path)
            .with_context(|| format!("open run log at {db_path}"))?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            CREATE TABLE IF NOT EXISTS table_run_log (
                id          TEXT PRIMARY KEY,
                cycle_id    TEXT NOT NULL,
                table_id    TEXT NOT NULL,
                sheet_name  TEXT NOT NULL,
                started_at  INTEGER NOT NULL,
                status      TEXT NOT NULL,
                candidates  INTEGER NOT NULL DEFAULT 0,
                written     INTEGER NOT NULL DEFAULT 0,
                failed      INTEGER NOT NULL DEFAULT 0,
                error       TEXT
            );
            CREATE INDEX IF NOT EXISTS table_run_log_table_id ON table_run_log(table_id);
            "#,
        )?;
        Ok(Self { conn })
    }

    pub fn record(&self, entry: &RunLogEntry) -> Result<()> {
        self.conn.execute(
            "INSERT INTO table_run_log
                (id, cycle_id, table_id, sheet_name, started_at, status, candidates, written, failed, error)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)",
            rusqlite::params![
                entry.id, entry.cycle_id, entry.table_id, entry.sheet_name, entry.started_at,
                entry.status, entry.candidates, entry.written, entry.failed, entry.error,
            ],
        )?;
        Ok(())
    }

    /// Most recent entries for one table, newest first.
    pub fn recent(&self, table_id: &str, limit: usize) -> Result<Vec<RunLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, cycle_id, table_id, sheet_name, started_at, status, candidates, written, failed, error
             FROM table_run_log WHERE table_id = ?1
             ORDER BY started_at DESC, rowid DESC LIMIT ?2",
        )?;
        let entries = stmt
            .query_map(rusqlite::params![table_id, limit as i64], |row| {
                Ok(RunLogEntry {
                    id: row.get(0)?,
                    cycle_id: row.get(1)?,
                    table_id: row.get(2)?,
                    sheet_name: row.get(3)?,
                    started_at: row.get(4)?,
                    status: row.get(5)?,
                    candidates: row.get(6)?,
                    written: row.get(7)?,
                    failed: row.get(8)?,
                    error: row.get(9)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    /// Prune entries older than `max_age_secs`.
    pub fn prune(&self, max_age_secs: i64) -> Result<usize> {
        let cutoff = chrono::Utc::now().timestamp() - max_age_secs;
        let n = self.conn.execute(
            "DELETE FROM table_run_log WHERE started_at < ?1",
            rusqlite::params![cutoff],
        )?;
        Ok(n)
    }
}
