//! SQLite run journal

use crate::storage::schema::initialize_schema;
use crate::storage::{
    OutcomeRecord, OutcomeStatus, RunJournal, RunRecord, RunStatus, StorageError, StorageResult,
};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// SQLite journal backend
pub struct SqliteJournal {
    conn: Connection,
}

impl SqliteJournal {
    /// Opens or creates the journal database
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteJournal)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;
        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(RunStatus::Running),
        records_persisted: row.get::<_, i64>(5)? as u64,
    })
}

fn insert_outcome(conn: &Connection, outcome: &OutcomeRecord, now: &str) -> StorageResult<()> {
    conn.execute(
        "INSERT INTO item_outcomes
            (run_id, phase, item, url, status, attempts, admitted, duplicates, error_message, recorded_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            outcome.run_id,
            outcome.phase,
            outcome.item,
            outcome.url,
            outcome.status.to_db_string(),
            outcome.attempts,
            outcome.admitted as i64,
            outcome.duplicates as i64,
            outcome.error,
            now,
        ],
    )?;
    Ok(())
}

impl RunJournal for SqliteJournal {
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status, records_persisted
                 FROM runs WHERE id = ?1",
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status, records_persisted
                 FROM runs ORDER BY id DESC LIMIT 1",
                [],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        records_persisted: u64,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, records_persisted = ?3 WHERE id = ?4",
            params![status.to_db_string(), now, records_persisted as i64, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn record_outcome(&mut self, outcome: &OutcomeRecord) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        insert_outcome(&self.conn, outcome, &now)
    }

    fn record_outcomes(&mut self, outcomes: &[OutcomeRecord]) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        for outcome in outcomes {
            insert_outcome(&tx, outcome, &now)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn get_outcomes(&self, run_id: i64) -> StorageResult<Vec<OutcomeRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT run_id, phase, item, url, status, attempts, admitted, duplicates, error_message
             FROM item_outcomes WHERE run_id = ?1 ORDER BY id",
        )?;

        let outcomes = stmt
            .query_map(params![run_id], |row| {
                let status: String = row.get(4)?;
                Ok(OutcomeRecord {
                    run_id: row.get(0)?,
                    phase: row.get(1)?,
                    item: row.get(2)?,
                    url: row.get(3)?,
                    status: OutcomeStatus::from_db_string(&status)
                        .unwrap_or(OutcomeStatus::Exhausted),
                    attempts: row.get(5)?,
                    admitted: row.get::<_, i64>(6)? as u64,
                    duplicates: row.get::<_, i64>(7)? as u64,
                    error: row.get(8)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(outcomes)
    }

    fn count_outcomes(&self, run_id: i64, status: OutcomeStatus) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM item_outcomes WHERE run_id = ?1 AND status = ?2",
            params![run_id, status.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(run_id: i64, item: &str, status: OutcomeStatus) -> OutcomeRecord {
        OutcomeRecord {
            run_id,
            phase: "search".to_string(),
            item: item.to_string(),
            url: format!("https://www.linkedin.com/pub/dir?firstName={}", item),
            status,
            attempts: 1,
            admitted: 3,
            duplicates: 1,
            error: match status {
                OutcomeStatus::Succeeded => None,
                OutcomeStatus::Exhausted => Some("HTTP 503".to_string()),
            },
        }
    }

    #[test]
    fn test_create_run() {
        let mut journal = SqliteJournal::new_in_memory().unwrap();
        let run_id = journal.create_run("abc").unwrap();

        let run = journal.get_run(run_id).unwrap();
        assert_eq!(run.status, RunStatus::Running);
        assert_eq!(run.config_hash, "abc");
        assert!(run.finished_at.is_none());
    }

    #[test]
    fn test_finish_run() {
        let mut journal = SqliteJournal::new_in_memory().unwrap();
        let run_id = journal.create_run("abc").unwrap();
        journal.finish_run(run_id, RunStatus::Completed, 42).unwrap();

        let run = journal.get_latest_run().unwrap().unwrap();
        assert_eq!(run.id, run_id);
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.records_persisted, 42);
        assert!(run.finished_at.is_some());
    }

    #[test]
    fn test_finish_unknown_run() {
        let mut journal = SqliteJournal::new_in_memory().unwrap();
        let result = journal.finish_run(99, RunStatus::Failed, 0);
        assert!(matches!(result, Err(StorageError::RunNotFound(99))));
    }

    #[test]
    fn test_get_unknown_run() {
        let journal = SqliteJournal::new_in_memory().unwrap();
        assert!(matches!(journal.get_run(7), Err(StorageError::RunNotFound(7))));
        assert!(journal.get_latest_run().unwrap().is_none());
    }

    #[test]
    fn test_record_outcomes() {
        let mut journal = SqliteJournal::new_in_memory().unwrap();
        let run_id = journal.create_run("abc").unwrap();

        journal
            .record_outcome(&outcome(run_id, "bill", OutcomeStatus::Succeeded))
            .unwrap();
        journal
            .record_outcomes(&[
                outcome(run_id, "jane", OutcomeStatus::Exhausted),
                outcome(run_id, "john", OutcomeStatus::Succeeded),
            ])
            .unwrap();

        let outcomes = journal.get_outcomes(run_id).unwrap();
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[1], outcome(run_id, "jane", OutcomeStatus::Exhausted));
        assert_eq!(
            journal.count_outcomes(run_id, OutcomeStatus::Succeeded).unwrap(),
            2
        );
        assert_eq!(
            journal.count_outcomes(run_id, OutcomeStatus::Exhausted).unwrap(),
            1
        );
    }

    #[test]
    fn test_outcome_requires_run() {
        let mut journal = SqliteJournal::new_in_memory().unwrap();
        let result = journal.record_outcome(&outcome(5, "bill", OutcomeStatus::Succeeded));
        assert!(result.is_err());
    }

    #[test]
    fn test_open_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("journal.db");

        {
            let mut journal = SqliteJournal::new(&path).unwrap();
            journal.create_run("abc").unwrap();
        }

        let journal = SqliteJournal::new(&path).unwrap();
        assert!(journal.get_latest_run().unwrap().is_some());
    }
}
