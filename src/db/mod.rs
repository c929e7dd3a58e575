pub mod queries;

use crate::analyzer::session::{SessionKind, SessionRecord};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::warn;

/// Where session records come from and go to. Analytics only ever sees the
/// snapshot returned by `load_sessions`.
pub trait SessionStore {
    fn load_sessions(&self) -> Result<Vec<SessionRecord>>;
    fn append_session(&mut self, session: &SessionRecord) -> Result<()>;

    fn append_sessions(&mut self, sessions: &[SessionRecord]) -> Result<()> {
        sessions
            .iter()
            .try_for_each(|session| self.append_session(session))
    }
}

impl SessionStore for Vec<SessionRecord> {
    fn load_sessions(&self) -> Result<Vec<SessionRecord>> {
        Ok(self.clone())
    }

    fn append_session(&mut self, session: &SessionRecord) -> Result<()> {
        self.push(*session);
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportMetaRow {
    pub id: i64,
    pub date: String,
    pub generated_at: i64,
    pub md_path: String,
    pub json_path: String,
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create DB directory: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open SQLite DB: {}", path.display()))?;

        let database = Self { conn };
        database.init_schema()?;

        Ok(database)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory SQLite DB")?;
        let database = Self { conn };
        database.init_schema()?;

        Ok(database)
    }

    pub fn init_schema(&self) -> Result<()> {
        queries::schema_statements()
            .iter()
            .try_for_each(|statement| {
                self.conn
                    .execute(statement, [])
                    .context("Failed to initialize schema")
                    .map(|_| ())
            })
    }

    pub fn session_count(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))
            .context("Failed to count sessions")
    }

    pub fn latest_session_end(&self) -> Result<Option<i64>> {
        self.conn
            .query_row("SELECT MAX(end_ms) FROM sessions", [], |row| row.get(0))
            .context("Failed to query latest session")
    }

    pub fn clear_sessions(&self) -> Result<usize> {
        self.conn
            .execute("DELETE FROM sessions", [])
            .context("Failed to clear session history")
    }

    pub fn report_meta(&self, date: NaiveDate) -> Result<Option<ReportMetaRow>> {
        let date_str = date.format("%Y-%m-%d").to_string();
        let row = self
            .conn
            .query_row(
                "SELECT id, date, generated_at, md_path, json_path FROM reports WHERE date = ?1",
                params![date_str],
                |row| {
                    Ok(ReportMetaRow {
                        id: row.get(0)?,
                        date: row.get(1)?,
                        generated_at: row.get(2)?,
                        md_path: row.get(3)?,
                        json_path: row.get(4)?,
                    })
                },
            )
            .optional()
            .context("Failed to query report metadata")?;

        Ok(row)
    }

    pub fn latest_report_meta(&self) -> Result<Option<ReportMetaRow>> {
        Ok(self.list_reports(1)?.into_iter().next())
    }

    pub fn list_reports(&self, limit: usize) -> Result<Vec<ReportMetaRow>> {
        let mut statement = self.conn.prepare(
            "SELECT id, date, generated_at, md_path, json_path
             FROM reports
             ORDER BY date DESC
             LIMIT ?1",
        )?;

        let rows = statement
            .query_map(params![limit as i64], |row| {
                Ok(ReportMetaRow {
                    id: row.get(0)?,
                    date: row.get(1)?,
                    generated_at: row.get(2)?,
                    md_path: row.get(3)?,
                    json_path: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to list reports")?;

        Ok(rows)
    }

    pub fn upsert_report_meta(
        &self,
        date: NaiveDate,
        generated_at: i64,
        md_path: &str,
        json_path: &str,
    ) -> Result<()> {
        let date_str = date.format("%Y-%m-%d").to_string();
        self.conn
            .execute(
                "INSERT INTO reports (date, generated_at, md_path, json_path)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(date)
                 DO UPDATE SET generated_at=excluded.generated_at, md_path=excluded.md_path, json_path=excluded.json_path",
                params![date_str, generated_at, md_path, json_path],
            )
            .context("Failed to upsert report metadata")?;

        Ok(())
    }
}

impl SessionStore for Database {
    fn load_sessions(&self) -> Result<Vec<SessionRecord>> {
        let mut statement = self.conn.prepare(
            "SELECT kind, start_ms, end_ms, completed, skipped
             FROM sessions
             ORDER BY start_ms ASC, id ASC",
        )?;

        let rows = statement
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, bool>(3)?,
                    row.get::<_, bool>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query sessions")?;

        let mut unknown_kind = 0;
        let sessions = rows
            .into_iter()
            .filter_map(|(kind, start, end, completed, skipped)| {
                let Some(kind) = SessionKind::parse(&kind) else {
                    unknown_kind += 1;
                    return None;
                };

                Some(SessionRecord {
                    kind,
                    start,
                    end,
                    completed,
                    skipped,
                })
            })
            .collect::<Vec<_>>();

        if unknown_kind > 0 {
            warn!(unknown_kind, "ignored stored sessions with an unknown kind");
        }

        Ok(sessions)
    }

    fn append_session(&mut self, session: &SessionRecord) -> Result<()> {
        self.conn
            .execute(
                queries::INSERT_SESSION,
                params![
                    session.kind.as_str(),
                    session.start,
                    session.end,
                    session.completed,
                    session.skipped
                ],
            )
            .context("Failed to insert session")?;

        Ok(())
    }

    fn append_sessions(&mut self, sessions: &[SessionRecord]) -> Result<()> {
        let transaction = self
            .conn
            .transaction()
            .context("Failed to start transaction")?;

        sessions.iter().try_for_each(|session| {
            transaction
                .execute(
                    queries::INSERT_SESSION,
                    params![
                        session.kind.as_str(),
                        session.start,
                        session.end,
                        session.completed,
                        session.skipped
                    ],
                )
                .context("Failed to insert session")
                .map(|_| ())
        })?;

        transaction.commit().context("Failed to commit sessions")?;
        Ok(())
    }
}
