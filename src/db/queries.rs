pub const CREATE_SESSIONS: &str = r#"
CREATE TABLE IF NOT EXISTS sessions (
  id        INTEGER PRIMARY KEY AUTOINCREMENT,
  kind      TEXT NOT NULL,
  start_ms  INTEGER NOT NULL,
  end_ms    INTEGER NOT NULL,
  completed INTEGER NOT NULL DEFAULT 1,
  skipped   INTEGER NOT NULL DEFAULT 0
);
"#;

pub const CREATE_REPORTS: &str = r#"
CREATE TABLE IF NOT EXISTS reports (
  id           INTEGER PRIMARY KEY AUTOINCREMENT,
  date         TEXT NOT NULL UNIQUE,
  generated_at INTEGER NOT NULL,
  md_path      TEXT NOT NULL,
  json_path    TEXT NOT NULL
);
"#;

pub const INDEX_SESSIONS_START: &str =
    "CREATE INDEX IF NOT EXISTS idx_sessions_start_ms ON sessions(start_ms);";

pub const INDEX_REPORTS_DATE: &str =
    "CREATE INDEX IF NOT EXISTS idx_reports_date ON reports(date);";

pub const INSERT_SESSION: &str =
    "INSERT INTO sessions (kind, start_ms, end_ms, completed, skipped) VALUES (?1, ?2, ?3, ?4, ?5)";

pub fn schema_statements() -> Vec<&'static str> {
    vec![
        CREATE_SESSIONS,
        CREATE_REPORTS,
        INDEX_SESSIONS_START,
        INDEX_REPORTS_DATE,
    ]
}
