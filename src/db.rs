use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::model::ConnectionRecord;

/// Connection documents keyed by canonical profile URL, plus login
/// sessions. One handle is opened per process and shared.
pub struct Store {
    conn: Mutex<Connection>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

impl Store {
    pub fn open(path: &str) -> Result<Self> {
        if let Some(dir) = Path::new(path).parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create {:?}", dir))?;
            }
        }
        let conn = Connection::open(path).with_context(|| format!("Failed to open {}", path))?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::init(conn)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        init_schema(&conn)?;
        Ok(Store {
            conn: Mutex::new(conn),
        })
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS connections (
            profile_url  TEXT PRIMARY KEY,
            doc          TEXT NOT NULL CHECK(json_valid(doc)),
            scraped_date TEXT NOT NULL,
            last_updated TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_connections_session
            ON connections(json_extract(doc, '$.session_id'));

        CREATE TABLE IF NOT EXISTS sessions (
            session_id         TEXT PRIMARY KEY,
            email              TEXT,
            logged_in          BOOLEAN NOT NULL DEFAULT 0,
            connections_count  INTEGER NOT NULL DEFAULT 0,
            profiles_processed INTEGER NOT NULL DEFAULT 0,
            created_at         TEXT NOT NULL,
            last_activity      TEXT NOT NULL
        );
        ",
    )?;
    Ok(())
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

fn parse_ts(raw: Option<String>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|t| t.with_timezone(&Utc))
}

// ── Connections ──

impl Store {
    /// Merge `fields` into the record for `profile_url`, creating it if
    /// needed. Each given top-level key overwrites the stored one; keys not
    /// given are left alone. `scraped_date` is set once on create and
    /// `last_updated` on every later merge.
    pub fn upsert(&self, profile_url: &str, fields: &Map<String, Value>) -> Result<UpsertOutcome> {
        let doc = serde_json::to_string(fields)?;
        let ts = now();

        let mut args: Vec<String> = vec![profile_url.to_string(), doc, ts];
        let merge = if fields.is_empty() {
            "connections.doc".to_string()
        } else {
            let mut pairs = String::new();
            for (key, value) in fields {
                args.push(format!("$.\"{}\"", key.replace('"', "")));
                args.push(serde_json::to_string(value)?);
                pairs.push_str(&format!(", ?{}, json(?{})", args.len() - 1, args.len()));
            }
            format!("json_set(connections.doc{})", pairs)
        };
        let sql = format!(
            "INSERT INTO connections (profile_url, doc, scraped_date, last_updated)
             VALUES (?1, json(?2), ?3, NULL)
             ON CONFLICT(profile_url) DO UPDATE SET doc = {}, last_updated = ?3
             RETURNING last_updated IS NULL",
            merge
        );

        let conn = self.conn.lock();
        let created: bool = conn.query_row(&sql, params_from_iter(args.iter()), |r| r.get(0))?;
        Ok(if created {
            UpsertOutcome::Created
        } else {
            UpsertOutcome::Updated
        })
    }

    #[cfg(test)]
    pub fn get(&self, profile_url: &str) -> Result<Option<ConnectionRecord>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT profile_url, doc, scraped_date, last_updated
                 FROM connections WHERE profile_url = ?1",
                [profile_url],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
            )
            .optional()?;
        row.map(to_record).transpose()
    }

    /// Every stored record, optionally only those written by one session.
    pub fn fetch_all(&self, session_id: Option<&str>) -> Result<Vec<ConnectionRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT profile_url, doc, scraped_date, last_updated FROM connections
             WHERE ?1 IS NULL OR json_extract(doc, '$.session_id') = ?1
             ORDER BY scraped_date, profile_url",
        )?;
        let rows = stmt
            .query_map([session_id], |r| {
                Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(to_record).collect()
    }

    /// Profile URLs whose detail pass has not run yet.
    pub fn fetch_undetailed(&self, limit: Option<usize>) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT profile_url FROM connections
             WHERE json_type(doc, '$.experiences') IS NULL
             ORDER BY scraped_date, profile_url{}",
            match limit {
                Some(n) => format!(" LIMIT {}", n),
                None => String::new(),
            }
        );
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |r| r.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

type RawRow = (String, String, String, Option<String>);

fn to_record((profile_url, doc, scraped, updated): RawRow) -> Result<ConnectionRecord> {
    let mut record: ConnectionRecord = serde_json::from_str(&doc)
        .with_context(|| format!("Corrupt document for {}", profile_url))?;
    record.profile_url = profile_url;
    record.scraped_date = parse_ts(Some(scraped));
    record.last_updated = parse_ts(updated);
    Ok(record)
}

// ── Sessions ──

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionRow {
    pub session_id: String,
    pub email: Option<String>,
    pub logged_in: bool,
    pub connections_count: usize,
    pub profiles_processed: usize,
}

impl Store {
    pub fn save_session(&self, session_id: &str, email: Option<&str>, logged_in: bool) -> Result<()> {
        let ts = now();
        self.conn.lock().execute(
            "INSERT INTO sessions (session_id, email, logged_in, created_at, last_activity)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT(session_id) DO UPDATE SET
                email = COALESCE(excluded.email, sessions.email),
                logged_in = excluded.logged_in,
                last_activity = excluded.last_activity",
            params![session_id, email, logged_in, ts],
        )?;
        Ok(())
    }

    /// Add to a session's counters and refresh its activity time.
    pub fn bump_session(&self, session_id: &str, connections: usize, profiles: usize) -> Result<()> {
        self.conn.lock().execute(
            "UPDATE sessions SET
                connections_count = connections_count + ?2,
                profiles_processed = profiles_processed + ?3,
                last_activity = ?4
             WHERE session_id = ?1",
            params![session_id, connections as i64, profiles as i64, now()],
        )?;
        Ok(())
    }

    pub fn get_session(&self, session_id: &str) -> Result<Option<SessionRow>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT session_id, email, logged_in, connections_count, profiles_processed
                 FROM sessions WHERE session_id = ?1",
                [session_id],
                |r| {
                    Ok(SessionRow {
                        session_id: r.get(0)?,
                        email: r.get(1)?,
                        logged_in: r.get(2)?,
                        connections_count: r.get(3)?,
                        profiles_processed: r.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    pub fn end_session(&self, session_id: &str) -> Result<()> {
        self.conn.lock().execute(
            "UPDATE sessions SET logged_in = 0, last_activity = ?2 WHERE session_id = ?1",
            params![session_id, now()],
        )?;
        Ok(())
    }
}

// ── Stats ──

pub struct Stats {
    pub connections: usize,
    pub detailed: usize,
    pub undetailed: usize,
    pub sessions: usize,
    pub active_sessions: usize,
}

impl Store {
    pub fn get_stats(&self) -> Result<Stats> {
        let conn = self.conn.lock();
        let connections: usize =
            conn.query_row("SELECT COUNT(*) FROM connections", [], |r| r.get(0))?;
        let detailed: usize = conn.query_row(
            "SELECT COUNT(*) FROM connections WHERE json_type(doc, '$.experiences') IS NOT NULL",
            [],
            |r| r.get(0),
        )?;
        let sessions: usize = conn.query_row("SELECT COUNT(*) FROM sessions", [], |r| r.get(0))?;
        let active_sessions: usize =
            conn.query_row("SELECT COUNT(*) FROM sessions WHERE logged_in = 1", [], |r| {
                r.get(0)
            })?;
        Ok(Stats {
            connections,
            detailed,
            undetailed: connections - detailed,
            sessions,
            active_sessions,
        })
    }
}

// ── Tests ──
