use crate::db::models::{Role, Session, Turn, User};
use chrono::{DateTime, Utc};
use duckdb::{params, Connection, Result as DbResult, Row};
use uuid::Uuid;

pub struct DbService;

impl DbService {
    // DuckDB hands timestamps back as driver-specific values; querying them as
    // CAST(... AS VARCHAR) keeps the row mappers independent of driver features.
    fn text_timestamp(row: &Row, idx: usize) -> DbResult<DateTime<Utc>> {
        let val: duckdb::types::Value = row.get(idx)?;
        let s = match val {
            duckdb::types::Value::Text(s) => s,
            _ => String::new(),
        };
        // DuckDB casts TIMESTAMP to a zone-less "YYYY-MM-DD HH:MM:SS.ffffff"
        let parsed = s.parse::<DateTime<Utc>>().ok().or_else(|| {
            chrono::NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S%.f")
                .ok()
                .map(|n| n.and_utc())
        });
        Ok(parsed.unwrap_or_else(Utc::now))
    }

    fn row_to_user(row: &Row) -> DbResult<User> {
        Ok(User {
            id: row.get::<_, String>(0)?.parse().unwrap_or_default(),
            name: row.get(1)?,
            created_at: Self::text_timestamp(row, 2)?,
        })
    }

    fn row_to_session(row: &Row) -> DbResult<Session> {
        Ok(Session {
            id: row.get::<_, String>(0)?.parse().unwrap_or_default(),
            title: row.get(1)?,
            owner_id: row.get::<_, String>(2)?.parse().unwrap_or_default(),
            created_at: Self::text_timestamp(row, 3)?,
            updated_at: Self::text_timestamp(row, 4)?,
        })
    }

    fn row_to_turn(row: &Row) -> DbResult<Turn> {
        let role_str: String = row.get(2)?;
        // An unrecognized role means the row did not come from our write
        // paths; surface it instead of coercing to a legal author.
        let role = Role::parse(&role_str).ok_or_else(|| {
            duckdb::Error::FromSqlConversionFailure(
                2,
                duckdb::types::Type::Text,
                format!("invalid turn role: {}", role_str).into(),
            )
        })?;
        Ok(Turn {
            id: row.get(0)?,
            session_id: row.get::<_, String>(1)?.parse().unwrap_or_default(),
            role,
            content: row.get(3)?,
            created_at: Self::text_timestamp(row, 4)?,
        })
    }

    // --- User Operations ---

    pub fn upsert_user(conn: &Connection, id: Uuid, name: &str) -> DbResult<()> {
        conn.execute(
            "INSERT INTO users (id, name) VALUES (?, ?)
             ON CONFLICT (id) DO UPDATE SET name = excluded.name",
            params![id.to_string(), name],
        )?;
        Ok(())
    }

    pub fn get_user(conn: &Connection, id: Uuid) -> DbResult<Option<User>> {
        let mut stmt = conn.prepare(
            "SELECT id, name, CAST(created_at AS VARCHAR) FROM users WHERE id = ?",
        )?;
        let mut rows = stmt.query_map(params![id.to_string()], Self::row_to_user)?;

        if let Some(row) = rows.next() {
            Ok(Some(row?))
        } else {
            Ok(None)
        }
    }

    // --- Session Operations ---

    pub fn insert_session(conn: &Connection, owner_id: Uuid, title: &str) -> DbResult<Session> {
        let id = Uuid::new_v4();

        conn.execute(
            "INSERT INTO sessions (id, title, owner_id) VALUES (?, ?, ?)",
            params![id.to_string(), title, owner_id.to_string()],
        )?;

        Self::get_session(conn, id).map(|s| s.unwrap())
    }

    pub fn get_session(conn: &Connection, id: Uuid) -> DbResult<Option<Session>> {
        let mut stmt = conn.prepare(
            "SELECT id, title, owner_id, CAST(created_at AS VARCHAR), CAST(updated_at AS VARCHAR)
             FROM sessions WHERE id = ?",
        )?;
        let mut rows = stmt.query_map(params![id.to_string()], Self::row_to_session)?;

        if let Some(row) = rows.next() {
            Ok(Some(row?))
        } else {
            Ok(None)
        }
    }

    pub fn list_sessions(conn: &Connection, owner_id: Uuid) -> DbResult<Vec<Session>> {
        let mut stmt = conn.prepare(
            "SELECT id, title, owner_id, CAST(created_at AS VARCHAR), CAST(updated_at AS VARCHAR)
             FROM sessions WHERE owner_id = ? ORDER BY updated_at DESC",
        )?;
        let rows = stmt.query_map(params![owner_id.to_string()], Self::row_to_session)?;

        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(row?);
        }
        Ok(sessions)
    }

    pub fn rename_session(conn: &Connection, id: Uuid, title: &str) -> DbResult<Option<Session>> {
        conn.execute(
            "UPDATE sessions SET title = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            params![title, id.to_string()],
        )?;
        Self::get_session(conn, id)
    }

    /// Bump `updated_at` (and optionally the title) as part of a completed exchange.
    /// Turn inserts deliberately do not touch the session row, so a failed exchange
    /// leaves both fields exactly as they were.
    pub fn touch_session(conn: &Connection, id: Uuid, title: Option<&str>) -> DbResult<()> {
        match title {
            Some(t) => conn.execute(
                "UPDATE sessions SET title = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
                params![t, id.to_string()],
            )?,
            None => conn.execute(
                "UPDATE sessions SET updated_at = CURRENT_TIMESTAMP WHERE id = ?",
                params![id.to_string()],
            )?,
        };
        Ok(())
    }

    pub fn delete_session(conn: &Connection, id: Uuid) -> DbResult<()> {
        conn.execute("BEGIN TRANSACTION", [])?;

        let id_str = id.to_string();

        // Turns first, then the session row
        if let Err(e) = conn.execute("DELETE FROM turns WHERE session_id = ?", params![id_str]) {
            let _ = conn.execute("ROLLBACK", []);
            return Err(e);
        }

        if let Err(e) = conn.execute("DELETE FROM sessions WHERE id = ?", params![id_str]) {
            let _ = conn.execute("ROLLBACK", []);
            return Err(e);
        }

        conn.execute("COMMIT", [])?;
        Ok(())
    }

    // --- Turn Operations ---

    pub fn insert_turn(
        conn: &Connection,
        session_id: Uuid,
        role: Role,
        content: &str,
    ) -> DbResult<Turn> {
        conn.execute(
            "INSERT INTO turns (session_id, role, content) VALUES (?, ?, ?)",
            params![session_id.to_string(), role.as_str(), content],
        )?;

        // Fetch the turn we just inserted (id comes from the sequence)
        let mut stmt = conn.prepare(
            "SELECT id, session_id, role, content, CAST(created_at AS VARCHAR)
             FROM turns WHERE session_id = ? ORDER BY id DESC LIMIT 1",
        )?;
        let mut rows = stmt.query_map(params![session_id.to_string()], Self::row_to_turn)?;

        Ok(rows.next().unwrap()?)
    }

    pub fn get_turns(conn: &Connection, session_id: Uuid) -> DbResult<Vec<Turn>> {
        let mut stmt = conn.prepare(
            "SELECT id, session_id, role, content, CAST(created_at AS VARCHAR)
             FROM turns WHERE session_id = ? ORDER BY created_at ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![session_id.to_string()], Self::row_to_turn)?;

        let mut turns = Vec::new();
        for row in rows {
            turns.push(row?);
        }
        Ok(turns)
    }

    pub fn count_turns(conn: &Connection, session_id: Uuid) -> DbResult<usize> {
        let mut stmt = conn.prepare("SELECT COUNT(*) FROM turns WHERE session_id = ?")?;
        let count: i64 = stmt.query_row(params![session_id.to_string()], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// The earliest turn of a session, used for list previews.
    pub fn first_turn(conn: &Connection, session_id: Uuid) -> DbResult<Option<Turn>> {
        let mut stmt = conn.prepare(
            "SELECT id, session_id, role, content, CAST(created_at AS VARCHAR)
             FROM turns WHERE session_id = ? ORDER BY created_at ASC, id ASC LIMIT 1",
        )?;
        let mut rows = stmt.query_map(params![session_id.to_string()], Self::row_to_turn)?;

        if let Some(row) = rows.next() {
            Ok(Some(row?))
        } else {
            Ok(None)
        }
    }
}
