//! SQLite-based store implementation

use chrono::{DateTime, Local};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;
use tickwatch_api::{Settings, Ticket};
use tickwatch_util::TicketId;
use tracing::{debug, warn};

use crate::{Store, StoreResult};

const META_LAST_CHECKED: &str = "last_checked";
const META_PAUSED: &str = "monitoring_paused";

/// SQLite-based store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute_batch(
            r#"
            -- Monitoring settings (single row)
            CREATE TABLE IF NOT EXISTS settings (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                settings_json TEXT NOT NULL
            );

            -- Alert set, replaced wholesale each poll (single row)
            CREATE TABLE IF NOT EXISTS alerts (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                alerts_json TEXT NOT NULL,
                replaced_at TEXT NOT NULL
            );

            -- Small key/value state: last_checked, monitoring_paused
            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            -- Read marks keyed by ticket id; kept out of the alert set so
            -- they survive the wholesale replacement
            CREATE TABLE IF NOT EXISTS read_marks (
                ticket_id TEXT PRIMARY KEY,
                read_at TEXT NOT NULL
            );
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }

    fn get_meta(&self, key: &str) -> StoreResult<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let value: Option<String> = conn
            .query_row("SELECT value FROM meta WHERE key = ?", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set_meta(&self, key: &str, value: &str) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO meta (key, value)
            VALUES (?, ?)
            ON CONFLICT(key)
            DO UPDATE SET value = excluded.value
            "#,
            params![key, value],
        )?;
        Ok(())
    }
}

impl Store for SqliteStore {
    fn load_settings(&self) -> StoreResult<Option<Settings>> {
        let conn = self.conn.lock().unwrap();

        let json: Option<String> = conn
            .query_row("SELECT settings_json FROM settings WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()?;

        match json {
            Some(s) => Ok(Some(serde_json::from_str(&s)?)),
            None => Ok(None),
        }
    }

    fn save_settings(&self, settings: &Settings) -> StoreResult<()> {
        let json = serde_json::to_string(settings)?;
        let conn = self.conn.lock().unwrap();

        conn.execute(
            r#"
            INSERT INTO settings (id, settings_json)
            VALUES (1, ?)
            ON CONFLICT(id)
            DO UPDATE SET settings_json = excluded.settings_json
            "#,
            [json],
        )?;

        debug!("Settings saved");
        Ok(())
    }

    fn load_alerts(&self) -> StoreResult<Vec<Ticket>> {
        let conn = self.conn.lock().unwrap();

        let json: Option<String> = conn
            .query_row("SELECT alerts_json FROM alerts WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()?;

        match json {
            Some(s) => Ok(serde_json::from_str(&s)?),
            None => Ok(Vec::new()),
        }
    }

    fn replace_alerts(&self, alerts: &[Ticket]) -> StoreResult<()> {
        let json = serde_json::to_string(alerts)?;
        let conn = self.conn.lock().unwrap();

        conn.execute(
            r#"
            INSERT INTO alerts (id, alerts_json, replaced_at)
            VALUES (1, ?, ?)
            ON CONFLICT(id)
            DO UPDATE SET alerts_json = excluded.alerts_json,
                          replaced_at = excluded.replaced_at
            "#,
            params![json, tickwatch_util::now().to_rfc3339()],
        )?;

        debug!(count = alerts.len(), "Alert set replaced");
        Ok(())
    }

    fn clear_alerts(&self) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM alerts WHERE id = 1", [])?;
        debug!("Alert set cleared");
        Ok(())
    }

    fn last_checked(&self) -> StoreResult<Option<DateTime<Local>>> {
        let value = self.get_meta(META_LAST_CHECKED)?;
        Ok(value.and_then(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Local))
                .ok()
        }))
    }

    fn set_last_checked(&self, at: DateTime<Local>) -> StoreResult<()> {
        self.set_meta(META_LAST_CHECKED, &at.to_rfc3339())
    }

    fn is_paused(&self) -> StoreResult<bool> {
        Ok(self.get_meta(META_PAUSED)?.as_deref() == Some("1"))
    }

    fn set_paused(&self, paused: bool) -> StoreResult<()> {
        self.set_meta(META_PAUSED, if paused { "1" } else { "0" })
    }

    fn mark_read(&self, id: &TicketId, at: DateTime<Local>) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            r#"
            INSERT INTO read_marks (ticket_id, read_at)
            VALUES (?, ?)
            ON CONFLICT(ticket_id)
            DO UPDATE SET read_at = excluded.read_at
            "#,
            params![id.as_str(), at.to_rfc3339()],
        )?;

        debug!(ticket_id = %id, "Ticket marked read");
        Ok(())
    }

    fn read_ids(&self) -> StoreResult<HashSet<TicketId>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare("SELECT ticket_id FROM read_marks")?;
        let rows = stmt.query_map([], |row| {
            let id: String = row.get(0)?;
            Ok(id)
        })?;

        let mut ids = HashSet::new();
        for row in rows {
            ids.insert(TicketId::new(row?));
        }

        Ok(ids)
    }

    fn is_healthy(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => {
                warn!("Store lock poisoned");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickwatch_api::{TicketFlags, TicketStatus};

    fn ticket(id: &str, status: TicketStatus) -> Ticket {
        Ticket {
            id: TicketId::new(id),
            title: format!("요청 {}", id),
            company: "Acme".into(),
            status,
            writer: "kim".into(),
            requested_at: "2025-12-24 09:00".into(),
            requested_at_full: "2025-12-24 09:00:12".into(),
            processed_at: None,
            flags: TicketFlags::default(),
        }
    }

    #[test]
    fn test_in_memory_store() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.is_healthy());
    }

    #[test]
    fn test_settings_round_trip() {
        let store = SqliteStore::in_memory().unwrap();

        assert!(store.load_settings().unwrap().is_none());

        let mut settings = Settings::default();
        settings.portal_url = "https://support.example.co.kr/home".into();
        settings.username = "kim".into();
        store.save_settings(&settings).unwrap();

        let loaded = store.load_settings().unwrap().unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_alert_set_replacement() {
        let store = SqliteStore::in_memory().unwrap();

        // Empty before any poll
        assert!(store.load_alerts().unwrap().is_empty());

        store
            .replace_alerts(&[
                ticket("A1", TicketStatus::Received),
                ticket("A2", TicketStatus::InProgress),
            ])
            .unwrap();
        assert_eq!(store.load_alerts().unwrap().len(), 2);

        // Wholesale replacement drops tickets not in the new set
        store
            .replace_alerts(&[ticket("A3", TicketStatus::CustomerReplied)])
            .unwrap();
        let alerts = store.load_alerts().unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].id.as_str(), "A3");

        store.clear_alerts().unwrap();
        assert!(store.load_alerts().unwrap().is_empty());
    }

    #[test]
    fn test_last_checked() {
        let store = SqliteStore::in_memory().unwrap();

        assert!(store.last_checked().unwrap().is_none());

        let at = tickwatch_util::now();
        store.set_last_checked(at).unwrap();

        let stored = store.last_checked().unwrap().unwrap();
        assert!((stored - at).num_seconds().abs() < 1);
    }

    #[test]
    fn test_paused_marker() {
        let store = SqliteStore::in_memory().unwrap();

        assert!(!store.is_paused().unwrap());
        store.set_paused(true).unwrap();
        assert!(store.is_paused().unwrap());
        store.set_paused(false).unwrap();
        assert!(!store.is_paused().unwrap());
    }

    #[test]
    fn test_read_marks_survive_replacement() {
        let store = SqliteStore::in_memory().unwrap();

        store
            .replace_alerts(&[ticket("A1", TicketStatus::Received)])
            .unwrap();
        store
            .mark_read(&TicketId::new("A1"), tickwatch_util::now())
            .unwrap();

        // Replace with a different set; the read mark stays
        store
            .replace_alerts(&[ticket("A2", TicketStatus::Received)])
            .unwrap();

        let read = store.read_ids().unwrap();
        assert!(read.contains(&TicketId::new("A1")));
    }
}
