use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};

use crate::content::ids::SlotId;
use crate::core::serialization::{snapshot_from_json, snapshot_to_json};
use crate::persistence::repository::{SaveError, SaveRepository, SaveSlot};

const SAVE_SCHEMA_VERSION: i64 = 1;

const SAVE_DB_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS save_meta (
  id INTEGER PRIMARY KEY CHECK (id = 1),
  schema_version INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS save_slots (
  slot INTEGER PRIMARY KEY,
  saved_at INTEGER NOT NULL,
  case_id TEXT NOT NULL,
  save_version INTEGER NOT NULL,
  payload TEXT NOT NULL
);
"#;

/// Save slots kept in a SQLite file, one JSON payload per slot.
pub struct SqliteSaveRepository {
    conn: Mutex<Connection>,
}

impl SqliteSaveRepository {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SaveError> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, SaveError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, SaveError> {
        conn.execute_batch(SAVE_DB_SCHEMA)?;
        ensure_save_meta(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, SaveError> {
        self.conn
            .lock()
            .map_err(|_| SaveError::InvalidData("save database lock poisoned".to_string()))
    }
}

fn ensure_save_meta(conn: &Connection) -> Result<(), SaveError> {
    let version = conn
        .query_row(
            "SELECT schema_version FROM save_meta WHERE id = 1",
            [],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;

    match version {
        Some(SAVE_SCHEMA_VERSION) => Ok(()),
        Some(other) => Err(SaveError::InvalidData(format!(
            "save_meta version mismatch (schema {}, expected {})",
            other, SAVE_SCHEMA_VERSION
        ))),
        None => {
            conn.execute(
                "INSERT INTO save_meta (id, schema_version) VALUES (1, ?1)",
                params![SAVE_SCHEMA_VERSION],
            )?;
            Ok(())
        }
    }
}

const SLOT_COLUMNS: &str = "slot, saved_at, case_id, save_version, payload";

struct SlotRow {
    slot: i64,
    saved_at: i64,
    case_id: String,
    save_version: i64,
    payload: String,
}

fn read_slot_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SlotRow> {
    Ok(SlotRow {
        slot: row.get(0)?,
        saved_at: row.get(1)?,
        case_id: row.get(2)?,
        save_version: row.get(3)?,
        payload: row.get(4)?,
    })
}

/// The indexed columns must agree with the payload they describe.
fn slot_from_row(row: SlotRow) -> Result<SaveSlot, SaveError> {
    let slot = SlotId::try_from(row.slot)
        .map_err(|_| SaveError::InvalidData(format!("invalid slot number {}", row.slot)))?;
    let snapshot = snapshot_from_json(&row.payload)?;
    if snapshot.case_id != row.case_id || i64::from(snapshot.version) != row.save_version {
        return Err(SaveError::InvalidData(format!(
            "slot {} is recorded as case {} v{} but holds case {} v{}",
            slot, row.case_id, row.save_version, snapshot.case_id, snapshot.version
        )));
    }
    Ok(SaveSlot {
        slot,
        saved_at: row.saved_at,
        snapshot,
    })
}

impl SaveRepository for SqliteSaveRepository {
    fn get(&self, slot: SlotId) -> Result<Option<SaveSlot>, SaveError> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!("SELECT {SLOT_COLUMNS} FROM save_slots WHERE slot = ?1"),
                params![i64::from(slot)],
                read_slot_row,
            )
            .optional()?;
        row.map(slot_from_row).transpose()
    }

    fn put(&mut self, save: SaveSlot) -> Result<(), SaveError> {
        let payload = snapshot_to_json(&save.snapshot)?;
        let conn = self.conn()?;
        conn.execute(
            &format!("INSERT OR REPLACE INTO save_slots ({SLOT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5)"),
            params![
                i64::from(save.slot),
                save.saved_at,
                save.snapshot.case_id,
                i64::from(save.snapshot.version),
                payload
            ],
        )?;
        Ok(())
    }

    fn delete(&mut self, slot: SlotId) -> Result<bool, SaveError> {
        let conn = self.conn()?;
        let removed = conn.execute("DELETE FROM save_slots WHERE slot = ?1", params![i64::from(slot)])?;
        Ok(removed > 0)
    }

    fn list(&self) -> Result<Vec<SaveSlot>, SaveError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("SELECT {SLOT_COLUMNS} FROM save_slots ORDER BY slot"))?;
        let rows = stmt.query_map([], read_slot_row)?;

        let mut slots = Vec::new();
        for row in rows {
            slots.push(slot_from_row(row?)?);
        }
        Ok(slots)
    }
}
