use crate::model::{StorageError, Timeframe};
use crate::request::builder::{LastUsed, UiSelection};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

const KEY_INSTRUMENT: &str = "lastUsedInstrument";
const KEY_TIMEFRAME: &str = "lastUsedTimeframe";
const KEY_NUM_CANDLES: &str = "lastUsedNumCandles";

pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens (or creates) the state database and makes sure the table exists.
    pub fn new(db_path: &str) -> Result<Self, StorageError> {
        Self::with_connection(Connection::open(db_path)?)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS last_used (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            ",
        )?;
        Ok(Self { conn })
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO last_used (key, value, updated_at) VALUES (?1, ?2, datetime('now'))",
            params![key, value],
        )?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM last_used WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Remembers instrument, timeframe and candle count for the next start.
    pub fn save_selection(&self, sel: &UiSelection) -> Result<(), StorageError> {
        self.put(KEY_INSTRUMENT, sel.instrument.trim())?;
        self.put(KEY_TIMEFRAME, sel.timeframe.as_str())?;
        self.put(KEY_NUM_CANDLES, &sel.num_candles.to_string())?;
        debug!("Saved last used selection for {}", sel.instrument);
        Ok(())
    }

    /// Stored values; entries that are empty or unreadable come back as `None`.
    pub fn load_last_used(&self) -> Result<LastUsed, StorageError> {
        let instrument = self.get(KEY_INSTRUMENT)?.filter(|s| !s.trim().is_empty());
        let timeframe = self
            .get(KEY_TIMEFRAME)?
            .filter(|s| !s.is_empty())
            .map(Timeframe::from);
        let num_candles = self
            .get(KEY_NUM_CANDLES)?
            .and_then(|s| s.parse::<u32>().ok())
            .filter(|n| *n > 0);
        Ok(LastUsed { instrument, timeframe, num_candles })
    }
}
