//! SQLite-backed account records keyed by email.
//!
//! Store flows never touch this; callers persist the account snapshots the
//! flows return.

use crate::base::storeerror::StoreError;
use crate::accounts::seed::DefaultAccount;
use crate::store::account::Account;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS accounts (
    email TEXT PRIMARY KEY,
    record TEXT NOT NULL
)";

pub struct AccountStore {
    conn: Mutex<Connection>,
}

impl AccountStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Persistence("account store lock poisoned".to_string()))
    }

    /// All accounts, ordered by email.
    pub fn read_all(&self) -> Result<Vec<Account>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT record FROM accounts ORDER BY email")?;
        let records = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        records
            .iter()
            .map(|record| serde_json::from_str(record).map_err(StoreError::from))
            .collect()
    }

    pub fn read_one(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let conn = self.lock()?;
        let record: Option<String> = conn
            .query_row(
                "SELECT record FROM accounts WHERE email = ?1",
                params![email],
                |row| row.get(0),
            )
            .optional()?;

        match record {
            Some(record) => Ok(Some(serde_json::from_str(&record)?)),
            None => Ok(None),
        }
    }

    /// Insert or replace the whole record for `account.email`.
    pub fn upsert(&self, account: &Account) -> Result<(), StoreError> {
        let record = serde_json::to_string(account)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO accounts (email, record) VALUES (?1, ?2)
             ON CONFLICT(email) DO UPDATE SET record = excluded.record",
            params![account.email, record],
        )?;
        tracing::debug!("Stored account {}", account.email);
        Ok(())
    }

    /// Returns whether a record was removed.
    pub fn delete(&self, email: &str) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM accounts WHERE email = ?1", params![email])?;
        Ok(removed > 0)
    }

    /// Add the seeded default account unless one with that email exists.
    /// Returns whether it was added.
    pub fn seed_default(&self, default: &DefaultAccount) -> Result<bool, StoreError> {
        let account = Account::new(default.email.as_str(), default.password.as_str());
        let record = serde_json::to_string(&account)?;
        let conn = self.lock()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO accounts (email, record) VALUES (?1, ?2)",
            params![account.email, record],
        )?;
        if inserted > 0 {
            tracing::info!("Added default account {}", account.email);
        }
        Ok(inserted > 0)
    }
}
