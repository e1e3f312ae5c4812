use std::path::Path;

use domain::common::error::DomainError;
use ports::secondary::registration_store::{Registration, RegistrationStore};
use redb::{Database, ReadableTable, TableDefinition};

/// redb table: key = token, value = username.
const REGISTRATION_TABLE: TableDefinition<&str, &str> = TableDefinition::new("registrations");

fn table_error(context: &str, e: impl std::fmt::Display) -> DomainError {
    DomainError::TableError(format!("{context}: {e}"))
}

/// Persistent registration store backed by redb.
///
/// Tokens survive agent restarts; the rest of the data plane never reads
/// this database.
pub struct RedbRegistrationStore {
    db: Database,
}

impl RedbRegistrationStore {
    /// Open (or create) the database at `path` and ensure the table exists.
    pub fn open(path: &Path) -> Result<Self, DomainError> {
        let db = Database::create(path).map_err(|e| table_error("redb open", e))?;

        let txn = db
            .begin_write()
            .map_err(|e| table_error("redb txn begin", e))?;
        {
            let _table = txn
                .open_table(REGISTRATION_TABLE)
                .map_err(|e| table_error("redb table create", e))?;
        }
        txn.commit().map_err(|e| table_error("redb commit", e))?;

        Ok(Self { db })
    }
}

impl RegistrationStore for RedbRegistrationStore {
    fn list(&self) -> Result<Vec<Registration>, DomainError> {
        let txn = self
            .db
            .begin_read()
            .map_err(|e| table_error("redb read txn", e))?;
        let table = txn
            .open_table(REGISTRATION_TABLE)
            .map_err(|e| table_error("redb read table", e))?;

        // Listing skips undecodable entries rather than failing wholesale.
        let mut out = Vec::new();
        for item in table.iter().map_err(|e| table_error("redb iter", e))? {
            let Ok((token, username)) = item else {
                continue;
            };
            out.push(Registration {
                token: token.value().to_string(),
                username: username.value().to_string(),
            });
        }
        Ok(out)
    }

    fn insert(&self, registration: &Registration) -> Result<(), DomainError> {
        let txn = self
            .db
            .begin_write()
            .map_err(|e| table_error("redb write txn", e))?;
        {
            let mut table = txn
                .open_table(REGISTRATION_TABLE)
                .map_err(|e| table_error("redb write table", e))?;

            let exists = table
                .get(registration.token.as_str())
                .map_err(|e| table_error("redb get", e))?
                .is_some();
            if exists {
                return Err(DomainError::DeviceExists(registration.token.clone()));
            }

            table
                .insert(registration.token.as_str(), registration.username.as_str())
                .map_err(|e| table_error("redb insert", e))?;
        }
        txn.commit().map_err(|e| table_error("redb write commit", e))
    }

    fn delete(&self, token: &str) -> Result<(), DomainError> {
        let txn = self
            .db
            .begin_write()
            .map_err(|e| table_error("redb write txn", e))?;
        let removed = {
            let mut table = txn
                .open_table(REGISTRATION_TABLE)
                .map_err(|e| table_error("redb write table", e))?;
            let removed = table
                .remove(token)
                .map_err(|e| table_error("redb remove", e))?
                .is_some();
            removed
        };
        txn.commit().map_err(|e| table_error("redb write commit", e))?;

        if removed {
            Ok(())
        } else {
            Err(DomainError::NotFound(token.to_string()))
        }
    }
}
