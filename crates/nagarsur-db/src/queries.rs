use crate::models::AccountRow;
use crate::Database;
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use nagarsur_types::{IdentityRecord, PlatformEvent};

/// Fields needed to create an account.
pub struct NewAccount<'a> {
    pub id: &'a str,
    pub username: &'a str,
    pub password_hash: &'a str,
    pub display_name: Option<&'a str>,
    pub email: Option<&'a str>,
    pub is_admin: bool,
}

impl Database {
    // -- Accounts --

    /// Insert an account and fire the account-created event.
    pub fn create_account(&self, account: &NewAccount<'_>) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO accounts (id, username, password, display_name, email, is_admin)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    account.id,
                    account.username,
                    account.password_hash,
                    account.display_name,
                    account.email,
                    account.is_admin,
                ],
            )?;
            Ok(())
        })?;

        info!("Account {} created for {}", account.id, account.username);
        self.publish(PlatformEvent::AccountCreated(IdentityRecord {
            uid: account.id.to_string(),
            display_name: account.display_name.map(str::to_string),
            email: account.email.map(str::to_string),
        }));
        Ok(())
    }

    pub fn get_account_by_username(&self, username: &str) -> Result<Option<AccountRow>> {
        self.with_conn(|conn| query_account(conn, "username", username))
    }

    pub fn get_account_by_id(&self, id: &str) -> Result<Option<AccountRow>> {
        self.with_conn(|conn| query_account(conn, "id", id))
    }
}

fn query_account(conn: &Connection, column: &str, value: &str) -> Result<Option<AccountRow>> {
    let sql = format!(
        "SELECT id, username, password, display_name, email, is_admin, created_at
         FROM accounts WHERE {} = ?1",
        column
    );
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(AccountRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                display_name: row.get(3)?,
                email: row.get(4)?,
                is_admin: row.get(5)?,
                created_at: row.get(6)?,
            })
        })
        .optional()?;

    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account<'a>(id: &'a str, username: &'a str) -> NewAccount<'a> {
        NewAccount {
            id,
            username,
            password_hash: "hash",
            display_name: Some("Asha Rao"),
            email: Some("asha@example.com"),
            is_admin: false,
        }
    }

    #[test]
    fn create_and_lookup() {
        let db = Database::open_in_memory().unwrap();
        db.create_account(&account("id-1", "asha")).unwrap();

        let by_name = db.get_account_by_username("asha").unwrap().unwrap();
        assert_eq!(by_name.id, "id-1");
        assert_eq!(by_name.display_name.as_deref(), Some("Asha Rao"));
        assert!(!by_name.is_admin);

        let by_id = db.get_account_by_id("id-1").unwrap().unwrap();
        assert_eq!(by_id.username, "asha");
        assert!(db.get_account_by_id("nope").unwrap().is_none());
    }

    #[test]
    fn duplicate_username_rejected() {
        let db = Database::open_in_memory().unwrap();
        db.create_account(&account("id-1", "asha")).unwrap();
        assert!(db.create_account(&account("id-2", "asha")).is_err());
    }

    #[test]
    fn creation_fires_account_event() {
        let db = Database::open_in_memory().unwrap();
        let mut rx = db.subscribe();
        db.create_account(&account("id-1", "asha")).unwrap();

        match rx.try_recv().unwrap() {
            PlatformEvent::AccountCreated(rec) => {
                assert_eq!(rec.uid, "id-1");
                assert_eq!(rec.email.as_deref(), Some("asha@example.com"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
