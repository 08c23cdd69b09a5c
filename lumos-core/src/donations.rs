use crate::error::{CoreError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio_rusqlite::Connection;
use tracing::{debug, info};

/// Longest donor name accepted, in characters after trimming
pub const MAX_DONOR_NAME_CHARS: usize = 50;

/// Smallest accepted amount, in whole kronor
pub const MIN_AMOUNT: i64 = 1;

/// Largest accepted amount, in whole kronor
pub const MAX_AMOUNT: i64 = 100_000;

const SCHEMA_SQL: &str = r"
CREATE TABLE IF NOT EXISTS donations (
    id INTEGER PRIMARY KEY,
    donor_name TEXT NOT NULL,
    amount INTEGER NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_donations_leaderboard ON donations(amount DESC, created_at DESC);
";

/// A stored donation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Donation {
    pub id: i64,
    pub donor_name: String,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

/// A donation as submitted, before validation
#[derive(Debug, Clone, Deserialize)]
pub struct NewDonation {
    pub donor_name: String,
    pub amount: i64,
}

impl NewDonation {
    #[must_use]
    pub fn new(donor_name: impl Into<String>, amount: i64) -> Self {
        Self {
            donor_name: donor_name.into(),
            amount,
        }
    }

    /// Check the donation and return it with a trimmed donor name
    ///
    /// # Errors
    ///
    /// Returns `InvalidDonation` if the name is empty or too long, or the
    /// amount is out of range.
    pub fn validate(&self) -> Result<Self> {
        let donor_name = self.donor_name.trim();
        if donor_name.is_empty() {
            return Err(CoreError::InvalidDonation {
                reason: "donor name is required".to_string(),
            });
        }
        if donor_name.chars().count() > MAX_DONOR_NAME_CHARS {
            return Err(CoreError::InvalidDonation {
                reason: format!("donor name must be at most {MAX_DONOR_NAME_CHARS} characters"),
            });
        }
        if !(MIN_AMOUNT..=MAX_AMOUNT).contains(&self.amount) {
            return Err(CoreError::InvalidDonation {
                reason: format!("amount must be between {MIN_AMOUNT} and {MAX_AMOUNT}"),
            });
        }
        Ok(Self {
            donor_name: donor_name.to_string(),
            amount: self.amount,
        })
    }
}

/// SQLite-backed donation leaderboard
pub struct DonationStore {
    conn: Connection,
}

impl DonationStore {
    /// Open the store at `path`, creating the file and schema if needed
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub async fn open(path: &Path) -> Result<Self> {
        info!("Opening donations database at {:?}", path);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path).await?;
        Self::init(conn, true).await
    }

    /// Open a throwaway in-memory store
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub async fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn, false).await
    }

    async fn init(conn: Connection, wal: bool) -> Result<Self> {
        conn.call(move |conn| {
            conn.execute_batch(SCHEMA_SQL)?;
            if wal {
                conn.pragma_update(None, "journal_mode", "WAL")?;
            }
            Ok(())
        })
        .await?;

        debug!("Donations schema ready");
        Ok(Self { conn })
    }

    /// Validate and store a donation
    ///
    /// # Errors
    ///
    /// Returns `InvalidDonation` for bad input (nothing is stored), or a
    /// database error.
    pub async fn insert(&self, donation: NewDonation) -> Result<Donation> {
        self.insert_at(donation, Utc::now()).await
    }

    /// Validate and store a donation made at `created_at`
    ///
    /// # Errors
    ///
    /// Returns `InvalidDonation` for bad input (nothing is stored), or a
    /// database error.
    pub async fn insert_at(
        &self,
        donation: NewDonation,
        created_at: DateTime<Utc>,
    ) -> Result<Donation> {
        let NewDonation { donor_name, amount } = donation.validate()?;
        let stored_name = donor_name.clone();
        let created_ms = created_at.timestamp_millis();

        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO donations (donor_name, amount, created_at) VALUES (?1, ?2, ?3)",
                    rusqlite::params![stored_name, amount, created_ms],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;

        info!(id, amount, "Stored donation");
        Ok(Donation {
            id,
            donor_name,
            amount,
            created_at: DateTime::from_timestamp_millis(created_ms).unwrap_or(created_at),
        })
    }

    /// Largest donations first; ties go to the most recent
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn top(&self, limit: u32) -> Result<Vec<Donation>> {
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare_cached(
                    r"
                    SELECT id, donor_name, amount, created_at
                    FROM donations
                    ORDER BY amount DESC, created_at DESC, id DESC
                    LIMIT ?1
                ",
                )?;

                let rows = stmt
                    .query_map([i64::from(limit)], |row| {
                        Ok(Donation {
                            id: row.get(0)?,
                            donor_name: row.get(1)?,
                            amount: row.get(2)?,
                            created_at: DateTime::from_timestamp_millis(row.get::<_, i64>(3)?)
                                .unwrap_or_default(),
                        })
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;

                Ok(rows)
            })
            .await
            .map_err(Into::into)
    }

    /// Number of stored donations
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn count(&self) -> Result<u64> {
        self.conn
            .call(|conn| {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM donations", [], |row| row.get(0))?;
                Ok(u64::try_from(count).unwrap_or(0))
            })
            .await
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 12, 1, 18, minute, 0).unwrap()
    }

    #[test]
    fn test_validate_trims_name() {
        let valid = NewDonation::new("  Anna  ", 200).validate().unwrap();
        assert_eq!(valid.donor_name, "Anna");
        assert_eq!(valid.amount, 200);
    }

    #[test]
    fn test_validate_rejects_bad_names() {
        assert!(NewDonation::new("   ", 10).validate().is_err());
        assert!(NewDonation::new("x".repeat(51), 10).validate().is_err());
        // 50 multi-byte characters is still fine
        assert!(NewDonation::new("å".repeat(50), 10).validate().is_ok());
    }

    #[test]
    fn test_validate_amount_bounds() {
        assert!(NewDonation::new("Anna", 0).validate().is_err());
        assert!(NewDonation::new("Anna", -5).validate().is_err());
        assert!(NewDonation::new("Anna", 100_001).validate().is_err());
        assert!(NewDonation::new("Anna", 1).validate().is_ok());
        assert!(NewDonation::new("Anna", 100_000).validate().is_ok());
    }

    #[tokio::test]
    async fn test_insert_and_top() {
        let store = DonationStore::open_in_memory().await.unwrap();
        store
            .insert_at(NewDonation::new("Anna", 100), at(0))
            .await
            .unwrap();
        store
            .insert_at(NewDonation::new("Bertil", 500), at(1))
            .await
            .unwrap();
        store
            .insert_at(NewDonation::new("Cecilia", 250), at(2))
            .await
            .unwrap();

        let top = store.top(2).await.unwrap();
        let names: Vec<_> = top.iter().map(|d| d.donor_name.as_str()).collect();
        assert_eq!(names, vec!["Bertil", "Cecilia"]);
        assert_eq!(store.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_ties_prefer_most_recent() {
        let store = DonationStore::open_in_memory().await.unwrap();
        store
            .insert_at(NewDonation::new("Early", 300), at(0))
            .await
            .unwrap();
        store
            .insert_at(NewDonation::new("Late", 300), at(0) + Duration::minutes(5))
            .await
            .unwrap();

        let top = store.top(10).await.unwrap();
        assert_eq!(top[0].donor_name, "Late");
        assert_eq!(top[1].donor_name, "Early");
    }

    #[tokio::test]
    async fn test_invalid_donation_is_not_stored() {
        let store = DonationStore::open_in_memory().await.unwrap();
        let err = store.insert(NewDonation::new("", 100)).await;
        assert!(matches!(err, Err(CoreError::InvalidDonation { .. })));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_open_file_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("donations.db");

        {
            let store = DonationStore::open(&path).await.unwrap();
            let stored = store
                .insert_at(NewDonation::new("Anna", 42), at(3))
                .await
                .unwrap();
            assert_eq!(stored.created_at, at(3));
        }

        let reopened = DonationStore::open(&path).await.unwrap();
        let top = reopened.top(5).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].amount, 42);
        assert_eq!(top[0].created_at, at(3));
    }
}
