// SPDX-FileCopyrightText: 2026 Slotwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Token store: single-use, expiring capabilities for out-of-band actions.
//!
//! Raw values are 256 bits from the system CSPRNG, handed out exactly once
//! at issuance in URL-safe base64. Only the hex SHA-256 of the raw value is
//! persisted, so a database read can never recover a usable link.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{Duration, Utc};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};
use slotwatch_core::types::{Entry, Slot, Token, TokenPurpose};
use slotwatch_core::SlotwatchError;
use slotwatch_storage::queries::{entries, slots, tokens};
use slotwatch_storage::Database;
use tracing::debug;

/// Everything a token grants access to: the token row plus the entry and
/// slot it acts on.
#[derive(Debug, Clone)]
pub struct TokenContext {
    pub token: Token,
    pub entry: Entry,
    pub slot: Slot,
}

/// Hex SHA-256 of a raw token value, the stored lookup key.
fn hash_token(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

/// Issues and consumes single-use, expiring tokens tied to entries.
#[derive(Clone)]
pub struct TokenStore {
    db: Database,
}

impl TokenStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Issue a fresh token for an entry.
    ///
    /// Returns `(raw, token)`; the raw value exists only in this return
    /// value and in the link sent to the customer.
    pub async fn issue(
        &self,
        entry_id: i64,
        purpose: TokenPurpose,
        ttl: Duration,
    ) -> Result<(String, Token), SlotwatchError> {
        let rng = SystemRandom::new();
        let mut bytes = [0u8; 32];
        rng.fill(&mut bytes)
            .map_err(|_| SlotwatchError::Internal("failed to generate token entropy".to_string()))?;
        let raw = URL_SAFE_NO_PAD.encode(bytes);

        let token = tokens::insert(
            &self.db,
            entry_id,
            &hash_token(&raw),
            purpose,
            Utc::now() + ttl,
        )
        .await?;
        debug!(entry_id, purpose = %purpose, token_id = token.id, "token issued");
        Ok((raw, token))
    }

    /// Resolve a raw token to its context.
    ///
    /// Fails with [`SlotwatchError::InvalidToken`] when the value is
    /// unknown, already consumed, or expired.
    pub async fn resolve(&self, raw: &str) -> Result<TokenContext, SlotwatchError> {
        let token = tokens::find_active_by_hash(&self.db, &hash_token(raw), Utc::now())
            .await?
            .ok_or(SlotwatchError::InvalidToken)?;

        let entry = entries::get(&self.db, token.entry_id)
            .await?
            .ok_or(SlotwatchError::NotFound {
                entity: "entry",
                key: token.entry_id.to_string(),
            })?;
        let slot = slots::get(&self.db, entry.slot_id)
            .await?
            .ok_or(SlotwatchError::NotFound {
                entity: "slot",
                key: entry.slot_id.to_string(),
            })?;

        Ok(TokenContext { token, entry, slot })
    }

    /// Consume a token; every later resolve of the same raw value fails.
    pub async fn consume(&self, token_id: i64) -> Result<(), SlotwatchError> {
        if tokens::consume(&self.db, token_id, Utc::now()).await? {
            Ok(())
        } else {
            Err(SlotwatchError::InvalidToken)
        }
    }

    /// Delete expired tokens, consumed or not.
    pub async fn sweep_expired(&self) -> Result<usize, SlotwatchError> {
        tokens::sweep_expired(&self.db, Utc::now()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotwatch_core::types::Customer;
    use tempfile::tempdir;

    async fn setup() -> (TokenStore, Database, tempfile::TempDir, i64) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("token_store_test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

        let start = Utc::now() + Duration::hours(5);
        let slot = slots::insert(
            &db,
            slots::NewSlot {
                owner_id: "owner-1".to_string(),
                label: None,
                start_at: start,
                end_at: start + Duration::hours(1),
                check_interval_minutes: 30,
            },
        )
        .await
        .unwrap();
        let entry = entries::insert_pending(
            &db,
            entries::NewEntry {
                slot_id: slot.id,
                owner_id: "owner-1".to_string(),
                customer: Customer {
                    name: "Alice".to_string(),
                    phone: "+15550100".to_string(),
                    email: None,
                },
                requested_at: start,
                alternatives: Vec::new(),
                party_size: 2,
                source: None,
            },
        )
        .await
        .unwrap();

        (TokenStore::new(db.clone()), db, dir, entry.id)
    }

    #[tokio::test]
    async fn issue_returns_url_safe_raw_value() {
        let (store, db, _dir, entry_id) = setup().await;

        let (raw, token) = store
            .issue(entry_id, TokenPurpose::Registration, Duration::hours(2))
            .await
            .unwrap();

        // 32 random bytes -> 43 chars of unpadded URL-safe base64.
        assert_eq!(raw.len(), 43);
        assert!(raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        // Stored form is the hash, never the raw value.
        assert_ne!(token.token_hash, raw);
        assert_eq!(token.token_hash.len(), 64);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn resolve_returns_full_context() {
        let (store, db, _dir, entry_id) = setup().await;

        let (raw, token) = store
            .issue(entry_id, TokenPurpose::Confirmation, Duration::minutes(30))
            .await
            .unwrap();

        let ctx = store.resolve(&raw).await.unwrap();
        assert_eq!(ctx.token.id, token.id);
        assert_eq!(ctx.entry.id, entry_id);
        assert_eq!(ctx.slot.owner_id, "owner-1");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn unknown_raw_value_is_invalid() {
        let (store, db, _dir, _entry_id) = setup().await;
        let err = store.resolve("not-a-real-token").await.unwrap_err();
        assert!(matches!(err, SlotwatchError::InvalidToken));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn token_is_single_use() {
        let (store, db, _dir, entry_id) = setup().await;

        let (raw, token) = store
            .issue(entry_id, TokenPurpose::Registration, Duration::hours(2))
            .await
            .unwrap();

        store.consume(token.id).await.unwrap();

        // Second consume and any later resolve both fail.
        assert!(matches!(
            store.consume(token.id).await.unwrap_err(),
            SlotwatchError::InvalidToken
        ));
        assert!(matches!(
            store.resolve(&raw).await.unwrap_err(),
            SlotwatchError::InvalidToken
        ));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn expired_token_does_not_resolve() {
        let (store, db, _dir, entry_id) = setup().await;

        // Issued already expired: simulates presenting a 2-hour token after
        // 3 hours without sleeping in the test.
        let (raw, _token) = store
            .issue(entry_id, TokenPurpose::Registration, Duration::hours(-1))
            .await
            .unwrap();

        assert!(matches!(
            store.resolve(&raw).await.unwrap_err(),
            SlotwatchError::InvalidToken
        ));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn two_issues_never_collide() {
        let (store, db, _dir, entry_id) = setup().await;

        let (raw_a, _) = store
            .issue(entry_id, TokenPurpose::Registration, Duration::hours(2))
            .await
            .unwrap();
        let (raw_b, _) = store
            .issue(entry_id, TokenPurpose::Registration, Duration::hours(2))
            .await
            .unwrap();
        assert_ne!(raw_a, raw_b);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn sweep_removes_expired_tokens() {
        let (store, db, _dir, entry_id) = setup().await;

        store
            .issue(entry_id, TokenPurpose::Registration, Duration::hours(-1))
            .await
            .unwrap();
        let (live_raw, _) = store
            .issue(entry_id, TokenPurpose::Registration, Duration::hours(2))
            .await
            .unwrap();

        assert_eq!(store.sweep_expired().await.unwrap(), 1);
        assert!(store.resolve(&live_raw).await.is_ok());

        db.close().await.unwrap();
    }
}
