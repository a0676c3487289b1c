// SPDX-FileCopyrightText: 2026 Slotwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Entry queue: joins, queue ordering, token-gated confirmations, stats.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use slotwatch_config::WaitlistConfig;
use slotwatch_core::types::{Customer, Entry, OwnerStats, TokenPurpose};
use slotwatch_core::{Notifier, SlotwatchError};
use slotwatch_storage::queries::entries;
pub use slotwatch_storage::queries::entries::EntryDetails;
use slotwatch_storage::Database;
use tracing::{info, warn};

use crate::link::confirmation_link;
use crate::registry::SlotRegistry;
use crate::tokens::TokenStore;

/// A customer's request to join a slot's wait queue.
#[derive(Debug, Clone)]
pub struct JoinRequest {
    pub owner_id: String,
    pub customer: Customer,
    pub requested_at: DateTime<Utc>,
    pub alternatives: Vec<DateTime<Utc>>,
    pub party_size: i64,
    pub source: Option<String>,
    /// Free-text slot label, used only when the join creates the slot.
    pub label: Option<String>,
}

/// What a successful join produced.
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    pub slot: slotwatch_core::types::Slot,
    pub entry: Entry,
    /// Registration link embedding the raw token; also sent to the customer.
    pub registration_link: String,
}

/// Ordering logic and CRUD over customers waiting for slots.
#[derive(Clone)]
pub struct EntryQueue {
    db: Database,
    registry: SlotRegistry,
    tokens: TokenStore,
    notifier: Arc<dyn Notifier>,
    waitlist: WaitlistConfig,
}

impl EntryQueue {
    pub fn new(
        db: Database,
        registry: SlotRegistry,
        tokens: TokenStore,
        notifier: Arc<dyn Notifier>,
        waitlist: WaitlistConfig,
    ) -> Self {
        Self {
            db,
            registry,
            tokens,
            notifier,
            waitlist,
        }
    }

    /// Join a slot's wait queue.
    ///
    /// Finds or creates the slot (owner + time, windowed match), appends the
    /// entry at the back of the queue, issues a registration token, and
    /// sends the join message. The same customer may join the same slot
    /// more than once; each join is an independent entry.
    ///
    /// Notification failure is logged and does not fail the join: the entry
    /// and its token already exist and the link can be re-sent out-of-band.
    pub async fn join(&self, request: JoinRequest) -> Result<JoinOutcome, SlotwatchError> {
        if request.customer.phone.trim().is_empty() {
            return Err(SlotwatchError::Validation(
                "customer phone is required".to_string(),
            ));
        }
        if request.party_size < 1 {
            return Err(SlotwatchError::Validation(format!(
                "party size must be at least 1, got {}",
                request.party_size
            )));
        }

        let slot = self
            .registry
            .find_or_create(&request.owner_id, request.requested_at, request.label.clone())
            .await?;

        let entry = entries::insert_pending(
            &self.db,
            entries::NewEntry {
                slot_id: slot.id,
                owner_id: request.owner_id.clone(),
                customer: request.customer.clone(),
                requested_at: request.requested_at,
                alternatives: request.alternatives.clone(),
                party_size: request.party_size,
                source: request.source.clone(),
            },
        )
        .await?;

        let (raw, _token) = self
            .tokens
            .issue(
                entry.id,
                TokenPurpose::Registration,
                Duration::minutes(self.waitlist.registration_token_ttl_minutes),
            )
            .await?;
        let link = confirmation_link(&self.waitlist.frontend_base_url, &raw);

        if let Err(e) = self.notifier.send_join_message(&entry, &link).await {
            warn!(entry_id = entry.id, error = %e, "join notification failed");
        }

        info!(
            entry_id = entry.id,
            slot_id = slot.id,
            priority = entry.priority,
            "entry joined waitlist"
        );
        Ok(JoinOutcome {
            slot,
            entry,
            registration_link: link,
        })
    }

    /// The lowest-priority pending entry for a slot, if any.
    pub async fn next_claimant(&self, slot_id: i64) -> Result<Option<Entry>, SlotwatchError> {
        entries::next_claimant(&self.db, slot_id).await
    }

    /// Complete registration via the token from the join message.
    ///
    /// Updates contact/preference details, consumes the token, and returns
    /// the refreshed entry. The entry stays pending: registration is about
    /// details, not about claiming a freed slot.
    pub async fn confirm_registration(
        &self,
        raw_token: &str,
        details: EntryDetails,
    ) -> Result<Entry, SlotwatchError> {
        let ctx = self.tokens.resolve(raw_token).await?;
        if ctx.token.purpose != TokenPurpose::Registration {
            return Err(SlotwatchError::InvalidToken);
        }

        entries::update_details(&self.db, ctx.entry.id, details).await?;
        self.tokens.consume(ctx.token.id).await?;

        entries::get(&self.db, ctx.entry.id)
            .await?
            .ok_or(SlotwatchError::NotFound {
                entity: "entry",
                key: ctx.entry.id.to_string(),
            })
    }

    /// Claim a freed slot via the token from the availability message.
    ///
    /// The entry transitions to `confirmed`; the token is consumed only
    /// after the transition sticks, so a lost write never burns the link.
    pub async fn confirm_slot(&self, raw_token: &str) -> Result<Entry, SlotwatchError> {
        let ctx = self.tokens.resolve(raw_token).await?;
        if ctx.token.purpose != TokenPurpose::Confirmation {
            return Err(SlotwatchError::InvalidToken);
        }

        if !entries::mark_confirmed(&self.db, ctx.entry.id).await? {
            // Entry already expired or cancelled out from under the link.
            return Err(SlotwatchError::Validation(format!(
                "entry {} can no longer be confirmed",
                ctx.entry.id
            )));
        }
        self.tokens.consume(ctx.token.id).await?;

        info!(entry_id = ctx.entry.id, slot_id = ctx.slot.id, "entry confirmed");
        entries::get(&self.db, ctx.entry.id)
            .await?
            .ok_or(SlotwatchError::NotFound {
                entity: "entry",
                key: ctx.entry.id.to_string(),
            })
    }

    /// Cancel an entry. Idempotent: cancelling twice is not an error.
    pub async fn cancel(&self, entry_id: i64) -> Result<(), SlotwatchError> {
        if entries::get(&self.db, entry_id).await?.is_none() {
            return Err(SlotwatchError::NotFound {
                entity: "entry",
                key: entry_id.to_string(),
            });
        }
        if entries::mark_cancelled(&self.db, entry_id).await? {
            info!(entry_id, "entry cancelled");
        }
        Ok(())
    }

    /// Expire an entry. Idempotent, same shape as [`cancel`](Self::cancel).
    pub async fn mark_expired(&self, entry_id: i64) -> Result<(), SlotwatchError> {
        if entries::get(&self.db, entry_id).await?.is_none() {
            return Err(SlotwatchError::NotFound {
                entity: "entry",
                key: entry_id.to_string(),
            });
        }
        entries::mark_expired(&self.db, entry_id).await?;
        Ok(())
    }

    /// All entries for an owner, newest first.
    pub async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Entry>, SlotwatchError> {
        entries::list_by_owner(&self.db, owner_id).await
    }

    /// A slot's entries in queue order.
    pub async fn list_by_slot(&self, slot_id: i64) -> Result<Vec<Entry>, SlotwatchError> {
        entries::list_by_slot(&self.db, slot_id).await
    }

    /// Aggregate counts for an owner's dashboard.
    pub async fn stats(&self, owner_id: &str) -> Result<OwnerStats, SlotwatchError> {
        entries::owner_stats(&self.db, owner_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use slotwatch_config::PollingConfig;
    use slotwatch_core::types::{EntryStatus, Slot};
    use tempfile::tempdir;
    use tokio::sync::Mutex;

    /// Minimal recording notifier; the full mock lives in slotwatch-test-utils.
    #[derive(Default)]
    struct RecordingNotifier {
        join_links: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send_join_message(
            &self,
            _entry: &Entry,
            link: &str,
        ) -> Result<(), SlotwatchError> {
            if self.fail {
                return Err(SlotwatchError::Notifier {
                    message: "transport down".to_string(),
                    source: None,
                });
            }
            self.join_links.lock().await.push(link.to_string());
            Ok(())
        }

        async fn send_availability_message(
            &self,
            _entry: &Entry,
            _slot: &Slot,
            _link: &str,
        ) -> Result<(), SlotwatchError> {
            Ok(())
        }
    }

    struct Fixture {
        queue: EntryQueue,
        db: Database,
        notifier: Arc<RecordingNotifier>,
        _dir: tempfile::TempDir,
    }

    async fn setup(failing_notifier: bool) -> Fixture {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("queue_test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

        let notifier = Arc::new(RecordingNotifier {
            fail: failing_notifier,
            ..RecordingNotifier::default()
        });
        let registry = SlotRegistry::new(
            db.clone(),
            PollingConfig::default(),
            WaitlistConfig::default(),
        );
        let queue = EntryQueue::new(
            db.clone(),
            registry,
            TokenStore::new(db.clone()),
            notifier.clone(),
            WaitlistConfig::default(),
        );
        Fixture {
            queue,
            db,
            notifier,
            _dir: dir,
        }
    }

    fn join_request(owner: &str, name: &str, start: DateTime<Utc>) -> JoinRequest {
        JoinRequest {
            owner_id: owner.to_string(),
            customer: Customer {
                name: name.to_string(),
                phone: "+15550100".to_string(),
                email: None,
            },
            requested_at: start,
            alternatives: Vec::new(),
            party_size: 2,
            source: Some("web".to_string()),
            label: None,
        }
    }

    #[tokio::test]
    async fn join_creates_slot_entry_and_sends_link() {
        let f = setup(false).await;
        let start = Utc::now() + Duration::hours(5);

        let outcome = f.queue.join(join_request("owner-1", "Alice", start)).await.unwrap();
        assert_eq!(outcome.entry.priority, 1);
        assert_eq!(outcome.entry.status, EntryStatus::Pending);
        assert!(outcome
            .registration_link
            .starts_with("http://localhost:3000/waitlist/"));

        let sent = f.notifier.join_links.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0], outcome.registration_link);
        drop(sent);

        f.db.close().await.unwrap();
    }

    #[tokio::test]
    async fn join_without_phone_is_rejected() {
        let f = setup(false).await;
        let start = Utc::now() + Duration::hours(5);

        let mut request = join_request("owner-1", "Alice", start);
        request.customer.phone = "  ".to_string();

        let err = f.queue.join(request).await.unwrap_err();
        assert!(matches!(err, SlotwatchError::Validation(_)));
        // Nothing was created.
        assert_eq!(f.queue.stats("owner-1").await.unwrap().total_entries, 0);

        f.db.close().await.unwrap();
    }

    #[tokio::test]
    async fn join_survives_notifier_failure() {
        let f = setup(true).await;
        let start = Utc::now() + Duration::hours(5);

        let outcome = f.queue.join(join_request("owner-1", "Alice", start)).await.unwrap();
        assert_eq!(outcome.entry.status, EntryStatus::Pending);

        f.db.close().await.unwrap();
    }

    #[tokio::test]
    async fn same_customer_may_join_twice() {
        let f = setup(false).await;
        let start = Utc::now() + Duration::hours(5);

        let first = f.queue.join(join_request("owner-1", "Alice", start)).await.unwrap();
        let second = f.queue.join(join_request("owner-1", "Alice", start)).await.unwrap();

        // Same slot, two independent entries.
        assert_eq!(first.slot.id, second.slot.id);
        assert_ne!(first.entry.id, second.entry.id);
        assert_eq!(second.entry.priority, 2);

        f.db.close().await.unwrap();
    }

    #[tokio::test]
    async fn confirm_registration_updates_details_and_burns_token() {
        let f = setup(false).await;
        let start = Utc::now() + Duration::hours(5);
        let outcome = f.queue.join(join_request("owner-1", "Alice", start)).await.unwrap();

        let raw = outcome
            .registration_link
            .rsplit('/')
            .next()
            .unwrap()
            .to_string();

        let entry = f
            .queue
            .confirm_registration(
                &raw,
                EntryDetails {
                    customer_email: Some("alice@example.com".to_string()),
                    party_size: Some(4),
                    ..EntryDetails::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(entry.customer_email.as_deref(), Some("alice@example.com"));
        assert_eq!(entry.party_size, 4);
        // Registration does not confirm the claim.
        assert_eq!(entry.status, EntryStatus::Pending);

        // Token is single-use.
        let err = f
            .queue
            .confirm_registration(&raw, EntryDetails::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SlotwatchError::InvalidToken));

        f.db.close().await.unwrap();
    }

    #[tokio::test]
    async fn confirm_registration_rejects_wrong_purpose() {
        let f = setup(false).await;
        let start = Utc::now() + Duration::hours(5);
        let outcome = f.queue.join(join_request("owner-1", "Alice", start)).await.unwrap();

        let tokens = TokenStore::new(f.db.clone());
        let (raw, _) = tokens
            .issue(
                outcome.entry.id,
                TokenPurpose::Confirmation,
                Duration::minutes(30),
            )
            .await
            .unwrap();

        let err = f
            .queue
            .confirm_registration(&raw, EntryDetails::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SlotwatchError::InvalidToken));

        f.db.close().await.unwrap();
    }

    #[tokio::test]
    async fn confirm_slot_transitions_entry() {
        let f = setup(false).await;
        let start = Utc::now() + Duration::hours(5);
        let outcome = f.queue.join(join_request("owner-1", "Alice", start)).await.unwrap();

        let tokens = TokenStore::new(f.db.clone());
        let (raw, _) = tokens
            .issue(
                outcome.entry.id,
                TokenPurpose::Confirmation,
                Duration::minutes(30),
            )
            .await
            .unwrap();

        let entry = f.queue.confirm_slot(&raw).await.unwrap();
        assert_eq!(entry.status, EntryStatus::Confirmed);

        // Replays fail: the token was consumed.
        assert!(matches!(
            f.queue.confirm_slot(&raw).await.unwrap_err(),
            SlotwatchError::InvalidToken
        ));

        f.db.close().await.unwrap();
    }

    #[tokio::test]
    async fn cancel_is_idempotent_and_checks_existence() {
        let f = setup(false).await;
        let start = Utc::now() + Duration::hours(5);
        let outcome = f.queue.join(join_request("owner-1", "Alice", start)).await.unwrap();

        f.queue.cancel(outcome.entry.id).await.unwrap();
        f.queue.cancel(outcome.entry.id).await.unwrap();

        assert!(matches!(
            f.queue.cancel(99_999).await.unwrap_err(),
            SlotwatchError::NotFound { .. }
        ));

        f.db.close().await.unwrap();
    }

    #[tokio::test]
    async fn stats_reflect_queue_activity() {
        let f = setup(false).await;
        let start = Utc::now() + Duration::hours(5);

        f.queue.join(join_request("owner-1", "Alice", start)).await.unwrap();
        let b = f.queue.join(join_request("owner-1", "Bob", start)).await.unwrap();
        f.queue.cancel(b.entry.id).await.unwrap();

        let stats = f.queue.stats("owner-1").await.unwrap();
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.pending_entries, 1);
        assert_eq!(stats.confirmed_entries, 0);
        assert_eq!(stats.active_slots, 1);

        f.db.close().await.unwrap();
    }
}
