// SPDX-FileCopyrightText: 2026 Slotwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end waitlist testing.
//!
//! `TestHarness` assembles the full domain stack -- temp SQLite database,
//! registry, token store, entry queue -- wired to mock collaborators, so
//! tests can drive joins and checks without external services.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use slotwatch_config::{PollingConfig, SlotwatchConfig, WaitlistConfig};
use slotwatch_core::types::Customer;
use slotwatch_core::SlotwatchError;
use slotwatch_storage::Database;
use slotwatch_waitlist::{EntryQueue, JoinOutcome, JoinRequest, SlotRegistry, TokenStore};

use crate::mock_notifier::MockNotifier;
use crate::mock_probe::MockProbe;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: SlotwatchConfig,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            config: SlotwatchConfig::default(),
        }
    }

    /// Override the polling tiers (e.g. to shrink intervals in tests).
    pub fn with_polling(mut self, polling: PollingConfig) -> Self {
        self.config.polling = polling;
        self
    }

    /// Override the waitlist behavior settings.
    pub fn with_waitlist(mut self, waitlist: WaitlistConfig) -> Self {
        self.config.waitlist = waitlist;
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, SlotwatchError> {
        let temp_dir = tempfile::TempDir::new()
            .map_err(|e| SlotwatchError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");
        let db = Database::open(&db_path.to_string_lossy()).await?;

        let probe = Arc::new(MockProbe::new());
        let notifier = Arc::new(MockNotifier::new());

        let registry = SlotRegistry::new(
            db.clone(),
            self.config.polling.clone(),
            self.config.waitlist.clone(),
        );
        let tokens = TokenStore::new(db.clone());
        let queue = EntryQueue::new(
            db.clone(),
            registry.clone(),
            tokens.clone(),
            notifier.clone(),
            self.config.waitlist.clone(),
        );

        Ok(TestHarness {
            db,
            registry,
            tokens,
            queue,
            probe,
            notifier,
            config: self.config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete waitlist stack over a temp database and mock collaborators.
pub struct TestHarness {
    pub db: Database,
    pub registry: SlotRegistry,
    pub tokens: TokenStore,
    pub queue: EntryQueue,
    pub probe: Arc<MockProbe>,
    pub notifier: Arc<MockNotifier>,
    pub config: SlotwatchConfig,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Start building a harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Join with sensible defaults: one named customer, party of two.
    pub async fn join_customer(
        &self,
        owner_id: &str,
        name: &str,
        requested_at: DateTime<Utc>,
    ) -> Result<JoinOutcome, SlotwatchError> {
        self.queue
            .join(JoinRequest {
                owner_id: owner_id.to_string(),
                customer: Customer {
                    name: name.to_string(),
                    phone: format!("+1555{:04}", name.len()),
                    email: None,
                },
                requested_at,
                alternatives: Vec::new(),
                party_size: 2,
                source: Some("test".to_string()),
                label: None,
            })
            .await
    }

    /// A start time a few hours out, in the near polling tier.
    pub fn near_start(&self) -> DateTime<Utc> {
        Utc::now() + Duration::hours(3)
    }
}
