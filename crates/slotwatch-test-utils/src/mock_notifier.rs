// SPDX-FileCopyrightText: 2026 Slotwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock notifier for deterministic testing.
//!
//! Records every send so tests can assert on exactly-once delivery.

use async_trait::async_trait;
use tokio::sync::Mutex;

use slotwatch_core::types::{Entry, Slot};
use slotwatch_core::{Notifier, SlotwatchError};

/// A recorded outbound message.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub entry_id: i64,
    pub slot_id: i64,
    pub link: String,
}

/// A mock notifier that records sends instead of delivering them.
pub struct MockNotifier {
    join_messages: Mutex<Vec<SentMessage>>,
    availability_messages: Mutex<Vec<SentMessage>>,
    fail_sends: std::sync::atomic::AtomicBool,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self {
            join_messages: Mutex::new(Vec::new()),
            availability_messages: Mutex::new(Vec::new()),
            fail_sends: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Make every subsequent send fail with a notifier error.
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    /// All recorded join messages.
    pub async fn join_messages(&self) -> Vec<SentMessage> {
        self.join_messages.lock().await.clone()
    }

    /// All recorded availability messages.
    pub async fn availability_messages(&self) -> Vec<SentMessage> {
        self.availability_messages.lock().await.clone()
    }

    fn should_fail(&self) -> bool {
        self.fail_sends.load(std::sync::atomic::Ordering::SeqCst)
    }
}

impl Default for MockNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send_join_message(&self, entry: &Entry, link: &str) -> Result<(), SlotwatchError> {
        if self.should_fail() {
            return Err(SlotwatchError::Notifier {
                message: "mock transport failure".to_string(),
                source: None,
            });
        }
        self.join_messages.lock().await.push(SentMessage {
            entry_id: entry.id,
            slot_id: entry.slot_id,
            link: link.to_string(),
        });
        Ok(())
    }

    async fn send_availability_message(
        &self,
        entry: &Entry,
        slot: &Slot,
        link: &str,
    ) -> Result<(), SlotwatchError> {
        if self.should_fail() {
            return Err(SlotwatchError::Notifier {
                message: "mock transport failure".to_string(),
                source: None,
            });
        }
        self.availability_messages.lock().await.push(SentMessage {
            entry_id: entry.id,
            slot_id: slot.id,
            link: link.to_string(),
        });
        Ok(())
    }
}
