// SPDX-FileCopyrightText: 2026 Slotwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock availability probe for deterministic testing.
//!
//! `MockProbe` implements `AvailabilityProbe` with per-owner scripted
//! results, enabling fast, CI-runnable tests without a calendar backend.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use slotwatch_core::types::Availability;
use slotwatch_core::{AvailabilityProbe, SlotwatchError};

/// One scripted probe outcome.
#[derive(Debug, Clone)]
pub enum ProbeScript {
    /// Report the window free or busy.
    Available(bool),
    /// Fail the call (network/auth error on the calendar side).
    Error(String),
}

/// A mock probe that pops pre-configured results from per-owner queues.
///
/// When an owner's queue is empty, the probe reports "busy" -- the safe
/// default, since a false "free" would trigger notifications.
pub struct MockProbe {
    scripts: Mutex<HashMap<String, VecDeque<ProbeScript>>>,
    calls: Mutex<HashMap<String, usize>>,
    unconfigured: StdMutex<HashSet<String>>,
}

impl MockProbe {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
            unconfigured: StdMutex::new(HashSet::new()),
        }
    }

    /// Queue a scripted outcome for an owner's next probe call.
    pub async fn push(&self, owner_id: &str, script: ProbeScript) {
        self.scripts
            .lock()
            .await
            .entry(owner_id.to_string())
            .or_default()
            .push_back(script);
    }

    /// Queue a sequence of free/busy outcomes for an owner.
    pub async fn script_availability(&self, owner_id: &str, outcomes: &[bool]) {
        for &free in outcomes {
            self.push(owner_id, ProbeScript::Available(free)).await;
        }
    }

    /// Treat this owner as having no configured probe.
    pub fn mark_unconfigured(&self, owner_id: &str) {
        self.unconfigured
            .lock()
            .expect("unconfigured set poisoned")
            .insert(owner_id.to_string());
    }

    /// How many probe calls this owner has received.
    pub async fn call_count(&self, owner_id: &str) -> usize {
        self.calls.lock().await.get(owner_id).copied().unwrap_or(0)
    }
}

impl Default for MockProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AvailabilityProbe for MockProbe {
    fn is_configured_for(&self, owner_id: &str) -> bool {
        !self
            .unconfigured
            .lock()
            .expect("unconfigured set poisoned")
            .contains(owner_id)
    }

    async fn check_availability(
        &self,
        owner_id: &str,
        _window_start: DateTime<Utc>,
        _window_end: DateTime<Utc>,
    ) -> Result<Availability, SlotwatchError> {
        *self
            .calls
            .lock()
            .await
            .entry(owner_id.to_string())
            .or_insert(0) += 1;

        let script = self
            .scripts
            .lock()
            .await
            .get_mut(owner_id)
            .and_then(|queue| queue.pop_front());

        match script {
            Some(ProbeScript::Available(free)) => Ok(Availability {
                is_available: free,
                conflicts: if free {
                    Vec::new()
                } else {
                    vec!["mock conflict".to_string()]
                },
            }),
            Some(ProbeScript::Error(message)) => Err(SlotwatchError::Probe {
                message,
                source: None,
            }),
            None => Ok(Availability {
                is_available: false,
                conflicts: Vec::new(),
            }),
        }
    }
}
