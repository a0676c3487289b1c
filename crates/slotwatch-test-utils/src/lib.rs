// SPDX-FileCopyrightText: 2026 Slotwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for the Slotwatch workspace: mock collaborators and a
//! full-stack test harness over a temp database.

pub mod harness;
pub mod mock_notifier;
pub mod mock_probe;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_notifier::{MockNotifier, SentMessage};
pub use mock_probe::{MockProbe, ProbeScript};
