// SPDX-FileCopyrightText: 2026 Slotwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Customer-facing link construction.
//!
//! `{frontend_base}/waitlist/{token}` is the one bit-exact contract with
//! the outside: the receiving page resolves the token via the token store.

/// Build the public link for a raw token.
pub fn confirmation_link(frontend_base: &str, raw_token: &str) -> String {
    format!("{}/waitlist/{raw_token}", frontend_base.trim_end_matches('/'))
}
