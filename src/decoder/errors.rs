// SPDX-License-Identifier: AGPL-3.0-only
// SPDX-FileCopyrightText: 2025 Steve Clarke <stephenlclarke@mac.com> - https://xyzzy.tools

//! Error kinds for the schema-driven FIX codec.
//!
//! Per-field problems found while tracing a message (bad field, missing
//! field, repeated field) are never represented here: they are
//! accumulated as [`crate::decoder::validator::Diagnostic`] values
//! alongside a successful decode. Everything in this enum is fatal to
//! the operation that produced it.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FixSpecError {
    #[error("failed to load FIX schema: {0}")]
    SchemaLoad(String),

    #[error("I/O error loading FIX schema: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown message type: {0}")]
    UnknownMessageType(String),

    #[error("FIX framing error: {0}")]
    Framing(String),

    #[error("FIX wire parse error: {0}")]
    WireParse(String),
}
