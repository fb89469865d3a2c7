// SPDX-License-Identifier: AGPL-3.0-only
// SPDX-FileCopyrightText: 2025 Steve Clarke <stephenlclarke@mac.com> - https://xyzzy.tools
//
// Shared layout constants for FIX rendering.

/// Width used when printing tag numbers (right-aligned).
pub const TAG_WIDTH: usize = 4;
