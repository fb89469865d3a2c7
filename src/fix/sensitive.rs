// SPDX-License-Identifier: AGPL-3.0-only
// SPDX-FileCopyrightText: 2025 Steve Clarke <stephenlclarke@mac.com> - https://xyzzy.tools

//! Tags considered sensitive enough to obfuscate in traced/logged output.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;

pub static SENSITIVE_TAG_NAMES: Lazy<BTreeMap<u32, &'static str>> = Lazy::new(|| {
    BTreeMap::from([
        (96, "RawData"),
        (553, "Username"),
        (554, "Password"),
        (925, "NewPassword"),
        (1, "Account"),
    ])
});
