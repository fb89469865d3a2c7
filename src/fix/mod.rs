// SPDX-License-Identifier: AGPL-3.0-only
// SPDX-FileCopyrightText: 2025 Steve Clarke <stephenlclarke@mac.com> - https://xyzzy.tools

pub mod obfuscator;
pub mod sensitive;

pub use obfuscator::Obfuscator;
pub use sensitive::SENSITIVE_TAG_NAMES;

pub fn create_obfuscator(enabled: bool) -> Obfuscator {
    Obfuscator::from_sensitive_tags(&SENSITIVE_TAG_NAMES, enabled)
}
