// SPDX-License-Identifier: AGPL-3.0-only
// SPDX-FileCopyrightText: 2025 Steve Clarke <stephenlclarke@mac.com> - https://xyzzy.tools

pub mod catalog;
pub mod colours;
pub mod display;
pub mod errors;
pub mod expand;
pub mod generator;
pub mod layout;
pub mod scanner;
pub mod schema;
pub mod validator;
pub mod wire;

pub use catalog::SpecCatalog;
pub use colours::disable_colours;
pub use display::{render_expanded_spec, render_generated, render_message_trace};
pub use errors::FixSpecError;
pub use expand::SpecExpander;
pub use generator::MessageGenerator;
pub use scanner::{MessageTrace, decode_message, scan, trailer_tag_set};
pub use schema::{SchemaLoader, SchemaNode};
pub use validator::MessageValidator;
