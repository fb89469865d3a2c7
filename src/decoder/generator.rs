// SPDX-License-Identifier: AGPL-3.0-only
// SPDX-FileCopyrightText: 2025 Steve Clarke <stephenlclarke@mac.com> - https://xyzzy.tools

//! Assembles a well-formed FIX message from a catalog message definition
//! and a bag of field values, and checks a received message's framing.
//!
//! Generation walks the *catalog's* raw message/component tree, not an
//! `ExpandedScope`: repeating groups are never driven by the generator,
//! matching the limitation of the system this crate's algorithms are
//! grounded on (see DESIGN.md, Open Questions).

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;

use super::catalog::SpecCatalog;
use super::errors::FixSpecError;
use super::schema::NodeKind;

const SOH: char = '\u{0001}';

pub fn checksum(bytes: &[u8]) -> u32 {
    bytes.iter().map(|&b| b as u32).sum::<u32>() % 256
}

/// Check a complete wire message's framing: the `BeginString` prelude,
/// the mandatory SOH right after it, and a trailing `CheckSum` that
/// actually matches the byte sum of everything before it.
pub fn validate_framing(buf: &[u8], prelude: &str) -> Result<(), FixSpecError> {
    let begin = format!("8={prelude}");
    if !buf.starts_with(begin.as_bytes()) {
        return Err(FixSpecError::Framing(format!(
            "does not start with {begin:?}"
        )));
    }
    let begin_with_soh = format!("{begin}\u{0001}");
    if !buf.starts_with(begin_with_soh.as_bytes()) {
        return Err(FixSpecError::Framing("BeginString is not terminated by SOH".into()));
    }
    if buf.len() < 7 {
        return Err(FixSpecError::Framing("message too short to hold a trailer".into()));
    }
    let expected = format!("10={:03}\u{0001}", checksum(&buf[..buf.len() - 7]));
    if buf[buf.len() - 7..] != *expected.as_bytes() {
        return Err(FixSpecError::Framing(format!(
            "checksum mismatch, expected trailer {expected:?}"
        )));
    }
    Ok(())
}

/// Generates instance messages for a given schema. `MsgSeqNum` increments
/// across calls on the same generator, matching session behaviour; every
/// other header field is taken from the caller's attribute map or left
/// out if absent (except `SendingTime`, always stamped fresh in UTC).
pub struct MessageGenerator {
    catalog: Arc<SpecCatalog>,
    next_seq: u64,
}

impl MessageGenerator {
    pub fn new(catalog: Arc<SpecCatalog>) -> Self {
        Self {
            catalog,
            next_seq: 2000,
        }
    }

    pub fn generate(
        &mut self,
        msg_type: &str,
        body_fields: &HashMap<String, String>,
        sender_comp_id: &str,
        target_comp_id: &str,
    ) -> Result<String, FixSpecError> {
        let message = self
            .catalog
            .messages
            .get(msg_type)
            .ok_or_else(|| FixSpecError::UnknownMessageType(msg_type.to_string()))?;

        let mut body = String::new();
        self.write_spec(message, body_fields, &mut body)?;

        let seq = self.next_seq;
        self.next_seq += 1;

        // BeginString and BodyLength are deliberately absent from this map:
        // their values depend on (or are) the rest of the header plus the
        // body, so write_spec's "only emit a field present in the map"
        // behaviour skips them here and they are rendered explicitly below.
        let mut head_fields = HashMap::new();
        head_fields.insert("MsgType".to_string(), msg_type.to_string());
        head_fields.insert("SenderCompID".to_string(), sender_comp_id.to_string());
        head_fields.insert("TargetCompID".to_string(), target_comp_id.to_string());
        head_fields.insert("MsgSeqNum".to_string(), seq.to_string());
        head_fields.insert(
            "SendingTime".to_string(),
            Utc::now().format("%Y%m%d-%H:%M:%S").to_string(),
        );

        let mut head_rest = String::new();
        self.write_spec(&self.catalog.header, &head_fields, &mut head_rest)?;

        let content = format!("{head_rest}{body}");
        let prelude = self.catalog.prelude();
        let begin = format!("8={prelude}{SOH}9={}{SOH}", content.len());

        let head_and_body = format!("{begin}{content}");

        let mut foot_fields = HashMap::new();
        foot_fields.insert(
            "CheckSum".to_string(),
            format!("{:03}", checksum(head_and_body.as_bytes())),
        );
        let mut foot = String::new();
        self.write_spec(&self.catalog.trailer, &foot_fields, &mut foot)?;

        Ok(format!("{head_and_body}{foot}"))
    }

    /// Walks `spec`'s children in document order, recursing into
    /// `<component>` references directly against the catalog. A
    /// `<field>` is emitted only when the caller supplied a value for its
    /// name; `<group>` nodes are skipped (see module docs).
    fn write_spec(
        &self,
        spec: &super::schema::SchemaNode,
        values: &HashMap<String, String>,
        out: &mut String,
    ) -> Result<(), FixSpecError> {
        for child in &spec.children {
            match child.kind {
                NodeKind::Field => {
                    let name = child.attr("name").unwrap_or_default();
                    if let Some(value) = values.get(name) {
                        let tag = self
                            .catalog
                            .fields_by_name
                            .get(name)
                            .ok_or_else(|| FixSpecError::SchemaLoad(format!("unknown field name {name}")))?;
                        out.push_str(&tag.to_string());
                        out.push('=');
                        out.push_str(value);
                        out.push(SOH);
                    }
                }
                NodeKind::Component => {
                    let name = child.attr("name").unwrap_or_default();
                    let component = self
                        .catalog
                        .components
                        .get(name)
                        .ok_or_else(|| FixSpecError::SchemaLoad(format!("unknown component {name}")))?;
                    self.write_spec(component, values, out)?;
                }
                _ => {}
            }
        }
        Ok(())
    }
}
