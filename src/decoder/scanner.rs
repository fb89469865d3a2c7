// SPDX-License-Identifier: AGPL-3.0-only
// SPDX-FileCopyrightText: 2025 Steve Clarke <stephenlclarke@mac.com> - https://xyzzy.tools

//! Locates and decodes embedded FIX messages inside arbitrary byte
//! streams. A buffer may carry log noise before, after, and between
//! messages; `scan` walks it looking for `"8=FIX"` preludes, attempts a
//! full decode at each candidate, and recovers from a false match by
//! stepping forward a fixed number of bytes rather than aborting the
//! whole scan.

use std::collections::HashSet;

use tracing::warn;

use super::catalog::SpecCatalog;
use super::errors::FixSpecError;
use super::expand::SpecExpander;
use super::generator::validate_framing;
use super::validator::{MessageValidator, ScopeTrace};
use super::wire::WireReader;

/// The three scopes of one fully decoded message.
pub struct MessageTrace {
    pub msgtype: String,
    pub header: ScopeTrace,
    pub body: ScopeTrace,
    pub trailer: ScopeTrace,
}

impl MessageTrace {
    pub fn is_clean(&self) -> bool {
        self.header.is_clean() && self.body.is_clean() && self.trailer.is_clean()
    }
}

/// Collect the set of tags that belong to the schema's trailer, so the
/// validator can recognise "the body/group is over" without a
/// version-specific hard-coded tag list.
pub fn trailer_tag_set(catalog: &SpecCatalog) -> Result<HashSet<String>, FixSpecError> {
    let trailer = SpecExpander::expand_scope(&catalog.trailer, catalog)?;
    Ok(trailer.nodmap.keys().cloned().collect())
}

/// Decode exactly one complete, framing-valid FIX message: header, body
/// (selected by the header's MsgType), then trailer.
pub fn decode_message(
    bytes: &[u8],
    catalog: &SpecCatalog,
    trailer_tags: &HashSet<String>,
) -> Result<MessageTrace, FixSpecError> {
    validate_framing(bytes, &catalog.prelude())?;

    let mut wire = WireReader::new(bytes);
    let validator = MessageValidator::new(catalog, trailer_tags);

    let header_scope = SpecExpander::expand_scope(&catalog.header, catalog)?;
    let header = validator.trace(&mut wire, &header_scope)?;

    let msgtype = wire
        .msgtype
        .clone()
        .ok_or_else(|| FixSpecError::WireParse("message has no MsgType (tag 35)".into()))?;
    let message = catalog
        .messages
        .get(&msgtype)
        .ok_or_else(|| FixSpecError::UnknownMessageType(msgtype.clone()))?;

    let body_scope = SpecExpander::expand_scope(message, catalog)?;
    let body = validator.trace(&mut wire, &body_scope)?;

    let trailer_scope = SpecExpander::expand_scope(&catalog.trailer, catalog)?;
    let trailer = validator.trace(&mut wire, &trailer_scope)?;

    Ok(MessageTrace {
        msgtype,
        header,
        body,
        trailer,
    })
}

/// On a failed framing attempt, the prelude search resumes this many
/// bytes past the candidate match. Matches the original `fixtr`'s stream
/// recovery step.
const RECOVERY_SKIP: usize = 5;

/// Scan `text` for embedded FIX messages, decoding each one found.
/// Framing failures are silently skipped past; they are not fatal to the
/// scan as a whole.
pub fn scan(text: &[u8], catalog: &SpecCatalog, trailer_tags: &HashSet<String>) -> Vec<MessageTrace> {
    let needle = b"8=FIX";
    let mut results = Vec::new();
    let mut pos = 0usize;

    while pos < text.len() {
        let Some(offset) = find_subslice(&text[pos..], needle) else {
            break;
        };
        let candidate_start = pos + offset;

        match candidate_length(&text[candidate_start..]) {
            Some(len) if candidate_start + len <= text.len() => {
                let candidate = &text[candidate_start..candidate_start + len];
                match decode_message(candidate, catalog, trailer_tags) {
                    Ok(trace) => {
                        results.push(trace);
                        pos = candidate_start + len;
                        continue;
                    }
                    Err(err) => {
                        warn!(%err, offset = candidate_start, "failed to decode candidate FIX message");
                    }
                }
            }
            _ => {}
        }

        pos = candidate_start + RECOVERY_SKIP;
    }

    results
}

/// Read `BeginString` and `BodyLength` off the front of `candidate` to
/// work out the total byte length of the message (header + body +
/// 7-byte trailer), without yet checking the checksum.
fn candidate_length(candidate: &[u8]) -> Option<usize> {
    let mut wire = WireReader::new(candidate);
    if wire.advance().ok()? == 0 || wire.tag != "8" {
        return None;
    }
    if wire.advance().ok()? == 0 || wire.tag != "9" {
        return None;
    }
    let body_len: usize = wire.value.trim().parse().ok()?;
    Some(wire.position() + body_len + 7)
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::schema::SchemaLoader;

    const SCHEMA: &str = r#"
        <fix type="FIX" major="4" minor="4">
          <header>
            <field name="BeginString" required="Y"/>
            <field name="BodyLength" required="Y"/>
            <field name="MsgType" required="Y"/>
          </header>
          <trailer>
            <field name="CheckSum" required="Y"/>
          </trailer>
          <messages>
            <message name="Heartbeat" msgtype="0">
              <field name="TestReqID" required="N"/>
            </message>
          </messages>
          <components/>
          <fields>
            <field number="8" name="BeginString" type="STRING"/>
            <field number="9" name="BodyLength" type="LENGTH"/>
            <field number="35" name="MsgType" type="STRING"/>
            <field number="10" name="CheckSum" type="STRING"/>
            <field number="112" name="TestReqID" type="STRING"/>
          </fields>
        </fix>
    "#;

    fn catalog() -> SpecCatalog {
        let root = SchemaLoader::load_str(SCHEMA).unwrap();
        SpecCatalog::build(root).unwrap()
    }

    fn wrap(body: &str) -> Vec<u8> {
        let soh = '\u{1}';
        let head = format!("8=FIX.4.4{soh}9={}{soh}", body.len());
        let prefix = format!("{head}{body}");
        let checksum = super::super::generator::checksum(prefix.as_bytes());
        format!("{prefix}10={checksum:03}{soh}").into_bytes()
    }

    #[test]
    fn locates_a_single_message_inside_surrounding_noise() {
        let catalog = catalog();
        let trailer_tags = trailer_tag_set(&catalog).unwrap();
        let msg = wrap("35=0");
        let mut text = b"prefix junk ".to_vec();
        text.extend_from_slice(&msg);
        text.extend_from_slice(b" suffix noise");

        let traces = scan(&text, &catalog, &trailer_tags);
        assert_eq!(traces.len(), 1);
        assert_eq!(traces[0].msgtype, "0");
        assert!(traces[0].is_clean());
    }

    #[test]
    fn bad_checksum_is_skipped_without_halting_the_scan() {
        let catalog = catalog();
        let trailer_tags = trailer_tag_set(&catalog).unwrap();
        let mut bad = wrap("35=0");
        let len = bad.len();
        bad[len - 4] = b'9';
        bad[len - 3] = b'9';
        bad[len - 2] = b'9';

        let mut good = wrap("35=0");
        let mut text = bad.clone();
        text.extend_from_slice(&good);
        let traces = scan(&text, &catalog, &trailer_tags);
        assert_eq!(traces.len(), 1);
        let _ = good.pop();
    }

    #[test]
    fn two_embedded_messages_both_decode() {
        let catalog = catalog();
        let trailer_tags = trailer_tag_set(&catalog).unwrap();
        let mut text = wrap("35=0");
        text.extend_from_slice(&wrap("35=0\u{1}112=ping"));
        let traces = scan(&text, &catalog, &trailer_tags);
        assert_eq!(traces.len(), 2);
    }
}
