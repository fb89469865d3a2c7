// SPDX-License-Identifier: AGPL-3.0-only
// SPDX-FileCopyrightText: 2025 Steve Clarke <stephenlclarke@mac.com> - https://xyzzy.tools

//! Component inlining: turns a raw (catalog) header, trailer, message or
//! group node into an `ExpandedScope`, where every `<component>`
//! reference has been flattened in place and every field/group/message
//! child carries a resolved `id` reachable through `nodmap`.
//!
//! The walk is driven by an explicit frame stack rather than recursing
//! directly over the source tree, so that a `<component>` reference can
//! transparently splice its referent's children into the walk without the
//! caller needing to know it happened, stepping through a message body
//! one field at a time regardless of how many components it is nested
//! inside.

use super::catalog::SpecCatalog;
use super::errors::FixSpecError;
use super::schema::{NodeKind, SchemaNode};

struct Frame<'a> {
    node: &'a SchemaNode,
    idx: usize,
}

pub struct SpecExpander;

impl SpecExpander {
    /// Expand `src` (a header, trailer, message or group node straight
    /// from the catalog) into an `ExpandedScope`: components inlined,
    /// groups kept as boundaries (expanded recursively, not flattened),
    /// `nodmap` populated.
    pub fn expand_scope(src: &SchemaNode, catalog: &SpecCatalog) -> Result<SchemaNode, FixSpecError> {
        let mut out = SchemaNode::new(&src.elt, src.attrs.clone());
        out.kind = src.kind;
        out.expanded = true;

        let mut stack = vec![Frame { node: src, idx: 0 }];

        while let Some(child) = next_field(&mut stack, catalog)? {
            let expanded_child = if child.kind == NodeKind::Group {
                Self::expand_scope(child, catalog)?
            } else {
                child.deep_copy()
            };
            append_child(&mut out, expanded_child)?;
        }

        Ok(out)
    }

    /// Appends a `<value>` child, deep-copied from the global field
    /// dictionary, under every field in `scope` for display purposes.
    /// Decoding itself never needs this: `MessageValidator` resolves enum
    /// descriptions straight from the catalog.
    pub fn inline_enums(scope: &mut SchemaNode, catalog: &SpecCatalog) {
        for child in &mut scope.children {
            match child.kind {
                NodeKind::Field => {
                    let tag = child.attr("id").and_then(|s| s.parse::<u32>().ok());
                    if let Some(def) = tag.and_then(|t| catalog.fields_by_tag.get(&t)) {
                        for value in &def.children {
                            if value.kind == NodeKind::Value {
                                child.children.push(value.deep_copy());
                            }
                        }
                    }
                }
                NodeKind::Group => Self::inline_enums(child, catalog),
                _ => {}
            }
        }
    }
}

fn next_field<'a>(
    stack: &mut Vec<Frame<'a>>,
    catalog: &'a SpecCatalog,
) -> Result<Option<&'a SchemaNode>, FixSpecError> {
    loop {
        let Some(frame) = stack.last_mut() else {
            return Ok(None);
        };
        if frame.idx >= frame.node.children.len() {
            stack.pop();
            if stack.is_empty() {
                return Ok(None);
            }
            continue;
        }
        let child = &frame.node.children[frame.idx];
        frame.idx += 1;

        if child.kind == NodeKind::Component {
            let name = child.attr("name").unwrap_or_default();
            let component = catalog
                .components
                .get(name)
                .ok_or_else(|| FixSpecError::SchemaLoad(format!("unknown component referenced: {name}")))?;
            stack.push(Frame {
                node: component.as_ref(),
                idx: 0,
            });
            continue;
        }

        return Ok(Some(child));
    }
}

fn append_child(out: &mut SchemaNode, mut child: SchemaNode) -> Result<(), FixSpecError> {
    let id = match child.kind {
        // A group's own `id` (its repeat-count field's tag) was already
        // stamped by `SchemaIndexer`, the same way a plain field usage
        // is: both are resolved from a `name` attribute against the
        // global field dictionary. The tag of the group's *first child*
        // is a different thing entirely — it marks the boundary between
        // repeat entries once already inside the group (see
        // `MessageValidator::trace`), not the group's own identity.
        NodeKind::Field | NodeKind::Group => child
            .attr("id")
            .map(str::to_string)
            .ok_or_else(|| FixSpecError::SchemaLoad("field or group usage missing id (catalog not indexed)".into()))?,
        NodeKind::Message => {
            let msgtype = child.attr("msgtype").unwrap_or_default().to_string();
            child.attrs.insert("id".to_string(), msgtype.clone());
            msgtype
        }
        other => {
            return Err(FixSpecError::SchemaLoad(format!(
                "unexpected node kind {other:?} in expanded scope"
            )));
        }
    };

    let idx = out.children.len();
    out.nodmap.insert(id, idx);
    out.children.push(child);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::catalog::SpecCatalog;
    use crate::decoder::schema::SchemaLoader;

    const SCHEMA: &str = r#"
        <fix type="FIX" major="4" minor="4">
          <header>
            <field name="BeginString" required="Y"/>
            <field name="MsgType" required="Y"/>
          </header>
          <trailer>
            <field name="CheckSum" required="Y"/>
          </trailer>
          <messages>
            <message name="NewOrderSingle" msgtype="D">
              <field name="ClOrdID" required="Y"/>
              <component name="Instrument" required="Y"/>
              <group name="NoPartyIDs" required="N">
                <field name="PartyID" required="Y"/>
                <field name="PartyRole" required="N"/>
              </group>
            </message>
          </messages>
          <components>
            <component name="Instrument">
              <field name="Symbol" required="Y"/>
              <field name="SecurityID" required="N"/>
            </component>
          </components>
          <fields>
            <field number="8" name="BeginString" type="STRING"/>
            <field number="35" name="MsgType" type="STRING"/>
            <field number="10" name="CheckSum" type="STRING"/>
            <field number="11" name="ClOrdID" type="STRING"/>
            <field number="55" name="Symbol" type="STRING"/>
            <field number="48" name="SecurityID" type="STRING"/>
            <field number="453" name="NoPartyIDs" type="NUMINGROUP"/>
            <field number="448" name="PartyID" type="STRING"/>
            <field number="452" name="PartyRole" type="INT"/>
          </fields>
        </fix>
    "#;

    #[test]
    fn inlines_component_fields_in_place() {
        let root = SchemaLoader::load_str(SCHEMA).unwrap();
        let catalog = SpecCatalog::build(root).unwrap();
        let message = catalog.messages.get("D").unwrap();
        let scope = SpecExpander::expand_scope(message, &catalog).unwrap();

        let ids: Vec<&str> = scope.children.iter().filter_map(|c| c.id()).collect();
        assert_eq!(ids, vec!["11", "55", "48", "453"]);
        assert!(scope.nodmap.contains_key("55"));
    }

    #[test]
    fn group_id_is_its_own_counter_field_tag() {
        let root = SchemaLoader::load_str(SCHEMA).unwrap();
        let catalog = SpecCatalog::build(root).unwrap();
        let message = catalog.messages.get("D").unwrap();
        let scope = SpecExpander::expand_scope(message, &catalog).unwrap();

        // The group is keyed in the parent scope's nodmap by its own
        // counter field (NoPartyIDs = 453, the tag that actually shows up
        // on the wire to announce the group), not by its first entry
        // field's tag.
        let group = scope.lookup("453").unwrap();
        assert_eq!(group.kind, NodeKind::Group);
        assert_eq!(group.attr("id"), Some("453"));
        // The first entry field's tag (PartyID = 448) is kept too: it is
        // how `MessageValidator::trace` recognises the start of each new
        // repeat once already inside the group.
        assert_eq!(group.children[0].attr("id"), Some("448"));
    }

    #[test]
    fn expansion_is_idempotent_on_the_source_tree() {
        let root = SchemaLoader::load_str(SCHEMA).unwrap();
        let catalog = SpecCatalog::build(root).unwrap();
        let message = catalog.messages.get("D").unwrap();
        let first = SpecExpander::expand_scope(message, &catalog).unwrap();
        let second = SpecExpander::expand_scope(message, &catalog).unwrap();
        assert_eq!(
            first.children.iter().filter_map(|c| c.id()).collect::<Vec<_>>(),
            second.children.iter().filter_map(|c| c.id()).collect::<Vec<_>>()
        );
    }
}
