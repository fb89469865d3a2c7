// SPDX-License-Identifier: AGPL-3.0-only
// SPDX-FileCopyrightText: 2025 Steve Clarke <stephenlclarke@mac.com> - https://xyzzy.tools

//! The generic attributed tree that every FIX schema document is parsed
//! into, and the SAX-style loader that builds one from XML.
//!
//! A [`SchemaNode`] is deliberately untyped beyond its [`NodeKind`] tag:
//! the same struct stands for a `<field>` definition in the catalog, a
//! `<field>` usage inside a message, a `<group>`, and a fully expanded
//! scope. Specialised views (the catalog, an expanded scope) are built by
//! walking and re-shaping this tree rather than by parsing into distinct
//! Rust types per element.

use std::collections::BTreeMap;
use std::collections::HashMap;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::errors::FixSpecError;

/// Tag of a [`SchemaNode`], recognised from the XML element name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Fix,
    Header,
    Trailer,
    Messages,
    Components,
    Fields,
    Message,
    Component,
    Group,
    Field,
    Value,
    /// Any element name not recognised above. Kept rather than rejected,
    /// so a schema with vendor extensions still loads.
    Other,
}

impl NodeKind {
    fn from_tag(tag: &str) -> Self {
        match tag {
            "fix" => NodeKind::Fix,
            "header" => NodeKind::Header,
            "trailer" => NodeKind::Trailer,
            "messages" => NodeKind::Messages,
            "components" => NodeKind::Components,
            "fields" => NodeKind::Fields,
            "message" => NodeKind::Message,
            "component" => NodeKind::Component,
            "group" => NodeKind::Group,
            "field" => NodeKind::Field,
            "value" => NodeKind::Value,
            _ => NodeKind::Other,
        }
    }
}

/// A node in the schema tree. `children` preserves document order;
/// `attrs` does not need to, so a `BTreeMap` keeps display deterministic.
#[derive(Debug, Clone)]
pub struct SchemaNode {
    pub kind: NodeKind,
    pub elt: String,
    pub attrs: BTreeMap<String, String>,
    pub children: Vec<SchemaNode>,
    /// Set once this node has gone through `SpecExpander::expand_scope`.
    pub expanded: bool,
    /// `id() -> child index`, populated only for expanded scopes.
    pub nodmap: HashMap<String, usize>,
}

impl SchemaNode {
    pub fn new(elt: &str, attrs: BTreeMap<String, String>) -> Self {
        Self {
            kind: NodeKind::from_tag(elt),
            elt: elt.to_string(),
            attrs,
            children: Vec::new(),
            expanded: false,
            nodmap: HashMap::new(),
        }
    }

    fn leaf(elt: &str) -> Self {
        Self::new(elt, BTreeMap::new())
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn is_field(&self) -> bool {
        self.kind == NodeKind::Field
    }

    pub fn is_group(&self) -> bool {
        self.kind == NodeKind::Group
    }

    pub fn is_message(&self) -> bool {
        self.kind == NodeKind::Message
    }

    pub fn is_component(&self) -> bool {
        self.kind == NodeKind::Component
    }

    pub fn is_value(&self) -> bool {
        self.kind == NodeKind::Value
    }

    pub fn is_required(&self) -> bool {
        self.attr("required") == Some("Y")
    }

    /// Resolve this node's identifier. Precedence: an explicit `id`
    /// attribute (stamped by `SchemaIndexer` or `SpecExpander`), else the
    /// message type for `<message>` nodes, else the enum code for
    /// `<value>` nodes, else the `name` attribute.
    pub fn id(&self) -> Option<&str> {
        if let Some(id) = self.attr("id") {
            return Some(id);
        }
        if self.is_message() {
            return self.attr("msgtype");
        }
        if self.is_value() {
            return self.attr("enum");
        }
        self.attr("name")
    }

    /// First direct child with the given element name.
    pub fn child(&self, elt: &str) -> Option<&SchemaNode> {
        self.children.iter().find(|c| c.elt == elt)
    }

    /// Find a direct child by id: the expanded-scope `nodmap` when
    /// present, otherwise a linear scan (catalog nodes are rarely large
    /// enough to need anything smarter, and `fields_by_tag`/
    /// `fields_by_name` cover the hot catalog lookups anyway).
    pub fn lookup(&self, id: &str) -> Option<&SchemaNode> {
        if let Some(&idx) = self.nodmap.get(id) {
            return self.children.get(idx);
        }
        self.children.iter().find(|c| c.id() == Some(id))
    }

    /// Depth-first search for a descendant (including self) carrying the
    /// given attribute value.
    pub fn depth_match(&self, attr: &str, value: &str) -> Option<&SchemaNode> {
        if self.attr(attr) == Some(value) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.depth_match(attr, value))
    }

    /// Deep copy that resets expansion state, mirroring the original's
    /// `XNode::copy()`: an expanded scope's `nodmap` is rebuilt by the
    /// expander, never carried over verbatim.
    pub fn deep_copy(&self) -> SchemaNode {
        SchemaNode {
            kind: self.kind,
            elt: self.elt.clone(),
            attrs: self.attrs.clone(),
            children: self.children.iter().map(SchemaNode::deep_copy).collect(),
            expanded: false,
            nodmap: HashMap::new(),
        }
    }

    /// Depth-first traversal: `pre`, `visit` (an early-exit negative
    /// return skips descending into children), `post`, then `descend`,
    /// each child in order, `ascend`.
    pub fn visit_mut<V: Visitor>(&mut self, visitor: &mut V) -> i32 {
        visitor.pre(self);
        let ret = visitor.visit(self);
        visitor.post(self);
        if ret < 0 || self.children.is_empty() {
            return ret;
        }
        visitor.descend(self);
        for child in &mut self.children {
            let ret = child.visit_mut(visitor);
            if ret < 0 {
                visitor.ascend(self);
                return ret;
            }
        }
        visitor.ascend(self);
        ret
    }
}

/// Visitor over a [`SchemaNode`] tree. Default methods are no-ops so a
/// visitor only needs to override the phases it cares about.
pub trait Visitor {
    fn pre(&mut self, _node: &SchemaNode) {}
    fn visit(&mut self, _node: &mut SchemaNode) -> i32 {
        0
    }
    fn descend(&mut self, _node: &SchemaNode) {}
    fn ascend(&mut self, _node: &SchemaNode) {}
    fn post(&mut self, _node: &SchemaNode) {}
}

/// SAX-style loader: walks XML start/empty/end events with an explicit
/// stack of open nodes, rather than building a DOM first.
pub struct SchemaLoader;

impl SchemaLoader {
    pub fn load_str(xml: &str) -> Result<SchemaNode, FixSpecError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<SchemaNode> = vec![SchemaNode::leaf("__root__")];
        let mut buf = Vec::new();

        loop {
            let event = reader
                .read_event_into(&mut buf)
                .map_err(|e| FixSpecError::SchemaLoad(format!("XML parse error: {e}")))?;
            match event {
                Event::Eof => break,
                Event::Start(start) => {
                    stack.push(Self::build_node(&start)?);
                }
                Event::Empty(start) => {
                    let node = Self::build_node(&start)?;
                    Self::attach(&mut stack, node);
                }
                Event::End(_) => {
                    let node = stack
                        .pop()
                        .ok_or_else(|| FixSpecError::SchemaLoad("unbalanced closing tag".into()))?;
                    Self::attach(&mut stack, node);
                }
                _ => {}
            }
            buf.clear();
        }

        let mut root = stack
            .pop()
            .ok_or_else(|| FixSpecError::SchemaLoad("empty schema document".into()))?;
        if root.children.is_empty() {
            return Err(FixSpecError::SchemaLoad("schema document has no root element".into()));
        }
        Ok(root.children.remove(0))
    }

    fn attach(stack: &mut [SchemaNode], node: SchemaNode) {
        if let Some(top) = stack.last_mut() {
            top.children.push(node);
        }
    }

    fn build_node(start: &BytesStart) -> Result<SchemaNode, FixSpecError> {
        let elt = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attrs = BTreeMap::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| FixSpecError::SchemaLoad(format!("bad attribute: {e}")))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| FixSpecError::SchemaLoad(format!("bad attribute value: {e}")))?
                .into_owned();
            attrs.insert(key, value);
        }
        Ok(SchemaNode::new(&elt, attrs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TINY_SCHEMA: &str = r#"
        <fix type="FIX" major="4" minor="4">
          <header>
            <field name="BeginString" required="Y"/>
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
            <field number="35" name="MsgType" type="STRING"/>
            <field number="112" name="TestReqID" type="STRING"/>
            <field number="10" name="CheckSum" type="STRING"/>
          </fields>
        </fix>
    "#;

    #[test]
    fn loads_root_element_with_attributes() {
        let root = SchemaLoader::load_str(TINY_SCHEMA).unwrap();
        assert_eq!(root.kind, NodeKind::Fix);
        assert_eq!(root.attr("major"), Some("4"));
        assert_eq!(root.attr("minor"), Some("4"));
    }

    #[test]
    fn preserves_document_order_and_nesting() {
        let root = SchemaLoader::load_str(TINY_SCHEMA).unwrap();
        let messages = root.child("messages").unwrap();
        let heartbeat = messages.child("message").unwrap();
        assert_eq!(heartbeat.attr("msgtype"), Some("0"));
        assert_eq!(heartbeat.children.len(), 1);
        assert_eq!(heartbeat.children[0].attr("name"), Some("TestReqID"));
    }

    #[test]
    fn rejects_empty_document() {
        let err = SchemaLoader::load_str("   ").unwrap_err();
        assert!(matches!(err, FixSpecError::SchemaLoad(_)));
    }

    #[test]
    fn id_resolution_prefers_explicit_id_then_msgtype_then_name() {
        let mut field = SchemaNode::new("field", BTreeMap::new());
        field.attrs.insert("name".into(), "MsgType".into());
        assert_eq!(field.id(), Some("MsgType"));

        field.attrs.insert("id".into(), "35".into());
        assert_eq!(field.id(), Some("35"));

        let mut message = SchemaNode::new("message", BTreeMap::new());
        message.attrs.insert("msgtype".into(), "D".into());
        message.attrs.insert("name".into(), "NewOrderSingle".into());
        assert_eq!(message.id(), Some("D"));
    }

    #[test]
    fn deep_copy_resets_expansion_state() {
        let mut root = SchemaLoader::load_str(TINY_SCHEMA).unwrap();
        root.expanded = true;
        root.nodmap.insert("whatever".into(), 0);
        let copy = root.deep_copy();
        assert!(!copy.expanded);
        assert!(copy.nodmap.is_empty());
        assert_eq!(copy.children.len(), root.children.len());
    }
}
