// SPDX-License-Identifier: AGPL-3.0-only
// SPDX-FileCopyrightText: 2025 Steve Clarke <stephenlclarke@mac.com> - https://xyzzy.tools

//! Builds a [`SpecCatalog`] from a parsed `<fix>` schema tree: the global
//! field dictionary plus the raw (unexpanded) header, trailer, message and
//! component definitions, with every `<field>` usage stamped with its
//! numeric tag so later stages never need to resolve a name again.

use std::collections::HashMap;
use std::sync::Arc;

use rayon::prelude::*;

use super::errors::FixSpecError;
use super::schema::{NodeKind, SchemaNode, Visitor};

/// The parsed, indexed form of one FIX schema document. Built once per
/// run and shared (via `Arc`) across generation, expansion and
/// validation.
pub struct SpecCatalog {
    pub prelude_type: String,
    pub major: String,
    pub minor: String,
    pub servicepack: Option<String>,
    pub fields_by_tag: HashMap<u32, Arc<SchemaNode>>,
    pub fields_by_name: HashMap<String, u32>,
    pub messages: HashMap<String, Arc<SchemaNode>>,
    pub components: HashMap<String, Arc<SchemaNode>>,
    pub header: Arc<SchemaNode>,
    pub trailer: Arc<SchemaNode>,
}

impl SpecCatalog {
    /// `BeginString` value for this schema, e.g. `FIX.4.4` or `FIXT.1.1`.
    pub fn prelude(&self) -> String {
        format!("{}.{}.{}", self.prelude_type, self.major, self.minor)
    }

    pub fn build(fix: SchemaNode) -> Result<Self, FixSpecError> {
        if fix.kind != NodeKind::Fix {
            return Err(FixSpecError::SchemaLoad(format!(
                "expected root element <fix>, found <{}>",
                fix.elt
            )));
        }

        let prelude_type = fix.attr("type").unwrap_or("FIX").to_string();
        let major = fix
            .attr("major")
            .ok_or_else(|| FixSpecError::SchemaLoad("<fix> is missing a major attribute".into()))?
            .to_string();
        let minor = fix
            .attr("minor")
            .ok_or_else(|| FixSpecError::SchemaLoad("<fix> is missing a minor attribute".into()))?
            .to_string();
        let servicepack = fix
            .attr("servicepack")
            .filter(|s| !s.is_empty() && *s != "0")
            .map(str::to_string);

        let mut fix = fix;
        let mut header = take_child(&mut fix, "header")
            .ok_or_else(|| FixSpecError::SchemaLoad("<fix> is missing a <header>".into()))?;
        let mut trailer = take_child(&mut fix, "trailer")
            .ok_or_else(|| FixSpecError::SchemaLoad("<fix> is missing a <trailer>".into()))?;
        let mut messages_node = take_child(&mut fix, "messages")
            .ok_or_else(|| FixSpecError::SchemaLoad("<fix> is missing a <messages>".into()))?;
        let mut components_node =
            take_child(&mut fix, "components").unwrap_or_else(|| SchemaNode::new("components", Default::default()));
        let fields_node = take_child(&mut fix, "fields")
            .ok_or_else(|| FixSpecError::SchemaLoad("<fix> is missing a <fields>".into()))?;

        let (fields_by_tag, fields_by_name) = build_field_tables(&fields_node)?;

        let mut indexer = SchemaIndexer::new(&fields_by_name);
        header.visit_mut(&mut indexer);
        trailer.visit_mut(&mut indexer);
        messages_node.visit_mut(&mut indexer);
        components_node.visit_mut(&mut indexer);
        if let Some(bad) = indexer.unresolved.first() {
            return Err(FixSpecError::SchemaLoad(format!(
                "field usage refers to an unknown field name: {bad}"
            )));
        }

        let messages = messages_node
            .children
            .into_iter()
            .map(|m| {
                let msgtype = m.attr("msgtype").unwrap_or_default().to_string();
                (msgtype, Arc::new(m))
            })
            .collect();

        let components = components_node
            .children
            .into_iter()
            .map(|c| {
                let name = c.attr("name").unwrap_or_default().to_string();
                (name, Arc::new(c))
            })
            .collect();

        Ok(Self {
            prelude_type,
            major,
            minor,
            servicepack,
            fields_by_tag,
            fields_by_name,
            messages,
            components,
            header: Arc::new(header),
            trailer: Arc::new(trailer),
        })
    }
}

fn take_child(node: &mut SchemaNode, elt: &str) -> Option<SchemaNode> {
    let pos = node.children.iter().position(|c| c.elt == elt)?;
    Some(node.children.remove(pos))
}

fn build_field_tables(
    fields_node: &SchemaNode,
) -> Result<(HashMap<u32, Arc<SchemaNode>>, HashMap<String, u32>), FixSpecError> {
    let rows: Result<Vec<(u32, String, SchemaNode)>, FixSpecError> = fields_node
        .children
        .par_iter()
        .map(|field| {
            let number: u32 = field
                .attr("number")
                .ok_or_else(|| FixSpecError::SchemaLoad("<field> definition missing number".into()))?
                .parse()
                .map_err(|_| FixSpecError::SchemaLoad("<field> number is not numeric".into()))?;
            let name = field
                .attr("name")
                .ok_or_else(|| FixSpecError::SchemaLoad("<field> definition missing name".into()))?
                .to_string();
            Ok((number, name, field.deep_copy()))
        })
        .collect();

    let mut fields_by_tag = HashMap::new();
    let mut fields_by_name = HashMap::new();
    for (number, name, node) in rows? {
        fields_by_name.insert(name, number);
        fields_by_tag.insert(number, Arc::new(node));
    }
    Ok((fields_by_tag, fields_by_name))
}

/// Stamps every `<field>` usage node (inside header, trailer, messages and
/// components) with `id = <tag>`, resolved from its `name` attribute
/// against the global field dictionary. Idempotent: running it twice
/// recomputes the same tags.
pub struct SchemaIndexer<'a> {
    fields_by_name: &'a HashMap<String, u32>,
    unresolved: Vec<String>,
}

impl<'a> SchemaIndexer<'a> {
    pub fn new(fields_by_name: &'a HashMap<String, u32>) -> Self {
        Self {
            fields_by_name,
            unresolved: Vec::new(),
        }
    }
}

impl Visitor for SchemaIndexer<'_> {
    fn visit(&mut self, node: &mut SchemaNode) -> i32 {
        // A <group>'s own identity on the wire is its repeat-count field
        // (e.g. NoPartyIDs = tag 453), declared in <fields> exactly like
        // any other field and named by the group's own `name` attribute.
        // That is what the parent scope's nodmap must key on, not the
        // tag of the group's first child (used later, only to detect the
        // boundary between repeat entries once already inside the group).
        if node.kind == NodeKind::Field || node.kind == NodeKind::Group {
            match node.attr("name").map(str::to_string) {
                Some(name) => match self.fields_by_name.get(&name) {
                    Some(tag) => {
                        node.attrs.insert("id".to_string(), tag.to_string());
                    }
                    None => self.unresolved.push(name),
                },
                None => self.unresolved.push("<unnamed field or group>".to_string()),
            }
        }
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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
            </message>
          </messages>
          <components>
            <component name="Instrument">
              <field name="Symbol" required="Y"/>
            </component>
          </components>
          <fields>
            <field number="8" name="BeginString" type="STRING"/>
            <field number="35" name="MsgType" type="STRING"/>
            <field number="10" name="CheckSum" type="STRING"/>
            <field number="11" name="ClOrdID" type="STRING"/>
            <field number="55" name="Symbol" type="STRING"/>
          </fields>
        </fix>
    "#;

    #[test]
    fn builds_catalog_and_stamps_tags() {
        let root = SchemaLoader::load_str(SCHEMA).unwrap();
        let catalog = SpecCatalog::build(root).unwrap();
        assert_eq!(catalog.prelude(), "FIX.4.4");
        assert_eq!(catalog.fields_by_name.get("ClOrdID"), Some(&11));

        let msg = catalog.messages.get("D").unwrap();
        let clordid = msg.child("field").unwrap();
        assert_eq!(clordid.attr("id"), Some("11"));

        let component = catalog.components.get("Instrument").unwrap();
        let symbol = component.child("field").unwrap();
        assert_eq!(symbol.attr("id"), Some("55"));
    }

    #[test]
    fn rejects_field_usage_with_unknown_name() {
        let broken = SCHEMA.replace(
            r#"<field name="ClOrdID" required="Y"/>"#,
            r#"<field name="NotAField" required="Y"/>"#,
        );
        let root = SchemaLoader::load_str(&broken).unwrap();
        assert!(SpecCatalog::build(root).is_err());
    }
}
