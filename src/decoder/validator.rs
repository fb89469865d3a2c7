// SPDX-License-Identifier: AGPL-3.0-only
// SPDX-FileCopyrightText: 2025 Steve Clarke <stephenlclarke@mac.com> - https://xyzzy.tools

//! `MessageValidator::trace`: the recursive, group-aware scope walk that
//! correlates a wire chunk stream against an `ExpandedScope`, the one
//! algorithm everything else in this crate exists to feed.
//!
//! A scope is read chunk by chunk until either the input runs out or a
//! chunk is seen that doesn't belong to this scope, at which point the
//! chunk is rewound and ownership returns to the caller. A `<group>`
//! child recurses into itself once per repeat, reading its repeat count
//! off the just-consumed counter field's value.

use std::collections::HashMap;
use std::collections::HashSet;

use super::catalog::SpecCatalog;
use super::errors::FixSpecError;
use super::schema::{NodeKind, SchemaNode};
use super::wire::WireReader;

#[derive(Debug, Clone)]
pub struct FieldTrace {
    pub tag: u32,
    pub name: String,
    pub value: String,
    pub enum_description: Option<String>,
}

#[derive(Debug, Clone)]
pub enum TraceEvent {
    Field(FieldTrace),
    Group {
        tag: u32,
        name: String,
        repeats: Vec<ScopeTrace>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A tag that doesn't belong to this scope's schema at all.
    BadField,
    /// A required field that never showed up.
    MissingField,
    /// A non-group field that showed up more than once.
    RepeatedField,
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub tag: u32,
    pub name: String,
    pub kind: DiagnosticKind,
}

#[derive(Debug, Clone, Default)]
pub struct ScopeTrace {
    pub events: Vec<TraceEvent>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ScopeTrace {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
            && self.events.iter().all(|e| match e {
                TraceEvent::Field(_) => true,
                TraceEvent::Group { repeats, .. } => repeats.iter().all(ScopeTrace::is_clean),
            })
    }
}

pub struct MessageValidator<'a> {
    catalog: &'a SpecCatalog,
    trailer_tags: &'a HashSet<String>,
}

impl<'a> MessageValidator<'a> {
    pub fn new(catalog: &'a SpecCatalog, trailer_tags: &'a HashSet<String>) -> Self {
        Self { catalog, trailer_tags }
    }

    /// Trace one scope (header, trailer, message body, or a single group
    /// entry) against the wire. `scope` must be an `ExpandedScope`
    /// (`scope.expanded == true`): this walk relies entirely on
    /// `nodmap`.
    pub fn trace(&self, wire: &mut WireReader, scope: &SchemaNode) -> Result<ScopeTrace, FixSpecError> {
        let mut seen: HashMap<String, u32> = HashMap::new();
        let mut out = ScopeTrace::default();

        if scope.kind == NodeKind::Group {
            let first_id = scope
                .children
                .first()
                .and_then(|c| c.attr("id"))
                .ok_or_else(|| FixSpecError::SchemaLoad("group has no delimiter field".into()))?
                .to_string();

            if wire.advance()? == 0 {
                return Ok(out);
            }
            if wire.tag != first_id {
                wire.rewind()?;
                return Ok(out);
            }

            let value = wire.value.clone();
            self.push_field_trace(&scope.children[0], &value, &mut out);
            *seen.entry(wire.tag.clone()).or_insert(0) += 1;
        }

        loop {
            if wire.advance()? == 0 {
                break;
            }

            let Some(&idx) = scope.nodmap.get(&wire.tag) else {
                if scope.kind != NodeKind::Trailer && self.trailer_tags.contains(&wire.tag) {
                    wire.rewind()?;
                    break;
                }
                if scope.kind == NodeKind::Header || scope.kind == NodeKind::Group {
                    wire.rewind()?;
                    break;
                }
                out.diagnostics.push(Diagnostic {
                    tag: wire.tag.parse().unwrap_or(0),
                    name: wire.tag.clone(),
                    kind: DiagnosticKind::BadField,
                });
                continue;
            };

            if scope.kind == NodeKind::Group
                && scope.children.first().and_then(|c| c.attr("id")) == Some(wire.tag.as_str())
            {
                wire.rewind()?;
                break;
            }

            *seen.entry(wire.tag.clone()).or_insert(0) += 1;

            let child = &scope.children[idx];
            match child.kind {
                NodeKind::Group => {
                    let repeats_count: usize = wire.value.trim().parse().unwrap_or(0);
                    let mut repeats = Vec::with_capacity(repeats_count);
                    for _ in 0..repeats_count {
                        repeats.push(self.trace(wire, child)?);
                    }
                    out.events.push(TraceEvent::Group {
                        tag: child.attr("id").and_then(|s| s.parse().ok()).unwrap_or(0),
                        name: child.attr("name").unwrap_or_default().to_string(),
                        repeats,
                    });
                }
                _ => {
                    let value = wire.value.clone();
                    self.push_field_trace(child, &value, &mut out);
                }
            }
        }

        self.check_seen(scope, &seen, &mut out.diagnostics);
        Ok(out)
    }

    fn push_field_trace(&self, field_node: &SchemaNode, value: &str, out: &mut ScopeTrace) {
        let tag: u32 = field_node.attr("id").and_then(|s| s.parse().ok()).unwrap_or(0);
        let name = field_node.attr("name").unwrap_or_default().to_string();
        let enum_description = self
            .catalog
            .fields_by_tag
            .get(&tag)
            .and_then(|def| def.children.iter().find(|v| v.attr("enum") == Some(value)))
            .and_then(|v| v.attr("description"))
            .map(str::to_string);

        out.events.push(TraceEvent::Field(FieldTrace {
            tag,
            name,
            value: value.to_string(),
            enum_description,
        }));
    }

    /// After a scope runs dry: flag required fields that never appeared,
    /// and non-group fields that appeared more than once.
    fn check_seen(&self, scope: &SchemaNode, seen: &HashMap<String, u32>, diagnostics: &mut Vec<Diagnostic>) {
        for child in &scope.children {
            let Some(id) = child.id() else { continue };
            let count = seen.get(id).copied().unwrap_or(0);
            let tag: u32 = id.parse().unwrap_or(0);
            let name = child.attr("name").unwrap_or_default().to_string();

            if child.is_required() && count < 1 {
                diagnostics.push(Diagnostic {
                    tag,
                    name: name.clone(),
                    kind: DiagnosticKind::MissingField,
                });
            }
            if count > 1 && child.kind != NodeKind::Group {
                diagnostics.push(Diagnostic {
                    tag,
                    name,
                    kind: DiagnosticKind::RepeatedField,
                });
            }
        }
    }
}
