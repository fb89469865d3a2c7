// SPDX-License-Identifier: AGPL-3.0-only
// SPDX-FileCopyrightText: 2025 Steve Clarke <stephenlclarke@mac.com> - https://xyzzy.tools

//! Rendering for the three things a user of this CLI actually looks at:
//! an expanded schema dumped as XML (`spec`), a generated wire message
//! (`generate`), and a decoded message's field trace plus diagnostics
//! (`trace`). Colour is applied through [`crate::decoder::colours`] and
//! can be disabled globally for non-terminal output.

use std::fmt::Write as _;

use crate::decoder::colours::{ColourPalette, PLAIN, palette};
use crate::decoder::layout::TAG_WIDTH;
use crate::decoder::schema::SchemaNode;
use crate::decoder::scanner::MessageTrace;
use crate::decoder::validator::{Diagnostic, DiagnosticKind, ScopeTrace, TraceEvent};
use crate::fix::Obfuscator;

const SOH: char = '\u{0001}';

/// Render an expanded scope (header, trailer, or a message's body) as
/// indented XML, the way `fixspec` dumps a schema fragment.
pub fn render_expanded_spec(scope: &SchemaNode) -> String {
    let mut out = String::new();
    write_node_xml(scope, &mut out, 0);
    out
}

fn write_node_xml(node: &SchemaNode, out: &mut String, depth: usize) {
    let pad = "  ".repeat(depth);
    let mut attrs = String::new();
    for (key, value) in &node.attrs {
        let _ = write!(attrs, " {key}=\"{value}\"");
    }
    if node.children.is_empty() {
        let _ = writeln!(out, "{pad}<{}{attrs}/>", node.elt);
    } else {
        let _ = writeln!(out, "{pad}<{}{attrs}>", node.elt);
        for child in &node.children {
            write_node_xml(child, out, depth + 1);
        }
        let _ = writeln!(out, "{pad}</{}>", node.elt);
    }
}

/// Render a freshly generated wire message the way `fixtr`'s sample
/// generator does: `FIX MSG : ` followed by the message with SOH shown
/// as `|` so it stays on one printable line.
pub fn render_generated(message: &str) -> String {
    format!("FIX MSG : {}", message.replace(SOH, "|"))
}

/// Render one fully decoded message: header, body, trailer, each scope's
/// field trace followed by any diagnostics raised against it.
pub fn render_message_trace(trace: &MessageTrace, obfuscator: &Obfuscator, colour: bool) -> String {
    let colours = if colour { palette() } else { PLAIN };
    let mut out = String::new();
    let _ = writeln!(out, "{}--- header ---{}", colours.title, colours.reset);
    render_scope(&trace.header, obfuscator, &colours, 0, &mut out);
    let _ = writeln!(
        out,
        "{}--- body ({}) ---{}",
        colours.title, trace.msgtype, colours.reset
    );
    render_scope(&trace.body, obfuscator, &colours, 0, &mut out);
    let _ = writeln!(out, "{}--- trailer ---{}", colours.title, colours.reset);
    render_scope(&trace.trailer, obfuscator, &colours, 0, &mut out);
    out
}

fn render_scope(trace: &ScopeTrace, obfuscator: &Obfuscator, colours: &ColourPalette, indent: usize, out: &mut String) {
    let pad = " ".repeat(indent * 2);
    for event in &trace.events {
        match event {
            TraceEvent::Field(field) => {
                let value = obfuscator.maybe_obfuscate(field.tag, &field.value);
                let enum_suffix = field
                    .enum_description
                    .as_ref()
                    .map(|d| format!(" {}({d}){}", colours.enumeration, colours.reset))
                    .unwrap_or_default();
                let _ = writeln!(
                    out,
                    "{pad}{}{:>width$}{} {}{:<24}{} : {}{value}{}{enum_suffix}",
                    colours.tag,
                    field.tag,
                    colours.reset,
                    colours.name,
                    field.name,
                    colours.reset,
                    colours.value,
                    colours.reset,
                    width = TAG_WIDTH,
                );
            }
            TraceEvent::Group { tag, name, repeats } => {
                let _ = writeln!(
                    out,
                    "{pad}{}{:>width$}{} {}{}{} (group, {} {})",
                    colours.tag,
                    tag,
                    colours.reset,
                    colours.name,
                    name,
                    colours.reset,
                    repeats.len(),
                    if repeats.len() == 1 { "repeat" } else { "repeats" },
                    width = TAG_WIDTH,
                );
                for (n, repeat) in repeats.iter().enumerate() {
                    let _ = writeln!(out, "{pad}  [{n}]");
                    render_scope(repeat, obfuscator, colours, indent + 2, out);
                }
            }
        }
    }
    for diagnostic in &trace.diagnostics {
        render_diagnostic(diagnostic, colours, &pad, out);
    }
}

fn render_diagnostic(diagnostic: &Diagnostic, colours: &ColourPalette, pad: &str, out: &mut String) {
    let phrase = match diagnostic.kind {
        DiagnosticKind::BadField => "bad field, not in spec",
        DiagnosticKind::MissingField => "missing field",
        DiagnosticKind::RepeatedField => "repeated field",
    };
    let _ = writeln!(
        out,
        "{pad}{}{:>width$}{} {}{:<24}{} {}<< {phrase}{}",
        colours.tag,
        diagnostic.tag,
        colours.reset,
        colours.name,
        diagnostic.name,
        colours.reset,
        colours.error,
        colours.reset,
        width = TAG_WIDTH,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::schema::{NodeKind, SchemaLoader};
    use std::collections::BTreeMap;

    #[test]
    fn renders_generated_message_with_pipe_delimiters() {
        let msg = format!("8=FIX.4.4{SOH}35=0{SOH}");
        let rendered = render_generated(&msg);
        assert_eq!(rendered, "FIX MSG : 8=FIX.4.4|35=0|");
    }

    #[test]
    fn renders_expanded_spec_as_nested_xml() {
        let root = SchemaLoader::load_str(
            r#"<message name="Heartbeat" msgtype="0"><field name="TestReqID" id="112"/></message>"#,
        )
        .unwrap();
        assert_eq!(root.kind, NodeKind::Message);
        let xml = render_expanded_spec(&root);
        assert!(xml.contains("<message"));
        assert!(xml.contains("<field"));
        assert!(xml.trim_end().ends_with("</message>"));
    }

    #[test]
    fn field_node_with_no_children_renders_self_closing() {
        let mut node = SchemaNode::new("field", BTreeMap::new());
        node.attrs.insert("name".into(), "Symbol".into());
        let xml = render_expanded_spec(&node);
        assert_eq!(xml.trim_end(), r#"<field name="Symbol"/>"#);
    }
}
