#![forbid(unsafe_code)]

//! Serialization of the owned tree back to XML text.
//!
//! Escaping follows the canonical-XML rules:
//! - Text nodes: `&` → `&amp;`, `<` → `&lt;`, `>` → `&gt;`, `\r` → `&#xD;`
//! - Attribute values: `&`, `<`, `"`, plus `\t`, `\n`, `\r` as character references
//!
//! CDATA sections are written back as sections, unescaped. Childless
//! elements are written as `<Tag/>`.

use crate::document::{Element, Node, NsDecl};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Context {
    Text,
    Attribute,
}

/// Append `s` to `out` with the escapes required in `ctx`.
fn push_escaped(out: &mut String, s: &str, ctx: Context) {
    let attr = ctx == Context::Attribute;
    for ch in s.chars() {
        let entity = match ch {
            '&' => "&amp;",
            '<' => "&lt;",
            '>' if !attr => "&gt;",
            '"' if attr => "&quot;",
            '\t' if attr => "&#x9;",
            '\n' if attr => "&#xA;",
            '\r' => "&#xD;",
            _ => {
                out.push(ch);
                continue;
            }
        };
        out.push_str(entity);
    }
}

fn write_ns_decl(out: &mut String, decl: &NsDecl) {
    if decl.prefix.is_empty() {
        out.push_str(" xmlns=\"");
    } else {
        out.push_str(" xmlns:");
        out.push_str(&decl.prefix);
        out.push_str("=\"");
    }
    push_escaped(out, &decl.uri, Context::Attribute);
    out.push('"');
}

/// Write an element and its subtree.
pub fn write_element(out: &mut String, element: &Element) {
    out.push('<');
    out.push_str(element.qname());
    for decl in element.namespaces() {
        write_ns_decl(out, decl);
    }
    for attr in element.attributes() {
        out.push(' ');
        out.push_str(&attr.name);
        out.push_str("=\"");
        push_escaped(out, &attr.value, Context::Attribute);
        out.push('"');
    }
    if element.children().is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');
    for child in element.children() {
        write_node(out, child);
    }
    out.push_str("</");
    out.push_str(element.qname());
    out.push('>');
}

/// Write any node.
pub fn write_node(out: &mut String, node: &Node) {
    match node {
        Node::Element(e) => write_element(out, e),
        Node::Text(t) => push_escaped(out, t, Context::Text),
        Node::CData(c) => {
            out.push_str("<![CDATA[");
            // `]]>` cannot appear inside a section, so split it across two
            out.push_str(&c.replace("]]>", "]]]]><![CDATA[>"));
            out.push_str("]]>");
        }
        Node::Comment(c) => {
            out.push_str("<!--");
            out.push_str(c);
            out.push_str("-->");
        }
        Node::ProcessingInstruction { target, data } => {
            out.push_str("<?");
            out.push_str(target);
            if let Some(data) = data.as_deref().filter(|d| !d.is_empty()) {
                out.push(' ');
                out.push_str(data);
            }
            out.push_str("?>");
        }
    }
}
