#![forbid(unsafe_code)]

//! Owned XML tree built from a `roxmltree` parse.

use crate::path::ElementPath;
use crate::writer;
use birdfix_core::Error;
use std::collections::BTreeMap;

const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";
const CDATA_OPEN: &str = "<![CDATA[";
const CDATA_CLOSE: &str = "]]>";

/// A single attribute, kept in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Qualified name as written (`name`, `xml:lang`).
    pub name: String,
    /// Unescaped value.
    pub value: String,
}

/// A namespace binding declared on an element. `prefix` is empty for the
/// default namespace; an empty `uri` undeclares it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NsDecl {
    pub prefix: String,
    pub uri: String,
}

/// Child content of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    /// Character data written back as a `<![CDATA[...]]>` section.
    CData(String),
    Comment(String),
    ProcessingInstruction { target: String, data: Option<String> },
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Character data of a text or CDATA node.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Node::Text(t) | Node::CData(t) => Some(t),
            _ => None,
        }
    }

    fn as_text_mut(&mut self) -> Option<&mut String> {
        match self {
            Node::Text(t) | Node::CData(t) => Some(t),
            _ => None,
        }
    }
}

/// An element with ordered attributes and mixed content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    qname: String,
    namespaces: Vec<NsDecl>,
    attributes: Vec<Attribute>,
    children: Vec<Node>,
}

impl Element {
    pub fn new(qname: impl Into<String>) -> Self {
        Self {
            qname: qname.into(),
            namespaces: Vec::new(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Element type without any namespace prefix (`DataItem`).
    pub fn tag(&self) -> &str {
        match self.qname.split_once(':') {
            Some((_, local)) => local,
            None => &self.qname,
        }
    }

    /// Element name exactly as written in the source.
    pub fn qname(&self) -> &str {
        &self.qname
    }

    pub fn namespaces(&self) -> &[NsDecl] {
        &self.namespaces
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut Vec<Attribute> {
        &mut self.attributes
    }

    /// Set an attribute, keeping its position if it already exists.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(attr) => attr.value = value,
            None => self.attributes.push(Attribute {
                name: name.to_owned(),
                value,
            }),
        }
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        let pos = self.attributes.iter().position(|a| a.name == name)?;
        Some(self.attributes.remove(pos).value)
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut Vec<Node> {
        &mut self.children
    }

    pub fn push_child(&mut self, node: Node) {
        self.children.push(node);
    }

    /// Direct text and CDATA children, each as its own chunk.
    pub fn text_nodes(&self) -> impl Iterator<Item = &str> {
        self.children.iter().filter_map(Node::as_text)
    }

    pub fn text_nodes_mut(&mut self) -> impl Iterator<Item = &mut String> {
        self.children.iter_mut().filter_map(Node::as_text_mut)
    }

    /// Concatenated direct text content, `None` if the element has none.
    pub fn text(&self) -> Option<String> {
        let mut chunks = self.text_nodes().peekable();
        chunks.peek()?;
        Some(chunks.collect())
    }

    /// Replace all direct text with a single leading text node.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.children.retain(|n| n.as_text().is_none());
        let text = text.into();
        if !text.is_empty() {
            self.children.insert(0, Node::Text(text));
        }
    }

    /// Drop text and CDATA children that have become empty.
    pub fn prune_empty_text(&mut self) {
        self.children.retain(|n| n.as_text() != Some(""));
    }
}

/// A parsed report document. Owns its element tree exclusively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    declaration: Option<String>,
    prolog: Vec<Node>,
    root: Element,
    epilog: Vec<Node>,
    trailing_newline: bool,
}

impl Document {
    /// Parse and validate XML text into an owned tree.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let doc = roxmltree::Document::parse_with_options(text, crate::parsing_options())
            .map_err(|e| Error::XmlParse(e.to_string()))?;

        let mut prolog = Vec::new();
        let mut epilog = Vec::new();
        let mut root = None;
        for child in doc.root().children() {
            if child.is_element() {
                root = Some(build_element(child, text)?);
                continue;
            }
            if let Some(node) = build_misc(child) {
                if root.is_none() {
                    prolog.push(node);
                } else {
                    epilog.push(node);
                }
            }
        }
        let root =
            root.ok_or_else(|| Error::XmlStructure("document has no root element".into()))?;

        Ok(Self {
            declaration: xml_declaration(text).map(str::to_owned),
            prolog,
            root,
            epilog,
            trailing_newline: text.ends_with('\n'),
        })
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    pub fn root_attribute(&self, name: &str) -> Option<&str> {
        self.root.attribute(name)
    }

    pub fn set_root_attribute(&mut self, name: &str, value: impl Into<String>) {
        self.root.set_attribute(name, value);
    }

    /// The `<?xml ...?>` declaration as it appeared in the input.
    pub fn declaration(&self) -> Option<&str> {
        self.declaration.as_deref()
    }

    /// Every element in document order, paired with its path.
    pub fn elements(&self) -> Elements<'_> {
        Elements {
            stack: vec![(ElementPath::root(), &self.root)],
        }
    }

    /// Visit every element mutably, parents before children.
    pub fn for_each_element_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut Element),
    {
        visit_mut(&mut self.root, &mut f);
    }

    pub fn element(&self, path: &ElementPath) -> Option<&Element> {
        let mut current = &self.root;
        for &index in path.indices() {
            current = current.children.get(index)?.as_element()?;
        }
        Some(current)
    }

    pub fn element_mut(&mut self, path: &ElementPath) -> Option<&mut Element> {
        let mut current = &mut self.root;
        for &index in path.indices() {
            current = current.children.get_mut(index)?.as_element_mut()?;
        }
        Some(current)
    }

    /// Detach the element at `path` from its parent.
    ///
    /// Paths of later siblings and their descendants shift after a removal;
    /// callers removing several elements should go in descending path order.
    pub fn remove_element(&mut self, path: &ElementPath) -> Result<Element, Error> {
        let (parent_path, index) = path
            .split_last()
            .ok_or_else(|| Error::XmlStructure("cannot remove the root element".into()))?;
        let parent = self
            .element_mut(&parent_path)
            .ok_or_else(|| Error::XmlStructure(format!("no element at {parent_path}")))?;
        if !matches!(parent.children.get(index), Some(Node::Element(_))) {
            return Err(Error::XmlStructure(format!("no element at {path}")));
        }
        match parent.children.remove(index) {
            Node::Element(e) => Ok(e),
            _ => Err(Error::XmlStructure(format!("no element at {path}"))),
        }
    }

    /// Serialize back to XML text.
    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        if let Some(decl) = &self.declaration {
            out.push_str(decl);
            out.push('\n');
        }
        for node in &self.prolog {
            writer::write_node(&mut out, node);
            out.push('\n');
        }
        writer::write_element(&mut out, &self.root);
        for node in &self.epilog {
            out.push('\n');
            writer::write_node(&mut out, node);
        }
        if self.trailing_newline {
            out.push('\n');
        }
        out
    }
}

/// Depth-first iterator over `(path, element)` pairs in document order.
pub struct Elements<'a> {
    stack: Vec<(ElementPath, &'a Element)>,
}

impl<'a> Iterator for Elements<'a> {
    type Item = (ElementPath, &'a Element);

    fn next(&mut self) -> Option<Self::Item> {
        let (path, element) = self.stack.pop()?;
        for (index, child) in element.children.iter().enumerate().rev() {
            if let Node::Element(e) = child {
                self.stack.push((path.child(index), e));
            }
        }
        Some((path, element))
    }
}

fn visit_mut<F>(element: &mut Element, f: &mut F)
where
    F: FnMut(&mut Element),
{
    f(element);
    for child in element.children.iter_mut() {
        if let Node::Element(e) = child {
            visit_mut(e, f);
        }
    }
}

/// Leading `<?xml ...?>` declaration, if present.
fn xml_declaration(text: &str) -> Option<&str> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let rest = text.strip_prefix("<?xml")?;
    if !rest.starts_with(|c: char| c.is_ascii_whitespace()) {
        return None;
    }
    let end = text.find("?>")?;
    Some(&text[..end + 2])
}

fn build_misc(node: roxmltree::Node<'_, '_>) -> Option<Node> {
    match node.node_type() {
        roxmltree::NodeType::Comment => Some(Node::Comment(node.text().unwrap_or("").to_owned())),
        roxmltree::NodeType::PI => {
            let pi = node.pi()?;
            Some(Node::ProcessingInstruction {
                target: pi.target.to_owned(),
                data: pi.value.map(str::to_owned),
            })
        }
        roxmltree::NodeType::Text => Some(Node::Text(node.text().unwrap_or("").to_owned())),
        _ => None,
    }
}

fn build_element(node: roxmltree::Node<'_, '_>, source: &str) -> Result<Element, Error> {
    let qname = match raw_qname(node, source) {
        Some(q) => q.to_owned(),
        None => resolved_qname(node)?,
    };

    let mut element = Element::new(qname);
    element.namespaces = declared_namespaces(node);

    for attr in node.attributes() {
        let name = match source.get(attr.range_qname()).filter(|q| !q.is_empty()) {
            Some(raw) => raw.to_owned(),
            None => resolved_attribute_name(node, &attr)?,
        };
        element.attributes.push(Attribute {
            name,
            value: attr.value().to_owned(),
        });
    }

    for child in node.children() {
        if child.is_element() {
            element.children.push(Node::Element(build_element(child, source)?));
        } else if child.is_text() {
            element.children.extend(build_text(child, source));
        } else if let Some(misc) = build_misc(child) {
            element.children.push(misc);
        }
    }
    Ok(element)
}

/// Attribute name rebuilt from its namespace. Prefixed bindings win over the
/// default namespace, which never applies to attributes.
fn resolved_attribute_name(
    node: roxmltree::Node<'_, '_>,
    attr: &roxmltree::Attribute<'_, '_>,
) -> Result<String, Error> {
    let uri = match attr.namespace() {
        None => return Ok(attr.name().to_owned()),
        Some(XML_NS) => return Ok(format!("xml:{}", attr.name())),
        Some(uri) => uri,
    };
    let prefix = node
        .namespaces()
        .find(|ns| ns.uri() == uri && ns.name().is_some_and(|p| !p.is_empty()))
        .and_then(|ns| ns.name())
        .ok_or_else(|| Error::XmlStructure(format!("no prefix bound for namespace {uri}")))?;
    Ok(format!("{prefix}:{}", attr.name()))
}

/// A text node, split back into its plain and CDATA runs.
///
/// roxmltree merges adjacent text and CDATA into one node, so the runs are
/// recovered from the source. When they do not add up to the parsed value
/// the node is kept as a single plain text chunk.
fn build_text(node: roxmltree::Node<'_, '_>, source: &str) -> Vec<Node> {
    let value = node.text().unwrap_or("");
    match split_cdata(node, source) {
        Some(runs) if same_character_data(&runs, value) => runs,
        _ => vec![Node::Text(value.to_owned())],
    }
}

fn split_cdata(node: roxmltree::Node<'_, '_>, source: &str) -> Option<Vec<Node>> {
    let start = node.range().start;
    let end = match node.next_sibling() {
        Some(next) => next.range().start,
        None => {
            let parent_end = node.parent()?.range().end;
            source.get(..parent_end)?.rfind("</")?
        }
    };
    let mut rest = source.get(start..end)?;
    if !rest.contains(CDATA_OPEN) {
        return None;
    }

    let mut runs = Vec::new();
    while let Some(open) = rest.find(CDATA_OPEN) {
        push_plain(&mut runs, &rest[..open])?;
        let body = &rest[open + CDATA_OPEN.len()..];
        let close = body.find(CDATA_CLOSE)?;
        runs.push(Node::CData(body[..close].to_owned()));
        rest = &body[close + CDATA_CLOSE.len()..];
    }
    push_plain(&mut runs, rest)?;
    Some(runs)
}

/// Unescape a run of plain character data by letting roxmltree read it.
fn push_plain(runs: &mut Vec<Node>, raw: &str) -> Option<()> {
    if raw.is_empty() {
        return Some(());
    }
    let text = if raw.contains(|c: char| c == '&' || c == '\r') {
        let wrapped = format!("<t>{raw}</t>");
        let doc = roxmltree::Document::parse(&wrapped).ok()?;
        doc.root_element().text().unwrap_or("").to_owned()
    } else {
        raw.to_owned()
    };
    runs.push(Node::Text(text));
    Some(())
}

fn same_character_data(runs: &[Node], value: &str) -> bool {
    let mut joined = String::with_capacity(value.len());
    for run in runs {
        match run {
            Node::CData(c) if c.contains('\r') => {
                joined.push_str(&c.replace("\r\n", "\n").replace('\r', "\n"))
            }
            other => joined.push_str(other.as_text().unwrap_or("")),
        }
    }
    joined == value
}

/// Read the element name straight from the start tag so prefixes survive
/// exactly as written.
fn raw_qname<'a>(node: roxmltree::Node<'_, '_>, source: &'a str) -> Option<&'a str> {
    let rest = source.get(node.range().start..)?.strip_prefix('<')?;
    let end = rest.find(|c: char| c.is_whitespace() || c == '/' || c == '>')?;
    let qname = &rest[..end];
    (!qname.is_empty()).then_some(qname)
}

fn resolved_qname(node: roxmltree::Node<'_, '_>) -> Result<String, Error> {
    let local = node.tag_name().name();
    match node.tag_name().namespace() {
        Some(uri) => match node.lookup_prefix(uri) {
            Some(prefix) if !prefix.is_empty() => Ok(format!("{prefix}:{local}")),
            _ => Ok(local.to_owned()),
        },
        None if local.is_empty() => Err(Error::XmlStructure("element without a name".into())),
        None => Ok(local.to_owned()),
    }
}

/// Namespace bindings that change at this element relative to its parent.
fn declared_namespaces(node: roxmltree::Node<'_, '_>) -> Vec<NsDecl> {
    let current = in_scope_namespaces(node);
    let inherited = node
        .parent_element()
        .map(in_scope_namespaces)
        .unwrap_or_default();

    let mut decls: Vec<NsDecl> = current
        .iter()
        .filter(|(prefix, uri)| inherited.get(*prefix) != Some(*uri))
        .map(|(prefix, uri)| NsDecl {
            prefix: prefix.clone(),
            uri: uri.clone(),
        })
        .collect();

    if inherited.contains_key("") && !current.contains_key("") {
        decls.insert(
            0,
            NsDecl {
                prefix: String::new(),
                uri: String::new(),
            },
        );
    }
    decls
}

fn in_scope_namespaces(node: roxmltree::Node<'_, '_>) -> BTreeMap<String, String> {
    node.namespaces()
        .filter(|ns| ns.name() != Some("xml"))
        .filter(|ns| !ns.uri().is_empty())
        .map(|ns| (ns.name().unwrap_or("").to_owned(), ns.uri().to_owned()))
        .collect()
}
