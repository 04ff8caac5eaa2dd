//! Small element tree built from `quick-xml` events.
//!
//! The specification document is read whole, so we materialize it into an
//! owned tree and let the loader walk it by path, the same way the
//! document is described: `operators/operatorgroup/operator`, etc.

use crate::Result;
use crate::diagnostics;

use anyhow::{Context, anyhow, bail};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Element>,
    /// Character data directly under this element. Runs split by child
    /// elements are joined with no separator: `a<b/>c` gives `ac`.
    pub text: String,
}

impl Element {
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Attribute lookup that fails with `what` naming the owner.
    pub fn required_attr(&self, key: &str, what: &str) -> Result<&str> {
        self.attr(key).ok_or_else(|| {
            anyhow!(diagnostics::error_message(format!(
                "missing attribute '{}' on <{}> for {}",
                key, self.name, what
            )))
        })
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a, 'n>(
        &'a self,
        name: &'n str,
    ) -> impl Iterator<Item = &'a Element> + use<'a, 'n> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// All descendants reached by a `/`-separated path of child names.
    pub fn find_all(&self, path: &str) -> Vec<&Element> {
        let mut current = vec![self];
        for step in path.split('/').filter(|s| !s.is_empty()) {
            current = current
                .into_iter()
                .flat_map(|e| e.children_named(step))
                .collect();
        }
        current
    }
}

/// Parse a whole XML document and return its root element.
pub fn parse_document(text: &str) -> Result<Element> {
    let mut reader = Reader::from_str(text);
    reader.trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let pos = reader.buffer_position();
        let event = reader.read_event().with_context(|| {
            diagnostics::error_message(format!("XML parse error near byte {}", pos))
        })?;

        match event {
            Event::Start(start) => stack.push(open_element(&start)?),
            Event::Empty(start) => {
                let element = open_element(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack.pop().ok_or_else(|| {
                    anyhow!(diagnostics::error_message(format!(
                        "unbalanced closing tag near byte {}",
                        pos
                    )))
                })?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(t) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&t.unescape()?);
                }
            }
            Event::CData(c) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions.
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        bail!(
            "{}",
            diagnostics::error_message(format!("unclosed element <{}>", open.name))
        );
    }

    root.ok_or_else(|| anyhow!(diagnostics::error_message("XML document has no root element")))
}

fn open_element(start: &BytesStart) -> Result<Element> {
    let name = std::str::from_utf8(start.name().as_ref())?.to_string();
    let mut attrs = Vec::new();
    for attr in start.attributes() {
        let attr = attr?;
        let key = std::str::from_utf8(attr.key.as_ref())?.to_string();
        let value = attr.unescape_value()?.into_owned();
        attrs.push((key, value));
    }
    Ok(Element {
        name,
        attrs,
        children: Vec::new(),
        text: String::new(),
    })
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_some() {
                bail!(
                    "{}",
                    diagnostics::error_message(format!(
                        "XML document has more than one root element (<{}>)",
                        element.name
                    ))
                );
            }
            *root = Some(element);
        }
    }
    Ok(())
}
