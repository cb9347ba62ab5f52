//! Minimal XML element tree for writing model descriptions.
//!
//! Only what the description needs: elements with ordered attributes and child
//! elements, no text content, no namespaces.

use std::fmt::Write;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    tag: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlElement>,
}

impl XmlElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: vec![],
            children: vec![],
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.attributes.push((name.into(), value.to_string()));
        self
    }

    /// Add an attribute when `value` is set.
    pub fn attr_opt<V: ToString>(self, name: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.attr(name, value),
            None => self,
        }
    }

    pub fn child(mut self, child: XmlElement) -> Self {
        self.children.push(child);
        self
    }

    pub fn children_from(mut self, children: impl IntoIterator<Item = XmlElement>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn push(&mut self, child: XmlElement) {
        self.children.push(child);
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn children(&self) -> &[XmlElement] {
        &self.children
    }

    /// Serialise as a document with an XML declaration, indented by two spaces.
    pub fn to_document(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        self.write_indented(&mut out, 0);
        out
    }

    fn write_indented(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        // Writing to a String cannot fail
        let _ = write!(out, "{}<{}", indent, self.tag);
        for (name, value) in &self.attributes {
            let _ = write!(out, " {}=\"{}\"", name, escape(value));
        }
        if self.children.is_empty() {
            out.push_str("/>\n");
        } else {
            out.push_str(">\n");
            for child in &self.children {
                child.write_indented(out, depth + 1);
            }
            let _ = writeln!(out, "{}</{}>", indent, self.tag);
        }
    }
}

fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\n' => escaped.push_str("&#10;"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document() {
        let root = XmlElement::new("Root")
            .attr("a", 1)
            .attr_opt("b", None::<&str>)
            .child(XmlElement::new("Leaf").attr("name", "x"));
        assert_eq!(
            root.to_document(),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Root a=\"1\">\n  <Leaf name=\"x\"/>\n</Root>\n"
        );
        assert_eq!(root.attribute("a"), Some("1"));
        assert_eq!(root.attribute("b"), None);
    }

    #[test]
    fn test_escaping() {
        let element = XmlElement::new("E").attr("description", "a < b & \"c\"");
        assert_eq!(
            element.to_document().lines().nth(1),
            Some("<E description=\"a &lt; b &amp; &quot;c&quot;\"/>")
        );
    }
}
