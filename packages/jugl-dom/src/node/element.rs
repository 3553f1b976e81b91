use markup5ever::{LocalName, Namespace, QualName, local_name};

use super::{Attribute, AttributeLookup, Attributes};

#[derive(Debug, Clone)]
pub struct ElementData {
    /// The elements tag name, namespace and prefix
    pub name: QualName,

    /// The element's attributes
    pub attrs: Attributes,
}

impl ElementData {
    pub fn new(name: QualName, attrs: Vec<Attribute>) -> Self {
        ElementData {
            name,
            attrs: Attributes::new(attrs),
        }
    }

    pub fn attrs(&self) -> &[Attribute] {
        &self.attrs
    }

    pub fn attr(&self, name: impl PartialEq<LocalName>) -> Option<&str> {
        let attr = self.attrs.iter().find(|attr| name == attr.name.local)?;
        Some(&attr.value)
    }

    pub fn id(&self) -> Option<&str> {
        self.attr(local_name!("id"))
    }

    pub fn lookup_ns(&self, ns: &Namespace, local: &str) -> AttributeLookup<'_> {
        self.attrs.lookup_ns(ns, &LocalName::from(local))
    }

    pub fn lookup_qualified(&self, qualified: &str) -> AttributeLookup<'_> {
        self.attrs.lookup_qualified(qualified)
    }

    /// Add an attribute as if it had been filled in from a DTD default rather than written out.
    pub fn add_default_attr(&mut self, name: QualName, value: &str) {
        if self.attrs.iter().any(|attr| attr.name == name) {
            return;
        }
        self.attrs.push(Attribute {
            name,
            value: value.to_string(),
            specified: false,
        });
    }

    /// The tag name as written in markup: `prefix:local`, or just `local`.
    pub fn qualified_name(&self) -> String {
        match &self.name.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.name.local),
            None => self.name.local.to_string(),
        }
    }
}
