use std::ops::{Deref, DerefMut};

use markup5ever::{LocalName, Namespace, QualName, ns};

/// A tag attribute, e.g. `class="test"` in `<div class="test" ...>`.
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Debug)]
pub struct Attribute {
    /// The name of the attribute (e.g. the `class` in `<div class="test">`)
    pub name: QualName,
    /// The value of the attribute (e.g. the `"test"` in `<div class="test">`)
    pub value: String,
    /// Whether the attribute was written in the markup, as opposed to being filled in from a
    /// DTD default.
    pub specified: bool,
}

impl Attribute {
    pub fn new(name: QualName, value: impl Into<String>) -> Self {
        Self {
            name,
            value: value.into(),
            specified: true,
        }
    }

    /// The attribute's name as written in markup: `prefix:local`, or just `local`.
    pub fn qualified_name(&self) -> String {
        match &self.name.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.name.local),
            None => self.name.local.to_string(),
        }
    }

    fn matches_qualified(&self, qualified: &str) -> bool {
        match &self.name.prefix {
            Some(prefix) => qualified
                .split_once(':')
                .is_some_and(|(p, l)| p == &**prefix && l == &*self.name.local),
            None => &*self.name.local == qualified,
        }
    }
}

/// Result of looking up an attribute which may have been defaulted by a DTD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeLookup<'a> {
    Missing,
    Unspecified,
    Specified(&'a Attribute),
}

impl<'a> AttributeLookup<'a> {
    fn from_attr(attr: Option<&'a Attribute>) -> Self {
        match attr {
            None => Self::Missing,
            Some(attr) if !attr.specified => Self::Unspecified,
            Some(attr) => Self::Specified(attr),
        }
    }

    pub fn specified(self) -> Option<&'a Attribute> {
        match self {
            Self::Specified(attr) => Some(attr),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Attributes {
    inner: Vec<Attribute>,
}

impl Attributes {
    pub fn new(inner: Vec<Attribute>) -> Self {
        Self { inner }
    }

    pub fn set(&mut self, name: QualName, value: &str) {
        let existing_attr = self.inner.iter_mut().find(|a| a.name == name);
        if let Some(existing_attr) = existing_attr {
            existing_attr.value.clear();
            existing_attr.value.push_str(value);
            existing_attr.specified = true;
        } else {
            self.push(Attribute::new(name, value));
        }
    }

    pub fn remove(&mut self, name: &QualName) -> Option<Attribute> {
        let idx = self.inner.iter().position(|attr| attr.name == *name);
        idx.map(|idx| self.inner.remove(idx))
    }

    /// Set the attribute whose name is written `qualified` in markup, adding it (un-namespaced)
    /// if it does not exist yet.
    pub fn set_qualified(&mut self, qualified: &str, value: &str) {
        let existing_attr = self
            .inner
            .iter_mut()
            .find(|attr| attr.matches_qualified(qualified));
        if let Some(existing_attr) = existing_attr {
            existing_attr.value.clear();
            existing_attr.value.push_str(value);
            existing_attr.specified = true;
        } else {
            self.push(Attribute::new(
                QualName::new(None, ns!(), LocalName::from(qualified)),
                value,
            ));
        }
    }

    /// Remove the attribute whose name is written `qualified` in markup.
    pub fn remove_qualified(&mut self, qualified: &str) -> Option<Attribute> {
        let idx = self
            .inner
            .iter()
            .position(|attr| attr.matches_qualified(qualified));
        idx.map(|idx| self.inner.remove(idx))
    }

    /// Look an attribute up by namespace URI and local name.
    pub fn lookup_ns(&self, ns: &Namespace, local: &LocalName) -> AttributeLookup<'_> {
        AttributeLookup::from_attr(
            self.inner
                .iter()
                .find(|attr| attr.name.ns == *ns && attr.name.local == *local),
        )
    }

    /// Look an attribute up by its literal qualified name, e.g. `jugl:content`.
    ///
    /// HTML parsers keep the colon in the local name, XML parsers split it into a prefix, both match.
    pub fn lookup_qualified(&self, qualified: &str) -> AttributeLookup<'_> {
        AttributeLookup::from_attr(
            self.inner
                .iter()
                .find(|attr| attr.matches_qualified(qualified)),
        )
    }
}

impl Deref for Attributes {
    type Target = Vec<Attribute>;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
impl DerefMut for Attributes {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use markup5ever::Prefix;

    fn html_attr(local: &str, value: &str) -> Attribute {
        Attribute::new(QualName::new(None, ns!(), LocalName::from(local)), value)
    }

    #[test]
    fn qualified_lookup_matches_html_and_xml_spellings() {
        let jugl_ns = Namespace::from("http://namespace.jugl.org/");
        let xml_attr = Attribute::new(
            QualName::new(
                Some(Prefix::from("jugl")),
                jugl_ns.clone(),
                LocalName::from("content"),
            ),
            "x",
        );
        let attrs = Attributes::new(vec![html_attr("jugl:define", "a 1"), xml_attr]);

        assert!(attrs.lookup_qualified("jugl:define").specified().is_some());
        assert!(attrs.lookup_qualified("jugl:content").specified().is_some());
        assert_eq!(attrs.lookup_qualified("jugl:repeat"), AttributeLookup::Missing);
        assert!(
            attrs
                .lookup_ns(&jugl_ns, &LocalName::from("content"))
                .specified()
                .is_some()
        );
        assert_eq!(
            attrs.lookup_ns(&jugl_ns, &LocalName::from("define")),
            AttributeLookup::Missing
        );
    }

    #[test]
    fn unspecified_attributes_are_reported_as_such() {
        let mut defaulted = html_attr("jugl:condition", "false");
        defaulted.specified = false;
        let attrs = Attributes::new(vec![defaulted]);
        assert_eq!(
            attrs.lookup_qualified("jugl:condition"),
            AttributeLookup::Unspecified
        );
        assert!(attrs.lookup_qualified("jugl:condition").specified().is_none());
    }

    #[test]
    fn qualified_set_updates_existing_prefixed_attribute() {
        let xlink = Attribute::new(
            QualName::new(
                Some(Prefix::from("xlink")),
                Namespace::from("http://www.w3.org/1999/xlink"),
                LocalName::from("href"),
            ),
            "a",
        );
        let mut attrs = Attributes::new(vec![xlink]);
        attrs.set_qualified("xlink:href", "b");
        attrs.set_qualified("title", "t");
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0].value, "b");
        assert_eq!(attrs[1].qualified_name(), "title");

        assert!(attrs.remove_qualified("xlink:href").is_some());
        assert!(attrs.remove_qualified("xlink:href").is_none());
    }
}
