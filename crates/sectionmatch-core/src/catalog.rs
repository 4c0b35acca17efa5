use crate::marker::{DelimiterMarker, GROUP_LABEL};
use crate::node::{Node, Section};
use crate::{Error, Result};
use serde::Serialize;

/// The smallest catalogued replacement: START comment, one content element, END comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateUnit {
    name: String,
    marker: DelimiterMarker,
    defining_nodes: [Node; 3],
}

impl TemplateUnit {
    pub fn new(name: &str, label: &str, defining_nodes: Vec<Node>) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidTemplate(
                "template name cannot be empty or whitespace".to_string(),
            ));
        }
        let marker = DelimiterMarker::new(label)
            .map_err(|_| Error::InvalidTemplate("delimiter label cannot be blank".to_string()))?;

        let got = defining_nodes.len();
        let nodes: [Node; 3] = defining_nodes.try_into().map_err(|_| {
            Error::InvalidTemplate(format!(
                "expected START comment, content element and END comment (got {got} nodes)"
            ))
        })?;

        match nodes[0].comment_text() {
            Some(t) if marker.is_start(t) => {}
            _ => {
                return Err(Error::InvalidTemplate(format!(
                    "first node must be a comment reading '{}'",
                    marker.start_text()
                )))
            }
        }
        match nodes[2].comment_text() {
            Some(t) if marker.is_end(t) => {}
            _ => {
                return Err(Error::InvalidTemplate(format!(
                    "last node must be a comment reading '{}'",
                    marker.end_text()
                )))
            }
        }
        if nodes[1].as_element().is_none() {
            return Err(Error::InvalidTemplate(
                "middle node must be a content element".to_string(),
            ));
        }

        Ok(Self {
            name: name.to_string(),
            marker,
            defining_nodes: nodes,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn marker(&self) -> &DelimiterMarker {
        &self.marker
    }

    pub fn defining_nodes(&self) -> &[Node; 3] {
        &self.defining_nodes
    }

    /// The reusable content element.
    pub fn content(&self) -> &Section {
        match &self.defining_nodes[1] {
            Node::Element(section) => section,
            // `new` rejects anything else in the middle slot.
            _ => unreachable!("template content slot always holds an element"),
        }
    }
}

/// A named, marker-bounded collection of template units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateGroup {
    name: String,
    marker: DelimiterMarker,
    defining_nodes: Vec<Node>,
    units: Vec<TemplateUnit>,
}

impl TemplateGroup {
    /// `label` defaults to `TEMPLATE GROUP TITLE`.
    pub fn new(name: &str, defining_nodes: Vec<Node>, label: Option<&str>) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidGroup(
                "group name cannot be empty or whitespace".to_string(),
            ));
        }
        let marker = DelimiterMarker::new(label.unwrap_or(GROUP_LABEL))
            .map_err(|_| Error::InvalidGroup("delimiter label cannot be blank".to_string()))?;

        let n = defining_nodes.len();
        if n < 2 || defining_nodes[n - 2].is_comment() {
            return Err(Error::InvalidGroup(
                "group nodes need a non-comment node directly before the END comment"
                    .to_string(),
            ));
        }
        match defining_nodes[0].comment_text() {
            Some(t) if marker.is_start(t) => {}
            _ => {
                return Err(Error::InvalidGroup(format!(
                    "first node must be a comment reading '{}'",
                    marker.start_text()
                )))
            }
        }
        match defining_nodes[n - 1].comment_text() {
            Some(t) if marker.is_end(t) => {}
            _ => {
                return Err(Error::InvalidGroup(format!(
                    "last node must be a comment reading '{}'",
                    marker.end_text()
                )))
            }
        }

        Ok(Self {
            name: name.to_string(),
            marker,
            defining_nodes,
            units: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn marker(&self) -> &DelimiterMarker {
        &self.marker
    }

    pub fn defining_nodes(&self) -> &[Node] {
        &self.defining_nodes
    }

    pub fn units(&self) -> &[TemplateUnit] {
        &self.units
    }

    pub fn add_unit(&mut self, unit: TemplateUnit) {
        self.units.push(unit);
    }
}

/// Immutable result of scanning one master document.
///
/// Rebuilding means producing a new `Catalog`; nothing mutates one after the scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Catalog {
    groups: Vec<TemplateGroup>,
}

impl Catalog {
    pub fn new(groups: Vec<TemplateGroup>) -> Self {
        Self { groups }
    }

    pub fn groups(&self) -> &[TemplateGroup] {
        &self.groups
    }

    pub fn group_names(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.name()).collect()
    }

    pub fn unit_count(&self) -> usize {
        self.groups.iter().map(|g| g.units().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.unit_count() == 0
    }

    /// Units in catalog order, paired with their group, optionally limited to one group.
    ///
    /// A blank filter means no restriction.
    pub fn units<'a>(
        &'a self,
        group_filter: Option<&str>,
    ) -> impl Iterator<Item = (&'a TemplateGroup, &'a TemplateUnit)> + 'a {
        let filter = group_filter
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string);
        self.groups
            .iter()
            .filter(move |g| filter.as_deref().map_or(true, |f| g.name() == f))
            .flat_map(|g| g.units().iter().map(move |u| (g, u)))
    }
}
