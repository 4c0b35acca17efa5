//! Marker-driven catalog scanner.
//!
//! A master document has no index: groups and templates are recovered from the order of
//! marker comments, spacer rows and content rows inside a container. The scanner reads the
//! container's children once, left to right, and never backtracks.
//!
//! ```text
//! <!-- TEMPLATE GROUP TITLE START -->
//! <!-- MARK HEADERS -->
//! <tr><td><table>..Greeting..</table></td></tr>
//! <!-- TEMPLATE GROUP TITLE END -->
//! <!-- TEMPLATE SPACER START -->      (spacer containers only)
//! <tr>&nbsp;</tr> <tr>Hi</tr> <tr>&nbsp;</tr>
//! <!-- TEMPLATE SPACER END -->
//! <!-- HI START -->
//! <tr>..content..</tr>
//! <!-- HI END -->
//! ```
//!
//! Incomplete or malformed blocks are dropped and scanning carries on.

use crate::catalog::{TemplateGroup, TemplateUnit};
use crate::marker::{self, GROUP_LABEL, MARK_HEADERS, SPACER_LABEL};
use crate::node::Node;
use tracing::{debug, warn};

/// Whether each template in a container is preceded by a spacer block carrying its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpacerPolicy {
    Expected,
    Absent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    SeekingGroup,
    AccumulatingGroupHeader,
    AwaitingNextBlock,
    AccumulatingTemplate,
}

#[derive(Debug, Default)]
struct HeaderProgress {
    start_seen: bool,
    end_seen: bool,
    name: String,
}

#[derive(Debug, Default)]
struct SpacerProgress {
    start_seen: bool,
    end_seen: bool,
    next_name: String,
}

impl SpacerProgress {
    fn ready(&self) -> bool {
        self.start_seen && self.end_seen && !self.next_name.is_empty()
    }
}

#[derive(Debug, Default)]
struct UnitProgress {
    start_label: Option<String>,
    end_label: Option<String>,
    content_seen: bool,
}

fn is_group_start(text: &str) -> bool {
    marker::strip_start(text) == Some(GROUP_LABEL)
}

fn is_spacer_start(text: &str) -> bool {
    marker::strip_start(text) == Some(SPACER_LABEL)
}

fn is_spacer_end(text: &str) -> bool {
    marker::strip_end(text) == Some(SPACER_LABEL)
}

/// Scan one container's children into template groups.
pub fn scan_container(nodes: &[Node], policy: SpacerPolicy) -> Vec<TemplateGroup> {
    let mut scanner = CatalogScanner::new(policy);
    for node in nodes {
        scanner.feed(node);
    }
    scanner.finish()
}

#[derive(Debug)]
pub struct CatalogScanner {
    policy: SpacerPolicy,
    state: ScanState,
    buffer: Vec<Node>,
    header: HeaderProgress,
    spacer: SpacerProgress,
    unit: UnitProgress,
    skip_next_row: bool,
    group: Option<TemplateGroup>,
    groups: Vec<TemplateGroup>,
}

impl CatalogScanner {
    pub fn new(policy: SpacerPolicy) -> Self {
        Self {
            policy,
            state: ScanState::SeekingGroup,
            buffer: Vec::new(),
            header: HeaderProgress::default(),
            spacer: SpacerProgress::default(),
            unit: UnitProgress::default(),
            skip_next_row: false,
            group: None,
            groups: Vec::new(),
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn feed(&mut self, node: &Node) {
        if node.is_blank_text() {
            return;
        }
        if let Some(text) = node.comment_text() {
            if marker::is_dummy_spacing(text) {
                self.skip_next_row = true;
                return;
            }
        }
        if self.skip_next_row {
            if let Node::Element(section) = node {
                if section.is_row() {
                    self.skip_next_row = false;
                    return;
                }
            }
        }
        if node.comment_text().is_some_and(is_group_start) {
            self.begin_group();
        }

        match self.state {
            ScanState::SeekingGroup => {}
            ScanState::AccumulatingGroupHeader => self.read_header(node),
            ScanState::AwaitingNextBlock => self.read_spacer(node),
            ScanState::AccumulatingTemplate => self.read_template(node),
        }
    }

    pub fn finish(mut self) -> Vec<TemplateGroup> {
        self.close_group();
        self.groups
    }

    fn begin_group(&mut self) {
        if self.state == ScanState::AccumulatingTemplate && self.unit.start_label.is_some() {
            debug!(
                label = self.unit.start_label.as_deref().unwrap_or(""),
                "dropping unfinished template at group start"
            );
        }
        if self.state == ScanState::AccumulatingGroupHeader {
            debug!("group START repeated before header completed; restarting header");
        }
        self.close_group();
        self.buffer.clear();
        self.header = HeaderProgress::default();
        self.spacer = SpacerProgress::default();
        self.unit = UnitProgress::default();
        self.state = ScanState::AccumulatingGroupHeader;
    }

    fn close_group(&mut self) {
        if let Some(group) = self.group.take() {
            if group.units().is_empty() {
                debug!(group = group.name(), "group has no templates; not catalogued");
            } else {
                self.groups.push(group);
            }
        }
    }

    fn enter_next_block(&mut self) {
        self.buffer.clear();
        self.spacer = SpacerProgress::default();
        self.unit = UnitProgress::default();
        self.state = match self.policy {
            SpacerPolicy::Expected => ScanState::AwaitingNextBlock,
            SpacerPolicy::Absent => ScanState::AccumulatingTemplate,
        };
    }

    fn read_header(&mut self, node: &Node) {
        match node {
            Node::Comment(raw) => {
                let text = raw.trim();
                if text == MARK_HEADERS {
                    self.buffer.push(node.clone());
                } else if let Some(label) = marker::strip_start(text) {
                    if label == GROUP_LABEL {
                        self.header.start_seen = true;
                        self.buffer.push(node.clone());
                    }
                } else if let Some(label) = marker::strip_end(text) {
                    if label == GROUP_LABEL {
                        self.header.end_seen = true;
                        self.buffer.push(node.clone());
                    }
                }
            }
            Node::Element(section) => {
                if section.is_row() {
                    if let Some(caption) = section.caption() {
                        self.header.name = caption.to_string();
                        self.buffer.push(node.clone());
                    }
                }
            }
            Node::Text(_) => {}
        }

        if !(self.header.start_seen && self.header.end_seen && !self.header.name.is_empty()) {
            return;
        }
        let name = std::mem::take(&mut self.header.name);
        let nodes = std::mem::take(&mut self.buffer);
        self.header = HeaderProgress::default();
        match TemplateGroup::new(&name, nodes, None) {
            Ok(group) => {
                debug!(group = %name, "group header complete");
                self.group = Some(group);
                self.enter_next_block();
            }
            Err(e) => {
                warn!(group = %name, error = %e, "dropping malformed group header");
                self.state = ScanState::SeekingGroup;
            }
        }
    }

    fn read_spacer(&mut self, node: &Node) {
        match node {
            Node::Comment(raw) => {
                let text = raw.trim();
                if is_spacer_start(text) {
                    self.spacer.start_seen = true;
                    return;
                }
                if is_spacer_end(text) {
                    self.spacer.end_seen = true;
                }
            }
            Node::Element(section) if self.spacer.start_seen && section.is_row() => {
                if section.plain_text.is_empty() {
                    return;
                }
                if self.spacer.next_name.is_empty() {
                    self.spacer.next_name = section.plain_text.clone();
                }
            }
            Node::Element(_) | Node::Text(_) => {}
        }

        if self.spacer.ready() {
            self.buffer.clear();
            self.state = ScanState::AccumulatingTemplate;
        }
    }

    fn read_template(&mut self, node: &Node) {
        match node {
            Node::Comment(raw) => {
                let text = raw.trim();
                if self.policy == SpacerPolicy::Expected && is_spacer_start(text) {
                    if let Some(label) = self.unit.start_label.as_deref() {
                        debug!(label, "abandoning unfinished template at next spacer block");
                    }
                    self.enter_next_block();
                    self.spacer.start_seen = true;
                    return;
                }
                if let Some(label) = marker::strip_start(text) {
                    self.buffer.clear();
                    self.buffer.push(node.clone());
                    self.unit = UnitProgress {
                        start_label: Some(label.to_string()),
                        ..UnitProgress::default()
                    };
                } else if let Some(label) = marker::strip_end(text) {
                    self.unit.end_label = Some(label.to_string());
                    self.buffer.push(node.clone());
                }
            }
            Node::Element(section) => {
                if section.is_row() {
                    self.unit.content_seen = true;
                    self.buffer.push(node.clone());
                }
            }
            Node::Text(_) => {}
        }

        self.try_complete_unit();
    }

    fn try_complete_unit(&mut self) {
        let label = match (&self.unit.start_label, &self.unit.end_label) {
            (Some(start), Some(end)) if self.unit.content_seen && start == end && !start.is_empty() => {
                start.clone()
            }
            _ => return,
        };
        let name = match self.policy {
            SpacerPolicy::Expected if !self.spacer.next_name.is_empty() => {
                self.spacer.next_name.clone()
            }
            _ => label.clone(),
        };
        let nodes = std::mem::take(&mut self.buffer);

        match TemplateUnit::new(&name, &label, nodes) {
            Ok(unit) => {
                if let Some(group) = self.group.as_mut() {
                    debug!(group = group.name(), template = %name, "template complete");
                    group.add_unit(unit);
                }
            }
            Err(e) => warn!(template = %name, error = %e, "dropping malformed template"),
        }
        self.enter_next_block();
    }
}
