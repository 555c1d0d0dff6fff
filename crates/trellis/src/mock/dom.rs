//! Arena-backed document tree.

use std::collections::BTreeMap;

use crate::driver::{BoundingBox, ElementFacts, ElementHandle, Interaction};
use crate::result::{TrellisError, TrellisResult};

use super::ElementSpec;

pub(crate) type NodeId = usize;

const HANDLE_PREFIX: &str = "node-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeKind {
    Document,
    Element,
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub kind: NodeKind,
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    pub text: String,
    pub displayed: bool,
    pub enabled: bool,
    pub selected: bool,
    pub bounding_box: Option<BoundingBox>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Frame element hosting a document node
    pub host: Option<NodeId>,
    /// Content document of a frame element
    pub content: Option<NodeId>,
}

impl Node {
    fn document(host: Option<NodeId>) -> Self {
        Self {
            kind: NodeKind::Document,
            tag: "#document".to_string(),
            attributes: BTreeMap::new(),
            text: String::new(),
            displayed: true,
            enabled: true,
            selected: false,
            bounding_box: None,
            parent: None,
            children: Vec::new(),
            host,
            content: None,
        }
    }

    fn element(spec: &ElementSpec, parent: NodeId) -> Self {
        Self {
            kind: NodeKind::Element,
            tag: spec.tag.clone(),
            attributes: spec.attributes.clone(),
            text: spec.text.clone(),
            displayed: spec.displayed,
            enabled: spec.enabled,
            selected: spec.selected,
            bounding_box: spec.bounding_box,
            parent: Some(parent),
            children: Vec::new(),
            host: None,
            content: None,
        }
    }

    pub fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attribute("class")
            .is_some_and(|c| c.split_whitespace().any(|c| c == class))
    }
}

/// Whole fixture state behind the shared lock
#[derive(Debug)]
pub(crate) struct DomState {
    nodes: Vec<Node>,
    frame_stack: Vec<NodeId>,
    interactions: Vec<(ElementHandle, Interaction)>,
}

impl Default for DomState {
    fn default() -> Self {
        Self {
            nodes: vec![Node::document(None)],
            frame_stack: Vec::new(),
            interactions: Vec::new(),
        }
    }
}

pub(crate) fn handle(id: NodeId) -> ElementHandle {
    ElementHandle::new(format!("{HANDLE_PREFIX}{id}"))
}

fn stale(handle: &ElementHandle) -> TrellisError {
    TrellisError::StaleElement {
        handle: handle.id().to_string(),
    }
}

impl DomState {
    // -------------------------------------------------------------------------
    // lookup
    // -------------------------------------------------------------------------

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// Resolve a handle to an attached node
    pub fn resolve(&self, handle: &ElementHandle) -> TrellisResult<NodeId> {
        let id = handle
            .id()
            .strip_prefix(HANDLE_PREFIX)
            .and_then(|n| n.parse::<NodeId>().ok())
            .filter(|id| *id < self.nodes.len())
            .ok_or_else(|| TrellisError::driver(format!("unknown element handle '{handle}'")))?;
        if self.is_attached(id) {
            Ok(id)
        } else {
            Err(stale(handle))
        }
    }

    fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            let node = &self.nodes[current];
            match (node.kind, node.parent, node.host) {
                (NodeKind::Document, _, None) => return true,
                (NodeKind::Document, _, Some(host)) => current = host,
                (NodeKind::Element, Some(parent), _) => current = parent,
                (NodeKind::Element, None, _) => return false,
            }
        }
    }

    /// Document currently in focus
    pub fn current_document(&self) -> NodeId {
        self.frame_stack.last().copied().unwrap_or(0)
    }

    pub fn frame_depth(&self) -> usize {
        self.frame_stack.len()
    }

    pub fn interactions(&self) -> &[(ElementHandle, Interaction)] {
        &self.interactions
    }

    // -------------------------------------------------------------------------
    // traversal
    // -------------------------------------------------------------------------

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    /// Subtree of `id` in document order, excluding `id`
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.nodes[id].children.iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.nodes[next].children.iter().rev().copied());
        }
        out
    }

    /// Siblings after `id`
    pub fn following_siblings(&self, id: NodeId) -> Vec<NodeId> {
        let Some(parent) = self.nodes[id].parent else {
            return Vec::new();
        };
        let siblings = &self.nodes[parent].children;
        siblings
            .iter()
            .position(|s| *s == id)
            .map(|at| siblings[at + 1..].to_vec())
            .unwrap_or_default()
    }

    /// Siblings before `id`, nearest first
    pub fn preceding_siblings(&self, id: NodeId) -> Vec<NodeId> {
        let Some(parent) = self.nodes[id].parent else {
            return Vec::new();
        };
        let siblings = &self.nodes[parent].children;
        siblings
            .iter()
            .position(|s| *s == id)
            .map(|at| siblings[..at].iter().rev().copied().collect())
            .unwrap_or_default()
    }

    fn document_of(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(parent) = self.nodes[current].parent {
            current = parent;
        }
        current
    }

    /// Nodes after `id` in document order, outside its subtree
    pub fn following(&self, id: NodeId) -> Vec<NodeId> {
        let order = self.descendants(self.document_of(id));
        let inside = self.descendants(id);
        order
            .iter()
            .position(|n| *n == id)
            .map(|at| {
                order[at + 1..]
                    .iter()
                    .copied()
                    .filter(|n| !inside.contains(n))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Nodes before `id` in document order, excluding its ancestors, nearest
    /// first
    pub fn preceding(&self, id: NodeId) -> Vec<NodeId> {
        let order = self.descendants(self.document_of(id));
        let mut ancestors = Vec::new();
        let mut current = self.nodes[id].parent;
        while let Some(ancestor) = current {
            ancestors.push(ancestor);
            current = self.nodes[ancestor].parent;
        }
        order
            .iter()
            .position(|n| *n == id)
            .map(|at| {
                order[..at]
                    .iter()
                    .rev()
                    .copied()
                    .filter(|n| !ancestors.contains(n))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Sort and dedupe nodes of one document in document order
    pub fn document_order(&self, mut nodes: Vec<NodeId>) -> Vec<NodeId> {
        let Some(first) = nodes.first() else {
            return nodes;
        };
        let order = self.descendants(self.document_of(*first));
        nodes.sort_by_key(|n| order.iter().position(|o| o == n).unwrap_or(usize::MAX));
        nodes.dedup();
        nodes
    }

    /// Text of the subtree, one space between the element's own text and
    /// each child's text
    pub fn text_content(&self, id: NodeId) -> String {
        let mut text = self.nodes[id].text.clone();
        for child in &self.nodes[id].children {
            let child_text = self.text_content(*child);
            if child_text.is_empty() {
                continue;
            }
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(&child_text);
        }
        text
    }

    fn is_displayed(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current.map(|c| &self.nodes[c]) {
            if !node.is_element() {
                return true;
            }
            if !node.displayed {
                return false;
            }
            current = node.parent;
        }
        true
    }

    pub fn facts(&self, id: NodeId) -> ElementFacts {
        let node = &self.nodes[id];
        let displayed = self.is_displayed(id);
        ElementFacts {
            tag: node.tag.clone(),
            attributes: node.attributes.clone(),
            text: self
                .text_content(id)
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" "),
            displayed,
            enabled: node.enabled,
            selected: node.selected,
            bounding_box: if displayed { node.bounding_box } else { None },
        }
    }

    // -------------------------------------------------------------------------
    // mutation
    // -------------------------------------------------------------------------

    fn build(&mut self, spec: &ElementSpec, parent: NodeId) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node::element(spec, parent));
        for child in &spec.children {
            let child_id = self.build(child, id);
            self.nodes[id].children.push(child_id);
        }
        id
    }

    pub fn append(&mut self, parent: &ElementHandle, spec: &ElementSpec) -> TrellisResult<ElementHandle> {
        let parent = self.resolve(parent)?;
        let id = self.build(spec, parent);
        self.nodes[parent].children.push(id);
        Ok(handle(id))
    }

    pub fn replace(&mut self, old: &ElementHandle, spec: &ElementSpec) -> TrellisResult<ElementHandle> {
        let old = self.resolve(old)?;
        let parent = self.nodes[old]
            .parent
            .ok_or_else(|| TrellisError::driver("cannot replace a document"))?;
        let id = self.build(spec, parent);
        let siblings = &mut self.nodes[parent].children;
        if let Some(at) = siblings.iter().position(|s| *s == old) {
            siblings[at] = id;
        }
        self.nodes[old].parent = None;
        Ok(handle(id))
    }

    pub fn remove(&mut self, target: &ElementHandle) -> TrellisResult<()> {
        let id = self.resolve(target)?;
        if let Some(parent) = self.nodes[id].parent.take() {
            self.nodes[parent].children.retain(|c| *c != id);
        }
        Ok(())
    }

    pub fn update(&mut self, target: &ElementHandle, change: impl FnOnce(&mut Node)) -> TrellisResult<()> {
        let id = self.resolve(target)?;
        change(&mut self.nodes[id]);
        Ok(())
    }

    /// Content document of a frame element, created on first use
    pub fn frame_document(&mut self, frame: &ElementHandle) -> TrellisResult<NodeId> {
        let id = self.resolve(frame)?;
        if !matches!(self.nodes[id].tag.as_str(), "frame" | "iframe") {
            return Err(TrellisError::driver(format!("{frame} is not a frame element")));
        }
        if let Some(content) = self.nodes[id].content {
            return Ok(content);
        }
        let content = self.nodes.len();
        self.nodes.push(Node::document(Some(id)));
        self.nodes[id].content = Some(content);
        Ok(content)
    }

    pub fn enter_frame(&mut self, frame: &ElementHandle) -> TrellisResult<()> {
        let content = self.frame_document(frame)?;
        self.frame_stack.push(content);
        Ok(())
    }

    pub fn exit_frame(&mut self) -> TrellisResult<()> {
        self.frame_stack
            .pop()
            .map(|_| ())
            .ok_or_else(|| TrellisError::driver("already at the top-level document"))
    }

    pub fn perform(&mut self, target: &ElementHandle, interaction: &Interaction) -> TrellisResult<()> {
        let id = self.resolve(target)?;
        if !self.is_displayed(id) || !self.nodes[id].enabled {
            return Err(TrellisError::driver(format!(
                "element {target} is not interactable"
            )));
        }
        let node = &mut self.nodes[id];
        match interaction {
            Interaction::Click | Interaction::DoubleClick => {
                match (node.tag.as_str(), node.attribute("type")) {
                    ("input", Some("checkbox")) => node.selected = !node.selected,
                    ("input", Some("radio")) | ("option", _) => node.selected = true,
                    _ => {}
                }
            }
            Interaction::Clear => {
                node.attributes.insert("value".to_string(), String::new());
            }
            Interaction::TypeText(text) => {
                node.attributes
                    .entry("value".to_string())
                    .or_default()
                    .push_str(text);
            }
        }
        self.interactions.push((target.clone(), interaction.clone()));
        Ok(())
    }
}
