//! # Interaction Plugins
//!
//! Pointer events pass through an [`InteractionLayer`] before they become
//! caret moves. The layer maps the click to a document position through the
//! view's [`PositionMapper`], looks at the node there and offers it to each
//! registered plugin in order. The first plugin that matches consumes the
//! click. Plugins never touch the document; they report `(node, position)`
//! to the host, which dispatches its own commands.

use folio_schema::{Attrs, Document, Node, NodeKind};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x < self.x + self.width
            && point.y >= self.y
            && point.y < self.y + self.height
    }
}

/// Result of mapping screen coordinates to the document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionHit {
    /// Closest caret position
    pub pos: usize,
    /// Position directly before the innermost node under the point, if any
    pub inside: Option<usize>,
}

/// The view's coordinate to position mapping
pub trait PositionMapper {
    fn pos_at_coords(&self, point: Point) -> Option<PositionHit>;
}

/// A table of rendered boxes, each tagged with the position before its
/// node. Later boxes are drawn on top. Meant for headless hosts and tests.
#[derive(Debug, Clone, Default)]
pub struct LayoutBoxes {
    boxes: Vec<(Rect, usize)>,
}

impl LayoutBoxes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, rect: Rect, node_pos: usize) -> &mut Self {
        self.boxes.push((rect, node_pos));
        self
    }

    /// Top-level blocks stacked vertically, one row of `row_height` each
    pub fn stacked(doc: &Document, width: f64, row_height: f64) -> Self {
        let mut layout = Self::new();
        let mut pos = 0;
        for (i, block) in doc.blocks().iter().enumerate() {
            let rect = Rect::new(0.0, i as f64 * row_height, width, row_height);
            layout.add(rect, pos);
            pos += block.node_size();
        }
        layout
    }
}

impl PositionMapper for LayoutBoxes {
    fn pos_at_coords(&self, point: Point) -> Option<PositionHit> {
        let (_, pos) = self.boxes.iter().rev().find(|(rect, _)| rect.contains(point))?;
        Some(PositionHit {
            pos: *pos,
            inside: Some(*pos),
        })
    }
}

/// A composable pointer-event interceptor
pub trait InteractionPlugin {
    fn name(&self) -> &str;

    /// Whether this plugin wants clicks on `node`
    fn matches(&self, node: &Node) -> bool;

    /// Handle a click on a matching node at `position`
    fn on_match(&mut self, node: &Node, position: usize);
}

pub type NodeClickCallback = Box<dyn FnMut(NodeKind, &Attrs, usize)>;

/// Adapts a single `on_node_click(kind, attrs, position)` callback
pub struct NodeClickPlugin {
    kinds: Vec<NodeKind>,
    callback: NodeClickCallback,
}

impl NodeClickPlugin {
    pub fn new(kinds: Vec<NodeKind>, callback: impl FnMut(NodeKind, &Attrs, usize) + 'static) -> Self {
        Self {
            kinds,
            callback: Box::new(callback),
        }
    }

    /// Intercept clicks on images only
    pub fn images(callback: impl FnMut(NodeKind, &Attrs, usize) + 'static) -> Self {
        Self::new(vec![NodeKind::Image], callback)
    }
}

impl InteractionPlugin for NodeClickPlugin {
    fn name(&self) -> &str {
        "nodeClick"
    }

    fn matches(&self, node: &Node) -> bool {
        self.kinds.contains(&node.kind)
    }

    fn on_match(&mut self, node: &Node, position: usize) {
        (self.callback)(node.kind, &node.attrs, position);
    }
}

/// What became of a click
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// A plugin consumed the click; the caret stays where it was
    Handled { plugin: String, position: usize },
    /// Nothing intercepted it; the caret should move here
    Caret(usize),
    /// The point is outside the document
    Miss,
}

#[derive(Default)]
pub struct InteractionLayer {
    plugins: Vec<Box<dyn InteractionPlugin>>,
}

impl InteractionLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, plugin: Box<dyn InteractionPlugin>) {
        self.plugins.push(plugin);
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Resolve a click against `doc`
    pub fn click(&mut self, doc: &Document, mapper: &dyn PositionMapper, point: Point) -> ClickOutcome {
        let Some(hit) = mapper.pos_at_coords(point) else {
            return ClickOutcome::Miss;
        };

        let target = hit
            .inside
            .and_then(|pos| doc.node_at(pos).map(|node| (pos, node)))
            .or_else(|| doc.node_at(hit.pos).map(|node| (hit.pos, node)));

        if let Some((position, node)) = target {
            if let Some(plugin) = self.plugins.iter_mut().find(|p| p.matches(node)) {
                debug!(plugin = plugin.name(), position, kind = %node.kind, "click intercepted");
                plugin.on_match(node, position);
                return ClickOutcome::Handled {
                    plugin: plugin.name().to_string(),
                    position,
                };
            }
        }

        ClickOutcome::Caret(hit.pos)
    }
}

impl std::fmt::Debug for InteractionLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.plugins.iter().map(|p| p.name()).collect();
        f.debug_struct("InteractionLayer")
            .field("plugins", &names)
            .finish()
    }
}
