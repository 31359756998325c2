//! # Post-Effect System
//!
//! Document-level fixes applied after every accepted change, before the
//! change is recorded and emitted.
//!
//! ## Design
//!
//! Post-effects are:
//! - **Deterministic**: the same document always produces the same fix
//! - **Idempotent**: running an effect on its own output changes nothing
//! - **Position-preserving**: fixes only append, so selections stay valid

use crate::config::EditorConfig;
use folio_schema::{Document, Node, NodeKind};

/// A fix-up run over a document after it changed
pub trait PostEffect: std::fmt::Debug {
    fn name(&self) -> &'static str;

    /// Return the corrected document, or `None` when nothing needs fixing
    fn analyze(&self, doc: &Document) -> Option<Document>;
}

/// Keep an empty paragraph after a trailing non-paragraph block, so the
/// caret can always be placed below an image, video, table or list
#[derive(Debug)]
pub struct TrailingParagraph;

impl PostEffect for TrailingParagraph {
    fn name(&self) -> &'static str {
        "trailingParagraph"
    }

    fn analyze(&self, doc: &Document) -> Option<Document> {
        let last = doc.blocks().last()?;
        if last.kind == NodeKind::Paragraph {
            return None;
        }
        let mut blocks = doc.blocks().to_vec();
        blocks.push(Node::paragraph(Vec::new()));
        Some(Document::new(blocks))
    }
}

/// Post-effect engine that applies all registered effects
#[derive(Debug, Default)]
pub struct PostEffectEngine {
    effects: Vec<Box<dyn PostEffect>>,
}

impl PostEffectEngine {
    /// Engine with the effects enabled in `config`
    pub fn new(config: &EditorConfig) -> Self {
        let mut engine = Self::default();
        if config.trailing_paragraph {
            engine.register(Box::new(TrailingParagraph));
        }
        engine
    }

    pub fn register(&mut self, effect: Box<dyn PostEffect>) {
        self.effects.push(effect);
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Run every effect in order; returns the fixed document and the names
    /// of the effects that changed something
    pub fn apply(&self, mut doc: Document) -> (Document, Vec<&'static str>) {
        let mut applied = Vec::new();
        for effect in &self.effects {
            if let Some(fixed) = effect.analyze(&doc) {
                doc = fixed;
                applied.push(effect.name());
            }
        }
        (doc, applied)
    }
}
