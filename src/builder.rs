//! Event-driven graph construction.
//!
//! [`GraphBuilder`] consumes a stream of start/end [`Event`]s and
//! maintains a stack of open nodes. A start event resolves the tag through
//! the registry and coerces attributes; the matching end event finalizes
//! the node and folds it into its parent. The first node to close with no
//! parent is the root.

use std::path::{Path, PathBuf};

use log::{debug, trace};

use crate::error::{GraphError, Result};
use crate::images::{ImageHandle, ImageLoader, ImageRequest};
use crate::nodes::{Node, NodeKind};
use crate::schema::RawAttributes;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Start,
    End,
}

/// One structural event from an event source.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    pub tag: String,
    /// Raw attributes; only meaningful on start events.
    pub attributes: RawAttributes,
    /// Accumulated text content; only meaningful on end events.
    pub text: Option<String>,
}

impl Event {
    pub fn start(tag: impl Into<String>, attributes: RawAttributes) -> Self {
        Self {
            kind: EventKind::Start,
            tag: tag.into(),
            attributes,
            text: None,
        }
    }

    pub fn end(tag: impl Into<String>, text: Option<String>) -> Self {
        Self {
            kind: EventKind::End,
            tag: tag.into(),
            attributes: RawAttributes::new(),
            text,
        }
    }
}

/// An open node and the tag it was opened with.
#[derive(Debug)]
pub(crate) struct OpenNode {
    node: Node,
    tag: String,
}

/// What a node may see of the parse while it starts or finishes.
pub struct ParseContext<'a> {
    stack: &'a [OpenNode],
    images: &'a dyn ImageLoader,
    base_dir: &'a Path,
}

impl<'a> ParseContext<'a> {
    /// The innermost open ancestor.
    pub fn parent(&self) -> Option<&'a Node> {
        self.stack.last().map(|open| &open.node)
    }

    /// Open ancestors, innermost first.
    pub fn ancestors(&self) -> impl Iterator<Item = &'a Node> {
        self.stack.iter().rev().map(|open| &open.node)
    }

    /// Directory relative paths in the document resolve against.
    pub fn base_dir(&self) -> &'a Path {
        self.base_dir
    }

    pub fn resolve_path(&self, relative: &str) -> PathBuf {
        self.base_dir.join(relative)
    }

    pub fn load_image(&self, request: &ImageRequest) -> Result<ImageHandle> {
        trace!("loading image {}", request.path.display());
        self.images.load(request)
    }
}

/// Stack machine turning events into a single rooted [`Node`].
pub struct GraphBuilder<'a> {
    images: &'a dyn ImageLoader,
    base_dir: PathBuf,
    stack: Vec<OpenNode>,
    root: Option<Node>,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(images: &'a dyn ImageLoader, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            images,
            base_dir: base_dir.into(),
            stack: Vec::new(),
            root: None,
        }
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Feed one event.
    pub fn push(&mut self, event: Event) -> Result<()> {
        match event.kind {
            EventKind::Start => self.start(event.tag, &event.attributes),
            EventKind::End => self.end(&event.tag, event.text.as_deref()),
        }
    }

    fn start(&mut self, tag: String, raw: &RawAttributes) -> Result<()> {
        if self.root.is_some() {
            return Err(GraphError::document(format!(
                "<{}> appears after the root element closed",
                tag
            )));
        }

        let kind = NodeKind::resolve(&tag)?;
        trace!("start <{}> at depth {}", tag, self.stack.len());

        let mut node = Node::new(kind);
        node.start(raw, &self.context())?;
        self.stack.push(OpenNode { node, tag });
        Ok(())
    }

    fn end(&mut self, tag: &str, text: Option<&str>) -> Result<()> {
        let OpenNode { mut node, tag: open_tag } = self
            .stack
            .pop()
            .ok_or_else(|| GraphError::document(format!("</{}> closes nothing", tag)))?;

        if !open_tag.eq_ignore_ascii_case(tag) {
            return Err(GraphError::document(format!(
                "</{}> does not match open <{}>",
                tag, open_tag
            )));
        }

        node.finish(text, &self.context())?;
        debug!("finished <{}>", open_tag);

        match self.stack.last_mut() {
            Some(parent) => parent.node.combine(node, &open_tag),
            None => {
                self.root = Some(node);
                Ok(())
            }
        }
    }

    fn context(&self) -> ParseContext<'_> {
        ParseContext {
            stack: &self.stack,
            images: self.images,
            base_dir: &self.base_dir,
        }
    }

    /// End of stream: return the root.
    pub fn finish(self) -> Result<Node> {
        if let Some(open) = self.stack.last() {
            return Err(GraphError::document(format!(
                "stream ended with <{}> still open",
                open.tag
            )));
        }
        self.root
            .ok_or_else(|| GraphError::document("stream contained no elements"))
    }

    /// Drive the builder over a whole event stream.
    pub fn build<I>(mut self, events: I) -> Result<Node>
    where
        I: IntoIterator<Item = Result<Event>>,
    {
        for event in events {
            self.push(event?)?;
        }
        self.finish()
    }
}
