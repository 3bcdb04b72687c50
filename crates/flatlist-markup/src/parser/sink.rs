//! Sink for converting parser events into an owned markup tree.

use crate::node::{Element, MarkupNode};
use crate::parser::event::Event;

/// Converts parser events into a markup fragment.
pub struct Sink {
    events: Vec<Event>,
}

impl Sink {
    /// Create a new sink.
    pub fn new(events: Vec<Event>) -> Self {
        Self { events }
    }

    /// Consume the sink and build the fragment.
    ///
    /// Unbalanced `Close` events are ignored and elements still open at the
    /// end are closed, so the sink never panics on a short event stream.
    pub fn finish(self) -> Vec<MarkupNode> {
        let mut roots: Vec<MarkupNode> = Vec::new();
        let mut stack: Vec<Element> = Vec::new();

        for event in self.events {
            match event {
                Event::Open { name, attrs } => {
                    let mut element = Element::new(name);
                    element.attrs = attrs;
                    stack.push(element);
                }
                Event::Text(text) => {
                    let siblings = match stack.last_mut() {
                        Some(parent) => &mut parent.children,
                        None => &mut roots,
                    };
                    // Adjacent text runs (split by a dropped declaration) merge
                    if let Some(MarkupNode::Text(prev)) = siblings.last_mut() {
                        prev.push_str(&text);
                    } else {
                        siblings.push(MarkupNode::Text(text));
                    }
                }
                Event::Close => {
                    if let Some(done) = stack.pop() {
                        attach(&mut stack, &mut roots, done);
                    }
                }
            }
        }

        while let Some(done) = stack.pop() {
            attach(&mut stack, &mut roots, done);
        }

        roots
    }
}

fn attach(stack: &mut [Element], roots: &mut Vec<MarkupNode>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(MarkupNode::Element(element)),
        None => roots.push(MarkupNode::Element(element)),
    }
}
