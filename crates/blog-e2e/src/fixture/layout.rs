//! Rendering rules and a flow box model for fixture documents.
//!
//! Blocks stack vertically at the full available width; inline elements
//! and text flow left to right in rows separated by [`INLINE_GAP`] and wrap
//! when a row is full. Text is [`CHAR_WIDTH`] pixels per character on
//! [`LINE_HEIGHT`] pixel lines. Links, buttons and inputs are at least
//! [`MIN_TARGET`] pixels in both directions.

use std::collections::HashMap;

use crate::driver::{BoundingBox, Viewport};

use super::dom::{Document, NodeId};

/// Average glyph advance
pub const CHAR_WIDTH: f64 = 8.0;
/// Line box height
pub const LINE_HEIGHT: f64 = 24.0;
/// Horizontal gap between inline boxes
pub const INLINE_GAP: f64 = 8.0;
/// Minimum size of interactive targets
pub const MIN_TARGET: f64 = 44.0;
/// `.container` max width
pub const CONTAINER_MAX: f64 = 1200.0;
/// `.container` horizontal padding, both sides together
pub const CONTAINER_GUTTER: f64 = 32.0;
/// Default input width
pub const INPUT_WIDTH: f64 = 200.0;

const NEVER_RENDERED: &[&str] = &["head", "meta", "title", "script", "style", "link"];
const INLINE: &[&str] = &[
    "a", "span", "strong", "em", "b", "i", "small", "img", "code", "button", "input", "label",
];

/// Whether the element generates a box at all (its own `display`)
#[must_use]
pub fn is_displayed(doc: &Document, node: NodeId, viewport: Viewport) -> bool {
    if !doc.is_element(node) || NEVER_RENDERED.contains(&doc.tag(node)) {
        return false;
    }
    if doc.attr(node, "hidden").is_some() {
        return false;
    }
    let mobile = viewport.is_mobile();
    if doc.has_class(node, "mobile-menu-button") && !mobile {
        return false;
    }
    if doc.has_class(node, "nav-desktop") && mobile {
        return false;
    }
    if doc.has_class(node, "mobile-menu") && !(mobile && doc.has_class(node, "mobile-menu-open")) {
        return false;
    }
    true
}

fn is_inline(doc: &Document, node: NodeId) -> bool {
    let tag = doc.tag(node);
    if tag == "code" {
        return doc.parent(node).map_or(true, |p| doc.tag(p) != "pre");
    }
    INLINE.contains(&tag)
}

fn text_width(text: &str) -> f64 {
    text.chars().count() as f64 * CHAR_WIDTH
}

fn attr_px(doc: &Document, node: NodeId, name: &str) -> Option<f64> {
    doc.attr(node, name).and_then(|v| v.parse::<f64>().ok())
}

/// Boxes of every rendered element of a document
#[derive(Debug, Clone, Default)]
pub struct Layout {
    boxes: HashMap<NodeId, BoundingBox>,
}

impl Layout {
    /// Lay out `doc` at `viewport`
    #[must_use]
    pub fn compute(doc: &Document, viewport: Viewport) -> Self {
        let mut engine = Engine {
            doc,
            viewport,
            boxes: HashMap::new(),
        };
        let root = doc.root();
        if is_displayed(doc, root, viewport) {
            engine.block(root, 0.0, 0.0, f64::from(viewport.width));
        }
        Self {
            boxes: engine.boxes,
        }
    }

    /// Box of a rendered element
    #[must_use]
    pub fn bounding_box(&self, node: NodeId) -> Option<BoundingBox> {
        self.boxes.get(&node).copied()
    }

    /// Rendered with a non-empty box
    #[must_use]
    pub fn is_visible(&self, node: NodeId) -> bool {
        self.boxes
            .get(&node)
            .is_some_and(|b| b.width > 0.0 && b.height > 0.0)
    }
}

struct Engine<'a> {
    doc: &'a Document,
    viewport: Viewport,
    boxes: HashMap<NodeId, BoundingBox>,
}

/// Inline row being filled
#[derive(Default)]
struct Row {
    x: f64,
    height: f64,
}

impl Engine<'_> {
    fn record(&mut self, node: NodeId, x: f64, y: f64, width: f64, height: f64) {
        self.boxes.insert(node, BoundingBox::new(x, y, width, height));
    }

    /// Lay out a block-level element; returns its height
    fn block(&mut self, node: NodeId, x: f64, y: f64, avail: f64) -> f64 {
        let doc = self.doc;
        let (x, width) = if doc.has_class(node, "container") {
            let width = (avail.min(CONTAINER_MAX) - CONTAINER_GUTTER).max(0.0);
            (x + (avail - width) / 2.0, width)
        } else {
            (x, avail)
        };

        let height = match doc.tag(node) {
            "tr" => self.table_row(node, x, y, width),
            "pre" => {
                let text = doc.text_content(node);
                let lines = text.lines().count().max(1) as f64;
                for &child in doc.children(node) {
                    if is_displayed(doc, child, self.viewport) {
                        self.record(child, x, y + 8.0, width, lines * LINE_HEIGHT);
                    }
                }
                lines * LINE_HEIGHT + 16.0
            }
            _ => self.flow(node, x, y, width).1,
        };
        self.record(node, x, y, width, height);
        height
    }

    fn table_row(&mut self, node: NodeId, x: f64, y: f64, width: f64) -> f64 {
        let doc = self.doc;
        let cells: Vec<NodeId> = doc
            .children(node)
            .iter()
            .copied()
            .filter(|&c| is_displayed(doc, c, self.viewport))
            .collect();
        if cells.is_empty() {
            return 0.0;
        }
        let cell_width = width / cells.len() as f64;
        let mut height: f64 = 0.0;
        for (i, &cell) in cells.iter().enumerate() {
            height = height.max(self.block(cell, x + i as f64 * cell_width, y, cell_width));
        }
        height
    }

    /// Lay out the children of `node` in normal flow inside `avail`.
    /// Returns the used width and the total height.
    fn flow(&mut self, node: NodeId, x: f64, y: f64, avail: f64) -> (f64, f64) {
        let doc = self.doc;
        let mut cursor_y = y;
        let mut used: f64 = 0.0;
        let mut row = Row::default();

        let finish_row = |row: &mut Row, cursor_y: &mut f64| {
            *cursor_y += row.height;
            *row = Row::default();
        };

        for &child in doc.children(node) {
            if let Some(text) = doc.own_text(child) {
                if text.trim().is_empty() {
                    continue;
                }
                let width = text_width(text);
                if width > avail {
                    finish_row(&mut row, &mut cursor_y);
                    let lines = (width / avail.max(CHAR_WIDTH)).ceil();
                    cursor_y += lines * LINE_HEIGHT;
                    used = used.max(avail);
                } else {
                    let start = self.place_in_row(&mut row, &mut cursor_y, width, avail);
                    row.x = start + width;
                    row.height = row.height.max(LINE_HEIGHT);
                    used = used.max(row.x);
                }
                continue;
            }
            if !is_displayed(doc, child, self.viewport) {
                continue;
            }
            if is_inline(doc, child) {
                let (width, _) = self.inline(child, 0.0, 0.0, avail);
                let start = self.place_in_row(&mut row, &mut cursor_y, width, avail);
                let (width, height) = self.inline(child, x + start, cursor_y, avail);
                row.x = start + width;
                row.height = row.height.max(height);
                used = used.max(row.x);
            } else {
                finish_row(&mut row, &mut cursor_y);
                cursor_y += self.block(child, x, cursor_y, avail);
                used = used.max(avail);
            }
        }
        finish_row(&mut row, &mut cursor_y);
        (used, cursor_y - y)
    }

    /// Start offset for an inline box of `width`, wrapping the row when full
    fn place_in_row(&self, row: &mut Row, cursor_y: &mut f64, width: f64, avail: f64) -> f64 {
        if row.x == 0.0 {
            return 0.0;
        }
        let start = row.x + INLINE_GAP;
        if start + width > avail {
            *cursor_y += row.height;
            *row = Row::default();
            0.0
        } else {
            start
        }
    }

    /// Lay out an inline element at (x, y); returns its size
    fn inline(&mut self, node: NodeId, x: f64, y: f64, avail: f64) -> (f64, f64) {
        let doc = self.doc;
        let (width, height) = match doc.tag(node) {
            "img" => {
                let width = attr_px(doc, node, "width").unwrap_or(16.0).min(avail);
                let height = attr_px(doc, node, "height").unwrap_or(16.0);
                (width, height)
            }
            "input" => (INPUT_WIDTH.min(avail), MIN_TARGET),
            tag => {
                let (content_w, content_h) = self.flow(node, x, y, avail);
                if matches!(tag, "a" | "button") {
                    (
                        content_w.max(MIN_TARGET).min(avail.max(MIN_TARGET)),
                        content_h.max(MIN_TARGET),
                    )
                } else {
                    (content_w, content_h)
                }
            }
        };
        self.record(node, x, y, width, height);
        (width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::dom::el;

    fn page() -> Document {
        Document::from_tree(
            el("html")
                .child(el("head").child(el("title").text("t")))
                .child(
                    el("body")
                        .child(
                            el("header").class("container").child(
                                el("nav")
                                    .child(
                                        el("a")
                                            .class("brand-link")
                                            .attr("href", "/")
                                            .child(
                                                el("img")
                                                    .attr("width", "32")
                                                    .attr("height", "32"),
                                            )
                                            .child(el("strong").text("Willian Nguyen")),
                                    )
                                    .child(el("div").class("nav-desktop").text("links"))
                                    .child(el("button").class("mobile-menu-button"))
                                    .child(
                                        el("div")
                                            .class("mobile-menu")
                                            .child(el("div").class("mobile-menu-content").text("m")),
                                    ),
                            ),
                        )
                        .child(
                            el("main").class("container").child(el("p").text(
                                "I am a curious learner with a genuine love for new technologies.",
                            )),
                        )
                        .child(el("div").class("empty")),
                ),
        )
    }

    #[test]
    fn test_head_is_not_rendered() {
        let doc = page();
        let layout = Layout::compute(&doc, Viewport::DESKTOP);
        let title = doc.find_by_tag("title").unwrap();
        assert!(!layout.is_visible(title));
        assert!(layout.bounding_box(title).is_none());
    }

    #[test]
    fn test_breakpoint_visibility() {
        let doc = page();
        let button = doc.find_by_class("mobile-menu-button").unwrap();
        let desktop = doc.find_by_class("nav-desktop").unwrap();

        let wide = Layout::compute(&doc, Viewport::DESKTOP);
        assert!(!wide.is_visible(button));
        assert!(wide.is_visible(desktop));

        let narrow = Layout::compute(&doc, Viewport::MOBILE);
        assert!(narrow.is_visible(button));
        assert!(!narrow.is_visible(desktop));
    }

    #[test]
    fn test_mobile_menu_needs_open_class() {
        let mut doc = page();
        let menu = doc.find_by_class("mobile-menu").unwrap();
        let content = doc.find_by_class("mobile-menu-content").unwrap();
        assert!(!Layout::compute(&doc, Viewport::MOBILE).is_visible(content));
        doc.set_class(menu, "mobile-menu-open", true);
        assert!(Layout::compute(&doc, Viewport::MOBILE).is_visible(content));
        assert!(!Layout::compute(&doc, Viewport::DESKTOP).is_visible(content));
    }

    #[test]
    fn test_container_width_and_centering() {
        let doc = page();
        let main = doc.find_by_tag("main").unwrap();
        let b = Layout::compute(&doc, Viewport::MOBILE).bounding_box(main).unwrap();
        assert_eq!(b.width, 375.0 - CONTAINER_GUTTER);
        assert_eq!(b.x, 16.0);

        let b = Layout::compute(&doc, Viewport::new(1440, 900))
            .bounding_box(main)
            .unwrap();
        assert_eq!(b.width, CONTAINER_MAX - CONTAINER_GUTTER);
        assert_eq!(b.x, (1440.0 - b.width) / 2.0);
    }

    #[test]
    fn test_text_wraps_inside_container() {
        let doc = page();
        let p = doc.find_by_tag("p").unwrap();
        let layout = Layout::compute(&doc, Viewport::MOBILE_SMALL);
        let b = layout.bounding_box(p).unwrap();
        assert!(b.width <= 320.0);
        assert!(b.height > LINE_HEIGHT);
    }

    #[test]
    fn test_empty_block_is_invisible() {
        let doc = page();
        let empty = doc.find_by_class("empty").unwrap();
        let layout = Layout::compute(&doc, Viewport::DESKTOP);
        assert!(layout.bounding_box(empty).is_some());
        assert!(!layout.is_visible(empty));
    }

    #[test]
    fn test_links_meet_minimum_target_size() {
        let doc = page();
        let brand = doc.find_by_class("brand-link").unwrap();
        let img = doc.find_by_tag("img").unwrap();
        let layout = Layout::compute(&doc, Viewport::MOBILE);
        let b = layout.bounding_box(brand).unwrap();
        assert!(b.width >= MIN_TARGET && b.height >= MIN_TARGET);
        let i = layout.bounding_box(img).unwrap();
        assert_eq!((i.width, i.height), (32.0, 32.0));
        assert!(i.x >= b.x);
    }
}
