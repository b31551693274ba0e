//! Paint commands produced from the card layout

use std::fmt;

use crate::assets::AssetSet;
use crate::rendering::compose::TicketView;
use crate::rendering::font::Weight;
use crate::rendering::layout::{layout_ticket, ElementType, LayoutNode, Rect};

pub type Rgba = (u8, u8, u8, u8);

pub const WHITE: Rgba = (255, 255, 255, 255);
pub const RED_600: Rgba = (220, 38, 38, 255);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSlot {
    Background,
    Logo,
}

/// A piece of a text line drawn with one weight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSpan {
    pub text: String,
    pub weight: Weight,
}

impl TextSpan {
    fn new(text: impl Into<String>, weight: Weight) -> Self {
        Self {
            text: text.into(),
            weight,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PaintCommand {
    SolidRect {
        rect: Rect,
        radius: u32,
        rgba: Rgba,
    },
    /// Draw an asset. `cover` crops to fill `rect`; otherwise it is stretched.
    Image {
        rect: Rect,
        slot: ImageSlot,
        radius: u32,
        cover: bool,
    },
    /// Spans laid out side by side, centered as a group in `line`.
    Text {
        line: Rect,
        spans: Vec<TextSpan>,
        size: u32,
        rgba: Rgba,
        clip: Rect,
    },
}

fn fmt_rect(f: &mut fmt::Formatter<'_>, r: &Rect) -> fmt::Result {
    write!(f, "{},{} {}x{}", r.x, r.y, r.width, r.height)
}

fn fmt_rgba(f: &mut fmt::Formatter<'_>, c: &Rgba) -> fmt::Result {
    write!(f, "#{:02x}{:02x}{:02x}{:02x}", c.0, c.1, c.2, c.3)
}

/// One line per command; used for display-list goldens and debug logs.
impl fmt::Display for PaintCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaintCommand::SolidRect { rect, radius, rgba } => {
                write!(f, "fill ")?;
                fmt_rect(f, rect)?;
                write!(f, " r{} ", radius)?;
                fmt_rgba(f, rgba)
            }
            PaintCommand::Image {
                rect,
                slot,
                radius,
                cover,
            } => {
                write!(f, "image {:?} ", slot)?;
                fmt_rect(f, rect)?;
                write!(f, " r{} {}", radius, if *cover { "cover" } else { "stretch" })
            }
            PaintCommand::Text {
                line,
                spans,
                size,
                rgba,
                clip,
            } => {
                write!(f, "text ")?;
                fmt_rect(f, line)?;
                write!(f, " {}px ", size)?;
                fmt_rgba(f, rgba)?;
                write!(f, " clip ")?;
                fmt_rect(f, clip)?;
                for span in spans {
                    let weight = match span.weight {
                        Weight::Regular => "regular",
                        Weight::Bold => "bold",
                    };
                    write!(f, " [{} \"{}\"]", weight, span.text)?;
                }
                Ok(())
            }
        }
    }
}

/// Split a footer line so its last word can be emphasised.
fn split_footer(text: &str) -> (&str, &str) {
    match text.trim_end().rfind(' ') {
        Some(idx) => text.split_at(idx + 1),
        None => ("", text),
    }
}

/// Turn layout nodes into an ordered display list (painter's algorithm).
///
/// Image commands are only emitted for assets that are present in `assets`.
pub fn build_display_list(nodes: &[LayoutNode], assets: &AssetSet) -> Vec<PaintCommand> {
    let mut cmds = Vec::new();

    for node in nodes {
        let rect = node.lb.rect;
        let radius = node.lb.corner_radius();
        match node.elem_type {
            ElementType::Card => {
                if assets.background.is_some() {
                    cmds.push(PaintCommand::Image {
                        rect,
                        slot: ImageSlot::Background,
                        radius,
                        cover: true,
                    });
                }
            }
            ElementType::Logo => {
                if assets.logo.is_some() {
                    cmds.push(PaintCommand::Image {
                        rect,
                        slot: ImageSlot::Logo,
                        radius: 0,
                        cover: false,
                    });
                }
            }
            ElementType::TicketNumber => {
                cmds.push(PaintCommand::SolidRect {
                    rect,
                    radius,
                    rgba: RED_600,
                });
                cmds.push(PaintCommand::Text {
                    line: node.line,
                    spans: vec![TextSpan::new(node.text.as_str(), Weight::Regular)],
                    size: node.style.size,
                    rgba: WHITE,
                    clip: rect,
                });
            }
            ElementType::Pill | ElementType::Panel => {
                cmds.push(PaintCommand::SolidRect {
                    rect,
                    radius,
                    rgba: WHITE,
                });
                cmds.push(PaintCommand::Text {
                    line: node.line,
                    spans: vec![TextSpan::new(node.text.as_str(), Weight::Bold)],
                    size: node.style.size,
                    rgba: RED_600,
                    clip: rect,
                });
            }
            ElementType::Footer => {
                let (lead, emphasis) = split_footer(&node.text);
                let mut spans = Vec::new();
                if !lead.is_empty() {
                    spans.push(TextSpan::new(lead, Weight::Regular));
                }
                spans.push(TextSpan::new(emphasis, Weight::Bold));
                cmds.push(PaintCommand::Text {
                    line: node.line,
                    spans,
                    size: node.style.size,
                    rgba: WHITE,
                    clip: rect,
                });
            }
        }
    }

    cmds
}

/// Layout and paint `view` in one step.
pub fn paint_ticket(view: &TicketView, card_width: u32, assets: &AssetSet) -> Vec<PaintCommand> {
    build_display_list(&layout_ticket(view, card_width), assets)
}
