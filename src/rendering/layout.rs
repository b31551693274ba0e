//! Fixed card layout in CSS pixels (1x). Boxes are scaled by the rasterizer.

use crate::rendering::compose::TicketView;
use crate::rendering::font::{self, Weight};

pub const DEFAULT_CARD_WIDTH: u32 = 512;
pub const MIN_CARD_WIDTH: u32 = 256;
pub const MAX_CARD_WIDTH: u32 = 2048;

const PAD_X: u32 = 24;
const PAD_Y: u32 = 16;
const LOGO_SIZE: u32 = 144;
const SECTION_GAP: u32 = 24;
const ROW_GAP: u32 = 16;
const COLUMN_GAP: u32 = 16;
const PILL_PAD_Y: u32 = 4;
const PANEL_HEIGHT: u32 = 96;
const TEXT_MARGIN_BOTTOM: u32 = 16;
const NUMBER_PAD_X: u32 = 24;
const NUMBER_PAD_Y: u32 = 8;

/// Font size and line height in CSS px.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextStyle {
    pub size: u32,
    pub line_height: u32,
}

pub const BODY_TEXT: TextStyle = TextStyle {
    size: 16,
    line_height: 24,
};
pub const NUMBER_TEXT: TextStyle = TextStyle {
    size: 24,
    line_height: 32,
};
pub const FOOTER_TEXT: TextStyle = TextStyle {
    size: 14,
    line_height: 20,
};

const PILL_HEIGHT: u32 = PILL_PAD_Y * 2 + BODY_TEXT.line_height + TEXT_MARGIN_BOTTOM;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width.min(i32::MAX as u32) as i32)
    }

    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height.min(i32::MAX as u32) as i32)
    }

    pub fn scaled(&self, factor: u32) -> Rect {
        let f = factor.min(i32::MAX as u32) as i32;
        Rect {
            x: self.x.saturating_mul(f),
            y: self.y.saturating_mul(f),
            width: self.width.saturating_mul(factor),
            height: self.height.saturating_mul(factor),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoxModel {
    pub padding_x: u32,
    pub padding_y: u32,
    /// Corner radius; `u32::MAX` means fully rounded.
    pub radius: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutBox {
    pub rect: Rect,
    pub box_model: BoxModel,
}

impl LayoutBox {
    pub fn content_width(&self) -> u32 {
        self.rect.width.saturating_sub(self.box_model.padding_x * 2)
    }

    /// Corner radius clamped to half the shorter side.
    pub fn corner_radius(&self) -> u32 {
        self.box_model
            .radius
            .min(self.rect.width / 2)
            .min(self.rect.height / 2)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementType {
    Card,
    Logo,
    TicketNumber,
    /// Rounded-full white row (name, attendees, event)
    Pill,
    /// Rounded-xl white panel (time, address)
    Panel,
    Footer,
}

/// A layout node couples a `LayoutBox` with the text drawn inside it.
#[derive(Debug, Clone)]
pub struct LayoutNode {
    pub lb: LayoutBox,
    pub text: String,
    pub elem_type: ElementType,
    pub style: TextStyle,
    /// Line box the text is centered in; the text may overflow it.
    pub line: Rect,
    pub placeholder: bool,
}

fn boxed(rect: Rect, padding_x: u32, padding_y: u32, radius: u32) -> LayoutBox {
    LayoutBox {
        rect,
        box_model: BoxModel {
            padding_x,
            padding_y,
            radius,
        },
    }
}

fn text_node(
    rect: Rect,
    radius: u32,
    text: &str,
    elem_type: ElementType,
    placeholder: bool,
) -> LayoutNode {
    let block_h = (BODY_TEXT.line_height + TEXT_MARGIN_BOTTOM) as i32;
    let line_y = match elem_type {
        // py-1, text sits at the top with its bottom margin below
        ElementType::Pill => rect.y + PILL_PAD_Y as i32,
        // items-center on a text block that carries a bottom margin
        _ => rect.y + (rect.height as i32 - block_h) / 2,
    };
    LayoutNode {
        lb: boxed(rect, 0, PILL_PAD_Y, radius),
        text: text.to_string(),
        line: Rect::new(rect.x, line_y, rect.width, BODY_TEXT.line_height),
        elem_type,
        style: BODY_TEXT,
        placeholder,
    }
}

/// Compute the card layout for the composed view.
///
/// The first node is always the card itself; its rect is the capture region.
/// `card_width` is clamped to `MIN_CARD_WIDTH..=MAX_CARD_WIDTH`.
pub fn layout_ticket(view: &TicketView, card_width: u32) -> Vec<LayoutNode> {
    let width = card_width.clamp(MIN_CARD_WIDTH, MAX_CARD_WIDTH);
    let inner_w = width - PAD_X * 2;
    let half_w = (inner_w - COLUMN_GAP) / 2;
    let left = PAD_X as i32;
    let right_col = left + (half_w + COLUMN_GAP) as i32;
    let mut nodes = Vec::new();
    let mut y = PAD_Y as i32;

    // Header: logo on the left, ticket number pill on the right
    let logo = Rect::new(left, y, LOGO_SIZE, LOGO_SIZE);
    nodes.push(LayoutNode {
        lb: boxed(logo, 0, 0, 0),
        text: String::new(),
        elem_type: ElementType::Logo,
        style: BODY_TEXT,
        line: logo,
        placeholder: false,
    });

    let number_w = font::text_width(&view.ticket_number, Weight::Regular, NUMBER_TEXT.size)
        .min(inner_w - LOGO_SIZE - NUMBER_PAD_X * 2);
    let pill_w = number_w + NUMBER_PAD_X * 2;
    let pill_h = NUMBER_PAD_Y * 2 + NUMBER_TEXT.line_height + TEXT_MARGIN_BOTTOM;
    let pill = Rect::new(
        (width - PAD_X - pill_w) as i32,
        y + (LOGO_SIZE as i32 - pill_h as i32) / 2,
        pill_w,
        pill_h,
    );
    nodes.push(LayoutNode {
        lb: boxed(pill, NUMBER_PAD_X, NUMBER_PAD_Y, u32::MAX),
        text: view.ticket_number.clone(),
        elem_type: ElementType::TicketNumber,
        style: NUMBER_TEXT,
        line: Rect::new(
            pill.x + NUMBER_PAD_X as i32,
            pill.y + NUMBER_PAD_Y as i32,
            number_w,
            NUMBER_TEXT.line_height,
        ),
        placeholder: false,
    });
    y += (LOGO_SIZE + SECTION_GAP) as i32;

    // Name row
    let name = &view.person_name;
    nodes.push(text_node(
        Rect::new(left, y, inner_w, PILL_HEIGHT),
        u32::MAX,
        &name.text,
        ElementType::Pill,
        name.placeholder,
    ));
    y += (PILL_HEIGHT + ROW_GAP) as i32;

    // Attendees | event
    for (x, value) in [(left, &view.number_of_attendees), (right_col, &view.event_name)] {
        nodes.push(text_node(
            Rect::new(x, y, half_w, PILL_HEIGHT),
            u32::MAX,
            &value.text,
            ElementType::Pill,
            value.placeholder,
        ));
    }
    y += (PILL_HEIGHT + ROW_GAP) as i32;

    // Time | address
    for (x, value) in [(left, &view.date_time), (right_col, &view.address)] {
        nodes.push(text_node(
            Rect::new(x, y, half_w, PANEL_HEIGHT),
            12,
            &value.text,
            ElementType::Panel,
            value.placeholder,
        ));
    }
    y += (PANEL_HEIGHT + SECTION_GAP) as i32;

    let footer = Rect::new(left, y, inner_w, FOOTER_TEXT.line_height);
    nodes.push(LayoutNode {
        lb: boxed(footer, 0, 0, 0),
        text: view.footer.clone(),
        line: footer,
        elem_type: ElementType::Footer,
        style: FOOTER_TEXT,
        placeholder: false,
    });
    y += (FOOTER_TEXT.line_height + PAD_Y) as i32;

    let card = Rect::new(0, 0, width, y as u32);
    nodes.insert(
        0,
        LayoutNode {
            lb: boxed(card, PAD_X, PAD_Y, 8),
            text: String::new(),
            elem_type: ElementType::Card,
            style: BODY_TEXT,
            line: card,
            placeholder: false,
        },
    );
    nodes
}
