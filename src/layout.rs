//! Placement calculation for overlay layout.
//!
//! This module computes where scaled overlays land on a canvas based on a
//! 5-way anchor, a per-item margin, and stacking groups. Items sharing an
//! anchor and group id stack vertically in insertion order; edge-docked
//! reserved regions (typically a text band) push same-edge stacks inward so
//! nothing overlaps them.
//!
//! The layout routine is a pure function: identical inputs always yield
//! identical coordinates. All fractional results floor.
//!
//! # Example
//!
//! ```ignore
//! use imprint::layout::{layout, Anchor, OverlayItem};
//!
//! let items = [OverlayItem {
//!     source_width: 400,
//!     source_height: 200,
//!     scale: 0.2,
//!     anchor: Anchor::BottomRight,
//!     margin: 10,
//!     group: 0,
//! }];
//! let placements = layout((1600, 1600), &items, &[]);
//! assert_eq!((placements[0].x, placements[0].y), (1270, 1430));
//! ```

use serde::{Deserialize, Serialize};

/// Named placement reference on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", from = "String")]
pub enum Anchor {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Center,
}

impl Anchor {
    /// Parse an anchor name leniently. Unrecognized names fall back to
    /// bottom-right, matching the historical behavior of the tool variants.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().replace('_', "-").as_str() {
            "top-left" | "topleft" => Anchor::TopLeft,
            "top-right" | "topright" => Anchor::TopRight,
            "bottom-left" | "bottomleft" => Anchor::BottomLeft,
            "bottom-right" | "bottomright" => Anchor::BottomRight,
            "center" | "centre" | "middle" => Anchor::Center,
            other => {
                tracing::warn!(anchor = other, "unrecognized anchor, using bottom-right");
                Anchor::BottomRight
            }
        }
    }

    fn axes(self) -> (HAlign, VAlign) {
        match self {
            Anchor::TopLeft => (HAlign::Left, VAlign::Top),
            Anchor::TopRight => (HAlign::Right, VAlign::Top),
            Anchor::BottomLeft => (HAlign::Left, VAlign::Bottom),
            Anchor::BottomRight => (HAlign::Right, VAlign::Bottom),
            Anchor::Center => (HAlign::Center, VAlign::Center),
        }
    }
}

impl From<String> for Anchor {
    fn from(name: String) -> Self {
        Anchor::from_name(&name)
    }
}

/// Horizontal axis resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HAlign {
    Left,
    Center,
    Right,
}

/// Vertical axis resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VAlign {
    Top,
    Center,
    Bottom,
}

/// Canvas edge a reserved region is docked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Edge {
    Top,
    Bottom,
}

/// A rectangle other layout computations must avoid overlapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservedRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Edge this region is docked to; same-edge stacks are pushed inward.
    pub edge: Edge,
}

/// A layout request for one overlay.
///
/// The overlay's rendered size is width-driven: `scale` is a fraction of
/// the canvas width, and height follows the source aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayItem {
    pub source_width: u32,
    pub source_height: u32,
    /// Fraction of canvas width, 0 < scale <= 1
    pub scale: f32,
    pub anchor: Anchor,
    /// Margin from edges and between stacked items, in pixels
    pub margin: u32,
    /// Items sharing anchor and group stack vertically in insertion order
    pub group: u32,
}

/// Resolved placement for one overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Top-left pixel coordinate. May be negative if the rendered overlay
    /// is larger than the canvas; the compositor clips at the edges.
    pub x: i32,
    pub y: i32,
    /// Rendered dimensions after width-driven scaling
    pub width: u32,
    pub height: u32,
}

/// Compute the rendered size of an item on a canvas of the given width.
///
/// `rendered_w = floor(canvas_w * scale)`, height preserves the source
/// aspect ratio and floors.
pub fn rendered_size(canvas_width: u32, item: &OverlayItem) -> (u32, u32) {
    let rendered_w = (canvas_width as f64 * item.scale as f64).floor() as u64;
    if item.source_width == 0 {
        return (rendered_w as u32, 0);
    }
    let rendered_h = item.source_height as u64 * rendered_w / item.source_width as u64;
    (rendered_w as u32, rendered_h as u32)
}

/// Compute placements for a set of overlay items.
///
/// Items are partitioned into stacking groups (same anchor + group id,
/// insertion order preserved). Each group stacks vertically from its
/// anchor-resolved start position; the cross-axis position uses the widest
/// item in the group. Output order matches input order.
///
/// # Arguments
///
/// * `canvas` - Canvas dimensions (width, height)
/// * `items` - Layout requests, in paint order
/// * `reserved` - Edge-docked regions to keep clear of
pub fn layout(canvas: (u32, u32), items: &[OverlayItem], reserved: &[ReservedRegion]) -> Vec<Placement> {
    let (canvas_w, canvas_h) = canvas;

    // Group keys in first-seen order so stacking follows insertion order.
    let mut group_keys: Vec<(Anchor, u32)> = Vec::new();
    for item in items {
        let key = (item.anchor, item.group);
        if !group_keys.contains(&key) {
            group_keys.push(key);
        }
    }

    let mut placements = vec![
        Placement {
            x: 0,
            y: 0,
            width: 0,
            height: 0
        };
        items.len()
    ];

    for key in group_keys {
        let members: Vec<(usize, &OverlayItem)> = items
            .iter()
            .enumerate()
            .filter(|(_, item)| (item.anchor, item.group) == key)
            .collect();

        let sizes: Vec<(u32, u32)> = members
            .iter()
            .map(|(_, item)| rendered_size(canvas_w, item))
            .collect();

        let max_w = sizes.iter().map(|(w, _)| *w).max().unwrap_or(0) as i64;
        let total_h: i64 = sizes.iter().map(|(_, h)| *h as i64).sum::<i64>()
            + members
                .iter()
                .take(members.len().saturating_sub(1))
                .map(|(_, item)| item.margin as i64)
                .sum::<i64>();

        // The group's edge margin is the first member's margin.
        let edge_margin = members[0].1.margin;
        let (x, start_y) = anchor_origin(
            (canvas_w, canvas_h),
            (max_w, total_h),
            key.0,
            edge_margin,
            reserved,
        );

        let mut cursor_y = start_y;
        for ((index, item), (w, h)) in members.iter().zip(sizes.iter()) {
            placements[*index] = Placement {
                x: x as i32,
                y: cursor_y as i32,
                width: *w,
                height: *h,
            };
            cursor_y += *h as i64 + item.margin as i64;
        }
    }

    placements
}

/// Place a single pre-rendered item at an anchor without rescaling.
///
/// Used for elements whose pixel size is already final (e.g. a rendered
/// text stamp). Honors the same reserved-region accounting as `layout`.
pub fn place(
    canvas: (u32, u32),
    size: (u32, u32),
    anchor: Anchor,
    margin: u32,
    reserved: &[ReservedRegion],
) -> Placement {
    let (x, y) = anchor_origin(
        canvas,
        (size.0 as i64, size.1 as i64),
        anchor,
        margin,
        reserved,
    );
    Placement {
        x: x as i32,
        y: y as i32,
        width: size.0,
        height: size.1,
    }
}

/// Resolve the top-left origin for a content box of the given dimensions.
/// `div_euclid` keeps centered coordinates flooring even when the content
/// exceeds the canvas.
fn anchor_origin(
    canvas: (u32, u32),
    content: (i64, i64),
    anchor: Anchor,
    margin: u32,
    reserved: &[ReservedRegion],
) -> (i64, i64) {
    let (canvas_w, canvas_h) = (canvas.0 as i64, canvas.1 as i64);
    let (content_w, content_h) = content;
    let margin = margin as i64;

    let reserved_top: i64 = reserved
        .iter()
        .filter(|r| r.edge == Edge::Top)
        .map(|r| r.height as i64)
        .sum();
    let reserved_bottom: i64 = reserved
        .iter()
        .filter(|r| r.edge == Edge::Bottom)
        .map(|r| r.height as i64)
        .sum();

    let (halign, valign) = anchor.axes();

    let x = match halign {
        HAlign::Left => margin,
        HAlign::Center => (canvas_w - content_w).div_euclid(2),
        HAlign::Right => canvas_w - content_w - margin,
    };

    let y = match valign {
        VAlign::Top => reserved_top + margin,
        VAlign::Center => (canvas_h - content_h).div_euclid(2),
        VAlign::Bottom => canvas_h - reserved_bottom - content_h - margin,
    };

    (x, y)
}
