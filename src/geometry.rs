//! Rectangle types and the two geometry transforms that make layouts
//! survive monitor changes: work-area-relative fractional rectangles and
//! snap (half/quadrant) detection.

use serde::{Deserialize, Serialize};

use crate::constants::snap::{POSITION_TOLERANCE, SIZE_TOLERANCE};

/// Absolute window rectangle in screen pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Center point, used to find the monitor a legacy rect belongs to.
    pub fn center(&self) -> (i32, i32) {
        (self.x + self.w / 2, self.y + self.h / 2)
    }
}

/// Usable rectangle of a monitor, excluding taskbars and docked UI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkArea {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl WorkArea {
    pub fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> i32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.top + self.height
    }

    /// A work area we cannot divide by or place into.
    pub fn is_degenerate(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        x >= self.left && x < self.right() && y >= self.top && y < self.bottom()
    }
}

/// Window rectangle expressed as fractions of the owning monitor's work
/// area. Values are deliberately unclamped: drop-shadow borders legitimately
/// put the origin slightly outside the work area (negative fractions) and
/// the size slightly above 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRect {
    #[serde(rename = "xN")]
    pub x_n: f64,
    #[serde(rename = "yN")]
    pub y_n: f64,
    #[serde(rename = "wN")]
    pub w_n: f64,
    #[serde(rename = "hN")]
    pub h_n: f64,
}

impl NormalizedRect {
    /// Convert an absolute rect into work-area fractions.
    /// A degenerate work area yields the zero rect instead of dividing by zero.
    pub fn from_absolute(rect: Rect, wa: WorkArea) -> Self {
        if wa.is_degenerate() {
            return Self::default();
        }
        Self {
            x_n: f64::from(rect.x - wa.left) / f64::from(wa.width),
            y_n: f64::from(rect.y - wa.top) / f64::from(wa.height),
            w_n: f64::from(rect.w) / f64::from(wa.width),
            h_n: f64::from(rect.h) / f64::from(wa.height),
        }
    }

    /// Convert back to absolute pixels against the given work area.
    /// Rounds to nearest so a fraction a hair below an integer boundary
    /// restores exactly instead of drifting a pixel (e.g. -6.999 → -7).
    pub fn to_absolute(&self, wa: WorkArea) -> Rect {
        Rect {
            x: wa.left + round(self.x_n * f64::from(wa.width)),
            y: wa.top + round(self.y_n * f64::from(wa.height)),
            w: round(self.w_n * f64::from(wa.width)),
            h: round(self.h_n * f64::from(wa.height)),
        }
    }
}

fn round(v: f64) -> i32 {
    v.round() as i32
}

/// The eight standard snap regions of a work area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SnapKind {
    Left,
    Right,
    Top,
    Bottom,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

fn near(a: i32, b: i32) -> bool {
    (a - b).abs() <= POSITION_TOLERANCE
}

fn near_size(a: i32, b: i32) -> bool {
    (a - b).abs() <= SIZE_TOLERANCE
}

/// Detect whether a rect sits in one of the eight snap regions of the work
/// area. Halves are tested before quadrants; the first hit wins. Returns
/// `None` for free-form placement or a degenerate work area.
pub fn detect_snap(rect: Rect, wa: WorkArea) -> Option<SnapKind> {
    if wa.is_degenerate() {
        return None;
    }

    let Rect { x, y, w, h } = rect;
    let hw = wa.width / 2;
    let hh = wa.height / 2;

    if near(x, wa.left) && near(y, wa.top) && near_size(w, hw) && near_size(h, wa.height) {
        return Some(SnapKind::Left);
    }
    if near(x + w, wa.right()) && near(y, wa.top) && near_size(w, hw) && near_size(h, wa.height) {
        return Some(SnapKind::Right);
    }
    if near(x, wa.left) && near(y, wa.top) && near_size(w, wa.width) && near_size(h, hh) {
        return Some(SnapKind::Top);
    }
    if near(x, wa.left) && near(y + h, wa.bottom()) && near_size(w, wa.width) && near_size(h, hh) {
        return Some(SnapKind::Bottom);
    }
    if near(x, wa.left) && near(y, wa.top) && near_size(w, hw) && near_size(h, hh) {
        return Some(SnapKind::TopLeft);
    }
    if near(x + w, wa.right()) && near(y, wa.top) && near_size(w, hw) && near_size(h, hh) {
        return Some(SnapKind::TopRight);
    }
    if near(x, wa.left) && near(y + h, wa.bottom()) && near_size(w, hw) && near_size(h, hh) {
        return Some(SnapKind::BottomLeft);
    }
    if near(x + w, wa.right()) && near(y + h, wa.bottom()) && near_size(w, hw) && near_size(h, hh) {
        return Some(SnapKind::BottomRight);
    }

    None
}

/// Exact inverse of [`detect_snap`]: the rectangle a snap region occupies on
/// the given work area. `None` when the work area is degenerate.
pub fn rect_from_snap(wa: WorkArea, kind: SnapKind) -> Option<Rect> {
    if wa.is_degenerate() {
        return None;
    }

    let hw = wa.width / 2;
    let hh = wa.height / 2;
    // Right/bottom pieces anchor to the far edge so odd dimensions end flush.
    let rx = wa.left + (wa.width - hw);
    let by = wa.top + (wa.height - hh);

    let rect = match kind {
        SnapKind::Left => Rect::new(wa.left, wa.top, hw, wa.height),
        SnapKind::Right => Rect::new(rx, wa.top, hw, wa.height),
        SnapKind::Top => Rect::new(wa.left, wa.top, wa.width, hh),
        SnapKind::Bottom => Rect::new(wa.left, by, wa.width, hh),
        SnapKind::TopLeft => Rect::new(wa.left, wa.top, hw, hh),
        SnapKind::TopRight => Rect::new(rx, wa.top, hw, hh),
        SnapKind::BottomLeft => Rect::new(wa.left, by, hw, hh),
        SnapKind::BottomRight => Rect::new(rx, by, hw, hh),
    };
    Some(rect)
}
