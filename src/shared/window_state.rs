//! Shared window state between the engine and its compositor backend
//!
//! Plain value types: window handles, frame geometry, maximize flags and the
//! display protocol a window speaks. The compositor owns every window; these
//! types only describe what the engine observed or wants to request.

use bitflags::bitflags;

/// Opaque compositor window handle, stable for the window's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub u64);

/// Handle of a compositor-rendered overlay clone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OverlayId(pub u64);

/// Window geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn size(&self) -> Size {
        Size {
            width: self.width,
            height: self.height,
        }
    }

    /// Both dimensions are at least `min` pixels
    pub fn at_least(&self, min: u32) -> bool {
        self.width >= min && self.height >= min
    }

    /// Largest absolute difference between the two origins
    pub fn position_delta(&self, other: &Geometry) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    /// Largest absolute difference between the two sizes
    pub fn size_delta(&self, other: &Geometry) -> u32 {
        self.width
            .abs_diff(other.width)
            .max(self.height.abs_diff(other.height))
    }

    /// Rectangle of `size` centered inside `self`
    pub fn center(&self, size: Size) -> Geometry {
        Geometry {
            x: self.x + (self.width as i32 - size.width as i32).div_euclid(2),
            y: self.y + (self.height as i32 - size.height as i32).div_euclid(2),
            width: size.width,
            height: size.height,
        }
    }

    /// `self` scaled by `percent`, floored, never larger than `self`
    pub fn scaled_size(&self, percent: u32) -> Size {
        let scale = |dim: u32| ((dim as u64 * percent as u64) / 100).min(dim as u64) as u32;
        Size {
            width: scale(self.width),
            height: scale(self.height),
        }
    }
}

/// Window size without position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

bitflags! {
    /// Maximization state, one bit per axis
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MaximizeFlags: u8 {
        const HORIZONTAL = 1 << 0;
        const VERTICAL   = 1 << 1;
        const BOTH       = Self::HORIZONTAL.bits() | Self::VERTICAL.bits();
    }
}

impl MaximizeFlags {
    pub fn from_axes(horizontal: bool, vertical: bool) -> Self {
        let mut flags = Self::empty();
        flags.set(Self::HORIZONTAL, horizontal);
        flags.set(Self::VERTICAL, vertical);
        flags
    }

    /// Maximized on both axes
    pub fn is_maximized(self) -> bool {
        self.contains(Self::BOTH)
    }
}

/// Display protocol family a client speaks
///
/// Resolved once when the engine first sees a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// Asynchronous, client-acknowledged resizes (X11 / XWayland)
    Legacy,
    /// Compositor-applied resizes (Wayland)
    Native,
}

impl Protocol {
    pub fn name(self) -> &'static str {
        match self {
            Protocol::Legacy => "X11",
            Protocol::Native => "Wayland",
        }
    }
}

/// Window type as reported by the compositor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowType {
    Normal,
    Dialog,
    Utility,
    Desktop,
    Dock,
    Other,
}
