//! Types shared by every engine component

mod window_state;

pub use window_state::{Geometry, MaximizeFlags, OverlayId, Protocol, Size, WindowId, WindowType};
