//! Decoration side effects for maximized windows
//!
//! Two best-effort mechanisms hide client-side title bars while a window is
//! maximized: a marker-bounded patch in the user's GTK stylesheet and, for
//! legacy-protocol clients, the `_MOTIF_WM_HINTS` decoration hint. Neither may
//! abort a geometry operation, so callers log failures and move on.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{Atom, ConnectionExt as _, PropMode};
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;

use crate::shared::{Protocol, WindowId};

pub const MWM_HINTS_DECORATIONS: u32 = 1 << 1;
pub const MWM_DECOR_ALL: u32 = 1 << 0;

const PATCH_START: &str = "/* --- AREA-RESTORE --- */";
const PATCH_END: &str = "/* --- END-AREA-RESTORE --- */";

const TITLEBAR_CSS: &str = "
window.maximized headerbar, window.maximized titlebar, window.maximized .titlebar {
    padding: 0 !important; margin: 0 !important; min-height: 0 !important;
    height: 0 !important; border: none !important; background: none !important;
    display: none !important; margin-bottom: -30px !important;
}";

#[derive(Debug, Error)]
pub enum DecorationError {
    #[error("Failed to connect to X server: {0}")]
    Connect(#[from] x11rb::errors::ConnectError),

    #[error("X11 connection error: {0}")]
    Connection(#[from] x11rb::errors::ConnectionError),

    #[error("X11 request failed: {0}")]
    Reply(#[from] x11rb::errors::ReplyError),

    #[error("Stylesheet I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("No user config directory")]
    NoConfigDir,
}

/// Window a decoration change applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecorationTarget {
    pub window: WindowId,
    pub protocol: Protocol,
    pub x11_window: Option<u32>,
}

/// Side effects run on maximize transitions and around the engine's lifetime
pub trait DecorationHook {
    fn startup(&mut self) -> Result<(), DecorationError> {
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), DecorationError> {
        Ok(())
    }

    fn set_maximized(
        &mut self,
        target: DecorationTarget,
        maximized: bool,
    ) -> Result<(), DecorationError>;
}

/// Hook that does nothing, for hosts that draw no client-side title bars
#[derive(Debug, Default)]
pub struct NoDecorations;

impl DecorationHook for NoDecorations {
    fn set_maximized(&mut self, _: DecorationTarget, _: bool) -> Result<(), DecorationError> {
        Ok(())
    }
}

/// `_MOTIF_WM_HINTS` writer for legacy-protocol clients
pub struct MotifHints {
    conn: RustConnection,
    atom: Atom,
}

impl MotifHints {
    pub fn connect() -> Result<Self, DecorationError> {
        let (conn, _screen_num) = x11rb::connect(None)?;
        let atom = conn.intern_atom(false, b"_MOTIF_WM_HINTS")?.reply()?.atom;
        Ok(Self { conn, atom })
    }

    /// Hint values: decorations hidden while maximized, all decorations otherwise
    pub fn hint_values(maximized: bool) -> [u32; 5] {
        let decorations = if maximized { 0 } else { MWM_DECOR_ALL };
        [MWM_HINTS_DECORATIONS, 0, decorations, 0, 0]
    }

    pub fn set(&self, window: u32, maximized: bool) -> Result<(), DecorationError> {
        self.conn.change_property32(
            PropMode::REPLACE,
            window,
            self.atom,
            self.atom,
            &Self::hint_values(maximized),
        )?;
        self.conn.flush()?;
        Ok(())
    }
}

/// Marker-bounded block inside a user stylesheet
#[derive(Debug, Clone)]
pub struct StylesheetPatch {
    path: PathBuf,
}

impl StylesheetPatch {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.config/gtk-3.0/gtk.css`
    pub fn gtk3() -> Result<Self, DecorationError> {
        let dir = dirs::config_dir().ok_or(DecorationError::NoConfigDir)?;
        Ok(Self::new(dir.join("gtk-3.0").join("gtk.css")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rewrite the stylesheet with the block present or absent
    pub fn apply(&self, enabled: bool) -> Result<(), DecorationError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let current = match fs::read_to_string(&self.path) {
            Ok(css) => css,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };
        fs::write(&self.path, patch_css(&current, enabled))?;
        debug!("Stylesheet patch {} in {:?}", if enabled { "applied" } else { "removed" }, self.path);
        Ok(())
    }
}

/// Strip every marker-bounded block, then append a fresh one if `enabled`
pub fn patch_css(css: &str, enabled: bool) -> String {
    let mut out = String::with_capacity(css.len() + TITLEBAR_CSS.len());
    let mut rest = css;
    while let Some(start) = rest.find(PATCH_START) {
        let Some(end) = rest[start..].find(PATCH_END) else {
            break;
        };
        out.push_str(&rest[..start]);
        rest = &rest[start + end + PATCH_END.len()..];
    }
    out.push_str(rest);

    let mut out = out.trim().to_string();
    if enabled {
        out.push_str("\n\n");
        out.push_str(PATCH_START);
        out.push('\n');
        out.push_str(TITLEBAR_CSS.trim_start_matches('\n'));
        out.push('\n');
        out.push_str(PATCH_END);
    }
    out.trim().to_string()
}

/// Stylesheet patch plus Motif hints, each optional
#[derive(Default)]
pub struct SystemDecorations {
    pub stylesheet: Option<StylesheetPatch>,
    pub motif: Option<MotifHints>,
}

impl SystemDecorations {
    pub fn new(stylesheet: Option<StylesheetPatch>, motif: Option<MotifHints>) -> Self {
        Self { stylesheet, motif }
    }

    /// GTK 3 stylesheet plus Motif hints on the default X display, whichever
    /// are available
    pub fn detect() -> Self {
        Self::from_backends(StylesheetPatch::gtk3(), MotifHints::connect())
    }

    /// Keep each backend that came up, logging the ones that did not
    pub fn from_backends(
        stylesheet: Result<StylesheetPatch, DecorationError>,
        motif: Result<MotifHints, DecorationError>,
    ) -> Self {
        let stylesheet = match stylesheet {
            Ok(patch) => Some(patch),
            Err(e) => {
                warn!("Stylesheet patch disabled: {}", e);
                None
            }
        };
        let motif = match motif {
            Ok(hints) => Some(hints),
            Err(e) => {
                warn!("Motif hints disabled: {}", e);
                None
            }
        };
        Self::new(stylesheet, motif)
    }
}

impl DecorationHook for SystemDecorations {
    fn startup(&mut self) -> Result<(), DecorationError> {
        match &self.stylesheet {
            Some(patch) => patch.apply(true),
            None => Ok(()),
        }
    }

    fn shutdown(&mut self) -> Result<(), DecorationError> {
        match &self.stylesheet {
            Some(patch) => patch.apply(false),
            None => Ok(()),
        }
    }

    fn set_maximized(
        &mut self,
        target: DecorationTarget,
        maximized: bool,
    ) -> Result<(), DecorationError> {
        if target.protocol != Protocol::Legacy {
            return Ok(());
        }
        let (Some(motif), Some(xid)) = (&self.motif, target.x11_window) else {
            return Ok(());
        };
        debug!("MOTIF hints for 0x{:x}: maximized={}", xid, maximized);
        motif.set(xid, maximized)
    }
}
