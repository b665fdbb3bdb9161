//! Display server and cursor source detection
//!
//! Recording needs two answers at startup: which display server the sampler
//! is talking to (for error hints) and which cursor provider can run beside
//! it. Both come from the environment so tests can inject their own.

use std::env;

use serde::{Deserialize, Serialize};

use crate::model::{BackendType, PlatformInfo};

/// Which cursor provider to use for compositing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CursorBackend {
    /// XFixes cursor image (X11 and XWayland sessions)
    X11,
    /// GDI cursor rendering
    Windows,
    /// No supported cursor source; frames are recorded without a cursor
    None,
}

/// Detects the operating system and display server.
///
/// On Linux `$WAYLAND_DISPLAY` wins over `$DISPLAY`; empty values count as
/// unset.
///
/// # Examples
///
/// ```
/// use regioncast_core::util::detect::detect_platform;
///
/// let platform = detect_platform();
/// println!("Recording on {} ({})", platform.os, platform.backend);
/// ```
pub fn detect_platform() -> PlatformInfo {
    PlatformInfo::new(env::consts::OS.to_string(), display_backend_with_env(|key| env::var(key).ok()))
}

fn display_backend_with_env<F>(_env_provider: F) -> BackendType
where
    F: Fn(&str) -> Option<String>,
{
    #[cfg(target_os = "linux")]
    {
        let set = |key: &str| _env_provider(key).is_some_and(|value| !value.is_empty());
        if set("WAYLAND_DISPLAY") {
            BackendType::Wayland
        } else if set("DISPLAY") {
            BackendType::X11
        } else {
            BackendType::None
        }
    }

    #[cfg(target_os = "windows")]
    {
        BackendType::Windows
    }

    #[cfg(target_os = "macos")]
    {
        BackendType::MacOS
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
    {
        BackendType::None
    }
}

/// Picks the cursor provider for the current session
///
/// # Platform-specific behavior
///
/// - **Windows**: [`CursorBackend::Windows`]
/// - **Linux**: [`CursorBackend::X11`] whenever `$DISPLAY` is set, which
///   includes XWayland under a Wayland compositor
/// - **Elsewhere**: [`CursorBackend::None`]
pub fn detect_cursor_backend() -> CursorBackend {
    detect_cursor_backend_with_env(|key| env::var(key).ok())
}

fn detect_cursor_backend_with_env<F>(_env_provider: F) -> CursorBackend
where
    F: Fn(&str) -> Option<String>,
{
    #[cfg(target_os = "windows")]
    {
        CursorBackend::Windows
    }

    #[cfg(target_os = "linux")]
    {
        match _env_provider("DISPLAY") {
            Some(display) if !display.is_empty() => CursorBackend::X11,
            _ => CursorBackend::None,
        }
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        CursorBackend::None
    }
}
