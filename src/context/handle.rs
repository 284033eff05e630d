use serde::{Deserialize, Serialize};

/// Opaque name of a rendering context. Always positive; 0 means "none".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct ContextHandle(i32);

impl ContextHandle {
    /// Wrap a raw handle; `None` for 0 and negative values.
    #[inline]
    pub const fn from_raw(raw: i32) -> Option<Self> {
        if raw > 0 { Some(Self(raw)) } else { None }
    }

    /// The raw integer value.
    #[inline]
    pub const fn raw(self) -> i32 {
        self.0
    }
}

impl TryFrom<i32> for ContextHandle {
    type Error = crate::Error;

    fn try_from(raw: i32) -> Result<Self, Self::Error> {
        Self::from_raw(raw).ok_or(crate::Error::InvalidHandle(raw))
    }
}

impl From<ContextHandle> for i32 {
    fn from(h: ContextHandle) -> i32 {
        h.0
    }
}

impl std::fmt::Display for ContextHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ctx#{}", self.0)
    }
}

/// How a context may be used from threads other than the owner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProxyMode {
    /// Only usable on the owner thread.
    Disallow,
    /// Proxied only when the environment cannot render natively off-owner.
    Fallback,
    /// Always proxied to the owner from worker threads.
    #[default]
    Always,
}

impl ProxyMode {
    /// Can a worker make a context with this mode current?
    #[inline]
    pub fn allows_workers(self) -> bool {
        !matches!(self, ProxyMode::Disallow)
    }
}

/// Requested configuration of a rendering context.
///
/// Only the first five fields are caller-controlled through
/// `ContextManager::create_context`; the rest are fixed by the manager.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextAttributes {
    /// Back buffer has an alpha channel.
    pub alpha: bool,
    /// Depth buffer present.
    pub depth: bool,
    /// Stencil buffer present.
    pub stencil: bool,
    /// Multisample antialiasing.
    pub antialias: bool,
    /// API major version; 1 or 2.
    pub major_version: i32,
    /// API minor version.
    pub minor_version: i32,
    /// Enable all extensions at creation.
    pub enable_extensions_by_default: bool,
    /// Keep back buffer contents after presenting.
    pub preserve_drawing_buffer: bool,
    /// Caller drives swaps explicitly.
    pub explicit_swap_control: bool,
    /// Render into an offscreen back buffer.
    pub render_via_offscreen_back_buffer: bool,
    /// Cross-thread policy.
    pub proxy: ProxyMode,
}

impl Default for ContextAttributes {
    fn default() -> Self {
        Self {
            alpha: true,
            depth: true,
            stencil: false,
            antialias: true,
            major_version: 2,
            minor_version: 0,
            enable_extensions_by_default: true,
            preserve_drawing_buffer: true,
            explicit_swap_control: false,
            render_via_offscreen_back_buffer: false,
            proxy: ProxyMode::Always,
        }
    }
}

impl ContextAttributes {
    /// Attributes from the five caller-visible switches.
    pub fn new(alpha: bool, depth: bool, stencil: bool, antialias: bool, major_version: i32) -> Self {
        Self {
            alpha,
            depth,
            stencil,
            antialias,
            major_version,
            ..Self::default()
        }
    }

    /// Pin the fields the manager does not let callers choose.
    pub(crate) fn normalized(self) -> Self {
        let d = Self::default();
        Self {
            minor_version: d.minor_version,
            enable_extensions_by_default: d.enable_extensions_by_default,
            preserve_drawing_buffer: d.preserve_drawing_buffer,
            explicit_swap_control: d.explicit_swap_control,
            render_via_offscreen_back_buffer: d.render_via_offscreen_back_buffer,
            proxy: ProxyMode::Always,
            ..self
        }
    }
}

/// A thread's relationship to the contexts of one manager.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Affinity {
    /// No context is current on this thread.
    #[default]
    NotCurrent,
    /// Current on the owner thread; operations run in place.
    CurrentLocal(ContextHandle),
    /// Current on a worker; operations are forwarded to the owner.
    CurrentProxied(ContextHandle),
}

impl Affinity {
    /// The current handle, if any.
    #[inline]
    pub fn handle(self) -> Option<ContextHandle> {
        match self {
            Affinity::NotCurrent => None,
            Affinity::CurrentLocal(h) | Affinity::CurrentProxied(h) => Some(h),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_handles_must_be_positive() {
        assert!(ContextHandle::from_raw(0).is_none());
        assert!(ContextHandle::from_raw(-4).is_none());
        assert_eq!(ContextHandle::from_raw(3).map(ContextHandle::raw), Some(3));
        assert!(matches!(
            ContextHandle::try_from(0),
            Err(crate::Error::InvalidHandle(0))
        ));
    }

    #[test]
    fn normalized_keeps_switches_and_forces_proxying() {
        let requested = ContextAttributes {
            minor_version: 7,
            proxy: ProxyMode::Disallow,
            preserve_drawing_buffer: false,
            ..ContextAttributes::new(false, true, true, false, 1)
        };
        let n = requested.normalized();
        assert_eq!(n.minor_version, 0);
        assert_eq!(n.proxy, ProxyMode::Always);
        assert!(n.preserve_drawing_buffer);
        assert!(!n.alpha && n.depth && n.stencil && !n.antialias);
        assert_eq!(n.major_version, 1);
    }

    #[test]
    fn attributes_deserialize_with_defaults() {
        let a: ContextAttributes =
            serde_json::from_str(r#"{ "stencil": true, "major_version": 1 }"#).unwrap();
        assert!(a.stencil && a.alpha);
        assert_eq!(a.major_version, 1);
        assert!(serde_json::from_str::<ContextHandle>("0").is_err());
        assert_eq!(serde_json::from_str::<ContextHandle>("5").unwrap().raw(), 5);
    }
}
