//! Owner-side surface and context registry.
//!
//! Everything here lives inside an `OwnerCell` and is only reached on the
//! owner thread, either directly or through a dispatched callable.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
    context::handle::{ContextAttributes, ContextHandle},
    error::{Error, Result},
};

/// Snapshot of a drawable surface.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CanvasInfo {
    /// Selector-style name, e.g. `#canvas`.
    pub name: String,
    /// Backing store width in device pixels.
    pub width: u32,
    /// Backing store height in device pixels.
    pub height: u32,
    /// Displayed width in CSS pixels.
    pub css_width: f64,
    /// Displayed height in CSS pixels.
    pub css_height: f64,
    /// Device pixel ratio times viewport zoom.
    pub pixel_scale: f64,
    /// How many times resizing has cleared the contents.
    pub clear_count: u64,
}

struct Canvas {
    width: u32,
    height: u32,
    device_pixel_ratio: f64,
    zoom: f64,
    clear_count: u64,
}

impl Canvas {
    fn pixel_scale(&self) -> f64 {
        let s = self.device_pixel_ratio * self.zoom;
        if s.is_finite() && s > 0.0 { s } else { 1.0 }
    }

    fn info(&self, name: &str) -> CanvasInfo {
        let scale = self.pixel_scale();
        CanvasInfo {
            name: name.to_string(),
            width: self.width,
            height: self.height,
            css_width: f64::from(self.width) / scale,
            css_height: f64::from(self.height) / scale,
            pixel_scale: scale,
            clear_count: self.clear_count,
        }
    }
}

/// A live rendering context as seen on the owner thread.
#[derive(Debug)]
pub struct RenderContext {
    handle: ContextHandle,
    canvas: String,
    attributes: ContextAttributes,
    width: u32,
    height: u32,
    frames: u64,
    holder: Option<usize>,
}

impl RenderContext {
    /// This context's handle.
    pub fn handle(&self) -> ContextHandle {
        self.handle
    }

    /// Name of the canvas it renders into.
    pub fn canvas(&self) -> &str {
        &self.canvas
    }

    /// Attributes it was created with.
    pub fn attributes(&self) -> &ContextAttributes {
        &self.attributes
    }

    /// Drawing buffer size, fixed at creation from the canvas backing size.
    pub fn drawing_buffer_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Finish a frame. Returns the number of frames presented so far.
    pub fn present(&mut self) -> u64 {
        self.frames += 1;
        self.frames
    }

    /// Frames presented so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

/// Registry of canvases and contexts.
#[derive(Default)]
pub(crate) struct Display {
    canvases: HashMap<String, Canvas>,
    contexts: HashMap<ContextHandle, RenderContext>,
    next_handle: i32,
}

impl Display {
    pub(crate) fn register_canvas(&mut self, name: &str, width: u32, height: u32) {
        self.canvases.insert(
            name.to_string(),
            Canvas {
                width,
                height,
                device_pixel_ratio: 1.0,
                zoom: 1.0,
                clear_count: 0,
            },
        );
    }

    pub(crate) fn canvas(&self, name: &str) -> Option<CanvasInfo> {
        self.canvases.get(name).map(|c| c.info(name))
    }

    pub(crate) fn set_pixel_scale(&mut self, name: &str, dpr: f64, zoom: f64) -> Result<()> {
        let canvas = self.canvas_mut(name)?;
        canvas.device_pixel_ratio = dpr;
        canvas.zoom = zoom;
        Ok(())
    }

    /// Setting the backing size clears the surface.
    pub(crate) fn resize(&mut self, name: &str, width: u32, height: u32) -> Result<CanvasInfo> {
        let canvas = self.canvas_mut(name)?;
        canvas.width = width;
        canvas.height = height;
        canvas.clear_count += 1;
        Ok(canvas.info(name))
    }

    pub(crate) fn create(
        &mut self,
        name: &str,
        attributes: ContextAttributes,
    ) -> Result<ContextHandle> {
        if !matches!(attributes.major_version, 1 | 2) {
            return Err(Error::UnsupportedConfiguration(format!(
                "major version {}",
                attributes.major_version
            )));
        }
        let (width, height) = {
            let canvas = self.canvas_mut(name)?;
            (canvas.width, canvas.height)
        };
        let raw = self
            .next_handle
            .checked_add(1)
            .ok_or_else(|| Error::UnsupportedConfiguration("context handles exhausted".into()))?;
        let handle = ContextHandle::from_raw(raw).ok_or(Error::InvalidHandle(raw))?;
        self.next_handle = raw;
        self.contexts.insert(
            handle,
            RenderContext {
                handle,
                canvas: name.to_string(),
                attributes,
                width,
                height,
                frames: 0,
                holder: None,
            },
        );
        Ok(handle)
    }

    pub(crate) fn context_mut(&mut self, handle: ContextHandle) -> Result<&mut RenderContext> {
        self.contexts
            .get_mut(&handle)
            .ok_or(Error::InvalidHandle(handle.raw()))
    }

    /// Move `handle`'s affinity to `thread`; returns the displaced holder.
    pub(crate) fn acquire(
        &mut self,
        handle: ContextHandle,
        thread: usize,
        proxied: bool,
    ) -> Result<Option<usize>> {
        let ctx = self.context_mut(handle)?;
        if proxied && !ctx.attributes.proxy.allows_workers() {
            return Err(Error::AffinityUnavailable(handle.raw()));
        }
        Ok(ctx.holder.replace(thread).filter(|&prev| prev != thread))
    }

    /// Drop `thread`'s claim on `handle` if it still holds it.
    pub(crate) fn release(&mut self, handle: ContextHandle, thread: usize) {
        if let Some(ctx) = self.contexts.get_mut(&handle) {
            if ctx.holder == Some(thread) {
                ctx.holder = None;
            }
        }
    }

    pub(crate) fn holder(&self, handle: ContextHandle) -> Option<usize> {
        self.contexts.get(&handle).and_then(|c| c.holder)
    }

    fn canvas_mut(&mut self, name: &str) -> Result<&mut Canvas> {
        self.canvases
            .get_mut(name)
            .ok_or_else(|| Error::UnknownCanvas(name.to_string()))
    }
}
