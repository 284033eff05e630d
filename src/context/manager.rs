use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use crate::{
    context::{
        affinity,
        display::{CanvasInfo, Display, RenderContext},
        handle::{Affinity, ContextAttributes, ContextHandle, ProxyMode},
    },
    dispatch::Dispatcher,
    error::{Error, Result, code, to_code},
    owner_cell::OwnerCell,
    util::current_thread_id,
};

static NEXT_MANAGER_ID: AtomicU64 = AtomicU64::new(1);

struct Inner {
    id: u64,
    dispatcher: Dispatcher,
    display: OwnerCell<Display>,
    /// Bumped whenever a context's holder is displaced by another thread.
    transfers: AtomicU64,
}

/// Creates rendering contexts on the owner thread and moves "current"
/// affinity for them onto calling threads.
///
/// Cloning is cheap; clones share the same registry and affinity tables.
#[derive(Clone)]
pub struct ContextManager {
    inner: Arc<Inner>,
}

impl ContextManager {
    /// A manager whose canvases and contexts live on `dispatcher`'s owner.
    pub fn new(dispatcher: Dispatcher) -> Self {
        let owner = dispatcher.owner_id();
        Self {
            inner: Arc::new(Inner {
                id: NEXT_MANAGER_ID.fetch_add(1, Ordering::Relaxed),
                dispatcher,
                display: OwnerCell::new(owner, Display::default()),
                transfers: AtomicU64::new(0),
            }),
        }
    }

    /// The dispatcher all owner-side work is routed through.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }

    /// Run `f` against the registry on the owner thread.
    fn on_owner<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Inner, &mut Display) -> R + Send + 'static,
        R: Send + 'static,
    {
        let inner = self.inner.clone();
        self.inner
            .dispatcher
            .run_on_owner_sync_with(move || inner.display.with_mut(|d| f(&inner, d)))
    }

    /// Make a surface known to the manager. Replaces any canvas of that name.
    pub fn register_canvas(&self, name: &str, width: u32, height: u32) -> Result<()> {
        let name = name.to_string();
        self.on_owner(move |_, d| d.register_canvas(&name, width, height))
    }

    /// Update the device pixel ratio and zoom used to derive CSS size.
    pub fn set_pixel_scale(&self, name: &str, device_pixel_ratio: f64, zoom: f64) -> Result<()> {
        let name = name.to_string();
        self.on_owner(move |_, d| d.set_pixel_scale(&name, device_pixel_ratio, zoom))?
    }

    /// Snapshot of a canvas, if registered.
    pub fn canvas(&self, name: &str) -> Result<Option<CanvasInfo>> {
        let name = name.to_string();
        self.on_owner(move |_, d| d.canvas(&name))
    }

    /// Set a canvas' backing size on the owner thread.
    ///
    /// Resizing clears the surface. Callers should resize immediately before
    /// re-creating whatever renders into it; the manager does not sequence
    /// that for them.
    pub fn resize_canvas(&self, name: &str, width: u32, height: u32) -> Result<CanvasInfo> {
        let name = name.to_string();
        let info = self.on_owner(move |_, d| d.resize(&name, width, height))??;
        tracing::debug!(canvas = %info.name, width, height, "canvas resized");
        Ok(info)
    }

    /// Raw form of `resize_canvas`. Returns 0 or a negative code; negative
    /// dimensions are rejected without touching the canvas.
    pub fn resize_canvas_raw(&self, name: &str, width: i32, height: i32) -> i32 {
        let (Ok(w), Ok(h)) = (u32::try_from(width), u32::try_from(height)) else {
            return Error::InvalidParameter(format!("canvas size {width}x{height}")).code();
        };
        match self.resize_canvas(name, w, h) {
            Ok(_) => code::SUCCESS,
            Err(e) => e.code(),
        }
    }

    /// Create a context on `canvas`. The context is always proxied when a
    /// worker makes it current.
    pub fn create_context(&self, canvas: &str, attributes: ContextAttributes) -> Result<ContextHandle> {
        self.create(canvas, attributes.normalized())
    }

    /// Create a context only the owner thread may make current.
    pub fn create_owner_only_context(
        &self,
        canvas: &str,
        attributes: ContextAttributes,
    ) -> Result<ContextHandle> {
        let attributes = ContextAttributes {
            proxy: ProxyMode::Disallow,
            ..attributes.normalized()
        };
        self.create(canvas, attributes)
    }

    fn create(&self, canvas: &str, attributes: ContextAttributes) -> Result<ContextHandle> {
        let name = canvas.to_string();
        let result = self.on_owner(move |_, d| d.create(&name, attributes))?;
        match &result {
            Ok(h) => tracing::debug!(%h, canvas, "context created"),
            Err(e) => tracing::debug!(canvas, error = %e, "context creation failed"),
        }
        result
    }

    /// `create_context` returning a raw handle (> 0) or a negative code.
    pub fn create_context_raw(
        &self,
        canvas: &str,
        alpha: bool,
        depth: bool,
        stencil: bool,
        antialias: bool,
        major_version: i32,
    ) -> i32 {
        let attrs = ContextAttributes::new(alpha, depth, stencil, antialias, major_version);
        match self.create_context(canvas, attrs) {
            Ok(h) => h.raw(),
            Err(e) => e.code(),
        }
    }

    /// The calling thread's affinity. Purely local.
    pub fn affinity(&self) -> Affinity {
        affinity::get(self.inner.id).0
    }

    /// The context current on the calling thread. Purely local.
    pub fn current(&self) -> Option<ContextHandle> {
        self.affinity().handle()
    }

    /// `current` as a raw handle, 0 if none.
    pub fn current_raw(&self) -> i32 {
        self.current().map_or(0, ContextHandle::raw)
    }

    /// Make `handle` current on the calling thread.
    ///
    /// On the owner this is a direct registry update. On a worker it costs
    /// one blocking dispatch the first time, installing a proxy; later calls
    /// for the same handle are local unless another thread has taken a
    /// context over in the meantime.
    pub fn make_current(&self, handle: ContextHandle) -> Result<()> {
        let id = self.inner.id;
        let me = current_thread_id();
        let (current, epoch) = affinity::get(id);
        let previous = current.handle().filter(|&p| p != handle);

        if self.inner.dispatcher.is_owner() {
            let epoch = self
                .inner
                .display
                .with_mut(|d| acquire(&self.inner, d, handle, previous, me, false))?;
            affinity::set(id, Affinity::CurrentLocal(handle), epoch);
            return Ok(());
        }

        if current == Affinity::CurrentProxied(handle)
            && epoch == self.inner.transfers.load(Ordering::Acquire)
        {
            return Ok(());
        }
        let epoch = self.on_owner(move |inner, d| acquire(inner, d, handle, previous, me, true))??;
        affinity::set(id, Affinity::CurrentProxied(handle), epoch);
        tracing::debug!(%handle, thread = me, "context proxied to worker");
        Ok(())
    }

    /// Clear the calling thread's current context.
    ///
    /// The owner-side holder record is cleared asynchronously; this never
    /// blocks a worker.
    pub fn release_current(&self) {
        let me = current_thread_id();
        let old = affinity::set(self.inner.id, Affinity::NotCurrent, 0);
        if let Some(handle) = old.handle() {
            let inner = self.inner.clone();
            let _ = self
                .inner
                .dispatcher
                .run_on_owner_async_with(move || inner.display.with_mut(|d| d.release(handle, me)));
        }
    }

    /// Raw form: 0 releases, a positive handle makes current, negatives fail.
    /// Returns 0 or a negative code.
    pub fn make_current_raw(&self, raw: i32) -> i32 {
        if raw == 0 {
            self.release_current();
            return code::SUCCESS;
        }
        match ContextHandle::from_raw(raw) {
            Some(h) => to_code(self.make_current(h)),
            None => Error::InvalidHandle(raw).code(),
        }
    }

    /// Thread id that most recently acquired `handle`, if any still holds it.
    pub fn holder(&self, handle: ContextHandle) -> Result<Option<usize>> {
        self.on_owner(move |_, d| d.holder(handle))
    }

    /// Run `f` against the calling thread's current context.
    ///
    /// Runs in place on the owner; forwarded with a blocking dispatch from a
    /// proxied worker. `f` must not call back into this manager.
    ///
    /// Fails with `AffinityUnavailable` once another thread has taken the
    /// context over; the caller has to `make_current` again first.
    pub fn with_current<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut RenderContext) -> R + Send + 'static,
        R: Send + 'static,
    {
        let me = current_thread_id();
        match self.affinity() {
            Affinity::NotCurrent => Err(Error::InvalidHandle(0)),
            Affinity::CurrentLocal(h) => self.inner.display.with_mut(|d| held(d, h, me).map(f)),
            Affinity::CurrentProxied(h) => self.on_owner(move |_, d| held(d, h, me).map(f))?,
        }
    }
}

/// `handle`'s context, provided `thread` still holds it.
fn held(display: &mut Display, handle: ContextHandle, thread: usize) -> Result<&mut RenderContext> {
    if display.holder(handle) != Some(thread) {
        // Unknown handles fall through to `context_mut`'s error.
        if display.context_mut(handle).is_ok() {
            return Err(Error::AffinityUnavailable(handle.raw()));
        }
    }
    display.context_mut(handle)
}

/// Owner-side half of `make_current`. Returns the transfer epoch to record.
fn acquire(
    inner: &Inner,
    display: &mut Display,
    handle: ContextHandle,
    previous: Option<ContextHandle>,
    thread: usize,
    proxied: bool,
) -> Result<u64> {
    let displaced = display.acquire(handle, thread, proxied)?;
    if let Some(prev) = previous {
        display.release(prev, thread);
    }
    if let Some(from) = displaced {
        tracing::debug!(%handle, from, to = thread, "context affinity displaced");
        inner.transfers.fetch_add(1, Ordering::AcqRel);
    }
    Ok(inner.transfers.load(Ordering::Acquire))
}

impl std::fmt::Debug for ContextManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextManager")
            .field("id", &self.inner.id)
            .field("owner_id", &self.inner.dispatcher.owner_id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DispatchConfig;

    fn owner_manager() -> (ContextManager, crate::dispatch::OwnerLoop) {
        let (d, owner) = Dispatcher::on_current_thread(DispatchConfig::default());
        (ContextManager::new(d), owner)
    }

    #[test]
    fn owner_make_current_is_local() {
        let (m, _owner) = owner_manager();
        m.register_canvas("#c", 320, 240).unwrap();
        let h = m.create_context("#c", ContextAttributes::default()).unwrap();
        assert_eq!(m.current(), None);
        m.make_current(h).unwrap();
        assert_eq!(m.affinity(), Affinity::CurrentLocal(h));
        assert_eq!(m.current_raw(), h.raw());
        assert_eq!(m.dispatcher().stats().sync, 0);
        assert_eq!(m.with_current(|ctx| ctx.drawing_buffer_size()).unwrap(), (320, 240));
    }

    #[test]
    fn raw_entry_points_return_codes() {
        let (m, _owner) = owner_manager();
        m.register_canvas("#c", 1, 1).unwrap();
        assert_eq!(m.create_context_raw("#c", true, true, false, true, 0), code::NOT_SUPPORTED);
        assert_eq!(m.create_context_raw("#x", true, true, false, true, 2), code::UNKNOWN_TARGET);
        let h = m.create_context_raw("#c", true, true, false, true, 2);
        assert!(h > 0);
        assert_eq!(m.make_current_raw(h + 100), code::INVALID_TARGET);
        assert_eq!(m.make_current_raw(-1), code::INVALID_TARGET);
        assert_eq!(m.make_current_raw(h), code::SUCCESS);
        assert_eq!(m.make_current_raw(0), code::SUCCESS);
        assert_eq!(m.current_raw(), 0);
    }

    #[test]
    fn raw_resize_rejects_negative_sizes() {
        let (m, _owner) = owner_manager();
        m.register_canvas("#c", 10, 10).unwrap();
        assert_eq!(m.resize_canvas_raw("#c", -1, 10), code::INVALID_PARAM);
        assert_eq!(m.resize_canvas_raw("#c", 10, i32::MIN), code::INVALID_PARAM);
        assert_eq!(m.canvas("#c").unwrap().unwrap().clear_count, 0);
        assert_eq!(m.resize_canvas_raw("#nope", 4, 4), code::UNKNOWN_TARGET);
        assert_eq!(m.resize_canvas_raw("#c", 0, 32), code::SUCCESS);
        let info = m.canvas("#c").unwrap().unwrap();
        assert_eq!((info.width, info.height, info.clear_count), (0, 32, 1));
    }

    #[test]
    fn switching_contexts_releases_the_previous_one() {
        let (m, _owner) = owner_manager();
        m.register_canvas("#c", 1, 1).unwrap();
        let a = m.create_context("#c", ContextAttributes::default()).unwrap();
        let b = m.create_context("#c", ContextAttributes::default()).unwrap();
        m.make_current(a).unwrap();
        m.make_current(b).unwrap();
        assert_eq!(m.holder(a).unwrap(), None);
        assert_eq!(m.holder(b).unwrap(), Some(current_thread_id()));
        assert_eq!(m.current(), Some(b));
    }

    #[test]
    fn with_current_fails_after_the_context_is_released_elsewhere() {
        let (m, _owner) = owner_manager();
        m.register_canvas("#c", 1, 1).unwrap();
        let h = m.create_context("#c", ContextAttributes::default()).unwrap();
        m.make_current(h).unwrap();
        m.inner.display.with_mut(|d| d.release(h, current_thread_id()));
        assert!(matches!(
            m.with_current(|ctx| ctx.present()),
            Err(Error::AffinityUnavailable(raw)) if raw == h.raw()
        ));
        m.make_current(h).unwrap();
        assert_eq!(m.with_current(|ctx| ctx.present()).unwrap(), 1);
    }

    #[test]
    fn with_current_requires_a_current_context() {
        let (m, _owner) = owner_manager();
        assert!(matches!(m.with_current(|_| ()), Err(Error::InvalidHandle(0))));
    }
}
