use anyhow::Result;

use crate::device::Gpu;

use super::ctx::FrameCtx;

/// Application contract driven by the window runtime.
pub trait App {
    /// Called once after the window and device exist, before the first frame.
    ///
    /// An error here is fatal: the runtime stops and returns it.
    fn on_init(&mut self, gpu: &Gpu<'_>) -> Result<()> {
        let _ = gpu;
        Ok(())
    }

    /// Called once per render-loop iteration.
    ///
    /// To close, set `ctx.close`; the runtime stops at the start of the next
    /// iteration. An error here is fatal.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> Result<()>;

    /// Called once before device resources are released.
    fn on_exit(&mut self) {}
}
