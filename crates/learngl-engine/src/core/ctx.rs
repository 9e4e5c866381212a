use anyhow::{bail, Result};
use winit::window::Window;

use crate::coords::Viewport;
use crate::device::{Gpu, SurfaceErrorAction};
use crate::input::InputState;
use crate::paint::Color;
use crate::render::DrawPass;
use crate::time::FrameTime;
use crate::window::CloseRequest;

/// Per-frame context passed to `core::App::on_frame`.
///
/// Lifetimes:
/// - `'a` is the duration of the callback invocation
/// - `'w` is the window-borrow lifetime carried by `Gpu<'w>`
pub struct FrameCtx<'a, 'w> {
    pub window: &'a Window,
    pub gpu: &'a mut Gpu<'w>,
    pub input: &'a InputState,
    pub viewport: Viewport,
    pub close: &'a mut CloseRequest,
    pub time: FrameTime,
}

impl<'a, 'w> FrameCtx<'a, 'w> {
    /// Clears the frame to `clear`, runs `draw` inside a single render pass
    /// covering the viewport, then presents.
    ///
    /// Frames are skipped while the framebuffer has zero area or the surface
    /// is being reconfigured. Running out of memory on acquire is an error.
    pub fn render<F>(&mut self, clear: Color, draw: F) -> Result<()>
    where
        F: FnOnce(&mut DrawPass<'_>),
    {
        if self.viewport.is_empty() {
            return Ok(());
        }

        let mut frame = match self.gpu.begin_frame() {
            Ok(f) => f,
            Err(err) => {
                if self.gpu.handle_surface_error(err) == SurfaceErrorAction::Fatal {
                    bail!("surface out of memory while acquiring a frame");
                }
                return Ok(());
            }
        };

        // The pass borrows the encoder; it must end before submit() takes the frame.
        {
            let mut rpass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("learngl frame pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear.to_wgpu()),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            let (x, y, w, h) = self.viewport.as_f32();
            rpass.set_viewport(x, y, w, h, 0.0, 1.0);

            let mut pass = DrawPass::new(rpass, self.gpu.queue());
            draw(&mut pass);
        }

        self.window.pre_present_notify();
        self.gpu.submit(frame);

        Ok(())
    }
}
