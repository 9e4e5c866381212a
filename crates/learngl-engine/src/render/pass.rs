use std::ops::Range;

use super::geometry::GeometryBuffer;
use super::shader::Program;

/// Which pieces of draw state are currently bound.
///
/// The device keeps "active program" and "bound vertex buffer" as implicit
/// state; this mirrors it so draws can assert that both are in place.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct BindState {
    pub program_active: bool,
    pub geometry_bound: bool,
}

impl BindState {
    #[inline]
    pub fn can_draw(self) -> bool {
        self.program_active && self.geometry_bound
    }
}

/// One render pass over the frame's color target.
///
/// Calls are recorded in the order they are made; the device consumes them in
/// that order, so program activation and geometry binding must precede each
/// draw.
pub struct DrawPass<'a> {
    rpass: wgpu::RenderPass<'a>,
    queue: &'a wgpu::Queue,
    state: BindState,
}

impl<'a> DrawPass<'a> {
    pub(crate) fn new(rpass: wgpu::RenderPass<'a>, queue: &'a wgpu::Queue) -> Self {
        Self {
            rpass,
            queue,
            state: BindState::default(),
        }
    }

    /// Queue for uniform uploads made while the pass is open.
    pub fn queue(&self) -> &'a wgpu::Queue {
        self.queue
    }

    /// Makes `program` the active program for subsequent draws.
    pub fn use_program(&mut self, program: &Program) {
        self.rpass.set_pipeline(program.pipeline());
        if let Some(bind_group) = program.bind_group() {
            self.rpass.set_bind_group(0, bind_group, &[]);
        }
        self.state.program_active = true;
    }

    /// Binds `geometry` as the vertex source for subsequent draws.
    pub fn bind_geometry(&mut self, geometry: &GeometryBuffer) {
        self.rpass.set_vertex_buffer(0, geometry.buffer().slice(..));
        self.state.geometry_bound = true;
    }

    /// Forgets the bound geometry; the next draw needs a fresh `bind_geometry`.
    pub fn unbind_geometry(&mut self) {
        self.state.geometry_bound = false;
    }

    /// Draws `vertices` of the bound geometry as a triangle list.
    pub fn draw_triangles(&mut self, vertices: Range<u32>) {
        debug_assert!(
            self.state.can_draw(),
            "draw issued without an active program and bound geometry: {:?}",
            self.state
        );
        self.rpass.draw(vertices, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drawing_needs_program_and_geometry() {
        let mut s = BindState::default();
        assert!(!s.can_draw());
        s.program_active = true;
        assert!(!s.can_draw());
        s.geometry_bound = true;
        assert!(s.can_draw());
    }
}
