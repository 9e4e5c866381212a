use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use learngl_engine::core::{App, FrameCtx};
use learngl_engine::device::Gpu;
use learngl_engine::input::{InputState, Key};
use learngl_engine::paint::Color;
use learngl_engine::render::{GeometryBuffer, Program};
use learngl_engine::window::CloseRequest;

use crate::vertices::{TRIANGLE_A, TRIANGLE_B};

/// Shader sources shipped with the crate.
pub const SHADER_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/shaders");

const CLEAR_COLOR: Color = Color::opaque(0.2, 0.3, 0.3);

/// Green channel for the animated triangle at `seconds` since startup.
///
/// Oscillates over `[0, 1]`.
pub fn green_intensity(seconds: f64) -> f32 {
    ((seconds.sin() / 2.0) + 0.5) as f32
}

/// Escape requests a close; the loop honors it on its next iteration.
pub fn process_input(input: &InputState, close: &mut CloseRequest) {
    if input.key_down(Key::Escape) {
        close.request();
    }
}

struct Resources {
    shader1: Program,
    shader2: Program,
    geometry1: GeometryBuffer,
    geometry2: GeometryBuffer,
}

/// Draws two triangles; the second one's color pulses with time.
pub struct TrianglesApp {
    shader_dir: PathBuf,
    resources: Option<Resources>,
}

impl TrianglesApp {
    pub fn new(shader_dir: impl AsRef<Path>) -> Self {
        Self {
            shader_dir: shader_dir.as_ref().to_path_buf(),
            resources: None,
        }
    }

    fn load_program(&self, gpu: &Gpu<'_>, label: &str, vs: &str, fs: &str) -> Result<Program> {
        Program::from_files(
            gpu.device(),
            gpu.surface_format(),
            label,
            self.shader_dir.join(vs),
            self.shader_dir.join(fs),
        )
        .with_context(|| format!("failed to build shader program `{label}`"))
    }
}

impl App for TrianglesApp {
    fn on_init(&mut self, gpu: &Gpu<'_>) -> Result<()> {
        let shader1 = self.load_program(gpu, "shader1", "vshader1.wgsl", "fshader1.wgsl")?;
        let shader2 = self.load_program(gpu, "shader2", "vshader1.wgsl", "fshader2.wgsl")?;

        let geometry1 = GeometryBuffer::upload(gpu.device(), "triangle A", &TRIANGLE_A);
        let geometry2 = GeometryBuffer::upload(gpu.device(), "triangle B", &TRIANGLE_B);

        self.resources = Some(Resources {
            shader1,
            shader2,
            geometry1,
            geometry2,
        });
        Ok(())
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> Result<()> {
        let res = self
            .resources
            .as_mut()
            .context("frame requested before resources were created")?;

        process_input(ctx.input, ctx.close);

        let green = green_intensity(ctx.time.elapsed);

        ctx.render(CLEAR_COLOR, |pass| {
            pass.use_program(&res.shader1);
            pass.bind_geometry(&res.geometry1);
            pass.draw_triangles(0..res.geometry1.vertex_count());

            pass.use_program(&res.shader2);
            res.shader2.set_float(pass.queue(), "greenVal", green);
            pass.bind_geometry(&res.geometry2);
            pass.draw_triangles(0..res.geometry2.vertex_count());

            pass.unbind_geometry();
        })
    }

    fn on_exit(&mut self) {
        self.resources = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use learngl_engine::input::{InputEvent, KeyState};
    use learngl_engine::render::{link, ShaderError, UniformBlock, Vertex};

    const VSHADER1: &str = include_str!("../shaders/vshader1.wgsl");
    const FSHADER1: &str = include_str!("../shaders/fshader1.wgsl");
    const FSHADER2: &str = include_str!("../shaders/fshader2.wgsl");

    #[test]
    fn green_starts_at_half() {
        assert_eq!(green_intensity(0.0), 0.5);
    }

    #[test]
    fn green_peaks_at_quarter_turn() {
        let g = green_intensity(std::f64::consts::FRAC_PI_2);
        assert!((g - 1.0).abs() < 1e-6, "{g}");
    }

    #[test]
    fn green_stays_in_unit_range() {
        for i in -2000..2000 {
            let t = i as f64 * 0.0137;
            let g = green_intensity(t);
            assert!((0.0..=1.0).contains(&g), "t={t} g={g}");
        }
        let g = green_intensity(1.0e9);
        assert!((0.0..=1.0).contains(&g));
    }

    #[test]
    fn escape_sets_close_flag_for_good() {
        let mut input = InputState::default();
        let mut close = CloseRequest::default();

        process_input(&input, &mut close);
        assert!(!close.is_requested());

        input.apply_event(&InputEvent::Key {
            key: Key::Escape,
            state: KeyState::Pressed,
            repeat: false,
        });
        process_input(&input, &mut close);
        assert!(close.is_requested());

        input.apply_event(&InputEvent::Key {
            key: Key::Escape,
            state: KeyState::Released,
            repeat: false,
        });
        process_input(&input, &mut close);
        assert!(close.is_requested());
    }

    #[test]
    fn shipped_shaders_link() {
        let plain = link(VSHADER1, FSHADER1, &Vertex::ATTRIBUTES).unwrap();
        assert!(plain.uniforms.is_none());

        let pulsing = link(VSHADER1, FSHADER2, &Vertex::ATTRIBUTES).unwrap();
        let layout = pulsing.uniforms.unwrap();
        assert!(layout.field("greenVal").is_some());
    }

    #[test]
    fn unknown_uniform_leaves_green_untouched() {
        let layout = link(VSHADER1, FSHADER2, &Vertex::ATTRIBUTES)
            .unwrap()
            .uniforms
            .unwrap();
        let mut block = UniformBlock::new(layout);
        block.set_float("greenVal", 0.25);
        assert_eq!(block.set_float("blueVal", 0.9), None);
        assert_eq!(block.get_float("greenVal"), Some(0.25));
    }

    #[test]
    fn shipped_shaders_exist_on_disk() {
        let dir = Path::new(SHADER_DIR);
        for name in ["vshader1.wgsl", "fshader1.wgsl", "fshader2.wgsl"] {
            learngl_engine::render::read_source(dir.join(name)).unwrap();
        }
        let missing = learngl_engine::render::read_source(dir.join("nope.wgsl"));
        assert!(matches!(missing, Err(ShaderError::SourceRead { .. })));
    }
}
