//! Shader programs: a vertex + fragment pair linked into a render pipeline.
//!
//! Compilation and linking are checked up front with naga so failures surface
//! as a [`ShaderError`] carrying the diagnostic text, instead of a device-level
//! validation panic later on.

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use naga::valid::{Capabilities, ValidationFlags, Validator};
use naga::{AddressSpace, Binding, Handle, Module, ScalarKind, Type, TypeInner};
use wgpu::util::DeviceExt;

use super::geometry::{attribute_shader_type, Vertex};
use super::uniform::{UniformBlock, UniformLayout, UNIFORM_BINDING, UNIFORM_GROUP};

/// Fragment output slot of the single color target.
const COLOR_TARGET_LOCATION: u32 = 0;

/// Programmable pipeline stage.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    fn naga(self) -> naga::ShaderStage {
        match self {
            Self::Vertex => naga::ShaderStage::Vertex,
            Self::Fragment => naga::ShaderStage::Fragment,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
        })
    }
}

/// Shader loading, compile, and link failures.
#[derive(Debug)]
pub enum ShaderError {
    /// A source file is missing or unreadable.
    SourceRead { path: PathBuf, source: io::Error },
    /// A stage failed to parse or validate.
    Compile { stage: ShaderStage, log: String },
    /// The stages compiled but do not fit together.
    Link { log: String },
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceRead { path, .. } => {
                write!(f, "failed to read shader source `{}`", path.display())
            }
            Self::Compile { stage, log } => write!(f, "{stage} shader failed to compile:\n{log}"),
            Self::Link { log } => write!(f, "shader program failed to link: {log}"),
        }
    }
}

impl std::error::Error for ShaderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::SourceRead { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Reads a shader source file.
pub fn read_source(path: impl AsRef<Path>) -> Result<String, ShaderError> {
    let path = path.as_ref();
    std::fs::read_to_string(path).map_err(|source| ShaderError::SourceRead {
        path: path.to_path_buf(),
        source,
    })
}

/// Result of compiling and linking a stage pair, before any device object exists.
#[derive(Debug, Clone)]
pub struct LinkedProgram {
    pub vertex_entry: String,
    pub fragment_entry: String,
    pub uniforms: Option<UniformLayout>,
    pub uniform_visibility: wgpu::ShaderStages,
}

struct CompiledStage {
    module: Module,
    entry: usize,
}

impl CompiledStage {
    fn entry_point(&self) -> &naga::EntryPoint {
        &self.module.entry_points[self.entry]
    }
}

fn compile_stage(source: &str, stage: ShaderStage) -> Result<CompiledStage, ShaderError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| ShaderError::Compile {
        stage,
        log: e.emit_to_string(source),
    })?;

    Validator::new(ValidationFlags::all(), Capabilities::default())
        .validate(&module)
        .map_err(|e| ShaderError::Compile {
            stage,
            log: e.emit_to_string(source),
        })?;

    let entry = module
        .entry_points
        .iter()
        .position(|ep| ep.stage == stage.naga())
        .ok_or_else(|| ShaderError::Compile {
            stage,
            log: format!("no @{stage} entry point"),
        })?;

    Ok(CompiledStage { module, entry })
}

/// `@location` slots reachable from a binding, flattening IO structs.
fn collect_locations(
    module: &Module,
    ty: Handle<Type>,
    binding: Option<&Binding>,
    out: &mut BTreeMap<u32, TypeInner>,
) {
    match binding {
        Some(Binding::Location { location, .. }) => {
            out.insert(*location, module.types[ty].inner.clone());
        }
        Some(Binding::BuiltIn(_)) => {}
        None => {
            if let TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for m in members {
                    collect_locations(module, m.ty, m.binding.as_ref(), out);
                }
            }
        }
    }
}

fn stage_inputs(stage: &CompiledStage) -> BTreeMap<u32, TypeInner> {
    let mut out = BTreeMap::new();
    for arg in &stage.entry_point().function.arguments {
        collect_locations(&stage.module, arg.ty, arg.binding.as_ref(), &mut out);
    }
    out
}

fn stage_outputs(stage: &CompiledStage) -> BTreeMap<u32, TypeInner> {
    let mut out = BTreeMap::new();
    if let Some(result) = &stage.entry_point().function.result {
        collect_locations(&stage.module, result.ty, result.binding.as_ref(), &mut out);
    }
    out
}

fn check_vertex_inputs(
    vertex: &CompiledStage,
    attributes: &[wgpu::VertexAttribute],
) -> Result<(), ShaderError> {
    for (location, ty) in stage_inputs(vertex) {
        let attr = attributes
            .iter()
            .find(|a| a.shader_location == location)
            .ok_or_else(|| ShaderError::Link {
                log: format!("vertex input @location({location}) has no vertex attribute"),
            })?;
        if attribute_shader_type(attr.format).as_ref() != Some(&ty) {
            return Err(ShaderError::Link {
                log: format!(
                    "vertex input @location({location}) is {ty:?}, attribute format is {:?}",
                    attr.format
                ),
            });
        }
    }
    Ok(())
}

fn check_stage_interface(vertex: &CompiledStage, fragment: &CompiledStage) -> Result<(), ShaderError> {
    let produced = stage_outputs(vertex);
    for (location, ty) in stage_inputs(fragment) {
        match produced.get(&location) {
            None => {
                return Err(ShaderError::Link {
                    log: format!(
                        "fragment input @location({location}) is not written by the vertex stage"
                    ),
                });
            }
            Some(out_ty) if *out_ty != ty => {
                return Err(ShaderError::Link {
                    log: format!(
                        "@location({location}) type mismatch: vertex writes {out_ty:?}, fragment reads {ty:?}"
                    ),
                });
            }
            Some(_) => {}
        }
    }
    Ok(())
}

/// Rejects resources the program layout does not provide.
///
/// A program's only resource is its uniform block at
/// `@group(0) @binding(0)`; textures, samplers and storage buffers have no
/// binding to land in.
fn check_resource_bindings(stage: &CompiledStage, which: ShaderStage) -> Result<(), ShaderError> {
    for (_, var) in stage.module.global_variables.iter() {
        let Some(binding) = &var.binding else {
            continue;
        };
        let name = var.name.as_deref().unwrap_or("<unnamed>");

        if var.space != AddressSpace::Uniform {
            return Err(ShaderError::Link {
                log: format!(
                    "{which} resource `{name}` at @group({}) @binding({}) is not provided by the program layout",
                    binding.group, binding.binding
                ),
            });
        }
        if binding.group != UNIFORM_GROUP || binding.binding != UNIFORM_BINDING {
            return Err(ShaderError::Link {
                log: format!(
                    "{which} uniform `{name}` must be bound at @group({UNIFORM_GROUP}) @binding({UNIFORM_BINDING})"
                ),
            });
        }
    }
    Ok(())
}

/// Programs render into one float color target at `@location(0)`.
fn check_fragment_outputs(fragment: &CompiledStage) -> Result<(), ShaderError> {
    for (location, ty) in stage_outputs(fragment) {
        if location != COLOR_TARGET_LOCATION {
            return Err(ShaderError::Link {
                log: format!("fragment output @location({location}) has no color target"),
            });
        }
        let writes_float = match &ty {
            TypeInner::Scalar(scalar) | TypeInner::Vector { scalar, .. } => {
                scalar.kind == ScalarKind::Float
            }
            _ => false,
        };
        if !writes_float {
            return Err(ShaderError::Link {
                log: format!(
                    "fragment output @location({location}) is {ty:?}, the color target takes floats"
                ),
            });
        }
    }
    Ok(())
}

/// Compiles both stages and checks that they link against each other and
/// against the vertex `attributes` they will be fed with.
pub fn link(
    vertex_source: &str,
    fragment_source: &str,
    attributes: &[wgpu::VertexAttribute],
) -> Result<LinkedProgram, ShaderError> {
    let vertex = compile_stage(vertex_source, ShaderStage::Vertex)?;
    let fragment = compile_stage(fragment_source, ShaderStage::Fragment)?;

    check_vertex_inputs(&vertex, attributes)?;
    check_stage_interface(&vertex, &fragment)?;
    check_fragment_outputs(&fragment)?;
    check_resource_bindings(&vertex, ShaderStage::Vertex)?;
    check_resource_bindings(&fragment, ShaderStage::Fragment)?;

    let vs_uniforms = UniformLayout::reflect(&vertex.module);
    let fs_uniforms = UniformLayout::reflect(&fragment.module);

    let mut visibility = wgpu::ShaderStages::NONE;
    if vs_uniforms.is_some() {
        visibility |= wgpu::ShaderStages::VERTEX;
    }
    if fs_uniforms.is_some() {
        visibility |= wgpu::ShaderStages::FRAGMENT;
    }

    let uniforms = match (vs_uniforms, fs_uniforms) {
        (Some(vs), Some(fs)) if vs != fs => {
            return Err(ShaderError::Link {
                log: "vertex and fragment stages declare different uniform blocks".to_string(),
            });
        }
        (vs, fs) => vs.or(fs),
    };

    Ok(LinkedProgram {
        vertex_entry: vertex.entry_point().name.clone(),
        fragment_entry: fragment.entry_point().name.clone(),
        uniforms,
        uniform_visibility: visibility,
    })
}

struct ProgramUniforms {
    block: UniformBlock,
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// A linked vertex + fragment program.
///
/// Immutable after creation except for uniform values. Activate it with
/// [`DrawPass::use_program`](super::DrawPass::use_program).
pub struct Program {
    label: String,
    pipeline: wgpu::RenderPipeline,
    uniforms: Option<ProgramUniforms>,
}

impl Program {
    /// Compiles and links a program from WGSL sources.
    pub fn compile(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        label: &str,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<Self, ShaderError> {
        let linked = link(vertex_source, fragment_source, &Vertex::ATTRIBUTES)?;

        // Anything naga accepted but the device still rejects is reported here
        // instead of reaching the uncaptured-error handler.
        let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);

        let vertex_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{label} vertex")),
            source: wgpu::ShaderSource::Wgsl(vertex_source.into()),
        });
        let fragment_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{label} fragment")),
            source: wgpu::ShaderSource::Wgsl(fragment_source.into()),
        });

        let uniform_parts = linked.uniforms.clone().map(|layout| {
            let block = UniformBlock::new(layout);
            let bind_group_layout =
                device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some(&format!("{label} bgl")),
                    entries: &[wgpu::BindGroupLayoutEntry {
                        binding: UNIFORM_BINDING,
                        visibility: linked.uniform_visibility,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: wgpu::BufferSize::new(block.bytes().len() as u64),
                        },
                        count: None,
                    }],
                });
            (block, bind_group_layout)
        });

        let bind_group_layouts: Vec<&wgpu::BindGroupLayout> =
            uniform_parts.iter().map(|(_, bgl)| bgl).collect();

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{label} pipeline layout")),
            bind_group_layouts: &bind_group_layouts,
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(&pipeline_layout),

            vertex: wgpu::VertexState {
                module: &vertex_module,
                entry_point: Some(linked.vertex_entry.as_str()),
                compilation_options: Default::default(),
                buffers: &[Vertex::layout()],
            },

            fragment: Some(wgpu::FragmentState {
                module: &fragment_module,
                entry_point: Some(linked.fragment_entry.as_str()),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let uniforms = uniform_parts.map(|(block, bind_group_layout)| {
            let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} uniforms")),
                contents: block.bytes(),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("{label} bind group")),
                layout: &bind_group_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: UNIFORM_BINDING,
                    resource: buffer.as_entire_binding(),
                }],
            });
            ProgramUniforms {
                block,
                buffer,
                bind_group,
            }
        });

        if let Some(err) = pollster::block_on(scope.pop()) {
            return Err(ShaderError::Link {
                log: err.to_string(),
            });
        }

        let names: Vec<&str> = uniforms
            .iter()
            .flat_map(|u| u.block.layout().fields())
            .map(|f| f.name.as_str())
            .collect();
        log::info!("linked program `{label}` (uniforms: {names:?})");

        Ok(Self {
            label: label.to_string(),
            pipeline,
            uniforms,
        })
    }

    /// Reads both stage sources from disk, then compiles.
    pub fn from_files(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        label: &str,
        vertex_path: impl AsRef<Path>,
        fragment_path: impl AsRef<Path>,
    ) -> Result<Self, ShaderError> {
        let vertex_source = read_source(vertex_path)?;
        let fragment_source = read_source(fragment_path)?;
        Self::compile(device, surface_format, label, &vertex_source, &fragment_source)
    }

    /// Sets the `f32` uniform `name`.
    ///
    /// Names the program does not declare are ignored.
    pub fn set_float(&mut self, queue: &wgpu::Queue, name: &str, value: f32) {
        let block = self.uniforms.as_mut().map(|u| &mut u.block);
        let Some(offset) = shadow_float(block, &self.label, name, value) else {
            return;
        };
        if let Some(uniforms) = &self.uniforms {
            queue.write_buffer(&uniforms.buffer, offset as u64, bytemuck::bytes_of(&value));
        }
    }

    pub(crate) fn pipeline(&self) -> &wgpu::RenderPipeline {
        &self.pipeline
    }

    pub(crate) fn bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.uniforms.as_ref().map(|u| &u.bind_group)
    }
}

/// Writes `value` into the CPU shadow of a program's uniform block.
///
/// Returns the byte offset to upload, or `None` when the program has no block
/// or no `f32` member called `name`.
fn shadow_float(
    block: Option<&mut UniformBlock>,
    label: &str,
    name: &str,
    value: f32,
) -> Option<u32> {
    let Some(block) = block else {
        log::trace!("program `{label}` has no uniforms; ignoring `{name}`");
        return None;
    };
    let offset = block.set_float(name, value);
    if offset.is_none() {
        log::trace!("program `{label}` has no f32 uniform `{name}`");
    }
    offset
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERTEX: &str = r#"
        struct VertexInput {
            @location(0) position: vec3<f32>,
            @location(1) color: vec3<f32>,
        };

        struct VertexOutput {
            @builtin(position) clip_position: vec4<f32>,
            @location(0) color: vec3<f32>,
        };

        @vertex
        fn vs_main(in: VertexInput) -> VertexOutput {
            var out: VertexOutput;
            out.clip_position = vec4<f32>(in.position, 1.0);
            out.color = in.color;
            return out;
        }
    "#;

    const FRAGMENT: &str = r#"
        struct Uniforms {
            greenVal: f32,
        };
        @group(0) @binding(0) var<uniform> uniforms: Uniforms;

        @fragment
        fn fs_main(@location(0) color: vec3<f32>) -> @location(0) vec4<f32> {
            return vec4<f32>(color.r * 0.0, uniforms.greenVal, 0.0, 1.0);
        }
    "#;

    fn link_pair(vs: &str, fs: &str) -> Result<LinkedProgram, ShaderError> {
        link(vs, fs, &Vertex::ATTRIBUTES)
    }

    #[test]
    fn valid_pair_links() {
        let linked = link_pair(VERTEX, FRAGMENT).unwrap();
        assert_eq!(linked.vertex_entry, "vs_main");
        assert_eq!(linked.fragment_entry, "fs_main");
        assert_eq!(linked.uniform_visibility, wgpu::ShaderStages::FRAGMENT);
        assert!(linked.uniforms.unwrap().field("greenVal").is_some());
    }

    #[test]
    fn missing_semicolon_reports_compile_diagnostic() {
        let broken = FRAGMENT.replace(
            "return vec4<f32>(color.r * 0.0, uniforms.greenVal, 0.0, 1.0);",
            "let x = 1.0\n return vec4<f32>(x);",
        );
        match link_pair(VERTEX, &broken) {
            Err(ShaderError::Compile { stage, log }) => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert!(!log.is_empty());
            }
            other => panic!("expected compile error, got {other:?}"),
        }
    }

    #[test]
    fn type_error_in_vertex_stage_is_reported_for_vertex() {
        let broken = VERTEX.replace("vec4<f32>(in.position, 1.0)", "in.position");
        let err = link_pair(&broken, FRAGMENT).unwrap_err();
        assert!(matches!(err, ShaderError::Compile { stage: ShaderStage::Vertex, .. }));
        assert!(err.to_string().starts_with("vertex shader failed to compile"));
    }

    #[test]
    fn stage_without_entry_point_fails() {
        let no_entry = "fn helper() -> f32 { return 1.0; }";
        let err = link_pair(VERTEX, no_entry).unwrap_err();
        match err {
            ShaderError::Compile { stage, log } => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert!(log.contains("entry point"));
            }
            other => panic!("expected compile error, got {other:?}"),
        }
    }

    #[test]
    fn unproduced_fragment_input_fails_to_link() {
        let fs = FRAGMENT.replace("@location(0) color", "@location(3) color");
        let err = link_pair(VERTEX, &fs).unwrap_err();
        assert!(matches!(err, ShaderError::Link { .. }), "{err:?}");
        assert!(err.to_string().contains("@location(3)"));
    }

    #[test]
    fn interface_type_mismatch_fails_to_link() {
        let fs = FRAGMENT
            .replace("@location(0) color: vec3<f32>", "@location(0) color: vec4<f32>");
        let err = link_pair(VERTEX, &fs).unwrap_err();
        assert!(matches!(err, ShaderError::Link { .. }), "{err:?}");
    }

    #[test]
    fn vertex_input_without_attribute_fails_to_link() {
        let vs = VERTEX.replace("@location(1) color", "@location(2) color");
        let err = link_pair(&vs, FRAGMENT).unwrap_err();
        assert!(err.to_string().contains("no vertex attribute"), "{err}");
    }

    #[test]
    fn uniform_outside_binding_zero_fails_to_link() {
        let fs = FRAGMENT.replace("@binding(0)", "@binding(1)");
        let err = link_pair(VERTEX, &fs).unwrap_err();
        assert!(matches!(err, ShaderError::Link { .. }), "{err:?}");
    }

    #[test]
    fn texture_without_layout_slot_fails_to_link() {
        let fs = r#"
            @group(0) @binding(1) var tex: texture_2d<f32>;

            @fragment
            fn fs_main(@location(0) color: vec3<f32>) -> @location(0) vec4<f32> {
                return textureLoad(tex, vec2<i32>(0, 0), 0) * vec4<f32>(color, 1.0);
            }
        "#;
        let err = link_pair(VERTEX, fs).unwrap_err();
        assert!(matches!(err, ShaderError::Link { .. }), "{err:?}");
        assert!(err.to_string().contains("`tex`"), "{err}");
    }

    #[test]
    fn storage_buffer_fails_to_link() {
        let fs = r#"
            @group(0) @binding(0) var<storage, read> values: array<f32>;

            @fragment
            fn fs_main(@location(0) color: vec3<f32>) -> @location(0) vec4<f32> {
                return vec4<f32>(color * values[0], 1.0);
            }
        "#;
        let err = link_pair(VERTEX, fs).unwrap_err();
        assert!(matches!(err, ShaderError::Link { .. }), "{err:?}");
    }

    #[test]
    fn output_beyond_color_target_fails_to_link() {
        let fs = FRAGMENT.replace("-> @location(0) vec4<f32>", "-> @location(1) vec4<f32>");
        let err = link_pair(VERTEX, &fs).unwrap_err();
        assert!(matches!(err, ShaderError::Link { .. }), "{err:?}");
        assert!(err.to_string().contains("@location(1)"), "{err}");
    }

    #[test]
    fn integer_color_output_fails_to_link() {
        let fs = r#"
            @fragment
            fn fs_main(@location(0) color: vec3<f32>) -> @location(0) vec4<u32> {
                return vec4<u32>(vec3<u32>(color), 1u);
            }
        "#;
        let err = link_pair(VERTEX, fs).unwrap_err();
        assert!(matches!(err, ShaderError::Link { .. }), "{err:?}");
    }

    #[test]
    fn program_without_uniforms_ignores_set_float() {
        assert_eq!(shadow_float(None, "shader1", "greenVal", 0.5), None);
    }

    #[test]
    fn shadow_float_returns_offset_only_for_known_names() {
        let layout = link_pair(VERTEX, FRAGMENT).unwrap().uniforms.unwrap();
        let mut block = UniformBlock::new(layout);

        assert_eq!(shadow_float(Some(&mut block), "shader2", "greenVal", 0.5), Some(0));
        assert_eq!(shadow_float(Some(&mut block), "shader2", "blueVal", 0.9), None);
        assert_eq!(block.get_float("greenVal"), Some(0.5));
    }

    #[test]
    fn missing_file_is_a_source_read_error() {
        let err = read_source("definitely/not/here.wgsl").unwrap_err();
        assert!(matches!(err, ShaderError::SourceRead { .. }));
        assert!(std::error::Error::source(&err).is_some());
    }
}
