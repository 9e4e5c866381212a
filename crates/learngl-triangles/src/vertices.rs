use learngl_engine::render::Vertex;

const RED: [f32; 3] = [1.0, 0.0, 0.0];
const GREEN: [f32; 3] = [0.0, 1.0, 0.0];
const BLUE: [f32; 3] = [0.0, 0.0, 1.0];

/// Upper-left half of the quad.
pub const TRIANGLE_A: [Vertex; 3] = [
    Vertex::new([0.5, 0.5, 0.0], RED),    // top right
    Vertex::new([0.5, -0.5, 0.0], GREEN), // bottom right
    Vertex::new([-0.5, 0.5, 0.0], BLUE),  // top left
];

/// Lower-left half of the quad.
pub const TRIANGLE_B: [Vertex; 3] = [
    Vertex::new([0.5, -0.5, 0.0], RED),   // bottom right
    Vertex::new([-0.5, -0.5, 0.0], GREEN), // bottom left
    Vertex::new([-0.5, 0.5, 0.0], BLUE),  // top left
];
