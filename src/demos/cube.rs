//! Vertex-coloured spinning cube

use super::{
    attrib_location, build_program, create_buffer, delete_buffers, delete_program, float_attribute,
    projection, uniform_location, CubeSpin, CUBE_INDICES, CUBE_POSITIONS,
};
use crate::app::{AppInfo, FrameInfo, GlApp};
use crate::renderer::damage::DamageRect;
use anyhow::Result;
use cgmath::Matrix4;
use gl::types::{GLint, GLuint};

const VERTEX_SHADER: &str = r#"
uniform mat4 proj;
uniform mat4 model;
attribute vec4 pos;
attribute vec4 col;
varying vec4 v_color;
void main()
{
    gl_Position = proj * model * pos;
    v_color = col;
}
"#;

const FRAGMENT_SHADER: &str = r#"
precision mediump float;
varying vec4 v_color;
void main()
{
    gl_FragColor = v_color;
}
"#;

/// One colour per face, same face order as the cube positions
#[rustfmt::skip]
const FACE_COLORS: [[f32; 4]; 6] = [
    [1.0, 1.0, 1.0, 1.0],
    [1.0, 0.0, 0.0, 1.0],
    [0.0, 1.0, 0.0, 1.0],
    [0.0, 0.0, 1.0, 1.0],
    [1.0, 1.0, 0.0, 1.0],
    [1.0, 0.0, 1.0, 1.0],
];

/// Per-vertex colours: each face colour repeated for its four corners
pub fn vertex_colors() -> Vec<[f32; 4]> {
    FACE_COLORS
        .iter()
        .flat_map(|color| std::iter::repeat(*color).take(4))
        .collect()
}

/// Uploads a uniform 4x4 matrix
pub(super) fn set_matrix(location: GLint, matrix: &Matrix4<f32>) {
    let values: &[f32; 16] = matrix.as_ref();
    unsafe { gl::UniformMatrix4fv(location, 1, gl::FALSE, values.as_ptr()) };
}

#[derive(Debug, Default)]
pub struct CubeDemo {
    program: GLuint,
    proj: GLint,
    model: GLint,
    buffers: [GLuint; 3],
    spin: CubeSpin,
}

impl CubeDemo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info() -> AppInfo {
        AppInfo::new("gl-cube", "org.gles_demos.gl-cube", 500, 500)
    }
}

impl GlApp for CubeDemo {
    fn init_gl(&mut self) -> Result<()> {
        self.program = build_program(VERTEX_SHADER, FRAGMENT_SHADER)?;
        let pos = attrib_location(self.program, "pos")?;
        let col = attrib_location(self.program, "col")?;
        self.proj = uniform_location(self.program, "proj")?;
        self.model = uniform_location(self.program, "model")?;

        unsafe { gl::UseProgram(self.program) };

        self.buffers[0] = create_buffer(gl::ARRAY_BUFFER, &CUBE_POSITIONS, gl::STATIC_DRAW);
        float_attribute(pos, 3);
        self.buffers[1] = create_buffer(gl::ARRAY_BUFFER, &vertex_colors(), gl::STATIC_DRAW);
        float_attribute(col, 4);
        self.buffers[2] = create_buffer(gl::ELEMENT_ARRAY_BUFFER, &CUBE_INDICES, gl::STATIC_DRAW);

        unsafe {
            gl::Enable(gl::BLEND);
            gl::BlendFunc(gl::SRC_ALPHA, gl::ONE_MINUS_SRC_ALPHA);
            gl::Enable(gl::DEPTH_TEST);
            gl::Enable(gl::CULL_FACE);
            gl::CullFace(gl::BACK);
        }
        Ok(())
    }

    fn redraw(&mut self, frame: &FrameInfo, damage: &mut DamageRect) {
        let size = frame.buffer_size;
        self.spin.advance();

        unsafe {
            gl::Viewport(0, 0, size.width, size.height);
            gl::ClearColor(0.0, 0.0, 0.0, 0.5);
            gl::Clear(gl::COLOR_BUFFER_BIT | gl::DEPTH_BUFFER_BIT);
            gl::UseProgram(self.program);
        }

        set_matrix(self.proj, &projection(size.width, size.height));
        set_matrix(self.model, &self.spin.model());

        unsafe {
            gl::DrawElements(
                gl::TRIANGLES,
                CUBE_INDICES.len() as i32,
                gl::UNSIGNED_SHORT,
                std::ptr::null(),
            );
        }

        *damage = DamageRect::centered(size.width, size.height, 2);
    }

    fn deinit_gl(&mut self) {
        delete_buffers(&self.buffers);
        self.buffers = [0; 3];
        delete_program(&mut self.program);
    }
}
