//! Points laid out by a compute shader
//!
//! The compute program writes positions and colours into two shader storage
//! buffers, which the render program then reads back as vertex attributes.

use super::{
    build_program, build_program_with, delete_buffers, delete_program, delete_texture,
    storage_buffer, upload_texture,
};
use crate::app::{AppInfo, FrameInfo, GlApp};
use crate::assets;
use crate::renderer::damage::DamageRect;
use crate::shader::ShaderBuilder;
use anyhow::Result;
use gl::types::{GLint, GLuint};

pub const BALL_COUNT: usize = 8;
/// `local_size_x` of the compute shader
pub const WORKGROUP_SIZE: usize = 4;
pub const DISPATCH_GROUPS: u32 = (BALL_COUNT / WORKGROUP_SIZE) as u32;

const _: () = assert!(BALL_COUNT % WORKGROUP_SIZE == 0);

const POSITION_LOCATION: GLuint = 0;
const COLOR_LOCATION: GLuint = 1;
const SRC_TEX_LOCATION: GLint = 1;
const POSITION_BINDING: GLuint = 3;
const COLOR_BINDING: GLuint = 4;

const VERTEX_SHADER: &str = r#"#version 310 es
layout (location=0) in vec4 position;
layout (location=1) in vec4 color;
out vec4 vColor;
void main()
{
    gl_Position = position;
    gl_PointSize = 20.0;
    vColor = color;
}
"#;

const FRAGMENT_SHADER: &str = r#"#version 310 es
out mediump vec4 fragColor;
in mediump vec4 vColor;
layout (location=1) uniform mediump sampler2D srcTex;
void main()
{
    fragColor = texture(srcTex, gl_PointCoord) * vColor;
}
"#;

const COMPUTE_SHADER: &str = r#"#version 310 es
layout(std140, binding=3) buffer vertex {
    vec4 p[];
};
layout(std140, binding=4) buffer color {
    vec4 c[];
};
layout(local_size_x = 4) in;
void main()
{
    uint i = gl_GlobalInvocationID.x;
    float x = -0.8 + float(i) * 0.2;
    p[i] = vec4(x, x, 0.0, 1.0);
    c[i] = vec4(1.0 - float(i) * 0.1, 1.0 - float(i) * 0.1, 0.0, 1.0);
}
"#;

/// Position and colour the compute shader writes for ball `index`; also the
/// initial buffer contents
pub fn ball_layout(index: usize) -> ([f32; 4], [f32; 4]) {
    let i = index as f32;
    let x = -0.8 + i * 0.2;
    let shade = 1.0 - i * 0.1;
    ([x, x, 0.0, 1.0], [shade, shade, 0.0, 1.0])
}

#[derive(Debug, Default)]
pub struct ComputeDemo {
    render_program: GLuint,
    compute_program: GLuint,
    texture: GLuint,
    position_ssbo: GLuint,
    color_ssbo: GLuint,
}

impl ComputeDemo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info() -> AppInfo {
        AppInfo::new("gl-compute1", "org.gles_demos.gl-compute1", 500, 500)
    }
}

impl GlApp for ComputeDemo {
    fn init_gl(&mut self) -> Result<()> {
        self.render_program = build_program(VERTEX_SHADER, FRAGMENT_SHADER)?;
        self.compute_program = build_program_with(ShaderBuilder::new().compute(COMPUTE_SHADER))?;

        let (positions, colors): (Vec<_>, Vec<_>) = (0..BALL_COUNT).map(ball_layout).unzip();
        self.position_ssbo = storage_buffer(&positions, POSITION_BINDING);
        self.color_ssbo = storage_buffer(&colors, COLOR_BINDING);

        let sprite = assets::circle_sprite(super::SPRITE_SIZE)?;
        self.texture = upload_texture(&sprite, gl::LINEAR, gl::CLAMP_TO_EDGE);

        unsafe {
            gl::UseProgram(self.render_program);
            gl::Enable(gl::BLEND);
            gl::BlendFunc(gl::SRC_ALPHA, gl::ONE_MINUS_SRC_ALPHA);
            gl::ActiveTexture(gl::TEXTURE0);
            gl::BindTexture(gl::TEXTURE_2D, self.texture);
            gl::Uniform1i(SRC_TEX_LOCATION, 0);

            gl::BindBuffer(gl::ARRAY_BUFFER, self.position_ssbo);
        }
        super::float_attribute(POSITION_LOCATION, 4);
        unsafe { gl::BindBuffer(gl::ARRAY_BUFFER, self.color_ssbo) };
        super::float_attribute(COLOR_LOCATION, 4);

        Ok(())
    }

    fn redraw(&mut self, frame: &FrameInfo, _damage: &mut DamageRect) {
        let size = frame.buffer_size;
        unsafe {
            gl::UseProgram(self.compute_program);
            gl::DispatchCompute(DISPATCH_GROUPS, 1, 1);
            gl::MemoryBarrier(gl::VERTEX_ATTRIB_ARRAY_BARRIER_BIT);

            gl::UseProgram(self.render_program);
            gl::Viewport(0, 0, size.width, size.height);
            gl::ClearColor(0.0, 0.0, 0.0, 0.5);
            gl::Clear(gl::COLOR_BUFFER_BIT);
            gl::DrawArrays(gl::POINTS, 0, BALL_COUNT as i32);
        }
    }

    fn deinit_gl(&mut self) {
        delete_buffers(&[self.position_ssbo, self.color_ssbo]);
        self.position_ssbo = 0;
        self.color_ssbo = 0;
        delete_program(&mut self.render_program);
        delete_program(&mut self.compute_program);
        delete_texture(&mut self.texture);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_covers_every_ball() {
        assert_eq!(DISPATCH_GROUPS as usize * WORKGROUP_SIZE, BALL_COUNT);
        assert!(COMPUTE_SHADER.contains(&format!("local_size_x = {WORKGROUP_SIZE}")));
    }

    #[test]
    fn test_ball_layout_is_a_diagonal() {
        let (first, first_color) = ball_layout(0);
        assert_eq!(first, [-0.8, -0.8, 0.0, 1.0]);
        assert_eq!(first_color, [1.0, 1.0, 0.0, 1.0]);

        let (last, last_color) = ball_layout(BALL_COUNT - 1);
        assert!((last[0] - 0.6).abs() < 1e-6);
        assert_eq!(last[0], last[1]);
        assert!((last_color[0] - 0.3).abs() < 1e-6);

        for i in 0..BALL_COUNT {
            let (p, c) = ball_layout(i);
            assert!((-1.0..1.0).contains(&p[0]));
            assert!(c[0] > 0.0 && c[3] == 1.0);
        }
    }

    #[test]
    fn test_shader_locations_match_constants() {
        assert!(FRAGMENT_SHADER.contains(&format!("location={SRC_TEX_LOCATION}")));
        assert!(COMPUTE_SHADER.contains(&format!("binding={POSITION_BINDING}")));
        assert!(COMPUTE_SHADER.contains(&format!("binding={COLOR_BINDING}")));
        assert!(VERTEX_SHADER.contains(&format!("location={COLOR_LOCATION}")));
    }
}
