//! One point drawn four times with per-instance offsets

use super::{
    attrib_location, build_program, create_buffer, create_point_sampler, delete_buffers,
    delete_program, delete_texture, float_attribute, uniform_location, upload_texture,
    SPRITE_SIZE,
};
use crate::app::{AppInfo, FrameInfo, GlApp};
use crate::assets;
use crate::renderer::damage::DamageRect;
use anyhow::Result;
use gl::types::{GLint, GLuint};

pub const INSTANCE_COUNT: usize = 4;

/// Clip-space offset of each instance
pub const INSTANCE_OFFSETS: [[f32; 2]; INSTANCE_COUNT] =
    [[-0.8, -0.8], [-0.4, -0.4], [0.4, 0.4], [0.8, 0.8]];

const VERTEX_SHADER: &str = r#"#version 300 es
in vec3 position;
in vec4 color;
out lowp vec4 vColor;
uniform vec2 translate[4];
void main()
{
    mat4 model = mat4(
        1.0, 0.0, 0.0, 0.0,
        0.0, 1.0, 0.0, 0.0,
        0.0, 0.0, 1.0, 0.0,
        translate[gl_InstanceID].x, translate[gl_InstanceID].y, 0.0, 1.0);
    gl_Position = model * vec4(position, 1.0);
    vColor = color;
    gl_PointSize = 20.0;
}
"#;

const FRAGMENT_SHADER: &str = r#"#version 300 es
in lowp vec4 vColor;
out mediump vec4 fragColor;
uniform mediump sampler2D tex;
void main()
{
    fragColor = texture(tex, gl_PointCoord) * vColor;
}
"#;

const VERTEX: [[f32; 3]; 1] = [[0.0, 0.0, 0.0]];
const COLOR: [[f32; 4]; 1] = [[0.0, 0.0, 1.0, 1.0]];

#[derive(Debug)]
pub struct InstancedDemo {
    program: GLuint,
    texture: GLuint,
    sampler: GLuint,
    vao: GLuint,
    buffers: [GLuint; 2],
    translate: GLint,
}

impl Default for InstancedDemo {
    fn default() -> Self {
        Self {
            program: 0,
            texture: 0,
            sampler: 0,
            vao: 0,
            buffers: [0; 2],
            translate: -1,
        }
    }
}

impl InstancedDemo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info() -> AppInfo {
        AppInfo::new(
            "gl-instanced-rendering1",
            "org.gles_demos.gl-instanced-rendering1",
            400,
            400,
        )
    }
}

impl GlApp for InstancedDemo {
    fn init_gl(&mut self) -> Result<()> {
        self.program = build_program(VERTEX_SHADER, FRAGMENT_SHADER)?;
        let position = attrib_location(self.program, "position")?;
        let color = attrib_location(self.program, "color")?;
        let tex = uniform_location(self.program, "tex")?;
        self.translate = uniform_location(self.program, "translate")?;

        unsafe {
            gl::UseProgram(self.program);
            gl::Uniform1i(tex, 0);
            gl::Enable(gl::BLEND);
            gl::BlendFunc(gl::SRC_ALPHA, gl::ONE_MINUS_SRC_ALPHA);
        }

        let sprite = assets::circle_sprite(SPRITE_SIZE)?;
        self.texture = upload_texture(&sprite, gl::LINEAR, gl::REPEAT);
        self.sampler = create_point_sampler();

        unsafe {
            gl::GenVertexArrays(1, &mut self.vao);
            gl::BindVertexArray(self.vao);
        }
        self.buffers[0] = create_buffer(gl::ARRAY_BUFFER, &VERTEX, gl::STREAM_DRAW);
        float_attribute(position, 3);
        self.buffers[1] = create_buffer(gl::ARRAY_BUFFER, &COLOR, gl::STATIC_DRAW);
        float_attribute(color, 4);
        unsafe { gl::BindVertexArray(0) };

        Ok(())
    }

    fn redraw(&mut self, frame: &FrameInfo, _damage: &mut DamageRect) {
        let size = frame.buffer_size;
        let offsets: &[f32] = bytemuck::cast_slice(&INSTANCE_OFFSETS);

        unsafe {
            gl::Viewport(0, 0, size.width, size.height);
            gl::ClearColor(0.0, 0.0, 0.0, 0.5);
            gl::Clear(gl::COLOR_BUFFER_BIT | gl::DEPTH_BUFFER_BIT);
            gl::UseProgram(self.program);
            gl::ActiveTexture(gl::TEXTURE0);
            gl::BindTexture(gl::TEXTURE_2D, self.texture);
            gl::BindSampler(0, self.sampler);

            gl::BindVertexArray(self.vao);
            gl::Uniform2fv(self.translate, INSTANCE_COUNT as i32, offsets.as_ptr());
            gl::DrawArraysInstanced(gl::POINTS, 0, 1, INSTANCE_COUNT as i32);
            gl::BindVertexArray(0);
        }
    }

    fn deinit_gl(&mut self) {
        unsafe {
            gl::DeleteSamplers(1, &self.sampler);
            gl::DeleteVertexArrays(1, &self.vao);
        }
        self.sampler = 0;
        self.vao = 0;
        delete_buffers(&self.buffers);
        self.buffers = [0; 2];
        delete_texture(&mut self.texture);
        delete_program(&mut self.program);
    }
}
