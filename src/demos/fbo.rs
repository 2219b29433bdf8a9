//! Framebuffer-object post-processing
//!
//! Each frame the bullet scene is drawn into an offscreen texture, which is
//! then shown on a quad spinning about the vertical axis. Only the quad's
//! area is reported as damage.

use super::cube::set_matrix;
use super::danmaku::{build_atlas, Danmaku, Pattern, SpriteBatch, SpriteRenderer};
use super::{
    attrib_location, build_program, create_buffer, delete_buffers, delete_program,
    float_attribute, screen_quad, uniform_location, Offscreen,
};
use crate::app::{AppInfo, FrameInfo, GlApp};
use crate::renderer::damage::DamageRect;
use crate::window::Size;
use anyhow::{Context, Result};
use cgmath::{Deg, Matrix4};
use gl::types::{GLint, GLuint};
use rand::rngs::ThreadRng;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

pub const SCENE_SIZE: Size = Size::new(640, 480);
/// Half extent of the displayed quad in clip space
pub const QUAD_EXTENT: f32 = 0.8;
/// Milliseconds per degree of spin
const SPIN_DIVISOR: u128 = 10;

const VERTEX_SHADER: &str = r#"
attribute vec2 position;
attribute vec2 texcoord;
varying vec2 texcoordVarying;
uniform mat4 rotation;
void main()
{
    gl_Position = rotation * vec4(position, 0.0, 1.0);
    texcoordVarying = texcoord;
}
"#;

const FRAGMENT_SHADER: &str = r#"
precision mediump float;
varying vec2 texcoordVarying;
uniform sampler2D texture;
void main()
{
    gl_FragColor = texture2D(texture, texcoordVarying);
}
"#;

/// Quad rotation after `elapsed`, one degree per 10 ms
pub fn spin_angle(elapsed: Duration) -> Deg<f32> {
    Deg(((elapsed.as_millis() / SPIN_DIVISOR) % 360) as f32)
}

/// The quad's largest screen footprint: the middle 80% on both axes
pub fn quad_damage(buffer: Size) -> DamageRect {
    let inset_x = buffer.width / 10;
    let inset_y = buffer.height / 10;
    DamageRect::new(
        inset_x,
        inset_y,
        buffer.width - 2 * inset_x,
        buffer.height - 2 * inset_y,
    )
}

/// GL objects of the on-screen pass
#[derive(Debug, Default)]
struct ScreenPass {
    program: GLuint,
    vao: GLuint,
    buffers: [GLuint; 2],
    rotation: GLint,
}

impl ScreenPass {
    fn new() -> Result<Self> {
        let mut pass = Self {
            program: build_program(VERTEX_SHADER, FRAGMENT_SHADER)?,
            ..Self::default()
        };
        let position = attrib_location(pass.program, "position")?;
        let texcoord = attrib_location(pass.program, "texcoord")?;
        let sampler = uniform_location(pass.program, "texture")?;
        pass.rotation = uniform_location(pass.program, "rotation")?;

        let (positions, texcoords) = screen_quad(QUAD_EXTENT);
        unsafe {
            gl::UseProgram(pass.program);
            gl::Uniform1i(sampler, 0);
            gl::GenVertexArrays(1, &mut pass.vao);
            gl::BindVertexArray(pass.vao);
        }
        pass.buffers[0] = create_buffer(gl::ARRAY_BUFFER, &positions, gl::STATIC_DRAW);
        float_attribute(position, 2);
        pass.buffers[1] = create_buffer(gl::ARRAY_BUFFER, &texcoords, gl::STATIC_DRAW);
        float_attribute(texcoord, 2);
        unsafe { gl::BindVertexArray(0) };
        Ok(pass)
    }

    fn draw(&self, texture: GLuint, angle: Deg<f32>) {
        unsafe { gl::UseProgram(self.program) };
        set_matrix(self.rotation, &Matrix4::from_angle_y(angle));
        unsafe {
            gl::ActiveTexture(gl::TEXTURE0);
            gl::BindTexture(gl::TEXTURE_2D, texture);
            gl::BindVertexArray(self.vao);
            gl::DrawArrays(gl::TRIANGLE_STRIP, 0, 4);
            gl::BindVertexArray(0);
        }
    }

    fn delete(&mut self) {
        unsafe { gl::DeleteVertexArrays(1, &self.vao) };
        self.vao = 0;
        delete_buffers(&self.buffers);
        self.buffers = [0; 2];
        delete_program(&mut self.program);
    }
}

#[derive(Debug)]
pub struct FboDemo {
    image_dir: PathBuf,
    scene: Danmaku,
    batch: SpriteBatch,
    sprites: Option<SpriteRenderer>,
    offscreen: Option<Offscreen>,
    screen: Option<ScreenPass>,
    started: Instant,
    rng: ThreadRng,
}

impl Default for FboDemo {
    fn default() -> Self {
        Self::with_image_dir(super::danmaku::DEFAULT_IMAGE_DIR)
    }
}

impl FboDemo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            image_dir: dir.into(),
            scene: Danmaku::new(SCENE_SIZE, Pattern::LIGHT),
            batch: SpriteBatch::new(),
            sprites: None,
            offscreen: None,
            screen: None,
            started: Instant::now(),
            rng: rand::thread_rng(),
        }
    }

    pub fn info() -> AppInfo {
        AppInfo::new(
            "gl-fbo",
            "org.gles_demos.gl-fbo",
            SCENE_SIZE.width,
            SCENE_SIZE.height,
        )
    }

    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }
}

impl GlApp for FboDemo {
    fn init_gl(&mut self) -> Result<()> {
        let atlas = build_atlas(&self.image_dir)?;
        self.sprites = Some(SpriteRenderer::new(&atlas)?);
        self.offscreen =
            Some(Offscreen::new(SCENE_SIZE).context("Failed to create the scene framebuffer")?);
        self.screen = Some(ScreenPass::new()?);
        self.started = Instant::now();
        Ok(())
    }

    fn redraw(&mut self, frame: &FrameInfo, damage: &mut DamageRect) {
        let (Some(sprites), Some(offscreen), Some(screen)) =
            (&self.sprites, &self.offscreen, &self.screen)
        else {
            return;
        };

        self.scene.step(&mut self.rng);
        self.batch.clear();
        self.scene.fill_batch(&mut self.batch);

        offscreen.bind();
        unsafe {
            gl::Enable(gl::BLEND);
            gl::BlendFunc(gl::SRC_ALPHA, gl::ONE_MINUS_SRC_ALPHA);
            gl::ClearColor(1.0, 1.0, 1.0, 1.0);
            gl::Clear(gl::COLOR_BUFFER_BIT);
        }
        sprites.draw(&self.batch, SCENE_SIZE);
        offscreen.unbind();

        let size = frame.buffer_size;
        unsafe {
            gl::Viewport(0, 0, size.width, size.height);
            gl::Disable(gl::BLEND);
            gl::ClearColor(0.0, 0.0, 0.0, 0.5);
            gl::Clear(gl::COLOR_BUFFER_BIT | gl::DEPTH_BUFFER_BIT);
        }
        screen.draw(offscreen.texture(), spin_angle(self.started.elapsed()));

        *damage = quad_damage(size);
    }

    fn deinit_gl(&mut self) {
        if let Some(mut screen) = self.screen.take() {
            screen.delete();
        }
        if let Some(mut offscreen) = self.offscreen.take() {
            offscreen.delete();
        }
        if let Some(mut sprites) = self.sprites.take() {
            sprites.delete();
        }
    }
}
