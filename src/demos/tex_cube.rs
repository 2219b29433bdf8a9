//! Textured spinning cube
//!
//! The texture is `images/back.png` (relative to the working directory)
//! drawn into a 256x256 canvas. A missing or unreadable image falls back to a
//! checker pattern so the demo still runs.

use super::cube::set_matrix;
use super::{
    attrib_location, build_program, create_buffer, delete_buffers, delete_program,
    delete_texture, float_attribute, projection, uniform_location, upload_texture, CubeSpin,
    CUBE_INDICES, CUBE_POSITIONS,
};
use crate::app::{AppInfo, FrameInfo, GlApp};
use crate::assets;
use crate::renderer::damage::DamageRect;
use anyhow::Result;
use gl::types::{GLint, GLuint};
use log::{debug, warn};
use std::path::{Path, PathBuf};
use tiny_skia::Pixmap;

pub const DEFAULT_TEXTURE_PATH: &str = "images/back.png";
pub const TEXTURE_SIZE: u32 = 256;

const VERTEX_SHADER: &str = r#"
uniform mat4 proj;
uniform mat4 model;
attribute vec3 position;
attribute vec2 texcoord;
varying vec2 texcoordVarying;
void main()
{
    gl_Position = proj * model * vec4(position, 1.0);
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

/// The full texture on every face
pub fn face_texcoords() -> Vec<[f32; 2]> {
    const FACE: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
    (0..CUBE_POSITIONS.len() / 4).flat_map(|_| FACE).collect()
}

/// Loads the texture image, falling back to a checker pattern
pub fn load_texture_image(path: &Path) -> Result<Pixmap> {
    match assets::load_png(path) {
        Ok(image) => {
            debug!("loaded {} ({}x{})", path.display(), image.width(), image.height());
            assets::compose_canvas(&image, TEXTURE_SIZE, TEXTURE_SIZE)
        }
        Err(e) => {
            warn!("{e:#}, using a checker texture");
            assets::checkerboard(TEXTURE_SIZE, TEXTURE_SIZE / 8)
        }
    }
}

#[derive(Debug)]
pub struct TexCubeDemo {
    texture_path: PathBuf,
    program: GLuint,
    texture: GLuint,
    proj: GLint,
    model: GLint,
    buffers: [GLuint; 3],
    spin: CubeSpin,
}

impl Default for TexCubeDemo {
    fn default() -> Self {
        Self::with_texture(DEFAULT_TEXTURE_PATH)
    }
}

impl TexCubeDemo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_texture(path: impl Into<PathBuf>) -> Self {
        Self {
            texture_path: path.into(),
            program: 0,
            texture: 0,
            proj: -1,
            model: -1,
            buffers: [0; 3],
            spin: CubeSpin::default(),
        }
    }

    pub fn info() -> AppInfo {
        AppInfo::new("gl-tex-cube", "org.gles_demos.gl-tex-cube", 500, 500)
    }

    pub fn texture_path(&self) -> &Path {
        &self.texture_path
    }
}

impl GlApp for TexCubeDemo {
    fn init_gl(&mut self) -> Result<()> {
        let image = load_texture_image(&self.texture_path)?;
        self.texture = upload_texture(&image, gl::LINEAR, gl::REPEAT);

        self.program = build_program(VERTEX_SHADER, FRAGMENT_SHADER)?;
        let position = attrib_location(self.program, "position")?;
        let texcoord = attrib_location(self.program, "texcoord")?;
        let sampler = uniform_location(self.program, "texture")?;
        self.proj = uniform_location(self.program, "proj")?;
        self.model = uniform_location(self.program, "model")?;

        unsafe {
            gl::UseProgram(self.program);
            gl::Uniform1i(sampler, 0);
        }

        self.buffers[0] = create_buffer(gl::ARRAY_BUFFER, &CUBE_POSITIONS, gl::STATIC_DRAW);
        float_attribute(position, 3);
        self.buffers[1] = create_buffer(gl::ARRAY_BUFFER, &face_texcoords(), gl::STATIC_DRAW);
        float_attribute(texcoord, 2);
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
            gl::ActiveTexture(gl::TEXTURE0);
            gl::BindTexture(gl::TEXTURE_2D, self.texture);
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
        delete_texture(&mut self.texture);
        delete_program(&mut self.program);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_face_texcoords_cover_every_vertex() {
        let coords = face_texcoords();
        assert_eq!(coords.len(), CUBE_POSITIONS.len());
        assert_eq!(coords[0], [0.0, 0.0]);
        assert_eq!(coords[6], [1.0, 1.0]);
        assert!(coords.iter().flatten().all(|c| (0.0..=1.0).contains(c)));
    }

    #[test]
    fn test_missing_texture_falls_back_to_checker() {
        let dir = tempdir().unwrap();
        let image = load_texture_image(&dir.path().join("missing.png")).unwrap();
        assert_eq!((image.width(), image.height()), (TEXTURE_SIZE, TEXTURE_SIZE));
        assert_eq!(image.pixel(0, 0).unwrap().alpha(), 255);
    }

    #[test]
    fn test_default_texture_path() {
        let demo = TexCubeDemo::new();
        assert_eq!(demo.texture_path(), Path::new(DEFAULT_TEXTURE_PATH));
        assert_eq!(TexCubeDemo::info().size().width, 500);
    }
}
