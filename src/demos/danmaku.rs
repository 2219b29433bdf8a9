//! Bullet-pattern scene shared by the textured quad demos
//!
//! An enemy near the top of the scene sprays fans of ring bullets and, after
//! a short delay, random needles; both fall under a little gravity for their
//! first few seconds. Everything is drawn as textured quads cut from one
//! 512x512 atlas:
//! - background at (0, 0)
//! - sprite sheet at (256, 0)
//! - digit strip at (0, 256)
//!
//! Scene coordinates are pixels with the origin at the bottom left.

use super::{build_program, delete_program, delete_texture, upload_texture};
use crate::assets;
use crate::window::Size;
use anyhow::Result;
use gl::types::{GLint, GLuint};
use log::{debug, warn};
use rand::Rng;
use std::f64::consts::PI;
use std::path::Path;
use tiny_skia::{Color, FillRule, Paint, PathBuilder, Pixmap, Rect, Transform};

pub const ATLAS_SIZE: u32 = 512;
pub const DEFAULT_IMAGE_DIR: &str = "images";

const SPRITES_X: i32 = 256;
const DIGITS_Y: i32 = 256;

/// Atlas rectangles as `[x0, y0, x1, y1]`
const BACKGROUND_SRC: [i32; 4] = [0, 0, 255, 255];
const PLAYER_SRC: [i32; 4] = [SPRITES_X + 16, 40, SPRITES_X + 16 + 31, 40 + 31];
const ENEMY_SRC: [i32; 4] = [SPRITES_X, 72, SPRITES_X + 63, 72 + 63];

const GLYPH_WIDTH: i32 = 8;
const GLYPH_HEIGHT: i32 = 16;
const DECIMAL_POINT_GLYPH: i32 = 14;

/// Bullets are dropped once this far outside the scene
const OFFSCREEN_MARGIN: f64 = 40.0;
const SPRITE_COLORS: usize = 8;
const BULLET_COLOR: u8 = 4;

const VERTEX_SHADER: &str = r#"
attribute vec4 position;
attribute vec2 texcoord;
varying vec2 texcoordVarying;
uniform vec2 screenSize;
uniform vec2 texSize;
void main()
{
    gl_Position = vec4(position.xy * 2.0 / screenSize - 1.0, 0.0, 1.0);
    texcoordVarying = texcoord / texSize;
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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulletKind {
    /// 16x16 ring fired in fans
    Ring,
    /// 8x16 needle scattered at random
    Needle,
}

impl BulletKind {
    /// Half width and half height in scene pixels
    pub fn half_extent(self) -> (i32, i32) {
        match self {
            Self::Ring => (8, 8),
            Self::Needle => (4, 8),
        }
    }

    /// Sprite for `color` in the atlas
    pub fn atlas_rect(self, color: u8) -> [i32; 4] {
        let color = i32::from(color);
        match self {
            Self::Ring => {
                let x = SPRITES_X + color * 16;
                [x, 8, x + 16, 24]
            }
            Self::Needle => {
                let x = SPRITES_X + color * 8;
                [x, 24, x + 8, 40]
            }
        }
    }

    /// Downward pull per frame and how many frames it applies for
    fn gravity(self) -> (f64, u32) {
        match self {
            Self::Ring => (0.04, 150),
            Self::Needle => (0.03, 160),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bullet {
    pub kind: BulletKind,
    pub color: u8,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    /// Frames since firing
    pub age: u32,
    /// Frames the bullet survives even when off screen
    pub min_life: u32,
}

impl Bullet {
    fn advance(&mut self) {
        let (pull, frames) = self.kind.gravity();
        if self.age < frames {
            self.vy -= pull;
        }
        self.x += self.vx;
        self.y += self.vy;
        self.age += 1;
    }

    fn is_gone(&self, scene: Size) -> bool {
        let outside = self.x < -OFFSCREEN_MARGIN
            || self.x > f64::from(scene.width) + OFFSCREEN_MARGIN
            || self.y < -OFFSCREEN_MARGIN
            || self.y > f64::from(scene.height) + OFFSCREEN_MARGIN;
        outside && self.age > self.min_life
    }

    fn quad(&self) -> [i32; 4] {
        let (hw, hh) = self.kind.half_extent();
        let (x, y) = (self.x as i32, self.y as i32);
        [x - hw, y - hh, x + hw, y + hh]
    }
}

/// A square sprite centred on a fixed point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub x: i32,
    pub y: i32,
    pub size: i32,
}

impl Actor {
    pub fn quad(&self) -> [i32; 4] {
        let half = self.size / 2;
        [self.x - half, self.y - half, self.x + half, self.y + half]
    }
}

/// How hard the enemy fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pattern {
    pub max_bullets: usize,
    /// Frames between ring fans
    pub fan_interval: u32,
    /// Needles added per frame once scattering starts
    pub scatter_count: u32,
    /// Frames before the first needles
    pub scatter_delay: u32,
}

impl Pattern {
    pub const DENSE: Self = Self {
        max_bullets: 12_000,
        fan_interval: 1,
        scatter_count: 40,
        scatter_delay: 80,
    };

    pub const LIGHT: Self = Self {
        max_bullets: 6_000,
        fan_interval: 4,
        scatter_count: 3,
        scatter_delay: 80,
    };
}

/// Bullets fired per fan
pub const FAN_WIDTH: u32 = 8;
const FAN_SPEED: f64 = 3.0;
/// The fan sweep period is re-rolled every this many frames
const SWEEP_REROLL: u32 = 20;

#[derive(Debug, Clone)]
pub struct Danmaku {
    scene: Size,
    pattern: Pattern,
    player: Actor,
    enemy: Actor,
    bullets: Vec<Bullet>,
    frame: u32,
    sweep_period: f64,
}

impl Danmaku {
    pub fn new(scene: Size, pattern: Pattern) -> Self {
        Self {
            scene,
            pattern,
            player: Actor {
                x: scene.width / 2,
                y: scene.height / 10,
                size: 36,
            },
            enemy: Actor {
                x: scene.width / 2,
                y: scene.height * 8 / 10,
                size: 96,
            },
            bullets: Vec::with_capacity(pattern.max_bullets),
            frame: 0,
            sweep_period: 190.0,
        }
    }

    pub fn scene(&self) -> Size {
        self.scene
    }

    pub fn player(&self) -> Actor {
        self.player
    }

    pub fn enemy(&self) -> Actor {
        self.enemy
    }

    pub fn bullets(&self) -> &[Bullet] {
        &self.bullets
    }

    pub fn frame(&self) -> u32 {
        self.frame
    }

    /// Fires, moves and culls for one frame
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if self.frame % SWEEP_REROLL == 0 {
            self.sweep_period = f64::from(rng.gen_range(175..205_i32));
        }
        if self.frame % self.pattern.fan_interval.max(1) == 0 {
            self.fire_fan();
        }
        if self.frame > self.pattern.scatter_delay {
            self.fire_scatter(rng);
        }

        let scene = self.scene;
        for bullet in &mut self.bullets {
            bullet.advance();
        }
        self.bullets.retain(|b| !b.is_gone(scene));
        self.frame = self.frame.wrapping_add(1);
    }

    /// Direction the fan is centred on this frame; sweeps around straight up
    pub fn fan_heading(&self) -> f64 {
        PI * 1.5 + PI / 6.0 * (PI * 2.0 / self.sweep_period * f64::from(self.frame)).sin()
    }

    fn spawn(&mut self, kind: BulletKind, vx: f64, vy: f64, min_life: u32) {
        if self.bullets.len() >= self.pattern.max_bullets {
            return;
        }
        self.bullets.push(Bullet {
            kind,
            color: BULLET_COLOR,
            x: f64::from(self.enemy.x),
            y: f64::from(self.enemy.y),
            vx,
            vy,
            age: 0,
            min_life,
        });
    }

    fn fire_fan(&mut self) {
        let heading = self.fan_heading();
        for n in 0..FAN_WIDTH {
            let angle = heading - PI / 2.0 + PI / 8.0 * f64::from(n) + PI / 16.0;
            self.spawn(
                BulletKind::Ring,
                angle.cos() * FAN_SPEED,
                -angle.sin() * FAN_SPEED,
                150,
            );
        }
    }

    fn fire_scatter<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for _ in 0..self.pattern.scatter_count {
            let angle = f64::from(rng.gen_range(-45..225_i32)).to_radians();
            self.spawn(
                BulletKind::Needle,
                angle.cos() * 1.4 * 1.2,
                -angle.sin() * 1.4,
                0,
            );
        }
    }

    /// Background, player, enemy, then every live bullet
    pub fn fill_batch(&self, batch: &mut SpriteBatch) {
        batch.push([0, 0, self.scene.width, self.scene.height], BACKGROUND_SRC);
        batch.push(self.player.quad(), PLAYER_SRC);
        batch.push(self.enemy.quad(), ENEMY_SRC);
        for bullet in &self.bullets {
            batch.push(bullet.quad(), bullet.kind.atlas_rect(bullet.color));
        }
    }
}

/// Triangle list of textured quads, positions and texture coordinates in
/// pixels
#[derive(Debug, Clone, Default)]
pub struct SpriteBatch {
    positions: Vec<[i16; 2]>,
    texcoords: Vec<[i16; 2]>,
}

fn to_short(value: i32) -> i16 {
    value.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}

impl SpriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.positions.clear();
        self.texcoords.clear();
    }

    /// Adds the `src` atlas rectangle stretched over `dst`. The top row of
    /// the source lands on the high-y edge of the destination.
    pub fn push(&mut self, dst: [i32; 4], src: [i32; 4]) {
        let [x0, y0, x1, y1] = dst.map(to_short);
        let [u0, v0, u1, v1] = src.map(to_short);
        self.positions
            .extend_from_slice(&[[x0, y1], [x1, y1], [x0, y0], [x1, y1], [x0, y0], [x1, y0]]);
        self.texcoords
            .extend_from_slice(&[[u0, v0], [u1, v0], [u0, v1], [u1, v0], [u0, v1], [u1, v1]]);
    }

    /// Draws `value` right-aligned so its last digit ends at `right`.
    /// Returns the left edge of the first digit.
    pub fn push_number(&mut self, value: u32, right: i32, bottom: i32) -> i32 {
        let mut remaining = value;
        let mut x = right;
        loop {
            x -= GLYPH_WIDTH;
            self.push_glyph((remaining % 10) as i32, x, bottom);
            remaining /= 10;
            if remaining == 0 {
                return x;
            }
        }
    }

    /// Draws a rate with one decimal, e.g. `59.8`, ending at `right`
    pub fn push_rate(&mut self, rate: f32, right: i32, bottom: i32) {
        let tenths = (rate.max(0.0) * 10.0) as u32;
        self.push_glyph((tenths % 10) as i32, right - GLYPH_WIDTH, bottom);
        self.push_glyph(DECIMAL_POINT_GLYPH, right - 2 * GLYPH_WIDTH, bottom);
        self.push_number(tenths / 10, right - 2 * GLYPH_WIDTH, bottom);
    }

    fn push_glyph(&mut self, glyph: i32, x: i32, bottom: i32) {
        let u = GLYPH_WIDTH + glyph * GLYPH_WIDTH;
        self.push(
            [x, bottom, x + GLYPH_WIDTH, bottom + GLYPH_HEIGHT],
            [u, DIGITS_Y, u + GLYPH_WIDTH, DIGITS_Y + GLYPH_HEIGHT],
        );
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[[i16; 2]] {
        &self.positions
    }

    pub fn texcoords(&self) -> &[[i16; 2]] {
        &self.texcoords
    }
}

fn sprite_color(index: usize) -> Color {
    const PALETTE: [(u8, u8, u8); SPRITE_COLORS] = [
        (255, 255, 255),
        (255, 64, 64),
        (255, 160, 32),
        (255, 240, 64),
        (80, 160, 255),
        (64, 220, 120),
        (200, 96, 255),
        (255, 128, 200),
    ];
    let (r, g, b) = PALETTE[index % SPRITE_COLORS];
    Color::from_rgba8(r, g, b, 255)
}

fn fill_oval(canvas: &mut Pixmap, x: f32, y: f32, width: f32, height: f32, color: Color) {
    let Some(path) = Rect::from_xywh(x, y, width, height).and_then(PathBuilder::from_oval) else {
        return;
    };
    let mut paint = Paint::default();
    paint.set_color(color);
    paint.anti_alias = true;
    canvas.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
}

/// Procedural sprite sheet laid out like `img.png`
fn fallback_sprites() -> Result<Pixmap> {
    let mut sheet = assets::new_pixmap(256, 256)?;
    for color in 0..SPRITE_COLORS {
        let c = sprite_color(color);
        let offset = color as f32;
        fill_oval(&mut sheet, offset * 16.0 + 1.0, 9.0, 14.0, 14.0, c);
        fill_oval(&mut sheet, offset * 16.0 + 5.0, 13.0, 6.0, 6.0, Color::WHITE);
        fill_oval(&mut sheet, offset * 8.0 + 1.0, 24.0, 6.0, 16.0, c);
    }
    fill_oval(&mut sheet, 16.0, 40.0, 31.0, 31.0, Color::from_rgba8(64, 220, 120, 255));
    fill_oval(&mut sheet, 0.0, 72.0, 63.0, 63.0, Color::from_rgba8(220, 64, 64, 255));
    Ok(sheet)
}

/// Procedural digit strip laid out like `ascii_num.png`
fn fallback_digits() -> Result<Pixmap> {
    let mut strip = assets::new_pixmap(256, GLYPH_HEIGHT as u32)?;
    for digit in 0..10u8 {
        let x = (GLYPH_WIDTH + i32::from(digit) * GLYPH_WIDTH) as f32;
        assets::draw_digit(&mut strip, digit, x + 1.0, 1.0, 6.0, 14.0, Color::WHITE);
    }
    let dot_x = (GLYPH_WIDTH + DECIMAL_POINT_GLYPH * GLYPH_WIDTH) as f32;
    if let Some(dot) = Rect::from_xywh(dot_x + 3.0, 12.0, 2.0, 2.0) {
        let mut paint = Paint::default();
        paint.set_color(Color::WHITE);
        strip.fill_rect(dot, &paint, Transform::identity(), None);
    }
    Ok(strip)
}

fn load_or(path: &Path, fallback: fn() -> Result<Pixmap>) -> Result<Pixmap> {
    match assets::load_png(path) {
        Ok(image) => {
            debug!("loaded {} ({}x{})", path.display(), image.width(), image.height());
            Ok(image)
        }
        Err(e) => {
            warn!("{e:#}, using a generated image");
            fallback()
        }
    }
}

/// Composes the atlas from `back.png`, `img.png` and `ascii_num.png` in
/// `dir`, generating stand-ins for any that are missing
pub fn build_atlas(dir: &Path) -> Result<Pixmap> {
    let mut atlas = assets::new_pixmap(ATLAS_SIZE, ATLAS_SIZE)?;
    let background = load_or(&dir.join("back.png"), || assets::checkerboard(256, 32))?;
    let sprites = load_or(&dir.join("img.png"), fallback_sprites)?;
    let digits = load_or(&dir.join("ascii_num.png"), fallback_digits)?;

    assets::blit(&mut atlas, &background, 0, 0);
    assets::blit(&mut atlas, &sprites, SPRITES_X, 0);
    assets::blit(&mut atlas, &digits, 0, DIGITS_Y);
    Ok(atlas)
}

/// GL side of a [`SpriteBatch`]: program, atlas texture and vertex buffers
#[derive(Debug, Default)]
pub struct SpriteRenderer {
    program: GLuint,
    texture: GLuint,
    vao: GLuint,
    buffers: [GLuint; 2],
    screen_size: GLint,
    tex_size: GLint,
}

impl SpriteRenderer {
    pub fn new(atlas: &Pixmap) -> Result<Self> {
        let mut renderer = Self {
            program: build_program(VERTEX_SHADER, FRAGMENT_SHADER)?,
            texture: upload_texture(atlas, gl::LINEAR, gl::CLAMP_TO_EDGE),
            ..Self::default()
        };
        let position = super::attrib_location(renderer.program, "position")?;
        let texcoord = super::attrib_location(renderer.program, "texcoord")?;
        let sampler = super::uniform_location(renderer.program, "texture")?;
        renderer.screen_size = super::uniform_location(renderer.program, "screenSize")?;
        renderer.tex_size = super::uniform_location(renderer.program, "texSize")?;

        unsafe {
            gl::UseProgram(renderer.program);
            gl::Uniform1i(sampler, 0);

            gl::GenVertexArrays(1, &mut renderer.vao);
            gl::BindVertexArray(renderer.vao);
            gl::GenBuffers(2, renderer.buffers.as_mut_ptr());
            for (buffer, location) in renderer.buffers.iter().zip([position, texcoord]) {
                gl::BindBuffer(gl::ARRAY_BUFFER, *buffer);
                gl::VertexAttribPointer(location, 2, gl::SHORT, gl::FALSE, 0, std::ptr::null());
                gl::EnableVertexAttribArray(location);
            }
            gl::BindVertexArray(0);
        }
        Ok(renderer)
    }

    /// Streams the batch and draws it with `scene` mapped onto the viewport
    pub fn draw(&self, batch: &SpriteBatch, scene: Size) {
        if batch.is_empty() {
            return;
        }
        unsafe {
            gl::UseProgram(self.program);
            gl::ActiveTexture(gl::TEXTURE0);
            gl::BindTexture(gl::TEXTURE_2D, self.texture);
            gl::Uniform2f(self.screen_size, scene.width as f32, scene.height as f32);
            gl::Uniform2f(self.tex_size, ATLAS_SIZE as f32, ATLAS_SIZE as f32);
            gl::BindVertexArray(self.vao);

            gl::BindBuffer(gl::ARRAY_BUFFER, self.buffers[0]);
        }
        super::buffer_data(gl::ARRAY_BUFFER, batch.positions(), gl::STREAM_DRAW);
        unsafe { gl::BindBuffer(gl::ARRAY_BUFFER, self.buffers[1]) };
        super::buffer_data(gl::ARRAY_BUFFER, batch.texcoords(), gl::STREAM_DRAW);

        unsafe {
            gl::DrawArrays(gl::TRIANGLES, 0, batch.vertex_count() as i32);
            gl::BindVertexArray(0);
        }
    }

    pub fn delete(&mut self) {
        unsafe { gl::DeleteVertexArrays(1, &self.vao) };
        self.vao = 0;
        super::delete_buffers(&self.buffers);
        self.buffers = [0; 2];
        delete_texture(&mut self.texture);
        delete_program(&mut self.program);
    }
}
