//! Display lists.
//!
//! Views draw in their own local coordinate system; the context translates everything into window
//! space and tracks the clip rectangle so the renderer only has to replay commands.

use crate::color::Color;
use crate::path::Path;
use crate::rect::Rect;
use cgmath::{Point2, Vector2};

/// A single drawing operation, in window coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Fills a rectangle.
    FillRect { rect: Rect, color: Color },
    /// Strokes the outline of a rectangle.
    StrokeRect { rect: Rect, color: Color, width: f64 },
    /// Draws a single line of text inside a rectangle.
    Text { rect: Rect, text: String, color: Color },
    /// Fills a vector path translated by `origin`.
    FillPath {
        origin: Point2<f64>,
        path: Path,
        color: Color,
    },
    /// Sets the clip rectangle for subsequent commands.
    Clip(Rect),
}

/// Collects the drawing commands of one redraw.
#[derive(Debug)]
pub struct DrawContext {
    commands: Vec<DrawCommand>,
    origin: Vector2<f64>,
    clip: Option<Rect>,
}

impl DrawContext {
    pub fn new() -> DrawContext {
        DrawContext {
            commands: Vec::new(),
            origin: Vector2::new(0., 0.),
            clip: None,
        }
    }

    /// Positions the context at a view; called by the window before each `draw`.
    pub(crate) fn begin_view(&mut self, resolved_rect: Rect, clip: Rect) {
        self.origin = Vector2::new(resolved_rect.origin.x, resolved_rect.origin.y);
        if self.clip != Some(clip) {
            self.clip = Some(clip);
            self.commands.push(DrawCommand::Clip(clip));
        }
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        if color.a <= 0. || rect.is_empty() {
            return;
        }
        self.commands.push(DrawCommand::FillRect {
            rect: rect + self.origin,
            color,
        });
    }

    pub fn stroke_rect(&mut self, rect: Rect, color: Color, width: f64) {
        self.commands.push(DrawCommand::StrokeRect {
            rect: rect + self.origin,
            color,
            width,
        });
    }

    pub fn draw_text(&mut self, rect: Rect, text: &str, color: Color) {
        if text.is_empty() {
            return;
        }
        self.commands.push(DrawCommand::Text {
            rect: rect + self.origin,
            text: text.to_string(),
            color,
        });
    }

    pub fn fill_path(&mut self, origin: Point2<f64>, path: &Path, color: Color) {
        self.commands.push(DrawCommand::FillPath {
            origin: origin + self.origin,
            path: path.clone(),
            color,
        });
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<DrawCommand> {
        self.commands
    }
}

impl Default for DrawContext {
    fn default() -> Self {
        DrawContext::new()
    }
}

/// Something that can present a finished display list, i.e. the platform’s graphics backend.
pub trait Renderer {
    fn present(&mut self, window: &str, dirty: Rect, commands: &[DrawCommand]);
}

/// A renderer that throws frames away, keeping a count.
#[derive(Debug, Default)]
pub struct NullRenderer {
    pub frames: usize,
}

impl Renderer for NullRenderer {
    fn present(&mut self, window: &str, dirty: Rect, commands: &[DrawCommand]) {
        self.frames += 1;
        log::trace!(
            "frame {} for {:?}: {} commands in {:?}",
            self.frames,
            window,
            commands.len(),
            dirty
        );
    }
}
