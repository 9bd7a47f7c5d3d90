/// An RGBA color with components between 0 and 1.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub const CLEAR: Color = Color::rgba(0., 0., 0., 0.);
    pub const BLACK: Color = Color::rgba(0., 0., 0., 1.);
    pub const WHITE: Color = Color::rgba(1., 1., 1., 1.);

    /// Control background.
    pub const CONTROL: Color = Color::rgba(0.22, 0.22, 0.24, 1.);
    /// Highlighted controls and selected rows.
    pub const HIGHLIGHT: Color = Color::rgba(0.16, 0.44, 0.86, 1.);
    /// Primary text.
    pub const TEXT: Color = Color::rgba(0.92, 0.92, 0.92, 1.);

    pub const fn rgba(r: f64, g: f64, b: f64, a: f64) -> Color {
        Color { r, g, b, a }
    }

    pub const fn rgb(r: f64, g: f64, b: f64) -> Color {
        Color { r, g, b, a: 1. }
    }

    /// Returns the same color with a different alpha.
    pub fn with_alpha(self, a: f64) -> Color {
        Color { a, ..self }
    }
}
