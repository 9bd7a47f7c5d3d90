//! SVG path data.
//!
//! Parses the `d` attribute syntax used by the icon set into absolute segments. Arcs are not
//! supported since none of the icons use them.

use crate::rect::Rect;
use cgmath::Point2;
use core::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

/// An absolute path segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment {
    MoveTo(Point2<f64>),
    LineTo(Point2<f64>),
    QuadTo(Point2<f64>, Point2<f64>),
    CubicTo(Point2<f64>, Point2<f64>, Point2<f64>),
    Close,
}

/// Errors that may occur when parsing path data.
#[derive(Debug, Clone, PartialEq)]
pub enum PathError {
    /// A character that is neither a command nor part of a number.
    UnexpectedChar(usize, char),
    /// A command ran out of numeric arguments.
    MissingNumber(usize),
    /// Path data must start with a move command.
    NoMoveTo,
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PathError::UnexpectedChar(pos, c) => write!(f, "unexpected {:?} at {}", c, pos),
            PathError::MissingNumber(pos) => write!(f, "expected a number at {}", pos),
            PathError::NoMoveTo => write!(f, "path data must start with a move command"),
        }
    }
}

impl std::error::Error for PathError {}

/// A vector path.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Path {
    segments: Vec<Segment>,
}

impl Path {
    pub fn from_segments(segments: Vec<Segment>) -> Path {
        Path { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Parses SVG path data.
    pub fn parse(data: &str) -> Result<Path, PathError> {
        Parser::new(data).parse()
    }

    /// Returns the bounding box of all points, including control points.
    pub fn bounds(&self) -> Rect {
        let mut min = Point2::new(std::f64::INFINITY, std::f64::INFINITY);
        let mut max = Point2::new(std::f64::NEG_INFINITY, std::f64::NEG_INFINITY);
        let mut any = false;

        let mut add = |p: Point2<f64>| {
            any = true;
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        };

        for segment in &self.segments {
            match *segment {
                Segment::MoveTo(p) | Segment::LineTo(p) => add(p),
                Segment::QuadTo(c, p) => {
                    add(c);
                    add(p);
                }
                Segment::CubicTo(c1, c2, p) => {
                    add(c1);
                    add(c2);
                    add(p);
                }
                Segment::Close => (),
            }
        }

        if !any {
            return Rect::zero();
        }
        Rect::from_xywh(min.x, min.y, max.x - min.x, max.y - min.y)
    }
}

struct Parser<'a> {
    data: &'a str,
    chars: Peekable<CharIndices<'a>>,
    segments: Vec<Segment>,
    current: Point2<f64>,
    subpath_start: Point2<f64>,
    // reflected control point candidates for S and T
    last_cubic_ctrl: Option<Point2<f64>>,
    last_quad_ctrl: Option<Point2<f64>>,
}

impl<'a> Parser<'a> {
    fn new(data: &'a str) -> Parser<'a> {
        Parser {
            data,
            chars: data.char_indices().peekable(),
            segments: Vec::new(),
            current: Point2::new(0., 0.),
            subpath_start: Point2::new(0., 0.),
            last_cubic_ctrl: None,
            last_quad_ctrl: None,
        }
    }

    fn skip_separators(&mut self) {
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_whitespace() || c == ',' {
                self.chars.next();
            } else {
                break;
            }
        }
    }

    fn pos(&mut self) -> usize {
        self.chars.peek().map_or(self.data.len(), |&(i, _)| i)
    }

    fn at_number(&mut self) -> bool {
        self.skip_separators();
        match self.chars.peek() {
            Some(&(_, c)) => c.is_ascii_digit() || c == '-' || c == '+' || c == '.',
            None => false,
        }
    }

    fn number(&mut self) -> Result<f64, PathError> {
        self.skip_separators();
        let start = self.pos();
        let mut end = start;
        let mut seen_dot = false;
        let mut seen_exp = false;
        let mut prev: Option<char> = None;

        while let Some(&(i, c)) = self.chars.peek() {
            let accept = match c {
                '0'..='9' => true,
                '+' | '-' => i == start || prev == Some('e') || prev == Some('E'),
                '.' if !seen_dot && !seen_exp => {
                    seen_dot = true;
                    true
                }
                'e' | 'E' if !seen_exp && i != start => {
                    seen_exp = true;
                    true
                }
                _ => false,
            };
            if !accept {
                break;
            }
            prev = Some(c);
            end = i + c.len_utf8();
            self.chars.next();
        }

        self.data[start..end]
            .parse()
            .map_err(|_| PathError::MissingNumber(start))
    }

    fn point(&mut self, relative: bool) -> Result<Point2<f64>, PathError> {
        let x = self.number()?;
        let y = self.number()?;
        if relative {
            Ok(Point2::new(self.current.x + x, self.current.y + y))
        } else {
            Ok(Point2::new(x, y))
        }
    }

    fn push(&mut self, segment: Segment) {
        self.last_cubic_ctrl = None;
        self.last_quad_ctrl = None;
        match segment {
            Segment::MoveTo(p) => {
                self.current = p;
                self.subpath_start = p;
            }
            Segment::LineTo(p) => self.current = p,
            Segment::QuadTo(c, p) => {
                self.last_quad_ctrl = Some(c);
                self.current = p;
            }
            Segment::CubicTo(_, c2, p) => {
                self.last_cubic_ctrl = Some(c2);
                self.current = p;
            }
            Segment::Close => self.current = self.subpath_start,
        }
        self.segments.push(segment);
    }

    fn reflect(&self, ctrl: Option<Point2<f64>>) -> Point2<f64> {
        match ctrl {
            Some(c) => Point2::new(2. * self.current.x - c.x, 2. * self.current.y - c.y),
            None => self.current,
        }
    }

    fn parse(mut self) -> Result<Path, PathError> {
        loop {
            self.skip_separators();
            let (pos, command) = match self.chars.next() {
                Some(c) => c,
                None => break,
            };

            if !command.is_ascii_alphabetic() {
                return Err(PathError::UnexpectedChar(pos, command));
            }
            if self.segments.is_empty() && command != 'M' && command != 'm' {
                return Err(PathError::NoMoveTo);
            }

            let relative = command.is_ascii_lowercase();
            let mut first = true;

            // commands repeat implicitly while numbers follow
            loop {
                if !first && (command == 'Z' || command == 'z' || !self.at_number()) {
                    break;
                }

                match command.to_ascii_uppercase() {
                    'M' => {
                        let p = self.point(relative)?;
                        // subsequent pairs after a move are line-tos
                        if first {
                            self.push(Segment::MoveTo(p));
                        } else {
                            self.push(Segment::LineTo(p));
                        }
                    }
                    'L' => {
                        let p = self.point(relative)?;
                        self.push(Segment::LineTo(p));
                    }
                    'H' => {
                        let x = self.number()?;
                        let x = if relative { self.current.x + x } else { x };
                        let p = Point2::new(x, self.current.y);
                        self.push(Segment::LineTo(p));
                    }
                    'V' => {
                        let y = self.number()?;
                        let y = if relative { self.current.y + y } else { y };
                        let p = Point2::new(self.current.x, y);
                        self.push(Segment::LineTo(p));
                    }
                    'C' => {
                        let c1 = self.point(relative)?;
                        let c2 = self.point(relative)?;
                        let p = self.point(relative)?;
                        self.push(Segment::CubicTo(c1, c2, p));
                    }
                    'S' => {
                        let c1 = self.reflect(self.last_cubic_ctrl);
                        let c2 = self.point(relative)?;
                        let p = self.point(relative)?;
                        self.push(Segment::CubicTo(c1, c2, p));
                    }
                    'Q' => {
                        let c = self.point(relative)?;
                        let p = self.point(relative)?;
                        self.push(Segment::QuadTo(c, p));
                    }
                    'T' => {
                        let c = self.reflect(self.last_quad_ctrl);
                        let p = self.point(relative)?;
                        self.push(Segment::QuadTo(c, p));
                    }
                    'Z' => self.push(Segment::Close),
                    _ => return Err(PathError::UnexpectedChar(pos, command)),
                }
                first = false;
            }
        }

        Ok(Path {
            segments: self.segments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point2<f64> {
        Point2::new(x, y)
    }

    #[test]
    fn parses_relative_and_implicit_commands() {
        let path = Path::parse("m10 10 l5 0 0 5 h-5 z").unwrap();
        assert_eq!(
            path.segments(),
            &[
                Segment::MoveTo(p(10., 10.)),
                Segment::LineTo(p(15., 10.)),
                Segment::LineTo(p(15., 15.)),
                Segment::LineTo(p(10., 15.)),
                Segment::Close,
            ]
        );
    }

    #[test]
    fn move_with_extra_pairs_becomes_lines() {
        let path = Path::parse("M0,0 10,0 10,10").unwrap();
        assert_eq!(path.segments()[1], Segment::LineTo(p(10., 0.)));
        assert_eq!(path.segments()[2], Segment::LineTo(p(10., 10.)));
    }

    #[test]
    fn compact_numbers_and_exponents() {
        let path = Path::parse("M-1.5-2.5L.5.5 1e1,2E-1").unwrap();
        assert_eq!(
            path.segments(),
            &[
                Segment::MoveTo(p(-1.5, -2.5)),
                Segment::LineTo(p(0.5, 0.5)),
                Segment::LineTo(p(10., 0.2)),
            ]
        );
    }

    #[test]
    fn smooth_curves_reflect_control_points() {
        let path = Path::parse("M0 0 C0 10 10 10 10 0 S20 -10 20 0").unwrap();
        assert_eq!(
            path.segments()[2],
            Segment::CubicTo(p(10., -10.), p(20., -10.), p(20., 0.))
        );

        let path = Path::parse("M0 0 Q5 5 10 0 T20 0").unwrap();
        assert_eq!(path.segments()[2], Segment::QuadTo(p(15., -5.), p(20., 0.)));
    }

    #[test]
    fn bounds_cover_control_points() {
        let path = Path::parse("M2 2 Q4 10 6 2").unwrap();
        assert_eq!(path.bounds(), Rect::from_xywh(2., 2., 4., 8.));
        assert_eq!(Path::default().bounds(), Rect::zero());
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(Path::parse("L1 1"), Err(PathError::NoMoveTo));
        assert_eq!(Path::parse("M1 1 X"), Err(PathError::UnexpectedChar(5, 'X')));
        assert_eq!(Path::parse("M1"), Err(PathError::MissingNumber(2)));
    }
}
