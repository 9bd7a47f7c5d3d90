//! Rich text from a small subset of HTML.
//!
//! Block tags are `h1` to `h3`, `p`, `li` (inside `ul` or `ol`) and `br`; `a href` makes a link.
//! Any other tag is skipped and its text kept. The entities `&amp;`, `&lt;`, `&gt;`, `&quot;`,
//! `&#39;` and `&nbsp;` are decoded. Text is wrapped to the view’s width, and the view’s height
//! follows its content.

use crate::color::Color;
use crate::draw::DrawContext;
use crate::events::{EventType, UIEvent};
use crate::rect::Rect;
use crate::responder::ResponderChain;
use crate::view::{View, ViewDelegate};
use core::cell::RefCell;
use std::rc::Rc;

const LINK: Color = Color::rgb(0.4, 0.62, 1.);
const LIST_INDENT: f64 = 20.;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Heading(u8),
    Paragraph,
    ListItem,
}

impl BlockKind {
    /// Line height and character width.
    fn metrics(self) -> (f64, f64) {
        match self {
            BlockKind::Heading(1) => (28., 12.),
            BlockKind::Heading(2) => (22., 9.5),
            BlockKind::Heading(_) => (18., 8.),
            BlockKind::Paragraph | BlockKind::ListItem => (16., 7.),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Piece {
    Word { text: String, href: Option<Rc<str>> },
    Break,
}

#[derive(Debug, Clone, PartialEq)]
struct Block {
    kind: BlockKind,
    /// `•` or the item number for list items.
    marker: Option<String>,
    pieces: Vec<Piece>,
}

/// A laid out piece of text, in the view’s coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub rect: Rect,
    pub text: String,
    pub href: Option<String>,
}

fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        rest = &rest[start..];
        let decoded = match rest.find(';') {
            Some(end) => match &rest[1..end] {
                "amp" => Some(('&', end)),
                "lt" => Some(('<', end)),
                "gt" => Some(('>', end)),
                "quot" => Some(('"', end)),
                "#39" | "apos" => Some(('\'', end)),
                "nbsp" => Some(('\u{a0}', end)),
                _ => None,
            },
            None => None,
        };
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Returns the value of an attribute in the inside of a tag, e.g. `a href="x"`.
fn attribute(tag: &str, name: &str) -> Option<String> {
    let lower = tag.to_ascii_lowercase();
    let start = lower.find(&format!("{}=", name))? + name.len() + 1;
    let value = &tag[start..];
    let value = match value.chars().next()? {
        quote @ '"' | quote @ '\'' => value[1..].split(quote).next()?,
        _ => value.split_whitespace().next()?,
    };
    Some(decode_entities(value))
}

struct Parser {
    blocks: Vec<Block>,
    current: Option<Block>,
    href: Option<Rc<str>>,
    /// Item counters of the open lists; `None` for unordered ones.
    lists: Vec<Option<usize>>,
}

impl Parser {
    fn flush(&mut self) {
        if let Some(block) = self.current.take() {
            if block.pieces.iter().any(|p| matches!(p, Piece::Word { .. })) {
                self.blocks.push(block);
            }
        }
    }

    fn start(&mut self, kind: BlockKind, marker: Option<String>) {
        self.flush();
        self.current = Some(Block {
            kind,
            marker,
            pieces: Vec::new(),
        });
    }

    fn text(&mut self, text: &str) {
        let text = decode_entities(text);
        for word in text.split_whitespace() {
            if self.current.is_none() {
                self.start(BlockKind::Paragraph, None);
            }
            if let Some(block) = &mut self.current {
                block.pieces.push(Piece::Word {
                    text: word.replace('\u{a0}', " "),
                    href: self.href.clone(),
                });
            }
        }
    }

    fn tag(&mut self, inside: &str) {
        let is_closing = inside.starts_with('/');
        let name: String = inside
            .trim_start_matches('/')
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match (name.as_str(), is_closing) {
            ("h1", false) => self.start(BlockKind::Heading(1), None),
            ("h2", false) => self.start(BlockKind::Heading(2), None),
            ("h3", false) => self.start(BlockKind::Heading(3), None),
            ("p", false) => self.start(BlockKind::Paragraph, None),
            ("h1", true) | ("h2", true) | ("h3", true) | ("p", true) | ("li", true) => self.flush(),
            ("ul", false) => {
                self.flush();
                self.lists.push(None);
            }
            ("ol", false) => {
                self.flush();
                self.lists.push(Some(0));
            }
            ("ul", true) | ("ol", true) => {
                self.flush();
                self.lists.pop();
            }
            ("li", false) => {
                let marker = match self.lists.last_mut() {
                    Some(Some(count)) => {
                        *count += 1;
                        format!("{}.", count)
                    }
                    _ => "•".to_string(),
                };
                self.start(BlockKind::ListItem, Some(marker));
            }
            ("br", _) => {
                if let Some(block) = &mut self.current {
                    block.pieces.push(Piece::Break);
                }
            }
            ("a", false) => self.href = attribute(inside, "href").map(Rc::from),
            ("a", true) => self.href = None,
            _ => (),
        }
    }
}

fn parse(html: &str) -> Vec<Block> {
    let mut parser = Parser {
        blocks: Vec::new(),
        current: None,
        href: None,
        lists: Vec::new(),
    };
    let mut rest = html;
    while !rest.is_empty() {
        if rest.starts_with("<!--") {
            rest = rest.find("-->").map_or("", |end| &rest[end + 3..]);
            continue;
        }
        match rest.find('<') {
            Some(0) => match rest.find('>') {
                Some(end) => {
                    parser.tag(&rest[1..end]);
                    rest = &rest[end + 1..];
                }
                None => {
                    parser.text(rest);
                    rest = "";
                }
            },
            Some(start) => {
                parser.text(&rest[..start]);
                rest = &rest[start..];
            }
            None => {
                parser.text(rest);
                rest = "";
            }
        }
    }
    parser.flush();
    parser.blocks
}

/// Lays blocks out into runs for the given width. Returns the runs and the total height.
fn layout(blocks: &[Block], width: f64) -> (Vec<Run>, f64) {
    let mut runs: Vec<Run> = Vec::new();
    let mut y = 0.;
    for block in blocks {
        let (line_height, char_width) = block.kind.metrics();
        let indent = if block.marker.is_some() { LIST_INDENT } else { 0. };
        if let Some(marker) = &block.marker {
            runs.push(Run {
                rect: Rect::from_xywh(4., y, indent - 4., line_height),
                text: marker.clone(),
                href: None,
            });
        }

        let mut x = indent;
        // index of the first run on the current line
        let mut line_start = runs.len();
        for piece in &block.pieces {
            let (text, href) = match piece {
                Piece::Word { text, href } => (text, href),
                Piece::Break => {
                    x = indent;
                    y += line_height;
                    line_start = runs.len();
                    continue;
                }
            };
            let word_width = text.chars().count() as f64 * char_width;
            if x > indent && x + word_width > width {
                x = indent;
                y += line_height;
                line_start = runs.len();
            }
            let href = href.as_ref().map(|href| href.to_string());
            let is_same_line = runs.len() > line_start;
            match runs.last_mut() {
                Some(run) if is_same_line && run.href == href => {
                    run.text.push(' ');
                    run.text.push_str(text);
                    run.rect.size.x = x + word_width - run.rect.origin.x;
                }
                _ => runs.push(Run {
                    rect: Rect::from_xywh(x, y, word_width, line_height),
                    text: text.clone(),
                    href,
                }),
            }
            x += word_width + char_width;
        }
        y += line_height + line_height / 2.;
    }
    (runs, y)
}

struct WebViewState {
    html: RefCell<String>,
    blocks: RefCell<Vec<Block>>,
    /// Runs for the width they were laid out at.
    runs: RefCell<Option<(f64, Vec<Run>, f64)>>,
    link_clicked_fn: RefCell<Option<Rc<dyn Fn(&str)>>>,
}

impl WebViewState {
    /// Lays out for the current width and makes the view as tall as its content.
    fn relayout(&self, view: &View) {
        let width = view.frame().width();
        let is_current = matches!(&*self.runs.borrow(), Some((w, _, _)) if *w == width);
        if is_current {
            return;
        }
        let (runs, height) = layout(&self.blocks.borrow(), width);
        *self.runs.borrow_mut() = Some((width, runs, height));
        let frame = view.frame();
        if frame.height() != height {
            view.set_frame(Rect::from_xywh(frame.origin.x, frame.origin.y, width, height));
        }
        view.set_dirty();
    }

    fn link_at(&self, view: &View, event: &UIEvent) -> Option<String> {
        let point = view.convert_from_window(event.point());
        let runs = self.runs.borrow();
        let (_, runs, _) = runs.as_ref()?;
        runs.iter()
            .find(|run| run.href.is_some() && run.rect.contains(point))
            .and_then(|run| run.href.clone())
    }
}

impl ViewDelegate for WebViewState {
    fn handle_event(&self, view: &View, event: &UIEvent, _chain: &ResponderChain) -> bool {
        if event.event_type() != EventType::MouseDown {
            return false;
        }
        let href = match self.link_at(view, event) {
            Some(href) => href,
            None => return false,
        };
        log::debug!("{:?}: link {:?}", view, href);
        let link_clicked = self.link_clicked_fn.borrow().clone();
        if let Some(link_clicked) = link_clicked {
            link_clicked(&href);
        }
        true
    }

    fn draw(&self, _view: &View, ctx: &mut DrawContext) {
        if let Some((_, runs, _)) = &*self.runs.borrow() {
            for run in runs {
                let color = if run.href.is_some() { LINK } else { Color::TEXT };
                ctx.draw_text(run.rect, &run.text, color);
            }
        }
    }

    fn layout(&self, view: &View) {
        self.relayout(view);
    }
}

/// Shows rich text, e.g. help pages.
#[derive(Clone)]
pub struct WebView {
    view: View,
    state: Rc<WebViewState>,
}

impl WebView {
    pub fn new(name: &str) -> WebView {
        let state = Rc::new(WebViewState {
            html: RefCell::new(String::new()),
            blocks: RefCell::new(Vec::new()),
            runs: RefCell::new(None),
            link_clicked_fn: RefCell::new(None),
        });
        WebView {
            view: View::with_delegate(name, state.clone()),
            state,
        }
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn html(&self) -> String {
        self.state.html.borrow().clone()
    }

    pub fn set_html(&self, html: &str) {
        *self.state.html.borrow_mut() = html.to_string();
        *self.state.blocks.borrow_mut() = parse(html);
        self.state.runs.borrow_mut().take();
        self.state.relayout(&self.view);
    }

    /// The laid out text.
    pub fn runs(&self) -> Vec<Run> {
        self.state
            .runs
            .borrow()
            .as_ref()
            .map(|(_, runs, _)| runs.clone())
            .unwrap_or_default()
    }

    pub fn set_link_clicked_fn(&self, f: impl Fn(&str) + 'static) {
        *self.state.link_clicked_fn.borrow_mut() = Some(Rc::new(f));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Point2;
    use core::cell::RefCell;

    fn texts(web_view: &WebView) -> Vec<String> {
        web_view.runs().into_iter().map(|run| run.text).collect()
    }

    #[test]
    fn parses_blocks_and_entities() {
        let blocks = parse(
            "<h1>Melobase &amp; you</h1>\n<p>Hello,\n   <b>world</b>!</p><!-- note --><ul><li>one<li>two</ul>",
        );
        let kinds: Vec<_> = blocks.iter().map(|b| (b.kind, b.marker.clone())).collect();
        assert_eq!(
            kinds,
            vec![
                (BlockKind::Heading(1), None),
                (BlockKind::Paragraph, None),
                (BlockKind::ListItem, Some("•".to_string())),
                (BlockKind::ListItem, Some("•".to_string())),
            ]
        );
        assert_eq!(
            blocks[0].pieces[1],
            Piece::Word {
                text: "&".to_string(),
                href: None
            }
        );
        assert_eq!(decode_entities("a &lt;b&gt; &unknown; &"), "a <b> &unknown; &");
    }

    #[test]
    fn ordered_lists_are_numbered() {
        let web_view = WebView::new("help");
        web_view.view().set_frame(Rect::from_xywh(0., 0., 300., 0.));
        web_view.set_html("<ol><li>Connect a keyboard</li><li>Press record</li></ol>");
        assert_eq!(
            texts(&web_view),
            vec!["1.", "Connect a keyboard", "2.", "Press record"]
        );
    }

    #[test]
    fn text_wraps_and_the_view_grows() {
        let web_view = WebView::new("help");
        web_view.view().set_frame(Rect::from_xywh(0., 0., 90., 0.));
        // 7 px per character: "aaaa bbbb" is 63 px wide, "cccc" doesn’t fit after it
        web_view.set_html("<p>aaaa bbbb cccc</p>");
        let runs = web_view.runs();
        assert_eq!(texts(&web_view), vec!["aaaa bbbb", "cccc"]);
        assert_eq!(runs[1].rect, Rect::from_xywh(0., 16., 28., 16.));
        assert_eq!(web_view.view().frame().height(), 16. * 2. + 8.);

        web_view.view().set_frame(Rect::from_xywh(0., 0., 200., 40.));
        assert_eq!(texts(&web_view), vec!["aaaa bbbb cccc"]);
        assert_eq!(web_view.view().frame().height(), 24.);
    }

    #[test]
    fn clicking_a_link_reports_it() {
        let root = View::new("root");
        root.set_frame(Rect::from_xywh(0., 0., 300., 300.));
        let web_view = WebView::new("help");
        web_view.view().set_frame(Rect::from_xywh(0., 0., 300., 0.));
        root.add_subview(web_view.view());
        web_view.set_html("<p>See <a href='https://melobase.org/docs'>the manual</a> online</p>");
        assert_eq!(texts(&web_view), vec!["See", "the manual", "online"]);

        let clicked = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&clicked);
        web_view.set_link_clicked_fn(move |href| log.borrow_mut().push(href.to_string()));

        let chain = ResponderChain::new(&root);
        assert!(!chain.send_event(&UIEvent::mouse_down(Point2::new(5., 5.))));
        assert!(chain.send_event(&UIEvent::mouse_down(Point2::new(40., 5.))));
        assert_eq!(*clicked.borrow(), vec!["https://melobase.org/docs".to_string()]);
    }
}
