//! MDStudio, a small retained-mode UI toolkit.
//!
//! # Conceptual overview
//!
//! ## Views
//! A [`View`] is a reference-counted node in a tree. It has a frame in its superview’s coordinate
//! system, an optional background color, and a [`ViewDelegate`] that gives it behavior: handling
//! events, drawing, laying out subviews. Widgets such as [`Button`] or [`ListView`] are cheap
//! handles that own a view and a shared state object acting as its delegate; cloning a widget
//! clones the handle.
//!
//! Views never hold strong references to their superview, and widget state never holds a strong
//! reference to its own view, so dropping the last handle to a subtree frees it.
//!
//! ## Events
//! Events arrive at a [`Window`] and are dispatched through its [`ResponderChain`]. Pointer events
//! go to the topmost view under the pointer and bubble up to its ancestors until one handles
//! them. A view may capture the responder, e.g. while dragging, in which case it receives every
//! pointer event until it releases it. Keyboard events go to the first responder.
//!
//! ## Drawing
//! Changing a view marks a rectangle of its window dirty. The window asks its redraw scheduler
//! (normally the [`EventLoop`]) for a redraw, and on the next iteration every visible view
//! intersecting the dirty rectangle draws into a [`DrawContext`]. The resulting display list is
//! handed to a [`Renderer`].
//!
//! ## Threads
//! All views live on the thread running the event loop. Other threads post closures through an
//! [`Invoker`].
//!
//! ## Overlays
//! Transient windows, like the list of an open [`ComboBox`], are managed by an
//! [`OverlayManager`]. Overlays see input before the main window, and at most one is open.
//!
//! ## UI scripts
//! Window contents are built by Lua scripts loaded through a [`Ui`]. Scripts create widgets
//! from the types registered in a [`ScriptModule`] and attach Lua functions or named actions as
//! their handlers; see the [`ui`] module.
//!
//! ## Coordinate System
//! The origin is at the top left corner of a window’s content area, and positive y points down.

mod button;
pub mod color;
mod combo_box;
mod control;
pub mod dirty;
pub mod draw;
pub mod events;
mod label;
mod list_view;
pub mod overlay;
pub mod path;
pub mod platform;
mod rect;
mod responder;
mod scroll_bar;
mod scroll_view;
pub mod selection;
mod slider;
mod table_view;
mod text_field;
mod tree_view;
pub mod ui;
mod view;
mod web_view;
mod window;

pub use button::{Button, ButtonKind};
pub use color::Color;
pub use combo_box::ComboBox;
pub use control::{Control, ControlState};
pub use draw::{DrawCommand, DrawContext, NullRenderer, Renderer};
pub use events::{Cursor, EventPhase, EventType, KeyCode, Modifiers, UIEvent};
pub use label::Label;
pub use list_view::{ListView, WeakListView};
pub use overlay::OverlayManager;
pub use path::{Path, PathError, Segment};
pub use platform::{EventLoop, Invoker, PlatformEvent};
pub use rect::Rect;
pub use responder::ResponderChain;
pub use scroll_bar::{Orientation, ScrollBar};
pub use scroll_view::ScrollView;
pub use selection::{Selection, SelectionChange, SelectionMode};
pub use slider::Slider;
pub use table_view::{Column, TableView};
pub use text_field::TextField;
pub use tree_view::{IndexPath, TreeView};
pub use ui::{ActionValue, Constructor, Properties, ScriptError, ScriptModule, Ui, Widget};
pub use view::{View, ViewDelegate, ViewId, WeakView};
pub use web_view::{Run, WebView};
pub use window::{RedrawScheduler, Window, WindowId};
