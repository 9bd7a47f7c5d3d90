//! Lua UI scripts.
//!
//! A script builds a view tree by calling the constructors of a [`ScriptModule`] and attaches Lua
//! functions to the widgets’ callbacks:
//!
//! ```lua
//! setContentSize(400, 300)
//!
//! local play = Button.new("play", { title = "Play", frame = { 10, 10, 60, 24 } })
//! play:setClickedFn(action("play"))
//! addSubview(play)
//! ```
//!
//! Every registered type becomes a global table with a `new(name [, properties])` function.
//! The other globals are:
//!
//! - `addSubview(view)` adds a view to the host view the script was loaded into
//! - `setContentSize(width, height)` resizes the host view
//! - `find(name)` returns a widget created earlier, or nil
//! - `action(name)` returns a function that triggers the native action bound to `name`
//! - `trigger(name [, value])` triggers it right away
//!
//! Indices passed to and from scripts (combo box items, list rows) start at 0, as they do on the
//! native side.
//!
//! Lua errors raised by callbacks go to [`Ui::error`], which puts the UI into a failed state
//! until [`Ui::reset`]. This module is the only place that touches the Lua state.

use crate::button::{Button, ButtonKind};
use crate::color::Color;
use crate::combo_box::ComboBox;
use crate::control::Control;
use crate::label::Label;
use crate::list_view::ListView;
use crate::overlay::OverlayManager;
use crate::path::Path;
use crate::rect::Rect;
use crate::scroll_bar::ScrollBar;
use crate::scroll_view::ScrollView;
use crate::selection::SelectionMode;
use crate::slider::Slider;
use crate::table_view::TableView;
use crate::text_field::TextField;
use crate::tree_view::TreeView;
use crate::view::{View, WeakView};
use crate::web_view::WebView;
use crate::window::Window;
use cgmath::Vector2;
use core::any::Any;
use core::cell::{Cell, RefCell};
use core::fmt;
use mlua::{
    AnyUserData, FromLua, Function, IntoLua, Lua, Table, UserData, UserDataMethods, Value,
};
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::{fs, io};

/// Errors that may occur when loading or running a script.
#[derive(Debug)]
pub enum ScriptError {
    /// The script file couldn’t be read.
    Io(String, io::Error),
    /// The script failed to compile or raised an error.
    Lua(mlua::Error),
    /// Two widgets share a name.
    DuplicateName(String),
    /// A property or method argument has an invalid value.
    Property { name: String, message: String },
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ScriptError::Io(path, err) => write!(f, "could not read {}: {}", path, err),
            ScriptError::Lua(err) => write!(f, "{}", err),
            ScriptError::DuplicateName(name) => write!(f, "duplicate view name {:?}", name),
            ScriptError::Property { name, message } => write!(f, "{}: {}", name, message),
        }
    }
}

impl std::error::Error for ScriptError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScriptError::Io(_, err) => Some(err),
            ScriptError::Lua(err) => Some(err),
            _ => None,
        }
    }
}

impl From<mlua::Error> for ScriptError {
    /// Errors raised by native callbacks come back out of Lua wrapped; those are unwrapped again.
    fn from(err: mlua::Error) -> Self {
        native_error(&err).unwrap_or(ScriptError::Lua(err))
    }
}

fn native_error(err: &mlua::Error) -> Option<ScriptError> {
    match err {
        mlua::Error::CallbackError { cause, .. } => native_error(cause),
        mlua::Error::ExternalError(inner) => match inner.downcast_ref::<ScriptError>()? {
            ScriptError::DuplicateName(name) => Some(ScriptError::DuplicateName(name.clone())),
            ScriptError::Property { name, message } => Some(ScriptError::Property {
                name: name.clone(),
                message: message.clone(),
            }),
            _ => None,
        },
        _ => None,
    }
}

/// The value an action or a script callback is called with.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionValue {
    None,
    Bool(bool),
    Number(f64),
    Text(String),
    Index(usize),
}

impl ActionValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ActionValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            ActionValue::Number(n) => Some(*n),
            ActionValue::Index(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_index(&self) -> Option<usize> {
        match self {
            ActionValue::Index(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ActionValue::Text(t) => Some(t),
            _ => None,
        }
    }
}

impl IntoLua for ActionValue {
    fn into_lua(self, lua: &Lua) -> mlua::Result<Value> {
        Ok(match self {
            ActionValue::None => Value::Nil,
            ActionValue::Bool(b) => Value::Boolean(b),
            ActionValue::Number(n) => Value::Number(n),
            ActionValue::Text(text) => Value::String(lua.create_string(&text)?),
            ActionValue::Index(i) => Value::Integer(i as mlua::Integer),
        })
    }
}

impl FromLua for ActionValue {
    fn from_lua(value: Value, _lua: &Lua) -> mlua::Result<Self> {
        Ok(match value {
            Value::Nil => ActionValue::None,
            Value::Boolean(b) => ActionValue::Bool(b),
            Value::Integer(i) if i >= 0 => ActionValue::Index(i as usize),
            Value::Integer(i) => ActionValue::Number(i as f64),
            Value::Number(n) => ActionValue::Number(n),
            Value::String(s) => ActionValue::Text(s.to_string_lossy().to_string()),
            other => {
                return Err(mlua::Error::RuntimeError(format!(
                    "actions can’t take a {}",
                    other.type_name()
                )))
            }
        })
    }
}

/// Something a constructor produced: a handle that owns a view.
pub trait Widget {
    fn view(&self) -> &View;

    fn as_any(&self) -> &dyn Any;
}

macro_rules! impl_widget {
    ($($ty:ty),*) => {
        $(
            impl Widget for $ty {
                fn view(&self) -> &View {
                    <$ty>::view(self)
                }

                fn as_any(&self) -> &dyn Any {
                    self
                }
            }
        )*
    };
}

impl_widget!(Label, ScrollView, ScrollBar, ListView, TreeView, TableView, WebView);

macro_rules! impl_control_widget {
    ($($ty:ty),*) => {
        $(
            impl Widget for $ty {
                fn view(&self) -> &View {
                    Control::view(self)
                }

                fn as_any(&self) -> &dyn Any {
                    self
                }
            }
        )*
    };
}

impl_control_widget!(Button, Slider, TextField, ComboBox);

impl Widget for View {
    fn view(&self) -> &View {
        self
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The properties table a script passed to a constructor, as in
/// `Button.new("play", { title = "Play" })`.
pub struct Properties {
    name: String,
    table: Option<Table>,
}

impl Properties {
    /// The name of the widget being constructed.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn get<T: FromLua>(&self, key: &str) -> Result<Option<T>, ScriptError> {
        let table = match &self.table {
            Some(table) => table,
            None => return Ok(None),
        };
        let value: mlua::Result<Option<T>> = table.get(key);
        value.map_err(|err| self.error(format!("{}: {}", key, err)))
    }

    pub fn text(&self, key: &str) -> Result<Option<String>, ScriptError> {
        self.get(key)
    }

    pub fn number(&self, key: &str) -> Result<Option<f64>, ScriptError> {
        self.get(key)
    }

    pub fn flag(&self, key: &str) -> Result<Option<bool>, ScriptError> {
        self.get(key)
    }

    pub fn index(&self, key: &str) -> Result<Option<usize>, ScriptError> {
        self.get(key)
    }

    pub fn list(&self, key: &str) -> Result<Option<Vec<String>>, ScriptError> {
        self.get(key)
    }

    pub fn numbers(&self, key: &str) -> Result<Option<Vec<f64>>, ScriptError> {
        self.get(key)
    }

    pub fn error(&self, message: impl Into<String>) -> ScriptError {
        ScriptError::Property {
            name: self.name.clone(),
            message: message.into(),
        }
    }
}

pub type Constructor = Rc<dyn Fn(&Properties) -> Result<Rc<dyn Widget>, ScriptError>>;

/// A registry of widget constructors keyed by type name.
#[derive(Clone, Default)]
pub struct ScriptModule {
    constructors: HashMap<String, Constructor>,
}

impl ScriptModule {
    /// An empty registry.
    pub fn new() -> ScriptModule {
        ScriptModule::default()
    }

    /// A registry with the toolkit’s widgets. Combo boxes open their lists through `overlays`.
    pub fn with_standard_widgets(overlays: &Rc<OverlayManager>) -> ScriptModule {
        let mut module = ScriptModule::new();

        module.register("View", |props| Ok(Rc::new(View::new(props.name()))));

        module.register("Label", |props| {
            let text = props.text("text")?.unwrap_or_default();
            Ok(Rc::new(Label::new(props.name(), &text)))
        });

        module.register("Button", |props| {
            let kind = if props.flag("toggle")?.unwrap_or(false) {
                ButtonKind::Toggle
            } else {
                ButtonKind::Push
            };
            let title = props.text("title")?.unwrap_or_default();
            let button = Button::new(props.name(), &title, kind);
            if let Some(icon) = props.text("icon")? {
                let icon = Path::parse(&icon).map_err(|err| props.error(format!("icon: {}", err)))?;
                button.set_icon(Some(icon));
            }
            Ok(Rc::new(button))
        });

        module.register("Slider", |props| {
            let min = props.number("min")?.unwrap_or(0.);
            let max = props.number("max")?.unwrap_or(1.);
            let value = props.number("value")?.unwrap_or(min);
            Ok(Rc::new(Slider::new(props.name(), min, max, value)))
        });

        module.register("TextField", |props| {
            let text = props.text("text")?.unwrap_or_default();
            Ok(Rc::new(TextField::new(props.name(), &text)))
        });

        module.register("ScrollView", |props| Ok(Rc::new(ScrollView::new(props.name()))));

        module.register("ListView", |props| {
            let row_height = props.number("rowHeight")?.unwrap_or(20.);
            if row_height <= 0. {
                return Err(props.error("rowHeight must be positive"));
            }
            let mode = if props.flag("multiple")?.unwrap_or(false) {
                SelectionMode::Multiple
            } else {
                SelectionMode::Single
            };
            Ok(Rc::new(ListView::new(props.name(), row_height, mode)))
        });

        let overlays = Rc::clone(overlays);
        module.register("ComboBox", move |props| {
            let combo = ComboBox::new(props.name(), &overlays);
            combo.set_items(props.list("items")?.unwrap_or_default());
            combo.set_selected_index(props.index("selected")?);
            Ok(Rc::new(combo))
        });

        module.register("WebView", |props| {
            let web_view = WebView::new(props.name());
            if let Some(html) = props.text("html")? {
                web_view.set_html(&html);
            }
            Ok(Rc::new(web_view))
        });

        module
    }

    /// Registers (or replaces) a constructor.
    pub fn register<F>(&mut self, kind: &str, constructor: F)
    where
        F: Fn(&Properties) -> Result<Rc<dyn Widget>, ScriptError> + 'static,
    {
        self.constructors
            .insert(kind.to_string(), Rc::new(constructor));
    }

    pub fn has_type(&self, kind: &str) -> bool {
        self.constructors.contains_key(kind)
    }
}

/// A widget as scripts see it.
struct ScriptWidget {
    widget: Rc<dyn Widget>,
    ui: Weak<UiInner>,
    /// The load the widget belongs to; callbacks of older loads don’t run.
    generation: u64,
}

impl ScriptWidget {
    fn view(&self) -> &View {
        self.widget.view()
    }

    fn error(&self, message: impl Into<String>) -> mlua::Error {
        mlua::Error::external(ScriptError::Property {
            name: self.view().name(),
            message: message.into(),
        })
    }

    fn downcast<T: 'static>(&self, method: &str) -> mlua::Result<&T> {
        self.widget
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| self.error(format!("{} is not supported by this widget", method)))
    }

    /// Wraps a Lua function so that widgets can call it.
    fn handler(&self, f: Function) -> Rc<dyn Fn(ActionValue)> {
        let ui = self.ui.clone();
        let generation = self.generation;
        Rc::new(move |value| {
            if let Some(inner) = ui.upgrade() {
                Ui { inner }.call(generation, &f, value);
            }
        })
    }

    fn set_enabled(&self, is_enabled: bool) -> mlua::Result<()> {
        let any = self.widget.as_any();
        if let Some(control) = any.downcast_ref::<Button>() {
            control.set_enabled(is_enabled);
        } else if let Some(control) = any.downcast_ref::<Slider>() {
            control.set_enabled(is_enabled);
        } else if let Some(control) = any.downcast_ref::<TextField>() {
            control.set_enabled(is_enabled);
        } else if let Some(control) = any.downcast_ref::<ComboBox>() {
            control.set_enabled(is_enabled);
        } else {
            return Err(self.error("only controls can be disabled"));
        }
        Ok(())
    }

    fn add_subview(&self, child: &View) {
        match self.widget.as_any().downcast_ref::<ScrollView>() {
            Some(scroll_view) => scroll_view.content_view().add_subview(child),
            None => self.view().add_subview(child),
        }
    }
}

fn frame_from(numbers: &[f64]) -> Result<Rect, String> {
    match *numbers {
        [x, y, w, h] if w >= 0. && h >= 0. => Ok(Rect::from_xywh(x, y, w, h)),
        [_, _, _, _] => Err("frame size must not be negative".to_string()),
        _ => Err("frame needs x, y, width and height".to_string()),
    }
}

fn color_from(numbers: &[f64]) -> Result<Color, String> {
    match *numbers {
        [r, g, b] => Ok(Color::rgba(r, g, b, 1.)),
        [r, g, b, a] => Ok(Color::rgba(r, g, b, a)),
        _ => Err("colors need 3 or 4 components".to_string()),
    }
}

impl UserData for ScriptWidget {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        // every view

        methods.add_method("name", |_, this, ()| Ok(this.view().name()));
        methods.add_method("frame", |_, this, ()| {
            let frame = this.view().frame();
            Ok((frame.origin.x, frame.origin.y, frame.width(), frame.height()))
        });
        methods.add_method("setFrame", |_, this, (x, y, w, h): (f64, f64, f64, f64)| {
            let frame = frame_from(&[x, y, w, h]).map_err(|message| this.error(message))?;
            this.view().set_frame(frame);
            Ok(())
        });
        methods.add_method(
            "setBackground",
            |_, this, (r, g, b, a): (f64, f64, f64, Option<f64>)| {
                this.view().set_background(Color::rgba(r, g, b, a.unwrap_or(1.)));
                Ok(())
            },
        );
        methods.add_method("setVisible", |_, this, is_visible: bool| {
            this.view().set_visible(is_visible);
            Ok(())
        });
        methods.add_method("setEnabled", |_, this, is_enabled: bool| this.set_enabled(is_enabled));
        methods.add_method("addSubview", |_, this, child: AnyUserData| {
            let child = child.borrow::<ScriptWidget>()?;
            this.add_subview(child.view());
            Ok(())
        });
        methods.add_method("setDirty", |_, this, ()| {
            this.view().set_dirty();
            Ok(())
        });

        // text

        methods.add_method("text", |_, this, ()| {
            let any = this.widget.as_any();
            if let Some(label) = any.downcast_ref::<Label>() {
                Ok(label.text())
            } else {
                Ok(this.downcast::<TextField>("text")?.text())
            }
        });
        methods.add_method("setText", |_, this, text: String| {
            let any = this.widget.as_any();
            if let Some(label) = any.downcast_ref::<Label>() {
                label.set_text(&text);
            } else {
                this.downcast::<TextField>("setText")?.set_text(&text);
            }
            Ok(())
        });
        methods.add_method("setTextDidChangeFn", |_, this, f: Function| {
            let handler = this.handler(f);
            this.downcast::<TextField>("setTextDidChangeFn")?
                .set_text_did_change_fn(move |text| handler(ActionValue::Text(text.to_string())));
            Ok(())
        });

        // buttons

        methods.add_method("setTitle", |_, this, title: String| {
            this.downcast::<Button>("setTitle")?.set_title(&title);
            Ok(())
        });
        methods.add_method("setIcon", |_, this, data: Option<String>| {
            let icon = match data {
                Some(data) => Some(
                    Path::parse(&data).map_err(|err| this.error(format!("icon: {}", err)))?,
                ),
                None => None,
            };
            this.downcast::<Button>("setIcon")?.set_icon(icon);
            Ok(())
        });
        methods.add_method("isOn", |_, this, ()| Ok(this.downcast::<Button>("isOn")?.is_on()));
        methods.add_method("setOn", |_, this, is_on: bool| {
            this.downcast::<Button>("setOn")?.set_on(is_on);
            Ok(())
        });
        methods.add_method("setClickedFn", |_, this, f: Function| {
            let handler = this.handler(f);
            this.downcast::<Button>("setClickedFn")?
                .set_clicked_fn(move || handler(ActionValue::None));
            Ok(())
        });
        methods.add_method("setStateDidChangeFn", |_, this, f: Function| {
            let handler = this.handler(f);
            this.downcast::<Button>("setStateDidChangeFn")?
                .set_state_did_change_fn(move |is_on| handler(ActionValue::Bool(is_on)));
            Ok(())
        });

        // sliders

        methods.add_method("value", |_, this, ()| Ok(this.downcast::<Slider>("value")?.value()));
        methods.add_method("setValue", |_, this, value: f64| {
            this.downcast::<Slider>("setValue")?.set_value(value);
            Ok(())
        });
        methods.add_method("setPosChangedFn", |_, this, f: Function| {
            let handler = this.handler(f);
            this.downcast::<Slider>("setPosChangedFn")?
                .set_pos_changed_fn(move |value| handler(ActionValue::Number(value)));
            Ok(())
        });

        // scroll views

        methods.add_method("setContentView", |_, this, content: AnyUserData| {
            let content = content.borrow::<ScriptWidget>()?;
            this.downcast::<ScrollView>("setContentView")?
                .set_content_view(content.view());
            Ok(())
        });
        methods.add_method("setContentSize", |_, this, (w, h): (f64, f64)| {
            this.downcast::<ScrollView>("setContentSize")?
                .set_content_size(Vector2::new(w, h));
            Ok(())
        });
        methods.add_method("setFitsWidth", |_, this, fits_width: bool| {
            this.downcast::<ScrollView>("setFitsWidth")?
                .set_fits_width(fits_width);
            Ok(())
        });
        methods.add_method("setPos", |_, this, (x, y): (f64, f64)| {
            this.downcast::<ScrollView>("setPos")?
                .set_pos(Vector2::new(x, y));
            Ok(())
        });

        // lists and combo boxes

        methods.add_method("setDidSelectRowFn", |_, this, f: Function| {
            let handler = this.handler(f);
            this.downcast::<ListView>("setDidSelectRowFn")?
                .set_did_select_row_fn(move |row| handler(ActionValue::Index(row)));
            Ok(())
        });
        methods.add_method("setItems", |_, this, items: Vec<String>| {
            this.downcast::<ComboBox>("setItems")?.set_items(items);
            Ok(())
        });
        methods.add_method("selectedIndex", |_, this, ()| {
            Ok(this.downcast::<ComboBox>("selectedIndex")?.selected_index())
        });
        methods.add_method("setSelectedIndex", |_, this, index: Option<usize>| {
            this.downcast::<ComboBox>("setSelectedIndex")?
                .set_selected_index(index);
            Ok(())
        });
        methods.add_method("setDidSelectFn", |_, this, f: Function| {
            let handler = this.handler(f);
            this.downcast::<ComboBox>("setDidSelectFn")?
                .set_did_select_fn(move |index| handler(ActionValue::Index(index)));
            Ok(())
        });

        // web views

        methods.add_method("setHtml", |_, this, html: String| {
            this.downcast::<WebView>("setHtml")?.set_html(&html);
            Ok(())
        });
        methods.add_method("setLinkClickedFn", |_, this, f: Function| {
            let handler = this.handler(f);
            this.downcast::<WebView>("setLinkClickedFn")?
                .set_link_clicked_fn(move |href| handler(ActionValue::Text(href.to_string())));
            Ok(())
        });
    }
}

type Action = Rc<dyn Fn(&ActionValue)>;

struct UiInner {
    module: ScriptModule,
    /// The state of the current load.
    lua: RefCell<Option<Rc<Lua>>>,
    generation: Cell<u64>,
    host: RefCell<WeakView>,
    widgets: RefCell<HashMap<String, Rc<dyn Widget>>>,
    /// Views the script added to the host, in order.
    loaded: RefCell<Vec<View>>,
    actions: RefCell<HashMap<String, Action>>,
    content_size: Cell<Option<Vector2<f64>>>,
    is_failed: Cell<bool>,
    last_error: RefCell<Option<String>>,
    deferral: RefCell<Option<(Window, Rc<dyn Fn(String)>)>>,
}

/// A loaded UI script and its action bindings.
#[derive(Clone)]
pub struct Ui {
    inner: Rc<UiInner>,
}

impl Ui {
    pub fn new(module: ScriptModule) -> Ui {
        Ui {
            inner: Rc::new(UiInner {
                module,
                lua: RefCell::new(None),
                generation: Cell::new(0),
                host: RefCell::new(WeakView::new()),
                widgets: RefCell::new(HashMap::new()),
                loaded: RefCell::new(Vec::new()),
                actions: RefCell::new(HashMap::new()),
                content_size: Cell::new(None),
                is_failed: Cell::new(false),
                last_error: RefCell::new(None),
                deferral: RefCell::new(None),
            }),
        }
    }

    /// Runs a script file against `host`.
    pub fn load_ui(&self, host: &View, path: &std::path::Path) -> Result<(), ScriptError> {
        let source = fs::read_to_string(path)
            .map_err(|err| ScriptError::Io(path.display().to_string(), err));
        match source {
            Ok(source) => self.load(host, &format!("@{}", path.display()), &source),
            Err(err) => {
                self.error(&err.to_string());
                Err(err)
            }
        }
    }

    /// Runs a script against `host`, replacing whatever the last script built.
    pub fn load_ui_str(&self, host: &View, source: &str) -> Result<(), ScriptError> {
        self.load(host, "=ui", source)
    }

    fn load(&self, host: &View, chunk_name: &str, source: &str) -> Result<(), ScriptError> {
        self.unload();
        self.reset();
        *self.inner.host.borrow_mut() = host.downgrade();

        let result = self.run(chunk_name, source);
        match &result {
            Ok(()) => {
                host.set_dirty();
                log::debug!(
                    "{}: loaded {} widgets into {:?}",
                    chunk_name,
                    self.inner.widgets.borrow().len(),
                    host
                );
            }
            Err(err) => {
                self.unload();
                self.error(&err.to_string());
            }
        }
        result
    }

    fn run(&self, chunk_name: &str, source: &str) -> Result<(), ScriptError> {
        let lua = Rc::new(Lua::new());
        let generation = self.inner.generation.get();
        self.install(&lua, generation)?;
        *self.inner.lua.borrow_mut() = Some(Rc::clone(&lua));
        lua.load(source).set_name(chunk_name).exec()?;
        Ok(())
    }

    /// Sets up the globals scripts see.
    fn install(&self, lua: &Lua, generation: u64) -> mlua::Result<()> {
        let globals = lua.globals();

        for (kind, constructor) in &self.inner.module.constructors {
            let ui = Rc::downgrade(&self.inner);
            let constructor = Rc::clone(constructor);
            let new = lua.create_function(move |_, (name, table): (String, Option<Table>)| {
                let inner = upgrade(&ui)?;
                let widget = Ui { inner }
                    .construct(&constructor, Properties { name, table })
                    .map_err(mlua::Error::external)?;
                Ok(ScriptWidget {
                    widget,
                    ui: ui.clone(),
                    generation,
                })
            })?;
            let class = lua.create_table()?;
            class.set("new", new)?;
            globals.set(kind.as_str(), class)?;
        }

        let ui = Rc::downgrade(&self.inner);
        let add_subview = lua.create_function(move |_, view: AnyUserData| {
            let inner = upgrade(&ui)?;
            let view = view.borrow::<ScriptWidget>()?.view().clone();
            if let Some(host) = inner.host.borrow().upgrade() {
                host.add_subview(&view);
            }
            inner.loaded.borrow_mut().push(view);
            Ok(())
        })?;
        globals.set("addSubview", add_subview)?;

        let ui = Rc::downgrade(&self.inner);
        let set_content_size = lua.create_function(move |_, (w, h): (f64, f64)| {
            let inner = upgrade(&ui)?;
            if w < 0. || h < 0. {
                return Err(mlua::Error::RuntimeError(
                    "content size must not be negative".to_string(),
                ));
            }
            let size = Vector2::new(w, h);
            inner.content_size.set(Some(size));
            if let Some(host) = inner.host.borrow().upgrade() {
                host.set_frame(host.frame().with_size(size));
            }
            Ok(())
        })?;
        globals.set("setContentSize", set_content_size)?;

        let ui = Rc::downgrade(&self.inner);
        let find = lua.create_function(move |_, name: String| {
            let inner = upgrade(&ui)?;
            let widget = inner.widgets.borrow().get(&name).cloned();
            Ok(widget.map(|widget| ScriptWidget {
                widget,
                ui: ui.clone(),
                generation,
            }))
        })?;
        globals.set("find", find)?;

        let ui = Rc::downgrade(&self.inner);
        let action = lua.create_function(move |lua, name: String| {
            let ui = ui.clone();
            lua.create_function(move |_, value: ActionValue| {
                let inner = upgrade(&ui)?;
                Ui { inner }.trigger(&name, value);
                Ok(())
            })
        })?;
        globals.set("action", action)?;

        let ui = Rc::downgrade(&self.inner);
        let trigger = lua.create_function(move |_, (name, value): (String, ActionValue)| {
            let inner = upgrade(&ui)?;
            Ui { inner }.trigger(&name, value);
            Ok(())
        })?;
        globals.set("trigger", trigger)?;

        Ok(())
    }

    fn construct(
        &self,
        constructor: &Constructor,
        props: Properties,
    ) -> Result<Rc<dyn Widget>, ScriptError> {
        if self.inner.widgets.borrow().contains_key(props.name()) {
            return Err(ScriptError::DuplicateName(props.name().to_string()));
        }
        let widget = constructor(&props)?;
        let view = widget.view().clone();

        if let Some(numbers) = props.numbers("frame")? {
            view.set_frame(frame_from(&numbers).map_err(|message| props.error(message))?);
        }
        if let Some(numbers) = props.numbers("background")? {
            view.set_background(color_from(&numbers).map_err(|message| props.error(message))?);
        }
        if let Some(is_visible) = props.flag("visible")? {
            view.set_visible(is_visible);
        }

        self.inner
            .widgets
            .borrow_mut()
            .insert(props.name().to_string(), Rc::clone(&widget));

        if let Some(is_enabled) = props.flag("enabled")? {
            let script_widget = ScriptWidget {
                widget: Rc::clone(&widget),
                ui: Rc::downgrade(&self.inner),
                generation: self.inner.generation.get(),
            };
            script_widget
                .set_enabled(is_enabled)
                .map_err(|_| props.error("only controls can be disabled"))?;
        }
        Ok(widget)
    }

    /// Calls a script callback. Errors it raises are reported through [`Ui::error`].
    fn call(&self, generation: u64, f: &Function, value: ActionValue) {
        if generation != self.inner.generation.get() {
            log::trace!("ignoring a callback of an unloaded script");
            return;
        }
        if self.is_failed() {
            log::debug!("ignoring a script callback after an error");
            return;
        }
        let result: mlua::Result<()> = f.call(value);
        if let Err(err) = result {
            self.error(&err.to_string());
        }
    }

    /// Removes everything the last script added and closes its Lua state.
    pub fn unload(&self) {
        self.inner.generation.set(self.inner.generation.get() + 1);
        let loaded = std::mem::replace(&mut *self.inner.loaded.borrow_mut(), Vec::new());
        for view in loaded {
            view.set_dirty();
            view.remove_from_superview();
        }
        self.inner.widgets.borrow_mut().clear();
        self.inner.content_size.set(None);
        let lua = self.inner.lua.borrow_mut().take();
        drop(lua);
    }

    /// Binds an action name to a native closure, replacing any previous binding.
    pub fn bind_action(&self, name: &str, action: impl Fn(&ActionValue) + 'static) {
        self.inner
            .actions
            .borrow_mut()
            .insert(name.to_string(), Rc::new(action));
    }

    /// Runs an action. Unbound actions are errors; while the UI is in the failed state nothing
    /// runs.
    pub fn trigger(&self, name: &str, value: ActionValue) {
        if self.is_failed() {
            log::debug!("ignoring action {:?} after an error", name);
            return;
        }
        let action = self.inner.actions.borrow().get(name).cloned();
        match action {
            Some(action) => {
                log::trace!("action {:?}({:?})", name, value);
                action(&value);
            }
            None => self.error(&format!("no action bound to {:?}", name)),
        }
    }

    /// Reports an error and puts the UI into the failed state until [`Ui::reset`].
    ///
    /// While the deferral window is drawing, the message goes to the deferral function instead,
    /// which is expected to call `error` again once drawing is over.
    pub fn error(&self, message: &str) {
        let defer = match &*self.inner.deferral.borrow() {
            Some((window, defer)) if window.is_drawing() => Some(Rc::clone(defer)),
            _ => None,
        };
        if let Some(defer) = defer {
            log::debug!("deferring UI error raised while drawing");
            defer(message.to_string());
            return;
        }
        log::error!("UI error: {}", message);
        *self.inner.last_error.borrow_mut() = Some(message.to_string());
        self.inner.is_failed.set(true);
    }

    /// Sets where errors raised while `window` draws are sent, normally a closure that posts them
    /// back through the event loop’s invoker.
    pub fn set_error_deferral(&self, window: &Window, defer: impl Fn(String) + 'static) {
        *self.inner.deferral.borrow_mut() = Some((window.clone(), Rc::new(defer)));
    }

    pub fn is_failed(&self) -> bool {
        self.inner.is_failed.get()
    }

    /// The message of the last reported error.
    pub fn last_error(&self) -> Option<String> {
        self.inner.last_error.borrow().clone()
    }

    /// Leaves the failed state.
    pub fn reset(&self) {
        self.inner.is_failed.set(false);
    }

    /// The size the script passed to `setContentSize`.
    pub fn content_size(&self) -> Option<Vector2<f64>> {
        self.inner.content_size.get()
    }

    /// Looks up a widget by name and type.
    pub fn widget<T: Clone + 'static>(&self, name: &str) -> Option<T> {
        self.inner
            .widgets
            .borrow()
            .get(name)
            .and_then(|widget| widget.as_any().downcast_ref::<T>().cloned())
    }

    pub fn view(&self, name: &str) -> Option<View> {
        self.inner
            .widgets
            .borrow()
            .get(name)
            .map(|widget| widget.view().clone())
    }
}

fn upgrade(ui: &Weak<UiInner>) -> mlua::Result<Rc<UiInner>> {
    ui.upgrade()
        .ok_or_else(|| mlua::Error::RuntimeError("the UI is gone".to_string()))
}
