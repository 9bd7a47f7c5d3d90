use cgmath::{Point2, Vector2};
use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use mdstudio::{Button, ComboBox, EventLoop, Invoker, NullRenderer, Rect, UIEvent, WindowId};
use melobase_station::app::{self, MelobaseApp};
use melobase_station::midi::MidiError;
use melobase_station::midi_hub::{InputCallback, MidiDriver};
use melobase_station::preferences::Preferences;
use melobase_station::studio::Transport;
use melobase_station::terminal::{self, CELL_SIZE};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

fn new_app(data_path: &std::path::Path) -> MelobaseApp {
    let _ = env_logger::builder().is_test(true).try_init();
    MelobaseApp::new(data_path, &app::resource_path().join("TopView.lua")).unwrap()
}

fn click(invoker: &Invoker<MelobaseApp>, window: WindowId, x: f64, y: f64) {
    invoker.post_event(window, UIEvent::mouse_down(Point2::new(x, y)));
    invoker.post_event(window, UIEvent::mouse_up(Point2::new(x, y)));
}

fn input_combo(event_loop: &EventLoop<MelobaseApp>) -> Option<ComboBox> {
    event_loop
        .app()
        .top_view_controller()
        .ui()
        .widget::<ComboBox>("midiInput")
}

#[test]
fn toolbar_buttons_drive_the_transport() {
    let dir = tempfile::tempdir().unwrap();
    let mut event_loop = new_app(dir.path()).into_event_loop(Box::new(NullRenderer::default()));
    let invoker = event_loop.invoker();
    let window = event_loop.app().window().id();

    // play, then record
    click(&invoker, window, 180., 20.);
    click(&invoker, window, 110., 20.);
    event_loop.process_pending();
    assert_eq!(event_loop.app().studio().borrow().transport(), Transport::Recording);
    assert_eq!(event_loop.app().top_view_controller().status_text(), "Recording");

    // metronome is a toggle and is remembered
    click(&invoker, window, 330., 20.);
    event_loop.process_pending();
    assert!(event_loop.app().studio().borrow().is_metronome_on());
    assert!(Preferences::load(dir.path()).is_metronome_on);
    let metronome = event_loop.app().top_view_controller().ui().widget::<Button>("metronome");
    assert_eq!(metronome.map(|b| b.is_on()), Some(true));

    // quit posts a quit event
    click(&invoker, window, 750., 20.);
    event_loop.run();
    assert!(event_loop.is_quitting());

    event_loop.app_mut().shutdown();
    assert_eq!(Preferences::load(dir.path()).window_size, Some((800., 500.)));
}

#[test]
fn terminal_input_drives_the_app_and_quits_it() {
    let dir = tempfile::tempdir().unwrap();
    let mut event_loop = new_app(dir.path()).into_event_loop(Box::new(NullRenderer::default()));
    let invoker = event_loop.invoker();
    let window = event_loop.app().window().id();
    let resize = |invoker: &Invoker<MelobaseApp>, size: Vector2<f64>| {
        invoker.invoke(move |app: &mut MelobaseApp| {
            app.window().set_frame(Rect::from_xywh(0., 0., size.x, size.y));
        });
    };

    // the play button spans x 150 to 210, y 8 to 32
    let (column, row) = ((180. / CELL_SIZE.x) as u16, (20. / CELL_SIZE.y) as u16);
    let mouse = |kind| {
        Event::Mouse(MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        })
    };
    let events = vec![
        mouse(MouseEventKind::Down(MouseButton::Left)),
        mouse(MouseEventKind::Up(MouseButton::Left)),
        Event::Resize(100, 40),
        Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
    ];
    for event in &events {
        for input in terminal::translate(event) {
            assert!(terminal::forward(input, window, &invoker, &resize));
        }
    }

    event_loop.run();
    assert!(event_loop.is_quitting());
    assert_eq!(event_loop.app().studio().borrow().transport(), Transport::Playing);

    event_loop.app_mut().shutdown();
    assert_eq!(Preferences::load(dir.path()).window_size, Some((800., 640.)));
}

#[derive(Default)]
struct FakePorts {
    callback: Option<InputCallback>,
    sent: Vec<Vec<u8>>,
}

#[derive(Clone, Default)]
struct FakeDriver(Arc<Mutex<FakePorts>>);

impl MidiDriver for FakeDriver {
    fn input_ports(&mut self) -> Vec<String> {
        vec!["Keys".to_string()]
    }

    fn output_ports(&mut self) -> Vec<String> {
        vec!["Synth".to_string()]
    }

    fn open_input(&mut self, _name: &str, callback: InputCallback) -> Result<(), MidiError> {
        self.0.lock().unwrap().callback = Some(callback);
        Ok(())
    }

    fn close_input(&mut self) {
        self.0.lock().unwrap().callback = None;
    }

    fn open_output(&mut self, _name: &str) -> Result<(), MidiError> {
        Ok(())
    }

    fn close_output(&mut self) {}

    fn send(&mut self, bytes: &[u8]) -> Result<(), MidiError> {
        self.0.lock().unwrap().sent.push(bytes.to_vec());
        Ok(())
    }
}

#[test]
fn midi_input_reaches_the_studio_on_the_main_thread() {
    let dir = tempfile::tempdir().unwrap();
    let mut prefs = Preferences::default();
    prefs.midi_input = "Keys".into();
    prefs.midi_output = "Synth".into();
    prefs.save(dir.path());

    let mut event_loop = new_app(dir.path()).into_event_loop(Box::new(NullRenderer::default()));
    let invoker = event_loop.invoker();
    let driver = FakeDriver::default();
    event_loop.app_mut().start_midi(Box::new(driver.clone()), invoker);

    let deadline = Instant::now() + Duration::from_secs(5);
    while input_combo(&event_loop).and_then(|c| c.selected_item()).is_none() && Instant::now() < deadline {
        event_loop.run_once(Duration::from_millis(50));
    }
    assert_eq!(
        input_combo(&event_loop).map(|c| c.items()),
        Some(vec!["Keys".to_string()])
    );

    while driver.0.lock().unwrap().callback.is_none() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    if let Some(callback) = driver.0.lock().unwrap().callback.as_mut() {
        callback(&[0x90, 60, 100]);
    }
    while event_loop.app().top_view_controller().events().is_empty() && Instant::now() < deadline {
        event_loop.run_once(Duration::from_millis(50));
    }
    assert_eq!(event_loop.app().studio().borrow().sounding_notes(), vec![60]);
    assert_eq!(event_loop.app().top_view_controller().status_text(), "Stopped · C4");

    // the studio’s output goes back out through the hub thread
    event_loop.app().studio().borrow_mut().set_sustain(1.);
    while driver.0.lock().unwrap().sent.is_empty() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(driver.0.lock().unwrap().sent, vec![vec![0xb0, 0x40, 0x7f]]);

    event_loop.app_mut().shutdown();
}
