use melobase_station::app::{self, MelobaseApp};
use melobase_station::midi_hub::MidirDriver;
use melobase_station::preferences;
use melobase_station::terminal::TerminalInputThread;
use mdstudio::{NullRenderer, Rect};
use std::io::{self, IsTerminal};
use std::process;

fn main() {
    env_logger::init();

    let data_path = preferences::data_path();
    log::info!("data path: {}", data_path.display());

    let top_view = app::resource_path().join("TopView.lua");
    let app = match MelobaseApp::new(&data_path, &top_view) {
        Ok(app) => app,
        Err(err) => {
            log::error!("could not load {}: {}", top_view.display(), err);
            process::exit(1);
        }
    };

    // headless: frames are counted and dropped
    let mut event_loop = app.into_event_loop(Box::new(NullRenderer::default()));
    let invoker = event_loop.invoker();
    match MidirDriver::new() {
        Ok(driver) => event_loop.app_mut().start_midi(Box::new(driver), invoker.clone()),
        Err(err) => log::error!(target: "midi", "{}; running without MIDI", err),
    }

    let window = event_loop.app().window().id();
    let terminal = if io::stdin().is_terminal() {
        let started = TerminalInputThread::start(window, invoker, |invoker, size| {
            invoker.invoke(move |app: &mut MelobaseApp| {
                app.window().set_frame(Rect::from_xywh(0., 0., size.x, size.y));
            });
        });
        match started {
            Ok(terminal) => Some(terminal),
            Err(err) => {
                log::error!(target: "terminal", "{}; running without input", err);
                None
            }
        }
    } else {
        log::warn!(target: "terminal", "stdin is not a terminal; running without input");
        None
    };

    event_loop.run();
    drop(terminal);
    event_loop.app_mut().shutdown();
}
