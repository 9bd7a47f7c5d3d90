//! MIDI port management on a background thread.
//!
//! The hub thread polls the driver’s port lists, opens the preferred input and output ports when
//! they appear and drops them when they vanish. Port list changes and decoded input are handed
//! to a sink, which the application points at the event loop’s invoker so they are handled on
//! the main thread. Outgoing messages are queued through a channel and sent by the hub thread.

use crate::midi::{MidiError, MidiMessage};
use crossbeam::channel::{self, RecvTimeoutError, Sender};
use midir::{MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// How often port lists are polled. Also bounds how long shutdown takes.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

const CLIENT_NAME: &str = "MelobaseStation";

/// Receives raw input bytes, on whatever thread the driver delivers them.
pub type InputCallback = Box<dyn FnMut(&[u8]) + Send>;

/// The platform MIDI API.
pub trait MidiDriver: Send {
    fn input_ports(&mut self) -> Vec<String>;
    fn output_ports(&mut self) -> Vec<String>;
    fn open_input(&mut self, name: &str, callback: InputCallback) -> Result<(), MidiError>;
    fn close_input(&mut self);
    fn open_output(&mut self, name: &str) -> Result<(), MidiError>;
    fn close_output(&mut self);
    fn send(&mut self, bytes: &[u8]) -> Result<(), MidiError>;
}

/// A [`MidiDriver`] backed by `midir`.
pub struct MidirDriver {
    input: Option<MidiInput>,
    output: Option<MidiOutput>,
    input_connection: Option<MidiInputConnection<()>>,
    output_connection: Option<MidiOutputConnection>,
}

impl MidirDriver {
    pub fn new() -> Result<MidirDriver, MidiError> {
        Ok(MidirDriver {
            input: Some(Self::new_input()?),
            output: Some(Self::new_output()?),
            input_connection: None,
            output_connection: None,
        })
    }

    fn new_input() -> Result<MidiInput, MidiError> {
        MidiInput::new(CLIENT_NAME).map_err(|err| MidiError::Init(err.to_string()))
    }

    fn new_output() -> Result<MidiOutput, MidiError> {
        MidiOutput::new(CLIENT_NAME).map_err(|err| MidiError::Init(err.to_string()))
    }
}

impl MidiDriver for MidirDriver {
    fn input_ports(&mut self) -> Vec<String> {
        match &self.input {
            Some(input) => input
                .ports()
                .iter()
                .filter_map(|port| input.port_name(port).ok())
                .collect(),
            None => Vec::new(),
        }
    }

    fn output_ports(&mut self) -> Vec<String> {
        match &self.output {
            Some(output) => output
                .ports()
                .iter()
                .filter_map(|port| output.port_name(port).ok())
                .collect(),
            None => Vec::new(),
        }
    }

    fn open_input(&mut self, name: &str, mut callback: InputCallback) -> Result<(), MidiError> {
        self.close_input();
        // connecting consumes the client; a fresh one keeps port listing working
        let input = Self::new_input()?;
        let port = input
            .ports()
            .into_iter()
            .find(|port| input.port_name(port).ok().as_deref() == Some(name))
            .ok_or_else(|| MidiError::PortNotFound(name.to_string()))?;
        let connection = input
            .connect(
                &port,
                "melobase-input",
                move |_timestamp, bytes, _| callback(bytes),
                (),
            )
            .map_err(|err| MidiError::Connect(name.to_string(), err.to_string()))?;
        self.input_connection = Some(connection);
        Ok(())
    }

    fn close_input(&mut self) {
        if let Some(connection) = self.input_connection.take() {
            connection.close();
        }
    }

    fn open_output(&mut self, name: &str) -> Result<(), MidiError> {
        self.close_output();
        let output = Self::new_output()?;
        let port = output
            .ports()
            .into_iter()
            .find(|port| output.port_name(port).ok().as_deref() == Some(name))
            .ok_or_else(|| MidiError::PortNotFound(name.to_string()))?;
        let connection = output
            .connect(&port, "melobase-output")
            .map_err(|err| MidiError::Connect(name.to_string(), err.to_string()))?;
        self.output_connection = Some(connection);
        Ok(())
    }

    fn close_output(&mut self) {
        if let Some(connection) = self.output_connection.take() {
            connection.close();
        }
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), MidiError> {
        match &mut self.output_connection {
            Some(connection) => connection
                .send(bytes)
                .map_err(|err| MidiError::Send(err.to_string())),
            None => Err(MidiError::Send("no output port open".to_string())),
        }
    }
}

/// What the hub reports to the application.
#[derive(Debug, Clone, PartialEq)]
pub enum HubEvent {
    /// The port lists changed.
    PortsChanged {
        inputs: Vec<String>,
        outputs: Vec<String>,
    },
    /// A decoded input message.
    Message(MidiMessage),
}

/// A snapshot of the hub’s state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HubStatus {
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub open_input: Option<String>,
    pub open_output: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct PreferredPorts {
    input: String,
    output: String,
}

enum Command {
    Send(Vec<u8>),
    /// Forces the next iteration to re-check connections.
    Refresh,
}

pub type HubSink = Arc<dyn Fn(HubEvent) + Send + Sync>;

/// Owns the hub thread. Dropping the hub stops and joins it.
pub struct MidiHub {
    commands: Sender<Command>,
    preferred: Arc<Mutex<PreferredPorts>>,
    status: Arc<Mutex<HubStatus>>,
    is_stopping: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl MidiHub {
    /// Starts the hub thread.
    pub fn start(
        driver: Box<dyn MidiDriver>,
        input: &str,
        output: &str,
        sink: impl Fn(HubEvent) + Send + Sync + 'static,
    ) -> MidiHub {
        Self::with_interval(driver, input, output, sink, POLL_INTERVAL)
    }

    pub fn with_interval(
        driver: Box<dyn MidiDriver>,
        input: &str,
        output: &str,
        sink: impl Fn(HubEvent) + Send + Sync + 'static,
        interval: Duration,
    ) -> MidiHub {
        let (commands, receiver) = channel::unbounded();
        let preferred = Arc::new(Mutex::new(PreferredPorts {
            input: input.to_string(),
            output: output.to_string(),
        }));
        let status = Arc::new(Mutex::new(HubStatus::default()));
        let is_stopping = Arc::new(AtomicBool::new(false));

        let mut worker = Worker {
            driver,
            sink: Arc::new(sink),
            preferred: Arc::clone(&preferred),
            status: Arc::clone(&status),
            ports: None,
        };
        let stop = Arc::clone(&is_stopping);
        let thread = thread::Builder::new()
            .name("midi-hub".to_string())
            .spawn(move || {
                log::info!(target: "midi", "hub thread started");
                let mut last_poll: Option<Instant> = None;
                while !stop.load(Ordering::Acquire) {
                    if last_poll.map_or(true, |t| t.elapsed() >= interval) {
                        worker.poll();
                        last_poll = Some(Instant::now());
                    }
                    match receiver.recv_timeout(interval) {
                        Ok(Command::Send(bytes)) => worker.send(&bytes),
                        Ok(Command::Refresh) => last_poll = None,
                        Err(RecvTimeoutError::Timeout) => (),
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                worker.shutdown();
                log::info!(target: "midi", "hub thread stopped");
            });

        let thread = match thread {
            Ok(thread) => Some(thread),
            Err(err) => {
                log::error!(target: "midi", "could not start hub thread: {}", err);
                None
            }
        };

        MidiHub {
            commands,
            preferred,
            status,
            is_stopping,
            thread,
        }
    }

    /// Queues a message for the open output port. Returns false if the hub thread is gone.
    pub fn send(&self, message: &MidiMessage) -> bool {
        self.command(Command::Send(message.encode()))
    }

    /// Changes the preferred input port; it is opened as soon as it exists.
    pub fn set_input(&self, name: &str) -> bool {
        self.preferred.lock().input = name.to_string();
        self.command(Command::Refresh)
    }

    pub fn set_output(&self, name: &str) -> bool {
        self.preferred.lock().output = name.to_string();
        self.command(Command::Refresh)
    }

    fn command(&self, command: Command) -> bool {
        match self.commands.send(command) {
            Ok(()) => true,
            Err(err) => {
                let what = match err.into_inner() {
                    Command::Send(_) => "message",
                    Command::Refresh => "port change",
                };
                log::warn!(target: "midi", "hub thread has stopped; dropping {}", what);
                false
            }
        }
    }

    pub fn status(&self) -> HubStatus {
        self.status.lock().clone()
    }
}

impl Drop for MidiHub {
    fn drop(&mut self) {
        self.is_stopping.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!(target: "midi", "hub thread panicked");
            }
        }
    }
}

/// State owned by the hub thread.
struct Worker {
    driver: Box<dyn MidiDriver>,
    sink: HubSink,
    preferred: Arc<Mutex<PreferredPorts>>,
    status: Arc<Mutex<HubStatus>>,
    /// Last reported port lists.
    ports: Option<(Vec<String>, Vec<String>)>,
}

impl Worker {
    fn poll(&mut self) {
        let inputs = self.driver.input_ports();
        let outputs = self.driver.output_ports();
        let preferred = self.preferred.lock().clone();

        let (open_input, open_output) = {
            let status = self.status.lock();
            (status.open_input.clone(), status.open_output.clone())
        };

        let open_input = self.reconcile_input(open_input, &preferred.input, &inputs);
        let open_output = self.reconcile_output(open_output, &preferred.output, &outputs);

        {
            let mut status = self.status.lock();
            status.inputs = inputs.clone();
            status.outputs = outputs.clone();
            status.open_input = open_input;
            status.open_output = open_output;
        }

        let ports = Some((inputs, outputs));
        if ports != self.ports {
            self.ports = ports.clone();
            if let Some((inputs, outputs)) = ports {
                log::debug!(target: "midi", "ports changed: in {:?}, out {:?}", inputs, outputs);
                (self.sink)(HubEvent::PortsChanged { inputs, outputs });
            }
        }
    }

    fn reconcile_input(&mut self, open: Option<String>, preferred: &str, ports: &[String]) -> Option<String> {
        let wanted = Some(preferred).filter(|name| ports.iter().any(|p| p == name));
        if open.as_deref() == wanted {
            return open;
        }
        if open.is_some() {
            log::info!(target: "midi", "closing input {:?}", open);
            self.driver.close_input();
        }
        let name = wanted?;
        let sink = Arc::clone(&self.sink);
        let callback: InputCallback = Box::new(move |bytes: &[u8]| {
            if let Some(message) = MidiMessage::decode(bytes) {
                sink(HubEvent::Message(message));
            }
        });
        match self.driver.open_input(name, callback) {
            Ok(()) => {
                log::info!(target: "midi", "opened input {:?}", name);
                Some(name.to_string())
            }
            Err(err) => {
                log::warn!(target: "midi", "{}", err);
                None
            }
        }
    }

    fn reconcile_output(&mut self, open: Option<String>, preferred: &str, ports: &[String]) -> Option<String> {
        let wanted = Some(preferred).filter(|name| ports.iter().any(|p| p == name));
        if open.as_deref() == wanted {
            return open;
        }
        if open.is_some() {
            log::info!(target: "midi", "closing output {:?}", open);
            self.driver.close_output();
        }
        let name = wanted?;
        match self.driver.open_output(name) {
            Ok(()) => {
                log::info!(target: "midi", "opened output {:?}", name);
                Some(name.to_string())
            }
            Err(err) => {
                log::warn!(target: "midi", "{}", err);
                None
            }
        }
    }

    fn send(&mut self, bytes: &[u8]) {
        if self.status.lock().open_output.is_none() {
            log::trace!(target: "midi", "dropping {:02x?}: no output", bytes);
            return;
        }
        if let Err(err) = self.driver.send(bytes) {
            log::warn!(target: "midi", "{}", err);
        }
    }

    fn shutdown(&mut self) {
        self.driver.close_input();
        self.driver.close_output();
        let mut status = self.status.lock();
        status.open_input = None;
        status.open_output = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam::channel::Receiver;

    #[derive(Default)]
    struct FakePorts {
        inputs: Vec<String>,
        outputs: Vec<String>,
        callback: Option<InputCallback>,
        open_output: Option<String>,
        sent: Vec<Vec<u8>>,
    }

    #[derive(Clone, Default)]
    struct FakeDriver(Arc<Mutex<FakePorts>>);

    impl MidiDriver for FakeDriver {
        fn input_ports(&mut self) -> Vec<String> {
            self.0.lock().inputs.clone()
        }

        fn output_ports(&mut self) -> Vec<String> {
            self.0.lock().outputs.clone()
        }

        fn open_input(&mut self, name: &str, callback: InputCallback) -> Result<(), MidiError> {
            let mut ports = self.0.lock();
            if !ports.inputs.iter().any(|p| p == name) {
                return Err(MidiError::PortNotFound(name.to_string()));
            }
            ports.callback = Some(callback);
            Ok(())
        }

        fn close_input(&mut self) {
            self.0.lock().callback = None;
        }

        fn open_output(&mut self, name: &str) -> Result<(), MidiError> {
            self.0.lock().open_output = Some(name.to_string());
            Ok(())
        }

        fn close_output(&mut self) {
            self.0.lock().open_output = None;
        }

        fn send(&mut self, bytes: &[u8]) -> Result<(), MidiError> {
            self.0.lock().sent.push(bytes.to_vec());
            Ok(())
        }
    }

    const INTERVAL: Duration = Duration::from_millis(10);
    const WAIT: Duration = Duration::from_secs(5);

    fn start(driver: &FakeDriver, input: &str, output: &str) -> (MidiHub, Receiver<HubEvent>) {
        let (sender, receiver) = channel::unbounded();
        let hub = MidiHub::with_interval(
            Box::new(driver.clone()),
            input,
            output,
            move |event| {
                let _ = sender.send(event);
            },
            INTERVAL,
        );
        (hub, receiver)
    }

    fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < WAIT {
            if condition() {
                return true;
            }
            thread::sleep(INTERVAL);
        }
        false
    }

    #[test]
    fn opens_preferred_ports_when_they_appear() {
        let driver = FakeDriver::default();
        driver.0.lock().outputs = vec!["Synth".into()];
        let (hub, events) = start(&driver, "Keys", "Synth");

        assert_eq!(
            events.recv_timeout(WAIT),
            Ok(HubEvent::PortsChanged {
                inputs: vec![],
                outputs: vec!["Synth".into()]
            })
        );
        assert!(wait_for(|| hub.status().open_output.is_some()));
        assert_eq!(hub.status().open_input, None);

        driver.0.lock().inputs = vec!["Keys".into(), "Pads".into()];
        assert!(wait_for(|| hub.status().open_input.as_deref() == Some("Keys")));

        // input arrives on the driver’s thread
        let mut callback = driver.0.lock().callback.take();
        if let Some(callback) = &mut callback {
            callback(&[0x90, 64, 127]);
            callback(&[0xf8]);
        }
        let message = (0..10)
            .filter_map(|_| events.recv_timeout(WAIT).ok())
            .find(|event| matches!(event, HubEvent::Message(_)));
        assert_eq!(
            message,
            Some(HubEvent::Message(MidiMessage::NoteOn {
                channel: 0,
                note: 64,
                velocity: 1.
            }))
        );
    }

    #[test]
    fn closes_vanished_ports_and_sends_output() {
        let driver = FakeDriver::default();
        {
            let mut ports = driver.0.lock();
            ports.inputs = vec!["Keys".into()];
            ports.outputs = vec!["Synth".into()];
        }
        let (hub, _events) = start(&driver, "Keys", "Synth");
        assert!(wait_for(|| hub.status().open_output.is_some()));

        hub.send(&MidiMessage::Sustain { channel: 0, value: 1. });
        assert!(wait_for(|| !driver.0.lock().sent.is_empty()));
        assert_eq!(driver.0.lock().sent, vec![vec![0xb0, 0x40, 0x7f]]);

        driver.0.lock().outputs.clear();
        assert!(wait_for(|| hub.status().open_output.is_none()));
        assert_eq!(driver.0.lock().open_output, None);

        hub.set_input("Pads");
        assert!(wait_for(|| hub.status().open_input.is_none()));
    }

    #[test]
    fn commands_fail_once_the_thread_has_stopped() {
        let driver = FakeDriver::default();
        let (mut hub, _events) = start(&driver, "", "");
        assert!(hub.set_input("Keys"));

        hub.is_stopping.store(true, Ordering::Release);
        if let Some(thread) = hub.thread.take() {
            thread.join().unwrap();
        }
        assert!(!hub.send(&MidiMessage::Sustain { channel: 0, value: 1. }));
        assert!(!hub.set_output("Synth"));
        assert!(driver.0.lock().sent.is_empty());
    }

    #[test]
    fn drop_joins_the_thread() {
        let driver = FakeDriver::default();
        driver.0.lock().outputs = vec!["Synth".into()];
        let (hub, _events) = start(&driver, "", "Synth");
        assert!(wait_for(|| driver.0.lock().open_output.is_some()));
        drop(hub);
        assert_eq!(driver.0.lock().open_output, None, "ports are closed on shutdown");
    }
}
