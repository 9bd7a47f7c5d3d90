//! User preferences, stored as `key=value` lines in `Preferences.ini`.
//!
//! There is no quoting: values can’t contain newlines, and everything after the first `=` is
//! the value. Missing keys keep their defaults; unknown keys and malformed lines are skipped.

use std::fs;
use std::path::{Path, PathBuf};

/// Overrides the data directory.
pub const DATA_PATH_VAR: &str = "MELOBASE_DATA_PATH";

const FILE_NAME: &str = "Preferences.ini";

#[derive(Debug, Clone, PartialEq)]
pub struct Preferences {
    pub midi_input: String,
    pub midi_output: String,
    /// 0 to 15.
    pub midi_channel: u8,
    pub is_metronome_on: bool,
    /// Count-in before recording, in measures.
    pub count_in: u32,
    /// Last window size; the top view’s content size when unset.
    pub window_size: Option<(f64, f64)>,
    pub last_folder: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Preferences {
            midi_input: String::new(),
            midi_output: String::new(),
            midi_channel: 0,
            is_metronome_on: false,
            count_in: 1,
            window_size: None,
            last_folder: String::new(),
        }
    }
}

/// The directory holding preferences and other user data.
pub fn data_path() -> PathBuf {
    if let Some(path) = std::env::var_os(DATA_PATH_VAR) {
        return PathBuf::from(path);
    }
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("MelobaseStation")
}

impl Preferences {
    pub fn path(data_path: &Path) -> PathBuf {
        data_path.join(FILE_NAME)
    }

    /// Loads the preferences in `data_path`, falling back to defaults.
    pub fn load(data_path: &Path) -> Preferences {
        let path = Self::path(data_path);
        let mut prefs = Preferences::default();
        match fs::read_to_string(&path) {
            Ok(contents) => prefs.apply(&contents),
            Err(err) => log::info!(target: "prefs", "using defaults ({}: {})", path.display(), err),
        }
        prefs
    }

    /// Applies every recognized line of a preferences file.
    pub fn apply(&mut self, contents: &str) {
        for (i, line) in contents.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            let mut parts = line.splitn(2, '=');
            let (key, value) = match (parts.next(), parts.next()) {
                (Some(key), Some(value)) => (key.trim(), value),
                _ => {
                    log::debug!(target: "prefs", "line {}: no '='", i + 1);
                    continue;
                }
            };
            if !self.set(key, value) {
                log::debug!(target: "prefs", "line {}: skipping {}={}", i + 1, key, value);
            }
        }
    }

    /// Sets one key. Returns false for unknown keys and unparseable values.
    fn set(&mut self, key: &str, value: &str) -> bool {
        match key {
            "midiInput" => self.midi_input = value.to_string(),
            "midiOutput" => self.midi_output = value.to_string(),
            "midiChannel" => match value.trim().parse::<u8>() {
                Ok(channel) if channel < 16 => self.midi_channel = channel,
                _ => return false,
            },
            "metronome" => match value.trim() {
                "1" | "true" => self.is_metronome_on = true,
                "0" | "false" => self.is_metronome_on = false,
                _ => return false,
            },
            "countIn" => match value.trim().parse() {
                Ok(measures) => self.count_in = measures,
                Err(_) => return false,
            },
            "windowSize" => match parse_size(value) {
                Some(size) => self.window_size = size,
                None => return false,
            },
            "lastFolder" => self.last_folder = value.to_string(),
            _ => return false,
        }
        true
    }

    /// Every key, in file order.
    pub fn to_file_contents(&self) -> String {
        let entries = [
            ("midiInput", self.midi_input.clone()),
            ("midiOutput", self.midi_output.clone()),
            ("midiChannel", self.midi_channel.to_string()),
            ("metronome", (self.is_metronome_on as u8).to_string()),
            ("countIn", self.count_in.to_string()),
            (
                "windowSize",
                self.window_size
                    .map(|(w, h)| format!("{}x{}", w, h))
                    .unwrap_or_default(),
            ),
            ("lastFolder", self.last_folder.clone()),
        ];
        let mut contents = String::new();
        for (key, value) in entries.iter() {
            contents.push_str(key);
            contents.push('=');
            contents.push_str(value);
            contents.push('\n');
        }
        contents
    }

    /// Writes every key to `data_path`, creating the directory if needed. Failures are logged.
    pub fn save(&self, data_path: &Path) {
        let path = Self::path(data_path);
        let result = fs::create_dir_all(data_path).and_then(|_| fs::write(&path, self.to_file_contents()));
        match result {
            Ok(()) => log::debug!(target: "prefs", "saved {}", path.display()),
            Err(err) => log::warn!(target: "prefs", "could not save {}: {}", path.display(), err),
        }
    }
}

/// `WIDTHxHEIGHT`, or empty for no size.
fn parse_size(value: &str) -> Option<Option<(f64, f64)>> {
    let value = value.trim();
    if value.is_empty() {
        return Some(None);
    }
    let mut parts = value.splitn(2, 'x');
    let width: f64 = parts.next()?.trim().parse().ok()?;
    let height: f64 = parts.next()?.trim().parse().ok()?;
    if width.is_finite() && height.is_finite() && width > 0. && height > 0. {
        Some(Some((width, height)))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Preferences::load(dir.path()), Preferences::default());
    }

    #[test]
    fn skips_unknown_and_malformed_lines() {
        let mut prefs = Preferences::default();
        prefs.apply("midiInput=Keys = USB\r\nfoo=bar\nnot a pair\nmidiChannel=42\nmetronome=1\n\nwindowSize=1024x768\n");
        assert_eq!(prefs.midi_input, "Keys = USB");
        assert_eq!(prefs.midi_channel, 0, "out of range");
        assert!(prefs.is_metronome_on);
        assert_eq!(prefs.window_size, Some((1024., 768.)));

        prefs.apply("windowSize=0x10\n");
        assert_eq!(prefs.window_size, Some((1024., 768.)), "rejected");
        prefs.apply("windowSize=\n");
        assert_eq!(prefs.window_size, None);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let data_path = dir.path().join("nested");
        let prefs = Preferences {
            midi_output: "Synth".into(),
            midi_channel: 9,
            count_in: 2,
            last_folder: "/tmp/songs".into(),
            ..Preferences::default()
        };
        prefs.save(&data_path);

        let contents = fs::read_to_string(Preferences::path(&data_path)).unwrap();
        assert!(contents.starts_with("midiInput=\nmidiOutput=Synth\nmidiChannel=9\n"));
        assert_eq!(Preferences::load(&data_path), prefs);
    }
}
