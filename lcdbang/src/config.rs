use std::env::var_os;
use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;
use lcdbang_gpio::delay::SpinDelay;
use lcdbang_gpio::lcd::hd44780::display::DisplaySettings;
use lcdbang_gpio::lcd::hd44780::geometry::Geometry;
use serde::{Deserialize, Serialize};

/// Which panel is attached.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, Default, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Panel {
    Lcd0802,
    #[default]
    Lcd1602,
    Lcd2004,
}

impl Panel {
    pub fn geometry(&self) -> Geometry {
        match self {
            Panel::Lcd0802 => Geometry::LCD0802,
            Panel::Lcd1602 => Geometry::LCD1602,
            Panel::Lcd2004 => Geometry::LCD2004,
        }
    }
}

/// How long the enable pulse and settle periods last.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum PulseDelay {
    /// A fixed spin count.
    Iterations(u32),
    /// Measure the host at startup and spin at least this many microseconds.
    CalibrateMicros(u64),
}

impl PulseDelay {
    pub fn spin_delay(&self) -> SpinDelay {
        match *self {
            PulseDelay::Iterations(iterations) => SpinDelay::new(iterations),
            PulseDelay::CalibrateMicros(micros) => SpinDelay::calibrate(Duration::from_micros(micros)),
        }
    }
}

impl Default for PulseDelay {
    fn default() -> Self {
        // Comfortably above the 37 us most instructions need
        PulseDelay::CalibrateMicros(50)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub panel: Panel,
    pub pulse_delay: PulseDelay,
    pub two_lines: bool,
    pub cursor_visible: bool,
    pub cursor_blink: bool,
    /// Refresh period of the clock mode.
    pub clock_interval_ms: u64,
}

impl Config {
    fn path() -> String {
        let config_str = var_os("CONFIG_FILE");
        let config_str: &OsStr = config_str.as_deref().unwrap_or(OsStr::new("config.json"));
        config_str.to_string_lossy().into_owned()
    }

    pub fn try_load() -> Option<Self> {
        let config_str = Self::path();
        let config_path = Path::new(&config_str);
        if config_path.exists() {
            let file = std::fs::File::open(config_path).ok()?;
            let reader = std::io::BufReader::new(file);
            serde_json::from_reader(reader).ok()
        } else {
            None
        }
    }

    pub fn save(&self) -> std::io::Result<()> {
        let config_str = Self::path();
        let config_path = Path::new(&config_str);
        let file = std::fs::File::create(config_path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn display_settings(&self) -> DisplaySettings {
        DisplaySettings {
            two_lines: self.two_lines,
            cursor_visible: self.cursor_visible,
            cursor_blink: self.cursor_blink,
            ..DisplaySettings::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            panel: Panel::default(),
            pulse_delay: PulseDelay::default(),
            two_lines: true,
            cursor_visible: false,
            cursor_blink: false,
            clock_interval_ms: 1000,
        }
    }
}
