mod config;
mod utils;
mod app;

use std::env::var;
use std::io::stdin;
use dotenv::dotenv;
use eyre::eyre;
use log::{debug, info};
use sysinfo::System;
use lcdbang_gpio::{GpioDriver, GpioLine};
use lcdbang_gpio::delay::Delay;
use lcdbang_gpio::gpiod::GpiodDriver;
use lcdbang_gpio::lcd::hd44780::display::Display;
use lcdbang_gpio::lcd::hd44780::driver::{BusWidth, GpioHD44780Driver, LcdPins};
use lcdbang_gpio::raw::RawGpioDriver;
use lcdbang_gpio::sim::SimGpioDriver;
use crate::app::{App, Mode};
use crate::config::Config;
use crate::utils::{parse_pin_bus, PinSpec};

/// Wiring used by the simulation when the environment doesn't name any lines.
const SIM_PIN_E: &str = "0:10";
const SIM_PIN_RW: &str = "0:9";
const SIM_PIN_RS: &str = "0:8";
const SIM_PINS_DATA: &str = "1:7, 1:6, 1:5, 1:4";

#[derive(Debug)]
enum Backend {
    Raw(RawGpioDriver),
    Gpiod(GpiodDriver),
    Sim(SimGpioDriver),
}

impl Backend {
    fn open(kind: &str) -> eyre::Result<Self> {
        match kind.trim().to_ascii_lowercase().as_str() {
            "raw" => Ok(Backend::Raw(RawGpioDriver::new_gpiomem()?)),
            "gpiod" => {
                let chips = var("LCDBANG_GPIOD_CHIPS").unwrap_or_else(|_| "/dev/gpiochip0".to_string());
                let paths: Vec<&str> = chips
                    .split([',', ' ', ';'])
                    .map(|s| s.trim())
                    .filter(|s| !s.is_empty())
                    .collect();
                Ok(Backend::Gpiod(GpiodDriver::open(&paths)?))
            }
            "sim" => Ok(Backend::Sim(SimGpioDriver::stm32f411())),
            other => Err(eyre!("Unknown backend `{}`, expected raw, gpiod or sim", other)),
        }
    }

    fn gpio(&self) -> &dyn GpioDriver {
        match self {
            Backend::Raw(gpio) => gpio,
            Backend::Gpiod(gpio) => gpio,
            Backend::Sim(gpio) => gpio,
        }
    }

    /// The simulation journals its delays, real hardware spins.
    fn delay(&self, config: &Config) -> Box<dyn Delay + '_> {
        match self {
            Backend::Sim(sim) => Box::new(sim.delay()),
            _ => Box::new(config.pulse_delay.spin_delay()),
        }
    }

    fn is_sim(&self) -> bool {
        matches!(self, Backend::Sim(_))
    }
}

/// Reads a pin variable, falling back to the simulation wiring if there is one.
fn pin_var(name: &str, sim_default: Option<&str>) -> eyre::Result<String> {
    match (var(name), sim_default) {
        (Ok(value), _) => Ok(value),
        (Err(_), Some(default)) => {
            debug!("{} not set, using {}", name, default);
            Ok(default.to_string())
        }
        (Err(err), None) => Err(eyre!("{}: {}", name, err)),
    }
}

fn read_pins(backend: &Backend) -> eyre::Result<LcdPins> {
    let sim = backend.is_sim();
    let gpio = backend.gpio();
    let resolve = |name: &str, default: &str| -> eyre::Result<GpioLine> {
        let spec: PinSpec = pin_var(name, sim.then_some(default))?.parse()?;
        Ok(spec.resolve(gpio)?)
    };

    let e = resolve("LCDBANG_LCD_PIN_E", SIM_PIN_E)?;
    let rw = resolve("LCDBANG_LCD_PIN_RW", SIM_PIN_RW)?;
    let rs = resolve("LCDBANG_LCD_PIN_RS", SIM_PIN_RS)?;
    let data = parse_pin_bus(&pin_var("LCDBANG_LCD_PINS_DATA", sim.then_some(SIM_PINS_DATA))?)?
        .iter()
        .map(|spec| spec.resolve(gpio))
        .collect::<Result<Vec<_>, _>>()?;
    let width = if data.len() == 8 { BusWidth::Eight } else { BusWidth::Four };

    Ok(LcdPins { data, rs, rw, e, width })
}

fn main() -> eyre::Result<()> {
    // Initialize environment and logger
    dotenv().ok();
    pretty_env_logger::init();

    info!("lcdbang starting...");

    let mode: Mode = var("LCDBANG_MODE").ok().map(|mode| mode.parse()).transpose()?.unwrap_or_default();
    let clock_ticks: Option<u64> = var("LCDBANG_CLOCK_TICKS").ok().map(|ticks| ticks.parse()).transpose()?;

    debug!("Initializing GPIO backend...");
    let backend = Backend::open(&var("LCDBANG_BACKEND").unwrap_or_else(|_| "sim".to_string()))?;
    debug!("{:?} initialized.", backend);

    let pins = read_pins(&backend)?;
    info!("LCD @ E: {}, RW: {}, RS: {}, Data: {:?}", pins.e, pins.rw, pins.rs, pins.data);

    debug!("Trying to load config...");
    let config = if let Some(config) = Config::try_load() {
        info!("Config loaded.");
        config
    } else {
        info!("Config not found. Using default");
        let config = Config::default();
        config.save()?;
        info!("Default config saved.");
        config
    };
    debug!("{:?}", config);

    debug!("Initializing LCD driver...");
    let driver = GpioHD44780Driver::claim(backend.gpio(), &pins, backend.delay(&config))?;
    let mut display = Display::init(driver, config.panel.geometry())?;
    display.configure(&config.display_settings())?;
    info!("LCD initialized, running {:?} mode.", mode);

    let mut app = App::new(&config, &mut display);
    match mode {
        Mode::Banner => {
            let host_name = System::host_name().unwrap_or_else(|| "???".to_string());
            app.banner(&host_name)?;
        }
        Mode::Echo => {
            let lines = app.echo(stdin().lock())?;
            info!("Echoed {} lines.", lines);
        }
        Mode::Clock => app.clock(clock_ticks)?,
    }

    if let Backend::Sim(sim) = &backend {
        info!("Simulation journal holds {} events.", sim.journal().len());
    }

    Ok(())
}
