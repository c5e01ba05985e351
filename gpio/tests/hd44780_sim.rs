use lcdbang_gpio::lcd::hd44780::display::Display;
use lcdbang_gpio::lcd::hd44780::driver::{BusWidth, GpioHD44780Driver, HD44780Driver, LcdPins};
use lcdbang_gpio::lcd::hd44780::geometry::Geometry;
use lcdbang_gpio::sim::{SimEvent, SimGpioDriver};
use lcdbang_gpio::GpioLine;

// Port A: RS, RW, E. Port B: D7..D0 on bits 7..0.
const RS: GpioLine = GpioLine::new(0, 8);
const RW: GpioLine = GpioLine::new(0, 9);
const E: GpioLine = GpioLine::new(0, 10);

fn data_lines(width: BusWidth) -> Vec<GpioLine> {
    (0..width.line_count() as u8).map(|i| GpioLine::new(1, 7 - i)).collect()
}

fn pins(width: BusWidth) -> LcdPins {
    LcdPins {
        data: data_lines(width),
        rs: RS,
        rw: RW,
        e: E,
        width,
    }
}

fn observed_lines(width: BusWidth) -> Vec<GpioLine> {
    let mut lines = vec![RS, RW];
    lines.extend(data_lines(width));
    lines
}

/// Turns latched samples back into `(rs, value)` pairs, joining nibbles on a 4-line bus.
fn decode(width: BusWidth, latches: &[Vec<bool>]) -> Vec<(bool, u8)> {
    let value = |bits: &[bool]| bits.iter().fold(0u8, |acc, &bit| (acc << 1) | bit as u8);
    match width {
        BusWidth::Eight => latches.iter().map(|l| (l[0], value(&l[2..]))).collect(),
        BusWidth::Four => latches
            .chunks(2)
            .map(|pair| {
                assert_eq!(pair[0][0], pair[1][0], "RS changed between nibbles");
                (pair[0][0], (value(&pair[0][2..]) << 4) | value(&pair[1][2..]))
            })
            .collect(),
    }
}

#[test]
fn four_bit_startup_sequence() {
    let sim = SimGpioDriver::stm32f411();
    let mark = sim.mark();

    let driver = GpioHD44780Driver::claim(&sim, &pins(BusWidth::Four), sim.delay()).unwrap();
    let display = Display::init(driver, Geometry::LCD1602).unwrap();

    let latches = sim.latches_since(mark, E, &observed_lines(BusWidth::Four));
    // 3 reset pulses, 1 mode switch, 2 for the clear instruction, nothing else
    assert_eq!(latches.len(), 6);
    let reset = vec![false, false, false, false, true, true];
    assert_eq!(&latches[..3], &[reset.clone(), reset.clone(), reset]);
    assert_eq!(latches[3], vec![false, false, false, false, true, false]);
    assert_eq!(decode(BusWidth::Four, &latches[4..]), vec![(false, 0x01)]);

    // Clocks and line configuration happen before the first pulse
    let journal = sim.journal();
    let first_pulse = journal.iter().position(|e| *e == SimEvent::Set(E)).unwrap();
    assert!(journal[..first_pulse].contains(&SimEvent::ClockEnabled(0)));
    assert!(journal[..first_pulse].contains(&SimEvent::ClockEnabled(1)));
    assert!(journal[..first_pulse].contains(&SimEvent::ConfiguredOutput(E)));

    assert_eq!(display.cursor(), (0, 0));
}

#[test]
fn eight_bit_startup_sequence() {
    let sim = SimGpioDriver::new(2, 16);
    let mark = sim.mark();

    let driver = GpioHD44780Driver::claim(&sim, &pins(BusWidth::Eight), sim.delay()).unwrap();
    Display::init(driver, Geometry::LCD1602).unwrap();

    let latches = sim.latches_since(mark, E, &observed_lines(BusWidth::Eight));
    assert_eq!(latches.len(), 4);
    for latch in &latches[..3] {
        // RS, RW, then D7..D4 = 0011; D3..D0 untouched
        assert_eq!(&latch[..6], &[false, false, false, false, true, true]);
    }
    assert_eq!(decode(BusWidth::Eight, &latches[3..]), vec![(false, 0x01)]);
}

#[test]
fn transmit_framing() {
    for (width, pulses) in [(BusWidth::Four, 2), (BusWidth::Eight, 1)] {
        let sim = SimGpioDriver::new(2, 16);
        let mut driver = GpioHD44780Driver::claim(&sim, &pins(width), sim.delay()).unwrap();
        let mark = sim.mark();

        driver.send_data(0xA5).unwrap();

        let latches = sim.latches_since(mark, E, &observed_lines(width));
        assert_eq!(latches.len(), pulses);
        assert_eq!(decode(width, &latches), vec![(true, 0xA5)]);
        if width == BusWidth::Four {
            assert_eq!(&latches[0][2..], &[true, false, true, false]);
            assert_eq!(&latches[1][2..], &[false, true, false, true]);
        }
    }
}

#[test]
fn session_traffic() {
    let sim = SimGpioDriver::stm32f411();
    let driver = GpioHD44780Driver::claim(&sim, &pins(BusWidth::Four), sim.delay()).unwrap();
    let mut display = Display::init(driver, Geometry::LCD1602).unwrap();
    let mark = sim.mark();

    display.set_cursor(1, 5).unwrap();
    display.write_str("ok").unwrap();
    display.backspace().unwrap();

    let latches = sim.latches_since(mark, E, &observed_lines(BusWidth::Four));
    assert_eq!(
        decode(BusWidth::Four, &latches),
        vec![(false, 0xC5), (true, b'o'), (true, b'k'), (true, b' '), (false, 0xC4)]
    );
    assert_eq!(display.cursor(), (1, 4));

    // RW never goes high
    assert!(!sim.journal().contains(&SimEvent::Set(RW)));
}

#[test]
fn lines_are_released_with_the_display() {
    let sim = SimGpioDriver::new(2, 16);
    {
        let driver = GpioHD44780Driver::claim(&sim, &pins(BusWidth::Four), sim.delay()).unwrap();
        let _display = Display::init(driver, Geometry::LCD1602).unwrap();
        assert!(sim.is_output(E).unwrap());
    }
    assert!(!sim.is_output(E).unwrap());
    assert!(GpioHD44780Driver::claim(&sim, &pins(BusWidth::Four), sim.delay()).is_ok());
}
