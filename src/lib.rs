//! This Rust `embedded-hal`-based library is a simple way to control a [HD44780](https://en.wikipedia.org/wiki/Hitachi_HD44780_LCD_controller)
//! compatible character display that is wired directly to GPIO pins and driven in 4-bit bus mode, in an embedded,
//! `no_std` environment. No port expander or adapter board sits between the microcontroller and the display: the
//! four data lines `DB4`-`DB7` plus the `RS` and `E` control lines are bit-banged one GPIO write at a time.
//!
//! Because every board family exposes its GPIO block differently, the driver does not talk to pins itself. It is
//! generic over a small [`PinInterface`] capability supplying three primitives: configure a pin as an output, drive
//! a pin level, and busy-wait a number of microseconds. One driver body serves every target; each target contributes
//! only its pin primitives. The [`CallbackPins`] adapter builds a `PinInterface` out of two closures and any
//! `embedded-hal` 1.0 [`DelayNs`](embedded_hal::delay::DelayNs) implementation, which covers most boards without
//! writing a trait impl by hand.
//!
//! Key features include:
//! - Convenient high-level API for controlling the display
//! - Logical multi-line addressing: 4-line panels are folded onto the controller's two native DDRAM rows
//! - `core::fmt::Write` implementation for easy use with the `write!` macro
//! - Compatible with the `embedded-hal` traits v1.0 and later
//! - Multiple driver instances may share the data and `RS` lines as long as each display has its own `E` line
//! - Optional support for the `defmt` and `ufmt` logging frameworks
//!
//! ## Usage
//! Add this to your `Cargo.toml`:
//! ```toml
//! [dependencies]
//! gpio-character-display = { version = "0.1", features = ["defmt"] }
//! ```
//! The `features = ["defmt"]` line is optional and enables the `defmt` feature, which allows the library's errors
//! to be used with the `defmt` logging framework. Another optional feature is `features = ["ufmt"]`, which enables
//! the `ufmt` feature, allowing the `uwriteln!` and `uwrite!` macros to be used.
//!
//! Then wire the driver to your board's GPIO primitives:
//! ```rust
//! use gpio_character_display::{CallbackPins, CharacterDisplay, DisplayGeometry, PinAssignment};
//!
//! // board setup
//! let delay = ...; // DelayNs implementation from your HAL
//!
//! let pins = CallbackPins::new(
//!     |pin| board_gpio_set_output(pin),
//!     |pin, level| board_gpio_write(pin, level),
//!     delay,
//! );
//! let mut lcd = CharacterDisplay::new(
//!     pins,
//!     PinAssignment::new(4, 5, 6, 7, 8, 9),
//!     DisplayGeometry::new(16, 2),
//! );
//! ```
//! Initialize the display:
//! ```rust
//! if let Err(e) = lcd.begin() {
//!     panic!("Error initializing LCD: {}", e);
//! }
//! ```
//! Use the display:
//! ```rust
//! // set up the display
//! lcd.clear()?.home()?;
//! // print a message
//! lcd.print("Hello, world!")?;
//! // can also use the `core::fmt::write!` macro
//! use core::fmt::Write;
//!
//! write!(lcd, "Hello, world!")?;
//! ```
//! The various methods for controlling the LCD are also available. Each returns a `Result` that wraps the display
//! object in `Ok()`, allowing for easy chaining of commands. For example:
//! ```rust
//! lcd.clear()?.set_cursor(0, 1)?.print("Hello, world!")?;
//! ```
//! ### Reconfiguration
//! [`CharacterDisplay::reset_pinout`] and [`CharacterDisplay::reset_display_size`] replace the pin mapping or the
//! display geometry of an existing driver. Either call drops the driver back to
//! [`DisplayStatus::Uninitialized`]; `begin` must be run again before issuing display operations, so stale pin or
//! geometry settings can never reach the hardware.
//!
//! ### Multi-line addressing
//! The HD44780 natively addresses two DDRAM rows. For displays configured with more than two lines, odd logical
//! rows fold onto native row 1 and even rows onto native row 0, with the extra rows appended after the visible
//! column span. This matches panels whose DDRAM rows are laid out contiguously; panels that reserve a fixed
//! 40-byte span per native row regardless of visible width would need a per-model offset table, which this
//! driver does not provide.
//!
#![no_std]
#![allow(non_upper_case_globals)]

use core::fmt::Display;

mod driver;
mod interface;

pub use driver::CharacterDisplay;
pub use interface::{CallbackPins, PinInterface};

// commands
pub(crate) const LCD_CMD_CLEARDISPLAY: u8 = 0x01; //  Clear display, set cursor position to zero
pub(crate) const LCD_CMD_RETURNHOME: u8 = 0x02; //  Set cursor position to zero
pub(crate) const LCD_CMD_DISPLAYCONTROL: u8 = 0x08; //  Controls the display; does stuff like turning it off and on
pub(crate) const LCD_CMD_CURSORSHIFT: u8 = 0x10; //  Lets you move the cursor
pub(crate) const LCD_CMD_FUNCTIONSET: u8 = 0x20; //  Used to send the function to set to the display
pub(crate) const LCD_CMD_SETDDRAMADDR: u8 = 0x80; //  Used to set the DDRAM (Display Data RAM)

// flags for display on/off control
pub(crate) const LCD_FLAG_DISPLAYON: u8 = 0x04; //  Turns the display on
pub(crate) const LCD_FLAG_DISPLAYOFF: u8 = 0x00; //  Turns the display off
pub(crate) const LCD_FLAG_CURSORON: u8 = 0x02; //  Turns the cursor on
pub(crate) const LCD_FLAG_CURSOROFF: u8 = 0x00; //  Turns the cursor off
pub(crate) const LCD_FLAG_BLINKON: u8 = 0x01; //  Turns on the blinking cursor
pub(crate) const LCD_FLAG_BLINKOFF: u8 = 0x00; //  Turns off the blinking cursor

// flags for display/cursor shift
pub(crate) const LCD_FLAG_CURSORMOVE: u8 = 0x00; //  Flag for moving the cursor
pub(crate) const LCD_FLAG_MOVERIGHT: u8 = 0x04; //  Flag for moving right

// flags for function set
pub(crate) const LCD_FLAG_4BITMODE: u8 = 0x00; //  LCD 4 bit mode
pub(crate) const LCD_FLAG_2LINE: u8 = 0x08; //  LCD 2 line mode
pub(crate) const LCD_FLAG_5x8_DOTS: u8 = 0x00; //  8 pixel high font mode

// DDRAM address of the controller's second native row
pub(crate) const LCD_DDRAM_ROW1_OFFSET: u8 = 0x40;

/// Pin identifier value reserved to mean "no pin assigned". A configuration containing it fails validation.
pub const UNASSIGNED_PIN: u8 = 0xFF;

#[derive(Debug, PartialEq, Copy, Clone)]
/// Errors that can occur when using the character display driver
pub enum CharacterDisplayError {
    /// A pin is set to [`UNASSIGNED_PIN`] or the geometry has a zero field
    InvalidConfiguration,
    /// Operation issued before a successful `begin`
    NotInitialized,
    /// Row is out of range
    RowOutOfRange,
    /// Column is out of range
    ColumnOutOfRange,
    /// Formatting error
    FormattingError(core::fmt::Error),
}

impl From<core::fmt::Error> for CharacterDisplayError {
    fn from(err: core::fmt::Error) -> Self {
        CharacterDisplayError::FormattingError(err)
    }
}

impl From<&CharacterDisplayError> for &'static str {
    fn from(err: &CharacterDisplayError) -> Self {
        match err {
            CharacterDisplayError::InvalidConfiguration => "Invalid configuration",
            CharacterDisplayError::NotInitialized => "Display not initialized",
            CharacterDisplayError::RowOutOfRange => "Row out of range",
            CharacterDisplayError::ColumnOutOfRange => "Column out of range",
            CharacterDisplayError::FormattingError(_) => "Formatting error",
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for CharacterDisplayError {
    fn format(&self, fmt: defmt::Formatter) {
        let msg: &'static str = From::from(self);
        defmt::write!(fmt, "{}", msg);
    }
}

#[cfg(feature = "ufmt")]
impl ufmt::uDisplay for CharacterDisplayError {
    fn fmt<W>(&self, w: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        let msg: &'static str = From::from(self);
        ufmt::uwrite!(w, "{}", msg)
    }
}

impl Display for CharacterDisplayError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg: &'static str = From::from(self);
        write!(f, "{}", msg)
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
/// Lifecycle state of a [`CharacterDisplay`] instance.
pub enum DisplayStatus {
    /// Configuration validation failed during `begin`
    Error,
    /// Constructed or reconfigured, `begin` not yet run
    Uninitialized,
    /// `begin` completed; display operations are accepted
    Initialized,
}

impl From<&DisplayStatus> for &'static str {
    fn from(status: &DisplayStatus) -> Self {
        match status {
            DisplayStatus::Error => "error",
            DisplayStatus::Uninitialized => "uninitialized",
            DisplayStatus::Initialized => "initialized",
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for DisplayStatus {
    fn format(&self, fmt: defmt::Formatter) {
        let msg: &'static str = From::from(self);
        defmt::write!(fmt, "{}", msg);
    }
}

#[cfg(feature = "ufmt")]
impl ufmt::uDisplay for DisplayStatus {
    fn fmt<W>(&self, w: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        let msg: &'static str = From::from(self);
        ufmt::uwrite!(w, "{}", msg)
    }
}

impl Display for DisplayStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg: &'static str = From::from(self);
        write!(f, "{}", msg)
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
/// Display power and cursor visibility modes, mapping onto the HD44780 display control command.
pub enum DisplayMode {
    /// Display off
    DisplayOff,
    /// Display on, cursor hidden
    DisplayOnCursorOff,
    /// Display on, cursor shown as an underscore
    DisplayOnCursorOn,
    /// Display on, cursor shown as a blinking block
    DisplayOnCursorBlink,
}

impl DisplayMode {
    pub(crate) fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(DisplayMode::DisplayOff),
            1 => Some(DisplayMode::DisplayOnCursorOff),
            2 => Some(DisplayMode::DisplayOnCursorOn),
            3 => Some(DisplayMode::DisplayOnCursorBlink),
            _ => None,
        }
    }

    pub(crate) const fn command_byte(&self) -> u8 {
        match self {
            DisplayMode::DisplayOff => LCD_CMD_DISPLAYCONTROL | LCD_FLAG_DISPLAYOFF,
            DisplayMode::DisplayOnCursorOff => {
                LCD_CMD_DISPLAYCONTROL | LCD_FLAG_DISPLAYON | LCD_FLAG_CURSOROFF | LCD_FLAG_BLINKOFF
            }
            DisplayMode::DisplayOnCursorOn => {
                LCD_CMD_DISPLAYCONTROL | LCD_FLAG_DISPLAYON | LCD_FLAG_CURSORON | LCD_FLAG_BLINKOFF
            }
            DisplayMode::DisplayOnCursorBlink => {
                LCD_CMD_DISPLAYCONTROL | LCD_FLAG_DISPLAYON | LCD_FLAG_CURSORON | LCD_FLAG_BLINKON
            }
        }
    }
}

impl From<&DisplayMode> for &'static str {
    fn from(mode: &DisplayMode) -> Self {
        match mode {
            DisplayMode::DisplayOff => "display off",
            DisplayMode::DisplayOnCursorOff => "display on, cursor off",
            DisplayMode::DisplayOnCursorOn => "display on, cursor on",
            DisplayMode::DisplayOnCursorBlink => "display on, cursor blink",
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for DisplayMode {
    fn format(&self, fmt: defmt::Formatter) {
        let msg: &'static str = From::from(self);
        defmt::write!(fmt, "{}", msg);
    }
}

#[cfg(feature = "ufmt")]
impl ufmt::uDisplay for DisplayMode {
    fn fmt<W>(&self, w: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        let msg: &'static str = From::from(self);
        ufmt::uwrite!(w, "{}", msg)
    }
}

impl Display for DisplayMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg: &'static str = From::from(self);
        write!(f, "{}", msg)
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
/// GPIO pin identifiers for the six display lines. Data lines are listed least to most significant.
pub struct PinAssignment {
    /// Data bus bit 4
    pub db4: u8,
    /// Data bus bit 5
    pub db5: u8,
    /// Data bus bit 6
    pub db6: u8,
    /// Data bus bit 7
    pub db7: u8,
    /// Register select: low = command register, high = data register
    pub rs: u8,
    /// Enable strobe
    pub e: u8,
}

impl PinAssignment {
    /// Create a pin assignment from the six GPIO pin identifiers.
    pub const fn new(db4: u8, db5: u8, db6: u8, db7: u8, rs: u8, e: u8) -> Self {
        Self {
            db4,
            db5,
            db6,
            db7,
            rs,
            e,
        }
    }

    /// A pin assignment is usable only if no line carries the [`UNASSIGNED_PIN`] sentinel.
    pub(crate) fn is_valid(&self) -> bool {
        self.db4 != UNASSIGNED_PIN
            && self.db5 != UNASSIGNED_PIN
            && self.db6 != UNASSIGNED_PIN
            && self.db7 != UNASSIGNED_PIN
            && self.rs != UNASSIGNED_PIN
            && self.e != UNASSIGNED_PIN
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
/// Logical text grid of the display: characters per line and number of lines.
///
/// The line count may exceed the controller's two native rows; see the crate documentation for
/// how extra lines are folded onto the native DDRAM rows.
pub struct DisplayGeometry {
    /// Characters per line, must be non-zero
    pub chars_per_line: u8,
    /// Number of lines, must be non-zero
    pub lines: u8,
}

impl DisplayGeometry {
    /// Create a display geometry from characters per line and line count.
    pub const fn new(chars_per_line: u8, lines: u8) -> Self {
        Self {
            chars_per_line,
            lines,
        }
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.chars_per_line != 0 && self.lines != 0
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
/// Bus settle timing, fixed at construction. The defaults are conservative worst-case waits;
/// the controller is never polled for its busy flag, so every command gets the full settle time.
pub struct BusTiming {
    /// Settle delay around enable strobe edges, in microseconds
    pub en_delay_us: u32,
    /// Wait after a completed command for the controller's internal processing, in microseconds
    pub cmd_delay_us: u32,
}

impl BusTiming {
    /// Default enable strobe settle delay
    pub const DEFAULT_EN_DELAY_US: u32 = 1;
    /// Default command completion delay
    pub const DEFAULT_CMD_DELAY_US: u32 = 1024;
}

impl Default for BusTiming {
    fn default() -> Self {
        Self {
            en_delay_us: Self::DEFAULT_EN_DELAY_US,
            cmd_delay_us: Self::DEFAULT_CMD_DELAY_US,
        }
    }
}

#[cfg(test)]
mod lib_tests {
    extern crate std;
    use super::*;
    use crate::interface::recorder::RecordingPins;

    const PINS: PinAssignment = PinAssignment::new(4, 5, 6, 7, 8, 9);

    #[test]
    fn test_begin_controller_init_sequence() {
        let mut lcd =
            CharacterDisplay::new(RecordingPins::new(), PINS, DisplayGeometry::new(16, 2));
        assert!(lcd.begin().is_ok());
        assert_eq!(lcd.status(), DisplayStatus::Initialized);

        // all six lines become outputs, E first
        let configured = lcd.interface().configured_outputs();
        assert_eq!(configured[0], PINS.e);
        assert_eq!(configured.len(), 6);
        for pin in [PINS.db4, PINS.db5, PINS.db6, PINS.db7, PINS.rs] {
            assert!(configured.contains(&pin));
        }

        // one handshake nibble followed by the four fixed setup command bytes,
        // each latched on an enable falling edge with RS low
        let nibbles = lcd.interface().latched_nibbles(&PINS);
        assert_eq!(
            nibbles,
            std::vec![
                (false, 0x2), // 4-bit mode entry handshake
                (false, 0x2),
                (false, 0x8), // 0x28 function set: 4-bit bus, 2-line font
                (false, 0x0),
                (false, 0x1), // 0x01 clear display
                (false, 0x8),
                (false, 0x0), // 0x80 DDRAM address to origin
                (false, 0x0),
                (false, 0xC), // 0x0C display on, cursor off
            ]
        );
    }

    #[test]
    fn test_begin_delay_schedule() {
        let timing = BusTiming::default();
        let mut lcd =
            CharacterDisplay::new(RecordingPins::new(), PINS, DisplayGeometry::new(16, 2));
        assert!(lcd.begin().is_ok());

        let mut expected = std::vec![
            timing.en_delay_us,
            timing.en_delay_us,
            timing.cmd_delay_us * 2,
        ];
        for _ in 0..4 {
            expected.extend_from_slice(&[
                timing.en_delay_us,
                timing.en_delay_us,
                timing.en_delay_us,
                timing.en_delay_us,
                timing.cmd_delay_us,
            ]);
        }
        assert_eq!(lcd.interface().delays(), expected);
    }

    #[test]
    fn test_custom_bus_timing() {
        let timing = BusTiming {
            en_delay_us: 2,
            cmd_delay_us: 100,
        };
        let mut lcd = CharacterDisplay::new_with_timing(
            RecordingPins::new(),
            PINS,
            DisplayGeometry::new(16, 2),
            timing,
        );
        assert!(lcd.begin().is_ok());

        let delays = lcd.interface().delays();
        // the handshake nibble settles for twice the command delay
        assert_eq!(&delays[..3], &[2, 2, 200]);
        // each full byte ends with one command delay
        assert_eq!(delays.iter().filter(|&&us| us == 100).count(), 4);
    }

    #[test]
    fn test_fmt_write() {
        use core::fmt::Write;

        let mut lcd =
            CharacterDisplay::new(RecordingPins::new(), PINS, DisplayGeometry::new(20, 4));
        assert!(lcd.begin().is_ok());
        lcd.interface().reset();

        assert!(write!(lcd, "T={}C", 21).is_ok());
        let sent = lcd.interface().transactions(&PINS);
        let expected: std::vec::Vec<(bool, u8)> = b"T=21C".iter().map(|&b| (true, b)).collect();
        assert_eq!(sent, expected);
    }

    #[test]
    fn test_error_messages() {
        let msg: &'static str = (&CharacterDisplayError::NotInitialized).into();
        assert_eq!(msg, "Display not initialized");
        let msg: &'static str = (&DisplayStatus::Error).into();
        assert_eq!(msg, "error");
        let msg: &'static str = (&DisplayMode::DisplayOnCursorBlink).into();
        assert_eq!(msg, "display on, cursor blink");
    }
}
