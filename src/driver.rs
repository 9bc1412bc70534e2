// HD44780 4-bit GPIO driver core
// One driver body, parameterized over the `PinInterface` capability. Each 8-bit
// controller transaction is clocked as two nibbles across the enable line with fixed
// settle delays; the controller's busy flag is never read back (no read bus is
// wired), so command pacing is a conservative worst-case wait.

use crate::{
    interface::PinInterface, BusTiming, CharacterDisplayError, DisplayGeometry, DisplayMode,
    DisplayStatus, PinAssignment, LCD_CMD_CLEARDISPLAY, LCD_CMD_CURSORSHIFT,
    LCD_CMD_FUNCTIONSET, LCD_CMD_RETURNHOME, LCD_CMD_SETDDRAMADDR, LCD_DDRAM_ROW1_OFFSET,
    LCD_FLAG_2LINE, LCD_FLAG_4BITMODE, LCD_FLAG_5x8_DOTS, LCD_FLAG_CURSORMOVE,
    LCD_FLAG_MOVERIGHT,
};

/// HD44780-compatible character display bit-banged over six GPIO lines in 4-bit mode.
///
/// The driver instance owns its [`PinInterface`] and is fully synchronous: every
/// operation, including the microsecond settle waits, runs to completion on the
/// calling thread. It is not safe to share one instance across threads without
/// external mutual exclusion, and exactly one instance should drive a given enable
/// line. Several instances may share the data and `RS` lines when each display has
/// its own enable line.
pub struct CharacterDisplay<IO>
where
    IO: PinInterface,
{
    io: IO,
    pins: PinAssignment,
    geometry: DisplayGeometry,
    timing: BusTiming,
    status: DisplayStatus,
}

impl<IO> CharacterDisplay<IO>
where
    IO: PinInterface,
{
    /// Create a new driver bound to the given pins and geometry. No I/O is performed
    /// until [`begin`](Self::begin) runs.
    pub fn new(io: IO, pins: PinAssignment, geometry: DisplayGeometry) -> Self {
        Self::new_with_timing(io, pins, geometry, BusTiming::default())
    }

    /// Create a new driver with custom bus settle timing. The timing is fixed for
    /// the lifetime of the instance.
    pub fn new_with_timing(
        io: IO,
        pins: PinAssignment,
        geometry: DisplayGeometry,
        timing: BusTiming,
    ) -> Self {
        Self {
            io,
            pins,
            geometry,
            timing,
            status: DisplayStatus::Uninitialized,
        }
    }

    /// returns a reference to the pin interface. mostly needed for testing
    pub(crate) fn interface(&mut self) -> &mut IO {
        &mut self.io
    }

    /// Initialize the display. Must be called before any display operation.
    ///
    /// Idempotent: if the driver is already initialized this returns `Ok` without
    /// touching the hardware. Otherwise the configuration is validated (no
    /// [`UNASSIGNED_PIN`](crate::UNASSIGNED_PIN) lines, non-zero geometry); on
    /// failure the driver enters [`DisplayStatus::Error`]. On success the six lines
    /// are configured as outputs, the controller's 4-bit-mode entry handshake is
    /// performed, and the fixed setup commands are issued: function set (4-bit bus,
    /// 2-line font), clear display, DDRAM address to origin, display on with cursor
    /// off.
    pub fn begin(&mut self) -> Result<&mut Self, CharacterDisplayError> {
        if self.status == DisplayStatus::Initialized {
            return Ok(self);
        }

        self.status = DisplayStatus::Uninitialized;
        if !self.pins.is_valid() || !self.geometry.is_valid() {
            self.status = DisplayStatus::Error;
            return Err(CharacterDisplayError::InvalidConfiguration);
        }

        // E comes up first and is parked low before any other line is touched
        self.io.configure_output(self.pins.e);
        self.io.write_pin(self.pins.e, false);

        self.io.configure_output(self.pins.rs);
        self.io.configure_output(self.pins.db4);
        self.io.configure_output(self.pins.db5);
        self.io.configure_output(self.pins.db6);
        self.io.configure_output(self.pins.db7);

        self.send_init_nibble();

        // default settings
        self.send_byte(
            false,
            LCD_CMD_FUNCTIONSET | LCD_FLAG_4BITMODE | LCD_FLAG_2LINE | LCD_FLAG_5x8_DOTS,
        );
        self.send_byte(false, LCD_CMD_CLEARDISPLAY);
        self.send_byte(false, LCD_CMD_SETDDRAMADDR);
        self.send_byte(false, DisplayMode::DisplayOnCursorOff.command_byte());

        self.status = DisplayStatus::Initialized;
        Ok(self)
    }

    /// Replace the GPIO pin mapping. Drops the driver back to
    /// [`DisplayStatus::Uninitialized`]; `begin` must be run again.
    pub fn reset_pinout(&mut self, pins: PinAssignment) {
        self.status = DisplayStatus::Uninitialized;
        self.pins = pins;
    }

    /// Replace the display geometry. Drops the driver back to
    /// [`DisplayStatus::Uninitialized`]; `begin` must be run again.
    pub fn reset_display_size(&mut self, geometry: DisplayGeometry) {
        self.status = DisplayStatus::Uninitialized;
        self.geometry = geometry;
    }

    /// Current lifecycle state of the driver.
    pub fn status(&self) -> DisplayStatus {
        self.status
    }

    /// Configured characters per line, available once initialized.
    pub fn chars_per_line(&self) -> Option<u8> {
        if self.status != DisplayStatus::Initialized {
            return None;
        }
        Some(self.geometry.chars_per_line)
    }

    /// Configured number of lines, available once initialized.
    pub fn lines(&self) -> Option<u8> {
        if self.status != DisplayStatus::Initialized {
            return None;
        }
        Some(self.geometry.lines)
    }

    //--------------------------------------------------------------------------------------------------
    // high level commands, for the user!
    //--------------------------------------------------------------------------------------------------

    /// Set the display power and cursor visibility mode.
    pub fn set_display_mode(
        &mut self,
        mode: DisplayMode,
    ) -> Result<&mut Self, CharacterDisplayError> {
        self.ensure_initialized()?;
        self.send_byte(false, mode.command_byte());
        Ok(self)
    }

    /// Set the display mode from a raw mode selector (0..=3, the numbering of
    /// [`DisplayMode`]'s variants).
    ///
    /// Quirk kept for compatibility with the original wire behavior: an
    /// unrecognized selector reports success without touching the hardware.
    pub fn set_display_mode_raw(&mut self, raw: u8) -> Result<&mut Self, CharacterDisplayError> {
        self.ensure_initialized()?;
        match DisplayMode::from_raw(raw) {
            Some(mode) => self.set_display_mode(mode),
            None => Ok(self),
        }
    }

    /// Clear the display.
    pub fn clear(&mut self) -> Result<&mut Self, CharacterDisplayError> {
        self.ensure_initialized()?;
        self.send_byte(false, LCD_CMD_CLEARDISPLAY);
        Ok(self)
    }

    /// Set the cursor to the home position. Does not clear the display.
    pub fn home(&mut self) -> Result<&mut Self, CharacterDisplayError> {
        self.ensure_initialized()?;
        self.send_byte(false, LCD_CMD_RETURNHOME);
        Ok(self)
    }

    /// Set the cursor position at specified column and row. Columns and rows are zero-indexed
    /// in the logical text grid; rows beyond the controller's two native rows fold as described
    /// in the crate documentation.
    pub fn set_cursor(&mut self, col: u8, row: u8) -> Result<&mut Self, CharacterDisplayError> {
        self.ensure_initialized()?;
        let (virt_col, virt_row) = self.translate(col, row)?;

        if virt_row != 0 {
            self.send_byte(false, LCD_CMD_SETDDRAMADDR | LCD_DDRAM_ROW1_OFFSET);
        } else {
            self.send_byte(false, LCD_CMD_SETDDRAMADDR);
        }

        // walk the cursor out to the virtual column one shift at a time
        for _ in 0..virt_col {
            self.send_byte(
                false,
                LCD_CMD_CURSORSHIFT | LCD_FLAG_CURSORMOVE | LCD_FLAG_MOVERIGHT,
            );
        }

        Ok(self)
    }

    /// Print a single character at the current cursor position.
    pub fn print_char(&mut self, c: u8) -> Result<&mut Self, CharacterDisplayError> {
        self.ensure_initialized()?;
        self.send_byte(true, c);
        Ok(self)
    }

    /// Print a string at the current cursor position. Bytes are sent as-is; only the
    /// ASCII subset is portable across controller character ROMs.
    pub fn print(&mut self, text: &str) -> Result<&mut Self, CharacterDisplayError> {
        self.print_bytes(text.as_bytes())
    }

    /// Print raw bytes at the current cursor position. Accepts CGROM codes that are
    /// not valid UTF-8 text.
    pub fn print_bytes(&mut self, bytes: &[u8]) -> Result<&mut Self, CharacterDisplayError> {
        self.ensure_initialized()?;
        for &b in bytes {
            self.send_byte(true, b);
        }
        Ok(self)
    }

    /// Fill the whole screen with one character, row by row. The cursor is left at
    /// the end of the last row.
    pub fn fill_screen_char(&mut self, c: u8) -> Result<&mut Self, CharacterDisplayError> {
        self.ensure_initialized()?;
        let chars_per_line = self.geometry.chars_per_line;
        let lines = self.geometry.lines;

        for line in 0..lines {
            self.set_cursor(0, line)?;
            for _ in 0..chars_per_line {
                self.send_byte(true, c);
            }
        }
        Ok(self)
    }

    //--------------------------------------------------------------------------------------------------
    // pin-level protocol
    //--------------------------------------------------------------------------------------------------

    fn ensure_initialized(&self) -> Result<(), CharacterDisplayError> {
        if self.status != DisplayStatus::Initialized {
            return Err(CharacterDisplayError::NotInitialized);
        }
        Ok(())
    }

    /// Map a (column, row) pair in the logical grid to the controller's native
    /// two-row addressing: odd rows fold onto native row 1, and rows past the first
    /// pair are appended after the visible column span of the native row.
    fn translate(&self, col: u8, row: u8) -> Result<(u8, u8), CharacterDisplayError> {
        if col >= self.geometry.chars_per_line {
            return Err(CharacterDisplayError::ColumnOutOfRange);
        }
        if row >= self.geometry.lines {
            return Err(CharacterDisplayError::RowOutOfRange);
        }

        let virt_row = row & 0x1;
        let virt_col = col.wrapping_add((row >> 1).wrapping_mul(self.geometry.chars_per_line));
        Ok((virt_col, virt_row))
    }

    /// Clock one 8-bit transaction across the enable line: high nibble then low
    /// nibble, each latched on an E falling edge, with the long command settle wait
    /// at the end.
    fn send_byte(&mut self, data_register: bool, byte: u8) {
        self.io.write_pin(self.pins.e, false);
        self.io.write_pin(self.pins.rs, data_register);
        self.io.delay_us(self.timing.en_delay_us);

        self.write_nibble(byte >> 4);
        self.io.write_pin(self.pins.e, true);
        self.io.delay_us(self.timing.en_delay_us);
        self.io.write_pin(self.pins.e, false);
        self.io.delay_us(self.timing.en_delay_us);

        self.write_nibble(byte & 0xF);
        self.io.write_pin(self.pins.e, true);
        self.io.delay_us(self.timing.en_delay_us);
        self.io.write_pin(self.pins.e, false);
        self.io.delay_us(self.timing.cmd_delay_us);
    }

    /// Present one nibble on DB7..DB4.
    fn write_nibble(&mut self, nibble: u8) {
        self.io.write_pin(self.pins.db7, nibble & 0x8 != 0);
        self.io.write_pin(self.pins.db6, nibble & 0x4 != 0);
        self.io.write_pin(self.pins.db5, nibble & 0x2 != 0);
        self.io.write_pin(self.pins.db4, nibble & 0x1 != 0);
    }

    /// Degenerate one-nibble transmission that switches the controller into 4-bit
    /// bus mode: only the high nibble 0x2 is clocked, RS held low, followed by a
    /// double-length settle wait.
    fn send_init_nibble(&mut self) {
        self.io.write_pin(self.pins.e, false);
        self.io.write_pin(self.pins.rs, false);
        self.io.delay_us(self.timing.en_delay_us);

        self.write_nibble(0x2);
        self.io.write_pin(self.pins.e, true);
        self.io.delay_us(self.timing.en_delay_us);
        self.io.write_pin(self.pins.e, false);
        self.io.delay_us(self.timing.cmd_delay_us << 1);
    }
}

/// Implement the `core::fmt::Write` trait for the display, allowing it to be used with the
/// `write!` macro. This is a convenience method for printing to the display at the current
/// cursor position.
impl<IO> core::fmt::Write for CharacterDisplay<IO>
where
    IO: PinInterface,
{
    fn write_str(&mut self, s: &str) -> Result<(), core::fmt::Error> {
        if let Err(_e) = self.print(s) {
            return Err(core::fmt::Error);
        }
        Ok(())
    }
}

#[cfg(feature = "ufmt")]
/// Implement the `ufmt::uWrite` trait for the display, allowing it to be used with the
/// `uwriteln!` and `uwrite!` macros.
impl<IO> ufmt::uWrite for CharacterDisplay<IO>
where
    IO: PinInterface,
{
    fn write_str(&mut self, s: &str) -> Result<(), CharacterDisplayError> {
        self.print(s)?;
        Ok(())
    }

    type Error = CharacterDisplayError;
}
