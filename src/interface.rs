// GPIO Pin Capability
// The driver core never touches hardware directly. Everything it needs from a target
// is expressed by the `PinInterface` trait below: make a pin an output, drive a pin
// level, and busy-wait some microseconds. Each board environment implements the trait
// over its own GPIO block (HAL digital writes on one family, SIO register pokes on
// another); the single driver body in `driver.rs` works against either. `CallbackPins`
// is a ready-made implementation assembled from two closures plus an `embedded-hal`
// delay provider, for targets that do not want a hand-written impl.

use embedded_hal::delay::DelayNs;

/// Pin I/O capability consumed by [`CharacterDisplay`](crate::CharacterDisplay).
///
/// Implementations are expected to be infallible: a GPIO level write on the supported
/// targets cannot report an error, and the driver's command pacing relies on
/// `delay_us` actually blocking for at least the requested duration. The relative
/// ordering of `write_pin` calls is load-bearing for the enable strobe protocol, so
/// implementations must not reorder or coalesce writes.
pub trait PinInterface {
    /// Configure the given pin as a push-pull output.
    fn configure_output(&mut self, pin: u8);

    /// Drive the given pin to the given level (`true` = high).
    fn write_pin(&mut self, pin: u8, level: bool);

    /// Block for at least `us` microseconds.
    fn delay_us(&mut self, us: u32);
}

/// A [`PinInterface`] built from two closures and an `embedded-hal`
/// [`DelayNs`](embedded_hal::delay::DelayNs) provider.
///
/// ```rust
/// let pins = CallbackPins::new(
///     |pin| unsafe { gpio_set_output(pin) },
///     |pin, level| unsafe { gpio_write(pin, level) },
///     delay, // from the board HAL
/// );
/// ```
pub struct CallbackPins<C, W, D>
where
    C: FnMut(u8),
    W: FnMut(u8, bool),
    D: DelayNs,
{
    configure: C,
    write: W,
    delay: D,
}

impl<C, W, D> CallbackPins<C, W, D>
where
    C: FnMut(u8),
    W: FnMut(u8, bool),
    D: DelayNs,
{
    /// Create the adapter from a configure-as-output closure, a level-write closure,
    /// and a delay provider.
    pub fn new(configure: C, write: W, delay: D) -> Self {
        Self {
            configure,
            write,
            delay,
        }
    }

    /// Consume the adapter and return the delay provider.
    pub fn release(self) -> D {
        self.delay
    }
}

impl<C, W, D> PinInterface for CallbackPins<C, W, D>
where
    C: FnMut(u8),
    W: FnMut(u8, bool),
    D: DelayNs,
{
    fn configure_output(&mut self, pin: u8) {
        (self.configure)(pin);
    }

    fn write_pin(&mut self, pin: u8, level: bool) {
        (self.write)(pin, level);
    }

    fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }
}


#[cfg(test)]
mod tests {
    extern crate std;
    use core::cell::RefCell;
    use std::vec::Vec;

    use super::*;
    use embedded_hal_mock::eh1::delay::NoopDelay;

    #[test]
    fn test_callback_pins_forwarding() {
        let configured: RefCell<Vec<u8>> = RefCell::new(Vec::new());
        let written: RefCell<Vec<(u8, bool)>> = RefCell::new(Vec::new());

        let mut pins = CallbackPins::new(
            |pin| configured.borrow_mut().push(pin),
            |pin, level| written.borrow_mut().push((pin, level)),
            NoopDelay::new(),
        );

        pins.configure_output(12);
        pins.write_pin(12, true);
        pins.write_pin(12, false);
        pins.delay_us(50);

        assert_eq!(configured.borrow().as_slice(), &[12]);
        assert_eq!(written.borrow().as_slice(), &[(12, true), (12, false)]);

        // the delay provider comes back out for reuse elsewhere
        let mut delay = pins.release();
        delay.delay_us(1);
    }

    #[test]
    fn test_recorder_decodes_nibble_pairs() {
        use recorder::RecordingPins;
        let pins = crate::PinAssignment::new(0, 1, 2, 3, 4, 5);
        let mut rec = RecordingPins::new();

        // clock 0xA5 into the data register by hand
        rec.write_pin(pins.rs, true);
        for nibble in [0xAu8, 0x5u8] {
            rec.write_pin(pins.db7, nibble & 0x8 != 0);
            rec.write_pin(pins.db6, nibble & 0x4 != 0);
            rec.write_pin(pins.db5, nibble & 0x2 != 0);
            rec.write_pin(pins.db4, nibble & 0x1 != 0);
            rec.write_pin(pins.e, true);
            rec.write_pin(pins.e, false);
        }

        assert_eq!(rec.transactions(&pins), std::vec![(true, 0xA5)]);
        assert_eq!(rec.data_transaction_count(&pins), 1);
    }
}
