//! RP2040 GPIO-backed implementation of [`crate::handlers::DigitalIo`].

use embassy_rp::gpio::{Flex, Pull};

use crate::handlers::DigitalIo;

/// Drives a fixed set of `N` GPIOs, each independently switchable between
/// output-driven and input-read by whichever command touches it first.
pub struct GpioPins<'a, const N: usize> {
    pins: [Flex<'a>; N],
}

impl<'a, const N: usize> GpioPins<'a, N> {
    /// Wrap `pins` for dispatch. Index `i` in the array answers to digital
    /// pin number `i` on the wire.
    pub fn new(pins: [Flex<'a>; N]) -> Self {
        Self { pins }
    }
}

impl<'a, const N: usize> DigitalIo for GpioPins<'a, N> {
    fn set_pin(&mut self, pin: u16, high: bool) {
        let Some(gpio) = self.pins.get_mut(pin as usize) else {
            defmt::warn!("set_digital_out: pin {} out of range", pin);
            return;
        };
        gpio.set_as_output();
        if high {
            gpio.set_high();
        } else {
            gpio.set_low();
        }
    }

    fn read_pin(&mut self, pin: u16) -> bool {
        let Some(gpio) = self.pins.get_mut(pin as usize) else {
            defmt::warn!("get_digital_in: pin {} out of range", pin);
            return false;
        };
        gpio.set_as_input();
        gpio.set_pull(Pull::None);
        gpio.is_high()
    }
}
