use embedded_hal::digital::{ErrorType, InputPin};
use embedded_hal_async::digital::Wait;

use crate::InterruptType;

/// Something that can be called back when a GPIO interrupt fires.
///
/// Implemented for every `FnMut(u8)`, so plain `fn(u8)` pointers, `&dyn Fn(u8)`
/// references and closures can all be registered.
pub trait InterruptHandler {
    /// Called with the index (0-7) of the pin that triggered.
    fn on_interrupt(&mut self, pin: u8);
}

impl<F: FnMut(u8)> InterruptHandler for F {
    fn on_interrupt(&mut self, pin: u8) {
        self(pin)
    }
}

/// Outcome of one scan over the interrupt table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct Dispatch {
    /// Pins whose handler was called.
    pub fired: u8,
    /// The baseline moved and has to be written back to the chip.
    pub rearm: bool,
}

pub(crate) struct InterruptTable<H> {
    modes: [InterruptType; 8],
    handlers: [Option<H>; 8],
    baseline: u8,
}

impl<H> InterruptTable<H> {
    pub fn new() -> Self {
        Self {
            modes: [InterruptType::Low; 8],
            handlers: core::array::from_fn(|_| None),
            baseline: 0,
        }
    }

    pub fn baseline(&self) -> u8 {
        self.baseline
    }

    pub fn set_baseline(&mut self, baseline: u8) {
        self.baseline = baseline;
    }

    pub fn mode(&self, pin: u8) -> Option<InterruptType> {
        self.modes.get(pin as usize).copied()
    }

    pub fn is_armed(&self, pin: u8) -> bool {
        matches!(self.handlers.get(pin as usize), Some(Some(_)))
    }

    /// `pin` must already be range-checked.
    pub fn attach(&mut self, pin: u8, interrupt: InterruptType, handler: H) {
        let mask = 1 << pin;
        if interrupt.baseline_bit() {
            self.baseline |= mask;
        } else {
            self.baseline &= !mask;
        }
        self.modes[pin as usize] = interrupt;
        self.handlers[pin as usize] = Some(handler);
    }

    pub fn attach_all(&mut self, interrupt: InterruptType, handler: H)
    where
        H: Clone,
    {
        self.baseline = if interrupt.baseline_bit() { 0xFF } else { 0x00 };
        self.modes = [interrupt; 8];
        self.handlers = core::array::from_fn(|_| Some(handler.clone()));
    }

    pub fn detach(&mut self, mask: u8) {
        for (pin, handler) in self.handlers.iter_mut().enumerate() {
            if mask & (1 << pin) != 0 {
                *handler = None;
            }
        }
    }
}

impl<H: InterruptHandler> InterruptTable<H> {
    /// Compare a freshly read GPIO `state` against the baseline and call the
    /// handlers of the pins that triggered.
    ///
    /// Only `Change` pins move the baseline. Level and edge pins keep their
    /// reference, so they trigger again on every scan for as long as the pin
    /// stays away from it.
    pub fn dispatch(&mut self, state: u8) -> Dispatch {
        let mut next = self.baseline;
        let mut out = Dispatch::default();

        for pin in 0..8u8 {
            let Some(handler) = self.handlers[pin as usize].as_mut() else {
                continue;
            };
            let mask = 1 << pin;
            let bit = state & mask != 0;
            if bit == (self.baseline & mask != 0) {
                continue;
            }
            match self.modes[pin as usize] {
                InterruptType::Low | InterruptType::Rising if !bit => continue,
                InterruptType::High | InterruptType::Falling if bit => continue,
                InterruptType::Change => {
                    if bit {
                        next |= mask;
                    } else {
                        next &= !mask;
                    }
                    out.rearm = true;
                }
                _ => {}
            }
            handler.on_interrupt(pin);
            out.fired |= mask;
        }

        self.baseline = next;
        out
    }
}

/// Host GPIO connected to the CH423 interrupt output.
///
/// With interrupts enabled the chip pulls GPO15 low while any GPIO pin differs
/// from the baseline; wire it to a host input and wrap that input here.
pub struct ExtIPin<P>(pub P);

impl<P: InputPin> ExtIPin<P> {
    /// `true` while the chip signals a pending interrupt (line is low).
    pub fn is_pending(&mut self) -> Result<bool, <P as ErrorType>::Error> {
        self.0.is_low()
    }
}

impl<P: Wait> ExtIPin<P> {
    /// Wait for the line to fall. Call
    /// [`Driver::poll_interrupts`](crate::dev::ch423::Driver::poll_interrupts) afterwards.
    pub async fn wait_for_interrupt(&mut self) -> Result<(), <P as ErrorType>::Error> {
        self.0.wait_for_falling_edge().await
    }
}
