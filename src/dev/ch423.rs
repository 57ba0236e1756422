//! Support for the `CH423` "Two-wire remote I/O expander"
//!
//! The CH423 has eight bi-directional pins (GPIO0-7) sharing one direction flag
//! and sixteen output-only pins (GPO0-15) sharing one drive flag.  It has no
//! register pointer: each command is an I2C address of its own, followed by a
//! single data byte.
//!
//! The GPO outputs cannot be read back, so the driver keeps a shadow copy of
//! both GPO bytes.  The GPIO register is read from the chip whenever its
//! current value is needed.
//!
//! With interrupts enabled the chip pulls GPO15 low while any GPIO input
//! differs from the value last written to the GPIO register.  The driver uses
//! this by writing a per-pin baseline to that register and comparing the input
//! state against it in [`Driver::poll_interrupts`].
//!
//! When passing 24-bit masks to the [`PortDriver`](crate::PortDriver)
//! implementation, bits 0-7 are GPIO0-7 and bits 8-23 are GPO0-15.
use core::cell::RefCell;

use embassy_sync::blocking_mutex::{raw::RawMutex, Mutex};
use log::{debug, trace, warn};
use modular_bitfield::prelude::*;

use crate::isr::{InterruptHandler, InterruptTable};
use crate::{Config, Error, Group, I2cExt, InterruptType, PinMode, PinSelect};

/// Number of bi-directional pins.
pub const GPIO_PINS: u8 = 8;
/// Number of output-only pins.
pub const GPO_PINS: u8 = 16;

const GPIO_MASK: u32 = 0x0000_00FF;
const GPO_SHIFT: u32 = 8;

/// Command bytes, already shifted down to 7-bit I2C addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Write the [`SystemArgs`] byte.
    SetSystemArgs = 0x48 >> 1,
    /// Write GPO0-7.
    SetGpoLow = 0x44 >> 1,
    /// Write GPO8-15.
    SetGpoHigh = 0x46 >> 1,
    /// Write the GPIO0-7 output level.
    SetGpio = 0x30,
    /// Read the GPIO0-7 level.
    ReadGpio = 0x4D >> 1,
}

impl From<Command> for u8 {
    fn from(c: Command) -> u8 {
        c as u8
    }
}

/// System parameter byte.  Write-only on the chip.
///
/// Bits, LSB first: `io_en` GPIO direction (1=output), `dec_l`/`dec_h` decode
/// bits (kept clear), `int_en` drive GPO15 low on GPIO input change, `od_en`
/// GPO drive (1=open-drain), `sleep` enter low-power sleep.
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemArgs {
    pub io_en: bool,
    pub dec_l: bool,
    // cleared when interrupts are enabled
    pub dec_h: bool,
    pub int_en: bool,
    pub od_en: bool,
    #[skip]
    __reserved5: B1,
    // only meaningful in the byte it is written with
    pub sleep: bool,
    #[skip]
    __reserved7: B1,
}

impl SystemArgs {
    /// Raw register value.
    pub fn bits(self) -> u8 {
        self.into_bytes()[0]
    }
}

impl Default for SystemArgs {
    fn default() -> Self {
        Self::new()
    }
}

const GPIO_NAMES: [&str; GPIO_PINS as usize] = [
    "GPIO0", "GPIO1", "GPIO2", "GPIO3", "GPIO4", "GPIO5", "GPIO6", "GPIO7",
];

const GPO_NAMES: [&str; GPO_PINS as usize] = [
    "GPO0", "GPO1", "GPO2", "GPO3", "GPO4", "GPO5", "GPO6", "GPO7", "GPO8", "GPO9", "GPO10",
    "GPO11", "GPO12", "GPO13", "GPO14", "GPO15",
];

/// Name of a GPIO pin, or `""` if `pin` is out of range.
pub fn gpio_pin_description(pin: u8) -> &'static str {
    GPIO_NAMES.get(pin as usize).copied().unwrap_or("")
}

/// Name of a GPO pin, or `""` if `pin` is out of range.
pub fn gpo_pin_description(pin: u8) -> &'static str {
    GPO_NAMES.get(pin as usize).copied().unwrap_or("")
}

/// `CH423` "Two-wire remote I/O expander" shared between pin handles
pub struct Ch423<M>(M);

impl<I2C, RM> Ch423<Mutex<RM, RefCell<Driver<I2C>>>>
where
    I2C: crate::I2cBus,
    RM: RawMutex,
{
    /// Create a new CH423 instance without interrupt handlers of its own type
    pub fn new(i2c: I2C) -> Self {
        Self::with_driver(Driver::new(i2c))
    }
}

impl<I2C, H, RM> Ch423<Mutex<RM, RefCell<Driver<I2C, H>>>>
where
    I2C: crate::I2cBus,
    RM: RawMutex,
{
    /// Wrap an existing driver in a mutex
    pub fn with_driver(driver: Driver<I2C, H>) -> Self {
        Self(Mutex::new(RefCell::new(driver)))
    }

    /// Run `f` with exclusive access to the driver.
    ///
    /// Interrupt handlers run inside this lock when `f` polls; they must not
    /// call back into the same `Ch423`.
    pub fn lock<R>(&self, f: impl FnOnce(&mut Driver<I2C, H>) -> R) -> R {
        self.0.lock(|driver| f(&mut driver.borrow_mut()))
    }

    /// Split the CH423 instance into its individual pins
    pub fn split(&self) -> Parts<'_, Driver<I2C, H>, RM> {
        Parts {
            gpio0: crate::Pin::new(0, &self.0),
            gpio1: crate::Pin::new(1, &self.0),
            gpio2: crate::Pin::new(2, &self.0),
            gpio3: crate::Pin::new(3, &self.0),
            gpio4: crate::Pin::new(4, &self.0),
            gpio5: crate::Pin::new(5, &self.0),
            gpio6: crate::Pin::new(6, &self.0),
            gpio7: crate::Pin::new(7, &self.0),
            gpo0: crate::Pin::new(8, &self.0),
            gpo1: crate::Pin::new(9, &self.0),
            gpo2: crate::Pin::new(10, &self.0),
            gpo3: crate::Pin::new(11, &self.0),
            gpo4: crate::Pin::new(12, &self.0),
            gpo5: crate::Pin::new(13, &self.0),
            gpo6: crate::Pin::new(14, &self.0),
            gpo7: crate::Pin::new(15, &self.0),
            gpo8: crate::Pin::new(16, &self.0),
            gpo9: crate::Pin::new(17, &self.0),
            gpo10: crate::Pin::new(18, &self.0),
            gpo11: crate::Pin::new(19, &self.0),
            gpo12: crate::Pin::new(20, &self.0),
            gpo13: crate::Pin::new(21, &self.0),
            gpo14: crate::Pin::new(22, &self.0),
            gpo15: crate::Pin::new(23, &self.0),
        }
    }
}

/// Pins of the CH423
#[allow(missing_docs)]
pub struct Parts<'a, PD, RM: RawMutex> {
    pub gpio0: crate::Pin<'a, crate::mode::Bidirectional, PD, RM>,
    pub gpio1: crate::Pin<'a, crate::mode::Bidirectional, PD, RM>,
    pub gpio2: crate::Pin<'a, crate::mode::Bidirectional, PD, RM>,
    pub gpio3: crate::Pin<'a, crate::mode::Bidirectional, PD, RM>,
    pub gpio4: crate::Pin<'a, crate::mode::Bidirectional, PD, RM>,
    pub gpio5: crate::Pin<'a, crate::mode::Bidirectional, PD, RM>,
    pub gpio6: crate::Pin<'a, crate::mode::Bidirectional, PD, RM>,
    pub gpio7: crate::Pin<'a, crate::mode::Bidirectional, PD, RM>,
    pub gpo0: crate::Pin<'a, crate::mode::Output, PD, RM>,
    pub gpo1: crate::Pin<'a, crate::mode::Output, PD, RM>,
    pub gpo2: crate::Pin<'a, crate::mode::Output, PD, RM>,
    pub gpo3: crate::Pin<'a, crate::mode::Output, PD, RM>,
    pub gpo4: crate::Pin<'a, crate::mode::Output, PD, RM>,
    pub gpo5: crate::Pin<'a, crate::mode::Output, PD, RM>,
    pub gpo6: crate::Pin<'a, crate::mode::Output, PD, RM>,
    pub gpo7: crate::Pin<'a, crate::mode::Output, PD, RM>,
    pub gpo8: crate::Pin<'a, crate::mode::Output, PD, RM>,
    pub gpo9: crate::Pin<'a, crate::mode::Output, PD, RM>,
    pub gpo10: crate::Pin<'a, crate::mode::Output, PD, RM>,
    pub gpo11: crate::Pin<'a, crate::mode::Output, PD, RM>,
    pub gpo12: crate::Pin<'a, crate::mode::Output, PD, RM>,
    pub gpo13: crate::Pin<'a, crate::mode::Output, PD, RM>,
    pub gpo14: crate::Pin<'a, crate::mode::Output, PD, RM>,
    pub gpo15: crate::Pin<'a, crate::mode::Output, PD, RM>,
}

/// CH423 driver
///
/// `H` is the type of the registered interrupt handlers.  [`Driver::new`] picks
/// plain `fn(u8)` pointers; use [`Driver::with_handlers`] for anything else,
/// e.g. `&dyn Fn(u8)`.
pub struct Driver<I2C, H = fn(u8)> {
    i2c: I2C,
    args: SystemArgs,
    gpo_low: u8,
    gpo_high: u8,
    irq: InterruptTable<H>,
}

impl<I2C> Driver<I2C> {
    /// Create a driver using `fn(u8)` interrupt handlers.  Nothing is sent to
    /// the chip until [`Driver::initialize`].
    pub fn new(i2c: I2C) -> Self {
        Self::with_handlers(i2c)
    }
}

impl<I2C, H> Driver<I2C, H> {
    /// Create a driver with a custom interrupt handler type.
    pub fn with_handlers(i2c: I2C) -> Self {
        Self {
            i2c,
            args: SystemArgs::new(),
            gpo_low: 0,
            gpo_high: 0,
            irq: InterruptTable::new(),
        }
    }

    /// Give the bus back.
    pub fn release(self) -> I2C {
        self.i2c
    }

    /// System parameters as last configured.  The sleep bit is never set here.
    pub fn system_args(&self) -> SystemArgs {
        self.args
    }

    /// Shadow of GPO0-7.
    pub fn gpo_low(&self) -> u8 {
        self.gpo_low
    }

    /// Shadow of GPO8-15.
    pub fn gpo_high(&self) -> u8 {
        self.gpo_high
    }

    fn gpo(&self) -> u16 {
        ((self.gpo_high as u16) << 8) | self.gpo_low as u16
    }

    /// Per-pin reference levels used to detect GPIO interrupts.
    pub fn interrupt_baseline(&self) -> u8 {
        self.irq.baseline()
    }

    /// Trigger configured for a GPIO pin, armed or not.
    pub fn interrupt_mode(&self, pin: u8) -> Option<InterruptType> {
        self.irq.mode(pin)
    }

    /// Whether a handler is registered for a GPIO pin.
    pub fn is_interrupt_armed(&self, pin: u8) -> bool {
        self.irq.is_armed(pin)
    }
}

impl<I2C: crate::I2cBus, H> Driver<I2C, H> {
    /// Configure both pin groups and reset the interrupt baseline to all-high.
    ///
    /// `gpio_mode` only honours [`PinMode::Input`]/[`PinMode::Output`] and
    /// `gpo_mode` only [`PinMode::OpenDrain`]/[`PinMode::PushPull`]; anything
    /// else leaves the corresponding flag cleared.
    pub fn initialize(&mut self, gpio_mode: PinMode, gpo_mode: PinMode) -> Result<(), Error<I2C::BusError>> {
        let mut args = SystemArgs::new();
        match gpio_mode {
            PinMode::Output => args.set_io_en(true),
            PinMode::Input => {}
            other => warn!("ch423: {:?} is not a GPIO mode, using input", other),
        }
        match gpo_mode {
            PinMode::OpenDrain => args.set_od_en(true),
            PinMode::PushPull => {}
            other => warn!("ch423: {:?} is not a GPO mode, using push-pull", other),
        }
        self.args = args;
        self.write_system_args()?;
        self.irq.set_baseline(0xFF);
        debug!("ch423: initialized gpio={:?} gpo={:?}", gpio_mode, gpo_mode);
        Ok(())
    }

    /// [`Driver::initialize`] from a [`Config`].
    pub fn initialize_with(&mut self, config: Config) -> Result<(), Error<I2C::BusError>> {
        self.initialize(config.gpio_mode, config.gpo_mode)
    }

    /// Change the mode of a whole group.
    ///
    /// Modes that do not apply to `group` are ignored.  The GPO groups share
    /// one drive flag, so `GpoLow` and `GpoHigh` switch all sixteen outputs.
    pub fn set_group_mode(&mut self, group: Group, mode: PinMode) -> Result<(), Error<I2C::BusError>> {
        match (group, mode) {
            (Group::Gpio, PinMode::Input | PinMode::Output) => {
                self.args.set_io_en(mode == PinMode::Output);
                self.write_system_args()
            }
            (Group::Gpo | Group::GpoLow | Group::GpoHigh, PinMode::OpenDrain | PinMode::PushPull) => {
                // Not sent: OD_EN reaches the chip with the next SystemArgs write.
                self.args.set_od_en(mode == PinMode::OpenDrain);
                Ok(())
            }
            _ => {
                warn!("ch423: mode {:?} does not apply to {:?}, ignored", mode, group);
                Ok(())
            }
        }
    }

    /// Drive GPIO pins.
    ///
    /// A single pin is set high for any non-zero `level`; the other pins keep
    /// the level read back from the chip.  [`PinSelect::All`] writes `level`
    /// as the whole register.  `level` must fit in a byte either way.
    pub fn gpio_write(&mut self, pin: impl Into<PinSelect>, level: u16) -> Result<(), Error<I2C::BusError>> {
        let mask = match pin.into() {
            PinSelect::All => None,
            PinSelect::Pin(pin) => Some(Self::gpio_mask(pin)?),
        };
        Self::check_level(level as u32, 0xFF)?;
        match mask {
            None => self.write_gpio(level as u8),
            Some(mask) => {
                let state = self.read_gpio()?;
                let value = if level != 0 { state | mask } else { state & !mask };
                self.write_gpio(value)
            }
        }
    }

    /// Read a GPIO pin as 0/1, or the whole register for [`PinSelect::All`].
    pub fn gpio_read(&mut self, pin: impl Into<PinSelect>) -> Result<u8, Error<I2C::BusError>> {
        match pin.into() {
            PinSelect::All => self.read_gpio(),
            PinSelect::Pin(pin) => {
                let mask = Self::gpio_mask(pin)?;
                Ok((self.read_gpio()? & mask != 0) as u8)
            }
        }
    }

    /// Drive GPO pins.
    ///
    /// A single pin is updated in its shadow byte and only that half is sent.
    /// [`PinSelect::All`] writes the same `level` byte to GPO0-7 and GPO8-15;
    /// use [`Driver::group_write`] with [`Group::Gpo`] for a 16-bit value.
    pub fn gpo_write(&mut self, pin: impl Into<PinSelect>, level: u16) -> Result<(), Error<I2C::BusError>> {
        let pin = match pin.into() {
            PinSelect::Pin(pin) if pin >= GPO_PINS => return Err(Error::InvalidPinIndex(pin)),
            other => other,
        };
        Self::check_level(level as u32, 0xFF)?;
        match pin {
            PinSelect::All => {
                self.write_gpo_high(level as u8)?;
                self.write_gpo_low(level as u8)
            }
            PinSelect::Pin(pin) if pin >= 8 => {
                let mask = 1 << (pin - 8);
                let value = if level != 0 { self.gpo_high | mask } else { self.gpo_high & !mask };
                self.write_gpo_high(value)
            }
            PinSelect::Pin(pin) => {
                let mask = 1 << pin;
                let value = if level != 0 { self.gpo_low | mask } else { self.gpo_low & !mask };
                self.write_gpo_low(value)
            }
        }
    }

    /// Write a whole group at once.
    ///
    /// `Gpio` takes the low byte of `level`, `Gpo` all 16 bits, `GpoLow` the
    /// low byte and `GpoHigh` the high byte.
    pub fn group_write(&mut self, group: Group, level: u32) -> Result<(), Error<I2C::BusError>> {
        Self::check_level(level, 0xFFFF)?;
        match group {
            Group::Gpio => self.write_gpio(level as u8),
            Group::Gpo => {
                self.write_gpo_high((level >> 8) as u8)?;
                self.write_gpo_low(level as u8)
            }
            Group::GpoLow => self.write_gpo_low(level as u8),
            Group::GpoHigh => self.write_gpo_high((level >> 8) as u8),
        }
    }

    /// Register `handler` for a GPIO pin.
    ///
    /// Only the driver state changes; the new baseline is sent by
    /// [`Driver::enable_interrupt`].
    pub fn attach_interrupt(
        &mut self,
        pin: u8,
        interrupt: InterruptType,
        handler: H,
    ) -> Result<(), Error<I2C::BusError>> {
        Self::gpio_mask(pin)?;
        self.irq.attach(pin, interrupt, handler);
        Ok(())
    }

    /// Register a copy of `handler` for every GPIO pin, with the same trigger.
    pub fn attach_interrupt_all(&mut self, interrupt: InterruptType, handler: H)
    where
        H: Clone,
    {
        self.irq.attach_all(interrupt, handler);
    }

    /// Drop the handler of a GPIO pin, or of all of them.  Trigger and baseline
    /// are kept.
    pub fn detach_interrupt(&mut self, pin: impl Into<PinSelect>) -> Result<(), Error<I2C::BusError>> {
        let mask = match pin.into() {
            PinSelect::All => 0xFF,
            PinSelect::Pin(pin) => Self::gpio_mask(pin)?,
        };
        self.irq.detach(mask);
        Ok(())
    }

    /// Enable the GPO15 interrupt output and load the baseline into the GPIO
    /// register.
    pub fn enable_interrupt(&mut self) -> Result<(), Error<I2C::BusError>> {
        self.args.set_int_en(true);
        self.args.set_dec_h(false);
        self.write_system_args()?;
        self.write_gpio(self.irq.baseline())
    }

    /// Disable the GPO15 interrupt output.
    pub fn disable_interrupt(&mut self) -> Result<(), Error<I2C::BusError>> {
        self.args.set_int_en(false);
        self.write_system_args()
    }

    /// Put the chip to sleep.
    ///
    /// The sleep bit is strobed: it is written once and cleared again in the
    /// driver, so later SystemArgs writes do not re-enter sleep.  The chip
    /// wakes up on the next bus write or on an input change.
    pub fn sleep(&mut self) -> Result<(), Error<I2C::BusError>> {
        self.args.set_sleep(true);
        let res = self.write_system_args();
        self.args.set_sleep(false);
        res
    }

    /// Send SystemArgs and both GPO shadows again, e.g. after a bus error
    /// interrupted a multi-write operation.  With interrupts enabled the
    /// baseline is loaded into the GPIO register as well.
    pub fn resync(&mut self) -> Result<(), Error<I2C::BusError>> {
        self.write_system_args()?;
        self.write_gpo_high(self.gpo_high)?;
        self.write_gpo_low(self.gpo_low)?;
        if self.args.int_en() {
            self.write_gpio(self.irq.baseline())?;
        }
        Ok(())
    }

    fn gpio_mask(pin: u8) -> Result<u8, Error<I2C::BusError>> {
        if pin < GPIO_PINS {
            Ok(1 << pin)
        } else {
            Err(Error::InvalidPinIndex(pin))
        }
    }

    fn check_level(level: u32, max: u32) -> Result<(), Error<I2C::BusError>> {
        if level > max {
            Err(Error::InvalidLevelValue(level))
        } else {
            Ok(())
        }
    }

    fn write_system_args(&mut self) -> Result<(), Error<I2C::BusError>> {
        let bits = self.args.bits();
        debug!("ch423: system args {:#010b}", bits);
        self.i2c.write_cmd(Command::SetSystemArgs, bits)
    }

    fn read_gpio(&mut self) -> Result<u8, Error<I2C::BusError>> {
        self.i2c.read_cmd(Command::ReadGpio)
    }

    fn write_gpio(&mut self, value: u8) -> Result<(), Error<I2C::BusError>> {
        self.i2c.write_cmd(Command::SetGpio, value)
    }

    fn write_gpo_low(&mut self, value: u8) -> Result<(), Error<I2C::BusError>> {
        self.i2c.write_cmd(Command::SetGpoLow, value)?;
        self.gpo_low = value;
        Ok(())
    }

    fn write_gpo_high(&mut self, value: u8) -> Result<(), Error<I2C::BusError>> {
        self.i2c.write_cmd(Command::SetGpoHigh, value)?;
        self.gpo_high = value;
        Ok(())
    }
}

impl<I2C: crate::I2cBus, H: InterruptHandler> Driver<I2C, H> {
    /// Read the GPIO inputs once and call the handlers of the pins that
    /// triggered.  Returns the mask of those pins.
    ///
    /// Call this after the interrupt line (see [`ExtIPin`](crate::ExtIPin))
    /// went low.  Edges are only seen as the difference between the baseline
    /// and the level at the time of the call.  `Change` pins take the new level
    /// as their baseline, which is written back to the chip; all other triggers
    /// keep theirs and fire again on every poll while the pin stays away from
    /// it.
    pub fn poll_interrupts(&mut self) -> Result<u8, Error<I2C::BusError>> {
        let state = self.read_gpio()?;
        let dispatch = self.irq.dispatch(state);
        trace!("ch423: gpio {:#04x} fired {:#04x}", state, dispatch.fired);
        if dispatch.rearm {
            self.write_gpio(self.irq.baseline())?;
        }
        Ok(dispatch.fired)
    }
}

impl<I2C: crate::I2cBus, H> crate::PortDriver for Driver<I2C, H> {
    type Error = Error<I2C::BusError>;

    fn set(&mut self, mask_high: u32, mask_low: u32) -> Result<(), Self::Error> {
        let touched = mask_high | mask_low;
        if touched & GPIO_MASK != 0 {
            let mut gpio = self.read_gpio()?;
            gpio |= mask_high as u8;
            gpio &= !mask_low as u8;
            self.write_gpio(gpio)?;
        }
        let touched = (touched >> GPO_SHIFT) as u16;
        let out = (self.gpo() | (mask_high >> GPO_SHIFT) as u16) & !((mask_low >> GPO_SHIFT) as u16);
        if touched & 0x00FF != 0 {
            self.write_gpo_low((out & 0xFF) as u8)?;
        }
        if touched & 0xFF00 != 0 {
            self.write_gpo_high((out >> 8) as u8)?;
        }
        Ok(())
    }

    fn is_set(&mut self, mask_high: u32, mask_low: u32) -> Result<u32, Self::Error> {
        let gpio = if (mask_high | mask_low) & GPIO_MASK != 0 {
            self.read_gpio()?
        } else {
            0
        };
        let out = ((self.gpo() as u32) << GPO_SHIFT) | gpio as u32;
        Ok((out & mask_high) | (!out & mask_low))
    }

    /// The GPIO register doubles as input register and GPO cannot be read
    /// back, so this is the same as [`PortDriver::is_set`](crate::PortDriver::is_set).
    fn get(&mut self, mask_high: u32, mask_low: u32) -> Result<u32, Self::Error> {
        self.is_set(mask_high, mask_low)
    }
}
