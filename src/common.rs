/// Electrical mode of a pin group.
///
/// `Input`/`Output` only apply to the GPIO group, `OpenDrain`/`PushPull` only to
/// the GPO group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinMode {
    /// GPIO0-7 sense their input level.
    Input = 0,
    /// GPIO0-7 drive their output level.
    Output,
    /// GPO0-15 only sink current.
    OpenDrain,
    /// GPO0-15 drive both levels.
    PushPull,
}

/// Pin groups of the CH423.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Group {
    /// GPIO0-7
    Gpio = 0,
    /// GPO0-15
    Gpo,
    /// GPO0-7
    GpoLow,
    /// GPO8-15
    GpoHigh,
}

impl Group {
    /// Whether this is one of the output-only groups.
    pub fn is_gpo(self) -> bool {
        !matches!(self, Group::Gpio)
    }
}

/// Trigger condition of a GPIO interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InterruptType {
    /// Baseline low; fires on every poll while the pin reads high.
    Low = 0,
    /// Baseline high; fires on every poll while the pin reads low.
    High,
    /// Baseline low; fires on every poll while the pin reads high.
    Rising,
    /// Baseline high; fires on every poll while the pin reads low.
    Falling,
    /// Fires once per level change, the baseline follows the pin.
    Change,
}

impl InterruptType {
    /// Resting level written to the GPIO register for a pin armed with this
    /// trigger. The chip flags an interrupt whenever a pin differs from it.
    pub fn baseline_bit(self) -> bool {
        !matches!(self, InterruptType::Low | InterruptType::Rising)
    }
}

/// Either a single pin index or the whole group at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinSelect {
    /// One pin by index.
    Pin(u8),
    /// Every pin of the group.
    All,
}

impl From<u8> for PinSelect {
    fn from(pin: u8) -> Self {
        PinSelect::Pin(pin)
    }
}

/// Modes applied by [`Driver::initialize_with`](crate::dev::ch423::Driver::initialize_with).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Direction of GPIO0-7, [`PinMode::Input`] or [`PinMode::Output`].
    pub gpio_mode: PinMode,
    /// Drive of GPO0-15, [`PinMode::OpenDrain`] or [`PinMode::PushPull`].
    pub gpo_mode: PinMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gpio_mode: PinMode::Input,
            gpo_mode: PinMode::PushPull,
        }
    }
}

/// Mask-based access to the pins of a port expander.
///
/// Bit `n` of a mask refers to the `n`-th pin of the device as numbered by its
/// [`Parts`](crate::dev::ch423::Parts).
pub trait PortDriver {
    /// Error type of the driver.
    type Error;

    /// Set all pins in `mask_high` to HIGH and all pins in `mask_low` to LOW.
    fn set(&mut self, mask_high: u32, mask_low: u32) -> Result<(), Self::Error>;

    /// Check whether pins in `mask_high` were set HIGH and pins in `mask_low` were set LOW.
    ///
    /// For each pin in either of the masks, the returned `u32` should have a 1 if they meet the
    /// expected state and a 0 otherwise.  All other bits MUST always stay 0.
    fn is_set(&mut self, mask_high: u32, mask_low: u32) -> Result<u32, Self::Error>;

    /// Check whether pins in `mask_high` are driven HIGH and pins in `mask_low` are driven LOW.
    ///
    /// Same mask semantics as [`PortDriver::is_set`].
    fn get(&mut self, mask_high: u32, mask_low: u32) -> Result<u32, Self::Error>;

    /// Invert the output state of all pins in `mask`.
    fn toggle(&mut self, mask: u32) -> Result<(), Self::Error> {
        // for all pins which are currently low, make them high.
        let mask_high = self.is_set(0, mask)?;
        // for all pins which are currently high, make them low.
        let mask_low = self.is_set(mask, 0)?;
        self.set(mask_high, mask_low)
    }
}

/// Pin Modes
pub mod mode {
    /// Trait for pin-modes which can be used to set a logic level.
    pub trait HasOutput {}
    /// Trait for pin-modes which can be used to read a logic level.
    pub trait HasInput {}

    /// Bi-directional pin; its direction follows the GPIO group mode.
    pub struct Bidirectional;
    impl HasInput for Bidirectional {}
    impl HasOutput for Bidirectional {}

    /// Output-only pin.
    pub struct Output;
    impl HasOutput for Output {}
}
