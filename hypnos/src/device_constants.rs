use pins::{
    AlarmIntPin, HapticPin, LedPin, RtcSclPin, RtcSdaPin, StrategyStrapPin, SyncRxPin, SyncTxPin,
    TouchPin,
};
use rp235x_hal::{
    gpio::{
        FunctionI2C, FunctionSio, FunctionUart, Pin, PullDown, PullNone, PullUp, SioInput,
        SioOutput,
    },
    i2c::Controller,
    pac::{I2C1, UART0},
    uart::{Enabled, UartPeripheral},
    I2C,
};
use true_time::CalendarTime;

pub mod pins {
    use rp235x_hal::gpio::bank0::*;

    /// Haptic motor driver gate
    pub type HapticPin = Gpio0;

    /// Strategy strap: bridged to ground selects the touch-timer behavior
    pub type StrategyStrapPin = Gpio2;

    /// RTC I2C SDA
    pub type RtcSdaPin = Gpio14;
    /// RTC I2C SCL
    pub type RtcSclPin = Gpio15;

    /// Sync bus UART TX
    pub type SyncTxPin = Gpio16;
    /// Sync bus UART RX
    pub type SyncRxPin = Gpio17;

    /// RTC INT/SQW line, open drain so it needs the pull-up
    pub type AlarmIntPin = Gpio21;

    /// Touch controller output, driven high while touched
    pub type TouchPin = Gpio22;

    /// Status LED
    pub type LedPin = Gpio25;
}

/// I2C bus wired to the RTC
pub type RtcI2cBus = I2C<
    I2C1,
    (
        Pin<RtcSdaPin, FunctionI2C, PullUp>,
        Pin<RtcSclPin, FunctionI2C, PullUp>,
    ),
    Controller,
>;

/// UART carrying time-sync frames to and from the dock
pub type SyncUart = UartPeripheral<
    Enabled,
    UART0,
    (
        Pin<SyncTxPin, FunctionUart, PullDown>,
        Pin<SyncRxPin, FunctionUart, PullDown>,
    ),
>;

pub type HapticMotor = Pin<HapticPin, FunctionSio<SioOutput>, PullNone>;
pub type StrategyStrap = Pin<StrategyStrapPin, FunctionSio<SioInput>, PullUp>;
pub type AlarmIntLine = Pin<AlarmIntPin, FunctionSio<SioInput>, PullUp>;
pub type TouchSense = Pin<TouchPin, FunctionSio<SioInput>, PullDown>;
pub type StatusLed = Pin<LedPin, FunctionSio<SioOutput>, PullNone>;

/// True seconds per hardware second for this batch of RTC crystals
pub const CORRECTION_FACTOR: f64 = 1.02028801;

/// Calendar the band assumes at power-on until the first dock sync
pub const BOOT_CALENDAR: CalendarTime = CalendarTime::new(2025, 7, 1, 18, 30, 0);

/// Sync bus baud rate
pub const SYNC_BAUD_HZ: u32 = 115_200;

/// Haptic pattern: three short buzzes
pub const PULSE_COUNT: u32 = 3;
pub const PULSE_ON_MILLIS: u64 = 70;
pub const PULSE_OFF_MILLIS: u64 = 180;

/// How often the sync UART FIFO is drained
pub const SYNC_POLL_MILLIS: u64 = 100;

/// Status LED half-period
pub const HEARTBEAT_MILLIS: u64 = 5_000;
