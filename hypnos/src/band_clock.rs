use cortex_m::asm;
use ds3231::{ClockFields, Ds3231};
use true_time::{CalendarTime, HardwareClock};

use crate::device_constants::RtcI2cBus;

/// The band's RTC chip behind the engine's clock interface.
///
/// The chip stores years as an offset from 2000, so calendar times are
/// shifted on the way through in both directions. Low power is a plain
/// WFI; everything that matters for battery runs from interrupts anyway.
pub struct BandClock {
    rtc: Ds3231<RtcI2cBus>,
}

impl BandClock {
    pub fn new(rtc: Ds3231<RtcI2cBus>) -> Self {
        Self { rtc }
    }

    fn to_fields(time: &CalendarTime) -> ClockFields {
        ClockFields {
            second: time.second as u8,
            minute: time.minute as u8,
            hour: time.hour as u8,
            day: time.day as u8,
            month: time.month as u8,
            year_offset: (time.year - 2000) as u8,
        }
    }

    fn to_calendar(fields: &ClockFields) -> CalendarTime {
        CalendarTime::new(
            2000 + fields.year_offset as i32,
            fields.month as i32,
            fields.day as i32,
            fields.hour as i32,
            fields.minute as i32,
            fields.second as i32,
        )
    }
}

impl HardwareClock for BandClock {
    type Error = rp235x_hal::i2c::Error;

    fn get_calendar(&mut self) -> Result<CalendarTime, Self::Error> {
        Ok(Self::to_calendar(&self.rtc.read_clock()?))
    }

    fn set_calendar(&mut self, time: &CalendarTime) -> Result<(), Self::Error> {
        self.rtc.set_clock(&Self::to_fields(time))
    }

    fn set_alarm(&mut self, time: &CalendarTime) -> Result<(), Self::Error> {
        self.rtc.set_alarm1(&Self::to_fields(time))
    }

    fn enable_alarm(&mut self) -> Result<(), Self::Error> {
        self.rtc.enable_alarm1()
    }

    fn disable_alarm(&mut self) -> Result<(), Self::Error> {
        self.rtc.disable_alarm1()
    }

    fn clear_alarm(&mut self) -> Result<(), Self::Error> {
        self.rtc.clear_alarm1_flag()
    }

    fn enter_low_power_mode(&mut self) {
        asm::wfi();
    }
}
