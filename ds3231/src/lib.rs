#![cfg_attr(not(test), no_std)]
// Maxim DS3231 extremely accurate I2C RTC with alarm output

use defmt::Format;
use embedded_hal::i2c::I2c;

/// Factory-fixed I2C address
pub const ADDRESS: u8 = 0x68;

/// Start of the seven timekeeping registers (0x00-0x06)
pub const SECONDS: u8 = 0x00;

/// Start of the four alarm 1 registers (0x07-0x0A)
pub const ALARM1_SECONDS: u8 = 0x07;

/// Control register
pub const CONTROL: u8 = 0x0E;

/// Control: route the alarm to the INT/SQW pin instead of a square wave
pub const CONTROL_INTCN: u8 = 1 << 2;

/// Control: alarm 1 interrupt enable
pub const CONTROL_A1IE: u8 = 1 << 0;

/// Status register
pub const STATUS: u8 = 0x0F;

/// Status: oscillator stopped at some point, time is suspect
pub const STATUS_OSF: u8 = 1 << 7;

/// Status: alarm 1 matched, held until written back to zero
pub const STATUS_A1F: u8 = 1 << 0;

/// Packed BCD nibbles to binary
pub fn bcd_to_bin(value: u8) -> u8 {
    (value >> 4) * 10 + (value & 0x0F)
}

/// Binary (0-99) to packed BCD nibbles
pub fn bin_to_bcd(value: u8) -> u8 {
    ((value / 10) << 4) | (value % 10)
}

/// The timekeeping fields as the chip holds them, already unpacked from
/// BCD. Hours are always 24-hour; the day-of-week register is not carried
/// here (the chip just needs any consistent 1-7 value on writes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub struct ClockFields {
    pub second: u8,
    pub minute: u8,
    pub hour: u8,
    /// Day of the month, 1-31
    pub day: u8,
    pub month: u8,
    /// Years since 2000, 0-99
    pub year_offset: u8,
}

impl ClockFields {
    /// Unpack a burst read of registers 0x00-0x06.
    ///
    /// Masks drop the 12/24-hour select (hours bit 6, always 0 the way
    /// this driver writes the chip) and the century flag (month bit 7).
    pub fn from_timekeeping(raw: &[u8; 7]) -> Self {
        Self {
            second: bcd_to_bin(raw[0] & 0x7F),
            minute: bcd_to_bin(raw[1] & 0x7F),
            hour: bcd_to_bin(raw[2] & 0x3F),
            day: bcd_to_bin(raw[4] & 0x3F),
            month: bcd_to_bin(raw[5] & 0x1F),
            year_offset: bcd_to_bin(raw[6]),
        }
    }

    /// Register-pointer-prefixed write of all seven timekeeping registers.
    ///
    /// The day-of-week register gets a constant 1; nothing downstream
    /// reads it back.
    pub fn timekeeping_payload(&self) -> [u8; 8] {
        [
            SECONDS,
            bin_to_bcd(self.second),
            bin_to_bcd(self.minute),
            bin_to_bcd(self.hour),
            1,
            bin_to_bcd(self.day),
            bin_to_bcd(self.month),
            bin_to_bcd(self.year_offset),
        ]
    }

    /// Register-pointer-prefixed write of the alarm 1 registers for an
    /// exact second/minute/hour/date match.
    ///
    /// All four A1Mx mask bits stay 0 and DY/DT stays 0 (date match), so
    /// the comparator fires once per month at most. Month and year are
    /// not compared by the chip; callers keep alarms within that horizon.
    pub fn alarm1_payload(&self) -> [u8; 5] {
        [
            ALARM1_SECONDS,
            bin_to_bcd(self.second),
            bin_to_bcd(self.minute),
            bin_to_bcd(self.hour),
            bin_to_bcd(self.day),
        ]
    }
}

pub struct Ds3231<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> Ds3231<I2C> {
    /// Create a new DS3231 instance
    ///
    /// # Arguments
    ///
    /// * `i2c` - The I2C peripheral to use
    /// * `address` - The I2C address of the chip, normally [`ADDRESS`]
    pub fn new(i2c: I2C, address: u8) -> Self {
        Ds3231 { i2c, address }
    }

    /// Burst-read the current time from registers 0x00-0x06
    pub fn read_clock(&mut self) -> Result<ClockFields, I2C::Error> {
        let mut raw = [0u8; 7];
        self.i2c.write_read(self.address, &[SECONDS], &mut raw)?;
        Ok(ClockFields::from_timekeeping(&raw))
    }

    /// Burst-write the time into registers 0x00-0x06.
    ///
    /// Writing the seconds register resets the chip's divider chain, so
    /// the new time starts from a whole second.
    pub fn set_clock(&mut self, fields: &ClockFields) -> Result<(), I2C::Error> {
        self.i2c.write(self.address, &fields.timekeeping_payload())
    }

    /// Program alarm 1 for an exact second/minute/hour/date match
    pub fn set_alarm1(&mut self, fields: &ClockFields) -> Result<(), I2C::Error> {
        self.i2c.write(self.address, &fields.alarm1_payload())
    }

    /// Route alarm 1 to the INT pin and enable its interrupt
    pub fn enable_alarm1(&mut self) -> Result<(), I2C::Error> {
        let control = self.read_register(CONTROL)?;
        self.write_register(CONTROL, control | CONTROL_INTCN | CONTROL_A1IE)
    }

    /// Mask the alarm 1 interrupt, leaving the time and alarm registers
    /// untouched
    pub fn disable_alarm1(&mut self) -> Result<(), I2C::Error> {
        let control = self.read_register(CONTROL)?;
        self.write_register(CONTROL, control & !CONTROL_A1IE)
    }

    /// Acknowledge a fired alarm 1 so the INT line releases.
    ///
    /// The flag bit can only be written to zero; other status bits are
    /// preserved.
    pub fn clear_alarm1_flag(&mut self) -> Result<(), I2C::Error> {
        let status = self.read_register(STATUS)?;
        self.write_register(STATUS, status & !STATUS_A1F)
    }

    /// Whether the oscillator has been stopped since the flag was last
    /// cleared, meaning the kept time cannot be trusted
    pub fn oscillator_stopped(&mut self) -> Result<bool, I2C::Error> {
        Ok(self.read_register(STATUS)? & STATUS_OSF != 0)
    }

    /// Clear the oscillator-stop flag after recovering the time
    pub fn clear_oscillator_stop_flag(&mut self) -> Result<(), I2C::Error> {
        let status = self.read_register(STATUS)?;
        self.write_register(STATUS, status & !STATUS_OSF)
    }

    fn read_register(&mut self, register: u8) -> Result<u8, I2C::Error> {
        let mut buf = [0u8; 1];
        self.i2c.write_read(self.address, &[register], &mut buf)?;
        Ok(buf[0])
    }

    fn write_register(&mut self, register: u8, value: u8) -> Result<(), I2C::Error> {
        self.i2c.write(self.address, &[register, value])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bcd_conversions_match_datasheet_examples() {
        assert_eq!(bin_to_bcd(0), 0x00);
        assert_eq!(bin_to_bcd(9), 0x09);
        assert_eq!(bin_to_bcd(10), 0x10);
        assert_eq!(bin_to_bcd(23), 0x23);
        assert_eq!(bin_to_bcd(59), 0x59);

        assert_eq!(bcd_to_bin(0x00), 0);
        assert_eq!(bcd_to_bin(0x31), 31);
        assert_eq!(bcd_to_bin(0x59), 59);
    }

    #[test]
    fn bcd_round_trips_over_the_register_domain() {
        for value in 0..=99 {
            assert_eq!(bcd_to_bin(bin_to_bcd(value)), value);
        }
    }

    #[test]
    fn timekeeping_payload_targets_register_zero() {
        let fields = ClockFields {
            second: 0,
            minute: 30,
            hour: 18,
            day: 1,
            month: 7,
            year_offset: 25,
        };

        // 2025-07-01 18:30:00 as BCD, weekday padded with 1
        assert_eq!(
            fields.timekeeping_payload(),
            [SECONDS, 0x00, 0x30, 0x18, 1, 0x01, 0x07, 0x25]
        );
    }

    #[test]
    fn timekeeping_read_masks_control_bits() {
        // Century flag set in the month register, as the chip does after
        // a year rollover; the driver ignores it
        let raw = [0x40, 0x46, 0x18, 0x02, 0x01, 0x87, 0x25];
        assert_eq!(
            ClockFields::from_timekeeping(&raw),
            ClockFields {
                second: 40,
                minute: 46,
                hour: 18,
                day: 1,
                month: 7,
                year_offset: 25,
            }
        );
    }

    #[test]
    fn alarm1_payload_keeps_all_match_bits_clear() {
        let fields = ClockFields {
            second: 40,
            minute: 46,
            hour: 18,
            day: 1,
            month: 7,
            year_offset: 25,
        };

        let payload = fields.alarm1_payload();
        assert_eq!(payload[0], ALARM1_SECONDS);

        // A1M1-A1M4 are the top bits of each alarm register; exact match
        // means every one of them is zero, DY/DT included
        for byte in &payload[1..] {
            assert_eq!(byte & 0x80, 0);
        }
        assert_eq!(payload[4] & 0x40, 0);
    }
}
