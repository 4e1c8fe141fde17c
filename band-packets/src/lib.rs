#![cfg_attr(not(test), no_std)]

pub mod reader;

use defmt::Format;
use true_time::calendar::days_in_month;
use true_time::CalendarTime;

/// Length of a calendar frame on the sync bus
pub const TIME_FRAME_LEN: usize = 6;

/// Single-byte poll asking the band for its current corrected time.
///
/// 0x3F is above any valid seconds field, so a request can never be
/// mistaken for the first byte of a calendar frame.
pub const TIME_REQUEST: u8 = 0x3F;

/// A calendar instant as it travels over the sync bus.
///
/// Six bytes, least-significant field first, year as an offset from 2000
/// to fit the century in one byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub struct TimeFrame {
    pub second: u8,
    pub minute: u8,
    pub hour: u8,
    pub day: u8,
    pub month: u8,
    /// Years since 2000
    pub year_offset: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum FrameError {
    /// Fewer than [`TIME_FRAME_LEN`] bytes available
    Truncated,
    /// A field landed outside its calendar range
    OutOfRange { field: &'static str, value: u8 },
}

impl TimeFrame {
    /// Pack a calendar time for the wire.
    ///
    /// The year must fall in 2000-2099; times the band produces always do.
    pub fn from_calendar(time: &CalendarTime) -> Self {
        Self {
            second: time.second as u8,
            minute: time.minute as u8,
            hour: time.hour as u8,
            day: time.day as u8,
            month: time.month as u8,
            year_offset: (time.year - 2000) as u8,
        }
    }

    /// Expand a validated frame back into a calendar time
    pub fn to_calendar(self) -> CalendarTime {
        CalendarTime::new(
            2000 + self.year_offset as i32,
            self.month as i32,
            self.day as i32,
            self.hour as i32,
            self.minute as i32,
            self.second as i32,
        )
    }

    pub fn as_bytes(&self) -> [u8; TIME_FRAME_LEN] {
        [
            self.second,
            self.minute,
            self.hour,
            self.day,
            self.month,
            self.year_offset,
        ]
    }

    /// Encodes this frame into a slice, returning the number of bytes
    /// written, or an error if the slice is too small
    pub fn encode_into_slice(&self, destination: &mut [u8]) -> Result<usize, FrameError> {
        if destination.len() < TIME_FRAME_LEN {
            return Err(FrameError::Truncated);
        }

        destination[..TIME_FRAME_LEN].copy_from_slice(&self.as_bytes());
        Ok(TIME_FRAME_LEN)
    }

    /// Attempts to decode a frame from the buffer, returning itself and
    /// the number of bytes read if every field is in calendar range
    pub fn decode_from_slice(bytes: &[u8]) -> Result<(Self, usize), FrameError> {
        if bytes.len() < TIME_FRAME_LEN {
            return Err(FrameError::Truncated);
        }

        let frame = Self {
            second: bytes[0],
            minute: bytes[1],
            hour: bytes[2],
            day: bytes[3],
            month: bytes[4],
            year_offset: bytes[5],
        };

        if frame.second > 59 {
            return Err(FrameError::OutOfRange {
                field: "second",
                value: frame.second,
            });
        }

        if frame.minute > 59 {
            return Err(FrameError::OutOfRange {
                field: "minute",
                value: frame.minute,
            });
        }

        if frame.hour > 23 {
            return Err(FrameError::OutOfRange {
                field: "hour",
                value: frame.hour,
            });
        }

        if frame.month < 1 || frame.month > 12 {
            return Err(FrameError::OutOfRange {
                field: "month",
                value: frame.month,
            });
        }

        // The RTC keeps the year as two BCD digits, so the century ends
        // at 2099; anything past that would write garbage registers
        if frame.year_offset > 99 {
            return Err(FrameError::OutOfRange {
                field: "year_offset",
                value: frame.year_offset,
            });
        }

        // Day range depends on the month and year just validated, leap
        // years included
        let month_days = days_in_month(frame.month as i32, 2000 + frame.year_offset as i32);
        if frame.day < 1 || frame.day as i32 > month_days {
            return Err(FrameError::OutOfRange {
                field: "day",
                value: frame.day,
            });
        }

        Ok((frame, TIME_FRAME_LEN))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_through_the_wire() {
        let time = CalendarTime::new(2025, 7, 1, 18, 30, 0);

        let frame = TimeFrame::from_calendar(&time);
        let mut buf = [0u8; TIME_FRAME_LEN];
        let written = frame.encode_into_slice(&mut buf).unwrap();
        assert_eq!(written, TIME_FRAME_LEN);

        let (decoded, read) = TimeFrame::decode_from_slice(&buf).unwrap();
        assert_eq!(read, TIME_FRAME_LEN);
        assert_eq!(decoded.to_calendar(), time);
    }

    #[test]
    fn wire_order_is_least_significant_field_first() {
        let frame = TimeFrame::from_calendar(&CalendarTime::new(2025, 12, 31, 23, 30, 0));
        assert_eq!(frame.as_bytes(), [0, 30, 23, 31, 12, 25]);
    }

    #[test]
    fn encode_into_too_small_slice_returns_error() {
        let frame = TimeFrame::from_calendar(&CalendarTime::default());
        let mut small_buf = [0u8; 3];
        assert_eq!(
            frame.encode_into_slice(&mut small_buf),
            Err(FrameError::Truncated)
        );
    }

    #[test]
    fn decode_rejects_short_buffer() {
        assert_eq!(
            TimeFrame::decode_from_slice(&[0, 30, 23]),
            Err(FrameError::Truncated)
        );
    }

    #[test]
    fn decode_rejects_out_of_range_seconds() {
        assert_eq!(
            TimeFrame::decode_from_slice(&[60, 0, 0, 1, 1, 25]),
            Err(FrameError::OutOfRange {
                field: "second",
                value: 60
            })
        );
    }

    #[test]
    fn decode_rejects_month_zero() {
        assert_eq!(
            TimeFrame::decode_from_slice(&[0, 0, 0, 1, 0, 25]),
            Err(FrameError::OutOfRange {
                field: "month",
                value: 0
            })
        );
    }

    #[test]
    fn decode_checks_day_against_leap_rules() {
        // February 29th exists in 2024
        let (frame, _) = TimeFrame::decode_from_slice(&[0, 0, 0, 29, 2, 24]).unwrap();
        assert_eq!(frame.to_calendar(), CalendarTime::new(2024, 2, 29, 0, 0, 0));

        // but not in 2025
        assert_eq!(
            TimeFrame::decode_from_slice(&[0, 0, 0, 29, 2, 25]),
            Err(FrameError::OutOfRange {
                field: "day",
                value: 29
            })
        );
    }

    #[test]
    fn decode_rejects_years_past_the_rtc_century() {
        assert_eq!(
            TimeFrame::decode_from_slice(&[0, 0, 0, 1, 1, 255]),
            Err(FrameError::OutOfRange {
                field: "year_offset",
                value: 255
            })
        );
    }

    #[test]
    fn decode_accepts_the_last_year_of_the_century() {
        let (frame, _) = TimeFrame::decode_from_slice(&[0, 0, 0, 31, 12, 99]).unwrap();
        assert_eq!(frame.to_calendar(), CalendarTime::new(2099, 12, 31, 0, 0, 0));
    }

    #[test]
    fn request_byte_never_decodes_as_a_frame() {
        // A buffer starting with TIME_REQUEST always fails the seconds
        // check, which is what makes the single-byte poll unambiguous
        let polled = [TIME_REQUEST, 0, 0, 1, 1, 25];
        assert_eq!(
            TimeFrame::decode_from_slice(&polled),
            Err(FrameError::OutOfRange {
                field: "second",
                value: TIME_REQUEST
            })
        );
    }
}
