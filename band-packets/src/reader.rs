use heapless::Vec;

use crate::{FrameError, TimeFrame, TIME_REQUEST};

/// Traffic the dock can put on the sync bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEvent {
    /// A complete calendar frame
    Frame(TimeFrame),
    /// The single-byte time poll
    TimeRequest,
    /// A byte dropped while hunting for the next frame boundary
    Rejected(FrameError),
}

/// Reassembles dock traffic from raw UART reads.
///
/// Bytes go in as they arrive; complete events come out of
/// [`poll_event`](Self::poll_event). A partial frame stays buffered until
/// its tail shows up or [`discard_stale`](Self::discard_stale) gives up
/// on it.
pub struct SyncReader<const N: usize> {
    pending: Vec<u8, N>,
}

impl<const N: usize> SyncReader<N> {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// Buffers freshly received bytes. Bytes past the capacity are
    /// dropped; the next quiet interval clears the jam.
    pub fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes).ok();
    }

    /// Next decodable event, or `None` once the buffer is empty or holds
    /// only the head of an unfinished frame.
    pub fn poll_event(&mut self) -> Option<SyncEvent> {
        if self.pending.is_empty() {
            return None;
        }

        // A poll byte can never start a frame; 0x3F fails the seconds
        // check
        if self.pending[0] == TIME_REQUEST {
            self.pending.remove(0);
            return Some(SyncEvent::TimeRequest);
        }

        match TimeFrame::decode_from_slice(&self.pending) {
            Ok((frame, consumed)) => {
                let rest = self.pending.len() - consumed;
                self.pending.rotate_left(consumed);
                self.pending.truncate(rest);
                Some(SyncEvent::Frame(frame))
            }

            // The rest of the frame has not arrived yet
            Err(FrameError::Truncated) => None,

            // Shift one byte and retry next call, in case we joined the
            // stream mid-frame
            Err(e) => {
                self.pending.remove(0);
                Some(SyncEvent::Rejected(e))
            }
        }
    }

    /// Drops a partial frame whose sender has gone quiet, returning the
    /// number of bytes discarded.
    ///
    /// A frame takes well under a millisecond on the wire, so a buffer
    /// still partial after a whole poll interval will never complete.
    /// Clearing it keeps a later poll byte from being read as frame
    /// data.
    pub fn discard_stale(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TIME_FRAME_LEN;
    use true_time::CalendarTime;

    const CAPACITY: usize = 2 * TIME_FRAME_LEN;

    fn noon_frame() -> TimeFrame {
        TimeFrame::from_calendar(&CalendarTime::new(2025, 8, 25, 12, 0, 0))
    }

    #[test]
    fn reassembles_a_frame_split_across_reads() {
        let mut reader: SyncReader<CAPACITY> = SyncReader::new();
        let bytes = noon_frame().as_bytes();

        reader.push(&bytes[..2]);
        assert_eq!(reader.poll_event(), None);

        reader.push(&bytes[2..]);
        assert_eq!(reader.poll_event(), Some(SyncEvent::Frame(noon_frame())));
        assert_eq!(reader.poll_event(), None);
    }

    #[test]
    fn answers_a_poll_packed_behind_a_frame() {
        let mut reader: SyncReader<CAPACITY> = SyncReader::new();
        let mut burst = [0u8; TIME_FRAME_LEN + 1];
        burst[..TIME_FRAME_LEN].copy_from_slice(&noon_frame().as_bytes());
        burst[TIME_FRAME_LEN] = TIME_REQUEST;

        reader.push(&burst);
        assert_eq!(reader.poll_event(), Some(SyncEvent::Frame(noon_frame())));
        assert_eq!(reader.poll_event(), Some(SyncEvent::TimeRequest));
        assert_eq!(reader.poll_event(), None);
    }

    #[test]
    fn poll_after_a_cut_off_frame_is_still_answered() {
        let mut reader: SyncReader<CAPACITY> = SyncReader::new();
        let bytes = noon_frame().as_bytes();

        // Undocked mid-frame; the tail never arrives
        reader.push(&bytes[..3]);
        assert_eq!(reader.poll_event(), None);
        assert_eq!(reader.discard_stale(), 3);

        // A poll on the next docking must not vanish into the stale
        // partial
        reader.push(&[TIME_REQUEST]);
        assert_eq!(reader.poll_event(), Some(SyncEvent::TimeRequest));
    }

    #[test]
    fn resynchronizes_past_a_corrupt_byte() {
        let mut reader: SyncReader<CAPACITY> = SyncReader::new();
        let mut burst = [0u8; TIME_FRAME_LEN + 1];
        burst[0] = 200;
        burst[1..].copy_from_slice(&noon_frame().as_bytes());

        reader.push(&burst);
        assert_eq!(
            reader.poll_event(),
            Some(SyncEvent::Rejected(FrameError::OutOfRange {
                field: "second",
                value: 200
            }))
        );
        assert_eq!(reader.poll_event(), Some(SyncEvent::Frame(noon_frame())));
    }

    #[test]
    fn quiet_line_with_nothing_buffered_discards_nothing() {
        let mut reader: SyncReader<CAPACITY> = SyncReader::new();
        assert_eq!(reader.discard_stale(), 0);
    }
}
