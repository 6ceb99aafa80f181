//! Command buffer interpreter
//!
//! Consumes significant characters as hex pairs. In [`Mode::Normal`] each
//! pair is an output byte; output is collected and sent as one packet at the
//! end of every buffer. The wait marker `W` flushes pending output and makes
//! the next two pairs a little-endian millisecond delay, which is spun out
//! before decoding resumes.
//!
//! Mode, the half-decoded wait and a dangling hex digit all survive from one
//! buffer to the next, and from one source to the next.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::frame::{PacketSink, MAX_PAYLOAD};
use crate::source::{Characters, Source};
use crate::timing::{wait_duration, Waiter};
use crate::{FeedError, Result};

/// Number of characters collected before a buffer is processed
pub const CHUNK_SIZE: usize = 50;

/// Introduces a wait directive
pub const WAIT_MARKER: char = 'W';

/// What the next decoded hex pair means
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Pairs are output bytes
    #[default]
    Normal,
    /// Next pair is the low byte of a wait
    WaitLow,
    /// Next pair is the high byte of a wait; the wait runs once it arrives
    WaitHigh,
}

/// Totals for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Packets written to the device
    pub packets: usize,
    /// Payload bytes across all packets, framing excluded
    pub payload_bytes: usize,
    /// Wait directives executed
    pub waits: usize,
    /// Total time spent in waits
    pub waited: Duration,
}

/// Stateful interpreter writing packets to `S` and timing waits with `W`
pub struct Interpreter<S, W> {
    sink: S,
    waiter: W,
    mode: Mode,
    wait_low: u8,
    output: Vec<u8>,
    /// High nibble of a pair whose second digit hasn't arrived yet
    half: Option<u8>,
    /// 1-based index of the last character consumed in the current source
    position: usize,
    summary: RunSummary,
}

impl<S: PacketSink, W: Waiter> Interpreter<S, W> {
    /// Create an interpreter in [`Mode::Normal`]
    pub fn new(sink: S, waiter: W) -> Self {
        Self {
            sink,
            waiter,
            mode: Mode::Normal,
            wait_low: 0,
            output: Vec::with_capacity(CHUNK_SIZE / 2),
            half: None,
            position: 0,
            summary: RunSummary::default(),
        }
    }

    /// Current mode
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Totals so far
    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    /// Borrow the packet sink
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Give back the packet sink
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Process one buffer of characters, then send whatever output it produced.
    pub fn feed(&mut self, buffer: &[char]) -> Result<()> {
        for &c in buffer {
            self.position += 1;

            if c == WAIT_MARKER {
                self.begin_wait()?;
                continue;
            }

            let nibble = c
                .to_digit(16)
                .ok_or(FeedError::InvalidHexDigit {
                    character: c,
                    position: self.position,
                })? as u8;

            match self.half.take() {
                None => self.half = Some(nibble),
                Some(high) => self.dispatch(high << 4 | nibble)?,
            }
        }

        self.flush()
    }

    /// Feed a whole character stream in [`CHUNK_SIZE`] buffers, then check
    /// that it ended on a pair boundary.
    pub fn feed_source<I>(&mut self, name: &str, chars: I) -> Result<()>
    where
        I: IntoIterator<Item = char>,
    {
        debug!(source = name, mode = ?self.mode, "feeding source");
        self.position = 0;

        let mut buffer = Vec::with_capacity(CHUNK_SIZE);
        for c in chars {
            buffer.push(c);
            if buffer.len() == CHUNK_SIZE {
                self.feed(&buffer)?;
                buffer.clear();
            }
        }
        if !buffer.is_empty() {
            self.feed(&buffer)?;
        }

        self.finish_source(name)
    }

    /// Reject a source that ended with half a hex pair.
    pub fn finish_source(&mut self, name: &str) -> Result<()> {
        self.flush()?;
        if self.half.take().is_some() {
            return Err(FeedError::OddLength {
                source_name: name.to_string(),
            });
        }
        Ok(())
    }

    /// End the run. An unfinished wait directive is dropped.
    pub fn finish(&mut self) -> Result<RunSummary> {
        self.flush()?;
        if self.mode != Mode::Normal {
            warn!(mode = ?self.mode, "input ended inside a wait directive; wait skipped");
            self.mode = Mode::Normal;
        }

        info!(
            packets = self.summary.packets,
            bytes = self.summary.payload_bytes,
            waits = self.summary.waits,
            waited_ms = self.summary.waited.as_millis() as u64,
            "command stream complete"
        );
        Ok(self.summary)
    }

    fn begin_wait(&mut self) -> Result<()> {
        if self.half.is_some() {
            return Err(FeedError::DanglingMarker {
                position: self.position,
            });
        }
        if self.mode != Mode::Normal {
            debug!(mode = ?self.mode, "wait directive restarted");
        }
        self.flush()?;
        self.mode = Mode::WaitLow;
        Ok(())
    }

    fn dispatch(&mut self, byte: u8) -> Result<()> {
        match self.mode {
            Mode::Normal => {
                if self.output.len() == MAX_PAYLOAD {
                    self.flush()?;
                }
                self.output.push(byte);
            }
            Mode::WaitLow => {
                self.wait_low = byte;
                self.mode = Mode::WaitHigh;
            }
            Mode::WaitHigh => {
                let duration = wait_duration(self.wait_low, byte);
                self.mode = Mode::Normal;
                debug!(ms = duration.as_millis() as u64, "waiting");
                self.waiter.wait(duration);
                self.summary.waits += 1;
                self.summary.waited += duration;
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if self.output.is_empty() {
            return Ok(());
        }
        self.sink.send(&self.output)?;
        self.summary.packets += 1;
        self.summary.payload_bytes += self.output.len();
        self.output.clear();
        Ok(())
    }
}

/// Open every source up front.
///
/// All files are opened before the first packet is sent, so a missing file
/// never leaves the device half-programmed.
pub fn open_sources(sources: &[Source]) -> Result<Vec<(String, Characters)>> {
    if sources.is_empty() {
        return Err(FeedError::MissingSource);
    }
    sources
        .iter()
        .map(|source| -> Result<(String, Characters)> {
            Ok((source.name(), source.characters()?))
        })
        .collect()
}

/// Stream already opened sources, in order, through one interpreter.
pub fn run_streams<S, W>(
    streams: Vec<(String, Characters)>,
    sink: S,
    waiter: W,
) -> Result<RunSummary>
where
    S: PacketSink,
    W: Waiter,
{
    let mut interpreter = Interpreter::new(sink, waiter);
    for (name, chars) in streams {
        interpreter.feed_source(&name, chars)?;
    }
    interpreter.finish()
}

/// Open and stream `sources` to `sink`
pub fn run<S, W>(sources: &[Source], sink: S, waiter: W) -> Result<RunSummary>
where
    S: PacketSink,
    W: Waiter,
{
    let streams = open_sources(sources)?;
    run_streams(streams, sink, waiter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct Recorder {
        waits: Vec<Duration>,
    }

    impl Waiter for Recorder {
        fn wait(&mut self, duration: Duration) {
            self.waits.push(duration);
        }
    }

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_literal_bytes_one_packet() {
        let mut waiter = Recorder::default();
        let mut interp = Interpreter::new(Vec::<u8>::new(), &mut waiter);
        interp.feed(&chars("5AFF00")).unwrap();
        assert_eq!(interp.sink(), &vec![0x5A, 3, 0x5A, 0xFF, 0x00]);
        assert_eq!(interp.summary().packets, 1);
    }

    #[test]
    fn test_wait_flushes_and_waits() {
        let mut waiter = Recorder::default();
        let mut interp = Interpreter::new(Vec::<u8>::new(), &mut waiter);
        interp.feed(&chars("5AFFW000A")).unwrap();
        let summary = interp.finish().unwrap();
        let out = interp.into_sink();

        assert_eq!(out, vec![0x5A, 2, 0x5A, 0xFF]);
        assert_eq!(summary.waits, 1);
        assert_eq!(waiter.waits, vec![Duration::from_millis(2560)]);
    }

    #[test]
    fn test_mode_transitions() {
        let mut waiter = Recorder::default();
        let mut interp = Interpreter::new(Vec::<u8>::new(), &mut waiter);
        interp.feed(&chars("W")).unwrap();
        assert_eq!(interp.mode(), Mode::WaitLow);
        interp.feed(&chars("E8")).unwrap();
        assert_eq!(interp.mode(), Mode::WaitHigh);
        interp.feed(&chars("03")).unwrap();
        assert_eq!(interp.mode(), Mode::Normal);
        assert!(interp.sink().is_empty());
        assert_eq!(waiter.waits, vec![Duration::from_millis(1000)]);
    }

    #[test]
    fn test_half_pair_carries_between_buffers() {
        let mut waiter = Recorder::default();
        let mut interp = Interpreter::new(Vec::<u8>::new(), &mut waiter);
        interp.feed(&chars("0")).unwrap();
        interp.feed(&chars("1")).unwrap();
        assert_eq!(interp.sink(), &vec![0x5A, 1, 0x01]);
    }

    #[test]
    fn test_invalid_hex_digit() {
        let mut waiter = Recorder::default();
        let mut interp = Interpreter::new(Vec::<u8>::new(), &mut waiter);
        let err = interp.feed(&chars("5G")).unwrap_err();
        assert!(matches!(
            err,
            FeedError::InvalidHexDigit {
                character: 'G',
                position: 2
            }
        ));
    }

    #[test]
    fn test_marker_inside_pair() {
        let mut waiter = Recorder::default();
        let mut interp = Interpreter::new(Vec::<u8>::new(), &mut waiter);
        let err = interp.feed(&chars("015W")).unwrap_err();
        assert!(matches!(err, FeedError::DanglingMarker { position: 4 }));
    }

    #[test]
    fn test_repeated_marker_restarts_wait() {
        let mut waiter = Recorder::default();
        let mut interp = Interpreter::new(Vec::<u8>::new(), &mut waiter);
        interp.feed(&chars("W10W0500AA")).unwrap();
        assert_eq!(interp.sink(), &vec![0x5A, 1, 0xAA]);
        assert_eq!(waiter.waits, vec![Duration::from_millis(5)]);
    }

    #[test]
    fn test_odd_length_source() {
        let mut waiter = Recorder::default();
        let mut interp = Interpreter::new(Vec::<u8>::new(), &mut waiter);
        let err = interp.feed_source("inline data", chars("5A3")).unwrap_err();
        match err {
            FeedError::OddLength { source_name } => assert_eq!(source_name, "inline data"),
            other => panic!("expected OddLength, got {other:?}"),
        }
    }

    #[test]
    fn test_unfinished_wait_is_dropped() {
        let mut waiter = Recorder::default();
        let mut interp = Interpreter::new(Vec::<u8>::new(), &mut waiter);
        interp.feed_source("inline data", chars("01W05")).unwrap();
        let summary = interp.finish().unwrap();
        assert_eq!(summary.waits, 0);
        assert_eq!(interp.mode(), Mode::Normal);
        assert!(waiter.waits.is_empty());
    }

    #[test]
    fn test_output_never_exceeds_frame() {
        let mut waiter = Recorder::default();
        let mut interp = Interpreter::new(Vec::<u8>::new(), &mut waiter);
        // One oversized buffer, bypassing the chunking in feed_source
        let buffer: Vec<char> = "AB".repeat(300).chars().collect();
        interp.feed(&buffer).unwrap();
        let out = interp.into_sink();

        assert_eq!(out.len(), 2 + 255 + 2 + 45);
        assert_eq!(&out[..2], &[0x5A, 0xFF]);
        assert_eq!(&out[257..259], &[0x5A, 45]);
    }

    #[test]
    fn test_run_requires_source() {
        let err = run(&[], Vec::<u8>::new(), Recorder::default()).unwrap_err();
        assert!(matches!(err, FeedError::MissingSource));
    }
}
