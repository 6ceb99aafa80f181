//! # Buzzfeed Core Library
//!
//! Core functionality for streaming command buffers to a serial buzzer or
//! feedback controller.

#![warn(missing_docs)]

//!
//! This library provides:
//! - Command source reading (inline strings and commented text files)
//! - The command buffer interpreter with timed wait directives
//! - Packet framing for the controller's wire format
//! - Serial port settings and opening
//!
//! ## Input format
//!
//! Input is a sequence of hex digit pairs, each one an output byte. Whitespace
//! is ignored and `;` starts a comment that runs to the end of the line (files
//! only). `W` followed by two pairs `lo hi` pauses for `lo + hi * 256`
//! milliseconds, flushing any bytes collected so far beforehand.
//!
//! ## Example
//!
//! ```rust,ignore
//! use buzzfeed_core::{open_port, run, PortSettings, Source, SpinWait};
//!
//! let settings = PortSettings::default();
//! let port = open_port(&settings)?;
//! let summary = run(&[Source::Inline("5AFF W E803 3C".into())], port, SpinWait)?;
//! println!("sent {} packets", summary.packets);
//! ```

mod error;
pub mod frame;
pub mod interpreter;
pub mod serial;
pub mod source;
pub mod timing;

pub use error::{FeedError, Result};
pub use frame::{Frame, PacketSink, FRAME_MARKER, MAX_PAYLOAD};
pub use interpreter::{
    open_sources, run, run_streams, Interpreter, Mode, RunSummary, CHUNK_SIZE, WAIT_MARKER,
};
pub use serial::{open_port, Parity, PortSettings, DEFAULT_BAUD_RATE, DEFAULT_DEVICE};
pub use source::{Characters, Source};
pub use timing::{wait_duration, SpinWait, Waiter};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
