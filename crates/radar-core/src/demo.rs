//! Demo event sources.
//!
//! Decoding the engine's binary demo format is left to an external
//! decoder. The relay consumes its output through [`DemoEventSource`]: a
//! header first, then an ordered, finite run of snapshots ending in
//! end-of-stream or a [`DecodeError`].
//!
//! [`JsonLinesDemo`] reads the decoder's JSON-lines export, one object
//! per line:
//!
//! ```text
//! {"type":"header","map_name":"de_dust2","map_crc":3048473432}
//! {"type":"tick","tick":1,"participants":[{"name":"a","alive":true,"x":1.0,"y":2.0,"z":3.0}]}
//! {"type":"end"}
//! ```
//!
//! The `end` footer is required; a stream that stops without it was
//! truncated.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use radar_types::{DemoHeader, Participant, Snapshot, WorldPosition};
use serde::Deserialize;

/// Errors produced while decoding a demo stream.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Reading the underlying stream failed.
    #[error("demo read failed: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// The stream did not start with a header.
    #[error("demo stream has no header before its first snapshot")]
    MissingHeader,

    /// A line could not be decoded.
    #[error("malformed demo line {line}: {message}")]
    Malformed {
        /// 1-based line number.
        line: usize,
        /// What was wrong with it.
        message: String,
    },

    /// Snapshots arrived with a non-increasing tick number.
    #[error("tick {tick} follows tick {previous}")]
    OutOfOrder {
        /// Tick of the preceding snapshot.
        previous: u64,
        /// Tick that broke the ordering.
        tick: u64,
    },

    /// The stream ended before its end-of-stream marker.
    #[error("demo stream truncated after {snapshots} snapshots")]
    Truncated {
        /// Snapshots successfully decoded before the cut.
        snapshots: u64,
    },
}

/// An ordered producer of demo data.
///
/// Implementations block while decoding. Callers must read the header
/// before asking for snapshots.
pub trait DemoEventSource {
    /// Block until the header has been decoded and return it.
    ///
    /// Calling this again returns the same header.
    fn await_header(&mut self) -> Result<DemoHeader, DecodeError>;

    /// Decode the next snapshot. `Ok(None)` means end-of-stream.
    fn next_snapshot(&mut self) -> Result<Option<Snapshot>, DecodeError>;
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Line {
    Header {
        map_name: String,
        map_crc: u32,
    },
    Tick {
        tick: u64,
        #[serde(default)]
        participants: Vec<RawParticipant>,
    },
    End,
}

#[derive(Debug, Deserialize)]
struct RawParticipant {
    name: String,
    alive: bool,
    x: f64,
    y: f64,
}

impl From<RawParticipant> for Participant {
    fn from(raw: RawParticipant) -> Self {
        Self {
            name: raw.name,
            alive: raw.alive,
            position: WorldPosition::new(raw.x, raw.y),
        }
    }
}

/// [`DemoEventSource`] over a decoder's JSON-lines export.
#[derive(Debug)]
pub struct JsonLinesDemo<R> {
    reader: R,
    buf: String,
    line: usize,
    header: Option<DemoHeader>,
    last_tick: Option<u64>,
    snapshots: u64,
    finished: bool,
}

impl JsonLinesDemo<BufReader<File>> {
    /// Open an export on disk.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be opened.
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> JsonLinesDemo<R> {
    /// Wrap a buffered reader.
    pub const fn new(reader: R) -> Self {
        Self {
            reader,
            buf: String::new(),
            line: 0,
            header: None,
            last_tick: None,
            snapshots: 0,
            finished: false,
        }
    }

    /// Number of snapshots decoded so far.
    pub const fn snapshots_read(&self) -> u64 {
        self.snapshots
    }

    fn read_line(&mut self) -> Result<Option<Line>, DecodeError> {
        loop {
            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line = self.line.saturating_add(1);
            let text = self.buf.trim();
            if text.is_empty() {
                continue;
            }
            return serde_json::from_str(text)
                .map(Some)
                .map_err(|e| DecodeError::Malformed {
                    line: self.line,
                    message: e.to_string(),
                });
        }
    }
}

impl<R: BufRead> DemoEventSource for JsonLinesDemo<R> {
    fn await_header(&mut self) -> Result<DemoHeader, DecodeError> {
        if let Some(header) = &self.header {
            return Ok(header.clone());
        }
        match self.read_line()? {
            Some(Line::Header { map_name, map_crc }) => {
                let header = DemoHeader { map_name, map_crc };
                self.header = Some(header.clone());
                Ok(header)
            }
            Some(Line::Tick { .. } | Line::End) | None => Err(DecodeError::MissingHeader),
        }
    }

    fn next_snapshot(&mut self) -> Result<Option<Snapshot>, DecodeError> {
        if self.header.is_none() {
            return Err(DecodeError::MissingHeader);
        }
        if self.finished {
            return Ok(None);
        }
        match self.read_line()? {
            Some(Line::Tick { tick, participants }) => {
                if let Some(previous) = self.last_tick {
                    if tick <= previous {
                        return Err(DecodeError::OutOfOrder { previous, tick });
                    }
                }
                self.last_tick = Some(tick);
                self.snapshots = self.snapshots.saturating_add(1);
                Ok(Some(Snapshot {
                    tick,
                    participants: participants.into_iter().map(Participant::from).collect(),
                }))
            }
            Some(Line::End) => {
                self.finished = true;
                Ok(None)
            }
            Some(Line::Header { .. }) => Err(DecodeError::Malformed {
                line: self.line,
                message: String::from("duplicate header"),
            }),
            None => Err(DecodeError::Truncated {
                snapshots: self.snapshots,
            }),
        }
    }
}
