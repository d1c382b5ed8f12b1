//! Chunked `Transfer-Encoding` bodies ([RFC 7230 §4.1](https://tools.ietf.org/html/rfc7230#section-4.1)).
//!
//! Bytes are consumed from the source buffer as they are understood, so whatever is left
//! in the buffer after a `None` result is exactly the unprocessed remainder the caller
//! must keep in front of the next read. A partially received chunk is not an error.

use crate::protocol::{KeyValueList, ParseError, PayloadItem};
use bytes::{Buf, Bytes, BytesMut};
use std::task::Poll;
use tokio_util::codec::Decoder;
use tracing::{debug, trace};
use ChunkedState::*;

/// Trailer lines longer than this are dropped instead of being buffered
const MAX_TRAILER_LINE: usize = 1024;

/// Byte-at-a-time state machine over `<hex-size>[;ext]CRLF<data>CRLF ... 0CRLF[trailer]CRLF`.
///
/// Chunk data is handed out as soon as any of it is buffered, possibly in several pieces
/// per chunk. Only a trailer line whose name matches the advertised `Trailer` header is kept,
/// malformed or unexpected trailer lines are skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedDecoder {
    state: ChunkedState,
    remaining_size: u64,
    trailer: Option<String>,
    trailer_line: Vec<u8>,
    trailers: KeyValueList,
}

impl ChunkedDecoder {
    pub fn new() -> Self {
        Self::with_trailer(None)
    }

    /// Creates a decoder that keeps the trailer field named `trailer`.
    pub fn with_trailer(trailer: Option<String>) -> Self {
        Self { state: SizeStart, remaining_size: 0, trailer, trailer_line: Vec::new(), trailers: KeyValueList::new() }
    }

    /// Bytes still owed for the chunk currently being read
    pub fn remaining_size(&self) -> u64 {
        if self.state == Body { self.remaining_size } else { 0 }
    }

    /// Takes the trailer fields collected after the last chunk
    pub fn take_trailers(&mut self) -> KeyValueList {
        std::mem::take(&mut self.trailers)
    }
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkedState {
    /// first byte of a size line, must be a hex digit
    SizeStart,
    Size,
    SizeLws,
    /// `;name=value` after the size, ignored
    Extension,
    SizeLf,
    Body,
    BodyCr,
    BodyLf,
    /// a line after the terminal chunk, buffered in `trailer_line`
    Trailer,
    TrailerLf,
    EndCr,
    EndLf,
    End,
}

impl Decoder for ChunkedDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            if self.state == End {
                trace!("finished reading chunked data");
                return Ok(Some(PayloadItem::Eof));
            }

            if src.is_empty() {
                return Ok(None);
            }

            let mut buf = None;

            self.state = match self.step(src, &mut buf) {
                Poll::Pending => return Ok(None),
                Poll::Ready(Ok(new_state)) => new_state,
                Poll::Ready(Err(e)) => return Err(e),
            };

            if let Some(bytes) = buf {
                trace!(len = bytes.len(), "read chunked bytes");
                return Ok(Some(PayloadItem::Chunk(bytes)));
            }
        }
    }
}

macro_rules! try_next_byte {
    ($src:ident) => {{
        if $src.len() > 0 {
            $src.get_u8()
        } else {
            return Poll::Pending;
        }
    }};
}

type Step = Poll<Result<ChunkedState, ParseError>>;

impl ChunkedDecoder {
    /// Processes the next step in the chunked decoding state machine.
    fn step(&mut self, src: &mut BytesMut, buf: &mut Option<Bytes>) -> Step {
        match self.state {
            SizeStart => read_size_start(src, &mut self.remaining_size),
            Size => read_size(src, &mut self.remaining_size),
            SizeLws => read_size_lws(src),
            Extension => read_extension(src),
            SizeLf => read_size_lf(src, self.remaining_size),
            Body => read_body(src, &mut self.remaining_size, buf),
            BodyCr => read_body_cr(src),
            BodyLf => read_body_lf(src),
            Trailer => self.read_trailer(src),
            TrailerLf => self.read_trailer_lf(src),
            EndCr => self.read_end_cr(src),
            EndLf => read_end_lf(src),
            End => Poll::Ready(Ok(End)),
        }
    }

    /// Collects a trailer line byte by byte until its CR.
    fn read_trailer(&mut self, src: &mut BytesMut) -> Step {
        match try_next_byte!(src) {
            b'\r' => Poll::Ready(Ok(TrailerLf)),
            b => {
                if self.trailer_line.len() < MAX_TRAILER_LINE {
                    self.trailer_line.push(b);
                }
                Poll::Ready(Ok(Trailer))
            }
        }
    }

    /// Validates the LF after a trailer line and keeps the line if it is the advertised field.
    fn read_trailer_lf(&mut self, src: &mut BytesMut) -> Step {
        match try_next_byte!(src) {
            b'\n' => {
                let line = std::mem::take(&mut self.trailer_line);
                self.accept_trailer(&line);
                Poll::Ready(Ok(EndCr))
            }
            _ => Poll::Ready(Err(ParseError::invalid_chunk("invalid trailer end LF"))),
        }
    }

    /// Expects the final CR; anything else starts a trailer line.
    fn read_end_cr(&mut self, src: &mut BytesMut) -> Step {
        match try_next_byte!(src) {
            b'\r' => Poll::Ready(Ok(EndLf)),
            b => {
                self.trailer_line.clear();
                self.trailer_line.push(b);
                Poll::Ready(Ok(Trailer))
            }
        }
    }

    fn accept_trailer(&mut self, line: &[u8]) {
        let Some(advertised) = self.trailer.as_deref() else {
            debug!("ignore trailer without advertised trailer field");
            return;
        };

        let Some((key, value)) = std::str::from_utf8(line).ok().and_then(|line| line.split_once(':')) else {
            debug!("ignore malformed trailer line");
            return;
        };

        let key = key.trim();
        if !key.eq_ignore_ascii_case(advertised) {
            debug!(trailer = key, "ignore trailer not advertised");
            return;
        }

        if let Err(e) = self.trailers.push(key, value.trim()) {
            debug!(cause = %e, "ignore oversize trailer");
        }
    }
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b + 10 - b'a'),
        b'A'..=b'F' => Some(b + 10 - b'A'),
        _ => None,
    }
}

/// Reads the first byte of a size line, which has to be a hex digit.
fn read_size_start(src: &mut BytesMut, size_per_chunk: &mut u64) -> Step {
    match hex_digit(try_next_byte!(src)) {
        Some(digit) => {
            *size_per_chunk = u64::from(digit);
            Poll::Ready(Ok(Size))
        }
        None => Poll::Ready(Err(ParseError::invalid_chunk("invalid chunk size line: missing size"))),
    }
}

/// Reads and parses the chunk size in hexadecimal format.
///
/// # State Transitions
/// - On hex digit (0-9, a-f, A-F): Stay in Size state to read more digits
/// - On whitespace (tab/space): Transition to SizeLws state
/// - On semicolon: Transition to Extension state to handle chunk extensions
/// - On CR: Transition to SizeLf state to finish size line
/// - On invalid character: Return error
fn read_size(src: &mut BytesMut, size_per_chunk: &mut u64) -> Step {
    macro_rules! or_overflow {
        ($e:expr) => {
            match $e {
                Some(val) => val,
                None => return Poll::Ready(Err(ParseError::invalid_chunk("invalid overflow chunked length"))),
            }
        };
    }

    let digit = match try_next_byte!(src) {
        b'\t' | b' ' => return Poll::Ready(Ok(SizeLws)),
        b';' => return Poll::Ready(Ok(Extension)),
        b'\r' => return Poll::Ready(Ok(SizeLf)),
        b => match hex_digit(b) {
            Some(digit) => digit,
            None => return Poll::Ready(Err(ParseError::invalid_chunk("invalid chunk size line: Invalid Size"))),
        },
    };

    *size_per_chunk = or_overflow!(size_per_chunk.checked_mul(16));
    *size_per_chunk = or_overflow!(size_per_chunk.checked_add(u64::from(digit)));

    Poll::Ready(Ok(Size))
}

/// Processes linear whitespace (LWS) after the chunk size.
fn read_size_lws(src: &mut BytesMut) -> Step {
    match try_next_byte!(src) {
        // LWS can follow the chunk size, but no more digits can come
        b'\t' | b' ' => Poll::Ready(Ok(SizeLws)),
        b';' => Poll::Ready(Ok(Extension)),
        b'\r' => Poll::Ready(Ok(SizeLf)),
        _ => Poll::Ready(Err(ParseError::invalid_chunk("invalid chunk size linear white space"))),
    }
}

/// Skips chunk extensions up to the CR of the size line.
fn read_extension(src: &mut BytesMut) -> Step {
    // Extensions "end" at the next CRLF. A plain LF inside one is rejected so a
    // peer that forgot the CR can't smuggle data past us.
    match try_next_byte!(src) {
        b'\r' => Poll::Ready(Ok(SizeLf)),
        b'\n' => Poll::Ready(Err(ParseError::invalid_chunk("invalid chunk extension contains newline"))),
        _ => Poll::Ready(Ok(Extension)),
    }
}

/// Validates the LF byte after the chunk size line; size 0 is the last chunk.
fn read_size_lf(src: &mut BytesMut, size_per_chunk: u64) -> Step {
    match try_next_byte!(src) {
        b'\n' if size_per_chunk == 0 => Poll::Ready(Ok(EndCr)),
        b'\n' => Poll::Ready(Ok(Body)),
        _ => Poll::Ready(Err(ParseError::invalid_chunk("invalid chunk size LF"))),
    }
}

/// Reads up to `size_per_chunk` bytes of chunk data.
fn read_body(src: &mut BytesMut, size_per_chunk: &mut u64, buf: &mut Option<Bytes>) -> Step {
    if src.is_empty() {
        return Poll::Ready(Ok(Body));
    }

    if *size_per_chunk == 0 {
        return Poll::Ready(Ok(BodyCr));
    }

    // cap remaining bytes at the max capacity of usize
    let remaining = usize::try_from(*size_per_chunk).unwrap_or(usize::MAX);
    let read_size = std::cmp::min(remaining, src.len());

    *size_per_chunk -= read_size as u64;
    *buf = Some(src.split_to(read_size).freeze());

    if *size_per_chunk > 0 { Poll::Ready(Ok(Body)) } else { Poll::Ready(Ok(BodyCr)) }
}

fn read_body_cr(src: &mut BytesMut) -> Step {
    match try_next_byte!(src) {
        b'\r' => Poll::Ready(Ok(BodyLf)),
        _ => Poll::Ready(Err(ParseError::invalid_chunk("invalid chunk body CR"))),
    }
}

fn read_body_lf(src: &mut BytesMut) -> Step {
    match try_next_byte!(src) {
        b'\n' => Poll::Ready(Ok(SizeStart)),
        _ => Poll::Ready(Err(ParseError::invalid_chunk("invalid chunk body LF"))),
    }
}

fn read_end_lf(src: &mut BytesMut) -> Step {
    match try_next_byte!(src) {
        b'\n' => Poll::Ready(Ok(End)),
        _ => Poll::Ready(Err(ParseError::invalid_chunk("invalid chunk end LF"))),
    }
}
