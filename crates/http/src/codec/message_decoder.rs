//! Incremental HTTP message decoder
//!
//! [`MessageDecoder`] rebuilds a whole HTTP/1.x message from a stream of arbitrary sized
//! reads. It is driven through the [`Decoder`] trait: the caller appends every read to one
//! [`BytesMut`] and calls `decode` until it yields a message.
//!
//! - `Ok(Some(message))`: a complete message was decoded and removed from the buffer,
//!   pipelined bytes of the next message stay in place
//! - `Ok(None)`: need more input, the buffer holds only unprocessed bytes
//! - `Err(ParseError)`: the input is malformed or exceeds the [`ParserLimits`]
//!
//! # State Machine
//!
//! ```text
//! HeaderLine -> ParameterLines -> Body -> Done
//! ```
//!
//! Progress lives in a [`ParseCursor`], so a call may stop in the middle of any line or
//! body and the next call picks up where the previous one stopped. The cursor is reset
//! once a message is handed out, which makes the decoder reusable across keep-alive
//! exchanges on the same connection.
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use embed_http::codec::RequestDecoder;
//! use tokio_util::codec::Decoder;
//!
//! let mut decoder = RequestDecoder::new();
//! let mut buffer = BytesMut::from("GET /index.html HTTP/1.1\r\nHost: x\r\n");
//! assert!(decoder.decode(&mut buffer).unwrap().is_none());
//!
//! buffer.extend_from_slice(b"\r\n");
//! let request = decoder.decode(&mut buffer).unwrap().unwrap();
//! assert_eq!(request.path(), "/index.html");
//! ```

use std::marker::PhantomData;

use bytes::{Bytes, BytesMut};
use tokio_util::codec::Decoder;
use tracing::{debug, trace};

use crate::codec::body::PayloadDecoder;
use crate::codec::header::HeaderDecoder;
use crate::ensure;
use crate::protocol::{
    HttpMessage, KeyValueList, MessageFields, ParseError, ParserLimits, PayloadItem, RequestLine, StartLine, StatusLine,
};

/// Decoder for incoming requests
pub type RequestDecoder = MessageDecoder<RequestLine>;

/// Decoder for incoming responses
pub type ResponseDecoder = MessageDecoder<StatusLine>;

/// Which part of the message the decoder expects next.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParseState {
    /// The request line or status line
    #[default]
    HeaderLine,
    /// Header lines up to the empty line
    ParameterLines,
    /// The entity, framed by content length or chunked encoding
    Body,
    /// The message is complete and ready to be handed out
    Done,
}

/// Resumption state of the message currently being decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseCursor {
    state: ParseState,
    /// Offset in the unprocessed input where the scan for the next line terminator resumes
    sentence_start: usize,
    content_len: Option<u64>,
    /// Entity bytes accumulated so far
    message_len: u64,
    /// Bytes still owed for the chunk in flight
    chunked_remain: u64,
    /// Wire bytes of this message already consumed from the input
    consumed: usize,
}

impl ParseCursor {
    pub fn state(&self) -> ParseState {
        self.state
    }

    pub fn sentence_start(&self) -> usize {
        self.sentence_start
    }

    /// Declared body length, known once the header block ended
    pub fn content_len(&self) -> Option<u64> {
        self.content_len
    }

    pub fn message_len(&self) -> u64 {
        self.message_len
    }

    pub fn chunked_remain(&self) -> u64 {
        self.chunked_remain
    }

    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Nothing of a message has been seen yet
    pub fn is_idle(&self) -> bool {
        self.state == ParseState::HeaderLine && self.consumed == 0 && self.sentence_start == 0
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Decodes one complete message with start line `L` at a time.
#[derive(Debug)]
pub struct MessageDecoder<L> {
    limits: ParserLimits,
    header_decoder: HeaderDecoder,
    cursor: ParseCursor,
    line: Option<L>,
    headers: KeyValueList,
    fields: MessageFields,
    payload_decoder: Option<PayloadDecoder>,
    /// The first entity chunk, kept as is while it is the only one
    entity: Option<Bytes>,
    /// Concatenation of entity chunks once a second chunk arrived
    entity_buf: BytesMut,
    _line: PhantomData<fn() -> L>,
}

impl<L: StartLine> MessageDecoder<L> {
    pub fn new() -> Self {
        Self::with_limits(ParserLimits::default())
    }

    pub fn with_limits(limits: ParserLimits) -> Self {
        Self {
            limits,
            header_decoder: HeaderDecoder::new(limits.max_headers),
            cursor: ParseCursor::default(),
            line: None,
            headers: limits.new_key_value_list(),
            fields: MessageFields::default(),
            payload_decoder: None,
            entity: None,
            entity_buf: BytesMut::new(),
            _line: PhantomData,
        }
    }

    pub fn limits(&self) -> &ParserLimits {
        &self.limits
    }

    pub fn cursor(&self) -> &ParseCursor {
        &self.cursor
    }

    /// Drops any partially decoded message.
    pub fn reset(&mut self) {
        self.cursor.reset();
        self.line = None;
        self.headers.clear();
        self.fields = MessageFields::default();
        self.payload_decoder = None;
        self.entity = None;
        self.entity_buf.clear();
    }

    /// Takes the next line out of `src`, without its line terminator.
    ///
    /// The scan resumes at `sentence_start` so a long line arriving in many reads is not
    /// rescanned from its beginning each time.
    fn next_line(&mut self, src: &mut BytesMut) -> Result<Option<BytesMut>, ParseError> {
        let max_line_len = self.limits.max_line_len;
        let start = self.cursor.sentence_start.min(src.len());

        let Some(pos) = src[start..].iter().position(|b| *b == b'\n') else {
            self.cursor.sentence_start = src.len();
            // the pending CR may already be in the buffer
            ensure!(src.len() <= max_line_len + 1, ParseError::too_long_line(src.len(), max_line_len));
            self.check_size(src.len())?;
            return Ok(None);
        };

        let end = start + pos;
        let mut line = src.split_to(end + 1);
        self.cursor.consumed += line.len();
        self.cursor.sentence_start = 0;

        line.truncate(end);
        if line.last() == Some(&b'\r') {
            line.truncate(end - 1);
        }

        ensure!(line.len() <= max_line_len, ParseError::too_long_line(line.len(), max_line_len));
        Ok(Some(line))
    }

    /// Fails when the message so far plus `pending` unprocessed bytes exceed the size bound.
    fn check_size(&self, pending: usize) -> Result<(), ParseError> {
        let current_size = self.cursor.consumed.saturating_add(pending);
        ensure!(current_size <= self.limits.max_message_size, ParseError::too_large_message(current_size, self.limits.max_message_size));
        Ok(())
    }

    fn parse_start_line(&mut self, line: &[u8]) -> Result<(), ParseError> {
        let line = std::str::from_utf8(line).map_err(|_| ParseError::invalid_start_line("start line is not utf-8"))?;
        trace!(line, "parsed start line");
        self.line = Some(L::parse(line)?);
        self.cursor.state = ParseState::ParameterLines;
        Ok(())
    }

    /// Picks the payload decoder once the header block ended.
    fn start_body(&mut self) -> Result<(), ParseError> {
        let payload_decoder = match (self.fields.chunked, self.fields.content_len) {
            (true, Some(_)) => {
                return Err(ParseError::invalid_content_length("transfer_encoding and content_length both present in headers"));
            }
            (true, None) => PayloadDecoder::chunked(self.fields.trailer.clone()),
            (false, None) | (false, Some(0)) => PayloadDecoder::empty(),
            (false, Some(length)) => {
                let total = u64::try_from(self.cursor.consumed).unwrap_or(u64::MAX).saturating_add(length);
                let max_size = self.limits.max_message_size;
                ensure!(
                    total <= max_size as u64,
                    ParseError::too_large_message(usize::try_from(total).unwrap_or(usize::MAX), max_size)
                );
                PayloadDecoder::fix_length(length)
            }
        };

        trace!(content_len = ?self.fields.content_len, chunked = self.fields.chunked, "start reading body");
        self.cursor.content_len = self.fields.content_len;
        self.payload_decoder = Some(payload_decoder);
        self.cursor.state = ParseState::Body;
        Ok(())
    }

    fn decode_body(&mut self, src: &mut BytesMut) -> Result<bool, ParseError> {
        let Some(payload_decoder) = self.payload_decoder.as_mut() else {
            self.cursor.state = ParseState::Done;
            return Ok(true);
        };

        let before = src.len();
        let item = payload_decoder.decode(src)?;
        self.cursor.consumed += before - src.len();
        self.cursor.chunked_remain = payload_decoder.chunked_remain();

        match item {
            Some(PayloadItem::Chunk(bytes)) => {
                self.cursor.message_len += bytes.len() as u64;
                self.push_entity(bytes);
                self.check_size(0)?;
                Ok(true)
            }
            Some(PayloadItem::Eof) => {
                self.cursor.state = ParseState::Done;
                Ok(true)
            }
            None => {
                let buffered = payload_decoder.buffered(src);
                if buffered > 0 {
                    self.cursor.message_len = buffered;
                }
                self.check_size(src.len())?;
                Ok(false)
            }
        }
    }

    fn push_entity(&mut self, bytes: Bytes) {
        if self.entity.is_none() && self.entity_buf.is_empty() {
            self.entity = Some(bytes);
            return;
        }

        if let Some(first) = self.entity.take() {
            self.entity_buf.extend_from_slice(&first);
        }
        self.entity_buf.extend_from_slice(&bytes);
    }

    /// Hands out the completed message and prepares for the next one.
    fn finish(&mut self) -> Result<HttpMessage<L>, ParseError> {
        let line = self.line.take().ok_or_else(|| ParseError::invalid_start_line("message without start line"))?;
        let trailers = self.payload_decoder.take().map(|mut decoder| decoder.take_trailers()).unwrap_or_default();

        let entity = match self.entity.take() {
            Some(entity) => entity,
            None => self.entity_buf.split().freeze(),
        };

        let message = HttpMessage {
            line,
            headers: std::mem::replace(&mut self.headers, self.limits.new_key_value_list()),
            trailers,
            fields: std::mem::take(&mut self.fields),
            entity,
            total_len: self.cursor.consumed,
        };

        debug!(entity_len = message.entity_len(), total_len = message.total_len(), "decoded http message");
        self.cursor.reset();
        Ok(message)
    }
}

impl<L: StartLine> Default for MessageDecoder<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: StartLine> Decoder for MessageDecoder<L> {
    type Item = HttpMessage<L>;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match self.cursor.state {
                ParseState::HeaderLine => {
                    let Some(line) = self.next_line(src)? else {
                        return Ok(None);
                    };

                    // stray line breaks between pipelined messages
                    if line.is_empty() {
                        self.cursor.consumed = 0;
                        continue;
                    }
                    self.parse_start_line(&line)?;
                }

                ParseState::ParameterLines => {
                    let Some(line) = self.next_line(src)? else {
                        return Ok(None);
                    };

                    if line.is_empty() {
                        self.start_body()?;
                    } else {
                        self.header_decoder.decode_line(&line, &mut self.headers, &mut self.fields)?;
                    }
                }

                ParseState::Body => {
                    if !self.decode_body(src)? {
                        return Ok(None);
                    }
                }

                ParseState::Done => return self.finish().map(Some),
            }
        }
    }
}
