//! HTTP header line decoder
//!
//! Each header line is split on its first colon; the value is trimmed. Every header is
//! stored in order in the message's [`KeyValueList`], and the framing and connection
//! related ones are additionally intercepted into [`MessageFields`]:
//!
//! - `Content-Length`: the entity length
//! - `Transfer-Encoding`: chunked framing when `chunked` is the last coding
//! - `Connection` / `Keep-Alive`: connection persistence
//! - `Trailer`: the field name expected after the last chunk
//! - `Upgrade: websocket` and `Connection: Upgrade`: each bumps the upgrade counter
//!
//! # Limits
//!
//! The number of header lines, and the key and value lengths, are bounded; exceeding any
//! of them is a [`ParseError`], headers are never truncated.

use crate::connection::KeepAliveParams;
use crate::ensure;
use crate::protocol::{KeyValueList, MessageFields, ParseError};
use tracing::trace;

/// Decoder for a single header line, applied once per line of the header block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderDecoder {
    max_headers: usize,
}

impl HeaderDecoder {
    pub fn new(max_headers: usize) -> Self {
        Self { max_headers }
    }

    /// Parses `line` (without its line terminator) into `headers` and intercepts the
    /// known fields into `fields`.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if:
    /// - The number of headers exceeds the configured maximum
    /// - The line has no colon, an empty name, or a name containing whitespace
    /// - Key or value exceed their length bounds
    /// - `Content-Length` is not a number or conflicts with an earlier one
    pub fn decode_line(&self, line: &[u8], headers: &mut KeyValueList, fields: &mut MessageFields) -> Result<(), ParseError> {
        ensure!(headers.len() < self.max_headers, ParseError::too_many_headers(self.max_headers));

        let line = std::str::from_utf8(line).map_err(|_| ParseError::invalid_header("header line is not utf-8"))?;
        let (key, value) = line.split_once(':').ok_or_else(|| ParseError::invalid_header(format!("missing colon in `{line}`")))?;

        ensure!(!key.is_empty(), ParseError::invalid_header("empty header name"));
        ensure!(
            !key.bytes().any(|b| b.is_ascii_whitespace()),
            ParseError::invalid_header(format!("whitespace in header name `{key}`"))
        );

        let value = value.trim();
        trace!(key, value, "parsed header");

        intercept(key, value, fields)?;
        headers.push(key, value)?;
        Ok(())
    }
}

fn intercept(key: &str, value: &str, fields: &mut MessageFields) -> Result<(), ParseError> {
    if key.eq_ignore_ascii_case("content-length") {
        let length = value
            .parse::<u64>()
            .map_err(|_| ParseError::invalid_content_length(format!("value {value} is not u64")))?;

        if let Some(existing) = fields.content_len {
            ensure!(existing == length, ParseError::invalid_content_length(format!("conflicting values {existing} and {length}")));
        }
        fields.content_len = Some(length);
    } else if key.eq_ignore_ascii_case("transfer-encoding") {
        fields.chunked = is_chunked(value);
    } else if key.eq_ignore_ascii_case("connection") {
        if has_token(value, "upgrade") {
            fields.upgrade = fields.upgrade.saturating_add(1);
        }
        fields.connection = Some(value.to_owned());
    } else if key.eq_ignore_ascii_case("keep-alive") {
        fields.keep_alive = KeepAliveParams::parse(value);
    } else if key.eq_ignore_ascii_case("trailer") {
        fields.trailer = Some(value.to_owned());
    } else if key.eq_ignore_ascii_case("upgrade") && value.eq_ignore_ascii_case("websocket") {
        fields.upgrade = fields.upgrade.saturating_add(1);
    }

    Ok(())
}

/// Checks if the Transfer-Encoding header indicates chunked encoding.
///
/// According to RFC 7230, chunked must be the last encoding if present.
fn is_chunked(value: &str) -> bool {
    value.rsplit(',').next().is_some_and(|coding| coding.trim().eq_ignore_ascii_case("chunked"))
}

fn has_token(value: &str, token: &str) -> bool {
    value.split(',').any(|part| part.trim().eq_ignore_ascii_case(token))
}
