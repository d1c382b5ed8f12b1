use bytes::{Buf, Bytes};
use http::Version;

use crate::connection::KeepAliveParams;
use crate::protocol::{KeyValueList, ParseError};

/// One item fed to a message encoder: the head once, then payload items up to
/// [`PayloadItem::Eof`].
#[derive(Debug)]
pub enum Message<T, Data: Buf = Bytes> {
    Header(T),
    Payload(PayloadItem<Data>),
}

/// A piece of a message body, or its end.
///
/// Decoders produce `PayloadItem<Bytes>`; encoders accept any [`Buf`], so handlers can
/// stream borrowed slices without copying them first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadItem<Data: Buf = Bytes> {
    Chunk(Data),
    Eof,
}

/// Body framing announced by an outgoing head.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PayloadSize {
    /// `Content-Length: n`
    Length(u64),
    /// `Transfer-Encoding: chunked`
    Chunked,
    /// No body, written as `Content-Length: 0`
    Empty,
}

impl PayloadSize {
    #[inline]
    pub fn is_chunked(&self) -> bool {
        matches!(self, PayloadSize::Chunked)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, PayloadSize::Empty)
    }
}

impl<D: Buf> PayloadItem<D> {
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, PayloadItem::Eof)
    }

    #[inline]
    pub fn is_chunk(&self) -> bool {
        matches!(self, PayloadItem::Chunk(_))
    }
}

impl PayloadItem {
    /// The chunk data, `None` for EOF
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof => None,
        }
    }
}

/// The first line of an HTTP message: a request line or a status line.
pub trait StartLine: Sized {
    /// Parses the line without its terminating CRLF.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] describing the malformed part of the line.
    fn parse(line: &str) -> Result<Self, ParseError>;
}

/// Header fields the parser intercepts while reading the header block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageFields {
    pub(crate) content_len: Option<u64>,
    pub(crate) chunked: bool,
    pub(crate) connection: Option<String>,
    pub(crate) keep_alive: Option<KeepAliveParams>,
    pub(crate) trailer: Option<String>,
    pub(crate) upgrade: u8,
}

impl MessageFields {
    /// The declared `Content-Length`, if any
    pub fn content_len(&self) -> Option<u64> {
        self.content_len
    }

    /// Whether `Transfer-Encoding: chunked` was announced
    pub fn is_chunked(&self) -> bool {
        self.chunked
    }

    /// The raw `Connection` header value
    pub fn connection(&self) -> Option<&str> {
        self.connection.as_deref()
    }

    /// Whether the `Connection` header asks to keep the transport open
    pub fn is_keep_alive(&self) -> bool {
        self.connection.as_deref().is_some_and(|value| value.trim().eq_ignore_ascii_case("keep-alive"))
    }

    /// The parameters of a `Keep-Alive` header, if one was present and well formed
    pub fn keep_alive(&self) -> Option<KeepAliveParams> {
        self.keep_alive
    }

    /// The advertised `Trailer` field name
    pub fn trailer(&self) -> Option<&str> {
        self.trailer.as_deref()
    }

    /// Counter of websocket upgrade indications (`Upgrade: websocket`, `Connection: Upgrade`)
    pub fn upgrade(&self) -> u8 {
        self.upgrade
    }

    /// Both halves of the websocket upgrade header pair were seen
    pub fn is_websocket_upgrade(&self) -> bool {
        self.upgrade >= 2
    }
}

/// A fully decoded HTTP message.
///
/// `L` is the start line: [`RequestLine`](crate::protocol::RequestLine) for requests and
/// [`StatusLine`](crate::protocol::StatusLine) for responses.
#[derive(Debug, Clone)]
pub struct HttpMessage<L> {
    pub(crate) line: L,
    pub(crate) headers: KeyValueList,
    pub(crate) trailers: KeyValueList,
    pub(crate) fields: MessageFields,
    pub(crate) entity: Bytes,
    pub(crate) total_len: usize,
}

impl<L> HttpMessage<L> {
    /// Assembles a message out of already parsed parts.
    pub fn new(line: L, headers: KeyValueList, entity: Bytes) -> Self {
        Self {
            line,
            headers,
            trailers: KeyValueList::new(),
            fields: MessageFields::default(),
            total_len: entity.len(),
            entity,
        }
    }

    pub fn line(&self) -> &L {
        &self.line
    }

    pub fn headers(&self) -> &KeyValueList {
        &self.headers
    }

    /// Trailer fields received after the last chunk of a chunked body
    pub fn trailers(&self) -> &KeyValueList {
        &self.trailers
    }

    pub fn fields(&self) -> &MessageFields {
        &self.fields
    }

    pub fn entity(&self) -> &Bytes {
        &self.entity
    }

    pub fn entity_len(&self) -> usize {
        self.entity.len()
    }

    /// Number of wire bytes this message occupied, start line to last body byte
    pub fn total_len(&self) -> usize {
        self.total_len
    }

    pub fn into_entity(self) -> Bytes {
        self.entity
    }
}

pub(crate) fn parse_version(version: &str) -> Result<Version, ParseError> {
    match version {
        "HTTP/1.1" => Ok(Version::HTTP_11),
        "HTTP/1.0" => Ok(Version::HTTP_10),
        other => Err(ParseError::InvalidVersion(other.to_owned())),
    }
}

pub(crate) fn version_str(version: Version) -> &'static str {
    if version == Version::HTTP_10 { "HTTP/1.0" } else { "HTTP/1.1" }
}
