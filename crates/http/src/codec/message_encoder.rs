//! Outgoing message encoder
//!
//! A message is written as one `Message::Header` followed by its payload items, ending
//! with `PayloadItem::Eof`. The head decides the framing: the payload items after it are
//! written verbatim for a `Content-Length` body or as chunks for a chunked one.

use std::marker::PhantomData;

use crate::codec::body::PayloadEncoder;
use crate::codec::header::HeaderEncoder;
use crate::protocol::{Message, PayloadItem, PayloadSize, RequestHead, ResponseHead, SendError};
use bytes::{Buf, BytesMut};
use tokio_util::codec::Encoder;
use tracing::error;

/// Encoder for outgoing responses
pub type ResponseEncoder = MessageEncoder<ResponseHead>;

/// Encoder for outgoing requests
pub type RequestEncoder = MessageEncoder<RequestHead>;

#[derive(Debug)]
pub struct MessageEncoder<H> {
    header_encoder: HeaderEncoder,
    payload_encoder: Option<PayloadEncoder>,
    _head: PhantomData<fn(H)>,
}

impl<H> MessageEncoder<H> {
    pub fn new() -> Self {
        Self { header_encoder: HeaderEncoder, payload_encoder: None, _head: PhantomData }
    }

    /// Whether a head was written whose payload has not reached EOF yet
    pub fn in_payload(&self) -> bool {
        self.payload_encoder.is_some()
    }
}

impl<H> Default for MessageEncoder<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H, D: Buf> Encoder<Message<(H, PayloadSize), D>> for MessageEncoder<H>
where
    HeaderEncoder: Encoder<(H, PayloadSize), Error = SendError>,
{
    type Error = SendError;

    fn encode(&mut self, item: Message<(H, PayloadSize), D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            Message::Header((head, payload_size)) => {
                if self.payload_encoder.is_some() {
                    error!("expect payload item but receive message head");
                    return Err(SendError::invalid_state("message head written twice"));
                }

                self.header_encoder.encode((head, payload_size), dst)?;
                self.payload_encoder = Some(PayloadEncoder::from(payload_size));
                Ok(())
            }

            Message::Payload(payload_item) => {
                let Some(payload_encoder) = &mut self.payload_encoder else {
                    error!("expect message head but receive payload item");
                    return Err(SendError::invalid_state("payload written before message head"));
                };

                let is_eof = payload_item.is_eof();
                let result = payload_encoder.encode(payload_item, dst);

                if is_eof || result.is_err() {
                    self.payload_encoder.take();
                }

                result
            }
        }
    }
}

impl<H> MessageEncoder<H>
where
    HeaderEncoder: Encoder<(H, PayloadSize), Error = SendError>,
{
    /// Encodes a whole message with a `Content-Length` body in one go.
    pub fn encode_full(&mut self, head: H, body: &[u8], dst: &mut BytesMut) -> Result<(), SendError> {
        let payload_size = if body.is_empty() { PayloadSize::Empty } else { PayloadSize::Length(body.len() as u64) };

        self.encode(Message::<_, &[u8]>::Header((head, payload_size)), dst)?;
        if !body.is_empty() {
            self.encode(Message::Payload(PayloadItem::Chunk(body)), dst)?;
        }
        self.encode(Message::<(H, PayloadSize), &[u8]>::Payload(PayloadItem::Eof), dst)
    }
}
