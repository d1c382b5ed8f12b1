use bytes::{Bytes, BytesMut};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use embed_http::codec::{RequestDecoder, ResponseEncoder, encode_chunk, encode_last_chunk};
use embed_http::connection::{ConnectionState, KeepAliveConfig};
use embed_http::protocol::{Message, PayloadItem, PayloadSize, ResponseHead};
use http::StatusCode;
use tokio_util::codec::{Decoder, Encoder};

fn bench_request_decoder(c: &mut Criterion) {
    let simple = b"GET /device/42/status HTTP/1.1\r\nHost: localhost\r\nConnection: keep-alive\r\n\r\n";

    c.bench_function("decode_simple_request", |b| {
        let mut decoder = RequestDecoder::new();
        b.iter(|| {
            let mut bytes = BytesMut::from(&simple[..]);
            black_box(decoder.decode(&mut bytes).unwrap());
        });
    });

    let mut chunked = BytesMut::from("POST /upload HTTP/1.1\r\nHost: localhost\r\nTransfer-Encoding: chunked\r\n\r\n");
    for _ in 0..8 {
        encode_chunk(&[b'x'; 512][..], &mut chunked).unwrap();
    }
    encode_last_chunk(&mut chunked);
    let chunked = chunked.freeze();

    c.bench_function("decode_chunked_request", |b| {
        let mut decoder = RequestDecoder::new();
        b.iter(|| {
            let mut bytes = BytesMut::from(&chunked[..]);
            black_box(decoder.decode(&mut bytes).unwrap());
        });
    });

    c.bench_function("decode_request_in_small_reads", |b| {
        let mut decoder = RequestDecoder::new();
        b.iter(|| {
            let mut bytes = BytesMut::new();
            let mut decoded = None;
            for read in chunked.chunks(64) {
                bytes.extend_from_slice(read);
                if let Some(request) = decoder.decode(&mut bytes).unwrap() {
                    decoded = Some(request);
                }
            }
            black_box(decoded);
        });
    });
}

fn bench_response_encoder(c: &mut Criterion) {
    let body = Bytes::from_static(b"Hello World!\r\n");

    c.bench_function("encode_simple_response", |b| {
        b.iter(|| {
            let mut encoder = ResponseEncoder::new();
            let mut bytes = BytesMut::new();
            let mut head = ResponseHead::new(StatusCode::OK);
            head.headers_mut().push("Connection", "keep-alive").unwrap();
            encoder.encode_full(head, &body, &mut bytes).unwrap();
            black_box(bytes);
        });
    });

    c.bench_function("encode_chunked_response", |b| {
        b.iter(|| {
            let mut encoder = ResponseEncoder::new();
            let mut bytes = BytesMut::new();
            let head = Message::<_, Bytes>::Header((ResponseHead::new(StatusCode::OK), PayloadSize::Chunked));
            encoder.encode(head, &mut bytes).unwrap();
            for _ in 0..4 {
                encoder.encode(Message::<(ResponseHead, PayloadSize)>::Payload(PayloadItem::Chunk(body.clone())), &mut bytes).unwrap();
            }
            encoder.encode(Message::<(ResponseHead, PayloadSize)>::Payload(PayloadItem::Eof), &mut bytes).unwrap();
            black_box(bytes);
        });
    });
}

fn bench_keep_alive(c: &mut Criterion) {
    let request = b"GET / HTTP/1.1\r\nConnection: keep-alive\r\nKeep-Alive: timeout=10, max=100\r\n\r\n";
    let mut decoder = RequestDecoder::new();
    let mut bytes = BytesMut::from(&request[..]);
    let request = decoder.decode(&mut bytes).unwrap().unwrap();

    c.bench_function("keep_alive_negotiation", |b| {
        b.iter(|| {
            let mut state = ConnectionState::new(KeepAliveConfig::default());
            black_box(state.on_request(request.fields()));
            black_box(state.response_headers());
        });
    });
}

criterion_group!(benches, bench_request_decoder, bench_response_encoder, bench_keep_alive);
criterion_main!(benches);
