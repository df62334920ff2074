//! End-to-end HTTP/2 connection scenarios with pinned wire bytes

use bytes::BytesMut;
use http::StatusCode;
use wirebound::http2::connection::{Connection, Event, ResponseHead};
use wirebound::http2::{error_code, frame, hpack, PREFACE};
use wirebound::Config;

const SERVER_SETTINGS: [u8; 9] = [0x00, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00];
const SETTINGS_ACK: [u8; 9] = [0x00, 0x00, 0x00, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00];
const PING_ACK: [u8; 17] = [
    0x00, 0x00, 0x08, 0x06, 0x01, 0x00, 0x00, 0x00, 0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06,
    0x07, 0x08,
];
const GOAWAY_PROTOCOL_ERROR: [u8; 17] = [
    0x00, 0x00, 0x08, 0x07, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x01,
];

/// Preface, empty SETTINGS, then a PING with payload 01..08
fn greeting_and_ping() -> Vec<u8> {
    let mut wire = PREFACE.to_vec();
    wire.extend_from_slice(&SERVER_SETTINGS); // empty client SETTINGS, same bytes
    wire.extend_from_slice(&[0, 0, 8, 6, 0, 0, 0, 0, 0]);
    wire.extend_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
    wire
}

fn headers_frame(stream_id: u32, block: &[u8], flags: u8) -> Vec<u8> {
    let mut wire = vec![0, 0, block.len() as u8, 0x1, flags];
    wire.extend_from_slice(&stream_id.to_be_bytes());
    wire.extend_from_slice(block);
    wire
}

#[test]
fn scenario_byte_dribbled_greeting() {
    let mut conn = Connection::new(&Config::default());
    let mut output = conn.take_output().to_vec();

    for &byte in &greeting_and_ping() {
        conn.receive(&[byte]);
        output.extend_from_slice(&conn.take_output());
    }

    let mut expected = SERVER_SETTINGS.to_vec();
    expected.extend_from_slice(&SETTINGS_ACK);
    expected.extend_from_slice(&PING_ACK);
    assert_eq!(output, expected);
    assert!(!conn.should_close());
}

#[test]
fn scenario_single_write_greeting_is_identical() {
    let mut conn = Connection::new(&Config::default());
    let mut output = conn.take_output().to_vec();

    conn.receive(&greeting_and_ping());
    output.extend_from_slice(&conn.take_output());

    let mut expected = SERVER_SETTINGS.to_vec();
    expected.extend_from_slice(&SETTINGS_ACK);
    expected.extend_from_slice(&PING_ACK);
    assert_eq!(output, expected);
}

#[test]
fn scenario_chunked_deliveries_match_single_write() {
    // Frame coalescing/splitting invariance over several partitions.
    let wire = greeting_and_ping();
    let mut reference = Connection::new(&Config::default());
    let _ = reference.take_output();
    reference.receive(&wire);
    let reference_out = reference.take_output().to_vec();

    for chunk_size in [1, 2, 3, 7, 10, wire.len()] {
        let mut conn = Connection::new(&Config::default());
        let _ = conn.take_output();
        let mut output = Vec::new();
        for chunk in wire.chunks(chunk_size) {
            conn.receive(chunk);
            output.extend_from_slice(&conn.take_output());
        }
        assert_eq!(output, reference_out, "chunk size {}", chunk_size);
    }
}

#[test]
fn scenario_settings_on_nonzero_stream() {
    let mut conn = Connection::new(&Config::default());
    let _ = conn.take_output();
    conn.receive(PREFACE);

    conn.receive(&[0x00, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00, 0x00, 0x01]);
    assert_eq!(conn.take_output().as_ref(), &GOAWAY_PROTOCOL_ERROR);
    assert!(conn.should_close());
}

#[test]
fn scenario_headers_on_stream_zero() {
    let mut conn = Connection::new(&Config::default());
    let _ = conn.take_output();
    conn.receive(PREFACE);

    conn.receive(&headers_frame(0, &[0x40, 0x81, 0x1F, 0x81, 0x1F], 0x4));
    assert_eq!(conn.take_output().as_ref(), &GOAWAY_PROTOCOL_ERROR);
    assert!(conn.should_close());
}

#[test]
fn scenario_even_stream_id_is_not_recorded() {
    let mut conn = Connection::new(&Config::default());
    let _ = conn.take_output();
    conn.receive(PREFACE);

    conn.receive(&headers_frame(2, &[0x82, 0x86, 0x84], 0x4));
    // GOAWAY carries last_stream_id 0: the invalid id was never accepted.
    assert_eq!(conn.take_output().as_ref(), &GOAWAY_PROTOCOL_ERROR);
    assert!(conn.should_close());
}

#[test]
fn scenario_repeated_stream_id_99() {
    let mut conn = Connection::new(&Config::default());
    let _ = conn.take_output();
    conn.receive(PREFACE);

    let events = conn.receive(&headers_frame(99, &[0x82, 0x86, 0x84], 0x5));
    assert!(matches!(
        events[..],
        [Event::Request { stream_id: 99, .. }]
    ));
    let _ = conn.take_output();

    conn.receive(&headers_frame(99, &[0x82, 0x86, 0x84], 0x5));
    let out = conn.take_output();
    assert_eq!(
        out.as_ref(),
        &[
            0x00, 0x00, 0x08, 0x07, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x63, 0x00,
            0x00, 0x00, 0x01
        ]
    );
    assert!(conn.should_close());
}

#[test]
fn scenario_undecodable_header_block() {
    let mut conn = Connection::new(&Config::default());
    let _ = conn.take_output();
    conn.receive(PREFACE);

    // Indexed representation with index 0 cannot be decoded.
    conn.receive(&headers_frame(1, &[0x80], 0x5));
    let out = conn.take_output();
    assert_eq!(out[3], 0x07);
    assert_eq!(&out[13..17], &[0x00, 0x00, 0x00, 0x09]);
    assert!(conn.should_close());
}

#[test]
fn scenario_goaway_is_echoed() {
    let mut conn = Connection::new(&Config::default());
    let _ = conn.take_output();
    conn.receive(PREFACE);

    let client_goaway = [
        0x00, 0x00, 0x08, 0x07, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00,
    ];
    let events = conn.receive(&client_goaway);
    assert_eq!(
        events,
        vec![Event::GoawayReceived {
            last_stream_id: 0,
            error_code: error_code::NO_ERROR,
        }]
    );
    assert_eq!(conn.take_output().as_ref(), &client_goaway);
    assert!(conn.should_close());
}

#[test]
fn settings_with_params_still_gets_empty_ack() {
    let mut conn = Connection::new(&Config::default());
    let _ = conn.take_output();
    conn.receive(PREFACE);

    let mut wire = vec![0, 0, 6, 4, 0, 0, 0, 0, 0];
    wire.extend_from_slice(&[0, 5, 0, 0, 0x80, 0]); // MAX_FRAME_SIZE = 32768
    conn.receive(&wire);
    assert_eq!(conn.take_output().as_ref(), &SETTINGS_ACK);
}

#[test]
fn ping_payloads_echo_verbatim() {
    let mut conn = Connection::new(&Config::default());
    let _ = conn.take_output();
    conn.receive(PREFACE);

    for payload in [[0u8; 8], [0xFF; 8], [1, 2, 3, 4, 5, 6, 7, 8]] {
        let mut wire = vec![0, 0, 8, 6, 0, 0, 0, 0, 0];
        wire.extend_from_slice(&payload);
        conn.receive(&wire);

        let out = conn.take_output();
        assert_eq!(out[4], 0x1, "ACK flag");
        assert_eq!(&out[9..17], &payload);
    }
}

#[test]
fn full_request_response_exchange() {
    let mut conn = Connection::new(&Config::default());
    let _ = conn.take_output();
    conn.receive(PREFACE);

    // Encode a request block with a second encoder; the decoded list
    // must round-trip through the connection's decoder table.
    let mut encoder = hpack::Encoder::new();
    let mut block = BytesMut::new();
    encoder.encode(
        &[
            hpack::HeaderField::new(":method", "POST"),
            hpack::HeaderField::new(":path", "/upload"),
            hpack::HeaderField::new(":scheme", "https"),
            hpack::HeaderField::new(":authority", "example.com"),
            hpack::HeaderField::new("content-type", "text/plain"),
        ],
        &mut block,
    );

    let events = conn.receive(&headers_frame(1, &block, 0x4));
    let headers = match &events[..] {
        [Event::Request {
            stream_id: 1,
            headers,
            end_stream: false,
        }] => headers,
        other => panic!("unexpected events: {:?}", other),
    };
    assert_eq!(headers[0], hpack::HeaderField::new(":method", "POST"));
    assert_eq!(headers[1], hpack::HeaderField::new(":path", "/upload"));

    let mut data = vec![0, 0, 4, 0, 1, 0, 0, 0, 1];
    data.extend_from_slice(b"body");
    let events = conn.receive(&data);
    assert!(matches!(
        events[..],
        [Event::Data {
            stream_id: 1,
            end_stream: true,
            ..
        }]
    ));

    let head = ResponseHead {
        status: StatusCode::OK,
        headers: vec![("content-type".to_string(), "text/plain".to_string())],
    };
    conn.send_response(1, &head, Some(b"done".as_ref()));

    // The response parses back into HEADERS then DATA with END_STREAM.
    let out = conn.take_output();
    let mut rest: &[u8] = &out;
    let mut frames = Vec::new();
    while let frame::Parsed::Frame { frame, consumed } = frame::parse(rest, 16_384).unwrap() {
        frames.push(frame);
        rest = &rest[consumed..];
        if rest.is_empty() {
            break;
        }
    }
    match &frames[..] {
        [frame::Frame::Headers {
            stream_id: 1,
            end_headers: true,
            end_stream: false,
            fragment,
            ..
        }, frame::Frame::Data {
            stream_id: 1,
            data,
            end_stream: true,
        }] => {
            let mut decoder = hpack::Decoder::new();
            let fields = decoder.decode(fragment).unwrap();
            assert_eq!(fields[0], hpack::HeaderField::new(":status", "200"));
            assert_eq!(
                fields[1],
                hpack::HeaderField::new("cache-control", "max-age=0, private, must-revalidate")
            );
            assert_eq!(data.as_ref(), b"done");
        }
        other => panic!("unexpected frames: {:?}", other),
    }
}

mod driver {
    use super::*;
    use wirebound::http2::server::{serve, Response};
    use wirebound::transport;

    #[tokio::test]
    async fn serve_answers_ping_and_echoes_goaway() {
        let (mut client, server) = tokio::io::duplex(16 * 1024);
        let task = tokio::spawn(serve(server, Config::default(), |_req| async {
            Response::text("unused")
        }));

        transport::write_all(&mut client, &greeting_and_ping())
            .await
            .unwrap();

        // Server SETTINGS + SETTINGS-ACK + PING-ACK, in order.
        let mut expected = SERVER_SETTINGS.to_vec();
        expected.extend_from_slice(&SETTINGS_ACK);
        expected.extend_from_slice(&PING_ACK);

        let mut seen = BytesMut::new();
        while seen.len() < expected.len() {
            if transport::read_some(&mut client, &mut seen).await.unwrap()
                == transport::ReadOutcome::Closed
            {
                break;
            }
        }
        assert_eq!(&seen[..expected.len()], &expected[..]);

        // A client GOAWAY ends the connection; serve returns cleanly.
        let goaway = [
            0x00, 0x00, 0x08, 0x07, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00,
        ];
        transport::write_all(&mut client, &goaway).await.unwrap();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn serve_runs_handler_and_writes_response() {
        let (mut client, server) = tokio::io::duplex(16 * 1024);
        let task = tokio::spawn(serve(server, Config::default(), |req| async move {
            assert_eq!(req.path, "/hello");
            Response::text("hi!")
        }));

        let mut wire = PREFACE.to_vec();
        wire.extend_from_slice(&SERVER_SETTINGS);

        let mut encoder = hpack::Encoder::new();
        let mut block = BytesMut::new();
        encoder.encode(
            &[
                hpack::HeaderField::new(":method", "GET"),
                hpack::HeaderField::new(":path", "/hello"),
                hpack::HeaderField::new(":scheme", "https"),
            ],
            &mut block,
        );
        wire.extend_from_slice(&headers_frame(1, &block, 0x5));
        transport::write_all(&mut client, &wire).await.unwrap();

        // Read until the DATA frame with "hi!" shows up.
        let mut seen = BytesMut::new();
        let body = loop {
            transport::read_some(&mut client, &mut seen).await.unwrap();
            let mut rest: &[u8] = &seen;
            let mut found = None;
            loop {
                match frame::parse(rest, 16_384) {
                    Ok(frame::Parsed::Frame { frame, consumed }) => {
                        if let frame::Frame::Data { data, .. } = &frame {
                            found = Some(data.clone());
                        }
                        rest = &rest[consumed..];
                    }
                    _ => break,
                }
            }
            if let Some(body) = found {
                break body;
            }
        };
        assert_eq!(body.as_ref(), b"hi!");

        drop(client);
        task.await.unwrap().unwrap();
    }
}
