//! Common test utilities.
//!
//! This module contains shared helpers for integration tests.
//! Import with `mod common;` in test files.

#![allow(dead_code)]

use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tessera::adapters::rest::{RestAdapter, RestRequest, RestResponse};
use tessera::store::{RegionSpec, Value};
use tessera::Engine;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

pub const REGION: &str = "regionA";

pub const DOC1: &str = r#"{
  "store": {
    "book": [
      {"category": "reference", "author": "Nigel Rees", "title": "Sayings of the Century", "displayprice": 8.95},
      {"category": "fiction", "author": "Evelyn Waugh", "title": "Sword of Honour", "displayprice": 12.99},
      {"category": "fiction", "author": "Herman Melville", "title": "Moby Dick", "isbn": "0-553-21311-3", "displayprice": 8.99},
      {"category": "fiction", "author": "J. R. R. Tolkien", "title": "The Lord of the Rings", "isbn": "0-395-19395-8", "displayprice": 22.99}
    ],
    "bicycle": {"color": "red", "displayprice": 19.95, "foo:bar": "fooBar", "dot.notation": "new", "dash-notation": "dashes"}
  }
}"#;

pub const DOC2: &str = r#"{
  "store": {
    "book": [
      {"category": "reference", "author": "Nigel Rees", "title": "Sayings of the Century", "displayprice": 18.95},
      {"category": "fiction", "author": "Evelyn Waugh", "title": "Sword of Honour", "displayprice": 112.99},
      {"category": "fiction", "author": "Herman Melville", "title": "Moby Dick", "isbn": "0-553-21311-3", "displayprice": 8.99},
      {"category": "fiction", "author": "J. R. R. Tolkien", "title": "The Lord of the Rings", "isbn": "0-395-19395-8", "displayprice": 22.99}
    ],
    "bicycle": {"color": "red", "displayprice": 19.95, "foo:bar": "fooBar", "dot.notation": "new", "dash-notation": "dashes"}
  }
}"#;

pub const DOC3: &str = r#"{
  "store": {
    "book": [
      {"category": "reference", "author": "Nigel Rees", "title": "Sayings of the Century", "displayprice": 18.95},
      {"category": "fiction", "author": "Evelyn Waugh", "title": "Sword of Honour", "displayprice": 112.99},
      {"category": "fiction", "author": "Herman Melville", "title": "Moby Dick", "isbn": "0-553-21311-3", "displayprice": 8.99},
      {"category": "fiction", "author": "J. R. R. Tolkien", "title": "The Lord of the Rings", "isbn": "0-395-19395-8", "displayprice": 22.99}
    ],
    "bicycle": {"color": "red", "displayprice": 129.95, "foo:bar": "fooBar", "dot.notation": "new", "dash-notation": "dashes"}
  }
}"#;

pub const PRICE_QUERY: &str =
    "SELECT book.displayprice FROM /regionA e, e.store.book book WHERE book.displayprice > 5";

pub const PRICE_QUERY_PARAM: &str =
    "SELECT book.displayprice FROM /regionA e, e.store.book book WHERE book.displayprice > $1";

pub const PRICE_PARAMS: &str = r#"[{"@type":"double","@value":8.99}]"#;

/// Every book price above 5 across DOC1..DOC3, sorted.
pub const PRICES_ABOVE_5: [f64; 12] = [
    8.95, 8.99, 8.99, 8.99, 12.99, 18.95, 18.95, 22.99, 22.99, 22.99, 112.99, 112.99,
];

/// Every book price above 8.99 across DOC1..DOC3, sorted.
pub const PRICES_ABOVE_8_99: [f64; 8] = [12.99, 18.95, 18.95, 22.99, 22.99, 22.99, 112.99, 112.99];

/// Engine with an empty `regionA`.
pub fn engine() -> Arc<Engine> {
    let engine = Engine::default();
    engine
        .catalog()
        .create_region(RegionSpec::new(REGION))
        .expect("create region");
    Arc::new(engine)
}

/// Engine with DOC1..DOC3 loaded into `regionA` under keys 1..3.
pub fn engine_with_books() -> Arc<Engine> {
    let engine = engine();
    let region = engine.catalog().region(REGION).expect("region");
    for (key, doc) in [("1", DOC1), ("2", DOC2), ("3", DOC3)] {
        region.put(key, Value::from_json(doc.as_bytes()).expect("fixture JSON"));
    }
    engine
}

/// REST adapter over an empty `regionA`.
pub fn rest() -> RestAdapter {
    RestAdapter::new(engine())
}

/// Sorted numbers from a JSON array response.
pub fn sorted_numbers(response: &RestResponse) -> Vec<f64> {
    let body = response.body_json().expect("JSON body");
    let mut numbers: Vec<f64> = body
        .as_array()
        .expect("array body")
        .iter()
        .map(|v| v.as_f64().expect("number"))
        .collect();
    numbers.sort_by(|a, b| a.partial_cmp(b).expect("comparable"));
    numbers
}

/// Convenience for building a PUT with a query parameter.
pub fn put_op(path: &str, op: &str, body: &str) -> RestRequest {
    RestRequest::put(path, body.to_string()).with_query("op", op)
}

/// Create a configuration file with the given contents.
pub fn config_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write config");
    file
}

/// Encode a command as a RESP array of bulk strings.
pub fn resp_command(args: &[&[u8]]) -> Vec<u8> {
    let mut out = format!("*{}\r\n", args.len()).into_bytes();
    for arg in args {
        out.extend_from_slice(format!("${}\r\n", arg.len()).as_bytes());
        out.extend_from_slice(arg);
        out.extend_from_slice(b"\r\n");
    }
    out
}

/// Minimal RESP client for exercising the listener.
pub struct RespClient {
    stream: TcpStream,
    buffer: Vec<u8>,
}

impl RespClient {
    pub async fn connect(addr: std::net::SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connect");
        Self {
            stream,
            buffer: Vec::new(),
        }
    }

    pub async fn send(&mut self, args: &[&[u8]]) {
        self.stream
            .write_all(&resp_command(args))
            .await
            .expect("write");
    }

    pub async fn send_raw(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).await.expect("write");
    }

    /// Send a command and read one reply.
    pub async fn call(&mut self, args: &[&str]) -> Reply {
        let args: Vec<&[u8]> = args.iter().map(|a| a.as_bytes()).collect();
        self.send(&args).await;
        self.read_reply().await
    }

    /// Read exactly one top-level reply.
    pub async fn read_reply(&mut self) -> Reply {
        loop {
            if let Some((reply, used)) = parse_reply(&self.buffer) {
                self.buffer.drain(..used);
                return reply;
            }
            let mut chunk = [0u8; 4096];
            let n = self.stream.read(&mut chunk).await.expect("read");
            assert!(n > 0, "connection closed while awaiting reply");
            self.buffer.extend_from_slice(&chunk[..n]);
        }
    }

    /// True once the server has closed the connection.
    pub async fn is_closed(&mut self) -> bool {
        let mut chunk = [0u8; 64];
        matches!(self.stream.read(&mut chunk).await, Ok(0) | Err(_))
    }
}

/// Decoded server reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Status(String),
    Error(String),
    Integer(i64),
    Bulk(Option<Vec<u8>>),
    Array(Vec<Reply>),
}

impl Reply {
    pub fn text(&self) -> String {
        match self {
            Reply::Status(s) | Reply::Error(s) => s.clone(),
            Reply::Bulk(Some(b)) => String::from_utf8_lossy(b).into_owned(),
            other => panic!("reply has no text: {other:?}"),
        }
    }
}

fn parse_line(data: &[u8]) -> Option<(&[u8], usize)> {
    let end = data.windows(2).position(|w| w == b"\r\n")?;
    Some((&data[..end], end + 2))
}

fn parse_reply(data: &[u8]) -> Option<(Reply, usize)> {
    let (&kind, rest) = data.split_first()?;
    let (line, used) = parse_line(rest)?;
    let text = String::from_utf8_lossy(line).into_owned();
    let consumed = 1 + used;
    match kind {
        b'+' => Some((Reply::Status(text), consumed)),
        b'-' => Some((Reply::Error(text), consumed)),
        b':' => Some((Reply::Integer(text.parse().ok()?), consumed)),
        b'$' => {
            let len: i64 = text.parse().ok()?;
            if len < 0 {
                return Some((Reply::Bulk(None), consumed));
            }
            let len = len as usize;
            let body = data.get(consumed..consumed + len + 2)?;
            Some((Reply::Bulk(Some(body[..len].to_vec())), consumed + len + 2))
        }
        b'*' => {
            let count: usize = text.parse().ok()?;
            let mut items = Vec::with_capacity(count);
            let mut offset = consumed;
            for _ in 0..count {
                let (item, used) = parse_reply(&data[offset..])?;
                items.push(item);
                offset += used;
            }
            Some((Reply::Array(items), offset))
        }
        _ => panic!("unexpected reply type byte {kind}"),
    }
}
