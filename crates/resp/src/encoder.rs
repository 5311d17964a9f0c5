//! RESP protocol sync encoder

use crate::RespValue;
use std::io::{self, Write};

/// RESP protocol sync encoder
pub struct RespEncoder<W: Write> {
    writer: W,
}

impl<W: Write> RespEncoder<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Encode RESP value and write
    pub fn encode(&mut self, value: &RespValue) -> io::Result<()> {
        let mut buffer = Vec::new();
        write_value(&mut buffer, value);
        self.writer.write_all(&buffer)?;
        self.writer.flush()
    }
}

/// Encode RESP value and return byte vector
pub fn encode_to_vec(value: &RespValue) -> Vec<u8> {
    let mut buffer = Vec::new();
    write_value(&mut buffer, value);
    buffer
}

/// Wire length of an encoded value, without materializing nested buffers twice.
pub fn encoded_len(value: &RespValue) -> usize {
    match value {
        RespValue::SimpleString(s) => 1 + s.len() + 2,
        RespValue::Error(e) => 1 + e.len() + 2,
        RespValue::Integer(i) => 1 + decimal_len(*i) + 2,
        RespValue::BulkString(Some(bytes)) => {
            1 + decimal_len(bytes.len() as i64) + 2 + bytes.len() + 2
        }
        RespValue::BulkString(None) | RespValue::Null => 5,
        RespValue::Array(items) => {
            1 + decimal_len(items.len() as i64) + 2 + items.iter().map(encoded_len).sum::<usize>()
        }
    }
}

fn decimal_len(n: i64) -> usize {
    let mut len = if n < 0 { 1 } else { 0 };
    let mut n = n.unsigned_abs();
    loop {
        len += 1;
        n /= 10;
        if n == 0 {
            break;
        }
    }
    len
}

fn write_value(buffer: &mut Vec<u8>, value: &RespValue) {
    match value {
        RespValue::SimpleString(s) => {
            buffer.push(b'+');
            buffer.extend_from_slice(s);
            buffer.extend_from_slice(b"\r\n");
        }
        RespValue::Error(e) => {
            buffer.push(b'-');
            buffer.extend_from_slice(e);
            buffer.extend_from_slice(b"\r\n");
        }
        RespValue::Integer(i) => {
            buffer.push(b':');
            buffer.extend_from_slice(i.to_string().as_bytes());
            buffer.extend_from_slice(b"\r\n");
        }
        RespValue::BulkString(Some(bytes)) => {
            buffer.push(b'$');
            buffer.extend_from_slice(bytes.len().to_string().as_bytes());
            buffer.extend_from_slice(b"\r\n");
            buffer.extend_from_slice(bytes);
            buffer.extend_from_slice(b"\r\n");
        }
        RespValue::BulkString(None) | RespValue::Null => {
            buffer.extend_from_slice(b"$-1\r\n");
        }
        RespValue::Array(items) => {
            buffer.push(b'*');
            buffer.extend_from_slice(items.len().to_string().as_bytes());
            buffer.extend_from_slice(b"\r\n");
            for item in items {
                write_value(buffer, item);
            }
        }
    }
}
