//! Command execution result type

use crate::RespValue;
use bytes::Bytes;

/// Command execution result
///
/// Covers the reply shapes the dispatcher produces for scalar commands; it
/// converts losslessly into a [`RespValue`]. Nested stream replies are built
/// as `RespValue` trees directly.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResult {
    /// +OK
    Ok,
    /// +QUEUED (transaction queue acknowledgement)
    Queued,
    /// Custom simple string
    SimpleString(Bytes),
    /// Integer response
    Integer(i64),
    /// Single bulk value (None encodes the null bulk)
    Value(Option<Bytes>),
    /// Array of bulk values
    Array(Vec<Option<Bytes>>),
    /// Error response; message carries its own prefix
    Error(String),
    /// Null response
    Null,
}

impl CommandResult {
    pub fn ok() -> Self {
        CommandResult::Ok
    }

    pub fn integer(n: i64) -> Self {
        CommandResult::Integer(n)
    }

    pub fn value(v: Option<Bytes>) -> Self {
        CommandResult::Value(v)
    }

    pub fn array(arr: Vec<Option<Bytes>>) -> Self {
        CommandResult::Array(arr)
    }

    pub fn error(msg: impl Into<String>) -> Self {
        CommandResult::Error(msg.into())
    }
}

impl From<CommandResult> for RespValue {
    fn from(result: CommandResult) -> Self {
        match result {
            CommandResult::Ok => RespValue::SimpleString(Bytes::from("OK")),
            CommandResult::Queued => RespValue::SimpleString(Bytes::from("QUEUED")),
            CommandResult::SimpleString(s) => RespValue::SimpleString(s),
            CommandResult::Integer(n) => RespValue::Integer(n),
            CommandResult::Value(v) => match v {
                Some(bytes) => RespValue::BulkString(Some(bytes)),
                None => RespValue::Null,
            },
            CommandResult::Array(arr) => RespValue::Array(
                arr.into_iter()
                    .map(|v| match v {
                        Some(bytes) => RespValue::BulkString(Some(bytes)),
                        None => RespValue::Null,
                    })
                    .collect(),
            ),
            CommandResult::Error(msg) => RespValue::Error(Bytes::from(msg)),
            CommandResult::Null => RespValue::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_to_resp() {
        let resp: RespValue = CommandResult::Ok.into();
        assert_eq!(resp, RespValue::SimpleString(Bytes::from("OK")));
    }

    #[test]
    fn test_queued_to_resp() {
        let resp: RespValue = CommandResult::Queued.into();
        assert_eq!(resp, RespValue::SimpleString(Bytes::from("QUEUED")));
    }

    #[test]
    fn test_integer_to_resp() {
        let resp: RespValue = CommandResult::Integer(42).into();
        assert_eq!(resp, RespValue::Integer(42));
    }

    #[test]
    fn test_null_value_to_resp() {
        let resp: RespValue = CommandResult::Value(None).into();
        assert_eq!(resp, RespValue::Null);
    }

    #[test]
    fn test_array_to_resp() {
        let resp: RespValue = CommandResult::Array(vec![
            Some(Bytes::from(b"a" as &[u8])),
            None,
        ])
        .into();
        assert_eq!(
            resp,
            RespValue::Array(vec![
                RespValue::BulkString(Some(Bytes::from(b"a" as &[u8]))),
                RespValue::Null,
            ])
        );
    }

    #[test]
    fn test_error_keeps_own_prefix() {
        let resp: RespValue =
            CommandResult::error("WRONGTYPE Operation against a key holding the wrong kind of value")
                .into();
        assert_eq!(
            resp,
            RespValue::Error(Bytes::from(
                "WRONGTYPE Operation against a key holding the wrong kind of value"
            ))
        );
    }
}
