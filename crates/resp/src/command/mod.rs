//! Command parsing module
//!
//! Parses RespValue arrays into type-safe Command structures

mod error;
mod result;

pub use error::{CommandError, CommandErrorKind};
pub use result::CommandResult;

use crate::RespValue;
use bytes::Bytes;

/// Command type marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandType {
    /// Read command - evaluated locally, never propagated
    Read,
    /// Write command - propagated to every connected replica on success
    Write,
}

/// Stream entry ID argument as submitted to XADD
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamIdArg {
    /// `*` - the server assigns both halves
    Auto,
    /// `<ms>-*` - the server assigns the sequence half
    AutoSeq { ms: u64 },
    /// `<ms>-<seq>` - fully explicit
    Explicit { ms: u64, seq: u64 },
}

/// A concrete inclusive bound for XRANGE, resolved at parse time
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RangeId {
    pub ms: u64,
    pub seq: u64,
}

/// XREAD per-key threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XReadId {
    /// `$` - the stream's current last entry at dispatch time
    Latest,
    /// Entries strictly greater than this ID
    After { ms: u64, seq: u64 },
}

/// REPLCONF subcommand
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplConfSub {
    /// REPLCONF listening-port <port>
    ListeningPort(u16),
    /// REPLCONF capa <capability>
    Capa(Bytes),
    /// REPLCONF GETACK *
    GetAck,
    /// REPLCONF ACK <offset>
    Ack(u64),
    /// Any other subcommand; acknowledged with +OK
    Other(Vec<Bytes>),
}

/// A parsed client command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    // ==================== Connection / server meta ====================
    /// PING
    Ping,
    /// ECHO message
    Echo { message: Bytes },
    /// INFO [section]
    Info { section: Option<String> },
    /// CONFIG GET parameter (any other subcommand parses with `parameter: None`)
    Config { parameter: Option<Bytes> },
    /// KEYS pattern
    Keys { pattern: Bytes },

    // ==================== Strings ====================
    /// GET key
    Get { key: Bytes },
    /// SET key value [EX seconds | PX milliseconds]
    Set {
        key: Bytes,
        value: Bytes,
        expire_ms: Option<u64>,
    },
    /// DEL key
    Del { key: Bytes },
    /// INCR key
    Incr { key: Bytes },
    /// TYPE key
    Type { key: Bytes },
    /// EXISTS key [key ...]
    Exists { keys: Vec<Bytes> },

    // ==================== Lists ====================
    /// LPUSH key value [value ...]
    LPush { key: Bytes, values: Vec<Bytes> },
    /// LRANGE key start stop
    LRange { key: Bytes, start: i64, stop: i64 },
    /// LLEN key
    LLen { key: Bytes },

    // ==================== Sets ====================
    /// SADD key member [member ...]
    SAdd { key: Bytes, members: Vec<Bytes> },
    /// SMEMBERS key
    SMembers { key: Bytes },
    /// SCARD key
    SCard { key: Bytes },

    // ==================== Streams ====================
    /// XADD key id field value [field value ...]
    XAdd {
        key: Bytes,
        id: StreamIdArg,
        fields: Vec<(Bytes, Bytes)>,
    },
    /// XRANGE key start end
    XRange {
        key: Bytes,
        start: RangeId,
        end: RangeId,
    },
    /// XREAD [BLOCK ms] STREAMS key [key ...] id [id ...]
    XRead {
        block_ms: Option<u64>,
        keys: Vec<Bytes>,
        ids: Vec<XReadId>,
    },

    // ==================== Transactions ====================
    /// MULTI
    Multi,
    /// EXEC
    Exec,
    /// DISCARD
    Discard,

    // ==================== Replication ====================
    /// REPLCONF <subcommand> ...
    ReplConf { sub: ReplConfSub },
    /// PSYNC <replid> <offset>
    Psync { repl_id: Bytes, offset: i64 },
    /// WAIT numreplicas timeout_ms
    Wait {
        num_replicas: usize,
        timeout_ms: u64,
    },
}

impl Command {
    /// Get command type (read/write)
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Set { .. }
            | Command::Del { .. }
            | Command::Incr { .. }
            | Command::LPush { .. }
            | Command::SAdd { .. }
            | Command::XAdd { .. } => CommandType::Write,
            _ => CommandType::Read,
        }
    }

    /// Whether a successful evaluation must be propagated to replicas
    pub fn is_write(&self) -> bool {
        self.command_type() == CommandType::Write
    }

    /// Get command name
    pub fn name(&self) -> &'static str {
        match self {
            Command::Ping => "PING",
            Command::Echo { .. } => "ECHO",
            Command::Info { .. } => "INFO",
            Command::Config { .. } => "CONFIG",
            Command::Keys { .. } => "KEYS",
            Command::Get { .. } => "GET",
            Command::Set { .. } => "SET",
            Command::Del { .. } => "DEL",
            Command::Incr { .. } => "INCR",
            Command::Type { .. } => "TYPE",
            Command::Exists { .. } => "EXISTS",
            Command::LPush { .. } => "LPUSH",
            Command::LRange { .. } => "LRANGE",
            Command::LLen { .. } => "LLEN",
            Command::SAdd { .. } => "SADD",
            Command::SMembers { .. } => "SMEMBERS",
            Command::SCard { .. } => "SCARD",
            Command::XAdd { .. } => "XADD",
            Command::XRange { .. } => "XRANGE",
            Command::XRead { .. } => "XREAD",
            Command::Multi => "MULTI",
            Command::Exec => "EXEC",
            Command::Discard => "DISCARD",
            Command::ReplConf { .. } => "REPLCONF",
            Command::Psync { .. } => "PSYNC",
            Command::Wait { .. } => "WAIT",
        }
    }
}

impl TryFrom<&RespValue> for Command {
    type Error = CommandError;

    fn try_from(value: &RespValue) -> Result<Self, CommandError> {
        let argv = value.to_command().ok_or_else(|| {
            CommandError::new(CommandErrorKind::InvalidFormat, "Command must be an array")
        })?;
        Command::parse(&argv)
    }
}

impl Command {
    /// Parse a command argument vector (verb included)
    pub fn parse(argv: &[Bytes]) -> Result<Self, CommandError> {
        if argv.is_empty() {
            return Err(CommandError::new(
                CommandErrorKind::EmptyCommand,
                "empty command",
            ));
        }
        let cmd_name = String::from_utf8_lossy(&argv[0]).to_uppercase();
        parse_command(&cmd_name, &argv[1..])
    }
}

/// Parse integer argument
fn parse_int(arg: &[u8], name: &str) -> Result<i64, CommandError> {
    std::str::from_utf8(arg)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| {
            CommandError::new(
                CommandErrorKind::InvalidArgument,
                format!("{} must be an integer", name),
            )
        })
}

/// Parse unsigned integer argument
fn parse_uint(arg: &[u8], name: &str) -> Result<u64, CommandError> {
    std::str::from_utf8(arg)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or_else(|| {
            CommandError::new(
                CommandErrorKind::InvalidArgument,
                format!("{} must be a non-negative integer", name),
            )
        })
}

/// Check argument count
fn check_arity(
    args: &[Bytes],
    min: usize,
    max: Option<usize>,
    cmd: &str,
) -> Result<(), CommandError> {
    if args.len() < min || max.is_some_and(|max| args.len() > max) {
        return Err(CommandError::wrong_arity(cmd));
    }
    Ok(())
}

fn invalid_stream_id() -> CommandError {
    CommandError::new(
        CommandErrorKind::InvalidArgument,
        "Invalid stream ID specified as stream command argument",
    )
}

/// Parse an XADD ID argument: `*`, `<ms>-*`, or `<ms>-<seq>`
fn parse_stream_id_arg(arg: &[u8]) -> Result<StreamIdArg, CommandError> {
    if arg == b"*" {
        return Ok(StreamIdArg::Auto);
    }
    let text = std::str::from_utf8(arg).map_err(|_| invalid_stream_id())?;
    let (ms_part, seq_part) = text.split_once('-').ok_or_else(invalid_stream_id)?;
    let ms = ms_part.parse::<u64>().map_err(|_| invalid_stream_id())?;
    if seq_part == "*" {
        Ok(StreamIdArg::AutoSeq { ms })
    } else {
        let seq = seq_part.parse::<u64>().map_err(|_| invalid_stream_id())?;
        Ok(StreamIdArg::Explicit { ms, seq })
    }
}

/// Parse an XRANGE bound. A bare `<ms>` takes `default_seq` for the missing
/// half; `-`/`+` denote the open ends of the keyspace of IDs.
fn parse_range_id(arg: &[u8], default_seq: u64) -> Result<RangeId, CommandError> {
    match arg {
        b"-" => return Ok(RangeId { ms: 0, seq: 0 }),
        b"+" => {
            return Ok(RangeId {
                ms: u64::MAX,
                seq: u64::MAX,
            })
        }
        _ => {}
    }
    let text = std::str::from_utf8(arg).map_err(|_| invalid_stream_id())?;
    match text.split_once('-') {
        Some((ms_part, seq_part)) => {
            let ms = ms_part.parse::<u64>().map_err(|_| invalid_stream_id())?;
            let seq = seq_part.parse::<u64>().map_err(|_| invalid_stream_id())?;
            Ok(RangeId { ms, seq })
        }
        None => {
            let ms = text.parse::<u64>().map_err(|_| invalid_stream_id())?;
            Ok(RangeId {
                ms,
                seq: default_seq,
            })
        }
    }
}

/// Parse an XREAD threshold: `$` or an ID with the sequence defaulting to 0
fn parse_xread_id(arg: &[u8]) -> Result<XReadId, CommandError> {
    if arg == b"$" {
        return Ok(XReadId::Latest);
    }
    let bound = parse_range_id(arg, 0)?;
    Ok(XReadId::After {
        ms: bound.ms,
        seq: bound.seq,
    })
}

/// Parse command
fn parse_command(cmd: &str, args: &[Bytes]) -> Result<Command, CommandError> {
    match cmd {
        // Connection / server meta
        "PING" => {
            check_arity(args, 0, Some(1), cmd)?;
            Ok(Command::Ping)
        }
        "ECHO" => {
            check_arity(args, 1, Some(1), cmd)?;
            Ok(Command::Echo {
                message: args[0].clone(),
            })
        }
        "INFO" => {
            check_arity(args, 0, Some(1), cmd)?;
            Ok(Command::Info {
                section: args.first().map(|a| String::from_utf8_lossy(a).to_string()),
            })
        }
        "CONFIG" => {
            check_arity(args, 1, None, cmd)?;
            if args[0].eq_ignore_ascii_case(b"GET") && args.len() == 2 {
                Ok(Command::Config {
                    parameter: Some(args[1].clone()),
                })
            } else {
                Ok(Command::Config { parameter: None })
            }
        }
        "KEYS" => {
            check_arity(args, 1, Some(1), cmd)?;
            Ok(Command::Keys {
                pattern: args[0].clone(),
            })
        }

        // Strings
        "GET" => {
            check_arity(args, 1, Some(1), cmd)?;
            Ok(Command::Get {
                key: args[0].clone(),
            })
        }
        "SET" => {
            check_arity(args, 2, None, cmd)?;
            let key = args[0].clone();
            let value = args[1].clone();
            let mut expire_ms = None;

            let mut i = 2;
            while i < args.len() {
                let opt = String::from_utf8_lossy(&args[i]).to_uppercase();
                match opt.as_str() {
                    "EX" | "PX" => {
                        i += 1;
                        let arg = args.get(i).ok_or_else(|| {
                            CommandError::new(
                                CommandErrorKind::SyntaxError,
                                format!("{} requires an argument", opt),
                            )
                        })?;
                        let n = parse_uint(arg, &opt)?;
                        expire_ms = Some(if opt == "EX" { n.saturating_mul(1000) } else { n });
                    }
                    _ => {
                        return Err(CommandError::new(
                            CommandErrorKind::SyntaxError,
                            "syntax error",
                        ))
                    }
                }
                i += 1;
            }

            Ok(Command::Set {
                key,
                value,
                expire_ms,
            })
        }
        "DEL" => {
            check_arity(args, 1, Some(1), cmd)?;
            Ok(Command::Del {
                key: args[0].clone(),
            })
        }
        "INCR" => {
            check_arity(args, 1, Some(1), cmd)?;
            Ok(Command::Incr {
                key: args[0].clone(),
            })
        }
        "TYPE" => {
            check_arity(args, 1, Some(1), cmd)?;
            Ok(Command::Type {
                key: args[0].clone(),
            })
        }
        "EXISTS" => {
            check_arity(args, 1, None, cmd)?;
            Ok(Command::Exists {
                keys: args.to_vec(),
            })
        }

        // Lists
        "LPUSH" => {
            check_arity(args, 2, None, cmd)?;
            Ok(Command::LPush {
                key: args[0].clone(),
                values: args[1..].to_vec(),
            })
        }
        "LRANGE" => {
            check_arity(args, 3, Some(3), cmd)?;
            Ok(Command::LRange {
                key: args[0].clone(),
                start: parse_int(&args[1], "start")?,
                stop: parse_int(&args[2], "stop")?,
            })
        }
        "LLEN" => {
            check_arity(args, 1, Some(1), cmd)?;
            Ok(Command::LLen {
                key: args[0].clone(),
            })
        }

        // Sets
        "SADD" => {
            check_arity(args, 2, None, cmd)?;
            Ok(Command::SAdd {
                key: args[0].clone(),
                members: args[1..].to_vec(),
            })
        }
        "SMEMBERS" => {
            check_arity(args, 1, Some(1), cmd)?;
            Ok(Command::SMembers {
                key: args[0].clone(),
            })
        }
        "SCARD" => {
            check_arity(args, 1, Some(1), cmd)?;
            Ok(Command::SCard {
                key: args[0].clone(),
            })
        }

        // Streams
        "XADD" => {
            check_arity(args, 4, None, cmd)?;
            if (args.len() - 2) % 2 != 0 {
                return Err(CommandError::wrong_arity(cmd));
            }
            let fields = args[2..]
                .chunks(2)
                .map(|pair| (pair[0].clone(), pair[1].clone()))
                .collect();
            Ok(Command::XAdd {
                key: args[0].clone(),
                id: parse_stream_id_arg(&args[1])?,
                fields,
            })
        }
        "XRANGE" => {
            check_arity(args, 3, Some(3), cmd)?;
            Ok(Command::XRange {
                key: args[0].clone(),
                start: parse_range_id(&args[1], 0)?,
                end: parse_range_id(&args[2], u64::MAX)?,
            })
        }
        "XREAD" => {
            check_arity(args, 3, None, cmd)?;
            let mut i = 0;
            let mut block_ms = None;
            if args[0].eq_ignore_ascii_case(b"BLOCK") {
                block_ms = Some(parse_uint(&args[1], "BLOCK")?);
                i = 2;
            }
            if !args
                .get(i)
                .is_some_and(|a| a.eq_ignore_ascii_case(b"STREAMS"))
            {
                return Err(CommandError::new(
                    CommandErrorKind::SyntaxError,
                    "syntax error",
                ));
            }
            let rest = &args[i + 1..];
            if rest.is_empty() || rest.len() % 2 != 0 {
                return Err(CommandError::new(
                    CommandErrorKind::SyntaxError,
                    "Unbalanced XREAD list of streams: for each stream key an ID or '$' must be specified.",
                ));
            }
            let half = rest.len() / 2;
            let keys = rest[..half].to_vec();
            let ids = rest[half..]
                .iter()
                .map(|arg| parse_xread_id(arg))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Command::XRead {
                block_ms,
                keys,
                ids,
            })
        }

        // Transactions
        "MULTI" => {
            check_arity(args, 0, Some(0), cmd)?;
            Ok(Command::Multi)
        }
        "EXEC" => {
            check_arity(args, 0, Some(0), cmd)?;
            Ok(Command::Exec)
        }
        "DISCARD" => {
            check_arity(args, 0, Some(0), cmd)?;
            Ok(Command::Discard)
        }

        // Replication
        "REPLCONF" => {
            check_arity(args, 1, None, cmd)?;
            let sub = if args[0].eq_ignore_ascii_case(b"listening-port") {
                check_arity(args, 2, Some(2), cmd)?;
                let port = std::str::from_utf8(&args[1])
                    .ok()
                    .and_then(|s| s.parse::<u16>().ok())
                    .ok_or_else(|| {
                        CommandError::new(
                            CommandErrorKind::InvalidArgument,
                            "listening-port must be a port number",
                        )
                    })?;
                ReplConfSub::ListeningPort(port)
            } else if args[0].eq_ignore_ascii_case(b"capa") {
                check_arity(args, 2, Some(2), cmd)?;
                ReplConfSub::Capa(args[1].clone())
            } else if args[0].eq_ignore_ascii_case(b"GETACK") {
                ReplConfSub::GetAck
            } else if args[0].eq_ignore_ascii_case(b"ACK") {
                check_arity(args, 2, Some(2), cmd)?;
                ReplConfSub::Ack(parse_uint(&args[1], "ACK offset")?)
            } else {
                ReplConfSub::Other(args.to_vec())
            };
            Ok(Command::ReplConf { sub })
        }
        "PSYNC" => {
            check_arity(args, 2, Some(2), cmd)?;
            let offset = std::str::from_utf8(&args[1])
                .ok()
                .and_then(|s| s.parse::<i64>().ok())
                .unwrap_or(-1);
            Ok(Command::Psync {
                repl_id: args[0].clone(),
                offset,
            })
        }
        "WAIT" => {
            check_arity(args, 2, Some(2), cmd)?;
            let num_replicas = parse_int(&args[0], "numreplicas")?.max(0) as usize;
            Ok(Command::Wait {
                num_replicas,
                timeout_ms: parse_uint(&args[1], "timeout")?,
            })
        }

        _ => Err(CommandError::unknown_command()),
    }
}
