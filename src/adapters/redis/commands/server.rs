//! Server and connection commands: PING, ECHO, QUIT, DBSIZE, FLUSHDB,
//! FLUSHALL, INFO.

use super::{CommandContext, CommandHandler, CommandResult, CommandState};
use crate::adapters::redis::{RedisCommand, RedisError, RedisValue};
use crate::store::memory::human_bytes;
use std::fmt::Write as _;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// PING command handler.
pub struct PingHandler;

impl CommandHandler for PingHandler {
    fn execute(
        &self,
        _ctx: CommandContext,
        cmd: RedisCommand,
        _state: Arc<CommandState>,
    ) -> Pin<Box<dyn Future<Output = CommandResult> + Send>> {
        Box::pin(async move {
            match cmd.arg(0) {
                Some(message) => Ok(RedisValue::BulkString(message.clone())),
                None => Ok(RedisValue::pong()),
            }
        })
    }

    fn name(&self) -> &'static str {
        "PING"
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
}

/// ECHO command handler.
pub struct EchoHandler;

impl CommandHandler for EchoHandler {
    fn execute(
        &self,
        _ctx: CommandContext,
        cmd: RedisCommand,
        _state: Arc<CommandState>,
    ) -> Pin<Box<dyn Future<Output = CommandResult> + Send>> {
        Box::pin(async move {
            let message = cmd.arg(0).ok_or_else(|| RedisError::wrong_arity("ECHO"))?;
            Ok(RedisValue::BulkString(message.clone()))
        })
    }

    fn name(&self) -> &'static str {
        "ECHO"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
}

/// QUIT command handler.
///
/// Replies OK; the service closes the connection after writing the reply.
pub struct QuitHandler;

impl CommandHandler for QuitHandler {
    fn execute(
        &self,
        _ctx: CommandContext,
        _cmd: RedisCommand,
        _state: Arc<CommandState>,
    ) -> Pin<Box<dyn Future<Output = CommandResult> + Send>> {
        Box::pin(async move { Ok(RedisValue::ok()) })
    }

    fn name(&self) -> &'static str {
        "QUIT"
    }

    fn max_args(&self) -> Option<usize> {
        Some(0)
    }
}

/// DBSIZE command handler.
pub struct DbSizeHandler;

impl CommandHandler for DbSizeHandler {
    fn execute(
        &self,
        _ctx: CommandContext,
        _cmd: RedisCommand,
        state: Arc<CommandState>,
    ) -> Pin<Box<dyn Future<Output = CommandResult> + Send>> {
        Box::pin(async move { Ok(RedisValue::Integer(state.region()?.len() as i64)) })
    }

    fn name(&self) -> &'static str {
        "DBSIZE"
    }

    fn max_args(&self) -> Option<usize> {
        Some(0)
    }
}

/// FLUSHDB command handler. Clears the bound region only.
pub struct FlushDbHandler;

impl CommandHandler for FlushDbHandler {
    fn execute(
        &self,
        ctx: CommandContext,
        _cmd: RedisCommand,
        state: Arc<CommandState>,
    ) -> Pin<Box<dyn Future<Output = CommandResult> + Send>> {
        Box::pin(async move {
            let removed = state.region()?.clear();
            tracing::info!(conn = ctx.connection_id, region = %state.region_name(), removed, "flushdb");
            Ok(RedisValue::ok())
        })
    }

    fn name(&self) -> &'static str {
        "FLUSHDB"
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }

    fn is_write(&self) -> bool {
        true
    }
}

/// FLUSHALL command handler. Clears every region in the catalog.
pub struct FlushAllHandler;

impl CommandHandler for FlushAllHandler {
    fn execute(
        &self,
        ctx: CommandContext,
        _cmd: RedisCommand,
        state: Arc<CommandState>,
    ) -> Pin<Box<dyn Future<Output = CommandResult> + Send>> {
        Box::pin(async move {
            let removed = state.engine().catalog().flush_all();
            tracing::info!(conn = ctx.connection_id, removed, "flushall");
            Ok(RedisValue::ok())
        })
    }

    fn name(&self) -> &'static str {
        "FLUSHALL"
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }

    fn is_write(&self) -> bool {
        true
    }
}

/// INFO command handler.
pub struct InfoHandler;

impl InfoHandler {
    const SECTIONS: [&'static str; 4] = ["server", "clients", "memory", "stats"];

    fn render(section: Option<&str>, state: &CommandState) -> Result<String, RedisError> {
        let wanted = |name: &str| {
            matches!(section, None | Some("all" | "everything" | "default")) || section == Some(name)
        };

        let server_info = state.server_info();
        let accountant = state.engine().catalog().accountant();
        let mut info = String::new();

        for name in Self::SECTIONS {
            if !wanted(name) {
                continue;
            }
            // Writing to a String cannot fail.
            let _ = match name {
                "server" => write!(
                    info,
                    "# Server\r\nredis_version:{}\r\ntessera_version:{}\r\nredis_mode:{}\r\nos:{}\r\narch:{}\r\nprocess_id:{}\r\nuptime_in_seconds:{}\r\n\r\n",
                    server_info.redis_version,
                    server_info.version,
                    server_info.mode,
                    server_info.os,
                    server_info.arch,
                    server_info.pid,
                    server_info.uptime_seconds(),
                ),
                "clients" => write!(
                    info,
                    "# Clients\r\nconnected_clients:{}\r\n\r\n",
                    server_info.connected_clients.load(Ordering::Relaxed)
                ),
                "memory" => {
                    let used = accountant.used_memory();
                    let peak = accountant.peak_memory();
                    write!(
                        info,
                        "# Memory\r\nused_memory:{}\r\nused_memory_human:{}\r\nused_memory_peak:{}\r\nused_memory_peak_human:{}\r\n\r\n",
                        used,
                        human_bytes(used),
                        peak,
                        human_bytes(peak),
                    )
                }
                _ => write!(
                    info,
                    "# Stats\r\ntotal_connections_received:{}\r\ntotal_commands_processed:{}\r\n\r\n",
                    server_info.total_connections.load(Ordering::Relaxed),
                    server_info.total_commands.load(Ordering::Relaxed),
                ),
            };
        }

        if wanted("keyspace") {
            let region = state.region()?;
            let _ = write!(
                info,
                "# Keyspace\r\ndb0:keys={},region={}\r\n\r\n",
                region.len(),
                region.name()
            );
        }

        Ok(info)
    }
}

impl CommandHandler for InfoHandler {
    fn execute(
        &self,
        _ctx: CommandContext,
        cmd: RedisCommand,
        state: Arc<CommandState>,
    ) -> Pin<Box<dyn Future<Output = CommandResult> + Send>> {
        Box::pin(async move {
            let section = cmd.arg_str(0).map(|s| s.to_lowercase());
            let info = Self::render(section.as_deref(), &state)?;
            Ok(RedisValue::bulk_string(info))
        })
    }

    fn name(&self) -> &'static str {
        "INFO"
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{run, state};
    use super::*;

    fn field(info: &str, name: &str) -> u64 {
        info.lines()
            .find_map(|l| l.strip_prefix(&format!("{name}:")))
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| panic!("missing {name}"))
    }

    #[tokio::test]
    async fn test_ping_echo_quit() {
        let state = state();
        assert_eq!(run(&state, &["PING"]).await.unwrap(), RedisValue::pong());
        assert_eq!(
            run(&state, &["PING", "hi"]).await.unwrap().as_str(),
            Some("hi")
        );
        assert_eq!(
            run(&state, &["ECHO", "hello"]).await.unwrap().as_str(),
            Some("hello")
        );
        assert_eq!(run(&state, &["QUIT"]).await.unwrap(), RedisValue::ok());
    }

    #[tokio::test]
    async fn test_dbsize_and_flushdb() {
        let state = state();
        run(&state, &["SET", "a", "1"]).await.unwrap();
        run(&state, &["SET", "b", "1"]).await.unwrap();
        assert_eq!(run(&state, &["DBSIZE"]).await.unwrap(), RedisValue::Integer(2));
        run(&state, &["FLUSHDB"]).await.unwrap();
        assert_eq!(run(&state, &["DBSIZE"]).await.unwrap(), RedisValue::Integer(0));
    }

    #[tokio::test]
    async fn test_flushall_clears_other_regions() {
        let state = state();
        let other = state
            .engine()
            .catalog()
            .create_region(crate::store::RegionSpec::new("other"))
            .unwrap();
        other.put("x", crate::store::Value::raw("1"));
        run(&state, &["FLUSHALL"]).await.unwrap();
        assert!(other.is_empty());
        assert_eq!(state.engine().catalog().accountant().used_memory(), 0);
    }

    #[tokio::test]
    async fn test_info_memory_tracks_appends() {
        let state = state();
        run(&state, &["SET", "k", "initial"]).await.unwrap();
        let before = run(&state, &["INFO", "memory"]).await.unwrap();
        let before = field(before.as_str().unwrap(), "used_memory");
        assert!(before > 0);

        for _ in 0..100 {
            run(&state, &["APPEND", "k", "morestuff"]).await.unwrap();
        }
        let after = run(&state, &["INFO", "MEMORY"]).await.unwrap();
        let after = after.as_str().unwrap();
        assert!(field(after, "used_memory") >= before + 900);
        assert!(!after.contains("# Server"));
    }

    #[tokio::test]
    async fn test_info_all_sections() {
        let state = state();
        let info = run(&state, &["INFO"]).await.unwrap();
        let info = info.as_str().unwrap();
        for header in ["# Server", "# Clients", "# Memory", "# Stats", "# Keyspace"] {
            assert!(info.contains(header), "missing {header}");
        }
        assert!(info.contains("redis_version:7.0.0"));
    }

    #[tokio::test]
    async fn test_info_unknown_section_is_empty() {
        let state = state();
        assert_eq!(
            run(&state, &["INFO", "nonsense"]).await.unwrap().as_str(),
            Some("")
        );
    }
}
