//! String commands: GET, SET, APPEND, STRLEN.

use super::{CommandContext, CommandHandler, CommandResult, CommandState};
use crate::adapters::redis::{RedisCommand, RedisError, RedisValue};
use crate::core::error::TesseraError;
use crate::store::cas::{WriteMode, WriteRequest};
use crate::store::entry::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// GET command handler.
pub struct GetHandler;

impl CommandHandler for GetHandler {
    fn execute(
        &self,
        _ctx: CommandContext,
        cmd: RedisCommand,
        state: Arc<CommandState>,
    ) -> Pin<Box<dyn Future<Output = CommandResult> + Send>> {
        Box::pin(async move {
            let key = cmd.key(0)?;
            match state.region()?.get(key) {
                Ok(entry) => Ok(RedisValue::BulkString(entry.value.to_bytes())),
                Err(TesseraError::KeyNotFound { .. }) => Ok(RedisValue::Null),
                Err(e) => Err(e.into()),
            }
        })
    }

    fn name(&self) -> &'static str {
        "GET"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
}

/// SET command handler.
///
/// `NX` creates only, `XX` replaces only, otherwise the value is put
/// unconditionally. A failed condition replies with a null bulk string.
pub struct SetHandler;

impl SetHandler {
    fn parse_mode(cmd: &RedisCommand) -> Result<WriteMode, RedisError> {
        let mut mode = WriteMode::Put;
        for i in 2..cmd.argc() {
            let arg = cmd
                .arg_str(i)
                .ok_or_else(RedisError::syntax)?
                .to_uppercase();
            let next = match arg.as_str() {
                "NX" => WriteMode::Create,
                "XX" => WriteMode::Replace,
                _ => return Err(RedisError::syntax()),
            };
            if mode != WriteMode::Put && mode != next {
                return Err(RedisError::syntax());
            }
            mode = next;
        }
        Ok(mode)
    }
}

impl CommandHandler for SetHandler {
    fn execute(
        &self,
        _ctx: CommandContext,
        cmd: RedisCommand,
        state: Arc<CommandState>,
    ) -> Pin<Box<dyn Future<Output = CommandResult> + Send>> {
        Box::pin(async move {
            let key = cmd.key(0)?;
            let value = cmd.arg(1).ok_or_else(|| RedisError::wrong_arity("SET"))?;
            let mode = Self::parse_mode(&cmd)?;

            let value = Value::raw(value);
            let request = match mode {
                WriteMode::Create => WriteRequest::create(key, value),
                WriteMode::Replace => WriteRequest::replace(key, value),
                _ => WriteRequest::put(key, value),
            };

            let outcome = state.coordinator()?.write(request).await?;
            if outcome.is_applied() {
                Ok(RedisValue::ok())
            } else {
                Ok(RedisValue::Null)
            }
        })
    }

    fn name(&self) -> &'static str {
        "SET"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn is_write(&self) -> bool {
        true
    }
}

/// APPEND command handler.
pub struct AppendHandler;

impl CommandHandler for AppendHandler {
    fn execute(
        &self,
        _ctx: CommandContext,
        cmd: RedisCommand,
        state: Arc<CommandState>,
    ) -> Pin<Box<dyn Future<Output = CommandResult> + Send>> {
        Box::pin(async move {
            let key = cmd.key(0)?;
            let suffix = cmd
                .arg(1)
                .ok_or_else(|| RedisError::wrong_arity("APPEND"))?;

            let len = state.coordinator()?.append(key, suffix).await?;
            Ok(RedisValue::Integer(len as i64))
        })
    }

    fn name(&self) -> &'static str {
        "APPEND"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn max_args(&self) -> Option<usize> {
        Some(2)
    }

    fn is_write(&self) -> bool {
        true
    }
}

/// STRLEN command handler.
pub struct StrLenHandler;

impl CommandHandler for StrLenHandler {
    fn execute(
        &self,
        _ctx: CommandContext,
        cmd: RedisCommand,
        state: Arc<CommandState>,
    ) -> Pin<Box<dyn Future<Output = CommandResult> + Send>> {
        Box::pin(async move {
            let key = cmd.key(0)?;
            match state.region()?.get(key) {
                Ok(entry) => Ok(RedisValue::Integer(entry.value.len() as i64)),
                Err(TesseraError::KeyNotFound { .. }) => Ok(RedisValue::Integer(0)),
                Err(e) => Err(e.into()),
            }
        })
    }

    fn name(&self) -> &'static str {
        "STRLEN"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{run, state};
    use super::*;
    use bytes::Bytes;

    #[tokio::test]
    async fn test_set_get() {
        let state = state();
        assert_eq!(run(&state, &["SET", "k", "v"]).await.unwrap(), RedisValue::ok());
        assert_eq!(
            run(&state, &["GET", "k"]).await.unwrap(),
            RedisValue::bulk(Bytes::from_static(b"v"))
        );
        assert!(run(&state, &["GET", "missing"]).await.unwrap().is_null());
    }

    #[tokio::test]
    async fn test_set_nx_xx() {
        let state = state();
        assert!(run(&state, &["SET", "k", "1", "XX"]).await.unwrap().is_null());
        assert_eq!(run(&state, &["SET", "k", "1", "nx"]).await.unwrap(), RedisValue::ok());
        assert!(run(&state, &["SET", "k", "2", "NX"]).await.unwrap().is_null());
        assert_eq!(run(&state, &["SET", "k", "3", "XX"]).await.unwrap(), RedisValue::ok());
        assert_eq!(
            run(&state, &["GET", "k"]).await.unwrap().as_str(),
            Some("3")
        );
    }

    #[tokio::test]
    async fn test_set_rejects_conflicting_and_unknown_options() {
        let state = state();
        assert_eq!(
            run(&state, &["SET", "k", "v", "NX", "XX"]).await.unwrap_err(),
            RedisError::syntax()
        );
        assert_eq!(
            run(&state, &["SET", "k", "v", "EX", "10"]).await.unwrap_err(),
            RedisError::syntax()
        );
        assert!(run(&state, &["GET", "k"]).await.unwrap().is_null());
    }

    #[tokio::test]
    async fn test_append_and_strlen() {
        let state = state();
        assert_eq!(
            run(&state, &["APPEND", "k", "abc"]).await.unwrap(),
            RedisValue::Integer(3)
        );
        assert_eq!(
            run(&state, &["APPEND", "k", "de"]).await.unwrap(),
            RedisValue::Integer(5)
        );
        assert_eq!(
            run(&state, &["STRLEN", "k"]).await.unwrap(),
            RedisValue::Integer(5)
        );
        assert_eq!(
            run(&state, &["STRLEN", "nope"]).await.unwrap(),
            RedisValue::Integer(0)
        );
    }

    #[tokio::test]
    async fn test_append_to_document_is_wrongtype() {
        let state = state();
        state
            .region()
            .unwrap()
            .put("doc", Value::from_json(br#"{"a":1}"#).unwrap());
        let err = run(&state, &["APPEND", "doc", "x"]).await.unwrap_err();
        assert_eq!(err.kind, "WRONGTYPE");
        assert_eq!(
            run(&state, &["GET", "doc"]).await.unwrap().as_str(),
            Some(r#"{"a":1}"#)
        );
    }
}
