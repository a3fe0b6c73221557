//! Key commands: DEL, EXISTS.

use super::{CommandContext, CommandHandler, CommandResult, CommandState};
use crate::adapters::redis::{RedisCommand, RedisValue};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// DEL command handler.
pub struct DelHandler;

impl CommandHandler for DelHandler {
    fn execute(
        &self,
        _ctx: CommandContext,
        cmd: RedisCommand,
        state: Arc<CommandState>,
    ) -> Pin<Box<dyn Future<Output = CommandResult> + Send>> {
        Box::pin(async move {
            let keys = (0..cmd.argc())
                .map(|i| cmd.key(i))
                .collect::<Result<Vec<_>, _>>()?;
            let removed = state.coordinator()?.remove_all(&keys).await?;
            Ok(RedisValue::Integer(removed as i64))
        })
    }

    fn name(&self) -> &'static str {
        "DEL"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn is_write(&self) -> bool {
        true
    }
}

/// EXISTS command handler.
///
/// A key named more than once is counted each time.
pub struct ExistsHandler;

impl CommandHandler for ExistsHandler {
    fn execute(
        &self,
        _ctx: CommandContext,
        cmd: RedisCommand,
        state: Arc<CommandState>,
    ) -> Pin<Box<dyn Future<Output = CommandResult> + Send>> {
        Box::pin(async move {
            let region = state.region()?;
            let mut count = 0;
            for i in 0..cmd.argc() {
                if region.contains(cmd.key(i)?) {
                    count += 1;
                }
            }
            Ok(RedisValue::Integer(count))
        })
    }

    fn name(&self) -> &'static str {
        "EXISTS"
    }

    fn min_args(&self) -> usize {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{run, state};
    use super::*;

    #[tokio::test]
    async fn test_del_counts_removed_keys() {
        let state = state();
        run(&state, &["SET", "a", "1"]).await.unwrap();
        run(&state, &["SET", "b", "2"]).await.unwrap();
        assert_eq!(
            run(&state, &["DEL", "a", "b", "c"]).await.unwrap(),
            RedisValue::Integer(2)
        );
        assert_eq!(
            run(&state, &["DEL", "a"]).await.unwrap(),
            RedisValue::Integer(0)
        );
    }

    #[tokio::test]
    async fn test_exists_counts_repeats() {
        let state = state();
        run(&state, &["SET", "a", "1"]).await.unwrap();
        assert_eq!(
            run(&state, &["EXISTS", "a", "a", "b"]).await.unwrap(),
            RedisValue::Integer(2)
        );
    }
}
