//! Redis-backed lock service.

use async_trait::async_trait;
use common::{HolderId, SeatId, ShowtimeId};
use redis::AsyncCommands;

use crate::error::LockError;
use crate::service::SeatLockService;

/// Checks every key before setting any, so a batch either locks completely
/// or not at all. Scripts run atomically on the server, which is what makes
/// the check-then-set safe under concurrent callers.
const ACQUIRE_SCRIPT: &str = r#"
for _, key in ipairs(KEYS) do
    if redis.call('EXISTS', key) == 1 then
        return 0
    end
end
for _, key in ipairs(KEYS) do
    redis.call('SET', key, ARGV[1], 'EX', tonumber(ARGV[2]))
end
return 1
"#;

/// Redis implementation of [`SeatLockService`].
///
/// Each seat lock is one key of the form `seat-lock:{showtime}:{seat}`
/// holding the locker's id, with the TTL applied via `SET ... EX`. Redis
/// expires the key on its own, so an abandoned workflow needs no cleanup.
pub struct RedisSeatLocks {
    client: redis::Client,
    script: redis::Script,
    ttl_secs: u64,
}

impl RedisSeatLocks {
    pub fn new(redis_url: &str, ttl_secs: u64) -> Result<Self, LockError> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self {
            client,
            script: redis::Script::new(ACQUIRE_SCRIPT),
            ttl_secs,
        })
    }

    fn lock_key(showtime_id: ShowtimeId, seat_id: SeatId) -> String {
        format!("seat-lock:{}:{}", showtime_id, seat_id)
    }
}

#[async_trait]
impl SeatLockService for RedisSeatLocks {
    #[tracing::instrument(skip(self, seat_ids), fields(seats = seat_ids.len()))]
    async fn try_lock_seats(
        &self,
        showtime_id: ShowtimeId,
        seat_ids: &[SeatId],
        holder_id: HolderId,
    ) -> Result<bool, LockError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let mut invocation = self.script.prepare_invoke();
        for seat_id in seat_ids {
            invocation.key(Self::lock_key(showtime_id, *seat_id));
        }
        invocation.arg(holder_id.to_string()).arg(self.ttl_secs);

        let acquired: i64 = invocation.invoke_async(&mut conn).await?;
        if acquired != 1 {
            tracing::debug!(%showtime_id, "lock batch denied, at least one seat held");
        }
        Ok(acquired == 1)
    }

    async fn release_locks(
        &self,
        showtime_id: ShowtimeId,
        seat_ids: &[SeatId],
    ) -> Result<(), LockError> {
        if seat_ids.is_empty() {
            return Ok(());
        }

        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let keys: Vec<String> = seat_ids
            .iter()
            .map(|seat_id| Self::lock_key(showtime_id, *seat_id))
            .collect();

        let _: usize = conn.del(keys).await?;
        Ok(())
    }
}
