//! One-time password storage.
//!
//! Codes are single use: a successful verification consumes the code, and
//! an expired code is dropped on sight.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use fred::clients::Client as RedisClient;
use fred::interfaces::KeysInterface;
use fred::types::Expiration;
use policyai_common::{AppError, AppResult};
use rand::Rng;
use tokio::sync::RwLock;

/// Number of digits in a generated code.
pub const OTP_DIGITS: u32 = 6;

/// Generate a random numeric code, zero padded.
#[must_use]
pub fn generate_code() -> String {
    let max = 10u32.pow(OTP_DIGITS);
    let n = rand::thread_rng().gen_range(0..max);
    format!("{n:0width$}", width = OTP_DIGITS as usize)
}

/// Storage for pending one-time passwords keyed by email.
#[async_trait]
pub trait OtpStore: Send + Sync {
    /// Store `code` for `email`, replacing any pending code.
    async fn store(&self, email: &str, code: &str, ttl: Duration) -> AppResult<()>;

    /// Check `code` for `email`. A match consumes the pending code.
    async fn verify(&self, email: &str, code: &str) -> AppResult<bool>;

    /// Drop any pending code for `email`.
    async fn expire(&self, email: &str) -> AppResult<()>;
}

#[derive(Debug, Clone)]
struct PendingCode {
    code: String,
    expires_at: Instant,
}

/// Process-local OTP store for development and tests.
#[derive(Clone, Default)]
pub struct MemoryOtpStore {
    codes: Arc<RwLock<HashMap<String, PendingCode>>>,
}

impl MemoryOtpStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OtpStore for MemoryOtpStore {
    async fn store(&self, email: &str, code: &str, ttl: Duration) -> AppResult<()> {
        let now = Instant::now();
        let mut codes = self.codes.write().await;
        codes.retain(|_, pending| pending.expires_at > now);
        codes.insert(
            email.to_string(),
            PendingCode {
                code: code.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn verify(&self, email: &str, code: &str) -> AppResult<bool> {
        let mut codes = self.codes.write().await;
        let Some(pending) = codes.get(email) else {
            return Ok(false);
        };

        if pending.expires_at <= Instant::now() {
            codes.remove(email);
            return Ok(false);
        }

        if pending.code == code {
            codes.remove(email);
            return Ok(true);
        }
        Ok(false)
    }

    async fn expire(&self, email: &str) -> AppResult<()> {
        self.codes.write().await.remove(email);
        Ok(())
    }
}

/// Redis-backed OTP store. Expiry is delegated to Redis `EX`.
#[derive(Clone)]
pub struct RedisOtpStore {
    redis: Arc<RedisClient>,
    prefix: String,
}

impl RedisOtpStore {
    #[must_use]
    pub fn new(redis: Arc<RedisClient>, prefix: impl Into<String>) -> Self {
        Self {
            redis,
            prefix: prefix.into(),
        }
    }

    fn key(&self, email: &str) -> String {
        format!("{}:otp:{}", self.prefix, email)
    }
}

#[async_trait]
impl OtpStore for RedisOtpStore {
    async fn store(&self, email: &str, code: &str, ttl: Duration) -> AppResult<()> {
        let secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX).max(1);
        self.redis
            .set::<(), _, _>(
                self.key(email),
                code.to_string(),
                Some(Expiration::EX(secs)),
                None,
                false,
            )
            .await
            .map_err(|e| AppError::Redis(e.to_string()))
    }

    async fn verify(&self, email: &str, code: &str) -> AppResult<bool> {
        let key = self.key(email);
        let stored: Option<String> = self
            .redis
            .get(key.clone())
            .await
            .map_err(|e| AppError::Redis(e.to_string()))?;

        if stored.as_deref() != Some(code) {
            return Ok(false);
        }

        // Only the caller whose DEL removed the key consumes the code.
        let deleted: i64 = self
            .redis
            .del(key)
            .await
            .map_err(|e| AppError::Redis(e.to_string()))?;
        Ok(deleted == 1)
    }

    async fn expire(&self, email: &str) -> AppResult<()> {
        let _: i64 = self
            .redis
            .del(self.key(email))
            .await
            .map_err(|e| AppError::Redis(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_code_is_six_digits() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[tokio::test]
    async fn test_memory_store_verifies_once() {
        let store = MemoryOtpStore::new();
        store
            .store("a@example.com", "123456", Duration::from_secs(300))
            .await
            .unwrap();

        assert!(!store.verify("a@example.com", "000000").await.unwrap());
        assert!(store.verify("a@example.com", "123456").await.unwrap());
        assert!(!store.verify("a@example.com", "123456").await.unwrap());
    }

    #[tokio::test]
    async fn test_memory_store_rejects_expired_code() {
        let store = MemoryOtpStore::new();
        store
            .store("b@example.com", "654321", Duration::ZERO)
            .await
            .unwrap();

        assert!(!store.verify("b@example.com", "654321").await.unwrap());
    }

    #[tokio::test]
    async fn test_memory_store_new_code_replaces_old() {
        let store = MemoryOtpStore::new();
        let ttl = Duration::from_secs(300);
        store.store("c@example.com", "111111", ttl).await.unwrap();
        store.store("c@example.com", "222222", ttl).await.unwrap();

        assert!(!store.verify("c@example.com", "111111").await.unwrap());
        assert!(store.verify("c@example.com", "222222").await.unwrap());
    }

    #[tokio::test]
    async fn test_memory_store_expire() {
        let store = MemoryOtpStore::new();
        store
            .store("d@example.com", "333333", Duration::from_secs(300))
            .await
            .unwrap();
        store.expire("d@example.com").await.unwrap();

        assert!(!store.verify("d@example.com", "333333").await.unwrap());
    }

    #[tokio::test]
    async fn test_memory_store_concurrent_verify_succeeds_once() {
        let store = MemoryOtpStore::new();
        store
            .store("e@example.com", "444444", Duration::from_secs(300))
            .await
            .unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.verify("e@example.com", "444444").await })
            })
            .collect();

        let mut accepted = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() {
                accepted += 1;
            }
        }
        assert_eq!(accepted, 1);
    }

    #[tokio::test]
    async fn test_memory_store_prunes_expired_entries() {
        let store = MemoryOtpStore::new();
        store
            .store("stale@example.com", "555555", Duration::ZERO)
            .await
            .unwrap();
        store
            .store("fresh@example.com", "666666", Duration::from_secs(300))
            .await
            .unwrap();

        let codes = store.codes.read().await;
        assert_eq!(codes.len(), 1);
        assert!(codes.contains_key("fresh@example.com"));
    }

    async fn redis_store() -> RedisOtpStore {
        use fred::interfaces::ClientLike;

        let url = std::env::var("TEST_REDIS_URL")
            .unwrap_or_else(|_| "redis://localhost:6380".to_string());
        let config = fred::types::config::Config::from_url(&url).unwrap();
        let client = RedisClient::new(config, None, None, None);
        client.connect();
        client.wait_for_connect().await.unwrap();
        RedisOtpStore::new(Arc::new(client), "policyai_test")
    }

    #[tokio::test]
    #[ignore = "requires running Redis instance"]
    async fn test_redis_store_wrong_code_keeps_pending_code() {
        let store = redis_store().await;
        store
            .store("f@example.com", "777777", Duration::from_secs(60))
            .await
            .unwrap();

        assert!(!store.verify("f@example.com", "000000").await.unwrap());
        assert!(store.verify("f@example.com", "777777").await.unwrap());
        assert!(!store.verify("f@example.com", "777777").await.unwrap());
    }

    #[tokio::test]
    #[ignore = "requires running Redis instance"]
    async fn test_redis_store_concurrent_verify_succeeds_once() {
        let store = redis_store().await;
        store
            .store("g@example.com", "888888", Duration::from_secs(60))
            .await
            .unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.verify("g@example.com", "888888").await })
            })
            .collect();

        let mut accepted = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() {
                accepted += 1;
            }
        }
        assert_eq!(accepted, 1);
    }

    #[test]
    fn test_stores_are_instance_owned() {
        let a = MemoryOtpStore::new();
        let b = MemoryOtpStore::new();
        assert!(!Arc::ptr_eq(&a.codes, &b.codes));
    }
}
