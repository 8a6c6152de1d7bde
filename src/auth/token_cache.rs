//! # 授权码令牌缓存
//!
//! 进程内的授权码到交换结果的映射，连接浏览器重定向流程与程序化客户端。
//!
//! - 同一授权码最多对应一条记录，`consume` 读取即删除，只有一个调用方能拿到
//! - 未缓存的授权码同时到达多个回调时只触发一次上游交换（single-flight）
//! - 交换在独立任务中运行，客户端断开不会取消交换，结果仍会写入缓存
//! - 没有过期淘汰：未被取走的记录一直保留到进程重启

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::types::TokenRecord;
use crate::error::{AuthError, AuthResult};
use crate::logging::{LogComponent, LogStage, sanitize_token_for_logging};
use crate::{ldebug, linfo, lwarn};

type SharedExchange = Shared<BoxFuture<'static, AuthResult<TokenRecord>>>;

#[derive(Default)]
struct CacheState {
    records: HashMap<String, TokenRecord>,
    in_flight: HashMap<String, SharedExchange>,
    /// 已取走的授权码，之后的回调不再交换
    consumed: HashSet<String>,
}

/// 令牌缓存
///
/// 克隆开销很小，所有克隆共享同一份状态。锁不会跨越 `.await` 持有。
#[derive(Clone, Default)]
pub struct TokenCache {
    state: Arc<Mutex<CacheState>>,
}

impl TokenCache {
    /// 创建空缓存
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 写入记录，同一授权码以最后一次写入为准
    pub fn put(&self, code: impl Into<String>, record: TokenRecord) {
        let code = code.into();
        ldebug!(
            "system",
            LogStage::Cache,
            LogComponent::TokenCache,
            "put",
            "缓存令牌记录",
            code = %sanitize_token_for_logging(&code)
        );
        let mut state = self.lock();
        state.consumed.remove(&code);
        state.records.insert(code, record);
    }

    /// 读取记录但不消费
    #[must_use]
    pub fn peek(&self, code: &str) -> Option<TokenRecord> {
        self.lock().records.get(code).cloned()
    }

    /// 原子地读取并删除记录
    ///
    /// 并发消费同一授权码时只有一个调用方得到记录，其余得到 `TokenNotFound`
    pub fn consume(&self, code: &str) -> AuthResult<TokenRecord> {
        let removed = {
            let mut state = self.lock();
            let removed = state.records.remove(code);
            if removed.is_some() {
                state.consumed.insert(code.to_string());
            }
            removed
        };
        match removed {
            Some(record) => {
                linfo!(
                    "system",
                    LogStage::Cache,
                    LogComponent::TokenCache,
                    "consume",
                    "令牌记录已取走",
                    code = %sanitize_token_for_logging(code)
                );
                Ok(record)
            }
            None => Err(AuthError::TokenNotFound),
        }
    }

    /// 命中缓存时直接返回记录（不消费），否则执行交换并缓存成功结果
    ///
    /// 已被 `consume` 取走的授权码直接返回 `TokenNotFound`，不再交换。
    /// `exchange` 只在授权码既未缓存也没有进行中的交换时调用一次。
    /// 交换失败时不写缓存，错误分发给所有等待方。
    pub async fn peek_or_exchange<F, Fut>(&self, code: &str, exchange: F) -> AuthResult<TokenRecord>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = AuthResult<TokenRecord>> + Send + 'static,
    {
        let pending = {
            let mut state = self.lock();

            if state.consumed.contains(code) {
                lwarn!(
                    "system",
                    LogStage::Cache,
                    LogComponent::TokenCache,
                    "peek_or_exchange",
                    "授权码已被取走，拒绝再次交换",
                    code = %sanitize_token_for_logging(code)
                );
                return Err(AuthError::TokenNotFound);
            }

            if let Some(record) = state.records.get(code) {
                ldebug!(
                    "system",
                    LogStage::Cache,
                    LogComponent::TokenCache,
                    "peek_or_exchange",
                    "授权码已缓存，直接返回",
                    code = %sanitize_token_for_logging(code)
                );
                return Ok(record.clone());
            }

            if let Some(pending) = state.in_flight.get(code) {
                ldebug!(
                    "system",
                    LogStage::Cache,
                    LogComponent::TokenCache,
                    "peek_or_exchange",
                    "等待进行中的交换",
                    code = %sanitize_token_for_logging(code)
                );
                pending.clone()
            } else {
                let pending = self.spawn_exchange(code, exchange(code.to_string()));
                state.in_flight.insert(code.to_string(), pending.clone());
                pending
            }
        };

        pending.await
    }

    /// 在独立任务中运行交换，任务自己负责写缓存和清理进行中标记
    fn spawn_exchange<Fut>(&self, code: &str, exchange: Fut) -> SharedExchange
    where
        Fut: Future<Output = AuthResult<TokenRecord>> + Send + 'static,
    {
        let cache = self.clone();
        let key = code.to_string();
        let handle = tokio::spawn(async move {
            let outcome = exchange.await;
            cache.complete(&key, &outcome);
            outcome
        });

        async move {
            handle.await.unwrap_or_else(|e| {
                Err(AuthError::Internal(format!("token exchange task failed: {e}")))
            })
        }
        .boxed()
        .shared()
    }

    fn complete(&self, code: &str, outcome: &AuthResult<TokenRecord>) {
        let mut state = self.lock();
        state.in_flight.remove(code);
        match outcome {
            Ok(record) => {
                state.records.insert(code.to_string(), record.clone());
            }
            Err(err) => {
                lwarn!(
                    "system",
                    LogStage::Cache,
                    LogComponent::TokenCache,
                    "complete",
                    "授权码交换失败，不写入缓存",
                    code = %sanitize_token_for_logging(code),
                    error = %err
                );
            }
        }
    }

    /// 已缓存（尚未取走）的记录数
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 进行中的交换数
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.lock().in_flight.len()
    }
}

impl std::fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("TokenCache")
            .field("records", &state.records.len())
            .field("in_flight", &state.in_flight.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::init_test_env;
    use serde_json::{Map, json};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn record(token: &str) -> TokenRecord {
        let mut info = Map::new();
        info.insert("email".into(), json!("test@test.com"));
        TokenRecord::new(token, info)
    }

    #[test]
    fn test_put_then_consume_once() {
        let cache = TokenCache::new();
        cache.put("code1", record("t1"));

        assert_eq!(cache.consume("code1"), Ok(record("t1")));
        assert_eq!(cache.consume("code1"), Err(AuthError::TokenNotFound));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_put_is_upsert() {
        let cache = TokenCache::new();
        cache.put("code1", record("first"));
        cache.put("code1", record("second"));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.peek("code1"), Some(record("second")));
    }

    #[test]
    fn test_peek_does_not_consume() {
        let cache = TokenCache::new();
        cache.put("code1", record("t1"));

        assert!(cache.peek("code1").is_some());
        assert!(cache.peek("code1").is_some());
        assert!(cache.consume("code1").is_ok());
        assert!(cache.peek("code1").is_none());
    }

    #[tokio::test]
    async fn test_cached_code_skips_exchange() {
        let cache = TokenCache::new();
        cache.put("code1", record("t1"));

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let got = cache
            .peek_or_exchange("code1", move |_| async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(record("other"))
            })
            .await
            .unwrap();

        assert_eq!(got, record("t1"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_consumed_code_is_never_exchanged_again() {
        init_test_env();
        let cache = TokenCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let exchange = |calls: Arc<AtomicUsize>| {
            move |code: String| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, AuthError>(record(&format!("token-for-{code}")))
            }
        };

        let first = cache
            .peek_or_exchange("once", exchange(Arc::clone(&calls)))
            .await
            .unwrap();
        assert_eq!(cache.consume("once"), Ok(first));

        let again = cache
            .peek_or_exchange("once", exchange(Arc::clone(&calls)))
            .await;
        assert_eq!(again, Err(AuthError::TokenNotFound));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.is_empty());
        assert_eq!(cache.consume("once"), Err(AuthError::TokenNotFound));
    }

    #[test]
    fn test_put_after_consume_makes_code_available() {
        let cache = TokenCache::new();
        cache.put("code1", record("t1"));
        assert!(cache.consume("code1").is_ok());

        cache.put("code1", record("t2"));
        assert_eq!(cache.peek("code1"), Some(record("t2")));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callbacks_share_one_exchange() {
        init_test_env();
        let cache = TokenCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let cache = cache.clone();
            let calls = Arc::clone(&calls);
            tasks.push(tokio::spawn(async move {
                cache
                    .peek_or_exchange("race", move |code| async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok(record(&format!("token-for-{code}")))
                    })
                    .await
            }));
        }

        for task in tasks {
            assert_eq!(task.await.unwrap(), Ok(record("token-for-race")));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_failed_exchange_is_not_cached() {
        let cache = TokenCache::new();
        let err = cache
            .peek_or_exchange("bad", |_| async {
                Err(AuthError::UpstreamExchange {
                    status: 400,
                    body: "invalid_grant".into(),
                })
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::UpstreamExchange { status: 400, .. }));
        assert!(cache.is_empty());
        assert_eq!(cache.in_flight(), 0);
        assert_eq!(cache.consume("bad"), Err(AuthError::TokenNotFound));
    }

    #[tokio::test]
    async fn test_abandoned_callback_still_caches_result() {
        init_test_env();
        let cache = TokenCache::new();
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

        let waiter = {
            let cache = cache.clone();
            tokio::spawn(async move {
                cache
                    .peek_or_exchange("dropped", move |_| async move {
                        let _ = release_rx.await;
                        Ok(record("late"))
                    })
                    .await
            })
        };

        while cache.in_flight() == 0 {
            tokio::task::yield_now().await;
        }
        waiter.abort();
        let _ = waiter.await;
        release_tx.send(()).unwrap();

        for _ in 0..100 {
            if cache.peek("dropped").is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(cache.consume("dropped"), Ok(record("late")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_never_expire() {
        let cache = TokenCache::new();
        cache.put("forgotten", record("t"));

        tokio::time::advance(Duration::from_secs(7 * 24 * 3600)).await;

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.peek("forgotten"), Some(record("t")));
    }
}
