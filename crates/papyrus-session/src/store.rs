//! # Session Store
//!
//! 进程内会话存储。
//!
//! - 首次引用即创建会话，无需显式创建
//! - 同一会话的所有操作经由会话锁串行执行，不同会话完全并行
//! - 空闲过期 + 容量上限（淘汰最久未访问且未被占用的会话）

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use papyrus_core::DocumentInfo;
use parking_lot::RwLock;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::error::{SessionError, SessionResult};
use crate::types::Session;

/// SessionStore 配置
#[derive(Debug, Clone)]
pub struct SessionStoreConfig {
    /// 空闲过期时间（秒），0 表示永不过期
    pub idle_ttl_secs: u64,
    /// 后台清理间隔（秒）
    pub cleanup_interval_secs: u64,
    /// 最大会话数
    pub max_sessions: usize,
}

impl Default for SessionStoreConfig {
    fn default() -> Self {
        Self {
            idle_ttl_secs: 86_400,
            cleanup_interval_secs: 300,
            max_sessions: 10_000,
        }
    }
}

impl SessionStoreConfig {
    /// 设置空闲过期时间
    pub fn with_idle_ttl(mut self, secs: u64) -> Self {
        self.idle_ttl_secs = secs;
        self
    }

    /// 设置清理间隔
    pub fn with_cleanup_interval(mut self, secs: u64) -> Self {
        self.cleanup_interval_secs = secs;
        self
    }

    /// 设置最大会话数
    pub fn with_max_sessions(mut self, max: usize) -> Self {
        self.max_sessions = max;
        self
    }
}

/// 内存中的会话槽位
#[derive(Debug)]
struct SessionSlot {
    session: Arc<Mutex<Session>>,
    last_accessed: RwLock<DateTime<Utc>>,
}

impl SessionSlot {
    fn new(session_id: &str) -> Self {
        Self {
            session: Arc::new(Mutex::new(Session::new(session_id))),
            last_accessed: RwLock::new(Utc::now()),
        }
    }

    fn touch(&self) {
        *self.last_accessed.write() = Utc::now();
    }

    fn last_accessed(&self) -> DateTime<Utc> {
        *self.last_accessed.read()
    }

    fn is_expired(&self, ttl_secs: u64) -> bool {
        let elapsed = Utc::now().signed_duration_since(self.last_accessed());
        elapsed.num_seconds() >= ttl_secs as i64
    }
}

/// 只有 map 自身持有引用的槽位才能被淘汰
fn is_unreferenced(slot: &Arc<SessionSlot>) -> bool {
    Arc::strong_count(slot) == 1 && Arc::strong_count(&slot.session) == 1
}

/// 持有期间独占访问一个会话
pub struct SessionGuard {
    guard: OwnedMutexGuard<Session>,
    slot: Arc<SessionSlot>,
}

impl Deref for SessionGuard {
    type Target = Session;

    fn deref(&self) -> &Session {
        &self.guard
    }
}

impl DerefMut for SessionGuard {
    fn deref_mut(&mut self) -> &mut Session {
        &mut self.guard
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.slot.touch();
    }
}

/// 会话存储
#[derive(Debug)]
pub struct SessionStore {
    config: SessionStoreConfig,
    sessions: DashMap<String, Arc<SessionSlot>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(SessionStoreConfig::default())
    }
}

impl SessionStore {
    /// 创建新的 SessionStore
    pub fn new(config: SessionStoreConfig) -> Self {
        Self {
            config,
            sessions: DashMap::new(),
        }
    }

    pub fn config(&self) -> &SessionStoreConfig {
        &self.config
    }

    /// 获取会话的独占访问权，不存在则创建
    pub async fn lock(&self, session_id: &str) -> SessionResult<SessionGuard> {
        let slot = self.slot_or_create(session_id)?;
        slot.touch();
        let guard = Arc::clone(&slot.session).lock_owned().await;
        Ok(SessionGuard { guard, slot })
    }

    /// 获取已有会话的独占访问权，不会创建
    pub async fn lock_existing(&self, session_id: &str) -> Option<SessionGuard> {
        let slot = self.sessions.get(session_id).map(|entry| Arc::clone(entry.value()))?;
        slot.touch();
        let guard = Arc::clone(&slot.session).lock_owned().await;
        Some(SessionGuard { guard, slot })
    }

    /// 会话快照（克隆），不会创建
    pub async fn snapshot(&self, session_id: &str) -> Option<Session> {
        let guard = self.lock_existing(session_id).await?;
        Some(guard.clone())
    }

    /// 已上传文档列表；未知会话返回空列表
    pub async fn document_infos(&self, session_id: &str) -> Vec<DocumentInfo> {
        match self.lock_existing(session_id).await {
            Some(guard) => guard.document_infos(),
            None => Vec::new(),
        }
    }

    /// 清空会话文档；未知会话为空操作
    ///
    /// 返回会话是否存在。
    pub async fn clear_documents(&self, session_id: &str) -> bool {
        match self.lock_existing(session_id).await {
            Some(mut guard) => {
                guard.clear_documents();
                true
            }
            None => false,
        }
    }

    /// 当前内存中的会话数
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    fn slot_or_create(&self, session_id: &str) -> SessionResult<Arc<SessionSlot>> {
        if let Some(entry) = self.sessions.get(session_id) {
            return Ok(Arc::clone(entry.value()));
        }

        if self.sessions.len() >= self.config.max_sessions {
            self.evict_for_capacity()?;
        }

        let slot = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                debug!("Created session: {}", session_id);
                Arc::new(SessionSlot::new(session_id))
            });
        Ok(Arc::clone(slot.value()))
    }

    /// 淘汰最久未访问的空闲会话，直到低于容量上限
    fn evict_for_capacity(&self) -> SessionResult<()> {
        while self.sessions.len() >= self.config.max_sessions {
            let candidate = self
                .sessions
                .iter()
                .filter(|entry| is_unreferenced(entry.value()))
                .min_by_key(|entry| entry.value().last_accessed())
                .map(|entry| entry.key().clone());

            let Some(id) = candidate else {
                warn!(
                    "Session capacity {} reached and every session is in use",
                    self.config.max_sessions
                );
                return Err(SessionError::CapacityExceeded {
                    limit: self.config.max_sessions,
                });
            };

            if self.sessions.remove_if(&id, |_, slot| is_unreferenced(slot)).is_some() {
                info!("Evicted least recently used session: {}", id);
            }
        }
        Ok(())
    }

    /// 清理过期会话，返回清理数量
    pub fn evict_expired(&self) -> usize {
        let ttl = self.config.idle_ttl_secs;
        if ttl == 0 {
            return 0;
        }

        let expired_ids: Vec<String> = self
            .sessions
            .iter()
            .filter(|entry| is_unreferenced(entry.value()) && entry.value().is_expired(ttl))
            .map(|entry| entry.key().clone())
            .collect();

        let mut evicted = 0;
        for id in expired_ids {
            let removed = self
                .sessions
                .remove_if(&id, |_, slot| is_unreferenced(slot) && slot.is_expired(ttl));
            if removed.is_some() {
                debug!("Evicted expired session: {}", id);
                evicted += 1;
            }
        }

        if evicted > 0 {
            info!("Evicted {} expired sessions from memory", evicted);
        }
        evicted
    }

    /// 启动后台清理任务
    ///
    /// 任务只持有弱引用，store 释放后自动退出。
    pub fn spawn_cleanup(self: &Arc<Self>) -> JoinHandle<()> {
        let store: Weak<Self> = Arc::downgrade(self);
        let period = Duration::from_secs(self.config.cleanup_interval_secs.max(1));

        tokio::spawn(async move {
            let mut cleanup_interval = interval(period);
            // 第一次 tick 立即返回
            cleanup_interval.tick().await;

            loop {
                cleanup_interval.tick().await;
                let Some(store) = store.upgrade() else {
                    debug!("Session store dropped, stopping cleanup task");
                    break;
                };
                store.evict_expired();
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use papyrus_core::DocumentRecord;

    fn store_with(config: SessionStoreConfig) -> SessionStore {
        SessionStore::new(config)
    }

    #[tokio::test]
    async fn test_lock_creates_session() {
        let store = SessionStore::default();
        assert!(!store.contains("s1"));

        {
            let mut guard = store.lock("s1").await.unwrap();
            assert_eq!(guard.id, "s1");
            guard.push_user("hello");
        }

        assert!(store.contains("s1"));
        let snapshot = store.snapshot("s1").await.unwrap();
        assert_eq!(snapshot.conversation.len(), 1);
    }

    #[tokio::test]
    async fn test_reads_do_not_create() {
        let store = SessionStore::default();

        assert!(store.snapshot("never-seen").await.is_none());
        assert!(store.document_infos("never-seen").await.is_empty());
        assert!(!store.clear_documents("never-seen").await);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_clear_documents_idempotent() {
        let store = SessionStore::default();
        store
            .lock("s1")
            .await
            .unwrap()
            .add_document(DocumentRecord::new("a.pdf", "alpha"));

        assert!(store.clear_documents("s1").await);
        assert!(store.clear_documents("s1").await);
        assert!(store.document_infos("s1").await.is_empty());
    }

    #[tokio::test]
    async fn test_session_isolation() {
        let store = SessionStore::default();
        store.lock("s1").await.unwrap().push_user("one");
        store
            .lock("s2")
            .await
            .unwrap()
            .add_document(DocumentRecord::new("b.pdf", "beta"));

        store.clear_documents("s1").await;

        let s1 = store.snapshot("s1").await.unwrap();
        let s2 = store.snapshot("s2").await.unwrap();
        assert_eq!(s1.conversation.len(), 1);
        assert!(s1.documents.is_empty());
        assert!(s2.conversation.is_empty());
        assert_eq!(s2.documents.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_same_session_operations_serialized() {
        let store = Arc::new(SessionStore::default());

        let mut handles = Vec::new();
        for i in 0..50 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let mut guard = store.lock("shared").await.unwrap();
                let before = guard.conversation.len();
                tokio::task::yield_now().await;
                guard.push_user(format!("m{}", i));
                tokio::task::yield_now().await;
                guard.push_assistant(format!("r{}", i));
                assert_eq!(guard.conversation.len(), before + 2);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let session = store.snapshot("shared").await.unwrap();
        assert_eq!(session.conversation.len(), 100);
        for pair in session.conversation.chunks(2) {
            assert_eq!(pair[0].role, papyrus_core::Role::User);
            assert_eq!(&pair[0].text()[1..], &pair[1].text()[1..]);
        }
    }

    #[tokio::test]
    async fn test_evict_expired_skips_in_use() {
        let store = store_with(SessionStoreConfig::default().with_idle_ttl(1));
        store.lock("idle").await.unwrap().push_user("x");
        let held = store.lock("busy").await.unwrap();

        for id in ["idle", "busy"] {
            let slot = store.sessions.get(id).unwrap();
            *slot.last_accessed.write() = Utc::now() - chrono::Duration::seconds(10);
        }

        assert_eq!(store.evict_expired(), 1);
        assert!(!store.contains("idle"));
        assert!(store.contains("busy"));
        drop(held);
    }

    #[tokio::test]
    async fn test_zero_ttl_never_expires() {
        let store = store_with(SessionStoreConfig::default().with_idle_ttl(0));
        store.lock("s1").await.unwrap();
        assert_eq!(store.evict_expired(), 0);
        assert!(store.contains("s1"));
    }

    #[tokio::test]
    async fn test_capacity_evicts_least_recently_used() {
        let store = store_with(SessionStoreConfig::default().with_max_sessions(2));
        store.lock("a").await.unwrap();
        store.lock("b").await.unwrap();
        {
            let slot = store.sessions.get("a").unwrap();
            *slot.last_accessed.write() = Utc::now() - chrono::Duration::seconds(60);
        }

        store.lock("c").await.unwrap();

        assert_eq!(store.len(), 2);
        assert!(!store.contains("a"));
        assert!(store.contains("b"));
        assert!(store.contains("c"));
    }

    #[tokio::test]
    async fn test_capacity_exceeded_when_all_in_use() {
        let store = store_with(SessionStoreConfig::default().with_max_sessions(1));
        let _held = store.lock("a").await.unwrap();

        let err = store.lock("b").await.err().unwrap();
        assert_eq!(err, SessionError::CapacityExceeded { limit: 1 });
        assert!(store.contains("a"));
    }

    #[tokio::test]
    async fn test_cleanup_task_stops_when_store_dropped() {
        let store = Arc::new(store_with(
            SessionStoreConfig::default().with_cleanup_interval(1),
        ));
        let handle = store.spawn_cleanup();
        drop(store);

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
