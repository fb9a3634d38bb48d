//! Session acquisition and release.
//!
//! [`SessionManager::acquire`] hands out a [`SessionGuard`] that releases
//! its session when dropped, so a unit that panics, times out, or is
//! cancelled mid-await still gives its session back.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::{IdentityProfile, PacingPolicy, Session};
use crate::config::SearchConfig;
use crate::types::{EngineId, Language, Region};

/// Hands out isolated sessions and tracks how many are live.
#[derive(Debug)]
pub struct SessionManager {
    user_agent: Option<String>,
    pacing: PacingPolicy,
    next_id: AtomicU64,
    active: Arc<AtomicUsize>,
}

impl SessionManager {
    pub fn new(config: &SearchConfig) -> Self {
        Self::with_pacing(config, PacingPolicy::from_config(config))
    }

    /// Build a manager with an explicit pacing policy.
    pub fn with_pacing(config: &SearchConfig, pacing: PacingPolicy) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            pacing,
            next_id: AtomicU64::new(1),
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Open a fresh session for `engine` with an identity for the locale.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SearchError::Session`] if the session cannot be built.
    pub fn acquire(
        &self,
        engine: EngineId,
        region: Region,
        language: Language,
        timeout: Duration,
    ) -> crate::Result<SessionGuard> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let identity = IdentityProfile::randomized(region, language, self.user_agent.as_deref());
        let session = Session::open(id, engine, identity, self.pacing, timeout)?;

        let live = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(%engine, session = id, live, "session acquired");

        Ok(SessionGuard {
            session,
            active: Arc::clone(&self.active),
        })
    }

    /// Release a session explicitly. Dropping the guard has the same effect.
    pub fn release(&self, guard: SessionGuard) {
        drop(guard);
    }

    /// Number of sessions currently acquired and not yet released.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

/// Exclusive handle to an acquired [`Session`]. Releases on drop.
#[derive(Debug)]
pub struct SessionGuard {
    session: Session,
    active: Arc<AtomicUsize>,
}

impl Deref for SessionGuard {
    type Target = Session;

    fn deref(&self) -> &Session {
        &self.session
    }
}

impl DerefMut for SessionGuard {
    fn deref_mut(&mut self) -> &mut Session {
        &mut self.session
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let live = self.active.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        tracing::debug!(
            engine = %self.session.engine(),
            session = self.session.id(),
            live,
            "session released"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> SessionManager {
        SessionManager::with_pacing(&SearchConfig::default(), PacingPolicy::immediate())
    }

    #[test]
    fn acquire_and_drop_balances_count() {
        let manager = manager();
        {
            let _a = manager
                .acquire(EngineId::Google, Region::Global, Language::Auto, Duration::from_secs(1))
                .expect("acquire");
            let _b = manager
                .acquire(EngineId::Bing, Region::Fr, Language::Fr, Duration::from_secs(1))
                .expect("acquire");
            assert_eq!(manager.active(), 2);
        }
        assert_eq!(manager.active(), 0);
    }

    #[test]
    fn explicit_release_decrements() {
        let manager = manager();
        let guard = manager
            .acquire(EngineId::Yandex, Region::Global, Language::Auto, Duration::from_secs(1))
            .expect("acquire");
        assert_eq!(manager.active(), 1);
        manager.release(guard);
        assert_eq!(manager.active(), 0);
    }

    #[test]
    fn sessions_get_distinct_ids() {
        let manager = manager();
        let a = manager
            .acquire(EngineId::Google, Region::Global, Language::Auto, Duration::from_secs(1))
            .expect("acquire");
        let b = manager
            .acquire(EngineId::Google, Region::Global, Language::Auto, Duration::from_secs(1))
            .expect("acquire");
        assert_ne!(a.id(), b.id());
        assert_eq!(a.engine(), EngineId::Google);
    }

    #[test]
    fn configured_user_agent_applies_to_sessions() {
        let config = SearchConfig {
            user_agent: Some("TestBot/1.0".into()),
            ..Default::default()
        };
        let manager = SessionManager::new(&config);
        let guard = manager
            .acquire(EngineId::Brave, Region::Us, Language::En, Duration::from_secs(1))
            .expect("acquire");
        assert_eq!(guard.identity().user_agent, "TestBot/1.0");
    }

    #[test]
    fn guard_released_when_task_panics() {
        let manager = Arc::new(manager());
        let inner = Arc::clone(&manager);
        let result = std::thread::spawn(move || {
            let _guard = inner
                .acquire(EngineId::Baidu, Region::Cn, Language::Zh, Duration::from_secs(1))
                .expect("acquire");
            panic!("adapter crashed");
        })
        .join();
        assert!(result.is_err());
        assert_eq!(manager.active(), 0);
    }
}
