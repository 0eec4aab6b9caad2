//! In-process lock table with expiry and enforcement.
//!
//! LOCK issues a token recorded here; every mutating handler consults
//! [`LockManager::conflicts`] before touching the store and answers 423 on
//! a conflict. A background task sweeps expired entries. Locks do not
//! survive a process restart.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex},
  time::Duration,
};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use davit_core::path;

/// Fixed lock lifetime, advertised as `Second-3600`.
pub const LOCK_TTL_SECS: i64 = 3600;

/// Interval at which the background sweeper prunes expired entries.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockScope {
  Exclusive,
  Shared,
}

impl LockScope {
  pub fn from_local_name(name: &str) -> Option<Self> {
    match name {
      "exclusive" => Some(Self::Exclusive),
      "shared" => Some(Self::Shared),
      _ => None,
    }
  }

  pub fn local_name(self) -> &'static str {
    match self {
      Self::Exclusive => "exclusive",
      Self::Shared => "shared",
    }
  }
}

/// One issued lock.
#[derive(Debug, Clone)]
pub struct ActiveLock {
  pub token:      String,
  pub path:       String,
  pub scope:      LockScope,
  pub owner:      String,
  pub expires_at: DateTime<Utc>,
}

impl ActiveLock {
  fn is_expired(&self, now: DateTime<Utc>) -> bool {
    self.expires_at <= now
  }

  /// Whether this lock covers `path` (the locked resource itself or any
  /// descendant of a locked collection).
  fn covers(&self, path: &str) -> bool {
    self.path == path || path::is_descendant(path, &self.path)
  }
}

/// Process-wide token→lock table shared through the router state.
#[derive(Clone, Default)]
pub struct LockManager {
  inner: Arc<Mutex<HashMap<String, ActiveLock>>>,
}

impl LockManager {
  pub fn new() -> Self {
    Self::default()
  }

  /// Issue a new lock on `path`. Fails (→ 423) when an unexpired exclusive
  /// lock under a different token already covers the path, or when the
  /// request is exclusive and any unexpired lock covers it.
  pub fn lock(
    &self,
    path: &str,
    scope: LockScope,
    owner: &str,
  ) -> Option<ActiveLock> {
    let now = Utc::now();
    let mut table = self.inner.lock().unwrap();

    let blocked = table.values().any(|l| {
      !l.is_expired(now)
        && (l.covers(path) || path::is_descendant(l.path.as_str(), path))
        && (l.scope == LockScope::Exclusive || scope == LockScope::Exclusive)
    });
    if blocked {
      return None;
    }

    let lock = ActiveLock {
      token: Uuid::new_v4().to_string(),
      path: path.to_owned(),
      scope,
      owner: owner.to_owned(),
      expires_at: now + chrono::Duration::seconds(LOCK_TTL_SECS),
    };
    table.insert(lock.token.clone(), lock.clone());
    Some(lock)
  }

  /// Release the lock named by `token` if it covers `path`.
  /// Returns `false` when no such lock is active.
  pub fn unlock(&self, path: &str, token: &str) -> bool {
    let mut table = self.inner.lock().unwrap();
    match table.get(token) {
      Some(lock) if lock.covers(path) => {
        table.remove(token);
        true
      }
      _ => false,
    }
  }

  /// Whether an unexpired exclusive lock covers `path` without the caller
  /// presenting its token.
  pub fn conflicts(&self, path: &str, presented: Option<&str>) -> bool {
    let now = Utc::now();
    let table = self.inner.lock().unwrap();
    table.values().any(|l| {
      l.scope == LockScope::Exclusive
        && !l.is_expired(now)
        && l.covers(path)
        && presented != Some(l.token.as_str())
    })
  }

  /// Drop every expired entry.
  pub fn sweep(&self) {
    let now = Utc::now();
    self
      .inner
      .lock()
      .unwrap()
      .retain(|_, l| !l.is_expired(now));
  }

  /// Spawn the periodic expiry sweeper.
  pub fn spawn_sweeper(&self) -> tokio::task::JoinHandle<()> {
    let manager = self.clone();
    tokio::spawn(async move {
      let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
      loop {
        ticker.tick().await;
        manager.sweep();
      }
    })
  }

  #[cfg(test)]
  fn expire(&self, token: &str) {
    let mut table = self.inner.lock().unwrap();
    if let Some(lock) = table.get_mut(token) {
      lock.expires_at = Utc::now() - chrono::Duration::seconds(1);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn exclusive_lock_blocks_other_writers() {
    let locks = LockManager::new();
    let lock = locks
      .lock("docs/file.txt", LockScope::Exclusive, "alice")
      .expect("lock issued");

    assert!(locks.conflicts("docs/file.txt", None));
    assert!(locks.conflicts("docs/file.txt", Some("wrong-token")));
    assert!(!locks.conflicts("docs/file.txt", Some(&lock.token)));
    assert!(!locks.conflicts("docs/other.txt", None));
  }

  #[test]
  fn collection_lock_covers_descendants() {
    let locks = LockManager::new();
    locks.lock("docs", LockScope::Exclusive, "alice").unwrap();

    assert!(locks.conflicts("docs/sub/deep.txt", None));
    assert!(!locks.conflicts("docs-other/file.txt", None));
  }

  #[test]
  fn second_exclusive_lock_on_same_path_is_refused() {
    let locks = LockManager::new();
    locks.lock("file.txt", LockScope::Exclusive, "alice").unwrap();
    assert!(locks.lock("file.txt", LockScope::Exclusive, "bob").is_none());
    assert!(locks.lock("file.txt", LockScope::Shared, "bob").is_none());
  }

  #[test]
  fn shared_locks_coexist() {
    let locks = LockManager::new();
    locks.lock("file.txt", LockScope::Shared, "alice").unwrap();
    assert!(locks.lock("file.txt", LockScope::Shared, "bob").is_some());
  }

  #[test]
  fn unlock_releases_enforcement() {
    let locks = LockManager::new();
    let lock = locks
      .lock("file.txt", LockScope::Exclusive, "alice")
      .unwrap();

    assert!(!locks.unlock("file.txt", "bogus"));
    assert!(locks.unlock("file.txt", &lock.token));
    assert!(!locks.conflicts("file.txt", None));
  }

  #[test]
  fn sweep_drops_expired_locks() {
    let locks = LockManager::new();
    let lock = locks
      .lock("file.txt", LockScope::Exclusive, "alice")
      .unwrap();
    locks.expire(&lock.token);

    locks.sweep();
    assert!(!locks.conflicts("file.txt", None));
    assert!(locks.lock("file.txt", LockScope::Exclusive, "bob").is_some());
  }
}
