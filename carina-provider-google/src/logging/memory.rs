//! In-memory Logging API
//!
//! Behaves like the exclusion endpoints of the real API closely enough for
//! handler tests: names are unique per parent, missing names are `NotFound`,
//! patches honour the update mask. A status can be injected to make every call
//! fail, e.g. to simulate a permission error.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::api::{ApiError, ApiResult, LogExclusion, LoggingApi};

#[derive(Debug, Default)]
pub struct InMemoryLoggingApi {
    exclusions: Mutex<BTreeMap<String, LogExclusion>>,
    patch_calls: AtomicUsize,
    update_masks: Mutex<Vec<String>>,
    failure: Mutex<Option<(u16, String)>>,
}

impl InMemoryLoggingApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an exclusion directly, bypassing `create_exclusion`
    pub async fn insert(&self, name: impl Into<String>, exclusion: LogExclusion) {
        self.exclusions.lock().await.insert(name.into(), exclusion);
    }

    pub async fn get(&self, name: &str) -> Option<LogExclusion> {
        self.exclusions.lock().await.get(name).cloned()
    }

    pub async fn is_empty(&self) -> bool {
        self.exclusions.lock().await.is_empty()
    }

    /// Number of `patch_exclusion` calls received
    pub fn patch_calls(&self) -> usize {
        self.patch_calls.load(Ordering::SeqCst)
    }

    /// Update masks received, in call order
    pub async fn update_masks(&self) -> Vec<String> {
        self.update_masks.lock().await.clone()
    }

    /// Make every following call fail with the given HTTP status
    pub async fn fail_with(&self, status: u16, message: impl Into<String>) {
        *self.failure.lock().await = Some((status, message.into()));
    }

    async fn check_failure(&self) -> ApiResult<()> {
        match &*self.failure.lock().await {
            Some((status, message)) => Err(ApiError::Status {
                status: *status,
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl LoggingApi for InMemoryLoggingApi {
    async fn create_exclusion(
        &self,
        parent: &str,
        exclusion: &LogExclusion,
    ) -> ApiResult<LogExclusion> {
        self.check_failure().await?;
        if exclusion.name.is_empty() || exclusion.filter.is_empty() {
            return Err(ApiError::Status {
                status: 400,
                message: "exclusion name and filter are required".to_string(),
            });
        }

        let name = format!("{}/exclusions/{}", parent, exclusion.name);
        let mut exclusions = self.exclusions.lock().await;
        if exclusions.contains_key(&name) {
            return Err(ApiError::Status {
                status: 409,
                message: format!("{} already exists", name),
            });
        }
        exclusions.insert(name, exclusion.clone());
        Ok(exclusion.clone())
    }

    async fn get_exclusion(&self, name: &str) -> ApiResult<LogExclusion> {
        self.check_failure().await?;
        self.exclusions
            .lock()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(name.to_string()))
    }

    async fn patch_exclusion(
        &self,
        name: &str,
        exclusion: &LogExclusion,
        update_mask: &str,
    ) -> ApiResult<LogExclusion> {
        self.patch_calls.fetch_add(1, Ordering::SeqCst);
        self.update_masks.lock().await.push(update_mask.to_string());
        self.check_failure().await?;

        let mut exclusions = self.exclusions.lock().await;
        let current = exclusions
            .get_mut(name)
            .ok_or_else(|| ApiError::NotFound(name.to_string()))?;
        current.apply_mask(exclusion, update_mask);
        Ok(current.clone())
    }

    async fn delete_exclusion(&self, name: &str) -> ApiResult<()> {
        self.check_failure().await?;
        self.exclusions
            .lock()
            .await
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| ApiError::NotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exclusion(name: &str) -> LogExclusion {
        LogExclusion {
            name: name.to_string(),
            filter: "severity<INFO".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_then_get() {
        let api = InMemoryLoggingApi::new();
        api.create_exclusion("projects/p", &exclusion("a"))
            .await
            .unwrap();

        let fetched = api.get_exclusion("projects/p/exclusions/a").await.unwrap();
        assert_eq!(fetched, exclusion("a"));
    }

    #[tokio::test]
    async fn duplicate_create_conflicts() {
        let api = InMemoryLoggingApi::new();
        api.create_exclusion("projects/p", &exclusion("a"))
            .await
            .unwrap();
        let err = api
            .create_exclusion("projects/p", &exclusion("a"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 409, .. }));
    }

    #[tokio::test]
    async fn missing_exclusion_is_not_found() {
        let api = InMemoryLoggingApi::new();
        assert!(
            api.get_exclusion("projects/p/exclusions/a")
                .await
                .unwrap_err()
                .is_not_found()
        );
        assert!(
            api.delete_exclusion("projects/p/exclusions/a")
                .await
                .unwrap_err()
                .is_not_found()
        );
    }

    #[tokio::test]
    async fn injected_failure_applies_to_every_call() {
        let api = InMemoryLoggingApi::new();
        api.insert("projects/p/exclusions/a", exclusion("a")).await;
        api.fail_with(403, "permission denied").await;

        let err = api.get_exclusion("projects/p/exclusions/a").await.unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 403, .. }));
        assert!(api.delete_exclusion("projects/p/exclusions/a").await.is_err());
        assert!(api.get("projects/p/exclusions/a").await.is_some());
    }
}
