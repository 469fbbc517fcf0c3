//! Deployment cloning.
//!
//! A clone is built in three phases:
//!
//! 1. [`DeploymentCloner::check_source`] verifies the source icon exists.
//! 2. [`DeploymentCloner::stage`] builds the complete new aggregate in memory,
//!    minting ids in dependency order (articles before module configs before
//!    key actions) and planning one storage copy per referenced asset.
//! 3. [`DeploymentCloner::copy_assets`] runs the planned copies with bounded
//!    concurrency and per-attempt timeouts.
//!
//! Persisting the staged aggregate is left to the caller, which writes it in
//! a single transaction.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::stream::{self, TryStreamExt};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::asset::{rescope_key, AssetRef};
use crate::deployment::{validate_entity_name, Deployment, DeploymentStatus, FIRST_VERSION};
use crate::error::CoreError;
use crate::remap::IdRemapTable;
use crate::retry::{with_retry, RetryPolicy};
use crate::storage::AssetStorage;
use crate::types::{new_id, EntityId, Timestamp};

// ---------------------------------------------------------------------------
// Request / config / report
// ---------------------------------------------------------------------------

/// Input of a clone operation.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CloneDeploymentRequest {
    pub reference_id: EntityId,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
}

/// Tuning for the asset-copy phase.
#[derive(Debug, Clone)]
pub struct CloneConfig {
    /// Upper bound on storage copies in flight.
    pub max_concurrent_copies: usize,
    pub retry: RetryPolicy,
}

impl Default for CloneConfig {
    fn default() -> Self {
        Self {
            max_concurrent_copies: 8,
            retry: RetryPolicy::default(),
        }
    }
}

/// What a clone did besides copying configuration verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CloneReport {
    pub copied_assets: usize,
    /// Learn-article ids dropped from module configs because the source
    /// learn tree has no such article.
    pub dropped_article_refs: usize,
    /// Key-action references left unset because their target was not found.
    pub unresolved_key_action_refs: usize,
}

/// One planned server-side copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetCopy {
    pub bucket: String,
    pub src_key: String,
    pub dst_key: String,
}

/// A new aggregate built in memory, plus the storage work it still needs.
#[derive(Debug, Clone)]
pub struct StagedClone {
    pub deployment: Deployment,
    pub asset_copies: Vec<AssetCopy>,
    pub report: CloneReport,
}

impl StagedClone {
    pub fn id(&self) -> Result<EntityId, CoreError> {
        self.deployment
            .id
            .ok_or_else(|| CoreError::Internal("Staged clone has no id".into()))
    }
}

// ---------------------------------------------------------------------------
// Asset relocation plan
// ---------------------------------------------------------------------------

struct AssetPlan {
    from: EntityId,
    to: EntityId,
    copies: Vec<AssetCopy>,
    seen: HashSet<(String, String)>,
}

impl AssetPlan {
    fn new(from: EntityId, to: EntityId) -> Self {
        Self {
            from,
            to,
            copies: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Point `slot` at the target deployment's copy of its object.
    fn relocate(&mut self, slot: &mut Option<AssetRef>) {
        let Some(asset) = slot.as_mut() else {
            return;
        };
        let dst_key = rescope_key(&asset.key, self.from, self.to);
        if self.seen.insert((asset.bucket.clone(), asset.key.clone())) {
            self.copies.push(AssetCopy {
                bucket: asset.bucket.clone(),
                src_key: asset.key.clone(),
                dst_key: dst_key.clone(),
            });
        }
        *asset = asset.with_key(dst_key);
    }
}

// ---------------------------------------------------------------------------
// Cloner
// ---------------------------------------------------------------------------

pub struct DeploymentCloner {
    storage: Arc<dyn AssetStorage>,
    config: CloneConfig,
}

impl DeploymentCloner {
    pub fn new(storage: Arc<dyn AssetStorage>, config: CloneConfig) -> Self {
        Self { storage, config }
    }

    /// Run all in-memory and storage phases of a clone.
    ///
    /// Nothing is written to storage unless the source passes
    /// [`check_source`](Self::check_source). A failure after some copies
    /// succeeded is reported as [`CoreError::PartialClone`].
    pub async fn clone_deployment(
        &self,
        source: &Deployment,
        name: &str,
        now: Timestamp,
    ) -> Result<StagedClone, CoreError> {
        self.check_source(source).await?;
        let mut staged = self.stage(source, name, now)?;
        staged.report.copied_assets = self.copy_assets(&staged).await?;
        Ok(staged)
    }

    /// Fail with [`CoreError::InvalidSource`] when the source icon is missing.
    pub async fn check_source(&self, source: &Deployment) -> Result<(), CoreError> {
        let Some(icon) = &source.icon else {
            return Ok(());
        };
        let exists = with_retry(&self.config.retry, "file_exists", || {
            self.storage.file_exists(&icon.bucket, &icon.key)
        })
        .await?;
        if !exists {
            return Err(CoreError::InvalidSource(format!(
                "Deployment icon {}/{} does not exist",
                icon.bucket, icon.key
            )));
        }
        Ok(())
    }

    /// Build the new aggregate without touching storage.
    pub fn stage(
        &self,
        source: &Deployment,
        name: &str,
        now: Timestamp,
    ) -> Result<StagedClone, CoreError> {
        validate_entity_name("name", name)?;
        let source_id = source
            .id
            .ok_or_else(|| CoreError::InvalidSource("Source deployment has no id".into()))?;

        let new_deployment_id = new_id();
        let mut plan = AssetPlan::new(source_id, new_deployment_id);
        let mut report = CloneReport::default();
        let mut clone = source.clone();

        // Bare aggregate.
        clone.id = Some(new_deployment_id);
        clone.name = name.to_string();
        clone.status = DeploymentStatus::Draft;
        clone.version = FIRST_VERSION;
        clone.created_at = Some(now);
        clone.updated_at = Some(now);
        clone.enrollment_counter = None;
        clone.stats = None;
        clone.clear_activation_codes();
        plan.relocate(&mut clone.icon);

        // Consent and e-consent.
        if let Some(consent) = &mut clone.consent {
            consent.reset_for_copy(new_id(), now);
        }
        if let Some(econsent) = &mut clone.econsent {
            econsent.reset_for_copy(new_id(), now);
            for section in &mut econsent.sections {
                section.id = Some(new_id());
                plan.relocate(&mut section.thumbnail_location);
                plan.relocate(&mut section.video_location);
            }
        }

        // Onboarding configs keep their order and versions.
        for config in &mut clone.onboarding_configs {
            config.id = Some(new_id());
        }

        for role in &mut clone.roles {
            role.id = Some(new_id());
        }

        // Learn tree: every article gets a new id recorded for later lookups.
        let mut articles = IdRemapTable::new();
        if let Some(learn) = &mut clone.learn {
            learn.id = Some(new_id());
            for section in &mut learn.sections {
                section.id = Some(new_id());
                section.created_at = Some(now);
                section.updated_at = Some(now);
                for article in &mut section.articles {
                    let new_article_id = new_id();
                    if let Some(old) = article.id {
                        articles.insert(old, new_article_id);
                    }
                    article.id = Some(new_article_id);
                    article.created_at = Some(now);
                    article.updated_at = Some(now);
                    plan.relocate(&mut article.thumbnail);
                    if let Some(content) = &mut article.content {
                        plan.relocate(&mut content.video);
                    }
                }
            }
        }

        // Module configs depend on the article table.
        let mut module_configs = IdRemapTable::new();
        for config in &mut clone.module_configs {
            let new_config_id = new_id();
            if let Some(old) = config.id {
                module_configs.insert(old, new_config_id);
            }
            config.id = Some(new_config_id);
            config.created_at = Some(now);
            config.updated_at = Some(now);

            let (resolved, dropped) = articles.remap_all(&config.learn_article_ids);
            if !dropped.is_empty() {
                tracing::warn!(
                    source_deployment_id = %source_id,
                    module_id = %config.module_id,
                    dropped = ?dropped,
                    "Dropping learn article references missing from the source learn tree",
                );
                report.dropped_article_refs += dropped.len();
            }
            config.learn_article_ids = resolved;
        }

        // Key actions depend on both tables.
        for action in &mut clone.key_actions {
            action.id = Some(new_id());
            if let Some(old) = action.module_config_id {
                action.module_config_id = module_configs.get(&old);
                if action.module_config_id.is_none() {
                    report.unresolved_key_action_refs += 1;
                    tracing::warn!(
                        source_deployment_id = %source_id,
                        module_config_id = %old,
                        "Key action references an unknown module config",
                    );
                }
            }
            if let Some(old) = action.learn_article_id {
                action.learn_article_id = articles.get(&old);
                if action.learn_article_id.is_none() {
                    report.unresolved_key_action_refs += 1;
                    tracing::warn!(
                        source_deployment_id = %source_id,
                        learn_article_id = %old,
                        "Key action references an unknown learn article",
                    );
                }
            }
        }

        Ok(StagedClone {
            deployment: clone,
            asset_copies: plan.copies,
            report,
        })
    }

    /// Execute the planned copies, returning how many succeeded.
    ///
    /// The first failed copy stops the run: no further copies are started and
    /// in-flight ones are dropped.
    pub async fn copy_assets(&self, staged: &StagedClone) -> Result<usize, CoreError> {
        let deployment_id = staged.id()?;
        let concurrency = self.config.max_concurrent_copies.max(1);
        let copied = AtomicUsize::new(0);

        let result = stream::iter(staged.asset_copies.iter().map(Ok::<_, CoreError>))
            .try_for_each_concurrent(concurrency, |copy| {
                let copied = &copied;
                async move {
                    self.copy_one(deployment_id, copy).await?;
                    copied.fetch_add(1, Ordering::Relaxed);
                    Ok(())
                }
            })
            .await;

        let copied = copied.into_inner();
        match result {
            Ok(()) => Ok(copied),
            Err(err) if copied == 0 => Err(err),
            Err(err) => Err(CoreError::PartialClone {
                deployment_id,
                copied_assets: copied,
                reason: err.to_string(),
            }),
        }
    }

    async fn copy_one(&self, deployment_id: EntityId, copy: &AssetCopy) -> Result<(), CoreError> {
        with_retry(&self.config.retry, "copy_object", || {
            self.storage
                .copy_object(&copy.bucket, &copy.src_key, &copy.dst_key)
        })
        .await?;
        tracing::debug!(
            deployment_id = %deployment_id,
            bucket = %copy.bucket,
            src_key = %copy.src_key,
            dst_key = %copy.dst_key,
            "Copied asset",
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use assert_matches::assert_matches;
    use async_trait::async_trait;

    use crate::consent::{Consent, ContentType, EConsent, EConsentSection};
    use crate::deployment::{KeyActionConfig, OnboardingModuleConfig, Role};
    use crate::learn::{ArticleContent, Learn, LearnArticle, LearnSection};
    use crate::module_config::ModuleConfig;
    use crate::storage::StorageError;

    const BUCKET: &str = "assets";

    #[derive(Default)]
    struct FakeStorage {
        objects: Mutex<HashSet<String>>,
        transient_failures: AtomicUsize,
        copies: AtomicUsize,
    }

    impl FakeStorage {
        fn with_objects(keys: &[String]) -> Arc<Self> {
            let storage = Self::default();
            storage.objects.lock().unwrap().extend(keys.iter().cloned());
            Arc::new(storage)
        }

        fn contains(&self, key: &str) -> bool {
            self.objects.lock().unwrap().contains(key)
        }
    }

    #[async_trait]
    impl AssetStorage for FakeStorage {
        async fn file_exists(&self, _bucket: &str, key: &str) -> Result<bool, StorageError> {
            Ok(self.contains(key))
        }

        async fn copy_object(
            &self,
            bucket: &str,
            src_key: &str,
            dst_key: &str,
        ) -> Result<(), StorageError> {
            if self
                .transient_failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(StorageError::Transient("slow down".into()));
            }
            let mut objects = self.objects.lock().unwrap();
            if !objects.contains(src_key) {
                return Err(StorageError::NotFound {
                    bucket: bucket.into(),
                    key: src_key.into(),
                });
            }
            objects.insert(dst_key.to_string());
            self.copies.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn asset(key: String) -> AssetRef {
        AssetRef {
            bucket: BUCKET.into(),
            key,
            region: None,
        }
    }

    fn fast_config() -> CloneConfig {
        CloneConfig {
            max_concurrent_copies: 2,
            retry: RetryPolicy {
                max_attempts: 3,
                initial_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(2),
                multiplier: 2.0,
                attempt_timeout: Duration::from_secs(1),
            },
        }
    }

    struct Fixture {
        source: Deployment,
        a1: EntityId,
        a2: EntityId,
        module_config: EntityId,
        keys: Vec<String>,
    }

    /// One learn section with articles A1 and A2, a module config referencing
    /// A1 and a key action referencing that module config.
    fn fixture() -> Fixture {
        let id = new_id();
        let (a1, a2, module_config) = (new_id(), new_id(), new_id());
        let icon_key = format!("deployment/{id}/icon.png");
        let thumb_key = format!("deployment/{id}/learn/a1.png");
        let video_key = format!("deployment/{id}/learn/a2.mp4");
        let econsent_key = format!("deployment/{id}/econsent/intro.mp4");
        let econsent_thumb_key = format!("deployment/{id}/econsent/intro.png");

        let source = Deployment {
            id: Some(id),
            name: "Source".into(),
            status: DeploymentStatus::Deployed,
            version: 12,
            icon: Some(asset(icon_key.clone())),
            user_activation_code: Some("12345678".into()),
            manager_activation_code: Some("abcd1234".into()),
            proxy_activation_code: Some("87654321".into()),
            enrollment_counter: Some(42),
            stats: Some(serde_json::json!({ "enrolled": 42 })),
            consent: Some(Consent {
                id: Some(new_id()),
                revision: 5,
                ..Default::default()
            }),
            econsent: Some(EConsent {
                id: Some(new_id()),
                revision: 3,
                sections: vec![EConsentSection {
                    id: Some(new_id()),
                    content_type: ContentType::Video,
                    thumbnail_location: Some(asset(econsent_thumb_key.clone())),
                    video_location: Some(asset(econsent_key.clone())),
                    ..Default::default()
                }],
                ..Default::default()
            }),
            learn: Some(Learn {
                id: Some(new_id()),
                sections: vec![LearnSection {
                    id: Some(new_id()),
                    title: Some("Basics".into()),
                    articles: vec![
                        LearnArticle {
                            id: Some(a1),
                            title: Some("A1".into()),
                            thumbnail: Some(asset(thumb_key.clone())),
                            ..Default::default()
                        },
                        LearnArticle {
                            id: Some(a2),
                            title: Some("A2".into()),
                            content: Some(ArticleContent {
                                video: Some(asset(video_key.clone())),
                                ..Default::default()
                            }),
                            ..Default::default()
                        },
                    ],
                    ..Default::default()
                }],
            }),
            module_configs: vec![ModuleConfig {
                id: Some(module_config),
                module_id: "Journal".into(),
                learn_article_ids: vec![a1],
                version: 4,
                ..Default::default()
            }],
            onboarding_configs: vec![
                OnboardingModuleConfig {
                    id: Some(new_id()),
                    onboarding_id: "Consent".into(),
                    order: 1,
                    version: 2,
                    ..Default::default()
                },
                OnboardingModuleConfig {
                    id: Some(new_id()),
                    onboarding_id: "EConsent".into(),
                    order: 2,
                    ..Default::default()
                },
            ],
            roles: vec![Role {
                id: Some(new_id()),
                name: "Nurse".into(),
                ..Default::default()
            }],
            key_actions: vec![KeyActionConfig {
                id: Some(new_id()),
                title: Some("Log your day".into()),
                module_config_id: Some(module_config),
                ..Default::default()
            }],
            ..Default::default()
        };

        Fixture {
            source,
            a1,
            a2,
            module_config,
            keys: vec![icon_key, thumb_key, video_key, econsent_key, econsent_thumb_key],
        }
    }

    fn article_ids(deployment: &Deployment) -> Vec<EntityId> {
        deployment
            .learn
            .as_ref()
            .map(|learn| learn.article_ids().collect())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn clone_resets_lifecycle_fields() {
        let fx = fixture();
        let storage = FakeStorage::with_objects(&fx.keys);
        let cloner = DeploymentCloner::new(storage, fast_config());

        let staged = cloner
            .clone_deployment(&fx.source, "Copy", chrono::Utc::now())
            .await
            .unwrap();
        let clone = &staged.deployment;

        assert_eq!(clone.name, "Copy");
        assert_eq!(clone.status, DeploymentStatus::Draft);
        assert_eq!(clone.version, FIRST_VERSION);
        assert_eq!(clone.consent.as_ref().unwrap().revision, FIRST_VERSION);
        assert_eq!(clone.econsent.as_ref().unwrap().revision, FIRST_VERSION);
        assert_eq!(clone.enrollment_counter, None);
        assert_eq!(clone.stats, None);
        assert!(clone.activation_codes().is_none());
        assert_ne!(clone.id, fx.source.id);
    }

    #[tokio::test]
    async fn clone_rewrites_cross_references_into_the_new_aggregate() {
        let fx = fixture();
        let storage = FakeStorage::with_objects(&fx.keys);
        let cloner = DeploymentCloner::new(storage, fast_config());

        let staged = cloner
            .clone_deployment(&fx.source, "Copy", chrono::Utc::now())
            .await
            .unwrap();
        let clone = &staged.deployment;

        let new_articles = article_ids(clone);
        assert_eq!(new_articles.len(), 2);
        assert!(!new_articles.contains(&fx.a1));
        assert!(!new_articles.contains(&fx.a2));

        // A1' is the first article of the cloned section.
        let a1_clone = new_articles[0];
        assert_eq!(clone.module_configs.len(), 1);
        assert_eq!(clone.module_configs[0].learn_article_ids, vec![a1_clone]);

        let new_config_id = clone.module_configs[0].id.unwrap();
        assert_ne!(new_config_id, fx.module_config);
        assert_eq!(clone.key_actions[0].module_config_id, Some(new_config_id));
        assert_eq!(staged.report.dropped_article_refs, 0);
        assert_eq!(staged.report.unresolved_key_action_refs, 0);
    }

    #[tokio::test]
    async fn clone_keeps_onboarding_order_and_versions() {
        let fx = fixture();
        let cloner = DeploymentCloner::new(FakeStorage::with_objects(&fx.keys), fast_config());
        let staged = cloner.stage(&fx.source, "Copy", chrono::Utc::now()).unwrap();

        let onboarding: Vec<_> = staged
            .deployment
            .onboarding_configs
            .iter()
            .map(|c| (c.onboarding_id.as_str(), c.version))
            .collect();
        assert_eq!(onboarding, vec![("Consent", 2), ("EConsent", 0)]);
        assert_ne!(
            staged.deployment.onboarding_configs[0].id,
            fx.source.onboarding_configs[0].id
        );
        assert_eq!(staged.deployment.roles[0].name, "Nurse");
        assert_ne!(staged.deployment.roles[0].id, fx.source.roles[0].id);
    }

    #[tokio::test]
    async fn clone_copies_every_asset_under_the_new_prefix() {
        let fx = fixture();
        let storage = FakeStorage::with_objects(&fx.keys);
        let cloner = DeploymentCloner::new(storage.clone(), fast_config());

        let staged = cloner
            .clone_deployment(&fx.source, "Copy", chrono::Utc::now())
            .await
            .unwrap();
        let clone = &staged.deployment;
        let prefix = format!("deployment/{}/", clone.id.unwrap());

        assert_eq!(staged.report.copied_assets, 5);
        assert_eq!(storage.copies.load(Ordering::SeqCst), 5);

        let learn = clone.learn.as_ref().unwrap();
        let rewritten = [
            clone.icon.as_ref().unwrap().key.clone(),
            learn.sections[0].articles[0].thumbnail.as_ref().unwrap().key.clone(),
            learn.sections[0].articles[1]
                .content
                .as_ref()
                .unwrap()
                .video
                .as_ref()
                .unwrap()
                .key
                .clone(),
            clone.econsent.as_ref().unwrap().sections[0]
                .video_location
                .as_ref()
                .unwrap()
                .key
                .clone(),
            clone.econsent.as_ref().unwrap().sections[0]
                .thumbnail_location
                .as_ref()
                .unwrap()
                .key
                .clone(),
        ];
        for key in rewritten {
            assert!(key.starts_with(&prefix), "{key} not under {prefix}");
            assert!(storage.contains(&key), "{key} was not copied");
        }
    }

    #[tokio::test]
    async fn two_clones_share_no_identities() {
        let fx = fixture();
        let cloner = DeploymentCloner::new(FakeStorage::with_objects(&fx.keys), fast_config());
        let now = chrono::Utc::now();
        let first = cloner.clone_deployment(&fx.source, "One", now).await.unwrap();
        let second = cloner.clone_deployment(&fx.source, "Two", now).await.unwrap();

        fn ids(d: &Deployment) -> HashSet<EntityId> {
            let mut ids: HashSet<EntityId> = article_ids(d).into_iter().collect();
            ids.extend(d.id);
            ids.extend(d.module_configs.iter().filter_map(|c| c.id));
            ids.extend(d.key_actions.iter().filter_map(|k| k.id));
            ids.extend(d.roles.iter().filter_map(|r| r.id));
            ids.extend(d.onboarding_configs.iter().filter_map(|c| c.id));
            ids.extend(d.consent.as_ref().and_then(|c| c.id));
            ids.extend(d.econsent.as_ref().and_then(|c| c.id));
            ids.extend(d.learn.as_ref().and_then(|l| l.id));
            ids
        }

        let (a, b) = (ids(&first.deployment), ids(&second.deployment));
        assert!(a.is_disjoint(&b));
        assert!(a.is_disjoint(&ids(&fx.source)));
    }

    #[tokio::test]
    async fn dangling_article_reference_is_dropped() {
        let mut fx = fixture();
        let ghost = new_id();
        fx.source.module_configs[0].learn_article_ids = vec![ghost, fx.a2];

        let cloner = DeploymentCloner::new(FakeStorage::with_objects(&fx.keys), fast_config());
        let staged = cloner.stage(&fx.source, "Copy", chrono::Utc::now()).unwrap();

        let a2_clone = article_ids(&staged.deployment)[1];
        assert_eq!(staged.deployment.module_configs[0].learn_article_ids, vec![a2_clone]);
        assert_eq!(staged.report.dropped_article_refs, 1);
    }

    #[tokio::test]
    async fn key_action_pointing_at_an_article_is_remapped() {
        let mut fx = fixture();
        fx.source.key_actions[0].module_config_id = None;
        fx.source.key_actions[0].learn_article_id = Some(fx.a2);

        let cloner = DeploymentCloner::new(FakeStorage::with_objects(&fx.keys), fast_config());
        let staged = cloner.stage(&fx.source, "Copy", chrono::Utc::now()).unwrap();

        let a2_clone = article_ids(&staged.deployment)[1];
        let action = &staged.deployment.key_actions[0];
        assert_eq!(action.learn_article_id, Some(a2_clone));
        assert_eq!(action.module_config_id, None);
    }

    #[tokio::test]
    async fn missing_icon_aborts_before_any_copy() {
        let fx = fixture();
        // Every object except the icon.
        let storage = FakeStorage::with_objects(&fx.keys[1..]);
        let cloner = DeploymentCloner::new(storage.clone(), fast_config());

        let result = cloner
            .clone_deployment(&fx.source, "Copy", chrono::Utc::now())
            .await;
        assert_matches!(result, Err(CoreError::InvalidSource(_)));
        assert_eq!(storage.copies.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn transient_copy_failures_are_retried() {
        let fx = fixture();
        let storage = FakeStorage::with_objects(&fx.keys);
        storage.transient_failures.store(2, Ordering::SeqCst);
        let cloner = DeploymentCloner::new(storage.clone(), fast_config());

        let staged = cloner
            .clone_deployment(&fx.source, "Copy", chrono::Utc::now())
            .await
            .unwrap();
        assert_eq!(staged.report.copied_assets, 5);
    }

    fn sequential_config() -> CloneConfig {
        let mut config = fast_config();
        config.max_concurrent_copies = 1;
        config.retry.max_attempts = 1;
        config
    }

    #[tokio::test]
    async fn failure_after_some_copies_is_partial() {
        let fx = fixture();
        // The icon copies, then the e-consent thumbnail is missing.
        let storage = FakeStorage::with_objects(&fx.keys[..3]);
        let cloner = DeploymentCloner::new(storage.clone(), sequential_config());

        let result = cloner
            .clone_deployment(&fx.source, "Copy", chrono::Utc::now())
            .await;
        assert_matches!(result, Err(CoreError::PartialClone { copied_assets: 1, .. }));
        // The learn assets planned after the failure were never copied.
        assert_eq!(storage.copies.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn copying_stops_at_the_first_failure() {
        let mut fx = fixture();
        fx.source.icon = None;
        // The e-consent thumbnail is the first planned copy and is missing.
        let storage = FakeStorage::with_objects(&fx.keys[..4]);
        let cloner = DeploymentCloner::new(storage.clone(), sequential_config());

        let result = cloner
            .clone_deployment(&fx.source, "Copy", chrono::Utc::now())
            .await;
        assert_matches!(result, Err(CoreError::InvalidSource(_)));
        assert_eq!(storage.copies.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn econsent_thumbnail_is_relocated() {
        let fx = fixture();
        let cloner = DeploymentCloner::new(FakeStorage::with_objects(&fx.keys), fast_config());
        let staged = cloner.stage(&fx.source, "Copy", chrono::Utc::now()).unwrap();
        let clone_id = staged.id().unwrap();

        let source_key = &fx.keys[4];
        let copy = staged
            .asset_copies
            .iter()
            .find(|copy| &copy.src_key == source_key)
            .expect("thumbnail copy planned");
        assert_eq!(copy.dst_key, format!("deployment/{clone_id}/econsent/intro.png"));

        let section = &staged.deployment.econsent.as_ref().unwrap().sections[0];
        let thumbnail = section.thumbnail_location.as_ref().unwrap();
        assert_eq!(thumbnail.key, copy.dst_key);
        assert_eq!(thumbnail.bucket, BUCKET);
    }

    #[tokio::test]
    async fn shared_assets_are_copied_once() {
        let mut fx = fixture();
        let shared = fx.source.icon.clone();
        fx.source.learn.as_mut().unwrap().sections[0].articles[1].thumbnail = shared;

        let cloner = DeploymentCloner::new(FakeStorage::with_objects(&fx.keys), fast_config());
        let staged = cloner.stage(&fx.source, "Copy", chrono::Utc::now()).unwrap();
        assert_eq!(staged.asset_copies.len(), 5);
    }

    #[test]
    fn clone_name_is_validated() {
        let fx = fixture();
        let cloner = DeploymentCloner::new(FakeStorage::with_objects(&fx.keys), fast_config());
        let now = chrono::Utc::now();
        assert_matches!(cloner.stage(&fx.source, " ", now), Err(CoreError::Validation(_)));
        assert_matches!(
            cloner.stage(&fx.source, &"n".repeat(256), now),
            Err(CoreError::Validation(_))
        );
    }
}
