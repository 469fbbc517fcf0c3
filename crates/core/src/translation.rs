//! Master translation generation and per-locale lookups for deployments.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::deployment::Deployment;
use crate::error::CoreError;
use crate::localizable::{
    apply_translations, collect_localized_paths, LocalizationExtractor, TranslationMap,
};

/// Locale every other locale falls back to, and the one holding source text.
pub const MASTER_LOCALE: &str = "en";

/// Root of the dotted paths reported for a deployment.
pub const LOCALIZABLE_PATH_ROOT: &str = "deployment";

static LOCALE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z]{2,3}([-_][A-Za-z0-9]{2,8})?$").expect("valid regex")
});

/// Validate a locale code such as `en`, `de`, `pt_BR` or `zh-Hant`.
pub fn validate_locale(locale: &str) -> Result<(), CoreError> {
    if LOCALE_RE.is_match(locale) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!("Invalid locale code '{locale}'")))
    }
}

/// The table for `locale`, or the master table when that one is missing or empty.
pub fn localization_for<'a>(
    localizations: &'a BTreeMap<String, TranslationMap>,
    locale: &str,
) -> Option<&'a TranslationMap> {
    localizations
        .get(locale)
        .filter(|table| !table.is_empty())
        .or_else(|| localizations.get(MASTER_LOCALE))
}

/// Sorted dotted paths of every localizable field of a deployment.
pub fn localizable_field_paths(deployment: &Deployment) -> Vec<String> {
    collect_localized_paths(deployment, LOCALIZABLE_PATH_ROOT)
        .into_iter()
        .collect()
}

/// Move every literal text of `deployment` into its master (`en`) table.
///
/// Existing master entries are kept. Returns the rewritten copy; the input is
/// left untouched.
pub fn generate_master_translation(deployment: &Deployment) -> Result<Deployment, CoreError> {
    let existing = deployment
        .localizations
        .get(MASTER_LOCALE)
        .cloned()
        .unwrap_or_default();

    let extraction = LocalizationExtractor::default().extract(deployment, &existing)?;
    let mut rewritten = extraction.tree;
    rewritten
        .localizations
        .insert(MASTER_LOCALE.to_string(), extraction.translations);
    Ok(rewritten)
}

/// A copy of `deployment` with placeholders replaced by `locale` text.
pub fn localized_view(deployment: &Deployment, locale: &str) -> Deployment {
    let mut view = deployment.clone();
    if let Some(table) = localization_for(&deployment.localizations, locale) {
        apply_translations(&mut view, table);
    }
    view
}
