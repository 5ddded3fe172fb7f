//! Reader category preferences: one remote row per user, replaced wholesale
//! on every save.

use chrono::Utc;
use serde_json::json;

use crate::backend::{Backend, BackendError};
use crate::models::UserPreferences;

/// How many categories onboarding asks for. Two call sites historically
/// disagreed on the completion threshold (exactly this many vs. at least
/// one); the checks below keep both behaviors under explicit names.
pub const ONBOARDING_CATEGORY_COUNT: usize = 2;

/// Onboarding is complete when the saved selection hits the target count.
/// Gates the redirect out of the category picker.
pub fn is_complete(prefs: Option<&UserPreferences>) -> bool {
    prefs
        .map(|p| p.selected_categories.len() == ONBOARDING_CATEGORY_COUNT)
        .unwrap_or(false)
}

/// The feed renders as soon as any category is selected. Deliberately
/// looser than [`is_complete`]; see DESIGN.md.
pub fn has_feed_categories(prefs: Option<&UserPreferences>) -> bool {
    prefs
        .map(|p| !p.selected_categories.is_empty())
        .unwrap_or(false)
}

/// Toggle a category in a selection capped at the onboarding count:
/// selecting again deselects, and selecting beyond the cap is a no-op.
pub fn toggle_category(mut selection: Vec<String>, id: &str) -> Vec<String> {
    if let Some(pos) = selection.iter().position(|c| c == id) {
        selection.remove(pos);
    } else if selection.len() < ONBOARDING_CATEGORY_COUNT {
        selection.push(id.to_string());
    }
    selection
}

/// Replace the user's preference row with the given selection.
pub async fn save(
    backend: &Backend,
    user_id: &str,
    selected: &[String],
) -> Result<(), BackendError> {
    let now = Utc::now();
    backend
        .table("user_preferences")
        .upsert(&json!({
            "user_id": user_id,
            "selected_categories": selected,
            "created_at": now,
            "updated_at": now,
        }))
        .await
}

/// Fetch the user's preference row; `None` when it does not exist yet.
pub async fn get(
    backend: &Backend,
    user_id: &str,
) -> Result<Option<UserPreferences>, BackendError> {
    match backend
        .table("user_preferences")
        .eq("user_id", user_id)
        .select_single::<UserPreferences>()
        .await
    {
        Ok(prefs) => Ok(Some(prefs)),
        Err(BackendError::NotFound) => Ok(None),
        Err(err) => Err(err),
    }
}

/// Re-read the preference row and apply the completion check.
pub async fn onboarding_complete(backend: &Backend, user_id: &str) -> Result<bool, BackendError> {
    let prefs = get(backend, user_id).await?;
    Ok(is_complete(prefs.as_ref()))
}
