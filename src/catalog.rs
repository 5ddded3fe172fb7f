//! The category catalog.
//!
//! The built-in list is the source of truth for category identity and
//! display text. The remote `categories` table is fetched behind this typed
//! lookup with an explicit refresh call and reconciled against the built-in
//! list, instead of every page keeping its own copy of the id→name map.

use tokio::sync::RwLock;

use crate::backend::{Backend, BackendError};
use crate::models::Category;

/// A built-in category definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryDef {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

pub const BUILTIN_CATEGORIES: &[CategoryDef] = &[
    CategoryDef {
        id: "physical-activity",
        name: "Physical activity",
        description: "Exercise, fitness, and physical health",
    },
    CategoryDef {
        id: "emotional-wellbeing",
        name: "Emotional well-being",
        description: "Mental health, emotions, and psychological balance",
    },
    CategoryDef {
        id: "mindful-awareness",
        name: "Mindful awareness",
        description: "Meditation, mindfulness, and conscious living",
    },
    CategoryDef {
        id: "financial-wellbeing",
        name: "Financial well-being",
        description: "Money management, savings, and financial planning",
    },
    CategoryDef {
        id: "career-development",
        name: "Career & development",
        description: "Professional growth, skills, and career advancement",
    },
    CategoryDef {
        id: "relationships",
        name: "Relationships",
        description: "Family, friends, and social connections",
    },
    CategoryDef {
        id: "nutrition-lifestyle",
        name: "Nutrition & lifestyle",
        description: "Healthy eating, habits, and daily routines",
    },
];

/// Display name for a category id; falls back to the raw id for rows the
/// built-in list does not know about.
pub fn display_name(id: &str) -> &str {
    BUILTIN_CATEGORIES
        .iter()
        .find(|c| c.id == id)
        .map(|c| c.name)
        .unwrap_or(id)
}

/// Display names for a list of ids, in order.
pub fn display_names(ids: &[String]) -> Vec<String> {
    ids.iter().map(|id| display_name(id).to_string()).collect()
}

/// Overlay the built-in names onto remote rows. Remote rows keep their ids
/// (posts reference them), but display text comes from the catalog; rows
/// the catalog does not know about are logged and passed through as-is.
pub fn reconcile(rows: Vec<Category>) -> Vec<Category> {
    rows.into_iter()
        .map(|row| match BUILTIN_CATEGORIES.iter().find(|c| c.id == row.id) {
            Some(def) => Category {
                id: row.id,
                name: def.name.to_string(),
                description: def.description.to_string(),
            },
            None => {
                tracing::debug!(id = %row.id, "remote category not in the built-in catalog");
                row
            }
        })
        .collect()
}

fn builtin_as_rows() -> Vec<Category> {
    BUILTIN_CATEGORIES
        .iter()
        .map(|c| Category {
            id: c.id.to_string(),
            name: c.name.to_string(),
            description: c.description.to_string(),
        })
        .collect()
}

/// Cached view of the remote category table.
pub struct CategoryCatalog {
    backend: Backend,
    remote: RwLock<Option<Vec<Category>>>,
}

impl CategoryCatalog {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            remote: RwLock::new(None),
        }
    }

    /// Re-fetch the remote table. Called when a page that authors against
    /// the remote ids loads; failures leave the previous snapshot in place.
    pub async fn refresh(&self) -> Result<(), BackendError> {
        let rows: Vec<Category> = self
            .backend
            .table("categories")
            .order_asc("name")
            .select()
            .await?;
        *self.remote.write().await = Some(reconcile(rows));
        Ok(())
    }

    /// Categories available for authoring: the latest remote snapshot, or
    /// the built-in list when no snapshot has been taken yet.
    pub async fn authoring_list(&self) -> Vec<Category> {
        match &*self.remote.read().await {
            Some(rows) if !rows.is_empty() => rows.clone(),
            _ => builtin_as_rows(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_has_seven_categories() {
        assert_eq!(BUILTIN_CATEGORIES.len(), 7);
    }

    #[test]
    fn display_name_resolves_known_ids() {
        assert_eq!(display_name("physical-activity"), "Physical activity");
        assert_eq!(display_name("nutrition-lifestyle"), "Nutrition & lifestyle");
    }

    #[test]
    fn display_name_passes_through_unknown_ids() {
        assert_eq!(display_name("underwater-basketry"), "underwater-basketry");
    }

    #[test]
    fn reconcile_overlays_builtin_names() {
        let rows = vec![Category {
            id: "nutrition-lifestyle".into(),
            // A drifted remote display name.
            name: "Dieta e nutrição".into(),
            description: String::new(),
        }];
        let reconciled = reconcile(rows);
        assert_eq!(reconciled[0].name, "Nutrition & lifestyle");
    }

    #[test]
    fn reconcile_keeps_unknown_rows() {
        let rows = vec![Category {
            id: "brand-new".into(),
            name: "Brand new".into(),
            description: "added remotely".into(),
        }];
        let reconciled = reconcile(rows);
        assert_eq!(reconciled.len(), 1);
        assert_eq!(reconciled[0].name, "Brand new");
    }
}
