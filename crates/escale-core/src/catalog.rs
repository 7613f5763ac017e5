//! Module catalog — the fixed list of feature modules and their
//! recognized actions.
//!
//! The catalog is process-wide static configuration built at startup.
//! It is never stored: deployments that need a different module set
//! construct the catalog from their own definitions.

use std::collections::{BTreeMap, BTreeSet};

/// Canonical action names used across the built-in modules.
pub mod actions {
    pub const LIRE: &str = "lire";
    pub const CREER: &str = "creer";
    pub const MODIFIER: &str = "modifier";
    pub const SUPPRIMER: &str = "supprimer";
    pub const EXPORTER: &str = "exporter";
}

/// A feature area that can be entitled to a tenant and permissioned
/// per user. Immutable at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDefinition {
    /// Stable string id (e.g. `factures`).
    pub id: String,
    /// Human-readable name for navigation rendering.
    pub label: String,
    /// The fixed set of recognized action names for this module.
    /// Module-specific: `rapports` only supports read/export.
    pub actions: BTreeSet<String>,
}

impl ModuleDefinition {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        actions: impl IntoIterator<Item = &'static str>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            actions: actions.into_iter().map(str::to_owned).collect(),
        }
    }
}

/// The process-wide module catalog, keyed and iterated by module id.
#[derive(Debug, Clone)]
pub struct ModuleCatalog {
    modules: BTreeMap<String, ModuleDefinition>,
}

impl ModuleCatalog {
    pub fn new(definitions: impl IntoIterator<Item = ModuleDefinition>) -> Self {
        Self {
            modules: definitions
                .into_iter()
                .map(|def| (def.id.clone(), def))
                .collect(),
        }
    }

    /// The standard travel-agency module set.
    pub fn builtin() -> Self {
        use actions::*;
        Self::new([
            ModuleDefinition::new("billets", "Billets", [LIRE, CREER, MODIFIER, SUPPRIMER]),
            ModuleDefinition::new("caisse", "Caisse", [LIRE, CREER, MODIFIER]),
            ModuleDefinition::new("calendrier", "Calendrier", [LIRE, CREER, MODIFIER]),
            ModuleDefinition::new("clients", "Clients", [LIRE, CREER, MODIFIER, SUPPRIMER]),
            ModuleDefinition::new("documents", "Documents", [LIRE, CREER, SUPPRIMER]),
            ModuleDefinition::new(
                "factures",
                "Factures",
                [LIRE, CREER, MODIFIER, SUPPRIMER, EXPORTER],
            ),
            ModuleDefinition::new("rapports", "Rapports", [LIRE, EXPORTER]),
            ModuleDefinition::new("voyages", "Voyages", [LIRE, CREER, MODIFIER, SUPPRIMER]),
        ])
    }

    /// All module definitions, sorted by id.
    pub fn modules(&self) -> impl Iterator<Item = &ModuleDefinition> {
        self.modules.values()
    }

    pub fn get(&self, module_id: &str) -> Option<&ModuleDefinition> {
        self.modules.get(module_id)
    }

    pub fn contains(&self, module_id: &str) -> bool {
        self.modules.contains_key(module_id)
    }

    /// Whether `action` is recognized for `module_id`.
    ///
    /// An unknown module id yields `false`, not an error, so callers
    /// can treat it as "never allowed".
    pub fn is_valid_action(&self, module_id: &str, action: &str) -> bool {
        self.modules
            .get(module_id)
            .is_some_and(|def| def.actions.contains(action))
    }
}

impl Default for ModuleCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
