//! YAML seed documents for the initial menu catalogue and platform roles

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::rbac::{NewMenu, NewRole, RbacError};
use crate::services::{MenuService, RoleService};

const DEFAULT_SEED: &str = include_str!("../fixtures/default.yaml");

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("Failed to read fixture file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid fixture document: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Rbac(#[from] RbacError),
}

#[derive(Debug, Deserialize)]
pub struct SeedDocument {
    #[serde(default)]
    pub menus: Vec<NewMenu>,
    #[serde(default)]
    pub roles: Vec<RoleSeed>,
}

#[derive(Debug, Deserialize)]
pub struct RoleSeed {
    #[serde(flatten)]
    pub role: NewRole,
    /// Grant every menu created or found by the same document
    #[serde(default)]
    pub all_menus: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub menus_created: usize,
    pub menus_skipped: usize,
    pub roles_created: usize,
    pub roles_skipped: usize,
}

impl SeedDocument {
    pub fn from_yaml_str(source: &str) -> Result<Self, FixtureError> {
        Ok(serde_yaml::from_str(source)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&source)
    }

    /// The catalogue bundled with the binary
    pub fn builtin() -> Result<Self, FixtureError> {
        Self::from_yaml_str(DEFAULT_SEED)
    }

    /// Creates whatever is missing. Menus already present by id and roles
    /// already present by key are skipped, so applying twice is a no-op.
    pub async fn apply(
        self,
        menus: &MenuService,
        roles: &RoleService,
    ) -> Result<SeedReport, FixtureError> {
        let mut report = SeedReport::default();
        let mut seeded_menu_ids = Vec::with_capacity(self.menus.len());

        for menu in self.menus {
            if let Some(id) = menu.id.as_deref() {
                match menus.get(id).await {
                    Ok(existing) => {
                        debug!(menu_id = %existing.id, "Menu already seeded");
                        seeded_menu_ids.push(existing.id);
                        report.menus_skipped += 1;
                        continue;
                    }
                    Err(err) if err.is_not_found() => {}
                    Err(err) => return Err(err.into()),
                }
            }

            match menus.create(menu).await {
                Ok(created) => {
                    seeded_menu_ids.push(created.id);
                    report.menus_created += 1;
                }
                Err(RbacError::Duplicate(msg)) => {
                    debug!("Skipping menu: {}", msg);
                    report.menus_skipped += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }

        for seed in self.roles {
            match roles.get_by_key(seed.role.key.trim()).await {
                Ok(existing) => {
                    debug!(role_key = %existing.role.key, "Role already seeded");
                    report.roles_skipped += 1;
                    continue;
                }
                Err(err) if err.is_not_found() => {}
                Err(err) => return Err(err.into()),
            }

            let mut role = seed.role;
            if seed.all_menus {
                role.menu_ids = seeded_menu_ids.clone();
            }
            roles.create(role).await?;
            report.roles_created += 1;
        }

        info!(
            menus_created = report.menus_created,
            menus_skipped = report.menus_skipped,
            roles_created = report.roles_created,
            roles_skipped = report.roles_skipped,
            "Fixtures applied"
        );
        Ok(report)
    }
}
