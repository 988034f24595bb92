//! Entity kinds handled by the migration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::MigrateError;

/// Category of record being migrated.
///
/// Each kind owns one source class in the legacy backend, one target
/// collection, and one field mapping table (see [`crate::mapping`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    ClientProfile,
    ProfessionalProfile,
    Appointment,
}

impl EntityKind {
    /// Every kind, in dependency order (users before the records that point at them).
    pub const ALL: [EntityKind; 4] = [
        EntityKind::User,
        EntityKind::ClientProfile,
        EntityKind::ProfessionalProfile,
        EntityKind::Appointment,
    ];

    /// Class name in the legacy backend.
    pub fn source_class(&self) -> &'static str {
        match self {
            EntityKind::User => "_User",
            EntityKind::ClientProfile => "ClientProfile",
            EntityKind::ProfessionalProfile => "ProfessionalProfile",
            EntityKind::Appointment => "Appointment",
        }
    }

    /// Collection identifier in the target store.
    pub fn target_collection(&self) -> &'static str {
        match self {
            EntityKind::User => "users",
            EntityKind::ClientProfile => "clients",
            EntityKind::ProfessionalProfile => "professionals",
            EntityKind::Appointment => "appointments",
        }
    }

    /// Snake-case name used in config files and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::ClientProfile => "client_profile",
            EntityKind::ProfessionalProfile => "professional_profile",
            EntityKind::Appointment => "appointment",
        }
    }

    /// Look up a kind by its legacy class name.
    pub fn from_source_class(class: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.source_class() == class)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        match normalized.as_str() {
            "user" | "users" => Ok(EntityKind::User),
            "client_profile" | "client" | "clients" => Ok(EntityKind::ClientProfile),
            "professional_profile" | "professional" | "professionals" => {
                Ok(EntityKind::ProfessionalProfile)
            }
            "appointment" | "appointments" => Ok(EntityKind::Appointment),
            _ => Err(MigrateError::Config(format!("Unknown entity kind: {}", s))),
        }
    }
}
