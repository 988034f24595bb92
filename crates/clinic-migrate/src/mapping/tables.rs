//! Field mapping tables, one per entity kind.
//!
//! Legacy field names are camelCase as stored by the old backend. Target
//! field names follow the new schema. Fields absent from a table are dropped.

use super::transform::{CodeTable, Literal, Transform};
use super::{FieldMapping, FieldRule};
use crate::core::EntityKind;

pub static USER_ROLES: CodeTable = CodeTable {
    name: "user role",
    codes: &[(0, "admin"), (1, "professional"), (2, "client"), (3, "staff")],
    default: "client",
};

pub static CLIENT_STATUSES: CodeTable = CodeTable {
    name: "client status",
    codes: &[(0, "active"), (1, "inactive"), (2, "archived")],
    default: "active",
};

pub static PROFESSIONAL_TYPES: CodeTable = CodeTable {
    name: "professional type",
    codes: &[
        (1, "doctor"),
        (2, "psychologist"),
        (3, "nutritionist"),
        (4, "physiotherapist"),
        (5, "nurse"),
    ],
    default: "other",
};

pub static APPOINTMENT_STATUSES: CodeTable = CodeTable {
    name: "appointment status",
    codes: &[
        (0, "scheduled"),
        (1, "confirmed"),
        (2, "completed"),
        (3, "cancelled"),
        (4, "no_show"),
    ],
    default: "scheduled",
};

const fn rule(source: &'static str, target: &'static str, transform: Transform) -> FieldRule {
    FieldRule {
        source,
        target,
        transform,
        required: false,
        default: None,
    }
}

const fn required(source: &'static str, target: &'static str, transform: Transform) -> FieldRule {
    FieldRule {
        source,
        target,
        transform,
        required: true,
        default: None,
    }
}

const fn defaulted(
    source: &'static str,
    target: &'static str,
    transform: Transform,
    default: Literal,
) -> FieldRule {
    FieldRule {
        source,
        target,
        transform,
        required: false,
        default: Some(default),
    }
}

static USER_RULES: [FieldRule; 10] = [
    required("email", "email", Transform::Text),
    rule("username", "username", Transform::Text),
    rule("firstName", "firstName", Transform::Text),
    rule("lastName", "lastName", Transform::Text),
    rule("phone", "phoneNumber", Transform::Text),
    defaulted("role", "role", Transform::Code(&USER_ROLES), Literal::Str("client")),
    defaulted("emailVerified", "emailVerified", Transform::Boolean, Literal::Bool(false)),
    defaulted("active", "isActive", Transform::Boolean, Literal::Bool(true)),
    required("createdAt", "createdAt", Transform::Timestamp),
    rule("updatedAt", "updatedAt", Transform::Timestamp),
];

static CLIENT_RULES: [FieldRule; 11] = [
    required("user", "userId", Transform::Reference),
    required("fullName", "fullName", Transform::Text),
    rule("dateOfBirth", "dateOfBirth", Transform::Timestamp),
    rule("gender", "gender", Transform::Text),
    rule("address", "address", Transform::Text),
    rule("location", "location", Transform::GeoPoint),
    rule("emergencyContact", "emergencyContact", Transform::Text),
    rule("notes", "notes", Transform::Text),
    defaulted("status", "status", Transform::Code(&CLIENT_STATUSES), Literal::Str("active")),
    required("createdAt", "createdAt", Transform::Timestamp),
    rule("updatedAt", "updatedAt", Transform::Timestamp),
];

static PROFESSIONAL_RULES: [FieldRule; 11] = [
    required("user", "userId", Transform::Reference),
    required("specialty", "specialty", Transform::Text),
    rule("licenseNumber", "licenseNumber", Transform::Text),
    rule("bio", "bio", Transform::Text),
    rule("location", "location", Transform::GeoPoint),
    rule("consultationFee", "consultationFee", Transform::Float),
    rule("languages", "languages", Transform::Copy),
    defaulted(
        "professionalType",
        "type",
        Transform::Code(&PROFESSIONAL_TYPES),
        Literal::Str("other"),
    ),
    defaulted("available", "isAvailable", Transform::Boolean, Literal::Bool(true)),
    required("createdAt", "createdAt", Transform::Timestamp),
    rule("updatedAt", "updatedAt", Transform::Timestamp),
];

static APPOINTMENT_RULES: [FieldRule; 9] = [
    required("client", "clientId", Transform::Reference),
    required("professional", "professionalId", Transform::Reference),
    required("date", "scheduledAt", Transform::Timestamp),
    defaulted("duration", "durationMinutes", Transform::Integer, Literal::Int(30)),
    defaulted(
        "status",
        "status",
        Transform::Code(&APPOINTMENT_STATUSES),
        Literal::Str("scheduled"),
    ),
    rule("notes", "notes", Transform::Text),
    rule("location", "location", Transform::GeoPoint),
    required("createdAt", "createdAt", Transform::Timestamp),
    rule("updatedAt", "updatedAt", Transform::Timestamp),
];

static USER_MAPPING: FieldMapping = FieldMapping {
    kind: EntityKind::User,
    rules: &USER_RULES,
};

static CLIENT_MAPPING: FieldMapping = FieldMapping {
    kind: EntityKind::ClientProfile,
    rules: &CLIENT_RULES,
};

static PROFESSIONAL_MAPPING: FieldMapping = FieldMapping {
    kind: EntityKind::ProfessionalProfile,
    rules: &PROFESSIONAL_RULES,
};

static APPOINTMENT_MAPPING: FieldMapping = FieldMapping {
    kind: EntityKind::Appointment,
    rules: &APPOINTMENT_RULES,
};

/// The mapping table for `kind`.
pub fn mapping_for(kind: EntityKind) -> &'static FieldMapping {
    match kind {
        EntityKind::User => &USER_MAPPING,
        EntityKind::ClientProfile => &CLIENT_MAPPING,
        EntityKind::ProfessionalProfile => &PROFESSIONAL_MAPPING,
        EntityKind::Appointment => &APPOINTMENT_MAPPING,
    }
}
