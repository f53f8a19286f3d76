//! User entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// How a user first proved who they are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    #[sea_orm(string_value = "device")]
    Device,
    #[sea_orm(string_value = "email")]
    Email,
    #[sea_orm(string_value = "google")]
    Google,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Opaque client key for anonymous device users
    #[sea_orm(unique, nullable)]
    pub device_id: Option<String>,

    /// Verified email address
    #[sea_orm(unique, nullable)]
    pub email: Option<String>,

    /// Display name
    pub name: String,

    #[sea_orm(nullable)]
    pub avatar_url: Option<String>,

    pub auth_provider: AuthProvider,

    #[sea_orm(default_value = false)]
    pub is_verified: bool,

    /// FCM registration token
    #[sea_orm(column_type = "Text", nullable)]
    pub push_token: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub last_login_at: Option<DateTimeWithTimeZone>,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::vote::Entity")]
    Votes,

    #[sea_orm(has_many = "super::comment::Entity")]
    Comments,

    #[sea_orm(has_many = "super::policy::Entity")]
    Policies,
}

impl Related<super::vote::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Votes.def()
    }
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl Related<super::policy::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Policies.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
