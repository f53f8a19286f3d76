//! Policy entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "policies")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub description: String,

    /// Free-form category tag
    #[sea_orm(indexed)]
    pub category: String,

    #[sea_orm(default_value = true)]
    pub is_active: bool,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,

    /// End of the voting window
    #[sea_orm(nullable)]
    pub ends_at: Option<DateTimeWithTimeZone>,

    #[sea_orm(column_type = "Text", nullable)]
    pub ai_summary: Option<String>,

    /// Arguments in favour (JSON array of strings)
    #[sea_orm(column_type = "JsonBinary")]
    pub pros: Json,

    /// Arguments against (JSON array of strings)
    #[sea_orm(column_type = "JsonBinary")]
    pub cons: Json,

    /// Authoring user; `None` for system-authored policies
    #[sea_orm(nullable, indexed)]
    pub author_id: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AuthorId",
        to = "super::user::Column::Id",
        on_delete = "SetNull"
    )]
    Author,

    #[sea_orm(has_many = "super::vote::Entity")]
    Votes,

    #[sea_orm(has_many = "super::comment::Entity")]
    Comments,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
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

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Pros as plain strings. Non-string entries are skipped.
    #[must_use]
    pub fn pros_list(&self) -> Vec<String> {
        string_list(&self.pros)
    }

    /// Cons as plain strings. Non-string entries are skipped.
    #[must_use]
    pub fn cons_list(&self) -> Vec<String> {
        string_list(&self.cons)
    }
}

fn string_list(value: &Json) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
