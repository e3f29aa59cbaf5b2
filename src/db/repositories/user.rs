use anyhow::Result;
use sea_orm::{DatabaseConnection, EntityTrait, Set};

use crate::entities::{prelude::*, users};

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Records a user row so foreign keys resolve; the id comes from the
    /// identity provider and is never generated here. Profile fields are
    /// only written when given, so an ensure-exists call with no values
    /// leaves an existing row untouched.
    pub async fn upsert(
        &self,
        id: &str,
        email: Option<&str>,
        display_name: Option<&str>,
    ) -> Result<()> {
        let active_model = users::ActiveModel {
            id: Set(id.to_owned()),
            email: Set(email.map(str::to_owned)),
            display_name: Set(display_name.map(str::to_owned)),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
        };

        let mut conflict = sea_orm::sea_query::OnConflict::column(users::Column::Id);
        let mut update_columns = Vec::new();
        if email.is_some() {
            update_columns.push(users::Column::Email);
        }
        if display_name.is_some() {
            update_columns.push(users::Column::DisplayName);
        }
        if update_columns.is_empty() {
            conflict.do_nothing();
        } else {
            conflict.update_columns(update_columns);
        }

        Users::insert(active_model)
            .on_conflict(conflict.to_owned())
            .exec_without_returning(&self.conn)
            .await?;

        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<users::Model>> {
        let user = Users::find_by_id(id).one(&self.conn).await?;
        Ok(user)
    }
}
