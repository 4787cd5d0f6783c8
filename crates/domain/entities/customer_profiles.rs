use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::customer_profiles;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = customer_profiles)]
pub struct CustomerProfileEntity {
    pub id: Uuid,
    pub email: String,
    pub payment_status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = customer_profiles)]
pub struct InsertCustomerProfileEntity {
    pub email: String,
    pub payment_status: String,
}
