use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{PgTextExpressionMethods, RunQueryDsl, dsl::count_star, insert_into, prelude::*, update};
use std::sync::Arc;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{customer_profiles, payments},
    },
};
use domain::{
    entities::{
        customer_profiles::{CustomerProfileEntity, InsertCustomerProfileEntity},
        payments::{NewPaymentEntity, PaymentEntity},
    },
    repositories::payments::PaymentRepository,
    value_objects::{
        enums::{payment_statuses::PaymentStatus, profile_payment_statuses::ProfilePaymentStatus},
        payments::PaymentFilter,
        reconciliation::{PaymentTransition, ReconcileOutcome, TransitionPlan, plan_transition},
    },
};

pub struct PaymentPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PaymentPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

fn escape_like(pattern: &str) -> String {
    pattern
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[async_trait]
impl PaymentRepository for PaymentPostgres {
    async fn create_payment(&self, payment: NewPaymentEntity) -> Result<PaymentEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let created = conn.transaction::<PaymentEntity, diesel::result::Error, _>(|conn| {
            insert_into(customer_profiles::table)
                .values(&InsertCustomerProfileEntity {
                    email: payment.customer_email.clone(),
                    payment_status: ProfilePaymentStatus::Pending.to_string(),
                })
                .on_conflict(customer_profiles::email)
                .do_nothing()
                .execute(conn)?;

            insert_into(payments::table)
                .values(&payment)
                .returning(PaymentEntity::as_select())
                .get_result::<PaymentEntity>(conn)
        })?;

        Ok(created)
    }

    async fn find_by_reference(&self, reference: &str) -> Result<Option<PaymentEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let payment = payments::table
            .filter(payments::reference.eq(reference))
            .select(PaymentEntity::as_select())
            .first::<PaymentEntity>(&mut conn)
            .optional()?;

        Ok(payment)
    }

    async fn list_payments(&self, filter: PaymentFilter) -> Result<Vec<PaymentEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let mut query = payments::table
            .select(PaymentEntity::as_select())
            .into_boxed();

        if let Some(status) = filter.status {
            query = query.filter(payments::status.eq(status.to_string()));
        }
        if let Some(email) = filter.email {
            query = query.filter(payments::customer_email.ilike(format!("%{}%", escape_like(&email))));
        }

        let results = query
            .order(payments::created_at.desc())
            .limit(filter.limit)
            .offset(filter.offset)
            .load::<PaymentEntity>(&mut conn)?;

        Ok(results)
    }

    async fn count_by_status(&self) -> Result<Vec<(String, i64)>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let counts = payments::table
            .group_by(payments::status)
            .select((payments::status, count_star()))
            .load::<(String, i64)>(&mut conn)?;

        Ok(counts)
    }

    async fn find_customer_profile(&self, email: &str) -> Result<Option<CustomerProfileEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let profile = customer_profiles::table
            .filter(customer_profiles::email.eq(email))
            .select(CustomerProfileEntity::as_select())
            .first::<CustomerProfileEntity>(&mut conn)
            .optional()?;

        Ok(profile)
    }

    async fn reconcile(
        &self,
        reference: &str,
        transition: PaymentTransition,
    ) -> Result<ReconcileOutcome> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let now = Utc::now();

        // SELECT ... FOR UPDATE serializes concurrent deliveries for the same reference.
        let outcome = conn.transaction::<ReconcileOutcome, anyhow::Error, _>(|conn| {
            let Some(current) = payments::table
                .filter(payments::reference.eq(reference))
                .select(PaymentEntity::as_select())
                .for_update()
                .first::<PaymentEntity>(conn)
                .optional()?
            else {
                return Ok(ReconcileOutcome::UnknownReference);
            };

            let changes = match plan_transition(&current, &transition, now)? {
                TransitionPlan::AlreadyTerminal => {
                    return Ok(ReconcileOutcome::AlreadyTerminal(current));
                }
                TransitionPlan::NotAdvancing => return Ok(ReconcileOutcome::NotAdvancing(current)),
                TransitionPlan::Apply(changes) => changes,
            };

            let updated = update(payments::table.find(current.id))
                .set(&changes)
                .returning(PaymentEntity::as_select())
                .get_result::<PaymentEntity>(conn)?;

            if updated.status == PaymentStatus::Success.as_str() {
                update(
                    customer_profiles::table
                        .filter(customer_profiles::email.eq(&updated.customer_email)),
                )
                .set((
                    customer_profiles::payment_status
                        .eq(ProfilePaymentStatus::Completed.to_string()),
                    customer_profiles::updated_at.eq(now),
                ))
                .execute(conn)?;
            }

            Ok(ReconcileOutcome::Applied(updated))
        })?;

        Ok(outcome)
    }
}
