use std::sync::Arc;

use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, TransactionTrait,
};
use serde::Serialize;
use tracing::{info, instrument};

use crate::{
    common::jst_now,
    db::{acquire_plan_lock, DbPool},
    entities::route::{self, Entity as RouteEntity, RouteStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        assignment::{self, AssignmentSummary},
        geo::Coordinates,
        routing,
        settings::PlanningPolicy,
    },
};

#[derive(Debug, Clone, Serialize)]
pub struct PlanSummary {
    pub message: String,
    pub assigned_count: u64,
    pub assigned_tasks: u64,
    pub staff_count: u64,
    pub short_items: u64,
    pub skipped_items: u64,
    pub route_ids: Vec<i32>,
    pub routes_started: u64,
}

/// Drives the daily pipeline: allocation-backed assignment, per-buyer route
/// optimization, and optional auto-start. One invocation is one transaction;
/// partial progress is never committed.
#[derive(Clone)]
pub struct PlanningService {
    db: Arc<DbPool>,
    events: EventSender,
    office_fallback: Coordinates,
}

impl PlanningService {
    pub fn new(db: Arc<DbPool>, events: EventSender, office_fallback: Coordinates) -> Self {
        Self {
            db,
            events,
            office_fallback,
        }
    }

    fn office(&self, policy: &PlanningPolicy) -> Coordinates {
        policy.office().unwrap_or(self.office_fallback)
    }

    /// Stage 4.E alone: pack the day's pending items into buyer lists.
    #[instrument(skip(self))]
    pub async fn assign_day(&self, date: NaiveDate) -> Result<AssignmentSummary, ServiceError> {
        let txn = self.db.begin().await?;
        acquire_plan_lock(&txn, date).await?;
        let policy = PlanningPolicy::load(&txn).await?;
        let summary = assignment::assign_day(&txn, self.office(&policy), date).await?;
        txn.commit().await?;
        Ok(summary)
    }

    /// Stage 4.E for a single buyer, up to their capacity.
    #[instrument(skip(self))]
    pub async fn assign_staff(
        &self,
        staff_id: i32,
        date: NaiveDate,
    ) -> Result<AssignmentSummary, ServiceError> {
        let txn = self.db.begin().await?;
        acquire_plan_lock(&txn, date).await?;
        let policy = PlanningPolicy::load(&txn).await?;
        let summary =
            assignment::assign_to_staff(&txn, self.office(&policy), staff_id, date).await?;
        txn.commit().await?;
        Ok(summary)
    }

    /// Stage 4.F alone: regenerate routes for every buyer with work.
    #[instrument(skip(self))]
    pub async fn generate_routes(&self, date: NaiveDate) -> Result<Vec<i32>, ServiceError> {
        let txn = self.db.begin().await?;
        acquire_plan_lock(&txn, date).await?;
        let policy = PlanningPolicy::load(&txn).await?;
        let route_ids = routing::optimize_all(&txn, &policy, self.office(&policy), date).await?;
        txn.commit().await?;

        for route_id in &route_ids {
            self.events
                .send(Event::RouteGenerated {
                    route_id: *route_id,
                })
                .await;
        }
        Ok(route_ids)
    }

    /// Regenerate the route of one buyer (used after manual list edits).
    #[instrument(skip(self))]
    pub async fn generate_route_for_staff(
        &self,
        staff_id: i32,
        date: NaiveDate,
    ) -> Result<Option<i32>, ServiceError> {
        let txn = self.db.begin().await?;
        acquire_plan_lock(&txn, date).await?;
        let policy = PlanningPolicy::load(&txn).await?;
        let route_id =
            routing::optimize_for_staff(&txn, &policy, self.office(&policy), staff_id, date)
                .await?;
        txn.commit().await?;
        Ok(route_id)
    }

    /// The full daily plan: assign, route, optionally dispatch.
    ///
    /// Runs under a per-date advisory lock so concurrent callers for the same
    /// date serialize; distinct dates plan independently. Item-level
    /// shortfalls (missing product rows, store capacity) are local and do not
    /// abort the day.
    #[instrument(skip(self))]
    pub async fn plan_day(
        &self,
        date: NaiveDate,
        auto_start: bool,
    ) -> Result<PlanSummary, ServiceError> {
        let txn = self.db.begin().await?;
        acquire_plan_lock(&txn, date).await?;
        let policy = PlanningPolicy::load(&txn).await?;
        let office = self.office(&policy);

        let assignment = assignment::assign_day(&txn, office, date).await?;
        let route_ids = routing::optimize_all(&txn, &policy, office, date).await?;

        let mut routes_started = 0u64;
        if auto_start && !route_ids.is_empty() {
            let fresh = RouteEntity::find()
                .filter(route::Column::RouteId.is_in(route_ids.clone()))
                .filter(route::Column::Status.eq(RouteStatus::NotStarted))
                .all(&txn)
                .await?;
            for row in fresh {
                let mut active: route::ActiveModel = row.into();
                active.status = Set(RouteStatus::InProgress);
                active.updated_at = Set(Some(jst_now()));
                active.update(&txn).await?;
                routes_started += 1;
            }
        }

        txn.commit().await?;

        self.events
            .send(Event::DayPlanned {
                date,
                assigned_count: assignment.assigned_count,
                route_count: route_ids.len() as u64,
            })
            .await;

        info!(
            %date,
            assigned = assignment.assigned_count,
            routes = route_ids.len(),
            routes_started,
            "daily plan committed"
        );

        Ok(PlanSummary {
            message: format!(
                "{}件を割り当て、{}件のルートを生成しました",
                assignment.assigned_count,
                route_ids.len()
            ),
            assigned_count: assignment.assigned_count,
            assigned_tasks: assignment.assigned_tasks,
            staff_count: assignment.staff_count,
            short_items: assignment.short_items,
            skipped_items: assignment.skipped_items,
            route_ids,
            routes_started,
        })
    }

    /// Start every not-started route on the date.
    #[instrument(skip(self))]
    pub async fn start_routes(&self, date: NaiveDate) -> Result<u64, ServiceError> {
        let txn = self.db.begin().await?;
        let routes = RouteEntity::find()
            .filter(route::Column::RouteDate.eq(date))
            .filter(route::Column::Status.eq(RouteStatus::NotStarted))
            .all(&txn)
            .await?;
        let count = routes.len() as u64;
        for row in routes {
            let mut active: route::ActiveModel = row.into();
            active.status = Set(RouteStatus::InProgress);
            active.updated_at = Set(Some(jst_now()));
            active.update(&txn).await?;
        }
        txn.commit().await?;
        Ok(count)
    }
}
