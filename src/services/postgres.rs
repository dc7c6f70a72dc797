use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;
use crate::models::{
    ExchangeMatch, ExchangeRequest, ExchangeRequestStatus, MatchDecision, MatchSide, MatchStatus,
    OfferedBook,
};
use crate::services::store::{DecisionOutcome, ExchangeStore, StoreError, StoreResult};

const REQUEST_COLUMNS: &str =
    "id, user_id, user_email, desired_book_id, latitude, longitude, status, created_at";

const MATCH_COLUMNS: &str = "id, exchange_request_id, matched_exchange_request_id, \
     initiator_decision, responder_decision, status, distance, created_at";

/// PostgreSQL-backed exchange store
///
/// Pair uniqueness is enforced by a unique index over
/// `(LEAST(a, b), GREATEST(a, b))`; offered books and matches are removed
/// with their request through `ON DELETE CASCADE`.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect and run migrations
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new store from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, StoreError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }

    /// Turn request rows into requests with their offered books loaded
    async fn with_offered_books(&self, rows: Vec<PgRow>) -> StoreResult<Vec<ExchangeRequest>> {
        let mut requests = rows
            .iter()
            .map(row_to_request)
            .collect::<Result<Vec<_>, sqlx::Error>>()?;

        if requests.is_empty() {
            return Ok(requests);
        }

        let ids: Vec<Uuid> = requests.iter().map(|r| r.id).collect();
        let book_rows = sqlx::query(
            r#"
            SELECT id, exchange_request_id, book_id
            FROM offered_books
            WHERE exchange_request_id = ANY($1)
            ORDER BY position
            "#,
        )
        .bind(&ids[..])
        .fetch_all(&self.pool)
        .await?;

        let mut by_request: HashMap<Uuid, Vec<OfferedBook>> = HashMap::new();
        for row in &book_rows {
            let book = OfferedBook {
                id: row.try_get("id")?,
                exchange_request_id: row.try_get("exchange_request_id")?,
                book_id: row.try_get("book_id")?,
            };
            by_request.entry(book.exchange_request_id).or_default().push(book);
        }

        for request in &mut requests {
            request.offered_books = by_request.remove(&request.id).unwrap_or_default();
        }

        Ok(requests)
    }
}

fn row_to_request(row: &PgRow) -> Result<ExchangeRequest, sqlx::Error> {
    Ok(ExchangeRequest {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        user_email: row.try_get("user_email")?,
        desired_book_id: row.try_get("desired_book_id")?,
        offered_books: Vec::new(),
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
        status: row.try_get("status")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_match(row: &PgRow) -> Result<ExchangeMatch, sqlx::Error> {
    Ok(ExchangeMatch {
        id: row.try_get("id")?,
        exchange_request_id: row.try_get("exchange_request_id")?,
        matched_exchange_request_id: row.try_get("matched_exchange_request_id")?,
        initiator_decision: row.try_get("initiator_decision")?,
        responder_decision: row.try_get("responder_decision")?,
        status: row.try_get("status")?,
        distance: row.try_get("distance")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl ExchangeStore for PostgresStore {
    async fn create_request(&self, request: &ExchangeRequest) -> StoreResult<Uuid> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO exchange_requests
                (id, user_id, user_email, desired_book_id, latitude, longitude, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(request.id)
        .bind(&request.user_id)
        .bind(&request.user_email)
        .bind(&request.desired_book_id)
        .bind(request.latitude)
        .bind(request.longitude)
        .bind(request.status)
        .bind(request.created_at)
        .execute(&mut *tx)
        .await?;

        for (position, book) in request.offered_books.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO offered_books (id, exchange_request_id, book_id, position)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(book.id)
            .bind(request.id)
            .bind(&book.book_id)
            .bind(position as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::debug!(
            "Stored exchange request {} with {} offered books",
            request.id,
            request.offered_books.len()
        );

        Ok(request.id)
    }

    async fn get_request(&self, id: Uuid) -> StoreResult<Option<ExchangeRequest>> {
        let query = format!("SELECT {} FROM exchange_requests WHERE id = $1", REQUEST_COLUMNS);
        let rows = sqlx::query(&query).bind(id).fetch_all(&self.pool).await?;

        Ok(self.with_offered_books(rows).await?.into_iter().next())
    }

    async fn list_requests(
        &self,
        user_id: &str,
        status: Option<ExchangeRequestStatus>,
    ) -> StoreResult<Vec<ExchangeRequest>> {
        let query = format!(
            r#"
            SELECT {}
            FROM exchange_requests
            WHERE user_id = $1 AND ($2::exchange_request_status IS NULL OR status = $2)
            ORDER BY created_at
            "#,
            REQUEST_COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(user_id)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;

        self.with_offered_books(rows).await
    }

    async fn update_request(&self, request: &ExchangeRequest) -> StoreResult<()> {
        let result = sqlx::query("UPDATE exchange_requests SET status = $2 WHERE id = $1")
            .bind(request.id)
            .bind(request.status)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("exchange request {}", request.id)));
        }
        Ok(())
    }

    async fn delete_request(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM exchange_requests WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("exchange request {}", id)));
        }
        Ok(())
    }

    async fn list_active_reciprocal_candidates(
        &self,
        request: &ExchangeRequest,
    ) -> StoreResult<Vec<ExchangeRequest>> {
        // Their desired book is among ours, and our desired book is among theirs
        let query = format!(
            r#"
            SELECT {}
            FROM exchange_requests r
            WHERE r.status = $1
              AND r.id <> $2
              AND r.user_id <> $3
              AND r.desired_book_id = ANY($4)
              AND EXISTS (
                  SELECT 1 FROM offered_books ob
                  WHERE ob.exchange_request_id = r.id AND ob.book_id = $5
              )
            ORDER BY r.created_at
            "#,
            REQUEST_COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(ExchangeRequestStatus::Active)
            .bind(request.id)
            .bind(&request.user_id)
            .bind(request.offered_book_ids())
            .bind(&request.desired_book_id)
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!("Found {} reciprocal candidates for request {}", rows.len(), request.id);

        self.with_offered_books(rows).await
    }

    async fn create_match(&self, exchange_match: &ExchangeMatch) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO exchange_matches
                (id, exchange_request_id, matched_exchange_request_id,
                 initiator_decision, responder_decision, status, distance, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(exchange_match.id)
        .bind(exchange_match.exchange_request_id)
        .bind(exchange_match.matched_exchange_request_id)
        .bind(exchange_match.initiator_decision)
        .bind(exchange_match.responder_decision)
        .bind(exchange_match.status)
        .bind(exchange_match.distance)
        .bind(exchange_match.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                let (a, b) = exchange_match.pair_key();
                Err(StoreError::DuplicateMatch(a, b))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_match(&self, id: Uuid) -> StoreResult<Option<ExchangeMatch>> {
        let query = format!("SELECT {} FROM exchange_matches WHERE id = $1", MATCH_COLUMNS);
        let row = sqlx::query(&query).bind(id).fetch_optional(&self.pool).await?;

        Ok(row.as_ref().map(row_to_match).transpose()?)
    }

    async fn get_match_for_pair(&self, a: Uuid, b: Uuid) -> StoreResult<Option<ExchangeMatch>> {
        let query = format!(
            r#"
            SELECT {}
            FROM exchange_matches
            WHERE (exchange_request_id = $1 AND matched_exchange_request_id = $2)
               OR (exchange_request_id = $2 AND matched_exchange_request_id = $1)
            "#,
            MATCH_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(a)
            .bind(b)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(row_to_match).transpose()?)
    }

    async fn apply_match_decision(
        &self,
        match_id: Uuid,
        side: MatchSide,
        decision: MatchDecision,
    ) -> StoreResult<Option<DecisionOutcome>> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent decisions on the same match
        let query = format!(
            "SELECT {} FROM exchange_matches WHERE id = $1 FOR UPDATE",
            MATCH_COLUMNS
        );
        let Some(row) = sqlx::query(&query)
            .bind(match_id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            tx.rollback().await?;
            return Ok(None);
        };

        let mut exchange_match = row_to_match(&row)?;
        if exchange_match.status.is_terminal() {
            tx.rollback().await?;
            return Ok(Some(DecisionOutcome::Finalized(exchange_match)));
        }

        let sides = [
            exchange_match.exchange_request_id,
            exchange_match.matched_exchange_request_id,
        ];

        // Locked in id order so two matches sharing a request cannot deadlock
        let status_rows = sqlx::query(
            r#"
            SELECT id, status
            FROM exchange_requests
            WHERE id = ANY($1)
            ORDER BY id
            FOR UPDATE
            "#,
        )
        .bind(&sides[..])
        .fetch_all(&mut *tx)
        .await?;

        if decision == MatchDecision::Accepted {
            let mut active = Vec::with_capacity(status_rows.len());
            for row in &status_rows {
                let status: ExchangeRequestStatus = row.try_get("status")?;
                if status == ExchangeRequestStatus::Active {
                    active.push(row.try_get::<Uuid, _>("id")?);
                }
            }

            if let Some(request_id) = sides.into_iter().find(|id| !active.contains(id)) {
                tx.rollback().await?;
                return Ok(Some(DecisionOutcome::RequestInactive {
                    exchange_match,
                    request_id,
                }));
            }
        }

        exchange_match.apply_decision(side, decision);

        sqlx::query(
            r#"
            UPDATE exchange_matches
            SET initiator_decision = $2, responder_decision = $3, status = $4
            WHERE id = $1
            "#,
        )
        .bind(exchange_match.id)
        .bind(exchange_match.initiator_decision)
        .bind(exchange_match.responder_decision)
        .bind(exchange_match.status)
        .execute(&mut *tx)
        .await?;

        if exchange_match.status == MatchStatus::Accepted {
            sqlx::query("UPDATE exchange_requests SET status = $2 WHERE id = ANY($1)")
                .bind(&sides[..])
                .bind(ExchangeRequestStatus::Completed)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(Some(DecisionOutcome::Applied(exchange_match)))
    }

    async fn list_matches_for_request(&self, request_id: Uuid) -> StoreResult<Vec<ExchangeMatch>> {
        let query = format!(
            r#"
            SELECT {}
            FROM exchange_matches
            WHERE exchange_request_id = $1 OR matched_exchange_request_id = $1
            ORDER BY created_at
            "#,
            MATCH_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(request_id)
            .fetch_all(&self.pool)
            .await?;

        let matches = rows
            .iter()
            .map(row_to_match)
            .collect::<Result<Vec<_>, sqlx::Error>>()?;
        Ok(matches)
    }

    async fn delete_matches_for_request(&self, request_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM exchange_matches
            WHERE exchange_request_id = $1 OR matched_exchange_request_id = $1
            "#,
        )
        .bind(request_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}
