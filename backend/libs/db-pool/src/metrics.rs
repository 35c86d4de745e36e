//! Prometheus metrics for database connection pool
//!
//! Tracks pool size by state and transaction begin latency

use prometheus::{register_histogram_vec, register_int_gauge_vec, HistogramVec, IntGaugeVec};
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Instant;

lazy_static::lazy_static! {
    /// Database connection pool size by state (idle/active/max)
    static ref DB_POOL_CONNECTIONS: IntGaugeVec = register_int_gauge_vec!(
        "db_pool_connections",
        "Database pool connection count by state",
        &["service", "state"]
    ).expect("Prometheus metrics registration should succeed at startup");

    /// Time to acquire a connection and open a transaction
    static ref DB_POOL_BEGIN_DURATION: HistogramVec = register_histogram_vec!(
        "db_pool_begin_duration_seconds",
        "Time to acquire a pooled connection and BEGIN a transaction",
        &["service", "result"],
        vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0]
    ).expect("Prometheus metrics registration should succeed at startup");
}

/// Update connection pool metrics (called periodically)
pub(crate) fn update_pool_metrics(pool: &PgPool, service: &str) {
    let size = pool.size() as i64;
    let idle = pool.num_idle() as i64;

    DB_POOL_CONNECTIONS
        .with_label_values(&[service, "idle"])
        .set(idle);

    DB_POOL_CONNECTIONS
        .with_label_values(&[service, "active"])
        .set(size - idle);

    DB_POOL_CONNECTIONS
        .with_label_values(&[service, "max"])
        .set(pool.options().get_max_connections() as i64);
}

/// Begin a transaction and record how long the pool took to hand it out
///
/// Drop-in replacement for `pool.begin().await`. The returned transaction
/// rolls back when dropped without `commit()`.
pub async fn begin_with_metrics(
    pool: &PgPool,
    service: &str,
) -> Result<Transaction<'static, Postgres>, sqlx::Error> {
    let start = Instant::now();
    let result = pool.begin().await;

    let outcome = match &result {
        Ok(_) => "ok",
        Err(sqlx::Error::PoolTimedOut) => "timeout",
        Err(sqlx::Error::PoolClosed) => "closed",
        Err(_) => "error",
    };

    DB_POOL_BEGIN_DURATION
        .with_label_values(&[service, outcome])
        .observe(start.elapsed().as_secs_f64());

    result
}
