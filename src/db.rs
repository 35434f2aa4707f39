use anyhow::Context;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::ScoringConfig;
use crate::models::{channel_or_default, ScoreRow, TicketStatus, TotalScoreRow, WorkItemRecord};
use crate::scoring::ScoringRun;

/// Tickets an agent resolved, up to the window's last day. Older tickets
/// stay in so agents idle for the whole window still get rows.
const RECORD_QUERY: &str = "SELECT id, DATE(created_at) AS created, DATE(updated_at) AS updated, \
     status, channel, assignee_id \
     FROM workload_scoring.customer_support \
     WHERE status IN ('closed', 'solved') \
     AND DATE(updated_at) <= $1 \
     ORDER BY updated_at";

/// A raw ticket as stored in the ticket table. `status` is kept verbatim
/// (lowercased); only closed and solved tickets are scored.
#[derive(Debug, Clone, PartialEq)]
pub struct TicketRow {
    pub id: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub status: String,
    pub channel: Option<String>,
    pub assignee_id: i64,
}

impl TicketRow {
    pub fn is_scored(&self) -> bool {
        self.status.parse::<TicketStatus>().is_ok()
    }
}

#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    id: i64,
    created_at: String,
    updated_at: String,
    status: String,
    channel: Option<String>,
    assignee_id: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub stored: usize,
    /// Rows whose status is neither closed nor solved.
    pub unscored: usize,
}

/// Stamped on every persisted result row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub developer: String,
    pub run_id: Uuid,
    pub reference_date: NaiveDate,
}

impl Provenance {
    pub fn new(developer: impl Into<String>, reference_date: NaiveDate) -> Self {
        Self {
            developer: developer.into(),
            run_id: Uuid::new_v4(),
            reference_date,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistSummary {
    pub status_rows: usize,
    pub total_rows: usize,
    pub channel_rows: usize,
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool, reference_date: NaiveDate) -> anyhow::Result<usize> {
    let tickets = seed_tickets(reference_date)?;
    let mut tx = pool.begin().await?;
    let mut stored = 0usize;

    for ticket in &tickets {
        stored += upsert_ticket(&mut tx, ticket).await?;
    }

    tx.commit().await?;
    Ok(stored)
}

/// Ten weeks of synthetic history for three agents ending the day before
/// `reference_date`: a steady agent, one surging in the last week and one
/// idle in the last week.
pub fn seed_tickets(reference_date: NaiveDate) -> anyhow::Result<Vec<TicketRow>> {
    const DAYS: i64 = 70;
    const CHANNELS: [Option<&str>; 4] = [Some("email"), Some("chat"), Some("help_widget"), None];

    // created_at reaches up to two days before the oldest update
    reference_date
        .checked_sub_signed(Duration::days(DAYS + 2))
        .with_context(|| format!("cannot seed {DAYS} days of history before {reference_date}"))?;

    let mut tickets = Vec::new();
    let mut next_id = 5_000_000i64;

    for offset in 1..=DAYS {
        let day = reference_date - Duration::days(offset);
        let last_week = offset <= 7;

        let plan = [
            (1001i64, 3 + offset % 3),
            (1002i64, if last_week { 7 } else { 2 }),
            (1003i64, if last_week { 0 } else { 3 }),
        ];

        for (assignee_id, per_day) in plan {
            for slot in 0..per_day {
                next_id += 1;
                let updated_at = day.and_time(
                    NaiveTime::from_hms_opt(9 + (slot % 8) as u32, 15, 0).unwrap_or(NaiveTime::MIN),
                );
                tickets.push(TicketRow {
                    id: next_id,
                    created_at: updated_at - Duration::days(next_id % 3),
                    updated_at,
                    status: if next_id % 4 == 0 {
                        TicketStatus::Solved
                    } else {
                        TicketStatus::Closed
                    }
                    .as_str()
                    .to_string(),
                    channel: CHANNELS[(next_id % 4) as usize].map(str::to_string),
                    assignee_id,
                });
            }
        }
    }

    Ok(tickets)
}

async fn upsert_ticket(
    tx: &mut Transaction<'_, Postgres>,
    ticket: &TicketRow,
) -> anyhow::Result<usize> {
    let result = sqlx::query(
        r#"
        INSERT INTO workload_scoring.customer_support
        (id, created_at, updated_at, status, channel, assignee_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (id) DO UPDATE
        SET created_at = EXCLUDED.created_at,
            updated_at = EXCLUDED.updated_at,
            status = EXCLUDED.status,
            channel = EXCLUDED.channel,
            assignee_id = EXCLUDED.assignee_id
        WHERE workload_scoring.customer_support.updated_at <= EXCLUDED.updated_at
        "#,
    )
    .bind(ticket.id)
    .bind(ticket.created_at)
    .bind(ticket.updated_at)
    .bind(&ticket.status)
    .bind(ticket.channel.as_deref())
    .bind(ticket.assignee_id)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected() as usize)
}

pub fn parse_timestamp(value: &str) -> anyhow::Result<NaiveDateTime> {
    let value = value.trim().trim_end_matches(" UTC");

    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(timestamp) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(timestamp);
        }
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("unrecognised timestamp '{value}'"))?;
    Ok(date.and_time(NaiveTime::MIN))
}

fn ticket_from_csv(row: CsvRow, line: usize) -> anyhow::Result<TicketRow> {
    let status = row.status.trim().to_ascii_lowercase();
    if status.is_empty() {
        anyhow::bail!("blank status on line {line}");
    }

    Ok(TicketRow {
        id: row.id,
        created_at: parse_timestamp(&row.created_at)
            .with_context(|| format!("bad created_at on line {line}"))?,
        updated_at: parse_timestamp(&row.updated_at)
            .with_context(|| format!("bad updated_at on line {line}"))?,
        status,
        channel: row.channel.filter(|channel| !channel.trim().is_empty()),
        assignee_id: row.assignee_id,
    })
}

/// Stores every ticket in the file, whatever its status. Open or pending
/// tickets are kept so the ticket table mirrors the export; the record query
/// leaves them out of scoring.
pub async fn import_csv(
    pool: &PgPool,
    csv_path: &std::path::Path,
) -> anyhow::Result<ImportSummary> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut tx = pool.begin().await?;
    let mut summary = ImportSummary::default();

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        let line = index + 2;
        let row = result.with_context(|| format!("malformed row on line {line}"))?;
        let ticket = ticket_from_csv(row, line)?;

        if !ticket.is_scored() {
            summary.unscored += 1;
        }
        summary.stored += upsert_ticket(&mut tx, &ticket).await?;
    }

    tx.commit().await?;
    debug!(?summary, "imported tickets");
    Ok(summary)
}

/// Loads closed and solved tickets updated on or before the window's last day.
/// Interval membership is decided by the partitioner, not here.
pub async fn fetch_records(
    pool: &PgPool,
    config: &ScoringConfig,
) -> anyhow::Result<Vec<WorkItemRecord>> {
    let until = config.last_date()?;

    let rows = sqlx::query(RECORD_QUERY)
        .bind(until)
        .fetch_all(pool)
        .await
        .context("failed to fetch ticket records")?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let status: String = row.get("status");
        let channel: Option<String> = row.get("channel");
        let record = WorkItemRecord {
            id: row.get("id"),
            created: row.get("created"),
            updated: row.get("updated"),
            status: status.parse()?,
            channel: channel_or_default(channel.as_deref()),
            assignee_id: row.get("assignee_id"),
        };
        records.push(record);
    }

    info!(%until, records = records.len(), "fetched ticket records");
    Ok(records)
}

/// Appends all three result tables in one transaction.
pub async fn persist_run(
    pool: &PgPool,
    run: &ScoringRun,
    provenance: &Provenance,
) -> anyhow::Result<PersistSummary> {
    let mut tx = pool.begin().await?;
    let mut summary = PersistSummary::default();

    for row in &run.by_status.rows {
        insert_status_row(&mut tx, row, provenance).await?;
        summary.status_rows += 1;
    }
    for row in &run.totals.rows {
        insert_total_row(&mut tx, row, provenance).await?;
        summary.total_rows += 1;
    }
    for row in &run.by_channel.rows {
        insert_channel_row(&mut tx, row, provenance).await?;
        summary.channel_rows += 1;
    }

    tx.commit().await.context("failed to commit score results")?;
    debug!(run_id = %provenance.run_id, ?summary, "persisted score results");
    Ok(summary)
}

async fn insert_status_row(
    tx: &mut Transaction<'_, Postgres>,
    row: &ScoreRow,
    provenance: &Provenance,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO workload_scoring.score_result_status
        (assignee_id, status, count_last_period, count_mean_calc_period,
         count_sem_calc_period, score_value, developer, run_id, reference_date)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(row.assignee_id)
    .bind(row.status.as_str())
    .bind(row.count_last_period)
    .bind(row.count_mean_calc_period)
    .bind(row.count_sem_calc_period)
    .bind(row.score_value)
    .bind(&provenance.developer)
    .bind(provenance.run_id)
    .bind(provenance.reference_date)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn insert_total_row(
    tx: &mut Transaction<'_, Postgres>,
    row: &TotalScoreRow,
    provenance: &Provenance,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO workload_scoring.score_result_total
        (assignee_id, score_value, developer, run_id, reference_date)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(row.assignee_id)
    .bind(row.score_value)
    .bind(&provenance.developer)
    .bind(provenance.run_id)
    .bind(provenance.reference_date)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn insert_channel_row(
    tx: &mut Transaction<'_, Postgres>,
    row: &ScoreRow,
    provenance: &Provenance,
) -> anyhow::Result<()> {
    let channel = row
        .channel
        .as_deref()
        .context("channel score row is missing its channel")?;

    sqlx::query(
        r#"
        INSERT INTO workload_scoring.score_result_status_channel
        (assignee_id, status, channel, count_last_period, count_mean_calc_period,
         count_sem_calc_period, score_value, developer, run_id, reference_date)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(row.assignee_id)
    .bind(row.status.as_str())
    .bind(channel)
    .bind(row.count_last_period)
    .bind(row.count_mean_calc_period)
    .bind(row.count_sem_calc_period)
    .bind(row.score_value)
    .bind(&provenance.developer)
    .bind(provenance.run_id)
    .bind(provenance.reference_date)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
