//! Listing query rendering.
//!
//! Filters are turned into an ordered list of predicates, each pushed only
//! when its input is present, and rendered with the placeholder style of the
//! target backend. Column names never come from user input: sort keys are
//! resolved through [`FileSortKey`] / [`MeasurementSortKey`] first.

use crate::filter::{FileFilter, FileSortKey, MeasurementFilter, MeasurementSortKey};
use msmt_core::{Pagination, SortOrder, TriState};
use time::OffsetDateTime;

/// Placeholder flavour of the target database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// `?` placeholders.
    Sqlite,
    /// `$1`, `$2`, ... placeholders.
    Postgres,
}

/// A value bound to a rendered query.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Int(i64),
    Text(String),
    Bool(bool),
    Timestamp(OffsetDateTime),
}

/// SQL text plus its positional bind values.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedQuery {
    pub sql: String,
    pub binds: Vec<SqlValue>,
}

const TIMESTAMP_COLUMNS: [&str; 2] = ["r.test_start_time", "m.measurement_start_time"];

const ANOMALY_EXPR: &str = "COALESCE(l.anomaly, m.anomaly, FALSE)";
const CONFIRMED_EXPR: &str = "COALESCE(l.confirmed, m.confirmed, FALSE)";
const MSM_FAILURE_EXPR: &str = "COALESCE(l.msm_failure, m.msm_failure, FALSE)";
const FAILED_EXPR: &str = "(m.exc IS NOT NULL OR m.residual_no IS NOT NULL \
     OR COALESCE(l.msm_failure, m.msm_failure, FALSE))";
const NOT_FAILED_EXPR: &str = "(m.exc IS NULL AND m.residual_no IS NULL \
     AND NOT COALESCE(l.msm_failure, m.msm_failure, FALSE))";

#[derive(Debug, Clone, PartialEq)]
enum Predicate {
    Compare {
        expr: &'static str,
        op: &'static str,
        value: SqlValue,
    },
    Contains {
        expr: &'static str,
        needle: String,
    },
    Raw(&'static str),
}

impl Predicate {
    fn eq(expr: &'static str, value: SqlValue) -> Self {
        Self::Compare {
            expr,
            op: "=",
            value,
        }
    }
}

struct SqlWriter {
    dialect: Dialect,
    sql: String,
    binds: Vec<SqlValue>,
}

impl SqlWriter {
    fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            sql: String::with_capacity(512),
            binds: Vec::new(),
        }
    }

    fn push(&mut self, fragment: &str) -> &mut Self {
        self.sql.push_str(fragment);
        self
    }

    fn push_bind(&mut self, value: SqlValue) -> &mut Self {
        self.binds.push(value);
        match self.dialect {
            Dialect::Sqlite => self.sql.push('?'),
            Dialect::Postgres => {
                self.sql.push('$');
                self.sql.push_str(&self.binds.len().to_string());
            }
        }
        self
    }

    /// Push a column reference, comparable by time on every dialect.
    ///
    /// SQLite keeps timestamps as RFC 3339 text whose width varies with the
    /// fractional part, so text order is not time order there.
    fn push_column(&mut self, expr: &str) -> &mut Self {
        if self.dialect == Dialect::Sqlite && TIMESTAMP_COLUMNS.iter().any(|c| *c == expr) {
            self.push("julianday(").push(expr).push(")")
        } else {
            self.push(expr)
        }
    }

    fn push_value(&mut self, value: SqlValue) -> &mut Self {
        if self.dialect == Dialect::Sqlite && matches!(value, SqlValue::Timestamp(_)) {
            self.push("julianday(").push_bind(value).push(")")
        } else {
            self.push_bind(value)
        }
    }

    fn push_where(&mut self, predicates: Vec<Predicate>) -> &mut Self {
        for (i, predicate) in predicates.into_iter().enumerate() {
            self.push(if i == 0 { " WHERE " } else { " AND " });
            match predicate {
                Predicate::Compare { expr, op, value } => {
                    self.push_column(expr)
                        .push(" ")
                        .push(op)
                        .push(" ")
                        .push_value(value);
                }
                Predicate::Contains { expr, needle } => {
                    let pattern = format!("%{}%", escape_like(&needle));
                    self.push(expr)
                        .push(" LIKE ")
                        .push_bind(SqlValue::Text(pattern))
                        .push(" ESCAPE '\\'");
                }
                Predicate::Raw(sql) => {
                    self.push(sql);
                }
            }
        }
        self
    }

    fn push_page(&mut self, page: &Pagination) -> &mut Self {
        self.push(" LIMIT ")
            .push_bind(SqlValue::Int(page.limit()))
            .push(" OFFSET ")
            .push_bind(SqlValue::Int(page.offset()))
    }

    fn finish(self) -> RenderedQuery {
        RenderedQuery {
            sql: self.sql,
            binds: self.binds,
        }
    }
}

/// Escape `%`, `_` and the escape character itself for a `LIKE ... ESCAPE '\'`.
fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn push_tristate(predicates: &mut Vec<Predicate>, expr: &'static str, state: TriState) {
    if let Some(value) = state.value() {
        predicates.push(Predicate::eq(expr, SqlValue::Bool(value)));
    }
}

fn file_predicates(filter: &FileFilter) -> Vec<Predicate> {
    let mut predicates = Vec::new();
    if let Some(cc) = &filter.probe_cc {
        predicates.push(Predicate::eq("r.probe_cc", SqlValue::Text(cc.clone())));
    }
    if let Some(asn) = filter.probe_asn {
        predicates.push(Predicate::eq("r.probe_asn", SqlValue::Int(asn.as_i64())));
    }
    if let Some(name) = &filter.test_name {
        predicates.push(Predicate::eq("r.test_name", SqlValue::Text(name.clone())));
    }
    if let Some(since) = filter.since {
        predicates.push(Predicate::Compare {
            expr: "r.test_start_time",
            op: ">",
            value: SqlValue::Timestamp(since),
        });
    }
    if let Some(until) = filter.until {
        predicates.push(Predicate::Compare {
            expr: "r.test_start_time",
            op: "<=",
            value: SqlValue::Timestamp(until),
        });
    }
    if let Some(min) = filter.min_report_no {
        predicates.push(Predicate::Compare {
            expr: "r.report_no",
            op: ">",
            value: SqlValue::Int(min),
        });
    }
    predicates
}

fn measurement_predicates(filter: &MeasurementFilter) -> Vec<Predicate> {
    let mut predicates = Vec::new();
    if let Some(report_id) = &filter.report_id {
        predicates.push(Predicate::eq(
            "r.report_id",
            SqlValue::Text(report_id.clone()),
        ));
    }
    if let Some(cc) = &filter.probe_cc {
        predicates.push(Predicate::eq("r.probe_cc", SqlValue::Text(cc.clone())));
    }
    if let Some(asn) = filter.probe_asn {
        predicates.push(Predicate::eq("r.probe_asn", SqlValue::Int(asn.as_i64())));
    }
    if let Some(name) = &filter.test_name {
        predicates.push(Predicate::eq("r.test_name", SqlValue::Text(name.clone())));
    }
    if let Some(since) = filter.since {
        predicates.push(Predicate::Compare {
            expr: "m.measurement_start_time",
            op: ">",
            value: SqlValue::Timestamp(since),
        });
    }
    if let Some(until) = filter.until {
        predicates.push(Predicate::Compare {
            expr: "m.measurement_start_time",
            op: "<=",
            value: SqlValue::Timestamp(until),
        });
    }
    if let Some(min) = filter.min_report_no {
        predicates.push(Predicate::Compare {
            expr: "m.report_no",
            op: ">",
            value: SqlValue::Int(min),
        });
    }
    if let Some(input) = &filter.input {
        predicates.push(Predicate::Contains {
            expr: "i.input",
            needle: input.clone(),
        });
    }
    push_tristate(&mut predicates, ANOMALY_EXPR, filter.anomaly);
    push_tristate(&mut predicates, CONFIRMED_EXPR, filter.confirmed);
    match filter.failure.value() {
        Some(true) => predicates.push(Predicate::Raw(FAILED_EXPR)),
        Some(false) => predicates.push(Predicate::Raw(NOT_FAILED_EXPR)),
        None => {}
    }
    predicates
}

/// Page of report files.
pub fn list_files(dialect: Dialect, filter: &FileFilter, page: &Pagination) -> RenderedQuery {
    let mut w = SqlWriter::new(dialect);
    w.push(
        "SELECT r.report_no, r.textname, r.test_start_time, r.probe_cc, r.probe_asn, r.test_name \
         FROM reports r",
    );
    w.push_where(file_predicates(filter));

    let dir = filter.order.as_sql();
    w.push(" ORDER BY ")
        .push_column(filter.order_by.column())
        .push(" ")
        .push(dir);
    if filter.order_by != FileSortKey::Index {
        w.push(", r.report_no ").push(dir);
    }
    w.push_page(page);
    w.finish()
}

/// Total number of report files matching `filter`.
pub fn count_files(dialect: Dialect, filter: &FileFilter) -> RenderedQuery {
    let mut w = SqlWriter::new(dialect);
    w.push("SELECT COUNT(*) FROM reports r");
    w.push_where(file_predicates(filter));
    w.finish()
}

fn measurement_sort_expr(key: MeasurementSortKey, joins_input: bool) -> Option<&'static str> {
    Some(match key {
        MeasurementSortKey::MeasurementStartTime => "m.measurement_start_time",
        MeasurementSortKey::Index => "m.report_no",
        MeasurementSortKey::MeasurementId => "m.id",
        MeasurementSortKey::ReportId => "r.report_id",
        MeasurementSortKey::ProbeCc => "r.probe_cc",
        MeasurementSortKey::ProbeAsn => "r.probe_asn",
        MeasurementSortKey::TestName => "r.test_name",
        // Without the join every row has a null input.
        MeasurementSortKey::Input if !joins_input => return None,
        MeasurementSortKey::Input => "i.input",
        MeasurementSortKey::Anomaly => ANOMALY_EXPR,
        MeasurementSortKey::Confirmed => CONFIRMED_EXPR,
        MeasurementSortKey::Failure => MSM_FAILURE_EXPR,
    })
}

/// Page of measurements. Never paired with a count query.
pub fn list_measurements(
    dialect: Dialect,
    filter: &MeasurementFilter,
    page: &Pagination,
) -> RenderedQuery {
    let joins_input = filter.joins_input();
    let mut w = SqlWriter::new(dialect);

    w.push(
        "SELECT m.id AS measurement_id, m.report_no, r.report_id, r.probe_cc, r.probe_asn, \
         r.test_name, m.measurement_start_time, ",
    );
    w.push(if joins_input {
        "i.input AS input, "
    } else {
        "CAST(NULL AS TEXT) AS input, "
    });
    w.push(ANOMALY_EXPR)
        .push(" AS anomaly, ")
        .push(CONFIRMED_EXPR)
        .push(" AS confirmed, ")
        .push(FAILED_EXPR)
        .push(" AS failure");
    w.push(
        " FROM measurements m \
         JOIN reports r ON r.report_no = m.report_no \
         LEFT JOIN labels l ON l.msm_no = m.msm_no",
    );
    if joins_input {
        w.push(" JOIN inputs i ON i.input_no = m.input_no");
    }
    w.push_where(measurement_predicates(filter));

    if let Some(expr) = filter
        .order_by
        .and_then(|key| measurement_sort_expr(key, joins_input))
    {
        w.push(" ORDER BY ")
            .push_column(expr)
            .push(" ")
            .push(filter.order.as_sql());
    }
    w.push_page(page);
    w.finish()
}

/// Archive coordinates of every row carrying `measurement_id`, oldest first.
pub fn measurement_locations(dialect: Dialect, measurement_id: &str) -> RenderedQuery {
    let mut w = SqlWriter::new(dialect);
    w.push(
        "SELECT m.msm_no, m.id AS measurement_id, m.report_no, a.autoclaved_no, a.filename, \
         m.frame_off, m.frame_size, m.intra_off, m.intra_size \
         FROM measurements m \
         JOIN reports r ON r.report_no = m.report_no \
         JOIN autoclaved a ON a.autoclaved_no = r.autoclaved_no \
         WHERE m.id = ",
    )
    .push_bind(SqlValue::Text(measurement_id.to_string()))
    .push(" ORDER BY m.msm_no ")
    .push(SortOrder::Asc.as_sql());
    w.finish()
}
