//! SQL for reading entities together with all their typed properties.
//!
//! One statement returns each entity row plus seven JSONB aggregates (one
//! per data type and one for tags) built by lateral joins. The count
//! statement shares only the WHERE clause.

use chrono::{DateTime, Duration, Utc};
use common::{
    ListFilter, ListSort, NativeSortProperty, SortDirection, SortProperty, TextMatch, TimeFilter,
};
use sea_orm::Statement;

use crate::error::AppError;
use crate::models::shared::escape_like;
use crate::utils::time::{DAY_MILLIS, parse_day_start};

use super::sql::SqlParams;
use super::tables::PropertyTables;
use super::tagging::normalize_labels;

/// SQL text with its bound parameters.
#[derive(Debug)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: SqlParams,
}

impl BuiltQuery {
    pub fn into_statement(self) -> Statement {
        self.params.into_statement(self.sql)
    }
}

#[derive(Debug, Clone)]
pub struct ListQueryBuilder {
    user_id: i32,
    filter: ListFilter,
    sort: ListSort,
    entity_id: Option<i32>,
    window: Option<(DateTime<Utc>, DateTime<Utc>)>,
    limit: Option<u64>,
    offset: Option<u64>,
    now: DateTime<Utc>,
}

impl ListQueryBuilder {
    /// Everything owned by `user_id`, newest first.
    pub fn new(user_id: i32) -> Self {
        Self {
            user_id,
            filter: ListFilter::default(),
            sort: ListSort::default(),
            entity_id: None,
            window: None,
            limit: None,
            offset: None,
            now: Utc::now(),
        }
    }

    pub fn filter(mut self, filter: ListFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn sort(mut self, sort: ListSort) -> Self {
        self.sort = sort;
        self
    }

    /// Restrict to a single entity.
    pub fn entity(mut self, entity_id: i32) -> Self {
        self.entity_id = Some(entity_id);
        self
    }

    /// Restrict to entities created within `[start, end]`.
    pub fn created_between(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.window = Some((start, end));
        self
    }

    pub fn paginate(mut self, start: u64, per_page: u64) -> Self {
        self.offset = Some(start);
        self.limit = Some(per_page);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Clock used for the ALL_TIME upper bound.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Entity rows with their aggregated tags and properties.
    pub fn build(&self) -> Result<BuiltQuery, AppError> {
        let mut params = SqlParams::new();

        let mut columns = vec![
            "e.\"id\"".to_string(),
            "e.\"user_id\"".to_string(),
            "e.\"entity_config_id\"".to_string(),
            "e.\"created_at\"".to_string(),
            "e.\"updated_at\"".to_string(),
            "entity_tags.\"tags\"".to_string(),
        ];
        columns.extend(
            PropertyTables::all()
                .map(|t| format!("{}_props.\"values\" AS \"{}\"", t.prefix, t.values_column())),
        );

        let mut sql = format!("SELECT {}\nFROM \"entity\" e", columns.join(", "));
        sql.push_str(
            "\nLEFT JOIN LATERAL (\
             SELECT COALESCE(jsonb_agg(et.\"label\" ORDER BY et.\"label\"), '[]'::jsonb) AS \"tags\" \
             FROM \"entity_tag\" et WHERE et.\"entity_id\" = e.\"id\"\
             ) entity_tags ON true",
        );
        for tables in PropertyTables::all() {
            sql.push_str(&values_join(tables));
        }

        let order_by = self.order_by(&mut sql, &mut params);
        let where_clause = self.where_clause(&mut params)?;
        sql.push_str(&format!("\nWHERE {where_clause}\nORDER BY {order_by}"));

        if let Some(limit) = self.limit {
            sql.push_str(&format!("\nLIMIT {}", params.bind(to_bigint("perPage", limit)?)));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {}", params.bind(to_bigint("start", offset)?)));
        }

        Ok(BuiltQuery { sql, params })
    }

    /// Number of rows [`Self::build`] would return without pagination.
    pub fn build_count(&self) -> Result<BuiltQuery, AppError> {
        let mut params = SqlParams::new();
        let where_clause = self.where_clause(&mut params)?;
        let sql = format!("SELECT COUNT(*) AS \"total\" FROM \"entity\" e WHERE {where_clause}");
        Ok(BuiltQuery { sql, params })
    }

    fn where_clause(&self, params: &mut SqlParams) -> Result<String, AppError> {
        let mut clauses = vec![format!("e.\"user_id\" = {}", params.bind(self.user_id))];

        if let Some(id) = self.entity_id {
            clauses.push(format!("e.\"id\" = {}", params.bind(id)));
        }
        if let Some((start, end)) = self.window {
            clauses.push(format!(
                "e.\"created_at\" >= {} AND e.\"created_at\" <= {}",
                params.bind(start),
                params.bind(end)
            ));
        }

        if !self.filter.include_all {
            clauses.push(self.time_clause(params)?);
            if let Some(tags) = self.tag_clause(params) {
                clauses.push(tags);
            }
            if !self.filter.include_types.is_empty() {
                clauses.push(format!(
                    "e.\"entity_config_id\" IN ({})",
                    params.bind_all(self.filter.include_types.iter().copied())
                ));
            }
            clauses.extend(self.text_clauses(params));
        }

        Ok(clauses.join("\n  AND "))
    }

    fn time_clause(&self, params: &mut SqlParams) -> Result<String, AppError> {
        let day = Duration::milliseconds(DAY_MILLIS);
        let (start, end) = match &self.filter.time {
            TimeFilter::AllTime => {
                return Ok(format!("e.\"created_at\" <= {}", params.bind(self.now)));
            }
            TimeFilter::ExactDate { date } => {
                let start = parse_filter_date(date)?;
                (start, next_day(start, day)?)
            }
            TimeFilter::Range { start, end } => {
                let start = parse_filter_date(start)?;
                let end = next_day(parse_filter_date(end)?, day)?;
                if end <= start {
                    return Err(AppError::Validation(
                        "Time range end must not precede its start".into(),
                    ));
                }
                (start, end)
            }
        };
        Ok(format!(
            "e.\"created_at\" >= {} AND e.\"created_at\" < {}",
            params.bind(start),
            params.bind(end)
        ))
    }

    fn tag_clause(&self, params: &mut SqlParams) -> Option<String> {
        if self.filter.include_all_tagging {
            return None;
        }
        let one_of = normalize_labels(&self.filter.tagging.contains_one_of);
        let all_of = normalize_labels(&self.filter.tagging.contains_all_of);

        let mut parts = Vec::new();
        if !one_of.is_empty() {
            parts.push(format!(
                "EXISTS (SELECT 1 FROM \"entity_tag\" et \
                 WHERE et.\"entity_id\" = e.\"id\" AND et.\"label\" IN ({}))",
                params.bind_all(one_of)
            ));
        }
        if !all_of.is_empty() {
            let wanted = all_of.len() as i64;
            let labels = params.bind_all(all_of);
            parts.push(format!(
                "(SELECT COUNT(DISTINCT et.\"label\") FROM \"entity_tag\" et \
                 WHERE et.\"entity_id\" = e.\"id\" AND et.\"label\" IN ({labels})) = {}",
                params.bind(wanted)
            ));
        }
        if parts.is_empty() {
            return None;
        }

        let matched = parts.join(" AND ");
        Some(if self.filter.include_untagged {
            format!(
                "(({matched}) OR NOT EXISTS (SELECT 1 FROM \"entity_tag\" et WHERE et.\"entity_id\" = e.\"id\"))"
            )
        } else {
            format!("({matched})")
        })
    }

    fn text_clauses(&self, params: &mut SqlParams) -> Vec<String> {
        self.filter
            .text
            .iter()
            .filter(|rule| !rule.sub_str.is_empty())
            .map(|rule| {
                let escaped = escape_like(&rule.sub_str);
                let pattern = match rule.kind {
                    TextMatch::Contains => format!("%{escaped}%"),
                    TextMatch::StartsWith => format!("{escaped}%"),
                    TextMatch::EndsWith => format!("%{escaped}"),
                    TextMatch::Equals => escaped,
                };
                let ph = params.bind(pattern);
                let any_text: Vec<String> = PropertyTables::text()
                    .map(|t| {
                        format!(
                            "EXISTS (SELECT 1 FROM \"{}\" tl JOIN \"{}\" tv ON tv.\"id\" = tl.\"property_value_id\" \
                             WHERE tl.\"entity_id\" = e.\"id\" AND tv.\"value\" ILIKE {ph} ESCAPE '\\')",
                            t.link_table, t.value_table
                        )
                    })
                    .collect();
                format!("({})", any_text.join(" OR "))
            })
            .collect()
    }

    /// ORDER BY list; a custom sort also appends its lateral join to `sql`.
    fn order_by(&self, sql: &mut String, params: &mut SqlParams) -> String {
        let dir = match self.sort.direction {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        };
        let key = match &self.sort.property {
            SortProperty::Native(NativeSortProperty::Id) => {
                return format!("e.\"id\" {dir}");
            }
            SortProperty::Native(NativeSortProperty::CreatedAt) => "e.\"created_at\"".to_string(),
            SortProperty::Native(NativeSortProperty::UpdatedAt) => "e.\"updated_at\"".to_string(),
            SortProperty::Custom(custom) => {
                let tables = PropertyTables::of(custom.data_type);
                sql.push_str(&format!(
                    "\nLEFT JOIN LATERAL (\
                     SELECT {} AS \"sort_value\" \
                     FROM \"{}\" l JOIN \"{}\" v ON v.\"id\" = l.\"property_value_id\" \
                     WHERE l.\"entity_id\" = e.\"id\" AND l.\"property_config_id\" = {} \
                     ORDER BY l.\"order\" LIMIT 1\
                     ) sort_prop ON true",
                    tables.sort_expr("v"),
                    tables.link_table,
                    tables.value_table,
                    params.bind(custom.property_id),
                ));
                "sort_prop.\"sort_value\"".to_string()
            }
        };
        format!("{key} {dir} NULLS LAST, e.\"id\" {dir}")
    }
}

fn values_join(tables: &PropertyTables) -> String {
    format!(
        "\nLEFT JOIN LATERAL (\
         SELECT COALESCE(jsonb_agg(jsonb_build_object(\
         'id', v.\"id\", 'propertyConfigId', l.\"property_config_id\", 'order', l.\"order\", 'value', {value}\
         ) ORDER BY l.\"order\"), '[]'::jsonb) AS \"values\" \
         FROM \"{link}\" l JOIN \"{table}\" v ON v.\"id\" = l.\"property_value_id\" \
         WHERE l.\"entity_id\" = e.\"id\"\
         ) {prefix}_props ON true",
        value = tables.value_json("v"),
        link = tables.link_table,
        table = tables.value_table,
        prefix = tables.prefix,
    )
}

fn parse_filter_date(raw: &str) -> Result<DateTime<Utc>, AppError> {
    parse_day_start(raw).map_err(|e| AppError::Validation(format!("Invalid time filter: {e}")))
}

fn next_day(start: DateTime<Utc>, day: Duration) -> Result<DateTime<Utc>, AppError> {
    start
        .checked_add_signed(day)
        .ok_or_else(|| AppError::Validation(format!("Time filter date {start} is out of range")))
}

/// Postgres LIMIT and OFFSET take a signed bigint.
fn to_bigint(name: &str, value: u64) -> Result<i64, AppError> {
    i64::try_from(value).map_err(|_| AppError::Validation(format!("{name} {value} is too large")))
}
