//! Scout retail analytics tools over sari-sari store transaction data.
//!
//! Each tool reads one or two relations for the caller's tenant and folds
//! the rows into KPIs plus a chart-ready series, in the same shapes the
//! Scout dashboard panels use.

use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate};
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;
use workroom_core::error::ToolError;
use workroom_core::records::{RecordQuery, RecordSource};
use workroom_core::tool::{Tool, ToolContext};

use crate::args::{self, DateRange, number, percent, ratio, text};
use crate::relations::Relations;

pub const TREND_METRICS: [&str; 4] = ["volume", "revenue", "basket_size", "duration"];
pub const GRANULARITIES: [&str; 3] = ["day", "week", "month"];
pub const PRODUCT_ANALYSES: [&str; 4] = ["category_mix", "top_skus", "substitutions", "basket"];
pub const CONSUMER_ANALYSES: [&str; 3] = ["behavior", "demographics", "segments"];

const DEFAULT_SKU_LIMIT: usize = 100;
const DEFAULT_BASKET_LIMIT: usize = 50;
const MAX_LIMIT: usize = 500;

fn date_range_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "start": { "type": "string", "format": "date" },
            "end": { "type": "string", "format": "date" }
        },
        "required": ["start", "end"]
    })
}

// --- Transaction trends ---

pub struct TransactionTrendsTool {
    records: Arc<dyn RecordSource>,
    relation: String,
}

impl TransactionTrendsTool {
    pub fn new(records: Arc<dyn RecordSource>, relations: &Relations) -> Self {
        Self {
            records,
            relation: relations.get("transaction_trends"),
        }
    }
}

/// Per-period sums. Item and duration averages are basket-weighted.
#[derive(Debug, Default, Clone)]
struct TrendBucket {
    basket_count: f64,
    total_revenue: f64,
    weighted_items: f64,
    weighted_duration: f64,
    impulse_basket_count: f64,
    morning: f64,
    afternoon: f64,
    evening: f64,
    night: f64,
    weekday: f64,
    weekend: f64,
}

impl TrendBucket {
    fn avg_items(&self) -> f64 {
        ratio(self.weighted_items, self.basket_count)
    }

    fn avg_duration(&self) -> f64 {
        ratio(self.weighted_duration, self.basket_count)
    }
}

fn period_key(raw_date: &str, granularity: &str) -> String {
    let day = raw_date.get(..10).unwrap_or(raw_date);
    let Ok(date) = NaiveDate::parse_from_str(day, "%Y-%m-%d") else {
        return day.to_string();
    };
    match granularity {
        "week" => {
            // Weeks start on Sunday.
            let offset = date.weekday().num_days_from_sunday() as i64;
            (date - Duration::days(offset)).format("%Y-%m-%d").to_string()
        }
        "month" => format!("{}-{:02}", date.year(), date.month()),
        _ => day.to_string(),
    }
}

/// Fold trend rows into KPIs, a time series and breakdowns for one metric.
pub fn summarize_trends(rows: &[Value], metric: &str, granularity: &str) -> Value {
    let mut buckets: BTreeMap<String, TrendBucket> = BTreeMap::new();
    for row in rows {
        let key = period_key(&text(row, "transaction_date"), granularity);
        let bucket = buckets.entry(key).or_default();
        let baskets = number(row, "basket_count");
        bucket.basket_count += baskets;
        bucket.total_revenue += number(row, "total_revenue");
        bucket.weighted_items += number(row, "avg_items_per_basket") * baskets;
        bucket.weighted_duration += number(row, "avg_duration_seconds") * baskets;
        bucket.impulse_basket_count += number(row, "impulse_basket_count");
        bucket.morning += number(row, "morning_count");
        bucket.afternoon += number(row, "afternoon_count");
        bucket.evening += number(row, "evening_count");
        bucket.night += number(row, "night_count");
        bucket.weekday += number(row, "weekday_count");
        bucket.weekend += number(row, "weekend_count");
    }

    let periods = buckets.len() as f64;
    let total = buckets.values().fold(TrendBucket::default(), |mut acc, b| {
        acc.basket_count += b.basket_count;
        acc.total_revenue += b.total_revenue;
        acc.impulse_basket_count += b.impulse_basket_count;
        acc.morning += b.morning;
        acc.afternoon += b.afternoon;
        acc.evening += b.evening;
        acc.night += b.night;
        acc.weekday += b.weekday;
        acc.weekend += b.weekend;
        acc
    });

    let series = |value: fn(&TrendBucket) -> f64| -> Vec<Value> {
        buckets
            .iter()
            .map(|(date, b)| json!({ "date": date, "value": value(b) }))
            .collect()
    };

    let (time_series, kpis, breakdowns) = match metric {
        "revenue" => (
            series(|b| b.total_revenue),
            json!({
                "total_revenue": total.total_revenue,
                "avg_basket_value": ratio(total.total_revenue, total.basket_count),
            }),
            json!({}),
        ),
        "basket_size" => (
            series(TrendBucket::avg_items),
            json!({
                "avg_items_per_basket":
                    ratio(buckets.values().map(TrendBucket::avg_items).sum(), periods),
            }),
            json!({}),
        ),
        "duration" => (
            series(TrendBucket::avg_duration),
            json!({
                "avg_duration_seconds":
                    ratio(buckets.values().map(TrendBucket::avg_duration).sum(), periods),
                "impulse_rate": percent(total.impulse_basket_count, total.basket_count),
            }),
            json!({}),
        ),
        _ => (
            series(|b| b.basket_count),
            json!({
                "total_baskets": total.basket_count,
                "avg_baskets_per_day": ratio(total.basket_count, periods),
            }),
            json!({
                "by_time_of_day": {
                    "morning": total.morning,
                    "afternoon": total.afternoon,
                    "evening": total.evening,
                    "night": total.night,
                },
                "by_day_of_week": {
                    "weekday": total.weekday,
                    "weekend": total.weekend,
                },
            }),
        ),
    };

    json!({
        "metric": metric,
        "kpis": kpis,
        "time_series": time_series,
        "breakdowns": breakdowns,
    })
}

#[async_trait]
impl Tool for TransactionTrendsTool {
    fn name(&self) -> &str {
        "get_transaction_trends"
    }

    fn description(&self) -> &str {
        "Get transaction volume, revenue, basket size, or duration trends over time"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "metric": {
                    "type": "string",
                    "enum": TREND_METRICS,
                    "description": "Which metric to analyze"
                },
                "date_range": date_range_schema(),
                "filters": {
                    "type": "object",
                    "properties": {
                        "categories": { "type": "array", "items": { "type": "string" } },
                        "regions": { "type": "array", "items": { "type": "string" } }
                    }
                },
                "granularity": {
                    "type": "string",
                    "enum": GRANULARITIES,
                    "description": "Time bucket for the series (default day)"
                }
            },
            "required": ["metric", "date_range"]
        })
    }

    async fn execute(&self, ctx: &ToolContext, arguments: Value) -> Result<Value, ToolError> {
        let metric = args::one_of(
            args::required_str(&arguments, "metric")?,
            "metric",
            &TREND_METRICS,
        )?;
        let range = DateRange::from_args(&arguments)?;
        let granularity = match args::optional_str(&arguments, "granularity") {
            Some(g) => args::one_of(g, "granularity", &GRANULARITIES)?,
            None => "day",
        };
        let filters = arguments.get("filters");

        let query = RecordQuery::from(&self.relation)
            .eq("tenant_id", ctx.tenant_id.as_str())
            .gte("transaction_date", range.start_str())
            .lte("transaction_date", range.end_str())
            .any_of(
                "product_category",
                args::string_list(filters.and_then(|f| f.get("categories"))),
            )
            .any_of(
                "region",
                args::string_list(filters.and_then(|f| f.get("regions"))),
            )
            .order_by("transaction_date", false);

        let rows = self.records.select(&query).await?;
        debug!(metric, rows = rows.len(), "Transaction trends");
        Ok(summarize_trends(&rows, metric, granularity))
    }
}

// --- Product performance ---

pub struct ProductPerformanceTool {
    records: Arc<dyn RecordSource>,
    transactions: String,
    product_mix: String,
    substitution_flows: String,
}

impl ProductPerformanceTool {
    pub fn new(records: Arc<dyn RecordSource>, relations: &Relations) -> Self {
        Self {
            records,
            transactions: relations.get("transactions"),
            product_mix: relations.get("product_mix"),
            substitution_flows: relations.get("substitution_flows"),
        }
    }

    fn transactions_in(&self, ctx: &ToolContext, range: &DateRange) -> RecordQuery {
        RecordQuery::from(&self.transactions)
            .eq("tenant_id", ctx.tenant_id.as_str())
            .gte("timestamp", range.start_str())
            .lte("timestamp", range.end_of_day_str())
    }
}

/// Revenue share per product category, largest first.
pub fn category_mix(rows: &[Value], limit: Option<usize>) -> Value {
    let mut revenue: HashMap<String, f64> = HashMap::new();
    for row in rows {
        *revenue.entry(text(row, "product_category")).or_default() += number(row, "line_amount");
    }
    let total: f64 = revenue.values().sum();

    let mut distribution: Vec<(String, f64)> = revenue.into_iter().collect();
    distribution.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let categories = distribution.len();
    if let Some(limit) = limit {
        distribution.truncate(limit);
    }

    let distribution: Vec<Value> = distribution
        .into_iter()
        .map(|(category, revenue)| {
            json!({ "category": category, "revenue": revenue, "share_pct": percent(revenue, total) })
        })
        .collect();

    json!({
        "kpis": {
            "total_categories": categories,
            "top_category": distribution.first().map(|d| d["category"].clone()),
            "top_category_share": distribution.first().map(|d| d["share_pct"].clone()),
        },
        "category_distribution": distribution,
    })
}

/// SKU revenue ranking (Pareto view).
pub fn sku_rankings(rows: &[Value]) -> Value {
    let rankings: Vec<Value> = rows
        .iter()
        .map(|p| {
            json!({
                "rank": p.get("revenue_rank").cloned().unwrap_or(Value::Null),
                "sku": p.get("sku").cloned().unwrap_or(Value::Null),
                "product_name": p.get("product_name").cloned().unwrap_or(Value::Null),
                "brand_name": p.get("brand_name").cloned().unwrap_or(Value::Null),
                "revenue": number(p, "total_revenue"),
                "cumulative_pct": number(p, "cumulative_revenue_pct") * 100.0,
            })
        })
        .collect();

    let total: f64 = rows.iter().map(|p| number(p, "total_revenue")).sum();
    let top_20: Vec<&Value> = rows
        .iter()
        .filter(|p| number(p, "revenue_rank") <= 20.0)
        .collect();
    let top_20_revenue: f64 = top_20.iter().map(|p| number(p, "total_revenue")).sum();

    json!({
        "kpis": {
            "total_skus": rows.len(),
            "top_20_count": top_20.len(),
            "top_20_revenue_share": percent(top_20_revenue, total),
        },
        "sku_rankings": rankings,
    })
}

/// Brand substitution matrix and flows.
pub fn substitutions(rows: &[Value]) -> Value {
    let matrix: Vec<Value> = rows
        .iter()
        .map(|f| {
            json!({
                "original_brand": text(f, "original_brand_name"),
                "substitute_brand": text(f, "substitute_brand_name"),
                "count": number(f, "substitution_count"),
                "reason": f.get("substitution_reason").cloned().unwrap_or(Value::Null),
            })
        })
        .collect();
    let flows: Vec<Value> = rows
        .iter()
        .map(|f| {
            json!({
                "source": text(f, "original_brand_name"),
                "target": text(f, "substitute_brand_name"),
                "value": number(f, "substitution_count"),
            })
        })
        .collect();

    let total: f64 = rows.iter().map(|f| number(f, "substitution_count")).sum();
    let out_of_stock: f64 = rows
        .iter()
        .filter(|f| f.get("substitution_reason").and_then(Value::as_str) == Some("out_of_stock"))
        .map(|f| number(f, "substitution_count"))
        .sum();

    json!({
        "kpis": {
            "total_substitutions": total,
            "out_of_stock_rate": percent(out_of_stock, total),
            "unique_flows": rows.len(),
        },
        "substitution_matrix": matrix,
        "substitution_flows": flows,
    })
}

/// Basket penetration per product: share of baskets containing it.
pub fn basket_composition(rows: &[Value], limit: usize) -> Value {
    let mut baskets: HashSet<String> = HashSet::new();
    let mut products: HashMap<String, (HashSet<String>, f64)> = HashMap::new();
    for row in rows {
        let basket = text(row, "basket_id");
        baskets.insert(basket.clone());
        let entry = products.entry(text(row, "product_name")).or_default();
        entry.0.insert(basket);
        entry.1 += number(row, "quantity");
    }
    let total_baskets = baskets.len() as f64;

    let mut composition: Vec<(String, f64, f64)> = products
        .iter()
        .map(|(name, (in_baskets, qty))| {
            let count = in_baskets.len() as f64;
            (name.clone(), percent(count, total_baskets), ratio(*qty, count))
        })
        .collect();
    composition.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    composition.truncate(limit);

    let composition: Vec<Value> = composition
        .into_iter()
        .map(|(product_name, penetration, avg_quantity)| {
            json!({
                "product_name": product_name,
                "basket_penetration": penetration,
                "avg_quantity": avg_quantity,
            })
        })
        .collect();

    json!({
        "kpis": {
            "total_baskets": baskets.len(),
            "avg_unique_products": ratio(products.len() as f64, total_baskets),
            "top_penetration": composition.first().map(|c| c["basket_penetration"].clone()),
        },
        "basket_composition": composition,
    })
}

#[async_trait]
impl Tool for ProductPerformanceTool {
    fn name(&self) -> &str {
        "get_product_performance"
    }

    fn description(&self) -> &str {
        "Get product category mix, top SKUs, substitution patterns, or basket composition"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "analysis_type": {
                    "type": "string",
                    "enum": PRODUCT_ANALYSES,
                    "description": "Type of product analysis"
                },
                "date_range": date_range_schema(),
                "limit": { "type": "number", "description": "Number of results to return" }
            },
            "required": ["analysis_type", "date_range"]
        })
    }

    async fn execute(&self, ctx: &ToolContext, arguments: Value) -> Result<Value, ToolError> {
        let analysis = args::one_of(
            args::required_str(&arguments, "analysis_type")?,
            "analysis_type",
            &PRODUCT_ANALYSES,
        )?;
        let range = DateRange::from_args(&arguments)?;
        let explicit_limit = arguments.get("limit").is_some();

        let mut out = match analysis {
            "category_mix" => {
                let rows = self.records.select(&self.transactions_in(ctx, &range)).await?;
                let limit = explicit_limit.then(|| args::limit(&arguments, "limit", MAX_LIMIT, MAX_LIMIT));
                category_mix(&rows, limit)
            }
            "top_skus" => {
                let limit = args::limit(&arguments, "limit", DEFAULT_SKU_LIMIT, MAX_LIMIT);
                let query = RecordQuery::from(&self.product_mix)
                    .eq("tenant_id", ctx.tenant_id.as_str())
                    .order_by("revenue_rank", false)
                    .limit(limit);
                sku_rankings(&self.records.select(&query).await?)
            }
            "substitutions" => {
                let query = RecordQuery::from(&self.substitution_flows)
                    .eq("tenant_id", ctx.tenant_id.as_str());
                substitutions(&self.records.select(&query).await?)
            }
            _ => {
                let rows = self.records.select(&self.transactions_in(ctx, &range)).await?;
                let limit = args::limit(&arguments, "limit", DEFAULT_BASKET_LIMIT, MAX_LIMIT);
                basket_composition(&rows, limit)
            }
        };

        if let Some(obj) = out.as_object_mut() {
            obj.insert("analysis_type".into(), json!(analysis));
        }
        Ok(out)
    }
}

// --- Consumer segments ---

pub struct ConsumerSegmentsTool {
    records: Arc<dyn RecordSource>,
    behavior: String,
    profiling: String,
}

impl ConsumerSegmentsTool {
    pub fn new(records: Arc<dyn RecordSource>, relations: &Relations) -> Self {
        Self {
            records,
            behavior: relations.get("consumer_behavior"),
            profiling: relations.get("consumer_profiling"),
        }
    }
}

/// Request types, request modes and suggestion acceptance.
pub fn behavior_summary(rows: &[Value]) -> Value {
    let sum = |key: &str| -> f64 { rows.iter().map(|r| number(r, key)).sum() };
    let branded = sum("branded_request_count");
    let unbranded = sum("unbranded_request_count");
    let unsure = sum("unsure_request_count");
    let verbal = sum("verbal_request_count");
    let pointing = sum("pointing_request_count");
    let indirect = sum("indirect_request_count");
    let made = sum("suggestion_made_count");
    let accepted = sum("suggestion_accepted_count");
    let impulse = sum("impulse_basket_count");
    let planned = sum("planned_basket_count");
    let acceptance_rate = percent(accepted, made);

    json!({
        "kpis": {
            "branded_pct": percent(branded, branded + unbranded + unsure),
            "verbal_pct": percent(verbal, verbal + pointing + indirect),
            "suggestion_acceptance_rate": acceptance_rate,
            "impulse_rate": percent(impulse, impulse + planned),
        },
        "request_breakdown": {
            "by_type": { "branded": branded, "unbranded": unbranded, "unsure": unsure },
            "by_mode": { "verbal": verbal, "pointing": pointing, "indirect": indirect },
        },
        "acceptance_data": {
            "suggestion_made_count": made,
            "suggestion_accepted_count": accepted,
            "acceptance_rate": acceptance_rate,
        },
    })
}

#[derive(Default)]
struct SegmentTotals {
    basket_count: f64,
    total_revenue: f64,
    total_ltv: f64,
    customers: f64,
    impulse_rate_sum: f64,
    rows: f64,
}

/// Customer counts by demographic dimension, plus behavior per income segment.
pub fn profiling_summary(rows: &[Value]) -> Value {
    let dimensions = ["gender", "age_bracket", "income_segment", "urban_rural"];
    let mut demographics: BTreeMap<&str, BTreeMap<String, f64>> = BTreeMap::new();
    let mut segments: BTreeMap<String, SegmentTotals> = BTreeMap::new();

    for row in rows {
        let customers = number(row, "unique_customers");
        for dim in dimensions {
            *demographics
                .entry(dim)
                .or_default()
                .entry(text(row, dim))
                .or_default() += customers;
        }

        let segment = segments.entry(text(row, "income_segment")).or_default();
        segment.basket_count += number(row, "basket_count");
        segment.total_revenue += number(row, "total_revenue");
        segment.total_ltv += number(row, "avg_lifetime_value") * customers;
        segment.customers += customers;
        segment.impulse_rate_sum += number(row, "impulse_rate");
        segment.rows += 1.0;
    }

    let by = |dim: &str| -> BTreeMap<String, f64> { demographics.get(dim).cloned().unwrap_or_default() };
    let by_gender = by("gender");
    let by_urban_rural = by("urban_rural");
    let by_income = by("income_segment");
    let total_customers: f64 = by_gender.values().sum();
    let share = |map: &BTreeMap<String, f64>, key: &str| {
        percent(map.get(key).copied().unwrap_or(0.0), total_customers)
    };

    let segment_behavior: Vec<Value> = segments
        .iter()
        .map(|(segment, t)| {
            json!({
                "segment": segment,
                "basket_count": t.basket_count,
                "avg_basket_value": ratio(t.total_revenue, t.basket_count),
                "avg_lifetime_value": ratio(t.total_ltv, t.customers),
                "impulse_rate": ratio(t.impulse_rate_sum, t.rows),
            })
        })
        .collect();

    json!({
        "kpis": {
            "total_customers": total_customers,
            "female_pct": share(&by_gender, "female"),
            "urban_pct": share(&by_urban_rural, "urban"),
            "middle_income_pct": share(&by_income, "middle"),
        },
        "demographics": {
            "by_gender": by_gender,
            "by_age_bracket": by("age_bracket"),
            "by_income_segment": by_income,
            "by_urban_rural": by_urban_rural,
        },
        "segment_behavior": segment_behavior,
    })
}

#[async_trait]
impl Tool for ConsumerSegmentsTool {
    fn name(&self) -> &str {
        "get_consumer_segments"
    }

    fn description(&self) -> &str {
        "Get consumer behavior patterns, demographics, and segment analysis"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "analysis_type": { "type": "string", "enum": CONSUMER_ANALYSES },
                "date_range": date_range_schema()
            },
            "required": ["analysis_type", "date_range"]
        })
    }

    async fn execute(&self, ctx: &ToolContext, arguments: Value) -> Result<Value, ToolError> {
        let analysis = args::one_of(
            args::required_str(&arguments, "analysis_type")?,
            "analysis_type",
            &CONSUMER_ANALYSES,
        )?;
        let range = DateRange::from_args(&arguments)?;

        let mut out = if analysis == "behavior" {
            let query = RecordQuery::from(&self.behavior)
                .eq("tenant_id", ctx.tenant_id.as_str())
                .gte("behavior_date", range.start_str())
                .lte("behavior_date", range.end_str());
            behavior_summary(&self.records.select(&query).await?)
        } else {
            // Demographics and segments are two views of the same profiling rows.
            let query = RecordQuery::from(&self.profiling)
                .eq("tenant_id", ctx.tenant_id.as_str())
                .gte("profile_date", range.start_str())
                .lte("profile_date", range.end_str());
            profiling_summary(&self.records.select(&query).await?)
        };

        if let Some(obj) = out.as_object_mut() {
            obj.insert("analysis_type".into(), json!(analysis));
        }
        Ok(out)
    }
}

// --- Regional performance ---

pub struct RegionalPerformanceTool {
    records: Arc<dyn RecordSource>,
    relation: String,
}

impl RegionalPerformanceTool {
    pub fn new(records: Arc<dyn RecordSource>, relations: &Relations) -> Self {
        Self {
            records,
            relation: relations.get("geo_intelligence"),
        }
    }
}

/// Per-region revenue and store coverage, highest revenue first.
pub fn regional_summary(rows: &[Value]) -> Value {
    let mut regions: Vec<Map<String, Value>> = rows
        .iter()
        .map(|row| {
            let mut region = Map::new();
            region.insert("region".into(), json!(text(row, "region")));
            region.insert(
                "island_group".into(),
                row.get("island_group").cloned().unwrap_or(Value::Null),
            );
            region.insert("total_revenue".into(), json!(number(row, "total_revenue")));
            region.insert("basket_count".into(), json!(number(row, "basket_count")));
            region.insert("active_stores".into(), json!(number(row, "active_stores")));
            region.insert("revenue_per_store".into(), json!(number(row, "revenue_per_store")));
            region
        })
        .collect();
    let revenue_of = |r: &Map<String, Value>| r.get("total_revenue").and_then(Value::as_f64).unwrap_or(0.0);
    regions.sort_by(|a, b| revenue_of(b).total_cmp(&revenue_of(a)));

    let total_revenue: f64 = regions.iter().map(revenue_of).sum();
    let total_stores: f64 = regions
        .iter()
        .map(|r| r.get("active_stores").and_then(Value::as_f64).unwrap_or(0.0))
        .sum();

    json!({
        "kpis": {
            "total_regions": regions.len(),
            "total_revenue": total_revenue,
            "total_stores": total_stores,
            "avg_revenue_per_store": ratio(total_revenue, total_stores),
            "top_region": regions.first().and_then(|r| r.get("region")).cloned(),
        },
        "regional_performance": regions,
    })
}

#[async_trait]
impl Tool for RegionalPerformanceTool {
    fn name(&self) -> &str {
        "get_regional_performance"
    }

    fn description(&self) -> &str {
        "Get regional revenue, store distribution, and market penetration"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "date_range": date_range_schema(),
                "regions": { "type": "array", "items": { "type": "string" } }
            },
            "required": ["date_range"]
        })
    }

    async fn execute(&self, ctx: &ToolContext, arguments: Value) -> Result<Value, ToolError> {
        // The regional relation is already aggregated over its own period;
        // the range is validated so malformed calls are reported.
        DateRange::from_args(&arguments)?;
        let query = RecordQuery::from(&self.relation)
            .eq("tenant_id", ctx.tenant_id.as_str())
            .any_of("region", args::string_list(arguments.get("regions")));
        Ok(regional_summary(&self.records.select(&query).await?))
    }
}
