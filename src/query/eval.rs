//! In-process query evaluation for the local stores.
//!
//! All three query shapes are reduced to a [`QueryExpression`] plus [`PagingInfo`], then
//! filtered, joined, ordered, projected, and sliced into one page.

use super::expression::{ColumnSet, Condition, ConditionOperator, FilterExpression, JoinOperator, LinkEntity, LogicalOperator, QueryExpression};
use super::fetch::parse_fetch;
use super::{PagingInfo, QuerySpec, RecordPage, DEFAULT_PAGE_SIZE};
use crate::error::StoreError;
use crate::record::Record;
use crate::types::{AliasedValue, Value};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::str::FromStr;
use uuid::Uuid;

/// Reduce any query shape to an expression and the page it asks for.
pub fn resolve(spec: &QuerySpec) -> Result<(QueryExpression, PagingInfo), StoreError> {
    let (query, paging) = match spec {
        QuerySpec::Expression(query) => {
            let paging = query.paging.clone().unwrap_or_default();
            (query.clone(), paging)
        }
        QuerySpec::ByAttribute(query) => {
            let paging = query.paging.clone().unwrap_or_default();
            (query.to_expression(), paging)
        }
        QuerySpec::Fetch(fetch) => {
            parse_fetch(&fetch.markup).map_err(|e| StoreError::UnsupportedQuery(e.to_string()))?
        }
    };
    if query.entity_name.is_empty() {
        return Err(StoreError::UnsupportedQuery("query names no entity".to_string()));
    }
    let paging = PagingInfo {
        page_number: paging.page_number.max(1),
        count: paging.count.clamp(1, DEFAULT_PAGE_SIZE),
        paging_cookie: paging.paging_cookie,
    };
    Ok((query, paging))
}

/// Run `spec` against records supplied by `load`, one entity type at a time.
pub fn execute<F>(spec: &QuerySpec, load: F) -> Result<RecordPage, StoreError>
where
    F: Fn(&str) -> Result<Vec<Record>, StoreError>,
{
    let (query, paging) = resolve(spec)?;

    let linked: Vec<Vec<Record>> = query
        .links
        .iter()
        .map(|link| {
            load(&link.link_to_entity)
                .map(|records| records.into_iter().filter(|r| matches_filter(r, &link.criteria)).collect())
        })
        .collect::<Result<_, _>>()?;

    let mut rows = Vec::new();
    for record in load(&query.entity_name)? {
        if !matches_filter(&record, &query.criteria) {
            continue;
        }
        let mut joined = vec![record];
        for (link, candidates) in query.links.iter().zip(&linked) {
            joined = joined
                .into_iter()
                .flat_map(|row| join_row(row, link, candidates))
                .collect();
        }
        rows.extend(joined);
    }

    rows.sort_by(|a, b| {
        for order in &query.orders {
            let ordering = compare_fields(
                field_value(a, &order.attribute).as_deref(),
                field_value(b, &order.attribute).as_deref(),
            );
            let ordering = if order.descending { ordering.reverse() } else { ordering };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        a.id.cmp(&b.id)
    });

    let total = rows.len();
    let start = (paging.page_number as usize - 1).saturating_mul(paging.count as usize);
    let end = start.saturating_add(paging.count as usize).min(total);
    let records: Vec<Record> = if start >= total {
        Vec::new()
    } else {
        rows[start..end].iter().map(|r| project(r, &query.columns)).collect()
    };
    let paging_cookie = paging_cookie(&query.entity_name, paging.page_number, &records);
    Ok(RecordPage {
        records,
        paging_cookie,
        more_records: end < total,
    })
}

/// Copy of `record` limited to `columns`. Join aliases are always kept.
pub fn project(record: &Record, columns: &ColumnSet) -> Record {
    match columns {
        ColumnSet::All => record.clone(),
        ColumnSet::Columns(names) => {
            let mut projected = Record::with_id(record.type_name.clone(), record.id);
            for (name, value) in &record.attributes {
                let aliased = matches!(value, Value::Aliased(_));
                if aliased || names.iter().any(|n| n == name) {
                    projected.attributes.insert(name.clone(), value.clone());
                }
            }
            projected
        }
    }
}

fn paging_cookie(entity: &str, page: u32, records: &[Record]) -> Option<String> {
    let (first, last) = (records.first()?, records.last()?);
    Some(format!(
        "<cookie page=\"{}\"><{}id last=\"{{{}}}\" first=\"{{{}}}\" /></cookie>",
        page, entity, last.id, first.id
    ))
}

fn join_row(row: Record, link: &LinkEntity, candidates: &[Record]) -> Vec<Record> {
    let key = field_value(&row, &link.link_from_attribute)
        .filter(|v| !v.is_null())
        .map(Cow::into_owned);
    let Some(key) = key else {
        return match link.join {
            JoinOperator::Inner => Vec::new(),
            JoinOperator::LeftOuter => vec![row],
        };
    };
    let alias = link.alias_or_entity();
    let matches: Vec<&Record> = candidates
        .iter()
        .filter(|candidate| {
            field_value(candidate, &link.link_to_attribute)
                .is_some_and(|v| compare(&v, &key) == Some(Ordering::Equal))
        })
        .collect();
    if matches.is_empty() {
        return match link.join {
            JoinOperator::Inner => Vec::new(),
            JoinOperator::LeftOuter => vec![row],
        };
    }
    matches
        .into_iter()
        .map(|linked| {
            let mut joined = row.clone();
            for (name, value) in &linked.attributes {
                if link.columns.includes(name) {
                    joined.attributes.insert(
                        format!("{}.{}", alias, name),
                        Value::Aliased(Box::new(AliasedValue {
                            alias: alias.to_string(),
                            source_attribute: name.clone(),
                            value: value.unaliased().clone(),
                        })),
                    );
                }
            }
            joined
        })
        .collect()
}

/// Stored attribute value, or the record id when `name` is the type's primary key (`<type>id`).
fn field_value<'r>(record: &'r Record, name: &str) -> Option<Cow<'r, Value>> {
    if let Some(value) = record.raw(name) {
        return Some(Cow::Borrowed(value.unaliased()));
    }
    let is_key = name.len() == record.type_name.len() + 2
        && name.starts_with(record.type_name.as_str())
        && name.ends_with("id");
    if is_key && !record.id.is_nil() {
        return Some(Cow::Owned(Value::Guid(record.id)));
    }
    None
}

pub(crate) fn matches_filter(record: &Record, filter: &FilterExpression) -> bool {
    let mut results = filter
        .conditions
        .iter()
        .map(|c| matches_condition(record, c))
        .chain(filter.filters.iter().map(|f| matches_filter(record, f)))
        .peekable();
    if results.peek().is_none() {
        return true;
    }
    match filter.operator {
        LogicalOperator::And => results.all(|r| r),
        LogicalOperator::Or => results.any(|r| r),
    }
}

fn matches_condition(record: &Record, condition: &Condition) -> bool {
    let value = field_value(record, &condition.attribute);
    let present = value.as_deref().filter(|v| !v.is_null());
    let Some(stored) = present else {
        return condition.operator == ConditionOperator::Null;
    };
    let first = condition.values.first();
    let ordering = || first.and_then(|wanted| compare(stored, wanted));
    match condition.operator {
        ConditionOperator::Null => false,
        ConditionOperator::NotNull => true,
        ConditionOperator::Equal => ordering() == Some(Ordering::Equal),
        ConditionOperator::NotEqual => ordering().is_some_and(|o| o != Ordering::Equal),
        ConditionOperator::GreaterThan => ordering() == Some(Ordering::Greater),
        ConditionOperator::GreaterEqual => ordering().is_some_and(|o| o != Ordering::Less),
        ConditionOperator::LessThan => ordering() == Some(Ordering::Less),
        ConditionOperator::LessEqual => ordering().is_some_and(|o| o != Ordering::Greater),
        ConditionOperator::In => condition
            .values
            .iter()
            .any(|wanted| compare(stored, wanted) == Some(Ordering::Equal)),
        ConditionOperator::Like => first.is_some_and(|pattern| {
            like(
                &stored.to_query_text().to_lowercase(),
                &pattern.to_query_text().to_lowercase(),
            )
        }),
    }
}

fn compare_fields(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a.filter(|v| !v.is_null()), b.filter(|v| !v.is_null())) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => compare(a, b).unwrap_or(Ordering::Equal),
    }
}

/// Compare a stored value against a wanted one, coercing the wanted side to the stored kind.
///
/// Fetch markup carries every value as text, so text on the wanted side is parsed.
fn compare(stored: &Value, wanted: &Value) -> Option<Ordering> {
    let wanted = wanted.unaliased();
    match stored.unaliased() {
        Value::Null | Value::Aliased(_) => None,
        number @ (Value::Integer(_) | Value::Float(_) | Value::Decimal(_) | Value::OptionSet(_)) => {
            Some(as_decimal(number)?.cmp(&as_decimal(wanted)?))
        }
        Value::Boolean(a) => Some(a.cmp(&as_bool(wanted)?)),
        Value::Guid(a) => Some(a.cmp(&as_guid(wanted)?)),
        Value::Reference(r) => Some(r.id.cmp(&as_guid(wanted)?)),
        Value::DateTime(a) => Some(a.cmp(&as_datetime(wanted)?)),
        Value::Text(a) => Some(a.to_lowercase().cmp(&wanted.to_query_text().to_lowercase())),
    }
}

fn as_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Integer(i) => Some(Decimal::from(*i)),
        Value::Float(f) => Decimal::try_from(*f).ok(),
        Value::Decimal(d) => Some(*d),
        Value::OptionSet(o) => Some(Decimal::from(*o)),
        Value::Boolean(b) => Some(Decimal::from(u8::from(*b))),
        Value::Text(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Boolean(b) => Some(*b),
        Value::Integer(i) => Some(*i != 0),
        Value::Text(s) => match s.trim() {
            "1" | "true" => Some(true),
            "0" | "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn as_guid(value: &Value) -> Option<Uuid> {
    match value {
        Value::Guid(g) => Some(*g),
        Value::Reference(r) => Some(r.id),
        Value::Text(s) => Uuid::parse_str(s.trim()).ok(),
        _ => None,
    }
}

fn as_datetime(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::DateTime(dt) => Some(*dt),
        Value::Text(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    }
}

/// `%`-wildcard match.
fn like(text: &str, pattern: &str) -> bool {
    let parts: Vec<&str> = pattern.split('%').collect();
    if parts.len() == 1 {
        return text == pattern;
    }
    let Some(rest) = text.strip_prefix(parts[0]) else {
        return false;
    };
    let mut rest = rest;
    let last = parts[parts.len() - 1];
    for part in &parts[1..parts.len() - 1] {
        match rest.find(part) {
            Some(i) => rest = &rest[i + part.len()..],
            None => return false,
        }
    }
    rest.len() >= last.len() && rest.ends_with(last)
}
