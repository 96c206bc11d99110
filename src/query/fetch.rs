//! Fetch markup templates
//!
//! A fetch template is markup whose root `<fetch>` element carries three paging attributes:
//! `page`, `paging-cookie`, and `count`. Templates that omit them get markers injected
//! (`{0}` for the page number, `{1}` for the escaped resume token) so every page can be
//! rendered from the same template.

use super::expression::{
    ColumnSet, Condition, ConditionOperator, FilterExpression, JoinOperator, LinkEntity, LogicalOperator,
    OrderExpression, QueryExpression,
};
use super::markup::{self, Element, MarkupError};
use super::PagingInfo;
use crate::error::ContextError;
use crate::types::Value;
use serde::{Deserialize, Serialize};

const PAGE_MARKER: &str = "{0}";
const COOKIE_MARKER: &str = "{1}";

/// Raw fetch markup as supplied by a caller or a saved view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchQuery {
    pub markup: String,
}

impl FetchQuery {
    pub fn new(markup: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
        }
    }
}

/// Escape a resume token for embedding in a markup attribute.
pub fn escape_token(token: &str) -> String {
    markup::escape(token)
}

/// Double literal braces so a value survives template rendering unchanged.
pub fn double_braces(text: &str) -> String {
    text.replace('{', "{{").replace('}', "}}")
}

/// A fetch template with paging markers guaranteed present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTemplate {
    text: String,
}

impl FetchTemplate {
    /// Inject any missing `page`, `paging-cookie`, and `count` attributes into the root element.
    ///
    /// Attributes already present are left untouched. The rest of the template text is kept
    /// byte for byte.
    pub fn normalize(template: &str, count: u32) -> Result<Self, ContextError> {
        let root = markup::parse(template).map_err(malformed)?;
        if root.name != "fetch" {
            return Err(ContextError::configuration(format!(
                "fetch template root must be <fetch>, found <{}>",
                root.name
            )));
        }
        let mut injected = String::new();
        if !root.has_attribute("page") {
            injected.push_str(&format!(" page=\"{}\"", PAGE_MARKER));
        }
        if !root.has_attribute("paging-cookie") {
            injected.push_str(&format!(" paging-cookie=\"{}\"", COOKIE_MARKER));
        }
        if !root.has_attribute("count") {
            injected.push_str(&format!(" count=\"{}\"", count));
        }
        let mut text = template.to_string();
        text.insert_str(root.start_tag_close, &injected);
        Ok(Self { text })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Concrete markup for one page.
    ///
    /// `{0}` becomes the page number, `{1}` the escaped token, and doubled braces collapse to
    /// single ones. Any other brace passes through as written.
    pub fn render(&self, page: u32, token: &str) -> String {
        let escaped = escape_token(token);
        let page = page.to_string();
        let mut out = String::with_capacity(self.text.len() + escaped.len());
        let mut rest = self.text.as_str();
        while let Some(c) = rest.chars().next() {
            if rest.starts_with("{{") {
                out.push('{');
                rest = &rest[2..];
            } else if rest.starts_with("}}") {
                out.push('}');
                rest = &rest[2..];
            } else if rest.starts_with(PAGE_MARKER) {
                out.push_str(&page);
                rest = &rest[PAGE_MARKER.len()..];
            } else if rest.starts_with(COOKIE_MARKER) {
                out.push_str(&escaped);
                rest = &rest[COOKIE_MARKER.len()..];
            } else {
                out.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
        out
    }
}

fn malformed(err: MarkupError) -> ContextError {
    ContextError::configuration(format!("invalid fetch markup: {}", err))
}

/// Fetch markup for an all-equal attribute lookup.
///
/// Values are markup-escaped and brace-doubled so the result is itself a valid template.
/// `None` columns selects all attributes.
pub fn by_attribute_markup(type_name: &str, columns: Option<&[&str]>, values: &[(&str, Value)]) -> String {
    let mut out = String::from("<fetch>");
    out.push_str(&format!("<entity name=\"{}\">", markup::escape(type_name)));
    match columns {
        None => out.push_str("<all-attributes />"),
        Some(columns) => {
            for column in columns {
                out.push_str(&format!("<attribute name=\"{}\" />", markup::escape(column)));
            }
        }
    }
    out.push_str(&equality_filter(values));
    out.push_str("</entity></fetch>");
    out
}

fn equality_filter(values: &[(&str, Value)]) -> String {
    if values.is_empty() {
        return String::new();
    }
    let mut out = String::from("<filter type=\"and\">");
    for (attribute, value) in values {
        if value.is_null() {
            out.push_str(&format!(
                "<condition attribute=\"{}\" operator=\"null\" />",
                markup::escape(attribute)
            ));
        } else {
            out.push_str(&format!(
                "<condition attribute=\"{}\" operator=\"eq\" value=\"{}\" />",
                markup::escape(attribute),
                double_braces(&markup::escape(&value.to_query_text()))
            ));
        }
    }
    out.push_str("</filter>");
    out
}

/// Add an all-equal filter to the first `<entity>` of a template, just before `</entity>`.
pub fn merge_equality_filter(template: &str, values: &[(&str, Value)]) -> Result<String, ContextError> {
    if values.is_empty() {
        return Ok(template.to_string());
    }
    let root = markup::parse(template).map_err(malformed)?;
    let entity = root
        .child("entity")
        .ok_or_else(|| ContextError::configuration("fetch template has no <entity> element"))?;
    let filter = equality_filter(values);
    let mut text = template.to_string();
    match entity.end_tag_open {
        Some(offset) => text.insert_str(offset, &filter),
        None => {
            // Self-closing <entity ... />: open it up so the filter has somewhere to go.
            let close = entity.start_tag_close;
            text.replace_range(close..close + 2, &format!(">{}</entity>", filter));
        }
    }
    Ok(text)
}

/// Parse rendered fetch markup into a query expression plus its paging attributes.
///
/// Local stores use this to execute fetch queries. Markers that were never rendered are
/// rejected rather than guessed at.
pub fn parse_fetch(text: &str) -> Result<(QueryExpression, PagingInfo), MarkupError> {
    let root = markup::parse(text)?;
    let invalid = |message: String| MarkupError {
        position: 0,
        message,
    };
    if root.name != "fetch" {
        return Err(invalid(format!("expected <fetch>, found <{}>", root.name)));
    }
    let page_number = match root.attribute("page") {
        None => 1,
        Some(p) => p
            .parse::<u32>()
            .map_err(|_| invalid(format!("page attribute '{}' is not a number", p)))?,
    };
    let count = match root.attribute("count") {
        None => super::DEFAULT_PAGE_SIZE,
        Some(c) => c
            .parse::<u32>()
            .map_err(|_| invalid(format!("count attribute '{}' is not a number", c)))?,
    };
    let paging_cookie = root
        .attribute("paging-cookie")
        .filter(|c| !c.is_empty())
        .map(str::to_string);

    let entity = root
        .child("entity")
        .ok_or_else(|| invalid("missing <entity> element".to_string()))?;
    let entity_name = entity
        .attribute("name")
        .ok_or_else(|| invalid("<entity> has no name".to_string()))?;

    // A root entity that names no columns returns all of them.
    let columns = match columns_of(entity) {
        ColumnSet::Columns(names) if names.is_empty() => ColumnSet::All,
        columns => columns,
    };
    let mut query = QueryExpression::new(entity_name).with_columns(columns);
    for child in entity.elements() {
        match child.name.as_str() {
            "filter" => query.criteria.filters.push(filter_of(child)?),
            "order" => query.orders.push(order_of(child)?),
            "link-entity" => query.links.push(link_of(child)?),
            _ => {}
        }
    }
    let paging = PagingInfo {
        page_number: page_number.max(1),
        count,
        paging_cookie,
    };
    query.paging = Some(paging.clone());
    Ok((query, paging))
}

fn columns_of(element: &Element) -> ColumnSet {
    if element.child("all-attributes").is_some() {
        return ColumnSet::All;
    }
    ColumnSet::Columns(
        element
            .elements()
            .filter(|e| e.name == "attribute")
            .filter_map(|e| e.attribute("name").map(str::to_string))
            .collect(),
    )
}

fn filter_of(element: &Element) -> Result<FilterExpression, MarkupError> {
    let operator = match element.attribute("type") {
        Some("or") => LogicalOperator::Or,
        _ => LogicalOperator::And,
    };
    let mut filter = FilterExpression::new(operator);
    for child in element.elements() {
        match child.name.as_str() {
            "condition" => filter.conditions.push(condition_of(child)?),
            "filter" => filter.filters.push(filter_of(child)?),
            _ => {}
        }
    }
    Ok(filter)
}

fn condition_of(element: &Element) -> Result<Condition, MarkupError> {
    let invalid = |message: String| MarkupError {
        position: element.start_tag_close,
        message,
    };
    let attribute = element
        .attribute("attribute")
        .ok_or_else(|| invalid("<condition> has no attribute".to_string()))?;
    let operator_name = element.attribute("operator").unwrap_or("eq");
    let operator = ConditionOperator::from_fetch_str(operator_name)
        .ok_or_else(|| invalid(format!("unsupported operator '{}'", operator_name)))?;
    let mut values: Vec<Value> = element
        .attribute("value")
        .map(|v| vec![Value::Text(v.to_string())])
        .unwrap_or_default();
    values.extend(
        element
            .elements()
            .filter(|e| e.name == "value")
            .map(|e| Value::Text(e.text())),
    );
    Ok(Condition::new(attribute, operator, values))
}

fn order_of(element: &Element) -> Result<OrderExpression, MarkupError> {
    let attribute = element.attribute("attribute").ok_or_else(|| MarkupError {
        position: element.start_tag_close,
        message: "<order> has no attribute".to_string(),
    })?;
    Ok(OrderExpression {
        attribute: attribute.to_string(),
        descending: element.attribute("descending") == Some("true"),
    })
}

fn link_of(element: &Element) -> Result<LinkEntity, MarkupError> {
    let required = |name: &str| {
        element
            .attribute(name)
            .map(str::to_string)
            .ok_or_else(|| MarkupError {
                position: element.start_tag_close,
                message: format!("<link-entity> has no {}", name),
            })
    };
    // `from` names the linked entity's attribute, `to` the parent's.
    let mut link = LinkEntity {
        link_to_entity: required("name")?,
        link_to_attribute: required("from")?,
        link_from_attribute: required("to")?,
        alias: element.attribute("alias").map(str::to_string),
        columns: columns_of(element),
        criteria: FilterExpression::default(),
        join: match element.attribute("link-type") {
            Some("outer") => JoinOperator::LeftOuter,
            _ => JoinOperator::Inner,
        },
    };
    for child in element.elements().filter(|e| e.name == "filter") {
        link.criteria.filters.push(filter_of(child)?);
    }
    Ok(link)
}
