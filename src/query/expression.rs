//! Structured query shapes: condition expressions and attribute-equality queries.

use super::PagingInfo;
use crate::types::Value;
use serde::{Deserialize, Serialize};

/// Which attributes a query or retrieve returns.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColumnSet {
    #[default]
    All,
    Columns(Vec<String>),
}

impl ColumnSet {
    /// Explicit column list; an empty slice means "all attributes".
    pub fn of(columns: &[&str]) -> Self {
        if columns.is_empty() {
            ColumnSet::All
        } else {
            ColumnSet::Columns(columns.iter().map(|c| c.to_string()).collect())
        }
    }

    /// No attributes at all, only identities.
    pub fn none() -> Self {
        ColumnSet::Columns(Vec::new())
    }

    pub fn includes(&self, name: &str) -> bool {
        match self {
            ColumnSet::All => true,
            ColumnSet::Columns(columns) => columns.iter().any(|c| c == name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionOperator {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterEqual,
    LessThan,
    LessEqual,
    Null,
    NotNull,
    In,
    Like,
}

impl ConditionOperator {
    /// Operator name used in fetch markup.
    pub fn as_fetch_str(self) -> &'static str {
        match self {
            ConditionOperator::Equal => "eq",
            ConditionOperator::NotEqual => "ne",
            ConditionOperator::GreaterThan => "gt",
            ConditionOperator::GreaterEqual => "ge",
            ConditionOperator::LessThan => "lt",
            ConditionOperator::LessEqual => "le",
            ConditionOperator::Null => "null",
            ConditionOperator::NotNull => "not-null",
            ConditionOperator::In => "in",
            ConditionOperator::Like => "like",
        }
    }

    pub fn from_fetch_str(s: &str) -> Option<Self> {
        let op = match s {
            "eq" => ConditionOperator::Equal,
            "ne" | "neq" => ConditionOperator::NotEqual,
            "gt" => ConditionOperator::GreaterThan,
            "ge" => ConditionOperator::GreaterEqual,
            "lt" => ConditionOperator::LessThan,
            "le" => ConditionOperator::LessEqual,
            "null" => ConditionOperator::Null,
            "not-null" => ConditionOperator::NotNull,
            "in" => ConditionOperator::In,
            "like" => ConditionOperator::Like,
            _ => return None,
        };
        Some(op)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub attribute: String,
    pub operator: ConditionOperator,
    #[serde(default)]
    pub values: Vec<Value>,
}

impl Condition {
    pub fn new(attribute: impl Into<String>, operator: ConditionOperator, values: Vec<Value>) -> Self {
        Self {
            attribute: attribute.into(),
            operator,
            values,
        }
    }

    pub fn equal(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(attribute, ConditionOperator::Equal, vec![value.into()])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogicalOperator {
    #[default]
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterExpression {
    #[serde(default)]
    pub operator: LogicalOperator,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub filters: Vec<FilterExpression>,
}

impl FilterExpression {
    pub fn new(operator: LogicalOperator) -> Self {
        Self {
            operator,
            ..Default::default()
        }
    }

    pub fn add_condition(&mut self, condition: Condition) -> &mut Self {
        self.conditions.push(condition);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.filters.iter().all(FilterExpression::is_empty)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderExpression {
    pub attribute: String,
    #[serde(default)]
    pub descending: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum JoinOperator {
    #[default]
    Inner,
    LeftOuter,
}

/// A join from the primary entity to a related entity.
///
/// Columns of the linked record come back as `alias.column` attributes holding aliased values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkEntity {
    pub link_to_entity: String,
    /// Attribute on the primary record.
    pub link_from_attribute: String,
    /// Attribute on the linked record.
    pub link_to_attribute: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default = "ColumnSet::none")]
    pub columns: ColumnSet,
    #[serde(default)]
    pub criteria: FilterExpression,
    #[serde(default)]
    pub join: JoinOperator,
}

impl LinkEntity {
    pub fn alias_or_entity(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.link_to_entity)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryExpression {
    pub entity_name: String,
    #[serde(default)]
    pub columns: ColumnSet,
    #[serde(default)]
    pub criteria: FilterExpression,
    #[serde(default)]
    pub links: Vec<LinkEntity>,
    #[serde(default)]
    pub orders: Vec<OrderExpression>,
    #[serde(default)]
    pub paging: Option<PagingInfo>,
}

impl QueryExpression {
    pub fn new(entity_name: impl Into<String>) -> Self {
        Self {
            entity_name: entity_name.into(),
            columns: ColumnSet::All,
            criteria: FilterExpression::default(),
            links: Vec::new(),
            orders: Vec::new(),
            paging: None,
        }
    }

    pub fn with_columns(mut self, columns: ColumnSet) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.criteria.conditions.push(condition);
        self
    }

    pub fn with_order(mut self, attribute: impl Into<String>, descending: bool) -> Self {
        self.orders.push(OrderExpression {
            attribute: attribute.into(),
            descending,
        });
        self
    }

    /// Add an inner join and return it for further configuration.
    pub fn add_link(
        &mut self,
        link_to_entity: impl Into<String>,
        link_from_attribute: impl Into<String>,
        link_to_attribute: impl Into<String>,
    ) -> &mut LinkEntity {
        self.links.push(LinkEntity {
            link_to_entity: link_to_entity.into(),
            link_from_attribute: link_from_attribute.into(),
            link_to_attribute: link_to_attribute.into(),
            alias: None,
            columns: ColumnSet::none(),
            criteria: FilterExpression::default(),
            join: JoinOperator::Inner,
        });
        let last = self.links.len() - 1;
        &mut self.links[last]
    }
}

/// Flat attribute-equality query: every listed attribute must equal its value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryByAttribute {
    pub entity_name: String,
    #[serde(default)]
    pub columns: ColumnSet,
    #[serde(default)]
    pub values: Vec<(String, Value)>,
    #[serde(default)]
    pub orders: Vec<OrderExpression>,
    #[serde(default)]
    pub paging: Option<PagingInfo>,
}

impl QueryByAttribute {
    pub fn new(entity_name: impl Into<String>) -> Self {
        Self {
            entity_name: entity_name.into(),
            columns: ColumnSet::All,
            values: Vec::new(),
            orders: Vec::new(),
            paging: None,
        }
    }

    pub fn with_columns(mut self, columns: ColumnSet) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_value(mut self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.push((attribute.into(), value.into()));
        self
    }

    /// Equivalent condition expression.
    pub fn to_expression(&self) -> QueryExpression {
        let mut query = QueryExpression::new(self.entity_name.clone()).with_columns(self.columns.clone());
        for (attribute, value) in &self.values {
            query.criteria.add_condition(Condition::equal(attribute.clone(), value.clone()));
        }
        query.orders = self.orders.clone();
        query.paging = self.paging.clone();
        query
    }
}
