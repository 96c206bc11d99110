//! Saved views: stored fetch templates looked up by name, id, or lookup role.

use super::ExecutionContext;
use crate::error::ContextError;
use crate::query::fetch::merge_equality_filter;
use crate::query::QuerySpec;
use crate::record::Record;
use crate::types::Value;
use uuid::Uuid;

/// Record type holding view definitions.
pub const SAVED_VIEW: &str = "saved_view";
pub const FETCH_MARKUP: &str = "fetch_markup";
pub const LAYOUT_MARKUP: &str = "layout_markup";
/// `query_type` of the view used for lookups.
pub const LOOKUP_VIEW_TYPE: i64 = 64;

impl ExecutionContext {
    /// Active view definition for `entity` matching the extra `filter`, or the empty record.
    pub fn view_definition(&self, entity: &str, filter: &[(&str, Value)]) -> Result<Record, ContextError> {
        let mut values: Vec<(&str, Value)> = vec![("returned_type", Value::from(entity)), ("state", Value::Integer(0))];
        values.extend(filter.iter().cloned());
        self.retrieve_by_attribute(SAVED_VIEW, Some(&[FETCH_MARKUP, LAYOUT_MARKUP][..]), &values)
    }

    /// Records returned by the named view, narrowed by `record_filter`.
    pub fn retrieve_by_view(
        &self,
        entity: &str,
        view_name: &str,
        record_filter: &[(&str, Value)],
    ) -> Result<Vec<Record>, ContextError> {
        let definition = self.view_definition(entity, &[("name", Value::from(view_name))])?;
        self.run_view(&definition, record_filter)
    }

    pub fn retrieve_by_view_id(
        &self,
        entity: &str,
        view_id: Uuid,
        record_filter: &[(&str, Value)],
    ) -> Result<Vec<Record>, ContextError> {
        let definition = self.view_definition(entity, &[("saved_viewid", Value::Guid(view_id))])?;
        self.run_view(&definition, record_filter)
    }

    /// Records returned by the entity's lookup view.
    pub fn retrieve_by_lookup_view(
        &self,
        entity: &str,
        record_filter: &[(&str, Value)],
    ) -> Result<Vec<Record>, ContextError> {
        let definition = self.view_definition(entity, &[("query_type", Value::Integer(LOOKUP_VIEW_TYPE))])?;
        self.run_view(&definition, record_filter)
    }

    /// A missing definition or an empty template yields no records.
    fn run_view(&self, definition: &Record, record_filter: &[(&str, Value)]) -> Result<Vec<Record>, ContextError> {
        if !definition.is_valid() {
            self.trace("View definition not found");
            return Ok(Vec::new());
        }
        let markup: String = definition.get_or_default(FETCH_MARKUP, String::new())?;
        if markup.trim().is_empty() {
            return Ok(Vec::new());
        }
        let merged = merge_equality_filter(&markup, record_filter)?;
        self.retrieve_all(&QuerySpec::fetch(merged))
    }
}
