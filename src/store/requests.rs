//! Typed named requests and the built-in ones every local store answers.

use super::{StoreRequest, StoreResponse};
use crate::error::{ContextError, StoreError};
use crate::event::ParameterBag;
use uuid::Uuid;

/// A request with a typed response, executed through [`crate::context::ExecutionContext::execute`].
pub trait StoreMessage {
    const NAME: &'static str;
    type Response;

    fn to_request(&self) -> StoreRequest;

    fn from_response(response: StoreResponse) -> Result<Self::Response, ContextError>;
}

/// Identity of the calling user.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhoAmI;

impl StoreMessage for WhoAmI {
    const NAME: &'static str = "WhoAmI";
    type Response = Uuid;

    fn to_request(&self) -> StoreRequest {
        StoreRequest::new(Self::NAME)
    }

    fn from_response(response: StoreResponse) -> Result<Uuid, ContextError> {
        required(&response, "UserId")
    }
}

/// Number of stored records of one type.
#[derive(Debug, Clone)]
pub struct RetrieveRecordCount {
    pub type_name: String,
}

impl RetrieveRecordCount {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
        }
    }
}

impl StoreMessage for RetrieveRecordCount {
    const NAME: &'static str = "RetrieveRecordCount";
    type Response = i64;

    fn to_request(&self) -> StoreRequest {
        let mut request = StoreRequest::new(Self::NAME);
        request.parameters.insert("EntityName", self.type_name.as_str());
        request
    }

    fn from_response(response: StoreResponse) -> Result<i64, ContextError> {
        required(&response, "Count")
    }
}

fn required<T: crate::record::FromValue>(response: &StoreResponse, name: &str) -> Result<T, ContextError> {
    response.results.value(name)?.ok_or_else(|| {
        ContextError::not_found(format!(
            "result '{}' in {} response",
            name, response.name
        ))
    })
}

pub(crate) fn who_am_i_response(caller_id: Uuid) -> StoreResponse {
    StoreResponse {
        name: WhoAmI::NAME.to_string(),
        results: ParameterBag::new().with("UserId", caller_id),
    }
}

/// Requests a local store answers without caller context. `count` reports stored records of a type.
pub(crate) fn execute_builtin<F>(request: &StoreRequest, count: F) -> Result<StoreResponse, StoreError>
where
    F: Fn(&str) -> Result<usize, StoreError>,
{
    match request.name.as_str() {
        RetrieveRecordCount::NAME => {
            let type_name: String = request
                .parameters
                .value("EntityName")
                .map_err(|e| StoreError::Rejected(e.to_string()))?
                .ok_or_else(|| StoreError::Rejected("EntityName parameter is required".to_string()))?;
            let total = count(&type_name)?;
            Ok(StoreResponse {
                name: request.name.clone(),
                results: ParameterBag::new().with("Count", total as i64),
            })
        }
        WhoAmI::NAME => Err(StoreError::UnsupportedRequest(
            "WhoAmI needs a caller-scoped store handle".to_string(),
        )),
        other => Err(StoreError::UnsupportedRequest(other.to_string())),
    }
}
