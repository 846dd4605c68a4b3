use uuid::Uuid;

/// Per-request identity handed to the façade by the controller layer.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub requestor: String,
    pub request_id: String,
}

impl RequestContext {
    pub fn new(requestor: impl Into<String>) -> Self {
        Self { requestor: requestor.into(), request_id: Uuid::new_v4().to_string() }
    }
}
