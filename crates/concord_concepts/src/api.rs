//! The API concept: inbound requests and their responses.
//!
//! `request` accepts any fields and hands back a fresh request id; rules
//! match on the fields. `response` attaches an output to a request id.

use std::collections::BTreeMap;

use concord_engine::{ActionRef, Concept, QueryRef};
use concord_foundation::{Error, Fields, Result, Value, fields};
use tracing::trace;

use crate::ids::IdGen;

/// Concept name.
pub const NAME: &str = "API";

/// `API.request { method, path, ...params } -> { request }`
pub const REQUEST: ActionRef = ActionRef::new(NAME, "request");
/// `API.response { request, output } -> { request }`
pub const RESPONSE: ActionRef = ActionRef::new(NAME, "response");
/// `API._getResponse { request } -> [{ output }]`
pub const GET_RESPONSE: QueryRef = QueryRef::new(NAME, "_getResponse");

/// Request/response bookkeeping.
#[derive(Debug)]
pub struct Api {
    ids: IdGen,
    requests: BTreeMap<u64, Fields>,
    responses: BTreeMap<u64, Value>,
}

impl Default for Api {
    fn default() -> Self {
        Self::new()
    }
}

impl Api {
    /// Creates an empty API concept.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ids: IdGen::new("r"),
            requests: BTreeMap::new(),
            responses: BTreeMap::new(),
        }
    }

    fn key(&self, request: &str) -> Result<u64> {
        self.ids
            .parse(request)
            .filter(|key| self.requests.contains_key(key))
            .ok_or_else(|| Error::not_found("request", request))
    }

    fn request(&mut self, input: &Fields) -> Fields {
        let (key, id) = self.ids.next_id();
        self.requests.insert(key, input.clone());
        fields! { "request" => id }
    }

    fn response(&mut self, input: &Fields) -> Result<Fields> {
        let request = input.get_str("request")?;
        let output = input.require("output")?.clone();
        let key = self.key(request)?;
        if self.responses.contains_key(&key) {
            return Err(Error::invalid_argument(format!(
                "request {request} already has a response"
            )));
        }
        trace!(request, "response recorded");
        self.responses.insert(key, output);
        Ok(fields! { "request" => request })
    }

    fn get_response(&self, args: &Fields) -> Result<Vec<Fields>> {
        let request = args.get_str("request")?;
        Ok(self
            .ids
            .parse(request)
            .and_then(|key| self.responses.get(&key))
            .map(|output| vec![fields! { "output" => output.clone() }])
            .unwrap_or_default())
    }
}

impl Concept for Api {
    fn name(&self) -> &'static str {
        NAME
    }

    fn perform(&mut self, action: &str, input: &Fields) -> Result<Fields> {
        match action {
            "request" => Ok(self.request(input)),
            "response" => self.response(input),
            _ => Err(Error::unknown_action(NAME, action)),
        }
    }

    fn query(&self, query: &str, args: &Fields) -> Result<Vec<Fields>> {
        match query {
            "_getResponse" => self.get_response(args),
            _ => Err(Error::unknown_query(NAME, query)),
        }
    }
}
