//! A ready-to-use engine with the API, Quiz, and Activation concepts wired up.

use concord_engine::{EngineConfig, SyncEngine};
use concord_foundation::{Fields, Result, Value, fields};
use tracing::debug;

use crate::activation::Activation;
use crate::api::{self, Api};
use crate::quiz::Quiz;
use crate::routes::Route;
use crate::syncs;

/// The quiz application: concepts, synchronizations, and a request shim.
#[derive(Debug)]
pub struct QuizApp {
    engine: SyncEngine,
}

impl QuizApp {
    /// Builds the engine, registers the three concepts and every sync.
    ///
    /// # Errors
    /// Returns an error if a rule fails validation or the engine lock is poisoned.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let engine = SyncEngine::new(config);
        engine.register_concept(Api::new())?;
        engine.register_concept(Quiz::new())?;
        engine.register_concept(Activation::new())?;
        syncs::register_all(&engine)?;
        Ok(Self { engine })
    }

    /// The underlying engine.
    #[must_use]
    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    /// Submits one request and returns the payload its cascade responded with.
    ///
    /// Path parameters override same-named body fields. `Ok(None)` means the
    /// cascade finished without a response: an unknown route, or a guard
    /// that found nothing to respond about.
    ///
    /// # Errors
    /// Returns the cascade's fatal error: a failed action or an exceeded limit.
    pub fn request(&self, method: &str, path: &str, body: Fields) -> Result<Option<Value>> {
        let route = Route::resolve(method, path);
        let mut input = body;
        for (field, value) in route.params.iter() {
            input = input.with(field.clone(), value.clone());
        }
        let input = input
            .with("method", method.to_ascii_uppercase())
            .with("path", route.template.as_str());

        let output = self.engine.submit(api::REQUEST, input)?;
        let request = output.get_str("request")?;
        let rows = self
            .engine
            .query(api::GET_RESPONSE, &fields! { "request" => request })?;
        let response = rows.first().and_then(|row| row.get("output")).cloned();
        debug!(request, %route, responded = response.is_some(), "request handled");
        Ok(response)
    }
}
