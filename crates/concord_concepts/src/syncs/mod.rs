//! Synchronizations wiring the API concept to Quiz and Activation.
//!
//! Each rule is a factory taking fresh variables, so it can be passed straight
//! to [`SyncEngine::register_rule`](concord_engine::SyncEngine::register_rule).

pub mod api_quiz;

use concord_engine::{ActionPattern, ActionTemplate, Expr, Frames, GuardContext, SyncEngine, SyncRule};
use concord_foundation::{Result, Value, Var, Vars, fields};

use crate::api;

pub use api_quiz::ALL;

/// Signature shared by every rule factory in this module.
pub type RuleFactory = fn(&mut Vars) -> SyncRule;

/// Registers every API/quiz synchronization with `engine`.
///
/// # Errors
/// Returns an error if a rule fails validation.
pub fn register_all(engine: &SyncEngine) -> Result<()> {
    for factory in ALL {
        engine.register_rule(*factory)?;
    }
    Ok(())
}

/// `API.request { method, path }`, extended by callers with the route's fields.
pub(crate) fn request(method: &str, path: &str) -> ActionPattern {
    ActionPattern::new(api::REQUEST)
        .input("method", method)
        .input("path", path)
}

/// `API.response { request, output }`.
pub(crate) fn respond(request: &Var, output: impl Into<Expr>) -> ActionTemplate {
    ActionTemplate::new(api::RESPONSE)
        .input("request", request)
        .input("output", output)
}

/// The `{ ok: true }` acknowledgement.
pub(crate) fn ok() -> Expr {
    Expr::record([("ok", true)])
}

/// Guard binding `payload` to `{ field: source }`.
pub(crate) fn wrap(
    payload: &Var,
    field: &'static str,
    source: &Var,
) -> impl Fn(Frames, &GuardContext<'_>) -> Result<Frames> + Send + Sync + 'static {
    let payload = payload.clone();
    let source = source.clone();
    move |frames: Frames, _: &GuardContext<'_>| {
        frames.derive(&payload, |frame| {
            Ok(Value::Record(fields! { field => frame.require(&source)?.clone() }))
        })
    }
}
