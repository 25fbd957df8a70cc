//! HTTP-shaped requests on `API` turned into `Quiz` and `Activation` actions.
//!
//! Requests that create something are split in two rules: one performs the
//! action, the other joins the request with the action's record to respond.
//! Flow scoping keeps that join on the request that caused the action.

use concord_engine::{ActionPattern, ActionRef, ActionTemplate, Frames, GuardContext, SyncRule, Term};
use concord_foundation::{Result, Vars};

use super::{RuleFactory, ok, request, respond, wrap};
use crate::payload::{activation_payload, display_payload};
use crate::{activation, quiz};

/// Every rule in this module, in registration order.
pub const ALL: &[RuleFactory] = &[
    list_quizzes,
    create_quiz,
    create_quiz_response,
    delete_quiz,
    get_quiz,
    add_question,
    add_question_response,
    rename_question,
    delete_question,
    add_option,
    add_option_response,
    rename_option,
    delete_option,
    activate,
    activate_response,
    deactivate,
    show,
    hide,
    choose,
    get_activation,
    get_display,
];

// =============================================================================
// Quizzes
// =============================================================================

/// `GET /quizzes` lists the owner's quizzes.
pub fn list_quizzes(v: &mut Vars) -> SyncRule {
    let [owner, req, payload] = v.vars(["owner", "request", "payload"]);
    let (o, p) = (owner.clone(), payload.clone());
    SyncRule::new("ListQuizzes")
        .when(
            request("GET", "/quizzes")
                .input("owner", &owner)
                .output("request", &req),
        )
        .guard(move |frames: Frames, ctx: &GuardContext<'_>| {
            frames.query(
                ctx,
                quiz::LIST_FOR_OWNER_PAYLOAD,
                &[("owner", Term::from(&o))],
                &[("payload", &p)],
            )
        })
        .then(respond(&req, &payload))
}

/// `POST /quizzes` creates a quiz.
pub fn create_quiz(v: &mut Vars) -> SyncRule {
    let [owner, title, req] = v.vars(["owner", "title", "request"]);
    SyncRule::new("CreateQuiz")
        .when(
            request("POST", "/quizzes")
                .input("owner", &owner)
                .input("title", &title)
                .output("request", &req),
        )
        .then(
            ActionTemplate::new(quiz::CREATE_QUIZ)
                .input("owner", &owner)
                .input("title", &title),
        )
}

/// Responds to `POST /quizzes` with the new quiz id.
pub fn create_quiz_response(v: &mut Vars) -> SyncRule {
    let [owner, title, id, req, payload] = v.vars(["owner", "title", "quiz", "request", "payload"]);
    SyncRule::new("CreateQuizResponse")
        .when(
            request("POST", "/quizzes")
                .input("owner", &owner)
                .input("title", &title)
                .output("request", &req),
        )
        .when(
            ActionPattern::new(quiz::CREATE_QUIZ)
                .input("owner", &owner)
                .input("title", &title)
                .output("quiz", &id),
        )
        .guard(wrap(&payload, "quiz", &id))
        .then(respond(&req, &payload))
}

/// `DELETE /quizzes/:quiz`
pub fn delete_quiz(v: &mut Vars) -> SyncRule {
    let [id, req] = v.vars(["quiz", "request"]);
    SyncRule::new("DeleteQuiz")
        .when(
            request("DELETE", "/quizzes/:quiz")
                .input("quiz", &id)
                .output("request", &req),
        )
        .then(ActionTemplate::new(quiz::DELETE_QUIZ).input("quiz", &id))
        .then(respond(&req, ok()))
}

/// `GET /quizzes/:quiz` returns the quiz with its questions and options.
///
/// No response is produced for an unknown quiz.
pub fn get_quiz(v: &mut Vars) -> SyncRule {
    let [id, req, payload] = v.vars(["quiz", "request", "payload"]);
    let (q, p) = (id.clone(), payload.clone());
    SyncRule::new("GetQuiz")
        .when(
            request("GET", "/quizzes/:quiz")
                .input("quiz", &id)
                .output("request", &req),
        )
        .guard(move |frames: Frames, ctx: &GuardContext<'_>| {
            frames.query(
                ctx,
                quiz::COLLECT_QUIZ_FOR_API,
                &[("quiz", Term::from(&q))],
                &[("payload", &p)],
            )
        })
        .then(respond(&req, &payload))
}

// =============================================================================
// Questions
// =============================================================================

/// `POST /quizzes/:quiz/questions`
pub fn add_question(v: &mut Vars) -> SyncRule {
    let [id, text, req] = v.vars(["quiz", "text", "request"]);
    SyncRule::new("AddQuestion")
        .when(
            request("POST", "/quizzes/:quiz/questions")
                .input("quiz", &id)
                .input("text", &text)
                .output("request", &req),
        )
        .then(
            ActionTemplate::new(quiz::ADD_QUESTION)
                .input("quiz", &id)
                .input("text", &text),
        )
}

/// Responds to `POST /quizzes/:quiz/questions` with the new question id.
pub fn add_question_response(v: &mut Vars) -> SyncRule {
    let [id, text, question, req, payload] =
        v.vars(["quiz", "text", "question", "request", "payload"]);
    SyncRule::new("AddQuestionResponse")
        .when(
            request("POST", "/quizzes/:quiz/questions")
                .input("quiz", &id)
                .input("text", &text)
                .output("request", &req),
        )
        .when(
            ActionPattern::new(quiz::ADD_QUESTION)
                .input("quiz", &id)
                .input("text", &text)
                .output("question", &question),
        )
        .guard(wrap(&payload, "question", &question))
        .then(respond(&req, &payload))
}

/// `PATCH /questions/:question`
pub fn rename_question(v: &mut Vars) -> SyncRule {
    let [question, text, req] = v.vars(["question", "text", "request"]);
    SyncRule::new("RenameQuestion")
        .when(
            request("PATCH", "/questions/:question")
                .input("question", &question)
                .input("text", &text)
                .output("request", &req),
        )
        .then(
            ActionTemplate::new(quiz::RENAME_QUESTION)
                .input("question", &question)
                .input("text", &text),
        )
        .then(respond(&req, ok()))
}

/// `DELETE /questions/:question`
pub fn delete_question(v: &mut Vars) -> SyncRule {
    let [question, req] = v.vars(["question", "request"]);
    SyncRule::new("DeleteQuestion")
        .when(
            request("DELETE", "/questions/:question")
                .input("question", &question)
                .output("request", &req),
        )
        .then(ActionTemplate::new(quiz::DELETE_QUESTION).input("question", &question))
        .then(respond(&req, ok()))
}

// =============================================================================
// Options
// =============================================================================

/// `POST /questions/:question/options`
pub fn add_option(v: &mut Vars) -> SyncRule {
    let [question, label, req] = v.vars(["question", "label", "request"]);
    SyncRule::new("AddOption")
        .when(
            request("POST", "/questions/:question/options")
                .input("question", &question)
                .input("label", &label)
                .output("request", &req),
        )
        .then(
            ActionTemplate::new(quiz::ADD_OPTION)
                .input("question", &question)
                .input("label", &label),
        )
}

/// Responds to `POST /questions/:question/options` with the new option id.
pub fn add_option_response(v: &mut Vars) -> SyncRule {
    let [question, label, option, req, payload] =
        v.vars(["question", "label", "option", "request", "payload"]);
    SyncRule::new("AddOptionResponse")
        .when(
            request("POST", "/questions/:question/options")
                .input("question", &question)
                .input("label", &label)
                .output("request", &req),
        )
        .when(
            ActionPattern::new(quiz::ADD_OPTION)
                .input("question", &question)
                .input("label", &label)
                .output("option", &option),
        )
        .guard(wrap(&payload, "option", &option))
        .then(respond(&req, &payload))
}

/// `PATCH /options/:option`
pub fn rename_option(v: &mut Vars) -> SyncRule {
    let [option, label, req] = v.vars(["option", "label", "request"]);
    SyncRule::new("RenameOption")
        .when(
            request("PATCH", "/options/:option")
                .input("option", &option)
                .input("label", &label)
                .output("request", &req),
        )
        .then(
            ActionTemplate::new(quiz::RENAME_OPTION)
                .input("option", &option)
                .input("label", &label),
        )
        .then(respond(&req, ok()))
}

/// `DELETE /options/:option`
pub fn delete_option(v: &mut Vars) -> SyncRule {
    let [option, req] = v.vars(["option", "request"]);
    SyncRule::new("DeleteOption")
        .when(
            request("DELETE", "/options/:option")
                .input("option", &option)
                .output("request", &req),
        )
        .then(ActionTemplate::new(quiz::DELETE_OPTION).input("option", &option))
        .then(respond(&req, ok()))
}

// =============================================================================
// Activations
// =============================================================================

/// `POST /questions/:question/activate`
pub fn activate(v: &mut Vars) -> SyncRule {
    let [question, req] = v.vars(["question", "request"]);
    SyncRule::new("Activate")
        .when(
            request("POST", "/questions/:question/activate")
                .input("question", &question)
                .output("request", &req),
        )
        .then(ActionTemplate::new(activation::ACTIVATE).input("question", &question))
}

/// Responds to `POST /questions/:question/activate` with the activation id.
pub fn activate_response(v: &mut Vars) -> SyncRule {
    let [question, id, req, payload] = v.vars(["question", "activation", "request", "payload"]);
    SyncRule::new("ActivateResponse")
        .when(
            request("POST", "/questions/:question/activate")
                .input("question", &question)
                .output("request", &req),
        )
        .when(
            ActionPattern::new(activation::ACTIVATE)
                .input("question", &question)
                .output("activation", &id),
        )
        .guard(wrap(&payload, "activation", &id))
        .then(respond(&req, &payload))
}

fn activation_command(
    v: &mut Vars,
    name: &str,
    command: &str,
    action: ActionRef,
) -> SyncRule {
    let [id, req] = v.vars(["activation", "request"]);
    SyncRule::new(name)
        .when(
            request("POST", &format!("/activations/:activation/{command}"))
                .input("activation", &id)
                .output("request", &req),
        )
        .then(ActionTemplate::new(action).input("activation", &id))
        .then(respond(&req, ok()))
}

/// `POST /activations/:activation/deactivate`
pub fn deactivate(v: &mut Vars) -> SyncRule {
    activation_command(v, "Deactivate", "deactivate", activation::DEACTIVATE)
}

/// `POST /activations/:activation/show`
pub fn show(v: &mut Vars) -> SyncRule {
    activation_command(v, "Show", "show", activation::SHOW)
}

/// `POST /activations/:activation/hide`
pub fn hide(v: &mut Vars) -> SyncRule {
    activation_command(v, "Hide", "hide", activation::HIDE)
}

/// `POST /activations/:activation/choose` records a user's vote.
pub fn choose(v: &mut Vars) -> SyncRule {
    let [id, user, option, req] = v.vars(["activation", "user", "option", "request"]);
    SyncRule::new("Choose")
        .when(
            request("POST", "/activations/:activation/choose")
                .input("activation", &id)
                .input("user", &user)
                .input("option", &option)
                .output("request", &req),
        )
        .then(
            ActionTemplate::new(activation::CHOOSE)
                .input("activation", &id)
                .input("user", &user)
                .input("option", &option),
        )
        .then(respond(&req, ok()))
}

// =============================================================================
// Read models
// =============================================================================

/// `GET /activations/:activation` returns the question, its lettered options
/// and their tallies.
///
/// No response is produced for an unknown activation.
pub fn get_activation(v: &mut Vars) -> SyncRule {
    let [id, req, payload, question, show_results] =
        v.vars(["activation", "request", "payload", "question", "showResults"]);
    let p = payload.clone();
    let a = id.clone();
    SyncRule::new("GetActivation")
        .when(
            request("GET", "/activations/:activation")
                .input("activation", &id)
                .output("request", &req),
        )
        .guard(move |frames: Frames, ctx: &GuardContext<'_>| -> Result<Frames> {
            frames
                .query(
                    ctx,
                    activation::GET_ACTIVATION,
                    &[("activation", Term::from(&a))],
                    &[("question", &question), ("showResults", &show_results)],
                )?
                .try_map(|frame| {
                    let value = activation_payload(
                        ctx,
                        frame.require_str(&a)?,
                        frame.require_str(&question)?,
                        frame.require(&show_results)?.as_bool().unwrap_or(false),
                    )?;
                    Ok(frame.bind(&p, value))
                })
        })
        .then(respond(&req, &payload))
}

/// `GET /display/:quiz` returns every question with its active poll.
///
/// No response is produced for an unknown quiz.
pub fn get_display(v: &mut Vars) -> SyncRule {
    let [id, req, payload] = v.vars(["quiz", "request", "payload"]);
    let (q, p) = (id.clone(), payload.clone());
    SyncRule::new("GetDisplay")
        .when(
            request("GET", "/display/:quiz")
                .input("quiz", &id)
                .output("request", &req),
        )
        .guard(move |frames: Frames, ctx: &GuardContext<'_>| {
            frames.try_filter_map(|frame| {
                let Some(value) = display_payload(ctx, frame.require_str(&q)?)? else {
                    return Ok(None);
                };
                Ok(Some(frame.bind(&p, value)))
            })
        })
        .then(respond(&req, &payload))
}
