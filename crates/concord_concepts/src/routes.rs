//! Route table mapping concrete request paths to path templates.
//!
//! Rules match on the template (`/quizzes/:quiz`) and on the parameters
//! captured from the concrete path (`quiz = "q1"`), so a request for
//! `/quizzes/q1` becomes `API.request { path: "/quizzes/:quiz", quiz: "q1" }`.

use std::fmt;

use concord_foundation::Fields;

/// Every route the API/quiz synchronizations understand.
pub const ROUTES: &[(&str, &str)] = &[
    ("GET", "/quizzes"),
    ("POST", "/quizzes"),
    ("DELETE", "/quizzes/:quiz"),
    ("GET", "/quizzes/:quiz"),
    ("POST", "/quizzes/:quiz/questions"),
    ("PATCH", "/questions/:question"),
    ("DELETE", "/questions/:question"),
    ("POST", "/questions/:question/options"),
    ("PATCH", "/options/:option"),
    ("DELETE", "/options/:option"),
    ("POST", "/questions/:question/activate"),
    ("POST", "/activations/:activation/deactivate"),
    ("POST", "/activations/:activation/show"),
    ("POST", "/activations/:activation/hide"),
    ("POST", "/activations/:activation/choose"),
    ("GET", "/activations/:activation"),
    ("GET", "/display/:quiz"),
];

/// A resolved request path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    /// The template that matched, or the raw path when none did.
    pub template: String,
    /// Parameters captured from `:name` segments.
    pub params: Fields,
}

impl Route {
    /// Resolves `path` for `method` against [`ROUTES`].
    ///
    /// An unknown route passes through with the raw path as its template and
    /// no parameters; no rule will match it.
    #[must_use]
    pub fn resolve(method: &str, path: &str) -> Self {
        ROUTES
            .iter()
            .filter(|(m, _)| m.eq_ignore_ascii_case(method))
            .find_map(|(_, template)| {
                capture(template, path).map(|params| Self {
                    template: (*template).to_string(),
                    params,
                })
            })
            .unwrap_or_else(|| Self {
                template: path.to_string(),
                params: Fields::new(),
            })
    }

    /// Returns true if the path matched a known template.
    #[must_use]
    pub fn is_known(&self) -> bool {
        ROUTES.iter().any(|(_, t)| *t == self.template)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.params.is_empty() {
            write!(f, "{}", self.template)
        } else {
            write!(f, "{} {}", self.template, self.params)
        }
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn capture(template: &str, path: &str) -> Option<Fields> {
    let mut params = Fields::new();
    let mut concrete = segments(path);
    for expected in segments(template) {
        let actual = concrete.next()?;
        match expected.strip_prefix(':') {
            Some(name) => params = params.with(name, actual),
            None if expected == actual => {}
            None => return None,
        }
    }
    concrete.next().is_none().then_some(params)
}
