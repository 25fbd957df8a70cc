//! Sequential, prefixed entity ids (`q1`, `q2`, ...).

/// Hands out ids of the form `{prefix}{n}`, starting at 1.
#[derive(Clone, Debug)]
pub struct IdGen {
    prefix: &'static str,
    last: u64,
}

impl IdGen {
    /// Creates a generator for `prefix`.
    #[must_use]
    pub const fn new(prefix: &'static str) -> Self {
        Self { prefix, last: 0 }
    }

    /// Returns the next key and its id string.
    pub fn next_id(&mut self) -> (u64, String) {
        self.last += 1;
        (self.last, format!("{}{}", self.prefix, self.last))
    }

    /// Parses an id produced by this generator back to its key.
    ///
    /// Only the canonical spelling resolves: `q01` and `q+1` are not `q1`.
    #[must_use]
    pub fn parse(&self, id: &str) -> Option<u64> {
        let key = id.strip_prefix(self.prefix)?.parse().ok()?;
        (self.format(key) == id).then_some(key)
    }

    /// Formats a key as an id string.
    #[must_use]
    pub fn format(&self, key: u64) -> String {
        format!("{}{}", self.prefix, key)
    }
}
