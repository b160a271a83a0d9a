use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

fn context_session_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"/sessions/(.*?)/contexts/").expect("Valid regex pattern"))
}

impl SessionId {
    /// Parses the session segment out of a fully qualified output-context name such as
    /// `projects/p/agent/sessions/<id>/contexts/ongoing-order`. Yields an empty id when the
    /// name has no session segment.
    pub fn from_context_name(name: &str) -> Self {
        let id = context_session_pattern()
            .captures(name)
            .and_then(|captures| captures.get(1))
            .map(|segment| segment.as_str().to_string())
            .unwrap_or_default();
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::SessionId;

    #[test]
    fn extracts_session_segment_from_context_name() {
        let name = "projects/mira-chatbot/agent/sessions/a1b2-c3d4/contexts/ongoing-order";
        assert_eq!(SessionId::from_context_name(name), SessionId("a1b2-c3d4".to_string()));
    }

    #[test]
    fn environment_scoped_names_still_resolve() {
        let name =
            "projects/p/agent/environments/draft/users/-/sessions/xyz/contexts/ongoing-tracking";
        assert_eq!(SessionId::from_context_name(name).as_str(), "xyz");
    }

    #[test]
    fn names_without_session_segment_yield_empty_id() {
        assert_eq!(SessionId::from_context_name("projects/p/agent/contexts/x").as_str(), "");
        assert_eq!(SessionId::from_context_name("").as_str(), "");
    }
}
