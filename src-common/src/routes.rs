//! Client views and the setup redirect guard.

use serde::{Deserialize, Serialize};

use crate::status::ServerStatus;

/// A client view, addressed by path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "view", content = "id", rename_all = "snake_case")]
pub enum Route {
    Home,
    Upload,
    Recordings,
    Recording(String),
    Editor(String),
    Settings,
    Setup,
    Analytics,
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Upload => "/upload".to_string(),
            Route::Recordings => "/recordings".to_string(),
            Route::Recording(id) => format!("/recordings/{}", id),
            Route::Editor(id) => format!("/editor/{}", id),
            Route::Settings => "/settings".to_string(),
            Route::Setup => "/setup".to_string(),
            Route::Analytics => "/analytics".to_string(),
        }
    }

    /// Parse a path back into a route. Unknown paths map to `None`.
    pub fn parse(path: &str) -> Option<Self> {
        let trimmed = path.trim_end_matches('/');
        let segments: Vec<&str> = trimmed.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [] => Some(Route::Home),
            ["upload"] => Some(Route::Upload),
            ["recordings"] => Some(Route::Recordings),
            ["recordings", id] => Some(Route::Recording(id.to_string())),
            ["editor", id] => Some(Route::Editor(id.to_string())),
            ["settings"] => Some(Route::Settings),
            ["setup"] => Some(Route::Setup),
            ["analytics"] => Some(Route::Analytics),
            _ => None,
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path())
    }
}

/// Outcome of the setup guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Stay,
    Redirect(Route),
}

/// Decide whether a view must redirect based on backend setup state.
///
/// An unconfigured backend forces every view except setup to the setup view.
/// The setup view sends the user home once the backend is configured, unless
/// reconfiguration was explicitly requested. Unknown or offline state never
/// redirects.
pub fn guard_route(status: ServerStatus, current: &Route, reconfigure: bool) -> GuardDecision {
    let configured = match status {
        ServerStatus::Up { configured } => configured,
        _ => return GuardDecision::Stay,
    };

    match (current, configured) {
        (Route::Setup, Some(true)) if !reconfigure => GuardDecision::Redirect(Route::Home),
        (Route::Setup, _) => GuardDecision::Stay,
        (_, Some(false)) => GuardDecision::Redirect(Route::Setup),
        _ => GuardDecision::Stay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNCONFIGURED: ServerStatus = ServerStatus::Up {
        configured: Some(false),
    };
    const CONFIGURED: ServerStatus = ServerStatus::Up {
        configured: Some(true),
    };

    #[test]
    fn test_paths() {
        assert_eq!(Route::Editor("abc".into()).path(), "/editor/abc");
        assert_eq!(Route::Recording("abc".into()).to_string(), "/recordings/abc");
        assert_eq!(Route::parse("/recordings/abc/"), Some(Route::Recording("abc".into())));
        assert_eq!(Route::parse("/"), Some(Route::Home));
        assert_eq!(Route::parse("/nope/x/y"), None);
    }

    #[test]
    fn test_unconfigured_redirects_to_setup() {
        for route in [Route::Home, Route::Upload, Route::Editor("a".into())] {
            assert_eq!(
                guard_route(UNCONFIGURED, &route, false),
                GuardDecision::Redirect(Route::Setup)
            );
        }
        assert_eq!(guard_route(UNCONFIGURED, &Route::Setup, false), GuardDecision::Stay);
    }

    #[test]
    fn test_configured_setup_redirects_home_unless_reconfiguring() {
        assert_eq!(
            guard_route(CONFIGURED, &Route::Setup, false),
            GuardDecision::Redirect(Route::Home)
        );
        assert_eq!(guard_route(CONFIGURED, &Route::Setup, true), GuardDecision::Stay);
        assert_eq!(guard_route(CONFIGURED, &Route::Home, false), GuardDecision::Stay);
    }

    #[test]
    fn test_unknown_state_never_redirects() {
        let unknown_setup = ServerStatus::Up { configured: None };
        assert_eq!(guard_route(unknown_setup, &Route::Home, false), GuardDecision::Stay);
        assert_eq!(guard_route(ServerStatus::Down, &Route::Home, false), GuardDecision::Stay);
        assert_eq!(guard_route(ServerStatus::Unknown, &Route::Setup, false), GuardDecision::Stay);
    }
}
