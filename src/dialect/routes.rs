//! Per-dialect command routing tables.
//!
//! Each dialect maps every [`CommandKind`] to an HTTP method plus a URL
//! template with `:param` placeholders. Both tables are total functions over
//! the command enum; the W3C table additionally marks the kinds that have no
//! native endpoint and are compiled to script execution or an action
//! sequence by the W3C codec.

use http::Method;

use super::command::CommandKind;

/// HTTP method + URL template for one command in one dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    /// HTTP method.
    pub method: Verb,
    /// URL template. `:sessionId` and entity ids appear as path segments.
    pub template: &'static str,
}

/// Request verb. Kept as its own `Copy` enum (http::Method is not `Copy`)
/// and the protocol only ever uses these three.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    /// GET
    Get,
    /// POST
    Post,
    /// DELETE
    Delete,
}

impl Verb {
    /// Convert to `http::Method`.
    pub fn to_http(self) -> Method {
        match self {
            Verb::Get => Method::GET,
            Verb::Post => Method::POST,
            Verb::Delete => Method::DELETE,
        }
    }

    /// Convert from `http::Method`; only the three verbs the protocol uses.
    pub fn from_http(method: &Method) -> Option<Self> {
        match *method {
            Method::GET => Some(Verb::Get),
            Method::POST => Some(Verb::Post),
            Method::DELETE => Some(Verb::Delete),
            _ => None,
        }
    }
}

const fn get(template: &'static str) -> Route {
    Route {
        method: Verb::Get,
        template,
    }
}

const fn post(template: &'static str) -> Route {
    Route {
        method: Verb::Post,
        template,
    }
}

const fn delete(template: &'static str) -> Route {
    Route {
        method: Verb::Delete,
        template,
    }
}

/// Legacy (JSON wire protocol) routing table. Total.
pub fn legacy_route(kind: CommandKind) -> Route {
    match kind {
        CommandKind::NewSession => post("/session"),
        CommandKind::DeleteSession => delete("/session/:sessionId"),
        CommandKind::Status => get("/status"),
        CommandKind::Get => post("/session/:sessionId/url"),
        CommandKind::GetCurrentUrl => get("/session/:sessionId/url"),
        CommandKind::GoBack => post("/session/:sessionId/back"),
        CommandKind::GoForward => post("/session/:sessionId/forward"),
        CommandKind::Refresh => post("/session/:sessionId/refresh"),
        CommandKind::GetTitle => get("/session/:sessionId/title"),
        CommandKind::GetPageSource => get("/session/:sessionId/source"),
        CommandKind::ExecuteScript => post("/session/:sessionId/execute"),
        CommandKind::ExecuteAsyncScript => post("/session/:sessionId/execute_async"),
        CommandKind::FindElement => post("/session/:sessionId/element"),
        CommandKind::FindElements => post("/session/:sessionId/elements"),
        CommandKind::FindChildElement => post("/session/:sessionId/element/:id/element"),
        CommandKind::FindChildElements => post("/session/:sessionId/element/:id/elements"),
        CommandKind::GetActiveElement => post("/session/:sessionId/element/active"),
        CommandKind::ClickElement => post("/session/:sessionId/element/:id/click"),
        CommandKind::ClearElement => post("/session/:sessionId/element/:id/clear"),
        CommandKind::SendKeysToElement => post("/session/:sessionId/element/:id/value"),
        CommandKind::SubmitElement => post("/session/:sessionId/element/:id/submit"),
        CommandKind::GetElementText => get("/session/:sessionId/element/:id/text"),
        CommandKind::GetElementTagName => get("/session/:sessionId/element/:id/name"),
        CommandKind::GetElementAttribute => {
            get("/session/:sessionId/element/:id/attribute/:name")
        },
        CommandKind::IsElementSelected => get("/session/:sessionId/element/:id/selected"),
        CommandKind::IsElementEnabled => get("/session/:sessionId/element/:id/enabled"),
        CommandKind::IsElementDisplayed => get("/session/:sessionId/element/:id/displayed"),
        CommandKind::GetElementLocationOnceScrolledIntoView => {
            get("/session/:sessionId/element/:id/location_in_view")
        },
        CommandKind::Click => post("/session/:sessionId/click"),
        CommandKind::DoubleClick => post("/session/:sessionId/doubleclick"),
        CommandKind::MouseDown => post("/session/:sessionId/buttondown"),
        CommandKind::MouseUp => post("/session/:sessionId/buttonup"),
        CommandKind::MouseMove => post("/session/:sessionId/moveto"),
        CommandKind::SendKeysToActiveElement => post("/session/:sessionId/keys"),
        CommandKind::GetCookies => get("/session/:sessionId/cookie"),
        CommandKind::AddCookie => post("/session/:sessionId/cookie"),
        CommandKind::DeleteAllCookies => delete("/session/:sessionId/cookie"),
        CommandKind::SetTimeouts => post("/session/:sessionId/timeouts"),
        CommandKind::DismissAlert => post("/session/:sessionId/dismiss_alert"),
        CommandKind::AcceptAlert => post("/session/:sessionId/accept_alert"),
        CommandKind::GetAlertText => get("/session/:sessionId/alert_text"),
        CommandKind::SetAlertText => post("/session/:sessionId/alert_text"),
        CommandKind::GetLocalStorageItem => {
            get("/session/:sessionId/local_storage/key/:key")
        },
        CommandKind::SetLocalStorageItem => post("/session/:sessionId/local_storage"),
        CommandKind::RemoveLocalStorageItem => {
            delete("/session/:sessionId/local_storage/key/:key")
        },
        CommandKind::GetSessionStorageItem => {
            get("/session/:sessionId/session_storage/key/:key")
        },
        CommandKind::SetSessionStorageItem => post("/session/:sessionId/session_storage"),
        CommandKind::RemoveSessionStorageItem => {
            delete("/session/:sessionId/session_storage/key/:key")
        },
    }
}

/// How the W3C dialect carries one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum W3cRoute {
    /// Native endpoint.
    Direct(Route),
    /// No native endpoint; compiled to a generic execute-script call.
    Script,
    /// No native endpoint; compiled to a single-action W3C action sequence.
    Actions,
}

/// W3C routing table. Total: kinds without a native endpoint are marked
/// [`W3cRoute::Script`] or [`W3cRoute::Actions`] and compiled by the codec.
pub fn w3c_route(kind: CommandKind) -> W3cRoute {
    use W3cRoute::{Actions, Direct, Script};
    match kind {
        CommandKind::NewSession => Direct(post("/session")),
        CommandKind::DeleteSession => Direct(delete("/session/:sessionId")),
        CommandKind::Status => Direct(get("/status")),
        CommandKind::Get => Direct(post("/session/:sessionId/url")),
        CommandKind::GetCurrentUrl => Direct(get("/session/:sessionId/url")),
        CommandKind::GoBack => Direct(post("/session/:sessionId/back")),
        CommandKind::GoForward => Direct(post("/session/:sessionId/forward")),
        CommandKind::Refresh => Direct(post("/session/:sessionId/refresh")),
        CommandKind::GetTitle => Direct(get("/session/:sessionId/title")),
        CommandKind::ExecuteScript => Direct(post("/session/:sessionId/execute/sync")),
        CommandKind::ExecuteAsyncScript => Direct(post("/session/:sessionId/execute/async")),
        CommandKind::FindElement => Direct(post("/session/:sessionId/element")),
        CommandKind::FindElements => Direct(post("/session/:sessionId/elements")),
        CommandKind::FindChildElement => {
            Direct(post("/session/:sessionId/element/:id/element"))
        },
        CommandKind::FindChildElements => {
            Direct(post("/session/:sessionId/element/:id/elements"))
        },
        CommandKind::GetActiveElement => Direct(get("/session/:sessionId/element/active")),
        CommandKind::ClickElement => Direct(post("/session/:sessionId/element/:id/click")),
        CommandKind::ClearElement => Direct(post("/session/:sessionId/element/:id/clear")),
        CommandKind::SendKeysToElement => {
            Direct(post("/session/:sessionId/element/:id/value"))
        },
        CommandKind::GetElementText => Direct(get("/session/:sessionId/element/:id/text")),
        CommandKind::GetElementTagName => Direct(get("/session/:sessionId/element/:id/name")),
        CommandKind::GetElementAttribute => {
            Direct(get("/session/:sessionId/element/:id/attribute/:name"))
        },
        CommandKind::IsElementSelected => {
            Direct(get("/session/:sessionId/element/:id/selected"))
        },
        CommandKind::IsElementEnabled => {
            Direct(get("/session/:sessionId/element/:id/enabled"))
        },
        CommandKind::GetCookies => Direct(get("/session/:sessionId/cookie")),
        CommandKind::AddCookie => Direct(post("/session/:sessionId/cookie")),
        CommandKind::DeleteAllCookies => Direct(delete("/session/:sessionId/cookie")),
        CommandKind::SetTimeouts => Direct(post("/session/:sessionId/timeouts")),
        CommandKind::DismissAlert => Direct(post("/session/:sessionId/alert/dismiss")),
        CommandKind::AcceptAlert => Direct(post("/session/:sessionId/alert/accept")),
        CommandKind::GetAlertText => Direct(get("/session/:sessionId/alert/text")),
        CommandKind::SetAlertText => Direct(post("/session/:sessionId/alert/text")),

        // Legacy-only surface carried by script execution.
        CommandKind::GetPageSource
        | CommandKind::SubmitElement
        | CommandKind::IsElementDisplayed
        | CommandKind::GetElementLocationOnceScrolledIntoView
        | CommandKind::GetLocalStorageItem
        | CommandKind::SetLocalStorageItem
        | CommandKind::RemoveLocalStorageItem
        | CommandKind::GetSessionStorageItem
        | CommandKind::SetSessionStorageItem
        | CommandKind::RemoveSessionStorageItem => Script,

        // Single-shot input commands carried by action sequences.
        CommandKind::Click
        | CommandKind::DoubleClick
        | CommandKind::MouseDown
        | CommandKind::MouseUp
        | CommandKind::MouseMove
        | CommandKind::SendKeysToActiveElement => Actions,
    }
}

/// Fill a template's `:param` placeholders from a lookup function.
///
/// Returns `None` when a placeholder has no value.
pub fn expand_template<'a, F>(template: &'static str, mut lookup: F) -> Option<String>
where
    F: FnMut(&'static str) -> Option<&'a str>,
{
    let mut out = String::with_capacity(template.len());
    for segment in template.split('/') {
        if segment.is_empty() {
            continue;
        }
        out.push('/');
        if let Some(param) = segment.strip_prefix(':') {
            out.push_str(lookup(param)?);
        } else {
            out.push_str(segment);
        }
    }
    Some(out)
}

/// Match a concrete path against a template, capturing `:param` segments.
///
/// Returns the captures in template order, or `None` on any mismatch.
pub fn match_template<'p>(template: &'static str, path: &'p str) -> Option<Vec<(&'static str, &'p str)>> {
    let t: Vec<&str> = template.split('/').filter(|s| !s.is_empty()).collect();
    let p: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if t.len() != p.len() {
        return None;
    }
    let mut captures = Vec::new();
    for (ts, ps) in t.iter().zip(&p) {
        if let Some(param) = ts.strip_prefix(':') {
            if ps.is_empty() {
                return None;
            }
            captures.push((param, *ps));
        } else if ts != ps {
            return None;
        }
    }
    Some(captures)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_are_total() {
        for kind in CommandKind::ALL {
            let _ = legacy_route(*kind);
            let _ = w3c_route(*kind);
        }
    }

    #[test]
    fn test_expand_template() {
        let url = expand_template("/session/:sessionId/element/:id/click", |p| match p {
            "sessionId" => Some("s-1"),
            "id" => Some("e-9"),
            _ => None,
        })
        .unwrap();
        assert_eq!(url, "/session/s-1/element/e-9/click");
    }

    #[test]
    fn test_expand_missing_param() {
        assert!(expand_template("/session/:sessionId/url", |_| None).is_none());
    }

    #[test]
    fn test_match_template_captures() {
        let caps =
            match_template("/session/:sessionId/element/:id/text", "/session/abc/element/e7/text")
                .unwrap();
        assert_eq!(caps, vec![("sessionId", "abc"), ("id", "e7")]);
    }

    #[test]
    fn test_match_template_rejects() {
        assert!(match_template("/session/:sessionId/url", "/session/abc/title").is_none());
        assert!(match_template("/session/:sessionId/url", "/session/abc").is_none());
    }

    #[test]
    fn test_dialects_route_displayedness_differently() {
        assert_eq!(
            legacy_route(CommandKind::IsElementDisplayed),
            get("/session/:sessionId/element/:id/displayed")
        );
        assert_eq!(w3c_route(CommandKind::IsElementDisplayed), W3cRoute::Script);
    }
}
