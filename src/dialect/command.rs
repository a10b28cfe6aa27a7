//! Abstract command model.
//!
//! A [`Command`] is the dialect-neutral form of one WebDriver invocation:
//! which session it targets, what it does, and its parameters. Codecs turn
//! commands into dialect-specific wire requests and back.

use serde_json::{Map, Value};

/// Closed vocabulary of command kinds.
///
/// Each dialect's routing table is a total function over this enum, so an
/// unroutable command is a decode-time condition (an unrecognized URL), not
/// a gap discovered at encode time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// Create a new session.
    NewSession,
    /// Terminate a session.
    DeleteSession,
    /// Process readiness probe.
    Status,
    /// Navigate to a URL.
    Get,
    /// Read the current URL.
    GetCurrentUrl,
    /// History back.
    GoBack,
    /// History forward.
    GoForward,
    /// Reload the current page.
    Refresh,
    /// Read the page title.
    GetTitle,
    /// Read the full page source.
    GetPageSource,
    /// Run a synchronous script.
    ExecuteScript,
    /// Run an asynchronous script.
    ExecuteAsyncScript,
    /// Locate one element from the document root.
    FindElement,
    /// Locate all matching elements from the document root.
    FindElements,
    /// Locate one element under a parent element.
    FindChildElement,
    /// Locate all matching elements under a parent element.
    FindChildElements,
    /// The element with focus.
    GetActiveElement,
    /// Click an element.
    ClickElement,
    /// Clear an editable element.
    ClearElement,
    /// Type into an element.
    SendKeysToElement,
    /// Submit the form owning an element.
    SubmitElement,
    /// Read an element's visible text.
    GetElementText,
    /// Read an element's tag name.
    GetElementTagName,
    /// Read one attribute of an element.
    GetElementAttribute,
    /// Whether an option/checkbox is selected.
    IsElementSelected,
    /// Whether an element is enabled.
    IsElementEnabled,
    /// Whether an element is rendered visible.
    IsElementDisplayed,
    /// Scroll an element into view and report its location.
    GetElementLocationOnceScrolledIntoView,
    /// Single click at the current pointer position.
    Click,
    /// Double click at the current pointer position.
    DoubleClick,
    /// Press the pointer button.
    MouseDown,
    /// Release the pointer button.
    MouseUp,
    /// Move the pointer, optionally relative to an element.
    MouseMove,
    /// Type into whatever element has focus.
    SendKeysToActiveElement,
    /// Read all cookies.
    GetCookies,
    /// Add one cookie.
    AddCookie,
    /// Delete all cookies.
    DeleteAllCookies,
    /// Configure session timeouts.
    SetTimeouts,
    /// Dismiss the open user prompt.
    DismissAlert,
    /// Accept the open user prompt.
    AcceptAlert,
    /// Read the open user prompt's text.
    GetAlertText,
    /// Type into the open user prompt.
    SetAlertText,
    /// Read one local storage entry.
    GetLocalStorageItem,
    /// Write one local storage entry.
    SetLocalStorageItem,
    /// Remove one local storage entry.
    RemoveLocalStorageItem,
    /// Read one session storage entry.
    GetSessionStorageItem,
    /// Write one session storage entry.
    SetSessionStorageItem,
    /// Remove one session storage entry.
    RemoveSessionStorageItem,
}

impl CommandKind {
    /// Every kind, in a fixed order. Decoders iterate this to match an
    /// incoming wire request against the routing tables.
    pub const ALL: &'static [CommandKind] = &[
        CommandKind::NewSession,
        CommandKind::DeleteSession,
        CommandKind::Status,
        CommandKind::Get,
        CommandKind::GetCurrentUrl,
        CommandKind::GoBack,
        CommandKind::GoForward,
        CommandKind::Refresh,
        CommandKind::GetTitle,
        CommandKind::GetPageSource,
        CommandKind::ExecuteScript,
        CommandKind::ExecuteAsyncScript,
        CommandKind::FindElement,
        CommandKind::FindElements,
        CommandKind::FindChildElement,
        CommandKind::FindChildElements,
        CommandKind::GetActiveElement,
        CommandKind::ClickElement,
        CommandKind::ClearElement,
        CommandKind::SendKeysToElement,
        CommandKind::SubmitElement,
        CommandKind::GetElementText,
        CommandKind::GetElementTagName,
        CommandKind::GetElementAttribute,
        CommandKind::IsElementSelected,
        CommandKind::IsElementEnabled,
        CommandKind::IsElementDisplayed,
        CommandKind::GetElementLocationOnceScrolledIntoView,
        CommandKind::Click,
        CommandKind::DoubleClick,
        CommandKind::MouseDown,
        CommandKind::MouseUp,
        CommandKind::MouseMove,
        CommandKind::SendKeysToActiveElement,
        CommandKind::GetCookies,
        CommandKind::AddCookie,
        CommandKind::DeleteAllCookies,
        CommandKind::SetTimeouts,
        CommandKind::DismissAlert,
        CommandKind::AcceptAlert,
        CommandKind::GetAlertText,
        CommandKind::SetAlertText,
        CommandKind::GetLocalStorageItem,
        CommandKind::SetLocalStorageItem,
        CommandKind::RemoveLocalStorageItem,
        CommandKind::GetSessionStorageItem,
        CommandKind::SetSessionStorageItem,
        CommandKind::RemoveSessionStorageItem,
    ];

    /// Canonical name, used in logs and error messages.
    pub fn name(self) -> &'static str {
        match self {
            CommandKind::NewSession => "newSession",
            CommandKind::DeleteSession => "quit",
            CommandKind::Status => "status",
            CommandKind::Get => "get",
            CommandKind::GetCurrentUrl => "getCurrentUrl",
            CommandKind::GoBack => "goBack",
            CommandKind::GoForward => "goForward",
            CommandKind::Refresh => "refresh",
            CommandKind::GetTitle => "getTitle",
            CommandKind::GetPageSource => "getPageSource",
            CommandKind::ExecuteScript => "executeScript",
            CommandKind::ExecuteAsyncScript => "executeAsyncScript",
            CommandKind::FindElement => "findElement",
            CommandKind::FindElements => "findElements",
            CommandKind::FindChildElement => "findChildElement",
            CommandKind::FindChildElements => "findChildElements",
            CommandKind::GetActiveElement => "getActiveElement",
            CommandKind::ClickElement => "clickElement",
            CommandKind::ClearElement => "clearElement",
            CommandKind::SendKeysToElement => "sendKeysToElement",
            CommandKind::SubmitElement => "submitElement",
            CommandKind::GetElementText => "getElementText",
            CommandKind::GetElementTagName => "getElementTagName",
            CommandKind::GetElementAttribute => "getElementAttribute",
            CommandKind::IsElementSelected => "isElementSelected",
            CommandKind::IsElementEnabled => "isElementEnabled",
            CommandKind::IsElementDisplayed => "isElementDisplayed",
            CommandKind::GetElementLocationOnceScrolledIntoView => {
                "getElementLocationOnceScrolledIntoView"
            },
            CommandKind::Click => "mouseClick",
            CommandKind::DoubleClick => "mouseDoubleClick",
            CommandKind::MouseDown => "mouseButtonDown",
            CommandKind::MouseUp => "mouseButtonUp",
            CommandKind::MouseMove => "mouseMoveTo",
            CommandKind::SendKeysToActiveElement => "sendKeysToActiveElement",
            CommandKind::GetCookies => "getCookies",
            CommandKind::AddCookie => "addCookie",
            CommandKind::DeleteAllCookies => "deleteAllCookies",
            CommandKind::SetTimeouts => "setTimeouts",
            CommandKind::DismissAlert => "dismissAlert",
            CommandKind::AcceptAlert => "acceptAlert",
            CommandKind::GetAlertText => "getAlertText",
            CommandKind::SetAlertText => "setAlertText",
            CommandKind::GetLocalStorageItem => "getLocalStorageItem",
            CommandKind::SetLocalStorageItem => "setLocalStorageItem",
            CommandKind::RemoveLocalStorageItem => "removeLocalStorageItem",
            CommandKind::GetSessionStorageItem => "getSessionStorageItem",
            CommandKind::SetSessionStorageItem => "setSessionStorageItem",
            CommandKind::RemoveSessionStorageItem => "removeSessionStorageItem",
        }
    }
}

/// One WebDriver invocation in dialect-neutral form.
///
/// Immutable value object; equality is structural. Created per invocation
/// and discarded after encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Target session. `None` for pre-session commands (new-session, status).
    pub session_id: Option<String>,
    /// What the command does.
    pub kind: CommandKind,
    /// Parameter mapping. URL-routed entries (element id, attribute name,
    /// storage key) live here under their template parameter names.
    pub parameters: Map<String, Value>,
}

impl Command {
    /// Pre-session command with no parameters.
    pub fn new(kind: CommandKind) -> Self {
        Self {
            session_id: None,
            kind,
            parameters: Map::new(),
        }
    }

    /// Session-scoped command with no parameters.
    pub fn for_session(kind: CommandKind, session_id: &str) -> Self {
        Self {
            session_id: Some(session_id.to_string()),
            kind,
            parameters: Map::new(),
        }
    }

    /// Add one parameter, builder style.
    pub fn with_param(mut self, key: &str, value: Value) -> Self {
        self.parameters.insert(key.to_string(), value);
        self
    }

    /// Replace the whole parameter mapping.
    pub fn with_params(mut self, parameters: Map<String, Value>) -> Self {
        self.parameters = parameters;
        self
    }

    /// Parameter lookup.
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.parameters.get(key)
    }

    /// Parameter lookup as a string.
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).and_then(Value::as_str)
    }
}
