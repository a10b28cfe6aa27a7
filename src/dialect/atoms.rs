//! Script bodies backing legacy commands that have no W3C endpoint.
//!
//! The W3C dialect re-expresses these commands as a generic execute-script
//! call carrying one of the snippets below. Element-targeted atoms receive
//! the element reference as `arguments[0]`.

/// Displayedness check.
pub const IS_DISPLAYED: &str = "\
var e = arguments[0];\
if (!e.ownerDocument.documentElement.contains(e)) { return false; }\
var style = window.getComputedStyle(e);\
if (style.visibility === 'hidden' || style.display === 'none') { return false; }\
return !!(e.offsetWidth || e.offsetHeight || e.getClientRects().length);";

/// Scroll the element into view and report its viewport location.
pub const LOCATION_IN_VIEW: &str = "\
arguments[0].scrollIntoView(true);\
var rect = arguments[0].getBoundingClientRect();\
return {x: Math.round(rect.left), y: Math.round(rect.top)};";

/// Serialize the full document.
pub const PAGE_SOURCE: &str = "\
var source = document.documentElement.outerHTML;\
if (!source) { source = new XMLSerializer().serializeToString(document); }\
return source;";

/// Submit the form owning the element.
pub const SUBMIT: &str = "\
var form = arguments[0];\
while (form.nodeName.toLowerCase() !== 'form') {\
  form = form.parentNode;\
  if (!form) { throw new Error('Unable to find containing form element'); }\
}\
form.submit();";

/// Read one local storage entry.
pub const GET_LOCAL_STORAGE_ITEM: &str = "return window.localStorage.getItem(arguments[0]);";

/// Write one local storage entry.
pub const SET_LOCAL_STORAGE_ITEM: &str =
    "window.localStorage.setItem(arguments[0], arguments[1]);";

/// Remove one local storage entry.
pub const REMOVE_LOCAL_STORAGE_ITEM: &str =
    "window.localStorage.removeItem(arguments[0]);";

/// Read one session storage entry.
pub const GET_SESSION_STORAGE_ITEM: &str =
    "return window.sessionStorage.getItem(arguments[0]);";

/// Write one session storage entry.
pub const SET_SESSION_STORAGE_ITEM: &str =
    "window.sessionStorage.setItem(arguments[0], arguments[1]);";

/// Remove one session storage entry.
pub const REMOVE_SESSION_STORAGE_ITEM: &str =
    "window.sessionStorage.removeItem(arguments[0]);";
