//! # DevToolkit – Request Tester
//!
//! Turns a pasted `curl ...` command line into a structured request:
//!
//! - **Word splitting** – Shell-style quoting, escapes and line continuations
//! - **Extraction** – URL, method, headers and body with curl's defaulting rules
//! - **Dispatch** – Conversion to a `reqwest` request and a response summary,
//!   with JSON bodies pretty-printed
//! - **History** – Recent commands and named saved requests

pub mod curl;
