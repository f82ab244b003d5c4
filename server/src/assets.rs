//! HTML shells served for the two pages. All data is fetched from the API.

pub const LOGIN_HTML: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/assets/login.html"));

pub const DASHBOARD_HTML: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/assets/dashboard.html"));
