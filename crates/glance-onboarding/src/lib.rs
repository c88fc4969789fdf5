//! Onboarding support: setup walkthroughs, checklist state and credential
//! converters for every supported backend.
//!
//! Everything here is pure data and string manipulation. The walkthrough
//! content is static; only [`ChecklistState`] is mutable, and it lives for a
//! single UI session.

pub mod checklist;
pub mod flows;
pub mod templates;

pub use checklist::ChecklistState;
pub use flows::{credential_template, tutorial};
pub use templates::{
    aws_keys_to_toml, gsheet_url_to_toml, service_account_json_to_toml, snowflake_to_toml,
};
