//! Adapters between the application and its host: the command line, assistant
//! app links, SMS delivery and permission prompts.

pub mod app_link;
pub mod cli;
pub mod permission;
pub mod sms;
