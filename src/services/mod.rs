//! External-tool and external-API integrations, plus the pipeline that
//! sequences them.

pub mod dropbox;
pub mod fetcher;
pub mod pipeline;
pub mod separator;
pub mod slack;
