//! # autoblog_engine
//!
//! A content pipeline that finds articles on other sites, extracts them and
//! optionally rewrites them through a generative-text provider before
//! handing them to a publisher.
//!
//! ## Architecture
//!
//! One campaign run walks these stages:
//! 1. **Discovery**: read an RSS/Atom feed or a sitemap into candidate links
//! 2. **Filtering**: start date, URL keywords and the processed log pick the oldest new link
//! 3. **Scraping**: fetch the page and extract title, lead image and body
//! 4. **Rewriting**: build a prompt, call the provider and normalize its JSON (AI modes only)
//! 5. **Publishing**: hand the article to a [`outputs::Publisher`] and append a
//!    [`models::ProcessedRecord`] to the [`store::LogStore`]
//!
//! [`pipeline::Pipeline`] ties the stages together; every network or storage
//! collaborator sits behind a trait so an external scheduler or a test can
//! supply its own.

pub mod api;
pub mod config;
pub mod discovery;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod models;
pub mod normalize;
pub mod outputs;
pub mod pipeline;
pub mod prompt;
pub mod run_log;
pub mod scrapers;
pub mod store;
pub mod utils;

#[cfg(test)]
mod testing;
