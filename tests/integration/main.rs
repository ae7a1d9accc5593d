//! Integration tests for auction-scraper
//!
//! The pipeline tests drive the scraper through a scripted in-process site
//! adapter; the site tests run real adapters against wiremock servers.

mod common;
mod pipeline_tests;
mod site_tests;
