pub mod api;
pub mod cleanup;
pub mod config;
pub mod form;
pub mod humanize;
pub mod middleware;
pub mod observability;
pub mod tokenizer;
