//! Test Module
//!
//! Cross-module test suite for CrisisWatch.
//!
//! ## Test Categories
//! - `crisis_tests`: End-to-end scenarios and properties of the detector
//! - `monitor_tests`: Session pipeline, alert delivery and concurrency
//! - `config_tests`: Environment configuration and lexicon loading
