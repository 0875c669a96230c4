//! Scenario-based tests for the release pipeline

mod helpers;

mod branch_push;
mod failure_handling;
mod tag_release;
mod validation;
mod variable_substitution;
