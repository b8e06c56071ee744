//! End-to-end tests driving the arrangement model through the mediator.

#[cfg(test)]
mod arrangement_integration;
