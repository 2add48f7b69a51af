// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests Module
//!
//! Properties of the pure parts of deployment: dependency ordering and
//! JSON pointer evaluation.

mod dependency_order;
mod json_pointer;
