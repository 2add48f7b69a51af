// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resource Identifiers
//!
//! Every record the control plane manages is addressed by a hierarchical
//! identifier:
//!
//! ```text
//! /planes/radius/local/resourceGroups/rg/providers/Applications.Core/environments/env0
//! └──────── scope segments ────────────┘ └─────────── type segments ─────────────────┘
//! ```
//!
//! Cloud identifiers without the `planes` prefix (`/subscriptions/...`) are
//! parsed by the same grammar.

pub mod id;

pub use id::{ResourceId, ResourceIdError, ScopeSegment, TypeSegment};
