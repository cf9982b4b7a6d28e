// SPDX-License-Identifier: MIT

//! nodeagent-wire: JSON envelopes for the control-plane HTTP contract
//! (spec.md §6). The payload bodies themselves are the domain types in
//! `nodeagent-core`; this crate only defines the wrapper shapes the wire
//! format uses (e.g. the `{ "events": [...] }` envelope for drift events).

use nodeagent_core::{DesiredState, DriftEvent, NodeHealth};
use serde::{Deserialize, Serialize};

/// Body of `GET /internal/v1/nodes/{node}/desired-state` on a 200 response.
/// The `ETag` response header, not this body, carries the cache token.
pub type DesiredStateResponse = DesiredState;

/// Body of `POST /internal/v1/nodes/{node}/health`.
pub type HealthReport = NodeHealth;

/// Body of `POST /internal/v1/nodes/{node}/drift-events`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftEventsReport {
    pub events: Vec<DriftEvent>,
}

impl DriftEventsReport {
    pub fn new(events: Vec<DriftEvent>) -> Self {
        Self { events }
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
