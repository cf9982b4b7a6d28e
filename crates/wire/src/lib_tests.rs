// SPDX-License-Identifier: MIT

use super::*;
use nodeagent_core::{DriftAction, DriftKind};

#[test]
fn drift_events_report_round_trips_through_json() {
    let report = DriftEventsReport::new(vec![DriftEvent::new(
        1_700_000_000_000,
        "node-1",
        DriftKind::NginxConfig,
        "tabc1234567_main",
        DriftAction::AutoFixed,
        "regenerated missing config",
    )]);

    let json = serde_json::to_string(&report).unwrap();
    let parsed: DriftEventsReport = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.events.len(), 1);
    assert_eq!(parsed.events[0].node_id, "node-1");
    assert!(parsed.events[0].is_auto_fixed());
}
