//! Property tests for the pure building blocks

use quickcheck_macros::quickcheck;
use reconchain::activity::{ActivityLog, NewActivity, ACTIVITY_LOG_CAPACITY};
use reconchain::intel::{IntelligenceExtractor, IntelligenceStore, PatternExtractor};
use reconchain::target::{host_of, join_url};
use reconchain::workflow::{Phase, PhaseId, WorkflowTemplate};

const TOOLS: [&str; 8] = ["whois", "dig", "nmap", "httpx", "gobuster", "nikto", "sqlmap", "custom"];

#[quickcheck]
fn prop_log_never_exceeds_capacity(appends: u16) -> bool {
    let log = ActivityLog::new();
    let appends = usize::from(appends % 400);
    for i in 0..appends {
        log.append(NewActivity::progress(format!("event {}", i)));
    }

    let snapshot = log.snapshot();
    snapshot.len() == appends.min(ACTIVITY_LOG_CAPACITY)
        && snapshot.windows(2).all(|w| w[0].id == w[1].id + 1)
}

#[quickcheck]
fn prop_total_steps_is_sum_of_phase_tools(sizes: Vec<u8>) -> bool {
    let phases: Vec<Phase> = sizes
        .iter()
        .take(5)
        .map(|size| {
            let tools = (0..usize::from(*size % 6)).map(|i| TOOLS[i % TOOLS.len()]);
            Phase::new(PhaseId::Scanning, tools)
        })
        .collect();
    let expected: usize = sizes.iter().take(5).map(|s| usize::from(*s % 6)).sum();

    let template = WorkflowTemplate::new("generated", "", phases);
    template.total_steps() == expected && template.steps().len() == expected
}

#[quickcheck]
fn prop_extraction_is_total(tool_index: usize, payload: String) -> bool {
    let tool = TOOLS[tool_index % TOOLS.len()];
    let intel = PatternExtractor::new().extract(tool, &payload);
    intel.values().all(|value| value.as_array().map_or(false, |items| !items.is_empty()))
}

#[quickcheck]
fn prop_resolution_never_fails(tool_index: usize, payload: String, fallback: String) -> bool {
    let store = IntelligenceStore::new();
    let extractor = PatternExtractor::new();
    for tool in TOOLS {
        store.record(tool, extractor.extract(tool, &payload));
    }

    let tool = TOOLS[tool_index % TOOLS.len()];
    let resolved = store.resolve(tool, &fallback);
    resolved.is_handoff() || resolved.target == fallback
}

#[quickcheck]
fn prop_target_helpers_are_total(target: String, path: String) -> bool {
    let host = host_of(&target);
    let joined = join_url(&target, &path);
    host.len() <= target.len() && !joined.is_empty()
}
