//! Derived schedule fields of a challenge, computed from its phase list.

use std::collections::{HashMap, HashSet};

use chip_index::{Document, PartialUpdate};
use chip_models::{Phase, Timestamp, ValidationError};
use serde_json::Value;

pub const REGISTRATION_PHASE: &str = "Registration";
pub const SUBMISSION_PHASE: &str = "Submission";

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PhaseWindow {
    pub start: Option<Timestamp>,
    pub end: Option<Timestamp>,
}

impl PhaseWindow {
    fn of(phase: &Phase) -> Self {
        Self {
            start: phase.start_date(),
            end: phase.end_date(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Timeline {
    pub end_date: Option<Timestamp>,
    pub current_phase: Option<Phase>,
    pub current_phase_names: Vec<String>,
    pub registration: Option<PhaseWindow>,
    pub submission: Option<PhaseWindow>,
}

/// Seconds spanned by the predecessor chain ending at the last phase.
///
/// A predecessor that is not in the list ends the chain. Returns `None` for
/// an empty list.
pub fn chain_duration(phases: &[Phase]) -> Result<Option<f64>, ValidationError> {
    let Some(last) = phases.last() else {
        return Ok(None);
    };
    let by_id: HashMap<&str, &Phase> = phases.iter().map(|p| (p.id.as_str(), p)).collect();

    let mut visited = HashSet::new();
    let mut total: f64 = 0.0;
    let mut cursor = Some(last);
    while let Some(phase) = cursor {
        if !visited.insert(phase.id.as_str()) {
            return Err(ValidationError::PhaseCycle(phase.id.clone()));
        }
        total += phase.duration;
        cursor = phase
            .predecessor
            .as_deref()
            .and_then(|id| by_id.get(id).copied());
    }
    if !total.is_finite() {
        return Err(ValidationError::DurationOutOfRange(total));
    }
    Ok(Some(total))
}

impl Timeline {
    pub fn compute(
        phases: &[Phase],
        start_date: Option<Timestamp>,
    ) -> Result<Self, ValidationError> {
        let duration = chain_duration(phases)?;
        let end_date = match (start_date, duration) {
            (Some(start), Some(seconds)) => Some(
                start
                    .plus_seconds(seconds)
                    .ok_or(ValidationError::DurationOutOfRange(seconds))?,
            ),
            _ => None,
        };
        let named = |name: &str| phases.iter().find(|p| p.name.as_deref() == Some(name));

        Ok(Self {
            end_date,
            current_phase: phases.iter().rev().find(|p| p.is_open).cloned(),
            current_phase_names: phases
                .iter()
                .filter(|p| p.is_open)
                .filter_map(|p| p.name.clone())
                .collect(),
            registration: named(REGISTRATION_PHASE).map(PhaseWindow::of),
            submission: named(SUBMISSION_PHASE).map(PhaseWindow::of),
        })
    }

    /// The derived fields as an index write. `currentPhase` replaces the
    /// stored object outright so no key of a previous phase survives.
    pub fn to_update(&self) -> Result<PartialUpdate, serde_json::Error> {
        let mut doc = Document::new();
        if let Some(end) = self.end_date {
            doc.insert("endDate".into(), end.to_value());
        }
        doc.insert(
            "currentPhaseNames".into(),
            Value::from(self.current_phase_names.clone()),
        );
        write_window(&mut doc, "registration", self.registration);
        write_window(&mut doc, "submission", self.submission);

        let current = match &self.current_phase {
            Some(phase) => serde_json::to_value(phase)?,
            None => Value::Null,
        };
        let mut replace = Document::new();
        replace.insert("currentPhase".into(), current);
        Ok(PartialUpdate {
            merge: doc,
            replace,
        })
    }
}

fn write_window(doc: &mut Document, prefix: &str, window: Option<PhaseWindow>) {
    let Some(window) = window else { return };
    if let Some(start) = window.start {
        doc.insert(format!("{prefix}StartDate"), start.to_value());
    }
    if let Some(end) = window.end {
        doc.insert(format!("{prefix}EndDate"), end.to_value());
    }
}
