//! Per-session run state.
//!
//! A slot holds at most one run. Starting a new run discards whatever the slot
//! held before; a completion only lands if it belongs to the run the slot is
//! currently waiting for.

use std::path::Path;

use crate::export::ExportDir;
use crate::types::{RunId, RunResult};

#[derive(Debug, Clone, Default, PartialEq)]
pub enum RunSlot {
    #[default]
    Empty,
    Pending {
        run_id: RunId,
    },
    Ready(RunResult),
}

impl RunSlot {
    /// Mark a run as in flight, dropping any earlier result.
    pub fn begin(&mut self, run_id: impl Into<RunId>) {
        *self = Self::Pending {
            run_id: run_id.into(),
        };
    }

    /// Store a finished run. Returns `false` and leaves the slot untouched when
    /// the result is for a run this slot is not waiting on.
    pub fn complete(&mut self, result: RunResult) -> bool {
        match self {
            Self::Pending { run_id } if *run_id == result.run_id => {
                *self = Self::Ready(result);
                true
            }
            _ => false,
        }
    }

    pub fn clear(&mut self) {
        *self = Self::Empty;
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    pub fn result(&self) -> Option<&RunResult> {
        match self {
            Self::Ready(result) => Some(result),
            _ => None,
        }
    }

    pub fn take(&mut self) -> Option<RunResult> {
        match std::mem::take(self) {
            Self::Ready(result) => Some(result),
            other => {
                *self = other;
                None
            }
        }
    }

    /// Rebuild a slot from an export directory. Anything short of a complete,
    /// readable export yields an empty slot.
    pub fn restore(dir: &Path) -> Self {
        match ExportDir::open(dir).and_then(|export| export.load()) {
            Ok((_, result)) => Self::Ready(result),
            Err(_) => Self::Empty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn result(run_id: &str) -> RunResult {
        RunResult {
            run_id: run_id.to_string(),
            success: true,
            exit_code: Some(0),
            cancelled: false,
            elapsed_s: 1.0,
            files: BTreeMap::new(),
        }
    }

    #[test]
    fn begin_then_complete() {
        let mut slot = RunSlot::default();
        slot.begin("a");
        assert!(slot.is_pending());
        assert!(slot.complete(result("a")));
        assert_eq!(slot.result().map(|r| r.run_id.as_str()), Some("a"));
    }

    #[test]
    fn stale_completion_is_ignored() {
        let mut slot = RunSlot::default();
        slot.begin("a");
        slot.begin("b");
        assert!(!slot.complete(result("a")));
        assert_eq!(slot, RunSlot::Pending { run_id: "b".into() });

        let mut empty = RunSlot::Empty;
        assert!(!empty.complete(result("a")));
        assert_eq!(empty, RunSlot::Empty);
    }

    #[test]
    fn new_run_discards_previous_result() {
        let mut slot = RunSlot::default();
        slot.begin("a");
        slot.complete(result("a"));
        slot.begin("b");
        assert!(slot.result().is_none());
    }

    #[test]
    fn take_only_yields_ready() {
        let mut slot = RunSlot::Pending { run_id: "a".into() };
        assert!(slot.take().is_none());
        assert!(slot.is_pending());

        slot.complete(result("a"));
        assert!(slot.take().is_some());
        assert_eq!(slot, RunSlot::Empty);
    }

    #[test]
    fn restore_from_garbage_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(RunSlot::restore(dir.path()), RunSlot::Empty);

        std::fs::write(dir.path().join(crate::MANIFEST_FILE), "{not json").unwrap();
        assert_eq!(RunSlot::restore(dir.path()), RunSlot::Empty);
    }
}
