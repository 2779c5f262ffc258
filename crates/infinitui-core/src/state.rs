// ── Reactive panel state ──
//
// One watch-backed slot per status source. Each slot holds either
// nothing (before the first message) or the most recently received
// record for that source, replaced wholesale -- never a merge.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use infinitui_api::models::{BlowerStatus, HeatpumpStatus, TstatStatus};

/// Stream parse-failure diagnostics, surfaced to the UI instead of
/// being silently swallowed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamDiagnostics {
    /// Total malformed frames seen this session.
    pub parse_failures: u64,
    /// Description of the most recent parse failure.
    pub last_parse_error: Option<String>,
}

/// Central reactive state for the panel's three status sources.
///
/// Mutated only by the stream dispatcher and (for `tstat`) an explicit
/// refresh; all consumers observe it through `watch` channels.
pub struct PanelState {
    tstat: watch::Sender<Option<Arc<TstatStatus>>>,
    blower: watch::Sender<Option<Arc<BlowerStatus>>>,
    heatpump: watch::Sender<Option<Arc<HeatpumpStatus>>>,
    last_stream_update: watch::Sender<Option<DateTime<Utc>>>,
    diagnostics: watch::Sender<StreamDiagnostics>,
}

impl PanelState {
    pub fn new() -> Self {
        let (tstat, _) = watch::channel(None);
        let (blower, _) = watch::channel(None);
        let (heatpump, _) = watch::channel(None);
        let (last_stream_update, _) = watch::channel(None);
        let (diagnostics, _) = watch::channel(StreamDiagnostics::default());

        Self {
            tstat,
            blower,
            heatpump,
            last_stream_update,
            diagnostics,
        }
    }

    // ── Snapshot accessors ───────────────────────────────────────────

    pub fn tstat(&self) -> Option<Arc<TstatStatus>> {
        self.tstat.borrow().clone()
    }

    pub fn blower(&self) -> Option<Arc<BlowerStatus>> {
        self.blower.borrow().clone()
    }

    pub fn heatpump(&self) -> Option<Arc<HeatpumpStatus>> {
        self.heatpump.borrow().clone()
    }

    pub fn diagnostics(&self) -> StreamDiagnostics {
        self.diagnostics.borrow().clone()
    }

    /// When the last stream message (of any source) was dispatched.
    pub fn last_stream_update(&self) -> Option<DateTime<Utc>> {
        *self.last_stream_update.borrow()
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscribe_tstat(&self) -> watch::Receiver<Option<Arc<TstatStatus>>> {
        self.tstat.subscribe()
    }

    pub fn subscribe_blower(&self) -> watch::Receiver<Option<Arc<BlowerStatus>>> {
        self.blower.subscribe()
    }

    pub fn subscribe_heatpump(&self) -> watch::Receiver<Option<Arc<HeatpumpStatus>>> {
        self.heatpump.subscribe()
    }

    pub fn subscribe_diagnostics(&self) -> watch::Receiver<StreamDiagnostics> {
        self.diagnostics.subscribe()
    }

    // ── Mutation (crate-internal) ────────────────────────────────────

    // `send_replace`, not `send`: a slot must hold the latest payload
    // even while nobody is subscribed yet (the first refresh lands
    // before the UI bridge attaches its receivers).

    pub(crate) fn set_tstat(&self, status: TstatStatus) {
        self.tstat.send_replace(Some(Arc::new(status)));
    }

    pub(crate) fn set_blower(&self, status: BlowerStatus) {
        self.blower.send_replace(Some(Arc::new(status)));
    }

    pub(crate) fn set_heatpump(&self, status: HeatpumpStatus) {
        self.heatpump.send_replace(Some(Arc::new(status)));
    }

    pub(crate) fn touch_stream_update(&self) {
        self.last_stream_update.send_replace(Some(Utc::now()));
    }

    pub(crate) fn record_parse_failure(&self, message: String) {
        self.diagnostics.send_modify(|d| {
            d.parse_failures += 1;
            d.last_parse_error = Some(message);
        });
    }
}

impl Default for PanelState {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn tstat(mode: &str) -> TstatStatus {
        serde_json::from_value(serde_json::json!({ "zones": [], "mode": mode }))
            .expect("valid tstat")
    }

    #[test]
    fn slots_start_empty() {
        let state = PanelState::new();
        assert!(state.tstat().is_none());
        assert!(state.blower().is_none());
        assert!(state.heatpump().is_none());
        assert!(state.last_stream_update().is_none());
    }

    #[test]
    fn set_tstat_replaces_wholesale_and_leaves_others() {
        let state = PanelState::new();

        state.set_tstat(tstat("heat"));
        state.set_tstat(tstat("cool"));

        assert_eq!(state.tstat().expect("tstat set").mode, "cool");
        assert!(state.blower().is_none());
        assert!(state.heatpump().is_none());
    }

    #[test]
    fn parse_failures_accumulate() {
        let state = PanelState::new();

        state.record_parse_failure("bad frame".into());
        state.record_parse_failure("worse frame".into());

        let diag = state.diagnostics();
        assert_eq!(diag.parse_failures, 2);
        assert_eq!(diag.last_parse_error.as_deref(), Some("worse frame"));
    }

    #[test]
    fn updates_before_first_subscriber_are_kept() {
        // The initial refresh can land before the UI attaches any
        // receiver; the slot must still hold it.
        let state = PanelState::new();

        state.set_tstat(tstat("heat"));
        state.touch_stream_update();

        assert_eq!(state.tstat().expect("tstat kept").mode, "heat");
        assert!(state.last_stream_update().is_some());

        // A late subscriber sees the already-stored value.
        let rx = state.subscribe_tstat();
        assert_eq!(rx.borrow().clone().expect("visible to late rx").mode, "heat");
    }

    #[test]
    fn subscribers_see_replacements() {
        let state = PanelState::new();
        let mut rx = state.subscribe_tstat();

        state.set_tstat(tstat("auto"));

        assert!(rx.has_changed().expect("sender alive"));
        let snap = rx.borrow_and_update().clone();
        assert_eq!(snap.expect("tstat set").mode, "auto");
    }
}
