use crate::consts::SCOPE_BASE_HOUR;
use crate::date::ScopeKey;
use std::collections::HashMap;
use time::{Date, Duration, PrimitiveDateTime, Time};

/// Per-scope counters used to hand out distinct synthetic timestamps.
///
/// Every file in a scope targets the scope's date at 09:00:00 plus the
/// scope's current offset in seconds. The offset only ever goes up, and only
/// when a timestamp was actually written, so files that already carry the
/// right date don't use up any seconds.
#[derive(Debug, Default)]
pub struct ScopeOffsetTable {
    offsets: HashMap<ScopeKey, u32>,
}
impl ScopeOffsetTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offset(&self, scope: &ScopeKey) -> u32 {
        self.offsets.get(scope).copied().unwrap_or(0)
    }

    /// Moves the scope on to the next second, after a successful write.
    pub fn advance(&mut self, scope: &ScopeKey) {
        let offset = self.offsets.entry(scope.clone()).or_insert(0);
        *offset = offset.saturating_add(1);
    }

    /// The instant the next file written in `scope` should carry.
    ///
    /// Returns `None` when the offset would run past the end of the
    /// representable calendar.
    pub fn target_instant(&self, scope: &ScopeKey, date: Date) -> Option<PrimitiveDateTime> {
        let base = PrimitiveDateTime::new(date, Time::from_hms(SCOPE_BASE_HOUR, 0, 0).ok()?);
        base.checked_add(Duration::seconds(i64::from(self.offset(scope))))
    }
}
