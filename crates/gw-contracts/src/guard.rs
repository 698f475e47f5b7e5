use std::cell::Cell;

/// Re-entrancy flag for flows that must not overlap (level purchase).
#[derive(Debug, Default)]
pub struct InFlight {
    busy: Cell<bool>,
}

impl InFlight {
    /// Claim the flag; `None` while another flow holds it.
    pub fn try_begin(&self) -> Option<InFlightGuard<'_>> {
        if self.busy.replace(true) {
            return None;
        }
        Some(InFlightGuard { busy: &self.busy })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.get()
    }
}

/// Releases the flag on drop, including on early error returns.
pub struct InFlightGuard<'a> {
    busy: &'a Cell<bool>,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.busy.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_claim_fails_until_release() {
        let flag = InFlight::default();
        let first = flag.try_begin();
        assert!(first.is_some());
        assert!(flag.try_begin().is_none());
        drop(first);
        assert!(!flag.is_busy());
        assert!(flag.try_begin().is_some());
    }
}
