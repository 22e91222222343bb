use std::sync::atomic::{AtomicBool, Ordering};

/// Single-flight flag for submissions. Whoever acquires it first submits;
/// everyone else backs off until the ticket is dropped.
#[derive(Debug, Default)]
pub(crate) struct SubmissionGuard {
    in_flight: AtomicBool,
}

impl SubmissionGuard {
    pub(crate) fn try_acquire(&self) -> Option<GuardTicket<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| GuardTicket { guard: self })
    }

    pub(crate) fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

/// Clears the guard when dropped, on success and failure alike.
#[derive(Debug)]
pub(crate) struct GuardTicket<'a> {
    guard: &'a SubmissionGuard,
}

impl Drop for GuardTicket<'_> {
    fn drop(&mut self) {
        self.guard.in_flight.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_while_ticket_is_held() {
        let guard = SubmissionGuard::default();
        let ticket = guard.try_acquire().expect("first acquire");
        assert!(guard.is_in_flight());
        assert!(guard.try_acquire().is_none());

        drop(ticket);
        assert!(!guard.is_in_flight());
        assert!(guard.try_acquire().is_some());
    }
}
