//! Asynchronous GPU elapsed-time measurement
//!
//! The graphics backend exposes timer queries through [`TimerQueries`]. The
//! capability is resolved once when the [`GpuTimer`] is built; every later
//! call branches on that stored value instead of probing again.
//!
//! At most one query is outstanding: `begin` is skipped while the previous
//! query has not been retired by `poll`.

/// Backend-assigned query token.
pub type QueryId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// Result not available yet.
    Pending,
    /// Result invalidated (GPU reset, power event, unwritten timestamps).
    Disjoint,
    Ready { nanos: u64 },
}

/// Elapsed-time queries provided by a graphics context.
pub trait TimerQueries {
    /// Open a query spanning the next render submission.
    fn begin_query(&mut self) -> QueryId;
    /// Close the query after the submission.
    fn end_query(&mut self, query: QueryId);
    /// Non-blocking result check.
    fn query_status(&mut self, query: QueryId) -> QueryStatus;
    /// Release the query's resources.
    fn delete_query(&mut self, query: QueryId);
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    id: QueryId,
    ended: bool,
}

pub struct GpuTimer<T> {
    capability: Option<T>,
    in_flight: Option<InFlight>,
    last_result_ms: Option<f64>,
    skipped_frames: u64,
}

impl<T: TimerQueries> GpuTimer<T> {
    pub fn new(capability: Option<T>) -> Self {
        tracing::info!(supported = capability.is_some(), "gpu timer capability resolved");
        Self {
            capability,
            in_flight: None,
            last_result_ms: None,
            skipped_frames: 0,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.capability.is_some()
    }

    /// Open a query, unless unsupported or one is still outstanding.
    pub fn begin(&mut self) {
        let Some(queries) = self.capability.as_mut() else {
            return;
        };
        if self.in_flight.is_some() {
            self.skipped_frames += 1;
            return;
        }
        let id = queries.begin_query();
        self.in_flight = Some(InFlight { id, ended: false });
    }

    /// Backend handle while a query opened this frame is still recording.
    pub fn recording(&mut self) -> Option<&mut T> {
        match self.in_flight {
            Some(InFlight { ended: false, .. }) => self.capability.as_mut(),
            _ => None,
        }
    }

    pub fn end(&mut self) {
        let (Some(queries), Some(query)) = (self.capability.as_mut(), self.in_flight.as_mut())
        else {
            return;
        };
        if !query.ended {
            queries.end_query(query.id);
            query.ended = true;
        }
    }

    /// Retire the outstanding query if its result is ready. Never blocks.
    pub fn poll(&mut self) {
        let (Some(queries), Some(query)) = (self.capability.as_mut(), self.in_flight) else {
            return;
        };
        if !query.ended {
            return;
        }
        match queries.query_status(query.id) {
            QueryStatus::Pending => {}
            QueryStatus::Ready { nanos } => {
                self.last_result_ms = Some(nanos as f64 / 1e6);
                queries.delete_query(query.id);
                self.in_flight = None;
            }
            QueryStatus::Disjoint => {
                tracing::debug!(query = query.id, "gpu timer query disjoint, discarded");
                queries.delete_query(query.id);
                self.in_flight = None;
            }
        }
    }

    pub fn last_result_ms(&self) -> Option<f64> {
        self.last_result_ms
    }

    pub fn has_query_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Frames on which `begin` was skipped because a query was outstanding.
    pub fn skipped_frames(&self) -> u64 {
        self.skipped_frames
    }

    /// Discard any outstanding query and drop the capability.
    pub fn release(&mut self) {
        if let (Some(queries), Some(query)) = (self.capability.as_mut(), self.in_flight.take()) {
            queries.delete_query(query.id);
        }
        self.capability = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeQueries {
        next: QueryId,
        open: Vec<QueryId>,
        ended: Vec<QueryId>,
        deleted: Vec<QueryId>,
        results: HashMap<QueryId, QueryStatus>,
    }

    impl TimerQueries for FakeQueries {
        fn begin_query(&mut self) -> QueryId {
            self.next += 1;
            self.open.push(self.next);
            self.next
        }

        fn end_query(&mut self, query: QueryId) {
            self.ended.push(query);
        }

        fn query_status(&mut self, query: QueryId) -> QueryStatus {
            self.results
                .get(&query)
                .copied()
                .unwrap_or(QueryStatus::Pending)
        }

        fn delete_query(&mut self, query: QueryId) {
            self.deleted.push(query);
        }
    }

    fn frame(timer: &mut GpuTimer<FakeQueries>) {
        timer.begin();
        timer.end();
        timer.poll();
    }

    #[test]
    fn unsupported_timer_never_reports() {
        let mut timer = GpuTimer::<FakeQueries>::new(None);
        for _ in 0..10 {
            frame(&mut timer);
            assert!(timer.recording().is_none());
        }
        assert!(!timer.is_supported());
        assert_eq!(timer.last_result_ms(), None);
    }

    #[test]
    fn ready_result_converts_to_ms_and_retires() {
        let mut queries = FakeQueries::default();
        queries.results.insert(1, QueryStatus::Ready { nanos: 2_500_000 });
        let mut timer = GpuTimer::new(Some(queries));

        frame(&mut timer);

        assert_eq!(timer.last_result_ms(), Some(2.5));
        assert!(!timer.has_query_in_flight());
        let queries = timer.capability.as_ref().unwrap();
        assert_eq!(queries.deleted, vec![1]);
    }

    #[test]
    fn single_outstanding_query() {
        let mut timer = GpuTimer::new(Some(FakeQueries::default()));

        for _ in 0..5 {
            frame(&mut timer);
        }

        let queries = timer.capability.as_ref().unwrap();
        assert_eq!(queries.open, vec![1]);
        assert_eq!(queries.ended, vec![1]);
        assert_eq!(timer.skipped_frames(), 4);
        assert_eq!(timer.last_result_ms(), None);
    }

    #[test]
    fn recording_only_between_begin_and_end() {
        let mut timer = GpuTimer::new(Some(FakeQueries::default()));
        assert!(timer.recording().is_none());
        timer.begin();
        assert!(timer.recording().is_some());
        timer.end();
        assert!(timer.recording().is_none());
        // Still pending: next frame does not reopen recording.
        timer.poll();
        timer.begin();
        assert!(timer.recording().is_none());
    }

    #[test]
    fn pending_keeps_previous_result() {
        let mut queries = FakeQueries::default();
        queries.results.insert(1, QueryStatus::Ready { nanos: 1_000_000 });
        let mut timer = GpuTimer::new(Some(queries));

        frame(&mut timer);
        frame(&mut timer); // query 2 stays pending

        assert_eq!(timer.last_result_ms(), Some(1.0));
        assert!(timer.has_query_in_flight());
    }

    #[test]
    fn disjoint_query_is_discarded() {
        let mut queries = FakeQueries::default();
        queries.results.insert(1, QueryStatus::Disjoint);
        queries.results.insert(2, QueryStatus::Ready { nanos: 4_000_000 });
        let mut timer = GpuTimer::new(Some(queries));

        frame(&mut timer);
        assert_eq!(timer.last_result_ms(), None);
        assert!(!timer.has_query_in_flight());

        frame(&mut timer);
        assert_eq!(timer.last_result_ms(), Some(4.0));
    }

    #[test]
    fn release_discards_outstanding_query() {
        let mut timer = GpuTimer::new(Some(FakeQueries::default()));
        frame(&mut timer);
        assert!(timer.has_query_in_flight());

        timer.release();
        assert!(!timer.is_supported());
        assert!(!timer.has_query_in_flight());
        timer.release();
    }
}
