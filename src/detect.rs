//! The bounded detector.
//!
//! [`Detector::detect`] walks an ordered sequence left to right, keeping at
//! most `concurrency` predicate evaluations in flight. Evaluations are polled
//! in place on the caller's task through a [`FuturesUnordered`], so nothing is
//! spawned and the predicate's futures need not be `Send` or `'static`.
//!
//! Once an evaluation resolves truthy or fails, no new items are dispatched,
//! but everything already in flight is drained before the call settles. With a
//! concurrency of 1 the result is the first matching item in sequence order.
//! With more, it is the first match observed in resolution order.

use std::convert::Infallible;

use futures::FutureExt;
use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, error, trace};

use crate::config::{CapturePolicy, DetectConfig};

#[derive(Debug, Clone, Copy, Default)]
pub struct Detector {
    config: DetectConfig,
}

impl Detector {
    #[must_use]
    pub fn new(config: DetectConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &DetectConfig {
        &self.config
    }

    /// Return the first item for which `predicate` resolves to `Ok(true)`.
    ///
    /// `predicate` is called once per dispatched item with the item and its
    /// zero-based index. `concurrency` of `None` or `Some(0)` uses the
    /// configured default.
    ///
    /// Resolves to `Ok(None)` when the sequence is exhausted without a match.
    /// If any evaluation fails, the error is returned unchanged after the
    /// in-flight evaluations have drained.
    ///
    /// A predicate future that never completes stalls the call forever.
    pub async fn detect<I, T, F, Fut, E>(
        &self,
        items: I,
        mut predicate: F,
        concurrency: Option<usize>,
    ) -> Result<Option<T>, E>
    where
        I: IntoIterator<Item = T>,
        F: FnMut(&T, usize) -> Fut,
        Fut: Future<Output = Result<bool, E>>,
    {
        let limit = self.config.resolve_concurrency(concurrency);
        let mut items = items.into_iter().peekable();
        let mut state = ScheduleState::new(self.config.capture, items.peek().is_none());
        let mut in_flight = FuturesUnordered::new();

        trace!(limit, capture = %self.config.capture, "detect started");

        loop {
            if state.is_drained() {
                if let Some(outcome) = state.settle() {
                    return outcome;
                }
                unreachable!("detector settled twice");
            }

            while state.can_dispatch(limit) {
                let Some(item) = items.next() else {
                    state.mark_exhausted();
                    break;
                };
                let index = state.dispatch(items.peek().is_none());
                let evaluation = predicate(&item, index);
                in_flight.push(async move { (index, item, evaluation.await) });
            }
            debug_assert_eq!(in_flight.len(), state.in_flight);

            let Some((index, item, outcome)) = in_flight.next().await else {
                continue;
            };
            state.resolve(index, item, outcome);
        }
    }

    /// [`detect`](Self::detect) for predicates that cannot fail.
    pub async fn detect_infallible<I, T, F, Fut>(
        &self,
        items: I,
        mut predicate: F,
        concurrency: Option<usize>,
    ) -> Option<T>
    where
        I: IntoIterator<Item = T>,
        F: FnMut(&T, usize) -> Fut,
        Fut: Future<Output = bool>,
    {
        let found = self
            .detect(
                items,
                |item: &T, index| predicate(item, index).map(Ok::<bool, Infallible>),
                concurrency,
            )
            .await;

        match found {
            Ok(found) => found,
            Err(never) => match never {},
        }
    }
}

/// [`Detector::detect`] with the default configuration.
pub async fn detect<I, T, F, Fut, E>(
    items: I,
    predicate: F,
    concurrency: Option<usize>,
) -> Result<Option<T>, E>
where
    I: IntoIterator<Item = T>,
    F: FnMut(&T, usize) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    Detector::default()
        .detect(items, predicate, concurrency)
        .await
}

/// [`Detector::detect_infallible`] with the default configuration.
pub async fn detect_infallible<I, T, F, Fut>(
    items: I,
    predicate: F,
    concurrency: Option<usize>,
) -> Option<T>
where
    I: IntoIterator<Item = T>,
    F: FnMut(&T, usize) -> Fut,
    Fut: Future<Output = bool>,
{
    Detector::default()
        .detect_infallible(items, predicate, concurrency)
        .await
}

/// Bookkeeping for one `detect` call. Never shared or reused.
struct ScheduleState<T, E> {
    /// Index of the next item to dispatch.
    cursor: usize,
    in_flight: usize,
    exhausted: bool,
    /// No further dispatch: exhausted, matched or failed.
    stopped: bool,
    settled: bool,
    capture: CapturePolicy,
    captured_error: Option<E>,
    captured_match: Option<T>,
}

impl<T, E> ScheduleState<T, E> {
    fn new(capture: CapturePolicy, empty: bool) -> Self {
        Self {
            cursor: 0,
            in_flight: 0,
            exhausted: empty,
            stopped: empty,
            settled: false,
            capture,
            captured_error: None,
            captured_match: None,
        }
    }

    fn is_drained(&self) -> bool {
        self.in_flight == 0 && self.stopped
    }

    fn can_dispatch(&self, limit: usize) -> bool {
        if self.settled {
            error!(
                cursor = self.cursor,
                "dispatch attempted after the detector settled; review the predicate's async code"
            );
            return false;
        }
        !self.stopped && self.in_flight < limit
    }

    /// Claim the next index. `last` marks the sequence exhausted.
    fn dispatch(&mut self, last: bool) -> usize {
        let index = self.cursor;
        self.cursor += 1;
        self.in_flight += 1;
        trace!(index, in_flight = self.in_flight, "dispatched");
        if last {
            self.mark_exhausted();
        }
        index
    }

    fn mark_exhausted(&mut self) {
        self.exhausted = true;
        self.stopped = true;
    }

    fn resolve(&mut self, index: usize, item: T, outcome: Result<bool, E>) {
        self.in_flight -= 1;
        let keep_first = self.capture == CapturePolicy::FirstWins;

        match outcome {
            Ok(true) => {
                if self.captured_match.is_none() {
                    self.captured_match = Some(item);
                } else if keep_first {
                    trace!(index, "later match ignored");
                } else {
                    debug!(index, "later match replaces captured match");
                    self.captured_match = Some(item);
                }
                self.stop(index, "match");
            }
            Ok(false) => trace!(index, in_flight = self.in_flight, "no match"),
            Err(err) => {
                if self.captured_error.is_none() {
                    self.captured_error = Some(err);
                } else if keep_first {
                    trace!(index, "later failure dropped");
                } else {
                    debug!(index, "later failure replaces captured failure");
                    self.captured_error = Some(err);
                }
                self.stop(index, "failure");
            }
        }
    }

    fn stop(&mut self, index: usize, reason: &'static str) {
        if !self.stopped {
            debug!(
                index,
                reason,
                dispatched = self.cursor,
                in_flight = self.in_flight,
                "stopping dispatch"
            );
        }
        self.stopped = true;
    }

    /// One-shot: the second call logs and yields `None`.
    fn settle(&mut self) -> Option<Result<Option<T>, E>> {
        if self.settled {
            error!(
                cursor = self.cursor,
                "detector reached settlement twice; keeping the first outcome"
            );
            return None;
        }
        self.settled = true;

        debug!(
            dispatched = self.cursor,
            exhausted = self.exhausted,
            matched = self.captured_match.is_some(),
            failed = self.captured_error.is_some(),
            "settled"
        );

        Some(match self.captured_error.take() {
            Some(err) => Err(err),
            None => Ok(self.captured_match.take()),
        })
    }
}
