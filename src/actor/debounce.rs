//! Rate limiting for refresh and animation triggers.
//!
//! A [`Debounced`] wraps a function so that a burst of calls results in at
//! most one invocation per quiet period, optionally one at the start of the
//! burst, and optionally at least one every `max_wait` while the burst lasts.
//! Timers are tokio tasks, so the wrapper must be used inside a runtime.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::AbortHandle;
use tokio::time::{Instant, sleep};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceOptions {
    pub wait: Duration,
    /// Invoke on the first call of a burst.
    pub leading: bool,
    /// Invoke once the burst has been quiet for `wait`.
    pub trailing: bool,
    pub max_wait: Option<Duration>,
}

impl DebounceOptions {
    pub fn new(wait: Duration) -> Self {
        Self {
            wait,
            leading: false,
            trailing: true,
            max_wait: None,
        }
    }

    pub fn leading(mut self, leading: bool) -> Self {
        self.leading = leading;
        self
    }

    pub fn trailing(mut self, trailing: bool) -> Self {
        self.trailing = trailing;
        self
    }

    pub fn max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }
}

impl Default for DebounceOptions {
    fn default() -> Self { Self::new(Duration::ZERO) }
}

pub struct Debounced<A, R> {
    shared: Arc<Mutex<Inner<A, R>>>,
}

impl<A, R> Clone for Debounced<A, R> {
    fn clone(&self) -> Self { Self { shared: Arc::clone(&self.shared) } }
}

struct Timer {
    generation: u64,
    handle: AbortHandle,
}

struct Inner<A, R> {
    func: Box<dyn FnMut(A) -> R + Send>,
    wait: Duration,
    leading: bool,
    trailing: bool,
    max_wait: Option<Duration>,

    last_args: Option<A>,
    last_call: Option<Instant>,
    last_invoke: Option<Instant>,
    result: Option<R>,
    timer: Option<Timer>,
    generation: u64,
}

impl<A, R> Debounced<A, R>
where
    A: Send + 'static,
    R: Clone + Send + 'static,
{
    /// `func` runs with the debouncer locked and must not call back into it.
    pub fn new<F>(func: F, options: DebounceOptions) -> Self
    where F: FnMut(A) -> R + Send + 'static {
        let inner = Inner {
            func: Box::new(func),
            wait: options.wait,
            leading: options.leading,
            trailing: options.trailing,
            max_wait: options.max_wait.map(|max| max.max(options.wait)),
            last_args: None,
            last_call: None,
            last_invoke: None,
            result: None,
            timer: None,
            generation: 0,
        };
        Self { shared: Arc::new(Mutex::new(inner)) }
    }

    /// Records a call with `args`. Returns the result of the most recent
    /// invocation, which is this call's only if it invoked immediately.
    pub fn call(&self, args: A) -> Option<R> {
        let now = Instant::now();
        let mut inner = self.shared.lock();
        let is_invoking = inner.should_invoke(now);
        inner.last_args = Some(args);
        inner.last_call = Some(now);

        let wait = inner.wait;
        if is_invoking {
            if inner.timer.is_none() {
                return inner.leading_edge(&self.shared, now);
            }
            if inner.max_wait.is_some() {
                // Continuous calls have hit the ceiling.
                inner.start_timer(&self.shared, wait);
                return inner.invoke(now);
            }
        }
        if inner.timer.is_none() {
            inner.start_timer(&self.shared, wait);
        }
        inner.result.clone()
    }

    /// Drops the pending invocation, if any, and forgets the current burst.
    pub fn cancel(&self) {
        let mut inner = self.shared.lock();
        inner.clear_timer();
        inner.last_args = None;
        inner.last_call = None;
        inner.last_invoke = None;
    }

    /// Runs the pending trailing invocation now. Without one, returns the
    /// last result.
    pub fn flush(&self) -> Option<R> {
        let mut inner = self.shared.lock();
        if inner.timer.is_none() {
            return inner.result.clone();
        }
        inner.clear_timer();
        inner.trailing_edge(Instant::now())
    }

    pub fn pending(&self) -> bool { self.shared.lock().timer.is_some() }
}

impl<A, R> Inner<A, R>
where
    A: Send + 'static,
    R: Clone + Send + 'static,
{
    fn since_invoke(&self, now: Instant) -> Duration {
        match self.last_invoke {
            Some(t) => now.saturating_duration_since(t),
            None => Duration::MAX,
        }
    }

    fn should_invoke(&self, now: Instant) -> bool {
        let Some(last_call) = self.last_call else {
            return true;
        };
        // Treat a clock that went backwards as the end of the burst.
        let Some(since_call) = now.checked_duration_since(last_call) else {
            return true;
        };
        since_call >= self.wait || self.max_wait.is_some_and(|max| self.since_invoke(now) >= max)
    }

    fn remaining_wait(&self, now: Instant) -> Duration {
        let since_call = self.last_call.map_or(Duration::ZERO, |t| now.saturating_duration_since(t));
        let waiting = self.wait.saturating_sub(since_call);
        match self.max_wait {
            Some(max) => waiting.min(max.saturating_sub(self.since_invoke(now))),
            None => waiting,
        }
    }

    fn invoke(&mut self, now: Instant) -> Option<R> {
        let args = self.last_args.take()?;
        self.last_invoke = Some(now);
        let result = (self.func)(args);
        self.result = Some(result.clone());
        Some(result)
    }

    fn leading_edge(&mut self, shared: &Arc<Mutex<Self>>, now: Instant) -> Option<R> {
        self.last_invoke = Some(now);
        let wait = self.wait;
        self.start_timer(shared, wait);
        if self.leading { self.invoke(now) } else { self.result.clone() }
    }

    fn trailing_edge(&mut self, now: Instant) -> Option<R> {
        self.timer = None;
        // Only invoke if there was a call since the last invocation.
        if self.trailing && self.last_args.is_some() {
            return self.invoke(now);
        }
        self.last_args = None;
        self.result.clone()
    }

    fn timer_expired(&mut self, generation: u64, now: Instant) -> Option<Duration> {
        if self.timer.as_ref().map(|t| t.generation) != Some(generation) {
            return None;
        }
        if self.should_invoke(now) {
            trace!("Debounce trailing edge");
            self.trailing_edge(now);
            return None;
        }
        Some(self.remaining_wait(now))
    }

    fn clear_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.handle.abort();
        }
    }

    fn start_timer(&mut self, shared: &Arc<Mutex<Self>>, delay: Duration) {
        self.clear_timer();
        self.generation += 1;
        let generation = self.generation;
        let weak = Arc::downgrade(shared);
        let task = tokio::spawn(async move {
            let mut delay = delay;
            loop {
                sleep(delay).await;
                let Some(shared) = weak.upgrade() else { return };
                let next = shared.lock().timer_expired(generation, Instant::now());
                match next {
                    Some(remaining) => delay = remaining,
                    None => return,
                }
            }
        });
        self.timer = Some(Timer { generation, handle: task.abort_handle() });
    }
}
