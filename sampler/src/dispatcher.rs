//! Tick dispatcher.
//!
//! A fixed-period timer calls [`TickDispatcher::tick`]; every task that
//! subscribed gets one release per tick and waits for it with
//! [`TickSubscription::wait`]. The tick itself does no work besides
//! queueing the releases, so it can be called from an interrupt handler.
//!
//! Releases are counted, not coalesced: each subscription owns a queue of
//! [`TICK_BACKLOG`] releases, so a task that was busy when the tick fired
//! still sees that tick later. Only when the queue is full is the release
//! dropped, and then it is counted as a missed tick.

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use embassy_futures::select::{Either, select};
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel, signal::Signal};
use embassy_time::{Duration, Ticker};

use crate::error::ConfigError;

/// Releases a subscription can have queued before ticks are dropped.
pub const TICK_BACKLOG: usize = 4;

/// Asks a long running task to return.
pub type StopSignal = Signal<CriticalSectionRawMutex, ()>;

type Releases = Channel<CriticalSectionRawMutex, (), TICK_BACKLOG>;

/// What woke a task up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Wake {
    Release,
    Stop,
}

/// Releases up to `N` subscribed tasks once per tick.
pub struct TickDispatcher<const N: usize> {
    period_us: AtomicU32,
    running: AtomicBool,
    subscribers: AtomicUsize,
    ticks: AtomicU32,
    releases: [Releases; N],
    missed: [AtomicU32; N],
}

impl<const N: usize> TickDispatcher<N> {
    /// Creates a stopped dispatcher.
    ///
    /// # Panics
    ///
    /// If `period` is zero or longer than `u32::MAX` microseconds. In a
    /// `static` this fails the build instead.
    pub const fn new(period: Duration) -> Self {
        let micros = period.as_micros();
        assert!(micros > 0 && micros <= u32::MAX as u64, "invalid tick period");
        TickDispatcher {
            period_us: AtomicU32::new(micros as u32),
            running: AtomicBool::new(false),
            subscribers: AtomicUsize::new(0),
            ticks: AtomicU32::new(0),
            releases: [const { Channel::new() }; N],
            missed: [const { AtomicU32::new(0) }; N],
        }
    }

    /// Sets the tick period. A running [`TickDispatcher::run`] picks the
    /// new period up after its next tick.
    pub fn configure(&self, period: Duration) -> Result<(), ConfigError> {
        let micros = period.as_micros();
        if micros == 0 {
            return Err(ConfigError::ZeroPeriod);
        }
        let micros = u32::try_from(micros).map_err(|_| ConfigError::PeriodTooLong)?;
        self.period_us.store(micros, Ordering::Relaxed);
        debug!("tick period set to {} us", micros);
        Ok(())
    }

    pub fn period(&self) -> Duration {
        Duration::from_micros(self.period_us.load(Ordering::Relaxed) as u64)
    }

    pub fn start(&self) {
        self.running.store(true, Ordering::Release);
    }

    /// Ticks that arrive while stopped release nobody.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Hands out the next free subscription, `None` once `N` are taken.
    pub fn subscribe(&self) -> Option<TickSubscription<'_>> {
        let index = self
            .subscribers
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |taken| {
                (taken < N).then_some(taken + 1)
            })
            .ok()?;
        Some(TickSubscription {
            index,
            releases: &self.releases[index],
            missed: &self.missed[index],
        })
    }

    /// Releases every subscription once.
    ///
    /// Never blocks, so it is safe to call from an interrupt handler.
    pub fn tick(&self) {
        if !self.is_running() {
            return;
        }
        self.ticks.fetch_add(1, Ordering::Relaxed);

        let live = self.subscribers.load(Ordering::Acquire);
        for (index, (releases, missed)) in self
            .releases
            .iter()
            .zip(self.missed.iter())
            .take(live)
            .enumerate()
        {
            if releases.try_send(()).is_err() {
                let total = missed.fetch_add(1, Ordering::Relaxed) + 1;
                warn!("subscriber {} missed a tick ({} so far)", index, total);
            }
        }
    }

    /// Ticks delivered while running.
    pub fn ticks(&self) -> u32 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Releases dropped across all subscriptions.
    pub fn missed_ticks(&self) -> u32 {
        self.missed
            .iter()
            .map(|missed| missed.load(Ordering::Relaxed))
            .fold(0, u32::wrapping_add)
    }

    /// Timer tick source: calls [`TickDispatcher::tick`] once per period
    /// until `stop` is signalled.
    pub async fn run(&self, stop: &StopSignal) {
        let mut period = self.period();
        let mut ticker = Ticker::every(period);
        info!("tick source running every {} us", period.as_micros());

        loop {
            match select(ticker.next(), stop.wait()).await {
                Either::First(()) => self.tick(),
                Either::Second(()) => break,
            }

            let configured = self.period();
            if configured != period {
                period = configured;
                ticker = Ticker::every(period);
            }
        }

        info!("tick source stopped");
    }
}

/// One task's share of the ticks.
pub struct TickSubscription<'a> {
    index: usize,
    releases: &'a Releases,
    missed: &'a AtomicU32,
}

impl TickSubscription<'_> {
    /// Position of this subscription in the dispatcher.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Waits for the next release and consumes it.
    pub async fn next(&self) {
        self.releases.receive().await
    }

    /// Consumes a queued release, if any, without waiting.
    pub fn try_next(&self) -> bool {
        self.releases.try_receive().is_ok()
    }

    /// Waits for the next release or for `stop`, whichever comes first.
    pub async fn wait(&self, stop: &StopSignal) -> Wake {
        match select(self.next(), stop.wait()).await {
            Either::First(()) => Wake::Release,
            Either::Second(()) => Wake::Stop,
        }
    }

    /// Releases queued and not consumed yet.
    pub fn pending(&self) -> usize {
        self.releases.len()
    }

    /// Releases this subscription lost because its queue was full.
    pub fn missed(&self) -> u32 {
        self.missed.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use embassy_futures::{block_on, join::join};

    use super::*;

    #[test]
    fn subscriptions_are_limited() {
        let dispatcher: TickDispatcher<2> = TickDispatcher::new(Duration::from_millis(2));
        assert_eq!(dispatcher.subscribe().map(|s| s.index()), Some(0));
        assert_eq!(dispatcher.subscribe().map(|s| s.index()), Some(1));
        assert!(dispatcher.subscribe().is_none());
    }

    #[test]
    fn stopped_dispatcher_releases_nobody() {
        let dispatcher: TickDispatcher<1> = TickDispatcher::new(Duration::from_secs(1));
        let subscription = dispatcher.subscribe().unwrap();

        dispatcher.tick();
        assert_eq!(subscription.pending(), 0);
        assert_eq!(dispatcher.ticks(), 0);

        dispatcher.start();
        dispatcher.tick();
        dispatcher.stop();
        dispatcher.tick();
        assert_eq!(subscription.pending(), 1);
        assert_eq!(dispatcher.ticks(), 1);
    }

    #[test]
    fn every_subscriber_gets_one_release_per_tick() {
        let dispatcher: TickDispatcher<3> = TickDispatcher::new(Duration::from_secs(1));
        let subscriptions = [
            dispatcher.subscribe().unwrap(),
            dispatcher.subscribe().unwrap(),
            dispatcher.subscribe().unwrap(),
        ];
        dispatcher.start();

        dispatcher.tick();
        for subscription in &subscriptions {
            assert!(subscription.try_next());
            assert!(!subscription.try_next());
        }
    }

    #[test]
    fn releases_accumulate_while_the_task_is_busy() {
        let dispatcher: TickDispatcher<1> = TickDispatcher::new(Duration::from_secs(1));
        let subscription = dispatcher.subscribe().unwrap();
        dispatcher.start();

        dispatcher.tick();
        dispatcher.tick();
        dispatcher.tick();

        assert_eq!(subscription.pending(), 3);
        block_on(subscription.next());
        block_on(subscription.next());
        block_on(subscription.next());
        assert!(!subscription.try_next());
        assert_eq!(subscription.missed(), 0);
    }

    #[test]
    fn full_backlog_counts_missed_ticks() {
        let dispatcher: TickDispatcher<2> = TickDispatcher::new(Duration::from_secs(1));
        let slow = dispatcher.subscribe().unwrap();
        let fast = dispatcher.subscribe().unwrap();
        dispatcher.start();

        for _ in 0..TICK_BACKLOG + 2 {
            dispatcher.tick();
            assert!(fast.try_next());
        }

        assert_eq!(slow.pending(), TICK_BACKLOG);
        assert_eq!(slow.missed(), 2);
        assert_eq!(fast.missed(), 0);
        assert_eq!(dispatcher.missed_ticks(), 2);
        assert_eq!(dispatcher.ticks(), TICK_BACKLOG as u32 + 2);
    }

    #[test]
    fn configure_rejects_bad_periods() {
        let dispatcher: TickDispatcher<1> = TickDispatcher::new(Duration::from_secs(1));
        assert_eq!(
            dispatcher.configure(Duration::from_ticks(0)),
            Err(ConfigError::ZeroPeriod)
        );
        assert_eq!(
            dispatcher.configure(Duration::from_secs(5000)),
            Err(ConfigError::PeriodTooLong)
        );
        assert_eq!(dispatcher.period(), Duration::from_secs(1));

        dispatcher.configure(Duration::from_millis(2)).unwrap();
        assert_eq!(dispatcher.period(), Duration::from_millis(2));
    }

    #[test]
    fn wait_returns_on_stop() {
        let dispatcher: TickDispatcher<1> = TickDispatcher::new(Duration::from_secs(1));
        let subscription = dispatcher.subscribe().unwrap();
        let stop = StopSignal::new();

        stop.signal(());
        assert_eq!(block_on(subscription.wait(&stop)), Wake::Stop);

        dispatcher.start();
        dispatcher.tick();
        assert_eq!(block_on(subscription.wait(&stop)), Wake::Release);
    }

    #[test]
    fn tick_source_runs_until_stopped() {
        let dispatcher: TickDispatcher<1> = TickDispatcher::new(Duration::from_millis(1));
        let subscription = dispatcher.subscribe().unwrap();
        let stop = StopSignal::new();
        dispatcher.start();

        block_on(join(dispatcher.run(&stop), async {
            for _ in 0..3 {
                subscription.next().await;
            }
            stop.signal(());
        }));

        assert!(dispatcher.ticks() >= 3);
    }
}
