/*
 *  coordinator/mod.rs
 *
 *  vestamon - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Display coordinator - poll loop, persistent and temporary layering,
 *  quiet hours and expiration driven reversion
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

pub mod quiet;
pub mod state;

use log::{debug, error, info, warn};
use std::sync::{Arc, Weak};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex as TokMutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::device::{BoardDevice, DeviceError, WriteOptions};
use crate::grid::CharacterGrid;
use crate::render::Renderer;

pub use quiet::{Clock, ManualClock, QuietHours, SystemClock};
pub use state::{BoardSnapshot, DisplayState, TemporaryOverlay};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// Poll failed; the next tick retries.
    #[error("failed to read board: {0}")]
    UpdateFailed(DeviceError),
    /// Credential rejected or no data; polling again will not help.
    #[error("board authentication failed: {0}")]
    AuthFailed(String),
    #[error("failed to write board: {0}")]
    WriteFailed(DeviceError),
}

impl CoordinatorError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, CoordinatorError::AuthFailed(_))
    }
}

/// What became of a write request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Sent to the board.
    Written,
    /// Recorded as the baseline; shown once the temporary message ends.
    Deferred,
    /// Dropped inside quiet hours.
    Suppressed,
}

/// Everything guarded by the coordinator's single lock.
#[derive(Debug, Default)]
struct Layering {
    display: DisplayState,
    persistent: Option<CharacterGrid>,
    temporary: Option<TemporaryOverlay>,
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

impl Layering {
    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

/// Owner of one board: serializes its I/O and keeps its layering state.
pub struct Coordinator<D: BoardDevice> {
    id: String,
    device: D,
    renderer: Renderer,
    quiet_hours: Option<QuietHours>,
    clock: Arc<dyn Clock>,
    request_timeout: Duration,
    inner: TokMutex<Layering>,
    snapshot_tx: watch::Sender<BoardSnapshot>,
    weak_self: Weak<Self>,
}

impl<D: BoardDevice + 'static> Coordinator<D> {
    pub fn new(id: &str, device: D, renderer: Renderer) -> Arc<Self> {
        Self::builder(id, device, renderer).build()
    }

    pub fn builder(id: &str, device: D, renderer: Renderer) -> CoordinatorBuilder<D> {
        CoordinatorBuilder {
            id: id.to_string(),
            device,
            renderer,
            quiet_hours: None,
            clock: Arc::new(SystemClock),
            request_timeout: crate::device::local::DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn quiet_hours(&self) -> Option<QuietHours> {
        self.quiet_hours
    }

    /// Whether writes are currently being dropped.
    pub fn in_quiet_hours(&self) -> bool {
        self.quiet_hours
            .is_some_and(|q| q.contains(self.clock.now().time()))
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<BoardSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Latest persistent baseline.
    pub async fn persistent(&self) -> Option<CharacterGrid> {
        self.inner.lock().await.persistent.clone()
    }

    /// One poll tick: lazy expiration, then read the board.
    /// Returns whether the observed grid changed.
    pub async fn refresh(&self) -> Result<bool, CoordinatorError> {
        let mut inner = self.inner.lock().await;

        if inner.temporary.as_ref().is_some_and(|t| !t.is_live(Instant::now())) {
            debug!("[{}] temporary message overdue, expiring on poll", self.id);
            inner.cancel_timer();
            self.end_temporary(&mut inner).await;
        }

        let grid = match tokio::time::timeout(self.request_timeout, self.device.read_message()).await {
            Err(_) => return Err(CoordinatorError::UpdateFailed(DeviceError::Timeout)),
            Ok(Err(e)) if e.is_auth() => return Err(CoordinatorError::AuthFailed(e.to_string())),
            Ok(Err(e)) => return Err(CoordinatorError::UpdateFailed(e)),
            Ok(Ok(None)) => {
                return Err(CoordinatorError::AuthFailed("board returned no message".into()));
            }
            Ok(Ok(Some(grid))) => grid,
        };

        if inner.persistent.is_none() {
            debug!("[{}] adopting current board as persistent baseline", self.id);
            inner.persistent = Some(grid.clone());
        }

        let changed = inner.display.observe(grid, &self.renderer, self.clock.now());
        if changed {
            debug!("[{}] board changed", self.id);
            self.publish(&inner);
        }
        Ok(changed)
    }

    /// Set the persistent baseline, writing it now unless a live temporary
    /// message is showing.
    pub async fn write_persistent(
        &self,
        grid: CharacterGrid,
        options: Option<&WriteOptions>,
    ) -> Result<WriteOutcome, CoordinatorError> {
        if self.in_quiet_hours() {
            info!("[{}] quiet hours, dropping persistent message", self.id);
            return Ok(WriteOutcome::Suppressed);
        }

        let mut inner = self.inner.lock().await;
        inner.persistent = Some(grid.clone());

        match inner.temporary.as_ref().map(|t| t.is_live(Instant::now())) {
            Some(true) => {
                info!("[{}] temporary message showing, persistent message deferred", self.id);
                return Ok(WriteOutcome::Deferred);
            }
            Some(false) => {
                // overdue, the timer just has not run yet
                inner.cancel_timer();
                inner.temporary = None;
            }
            None => {}
        }

        self.write_and_observe(&mut inner, &grid, options).await?;
        info!("[{}] persistent message written", self.id);
        Ok(WriteOutcome::Written)
    }

    /// Show `grid` for `duration`, then revert to the persistent baseline.
    /// Replaces any temporary message already showing.
    pub async fn write_temporary(
        &self,
        grid: CharacterGrid,
        duration: Duration,
        options: Option<&WriteOptions>,
    ) -> Result<WriteOutcome, CoordinatorError> {
        if self.in_quiet_hours() {
            info!("[{}] quiet hours, dropping temporary message", self.id);
            return Ok(WriteOutcome::Suppressed);
        }

        let mut inner = self.inner.lock().await;
        self.write_and_observe(&mut inner, &grid, options).await?;

        inner.cancel_timer();
        inner.generation += 1;
        let generation = inner.generation;
        let deadline = Instant::now() + duration;
        let now = self.clock.now();
        let expires_at = chrono::Duration::from_std(duration)
            .ok()
            .and_then(|d| now.checked_add_signed(d))
            .unwrap_or(now);

        inner.temporary = Some(TemporaryOverlay {
            grid,
            deadline,
            expires_at,
            generation,
        });
        inner.timer = Some(self.arm_timer(deadline, generation));
        self.publish(&inner);

        info!("[{}] temporary message written, expires {}", self.id, expires_at.format("%H:%M:%S"));
        Ok(WriteOutcome::Written)
    }

    /// End the temporary message now. Returns whether one was active.
    pub async fn clear_temporary(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.temporary.is_none() {
            return false;
        }
        info!("[{}] temporary message cleared", self.id);
        inner.cancel_timer();
        self.end_temporary(&mut inner).await
    }

    /// End the temporary message if its deadline has passed.
    /// Safe to call any number of times.
    pub async fn expire(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if !inner.temporary.as_ref().is_some_and(|t| !t.is_live(Instant::now())) {
            return false;
        }
        inner.cancel_timer();
        self.end_temporary(&mut inner).await
    }

    /// Timer path: only the overlay the timer was armed for may be ended.
    async fn expire_generation(&self, generation: u64) {
        let mut inner = self.inner.lock().await;
        if inner.temporary.as_ref().map(|t| t.generation) != Some(generation) {
            debug!("[{}] stale expiration timer {} ignored", self.id, generation);
            return;
        }
        // this task is the timer, detach rather than abort it
        inner.timer.take();
        debug!("[{}] temporary message expired", self.id);
        self.end_temporary(&mut inner).await;
    }

    /// Clear the overlay and restore the baseline. Quiet hours do not apply.
    async fn end_temporary(&self, inner: &mut Layering) -> bool {
        if inner.temporary.take().is_none() {
            return false;
        }
        if let Some(baseline) = inner.persistent.clone() {
            if let Err(e) = self.write_and_observe(inner, &baseline, None).await {
                error!("[{}] failed to restore persistent message: {}", self.id, e);
            }
        }
        self.publish(inner);
        true
    }

    fn arm_timer(&self, deadline: Instant, generation: u64) -> JoinHandle<()> {
        let weak = self.weak_self.clone();
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if let Some(coordinator) = weak.upgrade() {
                coordinator.expire_generation(generation).await;
            }
        })
    }

    async fn write_and_observe(
        &self,
        inner: &mut Layering,
        grid: &CharacterGrid,
        options: Option<&WriteOptions>,
    ) -> Result<(), CoordinatorError> {
        match tokio::time::timeout(self.request_timeout, self.device.write_message(grid, options)).await {
            Err(_) => return Err(CoordinatorError::WriteFailed(DeviceError::Timeout)),
            Ok(Err(e)) if e.is_auth() => return Err(CoordinatorError::AuthFailed(e.to_string())),
            Ok(Err(e)) => return Err(CoordinatorError::WriteFailed(e)),
            Ok(Ok(())) => {}
        }
        inner.display.observe(grid.clone(), &self.renderer, self.clock.now());
        self.publish(inner);
        Ok(())
    }

    fn publish(&self, inner: &Layering) {
        self.snapshot_tx
            .send_replace(BoardSnapshot::new(&inner.display, inner.temporary.as_ref()));
    }

    /// Poll until stopped. Returns early only on an authentication failure.
    pub async fn run(
        self: Arc<Self>,
        interval: Duration,
        mut stop_rx: mpsc::Receiver<()>,
    ) -> Result<(), CoordinatorError> {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut failures: u32 = 0;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.refresh().await {
                        Ok(_) => {
                            if failures > 0 {
                                info!("[{}] board reachable again after {} failed polls", self.id, failures);
                                failures = 0;
                            }
                        }
                        Err(e) if e.is_retryable() => {
                            failures += 1;
                            warn!("[{}] poll failed ({} in a row): {}", self.id, failures, e);
                        }
                        Err(e) => {
                            error!("[{}] polling stopped: {}", self.id, e);
                            return Err(e);
                        }
                    }
                }
                _ = stop_rx.recv() => {
                    info!("[{}] polling received stop signal. Exiting.", self.id);
                    break;
                }
            }
        }
        Ok(())
    }

    /// Spawn `run` in the background.
    pub fn start_polling(self: &Arc<Self>, interval: Duration) -> Poller {
        let (stop_tx, stop_rx) = mpsc::channel(1);
        let handle = tokio::spawn(Arc::clone(self).run(interval, stop_rx));
        Poller {
            id: self.id.clone(),
            stop_sender: Some(stop_tx),
            handle: Some(handle),
        }
    }
}

impl<D: BoardDevice> Drop for Coordinator<D> {
    fn drop(&mut self) {
        if let Some(timer) = self.inner.get_mut().timer.take() {
            timer.abort();
        }
    }
}

/// Handle on a background poll loop.
pub struct Poller {
    id: String,
    stop_sender: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<Result<(), CoordinatorError>>>,
}

impl Poller {
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Stop the loop and wait for it, returning how it ended.
    pub async fn stop(&mut self) -> Result<(), CoordinatorError> {
        if let Some(sender) = self.stop_sender.take() {
            // already gone if the loop ended by itself
            let _ = sender.send(()).await;
        }
        let result = match self.handle.take() {
            Some(handle) => handle.await.unwrap_or_else(|e| {
                error!("[{}] polling task failed to join: {}", self.id, e);
                Ok(())
            }),
            None => Ok(()),
        };
        debug!("[{}] polling stopped", self.id);
        result
    }
}

pub struct CoordinatorBuilder<D> {
    id: String,
    device: D,
    renderer: Renderer,
    quiet_hours: Option<QuietHours>,
    clock: Arc<dyn Clock>,
    request_timeout: Duration,
}

impl<D: BoardDevice + 'static> CoordinatorBuilder<D> {
    pub fn quiet_hours(mut self, quiet_hours: Option<QuietHours>) -> Self {
        self.quiet_hours = quiet_hours;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn build(self) -> Arc<Coordinator<D>> {
        let (snapshot_tx, _) = watch::channel(BoardSnapshot::default());
        Arc::new_cyclic(|weak_self| Coordinator {
            id: self.id,
            device: self.device,
            renderer: self.renderer,
            quiet_hours: self.quiet_hours,
            clock: self.clock,
            request_timeout: self.request_timeout,
            inner: TokMutex::new(Layering::default()),
            snapshot_tx,
            weak_self: weak_self.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MockBoard;
    use crate::model::NOTE;
    use crate::render::ImageFormat;
    use chrono::{Local, NaiveTime, TimeZone};

    fn grid(code: i32) -> CharacterGrid {
        CharacterGrid::filled(3, 15, code)
    }

    fn coordinator(board: &MockBoard) -> Arc<Coordinator<MockBoard>> {
        Coordinator::new("test", board.clone(), Renderer::new(&NOTE, ImageFormat::Svg, 0))
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_poll_seeds_baseline() {
        let board = MockBoard::showing(grid(1));
        let coord = coordinator(&board);

        assert!(coord.refresh().await.unwrap());
        assert_eq!(coord.persistent().await, Some(grid(1)));
        assert!(coord.snapshot().message.starts_with("AAAAAAAAAAAAAAA"));

        // unchanged board does not re-render
        let stamp = coord.snapshot().last_updated;
        assert!(!coord.refresh().await.unwrap());
        assert_eq!(coord.snapshot().last_updated, stamp);

        // later polls never move the baseline
        board.set_current(grid(2));
        assert!(coord.refresh().await.unwrap());
        assert_eq!(coord.persistent().await, Some(grid(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_failures_are_classified() {
        let board = MockBoard::showing(grid(1));
        let coord = coordinator(&board);

        board.set_fail_reads(true);
        let err = coord.refresh().await.unwrap_err();
        assert!(matches!(err, CoordinatorError::UpdateFailed(_)));
        assert!(err.is_retryable());
        board.set_fail_reads(false);

        board.set_empty_reads(true);
        assert!(matches!(coord.refresh().await, Err(CoordinatorError::AuthFailed(_))));
        board.set_empty_reads(false);

        board.set_unauthorized(true);
        assert!(!coord.refresh().await.unwrap_err().is_retryable());
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_write_updates_state_in_lock_step() {
        let board = MockBoard::showing(grid(1));
        let coord = coordinator(&board);
        let mut rx = coord.subscribe();

        let outcome = coord.write_persistent(grid(5), None).await.unwrap();
        assert_eq!(outcome, WriteOutcome::Written);
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().data, Some(grid(5)));
        assert_eq!(board.writes(), vec![grid(5)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_temporary_reverts_after_duration() {
        let board = MockBoard::showing(grid(1));
        let coord = coordinator(&board);
        coord.refresh().await.unwrap();

        coord.write_temporary(grid(2), Duration::from_secs(30), None).await.unwrap();
        let snap = coord.snapshot();
        assert_eq!(snap.data, Some(grid(2)));
        assert!(snap.temporary_active);
        assert!(snap.temporary_expiration.is_some());

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(board.writes(), vec![grid(2), grid(1)]);
        let snap = coord.snapshot();
        assert_eq!(snap.data, Some(grid(1)));
        assert!(!snap.temporary_active);
        assert_eq!(snap.temporary_expiration, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_temporary_preempts_old_timer() {
        let board = MockBoard::showing(grid(1));
        let coord = coordinator(&board);
        coord.refresh().await.unwrap();

        coord.write_temporary(grid(2), Duration::from_secs(20), None).await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
        coord.write_temporary(grid(3), Duration::from_secs(60), None).await.unwrap();

        // first timer's deadline passes without effect
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(board.current(), Some(grid(3)));
        assert!(coord.snapshot().temporary_active);

        tokio::time::sleep(Duration::from_secs(41)).await;
        assert_eq!(board.writes(), vec![grid(2), grid(3), grid(1)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_temporary() {
        let board = MockBoard::showing(grid(1));
        let coord = coordinator(&board);
        coord.refresh().await.unwrap();

        assert!(!coord.clear_temporary().await);
        coord.write_temporary(grid(2), Duration::from_secs(600), None).await.unwrap();
        assert!(coord.clear_temporary().await);
        assert_eq!(board.current(), Some(grid(1)));

        // the aborted timer never fires a second reversion
        tokio::time::sleep(Duration::from_secs(601)).await;
        assert_eq!(board.write_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reversion_failure_still_clears_overlay() {
        let board = MockBoard::showing(grid(1));
        let coord = coordinator(&board);
        coord.refresh().await.unwrap();
        coord.write_temporary(grid(2), Duration::from_secs(10), None).await.unwrap();

        board.set_fail_writes(true);
        tokio::time::sleep(Duration::from_secs(11)).await;
        assert!(!coord.snapshot().temporary_active);
        assert_eq!(board.current(), Some(grid(2)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_temporary_write_keeps_previous_overlay() {
        let board = MockBoard::showing(grid(1));
        let coord = coordinator(&board);
        coord.refresh().await.unwrap();
        coord.write_temporary(grid(2), Duration::from_secs(30), None).await.unwrap();

        board.set_fail_writes(true);
        let err = coord.write_temporary(grid(3), Duration::from_secs(60), None).await;
        assert!(matches!(err, Err(CoordinatorError::WriteFailed(_))));
        board.set_fail_writes(false);

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(board.writes(), vec![grid(2), grid(1)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quiet_hours_suppress_writes_but_not_reversion() {
        let board = MockBoard::showing(grid(1));
        let noon = Local.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(noon));
        let quiet = QuietHours::new(
            NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
        );
        let coord = Coordinator::builder("quiet", board.clone(), Renderer::new(&NOTE, ImageFormat::Svg, 0))
            .quiet_hours(quiet)
            .clock(clock.clone())
            .build();
        coord.refresh().await.unwrap();

        coord.write_temporary(grid(2), Duration::from_secs(60), None).await.unwrap();

        clock.set(Local.with_ymd_and_hms(2026, 3, 1, 23, 0, 0).unwrap());
        assert!(coord.in_quiet_hours());
        assert_eq!(
            coord.write_persistent(grid(4), None).await.unwrap(),
            WriteOutcome::Suppressed
        );
        assert_eq!(
            coord.write_temporary(grid(5), Duration::from_secs(10), None).await.unwrap(),
            WriteOutcome::Suppressed
        );
        assert_eq!(coord.persistent().await, Some(grid(1)));

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(board.writes(), vec![grid(2), grid(1)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overdue_overlay_does_not_defer_persistent_write() {
        let board = MockBoard::showing(grid(1));
        let coord = coordinator(&board);
        coord.refresh().await.unwrap();
        coord.write_temporary(grid(2), Duration::from_secs(10), None).await.unwrap();

        // deadline passes before the timer gets to run
        coord.inner.lock().await.cancel_timer();
        tokio::time::advance(Duration::from_secs(11)).await;

        let outcome = coord.write_persistent(grid(6), None).await.unwrap();
        assert_eq!(outcome, WriteOutcome::Written);
        assert_eq!(board.writes(), vec![grid(2), grid(6)]);
        assert!(!coord.snapshot().temporary_active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_auth_failure() {
        let board = MockBoard::showing(grid(1));
        let coord = coordinator(&board);
        let mut poller = coord.start_polling(Duration::from_secs(15));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(coord.snapshot().data, Some(grid(1)));

        board.set_unauthorized(true);
        tokio::time::sleep(Duration::from_secs(16)).await;
        assert!(poller.is_finished());
        assert!(matches!(poller.stop().await, Err(CoordinatorError::AuthFailed(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_survives_transient_failures_and_stops() {
        let board = MockBoard::showing(grid(1));
        let coord = coordinator(&board);
        board.set_fail_reads(true);
        let mut poller = coord.start_polling(Duration::from_secs(15));

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(!poller.is_finished());
        assert_eq!(board.state().read_count, 3);

        board.set_fail_reads(false);
        tokio::time::sleep(Duration::from_secs(15)).await;
        assert_eq!(coord.snapshot().data, Some(grid(1)));

        assert!(poller.stop().await.is_ok());
    }
}
