//! Cancelable timer slots owned by each session. Cancellation aborts the
//! underlying task; aborting a finished or already-aborted task is a no-op,
//! which gives every cancel path the required idempotence.

use std::sync::Mutex;

use tokio::task::JoinHandle;

/// Handle to one armed timer task.
#[derive(Debug)]
pub struct TimerHandle {
    task: JoinHandle<()>,
}

impl TimerHandle {
    /// Wrap a spawned timer task.
    pub fn new(task: JoinHandle<()>) -> Self {
        Self { task }
    }

    /// Whether the timer is still pending (neither fired nor canceled).
    pub fn is_pending(&self) -> bool {
        !self.task.is_finished()
    }

    /// Cancel the timer. Safe to call on fired or canceled timers.
    pub fn cancel(&self) {
        self.task.abort();
    }
}

/// The two timer families owned by one session, plus the generation deadline
/// armed alongside the poll timer. Arming a slot always cancels its previous
/// occupant first, so at most one timer per slot is ever pending.
#[derive(Debug, Default)]
pub struct TimerBank {
    question: Mutex<Option<TimerHandle>>,
    poll: Mutex<Option<TimerHandle>>,
    generation_timeout: Mutex<Option<TimerHandle>>,
}

impl TimerBank {
    /// Create an empty bank with nothing armed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the question timer, canceling any previous one. The slot also
    /// carries the inter-question delay between two questions.
    pub fn arm_question(&self, handle: TimerHandle) {
        Self::arm(&self.question, handle);
    }

    /// Arm the repeating generation progress poll.
    pub fn arm_poll(&self, handle: TimerHandle) {
        Self::arm(&self.poll, handle);
    }

    /// Arm the one-shot generation timeout.
    pub fn arm_generation_timeout(&self, handle: TimerHandle) {
        Self::arm(&self.generation_timeout, handle);
    }

    /// Cancel the question timer, if armed.
    pub fn cancel_question(&self) {
        Self::cancel_slot(&self.question);
    }

    /// Cancel the poll timer, if armed.
    pub fn cancel_poll(&self) {
        Self::cancel_slot(&self.poll);
    }

    /// Cancel the generation timeout, if armed.
    pub fn cancel_generation_timeout(&self) {
        Self::cancel_slot(&self.generation_timeout);
    }

    /// Cancel every timer in the bank. Total: safe to call repeatedly and at
    /// any point of the session lifecycle.
    pub fn cancel_all(&self) {
        self.cancel_question();
        self.cancel_poll();
        self.cancel_generation_timeout();
    }

    /// Whether a question timer is currently pending.
    pub fn question_armed(&self) -> bool {
        Self::slot_pending(&self.question)
    }

    /// Whether the progress poll is currently pending.
    pub fn poll_armed(&self) -> bool {
        Self::slot_pending(&self.poll)
    }

    fn arm(slot: &Mutex<Option<TimerHandle>>, handle: TimerHandle) {
        let mut guard = slot.lock().expect("timer slot lock poisoned");
        if let Some(previous) = guard.replace(handle) {
            previous.cancel();
        }
    }

    fn cancel_slot(slot: &Mutex<Option<TimerHandle>>) {
        let guard = slot.lock().expect("timer slot lock poisoned");
        if let Some(handle) = guard.as_ref() {
            handle.cancel();
        }
    }

    fn slot_pending(slot: &Mutex<Option<TimerHandle>>) -> bool {
        let guard = slot.lock().expect("timer slot lock poisoned");
        guard.as_ref().is_some_and(TimerHandle::is_pending)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::sleep;

    use super::*;

    fn pending_timer() -> TimerHandle {
        TimerHandle::new(tokio::spawn(async {
            sleep(Duration::from_secs(3600)).await;
        }))
    }

    #[tokio::test]
    async fn cancel_twice_is_a_no_op() {
        let bank = TimerBank::new();
        bank.arm_question(pending_timer());
        bank.cancel_question();
        bank.cancel_question();
        sleep(Duration::from_millis(10)).await;
        assert!(!bank.question_armed());
    }

    #[tokio::test]
    async fn cancel_unarmed_slot_is_a_no_op() {
        let bank = TimerBank::new();
        bank.cancel_poll();
        bank.cancel_all();
        assert!(!bank.poll_armed());
    }

    #[tokio::test]
    async fn rearming_cancels_the_previous_timer() {
        let bank = TimerBank::new();
        bank.arm_question(pending_timer());
        bank.arm_question(pending_timer());

        // Only the replacement remains pending.
        assert!(bank.question_armed());
        bank.cancel_all();
        sleep(Duration::from_millis(10)).await;
        assert!(!bank.question_armed());
    }

    #[tokio::test]
    async fn cancel_after_fire_is_a_no_op() {
        let bank = TimerBank::new();
        bank.arm_question(TimerHandle::new(tokio::spawn(async {})));
        sleep(Duration::from_millis(10)).await;
        assert!(!bank.question_armed());
        bank.cancel_question();
    }
}
