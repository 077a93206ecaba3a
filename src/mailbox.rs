use crate::model::Command;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Single-slot, last-write-wins channel from the input surface to the driver.
///
/// A posted command stays pending until the driver takes it; taking it is the
/// acknowledgment that input callers can wait on.
#[derive(Debug, Default)]
pub struct Mailbox {
    slot: Mutex<Command>,
    taken: Condvar,
}

impl Mailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces whatever is pending with `command`.
    pub fn post(&self, command: Command) {
        let mut slot = self.slot();
        *slot = command;
    }

    /// Returns the pending command and clears the slot.
    pub fn take_if_any(&self) -> Command {
        let mut slot = self.slot();
        let command = std::mem::take(&mut *slot);
        drop(slot);
        if !command.is_none() {
            self.taken.notify_all();
        }
        command
    }

    pub fn is_acknowledged(&self) -> bool {
        self.slot().is_none()
    }

    /// Blocks until the pending command has been taken or `timeout` passes.
    /// Returns `true` when the slot is empty.
    pub fn wait_acknowledged(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut slot = self.slot();
        while !slot.is_none() {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            slot = self
                .taken
                .wait_timeout(slot, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }

    fn slot(&self) -> MutexGuard<'_, Command> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn last_write_wins() {
        let mailbox = Mailbox::new();
        mailbox.post(Command::Next);
        mailbox.post(Command::SeekTo(40));
        assert_eq!(mailbox.take_if_any(), Command::SeekTo(40));
        assert_eq!(mailbox.take_if_any(), Command::None);
    }

    #[test]
    fn empty_mailbox_yields_none() {
        let mailbox = Mailbox::new();
        assert!(mailbox.is_acknowledged());
        assert_eq!(mailbox.take_if_any(), Command::None);
    }

    #[test]
    fn acknowledgment_tracks_slot() {
        let mailbox = Mailbox::new();
        mailbox.post(Command::Pause);
        assert!(!mailbox.is_acknowledged());
        assert!(!mailbox.wait_acknowledged(Duration::from_millis(5)));
        mailbox.take_if_any();
        assert!(mailbox.is_acknowledged());
    }

    #[test]
    fn waiter_wakes_when_command_is_taken() {
        let mailbox = Arc::new(Mailbox::new());
        mailbox.post(Command::Play);

        let consumer = Arc::clone(&mailbox);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            consumer.take_if_any()
        });

        assert!(mailbox.wait_acknowledged(Duration::from_secs(5)));
        assert_eq!(handle.join().expect("consumer thread"), Command::Play);
    }

    #[test]
    fn concurrent_posts_leave_exactly_one_command() {
        let mailbox = Arc::new(Mailbox::new());
        let writers: Vec<_> = (0..4_u8)
            .map(|id| {
                let mailbox = Arc::clone(&mailbox);
                thread::spawn(move || {
                    for _ in 0..100 {
                        mailbox.post(Command::SeekTo(id));
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().expect("writer thread");
        }

        assert!(matches!(mailbox.take_if_any(), Command::SeekTo(id) if id < 4));
        assert_eq!(mailbox.take_if_any(), Command::None);
    }
}
