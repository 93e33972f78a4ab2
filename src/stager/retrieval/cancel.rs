/*
Copyright 2021 Jakub Lewandowski

This file is part of METplus Data Staging (metstage).

METplus Data Staging (metstage) is a free software: you can redistribute it and/or modify
it under the terms of the GNU General Public License as published by
the Free Software Foundation; either version 3 of the License, or
(at your option) any later version.

METplus Data Staging (metstage) is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
GNU General Public License for more details.

You should have received a copy of the GNU General Public License
along with METplus Data Staging (metstage). If not, see https://www.gnu.org/licenses/.
*/

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

/// Cooperative cancellation shared between a waiting retrieval
/// and whoever may want to stop it. Clones share the same state.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    state: Arc<(Mutex<bool>, Condvar)>,
}

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    #[cfg(test)]
    pub fn cancel(&self) {
        let (lock, signal) = &*self.state;
        let mut cancelled = lock.lock().unwrap_or_else(PoisonError::into_inner);
        *cancelled = true;
        signal.notify_all();
    }

    #[cfg(test)]
    pub fn is_cancelled(&self) -> bool {
        let (lock, _) = &*self.state;
        *lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleeps for the given time or until cancelled.
    /// Returns `true` when the wait ended by cancellation.
    pub fn wait(&self, timeout: Duration) -> bool {
        let (lock, signal) = &*self.state;
        let cancelled = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let (cancelled, _) = signal
            .wait_timeout_while(cancelled, timeout, |cancelled| !*cancelled)
            .unwrap_or_else(PoisonError::into_inner);

        *cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::CancelToken;
    use std::thread;
    use std::time::{Duration, Instant};

    #[test]
    fn wait_times_out() {
        let token = CancelToken::new();
        let start = Instant::now();

        assert!(!token.wait(Duration::from_millis(30)));
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn cancel_wakes_waiter() {
        let token = CancelToken::new();
        let remote = token.clone();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.cancel();
        });

        let start = Instant::now();
        assert!(token.wait(Duration::from_secs(10)));
        assert!(start.elapsed() < Duration::from_secs(5));
        assert!(token.is_cancelled());

        handle.join().unwrap();
    }
}
