use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use sb_core::BundleError;

use crate::ContainerStorage;

const RETRY_INTERVAL: Duration = Duration::from_millis(25);

/// Writes `bytes` until the storage accepts them or `timeout` runs out.
/// Returns the number of attempts made.
pub fn rewrite_until(
    storage: &mut dyn ContainerStorage,
    path: &Path,
    bytes: &[u8],
    timeout: Duration,
) -> Result<usize, BundleError> {
    let started = Instant::now();
    let mut attempts = 0usize;
    loop {
        attempts += 1;
        let error = match storage.write(path, bytes) {
            Ok(()) => {
                log::info!("restored {} after {} attempt(s)", path.display(), attempts);
                return Ok(attempts);
            }
            Err(error) => error,
        };

        let elapsed = started.elapsed();
        if elapsed >= timeout {
            return Err(BundleError::persist(format!(
                "Gave up restoring {} after {} attempts: {}",
                path.display(),
                attempts,
                error.message
            )));
        }
        log::warn!("restore of {} failed, retrying: {}", path.display(), error);
        thread::sleep(RETRY_INTERVAL.min(timeout - elapsed));
    }
}
