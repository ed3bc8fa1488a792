use std::fmt::Display;
use std::thread;
use std::time::Duration;
use log::{error, warn};

/// Bounded retry with a fixed pause between attempts
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

/// Errors that may go away if the same call is simply made again
pub trait Transient {
    fn is_transient(&self) -> bool;
}

/// Runs the given operation until it succeeds, fails with a non-transient error or
/// the policy's attempts are used up. Every failed attempt is logged at warn and
/// exhaustion at error, in which case the last error is returned.
///
/// # Arguments
///
/// * 'policy' - number of attempts and delay between them
/// * 'what' - short description of the operation, used in log lines
/// * 'op' - the operation to run
pub fn with_retry<T, E, F>(policy: &RetryPolicy, what: &str, mut op: F) -> Result<T, E>
where
    E: Transient + Display,
    F: FnMut() -> Result<T, E>,
{
    let mut attempt: u32 = 1;
    loop {
        match op() {
            Ok(t) => return Ok(t),
            Err(e) if !e.is_transient() => return Err(e),
            Err(e) => {
                warn!("{} failed, attempt {}/{}: {}", what, attempt, policy.max_attempts, e);
                if attempt >= policy.max_attempts {
                    error!("{}: max retries exceeded, giving up", what);
                    return Err(e);
                }
            }
        }
        attempt += 1;
        thread::sleep(policy.delay);
    }
}
