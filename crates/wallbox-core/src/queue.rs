use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

pub const BLOCK_SIZE: usize = 1024;

pub const LOGIN_QUEUE: &str = "WALLBOX_MYWALLBOX_WALLBOX_LOGIN";
pub const STATE_MACHINE_QUEUE: &str = "WALLBOX_MYWALLBOX_WALLBOX_STATEMACHINE";

const USER_ACTION_ENABLE: i64 = 1;
const USER_ACTION_DISABLE: i64 = 2;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("invalid queue name: {0}")]
    InvalidName(String),
    #[error("payload of {len} bytes exceeds block size {max}")]
    PayloadTooLarge { len: usize, max: usize },
    #[error("failed to open queue {queue}: {reason}")]
    Open { queue: String, reason: String },
    #[error("failed to send to queue {queue}: {reason}")]
    Send { queue: String, reason: String },
    #[error("message queues are not supported on this platform")]
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub queue: &'static str,
    pub payload: String,
}

impl Command {
    pub fn request_lock() -> Self {
        Self {
            queue: LOGIN_QUEUE,
            payload: "EVENT_REQUEST_LOCK".to_string(),
        }
    }

    // Unlock is a login as the owning user.
    pub fn request_login(user_id: i64) -> Self {
        Self {
            queue: LOGIN_QUEUE,
            payload: format!("EVENT_REQUEST_LOGIN#{}", fixed_point(user_id)),
        }
    }

    pub fn user_action(enable_charging: bool) -> Self {
        let action = if enable_charging {
            USER_ACTION_ENABLE
        } else {
            USER_ACTION_DISABLE
        };
        Self {
            queue: STATE_MACHINE_QUEUE,
            payload: format!("EVENT_REQUEST_USER_ACTION#{}", fixed_point(action)),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, QueueError> {
        let bytes = self.payload.as_bytes();
        if bytes.len() > BLOCK_SIZE {
            return Err(QueueError::PayloadTooLarge {
                len: bytes.len(),
                max: BLOCK_SIZE,
            });
        }
        let mut block = vec![0_u8; BLOCK_SIZE];
        block[..bytes.len()].copy_from_slice(bytes);
        Ok(block)
    }
}

fn fixed_point(value: i64) -> String {
    format!("{value}.000000")
}

#[async_trait]
pub trait CommandQueue: Send + Sync {
    async fn send(&self, command: &Command) -> Result<(), QueueError>;
}

pub struct PosixQueue {
    send_timeout: Duration,
}

impl PosixQueue {
    pub fn new(send_timeout: Duration) -> Self {
        Self { send_timeout }
    }
}

#[async_trait]
impl CommandQueue for PosixQueue {
    async fn send(&self, command: &Command) -> Result<(), QueueError> {
        let block = command.encode()?;
        let queue = command.queue;
        let timeout = self.send_timeout;
        tokio::task::spawn_blocking(move || mq::send_block(queue, &block, timeout))
            .await
            .map_err(|err| QueueError::Send {
                queue: queue.to_string(),
                reason: err.to_string(),
            })??;
        info!(queue, payload = %command.payload, "command enqueued");
        Ok(())
    }
}

#[cfg(target_os = "linux")]
mod mq {
    use std::ffi::CString;
    use std::io;
    use std::time::Duration;

    use super::QueueError;

    pub(super) fn send_block(queue: &str, block: &[u8], timeout: Duration) -> Result<(), QueueError> {
        let name = if queue.starts_with('/') {
            queue.to_string()
        } else {
            format!("/{queue}")
        };
        let path = CString::new(name).map_err(|_| QueueError::InvalidName(queue.to_string()))?;

        let mqd = unsafe { libc::mq_open(path.as_ptr(), libc::O_WRONLY) };
        if mqd == -1 {
            return Err(QueueError::Open {
                queue: queue.to_string(),
                reason: io::Error::last_os_error().to_string(),
            });
        }

        let mut deadline: libc::timespec = unsafe { std::mem::zeroed() };
        unsafe { libc::clock_gettime(libc::CLOCK_REALTIME, &mut deadline) };
        deadline.tv_sec += timeout.as_secs() as libc::time_t;
        deadline.tv_nsec += timeout.subsec_nanos() as libc::c_long;
        if deadline.tv_nsec >= 1_000_000_000 {
            deadline.tv_sec += 1;
            deadline.tv_nsec -= 1_000_000_000;
        }

        let rc = unsafe {
            libc::mq_timedsend(
                mqd,
                block.as_ptr() as *const libc::c_char,
                block.len(),
                0,
                &deadline,
            )
        };
        let send_err = (rc == -1).then(io::Error::last_os_error);
        unsafe { libc::mq_close(mqd) };

        match send_err {
            Some(err) => Err(QueueError::Send {
                queue: queue.to_string(),
                reason: err.to_string(),
            }),
            None => Ok(()),
        }
    }
}

#[cfg(not(target_os = "linux"))]
mod mq {
    use std::time::Duration;

    use super::QueueError;

    pub(super) fn send_block(_queue: &str, _block: &[u8], _timeout: Duration) -> Result<(), QueueError> {
        Err(QueueError::Unsupported)
    }
}
