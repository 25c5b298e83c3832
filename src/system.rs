// File: ./src/system.rs
// Desktop notification shown once a batch run finishes.
use notify_rust::Notification;
use std::thread::JoinHandle;

pub const APP_NAME: &str = "Duebump";

/// Shows `body` as a desktop notification on a background thread.
///
/// Delivery is best-effort: a missing notification daemon is logged and
/// otherwise ignored. The returned handle can be joined by callers that are
/// about to exit.
pub fn notify_completion(title: &str, body: &str) -> JoinHandle<()> {
    let summary = title.to_string();
    let body = body.to_string();
    std::thread::spawn(move || {
        if let Err(e) = Notification::new()
            .summary(&summary)
            .body(&body)
            .appname(APP_NAME)
            .show()
        {
            log::debug!("Desktop notification not shown: {}", e);
        }
    })
}

/// Waits for a notification thread started by [`notify_completion`].
/// Returns `false` if the thread panicked, which is logged and not fatal.
pub fn wait_for_notification(handle: JoinHandle<()>) -> bool {
    match handle.join() {
        Ok(()) => true,
        Err(_) => {
            log::debug!("Notification thread panicked");
            false
        }
    }
}
