//! User-visible notifications ("toasts").

use std::cell::RefCell;
use std::rc::Rc;

use crate::config::ExportFormat;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Failure,
}

/// A transient notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
}

impl Toast {
    pub fn success(message: impl Into<String>) -> Self {
        Toast {
            kind: ToastKind::Success,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Toast {
            kind: ToastKind::Failure,
            message: message.into(),
        }
    }

    /// `QR Code downloaded as PNG`
    pub fn downloaded(format: ExportFormat) -> Self {
        Toast::success(format!(
            "QR Code downloaded as {}",
            format.extension().to_uppercase()
        ))
    }

    pub fn download_failed() -> Self {
        Toast::failure("QR Code download failed")
    }

    pub fn preview_failed() -> Self {
        Toast::failure("QR Code preview failed")
    }

    pub fn upload_failed() -> Self {
        Toast::failure("Logo upload failed")
    }
}

/// Where toasts go.
pub trait Notifier {
    fn notify(&mut self, toast: Toast);
}

/// Emits toasts as tracing events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&mut self, toast: Toast) {
        match toast.kind {
            ToastKind::Success => tracing::info!(text = %toast.message, "toast"),
            ToastKind::Failure => tracing::warn!(text = %toast.message, "toast"),
        }
    }
}

/// Keeps every toast. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct ToastLog {
    toasts: Rc<RefCell<Vec<Toast>>>,
}

impl ToastLog {
    pub fn new() -> Self {
        ToastLog::default()
    }

    pub fn toasts(&self) -> Vec<Toast> {
        self.toasts.borrow().clone()
    }

    pub fn last(&self) -> Option<Toast> {
        self.toasts.borrow().last().cloned()
    }
}

impl Notifier for ToastLog {
    fn notify(&mut self, toast: Toast) {
        self.toasts.borrow_mut().push(toast);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_message_uses_uppercase_extension() {
        assert_eq!(Toast::downloaded(ExportFormat::Jpeg).message, "QR Code downloaded as JPEG");
        assert_eq!(Toast::downloaded(ExportFormat::Svg).kind, ToastKind::Success);
    }

    #[test]
    fn test_toast_log_is_shared_between_clones() {
        let log = ToastLog::new();
        let mut handle = log.clone();
        handle.notify(Toast::download_failed());
        assert_eq!(log.last(), Some(Toast::failure("QR Code download failed")));
    }
}
