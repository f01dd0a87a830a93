//! Validation issues.

use std::fmt;
use std::sync::Arc;

use trellis_core::Varying;

struct IssueInner {
    active: Varying<bool>,
    severity: Varying<i64>,
    message: String,
}

/// One piece of validation feedback.
///
/// Both whether the issue currently applies and how severe it is are live
/// values, so a model's [`issues`](super::Model::issues) view and its
/// [`valid`](super::Model::valid) cell react to them. Lower severities are
/// more serious; `0` is an error.
#[derive(Clone)]
pub struct Issue {
    inner: Arc<IssueInner>,
}

impl Issue {
    /// An always-active issue with a fixed severity.
    pub fn new(severity: i64, message: impl Into<String>) -> Self {
        Self::reactive(Varying::new(true), Varying::new(severity), message)
    }

    /// An issue whose activity and severity are driven by cells.
    pub fn reactive(active: Varying<bool>, severity: Varying<i64>, message: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(IssueInner {
                active,
                severity,
                message: message.into(),
            }),
        }
    }

    pub fn active(&self) -> &Varying<bool> {
        &self.inner.active
    }

    pub fn severity(&self) -> &Varying<i64> {
        &self.inner.severity
    }

    pub fn message(&self) -> &str {
        &self.inner.message
    }
}

impl PartialEq for Issue {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Issue")
            .field("message", &self.inner.message)
            .field("active", &self.inner.active.get())
            .field("severity", &self.inner.severity.get())
            .finish()
    }
}
