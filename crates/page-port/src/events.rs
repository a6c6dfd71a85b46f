//! Page activity events published on the page's broadcast bus.

use serde::{Deserialize, Serialize};

/// Severity of a console message.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsoleLevel {
    Error,
    Warning,
    Info,
}

impl ConsoleLevel {
    pub fn name(&self) -> &'static str {
        match self {
            ConsoleLevel::Error => "error",
            ConsoleLevel::Warning => "warning",
            ConsoleLevel::Info => "info",
        }
    }
}

/// Console and network activity observed on a page.
#[derive(Clone, Debug, PartialEq)]
pub enum PageEvent {
    Console {
        level: ConsoleLevel,
        text: String,
    },
    Request {
        url: String,
    },
    Response {
        url: String,
        status: u16,
    },
    RequestFailed {
        url: String,
        reason: String,
    },
}
