use crate::domain::ports::PortCheck;
use crate::utils::error::{LaunchError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{Ipv4Addr, TcpListener};

pub const DEFAULT_PORT_START: u16 = 29500;
pub const DEFAULT_PORT_END: u16 = 29599;

/// Inclusive range of candidate master ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRange {
    start: u16,
    end: u16,
}

impl PortRange {
    pub fn new(start: u16, end: u16) -> Result<Self> {
        if start == 0 {
            return Err(LaunchError::InvalidConfigValueError {
                field: "ports.start".to_string(),
                value: start.to_string(),
                reason: "Port 0 cannot be used as a master port".to_string(),
            });
        }
        if start > end {
            return Err(LaunchError::InvalidConfigValueError {
                field: "ports.end".to_string(),
                value: end.to_string(),
                reason: format!("End port must not be below start port {}", start),
            });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> u16 {
        self.start
    }

    pub fn end(&self) -> u16 {
        self.end
    }

    pub fn len(&self) -> usize {
        usize::from(self.end - self.start) + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, port: u16) -> bool {
        (self.start..=self.end).contains(&port)
    }

    pub fn iter(&self) -> PortIter {
        PortIter {
            next: Some(self.start),
            end: self.end,
        }
    }
}

impl Default for PortRange {
    fn default() -> Self {
        Self {
            start: DEFAULT_PORT_START,
            end: DEFAULT_PORT_END,
        }
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

impl IntoIterator for PortRange {
    type Item = u16;
    type IntoIter = PortIter;

    fn into_iter(self) -> PortIter {
        self.iter()
    }
}

/// Ascending port iterator that stops at the end port without overflowing.
#[derive(Debug, Clone)]
pub struct PortIter {
    next: Option<u16>,
    end: u16,
}

impl Iterator for PortIter {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        let current = self.next?;
        self.next = if current < self.end {
            Some(current + 1)
        } else {
            None
        };
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self
            .next
            .map_or(0, |next| usize::from(self.end - next) + 1);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for PortIter {}

/// Checks a port by binding it on all interfaces, as the rendezvous server would.
pub fn port_is_free(port: u16) -> bool {
    TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).is_ok()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TcpPortCheck;

impl PortCheck for TcpPortCheck {
    fn is_available(&self, port: u16) -> bool {
        port_is_free(port)
    }
}
