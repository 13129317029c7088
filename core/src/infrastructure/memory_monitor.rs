// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Reads `MemAvailable` from `/proc/meminfo` to gate Worker Pool Manager
//! scale-up decisions (`spec.md` §4.5).

use tracing::warn;

use crate::application::pool_manager::MemoryMonitor;

pub struct ProcMeminfoMonitor;

impl ProcMeminfoMonitor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ProcMeminfoMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl MemoryMonitor for ProcMeminfoMonitor {
    async fn available_mb(&self) -> Option<u64> {
        let contents = tokio::fs::read_to_string("/proc/meminfo").await.ok()?;
        match parse_mem_available_kb(&contents) {
            Some(kb) => Some(kb / 1024),
            None => {
                warn!("MemAvailable not found in /proc/meminfo");
                None
            }
        }
    }
}

fn parse_mem_available_kb(contents: &str) -> Option<u64> {
    contents.lines().find_map(|line| {
        let rest = line.strip_prefix("MemAvailable:")?;
        rest.trim().strip_suffix(" kB")?.trim().parse().ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mem_available_line() {
        let sample = "MemTotal:       16384000 kB\nMemAvailable:    8192000 kB\n";
        assert_eq!(parse_mem_available_kb(sample), Some(8192000));
    }

    #[test]
    fn missing_line_returns_none() {
        assert_eq!(parse_mem_available_kb("MemTotal: 100 kB\n"), None);
    }
}
