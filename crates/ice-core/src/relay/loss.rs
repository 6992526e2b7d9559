//! RTP packet loss accounting for relayed sockets
//!
//! Only the RTP sequence number is inspected; there is no jitter buffer.
//! Reordered packets look like a backwards wrap and large jumps are treated
//! as a stream restart, so the figures are estimates meant for logging.

use std::time::{Duration, Instant};

use byteorder::{BigEndian, ByteOrder};
use tracing::info;

/// Loss accounting knobs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LossConfig {
    /// Minimum interval between two loss reports
    pub log_interval: Duration,
    /// Loss ratio above which a report is emitted
    pub ratio_threshold: f64,
    /// Gaps at or above this count as one lost packet
    pub reorder_threshold: u16,
}

impl Default for LossConfig {
    fn default() -> Self {
        Self {
            log_interval: Duration::from_millis(5000),
            ratio_threshold: 0.05,
            reorder_threshold: 0x00FF,
        }
    }
}

/// Snapshot of a socket's counters
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LossStats {
    /// Media datagrams received
    pub received: u64,
    /// Datagrams sent
    pub sent: u64,
    /// Estimated lost datagrams
    pub lost: u64,
    /// `lost / (lost + received)`
    pub ratio: f64,
}

/// Per-socket RTP loss counter
#[derive(Debug)]
pub struct RelayLossCounter {
    config: LossConfig,
    received: u64,
    sent: u64,
    lost: u64,
    last_seq: Option<u16>,
    last_report: Option<Instant>,
}

impl RelayLossCounter {
    /// Create a zeroed counter
    pub fn new(config: LossConfig) -> Self {
        Self {
            config,
            received: 0,
            sent: 0,
            lost: 0,
            last_seq: None,
            last_report: None,
        }
    }

    /// Count one outgoing datagram
    pub fn record_sent(&mut self) {
        self.sent += 1;
    }

    /// Account an incoming media datagram
    ///
    /// Datagrams too short to carry an RTP sequence number are counted as
    /// received without touching the loss estimate. Returns whether a loss
    /// report was logged.
    pub fn record_received(&mut self, datagram: &[u8], now: Instant) -> bool {
        if datagram.len() < 4 {
            self.received += 1;
            return false;
        }
        self.record_sequence(BigEndian::read_u16(&datagram[2..4]), now)
    }

    /// Account an incoming RTP sequence number
    pub fn record_sequence(&mut self, seq: u16, now: Instant) -> bool {
        self.received += 1;

        if let Some(last) = self.last_seq {
            self.lost += lost_between(last, seq, self.config.reorder_threshold);
        }
        self.last_seq = Some(seq);

        let ratio = self.ratio();
        if ratio <= self.config.ratio_threshold {
            return false;
        }
        let due = self
            .last_report
            .map_or(true, |at| now.saturating_duration_since(at) >= self.config.log_interval);
        if !due {
            return false;
        }

        self.last_report = Some(now);
        info!(
            "Relayed RTP loss {:.2}% ({} lost, {} received)",
            ratio * 100.0,
            self.lost,
            self.received
        );
        true
    }

    /// Current loss ratio, zero before any traffic
    pub fn ratio(&self) -> f64 {
        let total = self.lost + self.received;
        if total == 0 {
            0.0
        } else {
            self.lost as f64 / total as f64
        }
    }

    /// Snapshot of the counters
    pub fn stats(&self) -> LossStats {
        LossStats {
            received: self.received,
            sent: self.sent,
            lost: self.lost,
            ratio: self.ratio(),
        }
    }
}

/// Packets presumed lost between two consecutive sequence numbers
///
/// A backwards step is read as a wrap past `0xFFFF`.
pub fn lost_between(last: u16, new: u16, reorder_threshold: u16) -> u64 {
    let gap: u32 = if new >= last {
        (new - last) as u32
    } else {
        (0xFFFF - last as u32) + new as u32
    };

    if gap == 0 {
        0
    } else if gap < reorder_threshold as u32 {
        (gap - 1) as u64
    } else {
        1
    }
}
