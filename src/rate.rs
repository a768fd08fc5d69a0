use tracing::warn;

const BYTES_PER_MB: f64 = 1_000_000.0;

/// Cumulative network counters paired with the wall-clock time they were
/// read at.
#[derive(Debug, Clone, Copy)]
pub struct NetCounters {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub taken_at_unix: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NetRates {
    pub sent_mb_s: f64,
    pub recv_mb_s: f64,
}

pub fn rates_between(previous: NetCounters, current: NetCounters) -> NetRates {
    let elapsed = current.taken_at_unix - previous.taken_at_unix;
    if elapsed <= 0.0 {
        warn!(
            elapsed_secs = elapsed,
            "non-positive elapsed time between samples, reporting zero rates"
        );
        return NetRates::default();
    }

    // Deltas saturate: an interface reset winds the cumulative counters
    // backwards and must not produce a negative rate.
    let sent_delta = current.bytes_sent.saturating_sub(previous.bytes_sent);
    let recv_delta = current.bytes_recv.saturating_sub(previous.bytes_recv);

    NetRates {
        sent_mb_s: sent_delta as f64 / elapsed / BYTES_PER_MB,
        recv_mb_s: recv_delta as f64 / elapsed / BYTES_PER_MB,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counters(bytes_sent: u64, bytes_recv: u64, taken_at_unix: f64) -> NetCounters {
        NetCounters {
            bytes_sent,
            bytes_recv,
            taken_at_unix,
        }
    }

    #[test]
    fn rates_from_counter_deltas() {
        let previous = counters(1_000_000, 2_000_000, 0.0);
        let current = counters(11_000_000, 2_000_000, 10.0);

        let rates = rates_between(previous, current);
        assert_eq!(rates.sent_mb_s, 1.0);
        assert_eq!(rates.recv_mb_s, 0.0);
    }

    #[test]
    fn counter_rollback_clamps_to_zero() {
        let previous = counters(1_000_000, 1_000_000, 0.0);
        let current = counters(500_000, 1_500_000, 10.0);

        let rates = rates_between(previous, current);
        assert_eq!(rates.sent_mb_s, 0.0);
        assert_eq!(rates.recv_mb_s, 0.05);
    }

    #[test]
    fn non_positive_elapsed_yields_zero_rates() {
        let previous = counters(1_000_000, 1_000_000, 10.0);
        let current = counters(2_000_000, 2_000_000, 10.0);
        assert_eq!(rates_between(previous, current), NetRates::default());

        let current = counters(2_000_000, 2_000_000, 5.0);
        assert_eq!(rates_between(previous, current), NetRates::default());
    }
}
