use std::{collections::VecDeque, time::Duration};

use tokio::time::Instant;

/// A terminated line waiting for its turn on the socket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingSend {
    pub line: String,
    /// `(index, total)` when this line is one part of a longer reply
    pub chunk: Option<(usize, usize)>,
}

impl PendingSend {
    pub fn new(line: impl Into<String>) -> Self {
        Self {
            line: line.into(),
            chunk: None,
        }
    }

    pub fn chunk(mut self, index: usize, total: usize) -> Self {
        self.chunk.replace((index, total));
        self
    }
}

/// Meters queued lines so at most one leaves per throttle interval.
///
/// The owner polls this on every [`Pacer::TICK`]. Lines sent around the
/// queue should be reported with [`Pacer::sent`] so they count against the
/// interval too.
#[derive(Debug)]
pub struct Pacer {
    queue: VecDeque<PendingSend>,
    interval: Duration,
    last_sent: Option<Instant>,
}

impl Pacer {
    pub const TICK: Duration = Duration::from_millis(50);
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(200);

    pub fn new(interval: Duration) -> Self {
        Self {
            queue: VecDeque::new(),
            interval,
            last_sent: None,
        }
    }

    pub fn enqueue(&mut self, send: PendingSend) {
        self.queue.push_back(send)
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Resets the clock after a line went out
    pub fn sent(&mut self, now: Instant) {
        self.last_sent.replace(now);
    }

    /// Takes the next line if the interval has passed since the last send
    pub fn poll(&mut self, now: Instant) -> Option<PendingSend> {
        if let Some(last) = self.last_sent {
            if now.saturating_duration_since(last) < self.interval {
                return None;
            }
        }

        let next = self.queue.pop_front()?;
        self.sent(now);
        Some(next)
    }
}

impl Default for Pacer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // drives the pacer with a fixed tick and records when each line left
    fn drain(pacer: &mut Pacer, start: Instant) -> Vec<(Duration, PendingSend)> {
        let mut out = vec![];
        let mut now = start;
        while !pacer.is_empty() {
            if let Some(send) = pacer.poll(now) {
                out.push((now - start, send));
            }
            now += Pacer::TICK;
        }
        out
    }

    #[test]
    fn fifo_and_spaced() {
        let interval = Duration::from_millis(200);
        let mut pacer = Pacer::new(interval);
        let n = 7;
        for i in 0..n {
            pacer.enqueue(PendingSend::new(format!("PRIVMSG #test :{i}\r\n")));
        }

        let sent = drain(&mut pacer, Instant::now());
        assert_eq!(sent.len(), n);

        for (i, (_, send)) in sent.iter().enumerate() {
            assert_eq!(send.line, format!("PRIVMSG #test :{i}\r\n"));
        }

        for pair in sent.windows(2) {
            assert!(pair[1].0 - pair[0].0 >= interval);
        }

        let (first, last) = (sent[0].0, sent[n - 1].0);
        assert!(last - first <= interval * n as u32 + Pacer::TICK);
    }

    #[test]
    fn interval_not_a_multiple_of_tick() {
        let interval = Duration::from_millis(120);
        let mut pacer = Pacer::new(interval);
        for i in 0..4 {
            pacer.enqueue(PendingSend::new(i.to_string()));
        }

        let sent = drain(&mut pacer, Instant::now());
        let times = sent.iter().map(|(d, _)| d.as_millis()).collect::<Vec<_>>();
        assert_eq!(times, [0, 150, 300, 450]);
    }

    #[test]
    fn immediate_send_resets_the_clock() {
        let start = Instant::now();
        let mut pacer = Pacer::new(Duration::from_millis(200));
        pacer.sent(start);
        pacer.enqueue(PendingSend::new("PRIVMSG #test :hi\r\n"));

        assert_eq!(pacer.poll(start + Duration::from_millis(50)), None);
        assert_eq!(pacer.poll(start + Duration::from_millis(150)), None);
        assert!(pacer.poll(start + Duration::from_millis(200)).is_some());
        assert!(pacer.is_empty());
    }

    #[test]
    fn empty_queue_does_not_touch_the_clock() {
        let start = Instant::now();
        let mut pacer = Pacer::default();
        assert_eq!(pacer.poll(start), None);

        pacer.enqueue(PendingSend::new("a").chunk(1, 2));
        let send = pacer.poll(start + Pacer::TICK).unwrap();
        assert_eq!(send.chunk, Some((1, 2)));
    }
}
