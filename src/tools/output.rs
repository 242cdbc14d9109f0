//! Incremental capture of subprocess output

use crate::types::JobId;
use std::collections::VecDeque;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::debug;

/// Lines kept per stream for diagnostics
pub(crate) const TAIL_LINES: usize = 40;

/// Longest line kept verbatim; longer lines are cut
const MAX_LINE_LEN: usize = 512;

/// Bounded tail of the most recent output lines
#[derive(Debug, Default)]
pub(crate) struct OutputTail {
    lines: VecDeque<String>,
    dropped: usize,
}

impl OutputTail {
    pub(crate) fn push(&mut self, line: &str) {
        let line = if line.len() > MAX_LINE_LEN {
            let mut end = MAX_LINE_LEN;
            while !line.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}...", &line[..end])
        } else {
            line.to_string()
        };

        if self.lines.len() == TAIL_LINES {
            self.lines.pop_front();
            self.dropped += 1;
        }
        self.lines.push_back(line);
    }

    pub(crate) fn render(&self) -> String {
        let mut out = String::new();
        if self.dropped > 0 {
            out.push_str(&format!("[{} earlier lines omitted]\n", self.dropped));
        }
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

/// Read `stream` line by line until EOF, logging each line as it arrives
pub(crate) async fn collect_lines<R>(stream: R, job: JobId, source: &'static str) -> OutputTail
where
    R: AsyncRead + Unpin,
{
    let mut tail = OutputTail::default();
    let mut lines = BufReader::new(stream).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim_end();
                if line.is_empty() {
                    continue;
                }
                debug!(job_id = job.0, source, line, "downloader output");
                tail.push(line);
            }
            Ok(None) => break,
            Err(e) => {
                // Non-UTF-8 output or a closed pipe; keep what we have
                debug!(job_id = job.0, source, error = %e, "stopped reading downloader output");
                break;
            }
        }
    }

    tail
}
