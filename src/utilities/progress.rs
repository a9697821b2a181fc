// Copyright (C) 2024 Bellande Artificial Intelligence Computer Vision Research Innovation Center, Ronaldson Bellande

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::io::{stderr, Write};
use std::time::{Duration, Instant};

/// Single-line textual progress bar redrawn in place on stderr.
pub struct ProgressBar {
    label: String,
    total: usize,
    current: usize,
    visible: bool,
    start_time: Instant,
    last_update: Instant,
    update_frequency: Duration,
}

impl ProgressBar {
    pub fn new(label: &str, total: usize) -> Self {
        let now = Instant::now();
        ProgressBar {
            label: label.to_string(),
            total,
            current: 0,
            visible: true,
            start_time: now,
            last_update: now,
            update_frequency: Duration::from_millis(100),
        }
    }

    /// A bar that counts but never draws.
    pub fn hidden(label: &str, total: usize) -> Self {
        ProgressBar {
            visible: false,
            ..Self::new(label, total)
        }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn update(&mut self, amount: usize) {
        self.current = (self.current + amount).min(self.total);
        let now = Instant::now();
        if now.duration_since(self.last_update) >= self.update_frequency {
            self.render();
            self.last_update = now;
        }
    }

    pub fn finish(&mut self) {
        self.current = self.total;
        self.render();
        if self.visible {
            let _ = writeln!(stderr());
        }
    }

    fn line(&self) -> String {
        let progress = if self.total == 0 {
            1.0
        } else {
            self.current as f32 / self.total as f32
        };
        let bar_width = 30;
        let filled = ((progress * bar_width as f32) as usize).min(bar_width);
        let empty = bar_width - filled;

        let elapsed = self.start_time.elapsed();
        let eta = if progress > 0.0 {
            Duration::from_secs_f32(elapsed.as_secs_f32() / progress * (1.0 - progress))
        } else {
            Duration::from_secs(0)
        };

        format!(
            "\r{}: {:3.0}%|{}{}| {}/{} [{:.1}s<{:.1}s]",
            self.label,
            progress * 100.0,
            "#".repeat(filled),
            " ".repeat(empty),
            self.current,
            self.total,
            elapsed.as_secs_f32(),
            eta.as_secs_f32()
        )
    }

    fn render(&self) {
        if !self.visible {
            return;
        }
        let mut err = stderr();
        let _ = write!(err, "{}", self.line());
        let _ = err.flush();
    }
}
