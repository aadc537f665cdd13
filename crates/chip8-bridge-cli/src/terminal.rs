use std::io::Write;

use chip8_bridge::framebuffer::{DisplaySink, RenderTarget, HEIGHT, WIDTH};

/// Draws frames with half-block characters, two pixel rows per text line.
///
/// Identical consecutive frames are not redrawn.
pub struct TerminalDisplay<W> {
    out: W,
    text: String,
    last: String,
}

impl<W: Write> TerminalDisplay<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            text: String::new(),
            last: String::new(),
        }
    }

    fn draw(&mut self, frame: &RenderTarget) {
        self.text.clear();
        for y in (0..HEIGHT).step_by(2) {
            for x in 0..WIDTH {
                self.text.push(match (frame.is_lit(x, y), frame.is_lit(x, y + 1)) {
                    (true, true) => '█',
                    (true, false) => '▀',
                    (false, true) => '▄',
                    (false, false) => ' ',
                });
            }
            self.text.push('\n');
        }
    }
}

impl<W: Write> DisplaySink for TerminalDisplay<W> {
    fn present(&mut self, frame: &RenderTarget) {
        self.draw(frame);
        if self.text == self.last {
            return;
        }
        // Home the cursor and overwrite the previous frame in place.
        let written = self
            .out
            .write_all(b"\x1b[H")
            .and_then(|()| self.out.write_all(self.text.as_bytes()))
            .and_then(|()| self.out.flush());
        if let Err(err) = written {
            tracing::debug!("terminal display write failed: {err}");
        }
        std::mem::swap(&mut self.text, &mut self.last);
    }
}
