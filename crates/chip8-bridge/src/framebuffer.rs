//! Monochrome framebuffer decoding.
//!
//! The guest keeps a 64x32 one-bit-per-pixel bitmap in its memory: 8 bytes per row, 32 rows,
//! row-major. Pixel `(x, y)` is bit `x % 8` of byte `y * 8 + x / 8`, least significant bit
//! first, which makes each row a little-endian `u64` with pixel `x` at bit `x`.
//!
//! Decoding expands that bitmap into a host-owned RGBA8888 buffer that is allocated once and
//! overwritten in place every frame.

pub const WIDTH: usize = 64;
pub const HEIGHT: usize = 32;
pub const BYTES_PER_ROW: usize = WIDTH / 8;
pub const BITMAP_BYTES: usize = BYTES_PER_ROW * HEIGHT;
pub const RGBA_BYTES: usize = WIDTH * HEIGHT * 4;

pub const WHITE: [u8; 4] = [0xFF, 0xFF, 0xFF, 0xFF];
pub const BLACK: [u8; 4] = [0x00, 0x00, 0x00, 0xFF];

/// Expand a packed bitmap into RGBA8888 at offset `4 * (64 * y + x)`.
pub fn decode_monochrome(bitmap: &[u8; BITMAP_BYTES], out: &mut [u8; RGBA_BYTES]) {
    for (row_bits, row_out) in bitmap
        .chunks_exact(BYTES_PER_ROW)
        .zip(out.chunks_exact_mut(WIDTH * 4))
    {
        let mut row = [0u8; BYTES_PER_ROW];
        row.copy_from_slice(row_bits);
        let row = u64::from_le_bytes(row);
        for (x, px) in row_out.chunks_exact_mut(4).enumerate() {
            let color = if (row >> x) & 1 != 0 { WHITE } else { BLACK };
            px.copy_from_slice(&color);
        }
    }
}

/// Host-side 64x32 RGBA8888 pixel buffer.
#[derive(Clone)]
pub struct RenderTarget {
    pixels: Box<[u8; RGBA_BYTES]>,
}

impl RenderTarget {
    /// A fully black frame.
    pub fn new() -> Self {
        let mut pixels = Box::new([0u8; RGBA_BYTES]);
        for px in pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&BLACK);
        }
        Self { pixels }
    }

    pub fn decode(&mut self, bitmap: &[u8; BITMAP_BYTES]) {
        decode_monochrome(bitmap, &mut self.pixels);
    }

    pub fn pixels(&self) -> &[u8; RGBA_BYTES] {
        &self.pixels
    }

    /// RGBA of pixel `(x, y)`.
    ///
    /// # Panics
    ///
    /// If `x >= WIDTH` or `y >= HEIGHT`.
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 4] {
        assert!(x < WIDTH && y < HEIGHT, "pixel ({x}, {y}) out of range");
        let at = 4 * (WIDTH * y + x);
        let mut px = [0u8; 4];
        px.copy_from_slice(&self.pixels[at..at + 4]);
        px
    }

    pub fn is_lit(&self, x: usize, y: usize) -> bool {
        self.pixel(x, y) == WHITE
    }
}

impl Default for RenderTarget {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RenderTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lit = (0..HEIGHT)
            .flat_map(|y| (0..WIDTH).map(move |x| (x, y)))
            .filter(|&(x, y)| self.is_lit(x, y))
            .count();
        f.debug_struct("RenderTarget").field("lit", &lit).finish()
    }
}

/// Where decoded frames go.
pub trait DisplaySink {
    fn present(&mut self, frame: &RenderTarget);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullDisplay;

impl DisplaySink for NullDisplay {
    fn present(&mut self, _frame: &RenderTarget) {}
}

/// The render target together with the sink it is presented to.
pub struct Screen {
    target: RenderTarget,
    display: Box<dyn DisplaySink>,
    frames: u64,
}

impl Screen {
    pub fn new(display: Box<dyn DisplaySink>) -> Self {
        Self {
            target: RenderTarget::new(),
            display,
            frames: 0,
        }
    }

    pub fn set_display(&mut self, display: Box<dyn DisplaySink>) {
        self.display = display;
    }

    /// Decode the first [`BITMAP_BYTES`] of `bitmap`.
    ///
    /// Returns `false` (and leaves the target untouched) if fewer bytes are available.
    pub fn decode_from(&mut self, bitmap: &[u8]) -> bool {
        match bitmap.get(..BITMAP_BYTES).and_then(|b| b.try_into().ok()) {
            Some(bitmap) => {
                self.target.decode(bitmap);
                true
            }
            None => false,
        }
    }

    pub fn present(&mut self) {
        self.frames += 1;
        self.display.present(&self.target);
    }

    pub fn target(&self) -> &RenderTarget {
        &self.target
    }

    /// Frames presented so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl std::fmt::Debug for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Screen")
            .field("frames", &self.frames)
            .finish_non_exhaustive()
    }
}
