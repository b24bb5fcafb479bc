use rand::seq::SliceRandom;
use rand::Rng;
use std::time::Instant;

const CONFETTI_SYMBOLS: [char; 6] = ['▲', '◆', '●', '■', '✦', '✶'];
const PALETTE_SIZE: usize = 5;
pub const BANNER: &str = "NEW HIGH SCORE!";

/// One falling piece of confetti
#[derive(Debug, Clone)]
pub struct ConfettiPiece {
    pub x: f64,
    pub y: f64,
    pub size: f64, // 0.2..0.5, bigger pieces fall faster
    pub phase: f64,
    pub symbol: char,
    pub color_index: usize,
}

impl ConfettiPiece {
    fn new<R: Rng>(rng: &mut R, width: f64, height: f64, count: usize) -> Self {
        Self {
            x: rng.gen_range(0.0..width.max(1.0)),
            // Start above the screen so the first frames rain in
            y: rng.gen_range(-height.max(1.0)..0.0),
            size: rng.gen_range(0.2..0.5),
            phase: rng.gen_range(0.0..count.max(1) as f64),
            symbol: *CONFETTI_SYMBOLS.choose(rng).unwrap_or(&'●'),
            color_index: rng.gen_range(0..PALETTE_SIZE),
        }
    }

    fn update<R: Rng>(&mut self, rng: &mut R, width: f64, height: f64) {
        self.y += (self.phase.cos() + 1.0) * 0.25 + self.size;
        self.x += self.phase.sin() * 0.5;
        if self.y > height {
            self.y = -1.0;
            self.x = rng.gen_range(0.0..width.max(1.0));
        }
    }
}

/// Confetti shower shown when a new high score is recorded
#[derive(Debug)]
pub struct CelebrationAnimation {
    pub pieces: Vec<ConfettiPiece>,
    pub started_at: Instant,
    pub duration: f64, // seconds
    pub is_active: bool,
    pub width: f64,
    pub height: f64,
}

impl CelebrationAnimation {
    pub fn new() -> Self {
        Self {
            pieces: Vec::new(),
            started_at: Instant::now(),
            duration: 5.0,
            is_active: false,
            width: 80.0,
            height: 24.0,
        }
    }

    /// Start (or restart) the shower for a screen of the given size
    pub fn start(&mut self, width: u16, height: u16) {
        let mut rng = rand::thread_rng();
        self.width = width as f64;
        self.height = height as f64;
        self.started_at = Instant::now();
        self.is_active = true;

        // Roughly one piece per 16 cells keeps small terminals readable
        let count = ((width as usize * height as usize) / 16).clamp(20, 300);
        self.pieces = (0..count)
            .map(|_| ConfettiPiece::new(&mut rng, self.width, self.height, count))
            .collect();
    }

    /// Advance one frame; stops and clears after `duration`
    pub fn update(&mut self) {
        if !self.is_active {
            return;
        }
        if self.started_at.elapsed().as_secs_f64() >= self.duration {
            self.stop();
            return;
        }

        let mut rng = rand::thread_rng();
        let (width, height) = (self.width, self.height);
        for piece in &mut self.pieces {
            piece.update(&mut rng, width, height);
        }
    }

    pub fn stop(&mut self) {
        self.is_active = false;
        self.pieces.clear();
    }
}

impl Default for CelebrationAnimation {
    fn default() -> Self {
        Self::new()
    }
}
