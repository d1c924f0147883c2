use rand::{rngs::SmallRng, Rng, SeedableRng};

use crate::{
    error::Result,
    visuals::{ControlSpec, ReactiveInput, Surface, Visualizer},
};

pub const BURST_SIZE: &str = "burst_size";
pub const SPEED: &str = "speed";

const MAX_PARTICLES: usize = 2048;
const DEFAULT_SEED: u64 = 0x5eed;

#[derive(Debug, Clone)]
struct Particle {
    x: f32,
    y: f32,
    vx: f32,
    vy: f32,
    life: f32,
    color: usize,
}

/// Particle bursts spawned on onsets, seeded so every export renders identically
pub struct ParticleVisualizer {
    rng: SmallRng,
    particles: Vec<Particle>,
}

impl ParticleVisualizer {
    pub fn new() -> Self {
        Self {
            rng: SmallRng::seed_from_u64(DEFAULT_SEED),
            particles: Vec::new(),
        }
    }

    fn spawn_burst(&mut self, cx: f32, cy: f32, count: usize, speed: f32, energy: f32) {
        for _ in 0..count {
            if self.particles.len() >= MAX_PARTICLES {
                break;
            }
            let angle = self.rng.gen_range(0.0..std::f32::consts::TAU);
            let velocity = speed * self.rng.gen_range(0.3..1.0) * (0.5 + energy);
            self.particles.push(Particle {
                x: cx,
                y: cy,
                vx: angle.cos() * velocity,
                vy: angle.sin() * velocity,
                life: 1.0,
                color: self.rng.gen_range(1..4),
            });
        }
    }
}

impl Default for ParticleVisualizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Visualizer for ParticleVisualizer {
    fn name(&self) -> &str {
        "particles"
    }

    fn description(&self) -> &str {
        "Onset-triggered particle bursts drifting from the center"
    }

    fn init(&mut self, _surface: &Surface) -> Result<()> {
        // Re-seed so repeated exports of the same clip match frame for frame
        self.rng = SmallRng::seed_from_u64(DEFAULT_SEED);
        self.particles = Vec::with_capacity(MAX_PARTICLES);
        Ok(())
    }

    fn update(&mut self, surface: &mut Surface, input: &ReactiveInput, delta: f32) -> Result<()> {
        let frame = &input.frame;
        let gain = input.intensity_multiplier.max(0.0);
        let width = surface.width() as f32;
        let height = surface.height() as f32;

        surface.fill(input.palette_color(0, [8, 8, 20]));

        if frame.onset || frame.kick {
            let count = (input.get_f32_or(BURST_SIZE, 40.0).max(0.0) * gain) as usize;
            let speed = input.get_f32_or(SPEED, 0.5) * width;
            let energy = frame.amplitude.max(frame.kick_intensity);
            self.spawn_burst(width / 2.0, height / 2.0, count, speed, energy);
        }

        let size = (width * (0.006 + 0.01 * frame.bass * gain)).max(1.0) as u32;
        for particle in &mut self.particles {
            particle.x += particle.vx * delta;
            particle.y += particle.vy * delta;
            particle.life -= delta * 0.8;
        }
        self.particles.retain(|p| {
            p.life > 0.0 && p.x >= 0.0 && p.y >= 0.0 && p.x < width && p.y < height
        });

        for particle in &self.particles {
            let color = input.palette_color(particle.color, [255, 255, 255]);
            surface.fill_rect(
                particle.x as i64 - size as i64 / 2,
                particle.y as i64 - size as i64 / 2,
                size,
                size,
                color,
                particle.life,
            );
        }

        Ok(())
    }

    fn dispose(&mut self) {
        self.particles = Vec::new();
    }

    fn controls_schema(&self) -> Vec<ControlSpec> {
        vec![
            ControlSpec::range(BURST_SIZE, "Particles per burst", 0.0, 200.0, 1.0, 40.0),
            ControlSpec::range(SPEED, "Speed", 0.1, 2.0, 0.05, 0.5),
        ]
    }
}
