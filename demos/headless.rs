use {
    anyhow::Result,
    std::time::Instant,
    verlet_grid::{
        logging,
        math::vec2,
        palette::{self, DEFAULT_MAX_SPEED},
        simulation::{ForceMode, Simulation, SimulationConfig},
        timing::FrameTimer,
    },
};

const FRAMES: u32 = 900;

/// Runs the default scene without a window. The mouse is replaced by a
/// scripted sequence: pull toward the middle, push away from it, then let
/// the wind blow for a while.
fn main() -> Result<()> {
    let _logger = logging::setup()?;

    let config = SimulationConfig {
        particle_count: 2_000,
        seed: Some(42),
        ..SimulationConfig::default()
    };
    let center = vec2(config.width * 0.5, config.height * 0.5);
    let bounds = config.bounds();

    let mut sim = Simulation::new(config)?;
    sim.add_obstacle(vec2(300.0, -10.0), vec2(800.0, 150.0))?;
    sim.add_obstacle(vec2(0.0, 500.0), vec2(350.0, 620.0))?;

    let mut timer = FrameTimer::new(None, 60);
    let started = Instant::now();

    for frame in 0..FRAMES {
        timer.start_frame();

        match frame {
            120..=239 => {
                sim.apply_point_force(center, ForceMode::Pull);
            }
            300..=359 => {
                sim.apply_point_force(center, ForceMode::Push);
            }
            450 | 750 => {
                let blowing = sim.toggle_wind();
                log::info!("Wind {}", if blowing { "on" } else { "off" });
            }
            _ => (),
        }

        let stats = sim.step();

        if let Some(fps) = timer.poll_report() {
            let hot = sim
                .particle_states()
                .filter(|&(particle, velocity)| {
                    let color = palette::particle_color(
                        particle.position,
                        velocity,
                        &bounds,
                        DEFAULT_MAX_SPEED,
                    );
                    color[0] > 0.5
                })
                .count();
            log::info!(
                "frame {} | {:.1} fps | {} pair checks | {} contacts | {} \
                 obstacle contacts | {} warm or escaped particles",
                frame,
                fps,
                stats.pair_checks,
                stats.contacts,
                stats.obstacle_contacts,
                hot,
            );
        }
    }

    log::info!(
        "Simulated {} frames of {} particles in {:.2?} on {} workers",
        FRAMES,
        sim.particles().len(),
        started.elapsed(),
        sim.worker_count(),
    );
    Ok(())
}
