//! Random-combat round driver
//!
//! Stands in for the host game loop: connects a population, pumps frames
//! and throws random hits between the factions until the round resolves.

use crate::config::ConfigFile;
use crate::core::SlotId;
use crate::game::{DamageEvent, DamageOutcome, HitGroup, RoundEndReason, RoundState, VerbosityLevel};
use crate::sim::{build_game, SimGame};
use crate::Result;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};

/// Parameters of a simulated session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub players: usize,
    /// Share of the population flagged as bots
    pub bot_ratio: f32,
    /// Seconds per frame
    pub frame_time: f64,
    /// Random hits attempted per frame once the round is running
    pub hits_per_frame: usize,
    pub min_damage: f32,
    pub max_damage: f32,
    /// Round timer; humans win when it runs out
    pub round_seconds: f64,
    /// Hard stop for a round that never resolves (e.g. a lone player)
    pub max_frames: u64,
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            players: 16,
            bot_ratio: 0.5,
            frame_time: 0.1,
            hits_per_frame: 2,
            min_damage: 10.0,
            max_damage: 60.0,
            round_seconds: 180.0,
            max_frames: 100_000,
            seed: 42,
        }
    }
}

/// Summary of one simulated round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub round: u32,
    pub mode: Option<String>,
    pub reason: Option<RoundEndReason>,
    pub frames: u64,
    /// Simulated seconds from prestart to the end of the round
    pub duration: f64,
    pub infections: u32,
    pub kills: u32,
    pub absorbed: u32,
    /// Respawns completed during the round
    pub respawns: u32,
    pub humans_alive: usize,
    pub zombies_alive: usize,
}

pub struct RoundSimulation {
    pub sim: SimGame,
    pub config: SimulationConfig,
    rng: ChaCha12Rng,
    slots: Vec<SlotId>,
    now: f64,
    started_at: f64,
    active_since: Option<f64>,
}

impl RoundSimulation {
    pub fn new(file: &ConfigFile, config: SimulationConfig) -> Result<Self> {
        let mut sim = build_game(file, config.seed)?;
        sim.game.logger.set_verbosity(VerbosityLevel::Silent);
        // Driver randomness is kept apart from the game's own stream
        let rng = ChaCha12Rng::seed_from_u64(config.seed ^ 0x5A5A_5A5A_5A5A_5A5A);
        Ok(RoundSimulation {
            sim,
            config,
            rng,
            slots: Vec::new(),
            now: 0.0,
            started_at: 0.0,
            active_since: None,
        })
    }

    /// Connect the population (first call only) and prestart a round
    pub fn setup(&mut self) -> Result<()> {
        if self.slots.is_empty() {
            let bots = (self.config.players as f32 * self.config.bot_ratio).round() as usize;
            for i in 0..self.config.players {
                let is_bot = i < bots;
                let name = if is_bot {
                    format!("Bot {}", i + 1)
                } else {
                    format!("Player {}", i + 1)
                };
                let slot = self.sim.game.connect(&name, is_bot)?;
                self.sim.access.set_level(slot, self.rng.gen_range(0..12));
                self.slots.push(slot);
            }
        }

        self.sim.game.prestart()?;
        for &slot in &self.slots {
            self.sim.game.spawn(slot);
        }
        Ok(())
    }

    pub fn now(&self) -> f64 {
        self.now
    }

    /// Advance one frame; returns false once the round has ended
    pub fn step(&mut self, result: &mut SimulationResult) -> Result<bool> {
        self.now += self.config.frame_time;
        self.sim.game.run_frame(self.now);
        result.frames += 1;

        match self.sim.game.round.state {
            RoundState::New => return Ok(result.frames < self.config.max_frames),
            RoundState::Ended => return Ok(false),
            RoundState::Active => {}
        }

        let since = *self.active_since.get_or_insert(self.now);
        if self.now - since >= self.config.round_seconds {
            self.sim.game.on_round_time_expired()?;
            return Ok(false);
        }

        for _ in 0..self.config.hits_per_frame {
            self.random_hit(result);
            if self.sim.game.round.state != RoundState::Active {
                return Ok(false);
            }
        }
        Ok(result.frames < self.config.max_frames)
    }

    fn random_hit(&mut self, result: &mut SimulationResult) {
        let alive = self.sim.game.alive_slots();
        let Some(&attacker) = alive.choose(&mut self.rng) else {
            return;
        };
        let attacker_zombie = self
            .sim
            .game
            .player(attacker)
            .is_some_and(|p| p.is_zombie());
        let targets: Vec<SlotId> = alive
            .into_iter()
            .filter(|&s| {
                self.sim
                    .game
                    .player(s)
                    .is_some_and(|p| p.is_zombie() != attacker_zombie)
            })
            .collect();
        let Some(&victim) = targets.choose(&mut self.rng) else {
            return;
        };

        let amount = self.rng.gen_range(self.config.min_damage..=self.config.max_damage);
        let hitgroup = if self.rng.gen_ratio(1, 5) {
            HitGroup::Head
        } else {
            HitGroup::Chest
        };
        let event = DamageEvent::new(victim, Some(attacker), amount).with_hitgroup(hitgroup);

        match self.sim.game.on_take_damage(&event) {
            DamageOutcome::Infected => result.infections += 1,
            DamageOutcome::Absorbed { .. } => result.absorbed += 1,
            DamageOutcome::Lethal { .. } => {
                // The engine's kill path
                result.kills += 1;
                self.sim.game.on_player_death(victim, Some(attacker));
            }
            DamageOutcome::Applied { .. } | DamageOutcome::Blocked(_) => {}
        }
    }

    /// Prestart a round and return its empty result record
    pub fn begin(&mut self) -> Result<SimulationResult> {
        self.setup()?;
        self.started_at = self.now;
        self.active_since = None;
        Ok(SimulationResult {
            round: self.sim.game.round.number,
            mode: None,
            reason: None,
            frames: 0,
            duration: 0.0,
            infections: 0,
            kills: 0,
            absorbed: 0,
            respawns: 0,
            humans_alive: 0,
            zombies_alive: 0,
        })
    }

    /// Fill in the end-of-round fields
    pub fn finish(&self, result: &mut SimulationResult) {
        result.mode = self
            .sim
            .game
            .current_mode()
            .map(|m| m.def.name.to_string());
        if self.sim.game.round.state == RoundState::Ended {
            result.reason = self.sim.observer.last_round_end();
        }
        result.duration = self.now - self.started_at;
        result.respawns = self
            .sim
            .game
            .players
            .iter()
            .map(|(_, p)| p.respawns)
            .sum();
        let population = self.sim.game.population();
        result.humans_alive = population.humans;
        result.zombies_alive = population.zombies;
    }

    /// Play one full round from prestart to its end
    pub fn run(&mut self) -> Result<SimulationResult> {
        let mut result = self.begin()?;
        while self.step(&mut result)? {}
        self.finish(&mut result);
        Ok(result)
    }

    /// Play `rounds` consecutive rounds on the same population
    pub fn run_rounds(&mut self, rounds: usize) -> Result<Vec<SimulationResult>> {
        (0..rounds).map(|_| self.run()).collect()
    }
}
