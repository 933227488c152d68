//! End-to-end round lifecycle tests
//!
//! Drive a game wired to the in-process fakes through countdown, mode start,
//! deaths, respawns and round end, checking what reached the engine.

use similar_asserts::assert_eq;
use zombiemod_core::config::ConfigFile;
use zombiemod_core::core::{ModeDefinition, ModeFlags, SlotId, Team};
use zombiemod_core::game::{
    PurchaseError, RoundEndReason, RoundState, TimerKind, TimerOwner, WinOutcome,
};
use zombiemod_core::services::Cue;
use zombiemod_core::sim::{build_game, EngineCall, ObserverEvent, SimGame};
use zombiemod_core::ZmError;

fn single_mode(ratio: f32, flags: ModeFlags) -> ConfigFile {
    let mut file = ConfigFile::builtin();
    file.modes = vec![ModeDefinition::new("normal", 0, 0, ratio, flags).with_sound("round/normal")];
    file
}

/// Connect and spawn `players` humans and prestart the first round
fn populated(file: &ConfigFile, players: usize) -> (SimGame, Vec<SlotId>) {
    let mut sim = build_game(file, 1234).unwrap();
    sim.game.logger.enable_capture();
    let slots: Vec<SlotId> = (0..players)
        .map(|i| sim.game.connect(&format!("Player {}", i + 1), false).unwrap())
        .collect();
    sim.game.prestart().unwrap();
    for &slot in &slots {
        assert!(sim.game.spawn(slot));
    }
    (sim, slots)
}

fn zombies(sim: &SimGame) -> Vec<SlotId> {
    sim.game
        .players
        .iter()
        .filter(|(_, p)| p.alive && p.is_zombie())
        .map(|(id, _)| id)
        .collect()
}

fn humans(sim: &SimGame) -> Vec<SlotId> {
    sim.game
        .players
        .iter()
        .filter(|(_, p)| p.alive && p.is_human())
        .map(|(id, _)| id)
        .collect()
}

#[test]
fn test_countdown_cues_and_start() {
    let file = ConfigFile::builtin();
    let (mut sim, _) = populated(&file, 2);
    sim.engine.clear();

    for second in 1..20 {
        sim.game.run_frame(second as f64);
        assert_eq!(sim.game.round.state, RoundState::New, "started early at {}s", second);
    }
    assert_eq!(sim.game.round.countdown, Some(1));

    sim.game.run_frame(20.0);
    assert_eq!(sim.game.round.state, RoundState::Active);
    assert!(sim.game.round.countdown_timer.is_none());

    let mut expected = vec![Cue::CountdownReminder(18)];
    expected.extend((1..=10).rev().map(Cue::Countdown));
    // Two alive players only qualify for the fallback mode
    let normal = sim.game.modes.by_name("normal").unwrap();
    expected.push(Cue::ModeStart {
        mode: normal,
        sound: "round/normal".to_string(),
    });
    assert_eq!(sim.engine.cues(), expected);

    assert!(sim
        .observer
        .events()
        .contains(&ObserverEvent::ModeStarted(normal)));
    assert_eq!(zombies(&sim).len(), 1);
    assert_eq!(humans(&sim).len(), 1);
}

#[test]
fn test_countdown_holds_with_one_player() {
    let file = ConfigFile::builtin();
    let (mut sim, _) = populated(&file, 1);
    for second in 1..=40 {
        sim.game.run_frame(second as f64);
    }
    assert_eq!(sim.game.round.state, RoundState::New);
    assert_eq!(sim.game.round.countdown, Some(20));
}

#[test]
fn test_prestart_without_modes_is_fatal() {
    let mut file = ConfigFile::builtin();
    file.modes.clear();
    let mut sim = build_game(&file, 1).unwrap();
    assert!(matches!(sim.game.prestart(), Err(ZmError::NoModes)));

    // Modes without a fallback cannot start a round either
    let mut file = ConfigFile::builtin();
    file.modes.retain(|m| m.chance > 0);
    let mut sim = build_game(&file, 1).unwrap();
    assert!(matches!(sim.game.prestart(), Err(ZmError::NoModes)));
}

#[test]
fn test_registry_closes_on_first_start() {
    let file = single_mode(0.5, ModeFlags::INFECTION);
    let (mut sim, _) = populated(&file, 4);
    let normal = sim.game.modes.by_name("normal").unwrap();
    sim.game.force_start(normal, None).unwrap();

    let late = ModeDefinition::new("late", 5, 0, 0.5, ModeFlags::INFECTION);
    assert!(matches!(
        sim.game.register_mode(late),
        Err(ZmError::RegistrationClosed(_))
    ));
    assert_eq!(sim.game.logger.logs_in("registry").len(), 1);
}

#[test]
fn test_force_start_checks_mode_and_state() {
    let file = single_mode(0.5, ModeFlags::INFECTION);
    let (mut sim, slots) = populated(&file, 4);
    let bogus = zombiemod_core::core::ModeId::new(99);
    assert!(matches!(
        sim.game.force_start(bogus, None),
        Err(ZmError::UnknownMode(99))
    ));

    let normal = sim.game.modes.by_name("normal").unwrap();
    sim.game.force_start(normal, Some(slots[2])).unwrap();
    assert!(sim.game.player(slots[2]).unwrap().is_zombie());

    assert!(matches!(
        sim.game.force_start(normal, None),
        Err(ZmError::IllegalTransition {
            from: RoundState::Active,
            to: RoundState::Active
        })
    ));
}

#[test]
fn test_zombies_win_updates_score_and_engine() {
    let file = single_mode(0.5, ModeFlags::INFECTION | ModeFlags::RESPAWN);
    let (mut sim, slots) = populated(&file, 2);
    let normal = sim.game.modes.by_name("normal").unwrap();
    sim.game.force_start(normal, Some(slots[0])).unwrap();
    sim.engine.clear();

    // The zombie kills the last human through the engine's kill path
    sim.game.on_player_death(slots[1], Some(slots[0]));

    assert_eq!(sim.game.round.state, RoundState::Ended);
    assert_eq!(sim.game.round.scores.zombies, 1);
    let calls = sim.engine.calls();
    assert!(calls.contains(&EngineCall::TeamScore {
        team: Team::Zombie,
        score: 1
    }));
    assert!(calls.contains(&EngineCall::TerminateRound {
        delay: 5.0,
        reason: RoundEndReason::ZombiesWin
    }));
    assert_eq!(sim.observer.last_round_end(), Some(RoundEndReason::ZombiesWin));
    // No respawn is queued once the round is over
    assert!(sim.game.player(slots[1]).unwrap().timers.respawn.is_none());
}

#[test]
fn test_round_time_expiry_favours_humans() {
    let file = single_mode(0.25, ModeFlags::INFECTION);
    let (mut sim, _) = populated(&file, 4);
    let normal = sim.game.modes.by_name("normal").unwrap();
    sim.game.force_start(normal, None).unwrap();

    sim.game.on_round_time_expired().unwrap();
    assert_eq!(sim.game.round.state, RoundState::Ended);
    assert_eq!(sim.game.round.scores.humans, 1);

    // A second expiry after the end is ignored
    sim.game.on_round_time_expired().unwrap();
    assert_eq!(sim.game.round.scores.humans, 1);
}

#[test]
fn test_terminate_outside_active_is_illegal() {
    let file = ConfigFile::builtin();
    let (mut sim, _) = populated(&file, 3);
    let err = sim.game.terminate(RoundEndReason::Draw).unwrap_err();
    assert!(matches!(
        err,
        ZmError::IllegalTransition {
            from: RoundState::New,
            to: RoundState::Ended
        }
    ));
}

#[test]
fn test_next_round_does_not_repeat_mode() {
    let mut file = ConfigFile::builtin();
    file.modes = vec![
        ModeDefinition::new("normal", 0, 0, 0.1, ModeFlags::INFECTION),
        ModeDefinition::new("always", 1, 0, 0.5, ModeFlags::INFECTION),
    ];
    let (mut sim, slots) = populated(&file, 4);
    let always = sim.game.modes.by_name("always").unwrap();
    let normal = sim.game.modes.by_name("normal").unwrap();

    assert_eq!(sim.game.start_round().unwrap(), always);
    sim.game.on_round_time_expired().unwrap();

    sim.game.prestart().unwrap();
    for &slot in &slots {
        sim.game.spawn(slot);
    }
    assert_eq!(sim.game.start_round().unwrap(), normal);
    assert_eq!(sim.game.round.number, 2);
}

#[test]
fn test_respawn_as_zombie() {
    let file = single_mode(0.25, ModeFlags::INFECTION | ModeFlags::RESPAWN);
    let (mut sim, slots) = populated(&file, 4);
    let normal = sim.game.modes.by_name("normal").unwrap();
    sim.game.force_start(normal, Some(slots[0])).unwrap();
    let victim = slots[1];

    sim.game.on_player_death(victim, Some(slots[0]));
    let record = sim.game.player(victim).unwrap();
    assert!(!record.alive);
    assert!(record.respawning);
    assert!(record.timers.respawn.is_some());
    assert_eq!(sim.game.validate_round(true), WinOutcome::Continuing);

    let killer = sim.game.player(slots[0]).unwrap();
    assert_eq!(killer.experience, 1);

    sim.engine.clear();
    sim.game.run_frame(4.9);
    assert!(!sim.game.is_alive(victim));
    sim.game.run_frame(5.0);

    let record = sim.game.player(victim).unwrap();
    assert!(record.alive);
    assert!(record.is_zombie());
    assert!(!record.respawning);
    assert_eq!(record.team, Team::Zombie);
    assert!(sim.engine.calls().contains(&EngineCall::PlayerTeam {
        slot: victim,
        team: Team::Zombie
    }));
}

#[test]
fn test_respawn_resets_per_life_counters() {
    let file = single_mode(0.25, ModeFlags::INFECTION | ModeFlags::RESPAWN);
    let (mut sim, slots) = populated(&file, 4);
    let normal = sim.game.modes.by_name("normal").unwrap();
    sim.game.force_start(normal, Some(slots[0])).unwrap();
    let victim = slots[1];

    sim.game.player_mut(victim).unwrap().currency = 10;
    assert_eq!(sim.game.purchase(victim, "grenade", 3, 1), Ok(()));
    assert_eq!(
        sim.game.purchase(victim, "grenade", 3, 1),
        Err(PurchaseError::LimitReached(1))
    );
    assert_eq!(sim.game.player(victim).unwrap().pending_purchase, 3);

    sim.game.on_player_death(victim, Some(slots[0]));
    assert_eq!(sim.game.player(victim).unwrap().respawn_count, 1);
    sim.game.run_frame(5.0);

    let record = sim.game.player(victim).unwrap();
    assert!(record.alive);
    assert_eq!(record.pending_purchase, 0);
    assert_eq!(record.respawn_count, 0);
    assert!(record.purchases.is_empty());
    assert_eq!(record.respawns, 1);
    assert_eq!(sim.game.purchase(victim, "grenade", 3, 1), Ok(()));

    // The round tally keeps counting across lives
    sim.game.on_player_death(victim, Some(slots[0]));
    sim.game.run_frame(10.0);
    assert_eq!(sim.game.player(victim).unwrap().respawns, 2);

    sim.game.prestart().unwrap();
    assert_eq!(sim.game.player(victim).unwrap().respawns, 0);
}

#[test]
fn test_no_respawn_without_flag() {
    let file = single_mode(0.25, ModeFlags::INFECTION);
    let (mut sim, slots) = populated(&file, 4);
    let normal = sim.game.modes.by_name("normal").unwrap();
    sim.game.force_start(normal, Some(slots[0])).unwrap();

    sim.game.on_player_death(slots[1], Some(slots[0]));
    let record = sim.game.player(slots[1]).unwrap();
    assert!(!record.respawning);
    assert!(record.timers.is_empty());
    assert_eq!(sim.game.owned_timer_count(slots[1], TimerKind::Respawn), 0);
}

#[test]
fn test_stale_timer_cancels_itself_after_slot_reuse() {
    let file = single_mode(0.5, ModeFlags::INFECTION);
    let (mut sim, slots) = populated(&file, 3);
    let slot = slots[2];

    // A timer the record does not track survives the disconnect
    let owner = sim.game.owner_of(slot).unwrap();
    let stray = sim
        .game
        .scheduler
        .schedule_repeating(TimerKind::Regen, Some(owner), 1.0);

    assert!(sim.game.disconnect(slot));
    let reused = sim.game.connect("Newcomer", false).unwrap();
    assert_eq!(reused, slot);
    assert_ne!(
        sim.game.owner_of(reused),
        Some(TimerOwner {
            slot,
            serial: owner.serial
        })
    );

    sim.game.run_frame(1.0);
    assert!(!sim.game.scheduler.is_active(stray));
    assert!(sim
        .game
        .logger
        .logs_in("timer")
        .iter()
        .any(|e| e.message.contains("stale")));
}

#[test]
fn test_disconnect_cancels_owned_timers() {
    let file = single_mode(0.5, ModeFlags::INFECTION);
    let (mut sim, slots) = populated(&file, 4);
    let normal = sim.game.modes.by_name("normal").unwrap();
    sim.game.force_start(normal, Some(slots[0])).unwrap();
    assert_eq!(sim.game.owned_timer_count(slots[0], TimerKind::Regen), 1);

    let before = sim.game.scheduler.len();
    sim.game.disconnect(slots[0]);
    assert_eq!(sim.game.owned_timer_count(slots[0], TimerKind::Regen), 0);
    assert_eq!(sim.game.owned_timer_count(slots[0], TimerKind::Moan), 0);
    assert!(sim.game.scheduler.len() < before);
}

#[test]
fn test_last_zombie_leaving_ends_round() {
    let file = single_mode(0.25, ModeFlags::INFECTION);
    let (mut sim, slots) = populated(&file, 4);
    let normal = sim.game.modes.by_name("normal").unwrap();
    sim.game.force_start(normal, Some(slots[3])).unwrap();

    sim.game.disconnect(slots[3]);
    assert_eq!(sim.game.round.state, RoundState::Ended);
    assert_eq!(sim.observer.last_round_end(), Some(RoundEndReason::HumansWin));
}

#[test]
fn test_hud_refresh_is_deferred_to_next_frame() {
    let file = single_mode(0.5, ModeFlags::INFECTION);
    let (mut sim, slots) = populated(&file, 2);
    let normal = sim.game.modes.by_name("normal").unwrap();
    sim.game.run_frame(0.5);
    sim.engine.clear();

    sim.game.force_start(normal, Some(slots[0])).unwrap();
    let refreshed = |sim: &SimGame| {
        sim.engine
            .calls()
            .iter()
            .filter(|c| matches!(c, EngineCall::RefreshLoadout { .. }))
            .count()
    };
    assert_eq!(refreshed(&sim), 0);

    sim.game.run_frame(0.5);
    assert_eq!(refreshed(&sim), 2);
    assert!(sim.game.player(slots[0]).unwrap().timers.hud.is_none());
}

#[test]
fn test_same_seed_same_log() {
    let run = || {
        let mut file = ConfigFile::builtin();
        file.tunables.countdown_seconds = 3;
        let (mut sim, slots) = populated(&file, 12);
        for second in 1..=3 {
            sim.game.run_frame(second as f64);
        }
        let zombie = zombies(&sim)[0];
        for &slot in &slots {
            if slot != zombie {
                let event = zombiemod_core::game::DamageEvent::new(slot, Some(zombie), 10.0);
                sim.game.on_take_damage(&event);
            }
        }
        let messages: Vec<String> = sim.game.logger.logs().iter().map(|e| e.message.clone()).collect();
        messages
    };
    assert_eq!(run(), run());
}
