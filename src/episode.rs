// CLASSIFICATION: COMMUNITY
// Filename: episode.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

//! Episode bookkeeping and the automatic map restart policy.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::shm::GameVarsBlock;

/// Tics a pending restart may take before the policy resumes regardless.
pub const RESTART_SETTLE_TICS: u32 = 35;

/// Which conditions restart the map on their own.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestartPolicy {
    /// Map length limit in tics; zero disables the timeout.
    pub map_timeout: u32,
    pub restart_on_timeout: bool,
    pub restart_on_player_death: bool,
    pub restart_on_map_end: bool,
}

impl RestartPolicy {
    /// Master switch over the three restart conditions.
    pub fn set_all(&mut self, enabled: bool) {
        self.restart_on_timeout = enabled;
        self.restart_on_player_death = enabled;
        self.restart_on_map_end = enabled;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum RestartReason {
    MapEnd,
    PlayerDeath,
    Timeout,
}

/// Controller-side view of the current map.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EpisodeState {
    pub map_start_tic: u32,
    pub map_last_tic: u32,
    pub restart_count: u32,
    pub map_ended: bool,
    pub map_restarting: bool,
    map_tic_at_restart: u32,
    engine_map_start_at_restart: u32,
}

/// Applies a [`RestartPolicy`] to the game vars of every completed tic.
#[derive(Clone, Debug, Default)]
pub struct EpisodePolicy {
    policy: RestartPolicy,
    state: EpisodeState,
}

impl EpisodePolicy {
    pub fn new(policy: RestartPolicy) -> Self {
        Self {
            policy,
            state: EpisodeState::default(),
        }
    }

    pub fn policy(&self) -> &RestartPolicy {
        &self.policy
    }

    pub fn policy_mut(&mut self) -> &mut RestartPolicy {
        &mut self.policy
    }

    pub fn state(&self) -> &EpisodeState {
        &self.state
    }

    /// Reset local bookkeeping for a map starting at `start_tic`. The
    /// restart counter survives.
    pub fn begin_map(&mut self, start_tic: u32) {
        self.state = EpisodeState {
            map_start_tic: start_tic,
            map_last_tic: start_tic.saturating_sub(1),
            restart_count: self.state.restart_count,
            ..EpisodeState::default()
        };
    }

    /// Record a restart issued after the tic described by `vars`. The
    /// map-ended flag holds until the engine reports the new map.
    pub fn note_restart(&mut self, vars: &GameVarsBlock) {
        let count = self.state.restart_count.saturating_add(1);
        let ended = self.state.map_ended;
        self.begin_map(vars.game_tic.saturating_add(1));
        self.state.restart_count = count;
        self.state.map_ended = ended;
        self.state.map_restarting = true;
        self.state.map_tic_at_restart = vars.map_tic;
        self.state.engine_map_start_at_restart = vars.map_start_tic;
    }

    // A new map shows up as a new engine start tic, or as the map tic
    // running backwards.
    fn map_reloaded(&self, vars: &GameVarsBlock) -> bool {
        vars.map_start_tic != self.state.engine_map_start_at_restart
            || vars.map_tic < self.state.map_tic_at_restart
    }

    /// Inspect a completed tic and decide whether the map must restart.
    pub fn observe(&mut self, vars: &GameVarsBlock) -> Option<RestartReason> {
        self.state.map_last_tic = vars.game_tic;
        if self.state.map_restarting {
            let reloaded = self.map_reloaded(vars);
            let settled =
                vars.game_tic.saturating_sub(self.state.map_start_tic) >= RESTART_SETTLE_TICS;
            if !reloaded && !settled {
                return None;
            }
            if !reloaded {
                warn!(
                    "engine did not report a new map {} tics after restart",
                    RESTART_SETTLE_TICS
                );
            }
            self.state.map_restarting = false;
        }

        self.state.map_ended = vars.is_map_end();
        let reason = if vars.is_map_end() && self.policy.restart_on_map_end {
            Some(RestartReason::MapEnd)
        } else if vars.is_player_dead() && self.policy.restart_on_player_death {
            Some(RestartReason::PlayerDeath)
        } else if self.policy.restart_on_timeout && self.timed_out(vars.game_tic) {
            Some(RestartReason::Timeout)
        } else {
            None
        };
        if let Some(reason) = reason {
            info!("map restart due at tic {}: {:?}", vars.game_tic, reason);
        }
        reason
    }

    fn timed_out(&self, game_tic: u32) -> bool {
        self.policy.map_timeout != 0
            && game_tic.saturating_sub(self.state.map_start_tic) >= self.policy.map_timeout
    }

    pub fn is_map_first_tic(&self, vars: &GameVarsBlock) -> bool {
        vars.game_tic == self.state.map_start_tic
    }

    /// True on the tic at which the map ends or its timeout expires.
    pub fn is_map_last_tic(&self, vars: &GameVarsBlock) -> bool {
        vars.is_map_end() || self.timed_out(vars.game_tic)
    }

    pub fn is_map_ended(&self) -> bool {
        self.state.map_ended
    }

    pub fn restart_count(&self) -> u32 {
        self.state.restart_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(game_tic: u32, map_tic: u32) -> GameVarsBlock {
        GameVarsBlock {
            game_tic,
            map_tic,
            map_start_tic: game_tic + 1 - map_tic.max(1),
            ..GameVarsBlock::default()
        }
    }

    #[test]
    fn timeout_fires_once_at_tic_after_limit() {
        let mut episode = EpisodePolicy::new(RestartPolicy {
            map_timeout: 100,
            restart_on_timeout: true,
            ..RestartPolicy::default()
        });
        episode.begin_map(1);
        let mut fired = Vec::new();
        for tic in 1..=150u32 {
            let v = vars(tic, tic);
            if let Some(reason) = episode.observe(&v) {
                fired.push((tic, reason));
                episode.note_restart(&v);
            }
        }
        assert_eq!(fired, vec![(101, RestartReason::Timeout)]);
        assert_eq!(episode.state().map_start_tic, 102);
        assert_eq!(episode.restart_count(), 1);
    }

    #[test]
    fn zero_timeout_never_fires() {
        let mut episode = EpisodePolicy::new(RestartPolicy {
            restart_on_timeout: true,
            ..RestartPolicy::default()
        });
        episode.begin_map(1);
        assert!((1..1000).all(|t| episode.observe(&vars(t, t)).is_none()));
    }

    #[test]
    fn map_end_outranks_death() {
        let mut policy = RestartPolicy::default();
        policy.set_all(true);
        let mut episode = EpisodePolicy::new(policy);
        episode.begin_map(1);
        let mut v = vars(5, 5);
        v.map_end = 1;
        v.player_dead = 1;
        assert_eq!(episode.observe(&v), Some(RestartReason::MapEnd));
        assert!(episode.is_map_ended());
        assert!(episode.is_map_last_tic(&v));
    }

    #[test]
    fn death_restarts_once_while_engine_reloads() {
        let mut episode = EpisodePolicy::new(RestartPolicy {
            restart_on_player_death: true,
            ..RestartPolicy::default()
        });
        episode.begin_map(1);
        let mut dead = vars(10, 10);
        dead.player_dead = 1;
        assert_eq!(episode.observe(&dead), Some(RestartReason::PlayerDeath));
        episode.note_restart(&dead);

        let mut still_dead = vars(11, 11);
        still_dead.player_dead = 1;
        assert_eq!(episode.observe(&still_dead), None);
        assert!(episode.state().map_restarting);

        assert_eq!(episode.observe(&vars(12, 1)), None);
        assert!(!episode.state().map_restarting);
        assert_eq!(episode.restart_count(), 1);
    }

    #[test]
    fn restart_on_the_first_map_tic_resumes_with_the_new_map() {
        let mut episode = EpisodePolicy::new(RestartPolicy {
            restart_on_player_death: true,
            ..RestartPolicy::default()
        });
        episode.begin_map(1);
        let mut fired = Vec::new();
        for tic in 1..=4u32 {
            let mut v = vars(tic, 1);
            v.map_start_tic = tic;
            v.player_dead = 1;
            if let Some(reason) = episode.observe(&v) {
                fired.push(tic);
                assert_eq!(reason, RestartReason::PlayerDeath);
                episode.note_restart(&v);
            }
        }
        assert_eq!(fired, vec![1, 2, 3, 4]);
        assert_eq!(episode.restart_count(), 4);
    }

    #[test]
    fn restart_right_after_start_is_not_held_for_the_settle_window() {
        let mut episode = EpisodePolicy::new(RestartPolicy {
            restart_on_map_end: true,
            ..RestartPolicy::default()
        });
        episode.begin_map(1);
        episode.note_restart(&GameVarsBlock::default());
        let mut reloaded = vars(1, 1);
        reloaded.map_start_tic = 1;
        reloaded.map_end = 1;
        assert_eq!(episode.observe(&reloaded), Some(RestartReason::MapEnd));
        assert!(!episode.state().map_restarting);
    }

    #[test]
    fn stale_map_holds_the_policy_until_it_settles() {
        let mut episode = EpisodePolicy::new(RestartPolicy {
            restart_on_player_death: true,
            ..RestartPolicy::default()
        });
        episode.begin_map(1);
        let mut dead = vars(5, 5);
        dead.player_dead = 1;
        episode.note_restart(&dead);
        let mut fired = None;
        for tic in 6..=60u32 {
            let mut stale = vars(tic, tic);
            stale.map_start_tic = dead.map_start_tic;
            stale.player_dead = 1;
            if episode.observe(&stale).is_some() {
                fired = Some(tic);
                break;
            }
        }
        assert_eq!(fired, Some(6 + RESTART_SETTLE_TICS));
    }

    #[test]
    fn disabled_conditions_only_track_state() {
        let mut episode = EpisodePolicy::new(RestartPolicy::default());
        episode.begin_map(1);
        let mut v = vars(3, 3);
        v.map_end = 1;
        v.player_dead = 1;
        assert_eq!(episode.observe(&v), None);
        assert!(episode.is_map_ended());
        assert!(!episode.is_map_first_tic(&v));
        assert!(episode.is_map_first_tic(&vars(1, 1)));
    }
}
