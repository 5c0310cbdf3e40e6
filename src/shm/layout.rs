// CLASSIFICATION: COMMUNITY
// Filename: layout.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

//! Fixed-layout records shared with the engine.
//!
//! Both structs are `#[repr(C)]` and mirror the engine's declarations field
//! for field. Booleans are single bytes, `size_t` fields are `u64`. Never
//! reorder, add or remove fields on one side only.

use serde::{Deserialize, Serialize};

use crate::catalog::{Button, GameVar, BUTTON_COUNT};

/// Number of scriptable user variables.
pub const USER_VAR_COUNT: usize = 30;

/// Ammo, weapon and key slots.
pub const SLOT_COUNT: usize = 10;

/// Controller-to-engine input record.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InputBlock {
    pub mouse_x: i32,
    pub mouse_y: i32,
    pub mouse_max_x: i32,
    pub mouse_max_y: i32,
    pub buttons: [u8; BUTTON_COUNT],
    pub buttons_available: [u8; BUTTON_COUNT],
}

impl InputBlock {
    /// Idle input: centred mouse clamped to the screen, nothing pressed,
    /// every button available.
    pub fn neutral(max_x: i32, max_y: i32) -> Self {
        Self {
            mouse_x: 0,
            mouse_y: 0,
            mouse_max_x: max_x,
            mouse_max_y: max_y,
            buttons: [0; BUTTON_COUNT],
            buttons_available: [1; BUTTON_COUNT],
        }
    }

    pub fn is_pressed(&self, button: Button) -> bool {
        self.buttons[button.index()] != 0
    }

    pub fn is_available(&self, button: Button) -> bool {
        self.buttons_available[button.index()] != 0
    }

    /// Press or release `button`. Unavailable buttons stay released.
    pub fn set_button(&mut self, button: Button, pressed: bool) -> bool {
        let applied = !pressed || self.is_available(button);
        self.buttons[button.index()] = u8::from(pressed && applied);
        applied
    }

    pub fn set_available(&mut self, button: Button, allowed: bool) {
        self.buttons_available[button.index()] = u8::from(allowed);
        if !allowed {
            self.buttons[button.index()] = 0;
        }
    }

    pub fn set_mouse_x(&mut self, x: i32) {
        self.mouse_x = clamp_axis(x, self.mouse_max_x);
    }

    pub fn set_mouse_y(&mut self, y: i32) {
        self.mouse_y = clamp_axis(y, self.mouse_max_y);
    }
}

impl Default for InputBlock {
    fn default() -> Self {
        Self::neutral(0, 0)
    }
}

fn clamp_axis(value: i32, max: i32) -> i32 {
    if max > 0 {
        value.clamp(-max, max)
    } else {
        value
    }
}

/// Engine-to-controller game state record.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameVarsBlock {
    pub game_tic: u32,
    pub game_seed: u32,
    pub game_static_seed: u32,

    pub screen_width: u32,
    pub screen_height: u32,
    pub screen_pitch: u64,
    pub screen_size: u64,
    pub screen_format: i32,

    pub map_reward: i32,
    pub shaping_reward: i32,

    pub map_user_vars: [i32; USER_VAR_COUNT],

    pub map_start_tic: u32,
    pub map_tic: u32,

    pub map_kill_count: i32,
    pub map_item_count: i32,
    pub map_secret_count: i32,
    pub map_end: u8,

    pub player_dead: u8,

    pub player_kill_count: i32,
    pub player_item_count: i32,
    pub player_secret_count: i32,
    pub player_frag_count: i32,

    pub player_on_ground: u8,

    pub player_health: i32,
    pub player_armor: i32,

    pub player_selected_weapon: i32,
    pub player_selected_weapon_ammo: i32,

    pub player_ammo: [i32; SLOT_COUNT],
    pub player_weapon: [u8; SLOT_COUNT],
    pub player_key: [u8; SLOT_COUNT],
}

impl GameVarsBlock {
    pub fn is_map_end(&self) -> bool {
        self.map_end != 0
    }

    pub fn is_player_dead(&self) -> bool {
        self.player_dead != 0
    }

    /// User variable `number`, 1-based like the engine's scripting API.
    pub fn user_var(&self, number: usize) -> Option<i32> {
        number
            .checked_sub(1)
            .and_then(|i| self.map_user_vars.get(i))
            .copied()
    }

    pub fn ammo(&self, slot: usize) -> Option<i32> {
        self.player_ammo.get(slot).copied()
    }

    pub fn has_weapon(&self, slot: usize) -> bool {
        self.player_weapon.get(slot).is_some_and(|w| *w != 0)
    }

    pub fn has_key(&self, slot: usize) -> bool {
        self.player_key.get(slot).is_some_and(|k| *k != 0)
    }

    /// Scalar value of `var`; flags read as 0 or 1.
    pub fn get(&self, var: GameVar) -> i32 {
        use GameVar::*;
        match var {
            GameTic => self.game_tic as i32,
            MapReward => self.map_reward,
            ShapingReward => self.shaping_reward,
            MapTic => self.map_tic as i32,
            MapKillCount => self.map_kill_count,
            MapItemCount => self.map_item_count,
            MapSecretCount => self.map_secret_count,
            PlayerDead => i32::from(self.player_dead != 0),
            PlayerKillCount => self.player_kill_count,
            PlayerItemCount => self.player_item_count,
            PlayerSecretCount => self.player_secret_count,
            PlayerFragCount => self.player_frag_count,
            PlayerOnGround => i32::from(self.player_on_ground != 0),
            Health => self.player_health,
            Armor => self.player_armor,
            SelectedWeapon => self.player_selected_weapon,
            SelectedWeaponAmmo => self.player_selected_weapon_ammo,
            Ammo1 => self.player_ammo[1],
            Ammo2 => self.player_ammo[2],
            Ammo3 => self.player_ammo[3],
            Ammo4 => self.player_ammo[4],
            Weapon1 => i32::from(self.has_weapon(1)),
            Weapon2 => i32::from(self.has_weapon(2)),
            Weapon3 => i32::from(self.has_weapon(3)),
            Weapon4 => i32::from(self.has_weapon(4)),
            Weapon5 => i32::from(self.has_weapon(5)),
            Weapon6 => i32::from(self.has_weapon(6)),
            Weapon7 => i32::from(self.has_weapon(7)),
            Key1 => i32::from(self.has_key(1)),
            Key2 => i32::from(self.has_key(2)),
            Key3 => i32::from(self.has_key(3)),
            User1 => self.map_user_vars[0],
            User2 => self.map_user_vars[1],
            User3 => self.map_user_vars[2],
            User4 => self.map_user_vars[3],
            User5 => self.map_user_vars[4],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{align_of, size_of};

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn record_sizes_match_the_engine_abi() {
        assert_eq!(size_of::<InputBlock>(), 16 + 2 * BUTTON_COUNT);
        assert_eq!(size_of::<GameVarsBlock>(), 296);
        assert_eq!(align_of::<GameVarsBlock>(), 8);
    }

    #[test]
    fn unavailable_buttons_cannot_be_pressed() {
        let mut input = InputBlock::neutral(320, 240);
        input.set_available(Button::Attack, false);
        assert!(!input.set_button(Button::Attack, true));
        assert!(!input.is_pressed(Button::Attack));
        assert!(input.set_button(Button::Use, true));
        assert!(input.is_pressed(Button::Use));
    }

    #[test]
    fn mouse_is_clamped_to_bounds() {
        let mut input = InputBlock::neutral(320, 240);
        input.set_mouse_x(1000);
        input.set_mouse_y(-1000);
        assert_eq!((input.mouse_x, input.mouse_y), (320, -240));
    }

    #[test]
    fn user_vars_are_one_based() {
        let mut vars = GameVarsBlock::default();
        vars.map_user_vars[0] = 7;
        assert_eq!(vars.user_var(1), Some(7));
        assert_eq!(vars.user_var(0), None);
        assert_eq!(vars.user_var(USER_VAR_COUNT + 1), None);
        assert_eq!(vars.get(GameVar::User1), 7);
    }
}
