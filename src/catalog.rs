// CLASSIFICATION: COMMUNITY
// Filename: catalog.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

//! Button and game variable identifiers with their canonical names.

use std::collections::HashMap;
use std::str::FromStr;

use once_cell::sync::Lazy;

use crate::error::ControllerError;

macro_rules! named_enum {
    (
        $(#[$meta:meta])* $name:ident,
        $table:ident { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        static $table: Lazy<HashMap<&'static str, $name>> =
            Lazy::new(|| $name::ALL.iter().map(|v| (v.name(), *v)).collect());

        impl FromStr for $name {
            type Err = ControllerError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $table
                    .get(s.trim().to_ascii_uppercase().as_str())
                    .copied()
                    .ok_or_else(|| {
                        ControllerError::Config(format!(
                            concat!("unknown ", stringify!($name), " `{}`"),
                            s
                        ))
                    })
            }
        }
    };
}

named_enum! {
    /// Engine input buttons, in input block order.
    Button, BUTTON_TABLE {
        Attack => "ATTACK",
        Use => "USE",
        Jump => "JUMP",
        Crouch => "CROUCH",
        Turn180 => "TURN180",
        AltAttack => "ALTATTACK",
        Reload => "RELOAD",
        Zoom => "ZOOM",
        Speed => "SPEED",
        Strafe => "STRAFE",
        MoveRight => "MOVE_RIGHT",
        MoveLeft => "MOVE_LEFT",
        MoveBack => "MOVE_BACK",
        MoveForward => "MOVE_FORWARD",
        TurnRight => "TURN_RIGHT",
        TurnLeft => "TURN_LEFT",
        LookUp => "LOOK_UP",
        LookDown => "LOOK_DOWN",
        MoveUp => "MOVE_UP",
        MoveDown => "MOVE_DOWN",
        Land => "LAND",
        SelectWeapon1 => "SELECT_WEAPON1",
        SelectWeapon2 => "SELECT_WEAPON2",
        SelectWeapon3 => "SELECT_WEAPON3",
        SelectWeapon4 => "SELECT_WEAPON4",
        SelectWeapon5 => "SELECT_WEAPON5",
        SelectWeapon6 => "SELECT_WEAPON6",
        SelectWeapon7 => "SELECT_WEAPON7",
        SelectWeapon8 => "SELECT_WEAPON8",
        SelectWeapon9 => "SELECT_WEAPON9",
        SelectWeapon0 => "SELECT_WEAPON0",
        SelectNextWeapon => "SELECT_NEXT_WEAPON",
        SelectPrevWeapon => "SELECT_PREV_WEAPON",
        DropSelectedWeapon => "DROP_SELECTED_WEAPON",
        ActivateSelectedItem => "ACTIVATE_SELECTED_ITEM",
        SelectNextItem => "SELECT_NEXT_ITEM",
        SelectPrevItem => "SELECT_PREV_ITEM",
        DropSelectedItem => "DROP_SELECTED_ITEM",
    }
}

named_enum! {
    /// Scalar game variables readable through `GameVarsBlock::get`.
    GameVar, GAME_VAR_TABLE {
        GameTic => "GAME_TIC",
        MapReward => "MAP_REWARD",
        ShapingReward => "SHAPING_REWARD",
        MapTic => "MAP_TIC",
        MapKillCount => "MAP_KILLCOUNT",
        MapItemCount => "MAP_ITEMCOUNT",
        MapSecretCount => "MAP_SECRETCOUNT",
        PlayerDead => "PLAYER_DEAD",
        PlayerKillCount => "PLAYER_KILLCOUNT",
        PlayerItemCount => "PLAYER_ITEMCOUNT",
        PlayerSecretCount => "PLAYER_SECRETCOUNT",
        PlayerFragCount => "PLAYER_FRAGCOUNT",
        PlayerOnGround => "PLAYER_ONGROUND",
        Health => "HEALTH",
        Armor => "ARMOR",
        SelectedWeapon => "SELECTED_WEAPON",
        SelectedWeaponAmmo => "SELECTED_WEAPON_AMMO",
        Ammo1 => "AMMO1",
        Ammo2 => "AMMO2",
        Ammo3 => "AMMO3",
        Ammo4 => "AMMO4",
        Weapon1 => "WEAPON1",
        Weapon2 => "WEAPON2",
        Weapon3 => "WEAPON3",
        Weapon4 => "WEAPON4",
        Weapon5 => "WEAPON5",
        Weapon6 => "WEAPON6",
        Weapon7 => "WEAPON7",
        Key1 => "KEY1",
        Key2 => "KEY2",
        Key3 => "KEY3",
        User1 => "USER1",
        User2 => "USER2",
        User3 => "USER3",
        User4 => "USER4",
        User5 => "USER5",
    }
}

/// Number of buttons carried by the input block.
pub const BUTTON_COUNT: usize = 38;

impl Button {
    /// Index into the input block's button arrays.
    pub fn index(self) -> usize {
        self as usize
    }
}
