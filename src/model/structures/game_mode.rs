use serde_repr::{Deserialize_repr, Serialize_repr};
use std::convert::TryFrom;

/// One of the four gameplay variants. A beatmap set lives in exactly one
/// mode queue: the minimum mode across its difficulties.
#[derive(Deserialize_repr, Serialize_repr, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum GameMode {
    Osu = 0,
    Taiko = 1,
    Catch = 2,
    Mania = 3
}

impl GameMode {
    pub const ALL: [GameMode; 4] = [GameMode::Osu, GameMode::Taiko, GameMode::Catch, GameMode::Mania];

    /// Index into per-mode arrays such as [`crate::database::db_structs::ModeMaps`]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl TryFrom<i32> for GameMode {
    type Error = ();

    fn try_from(v: i32) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(GameMode::Osu),
            1 => Ok(GameMode::Taiko),
            2 => Ok(GameMode::Catch),
            3 => Ok(GameMode::Mania),
            _ => Err(())
        }
    }
}
