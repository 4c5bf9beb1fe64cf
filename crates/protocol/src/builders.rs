//! Command builders for the two device generations.
//!
//! The vendor app models every capability as its own command class; here they
//! are plain functions returning a [`Command`], one set per generation. The
//! two sets share the enums below for modes, actions and speeds and differ
//! only in the parameter shapes their generation expects.

use crate::command::Command;
use crate::constants::{CLEAN_LOGS_COMMAND, LG_LOG_PATH};
use serde_json::{json, Map, Value};

/// Cleaning mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanMode {
    Auto,
    Edge,
    Spot,
    SpotArea,
    CustomArea,
}

impl CleanMode {
    fn as_wire(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Edge => "edge",
            Self::Spot => "spot",
            Self::SpotArea => "spotArea",
            Self::CustomArea => "customArea",
        }
    }
}

/// Cleaning action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanAction {
    Start,
    Pause,
    Resume,
    Stop,
}

impl CleanAction {
    fn as_wire(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Stop => "stop",
        }
    }
}

/// Fan speed level, 1 (quiet) through 4 (maximum).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanSpeed {
    Quiet,
    Normal,
    High,
    Max,
}

/// Manual movement action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveAction {
    Forward,
    Backward,
    Left,
    Right,
    TurnAround,
    Stop,
}

impl MoveAction {
    fn as_wire(&self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Backward => "backward",
            Self::Left => "SpinLeft",
            Self::Right => "SpinRight",
            Self::TurnAround => "TurnAround",
            Self::Stop => "stop",
        }
    }
}

fn params(entries: Vec<(&str, Value)>) -> Map<String, Value> {
    entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// Builders for 950-type and newer models (structured payloads).
pub mod structured {
    use super::*;

    pub fn clean(mode: CleanMode, action: CleanAction) -> Command {
        Command::new(
            "clean",
            params(vec![
                ("type", json!(mode.as_wire())),
                ("act", json!(action.as_wire())),
            ]),
        )
    }

    /// Clean the given spot areas, `area` being a comma-separated id list.
    pub fn spot_area(area: &str, cleanings: u32) -> Command {
        Command::new(
            "clean",
            params(vec![
                ("type", json!("spotArea")),
                ("act", json!("start")),
                ("content", json!(area)),
                ("count", json!(cleanings)),
            ]),
        )
    }

    /// Clean a custom rectangle given as `x1,y1,x2,y2` map coordinates.
    pub fn custom_area(area: &str, cleanings: u32) -> Command {
        Command::new(
            "clean",
            params(vec![
                ("type", json!("customArea")),
                ("act", json!("start")),
                ("content", json!(area)),
                ("count", json!(cleanings)),
            ]),
        )
    }

    pub fn pause() -> Command {
        Command::new("clean", params(vec![("act", json!("pause"))]))
    }

    pub fn resume() -> Command {
        Command::new("clean", params(vec![("act", json!("resume"))]))
    }

    pub fn stop() -> Command {
        Command::new("clean", params(vec![("act", json!("stop"))]))
    }

    pub fn charge() -> Command {
        Command::new("charge", params(vec![("act", json!("go"))]))
    }

    pub fn move_action(action: MoveAction) -> Command {
        Command::new("move", params(vec![("act", json!(action.as_wire()))]))
    }

    pub fn relocate() -> Command {
        Command::new("setRelocationState", params(vec![("mode", json!("manu"))]))
    }

    pub fn play_sound(sid: u32) -> Command {
        Command::new("playSound", params(vec![("sid", json!(sid))]))
    }

    pub fn get_battery() -> Command {
        Command::bare("getBattery")
    }

    pub fn get_clean_state() -> Command {
        Command::bare("getCleanInfo")
    }

    pub fn get_charge_state() -> Command {
        Command::bare("getChargeState")
    }

    pub fn get_clean_speed() -> Command {
        Command::bare("getSpeed")
    }

    pub fn set_clean_speed(speed: CleanSpeed) -> Command {
        // Structured models encode speed as a firmware level, not a name.
        let level = match speed {
            CleanSpeed::Quiet => 1000,
            CleanSpeed::Normal => 0,
            CleanSpeed::High => 1,
            CleanSpeed::Max => 2,
        };
        Command::new("setSpeed", params(vec![("speed", json!(level))]))
    }

    pub fn get_error() -> Command {
        Command::bare("getError")
    }

    pub fn get_position() -> Command {
        Command::bare("getPos")
    }

    pub fn get_water_info() -> Command {
        Command::bare("getWaterInfo")
    }

    pub fn set_water_level(amount: u32) -> Command {
        Command::new("setWaterInfo", params(vec![("amount", json!(amount))]))
    }

    pub fn get_net_info() -> Command {
        Command::bare("getNetInfo")
    }

    pub fn get_volume() -> Command {
        Command::bare("getVolume")
    }

    pub fn set_volume(volume: u32) -> Command {
        Command::new("setVolume", params(vec![("volume", json!(volume))]))
    }

    pub fn get_lifespan(component: &str) -> Command {
        Command::new("getLifeSpan", params(vec![("type", json!(component))]))
    }

    pub fn reset_lifespan(component: &str) -> Command {
        Command::new("resetLifeSpan", params(vec![("type", json!(component))]))
    }

    pub fn get_total_stats() -> Command {
        Command::bare("getTotalStats")
    }

    pub fn get_sleep_status() -> Command {
        Command::bare("getSleep")
    }

    pub fn get_do_not_disturb() -> Command {
        Command::bare("getBlock")
    }

    pub fn set_do_not_disturb(enable: bool, start: &str, end: &str) -> Command {
        Command::new(
            "setBlock",
            params(vec![
                ("enable", json!(u8::from(enable))),
                ("start", json!(start)),
                ("end", json!(end)),
            ]),
        )
    }

    /// Retrieve cleaning logs; routed to the log API path.
    pub fn get_clean_logs(count: u32) -> Command {
        Command::new("GetCleanLogs", params(vec![("count", json!(count))])).with_api(LG_LOG_PATH)
    }
}

/// Builders for legacy models (markup payloads). Nested objects become child
/// elements of the markup root when encoded.
pub mod legacy {
    use super::*;

    pub fn clean(mode: CleanMode, speed: CleanSpeed) -> Command {
        Command::new(
            "Clean",
            params(vec![(
                "clean",
                json!({ "type": mode.as_wire(), "speed": speed_tag(speed), "act": "s" }),
            )]),
        )
    }

    pub fn edge() -> Command {
        clean(CleanMode::Edge, CleanSpeed::High)
    }

    pub fn spot() -> Command {
        clean(CleanMode::Spot, CleanSpeed::High)
    }

    pub fn charge() -> Command {
        Command::new("Charge", params(vec![("charge", json!({ "type": "go" }))]))
    }

    pub fn play_sound(sid: u32) -> Command {
        Command::new("PlaySound", params(vec![("sid", json!(sid.to_string()))]))
    }

    pub fn get_battery_state() -> Command {
        Command::bare("GetBatteryInfo")
    }

    pub fn get_clean_state() -> Command {
        Command::bare("GetCleanState")
    }

    pub fn get_charge_state() -> Command {
        Command::bare("GetChargeState")
    }

    pub fn set_clean_speed(speed: CleanSpeed) -> Command {
        Command::new(
            "SetCleanSpeed",
            params(vec![("speed", json!(speed_tag(speed)))]),
        )
    }

    /// Retrieve cleaning logs. The relay client routes this command name to
    /// the log API path.
    pub fn get_clean_logs() -> Command {
        Command::bare(CLEAN_LOGS_COMMAND)
    }

    fn speed_tag(speed: CleanSpeed) -> &'static str {
        match speed {
            CleanSpeed::Quiet | CleanSpeed::Normal => "standard",
            CleanSpeed::High | CleanSpeed::Max => "strong",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_clean_carries_type_and_act() {
        let cmd = structured::clean(CleanMode::Auto, CleanAction::Start);
        assert_eq!(cmd.name(), "clean");
        assert_eq!(cmd.params()["type"], json!("auto"));
        assert_eq!(cmd.params()["act"], json!("start"));
        assert!(cmd.api().is_none());
    }

    #[test]
    fn structured_clean_logs_routes_to_log_api() {
        let cmd = structured::get_clean_logs(3);
        assert_eq!(cmd.api(), Some(LG_LOG_PATH));
        assert_eq!(cmd.params()["count"], json!(3));
    }

    #[test]
    fn legacy_clean_nests_parameters() {
        let cmd = legacy::clean(CleanMode::Auto, CleanSpeed::Normal);
        assert_eq!(cmd.name(), "Clean");
        assert_eq!(cmd.params()["clean"]["type"], json!("auto"));
        assert_eq!(cmd.params()["clean"]["speed"], json!("standard"));
    }

    #[test]
    fn legacy_clean_logs_uses_reserved_name() {
        let cmd = legacy::get_clean_logs();
        assert_eq!(cmd.name(), "GetLogApiCleanLogs");
        assert!(cmd.api().is_none());
    }
}
