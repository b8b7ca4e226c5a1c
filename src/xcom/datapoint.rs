use crate::xcom::packet::ObjectType;
use crate::xcom::value::{Value, ValueKind};

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::Serialize;
use std::convert::TryFrom;

// {{{ DeviceClass
/// Which unit on the Studer bus owns a datapoint. Decides the default
/// destination address of a request.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum DeviceClass {
    Xtender,
    VarioTrack,
    Rcc,
    Bsp,
}

impl DeviceClass {
    /// Address of the first unit of this class.
    pub fn address(self) -> u32 {
        match self {
            DeviceClass::Xtender => 101,
            DeviceClass::VarioTrack => 301,
            DeviceClass::Rcc => 501,
            DeviceClass::Bsp => 601,
        }
    }
}
// }}}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Datapoint {
    pub id: u32,
    pub name: &'static str,
    pub kind: ValueKind,
    pub object_type: ObjectType,
    pub device: DeviceClass,
}

const fn dp(
    id: u32,
    name: &'static str,
    kind: ValueKind,
    object_type: ObjectType,
    device: DeviceClass,
) -> Datapoint {
    Datapoint {
        id,
        name,
        kind,
        object_type,
        device,
    }
}

use DeviceClass::*;
use ObjectType::{Info, Parameter};
use ValueKind::*;

pub const SMART_BOOST_ALLOWED: Datapoint = dp(1126, "SMART_BOOST_ALLOWED", Bool, Parameter, Xtender);
pub const BATTERY_CHARGE_CURR: Datapoint = dp(1138, "BATTERY_CHARGE_CURR", Float, Parameter, Xtender);
pub const AC_OUTPUT_VOLTAGE: Datapoint = dp(1286, "AC_OUTPUT_VOLTAGE", Float, Parameter, Xtender);
pub const PARAMS_SAVED_IN_FLASH: Datapoint = dp(1550, "PARAMS_SAVED_IN_FLASH", Bool, Parameter, Xtender);
pub const SMART_BOOST_LIMIT: Datapoint = dp(1607, "SMART_BOOST_LIMIT", Float, Parameter, Xtender);
pub const AC_IN_POWER: Datapoint = dp(3081, "AC_IN_POWER", Float, Info, Xtender);
pub const ENERGY_USAGE: Datapoint = dp(3083, "ENERGY_USAGE", Float, Info, Xtender);
pub const POWER_IN: Datapoint = dp(3136, "POWER_IN", Float, Info, Xtender);
pub const POWER_OUT: Datapoint = dp(3137, "POWER_OUT", Float, Info, Xtender);
pub const USER_LEVEL: Datapoint = dp(5012, "USER_LEVEL", Int, Parameter, Rcc);
pub const BATT_VOLTAGE: Datapoint = dp(7000, "BATT_VOLTAGE", Float, Info, Bsp);
pub const BATT_CURRENT: Datapoint = dp(7001, "BATT_CURRENT", Float, Info, Bsp);
pub const STATE_OF_CHARGE: Datapoint = dp(7002, "STATE_OF_CHARGE", Float, Info, Bsp);
pub const FORCE_NEW_CYCLE: Datapoint = dp(10029, "FORCE_NEW_CYCLE", Int, Parameter, VarioTrack);
pub const PV_POWER: Datapoint = dp(11004, "PV_POWER", Float, Info, VarioTrack);
pub const PROD_ENERGY_CURR_DAY: Datapoint = dp(11007, "PROD_ENERGY_CURR_DAY", Float, Info, VarioTrack);
pub const PROD_ENERGY_PREV_DAY: Datapoint = dp(11011, "PROD_ENERGY_PREV_DAY", Float, Info, VarioTrack);
pub const OPERATION_MODE: Datapoint = dp(11016, "OPERATION_MODE", ShortEnum, Info, VarioTrack);
pub const NUM_MAX_POWER_CURR_DAY: Datapoint = dp(11019, "NUM_MAX_POWER_CURR_DAY", Float, Info, VarioTrack);
pub const NUM_SUN_HOURS_CURR_DAY: Datapoint = dp(11025, "NUM_SUN_HOURS_CURR_DAY", Float, Info, VarioTrack);
pub const BAT_CYCLE_PHASE: Datapoint = dp(11038, "BAT_CYCLE_PHASE", ShortEnum, Info, VarioTrack);

static DATAPOINTS: &[Datapoint] = &[
    SMART_BOOST_ALLOWED,
    BATTERY_CHARGE_CURR,
    AC_OUTPUT_VOLTAGE,
    PARAMS_SAVED_IN_FLASH,
    SMART_BOOST_LIMIT,
    AC_IN_POWER,
    ENERGY_USAGE,
    POWER_IN,
    POWER_OUT,
    USER_LEVEL,
    BATT_VOLTAGE,
    BATT_CURRENT,
    STATE_OF_CHARGE,
    FORCE_NEW_CYCLE,
    PV_POWER,
    PROD_ENERGY_CURR_DAY,
    PROD_ENERGY_PREV_DAY,
    OPERATION_MODE,
    NUM_MAX_POWER_CURR_DAY,
    NUM_SUN_HOURS_CURR_DAY,
    BAT_CYCLE_PHASE,
];

pub struct Registry;
impl Registry {
    /// `None` is a valid answer: the table only covers documented datapoints.
    pub fn lookup(id: u32) -> Option<&'static Datapoint> {
        DATAPOINTS.iter().find(|d| d.id == id)
    }

    pub fn by_name(name: &str) -> Option<&'static Datapoint> {
        DATAPOINTS.iter().find(|d| d.name.eq_ignore_ascii_case(name))
    }

    /// Accepts either a numeric id or a datapoint name.
    pub fn resolve(input: &str) -> Option<&'static Datapoint> {
        match input.parse::<u32>() {
            Ok(id) => Self::lookup(id),
            Err(_) => Self::by_name(input),
        }
    }

    pub fn all() -> &'static [Datapoint] {
        DATAPOINTS
    }
}

// {{{ enumerations
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord, IntoPrimitive, TryFromPrimitive, Serialize)]
#[repr(u16)]
pub enum AccessLevel {
    ViewOnly = 0x00,
    Basic = 0x10,
    Expert = 0x20,
    Installer = 0x30,
    Qsp = 0x40,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive, Serialize)]
#[repr(u16)]
pub enum OperatingMode {
    Night = 0,
    Startup = 1,
    Charger = 3,
    Security = 5,
    Off = 6,
    Charge = 8,
    ChargeV = 9,
    ChargeI = 10,
    ChargeT = 11,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive, Serialize)]
#[repr(u16)]
pub enum BatteryCyclePhase {
    Bulk = 0,
    Absorption = 1,
    Equalize = 2,
    Floating = 3,
    ReducedFloating = 6,
    PeriodicAbsorption = 7,
}

/// Human label for enumerated values, where the datapoint has one.
pub fn enum_label(datapoint: &Datapoint, value: &Value) -> Option<String> {
    let raw = value.as_u16()?;
    match datapoint.id {
        11016 => OperatingMode::try_from(raw).ok().map(|m| format!("{:?}", m)),
        11038 => BatteryCyclePhase::try_from(raw).ok().map(|p| format!("{:?}", p)),
        5012 => AccessLevel::try_from(raw).ok().map(|l| format!("{:?}", l)),
        _ => None,
    }
}
// }}}
