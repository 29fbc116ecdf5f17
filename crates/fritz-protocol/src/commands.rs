//! Home-automation (`homeautoswitch.lua`) command catalog.
//!
//! Each command is sent as the `switchcmd` query parameter. Most commands
//! address one device through `ain`; list commands do not. Responses are a
//! single text token terminated by `\n`, or an XML document for the list and
//! statistics commands (see [`SwitchCommand::returns_xml`]).
//!
//! ```text
//! /webservices/homeautoswitch.lua?ain=087610000434&switchcmd=setswitchon&sid=...
//!                                                 ^^^^^^^^^^^^^^^^^^^^^
//! ```
//!
//! # Example
//!
//! ```
//! use fritz_protocol::SwitchCommand;
//!
//! let cmd: SwitchCommand = "getdevicelistinfos".parse().unwrap();
//! assert_eq!(cmd, SwitchCommand::GetDeviceListInfos);
//! assert!(cmd.returns_xml());
//! assert!(!cmd.requires_ain());
//! ```

use fritz_core::{Error, Result};
use std::fmt;

/// Command understood by the home-automation endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwitchCommand {
    // Lists
    GetSwitchList,
    GetDeviceListInfos,
    GetTemplateListInfos,
    GetTriggerListInfos,
    GetSubscriptionState,
    StartUleSubscription,

    // Outlet
    SetSwitchOn,
    SetSwitchOff,
    SetSwitchToggle,
    GetSwitchState,
    GetSwitchPresent,
    GetSwitchPower,
    GetSwitchEnergy,
    GetSwitchName,

    // Device info
    GetDeviceInfos,
    GetBasicDeviceStats,
    GetTemperature,
    SetName,

    // HKR radiator thermostat
    GetHkrTsoll,
    GetHkrKomfort,
    GetHkrAbsenk,
    SetHkrTsoll,
    SetHkrBoost,
    SetHkrWindowOpen,

    // Dimmer, blind and color
    SetSimpleOnOff,
    SetLevel,
    SetLevelPercentage,
    SetBlind,
    GetColorDefaults,
    SetHue,
    SetSaturation,
    SetColor,
    SetUnmappedColor,
    SetColorTemperature,

    // Templates and triggers
    ApplyTemplate,
    SetTriggerActive,
}

impl SwitchCommand {
    /// Every known command, in catalog order.
    pub const ALL: [SwitchCommand; 36] = [
        SwitchCommand::GetSwitchList,
        SwitchCommand::GetDeviceListInfos,
        SwitchCommand::GetTemplateListInfos,
        SwitchCommand::GetTriggerListInfos,
        SwitchCommand::GetSubscriptionState,
        SwitchCommand::StartUleSubscription,
        SwitchCommand::SetSwitchOn,
        SwitchCommand::SetSwitchOff,
        SwitchCommand::SetSwitchToggle,
        SwitchCommand::GetSwitchState,
        SwitchCommand::GetSwitchPresent,
        SwitchCommand::GetSwitchPower,
        SwitchCommand::GetSwitchEnergy,
        SwitchCommand::GetSwitchName,
        SwitchCommand::GetDeviceInfos,
        SwitchCommand::GetBasicDeviceStats,
        SwitchCommand::GetTemperature,
        SwitchCommand::SetName,
        SwitchCommand::GetHkrTsoll,
        SwitchCommand::GetHkrKomfort,
        SwitchCommand::GetHkrAbsenk,
        SwitchCommand::SetHkrTsoll,
        SwitchCommand::SetHkrBoost,
        SwitchCommand::SetHkrWindowOpen,
        SwitchCommand::SetSimpleOnOff,
        SwitchCommand::SetLevel,
        SwitchCommand::SetLevelPercentage,
        SwitchCommand::SetBlind,
        SwitchCommand::GetColorDefaults,
        SwitchCommand::SetHue,
        SwitchCommand::SetSaturation,
        SwitchCommand::SetColor,
        SwitchCommand::SetUnmappedColor,
        SwitchCommand::SetColorTemperature,
        SwitchCommand::ApplyTemplate,
        SwitchCommand::SetTriggerActive,
    ];

    /// Wire name used in the `switchcmd` parameter.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SwitchCommand::GetSwitchList => "getswitchlist",
            SwitchCommand::GetDeviceListInfos => "getdevicelistinfos",
            SwitchCommand::GetTemplateListInfos => "gettemplatelistinfos",
            SwitchCommand::GetTriggerListInfos => "gettriggerlistinfos",
            SwitchCommand::GetSubscriptionState => "getsubscriptionstate",
            SwitchCommand::StartUleSubscription => "startulesubscription",
            SwitchCommand::SetSwitchOn => "setswitchon",
            SwitchCommand::SetSwitchOff => "setswitchoff",
            SwitchCommand::SetSwitchToggle => "setswitchtoggle",
            SwitchCommand::GetSwitchState => "getswitchstate",
            SwitchCommand::GetSwitchPresent => "getswitchpresent",
            SwitchCommand::GetSwitchPower => "getswitchpower",
            SwitchCommand::GetSwitchEnergy => "getswitchenergy",
            SwitchCommand::GetSwitchName => "getswitchname",
            SwitchCommand::GetDeviceInfos => "getdeviceinfos",
            SwitchCommand::GetBasicDeviceStats => "getbasicdevicestats",
            SwitchCommand::GetTemperature => "gettemperature",
            SwitchCommand::SetName => "setname",
            SwitchCommand::GetHkrTsoll => "gethkrtsoll",
            SwitchCommand::GetHkrKomfort => "gethkrkomfort",
            SwitchCommand::GetHkrAbsenk => "gethkrabsenk",
            SwitchCommand::SetHkrTsoll => "sethkrtsoll",
            SwitchCommand::SetHkrBoost => "sethkrboost",
            SwitchCommand::SetHkrWindowOpen => "sethkrwindowopen",
            SwitchCommand::SetSimpleOnOff => "setsimpleonoff",
            SwitchCommand::SetLevel => "setlevel",
            SwitchCommand::SetLevelPercentage => "setlevelpercentage",
            SwitchCommand::SetBlind => "setblind",
            SwitchCommand::GetColorDefaults => "getcolordefaults",
            SwitchCommand::SetHue => "sethue",
            SwitchCommand::SetSaturation => "setsaturation",
            SwitchCommand::SetColor => "setcolor",
            SwitchCommand::SetUnmappedColor => "setunmappedcolor",
            SwitchCommand::SetColorTemperature => "setcolortemperature",
            SwitchCommand::ApplyTemplate => "applytemplate",
            SwitchCommand::SetTriggerActive => "settriggeractive",
        }
    }

    /// Returns `true` if the gateway answers with an XML document.
    #[inline]
    #[must_use]
    pub fn returns_xml(self) -> bool {
        matches!(
            self,
            SwitchCommand::GetDeviceListInfos
                | SwitchCommand::GetTemplateListInfos
                | SwitchCommand::GetTriggerListInfos
                | SwitchCommand::GetSubscriptionState
                | SwitchCommand::GetDeviceInfos
                | SwitchCommand::GetBasicDeviceStats
                | SwitchCommand::GetColorDefaults
        )
    }

    /// Returns `true` if the command addresses a single device via `ain`.
    #[inline]
    #[must_use]
    pub fn requires_ain(self) -> bool {
        !matches!(
            self,
            SwitchCommand::GetSwitchList
                | SwitchCommand::GetDeviceListInfos
                | SwitchCommand::GetTemplateListInfos
                | SwitchCommand::GetTriggerListInfos
                | SwitchCommand::GetSubscriptionState
                | SwitchCommand::StartUleSubscription
                | SwitchCommand::GetColorDefaults
        )
    }

    /// Returns `true` if the command only reads state.
    ///
    /// Read-only commands are safe to use as keep-alive probes.
    #[inline]
    #[must_use]
    pub fn is_read_only(self) -> bool {
        self.as_str().starts_with("get")
    }
}

impl fmt::Display for SwitchCommand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SwitchCommand {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        SwitchCommand::ALL
            .iter()
            .copied()
            .find(|cmd| cmd.as_str() == s)
            .ok_or_else(|| Error::InvalidFormat(format!("unknown switch command {s:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_wire_names_roundtrip() {
        for cmd in SwitchCommand::ALL {
            let parsed: SwitchCommand = cmd.as_str().parse().unwrap();
            assert_eq!(parsed, cmd);
            assert_eq!(cmd.to_string(), cmd.as_str());
        }
    }

    #[test]
    fn test_wire_names_unique() {
        let mut names: Vec<&str> = SwitchCommand::ALL.iter().map(|c| c.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), SwitchCommand::ALL.len());
    }

    #[rstest]
    #[case(SwitchCommand::GetSwitchList, false, false)]
    #[case(SwitchCommand::GetDeviceListInfos, true, false)]
    #[case(SwitchCommand::GetBasicDeviceStats, true, true)]
    #[case(SwitchCommand::SetSwitchOn, false, true)]
    #[case(SwitchCommand::SetHkrTsoll, false, true)]
    #[case(SwitchCommand::GetColorDefaults, true, false)]
    fn test_command_traits(
        #[case] cmd: SwitchCommand,
        #[case] xml: bool,
        #[case] ain: bool,
    ) {
        assert_eq!(cmd.returns_xml(), xml);
        assert_eq!(cmd.requires_ain(), ain);
    }

    #[test]
    fn test_read_only() {
        assert!(SwitchCommand::GetSwitchList.is_read_only());
        assert!(SwitchCommand::GetDeviceListInfos.is_read_only());
        assert!(!SwitchCommand::SetSwitchToggle.is_read_only());
        assert!(!SwitchCommand::ApplyTemplate.is_read_only());
    }

    #[test]
    fn test_unknown_command() {
        assert!(matches!(
            "setswitchmaybe".parse::<SwitchCommand>(),
            Err(Error::InvalidFormat(_))
        ));
    }
}
