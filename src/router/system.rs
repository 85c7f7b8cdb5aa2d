//! Clock, arithmetic and device-control rules
//!
//! Each handler converts its own failures into a fixed reply.

use futures::FutureExt;
use futures::future::BoxFuture;

use super::math::{evaluate, has_operator, is_math_request, spoken_to_expression};
use super::{CommandRouter, Reply, RuleInput, SideEffect};
use crate::Error;
use crate::system::{Direction, PowerAction, power_command};

pub(super) fn is_time(_router: &CommandRouter, input: &RuleInput<'_>) -> bool {
    let text = input.text;
    text.contains("time") && !text.contains("calculate") && !has_operator(text)
}

pub(super) fn time(_router: &CommandRouter, _input: &RuleInput<'_>) -> Reply {
    let now = chrono::Local::now().format("%I:%M %p");
    Reply::text(format!("The time is {now}."))
}

pub(super) fn is_battery(_router: &CommandRouter, input: &RuleInput<'_>) -> bool {
    input.text.contains("battery")
}

pub(super) fn battery<'a>(
    router: &'a CommandRouter,
    _input: &'a RuleInput<'a>,
) -> BoxFuture<'a, Reply> {
    async move {
        match router.ctx.controls.battery().await {
            Ok(status) => {
                let state = if status.charging {
                    "charging"
                } else {
                    "not charging"
                };
                Reply::text(format!(
                    "Battery is at {}% and it is {state}.",
                    status.percent
                ))
            }
            Err(Error::NotFound(_)) => Reply::text("Battery info not available."),
            Err(e) => {
                tracing::debug!(error = %e, "battery query failed");
                Reply::text("Could not get battery info.")
            }
        }
    }
    .boxed()
}

pub(super) fn is_math(_router: &CommandRouter, input: &RuleInput<'_>) -> bool {
    is_math_request(input.text)
}

pub(super) fn math(_router: &CommandRouter, input: &RuleInput<'_>) -> Reply {
    let expression = spoken_to_expression(input.text);
    match evaluate(&expression) {
        Ok(value) => Reply::text(format!("The result is {value}")),
        Err(e) => {
            tracing::debug!(error = %e, expression, "expression rejected");
            Reply::text("Sorry, I couldn't calculate that.")
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VolumeRequest {
    Step(Direction),
    Mute(bool),
}

fn volume_request(text: &str) -> Option<VolumeRequest> {
    if text.contains("volume up") {
        Some(VolumeRequest::Step(Direction::Up))
    } else if text.contains("volume down") {
        Some(VolumeRequest::Step(Direction::Down))
    } else if text.contains("unmute") {
        Some(VolumeRequest::Mute(false))
    } else if text.contains("mute") {
        Some(VolumeRequest::Mute(true))
    } else {
        None
    }
}

pub(super) fn is_volume(_router: &CommandRouter, input: &RuleInput<'_>) -> bool {
    volume_request(input.text).is_some()
}

pub(super) fn volume<'a>(
    router: &'a CommandRouter,
    input: &'a RuleInput<'a>,
) -> BoxFuture<'a, Reply> {
    async move {
        let controls = &router.ctx.controls;
        match volume_request(input.text) {
            Some(VolumeRequest::Step(direction)) => {
                match controls.change_volume(direction).await {
                    Ok(()) if direction == Direction::Up => Reply::text("Volume increased."),
                    Ok(()) => Reply::text("Volume decreased."),
                    Err(e) => {
                        tracing::debug!(error = %e, "volume change failed");
                        Reply::text("Could not change volume.")
                    }
                }
            }
            Some(VolumeRequest::Mute(muted)) => match controls.set_muted(muted).await {
                Ok(()) => Reply::text(if muted { "Muted." } else { "Unmuted." }),
                Err(Error::Unsupported(_)) => Reply::text(if muted {
                    "Mute not supported."
                } else {
                    "Unmute not supported."
                }),
                Err(e) => {
                    tracing::debug!(error = %e, "mute change failed");
                    Reply::text("Could not change mute status.")
                }
            },
            None => Reply::text("Could not change volume."),
        }
    }
    .boxed()
}

fn power_action(text: &str) -> Option<PowerAction> {
    if text.contains("shutdown") || text.contains("shut down") {
        Some(PowerAction::Shutdown)
    } else if text.contains("restart") {
        Some(PowerAction::Restart)
    } else if text.contains("put system to sleep")
        || (text.contains("system") && text.contains("sleep"))
    {
        Some(PowerAction::Sleep)
    } else if text.split_whitespace().any(|word| word == "lock") {
        Some(PowerAction::Lock)
    } else {
        None
    }
}

pub(super) fn is_power(_router: &CommandRouter, input: &RuleInput<'_>) -> bool {
    power_action(input.text).is_some()
}

/// Reply first; the platform command runs as the side effect
pub(super) fn power(_router: &CommandRouter, input: &RuleInput<'_>) -> Reply {
    let Some(action) = power_action(input.text) else {
        return Reply::text("I couldn't understand that.");
    };
    let text = match action {
        PowerAction::Shutdown => "Shutting down system.",
        PowerAction::Restart => "Restarting system.",
        PowerAction::Sleep => "Putting system to sleep.",
        PowerAction::Lock => "Locking computer.",
    };
    match power_command(std::env::consts::OS, action) {
        Some(command) => Reply::with_effect(text, SideEffect::RunProcess(command)),
        None => Reply::text("Power control is not supported on this system."),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BrightnessRequest {
    Step(Direction),
    Set(u8),
    Invalid,
    Unspecified,
}

fn brightness_request(text: &str) -> BrightnessRequest {
    if text.contains("increase") {
        BrightnessRequest::Step(Direction::Up)
    } else if text.contains("decrease") {
        BrightnessRequest::Step(Direction::Down)
    } else if let Some((_, value)) = text.rsplit_once("set brightness to") {
        let value = value.trim().trim_end_matches("percent").trim().trim_end_matches('%');
        value
            .trim()
            .parse::<u8>()
            .ok()
            .filter(|v| *v <= 100)
            .map_or(BrightnessRequest::Invalid, BrightnessRequest::Set)
    } else {
        BrightnessRequest::Unspecified
    }
}

pub(super) fn is_brightness(_router: &CommandRouter, input: &RuleInput<'_>) -> bool {
    input.text.contains("brightness")
}

pub(super) fn brightness<'a>(
    router: &'a CommandRouter,
    input: &'a RuleInput<'a>,
) -> BoxFuture<'a, Reply> {
    async move {
        let controls = &router.ctx.controls;
        let (result, text) = match brightness_request(input.text) {
            BrightnessRequest::Step(direction) => {
                let text = match direction {
                    Direction::Up => "Increasing brightness.".to_string(),
                    Direction::Down => "Decreasing brightness.".to_string(),
                };
                (controls.change_brightness(direction).await, text)
            }
            BrightnessRequest::Set(percent) => (
                controls.set_brightness(percent).await,
                format!("Setting brightness to {percent} percent."),
            ),
            BrightnessRequest::Invalid => return Reply::text("Brightness adjustment failed."),
            BrightnessRequest::Unspecified => {
                return Reply::text("Specify increase, decrease, or set brightness to <value>.");
            }
        };

        match result {
            Ok(()) => Reply::text(text),
            Err(e) => {
                tracing::debug!(error = %e, "brightness change failed");
                Reply::text("Brightness adjustment failed.")
            }
        }
    }
    .boxed()
}
