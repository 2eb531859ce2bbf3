//! One-shot device actions: chime, floodlight, siren, motion.

use ringlink_core::RingEngine;

use crate::cli::{DeviceArg, GlobalOpts, MotionArgs, SwitchArgs};
use crate::error::CliError;

use super::util;

pub async fn chime(
    engine: &RingEngine,
    args: &DeviceArg,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    util::load_devices(engine).await?;
    engine.ring_chime(args.device).await?;
    let name = util::device_name(engine, args.device);
    report(global, &format!("{name} chimed"));
    Ok(())
}

pub async fn light(
    engine: &RingEngine,
    args: &SwitchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    util::load_devices(engine).await?;
    engine.set_floodlight(args.device, args.state.is_on()).await?;
    let name = util::device_name(engine, args.device);
    report(global, &format!("{name} floodlight {}", label(args.state.is_on())));
    Ok(())
}

pub async fn siren(
    engine: &RingEngine,
    args: &SwitchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    util::load_devices(engine).await?;
    engine.set_siren(args.device, args.state.is_on()).await?;
    let name = util::device_name(engine, args.device);
    report(global, &format!("{name} siren {}", label(args.state.is_on())));
    Ok(())
}

pub async fn motion(
    engine: &RingEngine,
    args: &MotionArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    util::load_devices(engine).await?;
    let on = args.state.is_on();
    let what = if args.alerts {
        engine.set_motion_alerts(args.device, on).await?;
        "motion alerts"
    } else {
        engine.set_motion_detection(args.device, on).await?;
        "motion detection"
    };
    let name = util::device_name(engine, args.device);
    report(global, &format!("{name} {what} {}", label(on)));
    Ok(())
}

fn label(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}

fn report(global: &GlobalOpts, message: &str) {
    if !global.quiet {
        eprintln!("{message}");
    }
}
