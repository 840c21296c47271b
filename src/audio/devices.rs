use anyhow::Result;
use console::style;
use cpal::traits::{DeviceTrait, HostTrait};

/// One input device as the `devices` command shows it.
pub struct InputDevice {
    pub name: String,
    pub is_default: bool,
    /// "1ch  44100 Hz  F32"-style summaries of the supported configs.
    pub configs: Vec<String>,
}

/// Enumerate input devices on the default host.
pub fn input_devices() -> Result<Vec<InputDevice>> {
    let host = cpal::default_host();
    tracing::debug!(host = host.id().name(), "enumerating input devices");

    let default_name = host
        .default_input_device()
        .and_then(|d| d.name().ok())
        .unwrap_or_default();

    let mut devices = Vec::new();
    for device in host.input_devices()? {
        let name = device.name().unwrap_or_else(|_| "<unknown>".into());
        let configs = match device.supported_input_configs() {
            Ok(configs) => configs.map(|cfg| describe_config(&cfg)).collect(),
            Err(e) => vec![format!("Could not query configs: {e}")],
        };
        devices.push(InputDevice {
            is_default: !default_name.is_empty() && name == default_name,
            name,
            configs,
        });
    }

    Ok(devices)
}

fn describe_config(cfg: &cpal::SupportedStreamConfigRange) -> String {
    let channels = cfg.channels();
    let min_rate = cfg.min_sample_rate().0;
    let max_rate = cfg.max_sample_rate().0;
    let format = cfg.sample_format();

    if min_rate == max_rate {
        format!("{channels}ch  {min_rate} Hz  {format:?}")
    } else {
        format!("{channels}ch  {min_rate}-{max_rate} Hz  {format:?}")
    }
}

/// Print the input devices; the default one is starred.
pub fn list_devices() -> Result<()> {
    let devices = input_devices()?;

    if devices.is_empty() {
        eprintln!("No audio input devices found.");
        return Ok(());
    }

    println!("{}", style("Audio Input Devices").bold());
    println!();

    for device in &devices {
        if device.is_default {
            println!(
                "  {} {}",
                style("*").green().bold(),
                style(&device.name).green().bold()
            );
        } else {
            println!("    {}", style(&device.name).bold());
        }
        for cfg in &device.configs {
            println!("      {cfg}");
        }
        println!();
    }

    if devices.iter().any(|d| d.is_default) {
        println!("  {} = default device", style("*").green().bold());
    }
    println!(
        "  Select one with `device = \"<name>\"` under [capture] in the config file."
    );

    Ok(())
}
