//! Turns a parsed description into a netlist using the device library.

use nlsim_config::{DeviceConfig, NetlistConfig, RomConfig, RomFill};
use nlsim_core::{BuildError, Netlist, NetlistBuilder};
use nlsim_devices::{instantiate, DeviceParams, RomImage};
use tracing::debug;

/// Instantiates every device, declares every net and binds the listed pins.
pub fn elaborate(config: &NetlistConfig) -> Result<Netlist, BuildError> {
    let mut builder = NetlistBuilder::new(&config.netlist.name);

    for device in &config.devices {
        let params = device_params(device)?;
        instantiate(&mut builder, &device.name, &device.device_type, params)?;
    }

    for net in &config.nets {
        let id = if net.bus {
            builder.add_bus_net(&net.name)?
        } else {
            builder.add_net(&net.name)?
        };
        for pin in &net.pins {
            builder.connect_name(pin, id)?;
        }
    }

    let netlist = builder.build()?;
    debug!(
        netlist = netlist.name(),
        devices = netlist.device_count(),
        nets = netlist.net_count(),
        pins = netlist.pin_count(),
        "netlist elaborated"
    );
    Ok(netlist)
}

fn device_params(device: &DeviceConfig) -> Result<DeviceParams, BuildError> {
    let image = match &device.rom {
        Some(rom) => Some(rom_image(&device.name, rom)?),
        None => None,
    };
    Ok(DeviceParams {
        output_delay_fs: device.output_delay,
        latch_delay_fs: device.latch_delay,
        image,
        frequency: device.frequency,
        inputs: device.inputs,
        delay_fs: device.delay,
    })
}

fn rom_image(device: &str, rom: &RomConfig) -> Result<RomImage, BuildError> {
    match rom.fill {
        RomFill::Constant => Ok(RomImage::filled(rom.value)),
        RomFill::Index => Ok(RomImage::from_fn(|address| (address & 0xff) as u8)),
        RomFill::Bytes => {
            RomImage::from_bytes(&rom.bytes).map_err(|e| BuildError::InvalidParameter {
                device: device.to_string(),
                reason: e.to_string(),
            })
        }
    }
}
