//! End-to-end tests of the TMS-4800 ROM on a simulated board.

use std::cell::RefCell;
use std::rc::Rc;

use nlsim_core::{
    Logic, NetId, NetlistBuilder, PinId, SimConfig, SimTime, Simulator, FS_PER_NS,
};
use nlsim_devices::{RomImage, RomTiming, Tms4800, Tms4800Dip};

const OUTPUT_DELAY: u64 = 450 * FS_PER_NS;

/// Package pins carrying `A0..A10`, in address-bit order.
const ADDRESS_PACKAGE_PINS: [&str; 11] = ["2", "3", "4", "5", "6", "7", "12", "11", "10", "8", "15"];

/// Word at address `a`: high nibble `0xA`, low nibble `a & 0xF`.
fn test_image() -> RomImage {
    RomImage::from_fn(|a| 0xa0 | (a & 0x0f) as u8)
}

/// A DIP ROM with every signal pin on its own net. Supply pins are left
/// unwired unless `vcc_net` is set, in which case package pin 9 is wired to a
/// net nobody drives.
fn board(vcc_net: bool) -> Simulator {
    board_with(test_image(), RomTiming::default(), vcc_net)
}

/// Like [`board`], with the given contents and timing. Nets are wired through
/// package pin numbers.
fn board_with(image: RomImage, timing: RomTiming, vcc_net: bool) -> Simulator {
    let mut b = NetlistBuilder::new("board");
    b.add_subcircuit("rom", Tms4800Dip { image, timing }).unwrap();
    for (bit, package_pin) in ADDRESS_PACKAGE_PINS.iter().enumerate() {
        let net = b.add_net(&format!("a{bit}")).unwrap();
        b.connect_name(&format!("rom.{package_pin}"), net).unwrap();
    }
    for (net, pin) in [("ar", "rom.13"), ("oe1", "rom.24"), ("oe2", "rom.14")] {
        let net = b.add_net(net).unwrap();
        b.connect_name(pin, net).unwrap();
    }
    for (bit, package_pin) in (16..=23).rev().enumerate() {
        let net = b.add_net(&format!("d{bit}")).unwrap();
        b.connect_name(&format!("rom.{package_pin}"), net).unwrap();
    }
    if vcc_net {
        let net = b.add_net("vgg").unwrap();
        b.connect_name("rom.9", net).unwrap();
    }
    Simulator::new(b.build().unwrap(), SimConfig::default()).unwrap()
}

fn pins(sim: &Simulator, prefix: &str, count: usize) -> Vec<PinId> {
    (0..count)
        .map(|i| sim.pin(&format!("rom.A.{prefix}{i}")).unwrap())
        .collect()
}

fn set_address(sim: &mut Simulator, address: Option<u64>) {
    for (bit, pin) in pins(sim, "A", 11).into_iter().enumerate() {
        let level = match address {
            Some(a) => Logic::from_bool((a >> bit) & 1 == 1),
            None if bit == 10 => Logic::Z,
            None => Logic::Zero,
        };
        sim.write(pin, level, 0);
    }
}

fn set(sim: &mut Simulator, pin: &str, level: Logic) {
    let pin = sim.pin(pin).unwrap();
    sim.write(pin, level, 0);
}

fn latch(sim: &mut Simulator) {
    set(sim, "rom.13", Logic::Zero);
    sim.run_until_idle().unwrap();
    set(sim, "rom.13", Logic::One);
    sim.run_until_idle().unwrap();
}

fn changes_on(sim: &mut Simulator, net: NetId) -> Rc<RefCell<Vec<(SimTime, Logic)>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    sim.watch(net, move |c| sink.borrow_mut().push((c.time, c.level)));
    seen
}

fn assert_all(sim: &Simulator, pins: &[PinId], level: Logic) {
    for &pin in pins {
        assert_eq!(sim.read_pin(pin), level, "{}", sim.pin_name(pin));
    }
}

#[test]
fn enable_drives_low_nibble_after_output_delay() {
    let mut sim = board(false);
    set(&mut sim, "rom.24", Logic::Zero);
    set(&mut sim, "rom.14", Logic::Zero);
    set_address(&mut sim, Some(5));
    latch(&mut sim);

    let core = sim.device("rom.A").unwrap();
    let state = sim.device_state(core);
    assert_eq!(state[0].name, "last_data");
    assert_eq!(state[0].value, Some(0xa5));

    let data = pins(&sim, "D", 8);
    assert_all(&sim, &data, Logic::Z);

    let d0 = sim.net("d0").unwrap();
    let seen = changes_on(&mut sim, d0);
    let enabled_at = sim.now();
    set(&mut sim, "rom.24", Logic::One);

    sim.run_for(OUTPUT_DELAY - 1).unwrap();
    assert_all(&sim, &data[..4], Logic::Z);

    sim.run_for(1).unwrap();
    assert_eq!(sim.read_word(&data[..4]), Some(0x5));
    assert_all(&sim, &data[4..], Logic::Z);
    assert_eq!(
        *seen.borrow(),
        vec![(SimTime::from_fs(enabled_at.fs + OUTPUT_DELAY), Logic::One)]
    );

    seen.borrow_mut().clear();
    let disabled_at = sim.now();
    set(&mut sim, "rom.24", Logic::Zero);
    sim.run_until_idle().unwrap();
    assert_all(&sim, &data, Logic::Z);
    assert_eq!(
        *seen.borrow(),
        vec![(SimTime::from_fs(disabled_at.fs + OUTPUT_DELAY), Logic::Z)]
    );
}

#[test]
fn output_groups_are_independent() {
    let mut sim = board(false);
    set(&mut sim, "rom.24", Logic::Zero);
    set(&mut sim, "rom.14", Logic::Zero);
    set_address(&mut sim, Some(3));
    latch(&mut sim);
    let data = pins(&sim, "D", 8);

    set(&mut sim, "rom.14", Logic::One);
    sim.run_until_idle().unwrap();
    assert_all(&sim, &data[..4], Logic::Z);
    assert_eq!(sim.read_word(&data[4..]), Some(0xa));

    set(&mut sim, "rom.24", Logic::One);
    sim.run_until_idle().unwrap();
    assert_eq!(sim.read_word(&data), Some(0xa3));
}

#[test]
fn undefined_address_latches_unknown_word() {
    let mut sim = board(false);
    set(&mut sim, "rom.24", Logic::One);
    set(&mut sim, "rom.14", Logic::Zero);
    set_address(&mut sim, None);
    latch(&mut sim);

    let core = sim.device("rom.A").unwrap();
    assert_eq!(sim.device_state(core)[0].value, None);
    let data = pins(&sim, "D", 8);
    assert_all(&sim, &data[..4], Logic::X);
    assert_all(&sim, &data[4..], Logic::Z);
}

#[test]
fn address_is_only_sampled_on_rising_strobe() {
    let mut sim = board(false);
    set(&mut sim, "rom.24", Logic::One);
    set(&mut sim, "rom.14", Logic::One);
    set_address(&mut sim, Some(1));
    latch(&mut sim);
    let data = pins(&sim, "D", 8);
    assert_eq!(sim.read_word(&data), Some(0xa1));

    set_address(&mut sim, Some(2));
    sim.run_until_idle().unwrap();
    assert_eq!(sim.read_word(&data), Some(0xa1));

    set(&mut sim, "rom.13", Logic::Zero);
    sim.run_until_idle().unwrap();
    assert_eq!(sim.read_word(&data), Some(0xa1));

    set(&mut sim, "rom.13", Logic::One);
    sim.run_until_idle().unwrap();
    assert_eq!(sim.read_word(&data), Some(0xa2));
}

#[test]
fn unpowered_rom_stays_tri_stated() {
    let mut sim = board(true);
    set(&mut sim, "rom.24", Logic::One);
    set(&mut sim, "rom.14", Logic::One);
    set_address(&mut sim, Some(7));
    latch(&mut sim);
    let data = pins(&sim, "D", 8);
    assert_all(&sim, &data, Logic::Z);

    let vgg = sim.net("vgg").unwrap();
    let powered_at = sim.now();
    sim.write_net(vgg, Logic::One, 0);
    sim.run_until_idle().unwrap();
    assert_eq!(sim.read_word(&data), Some(0xa7));
    assert_eq!(sim.now().fs, powered_at.fs + OUTPUT_DELAY);

    sim.write_net(vgg, Logic::Zero, 0);
    sim.run_until_idle().unwrap();
    assert_all(&sim, &data, Logic::Z);
}

#[test]
fn package_pins_alias_core_pins() {
    let sim = board(false);
    assert_eq!(sim.pin("rom.23").unwrap(), sim.pin("rom.A.D0").unwrap());
    assert_eq!(sim.pin("rom.16").unwrap(), sim.pin("rom.A.D7").unwrap());
    assert_eq!(sim.pin("rom.15").unwrap(), sim.pin("rom.A.A10").unwrap());
    assert_eq!(sim.pin("rom.8").unwrap(), sim.pin("rom.A.A9").unwrap());
    assert_eq!(sim.pin("rom.9").unwrap(), sim.pin("rom.A.VCC").unwrap());

    let oe1 = sim.net("oe1").unwrap();
    assert_eq!(sim.net_of(sim.pin("rom.24").unwrap()), oe1);
    assert_eq!(sim.net_of(sim.pin("rom.A.OE1").unwrap()), oe1);

    let vcc = sim.net("VCC").unwrap();
    assert_eq!(sim.net_of(sim.pin("rom.9").unwrap()), vcc);
    assert_eq!(sim.read(vcc), Logic::Z);
}

#[test]
fn writes_through_alias_and_core_name_are_identical() {
    let mut sim = board(false);
    set(&mut sim, "rom.24", Logic::One);
    sim.run_until_idle().unwrap();
    let via_alias = sim.read_pin(sim.pin("rom.A.OE1").unwrap());
    set(&mut sim, "rom.A.OE1", Logic::Zero);
    sim.run_until_idle().unwrap();
    assert_eq!(via_alias, Logic::One);
    assert_eq!(sim.read_pin(sim.pin("rom.24").unwrap()), Logic::Zero);
}

#[test]
fn high_address_bits_decode_through_package_pins() {
    let image = RomImage::from_fn(|a| (a ^ (a >> 3)) as u8);
    let mut sim = board_with(image, RomTiming::default(), false);
    set(&mut sim, "rom.24", Logic::One);
    set(&mut sim, "rom.14", Logic::One);
    let core = sim.device("rom.A").unwrap();
    let data = pins(&sim, "D", 8);

    for (address, word) in [
        (0x7ff, 0x00),
        (0x405, 0x85),
        (0x400, 0x80),
        (0x200, 0x40),
        (0x100, 0x20),
        (0x0c0, 0xd8),
        (0x2a0, 0xf4),
    ] {
        for (bit, package_pin) in ADDRESS_PACKAGE_PINS.iter().enumerate() {
            let level = Logic::from_bool((address >> bit) & 1 == 1);
            set(&mut sim, &format!("rom.{package_pin}"), level);
        }
        latch(&mut sim);
        assert_eq!(
            sim.device_state(core)[0].value,
            Some(word),
            "address {address:#05x}"
        );
        assert_eq!(sim.read_word(&data), Some(word), "address {address:#05x}");
    }
}

#[test]
fn latch_delay_postpones_the_latched_word() {
    const LATCH_DELAY: u64 = 100 * FS_PER_NS;
    let timing = RomTiming {
        latch_delay_fs: LATCH_DELAY,
        ..RomTiming::default()
    };
    let mut sim = board_with(test_image(), timing, false);
    set(&mut sim, "rom.24", Logic::One);
    set(&mut sim, "rom.14", Logic::Zero);
    set(&mut sim, "rom.13", Logic::Zero);
    set_address(&mut sim, Some(5));
    sim.run_until_idle().unwrap();

    let core = sim.device("rom.A").unwrap();
    let data = pins(&sim, "D", 8);
    assert_all(&sim, &data[..4], Logic::X);

    let d0 = sim.net("d0").unwrap();
    let seen = changes_on(&mut sim, d0);
    let strobed_at = sim.now();
    set(&mut sim, "rom.13", Logic::One);

    sim.run_for(LATCH_DELAY - 1).unwrap();
    assert_eq!(sim.device_state(core)[0].value, None);

    sim.run_for(1).unwrap();
    assert_eq!(sim.device_state(core)[0].value, Some(0xa5));
    assert_all(&sim, &data[..4], Logic::X);

    sim.run_until_idle().unwrap();
    assert_eq!(sim.read_word(&data[..4]), Some(0x5));
    assert_eq!(
        *seen.borrow(),
        vec![(
            SimTime::from_fs(strobed_at.fs + LATCH_DELAY + OUTPUT_DELAY),
            Logic::One
        )]
    );
}

/// Two bare cores sharing the address lines, `AR`, `OE2` and a tri-state
/// data bus. Each core has its own `OE1` net. `r1` holds `0x55` everywhere,
/// `r2` holds `0xAA`.
fn shared_bus_board() -> Simulator {
    let mut b = NetlistBuilder::new("shared_bus");
    for (name, word) in [("r1", 0x55), ("r2", 0xaa)] {
        b.add_device(name, |pins| {
            Tms4800::register(pins, RomImage::filled(word), RomTiming::default())
        })
        .unwrap();
        let oe1 = b.add_net(&format!("{name}_oe1")).unwrap();
        b.connect_name(&format!("{name}.OE1"), oe1).unwrap();
    }
    let mut shared = Vec::new();
    for bit in 0..11 {
        shared.push((b.add_net(&format!("a{bit}")).unwrap(), format!("A{bit}")));
    }
    shared.push((b.add_net("ar").unwrap(), "AR".to_string()));
    shared.push((b.add_net("oe2").unwrap(), "OE2".to_string()));
    for bit in 0..8 {
        shared.push((b.add_bus_net(&format!("d{bit}")).unwrap(), format!("D{bit}")));
    }
    for (net, pin) in shared {
        for rom in ["r1", "r2"] {
            b.connect_name(&format!("{rom}.{pin}"), net).unwrap();
        }
    }
    Simulator::new(b.build().unwrap(), SimConfig::default()).unwrap()
}

fn set_net(sim: &mut Simulator, name: &str, level: Logic) {
    let net = sim.net(name).unwrap();
    sim.write_net(net, level, 0);
}

#[test]
fn bus_handover_between_two_roms() {
    let mut sim = shared_bus_board();
    for bit in 0..11 {
        set_net(&mut sim, &format!("a{bit}"), Logic::Zero);
    }
    set_net(&mut sim, "oe2", Logic::Zero);
    set_net(&mut sim, "r1_oe1", Logic::Zero);
    set_net(&mut sim, "r2_oe1", Logic::One);
    set_net(&mut sim, "ar", Logic::Zero);
    sim.run_until_idle().unwrap();
    set_net(&mut sim, "ar", Logic::One);
    sim.run_until_idle().unwrap();

    let low: Vec<PinId> = (0..4).map(|i| sim.pin(&format!("r1.D{i}")).unwrap()).collect();
    let high: Vec<PinId> = (4..8).map(|i| sim.pin(&format!("r1.D{i}")).unwrap()).collect();
    assert_eq!(sim.read_word(&low), Some(0xa));
    assert_all(&sim, &high, Logic::Z);

    // Swap the enables in one instant.
    let d0 = sim.net("d0").unwrap();
    let seen = changes_on(&mut sim, d0);
    let swapped_at = sim.now();
    set_net(&mut sim, "r1_oe1", Logic::One);
    set_net(&mut sim, "r2_oe1", Logic::Zero);
    sim.run_until_idle().unwrap();
    assert_eq!(sim.read_word(&low), Some(0x5));
    assert_all(&sim, &high, Logic::Z);
    assert_eq!(
        *seen.borrow(),
        vec![(SimTime::from_fs(swapped_at.fs + OUTPUT_DELAY), Logic::One)]
    );

    // Both enabled: every bit disagrees.
    set_net(&mut sim, "r2_oe1", Logic::One);
    sim.run_until_idle().unwrap();
    assert_all(&sim, &low, Logic::X);

    set_net(&mut sim, "r1_oe1", Logic::Zero);
    sim.run_until_idle().unwrap();
    assert_eq!(sim.read_word(&low), Some(0xa));
}
