//! Command line front end for a CCS811 on a Linux i2c bus.
//!
//! ```
//! $ ccs811 info
//! hardware id      0x81
//! hardware version 0x12
//! boot firmware    1.1.0
//! app firmware     2.0.1
//! status           0x90 (app running, app valid)
//! errors           none
//! $ ccs811 measure "host=localhost user=sensors dbname=climate"
//! $ ccs811 flash CCS811_SW000246_1-00.bin
//! $ ccs811 test
//! $ ccs811 climate
//! Temperature: 22.4 °C, Humidity: 41.7 %
//! ```
//!
//! Bus, address and timing settings come from `CCS811_*` environment variables, logging is
//! controlled with `RUST_LOG` (default `info`).

use std::error::Error as _;
use std::net::{IpAddr, Ipv4Addr};
use std::thread::sleep;
use std::time::Duration;

use envconfig::Envconfig;

use ccs811_tools::baseline::BaselineStore;
use ccs811_tools::config::Config;
use ccs811_tools::dht10::Dht10;
use ccs811_tools::flash::{Event, Flasher};
use ccs811_tools::measure::Measurement;
use ccs811_tools::registers::HARDWARE_ID;
use ccs811_tools::sink::{outbound_ip, PostgresSink};
use ccs811_tools::{bus, gpio, Ccs811, Error, Result};

const USAGE: &str = "usage:
    ccs811 measure <connection-string>   log readings to PostgreSQL
    ccs811 flash <image-path>            replace the application firmware
    ccs811 info                          print device identity and status
    ccs811 test                          toggle the configured GPIO pin
    ccs811 climate                       print DHT10 temperature and humidity every second";

const GPIO_TOGGLES: u32 = 10;
const GPIO_INTERVAL: Duration = Duration::from_millis(500);
const CLIMATE_INTERVAL: Duration = Duration::from_secs(1);

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        eprint!("error: {}", e);
        let mut source = e.source();
        while let Some(cause) = source {
            eprint!(": {}", cause);
            source = cause.source();
        }
        eprintln!();
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    match args.as_slice() {
        ["measure", connection] => measure(&Config::init_from_env()?, connection),
        ["flash", path] => flash(&Config::init_from_env()?, path),
        ["info"] => info(&Config::init_from_env()?),
        ["test"] => test(&Config::init_from_env()?),
        ["climate"] => climate(&Config::init_from_env()?),
        _ => {
            println!("{}", USAGE);
            Ok(())
        }
    }
}

fn open_device(config: &Config) -> Result<Ccs811<bus::LinuxBus>> {
    log::info!("using CCS811 at {} on {}", config.address, config.bus);
    Ok(Ccs811::new(bus::open(&config.bus)?, config.address.0))
}

fn measure(config: &Config, connection: &str) -> Result<()> {
    let device = open_device(config)?;
    let sink = PostgresSink::connect(connection)?;
    let host = outbound_ip().unwrap_or_else(|e| {
        log::warn!("cannot determine outbound address: {}", e);
        IpAddr::V4(Ipv4Addr::UNSPECIFIED)
    });
    log::info!("recording as {}", host);

    let mut measurement = Measurement::new(
        device,
        BaselineStore::new(&config.baseline_file),
        sink,
        host.to_string(),
        config.measure_settings(),
    )?;
    measurement.start()?;
    match measurement.run()? {}
}

fn flash(config: &Config, path: &str) -> Result<()> {
    let image = std::fs::read(path).map_err(|source| Error::Image {
        path: path.into(),
        source,
    })?;
    let mut device = open_device(config)?;
    println!("flashing {} bytes from {}", image.len(), path);

    let flasher = Flasher::new(&mut device, &image, config.flash_timings());
    let status = flasher.run(|event| match event {
        Event::Phase { phase, status } => println!("{:?}: status {}", phase, status),
        Event::Progress { written, total } => println!("  {}/{} bytes", written, total),
    })?;

    println!("done, status {}", status);
    println!("app firmware {}", device.app_version()?);
    Ok(())
}

fn info(config: &Config) -> Result<()> {
    let mut device = open_device(config)?;

    let id = device.hardware_id()?;
    if id != HARDWARE_ID {
        log::warn!("unexpected hardware id {:#04x}, is this a CCS811?", id);
    }
    println!("hardware id      {:#04x}", id);
    println!("hardware version {:#04x}", device.hardware_version()?);
    println!("boot firmware    {}", device.boot_version()?);
    println!("app firmware     {}", device.app_version()?);

    let status = device.status()?;
    let mode = if status.app_mode() {
        "app running"
    } else {
        "boot mode"
    };
    let valid = if status.app_valid() {
        "app valid"
    } else {
        "no valid app"
    };
    println!("status           {} ({}, {})", status, mode, valid);
    println!("errors           {}", device.error_id()?);
    Ok(())
}

fn test(config: &Config) -> Result<()> {
    println!("toggling GPIO {}", config.gpio_pin);
    let mut pin = gpio::output_pin(config.gpio_pin)?;
    let pulses = gpio::blink(&mut pin, GPIO_TOGGLES, GPIO_INTERVAL);
    println!(
        "{} pulses on GPIO {}, pin left low",
        pulses, config.gpio_pin
    );
    Ok(())
}

fn climate(config: &Config) -> Result<()> {
    log::info!("using DHT10 at {} on {}", config.dht10_address, config.bus);
    let mut dht = Dht10::new(bus::open(&config.bus)?, config.dht10_address.0);
    dht.init()?;
    loop {
        match dht.measure() {
            Ok(climate) => println!("{}", climate),
            Err(Error::SensorBusy) => log::warn!("dht10 still busy, skipping this reading"),
            Err(e) => return Err(e),
        }
        sleep(CLIMATE_INTERVAL);
    }
}
