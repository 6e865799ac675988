use std::env;
use std::thread::sleep;
use std::time::Duration;

use inquire::Text;
use rigol_dp832::config::{DEFAULT_PORT, Dp832Config};
use rigol_dp832::psu::Dp832Lan;

// Configuration constants - adjust these for your setup
const CHANNEL: u8 = 1;
const STABILIZATION_DELAY_MS: u64 = 1000;
// (volts, amps) applied in turn.
const SETPOINTS: [(f64, f64); 3] = [(1.0, 1.0), (10.0, 2.0), (0.0, 0.0)];

fn main() {
    env_logger::init();

    // Get instrument address from command line args or an interactive prompt
    let host = env::args().nth(1).unwrap_or_else(|| {
        Text::new("Instrument IP address:")
            .prompt()
            .expect("Failed to read address")
    });
    let port = env::args()
        .nth(2)
        .map(|p| p.parse().expect("Port has to be an integer"))
        .unwrap_or(DEFAULT_PORT);

    println!("Using {}:{}", host, port);

    let result = Dp832Lan::session(&host, port, Dp832Config::default(), |psu| {
        if let Some(identity) = psu.identity() {
            println!("Connected to {} (firmware {})", identity.serial, identity.version);
        }

        psu.set_channel_enable(CHANNEL, true)?;
        println!("CH{} enabled", CHANNEL);

        for (voltage, current) in SETPOINTS {
            psu.set_voltage(CHANNEL, voltage)?;
            psu.set_current(CHANNEL, current)?;
            sleep(Duration::from_millis(STABILIZATION_DELAY_MS));

            println!(
                "Voltage: {}, Current: {}; Mode: {:?}",
                psu.get_voltage(CHANNEL)?,
                psu.get_current(CHANNEL)?,
                psu.get_limit_mode(CHANNEL)?
            );
        }

        psu.set_channel_enable(CHANNEL, false)?;
        println!("CH{} disabled", CHANNEL);
        Ok(())
    });

    if let Err(err) = result {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}
