//! Interactive terminal client for the Nucleo telemetry firmware.
//!
//! Thin front end over the `nucleolink-core` command façade: listens for the
//! boot banner, then runs a menu loop. Protocol and decode errors are
//! printed with their context; only a failed port open ends the session.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use nucleolink_core::protocol::{
    list_ports, Connection, ConnectionConfig, Value, DEFAULT_BAUD_RATE,
};

#[derive(Parser, Debug)]
#[command(name = "nucleolink", version, about = "Talk to the Nucleo sensor firmware over serial")]
struct Args {
    /// Serial device, e.g. /dev/ttyACM0 or /dev/ttyAMA0
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate
    #[arg(short, long, default_value_t = DEFAULT_BAUD_RATE)]
    baud: u32,

    /// Exchange timeout in seconds
    #[arg(short, long, default_value_t = 1.0)]
    timeout: f64,

    /// Boot-banner listen window in seconds (0 disables)
    #[arg(long, default_value_t = 3.0)]
    sniff: f64,

    /// List candidate serial ports and exit
    #[arg(long)]
    list_ports: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    if args.list_ports {
        for port in list_ports() {
            match port.product {
                Some(product) => println!("{}  ({})", port.name, product),
                None => println!("{}", port.name),
            }
        }
        return Ok(());
    }

    let Some(port_name) = args.port else {
        bail!("no serial port given; use --port or --list-ports");
    };

    let config = ConnectionConfig {
        port_name: port_name.clone(),
        baud_rate: args.baud,
        timeout_ms: (args.timeout * 1000.0) as u64,
    };

    let mut conn = Connection::new(config);
    conn.connect()
        .with_context(|| format!("failed to open {}", port_name))?;
    println!("Connected on {} at {} baud", port_name, args.baud);

    if args.sniff > 0.0 {
        println!("Listening for boot chatter ({}s)...", args.sniff);
        let window = Duration::from_secs_f64(args.sniff);
        match conn.sniff_boot(window) {
            Ok(banner) if !banner.is_empty() => {
                for line in banner.lines() {
                    println!("[boot] {}", line);
                }
            }
            Ok(_) => println!("[boot] (silent)"),
            Err(e) => warn!(error = %e, "boot sniff failed"),
        }
    }

    menu_loop(&mut conn)
}

fn menu_loop(conn: &mut Connection) -> Result<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        println!();
        println!("=== Nucleo telemetry ===");
        println!("t) read temperature");
        println!("p) read pressure");
        println!("a) read acceleration");
        println!("k) read constant K");
        println!("K) set constant K (centi, e.g. 1234 for 12.34)");
        println!("h) firmware help");
        println!("q) quit");
        print!("> ");
        io::stdout().flush()?;

        let Some(choice) = lines.next() else {
            break;
        };
        let choice = choice?.trim().to_string();

        let outcome = match choice.as_str() {
            "t" => show("Temperature", conn.read_temperature()),
            "p" => show("Pressure", conn.read_pressure()),
            "a" => show("Acceleration", conn.read_acceleration()),
            "k" => show("K", conn.read_constant()),
            "K" => set_constant(conn, &mut lines),
            "h" => match conn.help() {
                Ok(text) => {
                    println!("HELP: {}", text);
                    Ok(())
                }
                Err(e) => Err(e.into()),
            },
            "q" => break,
            "" => Ok(()),
            other => {
                println!("unknown choice '{}'", other);
                Ok(())
            }
        };

        // Protocol errors are printed, not fatal; the next command may succeed
        if let Err(e) = outcome {
            println!("protocol error: {:#}", e);
        }
    }

    println!("Closing serial link.");
    Ok(())
}

fn show(label: &str, result: Result<Value, nucleolink_core::protocol::ProtocolError>) -> Result<()> {
    let value = result?;
    println!("{}: {}", label, value);
    Ok(())
}

fn set_constant(
    conn: &mut Connection,
    lines: &mut impl Iterator<Item = io::Result<String>>,
) -> Result<()> {
    print!("K in centi (e.g. 1234 for 12.34) > ");
    io::stdout().flush()?;

    let Some(line) = lines.next() else {
        return Ok(());
    };
    let text = line?;
    let k_centi: i32 = match text.trim().parse() {
        Ok(v) => v,
        Err(_) => {
            println!("not an integer: '{}'", text.trim());
            return Ok(());
        }
    };

    let ack = conn.set_constant(k_centi)?;
    println!("SET_K reply: {}", ack);
    Ok(())
}
