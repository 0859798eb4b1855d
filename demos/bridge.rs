use irhvac::{Config, HttpPublisher, IrHvacClient};
use std::env;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// Drives a Tasmota IR bridge over HTTP and reconciles state from RESULT
/// payloads piped in on stdin, one JSON object per line:
///
///   mosquitto_sub -t tele/ir_bridge/RESULT | cargo run --example bridge -- config.json 192.168.1.50 cool
#[tokio::main]
async fn main() -> irhvac::Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let usage = "usage: bridge <config.json> <bridge-ip> [mode]";
    let config_path = args.get(1).expect(usage);
    let host = args.get(2).expect(usage);

    let config = Config::from_json(&std::fs::read_to_string(config_path)?)?;
    let client = IrHvacClient::builder(config)
        .on_event(|event| println!("{event:?}"))
        .on_snapshot(|state| {
            println!(
                "{:?} | {:?} ({:?}) {:.1}\u{00b0} | fan: {:?} | swing: {:?}{}",
                state.power(),
                state.mode(),
                state.hvac_action(),
                state.target_temperature(),
                state.fan_mode(),
                state.swing_mode(),
                state
                    .current_temperature()
                    .map(|t| format!(" | room {t:.1}\u{00b0}"))
                    .unwrap_or_default(),
            );
        })
        .build(HttpPublisher::new(host)?)?;

    println!("Vendor {} ({})", client.vendor(), client.unique_id());

    if let Some(mode) = args.get(3) {
        let outcome = client.set_hvac_mode(mode.parse()?).await?;
        println!("{mode}: {outcome:?}");
    }

    let (tx, rx) = mpsc::channel(32);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(line).await.is_err() {
                break;
            }
        }
    });

    client.run_feedback(rx).await;
    Ok(())
}
