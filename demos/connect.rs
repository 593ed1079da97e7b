//! Connect to a gateway and stream top-of-book ticks.
//!
//! ```text
//! cargo run --example connect -- 127.0.0.1 7497 1
//! ```
//!
//! Arguments are host, port and client id; all optional.

use std::time::Duration;

use venue_client::{
    Client, ContractDescriptor, DepthUpdate, Field, Frame, Result, TagValue, TickSize, TickString,
    Wrapper,
};

/// Prints every fast-path update.
struct Printer;

impl Wrapper for Printer {
    fn tick_size(&mut self, tick: TickSize) {
        println!("size   {:?}", tick);
    }

    fn tick_string(&mut self, tick: TickString) {
        println!("string {:?}", tick);
    }

    fn update_mkt_depth(&mut self, update: DepthUpdate) {
        println!("depth  {:?}", update);
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "127.0.0.1".to_string());
    let port: u16 = args.next().map(|p| p.parse()).transpose()?.unwrap_or(7497);
    let client_id: i32 = args.next().map(|c| c.parse()).transpose()?.unwrap_or(1);

    let client = Client::builder(Printer, |frame: &Frame| -> Result<()> {
        println!("other  {}", frame);
        Ok(())
    })
    .on_price_size_tick(|tick| println!("price  {:?}", tick))
    .on_session_error(|msg| eprintln!("session error: {}", msg))
    .spawn();

    client
        .connect(&host, port, client_id, Some(Duration::from_secs(5)))
        .await?;
    println!(
        "ready: server v{}, accounts {:?}",
        client.server_version().await?,
        client.account_names().await?
    );

    let contract = ContractDescriptor {
        symbol: "AAPL".into(),
        sec_type: "STK".into(),
        exchange: "SMART".into(),
        currency: "USD".into(),
        ..Default::default()
    };
    let req_id = client.next_request_id().await?;
    client
        .send(vec![
            Field::from(1),
            Field::from(11),
            Field::from(req_id),
            Field::from(contract),
            Field::from(false),
            Field::from(""),
            Field::from(false),
            Field::from(false),
            Field::from(Vec::<TagValue>::new()),
        ])
        .await?;

    tokio::time::sleep(Duration::from_secs(10)).await;
    client.disconnect().await?;
    Ok(())
}
