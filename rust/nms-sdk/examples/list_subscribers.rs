use anyhow::Context;
use nms_sdk::prelude::*;
use nms_sdk::{init_telemetry, TelemetryConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_telemetry(TelemetryConfig::default())?;

    let http = HttpConfig::from_env().context("set NMS_API_URL and NMS_NETWORK_ID")?;
    let api = HttpSubscriberApi::new(http)?;
    let ctx = SubscriberContext::mount(Arc::new(api), SubscriberConfig::default()).await?;
    let table = ctx.table();

    let page_size = 25;
    let mut page = 0;
    loop {
        let result = table.query(SubscriberQuery::page(page, page_size)).await?;
        for row in &result.data {
            println!(
                "{:<20} {:<24} {:<9} {:>12} {:>12} {}",
                row.imsi,
                row.name,
                row.service,
                row.current_usage,
                row.daily_avg,
                row.last_reported_time
            );
        }

        let seen = (result.page + 1) * page_size;
        if result.data.is_empty() || seen as u64 >= result.total_count {
            break;
        }
        page = result.page + 1;
    }

    for (gateway, subscribers) in ctx.gateway_subscriber_map().await {
        println!("{}: {} subscribers", gateway, subscribers.len());
    }

    Ok(())
}
