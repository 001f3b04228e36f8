//! `sitegate ping`: wait until a URL answers

use clap::Args;

use sitegate_common::config::DEFAULT_WAIT_ON_TIMEOUT_SECS;
use sitegate_common::Seconds;
use sitegate_e2e::Pinger;

use crate::output;

#[derive(Args, Debug, Clone)]
pub struct PingArgs {
    /// URL to wait for
    pub url: String,

    /// Seconds to keep trying
    #[arg(long, default_value_t = DEFAULT_WAIT_ON_TIMEOUT_SECS)]
    pub timeout: f64,
}

pub async fn execute(args: PingArgs) -> anyhow::Result<i32> {
    let timeout = Seconds::Number(args.timeout).to_duration()?;

    match Pinger::new()?.ping(&args.url, timeout).await {
        Ok(elapsed) => {
            output::print_success(&format!(
                "{} responded after {} ms",
                args.url,
                elapsed.as_millis()
            ));
            Ok(0)
        }
        Err(e) => {
            output::print_error(&e.to_string());
            Ok(1)
        }
    }
}
