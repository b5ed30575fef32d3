#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use lazy_static::lazy_static;
use log::info;

use kube_demo::server::{self, ServiceKind};
use kube_demo::utils::config::{init_log, init_runtime_context, DemoArgs};
use kube_demo::utils::errors::Errors;

// ***************************************************************************
//                             Static Variables
// ***************************************************************************
// Assign the command line arguments before the runtime context is built.
lazy_static! {
    static ref DEMO_ARGS: DemoArgs = DemoArgs::parse();
}

// ---------------------------------------------------------------------------
// main:
// ---------------------------------------------------------------------------
#[tokio::main]
async fn main() -> Result<()> {
    println!("Starting kube_demo!");

    init_log(&DEMO_ARGS)?;
    let ctx = init_runtime_context(ServiceKind::Greeting, &DEMO_ARGS)?;
    info!("{}", Errors::InputParms(format!("{:#?}", ctx)));
    server::print_version_info(ctx.service);

    server::run(&ctx).await
}
