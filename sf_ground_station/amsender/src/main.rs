/*
amsender: send a single ActiveMessage packet through a serial forwarder.

    amsender [OPTIONS] -a AMID sf@HOST:PORT

Connects to the forwarder, sends one packet built from the command line flags,
then keeps the connection open until it has drained and closed, or until the
process is interrupted.

Everything the tool prints goes to stdout (log sinks permitting). Exit status is
1 for bad arguments, a bad connection string, a logger failure or a failed
connect, and 0 otherwise.
*/

use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;

use clap::error::ErrorKind;
use clap::Parser;
use log::{debug, error};
use sf_interface::{MessageDispatcher, SfConnection};

mod cli;
mod error;
mod lifecycle;
mod packet_builder;
mod shutdown;
mod version;

use cli::{Args, Command};
use error::AppError;
use lifecycle::LifecycleManager;

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            println!("Argument parser error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let request = match args.into_command() {
        Ok(Command::ShowVersion) => {
            println!("{}", version::BUILD_INFO);
            return ExitCode::SUCCESS;
        }
        Ok(Command::Send(request)) => request,
        Err(e) => {
            println!("ERROR: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // keep the handle alive for the whole run
    let _log_handle = match logging::init_logger(&request.log_config) {
        Ok(handle) => handle,
        Err(e) => {
            println!("ERROR: {}", AppError::from(e));
            return ExitCode::FAILURE;
        }
    };

    let dispatcher = Arc::new(MessageDispatcher::new());
    let session = Arc::new(SfConnection::new());
    session.add_dispatcher(dispatcher.clone());

    let manager = LifecycleManager::new(session);
    match manager
        .run(
            &request.host,
            request.port,
            dispatcher.as_ref(),
            request.fields,
            shutdown::listen_for_os_signals,
        )
        .await
    {
        Ok(outcome) => {
            debug!("{}", outcome);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            if let Some(cause) = e.source() {
                debug!("caused by: {}", cause);
            }
            ExitCode::FAILURE
        }
    }
}
