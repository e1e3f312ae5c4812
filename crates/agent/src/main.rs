#![forbid(unsafe_code)]

mod api_client;
mod cli;
mod commands;
mod shutdown;
mod startup;

use anyhow::Result;

use api_client::ApiClient;
use cli::{Command, DevicesCommand, EbpfCommand, RegistrationsCommand};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::parse();

    // No subcommand: run the gateway daemon.
    let client = ApiClient::new(cli.socket_path());

    let Some(command) = cli.command else {
        return startup::run(&cli).await;
    };
    match command {
        Command::Devices(cmd) => match cmd {
            DevicesCommand::List { username } => {
                commands::cmd_device_list(&client, username.as_deref())
            }
            DevicesCommand::Delete { username } => commands::cmd_device_delete(&client, &username),
            DevicesCommand::Lock { username } => commands::cmd_device_lock(&client, &username),
            DevicesCommand::Unlock { username } => commands::cmd_device_unlock(&client, &username),
        },

        Command::Sessions => commands::cmd_sessions(&client),

        Command::Firewall => commands::cmd_firewall_list(&client),

        Command::Reload => commands::cmd_reload(&client),

        Command::Registrations(cmd) => match cmd {
            RegistrationsCommand::List => commands::cmd_registration_list(&client),
            RegistrationsCommand::Create { username, token } => {
                commands::cmd_registration_create(&client, &username, token.as_deref())
            }
            RegistrationsCommand::Delete { id } => commands::cmd_registration_delete(&client, &id),
        },

        Command::Version { bpf } => commands::cmd_version(&client, bpf),

        Command::Shutdown => commands::cmd_shutdown(&client),

        Command::Ebpf(cmd) => match cmd {
            EbpfCommand::Pin => commands::cmd_ebpf_pin(&client),
            EbpfCommand::Unpin => commands::cmd_ebpf_unpin(&client),
        },
    }
}
