use std::process::ExitCode;

use anyhow::Result;
use async_trait::async_trait;

pub mod provision;
pub mod render;
pub mod resolve;

#[async_trait]
pub trait Command {
    async fn run(&self) -> Result<ExitCode>;
}

pub trait IntoCommand {
    fn into_command(self) -> Box<dyn Command>;
}

impl IntoCommand for crate::cli::Subcommand {
    fn into_command(self) -> Box<dyn Command> {
        match self {
            crate::cli::Subcommand::Provision(provision_options) => {
                Box::new(provision::ProvisionCommand { provision_options })
            }
            crate::cli::Subcommand::Resolve(_) => Box::new(resolve::ResolveCommand {}),
            crate::cli::Subcommand::Render(render_options) => {
                Box::new(render::RenderCommand { render_options })
            }
        }
    }
}
