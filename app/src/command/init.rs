//! Write the default configuration file.

use tutors_config::Config;

use super::CommandStrategy;

/// Strategy for executing the Init command.
#[derive(Debug, Clone, Copy)]
pub struct InitStrategy;

impl CommandStrategy for InitStrategy {
    type Input = ();

    async fn execute(&self, (): Self::Input) -> anyhow::Result<()> {
        let path = Config::create_config()?;
        println!("Created config at: {}", path.display());
        println!("Add your Gemini API key under provider.api_key, or set it with /key in chat.");
        Ok(())
    }
}
