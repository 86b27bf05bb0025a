use clap::Subcommand;
use modelfmt::{SettingsStore, SplitLevel};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the current settings (after migration and clamping)
    Show,

    /// Change one or more settings
    Set {
        /// Show the model label in message headers
        #[arg(long)]
        show_model_name: Option<bool>,

        /// Show the character name next to it
        #[arg(long)]
        show_ch_name: Option<bool>,

        /// Split level 0-3
        #[arg(long)]
        split_level: Option<SplitLevel>,
    },
}

pub fn run_config(store: &SettingsStore, action: ConfigAction) -> anyhow::Result<()> {
    let settings = match action {
        ConfigAction::Show => store.load()?,
        ConfigAction::Set {
            show_model_name,
            show_ch_name,
            split_level,
        } => {
            if show_model_name.is_none() && show_ch_name.is_none() && split_level.is_none() {
                anyhow::bail!(
                    "nothing to set; pass --show-model-name, --show-ch-name or --split-level"
                );
            }
            store.update(|s| {
                if let Some(v) = show_model_name {
                    s.show_model_name = v;
                }
                if let Some(v) = show_ch_name {
                    s.show_ch_name = v;
                }
                if let Some(v) = split_level {
                    s.split_level = v;
                }
            })?
        }
    };

    println!("{}", serde_json::to_string_pretty(&settings)?);
    println!("Settings file: {}", store.path().display());
    Ok(())
}
