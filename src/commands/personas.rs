//! Persona listing command

use crate::config::Config;
use crate::error::{Result, VoxchatError};
use crate::persona::Persona;
use colored::Colorize;
use prettytable::{cell, row, Table};

/// Print the persona registry as a table or as JSON
///
/// The listing reflects the built-in personas merged with any overrides
/// from the configuration file.
///
/// # Examples
///
/// ```no_run
/// use voxchat::config::Config;
/// use voxchat::commands::personas::list_personas;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::load("config/config.yaml", &Default::default())?;
/// list_personas(&config, false)?;
/// # Ok(())
/// # }
/// ```
pub fn list_personas(config: &Config, json: bool) -> Result<()> {
    let registry = config.persona_registry();
    let personas: Vec<&Persona> = registry.iter().collect();
    tracing::debug!(count = personas.len(), json, "Listing personas");

    if json {
        let json = serde_json::to_string_pretty(&personas).map_err(VoxchatError::Serialization)?;
        println!("{}", json);
    } else {
        output_personas_table(&personas, &config.conversation.default_role);
    }

    Ok(())
}

fn output_personas_table(personas: &[&Persona], default_role: &str) {
    let mut table = Table::new();
    table.add_row(row!["Role", "Name", "Title", "Voice"]);

    for persona in personas {
        let role = if persona.key == default_role {
            format!("{} {}", persona.key, "(default)".green())
        } else {
            persona.key.clone()
        };
        table.add_row(row![role, persona.name, persona.title, persona.voice_id]);
    }

    println!("\n{}\n", "Available personas:".bold());
    table.printstd();
    println!();
}
